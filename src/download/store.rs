//! Output directory handling and file persistence.

use std::path::{Path, PathBuf};

use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::debug;

use super::error::{RetrieveError, TierFailure};
use super::filename::is_safe_filename_segment;

/// Creates the output directory (and parents) if absent.
///
/// # Errors
///
/// Returns [`RetrieveError::OutputDirectory`] when the directory cannot be created.
pub async fn ensure_output_dir(dir: &Path) -> Result<(), RetrieveError> {
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|source| RetrieveError::OutputDirectory {
            path: dir.to_path_buf(),
            source,
        })
}

/// Writes `bytes` to `dir/filename`, replacing any existing file.
///
/// # Errors
///
/// Returns [`TierFailure::Storage`] when the name is not a plain filename or
/// the write fails.
pub async fn write_document(dir: &Path, filename: &str, bytes: &[u8]) -> Result<PathBuf, TierFailure> {
    let path = dir.join(filename);
    if !is_safe_filename_segment(filename) {
        return Err(TierFailure::storage(
            path,
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "unsafe filename"),
        ));
    }

    let file = File::create(&path)
        .await
        .map_err(|e| TierFailure::storage(&path, e))?;
    let mut writer = BufWriter::new(file);
    writer
        .write_all(bytes)
        .await
        .map_err(|e| TierFailure::storage(&path, e))?;
    writer
        .flush()
        .await
        .map_err(|e| TierFailure::storage(&path, e))?;

    debug!(path = %path.display(), bytes = bytes.len(), "document written");
    Ok(path)
}
