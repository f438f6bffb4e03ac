//! Filename derivation for retrieved documents.
//!
//! Pattern: `PMC<id>_<sanitized title>.<ext>`, or `PMC<id>.<ext>` when the
//! title sanitizes to nothing. The stem is bounded in characters so deep
//! output directories do not hit path-length limits; the identifier is never
//! truncated. Same-named files are overwritten (last write wins).

use std::path::{Component, Path};

use crate::document::{DocumentIdentifier, Representation};

/// Characters rejected by common filesystems.
pub const ILLEGAL_FILENAME_CHARS: [char; 9] = ['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

/// Builds the output filename for a document retrieved as `kind`.
///
/// The returned name is at most `max_stem_chars` characters plus `.` and the
/// extension, unless the `PMC<id>` prefix alone is longer than the bound.
#[must_use]
pub fn document_filename(
    identifier: &DocumentIdentifier,
    title: &str,
    kind: Representation,
    max_stem_chars: usize,
) -> String {
    let prefix = identifier.to_string();
    let title = sanitize_title(title);
    let extension = kind.extension();

    let budget = max_stem_chars.saturating_sub(prefix.chars().count() + 1);
    let title: String = title.chars().take(budget).collect();
    let title = title.trim_end_matches([' ', '.']);

    if title.is_empty() {
        format!("{prefix}.{extension}")
    } else {
        format!("{prefix}_{title}.{extension}")
    }
}

/// Removes filesystem-illegal characters, maps control characters and line
/// breaks to spaces, and collapses whitespace runs.
#[must_use]
pub fn sanitize_title(title: &str) -> String {
    let mapped: String = title
        .chars()
        .filter(|c| !ILLEGAL_FILENAME_CHARS.contains(c))
        .map(|c| if c.is_control() { ' ' } else { c })
        .collect();
    let collapsed = mapped.split_whitespace().collect::<Vec<_>>().join(" ");
    collapsed.trim_matches('.').trim().to_string()
}

/// True if `name` is a single plain path segment (no `..`, no root, no prefix).
pub(crate) fn is_safe_filename_segment(name: &str) -> bool {
    !name.is_empty()
        && !name.contains(['/', '\\'])
        && Path::new(name).components().all(|component| matches!(component, Component::Normal(_)))
}
