//! Retriever configuration: endpoints, credentials, pacing, timeouts, and
//! validation thresholds.
//!
//! Threshold values are empirically chosen policy carried over from field use,
//! not derived limits; they are configurable for that reason.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::pacing::PacingPolicy;

/// Default E-utilities base URL (search and fetch endpoints hang off it).
pub const DEFAULT_EUTILS_BASE_URL: &str = "https://eutils.ncbi.nlm.nih.gov/entrez/eutils";

/// Default origin of the browsable article site.
pub const DEFAULT_SITE_ORIGIN: &str = "https://www.ncbi.nlm.nih.gov";

/// Default output directory for retrieved documents.
pub const DEFAULT_OUTPUT_DIR: &str = "./papers";

/// Default connect timeout (10 seconds).
pub const CONNECT_TIMEOUT_SECS: u64 = 10;

/// Default total timeout for metadata and page requests (30 seconds).
pub const METADATA_TIMEOUT_SECS: u64 = 30;

/// Default total timeout for binary downloads (60 seconds).
pub const DOWNLOAD_TIMEOUT_SECS: u64 = 60;

/// Default bound on a filename stem (`PMC<id>_<title>`), in characters.
pub const DEFAULT_FILENAME_MAX_CHARS: usize = 120;

const MAX_TIMEOUT_SECS: u64 = 3600;
const MAX_DELAY: Duration = Duration::from_secs(60);
const FILENAME_CHARS_RANGE: std::ops::RangeInclusive<usize> = 16..=200;

/// Invalid configuration value.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid config value for `{field}`: {value}. Expected range: {expected}")]
    OutOfRange {
        field: &'static str,
        value: String,
        expected: &'static str,
    },

    #[error("invalid URL for `{field}`: {value}")]
    InvalidUrl { field: &'static str, value: String },
}

/// Remote endpoints; overridable so tests can point at mock servers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    /// Base for `esearch.fcgi` and `efetch.fcgi`.
    pub eutils_base_url: String,
    /// Scheme and host of the article site (root-relative hrefs resolve here).
    pub site_origin: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            eutils_base_url: DEFAULT_EUTILS_BASE_URL.to_string(),
            site_origin: DEFAULT_SITE_ORIGIN.to_string(),
        }
    }
}

impl Endpoints {
    /// Points both endpoints at one base URL (mock servers in tests).
    #[must_use]
    pub fn single_host(base_url: impl Into<String>) -> Self {
        let base = base_url.into();
        let base = base.trim_end_matches('/').to_string();
        Self {
            eutils_base_url: base.clone(),
            site_origin: base,
        }
    }

    #[must_use]
    pub fn search_url(&self) -> String {
        format!("{}/esearch.fcgi", self.eutils_base_url.trim_end_matches('/'))
    }

    #[must_use]
    pub fn fetch_url(&self) -> String {
        format!("{}/efetch.fcgi", self.eutils_base_url.trim_end_matches('/'))
    }

    /// Canonical article page for a bare accession id. Built locally, no lookup.
    #[must_use]
    pub fn article_url(&self, accession: &str) -> String {
        format!(
            "{}/pmc/articles/PMC{accession}/",
            self.site_origin.trim_end_matches('/')
        )
    }
}

/// Request timeouts per class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    pub connect: Duration,
    pub metadata: Duration,
    pub download: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            connect: Duration::from_secs(CONNECT_TIMEOUT_SECS),
            metadata: Duration::from_secs(METADATA_TIMEOUT_SECS),
            download: Duration::from_secs(DOWNLOAD_TIMEOUT_SECS),
        }
    }
}

/// Minimum byte sizes per tier and the window scanned for error markers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidationThresholds {
    pub pdf_min_bytes: usize,
    pub xml_min_bytes: usize,
    pub text_min_bytes: usize,
    /// Only this many leading bytes are scanned for error markers.
    pub header_window: usize,
}

impl Default for ValidationThresholds {
    fn default() -> Self {
        Self {
            pdf_min_bytes: 1000,
            xml_min_bytes: 1000,
            text_min_bytes: 500,
            header_window: 200,
        }
    }
}

/// Everything a [`Retriever`](crate::Retriever) session needs.
#[derive(Clone)]
pub struct RetrieverConfig {
    pub output_dir: PathBuf,
    /// Contact email sent to E-utilities (raises rate limits).
    pub email: Option<String>,
    pub api_key: Option<String>,
    pub endpoints: Endpoints,
    pub pacing: PacingPolicy,
    pub timeouts: Timeouts,
    pub thresholds: ValidationThresholds,
    /// Bound on the filename stem; the extension is added after truncation.
    pub filename_max_chars: usize,
}

impl std::fmt::Debug for RetrieverConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetrieverConfig")
            .field("output_dir", &self.output_dir)
            .field("email", &self.email)
            .field("has_api_key", &self.api_key.is_some())
            .field("endpoints", &self.endpoints)
            .field("pacing", &self.pacing)
            .field("timeouts", &self.timeouts)
            .field("thresholds", &self.thresholds)
            .field("filename_max_chars", &self.filename_max_chars)
            .finish()
    }
}

impl Default for RetrieverConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            email: None,
            api_key: None,
            endpoints: Endpoints::default(),
            pacing: PacingPolicy::default(),
            timeouts: Timeouts::default(),
            thresholds: ValidationThresholds::default(),
            filename_max_chars: DEFAULT_FILENAME_MAX_CHARS,
        }
    }
}

impl RetrieverConfig {
    #[must_use]
    pub fn with_output_dir(mut self, output_dir: impl Into<PathBuf>) -> Self {
        self.output_dir = output_dir.into();
        self
    }

    /// Sets the contact email; blank values are ignored.
    #[must_use]
    pub fn with_email(mut self, email: Option<String>) -> Self {
        self.email = email.filter(|value| !value.trim().is_empty());
        self
    }

    /// Sets the API key; blank values are ignored.
    #[must_use]
    pub fn with_api_key(mut self, api_key: Option<String>) -> Self {
        self.api_key = api_key.filter(|value| !value.trim().is_empty());
        self
    }

    #[must_use]
    pub fn with_endpoints(mut self, endpoints: Endpoints) -> Self {
        self.endpoints = endpoints;
        self
    }

    #[must_use]
    pub fn with_pacing(mut self, pacing: PacingPolicy) -> Self {
        self.pacing = pacing;
        self
    }

    #[must_use]
    pub fn with_timeouts(mut self, timeouts: Timeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    #[must_use]
    pub fn with_filename_max_chars(mut self, filename_max_chars: usize) -> Self {
        self.filename_max_chars = filename_max_chars;
        self
    }

    #[must_use]
    pub fn with_thresholds(mut self, thresholds: ValidationThresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    /// Validates values against the supported ranges.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] for the first value out of range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_url("eutils_base_url", &self.endpoints.eutils_base_url)?;
        validate_url("site_origin", &self.endpoints.site_origin)?;
        validate_timeout("connect_timeout", self.timeouts.connect)?;
        validate_timeout("metadata_timeout", self.timeouts.metadata)?;
        validate_timeout("download_timeout", self.timeouts.download)?;
        validate_delay("metadata_delay", self.pacing.metadata_delay)?;
        validate_delay("download_delay", self.pacing.download_delay)?;

        if !FILENAME_CHARS_RANGE.contains(&self.filename_max_chars) {
            return Err(ConfigError::OutOfRange {
                field: "filename_max_chars",
                value: self.filename_max_chars.to_string(),
                expected: "16..=200",
            });
        }
        if self.thresholds.header_window == 0 {
            return Err(ConfigError::OutOfRange {
                field: "header_window",
                value: "0".to_string(),
                expected: ">= 1",
            });
        }
        Ok(())
    }
}

fn validate_url(field: &'static str, value: &str) -> Result<(), ConfigError> {
    match url::Url::parse(value) {
        Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => Ok(()),
        _ => Err(ConfigError::InvalidUrl {
            field,
            value: value.to_string(),
        }),
    }
}

fn validate_timeout(field: &'static str, value: Duration) -> Result<(), ConfigError> {
    let secs = value.as_secs();
    if !(1..=MAX_TIMEOUT_SECS).contains(&secs) {
        return Err(ConfigError::OutOfRange {
            field,
            value: format!("{secs}s"),
            expected: "1..=3600 seconds",
        });
    }
    Ok(())
}

fn validate_delay(field: &'static str, value: Duration) -> Result<(), ConfigError> {
    if value > MAX_DELAY {
        return Err(ConfigError::OutOfRange {
            field,
            value: format!("{}ms", value.as_millis()),
            expected: "0..=60000 milliseconds",
        });
    }
    Ok(())
}
