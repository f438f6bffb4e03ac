//! Transport-level errors for session requests.

use thiserror::Error;

/// Errors from a single HTTP exchange, distinct from content rejection.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Network-level error (DNS resolution, connection refused, TLS errors, etc.)
    #[error("network error requesting {url}: {source}")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// Request did not complete within its class timeout.
    #[error("timeout requesting {url}")]
    Timeout { url: String },

    /// HTTP 403, the host's usual answer to traffic it considers automated.
    #[error("access forbidden (HTTP 403) requesting {url}")]
    Forbidden { url: String },

    /// Any other non-success status.
    #[error("HTTP {status} requesting {url}")]
    HttpStatus { url: String, status: u16 },

    #[error("invalid URL: {url}")]
    InvalidUrl { url: String },

    /// The HTTP client itself could not be constructed.
    #[error("HTTP client construction failed: {message}")]
    ClientBuild { message: String },
}

impl SessionError {
    /// Classifies a reqwest send/read failure.
    ///
    /// The reqwest error's own copy of the URL is dropped; `url` is expected
    /// to be already redacted.
    pub fn from_reqwest(url: impl Into<String>, source: reqwest::Error) -> Self {
        let url = url.into();
        if source.is_timeout() {
            Self::Timeout { url }
        } else {
            Self::Network {
                url,
                source: source.without_url(),
            }
        }
    }

    /// Creates the error for a non-success status.
    pub fn status(url: impl Into<String>, status: u16) -> Self {
        let url = url.into();
        if status == 403 {
            Self::Forbidden { url }
        } else {
            Self::HttpStatus { url, status }
        }
    }

    pub fn invalid_url(url: impl Into<String>) -> Self {
        Self::InvalidUrl { url: url.into() }
    }

    pub fn client_build(message: impl Into<String>) -> Self {
        Self::ClientBuild {
            message: message.into(),
        }
    }

    /// Returns true for the anti-scraping 403 response.
    #[must_use]
    pub fn is_forbidden(&self) -> bool {
        matches!(self, Self::Forbidden { .. })
    }
}
