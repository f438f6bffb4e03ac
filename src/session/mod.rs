//! HTTP session shared by search, metadata, and download requests.
//!
//! A [`Session`] owns one reqwest client, one cookie jar, and one browser
//! identity, so server-assigned cookies persist across the
//! search → metadata → download sequence. Sessions are explicitly constructed
//! and never global; independent sessions do not share cookies.

mod client;
mod error;

pub use error::SessionError;

use std::sync::Arc;

use reqwest::cookie::Jar;
use reqwest::header::CONTENT_TYPE;
use tracing::{debug, instrument};
use url::Url;

use crate::config::{Endpoints, RetrieverConfig, Timeouts};
use crate::pacing::RequestClass;

/// Database parameter for every E-utilities request.
const EUTILS_DATABASE: &str = "pmc";

/// Fully-read response body with the metadata the cascade inspects.
#[derive(Debug, Clone)]
pub struct FetchedBody {
    /// URL after redirects.
    pub final_url: String,
    /// `Content-Type` header, logged when a body is rejected.
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl FetchedBody {
    /// Body as text, replacing invalid UTF-8.
    #[must_use]
    pub fn text_lossy(&self) -> String {
        String::from_utf8_lossy(&self.bytes).into_owned()
    }
}

/// One retrieval session's connection, cookie, and identity context.
pub struct Session {
    client: reqwest::Client,
    endpoints: Endpoints,
    timeouts: Timeouts,
    email: Option<String>,
    api_key: Option<String>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("endpoints", &self.endpoints)
            .field("timeouts", &self.timeouts)
            .field("email", &self.email)
            .field("has_api_key", &self.api_key.is_some())
            .finish_non_exhaustive()
    }
}

impl Session {
    /// Creates a session with a fresh cookie jar.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::ClientBuild`] when the HTTP client cannot be built.
    pub fn new(config: &RetrieverConfig) -> Result<Self, SessionError> {
        let cookie_jar = Arc::new(Jar::default());
        let client = client::build_session_client(cookie_jar, config.timeouts.connect)?;
        Ok(Self {
            client,
            endpoints: config.endpoints.clone(),
            timeouts: config.timeouts,
            email: config.email.clone(),
            api_key: config.api_key.clone(),
        })
    }

    #[must_use]
    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    /// Canonical article page for an accession id.
    #[must_use]
    pub fn article_url(&self, accession: &str) -> String {
        self.endpoints.article_url(accession)
    }

    /// Builds an E-utilities URL with the database, caller params, and credentials.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::InvalidUrl`] if the endpoint cannot be parsed.
    pub fn eutils_url(&self, endpoint: &str, params: &[(&str, &str)]) -> Result<Url, SessionError> {
        let mut pairs: Vec<(&str, &str)> = Vec::with_capacity(params.len() + 3);
        pairs.push(("db", EUTILS_DATABASE));
        pairs.extend_from_slice(params);
        if let Some(email) = self.email.as_deref() {
            pairs.push(("email", email));
        }
        if let Some(api_key) = self.api_key.as_deref() {
            pairs.push(("api_key", api_key));
        }
        Url::parse_with_params(endpoint, &pairs).map_err(|_| SessionError::invalid_url(endpoint))
    }

    /// Sends a GET and reads the whole body within the class timeout.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError`] for transport failures and non-success statuses.
    #[instrument(skip(self), fields(url = %url, class = ?class))]
    pub async fn get(&self, url: &str, class: RequestClass) -> Result<FetchedBody, SessionError> {
        let parsed = Url::parse(url).map_err(|_| SessionError::invalid_url(url))?;
        self.get_url(parsed, class).await
    }

    /// Like [`get`](Self::get) for an already-parsed URL.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError`] for transport failures and non-success statuses.
    pub async fn get_url(&self, url: Url, class: RequestClass) -> Result<FetchedBody, SessionError> {
        let timeout = match class {
            RequestClass::Metadata => self.timeouts.metadata,
            RequestClass::Download => self.timeouts.download,
        };
        let url_text = redacted(&url);

        let response = self
            .client
            .get(url)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| SessionError::from_reqwest(&url_text, e))?;

        let status = response.status().as_u16();
        if !response.status().is_success() {
            debug!(status, "non-success response");
            return Err(SessionError::status(url_text, status));
        }

        let final_url = response.url().to_string();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(std::string::ToString::to_string);
        let bytes = response
            .bytes()
            .await
            .map_err(|e| SessionError::from_reqwest(&url_text, e))?
            .to_vec();

        debug!(status, bytes = bytes.len(), "response read");
        Ok(FetchedBody {
            final_url,
            content_type,
            bytes,
        })
    }
}

/// Renders a URL for logs and errors with the `api_key` value masked.
pub(crate) fn redacted(url: &Url) -> String {
    if !url.query_pairs().any(|(key, _)| key == "api_key") {
        return url.to_string();
    }
    let pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(key, value)| {
            let value = if key == "api_key" { "***".into() } else { value };
            (key.into_owned(), value.into_owned())
        })
        .collect();
    let mut masked = url.clone();
    masked.query_pairs_mut().clear().extend_pairs(pairs);
    masked.to_string()
}
