//! Free-text search against the E-utilities `esearch` endpoint.

use serde::Deserialize;
use tracing::{debug, info, instrument, warn};

use super::ResolveError;
use crate::document::{DocumentIdentifier, SearchQuery};
use crate::pacing::RequestClass;
use crate::session::Session;

/// Ordered identifiers from one search, plus the reason when the list is
/// empty because of a failure rather than zero hits.
#[derive(Debug, Default)]
pub struct SearchOutcome {
    /// Upstream relevance order, untouched.
    pub identifiers: Vec<DocumentIdentifier>,
    pub failure: Option<ResolveError>,
}

impl SearchOutcome {
    fn failed(error: ResolveError) -> Self {
        warn!(error = %error, "search failed");
        Self {
            identifiers: Vec::new(),
            failure: Some(error),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.identifiers.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.identifiers.len()
    }
}

#[derive(Debug, Deserialize)]
struct SearchEnvelope {
    esearchresult: SearchResult,
}

#[derive(Debug, Deserialize)]
struct SearchResult {
    #[serde(default)]
    idlist: Vec<String>,
    #[serde(rename = "ERROR")]
    error: Option<String>,
}

/// Resolves a query to identifiers, sorted by relevance and capped at
/// `max_results`.
///
/// Never fails outright: transport and parse problems yield an empty list
/// with [`SearchOutcome::failure`] set.
#[instrument(skip(session), fields(term = %query.term, max_results = query.max_results))]
pub async fn search(session: &Session, query: &SearchQuery) -> SearchOutcome {
    if query.is_blank() {
        return SearchOutcome::failed(ResolveError::EmptyQuery);
    }

    let retmax = query.max_results.to_string();
    let url = match session.eutils_url(
        &session.endpoints().search_url(),
        &[
            ("term", query.term.as_str()),
            ("retmode", "json"),
            ("retmax", retmax.as_str()),
            ("sort", "relevance"),
        ],
    ) {
        Ok(url) => url,
        Err(error) => {
            return SearchOutcome::failed(ResolveError::search_unavailable(
                &query.term,
                error.to_string(),
            ));
        }
    };

    let body = match session.get_url(url, RequestClass::Metadata).await {
        Ok(body) => body,
        Err(error) => {
            return SearchOutcome::failed(ResolveError::search_unavailable(
                &query.term,
                error.to_string(),
            ));
        }
    };

    match parse_search_response(&body.bytes, &query.term) {
        Ok(mut identifiers) => {
            // Upstream honors retmax; the cap is re-applied in case a mirror does not.
            identifiers.truncate(query.max_results);
            info!(results = identifiers.len(), "search complete");
            SearchOutcome {
                identifiers,
                failure: None,
            }
        }
        Err(error) => SearchOutcome::failed(error),
    }
}

fn parse_search_response(bytes: &[u8], term: &str) -> Result<Vec<DocumentIdentifier>, ResolveError> {
    let envelope: SearchEnvelope = serde_json::from_slice(bytes)
        .map_err(|e| ResolveError::search_malformed(term, e.to_string()))?;

    if let Some(message) = envelope.esearchresult.error {
        return Err(ResolveError::search_unavailable(term, message));
    }

    let identifiers: Vec<DocumentIdentifier> = envelope
        .esearchresult
        .idlist
        .into_iter()
        .filter(|id| !id.trim().is_empty())
        .map(DocumentIdentifier::new)
        .collect();
    debug!(count = identifiers.len(), "parsed search id list");
    Ok(identifiers)
}
