//! Error types for search and metadata resolution.

use thiserror::Error;

use crate::document::DocumentIdentifier;
use crate::session::SessionError;

/// Failures local to one search or one identifier. None of these abort a batch.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("search query is empty")]
    EmptyQuery,

    /// Transport failure, timeout, non-success status, or an upstream error payload.
    #[error("search unavailable for '{query}': {reason}")]
    SearchUnavailable { query: String, reason: String },

    /// Search body could not be parsed as an id list.
    #[error("search response malformed for '{query}': {reason}")]
    SearchResponseMalformed { query: String, reason: String },

    /// Metadata request for one identifier failed at the transport level.
    #[error("metadata unavailable for {identifier}: {source}")]
    MetadataUnavailable {
        identifier: DocumentIdentifier,
        #[source]
        source: SessionError,
    },

    /// Metadata body could not be parsed as XML.
    #[error("metadata malformed for {identifier}: {reason}")]
    UpstreamMalformed {
        identifier: DocumentIdentifier,
        reason: String,
    },

    /// Metadata parsed but carries no `article` element.
    #[error("no article record found for {identifier}")]
    ArticleMissing { identifier: DocumentIdentifier },
}

impl ResolveError {
    pub fn search_unavailable(query: &str, reason: impl Into<String>) -> Self {
        Self::SearchUnavailable {
            query: query.to_string(),
            reason: reason.into(),
        }
    }

    pub fn search_malformed(query: &str, reason: impl Into<String>) -> Self {
        Self::SearchResponseMalformed {
            query: query.to_string(),
            reason: reason.into(),
        }
    }

    pub fn upstream_malformed(identifier: &DocumentIdentifier, reason: impl Into<String>) -> Self {
        Self::UpstreamMalformed {
            identifier: identifier.clone(),
            reason: reason.into(),
        }
    }
}
