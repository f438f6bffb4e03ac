//! Core data model: identifiers, descriptors, and retrieved documents.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::download::TierAttempt;

/// Title used when the upstream metadata carries no `article-title`.
pub const UNKNOWN_TITLE: &str = "Unknown Title";

/// A free-text search plus a bound on how many identifiers to return.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    /// Search term as typed by the user (PMC query syntax allowed).
    pub term: String,
    /// Upper bound on returned identifiers (always at least 1).
    pub max_results: usize,
}

impl SearchQuery {
    /// Creates a query, clamping `max_results` to at least 1.
    #[must_use]
    pub fn new(term: impl Into<String>, max_results: usize) -> Self {
        Self {
            term: term.into(),
            max_results: max_results.max(1),
        }
    }

    /// Returns true when the search term has no non-whitespace content.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.term.trim().is_empty()
    }
}

/// Stable PMC accession id, kept as the exact string the API returned.
///
/// Displays with the `PMC` prefix used by the article site.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentIdentifier(String);

impl DocumentIdentifier {
    /// Wraps an accession id. A leading `PMC` prefix is stripped so both
    /// `"PMC123"` and `"123"` name the same document.
    #[must_use]
    pub fn new(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        let trimmed = raw.trim();
        let bare = trimmed
            .strip_prefix("PMC")
            .or_else(|| trimmed.strip_prefix("pmc"))
            .unwrap_or(trimmed);
        Self(bare.to_string())
    }

    /// The bare accession id as used in API parameters.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocumentIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PMC{}", self.0)
    }
}

/// Minimal metadata for one identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentDescriptor {
    pub identifier: DocumentIdentifier,
    /// Article title, or [`UNKNOWN_TITLE`]; never empty.
    pub title: String,
    /// Browsable article page on the site.
    pub canonical_url: String,
}

/// Content representation, in cascade priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Representation {
    Pdf,
    Xml,
    Text,
}

impl Representation {
    /// All representations in the order the cascade tries them.
    pub const CASCADE: [Representation; 3] = [Self::Pdf, Self::Xml, Self::Text];

    /// File extension (without dot) for a stored document of this kind.
    #[must_use]
    pub fn extension(self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Xml => "xml",
            Self::Text => "txt",
        }
    }
}

impl fmt::Display for Representation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Pdf => "PDF",
            Self::Xml => "XML",
            Self::Text => "TEXT",
        })
    }
}

/// A document that passed validation and was written to the output directory.
#[derive(Debug, Clone, Serialize)]
pub struct RetrievedDocument {
    pub identifier: DocumentIdentifier,
    pub title: String,
    pub local_path: PathBuf,
    /// The tier that actually succeeded, which is not necessarily PDF.
    pub representation_kind: Representation,
    /// Higher-priority tiers that failed before this one succeeded.
    pub failed_tiers: Vec<TierAttempt>,
}

impl RetrievedDocument {
    /// Returns true if an anti-bot challenge blocked one of the earlier tiers.
    #[must_use]
    pub fn hit_antibot_challenge(&self) -> bool {
        self.failed_tiers.iter().any(TierAttempt::is_antibot)
    }
}
