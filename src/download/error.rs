//! Error types for the format cascade.
//!
//! A [`TierFailure`] is local to one tier and never ends the cascade by
//! itself; it is condensed into a [`TierAttempt`] record and the next tier
//! runs. Only [`RetrieveError`] reaches the caller of a download.

use std::fmt;
use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

use super::validation::VerdictReason;
use crate::document::{DocumentIdentifier, Representation};
use crate::session::SessionError;

/// Why one tier produced no validated file.
#[derive(Debug, Error)]
pub enum TierFailure {
    /// Network-level failure (connection, timeout, HTTP status). Never retried
    /// within the tier.
    #[error(transparent)]
    Transport(#[from] SessionError),

    /// A body arrived but failed the validation gate.
    #[error("content rejected from {url}: {reason}")]
    ContentInvalid { url: String, reason: VerdictReason },

    /// The host answered with its proof-of-work interstitial instead of the file.
    #[error("proof-of-work challenge served by {url}; open the article manually")]
    AntibotChallenge { url: String },

    /// The article page had no link matching any strategy for this tier.
    #[error("no {tier} link found on {page_url}")]
    LinkNotFound {
        tier: Representation,
        page_url: String,
    },

    /// The validated body could not be written.
    #[error("IO error writing to {path}: {source}")]
    Storage {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl TierFailure {
    pub fn content_invalid(url: impl Into<String>, reason: VerdictReason) -> Self {
        Self::ContentInvalid {
            url: url.into(),
            reason,
        }
    }

    pub fn antibot(url: impl Into<String>) -> Self {
        Self::AntibotChallenge { url: url.into() }
    }

    pub fn link_not_found(tier: Representation, page_url: impl Into<String>) -> Self {
        Self::LinkNotFound {
            tier,
            page_url: page_url.into(),
        }
    }

    pub fn storage(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Storage {
            path: path.into(),
            source,
        }
    }

    #[must_use]
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::Transport(_) => FailureKind::Transport,
            Self::ContentInvalid { .. } => FailureKind::ContentInvalid,
            Self::AntibotChallenge { .. } => FailureKind::AntibotChallenge,
            Self::LinkNotFound { .. } => FailureKind::LinkNotFound,
            Self::Storage { .. } => FailureKind::Storage,
        }
    }

    /// True for the proof-of-work case, which needs a human in a browser.
    #[must_use]
    pub fn is_antibot(&self) -> bool {
        matches!(self, Self::AntibotChallenge { .. })
    }
}

/// Category of a [`TierFailure`], kept after the error itself is dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Transport,
    ContentInvalid,
    AntibotChallenge,
    LinkNotFound,
    Storage,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Transport => "transport error",
            Self::ContentInvalid => "invalid content",
            Self::AntibotChallenge => "blocked by anti-bot challenge",
            Self::LinkNotFound => "link not found",
            Self::Storage => "storage error",
        })
    }
}

/// Record of one failed tier, in cascade order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TierAttempt {
    pub tier: Representation,
    pub kind: FailureKind,
    /// Rendered failure message.
    pub detail: String,
}

impl TierAttempt {
    #[must_use]
    pub fn new(tier: Representation, failure: &TierFailure) -> Self {
        Self {
            tier,
            kind: failure.kind(),
            detail: failure.to_string(),
        }
    }

    #[must_use]
    pub fn is_antibot(&self) -> bool {
        self.kind == FailureKind::AntibotChallenge
    }
}

impl fmt::Display for TierAttempt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.tier, self.detail)
    }
}

/// Terminal failure of one document's download.
#[derive(Debug, Error)]
pub enum RetrieveError {
    /// Every tier failed; `attempts` holds one record per tier.
    #[error("all formats exhausted for {identifier} ({})", summarize(.attempts))]
    AllFormatsExhausted {
        identifier: DocumentIdentifier,
        attempts: Vec<TierAttempt>,
    },

    /// The output directory could not be created.
    #[error("cannot create output directory {path}: {source}")]
    OutputDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl RetrieveError {
    /// Failed tier records, empty for directory errors.
    #[must_use]
    pub fn attempts(&self) -> &[TierAttempt] {
        match self {
            Self::AllFormatsExhausted { attempts, .. } => attempts,
            Self::OutputDirectory { .. } => &[],
        }
    }

    /// True if an anti-bot challenge blocked any tier.
    #[must_use]
    pub fn hit_antibot_challenge(&self) -> bool {
        self.attempts().iter().any(TierAttempt::is_antibot)
    }
}

fn summarize(attempts: &[TierAttempt]) -> String {
    attempts
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
