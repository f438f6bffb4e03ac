//! Seam for the downstream question-answering collaborator.
//!
//! This crate retrieves documents; it does not analyze them. An [`Analyzer`]
//! receives the retrieved files plus a natural-language question and returns
//! an answer with the documents it drew on. Implementations typically call
//! [`extract::prepare_for_analysis`](crate::extract::prepare_for_analysis)
//! first.

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

use crate::document::{DocumentIdentifier, RetrievedDocument};

/// Answer to a question, attributed to source documents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Analysis {
    pub answer: String,
    pub sources: Vec<SourceAttribution>,
}

/// A document that contributed to an [`Analysis`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceAttribution {
    pub identifier: DocumentIdentifier,
    pub title: String,
}

impl From<&RetrievedDocument> for SourceAttribution {
    fn from(document: &RetrievedDocument) -> Self {
        Self {
            identifier: document.identifier.clone(),
            title: document.title.clone(),
        }
    }
}

#[derive(Debug, Error)]
pub enum AnalysisError {
    /// Nothing retrieved, or nothing with usable text.
    #[error("no documents with usable text to analyze")]
    NoDocuments,

    #[error("analysis failed: {message}")]
    Failed { message: String },
}

/// Answers questions over retrieved documents.
#[async_trait]
pub trait Analyzer: Send + Sync {
    /// Answers `question` from `documents`.
    async fn analyze(
        &self,
        documents: &[RetrievedDocument],
        question: &str,
    ) -> Result<Analysis, AnalysisError>;
}
