//! PubMed Central retrieval client.
//!
//! Searches PMC through the NCBI E-utilities API, resolves each hit to a
//! title and article URL, and downloads full text through a format cascade
//! (PDF, then XML, then plain text). Every fetched body passes a validation
//! gate before it is written, so error pages and anti-bot interstitials never
//! land on disk as documents.
//!
//! # Architecture
//!
//! - [`session`] - per-session HTTP client, cookie jar, and browser identity
//! - [`pacing`] - minimum gaps between metadata and download requests
//! - [`resolver`] - search and per-identifier metadata resolution
//! - [`download`] - format cascade, validation gate, and filename policy
//! - [`retriever`] - batch orchestration with partial-result reporting
//! - [`extract`] - plain text from retrieved files
//! - [`analysis`] - seam for the downstream question-answering collaborator
//!
//! # Example
//!
//! ```no_run
//! use pmc_retriever::{Retriever, RetrieverConfig, SearchQuery, Selection};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = RetrieverConfig::default()
//!     .with_output_dir("./papers")
//!     .with_email(Some("me@example.org".to_string()));
//! let mut retriever = Retriever::new(config)?;
//!
//! let report = retriever
//!     .search_and_download(&SearchQuery::new("gut microbiome depression", 5), &Selection::All)
//!     .await?;
//! for document in &report.retrieved {
//!     println!("{} -> {}", document.identifier, document.local_path.display());
//! }
//! # Ok(())
//! # }
//! ```

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod analysis;
pub mod config;
pub mod document;
pub mod download;
pub mod extract;
pub mod pacing;
pub mod resolver;
pub mod retriever;
pub mod session;
pub mod user_agent;

// Re-export commonly used types
pub use analysis::{Analysis, AnalysisError, Analyzer, SourceAttribution};
pub use config::{ConfigError, Endpoints, RetrieverConfig, Timeouts, ValidationThresholds};
pub use document::{
    DocumentDescriptor, DocumentIdentifier, Representation, RetrievedDocument, SearchQuery,
};
pub use download::{FailureKind, RetrieveError, TierAttempt, TierFailure};
pub use extract::{ExtractError, extract_text};
pub use pacing::{Pacer, PacingPolicy, RequestClass};
pub use resolver::{ResolveError, SearchOutcome};
pub use retriever::{
    BatchResolution, BatchRetrieval, RetrievalReport, Retriever, Selection, SelectionError,
    SetupError, SkipStage, Skipped,
};
pub use session::{FetchedBody, Session, SessionError};
