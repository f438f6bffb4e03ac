//! Format-cascade downloading of full-text documents.
//!
//! [`download`] walks PDF → XML → plain text for one
//! [`DocumentDescriptor`](crate::DocumentDescriptor), validating every body
//! before it is written, and returns which tier actually succeeded.
//!
//! # Example
//!
//! ```no_run
//! use pmc_retriever::{DocumentIdentifier, RetrieverConfig, Session};
//! use pmc_retriever::{download, resolver};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = RetrieverConfig::default().with_output_dir("./papers");
//! let session = Session::new(&config)?;
//! let descriptor = resolver::resolve(&session, &DocumentIdentifier::new("PMC1234567")).await?;
//! let document = download::download(&session, &descriptor, &config).await?;
//! println!("{} saved as {}", document.identifier, document.representation_kind);
//! # Ok(())
//! # }
//! ```

mod cascade;
mod error;
pub mod filename;
pub mod scrape;
mod store;
pub mod validation;

pub use cascade::download;
pub use error::{FailureKind, RetrieveError, TierAttempt, TierFailure};
pub use filename::document_filename;
pub use validation::{ValidationVerdict, VerdictReason, validate};
