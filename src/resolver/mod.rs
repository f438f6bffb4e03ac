//! Identifier search and metadata resolution against the E-utilities API.
//!
//! - [`search`] turns a [`SearchQuery`](crate::SearchQuery) into ordered
//!   [`DocumentIdentifier`](crate::DocumentIdentifier)s.
//! - [`resolve`] turns one identifier into a
//!   [`DocumentDescriptor`](crate::DocumentDescriptor).
//!
//! Both take the session by reference; neither paces itself. Batch pacing is
//! the caller's job (see [`Retriever`](crate::Retriever)).
//!
//! # Example
//!
//! ```no_run
//! use pmc_retriever::{RetrieverConfig, SearchQuery, Session};
//! use pmc_retriever::resolver;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let session = Session::new(&RetrieverConfig::default())?;
//! let outcome = resolver::search(&session, &SearchQuery::new("CRISPR off-target", 5)).await;
//! for id in &outcome.identifiers {
//!     let descriptor = resolver::resolve(&session, id).await?;
//!     println!("{}: {}", descriptor.identifier, descriptor.title);
//! }
//! # Ok(())
//! # }
//! ```

mod error;
mod metadata;
mod search;

pub use error::ResolveError;
pub use metadata::resolve;
pub use search::{SearchOutcome, search};
