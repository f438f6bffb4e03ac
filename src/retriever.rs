//! Session-level orchestration: search, describe, select, download.
//!
//! A [`Retriever`] exclusively owns one [`Session`] and one [`Pacer`]. Batch
//! operations take `&mut self`, so the pacing clock and the cookie context
//! cannot be driven from two places at once. Per-item failures are collected
//! into the returned report and never abort a batch.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use thiserror::Error;
use tracing::{info, instrument, warn};

use crate::analysis::{Analysis, AnalysisError, Analyzer};
use crate::config::{ConfigError, RetrieverConfig};
use crate::document::{DocumentDescriptor, DocumentIdentifier, RetrievedDocument, SearchQuery};
use crate::download::{self, RetrieveError};
use crate::pacing::{Pacer, RequestClass};
use crate::resolver::{self, ResolveError, SearchOutcome};
use crate::session::{Session, SessionError};

/// Failure to set up a retriever.
#[derive(Debug, Error)]
pub enum SetupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Session(#[from] SessionError),
}

/// Which described documents to download.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Selection {
    #[default]
    All,
    /// 1-based positions in the described list, in download order.
    Indices(Vec<usize>),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SelectionError {
    #[error("selection is empty")]
    Empty,

    #[error("invalid selection '{token}': expected 'all' or comma-separated numbers")]
    NotANumber { token: String },

    #[error("selection {index} out of range: choose between 1 and {available}")]
    OutOfRange { index: usize, available: usize },
}

impl FromStr for Selection {
    type Err = SelectionError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let input = input.trim();
        if input.is_empty() {
            return Err(SelectionError::Empty);
        }
        if input.eq_ignore_ascii_case("all") {
            return Ok(Self::All);
        }
        input
            .split(',')
            .map(str::trim)
            .map(|token| {
                token.parse::<usize>().map_err(|_| SelectionError::NotANumber {
                    token: token.to_string(),
                })
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Self::Indices)
    }
}

impl fmt::Display for Selection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => f.write_str("all"),
            Self::Indices(indices) => {
                let joined: Vec<String> = indices.iter().map(ToString::to_string).collect();
                f.write_str(&joined.join(","))
            }
        }
    }
}

impl Selection {
    /// Converts to 0-based positions into a list of `available` items.
    ///
    /// Repeated indices are kept once, at their first position.
    ///
    /// # Errors
    ///
    /// Returns [`SelectionError::OutOfRange`] for `0` or any index past the end.
    pub fn resolve(&self, available: usize) -> Result<Vec<usize>, SelectionError> {
        match self {
            Self::All => Ok((0..available).collect()),
            Self::Indices(indices) => {
                if indices.is_empty() {
                    return Err(SelectionError::Empty);
                }
                let mut positions = Vec::with_capacity(indices.len());
                for &index in indices {
                    if index == 0 || index > available {
                        return Err(SelectionError::OutOfRange { index, available });
                    }
                    if !positions.contains(&(index - 1)) {
                        positions.push(index - 1);
                    }
                }
                Ok(positions)
            }
        }
    }
}

/// Stage at which an identifier dropped out of a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipStage {
    Metadata,
    Download,
}

/// An identifier left out of a batch, and why.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Skipped {
    pub identifier: DocumentIdentifier,
    pub stage: SkipStage,
    pub reason: String,
    /// True when an anti-bot challenge blocked at least one tier.
    pub blocked_by_antibot: bool,
}

impl Skipped {
    fn metadata(identifier: &DocumentIdentifier, error: &ResolveError) -> Self {
        Self {
            identifier: identifier.clone(),
            stage: SkipStage::Metadata,
            reason: error.to_string(),
            blocked_by_antibot: false,
        }
    }

    fn download(identifier: &DocumentIdentifier, error: &RetrieveError) -> Self {
        Self {
            identifier: identifier.clone(),
            stage: SkipStage::Download,
            reason: error.to_string(),
            blocked_by_antibot: error.hit_antibot_challenge(),
        }
    }
}

/// Descriptors for the identifiers that resolved, plus the ones that did not.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchResolution {
    /// Input order, minus skipped identifiers.
    pub descriptors: Vec<DocumentDescriptor>,
    pub skipped: Vec<Skipped>,
}

/// Documents downloaded from a list of descriptors.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchRetrieval {
    pub retrieved: Vec<RetrievedDocument>,
    pub skipped: Vec<Skipped>,
}

/// Outcome of one search-and-download run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RetrievalReport {
    pub query: String,
    /// Set when the search itself failed (the run is then empty).
    pub search_failure: Option<String>,
    /// Every described document, in search order, as listed for selection.
    pub candidates: Vec<DocumentDescriptor>,
    pub retrieved: Vec<RetrievedDocument>,
    /// Metadata and download failures, in the order they occurred.
    pub skipped: Vec<Skipped>,
}

impl RetrievalReport {
    /// Number of skipped documents blocked by an anti-bot challenge.
    #[must_use]
    pub fn antibot_blocked(&self) -> usize {
        self.skipped.iter().filter(|s| s.blocked_by_antibot).count()
            + self
                .retrieved
                .iter()
                .filter(|d| d.hit_antibot_challenge())
                .count()
    }

    /// Hands the retrieved documents and `question` to `analyzer`.
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::NoDocuments`] when nothing was retrieved, or
    /// whatever the analyzer reports.
    pub async fn answer(
        &self,
        analyzer: &dyn Analyzer,
        question: &str,
    ) -> Result<Analysis, AnalysisError> {
        if self.retrieved.is_empty() {
            return Err(AnalysisError::NoDocuments);
        }
        analyzer.analyze(&self.retrieved, question).await
    }
}

/// One retrieval session: HTTP context, pacing clock, and configuration.
#[derive(Debug)]
pub struct Retriever {
    session: Session,
    pacer: Pacer,
    config: RetrieverConfig,
}

impl Retriever {
    /// Validates `config` and opens a fresh session.
    ///
    /// # Errors
    ///
    /// Returns [`SetupError`] for invalid configuration or an HTTP client that
    /// cannot be built.
    pub fn new(config: RetrieverConfig) -> Result<Self, SetupError> {
        config.validate()?;
        let session = Session::new(&config)?;
        Ok(Self {
            session,
            pacer: Pacer::new(config.pacing),
            config,
        })
    }

    #[must_use]
    pub fn config(&self) -> &RetrieverConfig {
        &self.config
    }

    #[must_use]
    pub fn session(&self) -> &Session {
        &self.session
    }

    #[must_use]
    pub fn pacer(&self) -> &Pacer {
        &self.pacer
    }

    /// Searches for identifiers. Paced as a metadata request.
    ///
    /// Each paced call restamps its class clock on completion, so the gap
    /// before the next call of that class is idle time.
    pub async fn search(&mut self, query: &SearchQuery) -> SearchOutcome {
        self.pacer.wait(RequestClass::Metadata).await;
        let outcome = resolver::search(&self.session, query).await;
        self.pacer.mark_done(RequestClass::Metadata);
        outcome
    }

    /// Resolves one identifier. Paced as a metadata request.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError`] for this identifier only.
    pub async fn describe(
        &mut self,
        identifier: &DocumentIdentifier,
    ) -> Result<DocumentDescriptor, ResolveError> {
        self.pacer.wait(RequestClass::Metadata).await;
        let result = resolver::resolve(&self.session, identifier).await;
        self.pacer.mark_done(RequestClass::Metadata);
        result
    }

    /// Resolves every identifier in order, skipping the ones that fail.
    #[instrument(skip(self, identifiers), fields(count = identifiers.len()))]
    pub async fn describe_all(&mut self, identifiers: &[DocumentIdentifier]) -> BatchResolution {
        let mut batch = BatchResolution::default();
        for identifier in identifiers {
            match self.describe(identifier).await {
                Ok(descriptor) => batch.descriptors.push(descriptor),
                Err(error) => {
                    warn!(identifier = %identifier, error = %error, "skipping identifier");
                    batch.skipped.push(Skipped::metadata(identifier, &error));
                }
            }
        }
        info!(
            described = batch.descriptors.len(),
            skipped = batch.skipped.len(),
            "metadata resolution complete"
        );
        batch
    }

    /// Downloads one document through the format cascade. Paced as a download.
    ///
    /// # Errors
    ///
    /// Returns [`RetrieveError`] when no tier produced a valid file.
    pub async fn download(
        &mut self,
        descriptor: &DocumentDescriptor,
    ) -> Result<RetrievedDocument, RetrieveError> {
        self.pacer.wait(RequestClass::Download).await;
        let result = download::download(&self.session, descriptor, &self.config).await;
        self.pacer.mark_done(RequestClass::Download);
        result
    }

    /// Downloads the selected descriptors sequentially.
    ///
    /// # Errors
    ///
    /// Returns [`SelectionError`] before any request when the selection does
    /// not fit `descriptors`.
    #[instrument(skip(self, descriptors), fields(available = descriptors.len(), selection = %selection))]
    pub async fn download_selected(
        &mut self,
        descriptors: &[DocumentDescriptor],
        selection: &Selection,
    ) -> Result<BatchRetrieval, SelectionError> {
        let positions = selection.resolve(descriptors.len())?;
        let mut batch = BatchRetrieval::default();

        for (done, &position) in positions.iter().enumerate() {
            let descriptor = &descriptors[position];
            info!(
                position = done + 1,
                total = positions.len(),
                identifier = %descriptor.identifier,
                title = %descriptor.title,
                "downloading"
            );
            match self.download(descriptor).await {
                Ok(document) => batch.retrieved.push(document),
                Err(error) => {
                    warn!(identifier = %descriptor.identifier, error = %error, "download failed");
                    batch.skipped.push(Skipped::download(&descriptor.identifier, &error));
                }
            }
        }

        info!(
            retrieved = batch.retrieved.len(),
            skipped = batch.skipped.len(),
            output_dir = %self.config.output_dir.display(),
            "downloads complete"
        );
        Ok(batch)
    }

    /// Search, describe, select, and download in one run.
    ///
    /// A failed search or an empty result yields an empty report, not an error.
    ///
    /// # Errors
    ///
    /// Returns [`SelectionError`] when `selection` does not fit the described
    /// documents; nothing is downloaded in that case.
    #[instrument(skip(self, query, selection), fields(term = %query.term))]
    pub async fn search_and_download(
        &mut self,
        query: &SearchQuery,
        selection: &Selection,
    ) -> Result<RetrievalReport, SelectionError> {
        let mut report = RetrievalReport {
            query: query.term.clone(),
            ..RetrievalReport::default()
        };

        let outcome = self.search(query).await;
        if let Some(failure) = outcome.failure {
            report.search_failure = Some(failure.to_string());
            return Ok(report);
        }
        if outcome.is_empty() {
            info!("no results found");
            return Ok(report);
        }
        info!(results = outcome.len(), "describing search results");

        let resolution = self.describe_all(&outcome.identifiers).await;
        report.candidates = resolution.descriptors;
        report.skipped = resolution.skipped;
        if report.candidates.is_empty() {
            return Ok(report);
        }

        let downloads = self.download_selected(&report.candidates, selection).await?;
        report.retrieved = downloads.retrieved;
        report.skipped.extend(downloads.skipped);
        Ok(report)
    }
}
