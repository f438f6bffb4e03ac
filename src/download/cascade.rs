//! The format cascade: PDF, then XML, then plain text.
//!
//! Each tier has a primary and a fallback strategy and reports either
//! validated bytes or a [`TierFailure`]. A failure moves the cascade to the
//! next tier; the first tier whose bytes pass validation and reach disk ends
//! it. The article page is fetched at most once per download and shared by
//! the tiers that scrape it.

use tracing::{debug, info, instrument, warn};

use super::error::{RetrieveError, TierAttempt, TierFailure};
use super::filename::document_filename;
use super::scrape;
use super::store;
use super::validation::{is_proof_of_work_challenge, validate_with_window};
use crate::config::{RetrieverConfig, ValidationThresholds};
use crate::document::{DocumentDescriptor, Representation, RetrievedDocument};
use crate::pacing::RequestClass;
use crate::session::Session;

/// Downloads one document through the cascade.
///
/// Does not pace itself; the caller waits between documents.
///
/// # Errors
///
/// Returns [`RetrieveError::AllFormatsExhausted`] with one record per tier
/// when nothing validated, or [`RetrieveError::OutputDirectory`] when the
/// output directory cannot be created.
#[instrument(skip(session, descriptor, config), fields(identifier = %descriptor.identifier))]
pub async fn download(
    session: &Session,
    descriptor: &DocumentDescriptor,
    config: &RetrieverConfig,
) -> Result<RetrievedDocument, RetrieveError> {
    store::ensure_output_dir(&config.output_dir).await?;

    let mut cascade = Cascade::new(session, descriptor, config.thresholds);
    let mut attempts = Vec::with_capacity(Representation::CASCADE.len());

    for tier in Representation::CASCADE {
        debug!(tier = %tier, "trying tier");
        let outcome = match cascade.attempt(tier).await {
            Ok(bytes) => {
                let filename = document_filename(
                    &descriptor.identifier,
                    &descriptor.title,
                    tier,
                    config.filename_max_chars,
                );
                store::write_document(&config.output_dir, &filename, &bytes).await
            }
            Err(failure) => Err(failure),
        };

        match outcome {
            Ok(local_path) => {
                info!(tier = %tier, path = %local_path.display(), "document retrieved");
                return Ok(RetrievedDocument {
                    identifier: descriptor.identifier.clone(),
                    title: descriptor.title.clone(),
                    local_path,
                    representation_kind: tier,
                    failed_tiers: attempts,
                });
            }
            Err(failure) if failure.is_antibot() => {
                warn!(
                    tier = %tier,
                    error = %failure,
                    article_url = %descriptor.canonical_url,
                    "blocked by anti-bot challenge, falling back"
                );
                attempts.push(TierAttempt::new(tier, &failure));
            }
            Err(failure) => {
                info!(tier = %tier, error = %failure, "tier failed, falling back");
                attempts.push(TierAttempt::new(tier, &failure));
            }
        }
    }

    warn!(article_url = %descriptor.canonical_url, "all formats exhausted");
    Err(RetrieveError::AllFormatsExhausted {
        identifier: descriptor.identifier.clone(),
        attempts,
    })
}

/// Per-download state shared across tiers.
struct Cascade<'a> {
    session: &'a Session,
    descriptor: &'a DocumentDescriptor,
    thresholds: ValidationThresholds,
    article_page: Option<String>,
}

impl<'a> Cascade<'a> {
    fn new(
        session: &'a Session,
        descriptor: &'a DocumentDescriptor,
        thresholds: ValidationThresholds,
    ) -> Self {
        Self {
            session,
            descriptor,
            thresholds,
            article_page: None,
        }
    }

    async fn attempt(&mut self, tier: Representation) -> Result<Vec<u8>, TierFailure> {
        match tier {
            Representation::Pdf => self.try_pdf().await,
            Representation::Xml => self.try_xml().await,
            Representation::Text => self.try_text().await,
        }
    }

    /// Article page scrape, then the linked PDF.
    async fn try_pdf(&mut self) -> Result<Vec<u8>, TierFailure> {
        let found = scrape::find_pdf_link(self.article_page().await?);
        let pdf_url = self.resolve_link(Representation::Pdf, found)?;

        let body = self.session.get(&pdf_url, RequestClass::Download).await?;
        if is_proof_of_work_challenge(&body.bytes) {
            return Err(TierFailure::antibot(pdf_url));
        }
        self.accept(
            Representation::Pdf,
            &body.final_url,
            body.content_type.as_deref(),
            body.bytes,
        )
    }

    /// efetch full XML, then a full-text link on the article page.
    async fn try_xml(&mut self) -> Result<Vec<u8>, TierFailure> {
        match self.fetch_full_text(Representation::Xml).await {
            Ok(bytes) => return Ok(bytes),
            Err(failure) => debug!(error = %failure, "efetch XML unusable, trying article page"),
        }

        let found = scrape::find_full_text_link(self.article_page().await?);
        let xml_url = self.resolve_link(Representation::Xml, found)?;
        let body = self.session.get(&xml_url, RequestClass::Metadata).await?;
        self.accept(
            Representation::Xml,
            &body.final_url,
            body.content_type.as_deref(),
            body.bytes,
        )
    }

    /// efetch full text, then text extracted from the article page.
    async fn try_text(&mut self) -> Result<Vec<u8>, TierFailure> {
        match self.fetch_full_text(Representation::Text).await {
            Ok(bytes) => return Ok(bytes),
            Err(failure) => debug!(error = %failure, "efetch text unusable, extracting from article page"),
        }

        let text = scrape::extract_article_text(self.article_page().await?);
        let page_url = self.descriptor.canonical_url.clone();
        self.accept(Representation::Text, &page_url, Some("text/html"), text.into_bytes())
    }

    async fn fetch_full_text(&self, tier: Representation) -> Result<Vec<u8>, TierFailure> {
        let retmode = match tier {
            Representation::Text => "text",
            Representation::Pdf | Representation::Xml => "xml",
        };
        let endpoint = self.session.endpoints().fetch_url();
        let url = self.session.eutils_url(
            &endpoint,
            &[
                ("id", self.descriptor.identifier.as_str()),
                ("retmode", retmode),
                ("rettype", "full"),
            ],
        )?;
        let body = self.session.get_url(url, RequestClass::Metadata).await?;
        self.accept(tier, &endpoint, body.content_type.as_deref(), body.bytes)
    }

    /// Fetches the article page on first use.
    async fn article_page(&mut self) -> Result<&str, TierFailure> {
        if self.article_page.is_none() {
            let descriptor = self.descriptor;
            let url = descriptor.canonical_url.as_str();
            let body = match self.session.get(url, RequestClass::Metadata).await {
                Ok(body) => body,
                Err(error) if error.is_forbidden() => {
                    warn!(url = %url, "article page forbidden; the host is blocking automated access");
                    return Err(error.into());
                }
                Err(error) => return Err(error.into()),
            };
            self.article_page = Some(body.text_lossy());
        }
        Ok(self.article_page.as_deref().unwrap_or_default())
    }

    fn resolve_link(
        &self,
        tier: Representation,
        found: Option<(&'static str, String)>,
    ) -> Result<String, TierFailure> {
        let page_url = &self.descriptor.canonical_url;
        let (strategy, href) = found.ok_or_else(|| TierFailure::link_not_found(tier, page_url))?;
        let url = scrape::resolve_href(&href, page_url)
            .ok_or_else(|| TierFailure::link_not_found(tier, page_url))?;
        debug!(tier = %tier, strategy, url = %url, "link found");
        Ok(url)
    }

    fn accept(
        &self,
        tier: Representation,
        url: &str,
        content_type: Option<&str>,
        bytes: Vec<u8>,
    ) -> Result<Vec<u8>, TierFailure> {
        let minimum = match tier {
            Representation::Pdf => self.thresholds.pdf_min_bytes,
            Representation::Xml => self.thresholds.xml_min_bytes,
            Representation::Text => self.thresholds.text_min_bytes,
        };
        let verdict = validate_with_window(&bytes, tier, minimum, self.thresholds.header_window);
        if verdict.is_valid {
            Ok(bytes)
        } else {
            debug!(
                tier = %tier,
                url,
                content_type = content_type.unwrap_or("unknown"),
                bytes = bytes.len(),
                reason = %verdict.reason,
                "validation rejected body"
            );
            Err(TierFailure::content_invalid(url, verdict.reason))
        }
    }
}
