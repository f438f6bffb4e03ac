//! Per-identifier metadata lookup via the E-utilities `efetch` endpoint.

use quick_xml::Reader;
use quick_xml::events::Event;
use tracing::{debug, instrument};

use super::ResolveError;
use crate::document::{DocumentDescriptor, DocumentIdentifier, UNKNOWN_TITLE};
use crate::pacing::RequestClass;
use crate::session::Session;

/// Result of scanning an efetch payload.
#[derive(Debug, PartialEq, Eq)]
enum ArticleScan {
    NoArticle,
    Article { title: Option<String> },
}

/// Resolves one identifier to a descriptor.
///
/// A missing title falls back to [`UNKNOWN_TITLE`]; a missing `article`
/// element is a failure for this identifier only.
///
/// # Errors
///
/// Returns [`ResolveError::MetadataUnavailable`], [`ResolveError::UpstreamMalformed`],
/// or [`ResolveError::ArticleMissing`].
#[instrument(skip(session), fields(identifier = %identifier))]
pub async fn resolve(
    session: &Session,
    identifier: &DocumentIdentifier,
) -> Result<DocumentDescriptor, ResolveError> {
    let url = session
        .eutils_url(
            &session.endpoints().fetch_url(),
            &[("id", identifier.as_str()), ("retmode", "xml")],
        )
        .map_err(|source| ResolveError::MetadataUnavailable {
            identifier: identifier.clone(),
            source,
        })?;

    let body = session
        .get_url(url, RequestClass::Metadata)
        .await
        .map_err(|source| ResolveError::MetadataUnavailable {
            identifier: identifier.clone(),
            source,
        })?;

    let title = match scan_article(&body.bytes)
        .map_err(|reason| ResolveError::upstream_malformed(identifier, reason))?
    {
        ArticleScan::NoArticle => {
            return Err(ResolveError::ArticleMissing {
                identifier: identifier.clone(),
            });
        }
        ArticleScan::Article { title } => title.unwrap_or_else(|| UNKNOWN_TITLE.to_string()),
    };

    debug!(title = %title, "resolved descriptor");
    Ok(DocumentDescriptor {
        identifier: identifier.clone(),
        title,
        canonical_url: session.article_url(identifier.as_str()),
    })
}

/// Finds the first `article` element and its first `article-title`.
///
/// Inline markup inside the title (`<italic>`, `<sup>`) is flattened and
/// whitespace collapsed.
fn scan_article(xml: &[u8]) -> Result<ArticleScan, String> {
    let mut reader = Reader::from_reader(xml);
    let mut buf = Vec::new();

    let mut in_article = false;
    let mut in_title = false;
    let mut title = String::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => match e.local_name().as_ref() {
                b"article" if !in_article => in_article = true,
                b"article-title" if in_article => in_title = true,
                _ => {}
            },
            Ok(Event::Empty(ref e)) => {
                if !in_article && e.local_name().as_ref() == b"article" {
                    return Ok(ArticleScan::Article { title: None });
                }
            }
            Ok(Event::Text(ref e)) if in_title => match e.unescape() {
                Ok(text) => title.push_str(&text),
                Err(_) => title.push_str(&String::from_utf8_lossy(e)),
            },
            Ok(Event::CData(ref e)) if in_title => {
                title.push_str(&String::from_utf8_lossy(e));
            }
            Ok(Event::End(ref e)) => match e.local_name().as_ref() {
                b"article-title" if in_title => break,
                b"article" if in_article => break,
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(format!(
                    "XML error at position {}: {e}",
                    reader.buffer_position()
                ));
            }
            Ok(_) => {}
        }
        buf.clear();
    }

    if !in_article {
        return Ok(ArticleScan::NoArticle);
    }
    let title = title.split_whitespace().collect::<Vec<_>>().join(" ");
    Ok(ArticleScan::Article {
        title: (!title.is_empty()).then_some(title),
    })
}
