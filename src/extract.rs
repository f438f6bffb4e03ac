//! Plain-text extraction from retrieved files, for downstream analysis.
//!
//! Format is sniffed from the extension and the leading bytes:
//!
//! - JATS XML: section titles and paragraphs under `<body>`, or all text
//!   when there is no body
//! - HTML: paragraph text, or all non-script text when there are no paragraphs
//! - anything else: the file as UTF-8 (lossy)
//!
//! PDFs are not parsed.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use quick_xml::Reader;
use quick_xml::events::Event;
use scraper::{Html, Selector};
use thiserror::Error;
use tracing::{debug, instrument};

use crate::document::{DocumentIdentifier, RetrievedDocument};
use crate::download::scrape::{BLOCK_SEPARATOR, compile_static_selector};
use crate::download::validation::PDF_SIGNATURE;

/// Documents with less text than this are not worth analyzing.
pub const MIN_ANALYSIS_CHARS: usize = 500;

/// Per-document cap on text handed to an analyzer.
pub const MAX_ANALYSIS_CHARS: usize = 20_000;

const TRUNCATION_MARKER: &str = "\n[... truncated ...]";

static PARAGRAPH: LazyLock<Selector> = LazyLock::new(|| compile_static_selector("p"));

/// Errors from reading or decoding a retrieved file.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed XML in {path}: {reason}")]
    MalformedXml { path: PathBuf, reason: String },

    /// Binary formats with no text layer this crate can read.
    #[error("cannot extract text from {path}: {format} is not supported")]
    Unsupported { path: PathBuf, format: &'static str },
}

/// Text prepared for an analyzer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentText {
    pub identifier: DocumentIdentifier,
    pub title: String,
    pub text: String,
}

/// Reads `path` and returns its readable text.
///
/// # Errors
///
/// Returns [`ExtractError`] if the file cannot be read, is a PDF, or is XML
/// that does not parse.
#[instrument(skip(path), fields(path = %path.display()))]
pub async fn extract_text(path: &Path) -> Result<String, ExtractError> {
    let bytes = tokio::fs::read(path).await.map_err(|source| ExtractError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    if bytes.starts_with(PDF_SIGNATURE) {
        return Err(ExtractError::Unsupported {
            path: path.to_path_buf(),
            format: "PDF",
        });
    }

    let content = String::from_utf8_lossy(&bytes);
    let is_xml_extension = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("xml"));

    let text = if is_xml_extension || head(&content, 100).contains("<?xml") {
        extract_xml_text(&content).map_err(|reason| ExtractError::MalformedXml {
            path: path.to_path_buf(),
            reason,
        })?
    } else if head(&content, 500).to_ascii_lowercase().contains("<html") {
        extract_html_text(&content)
    } else {
        content.into_owned()
    };

    debug!(chars = text.chars().count(), "text extracted");
    Ok(text)
}

/// Extracts text from each document, skipping those with too little text and
/// truncating long ones.
///
/// Documents that fail extraction are skipped and logged.
pub async fn prepare_for_analysis(documents: &[RetrievedDocument]) -> Vec<DocumentText> {
    let mut prepared = Vec::with_capacity(documents.len());
    for document in documents {
        let text = match extract_text(&document.local_path).await {
            Ok(text) => text,
            Err(error) => {
                debug!(identifier = %document.identifier, error = %error, "skipping document");
                continue;
            }
        };
        if text.chars().count() < MIN_ANALYSIS_CHARS {
            debug!(identifier = %document.identifier, "skipping document with too little text");
            continue;
        }
        prepared.push(DocumentText {
            identifier: document.identifier.clone(),
            title: document.title.clone(),
            text: truncate_chars(text, MAX_ANALYSIS_CHARS),
        });
    }
    prepared
}

fn head(content: &str, max_bytes: usize) -> &str {
    let mut end = content.len().min(max_bytes);
    while !content.is_char_boundary(end) {
        end -= 1;
    }
    &content[..end]
}

fn truncate_chars(text: String, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}{TRUNCATION_MARKER}", &text[..cut]),
        None => text,
    }
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Section titles and paragraphs under `<body>`, in document order.
fn extract_xml_text(xml: &str) -> Result<String, String> {
    let mut reader = Reader::from_str(xml);

    let mut in_body = false;
    let mut seen_body = false;
    let mut capture_depth = 0usize;
    let mut current = String::new();
    let mut blocks: Vec<String> = Vec::new();
    let mut all_text = String::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"body" => {
                    in_body = true;
                    seen_body = true;
                }
                b"p" | b"title" if in_body => capture_depth += 1,
                _ => {}
            },
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"body" => in_body = false,
                b"p" | b"title" if in_body && capture_depth > 0 => {
                    capture_depth -= 1;
                    if capture_depth == 0 {
                        let block = collapse_whitespace(&current);
                        if !block.is_empty() {
                            blocks.push(block);
                        }
                        current.clear();
                    }
                }
                _ => {}
            },
            Ok(Event::Text(e)) => {
                let text = e
                    .unescape()
                    .map_or_else(|_| String::from_utf8_lossy(&e).into_owned(), |t| t.into_owned());
                if capture_depth > 0 {
                    current.push_str(&text);
                }
                all_text.push_str(&text);
                all_text.push(' ');
            }
            Ok(Event::CData(e)) => {
                let text = String::from_utf8_lossy(&e);
                if capture_depth > 0 {
                    current.push_str(&text);
                }
                all_text.push_str(&text);
                all_text.push(' ');
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(format!(
                    "XML error at position {}: {e}",
                    reader.buffer_position()
                ));
            }
            Ok(_) => {}
        }
    }

    if seen_body {
        Ok(blocks.join(BLOCK_SEPARATOR))
    } else {
        Ok(collapse_whitespace(&all_text))
    }
}

/// Paragraph text, or all visible text when the page has no paragraphs.
fn extract_html_text(html: &str) -> String {
    let document = Html::parse_document(html);
    let paragraphs: Vec<String> = document
        .select(&PARAGRAPH)
        .map(|p| collapse_whitespace(&p.text().collect::<String>()))
        .filter(|block| !block.is_empty())
        .collect();
    if !paragraphs.is_empty() {
        return paragraphs.join(BLOCK_SEPARATOR);
    }

    let visible: Vec<&str> = document
        .root_element()
        .descendants()
        .filter_map(|node| {
            let text = node.value().as_text()?;
            let parent = node.parent()?.value().as_element()?;
            (!matches!(parent.name(), "script" | "style")).then_some(&**text)
        })
        .collect();
    collapse_whitespace(&visible.join(" "))
}
