//! Article-page heuristics: link discovery and text extraction.
//!
//! Each heuristic is a pure strategy over a parsed page. Strategies are tried
//! in list order until one yields a result, which keeps them testable without
//! any network code. Functions taking `&str` parse internally and return owned
//! values, so no parsed DOM is held across an await.

use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use url::Url;

/// A link-discovery heuristic.
pub type LinkStrategy = fn(&Html) -> Option<String>;

/// PDF link heuristics, most specific first. Href-based signals outrank the
/// class heuristic.
pub const PDF_LINK_STRATEGIES: [(&str, LinkStrategy); 4] = [
    ("manuscript_pdf_href", pdf_link_by_manuscript_href),
    ("any_pdf_href", pdf_link_by_extension),
    ("pdf_class", pdf_link_by_class),
    ("citation_pdf_meta", pdf_link_by_citation_meta),
];

/// Full-text (XML) link heuristics.
pub const FULL_TEXT_LINK_STRATEGIES: [(&str, LinkStrategy); 1] =
    [("xml_or_full_text_label", full_text_link_by_label)];

/// Content containers for text extraction, most specific first. The whole
/// document is used when none match.
pub const TEXT_CONTAINER_SELECTORS: [&str; 3] = ["div.jig-ncbiinpagenav", "article", "div.article"];

/// Separator between extracted blocks.
pub const BLOCK_SEPARATOR: &str = "\n\n";

/// Parses a selector literal; panics on an invalid one.
pub(crate) fn compile_static_selector(css: &str) -> Selector {
    Selector::parse(css).unwrap_or_else(|e| panic!("invalid static selector '{css}': {e:?}"))
}

fn compile_static_regex(pattern: &str) -> Regex {
    Regex::new(pattern).unwrap_or_else(|e| panic!("invalid static regex '{pattern}': {e}"))
}

static ANCHOR: LazyLock<Selector> = LazyLock::new(|| compile_static_selector("a[href]"));
static CITATION_PDF: LazyLock<Selector> =
    LazyLock::new(|| compile_static_selector(r#"meta[name="citation_pdf_url"]"#));
static PARAGRAPH: LazyLock<Selector> = LazyLock::new(|| compile_static_selector("p"));
static HEADING: LazyLock<Selector> =
    LazyLock::new(|| compile_static_selector("h1, h2, h3, h4, h5, h6"));
static CONTAINERS: LazyLock<Vec<Selector>> = LazyLock::new(|| {
    TEXT_CONTAINER_SELECTORS
        .iter()
        .map(|css| compile_static_selector(css))
        .collect()
});

/// `.pdf` at the end of the path, optionally followed by a query or fragment.
static PDF_HREF_RE: LazyLock<Regex> =
    LazyLock::new(|| compile_static_regex(r"(?i)\.pdf(?:[?#].*)?$"));
/// Manuscript-id path fragments used by the archive (`nihms…`, `PMC…`).
static MANUSCRIPT_ID_RE: LazyLock<Regex> = LazyLock::new(|| compile_static_regex(r"nihms|PMC"));

/// False for empty, fragment-only, and `javascript:` hrefs.
fn is_navigational(href: &str) -> bool {
    !href.is_empty()
        && !href.starts_with('#')
        && !href.to_ascii_lowercase().starts_with("javascript:")
}

/// Anchors with an href that leads somewhere.
fn anchors(document: &Html) -> impl Iterator<Item = (ElementRef<'_>, &str)> {
    document.select(&ANCHOR).filter_map(|anchor| {
        let href = anchor.value().attr("href")?.trim();
        is_navigational(href).then_some((anchor, href))
    })
}

/// `<a href>` ending in `.pdf` whose path carries a manuscript id.
#[must_use]
pub fn pdf_link_by_manuscript_href(document: &Html) -> Option<String> {
    anchors(document)
        .find(|(_, href)| PDF_HREF_RE.is_match(href) && MANUSCRIPT_ID_RE.is_match(href))
        .map(|(_, href)| href.to_string())
}

/// Any `<a href>` whose class attribute mentions "pdf".
#[must_use]
pub fn pdf_link_by_class(document: &Html) -> Option<String> {
    anchors(document)
        .find(|(anchor, _)| {
            anchor
                .value()
                .classes()
                .any(|class| class.to_ascii_lowercase().contains("pdf"))
        })
        .map(|(_, href)| href.to_string())
}

/// `<meta name="citation_pdf_url" content=…>`.
#[must_use]
pub fn pdf_link_by_citation_meta(document: &Html) -> Option<String> {
    document
        .select(&CITATION_PDF)
        .filter_map(|meta| meta.value().attr("content"))
        .map(str::trim)
        .find(|content| is_navigational(content))
        .map(str::to_string)
}

/// Any `<a href>` ending in `.pdf`.
#[must_use]
pub fn pdf_link_by_extension(document: &Html) -> Option<String> {
    anchors(document)
        .find(|(_, href)| PDF_HREF_RE.is_match(href))
        .map(|(_, href)| href.to_string())
}

/// `<a href>` whose visible text mentions "xml" or "full text".
#[must_use]
pub fn full_text_link_by_label(document: &Html) -> Option<String> {
    anchors(document)
        .find(|(anchor, _)| {
            let label = anchor.text().collect::<String>().to_lowercase();
            label.contains("xml") || label.contains("full text")
        })
        .map(|(_, href)| href.to_string())
}

/// Applies `strategies` in order, returning the first hit and its name.
#[must_use]
pub fn first_link(document: &Html, strategies: &[(&'static str, LinkStrategy)]) -> Option<(&'static str, String)> {
    strategies
        .iter()
        .find_map(|(name, strategy)| strategy(document).map(|href| (*name, href)))
}

/// Finds a PDF href on an article page.
#[must_use]
pub fn find_pdf_link(html: &str) -> Option<(&'static str, String)> {
    first_link(&Html::parse_document(html), &PDF_LINK_STRATEGIES)
}

/// Finds an XML / full-text href on an article page.
#[must_use]
pub fn find_full_text_link(html: &str) -> Option<(&'static str, String)> {
    first_link(&Html::parse_document(html), &FULL_TEXT_LINK_STRATEGIES)
}

/// Extracts readable text from an article page.
///
/// Uses the most specific matching container, then collects paragraph text
/// followed by any headings not already present, each block separated by a
/// blank line.
#[must_use]
pub fn extract_article_text(html: &str) -> String {
    let document = Html::parse_document(html);
    let container = CONTAINERS
        .iter()
        .find_map(|selector| document.select(selector).next())
        .unwrap_or_else(|| document.root_element());

    let mut text = String::new();
    for paragraph in container.select(&PARAGRAPH) {
        let block = element_text(paragraph);
        if !block.is_empty() {
            text.push_str(&block);
            text.push_str(BLOCK_SEPARATOR);
        }
    }
    for heading in container.select(&HEADING) {
        let block = element_text(heading);
        if !block.is_empty() && !text.contains(&block) {
            text.push_str(&block);
            text.push_str(BLOCK_SEPARATOR);
        }
    }
    text
}

fn element_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Resolves an href found on `article_url` to an absolute URL.
///
/// Handles root-relative (`/pmc/...`), article-relative (`pdf/main.pdf`),
/// scheme-relative (`//cdn...`), and absolute forms. Fragment-only and
/// `javascript:` hrefs yield `None`.
#[must_use]
pub fn resolve_href(href: &str, article_url: &str) -> Option<String> {
    let href = href.trim();
    if !is_navigational(href) {
        return None;
    }
    if href.starts_with("http://") || href.starts_with("https://") {
        return Some(href.to_string());
    }
    let base = Url::parse(article_url).ok()?;
    if href.starts_with("//") {
        return Some(format!("{}:{href}", base.scheme()));
    }
    base.join(href).ok().map(|url| url.to_string())
}
