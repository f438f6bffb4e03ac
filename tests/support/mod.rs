//! Shared mock-server fixtures for integration tests.
//!
//! Every test server plays both roles: E-utilities (`/esearch.fcgi`,
//! `/efetch.fcgi`) and the article site (`/pmc/articles/PMC<id>/`).

#![allow(dead_code)]

use std::path::Path;
use std::time::Duration;

use pmc_retriever::{
    DocumentDescriptor, DocumentIdentifier, Endpoints, PacingPolicy, RetrieverConfig, Timeouts,
};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Match, Mock, MockServer, Request, ResponseTemplate};

/// Matches efetch requests without `rettype` (metadata lookups).
struct NoRettype;

impl Match for NoRettype {
    fn matches(&self, request: &Request) -> bool {
        !request.url.query_pairs().any(|(key, _)| key == "rettype")
    }
}

/// Config pointed at `server`, writing into `output_dir`, with no pacing.
pub fn test_config(server: &MockServer, output_dir: &Path) -> RetrieverConfig {
    RetrieverConfig::default()
        .with_endpoints(Endpoints::single_host(server.uri()))
        .with_output_dir(output_dir)
        .with_pacing(PacingPolicy::none())
        .with_timeouts(Timeouts {
            connect: Duration::from_secs(5),
            metadata: Duration::from_secs(5),
            download: Duration::from_secs(5),
        })
}

pub fn descriptor(server: &MockServer, id: &str, title: &str) -> DocumentDescriptor {
    DocumentDescriptor {
        identifier: DocumentIdentifier::new(id),
        title: title.to_string(),
        canonical_url: Endpoints::single_host(server.uri()).article_url(id),
    }
}

pub fn article_path(id: &str) -> String {
    format!("/pmc/articles/PMC{id}/")
}

pub fn pdf_body(len: usize) -> Vec<u8> {
    let mut body = b"%PDF-1.7\n%test document\n".to_vec();
    body.resize(len, b'x');
    body
}

/// efetch metadata payload with one article.
pub fn metadata_xml(title: &str) -> String {
    format!(
        r#"<?xml version="1.0" ?>
<pmc-articleset><article article-type="research-article"><front><article-meta>
<title-group><article-title>{title}</article-title></title-group>
</article-meta></front></article></pmc-articleset>"#
    )
}

/// Full-text JATS payload comfortably above the XML minimum.
pub fn full_text_xml(title: &str) -> String {
    let paragraphs: String = (1..=30)
        .map(|n| format!("<p>Paragraph {n} reports results on the cohort in detail.</p>"))
        .collect();
    format!(
        r#"<?xml version="1.0" ?>
<pmc-articleset><article><front><article-meta><title-group>
<article-title>{title}</article-title></title-group></article-meta></front>
<body><sec><title>Results</title>{paragraphs}</sec></body></article></pmc-articleset>"#
    )
}

/// Plain text of at least `len` bytes.
pub fn long_text(len: usize) -> String {
    let mut text = String::new();
    while text.len() < len {
        text.push_str("The intervention reduced symptoms across all subgroups. ");
    }
    text
}

pub fn article_page(body: &str) -> String {
    format!(
        "<!DOCTYPE html><html><head><title>Article</title></head><body>\
         <div class=\"jig-ncbiinpagenav\">{body}</div></body></html>"
    )
}

pub async fn mount_search(server: &MockServer, ids: &[&str]) {
    let body = serde_json::json!({
        "header": {"type": "esearch"},
        "esearchresult": {"count": ids.len().to_string(), "idlist": ids}
    });
    Mock::given(method("GET"))
        .and(path("/esearch.fcgi"))
        .and(query_param("db", "pmc"))
        .and(query_param("retmode", "json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

pub async fn mount_metadata(server: &MockServer, id: &str, response: ResponseTemplate) {
    Mock::given(method("GET"))
        .and(path("/efetch.fcgi"))
        .and(query_param("id", id))
        .and(query_param("retmode", "xml"))
        .and(NoRettype)
        .respond_with(response)
        .mount(server)
        .await;
}

pub async fn mount_titled_metadata(server: &MockServer, id: &str, title: &str) {
    mount_metadata(
        server,
        id,
        ResponseTemplate::new(200).set_body_string(metadata_xml(title)),
    )
    .await;
}

/// efetch full-text response for the XML (`retmode = "xml"`) or text tier.
pub async fn mount_full_text(
    server: &MockServer,
    id: &str,
    retmode: &str,
    response: ResponseTemplate,
) {
    Mock::given(method("GET"))
        .and(path("/efetch.fcgi"))
        .and(query_param("id", id))
        .and(query_param("retmode", retmode))
        .and(query_param("rettype", "full"))
        .respond_with(response)
        .mount(server)
        .await;
}

pub async fn mount_page(server: &MockServer, route: &str, response: ResponseTemplate) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(response)
        .mount(server)
        .await;
}

pub async fn mount_article_page(server: &MockServer, id: &str, html: &str) {
    mount_page(
        server,
        &article_path(id),
        ResponseTemplate::new(200)
            .insert_header("Content-Type", "text/html; charset=utf-8")
            .set_body_string(html),
    )
    .await;
}

/// A PDF tier that succeeds: article page links to a valid PDF.
pub async fn mount_pdf_success(server: &MockServer, id: &str) -> Vec<u8> {
    let pdf_path = format!("{}pdf/nihms-{id}.pdf", article_path(id));
    mount_article_page(
        server,
        id,
        &article_page(&format!(r#"<a class="int-view" href="{pdf_path}">PDF (1.2M)</a>"#)),
    )
    .await;
    let body = pdf_body(4096);
    mount_page(
        server,
        &pdf_path,
        ResponseTemplate::new(200)
            .insert_header("Content-Type", "application/pdf")
            .set_body_bytes(body.clone()),
    )
    .await;
    body
}
