//! End-to-end batch tests: search, describe, select, download.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use pmc_retriever::extract::prepare_for_analysis;
use pmc_retriever::{
    Analysis, AnalysisError, Analyzer, DocumentIdentifier, PacingPolicy, Representation,
    RetrievedDocument, Retriever, SearchQuery, Selection, SelectionError, SkipStage,
    SourceAttribution,
};
use tempfile::TempDir;
use tokio_test::assert_ok;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

mod support;
use support::{
    article_page, article_path, descriptor, full_text_xml, mount_article_page, mount_full_text,
    mount_metadata, mount_pdf_success, mount_search, mount_titled_metadata, pdf_body, test_config,
};

#[tokio::test]
async fn test_describe_all_skips_failures_and_keeps_order() {
    let server = MockServer::start().await;
    for (id, title) in [("1", "One"), ("2", "Two"), ("4", "Four"), ("5", "Five")] {
        mount_titled_metadata(&server, id, title).await;
    }
    mount_metadata(&server, "3", ResponseTemplate::new(500)).await;
    let temp_dir = TempDir::new().expect("failed to create temp dir");
    let mut retriever = assert_ok!(Retriever::new(test_config(&server, temp_dir.path())));

    let ids: Vec<DocumentIdentifier> = ["1", "2", "3", "4", "5"]
        .into_iter()
        .map(DocumentIdentifier::new)
        .collect();
    let batch = retriever.describe_all(&ids).await;

    let titles: Vec<&str> = batch.descriptors.iter().map(|d| d.title.as_str()).collect();
    assert_eq!(titles, ["One", "Two", "Four", "Five"]);
    assert_eq!(batch.skipped.len(), 1);
    assert_eq!(batch.skipped[0].identifier.as_str(), "3");
    assert_eq!(batch.skipped[0].stage, SkipStage::Metadata);
    assert!(batch.skipped[0].reason.contains("500"), "{}", batch.skipped[0].reason);
}

#[tokio::test]
async fn test_search_and_download_reports_partial_results() {
    let server = MockServer::start().await;
    mount_search(&server, &["10", "11"]).await;
    mount_titled_metadata(&server, "10", "Works").await;
    mount_titled_metadata(&server, "11", "Broken").await;
    mount_pdf_success(&server, "10").await;
    // Nothing mounted for PMC11's cascade: every tier sees a 404.

    let temp_dir = TempDir::new().expect("failed to create temp dir");
    let mut retriever = assert_ok!(Retriever::new(test_config(&server, temp_dir.path())));
    let report = assert_ok!(
        retriever
            .search_and_download(&SearchQuery::new("sleep", 5), &Selection::All)
            .await
    );

    assert!(report.search_failure.is_none());
    assert_eq!(report.candidates.len(), 2);
    assert_eq!(report.retrieved.len(), 1);
    assert_eq!(report.retrieved[0].identifier.as_str(), "10");
    assert_eq!(report.retrieved[0].representation_kind, Representation::Pdf);
    assert!(report.retrieved[0].local_path.exists());

    assert_eq!(report.skipped.len(), 1);
    assert_eq!(report.skipped[0].identifier.as_str(), "11");
    assert_eq!(report.skipped[0].stage, SkipStage::Download);
    assert!(report.skipped[0].reason.contains("all formats exhausted"));
    assert_eq!(report.antibot_blocked(), 0);
}

#[tokio::test]
async fn test_search_failure_yields_empty_report() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/esearch.fcgi"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&server)
        .await;
    let temp_dir = TempDir::new().expect("failed to create temp dir");
    let mut retriever = assert_ok!(Retriever::new(test_config(&server, temp_dir.path())));

    let report = assert_ok!(
        retriever
            .search_and_download(&SearchQuery::new("anything", 3), &Selection::All)
            .await
    );

    assert!(report.search_failure.is_some());
    assert!(report.candidates.is_empty());
    assert!(report.retrieved.is_empty());
    assert!(report.skipped.is_empty());
}

#[tokio::test]
async fn test_out_of_range_selection_downloads_nothing() {
    let server = MockServer::start().await;
    mount_search(&server, &["20", "21"]).await;
    mount_titled_metadata(&server, "20", "A").await;
    mount_titled_metadata(&server, "21", "B").await;
    Mock::given(method("GET"))
        .and(path("/pmc/articles/PMC20/"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let temp_dir = TempDir::new().expect("failed to create temp dir");
    let mut retriever = assert_ok!(Retriever::new(test_config(&server, temp_dir.path())));
    let result = retriever
        .search_and_download(&SearchQuery::new("q", 2), &Selection::Indices(vec![1, 3]))
        .await;

    assert_eq!(
        result.map(|report| report.retrieved.len()),
        Err(SelectionError::OutOfRange {
            index: 3,
            available: 2
        })
    );
}

#[tokio::test]
async fn test_selected_subset_downloads_in_selection_order() {
    let server = MockServer::start().await;
    let temp_dir = TempDir::new().expect("failed to create temp dir");
    for id in ["30", "31", "32"] {
        mount_pdf_success(&server, id).await;
    }
    let descriptors = vec![
        descriptor(&server, "30", "First"),
        descriptor(&server, "31", "Second"),
        descriptor(&server, "32", "Third"),
    ];

    let mut retriever = assert_ok!(Retriever::new(test_config(&server, temp_dir.path())));
    let batch = assert_ok!(
        retriever
            .download_selected(&descriptors, &Selection::Indices(vec![3, 1]))
            .await
    );

    let ids: Vec<&str> = batch.retrieved.iter().map(|d| d.identifier.as_str()).collect();
    assert_eq!(ids, ["32", "30"]);
    assert!(!temp_dir.path().join("PMC31_Second.pdf").exists());
}

#[tokio::test]
async fn test_downloads_are_paced() {
    let server = MockServer::start().await;
    let temp_dir = TempDir::new().expect("failed to create temp dir");
    for id in ["40", "41", "42"] {
        mount_pdf_success(&server, id).await;
    }
    let descriptors = vec![
        descriptor(&server, "40", "A"),
        descriptor(&server, "41", "B"),
        descriptor(&server, "42", "C"),
    ];
    let config = test_config(&server, temp_dir.path()).with_pacing(PacingPolicy {
        metadata_delay: Duration::ZERO,
        download_delay: Duration::from_millis(200),
    });
    let mut retriever = assert_ok!(Retriever::new(config));

    let started = Instant::now();
    let batch = assert_ok!(retriever.download_selected(&descriptors, &Selection::All).await);

    assert_eq!(batch.retrieved.len(), 3);
    // Two gaps between three cascades.
    assert!(
        started.elapsed() >= Duration::from_millis(400),
        "elapsed {:?}",
        started.elapsed()
    );
    assert!(retriever.pacer().cumulative_delay() > Duration::ZERO);
}

#[tokio::test]
async fn test_full_delay_follows_a_slow_download() {
    let server = MockServer::start().await;
    let temp_dir = TempDir::new().expect("failed to create temp dir");
    for id in ["60", "61"] {
        let pdf_path = format!("{}pdf/nihms-{id}.pdf", article_path(id));
        mount_article_page(
            &server,
            id,
            &article_page(&format!(r#"<a href="{pdf_path}">PDF</a>"#)),
        )
        .await;
        Mock::given(method("GET"))
            .and(path(pdf_path.as_str()))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_bytes(pdf_body(4096))
                    .set_delay(Duration::from_millis(300)),
            )
            .mount(&server)
            .await;
    }
    let descriptors = vec![descriptor(&server, "60", "A"), descriptor(&server, "61", "B")];
    let config = test_config(&server, temp_dir.path()).with_pacing(PacingPolicy {
        metadata_delay: Duration::ZERO,
        download_delay: Duration::from_millis(200),
    });
    let mut retriever = assert_ok!(Retriever::new(config));

    let started = Instant::now();
    let batch = assert_ok!(retriever.download_selected(&descriptors, &Selection::All).await);

    assert_eq!(batch.retrieved.len(), 2);
    // Two slow cascades plus the idle gap between them.
    assert!(
        started.elapsed() >= Duration::from_millis(800),
        "elapsed {:?}",
        started.elapsed()
    );
}

/// Answers with the titles of documents that have enough text to read.
struct ReadableTitles;

#[async_trait]
impl Analyzer for ReadableTitles {
    async fn analyze(
        &self,
        documents: &[RetrievedDocument],
        question: &str,
    ) -> Result<Analysis, AnalysisError> {
        let prepared = prepare_for_analysis(documents).await;
        if prepared.is_empty() {
            return Err(AnalysisError::NoDocuments);
        }
        let titles: Vec<&str> = prepared.iter().map(|d| d.title.as_str()).collect();
        Ok(Analysis {
            answer: format!("{question} -> {}", titles.join("; ")),
            sources: documents
                .iter()
                .filter(|d| prepared.iter().any(|p| p.identifier == d.identifier))
                .map(SourceAttribution::from)
                .collect(),
        })
    }
}

#[tokio::test]
async fn test_report_answer_uses_retrieved_text() {
    let server = MockServer::start().await;
    mount_search(&server, &["50"]).await;
    mount_titled_metadata(&server, "50", "Fasting and cognition").await;
    mount_full_text(
        &server,
        "50",
        "xml",
        ResponseTemplate::new(200).set_body_string(full_text_xml("Fasting and cognition")),
    )
    .await;

    let temp_dir = TempDir::new().expect("failed to create temp dir");
    let mut retriever = assert_ok!(Retriever::new(test_config(&server, temp_dir.path())));
    let report = assert_ok!(
        retriever
            .search_and_download(&SearchQuery::new("fasting", 1), &Selection::All)
            .await
    );
    assert_eq!(report.retrieved[0].representation_kind, Representation::Xml);

    let analysis = assert_ok!(report.answer(&ReadableTitles, "What helps?").await);
    assert_eq!(analysis.answer, "What helps? -> Fasting and cognition");
    assert_eq!(analysis.sources.len(), 1);
    assert_eq!(analysis.sources[0].identifier.as_str(), "50");
}

#[tokio::test]
async fn test_report_answer_without_documents() {
    let report = pmc_retriever::RetrievalReport::default();
    let result = report.answer(&ReadableTitles, "Anything?").await;
    assert!(matches!(result, Err(AnalysisError::NoDocuments)));
}
