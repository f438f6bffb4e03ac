//! P0: refused connections, slow hosts, and mid-batch outages.
//! Assert every failure is reported per item and never aborts a batch.

use std::net::TcpListener;
use std::time::Duration;

use pmc_retriever::download;
use pmc_retriever::resolver::{self, ResolveError};
use pmc_retriever::{
    DocumentDescriptor, DocumentIdentifier, Endpoints, FailureKind, PacingPolicy, RetrieveError,
    Retriever, RetrieverConfig, SearchQuery, Selection, Session, SessionError, SkipStage, Timeouts,
};
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::support::{mount_search, mount_titled_metadata, test_config};

/// Base URL of a local port with nothing listening on it.
fn refused_base_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().expect("addr").port();
    drop(listener);
    format!("http://127.0.0.1:{port}")
}

fn short_timeouts() -> Timeouts {
    Timeouts {
        connect: Duration::from_secs(2),
        metadata: Duration::from_millis(300),
        download: Duration::from_millis(300),
    }
}

#[tokio::test]
async fn p0_connection_refused_exhausts_cascade_as_transport() {
    let temp_dir = TempDir::new().expect("temp dir");
    let base = refused_base_url();
    let config = RetrieverConfig::default()
        .with_endpoints(Endpoints::single_host(base.clone()))
        .with_output_dir(temp_dir.path())
        .with_pacing(PacingPolicy::none());
    let session = Session::new(&config).expect("session");
    let descriptor = DocumentDescriptor {
        identifier: DocumentIdentifier::new("1"),
        title: "Unreachable".to_string(),
        canonical_url: Endpoints::single_host(base).article_url("1"),
    };

    let err = download::download(&session, &descriptor, &config)
        .await
        .expect_err("nothing is listening");

    let RetrieveError::AllFormatsExhausted { attempts, .. } = &err else {
        panic!("expected AllFormatsExhausted, got {err:?}");
    };
    assert_eq!(attempts.len(), 3);
    assert!(attempts.iter().all(|a| a.kind == FailureKind::Transport));
}

#[tokio::test]
async fn p0_connection_refused_search_reports_failure() {
    let temp_dir = TempDir::new().expect("temp dir");
    let config = RetrieverConfig::default()
        .with_endpoints(Endpoints::single_host(refused_base_url()))
        .with_output_dir(temp_dir.path())
        .with_pacing(PacingPolicy::none());
    let mut retriever = Retriever::new(config).expect("retriever");

    let report = retriever
        .search_and_download(&SearchQuery::new("anything", 5), &Selection::All)
        .await
        .expect("selection is valid");

    assert!(report.search_failure.is_some());
    assert!(report.candidates.is_empty());
}

#[tokio::test]
async fn p0_slow_metadata_times_out_per_identifier() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/efetch.fcgi"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("<pmc-articleset/>")
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;
    let temp_dir = TempDir::new().expect("temp dir");
    let config = test_config(&server, temp_dir.path()).with_timeouts(short_timeouts());
    let session = Session::new(&config).expect("session");

    let result = resolver::resolve(&session, &DocumentIdentifier::new("7")).await;

    assert!(
        matches!(
            result,
            Err(ResolveError::MetadataUnavailable {
                source: SessionError::Timeout { .. },
                ..
            })
        ),
        "{result:?}"
    );
}

#[tokio::test]
async fn p0_slow_pdf_falls_through_to_next_tier() {
    let server = MockServer::start().await;
    let temp_dir = TempDir::new().expect("temp dir");
    Mock::given(method("GET"))
        .and(path("/pmc/articles/PMC8/"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("<html></html>")
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;
    crate::support::mount_full_text(
        &server,
        "8",
        "xml",
        ResponseTemplate::new(200).set_body_string(crate::support::full_text_xml("Slow page")),
    )
    .await;
    let config = test_config(&server, temp_dir.path()).with_timeouts(short_timeouts());
    let session = Session::new(&config).expect("session");

    let document = download::download(
        &session,
        &crate::support::descriptor(&server, "8", "Slow page"),
        &config,
    )
    .await
    .expect("XML tier should succeed");

    assert_eq!(document.failed_tiers[0].kind, FailureKind::Transport);
    assert!(document.failed_tiers[0].detail.contains("timeout"));
}

#[tokio::test]
async fn p0_metadata_outage_mid_batch_keeps_remaining_items() {
    let server = MockServer::start().await;
    mount_search(&server, &["1", "2", "3"]).await;
    mount_titled_metadata(&server, "1", "Before").await;
    Mock::given(method("GET"))
        .and(path("/efetch.fcgi"))
        .and(wiremock::matchers::query_param("id", "2"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;
    mount_titled_metadata(&server, "3", "After").await;
    let temp_dir = TempDir::new().expect("temp dir");
    let mut retriever = Retriever::new(test_config(&server, temp_dir.path())).expect("retriever");

    let ids: Vec<DocumentIdentifier> = ["1", "2", "3"].into_iter().map(DocumentIdentifier::new).collect();
    let batch = retriever.describe_all(&ids).await;

    assert_eq!(batch.descriptors.len(), 2);
    assert_eq!(batch.descriptors[1].title, "After");
    assert_eq!(batch.skipped[0].stage, SkipStage::Metadata);
}
