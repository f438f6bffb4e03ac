//! P0: log and error exposure.
//! Assert the API key never appears in error messages or reports.

use pmc_retriever::resolver;
use pmc_retriever::{
    DocumentIdentifier, Endpoints, PacingPolicy, Retriever, RetrieverConfig, SearchQuery,
    Selection, Session,
};
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::support::test_config;

const SECRET: &str = "secret-api-key-123";

#[tokio::test]
async fn p0_status_error_does_not_contain_api_key() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/efetch.fcgi"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    let temp_dir = TempDir::new().expect("temp dir");
    let config = test_config(&server, temp_dir.path()).with_api_key(Some(SECRET.to_string()));
    let session = Session::new(&config).expect("session");

    let err = resolver::resolve(&session, &DocumentIdentifier::new("1"))
        .await
        .expect_err("500 should fail");

    let msg = format!("{err} / {err:?}");
    assert!(!msg.contains(SECRET), "error must not contain API key: {msg}");
    assert!(msg.contains("api_key=***"), "masked key expected in: {msg}");
}

#[tokio::test]
async fn p0_network_error_does_not_contain_api_key() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().expect("addr").port();
    drop(listener);

    let temp_dir = TempDir::new().expect("temp dir");
    let config = RetrieverConfig::default()
        .with_endpoints(Endpoints::single_host(format!("http://127.0.0.1:{port}")))
        .with_output_dir(temp_dir.path())
        .with_pacing(PacingPolicy::none())
        .with_api_key(Some(SECRET.to_string()));
    let mut retriever = Retriever::new(config).expect("retriever");

    let report = retriever
        .search_and_download(&SearchQuery::new("q", 1), &Selection::All)
        .await
        .expect("selection is valid");

    let failure = report.search_failure.expect("search should fail");
    assert!(!failure.contains(SECRET), "search failure leaked key: {failure}");
}

#[test]
fn p0_config_debug_does_not_contain_api_key() {
    let config = RetrieverConfig::default().with_api_key(Some(SECRET.to_string()));
    let rendered = format!("{config:?}");
    assert!(!rendered.contains(SECRET), "Debug leaked key: {rendered}");
}
