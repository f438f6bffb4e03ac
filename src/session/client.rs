//! HTTP client construction for a session.
//!
//! Each session gets its own client and cookie jar. Some restricted sandbox
//! environments panic when reqwest queries system proxy settings; construction
//! catches that and retries with environment-variable proxies only.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::time::Duration;

use reqwest::cookie::Jar;
use reqwest::{Client, ClientBuilder, Proxy};
use tracing::warn;

use super::SessionError;
use crate::user_agent::{BROWSER_USER_AGENT, browser_default_headers};

/// Maximum redirects followed (PDF links bounce through a CDN).
const MAX_REDIRECTS: usize = 10;

enum BuildClientFailure {
    Panic,
    Build(reqwest::Error),
}

/// Builds the session client with browser identity, cookies, and connect timeout.
///
/// Total request timeouts are applied per request by class, not here.
///
/// # Errors
///
/// Returns [`SessionError::ClientBuild`] when construction fails.
pub(crate) fn build_session_client(
    cookie_jar: Arc<Jar>,
    connect_timeout: Duration,
) -> Result<Client, SessionError> {
    match try_build_client(Arc::clone(&cookie_jar), connect_timeout, false) {
        Ok(client) => Ok(client),
        Err(BuildClientFailure::Panic) => {
            warn!("session client hit system proxy panic; using env-proxy fallback builder");
            match try_build_client(cookie_jar, connect_timeout, true) {
                Ok(client) => Ok(client),
                Err(BuildClientFailure::Panic) => Err(SessionError::client_build(
                    "builder panicked while applying env-proxy fallback",
                )),
                Err(BuildClientFailure::Build(error)) => {
                    Err(SessionError::client_build(error.to_string()))
                }
            }
        }
        Err(BuildClientFailure::Build(error)) => Err(SessionError::client_build(error.to_string())),
    }
}

fn try_build_client(
    cookie_jar: Arc<Jar>,
    connect_timeout: Duration,
    disable_system_proxy_lookup: bool,
) -> Result<Client, BuildClientFailure> {
    catch_unwind(AssertUnwindSafe(move || {
        let mut builder = base_builder(cookie_jar, connect_timeout);
        if disable_system_proxy_lookup {
            builder = apply_env_proxy_fallback(builder.no_proxy());
        }
        builder.build().map_err(BuildClientFailure::Build)
    }))
    .map_err(|_| BuildClientFailure::Panic)?
}

fn base_builder(cookie_jar: Arc<Jar>, connect_timeout: Duration) -> ClientBuilder {
    Client::builder()
        .connect_timeout(connect_timeout)
        .user_agent(BROWSER_USER_AGENT)
        .default_headers(browser_default_headers())
        .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
        .gzip(true)
        .cookie_provider(cookie_jar)
}

fn apply_env_proxy_fallback(mut builder: ClientBuilder) -> ClientBuilder {
    if let Some(proxy) = env_proxy_for_scheme("https")
        && let Ok(resolved) = Proxy::https(&proxy)
    {
        builder = builder.proxy(resolved);
    }
    if let Some(proxy) = env_proxy_for_scheme("http")
        && let Ok(resolved) = Proxy::http(&proxy)
    {
        builder = builder.proxy(resolved);
    }
    builder
}

fn env_proxy_for_scheme(scheme: &str) -> Option<String> {
    match scheme {
        "https" => find_first_proxy_var(&["HTTPS_PROXY", "https_proxy", "ALL_PROXY", "all_proxy"]),
        "http" => find_first_proxy_var(&["HTTP_PROXY", "http_proxy", "ALL_PROXY", "all_proxy"]),
        _ => None,
    }
}

fn find_first_proxy_var(names: &[&str]) -> Option<String> {
    names.iter().find_map(|name| {
        std::env::var(name)
            .ok()
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    })
}
