//! Works-page locator: probes an ordered list of conventional path suffixes
//! on a given origin with a short-timeout existence check.
//!
//! First path that responds successfully wins, with no scoring across multiple
//! hits. Once the whole list is exhausted the origin has no locatable
//! showcase page and the caller moves on.

use std::time::Duration;

use reqwest::Client;
use tracing::{debug, instrument};

use leadscout_shared::{LeadScoutError, Result};

/// Conventional client-showcase path suffixes, English first, then romanized
/// Japanese. Probed in order; first success wins.
pub const WORKS_PATHS: &[&str] = &[
    "/works",
    "/work",
    "/achievement",
    "/achievements",
    "/results",
    "/portfolio",
    "/case",
    "/cases",
    "/jisseki",
    "/seisaku-jisseki",
];

/// Timeout for one existence probe.
const PROBE_TIMEOUT_SECS: u64 = 5;

/// User-Agent string for probe requests.
const USER_AGENT: &str = concat!("LeadScout/", env!("CARGO_PKG_VERSION"));

/// Probes origins for their client-showcase page.
pub struct Locator {
    client: Client,
}

impl Locator {
    /// Create a locator with a short-timeout probe client.
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .redirect(reqwest::redirect::Policy::limited(3))
            .timeout(Duration::from_secs(PROBE_TIMEOUT_SECS))
            .build()
            .map_err(|e| LeadScoutError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { client })
    }

    /// Find the works page on `origin`, or `None` once all paths are exhausted.
    ///
    /// Probe failures (timeout, non-2xx, network error) just advance to the
    /// next path; this method never raises.
    #[instrument(skip_all, fields(origin = %origin))]
    pub async fn locate(&self, origin: &str) -> Option<String> {
        let base = origin.trim_end_matches('/');

        for path in WORKS_PATHS {
            let url = format!("{base}{path}");

            match self.client.get(&url).send().await {
                Ok(response) if response.status().is_success() => {
                    debug!(%url, "works page located");
                    return Some(url);
                }
                Ok(response) => {
                    debug!(%url, status = response.status().as_u16(), "probe miss");
                }
                Err(e) => {
                    debug!(%url, error = %e, "probe failed");
                }
            }
        }

        debug!("no works page found");
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn first_successful_path_wins() {
        let server = wiremock::MockServer::start().await;

        // Both /achievement and /portfolio exist; /achievement precedes
        // /portfolio in the probe list and must win.
        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .and(wiremock::matchers::path("/achievement"))
            .respond_with(wiremock::ResponseTemplate::new(200).set_body_string("<html/>"))
            .mount(&server)
            .await;

        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .and(wiremock::matchers::path("/portfolio"))
            .respond_with(wiremock::ResponseTemplate::new(200).set_body_string("<html/>"))
            .mount(&server)
            .await;

        // Unmatched probe paths fall through to wiremock's default 404.
        let locator = Locator::new().expect("locator");
        let found = locator.locate(&server.uri()).await;
        assert_eq!(found, Some(format!("{}/achievement", server.uri())));
    }

    #[tokio::test]
    async fn exhausted_list_returns_none() {
        // No mounted mocks: every probe path 404s.
        let server = wiremock::MockServer::start().await;

        let locator = Locator::new().expect("locator");
        assert!(locator.locate(&server.uri()).await.is_none());
    }

    #[tokio::test]
    async fn trailing_slash_on_origin_is_tolerated() {
        let server = wiremock::MockServer::start().await;

        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .and(wiremock::matchers::path("/works"))
            .respond_with(wiremock::ResponseTemplate::new(200).set_body_string("<html/>"))
            .mount(&server)
            .await;

        let locator = Locator::new().expect("locator");
        let origin = format!("{}/", server.uri());
        let found = locator.locate(&origin).await;
        assert_eq!(found, Some(format!("{}/works", server.uri())));
    }

    #[tokio::test]
    async fn server_errors_do_not_abort_probing() {
        let server = wiremock::MockServer::start().await;

        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .and(wiremock::matchers::path("/works"))
            .respond_with(wiremock::ResponseTemplate::new(500))
            .mount(&server)
            .await;

        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .and(wiremock::matchers::path("/jisseki"))
            .respond_with(wiremock::ResponseTemplate::new(200).set_body_string("<html/>"))
            .mount(&server)
            .await;

        let locator = Locator::new().expect("locator");
        let found = locator.locate(&server.uri()).await;
        assert_eq!(found, Some(format!("{}/jisseki", server.uri())));
    }
}
