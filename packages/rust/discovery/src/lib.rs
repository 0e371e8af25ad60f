//! Candidate discovery: region label → deduplicated competitor site origins.
//!
//! For each entry in a fixed keyword list, one `"{region} {keyword}"` query is
//! issued against a capped-result search index. Response links are
//! canonicalized to scheme+host and accumulated into an ordered, deduplicated
//! set of origins. A failing individual query is swallowed and skipped; this
//! stage never raises for partial failure, and an empty result is legitimate.

use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, instrument, warn};
use url::Url;

use leadscout_shared::{LeadScoutError, Result};

/// Keywords combined with the region label, one search query each.
pub const SEARCH_KEYWORDS: &[&str] = &[
    "映像制作会社",
    "動画制作会社",
    "映像制作 実績",
    "動画制作 実績",
    "プロモーション動画 制作",
];

/// Timeout for one search query.
const SEARCH_TIMEOUT_SECS: u64 = 10;

/// User-Agent string for search requests.
const USER_AGENT: &str = concat!("LeadScout/", env!("CARGO_PKG_VERSION"));

// ---------------------------------------------------------------------------
// SearchProvider
// ---------------------------------------------------------------------------

/// One result link from the search index.
#[derive(Debug, Clone)]
pub struct SearchHit {
    pub url: String,
}

/// Collaborator handle for the external search index.
///
/// Injected into the sweep orchestrator so discovery failures can be isolated
/// per query and tests can substitute a canned provider.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// Run one keyword query, returning at most `count` hits.
    async fn search(&self, query: &str, count: u32) -> Result<Vec<SearchHit>>;
}

// ---------------------------------------------------------------------------
// HttpSearchProvider
// ---------------------------------------------------------------------------

/// Search response shape of a Custom-Search-style JSON endpoint.
#[derive(Debug, serde::Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<SearchResponseItem>,
}

#[derive(Debug, serde::Deserialize)]
struct SearchResponseItem {
    link: String,
}

/// [`SearchProvider`] backed by a Custom-Search-style HTTP endpoint.
pub struct HttpSearchProvider {
    client: Client,
    endpoint: String,
    api_key: String,
    engine_id: String,
}

impl HttpSearchProvider {
    /// Create a provider against `endpoint` (overridable so tests can point
    /// at a mock server).
    pub fn new(endpoint: &str, api_key: &str, engine_id: &str) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(SEARCH_TIMEOUT_SECS))
            .build()
            .map_err(|e| LeadScoutError::Search(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            engine_id: engine_id.to_string(),
        })
    }
}

#[async_trait]
impl SearchProvider for HttpSearchProvider {
    async fn search(&self, query: &str, count: u32) -> Result<Vec<SearchHit>> {
        let num = count.to_string();
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("key", self.api_key.as_str()),
                ("cx", self.engine_id.as_str()),
                ("q", query),
                ("num", num.as_str()),
            ])
            .send()
            .await
            .map_err(|e| LeadScoutError::Search(format!("{query}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(LeadScoutError::Search(format!("{query}: HTTP {status}")));
        }

        let parsed: SearchResponse = response
            .json()
            .await
            .map_err(|e| LeadScoutError::Search(format!("{query}: invalid response: {e}")))?;

        Ok(parsed
            .items
            .into_iter()
            .map(|item| SearchHit { url: item.link })
            .collect())
    }
}

// ---------------------------------------------------------------------------
// Origin discovery
// ---------------------------------------------------------------------------

/// Discover candidate competitor origins for `region`.
///
/// Issues one query per [`SEARCH_KEYWORDS`] entry and collects canonical
/// origins in discovery order. Individual query failures are logged and
/// skipped; the returned set may legitimately be empty.
#[instrument(skip_all, fields(region = %region))]
pub async fn discover_origins(
    provider: &dyn SearchProvider,
    region: &str,
    result_count: u32,
) -> Vec<String> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut origins: Vec<String> = Vec::new();

    for keyword in SEARCH_KEYWORDS {
        let query = format!("{region} {keyword}");

        let hits = match provider.search(&query, result_count).await {
            Ok(hits) => hits,
            Err(e) => {
                warn!(%query, error = %e, "search query failed, skipping");
                continue;
            }
        };

        for hit in hits {
            match canonical_origin(&hit.url) {
                Some(origin) => {
                    if seen.insert(origin.clone()) {
                        debug!(%origin, %query, "discovered candidate origin");
                        origins.push(origin);
                    }
                }
                None => debug!(url = %hit.url, "unparseable hit, skipping"),
            }
        }
    }

    origins
}

/// Canonicalize a result link to its scheme+host origin.
fn canonical_origin(raw: &str) -> Option<String> {
    let url = Url::parse(raw).ok()?;
    match url.scheme() {
        "http" | "https" => {}
        _ => return None,
    }
    let host = url.host_str()?;
    match url.port() {
        Some(port) => Some(format!("{}://{host}:{port}", url.scheme())),
        None => Some(format!("{}://{host}", url.scheme())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Canned provider: each query pops the next scripted outcome.
    struct ScriptedProvider {
        outcomes: std::sync::Mutex<Vec<Result<Vec<SearchHit>>>>,
    }

    impl ScriptedProvider {
        fn new(outcomes: Vec<Result<Vec<SearchHit>>>) -> Self {
            Self {
                outcomes: std::sync::Mutex::new(outcomes),
            }
        }
    }

    #[async_trait]
    impl SearchProvider for ScriptedProvider {
        async fn search(&self, _query: &str, _count: u32) -> Result<Vec<SearchHit>> {
            let mut outcomes = self.outcomes.lock().expect("lock");
            if outcomes.is_empty() {
                Ok(vec![])
            } else {
                outcomes.remove(0)
            }
        }
    }

    fn hits(urls: &[&str]) -> Result<Vec<SearchHit>> {
        Ok(urls
            .iter()
            .map(|u| SearchHit {
                url: (*u).to_string(),
            })
            .collect())
    }

    #[test]
    fn canonical_origin_strips_path_and_query() {
        assert_eq!(
            canonical_origin("https://studio.example.com/works/123?ref=s").as_deref(),
            Some("https://studio.example.com")
        );
    }

    #[test]
    fn canonical_origin_keeps_port() {
        assert_eq!(
            canonical_origin("http://localhost:8080/works").as_deref(),
            Some("http://localhost:8080")
        );
    }

    #[test]
    fn canonical_origin_rejects_non_http() {
        assert!(canonical_origin("ftp://example.com/file").is_none());
        assert!(canonical_origin("not a url").is_none());
    }

    #[tokio::test]
    async fn discovery_dedups_by_origin() {
        let provider = ScriptedProvider::new(vec![
            hits(&[
                "https://a.example.com/works",
                "https://a.example.com/about",
                "https://b.example.com/",
            ]),
            hits(&["https://b.example.com/works", "https://c.example.com/"]),
        ]);

        let origins = discover_origins(&provider, "東京都", 10).await;
        assert_eq!(
            origins,
            vec![
                "https://a.example.com",
                "https://b.example.com",
                "https://c.example.com"
            ]
        );
    }

    #[tokio::test]
    async fn discovery_swallows_individual_query_failures() {
        let provider = ScriptedProvider::new(vec![
            Err(LeadScoutError::Search("quota exceeded".into())),
            hits(&["https://survivor.example.com/works"]),
            Err(LeadScoutError::Search("timeout".into())),
        ]);

        let origins = discover_origins(&provider, "神奈川県", 10).await;
        assert_eq!(origins, vec!["https://survivor.example.com"]);
    }

    #[tokio::test]
    async fn discovery_may_return_empty() {
        let provider = ScriptedProvider::new(vec![]);
        let origins = discover_origins(&provider, "北海道", 10).await;
        assert!(origins.is_empty());
    }

    #[tokio::test]
    async fn http_provider_parses_items() {
        let server = wiremock::MockServer::start().await;

        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .and(wiremock::matchers::query_param("q", "東京都 映像制作会社"))
            .respond_with(wiremock::ResponseTemplate::new(200).set_body_string(
                r#"{"items":[{"link":"https://studio.example.com/works"},{"link":"https://video.example.jp/"}]}"#,
            ))
            .mount(&server)
            .await;

        let provider =
            HttpSearchProvider::new(&server.uri(), "test-key", "test-cx").expect("provider");
        let hits = provider
            .search("東京都 映像制作会社", 10)
            .await
            .expect("search");
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].url, "https://studio.example.com/works");
    }

    #[tokio::test]
    async fn http_provider_tolerates_missing_items_key() {
        let server = wiremock::MockServer::start().await;

        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .respond_with(wiremock::ResponseTemplate::new(200).set_body_string(r#"{}"#))
            .mount(&server)
            .await;

        let provider = HttpSearchProvider::new(&server.uri(), "k", "cx").expect("provider");
        let hits = provider.search("北海道 動画制作会社", 5).await.expect("search");
        assert!(hits.is_empty());
    }

    #[tokio::test]
    async fn http_provider_errors_on_non_2xx() {
        let server = wiremock::MockServer::start().await;

        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .respond_with(wiremock::ResponseTemplate::new(429))
            .mount(&server)
            .await;

        let provider = HttpSearchProvider::new(&server.uri(), "k", "cx").expect("provider");
        let result = provider.search("東京都 映像制作会社", 5).await;
        assert!(matches!(result, Err(LeadScoutError::Search(_))));
    }
}
