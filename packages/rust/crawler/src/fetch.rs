//! Page fetching and sanitization.
//!
//! Fetches one works-page URL with a bounded timeout and an identifying
//! client header, strips script/style/nav/footer/header markup, flattens the
//! remainder to visible text, collapses whitespace, and truncates to a fixed
//! character budget sized for the downstream extraction call.

use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use reqwest::Client;
use scraper::{Html, Selector};
use tracing::{debug, instrument};

use leadscout_shared::{LeadScoutError, Result};

/// Upper bound on sanitized page text, sized for the extraction budget.
pub const MAX_CONTENT_CHARS: usize = 8_000;

/// Timeout for one page fetch.
const FETCH_TIMEOUT_SECS: u64 = 12;

/// User-Agent string for fetch requests.
const USER_AGENT: &str = concat!("LeadScout/", env!("CARGO_PKG_VERSION"));

/// Elements removed wholesale before flattening to text.
const CHROME_SELECTOR: &str = "script, style, nav, footer, header, noscript, iframe, aside";

/// Sanitized content of one fetched page.
#[derive(Debug, Clone)]
pub struct PageContent {
    /// The fetched URL.
    pub url: String,
    /// Visible text, whitespace-collapsed and truncated to [`MAX_CONTENT_CHARS`].
    pub text: String,
    /// The `<title>` text, used for source-company auto-detection.
    pub title: Option<String>,
}

/// Fetches and sanitizes competitor pages.
pub struct Fetcher {
    client: Client,
}

impl Fetcher {
    /// Create a fetcher with a medium-timeout client.
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .redirect(reqwest::redirect::Policy::limited(5))
            .timeout(Duration::from_secs(FETCH_TIMEOUT_SECS))
            .build()
            .map_err(|e| LeadScoutError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { client })
    }

    /// Fetch `url` and sanitize its body.
    ///
    /// Error categories are kept distinguishable for the interactive path:
    /// HTTP 403 maps to [`LeadScoutError::Blocked`], request deadline to
    /// [`LeadScoutError::Timeout`], everything else to
    /// [`LeadScoutError::Network`]. The sweep treats all three as "no
    /// content, skip this origin".
    #[instrument(skip_all, fields(url = %url))]
    pub async fn fetch(&self, url: &str) -> Result<PageContent> {
        let response = self.client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                LeadScoutError::Timeout(url.to_string())
            } else {
                LeadScoutError::Network(format!("{url}: {e}"))
            }
        })?;

        let status = response.status();
        if status == reqwest::StatusCode::FORBIDDEN {
            return Err(LeadScoutError::Blocked(url.to_string()));
        }
        if !status.is_success() {
            return Err(LeadScoutError::Network(format!("{url}: HTTP {status}")));
        }

        let body = response.text().await.map_err(|e| {
            if e.is_timeout() {
                LeadScoutError::Timeout(url.to_string())
            } else {
                LeadScoutError::Network(format!("{url}: body read failed: {e}"))
            }
        })?;

        let (text, title) = sanitize(&body);
        debug!(chars = text.len(), title = ?title, "page sanitized");

        Ok(PageContent {
            url: url.to_string(),
            text,
            title,
        })
    }
}

/// Strip chrome markup, flatten to visible text, collapse whitespace, truncate.
fn sanitize(html: &str) -> (String, Option<String>) {
    let doc = Html::parse_document(html);

    let title = {
        let title_sel = Selector::parse("title").expect("valid selector");
        doc.select(&title_sel)
            .next()
            .map(|el| el.text().collect::<String>().trim().to_string())
            .filter(|t| !t.is_empty())
    };

    // Remove chrome elements by erasing their serialized form, then re-parse
    // and flatten what remains.
    let chrome_sel = Selector::parse(CHROME_SELECTOR).expect("valid selector");
    let mut stripped = html.to_string();
    for el in doc.select(&chrome_sel) {
        stripped = stripped.replace(&el.html(), "");
    }

    let stripped_doc = Html::parse_document(&stripped);
    let body_sel = Selector::parse("body").expect("valid selector");
    let raw_text = match stripped_doc.select(&body_sel).next() {
        Some(body) => body.text().collect::<Vec<_>>().join(" "),
        None => String::new(),
    };

    let collapsed = collapse_whitespace(&raw_text);
    (truncate_chars(&collapsed, MAX_CONTENT_CHARS), title)
}

/// Collapse all whitespace runs to single spaces.
fn collapse_whitespace(text: &str) -> String {
    static WS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));
    WS_RE.replace_all(text, " ").trim().to_string()
}

/// Truncate to at most `max_chars` characters on a char boundary.
fn truncate_chars(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        text.chars().take(max_chars).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_strips_chrome_and_flattens() {
        let html = r#"<html>
            <head><title>株式会社映像スタジオ | 制作実績</title>
                <style>body { color: red; }</style>
            </head>
            <body>
                <header>サイトヘッダー</header>
                <nav><a href="/">ホーム</a></nav>
                <main>
                    <h1>制作実績</h1>
                    <p>株式会社山田食品様  会社紹介動画</p>
                </main>
                <script>console.log("tracking");</script>
                <footer>Copyright 2024</footer>
            </body>
        </html>"#;

        let (text, title) = sanitize(html);
        assert_eq!(title.as_deref(), Some("株式会社映像スタジオ | 制作実績"));
        assert!(text.contains("株式会社山田食品様 会社紹介動画"));
        assert!(!text.contains("tracking"));
        assert!(!text.contains("color: red"));
        assert!(!text.contains("サイトヘッダー"));
        assert!(!text.contains("Copyright"));
    }

    #[test]
    fn sanitize_collapses_whitespace() {
        let html = "<html><body><p>a</p>\n\n\n<p>b\t\tc</p></body></html>";
        let (text, _) = sanitize(html);
        assert_eq!(text, "a b c");
    }

    #[test]
    fn sanitize_missing_title_is_none() {
        let html = "<html><body><p>本文</p></body></html>";
        let (_, title) = sanitize(html);
        assert!(title.is_none());
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        // Multibyte text must not be sliced mid-codepoint.
        let text = "あ".repeat(MAX_CONTENT_CHARS + 50);
        let truncated = truncate_chars(&text, MAX_CONTENT_CHARS);
        assert_eq!(truncated.chars().count(), MAX_CONTENT_CHARS);
    }

    #[test]
    fn short_text_is_untouched() {
        assert_eq!(truncate_chars("短いテキスト", MAX_CONTENT_CHARS), "短いテキスト");
    }

    #[tokio::test]
    async fn fetch_success_returns_sanitized_content() {
        let server = wiremock::MockServer::start().await;

        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .and(wiremock::matchers::path("/works"))
            .respond_with(wiremock::ResponseTemplate::new(200).set_body_string(
                "<html><head><title>Studio</title></head><body><p>実績一覧</p><script>x()</script></body></html>",
            ))
            .mount(&server)
            .await;

        let fetcher = Fetcher::new().expect("fetcher");
        let url = format!("{}/works", server.uri());
        let page = fetcher.fetch(&url).await.expect("fetch");

        assert_eq!(page.title.as_deref(), Some("Studio"));
        assert_eq!(page.text, "実績一覧");
        assert_eq!(page.url, url);
    }

    #[tokio::test]
    async fn fetch_403_maps_to_blocked() {
        let server = wiremock::MockServer::start().await;

        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .respond_with(wiremock::ResponseTemplate::new(403))
            .mount(&server)
            .await;

        let fetcher = Fetcher::new().expect("fetcher");
        let result = fetcher.fetch(&format!("{}/works", server.uri())).await;
        assert!(matches!(result, Err(LeadScoutError::Blocked(_))));
    }

    #[tokio::test]
    async fn fetch_non_2xx_maps_to_network() {
        let server = wiremock::MockServer::start().await;

        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .respond_with(wiremock::ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let fetcher = Fetcher::new().expect("fetcher");
        let result = fetcher.fetch(&format!("{}/works", server.uri())).await;
        assert!(matches!(result, Err(LeadScoutError::Network(_))));
    }
}
