//! Built-in content scraper: plain HTTP GET plus HTML → Markdown.
//!
//! Used when no scraping-service key is configured.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{CONTENT_TYPE, RETRY_AFTER};
use reqwest::{Client, StatusCode};
use tracing::debug;
use url::Url;

use leadscope_shared::{
    CollabResult, CollaboratorError, ContentScraper, LeadscopeError, Result, is_blocked_target,
};

/// User-Agent string for page fetches.
const USER_AGENT: &str = concat!("leadscope/", env!("CARGO_PKG_VERSION"));

const MAX_REDIRECTS: usize = 5;

/// Largest page body we read (5 MB).
const MAX_RESPONSE_SIZE: usize = 5 * 1024 * 1024;

/// Fetches pages directly and converts HTML to Markdown.
pub struct HttpScraper {
    client: Client,
    /// Kept so the test hook can rebuild the client.
    #[cfg_attr(not(test), allow(dead_code))]
    timeout: Duration,
    /// Allow loopback hosts (for tests with mock servers).
    allow_localhost: bool,
}

impl HttpScraper {
    pub fn new(timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: build_client(timeout, false)?,
            timeout,
            allow_localhost: false,
        })
    }

    #[cfg(test)]
    pub fn allow_localhost(mut self) -> Self {
        self.allow_localhost = true;
        self.client = build_client(self.timeout, true).expect("test client");
        self
    }
}

/// Client whose redirect policy re-runs the SSRF guard on every hop.
fn build_client(timeout: Duration, allow_loopback: bool) -> Result<Client> {
    let redirects = reqwest::redirect::Policy::custom(move |attempt| {
        if attempt.previous().len() >= MAX_REDIRECTS {
            attempt.error(format!("more than {MAX_REDIRECTS} redirects"))
        } else if is_blocked_target(attempt.url(), allow_loopback) {
            let message = format!("refusing redirect to private or non-http target {}", attempt.url());
            attempt.error(message)
        } else {
            attempt.follow()
        }
    });

    Client::builder()
        .user_agent(USER_AGENT)
        .redirect(redirects)
        .timeout(timeout)
        .build()
        .map_err(|e| LeadscopeError::Network(format!("failed to build HTTP client: {e}")))
}

/// Read the body, refusing anything over [`MAX_RESPONSE_SIZE`].
async fn read_limited(url: &str, mut response: reqwest::Response) -> CollabResult<String> {
    let too_large = |bytes: u64| CollaboratorError::Parse(format!("{url}: response too large ({bytes} bytes)"));

    if let Some(len) = response.content_length() {
        if len > MAX_RESPONSE_SIZE as u64 {
            return Err(too_large(len));
        }
    }

    let mut body = Vec::new();
    while let Some(chunk) = response
        .chunk()
        .await
        .map_err(|e| CollaboratorError::Network(format!("{url}: body read failed: {e}")))?
    {
        if body.len() + chunk.len() > MAX_RESPONSE_SIZE {
            return Err(too_large((body.len() + chunk.len()) as u64));
        }
        body.extend_from_slice(&chunk);
    }

    Ok(String::from_utf8_lossy(&body).into_owned())
}

#[async_trait]
impl ContentScraper for HttpScraper {
    async fn scrape(&self, url: &str) -> CollabResult<String> {
        let parsed = Url::parse(url).map_err(|e| CollaboratorError::Parse(format!("{url}: {e}")))?;
        if is_blocked_target(&parsed, self.allow_localhost) {
            return Err(CollaboratorError::Http {
                status: 0,
                message: format!("refusing to fetch private or non-http target {url}"),
            });
        }

        let response = self
            .client
            .get(parsed.as_str())
            .send()
            .await
            .map_err(|e| CollaboratorError::Network(format!("{url}: {e}")))?;

        let status = response.status();
        match status {
            StatusCode::TOO_MANY_REQUESTS => {
                let retry_after = response
                    .headers()
                    .get(RETRY_AFTER)
                    .and_then(|v| v.to_str().ok());
                return Err(CollaboratorError::rate_limited(retry_after));
            }
            StatusCode::NOT_FOUND => return Err(CollaboratorError::NotFound(url.to_string())),
            s if !s.is_success() => {
                return Err(CollaboratorError::Http {
                    status: s.as_u16(),
                    message: format!("{url}: HTTP {s}"),
                });
            }
            _ => {}
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("text/html")
            .to_ascii_lowercase();

        let body = read_limited(url, response).await?;

        debug!(url, bytes = body.len(), %content_type, "page fetched");

        if content_type.contains("html") {
            leadscope_markdown::html_to_markdown(&body, Some(&parsed))
                .map_err(|e| CollaboratorError::Parse(e.to_string()))
        } else if content_type.starts_with("text/") {
            Ok(body)
        } else {
            Err(CollaboratorError::Parse(format!(
                "{url}: unsupported content type {content_type}"
            )))
        }
    }

    fn name(&self) -> &str {
        "http"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn scraper_for(server: &MockServer, route: &str, response: ResponseTemplate) -> (HttpScraper, String) {
        Mock::given(method("GET"))
            .and(path(route))
            .respond_with(response)
            .mount(server)
            .await;
        let scraper = HttpScraper::new(Duration::from_secs(5)).unwrap().allow_localhost();
        (scraper, format!("{}{route}", server.uri()))
    }

    #[tokio::test]
    async fn converts_html_pages() {
        let server = MockServer::start().await;
        let html = "<html><body><main><h1>About Acme</h1><p>Founded in 1999.</p></main></body></html>";
        let (scraper, url) = scraper_for(
            &server,
            "/about",
            ResponseTemplate::new(200).set_body_raw(html, "text/html; charset=utf-8"),
        )
        .await;

        let text = scraper.scrape(&url).await.unwrap();
        assert!(text.contains("# About Acme"));
        assert!(text.contains("Founded in 1999."));
    }

    #[tokio::test]
    async fn passes_plain_text_through() {
        let server = MockServer::start().await;
        let (scraper, url) = scraper_for(
            &server,
            "/robots.txt",
            ResponseTemplate::new(200).set_body_raw("User-agent: *", "text/plain"),
        )
        .await;

        assert_eq!(scraper.scrape(&url).await.unwrap(), "User-agent: *");
    }

    #[tokio::test]
    async fn maps_rate_limit_with_retry_after() {
        let server = MockServer::start().await;
        let (scraper, url) = scraper_for(
            &server,
            "/team",
            ResponseTemplate::new(429).insert_header("Retry-After", "2"),
        )
        .await;

        match scraper.scrape(&url).await {
            Err(CollaboratorError::RateLimited { retry_after }) => {
                assert_eq!(retry_after, Some(Duration::from_secs(2)));
            }
            other => panic!("expected rate limit, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn maps_missing_page() {
        let server = MockServer::start().await;
        let (scraper, url) = scraper_for(&server, "/gone", ResponseTemplate::new(404)).await;
        assert!(matches!(scraper.scrape(&url).await, Err(CollaboratorError::NotFound(_))));
    }

    #[tokio::test]
    async fn rejects_binary_content() {
        let server = MockServer::start().await;
        let (scraper, url) = scraper_for(
            &server,
            "/brochure.pdf",
            ResponseTemplate::new(200).set_body_raw(vec![0x25u8, 0x50, 0x44, 0x46], "application/pdf"),
        )
        .await;
        assert!(matches!(scraper.scrape(&url).await, Err(CollaboratorError::Parse(_))));
    }

    #[tokio::test]
    async fn rejects_oversized_body() {
        let server = MockServer::start().await;
        let (scraper, url) = scraper_for(
            &server,
            "/huge",
            ResponseTemplate::new(200).set_body_raw("a".repeat(MAX_RESPONSE_SIZE + 1), "text/plain"),
        )
        .await;

        match scraper.scrape(&url).await {
            Err(CollaboratorError::Parse(message)) => assert!(message.contains("too large")),
            other => panic!("expected size error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn follows_redirect_on_same_host() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/old"))
            .respond_with(ResponseTemplate::new(301).insert_header("Location", format!("{}/new", server.uri())))
            .mount(&server)
            .await;
        let (scraper, url) = scraper_for(
            &server,
            "/new",
            ResponseTemplate::new(200).set_body_raw("moved here", "text/plain"),
        )
        .await;

        let old = url.replace("/new", "/old");
        assert_eq!(scraper.scrape(&old).await.unwrap(), "moved here");
    }

    #[tokio::test]
    async fn refuses_redirect_to_private_address() {
        let server = MockServer::start().await;
        let (scraper, url) = scraper_for(
            &server,
            "/jump",
            ResponseTemplate::new(302).insert_header("Location", "http://10.0.0.1/secret"),
        )
        .await;

        match scraper.scrape(&url).await {
            Err(CollaboratorError::Network(_)) => {}
            other => panic!("expected refused redirect, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn refuses_private_targets() {
        let scraper = HttpScraper::new(Duration::from_secs(5)).unwrap();
        assert!(scraper.scrape("http://10.1.2.3/admin").await.is_err());
    }
}
