//! Built-in site mapper: harvest same-host links from the root page.
//!
//! Used when no mapping-service key is configured. One GET, no crawl.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use scraper::{Html, Selector};
use tracing::debug;
use url::Url;

use leadscope_shared::{
    CollabResult, CollaboratorError, DiscoveredUrl, LeadscopeError, Result, SiteMapper,
    is_blocked_target,
};

/// User-Agent string for discovery requests.
const USER_AGENT: &str = concat!("leadscope/", env!("CARGO_PKG_VERSION"));

/// Maximum number of redirects to follow when fetching the root page.
const MAX_REDIRECTS: usize = 5;

/// Maximum response size we accept for the root page (5 MB).
const MAX_RESPONSE_SIZE: u64 = 5 * 1024 * 1024;

/// Maps a site by extracting the links on its root page.
pub struct HtmlLinkMapper {
    client: Client,
    /// Kept so the test hook can rebuild the client.
    #[cfg_attr(not(test), allow(dead_code))]
    timeout: Duration,
    /// Allow loopback hosts (for tests with mock servers).
    allow_localhost: bool,
}

impl HtmlLinkMapper {
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

    async fn fetch_root(&self, root: &Url) -> CollabResult<String> {
        if is_blocked_target(root, self.allow_localhost) {
            return Err(CollaboratorError::Http {
                status: 0,
                message: format!("refusing to fetch private or non-http target {root}"),
            });
        }

        let response = self
            .client
            .get(root.as_str())
            .send()
            .await
            .map_err(|e| CollaboratorError::Network(format!("{root}: {e}")))?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(CollaboratorError::RateLimited { retry_after: None });
        }
        if !status.is_success() {
            return Err(CollaboratorError::Http {
                status: status.as_u16(),
                message: format!("{root}: HTTP {status}"),
            });
        }

        if let Some(len) = response.content_length() {
            if len > MAX_RESPONSE_SIZE {
                return Err(CollaboratorError::Parse(format!(
                    "{root}: response too large ({len} bytes)"
                )));
            }
        }

        response
            .text()
            .await
            .map_err(|e| CollaboratorError::Network(format!("{root}: failed to read body: {e}")))
    }
}

/// Each redirect hop goes through the same private-target check as the root.
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

#[async_trait]
impl SiteMapper for HtmlLinkMapper {
    async fn map(&self, root: &Url) -> CollabResult<Vec<DiscoveredUrl>> {
        let body = self.fetch_root(root).await?;
        let urls = harvest_links(&body, root);
        debug!(%root, links = urls.len(), "harvested root page links");
        Ok(urls)
    }

    fn name(&self) -> &str {
        "html-links"
    }
}

/// The root itself (titled from `<title>`) followed by every same-host link.
fn harvest_links(html: &str, root: &Url) -> Vec<DiscoveredUrl> {
    let doc = Html::parse_document(html);
    let mut urls = Vec::new();

    let page_title = Selector::parse("title").ok().and_then(|sel| {
        doc.select(&sel)
            .next()
            .map(|el| el.text().collect::<String>().trim().to_string())
            .filter(|t| !t.is_empty())
    });
    urls.push(DiscoveredUrl {
        url: root.to_string(),
        title: page_title,
    });

    let Ok(link_sel) = Selector::parse("a[href]") else {
        return urls;
    };

    for el in doc.select(&link_sel) {
        let Some(href) = el.value().attr("href") else {
            continue;
        };
        // Skip anchors, javascript:, mailto:, tel:
        if href.starts_with('#')
            || href.starts_with("javascript:")
            || href.starts_with("mailto:")
            || href.starts_with("tel:")
        {
            continue;
        }

        let Ok(mut resolved) = root.join(href) else {
            continue;
        };
        if !same_site(&resolved, root) {
            continue;
        }
        resolved.set_fragment(None);

        let text = el.text().collect::<Vec<_>>().join(" ");
        let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
        urls.push(DiscoveredUrl {
            url: resolved.to_string(),
            title: (!text.is_empty()).then_some(text),
        });
    }

    urls
}

/// Same host, treating `www.` as insignificant.
fn same_site(url: &Url, root: &Url) -> bool {
    fn bare(host: &str) -> &str {
        host.strip_prefix("www.").unwrap_or(host)
    }

    match (url.host_str(), root.host_str()) {
        (Some(a), Some(b)) => bare(a) == bare(b) && url.port() == root.port(),
        _ => false,
    }
}
