//! Firecrawl v2 client: `/map` for discovery, `/scrape` for Markdown extraction.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;
use url::Url;

use leadscope_shared::{
    CollabResult, CollaboratorError, ContentScraper, DiscoveredUrl, Result, SiteMapper,
};

use crate::http::{build_client, check_status, network_error, read_json, trim_base_url};

const SERVICE: &str = "firecrawl";

/// Links requested from `/map`.
const MAP_LIMIT: usize = 50;

#[derive(Clone)]
pub struct FirecrawlClient {
    client: Client,
    api_key: String,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct MapResponse {
    #[serde(default)]
    links: Vec<MapLink>,
}

/// `/map` returns either bare URL strings or `{url, title}` objects.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum MapLink {
    Bare(String),
    Entry {
        url: String,
        #[serde(default)]
        title: Option<String>,
    },
}

impl From<MapLink> for DiscoveredUrl {
    fn from(link: MapLink) -> Self {
        match link {
            MapLink::Bare(url) => DiscoveredUrl::new(url),
            MapLink::Entry { url, title } => DiscoveredUrl {
                url,
                title: title.filter(|t| !t.trim().is_empty()),
            },
        }
    }
}

#[derive(Debug, Deserialize)]
struct ScrapeResponse {
    #[serde(default)]
    data: Option<ScrapeData>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ScrapeData {
    #[serde(default)]
    markdown: Option<String>,
}

impl FirecrawlClient {
    pub fn new(api_key: impl Into<String>, timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: build_client(timeout)?,
            api_key: api_key.into(),
            base_url: "https://api.firecrawl.dev/v2".to_string(),
        })
    }

    /// Point at a different API root (self-hosted instance, mock server).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = trim_base_url(url);
        self
    }

    fn ensure_key(&self) -> CollabResult<()> {
        if self.api_key.trim().is_empty() {
            Err(CollaboratorError::missing_credentials(SERVICE))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl SiteMapper for FirecrawlClient {
    async fn map(&self, root: &Url) -> CollabResult<Vec<DiscoveredUrl>> {
        self.ensure_key()?;

        let response = self
            .client
            .post(format!("{}/map", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&json!({ "url": root.as_str(), "limit": MAP_LIMIT, "sitemap": "include" }))
            .send()
            .await
            .map_err(|e| network_error(SERVICE, e))?;

        let response = check_status(SERVICE, root.as_str(), response).await?;
        let body: MapResponse = read_json(SERVICE, response).await?;

        debug!(root = %root, links = body.links.len(), "map complete");
        Ok(body.links.into_iter().map(DiscoveredUrl::from).collect())
    }

    fn name(&self) -> &str {
        SERVICE
    }
}

#[async_trait]
impl ContentScraper for FirecrawlClient {
    async fn scrape(&self, url: &str) -> CollabResult<String> {
        self.ensure_key()?;

        let response = self
            .client
            .post(format!("{}/scrape", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&json!({ "url": url, "formats": ["markdown"] }))
            .send()
            .await
            .map_err(|e| network_error(SERVICE, e))?;

        let response = check_status(SERVICE, url, response).await?;
        let body: ScrapeResponse = read_json(SERVICE, response).await?;

        match body.data.and_then(|d| d.markdown) {
            Some(markdown) => Ok(markdown),
            None => Err(CollaboratorError::Parse(format!(
                "{SERVICE}: no markdown for {url}{}",
                body.error.map(|e| format!(" ({e})")).unwrap_or_default()
            ))),
        }
    }

    fn name(&self) -> &str {
        SERVICE
    }
}
