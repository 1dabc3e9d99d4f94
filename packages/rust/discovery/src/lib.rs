//! URL discovery under a company website root.
//!
//! The [`Discoverer`] delegates enumeration to a [`SiteMapper`] collaborator
//! (a mapping service, or the built-in [`HtmlLinkMapper`]) and turns whatever
//! comes back into a deduplicated, bounded list. Discovery never fails the
//! request: a mapper error, timeout or empty answer all yield an empty list.

mod html_mapper;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, instrument, warn};
use url::Url;

use leadscope_shared::{DiscoveredUrl, PipelineConfig, SiteMapper, dedup_key, with_timeout};

pub use html_mapper::HtmlLinkMapper;

/// Enumerates candidate URLs for the website branch.
pub struct Discoverer {
    mapper: Arc<dyn SiteMapper>,
    max_urls: usize,
    timeout: Duration,
}

impl Discoverer {
    pub fn new(mapper: Arc<dyn SiteMapper>, config: &PipelineConfig) -> Self {
        Self {
            mapper,
            max_urls: config.max_discovered_urls,
            timeout: config.discovery_timeout,
        }
    }

    /// Discover URLs under `root`. Never fails; degraded paths return `[]`.
    #[instrument(skip_all, fields(root = %root, mapper = self.mapper.name()))]
    pub async fn discover(&self, root: &Url) -> Vec<DiscoveredUrl> {
        let mapped = match with_timeout(self.timeout, self.mapper.map(root)).await {
            Ok(urls) => urls,
            Err(e) => {
                warn!(error = %e, "site mapping failed, continuing with no URLs");
                return Vec::new();
            }
        };

        if mapped.is_empty() {
            warn!("site mapper returned no URLs");
            return Vec::new();
        }

        let raw_count = mapped.len();
        let urls = dedup_and_cap(root, mapped, self.max_urls);

        info!(raw = raw_count, kept = urls.len(), "discovery complete");
        urls
    }
}

/// Resolve, deduplicate by normalized URL and cap, keeping first-seen order.
///
/// A later duplicate only contributes its title when the first had none.
fn dedup_and_cap(root: &Url, mapped: Vec<DiscoveredUrl>, max_urls: usize) -> Vec<DiscoveredUrl> {
    let mut seen: HashMap<String, usize> = HashMap::new();
    let mut out: Vec<DiscoveredUrl> = Vec::new();

    for item in mapped {
        let Ok(mut url) = root.join(item.url.trim()) else {
            debug!(url = %item.url, "skipping unparsable URL");
            continue;
        };
        if url.scheme() != "http" && url.scheme() != "https" {
            continue;
        }
        url.set_fragment(None);

        let key = dedup_key(&url);
        let title = item.title.filter(|t| !t.trim().is_empty());

        if let Some(&idx) = seen.get(&key) {
            if out[idx].title.is_none() {
                out[idx].title = title;
            }
            continue;
        }

        if out.len() >= max_urls {
            continue;
        }

        seen.insert(key.clone(), out.len());
        out.push(DiscoveredUrl { url: key, title });
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    use async_trait::async_trait;
    use leadscope_shared::{CollabResult, CollaboratorError};

    struct FixedMapper(CollabResult<Vec<DiscoveredUrl>>);

    #[async_trait]
    impl SiteMapper for FixedMapper {
        async fn map(&self, _root: &Url) -> CollabResult<Vec<DiscoveredUrl>> {
            self.0.clone()
        }

        fn name(&self) -> &str {
            "fixed"
        }
    }

    struct SlowMapper;

    #[async_trait]
    impl SiteMapper for SlowMapper {
        async fn map(&self, _root: &Url) -> CollabResult<Vec<DiscoveredUrl>> {
            tokio::time::sleep(Duration::from_secs(10)).await;
            Ok(vec![DiscoveredUrl::new("https://acme.example/late")])
        }

        fn name(&self) -> &str {
            "slow"
        }
    }

    fn root() -> Url {
        Url::parse("https://acme.example/").unwrap()
    }

    fn discoverer(mapper: impl SiteMapper + 'static, max: usize) -> Discoverer {
        let config = PipelineConfig {
            max_discovered_urls: max,
            discovery_timeout: Duration::from_millis(50),
            ..PipelineConfig::default()
        };
        Discoverer::new(Arc::new(mapper), &config)
    }

    #[tokio::test]
    async fn deduplicates_by_normalized_url() {
        let mapper = FixedMapper(Ok(vec![
            DiscoveredUrl::new("https://acme.example/about/"),
            DiscoveredUrl::new("https://acme.example/about#team").with_title("About"),
            DiscoveredUrl::new("/careers"),
            DiscoveredUrl::new("https://acme.example/careers"),
        ]));

        let urls = discoverer(mapper, 50).discover(&root()).await;

        assert_eq!(urls.len(), 2);
        assert_eq!(urls[0].url, "https://acme.example/about");
        assert_eq!(urls[0].title.as_deref(), Some("About"));
        assert_eq!(urls[1].url, "https://acme.example/careers");
    }

    #[tokio::test]
    async fn caps_result_size() {
        let many = (0..20)
            .map(|i| DiscoveredUrl::new(format!("https://acme.example/p{i}")))
            .collect();

        let urls = discoverer(FixedMapper(Ok(many)), 5).discover(&root()).await;

        assert_eq!(urls.len(), 5);
        assert_eq!(urls[4].url, "https://acme.example/p4");
    }

    #[tokio::test]
    async fn mapper_error_yields_empty() {
        let mapper = FixedMapper(Err(CollaboratorError::Network("connection refused".into())));
        assert!(discoverer(mapper, 50).discover(&root()).await.is_empty());
    }

    #[tokio::test]
    async fn mapper_timeout_yields_empty() {
        assert!(discoverer(SlowMapper, 50).discover(&root()).await.is_empty());
    }

    #[tokio::test]
    async fn skips_non_http_links() {
        let mapper = FixedMapper(Ok(vec![
            DiscoveredUrl::new("mailto:sales@acme.example"),
            DiscoveredUrl::new("https://acme.example/pricing"),
        ]));

        let urls = discoverer(mapper, 50).discover(&root()).await;
        assert_eq!(urls, vec![DiscoveredUrl::new("https://acme.example/pricing")]);
    }
}
