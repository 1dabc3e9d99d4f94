//! Concurrent content extraction for the selected URLs.
//!
//! One task per URL, bounded by a semaphore. Each task writes only its own
//! entry, so the map is merged at the join point without locks. A failing URL
//! becomes an [`ExtractedContent::Failed`] entry and never affects siblings.

mod http_scraper;

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, instrument, warn};

use leadscope_shared::{
    CollaboratorError, ContentMap, ContentScraper, ExtractedContent, PipelineConfig, ScoredUrl,
    with_timeout,
};

pub use http_scraper::HttpScraper;

/// Largest exponent applied to the retry base delay.
const MAX_BACKOFF_SHIFT: u32 = 10;

// ---------------------------------------------------------------------------
// Progress
// ---------------------------------------------------------------------------

/// Per-URL completion callback.
pub trait ExtractionProgress: Send + Sync {
    fn url_finished(&self, url: &str, succeeded: bool, completed: usize, total: usize);
}

/// No-op progress for callers that don't report.
pub struct NoProgress;

impl ExtractionProgress for NoProgress {
    fn url_finished(&self, _url: &str, _succeeded: bool, _completed: usize, _total: usize) {}
}

// ---------------------------------------------------------------------------
// Extractor
// ---------------------------------------------------------------------------

/// Retry and shaping parameters copied into every fetch task.
#[derive(Debug, Clone, Copy)]
struct FetchPolicy {
    max_retries: u32,
    base_delay: Duration,
    max_delay: Duration,
    timeout: Duration,
    max_chars: usize,
}

/// Extraction stage.
pub struct Extractor {
    scraper: Arc<dyn ContentScraper>,
    concurrency: usize,
    policy: FetchPolicy,
}

impl Extractor {
    pub fn new(scraper: Arc<dyn ContentScraper>, config: &PipelineConfig) -> Self {
        Self {
            scraper,
            concurrency: config.max_concurrency.max(1),
            policy: FetchPolicy {
                max_retries: config.max_scrape_retries,
                base_delay: config.retry_base_delay,
                max_delay: config.max_retry_delay,
                timeout: config.scrape_timeout,
                max_chars: config.max_content_chars,
            },
        }
    }

    /// Fetch every URL in `urls` and return exactly one entry per distinct URL.
    ///
    /// Returns only after all tasks have finished.
    #[instrument(skip_all, fields(urls = urls.len(), scraper = self.scraper.name(), concurrency = self.concurrency))]
    pub async fn extract(&self, urls: &[ScoredUrl], progress: &dyn ExtractionProgress) -> ContentMap {
        let mut content = ContentMap::new();
        for scored in urls {
            // Placeholder so a task that dies still leaves an entry.
            content.insert(
                scored.url.clone(),
                ExtractedContent::Failed {
                    error: "extraction did not complete".into(),
                    attempts: 0,
                },
            );
        }

        let total = content.len();
        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let mut tasks = JoinSet::new();

        for url in content.keys().cloned() {
            let scraper = Arc::clone(&self.scraper);
            let sem = Arc::clone(&semaphore);
            let policy = self.policy;

            tasks.spawn(async move {
                let Ok(_permit) = sem.acquire_owned().await else {
                    let closed = ExtractedContent::Failed {
                        error: "concurrency limiter closed".into(),
                        attempts: 0,
                    };
                    return (url, closed);
                };
                let result = fetch_with_retry(scraper.as_ref(), &url, policy).await;
                (url, result)
            });
        }

        let mut completed = 0usize;
        let mut failed = 0usize;
        while let Some(joined) = tasks.join_next().await {
            completed += 1;
            match joined {
                Ok((url, result)) => {
                    let ok = result.is_extracted();
                    if !ok {
                        failed += 1;
                    }
                    progress.url_finished(&url, ok, completed, total);
                    content.insert(url, result);
                }
                Err(e) => {
                    failed += 1;
                    warn!(error = %e, "extraction task aborted");
                }
            }
        }

        info!(
            extracted = total - failed,
            failed,
            "content extraction complete"
        );
        content
    }
}

/// Scrape one URL, retrying only on rate limits.
async fn fetch_with_retry(
    scraper: &dyn ContentScraper,
    url: &str,
    policy: FetchPolicy,
) -> ExtractedContent {
    let mut attempts = 0u32;

    loop {
        attempts += 1;
        match with_timeout(policy.timeout, scraper.scrape(url)).await {
            Ok(raw) => {
                let text = leadscope_markdown::truncate(
                    &leadscope_markdown::normalize(&raw),
                    policy.max_chars,
                );
                if text.trim().is_empty() {
                    warn!(url, "scraper returned no content");
                    return ExtractedContent::Failed {
                        error: "empty content".into(),
                        attempts,
                    };
                }
                debug!(url, chars = text.len(), attempts, "extracted");
                return ExtractedContent::Extracted(text);
            }
            Err(CollaboratorError::RateLimited { retry_after }) if attempts <= policy.max_retries => {
                let Some(delay) = backoff_delay(
                    policy.base_delay,
                    attempts - 1,
                    retry_after,
                    policy.max_delay,
                ) else {
                    warn!(url, attempts, ?retry_after, "Retry-After exceeds the back-off limit, giving up");
                    return ExtractedContent::Failed {
                        error: format!(
                            "rate limited: server asked to wait longer than {}s",
                            policy.max_delay.as_secs()
                        ),
                        attempts,
                    };
                };
                warn!(url, attempt = attempts, delay_ms = delay.as_millis() as u64, "rate limited, backing off");
                tokio::time::sleep(delay).await;
            }
            Err(e) => {
                warn!(url, error = %e, attempts, "extraction failed");
                return ExtractedContent::Failed {
                    error: e.to_string(),
                    attempts,
                };
            }
        }
    }
}

/// `base * 2^retry` capped at `max`, or the server's `Retry-After` when that
/// is longer. `None` when the server asks for more than `max`.
fn backoff_delay(
    base: Duration,
    retry: u32,
    retry_after: Option<Duration>,
    max: Duration,
) -> Option<Duration> {
    let exponential = base
        .saturating_mul(1u32 << retry.min(MAX_BACKOFF_SHIFT))
        .min(max);
    match retry_after {
        Some(server) if server > max => None,
        Some(server) if server > exponential => Some(server),
        _ => Some(exponential),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use leadscope_shared::{Category, CollabResult, ScoringMethod};

    /// Scripted scraper: per-URL queue of responses, last one repeats.
    struct ScriptedScraper {
        scripts: Mutex<HashMap<String, Vec<CollabResult<String>>>>,
        in_flight: AtomicUsize,
        peak: AtomicUsize,
        calls: AtomicUsize,
    }

    impl ScriptedScraper {
        fn new(scripts: Vec<(&str, Vec<CollabResult<String>>)>) -> Self {
            Self {
                scripts: Mutex::new(
                    scripts
                        .into_iter()
                        .map(|(u, s)| (u.to_string(), s))
                        .collect(),
                ),
                in_flight: AtomicUsize::new(0),
                peak: AtomicUsize::new(0),
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl ContentScraper for ScriptedScraper {
        async fn scrape(&self, url: &str) -> CollabResult<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            let mut scripts = self.scripts.lock().unwrap();
            let script = scripts.get_mut(url).expect("unscripted url");
            if script.len() > 1 {
                script.remove(0)
            } else {
                script[0].clone()
            }
        }

        fn name(&self) -> &str {
            "scripted"
        }
    }

    fn scored(url: &str) -> ScoredUrl {
        ScoredUrl {
            url: url.to_string(),
            score: 80,
            reason: String::new(),
            category: Category::other(),
            method: ScoringMethod::Heuristic,
        }
    }

    fn config(concurrency: usize) -> PipelineConfig {
        PipelineConfig {
            max_concurrency: concurrency,
            max_scrape_retries: 2,
            retry_base_delay: Duration::from_millis(1),
            scrape_timeout: Duration::from_secs(5),
            max_content_chars: 1_000,
            ..PipelineConfig::default()
        }
    }

    #[tokio::test]
    async fn one_failure_does_not_affect_siblings() {
        let mut scripts = vec![(
            "https://acme.example/broken",
            vec![Err(CollaboratorError::Http {
                status: 500,
                message: "server error".into(),
            })],
        )];
        let ok_urls: Vec<String> = (0..5).map(|i| format!("https://acme.example/p{i}")).collect();
        for url in &ok_urls {
            scripts.push((url.as_str(), vec![Ok(format!("# Page\n\nBody of {url}"))]));
        }
        let scraper = Arc::new(ScriptedScraper::new(scripts));

        let mut urls: Vec<ScoredUrl> = ok_urls.iter().map(|u| scored(u)).collect();
        urls.insert(2, scored("https://acme.example/broken"));

        let extractor = Extractor::new(scraper, &config(3));
        let content = extractor.extract(&urls, &NoProgress).await;

        assert_eq!(content.len(), 6);
        assert_eq!(content.values().filter(|c| c.is_extracted()).count(), 5);
        assert!(matches!(
            content["https://acme.example/broken"],
            ExtractedContent::Failed { attempts: 1, .. }
        ));
    }

    #[tokio::test]
    async fn respects_concurrency_limit() {
        let urls: Vec<String> = (0..8).map(|i| format!("https://acme.example/p{i}")).collect();
        let scripts = urls
            .iter()
            .map(|u| (u.as_str(), vec![Ok("text".to_string())]))
            .collect();
        let scraper = Arc::new(ScriptedScraper::new(scripts));

        let scored_urls: Vec<ScoredUrl> = urls.iter().map(|u| scored(u)).collect();
        let extractor = Extractor::new(scraper.clone(), &config(2));
        let content = extractor.extract(&scored_urls, &NoProgress).await;

        assert_eq!(content.len(), 8);
        assert!(scraper.peak.load(Ordering::SeqCst) <= 2);
    }

    #[tokio::test]
    async fn retries_rate_limited_url() {
        let url = "https://acme.example/team";
        let scraper = Arc::new(ScriptedScraper::new(vec![(
            url,
            vec![
                Err(CollaboratorError::RateLimited { retry_after: None }),
                Err(CollaboratorError::RateLimited { retry_after: None }),
                Ok("Jane Doe, CEO".to_string()),
            ],
        )]));

        let extractor = Extractor::new(scraper.clone(), &config(1));
        let content = extractor.extract(&[scored(url)], &NoProgress).await;

        assert_eq!(content[url].content(), Some("Jane Doe, CEO\n"));
        assert_eq!(scraper.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn exhausted_retries_become_error_entry() {
        let url = "https://acme.example/team";
        let scraper = Arc::new(ScriptedScraper::new(vec![(
            url,
            vec![Err(CollaboratorError::RateLimited { retry_after: None })],
        )]));

        let extractor = Extractor::new(scraper.clone(), &config(1));
        let content = extractor.extract(&[scored(url)], &NoProgress).await;

        assert!(matches!(content[url], ExtractedContent::Failed { attempts: 3, .. }));
        assert_eq!(scraper.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn empty_content_is_an_error_entry() {
        let url = "https://acme.example/blank";
        let scraper = Arc::new(ScriptedScraper::new(vec![(url, vec![Ok("  \n\n ".to_string())])]));

        let content = Extractor::new(scraper, &config(1))
            .extract(&[scored(url)], &NoProgress)
            .await;

        assert!(!content[url].is_extracted());
    }

    #[tokio::test]
    async fn content_is_truncated() {
        let url = "https://acme.example/long";
        let scraper = Arc::new(ScriptedScraper::new(vec![(url, vec![Ok("x".repeat(5_000))])]));

        let content = Extractor::new(scraper, &config(1))
            .extract(&[scored(url)], &NoProgress)
            .await;

        let text = content[url].content().unwrap();
        assert!(text.trim_end().chars().count() <= 1_000);
    }

    #[tokio::test]
    async fn reports_progress_per_url() {
        struct Counting(AtomicUsize);
        impl ExtractionProgress for Counting {
            fn url_finished(&self, _url: &str, _ok: bool, _completed: usize, total: usize) {
                assert_eq!(total, 2);
                self.0.fetch_add(1, Ordering::SeqCst);
            }
        }

        let scraper = Arc::new(ScriptedScraper::new(vec![
            ("https://acme.example/a", vec![Ok("a".to_string())]),
            ("https://acme.example/b", vec![Ok("b".to_string())]),
        ]));
        let progress = Counting(AtomicUsize::new(0));

        Extractor::new(scraper, &config(2))
            .extract(&[scored("https://acme.example/a"), scored("https://acme.example/b")], &progress)
            .await;

        assert_eq!(progress.0.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn oversized_retry_after_fails_the_url_without_waiting() {
        let url = "https://acme.example/team";
        let scraper = Arc::new(ScriptedScraper::new(vec![(
            url,
            vec![
                Err(CollaboratorError::rate_limited(Some("86400"))),
                Ok("Jane Doe, CEO".to_string()),
            ],
        )]));

        let extractor = Extractor::new(scraper.clone(), &PipelineConfig::default());
        let content = tokio::time::timeout(
            Duration::from_secs(3),
            extractor.extract(&[scored(url)], &NoProgress),
        )
        .await
        .expect("extraction must not sleep for the server's Retry-After");

        match &content[url] {
            ExtractedContent::Failed { error, attempts } => {
                assert_eq!(*attempts, 1);
                assert!(error.contains("rate limited"));
            }
            other => panic!("expected failed entry, got {other:?}"),
        }
        assert_eq!(scraper.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn retry_after_within_limit_is_honoured() {
        let url = "https://acme.example/team";
        let scraper = Arc::new(ScriptedScraper::new(vec![(
            url,
            vec![
                Err(CollaboratorError::RateLimited {
                    retry_after: Some(Duration::from_millis(30)),
                }),
                Ok("Jane Doe, CEO".to_string()),
            ],
        )]));

        let config = PipelineConfig {
            max_retry_delay: Duration::from_millis(50),
            ..config(1)
        };
        let content = Extractor::new(scraper.clone(), &config)
            .extract(&[scored(url)], &NoProgress)
            .await;

        assert!(content[url].is_extracted());
        assert_eq!(scraper.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn backoff_doubles_and_honours_retry_after() {
        let base = Duration::from_millis(100);
        let max = Duration::from_secs(30);
        assert_eq!(backoff_delay(base, 0, None, max), Some(Duration::from_millis(100)));
        assert_eq!(backoff_delay(base, 2, None, max), Some(Duration::from_millis(400)));
        assert_eq!(
            backoff_delay(base, 0, Some(Duration::from_secs(3)), max),
            Some(Duration::from_secs(3))
        );
        assert_eq!(
            backoff_delay(base, 3, Some(Duration::from_millis(10)), max),
            Some(Duration::from_millis(800))
        );
    }

    #[test]
    fn backoff_is_capped() {
        let max = Duration::from_secs(30);
        assert_eq!(backoff_delay(Duration::from_secs(1), 10, None, max), Some(max));
        assert_eq!(backoff_delay(Duration::from_secs(1), 0, Some(max), max), Some(max));
        assert_eq!(
            backoff_delay(Duration::from_secs(1), 0, Some(Duration::from_secs(86_400)), max),
            None
        );
    }
}
