//! Seams to the external services the pipeline consumes.
//!
//! Each collaborator is a long-lived instance created once per process and
//! injected into the pipeline as `Arc<dyn Trait>`, so connection pools are
//! reused and tests can substitute fakes.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer};
use url::Url;

use crate::error::{CollabResult, CollaboratorError, Result};
use crate::types::{AnalysisOutput, CompanyContext, DiscoveredUrl};

/// Enumerates URLs reachable from a website root.
#[async_trait]
pub trait SiteMapper: Send + Sync {
    async fn map(&self, root: &Url) -> CollabResult<Vec<DiscoveredUrl>>;

    /// Human-readable name for tracing.
    fn name(&self) -> &str;
}

/// Fetches one URL and returns its content as Markdown/plain text.
#[async_trait]
pub trait ContentScraper: Send + Sync {
    async fn scrape(&self, url: &str) -> CollabResult<String>;

    fn name(&self) -> &str;
}

/// One scorer verdict, as returned by the service before validation.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RawScore {
    pub url: String,
    /// Integer, float (truncated) or numeric string.
    #[serde(deserialize_with = "lenient_score")]
    pub score: i64,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
}

fn lenient_score<'de, D>(deserializer: D) -> std::result::Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    let score = match &value {
        serde_json::Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f.trunc() as i64)),
        serde_json::Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>().ok().or_else(|| {
                s.parse::<f64>()
                    .ok()
                    .filter(|f| f.is_finite())
                    .map(|f| f.trunc() as i64)
            })
        }
        _ => None,
    };
    score.ok_or_else(|| D::Error::custom(format!("score is not numeric: {value}")))
}

/// Scores URLs for business-intelligence value.
#[async_trait]
pub trait RelevanceScorer: Send + Sync {
    async fn score(&self, urls: &[String], context: &CompanyContext) -> CollabResult<Vec<RawScore>>;

    fn name(&self) -> &str;
}

/// Fetches a raw professional-profile payload by identifier.
#[async_trait]
pub trait ProfileScraper: Send + Sync {
    async fn fetch_profile(&self, profile_id: &str) -> CollabResult<serde_json::Value>;

    fn name(&self) -> &str;
}

/// Derives business-relevant notes from a raw profile payload.
#[async_trait]
pub trait InsightStructurer: Send + Sync {
    async fn structure(&self, raw_profile: &serde_json::Value) -> CollabResult<serde_json::Value>;

    fn name(&self) -> &str;
}

/// Durable destination for finished output records.
///
/// `save` must be create-or-overwrite per request id: saving the same record
/// twice leaves exactly one stored copy.
#[async_trait]
pub trait AnalysisSink: Send + Sync {
    /// Persist the record, returning a human-readable location.
    async fn save(&self, output: &AnalysisOutput) -> Result<String>;
}

/// Run a collaborator call under a per-call timeout.
///
/// Expiry maps onto [`CollaboratorError::Timeout`], i.e. the call's ordinary
/// failure path.
pub async fn with_timeout<T, F>(timeout: Duration, call: F) -> CollabResult<T>
where
    F: Future<Output = CollabResult<T>>,
{
    match tokio::time::timeout(timeout, call).await {
        Ok(result) => result,
        Err(_) => Err(CollaboratorError::Timeout(timeout)),
    }
}
