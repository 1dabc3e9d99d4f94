//! Relevance filtering: score discovered URLs, then pick a bounded, diverse subset.
//!
//! The primary path asks a [`RelevanceScorer`] collaborator. When none is
//! configured, or the call fails, the path-pattern [`heuristic`] produces the
//! same [`ScoredUrl`] shape, tagged with [`ScoringMethod::Heuristic`]. Both
//! paths feed the same [`select_diverse`] step. Filtering never fails.

mod diversity;
pub mod heuristic;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, instrument, warn};
use url::Url;

use leadscope_shared::{
    Category, CompanyContext, DiscoveredUrl, PipelineConfig, RawScore, RelevanceScorer, ScoredUrl,
    ScoringMethod, dedup_key, with_timeout,
};

pub use diversity::{SelectionPolicy, select_diverse};

/// Score given to discovered URLs the scorer did not return.
const INCOMPLETE_SCORE: u8 = 40;
const INCOMPLETE_REASON: &str = "AI scoring incomplete - using fallback";
const MISSING_REASON: &str = "No reason provided";

/// Relevance filter stage.
pub struct RelevanceFilter {
    scorer: Option<Arc<dyn RelevanceScorer>>,
    policy: SelectionPolicy,
    timeout: Duration,
}

impl RelevanceFilter {
    pub fn new(scorer: Option<Arc<dyn RelevanceScorer>>, config: &PipelineConfig) -> Self {
        Self {
            scorer,
            policy: SelectionPolicy {
                budget: config.selection_budget,
                per_category_cap: config.per_category_cap,
                min_score: config.min_score,
            },
            timeout: config.scoring_timeout,
        }
    }

    /// Score `urls` and return the selected subset, best first.
    #[instrument(skip_all, fields(urls = urls.len(), company = %context.company_name))]
    pub async fn filter(&self, urls: &[DiscoveredUrl], context: &CompanyContext) -> Vec<ScoredUrl> {
        if urls.is_empty() {
            return Vec::new();
        }

        let candidates = match self.score_with_collaborator(urls, context).await {
            Some(scored) => scored,
            None => urls.iter().map(|u| heuristic::score_url(&u.url)).collect(),
        };

        let method = candidates
            .first()
            .map(|c| c.method)
            .unwrap_or(ScoringMethod::Heuristic);
        let selected = select_diverse(candidates, self.policy);

        info!(
            selected = selected.len(),
            method = ?method,
            "relevance filtering complete"
        );
        selected
    }

    /// `None` means "use the heuristic": no scorer, a failed call, or an
    /// answer that matched none of the discovered URLs.
    async fn score_with_collaborator(
        &self,
        urls: &[DiscoveredUrl],
        context: &CompanyContext,
    ) -> Option<Vec<ScoredUrl>> {
        let Some(scorer) = &self.scorer else {
            debug!("no relevance scorer configured, using heuristic scoring");
            return None;
        };

        let url_list: Vec<String> = urls.iter().map(|u| u.url.clone()).collect();
        match with_timeout(self.timeout, scorer.score(&url_list, context)).await {
            Ok(raw) => {
                let scored = reconcile(raw, urls);
                if scored.is_none() {
                    warn!(scorer = scorer.name(), "scorer returned no usable scores, using heuristic scoring");
                }
                scored
            }
            Err(e) => {
                warn!(scorer = scorer.name(), error = %e, "relevance scoring failed, using heuristic scoring");
                None
            }
        }
    }
}

/// Align scorer output with the discovered set, in discovery order.
///
/// Scores are clamped to `0..=100`, blank fields get defaults, unknown URLs
/// are dropped and omitted ones get [`INCOMPLETE_SCORE`].
fn reconcile(raw: Vec<RawScore>, discovered: &[DiscoveredUrl]) -> Option<Vec<ScoredUrl>> {
    let mut by_key: HashMap<String, RawScore> = HashMap::new();
    for item in raw {
        by_key.entry(match_key(&item.url)).or_insert(item);
    }

    let mut matched = 0usize;
    let mut scored = Vec::with_capacity(discovered.len());

    for d in discovered {
        match by_key.remove(&match_key(&d.url)) {
            Some(item) => {
                matched += 1;
                let reason = item
                    .reason
                    .filter(|r| !r.trim().is_empty())
                    .unwrap_or_else(|| MISSING_REASON.to_string());
                scored.push(ScoredUrl {
                    url: d.url.clone(),
                    score: item.score.clamp(0, 100) as u8,
                    reason,
                    category: item.category.map(Category::new).unwrap_or_else(Category::other),
                    method: ScoringMethod::Ai,
                });
            }
            None => scored.push(ScoredUrl {
                url: d.url.clone(),
                score: INCOMPLETE_SCORE,
                reason: INCOMPLETE_REASON.to_string(),
                category: Category::other(),
                method: ScoringMethod::Ai,
            }),
        }
    }

    if !by_key.is_empty() {
        debug!(dropped = by_key.len(), "scorer returned URLs that were not discovered");
    }
    if matched < discovered.len() {
        warn!(
            scored = matched,
            expected = discovered.len(),
            "scorer response incomplete"
        );
    }

    (matched > 0).then_some(scored)
}

fn match_key(raw: &str) -> String {
    Url::parse(raw.trim())
        .map(|u| dedup_key(&u))
        .unwrap_or_else(|_| raw.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    use async_trait::async_trait;
    use leadscope_shared::{CollabResult, CollaboratorError};

    struct FixedScorer(CollabResult<Vec<RawScore>>);

    #[async_trait]
    impl RelevanceScorer for FixedScorer {
        async fn score(&self, _urls: &[String], _context: &CompanyContext) -> CollabResult<Vec<RawScore>> {
            self.0.clone()
        }

        fn name(&self) -> &str {
            "fixed"
        }
    }

    fn raw(url: &str, score: i64, category: Option<&str>) -> RawScore {
        RawScore {
            url: url.to_string(),
            score,
            reason: Some(format!("score {score}")),
            category: category.map(str::to_string),
        }
    }

    fn context() -> CompanyContext {
        CompanyContext {
            company_name: "Ada Lovelace's company".into(),
            website: "https://acme.example/".into(),
            objective: "business intelligence gathering".into(),
        }
    }

    fn discovered(paths: &[&str]) -> Vec<DiscoveredUrl> {
        paths
            .iter()
            .map(|p| DiscoveredUrl::new(format!("https://acme.example/{p}")))
            .collect()
    }

    fn filter(scorer: Option<FixedScorer>, budget: usize, cap: usize) -> RelevanceFilter {
        let config = PipelineConfig {
            selection_budget: budget,
            per_category_cap: cap,
            ..PipelineConfig::default()
        };
        RelevanceFilter::new(
            scorer.map(|s| Arc::new(s) as Arc<dyn RelevanceScorer>),
            &config,
        )
    }

    #[tokio::test]
    async fn scorer_ranking_with_category_cap() {
        let urls = discovered(&["a", "b", "c", "d", "e"]);
        let scorer = FixedScorer(Ok(vec![
            raw("https://acme.example/a", 90, Some("product")),
            raw("https://acme.example/b", 85, Some("product")),
            raw("https://acme.example/c", 80, Some("leadership")),
            raw("https://acme.example/d", 40, Some("careers")),
            raw("https://acme.example/e", 10, Some("misc")),
        ]));

        let selected = filter(Some(scorer), 3, 1).filter(&urls, &context()).await;

        let got: Vec<&str> = selected.iter().map(|s| s.url.as_str()).collect();
        assert_eq!(
            got,
            vec!["https://acme.example/a", "https://acme.example/c", "https://acme.example/d"]
        );
        assert!(selected.iter().all(|s| s.method == ScoringMethod::Ai));
    }

    #[tokio::test]
    async fn scorer_failure_falls_back_to_heuristic() {
        let urls = discovered(&["about", "privacy", "careers"]);
        let scorer = FixedScorer(Err(CollaboratorError::Http {
            status: 500,
            message: "boom".into(),
        }));

        let selected = filter(Some(scorer), 7, 2).filter(&urls, &context()).await;

        assert_eq!(selected.len(), 3);
        assert_eq!(selected[0].url, "https://acme.example/about");
        assert!(selected.iter().all(|s| s.method == ScoringMethod::Heuristic));
    }

    #[tokio::test]
    async fn no_scorer_uses_heuristic() {
        let urls = discovered(&["team"]);
        let selected = filter(None, 7, 2).filter(&urls, &context()).await;
        assert_eq!(selected[0].score, 90);
        assert_eq!(selected[0].method, ScoringMethod::Heuristic);
    }

    #[tokio::test]
    async fn empty_input_skips_scorer() {
        let scorer = FixedScorer(Err(CollaboratorError::Network("unreachable".into())));
        assert!(filter(Some(scorer), 7, 2).filter(&[], &context()).await.is_empty());
    }

    #[test]
    fn reconcile_cleans_scorer_output() {
        let urls = discovered(&["about", "blog"]);
        let response = vec![
            RawScore {
                url: "https://acme.example/about/".into(),
                score: 140,
                reason: None,
                category: None,
            },
            raw("https://elsewhere.example/x", 99, Some("other")),
        ];

        let scored = reconcile(response, &urls).unwrap();

        assert_eq!(scored.len(), 2);
        assert_eq!(scored[0].score, 100);
        assert_eq!(scored[0].reason, "No reason provided");
        assert_eq!(scored[0].category, Category::other());
        assert_eq!(scored[1].url, "https://acme.example/blog");
        assert_eq!(scored[1].score, 40);
        assert_eq!(scored[1].reason, "AI scoring incomplete - using fallback");
    }

    #[test]
    fn reconcile_rejects_unmatched_response() {
        let urls = discovered(&["about"]);
        assert!(reconcile(vec![raw("https://other.example/", 80, None)], &urls).is_none());
        assert!(reconcile(Vec::new(), &urls).is_none());
    }
}
