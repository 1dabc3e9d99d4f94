//! End-to-end run: validate → (website branch ∥ profile branch) → aggregate.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{info, instrument};
use url::Url;

use leadscope_discovery::{Discoverer, HtmlLinkMapper};
use leadscope_extractor::{ExtractionProgress, Extractor, HttpScraper};
use leadscope_filter::RelevanceFilter;
use leadscope_profile::ProfileAnalyzer;
use leadscope_providers::{FirecrawlClient, OpenAiClient, ScrapingDogClient};
use leadscope_shared::{
    AnalysisOutput, AnalysisSink, AppConfig, CompanyContext, ContentScraper, InsightStructurer,
    IntelligenceRequest, PipelineConfig, ProfileInsights, ProfileScraper, RelevanceScorer, Result,
    SiteMapper, WebsiteAnalysis, resolve_api_key,
};
use leadscope_storage::JsonFileSink;

use crate::aggregate::Aggregator;
use crate::validate::{ValidatedRequest, validate};

const OBJECTIVE: &str = "business intelligence gathering";

// ---------------------------------------------------------------------------
// Progress reporting
// ---------------------------------------------------------------------------

/// Result of one pipeline run.
#[derive(Debug, Clone)]
pub struct RunResult {
    pub output: AnalysisOutput,
    /// Where the record was saved; `None` when saving failed.
    pub saved_to: Option<String>,
    pub elapsed: Duration,
}

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter: Send + Sync {
    /// Called when a stage starts.
    fn phase(&self, name: &str);
    /// Called when one selected URL has been scraped (or given up on).
    fn url_scraped(&self, url: &str, succeeded: bool, completed: usize, total: usize);
    /// Called when the run completes.
    fn done(&self, result: &RunResult);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn url_scraped(&self, _url: &str, _succeeded: bool, _completed: usize, _total: usize) {}
    fn done(&self, _result: &RunResult) {}
}

/// Bridges extractor callbacks to the pipeline reporter.
struct ScrapeProgress<'a>(&'a dyn ProgressReporter);

impl ExtractionProgress for ScrapeProgress<'_> {
    fn url_finished(&self, url: &str, succeeded: bool, completed: usize, total: usize) {
        self.0.url_scraped(url, succeeded, completed, total);
    }
}

// ---------------------------------------------------------------------------
// Collaborator wiring
// ---------------------------------------------------------------------------

/// The external services one pipeline instance talks to.
///
/// Built once per process; every field is shared by all runs.
pub struct Collaborators {
    pub mapper: Arc<dyn SiteMapper>,
    pub scraper: Arc<dyn ContentScraper>,
    /// `None` selects the heuristic filter.
    pub scorer: Option<Arc<dyn RelevanceScorer>>,
    /// `None` yields mock profiles.
    pub profile_scraper: Option<Arc<dyn ProfileScraper>>,
    /// `None` uses the fallback business notes.
    pub structurer: Option<Arc<dyn InsightStructurer>>,
    pub sink: Arc<dyn AnalysisSink>,
}

impl Collaborators {
    /// Pick hosted services whose API keys are present, built-ins otherwise.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let pipeline = PipelineConfig::from(config);

        let (mapper, scraper): (Arc<dyn SiteMapper>, Arc<dyn ContentScraper>) =
            match resolve_api_key(&config.firecrawl.api_key_env) {
                Some(key) => {
                    let client = Arc::new(
                        FirecrawlClient::new(key, pipeline.scrape_timeout)?
                            .with_base_url(&config.firecrawl.base_url),
                    );
                    (client.clone(), client)
                }
                None => {
                    info!(
                        env = %config.firecrawl.api_key_env,
                        "no site-mapping key, using built-in link harvesting and direct fetches"
                    );
                    (
                        Arc::new(HtmlLinkMapper::new(pipeline.discovery_timeout)?),
                        Arc::new(HttpScraper::new(pipeline.scrape_timeout)?),
                    )
                }
            };

        let openai = match resolve_api_key(&config.openai.api_key_env) {
            Some(key) => {
                let timeout = pipeline.scoring_timeout.max(pipeline.structuring_timeout);
                Some(Arc::new(
                    OpenAiClient::new(key, &config.openai.model, timeout)?
                        .with_base_url(&config.openai.base_url),
                ))
            }
            None => {
                info!(env = %config.openai.api_key_env, "no language-model key, using heuristic scoring");
                None
            }
        };

        let profile_scraper = match resolve_api_key(&config.scrapingdog.api_key_env) {
            Some(key) => Some(Arc::new(
                ScrapingDogClient::new(key, config.scrapingdog.premium, pipeline.profile_timeout)?
                    .with_base_url(&config.scrapingdog.base_url),
            ) as Arc<dyn ProfileScraper>),
            None => {
                info!(env = %config.scrapingdog.api_key_env, "no profile-scraper key, profiles will be mocked");
                None
            }
        };

        Ok(Self {
            mapper,
            scraper,
            scorer: openai.clone().map(|c| c as Arc<dyn RelevanceScorer>),
            profile_scraper,
            structurer: openai.map(|c| c as Arc<dyn InsightStructurer>),
            sink: Arc::new(JsonFileSink::new(&config.output.output_dir, config.output.pretty)),
        })
    }
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

pub struct IntelligencePipeline {
    discoverer: Discoverer,
    filter: RelevanceFilter,
    extractor: Extractor,
    profile: ProfileAnalyzer,
    aggregator: Aggregator,
}

impl IntelligencePipeline {
    pub fn new(collaborators: Collaborators, config: &PipelineConfig) -> Self {
        let Collaborators {
            mapper,
            scraper,
            scorer,
            profile_scraper,
            structurer,
            sink,
        } = collaborators;

        Self {
            discoverer: Discoverer::new(mapper, config),
            filter: RelevanceFilter::new(scorer, config),
            extractor: Extractor::new(scraper, config),
            profile: ProfileAnalyzer::new(profile_scraper, structurer, config),
            aggregator: Aggregator::new(sink),
        }
    }

    /// Run one request to completion.
    ///
    /// Only validation errors are returned; every collaborator failure is
    /// absorbed by its stage and the caller always gets a complete record.
    #[instrument(skip_all, fields(first_name = %request.first_name, last_name = %request.last_name))]
    pub async fn run(
        &self,
        request: &IntelligenceRequest,
        progress: &dyn ProgressReporter,
    ) -> Result<RunResult> {
        let start = Instant::now();

        progress.phase("Validating request");
        let validated = validate(request)?;

        info!(
            website = validated.website.as_ref().map(Url::as_str),
            profile_url = validated.profile_url.as_deref(),
            "starting intelligence collection"
        );

        let website_branch = async {
            match &validated.website {
                Some(root) => self.analyze_website(&validated, root, progress).await,
                None => WebsiteAnalysis::skipped(),
            }
        };
        let profile_branch = async {
            match &validated.profile_url {
                Some(url) => {
                    progress.phase("Analyzing profile");
                    self.profile.analyze(url).await
                }
                None => ProfileInsights::skipped(),
            }
        };
        let (website, profile) = tokio::join!(website_branch, profile_branch);

        progress.phase("Saving results");
        let aggregated = self.aggregator.aggregate(&validated, profile, website).await;

        let result = RunResult {
            output: aggregated.output,
            saved_to: aggregated.saved_to,
            elapsed: start.elapsed(),
        };

        info!(
            request_id = %result.output.request_id,
            profile_status = result.output.linkedin_analysis.status.as_str(),
            discovered = result.output.website_analysis.discovered_urls.len(),
            selected = result.output.website_analysis.filtered_urls.len(),
            elapsed_ms = result.elapsed.as_millis(),
            "intelligence collection complete"
        );

        progress.done(&result);
        Ok(result)
    }

    async fn analyze_website(
        &self,
        request: &ValidatedRequest,
        root: &Url,
        progress: &dyn ProgressReporter,
    ) -> WebsiteAnalysis {
        progress.phase("Discovering URLs");
        let discovered_urls = self.discoverer.discover(root).await;

        progress.phase("Scoring URLs");
        let context = company_context(request, root);
        let filtered_urls = self.filter.filter(&discovered_urls, &context).await;

        progress.phase("Extracting content");
        let scraped_content = self
            .extractor
            .extract(&filtered_urls, &ScrapeProgress(progress))
            .await;

        WebsiteAnalysis {
            discovered_urls,
            filtered_urls,
            scraped_content,
        }
    }
}

fn company_context(request: &ValidatedRequest, root: &Url) -> CompanyContext {
    CompanyContext {
        company_name: format!("{}'s company", request.full_name()),
        website: root.to_string(),
        objective: OBJECTIVE.to_string(),
    }
}
