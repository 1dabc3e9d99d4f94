//! Application configuration for leadscope.
//!
//! User config lives at `~/.leadscope/leadscope.toml`.
//! CLI flags override config file values, which override defaults.
//! API keys are never stored in the file; each provider names the env var
//! holding its key.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{LeadscopeError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "leadscope.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".leadscope";

// ---------------------------------------------------------------------------
// Config structs (matching leadscope.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub pipeline: PipelineSection,

    /// Per-call timeouts for external collaborators.
    #[serde(default)]
    pub timeouts: TimeoutsSection,

    #[serde(default)]
    pub firecrawl: FirecrawlConfig,

    #[serde(default)]
    pub openai: OpenAiConfig,

    #[serde(default)]
    pub scrapingdog: ScrapingDogConfig,

    #[serde(default)]
    pub output: OutputConfig,
}

/// `[pipeline]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineSection {
    /// Upper bound on URLs kept after discovery.
    #[serde(default = "default_max_discovered_urls")]
    pub max_discovered_urls: usize,

    /// Number of URLs the filter selects for extraction.
    #[serde(default = "default_selection_budget")]
    pub selection_budget: usize,

    /// Max selected URLs per category before backfilling.
    #[serde(default = "default_per_category_cap")]
    pub per_category_cap: usize,

    /// Scores below this only enter the selection as backfill.
    #[serde(default = "default_min_score")]
    pub min_score: u8,

    /// Concurrent scrape calls.
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,

    /// Retries after a rate-limited scrape, per URL.
    #[serde(default = "default_max_scrape_retries")]
    pub max_scrape_retries: u32,

    #[serde(default = "default_retry_base_delay_ms")]
    pub retry_base_delay_ms: u64,

    /// Longest single back-off. A `Retry-After` above this fails the URL.
    #[serde(default = "default_max_retry_delay_ms")]
    pub max_retry_delay_ms: u64,

    /// Extracted content is truncated to this many characters.
    #[serde(default = "default_max_content_chars")]
    pub max_content_chars: usize,
}

impl Default for PipelineSection {
    fn default() -> Self {
        Self {
            max_discovered_urls: default_max_discovered_urls(),
            selection_budget: default_selection_budget(),
            per_category_cap: default_per_category_cap(),
            min_score: default_min_score(),
            max_concurrency: default_max_concurrency(),
            max_scrape_retries: default_max_scrape_retries(),
            retry_base_delay_ms: default_retry_base_delay_ms(),
            max_retry_delay_ms: default_max_retry_delay_ms(),
            max_content_chars: default_max_content_chars(),
        }
    }
}

fn default_max_discovered_urls() -> usize {
    50
}
fn default_selection_budget() -> usize {
    7
}
fn default_per_category_cap() -> usize {
    2
}
fn default_min_score() -> u8 {
    30
}
fn default_max_concurrency() -> usize {
    3
}
fn default_max_scrape_retries() -> u32 {
    3
}
fn default_retry_base_delay_ms() -> u64 {
    1000
}
fn default_max_retry_delay_ms() -> u64 {
    30_000
}
fn default_max_content_chars() -> usize {
    50_000
}

/// `[timeouts]` section. All values in seconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeoutsSection {
    #[serde(default = "default_timeout_30")]
    pub discovery_secs: u64,
    #[serde(default = "default_timeout_30")]
    pub scoring_secs: u64,
    #[serde(default = "default_scrape_secs")]
    pub scrape_secs: u64,
    #[serde(default = "default_timeout_30")]
    pub profile_secs: u64,
    #[serde(default = "default_timeout_30")]
    pub structuring_secs: u64,
}

impl Default for TimeoutsSection {
    fn default() -> Self {
        Self {
            discovery_secs: default_timeout_30(),
            scoring_secs: default_timeout_30(),
            scrape_secs: default_scrape_secs(),
            profile_secs: default_timeout_30(),
            structuring_secs: default_timeout_30(),
        }
    }
}

fn default_timeout_30() -> u64 {
    30
}
fn default_scrape_secs() -> u64 {
    35
}

/// `[firecrawl]` section (site mapping + page scraping).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FirecrawlConfig {
    /// Name of the env var holding the API key (never store the key itself).
    #[serde(default = "default_firecrawl_key_env")]
    pub api_key_env: String,

    #[serde(default = "default_firecrawl_base_url")]
    pub base_url: String,
}

impl Default for FirecrawlConfig {
    fn default() -> Self {
        Self {
            api_key_env: default_firecrawl_key_env(),
            base_url: default_firecrawl_base_url(),
        }
    }
}

fn default_firecrawl_key_env() -> String {
    "FIRECRAWL_API_KEY".into()
}
fn default_firecrawl_base_url() -> String {
    "https://api.firecrawl.dev/v2".into()
}

/// `[openai]` section (relevance scoring + insight structuring).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAiConfig {
    #[serde(default = "default_openai_key_env")]
    pub api_key_env: String,

    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_openai_base_url")]
    pub base_url: String,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key_env: default_openai_key_env(),
            model: default_model(),
            base_url: default_openai_base_url(),
        }
    }
}

fn default_openai_key_env() -> String {
    "OPENAI_API_KEY".into()
}
fn default_model() -> String {
    "gpt-4o-mini".into()
}
fn default_openai_base_url() -> String {
    "https://api.openai.com/v1".into()
}

/// `[scrapingdog]` section (profile scraping).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrapingDogConfig {
    #[serde(default = "default_scrapingdog_key_env")]
    pub api_key_env: String,

    /// Use the premium proxy pool.
    #[serde(default)]
    pub premium: bool,

    #[serde(default = "default_scrapingdog_base_url")]
    pub base_url: String,
}

impl Default for ScrapingDogConfig {
    fn default() -> Self {
        Self {
            api_key_env: default_scrapingdog_key_env(),
            premium: false,
            base_url: default_scrapingdog_base_url(),
        }
    }
}

fn default_scrapingdog_key_env() -> String {
    "SCRAPINGDOG_API_KEY".into()
}
fn default_scrapingdog_base_url() -> String {
    "https://api.scrapingdog.com".into()
}

/// `[output]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Directory receiving one `analysis_<request_id>.json` per run.
    #[serde(default = "default_output_dir")]
    pub output_dir: String,

    #[serde(default = "default_true")]
    pub pretty: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            pretty: true,
        }
    }
}

fn default_output_dir() -> String {
    "outputs".into()
}
fn default_true() -> bool {
    true
}

// ---------------------------------------------------------------------------
// Pipeline config (runtime, merged from config + CLI flags)
// ---------------------------------------------------------------------------

/// Runtime pipeline configuration handed to the stages.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub max_discovered_urls: usize,
    pub selection_budget: usize,
    pub per_category_cap: usize,
    pub min_score: u8,
    pub max_concurrency: usize,
    pub max_scrape_retries: u32,
    pub retry_base_delay: Duration,
    pub max_retry_delay: Duration,
    pub max_content_chars: usize,
    pub discovery_timeout: Duration,
    pub scoring_timeout: Duration,
    pub scrape_timeout: Duration,
    pub profile_timeout: Duration,
    pub structuring_timeout: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self::from(&AppConfig::default())
    }
}

impl From<&AppConfig> for PipelineConfig {
    fn from(config: &AppConfig) -> Self {
        let p = &config.pipeline;
        let t = &config.timeouts;
        Self {
            max_discovered_urls: p.max_discovered_urls,
            selection_budget: p.selection_budget,
            per_category_cap: p.per_category_cap.max(1),
            min_score: p.min_score.min(100),
            max_concurrency: p.max_concurrency.max(1),
            max_scrape_retries: p.max_scrape_retries,
            retry_base_delay: Duration::from_millis(p.retry_base_delay_ms),
            max_retry_delay: Duration::from_millis(p.max_retry_delay_ms),
            max_content_chars: p.max_content_chars,
            discovery_timeout: Duration::from_secs(t.discovery_secs),
            scoring_timeout: Duration::from_secs(t.scoring_secs),
            scrape_timeout: Duration::from_secs(t.scrape_secs),
            profile_timeout: Duration::from_secs(t.profile_secs),
            structuring_timeout: Duration::from_secs(t.structuring_secs),
        }
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.leadscope/`).
pub fn config_dir() -> Result<PathBuf> {
    let home =
        dirs::home_dir().ok_or_else(|| LeadscopeError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.leadscope/leadscope.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| LeadscopeError::io(path, e))?;

    toml::from_str(&content)
        .map_err(|e| LeadscopeError::config(format!("failed to parse {}: {e}", path.display())))
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| LeadscopeError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let content = toml::to_string_pretty(&AppConfig::default())
        .map_err(|e| LeadscopeError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| LeadscopeError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Read an API key from the named env var. Unset or blank means "not configured".
pub fn resolve_api_key(env_var: &str) -> Option<String> {
    match std::env::var(env_var) {
        Ok(val) if !val.trim().is_empty() => Some(val.trim().to_string()),
        _ => None,
    }
}
