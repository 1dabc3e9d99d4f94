//! Shared types, error model, collaborator seams and configuration for leadscope.
//!
//! This crate is the foundation depended on by all other leadscope crates.
//! It provides:
//! - [`LeadscopeError`] and [`CollaboratorError`]: the error model
//! - Domain types ([`IntelligenceRequest`], [`ScoredUrl`], [`AnalysisOutput`], ...)
//! - Collaborator traits ([`SiteMapper`], [`ContentScraper`], [`RelevanceScorer`], ...)
//! - Configuration ([`AppConfig`], [`PipelineConfig`], config loading)

pub mod collaborators;
pub mod config;
pub mod error;
pub mod types;
pub mod urls;

// Re-export public API at crate root for ergonomic imports.
pub use collaborators::{
    AnalysisSink, ContentScraper, InsightStructurer, ProfileScraper, RawScore, RelevanceScorer,
    SiteMapper, with_timeout,
};
pub use config::{
    AppConfig, FirecrawlConfig, OpenAiConfig, OutputConfig, PipelineConfig, PipelineSection,
    ScrapingDogConfig, TimeoutsSection, config_dir, config_file_path, init_config, load_config,
    load_config_from, resolve_api_key,
};
pub use error::{CollabResult, CollaboratorError, LeadscopeError, Result};
pub use types::{
    AnalysisOutput, Category, CompanyContext, ContentMap, DiscoveredUrl, EducationSummary,
    ExperienceSummary, ExtractedContent, IntelligenceRequest, NetworkSignals, ProfileData,
    ProfileInsights, ProfileStatus, ProfileSummary, RequestId, ScoredUrl, ScoringMethod,
    StructuredFields, WebsiteAnalysis,
};
pub use urls::{dedup_key, is_blocked_target, is_ssrf_target, normalize_input_url};
