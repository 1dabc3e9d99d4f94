//! Core domain types for the intelligence-collection pipeline.
//!
//! Every stage owns and returns new values of these types; nothing produced by
//! an earlier stage is mutated by a later one. [`AnalysisOutput`] is the unit
//! of persistence and its serialized shape is the contract for downstream
//! consumers of stored results.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// RequestId
// ---------------------------------------------------------------------------

/// A UUID v7 wrapper for request identifiers (time-sortable).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(pub Uuid);

impl RequestId {
    /// Generate a new time-sortable request identifier.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for RequestId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

// ---------------------------------------------------------------------------
// IntelligenceRequest
// ---------------------------------------------------------------------------

/// An incoming request: a person plus up to two sources to investigate.
///
/// Serialized with the stored-record field names (`company_website`, `linkedin`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntelligenceRequest {
    pub first_name: String,
    pub last_name: String,
    /// Company website root.
    #[serde(rename = "company_website", alias = "website", default)]
    pub website: Option<String>,
    /// Professional profile URL.
    #[serde(rename = "linkedin", alias = "profile_url", default)]
    pub profile_url: Option<String>,
}

/// Lightweight company context handed to the relevance scorer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanyContext {
    pub company_name: String,
    pub website: String,
    pub objective: String,
}

// ---------------------------------------------------------------------------
// Discovery / filtering
// ---------------------------------------------------------------------------

/// A URL found under a website root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveredUrl {
    pub url: String,
    #[serde(default)]
    pub title: Option<String>,
}

impl DiscoveredUrl {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            title: None,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }
}

/// Open-vocabulary category tag used only for diversity balancing.
///
/// Tags are trimmed and lower-cased; an empty tag becomes `"other"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Category(String);

impl Category {
    pub fn new(raw: impl AsRef<str>) -> Self {
        let tag = raw.as_ref().trim().to_lowercase();
        if tag.is_empty() {
            Self::other()
        } else {
            Self(tag)
        }
    }

    pub fn other() -> Self {
        Self("other".into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Category {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Which path produced a score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoringMethod {
    /// The language-model relevance scorer.
    Ai,
    /// The path-pattern fallback.
    Heuristic,
}

/// A discovered URL with its business-intelligence relevance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoredUrl {
    pub url: String,
    /// Relevance in `0..=100`.
    pub score: u8,
    pub reason: String,
    pub category: Category,
    pub method: ScoringMethod,
}

// ---------------------------------------------------------------------------
// Extraction
// ---------------------------------------------------------------------------

/// Extraction outcome for one URL.
///
/// Stored untagged: a success is the bare Markdown string, a failure is an
/// `{error, attempts}` object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ExtractedContent {
    /// Normalized Markdown text.
    Extracted(String),
    /// The URL could not be extracted; siblings are unaffected.
    Failed { error: String, attempts: u32 },
}

impl ExtractedContent {
    pub fn is_extracted(&self) -> bool {
        matches!(self, Self::Extracted(_))
    }

    pub fn content(&self) -> Option<&str> {
        match self {
            Self::Extracted(content) => Some(content),
            Self::Failed { .. } => None,
        }
    }
}

/// URL → extraction outcome, ordered by URL for stable output.
pub type ContentMap = BTreeMap<String, ExtractedContent>;

/// Result of the website branch. All fields are empty when the branch did not run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WebsiteAnalysis {
    pub discovered_urls: Vec<DiscoveredUrl>,
    pub filtered_urls: Vec<ScoredUrl>,
    pub scraped_content: ContentMap,
}

impl WebsiteAnalysis {
    /// Marker for a request that supplied no website.
    pub fn skipped() -> Self {
        Self::default()
    }
}

// ---------------------------------------------------------------------------
// Profile insights
// ---------------------------------------------------------------------------

/// Final state of the profile branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProfileStatus {
    /// Raw payload fetched and structured.
    Success,
    /// Raw payload fetched, structuring failed.
    Partial,
    /// Invalid URL, unreachable scraper, or no data.
    Failed,
    /// No profile URL in the request.
    Skipped,
    /// Placeholder payload; no scraper credentials configured.
    Mock,
}

impl ProfileStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Partial => "partial",
            Self::Failed => "failed",
            Self::Skipped => "skipped",
            Self::Mock => "mock",
        }
    }
}

/// Identity block derived from a raw profile.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileSummary {
    pub full_name: String,
    pub headline: String,
    pub location: String,
    pub about: String,
    pub profile_id: String,
}

/// Work history derived from a raw profile.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExperienceSummary {
    /// First open-ended position, or the most recent one.
    pub current_position: Option<serde_json::Value>,
    pub total_positions: usize,
    pub total_experience_years: u32,
    /// Distinct employers in first-seen order.
    pub companies: Vec<String>,
    /// Up to five most recent employers.
    pub recent_companies: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EducationSummary {
    pub schools: Vec<String>,
    pub degrees: Vec<String>,
    pub fields_of_study: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkSignals {
    pub followers: Option<String>,
    pub connections: Option<String>,
}

/// The fixed insight fields derived from a raw profile payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructuredFields {
    pub summary: ProfileSummary,
    pub experience: ExperienceSummary,
    pub education: EducationSummary,
    pub network: NetworkSignals,
    /// Business-relevant notes from the insight structurer.
    pub business_notes: serde_json::Value,
}

/// Profile payload kept in the output record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileData {
    pub profile_id: String,
    pub raw_profile: serde_json::Value,
    pub structured_fields: Option<StructuredFields>,
}

/// Result of the profile branch, stored as `linkedin_analysis`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileInsights {
    pub status: ProfileStatus,
    pub profile_data: Option<ProfileData>,
}

impl ProfileInsights {
    /// Marker for a request that supplied no profile URL.
    pub fn skipped() -> Self {
        Self {
            status: ProfileStatus::Skipped,
            profile_data: None,
        }
    }

    pub fn failed() -> Self {
        Self {
            status: ProfileStatus::Failed,
            profile_data: None,
        }
    }

    pub fn with_data(status: ProfileStatus, data: ProfileData) -> Self {
        Self {
            status,
            profile_data: Some(data),
        }
    }

    pub fn raw_profile(&self) -> Option<&serde_json::Value> {
        self.profile_data.as_ref().map(|d| &d.raw_profile)
    }

    pub fn structured_fields(&self) -> Option<&StructuredFields> {
        self.profile_data
            .as_ref()
            .and_then(|d| d.structured_fields.as_ref())
    }
}

// ---------------------------------------------------------------------------
// AnalysisOutput
// ---------------------------------------------------------------------------

/// The single structured report produced per request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisOutput {
    pub request_id: RequestId,
    pub timestamp: DateTime<Utc>,
    pub input_data: IntelligenceRequest,
    pub linkedin_analysis: ProfileInsights,
    pub website_analysis: WebsiteAnalysis,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_request() -> IntelligenceRequest {
        IntelligenceRequest {
            first_name: "Ada".into(),
            last_name: "Lovelace".into(),
            website: Some("https://example.com/".into()),
            profile_url: None,
        }
    }

    #[test]
    fn request_id_roundtrip() {
        let id = RequestId::new();
        let parsed: RequestId = id.to_string().parse().expect("parse RequestId");
        assert_eq!(id, parsed);
    }

    #[test]
    fn request_uses_stored_field_names() {
        let json = serde_json::to_value(sample_request()).expect("serialize");
        assert_eq!(json["company_website"], "https://example.com/");
        assert!(json["linkedin"].is_null());
        assert!(json.get("website").is_none());
    }

    #[test]
    fn request_accepts_short_field_names() {
        let parsed: IntelligenceRequest = serde_json::from_str(
            r#"{"first_name":"A","last_name":"B","website":"example.com","profile_url":"linkedin.com/in/abc"}"#,
        )
        .expect("deserialize");
        assert_eq!(parsed.website.as_deref(), Some("example.com"));
        assert_eq!(parsed.profile_url.as_deref(), Some("linkedin.com/in/abc"));
    }

    #[test]
    fn category_is_normalized() {
        assert_eq!(Category::new("  Leadership ").as_str(), "leadership");
        assert_eq!(Category::new("   "), Category::other());
    }

    #[test]
    fn extracted_content_stores_text_as_plain_string() {
        let ok = ExtractedContent::Extracted("# About".into());
        let json = serde_json::to_value(&ok).expect("serialize");
        assert_eq!(json, serde_json::json!("# About"));

        let failed = ExtractedContent::Failed {
            error: "HTTP 500".into(),
            attempts: 1,
        };
        let json = serde_json::to_value(&failed).expect("serialize");
        assert_eq!(json, serde_json::json!({"error": "HTTP 500", "attempts": 1}));

        let map: ContentMap = serde_json::from_value(serde_json::json!({
            "https://acme.example/about": "# About",
            "https://acme.example/team": {"error": "HTTP 500", "attempts": 1},
        }))
        .expect("deserialize");
        assert_eq!(map["https://acme.example/about"], ok);
        assert_eq!(map["https://acme.example/team"], failed);
        assert!(failed.content().is_none());
    }

    #[test]
    fn output_shape_keeps_every_key() {
        let output = AnalysisOutput {
            request_id: RequestId::new(),
            timestamp: Utc::now(),
            input_data: sample_request(),
            linkedin_analysis: ProfileInsights::skipped(),
            website_analysis: WebsiteAnalysis::skipped(),
        };

        let json = serde_json::to_value(&output).expect("serialize");
        for key in ["request_id", "timestamp", "input_data", "linkedin_analysis", "website_analysis"] {
            assert!(json.get(key).is_some(), "missing key {key}");
        }
        assert_eq!(json["linkedin_analysis"]["status"], "skipped");
        assert!(json["linkedin_analysis"]["profile_data"].is_null());
        assert_eq!(json["website_analysis"]["discovered_urls"], serde_json::json!([]));
        assert_eq!(json["website_analysis"]["filtered_urls"], serde_json::json!([]));
        assert_eq!(json["website_analysis"]["scraped_content"], serde_json::json!({}));

        let parsed: AnalysisOutput = serde_json::from_value(json).expect("deserialize");
        assert_eq!(parsed, output);
    }

    #[test]
    fn scored_url_serializes_method() {
        let scored = ScoredUrl {
            url: "https://example.com/about".into(),
            score: 95,
            reason: "Company overview and mission".into(),
            category: Category::new("leadership"),
            method: ScoringMethod::Heuristic,
        };
        let json = serde_json::to_value(&scored).expect("serialize");
        assert_eq!(json["method"], "heuristic");
        assert_eq!(json["category"], "leadership");
    }
}
