//! Professional-profile analysis.
//!
//! ```text
//! not_started ── parse id ──► fetching ──► succeeded   (status "success")
//!      │                         │    └──► degraded    (status "partial": raw kept, no fields)
//!      └─ invalid URL ──► failed ◄┘ error / no data
//!                 no credentials ──► mock (placeholder payload, status "mock")
//! ```
//!
//! Only an unparsable profile URL is an input error, and even that is
//! contained to this branch: [`ProfileAnalyzer::analyze`] always returns a
//! [`ProfileInsights`].

pub mod fields;
mod mock;
mod profile_url;

use std::sync::Arc;
use std::time::Duration;

use chrono::Datelike;
use serde_json::Value;
use tracing::{info, instrument, warn};

use leadscope_shared::{
    InsightStructurer, PipelineConfig, ProfileData, ProfileInsights, ProfileScraper, ProfileStatus,
    StructuredFields, with_timeout,
};

pub use mock::{is_mock, mock_profile};
pub use profile_url::{canonical_profile_url, parse_profile_id};

/// Profile branch of the pipeline.
pub struct ProfileAnalyzer {
    scraper: Option<Arc<dyn ProfileScraper>>,
    structurer: Option<Arc<dyn InsightStructurer>>,
    fetch_timeout: Duration,
    structure_timeout: Duration,
}

impl ProfileAnalyzer {
    pub fn new(
        scraper: Option<Arc<dyn ProfileScraper>>,
        structurer: Option<Arc<dyn InsightStructurer>>,
        config: &PipelineConfig,
    ) -> Self {
        Self {
            scraper,
            structurer,
            fetch_timeout: config.profile_timeout,
            structure_timeout: config.structuring_timeout,
        }
    }

    #[instrument(skip_all, fields(profile_url = %profile_url))]
    pub async fn analyze(&self, profile_url: &str) -> ProfileInsights {
        let profile_id = match parse_profile_id(profile_url) {
            Ok(id) => id,
            Err(e) => {
                warn!(error = %e, "profile URL rejected");
                return ProfileInsights::failed();
            }
        };

        let Some(scraper) = &self.scraper else {
            info!(%profile_id, "no profile scraper configured, emitting mock profile");
            return mock_insights(profile_id);
        };

        let raw = match with_timeout(self.fetch_timeout, scraper.fetch_profile(&profile_id)).await {
            Ok(raw) => raw,
            Err(e) if e.is_missing_credentials() => {
                info!(%profile_id, scraper = scraper.name(), "profile scraper has no credentials, emitting mock profile");
                return mock_insights(profile_id);
            }
            Err(e) => {
                warn!(%profile_id, scraper = scraper.name(), error = %e, "profile fetch failed");
                return ProfileInsights::failed();
            }
        };

        let payload = fields::unwrap_payload(raw);
        if !fields::has_profile_data(&payload) {
            warn!(%profile_id, "profile scraper returned no data");
            return ProfileInsights::failed();
        }

        let notes = match &self.structurer {
            None => fields::fallback_notes(),
            Some(structurer) => {
                match with_timeout(self.structure_timeout, structurer.structure(&payload)).await {
                    Ok(notes) => notes,
                    Err(e) => {
                        warn!(%profile_id, structurer = structurer.name(), error = %e, "profile structuring failed, keeping raw payload");
                        return ProfileInsights::with_data(
                            ProfileStatus::Partial,
                            ProfileData {
                                profile_id,
                                raw_profile: payload,
                                structured_fields: None,
                            },
                        );
                    }
                }
            }
        };

        let structured = structure_fields(&payload, &profile_id, notes);
        info!(%profile_id, positions = structured.experience.total_positions, "profile analysis complete");

        ProfileInsights::with_data(
            ProfileStatus::Success,
            ProfileData {
                profile_id,
                raw_profile: payload,
                structured_fields: Some(structured),
            },
        )
    }
}

/// Build the fixed fields from a payload plus business notes.
pub fn structure_fields(payload: &Value, profile_id: &str, business_notes: Value) -> StructuredFields {
    StructuredFields {
        summary: fields::summary(payload, profile_id),
        experience: fields::experience(payload, chrono::Utc::now().year()),
        education: fields::education(payload),
        network: fields::network(payload),
        business_notes,
    }
}

fn mock_insights(profile_id: String) -> ProfileInsights {
    let payload = mock_profile(&profile_id);
    let structured = structure_fields(&payload, &profile_id, fields::fallback_notes());
    ProfileInsights::with_data(
        ProfileStatus::Mock,
        ProfileData {
            profile_id,
            raw_profile: payload,
            structured_fields: Some(structured),
        },
    )
}
