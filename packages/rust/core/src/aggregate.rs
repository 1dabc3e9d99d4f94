//! Assembly of the output record and best-effort persistence.

use std::sync::Arc;

use tracing::{info, instrument, warn};

use leadscope_shared::{AnalysisOutput, AnalysisSink, ProfileInsights, RequestId, WebsiteAnalysis};

use crate::validate::ValidatedRequest;

/// An assembled record plus where it was saved, if saving worked.
#[derive(Debug, Clone)]
pub struct Aggregated {
    pub output: AnalysisOutput,
    pub saved_to: Option<String>,
}

pub struct Aggregator {
    sink: Arc<dyn AnalysisSink>,
}

impl Aggregator {
    pub fn new(sink: Arc<dyn AnalysisSink>) -> Self {
        Self { sink }
    }

    /// Build the record and hand it to the sink.
    ///
    /// A save failure is logged and leaves the record untouched.
    #[instrument(skip_all)]
    pub async fn aggregate(
        &self,
        request: &ValidatedRequest,
        profile: ProfileInsights,
        website: WebsiteAnalysis,
    ) -> Aggregated {
        let output = AnalysisOutput {
            request_id: RequestId::new(),
            timestamp: chrono::Utc::now(),
            input_data: request.to_input(),
            linkedin_analysis: profile,
            website_analysis: website,
        };

        let saved_to = match self.sink.save(&output).await {
            Ok(location) => {
                info!(request_id = %output.request_id, %location, "output saved");
                Some(location)
            }
            Err(e) => {
                warn!(request_id = %output.request_id, error = %e, "failed to save output, returning result anyway");
                None
            }
        };

        Aggregated { output, saved_to }
    }
}
