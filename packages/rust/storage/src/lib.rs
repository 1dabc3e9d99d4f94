//! JSON-file persistence for analysis records.
//!
//! One file per request: `<output_dir>/analysis_<request_id>.json`. Writes go
//! to a hidden temp file and are renamed into place, so a retried save
//! replaces the previous file whole and readers never see a partial record.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::{debug, info, instrument};

use leadscope_shared::{AnalysisOutput, AnalysisSink, LeadscopeError, RequestId, Result};

/// Persistence sink writing one pretty-printed JSON file per request.
#[derive(Debug, Clone)]
pub struct JsonFileSink {
    output_dir: PathBuf,
    pretty: bool,
}

impl JsonFileSink {
    pub fn new(output_dir: impl Into<PathBuf>, pretty: bool) -> Self {
        Self {
            output_dir: output_dir.into(),
            pretty,
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Path of the record for `request_id`.
    pub fn path_for(&self, request_id: &RequestId) -> PathBuf {
        self.output_dir.join(format!("analysis_{request_id}.json"))
    }

    /// Read a previously saved record back.
    pub async fn load(&self, request_id: &RequestId) -> Result<AnalysisOutput> {
        let path = self.path_for(request_id);
        let content = tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| LeadscopeError::io(&path, e))?;

        serde_json::from_str(&content).map_err(|e| {
            LeadscopeError::Serialization(format!("failed to parse {}: {e}", path.display()))
        })
    }

    fn render(&self, output: &AnalysisOutput) -> Result<String> {
        let rendered = if self.pretty {
            serde_json::to_string_pretty(output)
        } else {
            serde_json::to_string(output)
        };
        rendered.map_err(|e| LeadscopeError::Serialization(e.to_string()))
    }
}

#[async_trait]
impl AnalysisSink for JsonFileSink {
    #[instrument(skip_all, fields(request_id = %output.request_id))]
    async fn save(&self, output: &AnalysisOutput) -> Result<String> {
        let json = self.render(output)?;

        tokio::fs::create_dir_all(&self.output_dir)
            .await
            .map_err(|e| LeadscopeError::io(&self.output_dir, e))?;

        let target = self.path_for(&output.request_id);
        let temp = self
            .output_dir
            .join(format!(".analysis_{}.json.tmp", output.request_id));

        tokio::fs::write(&temp, json.as_bytes())
            .await
            .map_err(|e| LeadscopeError::io(&temp, e))?;
        debug!(temp = %temp.display(), bytes = json.len(), "record written");

        // Atomic rename
        tokio::fs::rename(&temp, &target)
            .await
            .map_err(|e| LeadscopeError::io(&target, e))?;

        info!(path = %target.display(), "analysis saved");
        Ok(target.display().to_string())
    }
}
