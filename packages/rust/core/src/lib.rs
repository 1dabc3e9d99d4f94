//! Pipeline orchestration for leadscope.
//!
//! Ties validation, the website branch (discovery → filter → extraction), the
//! profile branch and aggregation into one end-to-end run per request.

pub mod aggregate;
pub mod pipeline;
pub mod validate;

pub use aggregate::{Aggregated, Aggregator};
pub use pipeline::{Collaborators, IntelligencePipeline, ProgressReporter, RunResult, SilentProgress};
pub use validate::{ValidatedRequest, validate};
