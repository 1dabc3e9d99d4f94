//! Error types for leadscope.
//!
//! Library crates use [`LeadscopeError`] via `thiserror`; calls into external
//! collaborators (site mapper, scraper, scorer, profile scraper) return
//! [`CollaboratorError`] so stages can pick a fallback or degradation path.
//! The cli wraps both with `color-eyre` for rich diagnostics.

use std::path::PathBuf;
use std::time::Duration;

/// Top-level error type for leadscope operations.
#[derive(Debug, thiserror::Error)]
pub enum LeadscopeError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Request validation error. Never retried.
    #[error("validation error: {message}")]
    Validation { message: String },

    /// A profile URL that cannot be parsed into a profile identifier.
    #[error("invalid profile URL {url:?}: {reason}")]
    InvalidProfileUrl { url: String, reason: String },

    /// Network/HTTP error while building or using a client.
    #[error("network error: {0}")]
    Network(String),

    /// Response or document parsing error.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// Persistence sink error.
    #[error("storage error: {0}")]
    Storage(String),

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// JSON/TOML (de)serialization error.
    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, LeadscopeError>;

impl LeadscopeError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a parse error from any displayable message.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse {
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Create an invalid-profile-URL error.
    pub fn invalid_profile_url(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidProfileUrl {
            url: url.into(),
            reason: reason.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether this error came from request validation.
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation { .. })
    }
}

// ---------------------------------------------------------------------------
// CollaboratorError
// ---------------------------------------------------------------------------

/// Failure of a single call to an external collaborator.
///
/// None of these propagate as a whole-pipeline failure; each stage maps them
/// onto its own fallback, degradation or per-item error entry.
#[derive(Debug, Clone, thiserror::Error)]
pub enum CollaboratorError {
    /// No API key (or other credential) is configured for the service.
    #[error("{service}: credentials not configured")]
    MissingCredentials { service: String },

    /// The service answered 429.
    #[error("rate limited")]
    RateLimited { retry_after: Option<Duration> },

    /// Non-success HTTP status other than 429/404.
    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    /// Connection, DNS or body-read failure.
    #[error("network error: {0}")]
    Network(String),

    /// The call exceeded its per-call timeout.
    #[error("timed out after {0:?}")]
    Timeout(Duration),

    /// The service answered but the payload was unusable.
    #[error("invalid response: {0}")]
    Parse(String),

    /// The requested resource does not exist upstream.
    #[error("not found: {0}")]
    NotFound(String),
}

/// Result alias for collaborator calls.
pub type CollabResult<T> = std::result::Result<T, CollaboratorError>;

impl CollaboratorError {
    /// Create a missing-credentials error for the named service.
    pub fn missing_credentials(service: impl Into<String>) -> Self {
        Self::MissingCredentials {
            service: service.into(),
        }
    }

    /// Create a rate-limit error from a raw `Retry-After` header value.
    ///
    /// Only the delta-seconds form is understood; HTTP dates are ignored.
    pub fn rate_limited(retry_after: Option<&str>) -> Self {
        Self::RateLimited {
            retry_after: retry_after
                .and_then(|v| v.trim().parse::<u64>().ok())
                .map(Duration::from_secs),
        }
    }

    /// Whether the call should be retried after a backoff.
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Self::RateLimited { .. })
    }

    /// Whether the failure is caused by missing configuration.
    pub fn is_missing_credentials(&self) -> bool {
        matches!(self, Self::MissingCredentials { .. })
    }
}
