//! Profile URL → profile identifier.

use std::sync::LazyLock;

use regex::Regex;
use url::Url;

use leadscope_shared::{LeadscopeError, Result};

static PROFILE_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_-]{3,100}$").expect("valid regex"));

/// Extract the identifier from a `linkedin.com/in/<id>` URL.
///
/// The scheme is optional; query string, fragment and trailing slash are ignored.
pub fn parse_profile_id(raw: &str) -> Result<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(LeadscopeError::invalid_profile_url(raw, "profile URL is empty"));
    }

    let with_scheme = if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("https://{trimmed}")
    };

    let url = Url::parse(&with_scheme)
        .map_err(|e| LeadscopeError::invalid_profile_url(raw, format!("unparsable URL: {e}")))?;

    let host = url.host_str().unwrap_or_default();
    if !host.contains("linkedin.com") {
        return Err(LeadscopeError::invalid_profile_url(raw, "not a linkedin.com URL"));
    }

    let mut segments = url
        .path_segments()
        .into_iter()
        .flatten()
        .filter(|s| !s.is_empty());

    match (segments.next(), segments.next()) {
        (Some("in"), Some(id)) if PROFILE_ID_RE.is_match(id) => Ok(id.to_string()),
        (Some("in"), Some(id)) => Err(LeadscopeError::invalid_profile_url(
            raw,
            format!("invalid profile identifier {id:?}"),
        )),
        _ => Err(LeadscopeError::invalid_profile_url(
            raw,
            "expected /in/<profile-id> path",
        )),
    }
}

/// Canonical URL for a profile identifier.
pub fn canonical_profile_url(profile_id: &str) -> String {
    format!("https://www.linkedin.com/in/{profile_id}")
}
