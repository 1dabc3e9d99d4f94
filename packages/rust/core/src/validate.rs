//! Request validation and URL canonicalization.

use url::Url;

use leadscope_shared::{IntelligenceRequest, LeadscopeError, Result, normalize_input_url};

const MAX_NAME_CHARS: usize = 100;

/// A request that passed validation, with canonical URLs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedRequest {
    pub first_name: String,
    pub last_name: String,
    pub website: Option<Url>,
    /// Trimmed only; identifier parsing belongs to the profile branch.
    pub profile_url: Option<String>,
}

impl ValidatedRequest {
    /// The request as it is recorded in the output.
    pub fn to_input(&self) -> IntelligenceRequest {
        IntelligenceRequest {
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            website: self.website.as_ref().map(Url::to_string),
            profile_url: self.profile_url.clone(),
        }
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// Validate a raw request. Pure: no I/O, no collaborator calls.
pub fn validate(request: &IntelligenceRequest) -> Result<ValidatedRequest> {
    let website_raw = non_blank(request.website.as_deref());
    let profile_url = non_blank(request.profile_url.as_deref());

    if website_raw.is_none() && profile_url.is_none() {
        return Err(LeadscopeError::validation(
            "at least one of website or profile_url required",
        ));
    }

    let first_name = validate_name("first_name", &request.first_name)?;
    let last_name = validate_name("last_name", &request.last_name)?;

    let website = match website_raw {
        Some(raw) => normalize_input_url(raw)?,
        None => None,
    };

    Ok(ValidatedRequest {
        first_name,
        last_name,
        website,
        profile_url: profile_url.map(str::to_string),
    })
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn validate_name(field: &str, value: &str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(LeadscopeError::validation(format!("{field} must not be empty")));
    }
    if trimmed.chars().count() > MAX_NAME_CHARS {
        return Err(LeadscopeError::validation(format!(
            "{field} must be at most {MAX_NAME_CHARS} characters"
        )));
    }
    Ok(trimmed.to_string())
}
