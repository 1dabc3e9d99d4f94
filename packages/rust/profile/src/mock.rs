//! Placeholder profile emitted when no profile-scraper credentials exist.

use serde_json::{Value, json};

/// Deterministic stand-in payload for `profile_id`, flagged with `"_mock": true`.
pub fn mock_profile(profile_id: &str) -> Value {
    json!({
        "_mock": true,
        "fullName": format!("Mock User {profile_id}"),
        "first_name": "Mock",
        "last_name": "User",
        "public_identifier": profile_id,
        "headline": "Software Engineer at Mock Company",
        "location": "San Francisco, CA",
        "followers": "1,234 followers",
        "connections": "500+ connections",
        "about": "This is a mock profile generated because no profile scraper credentials are configured.",
        "experience": [
            {
                "position": "Software Engineer",
                "company_name": "Mock Company",
                "location": "San Francisco, CA",
                "summary": "Building amazing software solutions",
                "starts_at": "Jan 2022",
                "ends_at": "Present",
                "duration": "2 years"
            }
        ],
        "education": [
            {
                "school": "Mock University",
                "degree": "Bachelor of Science in Computer Science",
                "field_of_study": "Computer Science",
                "starts_at": "2018",
                "ends_at": "2022"
            }
        ],
        "articles": [],
        "activities": []
    })
}

/// Whether a payload is a placeholder rather than real data.
pub fn is_mock(payload: &Value) -> bool {
    payload.get("_mock").and_then(Value::as_bool).unwrap_or(false)
}
