//! Deterministic extraction of the fixed insight fields from a raw payload.
//!
//! Payload keys follow the profile-scraper response (`fullName`,
//! `experience[].company_name`, `education[].school`, ...). Missing or
//! oddly-typed keys degrade to empty values rather than errors.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Value, json};

use leadscope_shared::{EducationSummary, ExperienceSummary, NetworkSignals, ProfileSummary};

const RECENT_COMPANIES: usize = 5;

static YEAR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(19|20)\d{2}\b").expect("valid regex"));

/// A payload that arrives as a one-element array is the single profile inside it.
pub fn unwrap_payload(raw: Value) -> Value {
    match raw {
        Value::Array(mut items) if items.len() == 1 => items.remove(0),
        other => other,
    }
}

/// Whether the payload carries anything worth structuring.
pub fn has_profile_data(payload: &Value) -> bool {
    match payload {
        Value::Object(map) => !map.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Null => false,
        Value::String(s) => !s.trim().is_empty(),
        _ => true,
    }
}

pub fn summary(payload: &Value, profile_id: &str) -> ProfileSummary {
    let public_id = text(payload, "public_identifier");
    ProfileSummary {
        full_name: full_name(payload),
        headline: text(payload, "headline"),
        location: text(payload, "location"),
        about: text(payload, "about"),
        profile_id: if public_id.is_empty() {
            profile_id.to_string()
        } else {
            public_id
        },
    }
}

/// Work history. `current_year` closes open-ended positions.
pub fn experience(payload: &Value, current_year: i32) -> ExperienceSummary {
    let positions = list(payload, "experience");

    let current_position = positions
        .iter()
        .find(|p| is_open_ended(p))
        .or_else(|| positions.first())
        .map(|p| (*p).clone());

    let total_years: i32 = positions
        .iter()
        .map(|p| match (year_of(p.get("starts_at")), year_of(p.get("ends_at"))) {
            (Some(start), Some(end)) => (end - start).max(0),
            (Some(start), None) => (current_year - start).max(0),
            _ => 0,
        })
        .sum();

    let mut companies: Vec<String> = Vec::new();
    for p in &positions {
        let name = text(p, "company_name");
        if !name.is_empty() && !companies.contains(&name) {
            companies.push(name);
        }
    }

    let recent_companies = positions
        .iter()
        .take(RECENT_COMPANIES)
        .map(|p| text(p, "company_name"))
        .filter(|c| !c.is_empty())
        .collect();

    ExperienceSummary {
        current_position,
        total_positions: positions.len(),
        total_experience_years: u32::try_from(total_years).unwrap_or(0),
        companies,
        recent_companies,
    }
}

pub fn education(payload: &Value) -> EducationSummary {
    let entries = list(payload, "education");
    let collect = |key: &str| -> Vec<String> {
        entries
            .iter()
            .map(|e| text(e, key))
            .filter(|s| !s.is_empty())
            .collect()
    };

    EducationSummary {
        schools: collect("school"),
        degrees: collect("degree"),
        fields_of_study: collect("field_of_study"),
    }
}

pub fn network(payload: &Value) -> NetworkSignals {
    let opt = |key: &str| Some(text(payload, key)).filter(|s| !s.is_empty());
    NetworkSignals {
        followers: opt("followers"),
        connections: opt("connections"),
    }
}

/// Plain-text rendering of a profile, used as language-model input.
pub fn profile_text(payload: &Value) -> String {
    let mut lines = Vec::new();

    let name = full_name(payload);
    if !name.is_empty() {
        lines.push(format!("Name: {name}"));
    }
    for (label, key) in [("Headline", "headline"), ("Location", "location"), ("About", "about")] {
        let value = text(payload, key);
        if !value.is_empty() {
            lines.push(format!("{label}: {value}"));
        }
    }

    let positions = list(payload, "experience");
    if !positions.is_empty() {
        lines.push("Work Experience:".to_string());
        for p in positions {
            let ends = Some(text(p, "ends_at"))
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| "Present".to_string());
            lines.push(format!(
                "  - {} at {} ({} - {ends})",
                or_unknown(text(p, "position"), "Position"),
                or_unknown(text(p, "company_name"), "Company"),
                text(p, "starts_at"),
            ));
        }
    }

    let schools = list(payload, "education");
    if !schools.is_empty() {
        lines.push("Education:".to_string());
        for e in schools {
            lines.push(format!(
                "  - {} in {} from {}",
                or_unknown(text(e, "degree"), "Degree"),
                text(e, "field_of_study"),
                or_unknown(text(e, "school"), "School"),
            ));
        }
    }

    for (label, key, noun) in [
        ("Articles", "articles", "published"),
        ("Activities", "activities", "recent activities"),
    ] {
        let count = list(payload, key).len();
        if count > 0 {
            lines.push(format!("{label}: {count} {noun}"));
        }
    }

    lines.join("\n")
}

/// Business notes used when no language model is configured.
pub fn fallback_notes() -> Value {
    json!({
        "skills_analysis": {
            "detected_skills": [],
            "confidence": "low",
            "method": "fallback"
        },
        "industry_expertise": {
            "primary_industry": "unknown",
            "reasoning": "AI analysis unavailable"
        },
        "career_trajectory": {
            "progression": "unknown",
            "stability": "unknown"
        },
        "business_network": {
            "strength": "unknown",
            "influence": "unknown"
        },
        "thought_leadership": {
            "content_quality": "unknown",
            "engagement_level": "unknown"
        },
        "analysis_quality": "fallback_basic"
    })
}

// ---------------------------------------------------------------------------
// Value helpers
// ---------------------------------------------------------------------------

fn full_name(payload: &Value) -> String {
    let full = text(payload, "fullName");
    if !full.is_empty() {
        return full;
    }
    [text(payload, "first_name"), text(payload, "last_name")]
        .into_iter()
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// String-ish field as trimmed text; numbers are rendered, anything else is empty.
fn text(value: &Value, key: &str) -> String {
    match value.get(key) {
        Some(Value::String(s)) => s.trim().to_string(),
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    }
}

fn list<'a>(value: &'a Value, key: &str) -> Vec<&'a Value> {
    value
        .get(key)
        .and_then(Value::as_array)
        .map(|items| items.iter().collect())
        .unwrap_or_default()
}

fn or_unknown(value: String, what: &str) -> String {
    if value.is_empty() {
        format!("Unknown {what}")
    } else {
        value
    }
}

fn is_open_ended(position: &Value) -> bool {
    match position.get("ends_at") {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.trim().is_empty() || s.trim().eq_ignore_ascii_case("present"),
        _ => false,
    }
}

/// Year from `"Jan 2022"`, `2022`, or `{"year": 2022}`.
fn year_of(value: Option<&Value>) -> Option<i32> {
    match value? {
        Value::String(s) => YEAR_RE.find(s).and_then(|m| m.as_str().parse().ok()),
        Value::Number(n) => n.as_i64().and_then(|y| i32::try_from(y).ok()),
        Value::Object(map) => year_of(map.get("year")),
        _ => None,
    }
}
