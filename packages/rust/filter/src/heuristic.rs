//! Path-pattern fallback scoring.
//!
//! Rules are checked in order; the first match wins.

use url::Url;

use leadscope_shared::{Category, ScoredUrl, ScoringMethod};

struct Rule {
    /// Any of these must appear in the lower-cased path.
    any_of: &'static [&'static str],
    /// All of these must also appear, when non-empty.
    requires: &'static [&'static str],
    score: u8,
    reason: &'static str,
    category: &'static str,
}

const RULES: &[Rule] = &[
    Rule {
        any_of: &["/about", "/company", "/mission"],
        requires: &[],
        score: 95,
        reason: "Company overview and mission",
        category: "leadership",
    },
    Rule {
        any_of: &["/team", "/leadership", "/people"],
        requires: &[],
        score: 90,
        reason: "Leadership and team information",
        category: "leadership",
    },
    Rule {
        any_of: &["/services", "/products", "/solutions"],
        requires: &[],
        score: 85,
        reason: "Core offerings",
        category: "products",
    },
    Rule {
        any_of: &["culture", "values", "announcement"],
        requires: &["/blog"],
        score: 75,
        reason: "Company culture insights",
        category: "culture",
    },
    Rule {
        any_of: &["/customers", "/case-studies", "/testimonials"],
        requires: &[],
        score: 70,
        reason: "Customer success stories",
        category: "customers",
    },
    Rule {
        any_of: &["/investors", "/press", "/news"],
        requires: &[],
        score: 65,
        reason: "Public announcements",
        category: "financials",
    },
    Rule {
        any_of: &["/careers", "/jobs"],
        requires: &[],
        score: 60,
        reason: "Hiring and growth signals",
        category: "careers",
    },
    Rule {
        any_of: &["/privacy", "/terms", "/legal", "/cookie"],
        requires: &[],
        score: 10,
        reason: "Legal/compliance pages",
        category: "other",
    },
    Rule {
        any_of: &["/login", "/signup", "/contact"],
        requires: &[],
        score: 20,
        reason: "Utility pages",
        category: "other",
    },
];

const ROOT_SCORE: u8 = 80;
const DEFAULT_SCORE: u8 = 40;

/// Score one URL by its path.
pub fn score_url(url: &str) -> ScoredUrl {
    let path = Url::parse(url)
        .map(|u| u.path().to_lowercase())
        .unwrap_or_else(|_| url.to_lowercase());

    let (score, reason, category) = if path.is_empty() || path == "/" {
        (ROOT_SCORE, "Homepage overview", "overview")
    } else {
        RULES
            .iter()
            .find(|rule| {
                rule.any_of.iter().any(|term| path.contains(term))
                    && rule.requires.iter().all(|term| path.contains(term))
            })
            .map(|rule| (rule.score, rule.reason, rule.category))
            .unwrap_or((DEFAULT_SCORE, "Potentially relevant content", "other"))
    };

    ScoredUrl {
        url: url.to_string(),
        score,
        reason: reason.to_string(),
        category: Category::new(category),
        method: ScoringMethod::Heuristic,
    }
}
