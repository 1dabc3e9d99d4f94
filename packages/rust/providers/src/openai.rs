//! OpenAI chat-completions client used for relevance scoring and profile structuring.

use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, instrument};

use leadscope_shared::{
    CollabResult, CollaboratorError, CompanyContext, InsightStructurer, RawScore, RelevanceScorer,
    Result,
};

use crate::http::{build_client, check_status, network_error, read_json, trim_base_url};

const SERVICE: &str = "openai";

const SYSTEM_PROMPT: &str =
    "You are a business intelligence expert. Always respond with valid JSON.";

const TEMPERATURE: f32 = 0.1;
const MAX_TOKENS: u32 = 2000;

static JSON_OBJECT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)\{.*\}").expect("valid regex"));

#[derive(Clone)]
pub struct OpenAiClient {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ReplyMessage,
}

#[derive(Debug, Deserialize)]
struct ReplyMessage {
    #[serde(default)]
    content: Option<String>,
}

impl OpenAiClient {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>, timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: build_client(timeout)?,
            api_key: api_key.into(),
            model: model.into(),
            base_url: "https://api.openai.com/v1".to_string(),
        })
    }

    /// Set a custom base URL (proxies, compatible gateways, mock servers).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = trim_base_url(url);
        self
    }

    /// One system + user exchange; returns the assistant text.
    async fn complete(&self, prompt: &str) -> CollabResult<String> {
        if self.api_key.trim().is_empty() {
            return Err(CollaboratorError::missing_credentials(SERVICE));
        }

        let request = ChatRequest {
            model: &self.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            temperature: TEMPERATURE,
            max_tokens: MAX_TOKENS,
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| network_error(SERVICE, e))?;

        let response = check_status(SERVICE, &self.model, response).await?;
        let body: ChatResponse = read_json(SERVICE, response).await?;

        body.choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| CollaboratorError::Parse(format!("{SERVICE}: response has no choices")))
    }
}

#[async_trait]
impl RelevanceScorer for OpenAiClient {
    #[instrument(skip_all, fields(urls = urls.len(), model = %self.model))]
    async fn score(&self, urls: &[String], context: &CompanyContext) -> CollabResult<Vec<RawScore>> {
        let reply = self.complete(&scoring_prompt(urls, context)).await?;
        let scores = parse_scores(&reply)?;
        debug!(scored = scores.len(), "scoring reply parsed");
        Ok(scores)
    }

    fn name(&self) -> &str {
        SERVICE
    }
}

#[async_trait]
impl InsightStructurer for OpenAiClient {
    #[instrument(skip_all, fields(model = %self.model))]
    async fn structure(&self, raw_profile: &Value) -> CollabResult<Value> {
        let profile = leadscope_profile::fields::profile_text(raw_profile);
        let reply = self.complete(&insight_prompt(&profile)).await?;
        parse_insights(&reply)
    }

    fn name(&self) -> &str {
        SERVICE
    }
}

// ---------------------------------------------------------------------------
// Prompts
// ---------------------------------------------------------------------------

fn scoring_prompt(urls: &[String], context: &CompanyContext) -> String {
    let url_list = urls
        .iter()
        .map(|u| format!("- {u}"))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        r#"You are an expert business intelligence analyst. Score these URLs for their business intelligence value.

Company Context: {company} ({website}), objective: {objective}

URLs to analyze:
{url_list}

Instructions:
1. Score each URL from 0-100 for business intelligence value
2. Categorize into: leadership, products, culture, customers, financials, strategy, other
3. Provide one-sentence reasoning
4. Return valid JSON array

Scoring Guidelines:
- 90-100: Company mission, leadership, core strategy
- 80-89: Products/services, case studies, major announcements
- 70-79: Company culture, customer success, industry insights
- 60-69: Blog posts, news, partnerships
- 40-59: General company information
- 20-39: Contact, support, utility pages
- 0-19: Legal, privacy, login pages

Return ONLY valid JSON in this exact format:
[
  {{
    "url": "https://example.com/about",
    "score": 95,
    "reason": "Company mission and values page",
    "category": "leadership"
  }}
]"#,
        company = context.company_name,
        website = context.website,
        objective = context.objective,
    )
}

fn insight_prompt(profile_text: &str) -> String {
    format!(
        "Analyze this professional profile and provide business intelligence insights in JSON format:

{profile_text}

Return a JSON object with these fields:
- skills_analysis: List of technical and soft skills with confidence scores
- industry_expertise: Primary and secondary industries with reasoning
- career_trajectory: Analysis of career progression and stability
- business_network: Assessment of network strength and influence
- thought_leadership: Evaluation of content quality and engagement
- professional_gaps: Areas for potential development or improvement
- market_positioning: How this person positions themselves professionally
- competitive_advantages: Unique strengths and differentiators

Focus on actionable business insights, not just descriptive information."
    )
}

// ---------------------------------------------------------------------------
// Reply parsing
// ---------------------------------------------------------------------------

/// Remove a surrounding ```` ```json ```` / ```` ``` ```` fence.
fn strip_code_fence(reply: &str) -> &str {
    let trimmed = reply.trim();
    let trimmed = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .unwrap_or(trimmed);
    trimmed.strip_suffix("```").unwrap_or(trimmed).trim()
}

/// Parse the scoring reply. Entries without a `url` or numeric `score` are skipped.
fn parse_scores(reply: &str) -> CollabResult<Vec<RawScore>> {
    let parsed: Value = serde_json::from_str(strip_code_fence(reply))
        .map_err(|e| CollaboratorError::Parse(format!("{SERVICE}: scoring reply is not JSON: {e}")))?;

    let Value::Array(items) = parsed else {
        return Err(CollaboratorError::Parse(format!(
            "{SERVICE}: scoring reply is not a JSON array"
        )));
    };

    Ok(items
        .into_iter()
        .filter_map(|item| serde_json::from_value::<RawScore>(item).ok())
        .collect())
}

/// Pull the first `{...}` block out of the reply.
fn parse_insights(reply: &str) -> CollabResult<Value> {
    let block = JSON_OBJECT_RE
        .find(reply)
        .ok_or_else(|| CollaboratorError::Parse(format!("{SERVICE}: no JSON object in reply")))?;

    serde_json::from_str(block.as_str())
        .map_err(|e| CollaboratorError::Parse(format!("{SERVICE}: insight reply is not JSON: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn context() -> CompanyContext {
        CompanyContext {
            company_name: "Ada Lovelace's company".into(),
            website: "https://acme.example/".into(),
            objective: "business intelligence gathering".into(),
        }
    }

    fn reply(content: &str) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{"message": {"role": "assistant", "content": content}}]
        }))
    }

    async fn client_with(server: &MockServer, content: &str) -> OpenAiClient {
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("authorization", "Bearer sk-test"))
            .and(body_partial_json(json!({"model": "gpt-4o-mini", "max_tokens": 2000})))
            .respond_with(reply(content))
            .mount(server)
            .await;
        OpenAiClient::new("sk-test", "gpt-4o-mini", Duration::from_secs(5))
            .unwrap()
            .with_base_url(server.uri())
    }

    #[test]
    fn strips_code_fences() {
        assert_eq!(strip_code_fence("```json\n[1]\n```"), "[1]");
        assert_eq!(strip_code_fence("```\n[1]\n```"), "[1]");
        assert_eq!(strip_code_fence("  [1] "), "[1]");
    }

    #[test]
    fn scoring_prompt_lists_urls_and_context() {
        let prompt = scoring_prompt(
            &["https://acme.example/about".into(), "https://acme.example/jobs".into()],
            &context(),
        );
        assert!(prompt.contains("- https://acme.example/about\n- https://acme.example/jobs"));
        assert!(prompt.contains("Ada Lovelace's company"));
        assert!(prompt.contains("leadership, products, culture"));
    }

    #[test]
    fn parse_scores_skips_malformed_entries() {
        let scores = parse_scores(
            r#"[{"url":"https://a.example/","score":80,"category":"products"},{"score":5},"junk"]"#,
        )
        .unwrap();
        assert_eq!(scores.len(), 1);
        assert_eq!(scores[0].category.as_deref(), Some("products"));
    }

    #[test]
    fn parse_scores_accepts_float_and_string_scores() {
        let scores = parse_scores(
            r#"[{"url":"https://a.example/team","score":85.5},{"url":"https://a.example/about","score":"70"},{"url":"https://a.example/x","score":"n/a"}]"#,
        )
        .unwrap();
        assert_eq!(scores.len(), 2);
        assert_eq!(scores[0].score, 85);
        assert_eq!(scores[1].url, "https://a.example/about");
        assert_eq!(scores[1].score, 70);
    }

    #[test]
    fn parse_scores_rejects_objects() {
        assert!(parse_scores(r#"{"url":"https://a.example/"}"#).is_err());
        assert!(parse_scores("not json").is_err());
    }

    #[test]
    fn parse_insights_extracts_embedded_object() {
        let notes = parse_insights("Here you go:\n{\"market_positioning\": \"niche\"}\nThanks").unwrap();
        assert_eq!(notes["market_positioning"], "niche");
        assert!(parse_insights("no json here").is_err());
    }

    #[tokio::test]
    async fn score_round_trip_through_service() {
        let server = MockServer::start().await;
        let client = client_with(
            &server,
            "```json\n[{\"url\":\"https://acme.example/about\",\"score\":95,\"reason\":\"Mission\",\"category\":\"leadership\"}]\n```",
        )
        .await;

        let scores = client
            .score(&["https://acme.example/about".into()], &context())
            .await
            .unwrap();
        assert_eq!(
            scores,
            vec![RawScore {
                url: "https://acme.example/about".into(),
                score: 95,
                reason: Some("Mission".into()),
                category: Some("leadership".into()),
            }]
        );
    }

    #[tokio::test]
    async fn structure_returns_notes() {
        let server = MockServer::start().await;
        let client = client_with(&server, r#"{"industry_expertise": {"primary": "fintech"}}"#).await;

        let notes = client
            .structure(&json!({"fullName": "Ada Lovelace", "headline": "Founder"}))
            .await
            .unwrap();
        assert_eq!(notes["industry_expertise"]["primary"], "fintech");
    }

    #[tokio::test]
    async fn empty_choices_is_parse_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"choices": []})))
            .mount(&server)
            .await;

        let client = OpenAiClient::new("sk-test", "gpt-4o-mini", Duration::from_secs(5))
            .unwrap()
            .with_base_url(server.uri());
        let err = client.score(&["https://acme.example/".into()], &context()).await.unwrap_err();
        assert!(matches!(err, CollaboratorError::Parse(_)));
    }

    #[tokio::test]
    async fn rejected_key_is_http_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let client = OpenAiClient::new("sk-bad", "gpt-4o-mini", Duration::from_secs(5))
            .unwrap()
            .with_base_url(server.uri());
        match client.structure(&json!({"fullName": "A"})).await {
            Err(CollaboratorError::Http { status, .. }) => assert_eq!(status, 401),
            other => panic!("expected HTTP 401, got {other:?}"),
        }
    }
}
