use std::time::Duration;

use reqwest::header::RETRY_AFTER;
use reqwest::{Client, Response, StatusCode};

use leadscope_shared::{CollabResult, CollaboratorError, LeadscopeError, Result};

/// User-Agent string for API calls.
const USER_AGENT: &str = concat!("leadscope/", env!("CARGO_PKG_VERSION"));

/// Longest error body kept in an error message.
const MAX_ERROR_BODY: usize = 200;

pub(crate) fn build_client(timeout: Duration) -> Result<Client> {
    Client::builder()
        .user_agent(USER_AGENT)
        .timeout(timeout)
        .build()
        .map_err(|e| LeadscopeError::Network(format!("failed to build HTTP client: {e}")))
}

pub(crate) fn trim_base_url(base_url: impl Into<String>) -> String {
    base_url.into().trim_end_matches('/').to_string()
}

/// Map a service response onto the collaborator error model.
///
/// 429 carries `Retry-After`, 404 is `NotFound`, 401/403 name the credential
/// problem, anything else non-2xx keeps a snippet of the body.
pub(crate) async fn check_status(service: &str, subject: &str, response: Response) -> CollabResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    match status {
        StatusCode::TOO_MANY_REQUESTS => {
            let retry_after = response
                .headers()
                .get(RETRY_AFTER)
                .and_then(|v| v.to_str().ok());
            Err(CollaboratorError::rate_limited(retry_after))
        }
        StatusCode::NOT_FOUND => Err(CollaboratorError::NotFound(format!("{service}: {subject}"))),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(CollaboratorError::Http {
            status: status.as_u16(),
            message: format!("{service}: API key rejected"),
        }),
        s => {
            let body = response.text().await.unwrap_or_default();
            let snippet: String = body.chars().take(MAX_ERROR_BODY).collect();
            Err(CollaboratorError::Http {
                status: s.as_u16(),
                message: format!("{service}: {snippet}"),
            })
        }
    }
}

pub(crate) fn network_error(service: &str, e: reqwest::Error) -> CollaboratorError {
    if e.is_timeout() {
        CollaboratorError::Network(format!("{service}: request timed out"))
    } else {
        CollaboratorError::Network(format!("{service}: {e}"))
    }
}

pub(crate) async fn read_json<T: serde::de::DeserializeOwned>(service: &str, response: Response) -> CollabResult<T> {
    response
        .json::<T>()
        .await
        .map_err(|e| CollaboratorError::Parse(format!("{service}: {e}")))
}
