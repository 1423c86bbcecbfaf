//! Shared HTTP plumbing: client construction and status → error mapping.

use std::time::Duration;

use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;

use prospector_shared::{ProspectorError, Result, USER_AGENT};

/// Maximum number of body characters quoted in error messages.
const ERROR_BODY_CHARS: usize = 200;

/// Build a reqwest client with the per-call timeout.
pub(crate) fn build_client(provider: &str, timeout: Duration) -> Result<Client> {
    Client::builder()
        .user_agent(USER_AGENT)
        .redirect(reqwest::redirect::Policy::limited(5))
        .timeout(timeout)
        .build()
        .map_err(|e| ProspectorError::network(provider, format!("failed to build HTTP client: {e}")))
}

/// Send a request and turn non-success statuses into taxonomy errors.
pub(crate) async fn send(provider: &str, request: RequestBuilder) -> Result<Response> {
    // `without_url` keeps query-string API keys out of logs.
    let response = request
        .send()
        .await
        .map_err(|e| ProspectorError::network(provider, e.without_url().to_string()))?;

    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let retry_after = parse_retry_after(response.headers());
    let body = response.text().await.unwrap_or_default();

    Err(ProspectorError::from_status(
        provider,
        status.as_u16(),
        snippet(&body),
        retry_after,
    ))
}

/// Read the body and deserialize it into a typed response.
pub(crate) async fn read_json<T: DeserializeOwned>(provider: &str, response: Response) -> Result<T> {
    let body = response.text().await.map_err(|e| {
        ProspectorError::network(provider, format!("failed to read body: {}", e.without_url()))
    })?;

    serde_json::from_str(&body).map_err(|e| {
        ProspectorError::parse(format!(
            "{provider}: unexpected response shape: {e} (got: {})",
            snippet(&body)
        ))
    })
}

/// `Retry-After` in delta-seconds form.
pub(crate) fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}

fn snippet(body: &str) -> String {
    body.chars().take(ERROR_BODY_CHARS).collect()
}
