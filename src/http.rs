//! Shared HTTP retry policy for the gateway clients.
//!
//! All three hosted services are reached through the same strategy:
//! - HTTP 429 (rate limited) and 5xx (server error) → retry
//! - network errors → retry
//! - any other status → returned to the caller for inspection
//! - backoff: 1s, 2s, 4s, 8s, 16s, 32s (capped at 2^5)

use anyhow::Result;
use reqwest::{RequestBuilder, Response};
use std::time::Duration;

/// Send a request with retry/backoff, returning the final response.
///
/// `build` must produce a fresh [`RequestBuilder`] per attempt. Responses
/// with non-retryable statuses (including 4xx other than 429) are returned
/// as-is so callers can distinguish e.g. 404 from a hard failure.
pub async fn send_with_retry<F>(build: F, max_retries: u32) -> Result<Response>
where
    F: Fn() -> RequestBuilder,
{
    let mut last_err = None;

    for attempt in 0..=max_retries {
        if attempt > 0 {
            let delay = Duration::from_secs(1 << (attempt - 1).min(5));
            tokio::time::sleep(delay).await;
        }

        match build().send().await {
            Ok(response) => {
                let status = response.status();
                if status.as_u16() == 429 || status.is_server_error() {
                    let body_text = response.text().await.unwrap_or_default();
                    last_err = Some(anyhow::anyhow!("API error {}: {}", status, body_text));
                    continue;
                }
                return Ok(response);
            }
            Err(e) => {
                last_err = Some(e.into());
                continue;
            }
        }
    }

    Err(last_err.unwrap_or_else(|| anyhow::anyhow!("Request failed after retries")))
}

/// Read a successful response's JSON body, or fail with the status and body.
pub async fn expect_json(response: Response) -> Result<serde_json::Value> {
    let status = response.status();
    if !status.is_success() {
        let body_text = response.text().await.unwrap_or_default();
        anyhow::bail!("API error {}: {}", status, body_text);
    }
    Ok(response.json().await?)
}
