//! Shared HTTP plumbing for provider clients, with retry of transient errors.

use crate::types::{AppError, Result};
use reqwest::{RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;

use super::client::GenerationParams;

/// A failed attempt and whether it is worth retrying.
#[derive(Debug)]
struct Failure {
    transient: bool,
    message: String,
}

fn is_transient_status(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

pub(crate) fn build_http_client(params: &GenerationParams) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(params.request_timeout)
        .build()
        .map_err(|e| AppError::LLM(format!("Failed to build HTTP client: {}", e)))
}

async fn send_once<T: DeserializeOwned>(request: RequestBuilder) -> std::result::Result<T, Failure> {
    let response = request.send().await.map_err(|e| Failure {
        transient: e.is_timeout() || e.is_connect(),
        message: format!("Request failed: {}", e),
    })?;

    let status = response.status();
    let body = response.text().await.map_err(|e| Failure {
        transient: true,
        message: format!("Failed to read response body: {}", e),
    })?;

    if !status.is_success() {
        return Err(Failure {
            transient: is_transient_status(status),
            message: format!("HTTP {}: {}", status, body),
        });
    }

    serde_json::from_str(&body).map_err(|e| Failure {
        transient: false,
        message: format!("Failed to parse response: {}", e),
    })
}

/// Send a JSON request, retrying transient failures with exponential backoff.
///
/// `build` is called once per attempt since a `RequestBuilder` is consumed on send.
pub(crate) async fn send_with_retry<T, F>(params: &GenerationParams, mut build: F) -> Result<T>
where
    T: DeserializeOwned,
    F: FnMut() -> RequestBuilder,
{
    let mut attempt: u32 = 0;
    loop {
        match send_once(build()).await {
            Ok(parsed) => {
                if attempt > 0 {
                    tracing::info!("LLM request succeeded after {} retries", attempt);
                }
                return Ok(parsed);
            }
            Err(failure) if failure.transient && attempt < params.max_retries => {
                let delay = params
                    .retry_base_delay
                    .saturating_mul(2u32.saturating_pow(attempt))
                    .min(Duration::from_secs(30));
                tracing::warn!(
                    "LLM request attempt {} failed, retrying in {:?}: {}",
                    attempt + 1,
                    delay,
                    failure.message
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(failure) => return Err(AppError::LLM(failure.message)),
        }
    }
}
