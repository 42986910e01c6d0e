use std::fmt;
use std::future::Future;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue};
use uuid::Uuid;

use super::executor::{ProviderRequest, ProviderResult};
use super::PaypalClient;
use crate::error::PaypalError;

pub const PAYPAL_REQUEST_ID: &str = "paypal-request-id";
pub const PREFER: &str = "prefer";

/// Identifies one logical side effect; every retry of it reuses the same key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IdempotencyKey(String);

impl IdempotencyKey {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for IdempotencyKey {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for IdempotencyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Headers for one attempt. Only the first asks for the full representation.
pub fn attempt_headers(key: &IdempotencyKey, first_attempt: bool) -> Result<HeaderMap, PaypalError> {
    let mut headers = HeaderMap::new();
    let value = HeaderValue::from_str(key.as_str())
        .map_err(|_| PaypalError::MissingInput("INVALID_IDEMPOTENCY_KEY"))?;
    headers.insert(PAYPAL_REQUEST_ID, value);
    if first_attempt {
        headers.insert(PREFER, HeaderValue::from_static("return=representation"));
    }
    Ok(headers)
}

/// Runs `send` once, and once more after `retry_delay` if the provider answered
/// with a 5xx. The outcome of a 5xx is unknown upstream, so the retry carries
/// the same key and the provider replays the original result.
pub async fn send_idempotent<F, Fut>(
    key: &IdempotencyKey,
    retry_delay: Duration,
    mut send: F,
) -> Result<ProviderResult, PaypalError>
where
    F: FnMut(HeaderMap) -> Fut,
    Fut: Future<Output = Result<ProviderResult, PaypalError>>,
{
    let first = send(attempt_headers(key, true)?).await?;
    if first.http_status_code() < 500 {
        return Ok(first);
    }

    tracing::warn!(
        idempotency_key = %key,
        status = first.http_status_code(),
        ?retry_delay,
        "provider error on idempotent request, retrying once"
    );
    tokio::time::sleep(retry_delay).await;
    send(attempt_headers(key, false)?).await
}

impl PaypalClient {
    /// Executes a side-effecting request under `key` with a single retry on 5xx.
    pub async fn execute_idempotent(
        &self,
        request: ProviderRequest,
        key: &IdempotencyKey,
    ) -> Result<ProviderResult, PaypalError> {
        send_idempotent(key, self.retry_delay, |headers| {
            let mut attempt = request.clone();
            attempt.headers.extend(headers);
            self.execute(attempt)
        })
        .await
    }
}
