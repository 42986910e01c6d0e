//! Client for the PayPal REST API.
//!
//! Every call goes through [`PaypalClient::execute`], which obtains a bearer
//! token from the [`TokenProvider`] (cached per credential set) and classifies
//! the response into a [`ProviderResult`]. Side-effecting calls that must not
//! run twice go through [`PaypalClient::execute_idempotent`].

pub mod executor;
pub mod idempotency;
pub mod orders;
pub mod subscriptions;
pub mod token;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::clock::{Clock, SystemClock};
use crate::config::PaypalConfig;
use crate::error::PaypalError;

pub use executor::{ProviderRequest, ProviderResult};
pub use idempotency::{send_idempotent, IdempotencyKey};
pub use token::{AccessToken, ClientToken, Credentials, TokenProvider};

pub struct PaypalClient {
    http: reqwest::Client,
    api_base_url: String,
    credentials: Credentials,
    tokens: TokenProvider,
    retry_delay: Duration,
}

impl PaypalClient {
    pub fn new(config: &PaypalConfig) -> Result<Self> {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: &PaypalConfig, clock: Arc<dyn Clock>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.http_timeout)
            .build()
            .context("failed to build paypal http client")?;
        let api_base_url = config.api_base_url.trim_end_matches('/').to_string();
        Ok(Self {
            tokens: TokenProvider::new(http.clone(), api_base_url.clone(), clock),
            http,
            api_base_url,
            credentials: Credentials::new(&config.client_id, &config.client_secret),
            retry_delay: config.capture_retry_delay,
        })
    }

    pub fn client_id(&self) -> &str {
        &self.credentials.client_id
    }

    pub fn tokens(&self) -> &TokenProvider {
        &self.tokens
    }

    /// Access token for the configured credentials.
    pub async fn access_token(&self) -> Result<AccessToken, PaypalError> {
        self.tokens.get_access_token(&self.credentials).await
    }

    /// Browser-side client token derived from the current access token.
    pub async fn client_token(&self) -> Result<ClientToken, PaypalError> {
        let access = self.access_token().await?;
        self.tokens.generate_client_token(&access.access_token).await
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.api_base_url, path.trim_start_matches('/'))
    }
}

/// Checks a browser-supplied resource id before it is placed in a URL path.
/// Provider ids are ASCII letters, digits and `-`; anything else (`/`, `.`,
/// `?`, `%`) could reroute the authenticated call to another endpoint.
pub(crate) fn resource_id<'a>(
    raw: &'a str,
    missing: &'static str,
    invalid: &'static str,
) -> Result<&'a str, PaypalError> {
    let id = raw.trim();
    if id.is_empty() {
        return Err(PaypalError::MissingInput(missing));
    }
    if !id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
        tracing::warn!(id = %id.escape_debug(), "rejected malformed resource id");
        return Err(PaypalError::InvalidInput(invalid));
    }
    Ok(id)
}
