use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use base64::engine::general_purpose::STANDARD as Base64Engine;
use base64::Engine;
use dashmap::DashMap;
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, AUTHORIZATION};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::cache::TtlCache;
use crate::clock::Clock;
use crate::error::{Operation, PaypalError};

/// Client id/secret pair used for the client-credentials grant.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub client_id: String,
    pub client_secret: String,
}

impl Credentials {
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        }
    }

    /// Length-prefixed so ids or secrets containing `:` cannot collide.
    pub fn cache_key(&self) -> String {
        format!(
            "{}:{}:{}",
            self.client_id.len(),
            self.client_id,
            self.client_secret
        )
    }

    fn basic_auth_header(&self) -> String {
        let encoded =
            Base64Engine.encode(format!("{}:{}", self.client_id, self.client_secret));
        format!("Basic {encoded}")
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .finish()
    }
}

/// Body of a successful `/v1/oauth2/token` exchange.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccessToken {
    pub access_token: String,
    #[serde(default)]
    pub scope: Option<String>,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub app_id: Option<String>,
    #[serde(default)]
    pub nonce: Option<String>,
    pub expires_in: u64,
}

/// Single-use token handed to the browser for hosted card fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientToken {
    pub client_token: String,
    pub expires_in: u64,
}

#[derive(Debug, Default, Deserialize)]
struct TokenErrorBody {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
}

/// Acquires provider tokens and memoizes them until they expire.
pub struct TokenProvider {
    http: reqwest::Client,
    api_base_url: String,
    access_tokens: TtlCache<AccessToken>,
    client_tokens: TtlCache<ClientToken>,
    in_flight: DashMap<String, Arc<Mutex<()>>>,
}

impl TokenProvider {
    pub fn new(http: reqwest::Client, api_base_url: impl Into<String>, clock: Arc<dyn Clock>) -> Self {
        Self {
            http,
            api_base_url: api_base_url.into().trim_end_matches('/').to_string(),
            access_tokens: TtlCache::with_clock(clock.clone()),
            client_tokens: TtlCache::with_clock(clock),
            in_flight: DashMap::new(),
        }
    }

    pub async fn get_access_token(
        &self,
        credentials: &Credentials,
    ) -> Result<AccessToken, PaypalError> {
        if credentials.client_id.is_empty() || credentials.client_secret.is_empty() {
            return Err(PaypalError::MissingCredentials);
        }

        let key = credentials.cache_key();
        if let Some(token) = self.access_tokens.get(&key) {
            return Ok(token);
        }

        let flight_key = format!("oauth:{key}");
        let guard = self.flight_guard(&flight_key);
        let result = {
            let _flight = guard.lock().await;
            // A concurrent caller may have finished the exchange while we waited.
            match self.access_tokens.get(&key) {
                Some(token) => Ok(token),
                None => self.exchange_credentials(credentials, key).await,
            }
        };
        self.release_flight(&flight_key, guard);
        result
    }

    async fn exchange_credentials(
        &self,
        credentials: &Credentials,
        key: String,
    ) -> Result<AccessToken, PaypalError> {
        let response = self
            .http
            .post(self.endpoint("v1/oauth2/token"))
            .header(AUTHORIZATION, credentials.basic_auth_header())
            .header(ACCEPT, "application/json")
            .header(ACCEPT_LANGUAGE, "en_US")
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await;
        let token: AccessToken = read_token_response(response, Operation::CreateAccessToken).await?;

        tracing::info!(
            client_id = %credentials.client_id,
            expires_in = token.expires_in,
            "exchanged client credentials for access token"
        );
        self.access_tokens
            .set(key, token.clone(), Duration::from_secs(token.expires_in));
        Ok(token)
    }

    pub async fn generate_client_token(
        &self,
        access_token: &str,
    ) -> Result<ClientToken, PaypalError> {
        if access_token.is_empty() {
            return Err(PaypalError::MissingAccessToken);
        }

        if let Some(token) = self.client_tokens.get(access_token) {
            return Ok(token);
        }

        let flight_key = format!("client-token:{access_token}");
        let guard = self.flight_guard(&flight_key);
        let result = {
            let _flight = guard.lock().await;
            match self.client_tokens.get(access_token) {
                Some(token) => Ok(token),
                None => self.request_client_token(access_token).await,
            }
        };
        self.release_flight(&flight_key, guard);
        result
    }

    async fn request_client_token(&self, access_token: &str) -> Result<ClientToken, PaypalError> {
        let response = self
            .http
            .post(self.endpoint("v1/identity/generate-token"))
            .bearer_auth(access_token)
            .header(ACCEPT_LANGUAGE, "en_US")
            .json(&serde_json::json!({}))
            .send()
            .await;
        let token: ClientToken =
            read_token_response(response, Operation::GenerateClientToken).await?;

        tracing::info!(expires_in = token.expires_in, "generated client token");
        self.client_tokens
            .set(access_token, token.clone(), Duration::from_secs(token.expires_in));
        Ok(token)
    }

    /// Number of single-flight guards currently held for in-progress exchanges.
    pub fn pending_exchanges(&self) -> usize {
        self.in_flight.len()
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.api_base_url, path.trim_start_matches('/'))
    }

    fn flight_guard(&self, key: &str) -> Arc<Mutex<()>> {
        self.in_flight.entry(key.to_string()).or_default().clone()
    }

    /// Drops the guard once no other caller holds it. Counting happens under
    /// the map's shard lock, the same lock `flight_guard` clones under.
    fn release_flight(&self, key: &str, guard: Arc<Mutex<()>>) {
        self.in_flight.remove_if(key, |_, current| {
            Arc::ptr_eq(current, &guard) && Arc::strong_count(current) == 2
        });
    }
}

async fn read_token_response<T: DeserializeOwned>(
    response: Result<reqwest::Response, reqwest::Error>,
    operation: Operation,
) -> Result<T, PaypalError> {
    let response = response.map_err(|error| PaypalError::transport(operation, error))?;
    let status = response.status();

    if status != StatusCode::OK {
        let body: TokenErrorBody = response.json().await.unwrap_or_default();
        let error = match body.error {
            Some(error) => PaypalError::Provider {
                message: format!(
                    "{} - {}",
                    error,
                    body.error_description.unwrap_or_default()
                ),
                status: status.as_u16(),
            },
            None => PaypalError::failed(operation, Some(status.as_u16())),
        };
        tracing::warn!(status = status.as_u16(), %error, "token request rejected");
        return Err(error);
    }

    response
        .json::<T>()
        .await
        .map_err(|error| PaypalError::transport(operation, error))
}
