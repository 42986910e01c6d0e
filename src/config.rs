use std::time::Duration;

use once_cell::sync::Lazy;
use url::Url;

/// Address the HTTP server should bind to. Defaults to `0.0.0.0`.
pub static BIND_ADDRESS: Lazy<String> =
    Lazy::new(|| std::env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0".to_string()));

/// Port the HTTP server should listen on. Defaults to `3006`.
pub static BIND_PORT: Lazy<u16> = Lazy::new(|| {
    std::env::var("BIND_PORT")
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .unwrap_or(3006)
});

pub const SANDBOX_API_BASE_URL: &str = "https://api-m.sandbox.paypal.com";
pub const LIVE_API_BASE_URL: &str = "https://api-m.paypal.com";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaypalEnvironment {
    Sandbox,
    Live,
}

impl PaypalEnvironment {
    fn parse(raw: Option<&str>) -> Self {
        match raw.map(|value| value.trim().to_ascii_lowercase()).as_deref() {
            Some("live") | Some("production") => PaypalEnvironment::Live,
            _ => PaypalEnvironment::Sandbox,
        }
    }

    pub fn default_api_base_url(self) -> &'static str {
        match self {
            PaypalEnvironment::Sandbox => SANDBOX_API_BASE_URL,
            PaypalEnvironment::Live => LIVE_API_BASE_URL,
        }
    }
}

/// Provider settings for one PayPal environment. Read once at startup.
#[derive(Debug, Clone)]
pub struct PaypalConfig {
    pub environment: PaypalEnvironment,
    pub client_id: String,
    pub client_secret: String,
    pub api_base_url: String,
    pub currency: String,
    pub intent: String,
    pub subscription_plan_id: Option<String>,
    pub subscription_plan_id_for_revise: Option<String>,
    pub http_timeout: Duration,
    pub capture_retry_delay: Duration,
}

impl PaypalConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup so tests can avoid the
    /// process environment.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let environment = PaypalEnvironment::parse(read("PAYPAL_ENVIRONMENT_MODE").as_deref());
        let (id_key, secret_key) = match environment {
            PaypalEnvironment::Sandbox => {
                ("PAYPAL_SANDBOX_CLIENT_ID", "PAYPAL_SANDBOX_CLIENT_SECRET")
            }
            PaypalEnvironment::Live => ("PAYPAL_LIVE_CLIENT_ID", "PAYPAL_LIVE_CLIENT_SECRET"),
        };

        let api_base_url = read("PAYPAL_API_BASE_URL")
            .unwrap_or_else(|| environment.default_api_base_url().to_string());
        Url::parse(&api_base_url)
            .map_err(|error| anyhow::anyhow!("invalid PAYPAL_API_BASE_URL {api_base_url}: {error}"))?;

        let http_timeout = read("PAYPAL_HTTP_TIMEOUT_SECS")
            .and_then(|value| value.parse::<u64>().ok())
            .filter(|value| *value > 0)
            .unwrap_or(30);
        let capture_retry_delay = read("PAYPAL_CAPTURE_RETRY_DELAY_MS")
            .and_then(|value| value.parse::<u64>().ok())
            .unwrap_or(2000);

        Ok(Self {
            environment,
            // Empty credentials are allowed here and rejected per call.
            client_id: read(id_key).unwrap_or_default(),
            client_secret: read(secret_key).unwrap_or_default(),
            api_base_url: api_base_url.trim_end_matches('/').to_string(),
            currency: read("PAYPAL_CURRENCY").unwrap_or_else(|| "USD".to_string()),
            intent: read("PAYPAL_INTENT")
                .map(|value| value.to_ascii_uppercase())
                .unwrap_or_else(|| "CAPTURE".to_string()),
            subscription_plan_id: read("PAYPAL_SUBSCRIPTION_PLAN_ID"),
            subscription_plan_id_for_revise: read("PAYPAL_SUBSCRIPTION_PLAN_ID_FOR_REVISE"),
            http_timeout: Duration::from_secs(http_timeout),
            capture_retry_delay: Duration::from_millis(capture_retry_delay),
        })
    }

    /// Sandbox config pointed at `api_base_url`, mainly for tests.
    pub fn for_base_url(
        api_base_url: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Self {
        let api_base_url: String = api_base_url.into();
        Self {
            environment: PaypalEnvironment::Sandbox,
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            api_base_url: api_base_url.trim_end_matches('/').to_string(),
            currency: "USD".to_string(),
            intent: "CAPTURE".to_string(),
            subscription_plan_id: None,
            subscription_plan_id_for_revise: None,
            http_timeout: Duration::from_secs(30),
            capture_retry_delay: Duration::from_millis(2000),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_to_sandbox() {
        let config = PaypalConfig::from_lookup(lookup(&[
            ("PAYPAL_SANDBOX_CLIENT_ID", "sb-id"),
            ("PAYPAL_SANDBOX_CLIENT_SECRET", "sb-secret"),
            ("PAYPAL_LIVE_CLIENT_ID", "live-id"),
        ]))
        .unwrap();
        assert_eq!(config.environment, PaypalEnvironment::Sandbox);
        assert_eq!(config.client_id, "sb-id");
        assert_eq!(config.api_base_url, SANDBOX_API_BASE_URL);
        assert_eq!(config.currency, "USD");
        assert_eq!(config.intent, "CAPTURE");
        assert_eq!(config.capture_retry_delay, Duration::from_millis(2000));
    }

    #[test]
    fn live_mode_selects_live_credentials() {
        let config = PaypalConfig::from_lookup(lookup(&[
            ("PAYPAL_ENVIRONMENT_MODE", "LIVE"),
            ("PAYPAL_LIVE_CLIENT_ID", "live-id"),
            ("PAYPAL_LIVE_CLIENT_SECRET", "live-secret"),
            ("PAYPAL_INTENT", "authorize"),
        ]))
        .unwrap();
        assert_eq!(config.client_secret, "live-secret");
        assert_eq!(config.api_base_url, LIVE_API_BASE_URL);
        assert_eq!(config.intent, "AUTHORIZE");
    }

    #[test]
    fn base_url_override_is_validated() {
        let config = PaypalConfig::from_lookup(lookup(&[(
            "PAYPAL_API_BASE_URL",
            "http://127.0.0.1:9000/",
        )]))
        .unwrap();
        assert_eq!(config.api_base_url, "http://127.0.0.1:9000");

        let invalid = PaypalConfig::from_lookup(lookup(&[("PAYPAL_API_BASE_URL", "not a url")]));
        assert!(invalid.is_err());
    }
}
