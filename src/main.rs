use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use checkout_backend::catalog::Storefront;
use checkout_backend::paypal::PaypalClient;
use checkout_backend::{app, with_metrics, PaypalConfig, BIND_ADDRESS, BIND_PORT};
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .init();

    let config = PaypalConfig::from_env()?;
    if config.client_id.is_empty() || config.client_secret.is_empty() {
        tracing::warn!(
            environment = ?config.environment,
            "PayPal client credentials are not set; provider calls will fail"
        );
    }

    let paypal = Arc::new(PaypalClient::new(&config)?);
    let storefront = Arc::new(Storefront::from_config(&config));

    let app = with_metrics(app(paypal, storefront));

    let addr: SocketAddr = format!("{}:{}", BIND_ADDRESS.as_str(), *BIND_PORT)
        .parse()
        .context("invalid bind address")?;
    tracing::info!(%addr, environment = ?config.environment, "Listening for incoming connections");
    axum::Server::bind(&addr)
        .serve(app.into_make_service())
        .await
        .context("server error")?;

    Ok(())
}
