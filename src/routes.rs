use std::sync::Arc;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, patch, post},
    Extension, Json, Router,
};

use axum_prometheus::PrometheusMetricLayer;

use crate::catalog::Storefront;
use crate::paypal::{PaypalClient, ProviderResult};
use crate::{identity, orders, subscriptions};

async fn root() -> &'static str {
    "PayPal Checkout Backend"
}

pub fn api_routes() -> Router {
    Router::new()
        .route("/", get(root))
        .route("/api/paypal/client-id", get(identity::client_id))
        .route("/api/paypal/get-client-id", get(identity::client_id))
        .route(
            "/api/paypal/generate-client-token",
            get(identity::generate_client_token),
        )
        .route("/api/paypal/create-order", post(orders::create_order))
        .route("/api/paypal/capture-order", post(orders::capture_order))
        .route("/api/paypal/get-order", get(orders::get_order))
        .route("/api/paypal/patch-order", patch(orders::patch_order))
        .route(
            "/api/paypal/create-subscription",
            post(subscriptions::create_subscription),
        )
        .route(
            "/api/paypal/activate-subscription",
            post(subscriptions::activate_subscription),
        )
        .route(
            "/api/paypal/revise-subscription",
            post(subscriptions::revise_subscription),
        )
}

/// Routes with their shared state attached.
pub fn app(paypal: Arc<PaypalClient>, storefront: Arc<Storefront>) -> Router {
    api_routes()
        .layer(Extension(paypal))
        .layer(Extension(storefront))
}

/// Adds request metrics and the `/metrics` scrape endpoint. The recorder is
/// process-global, so call this once.
pub fn with_metrics(router: Router) -> Router {
    let (prometheus_layer, metrics_handle) = PrometheusMetricLayer::pair();
    router
        .route(
            "/metrics",
            get(move || async move { metrics_handle.render() }),
        )
        .layer(prometheus_layer)
}

/// Writes a provider result back to the browser verbatim: same status, same
/// body, or no body at all for 204.
pub(crate) fn forward(result: ProviderResult) -> Response {
    let status = StatusCode::from_u16(result.http_status_code())
        .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    match result.into_data() {
        Some(data) => (status, Json(data)).into_response(),
        None => status.into_response(),
    }
}
