use std::sync::Arc;

use axum::{http::StatusCode, response::{IntoResponse, Response}, Extension, Json};
use serde::Deserialize;
use serde_json::json;
use tracing::{error, info};

use crate::catalog::Storefront;
use crate::error::{AppResult, PaypalError};
use crate::paypal::{PaypalClient, ProviderResult};
use crate::routes::forward;

#[derive(Debug, Default, Deserialize)]
pub struct CreateSubscriptionRequest {
    #[serde(rename = "userAction", default)]
    pub user_action: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SubscriptionIdRequest {
    #[serde(rename = "subscriptionId", default)]
    pub subscription_id: String,
}

/// Subscribes the buyer to the configured plan. The plan itself is created
/// ahead of time in the PayPal dashboard or catalog API.
pub async fn create_subscription(
    Extension(paypal): Extension<Arc<PaypalClient>>,
    Extension(storefront): Extension<Arc<Storefront>>,
    Json(payload): Json<CreateSubscriptionRequest>,
) -> AppResult<Response> {
    let plan_id = storefront
        .subscription_plan_id
        .as_deref()
        .ok_or(PaypalError::MissingConfiguration("MISSING_SUBSCRIPTION_PLAN_ID"))?;
    let user_action = payload
        .user_action
        .unwrap_or_else(|| "SUBSCRIBE_NOW".to_string());

    let body = json!({
        "plan_id": plan_id,
        "application_context": { "user_action": user_action },
    });
    let result = paypal.create_subscription(body).await?;
    match &result {
        ProviderResult::Success { data, .. } => {
            let id = data.as_ref().map(|data| data["id"].clone());
            info!(?id, "subscription created");
        }
        ProviderResult::Failure { data, .. } => error!(%data, "failed to create subscription"),
    }
    Ok(forward(result))
}

pub async fn activate_subscription(
    Extension(paypal): Extension<Arc<PaypalClient>>,
    Json(payload): Json<SubscriptionIdRequest>,
) -> AppResult<Response> {
    let result = paypal
        .activate_subscription(&payload.subscription_id, "Activate the subscription")
        .await?;
    match result {
        ProviderResult::Success { .. } => {
            info!(subscription_id = %payload.subscription_id, "subscription activated");
            Ok((StatusCode::OK, Json(json!({ "status": "ok" }))).into_response())
        }
        failure @ ProviderResult::Failure { .. } => {
            error!(subscription_id = %payload.subscription_id, "failed to activate subscription");
            Ok(forward(failure))
        }
    }
}

/// Moves an existing subscription onto the revise plan.
pub async fn revise_subscription(
    Extension(paypal): Extension<Arc<PaypalClient>>,
    Extension(storefront): Extension<Arc<Storefront>>,
    Json(payload): Json<SubscriptionIdRequest>,
) -> AppResult<Response> {
    let plan_id = storefront
        .subscription_plan_id_for_revise
        .as_deref()
        .ok_or(PaypalError::MissingConfiguration("MISSING_SUBSCRIPTION_PLAN_ID_FOR_REVISE"))?;
    let result = paypal
        .revise_subscription(&payload.subscription_id, json!({ "plan_id": plan_id }))
        .await?;
    Ok(forward(result))
}
