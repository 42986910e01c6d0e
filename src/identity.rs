use std::sync::Arc;

use axum::{Extension, Json};
use serde_json::{json, Value};

use crate::error::AppResult;
use crate::paypal::{ClientToken, PaypalClient};

/// Public client id for loading the JS SDK. The secret never leaves the server.
pub async fn client_id(Extension(paypal): Extension<Arc<PaypalClient>>) -> Json<Value> {
    Json(json!({ "clientID": paypal.client_id() }))
}

pub async fn generate_client_token(
    Extension(paypal): Extension<Arc<PaypalClient>>,
) -> AppResult<Json<ClientToken>> {
    let token = paypal.client_token().await?;
    Ok(Json(token))
}
