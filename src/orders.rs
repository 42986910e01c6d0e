use std::sync::Arc;

use axum::{extract::Query, response::Response, Extension, Json};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{error, info, warn};

use crate::catalog::{breakdown_total, format_amount, CartItem, ShippingAddress, ShippingRates, Storefront};
use crate::error::{AppError, AppResult};
use crate::paypal::{PaypalClient, ProviderResult};
use crate::routes::forward;

#[derive(Debug, Deserialize)]
pub struct CreateOrderRequest {
    pub cart: Vec<CartItem>,
}

#[derive(Debug, Deserialize)]
pub struct CaptureOrderRequest {
    #[serde(rename = "orderID")]
    pub order_id: String,
}

#[derive(Debug, Deserialize)]
pub struct GetOrderQuery {
    #[serde(rename = "orderID")]
    pub order_id: String,
    #[serde(default)]
    pub fields: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PatchOrderRequest {
    #[serde(rename = "orderID")]
    pub order_id: String,
    #[serde(rename = "shippingAddress", default)]
    pub shipping_address: ShippingAddress,
}

pub async fn create_order(
    Extension(paypal): Extension<Arc<PaypalClient>>,
    Extension(storefront): Extension<Arc<Storefront>>,
    Json(payload): Json<CreateOrderRequest>,
) -> AppResult<Response> {
    let totals = storefront
        .catalog
        .price_cart(&payload.cart, &storefront.currency)?;
    let result = paypal
        .create_order(storefront.order_payload(&totals))
        .await?;

    match &result {
        ProviderResult::Success { data, .. } => {
            let data = data.as_ref().unwrap_or(&Value::Null);
            info!(id = %data["id"], status = %data["status"], "order successfully created");
        }
        ProviderResult::Failure { data, .. } => error!(%data, "failed to create order"),
    }
    Ok(forward(result))
}

pub async fn capture_order(
    Extension(paypal): Extension<Arc<PaypalClient>>,
    Json(payload): Json<CaptureOrderRequest>,
) -> AppResult<Response> {
    let result = paypal.capture_order(&payload.order_id).await?;

    match result.data().and_then(settled_transaction) {
        Some(transaction)
            if transaction.get("id").is_some()
                && transaction["status"] != json!("DECLINED") =>
        {
            info!(
                order_id = %payload.order_id,
                transaction_id = %transaction["id"],
                amount = %transaction["amount"]["value"],
                "successful capture"
            );
        }
        _ => warn!(
            order_id = %payload.order_id,
            status = result.http_status_code(),
            "capture failed"
        ),
    }
    Ok(forward(result))
}

/// First capture, or first authorization for `AUTHORIZE` intent orders.
fn settled_transaction(order: &Value) -> Option<&Value> {
    let payments = order.get("purchase_units")?.get(0)?.get("payments")?;
    payments
        .get("captures")
        .and_then(|captures| captures.get(0))
        .or_else(|| {
            payments
                .get("authorizations")
                .and_then(|authorizations| authorizations.get(0))
        })
}

pub async fn get_order(
    Extension(paypal): Extension<Arc<PaypalClient>>,
    Query(query): Query<GetOrderQuery>,
) -> AppResult<Response> {
    let result = paypal
        .get_order(&query.order_id, query.fields.as_deref())
        .await?;
    Ok(forward(result))
}

/// Recomputes shipping for a new buyer address and patches the order amounts.
pub async fn patch_order(
    Extension(paypal): Extension<Arc<PaypalClient>>,
    Extension(storefront): Extension<Arc<Storefront>>,
    Json(payload): Json<PatchOrderRequest>,
) -> AppResult<Response> {
    let current = paypal.get_order(&payload.order_id, None).await?;
    let order = match current {
        ProviderResult::Success {
            data: Some(order), ..
        } => order,
        ProviderResult::Success { data: None, .. } => {
            return Err(AppError::NotFound);
        }
        failure @ ProviderResult::Failure { .. } => {
            error!(order_id = %payload.order_id, "failed to load order for patch");
            return Ok(forward(failure));
        }
    };

    let operations = shipping_patch_operations(&order, &payload.shipping_address, &storefront.shipping)?;
    let result = paypal.patch_order(&payload.order_id, operations).await?;
    if result.is_success() {
        info!(order_id = %payload.order_id, "order successfully patched");
    } else {
        error!(order_id = %payload.order_id, status = result.http_status_code(), "failed to patch order");
    }
    Ok(forward(result))
}

/// One `replace` operation per purchase unit, with shipping requoted for
/// `address` and the amount re-summed from its breakdown.
pub fn shipping_patch_operations(
    order: &Value,
    address: &ShippingAddress,
    rates: &ShippingRates,
) -> AppResult<Value> {
    let units = order
        .get("purchase_units")
        .and_then(Value::as_array)
        .ok_or_else(|| AppError::BadRequest("order has no purchase units".into()))?;

    let shipping = rates.quote(address).ok_or_else(|| {
        AppError::BadRequest(format!(
            "No shipping to {}",
            serde_json::to_string(address).unwrap_or_default()
        ))
    })?;

    let mut operations = Vec::with_capacity(units.len());
    for unit in units {
        let reference_id = unit
            .get("reference_id")
            .and_then(Value::as_str)
            .unwrap_or("default");
        let mut amount = unit
            .get("amount")
            .filter(|amount| amount.is_object())
            .cloned()
            .unwrap_or_else(|| json!({}));
        let currency = amount
            .get("currency_code")
            .and_then(Value::as_str)
            .unwrap_or("USD")
            .to_string();

        if !amount.get("breakdown").map_or(false, Value::is_object) {
            amount["breakdown"] = json!({});
        }
        amount["breakdown"]["shipping"] = json!({
            "currency_code": currency,
            "value": format_amount(shipping),
        });

        let total = amount["breakdown"]
            .as_object()
            .and_then(breakdown_total)
            .ok_or_else(|| AppError::BadRequest(format!("unreadable amount breakdown for {reference_id}")))?;
        amount["value"] = json!(format_amount(total));

        operations.push(json!({
            "op": "replace",
            "path": format!("/purchase_units/@reference_id=='{reference_id}'/amount"),
            "value": amount,
        }));
    }
    Ok(Value::Array(operations))
}
