use reqwest::Method;
use serde_json::Value;

use super::{resource_id, IdempotencyKey, PaypalClient, ProviderRequest, ProviderResult};
use crate::error::{Operation, PaypalError};

const ORDERS_PATH: &str = "/v2/checkout/orders";

fn require_order_id<'a>(order_id: &'a str, missing: &'static str) -> Result<&'a str, PaypalError> {
    resource_id(order_id, missing, "INVALID_ORDER_ID")
}

impl PaypalClient {
    pub async fn create_order(&self, payload: Value) -> Result<ProviderResult, PaypalError> {
        if payload.is_null() {
            return Err(PaypalError::MissingInput("MISSING_PAYLOAD_FOR_CREATE_ORDER"));
        }
        let request = ProviderRequest::new(Operation::CreateOrder, Method::POST, ORDERS_PATH)
            .json(payload);
        self.execute(request).await
    }

    /// Captures an approved order under a freshly generated idempotency key.
    pub async fn capture_order(&self, order_id: &str) -> Result<ProviderResult, PaypalError> {
        self.capture_order_with_key(order_id, &IdempotencyKey::generate())
            .await
    }

    pub async fn capture_order_with_key(
        &self,
        order_id: &str,
        key: &IdempotencyKey,
    ) -> Result<ProviderResult, PaypalError> {
        let order_id = require_order_id(order_id, "MISSING_ORDER_ID_FOR_CAPTURE_ORDER")?;
        let request = ProviderRequest::new(
            Operation::CaptureOrder,
            Method::POST,
            format!("{ORDERS_PATH}/{order_id}/capture"),
        );
        self.execute_idempotent(request, key).await
    }

    /// `fields` is passed through untouched, e.g. `payment_source`.
    pub async fn get_order(
        &self,
        order_id: &str,
        fields: Option<&str>,
    ) -> Result<ProviderResult, PaypalError> {
        let order_id = require_order_id(order_id, "MISSING_ORDER_ID")?;
        let mut request = ProviderRequest::new(
            Operation::GetOrder,
            Method::GET,
            format!("{ORDERS_PATH}/{order_id}"),
        );
        if let Some(fields) = fields.filter(|fields| !fields.is_empty()) {
            request = request.query("fields", fields);
        }
        self.execute(request).await
    }

    /// Applies a JSON Patch document; the provider answers 204 on success.
    pub async fn patch_order(
        &self,
        order_id: &str,
        operations: Value,
    ) -> Result<ProviderResult, PaypalError> {
        let order_id = require_order_id(order_id, "MISSING_ORDER_ID_FOR_PATCH_ORDER")?;
        if !operations.as_array().map_or(false, |ops| !ops.is_empty()) {
            return Err(PaypalError::MissingInput("MISSING_PAYLOAD_FOR_PATCH_ORDER"));
        }
        let request = ProviderRequest::new(
            Operation::PatchOrder,
            Method::PATCH,
            format!("{ORDERS_PATH}/{order_id}"),
        )
        .json(operations);
        self.execute(request).await
    }
}
