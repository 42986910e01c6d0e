use reqwest::Method;
use serde_json::{json, Value};

use super::{resource_id, PaypalClient, ProviderRequest, ProviderResult};
use crate::error::{Operation, PaypalError};

const SUBSCRIPTIONS_PATH: &str = "/v1/billing/subscriptions";

fn require_subscription_id(subscription_id: &str) -> Result<&str, PaypalError> {
    resource_id(
        subscription_id,
        "MISSING_SUBSCRIPTION_ID",
        "INVALID_SUBSCRIPTION_ID",
    )
}

impl PaypalClient {
    pub async fn create_subscription(&self, body: Value) -> Result<ProviderResult, PaypalError> {
        if body.is_null() {
            return Err(PaypalError::MissingInput(
                "MISSING_PAYLOAD_FOR_CREATE_SUBSCRIPTION",
            ));
        }
        let request = ProviderRequest::new(
            Operation::CreateSubscription,
            Method::POST,
            SUBSCRIPTIONS_PATH,
        )
        .json(body);
        self.execute(request).await
    }

    /// Activation answers 204 with no body on success.
    pub async fn activate_subscription(
        &self,
        subscription_id: &str,
        reason: &str,
    ) -> Result<ProviderResult, PaypalError> {
        let subscription_id = require_subscription_id(subscription_id)?;
        let request = ProviderRequest::new(
            Operation::ActivateSubscription,
            Method::POST,
            format!("{SUBSCRIPTIONS_PATH}/{subscription_id}/activate"),
        )
        .json(json!({ "reason": reason }));
        self.execute(request).await
    }

    pub async fn revise_subscription(
        &self,
        subscription_id: &str,
        body: Value,
    ) -> Result<ProviderResult, PaypalError> {
        let subscription_id = require_subscription_id(subscription_id)?;
        if body.is_null() {
            return Err(PaypalError::MissingInput(
                "MISSING_PAYLOAD_FOR_REVISE_SUBSCRIPTION",
            ));
        }
        let request = ProviderRequest::new(
            Operation::ReviseSubscription,
            Method::POST,
            format!("{SUBSCRIPTIONS_PATH}/{subscription_id}/revise"),
        )
        .json(body);
        self.execute(request).await
    }
}
