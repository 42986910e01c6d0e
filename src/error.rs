use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Provider operation an error is attributed to. Each one has a fixed fallback
/// message used when the provider gives nothing more specific.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    CreateAccessToken,
    GenerateClientToken,
    CreateOrder,
    CaptureOrder,
    GetOrder,
    PatchOrder,
    CreateSubscription,
    ActivateSubscription,
    ReviseSubscription,
}

impl Operation {
    pub fn default_message(self) -> &'static str {
        match self {
            Operation::CreateAccessToken => "FAILED_TO_CREATE_ACCESS_TOKEN",
            Operation::GenerateClientToken => "FAILED_TO_GENERATE_CLIENT_TOKEN",
            Operation::CreateOrder => "FAILED_TO_CREATE_ORDER",
            Operation::CaptureOrder => "FAILED_TO_CAPTURE_ORDER",
            Operation::GetOrder => "FAILED_TO_GET_ORDER",
            Operation::PatchOrder => "FAILED_TO_PATCH_ORDER",
            Operation::CreateSubscription => "FAILED_TO_CREATE_SUBSCRIPTION",
            Operation::ActivateSubscription => "FAILED_TO_ACTIVATE_SUBSCRIPTION",
            Operation::ReviseSubscription => "FAILED_TO_REVISE_SUBSCRIPTION",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Precondition,
    Provider,
    Transport,
}

#[derive(Debug, Error)]
pub enum PaypalError {
    #[error("MISSING_API_CREDENTIALS")]
    MissingCredentials,
    #[error("MISSING_ACCESS_TOKEN")]
    MissingAccessToken,
    /// Missing order/subscription/plan identifier, or a missing payload.
    #[error("{0}")]
    MissingInput(&'static str),
    /// Identifier with characters that could escape its URL path segment.
    #[error("{0}")]
    InvalidInput(&'static str),
    /// A setting the operation needs, such as a plan id, is not configured.
    #[error("{0}")]
    MissingConfiguration(&'static str),
    /// The provider answered with an error body it explained.
    #[error("{message}")]
    Provider { message: String, status: u16 },
    /// The call failed without a usable explanation: network error, undecodable
    /// body, or an error response without details.
    #[error("{}", .operation.default_message())]
    Failed {
        operation: Operation,
        status: Option<u16>,
        #[source]
        source: Option<reqwest::Error>,
    },
}

impl PaypalError {
    pub fn failed(operation: Operation, status: Option<u16>) -> Self {
        PaypalError::Failed {
            operation,
            status,
            source: None,
        }
    }

    pub fn transport(operation: Operation, source: reqwest::Error) -> Self {
        PaypalError::Failed {
            operation,
            status: source.status().map(|status| status.as_u16()),
            source: Some(source),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            PaypalError::MissingCredentials
            | PaypalError::MissingAccessToken
            | PaypalError::MissingInput(_)
            | PaypalError::InvalidInput(_)
            | PaypalError::MissingConfiguration(_) => ErrorKind::Precondition,
            PaypalError::Provider { .. } => ErrorKind::Provider,
            PaypalError::Failed { .. } => ErrorKind::Transport,
        }
    }

    /// HTTP status received from the provider, when one triggered the error.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            PaypalError::Provider { status, .. } => Some(*status),
            PaypalError::Failed { status, .. } => *status,
            _ => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Paypal(#[from] PaypalError),
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("not found")]
    NotFound,
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            AppError::Paypal(PaypalError::MissingInput(_) | PaypalError::InvalidInput(_))
            | AppError::BadRequest(_) => {
                StatusCode::BAD_REQUEST
            }
            AppError::Paypal(error) => error
                .status_code()
                .and_then(|code| StatusCode::from_u16(code).ok())
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            AppError::NotFound => StatusCode::NOT_FOUND,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        tracing::error!(?self, status = status.as_u16());
        let body = json!({
            "message": self.to_string(),
            "statusCode": status.as_u16(),
        });
        (status, Json(body)).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failed_error_uses_operation_message_and_status() {
        let error = PaypalError::failed(Operation::CreateAccessToken, Some(500));
        assert_eq!(error.to_string(), "FAILED_TO_CREATE_ACCESS_TOKEN");
        assert_eq!(error.status_code(), Some(500));
        assert_eq!(error.kind(), ErrorKind::Transport);
    }

    #[test]
    fn preconditions_map_to_status() {
        let missing_id = AppError::from(PaypalError::MissingInput("MISSING_ORDER_ID"));
        assert_eq!(missing_id.status(), StatusCode::BAD_REQUEST);
        let missing_creds = AppError::from(PaypalError::MissingCredentials);
        assert_eq!(missing_creds.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let invalid_id = AppError::from(PaypalError::InvalidInput("INVALID_ORDER_ID"));
        assert_eq!(invalid_id.status(), StatusCode::BAD_REQUEST);
        let missing_plan =
            AppError::from(PaypalError::MissingConfiguration("MISSING_SUBSCRIPTION_PLAN_ID"));
        assert_eq!(missing_plan.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(missing_plan.to_string(), "MISSING_SUBSCRIPTION_PLAN_ID");
    }

    #[test]
    fn provider_status_is_forwarded() {
        let error = AppError::from(PaypalError::Provider {
            message: "invalid_client - Client Authentication failed".into(),
            status: 401,
        });
        assert_eq!(error.status(), StatusCode::UNAUTHORIZED);
    }
}
