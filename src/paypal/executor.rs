use reqwest::header::{
    HeaderMap, HeaderName, HeaderValue, ACCEPT_LANGUAGE, AUTHORIZATION, CONTENT_TYPE,
};
use reqwest::{Method, StatusCode};
use serde::Serialize;
use serde_json::Value;

use super::PaypalClient;
use crate::error::{Operation, PaypalError};

/// One call against the provider REST API.
#[derive(Debug, Clone)]
pub struct ProviderRequest {
    pub operation: Operation,
    pub method: Method,
    pub path: String,
    pub body: Option<Value>,
    pub query: Vec<(String, String)>,
    /// Merged over the default headers, replacing same-named entries.
    pub headers: HeaderMap,
}

impl ProviderRequest {
    pub fn new(operation: Operation, method: Method, path: impl Into<String>) -> Self {
        Self {
            operation,
            method,
            path: path.into(),
            body: None,
            query: Vec::new(),
            headers: HeaderMap::new(),
        }
    }

    pub fn json(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    fn is_mutating(&self) -> bool {
        !matches!(self.method, Method::GET | Method::HEAD)
    }
}

/// Classified provider response. Non-2xx answers are a value, not an `Err`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status")]
pub enum ProviderResult {
    #[serde(rename = "ok")]
    Success {
        data: Option<Value>,
        #[serde(rename = "httpStatusCode")]
        http_status_code: u16,
    },
    #[serde(rename = "error")]
    Failure {
        data: Value,
        #[serde(rename = "httpStatusCode")]
        http_status_code: u16,
    },
}

impl ProviderResult {
    pub fn http_status_code(&self) -> u16 {
        match self {
            ProviderResult::Success {
                http_status_code, ..
            }
            | ProviderResult::Failure {
                http_status_code, ..
            } => *http_status_code,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ProviderResult::Success { .. })
    }

    pub fn data(&self) -> Option<&Value> {
        match self {
            ProviderResult::Success { data, .. } => data.as_ref(),
            ProviderResult::Failure { data, .. } => Some(data),
        }
    }

    pub fn into_data(self) -> Option<Value> {
        match self {
            ProviderResult::Success { data, .. } => data,
            ProviderResult::Failure { data, .. } => Some(data),
        }
    }
}

impl PaypalClient {
    /// Sends `request` with a fresh-or-cached bearer token and classifies the
    /// answer.
    pub async fn execute(&self, request: ProviderRequest) -> Result<ProviderResult, PaypalError> {
        let token = self.access_token().await?;
        let operation = request.operation;

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let bearer = HeaderValue::from_str(&format!("Bearer {}", token.access_token))
            .map_err(|_| PaypalError::failed(operation, None))?;
        headers.insert(AUTHORIZATION, bearer);
        if request.is_mutating() {
            headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en_US"));
        }
        headers.extend(request.headers);

        let mut builder = self
            .http
            .request(request.method.clone(), self.endpoint(&request.path))
            .headers(headers);
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(body) = &request.body {
            builder = builder.body(body.to_string());
        }

        let response = builder
            .send()
            .await
            .map_err(|error| PaypalError::transport(operation, error))?;
        let status = response.status();

        if status == StatusCode::NO_CONTENT {
            return Ok(ProviderResult::Success {
                data: None,
                http_status_code: status.as_u16(),
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|error| PaypalError::transport(operation, error))?;
        if !status.is_success() {
            tracing::warn!(?operation, status = status.as_u16(), "provider returned an error");
            return Ok(ProviderResult::Failure {
                data: error_body(&bytes),
                http_status_code: status.as_u16(),
            });
        }

        let data = if bytes.is_empty() {
            None
        } else {
            Some(serde_json::from_slice::<Value>(&bytes).map_err(|error| {
                tracing::warn!(?operation, %error, status = status.as_u16(), "undecodable provider body");
                PaypalError::failed(operation, Some(status.as_u16()))
            })?)
        };
        tracing::debug!(?operation, status = status.as_u16(), "provider call succeeded");
        Ok(ProviderResult::Success {
            data,
            http_status_code: status.as_u16(),
        })
    }
}

/// Error bodies are kept even when they are not JSON, e.g. a gateway's HTML
/// page on 502, so the status still reaches the caller as a `Failure`.
fn error_body(bytes: &[u8]) -> Value {
    if bytes.is_empty() {
        return Value::Null;
    }
    serde_json::from_slice(bytes)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(bytes).into_owned()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn result_serializes_as_tagged_union() {
        let ok = ProviderResult::Success {
            data: None,
            http_status_code: 204,
        };
        assert_eq!(
            serde_json::to_value(&ok).unwrap(),
            json!({"status": "ok", "data": null, "httpStatusCode": 204})
        );

        let failure = ProviderResult::Failure {
            data: json!({"name": "RESOURCE_NOT_FOUND"}),
            http_status_code: 404,
        };
        assert_eq!(
            serde_json::to_value(&failure).unwrap(),
            json!({"status": "error", "data": {"name": "RESOURCE_NOT_FOUND"}, "httpStatusCode": 404})
        );
        assert!(!failure.is_success());
        assert_eq!(failure.http_status_code(), 404);
    }

    #[test]
    fn non_json_error_bodies_are_kept_as_text() {
        assert_eq!(error_body(b""), Value::Null);
        assert_eq!(error_body(br#"{"name":"INTERNAL_SERVER_ERROR"}"#)["name"], "INTERNAL_SERVER_ERROR");
        assert_eq!(error_body(b"<html>Bad Gateway</html>"), json!("<html>Bad Gateway</html>"));
    }

    #[test]
    fn get_requests_are_not_mutating() {
        let get = ProviderRequest::new(Operation::GetOrder, Method::GET, "/v2/checkout/orders/1");
        let patch = ProviderRequest::new(Operation::PatchOrder, Method::PATCH, "/v2/checkout/orders/1");
        assert!(!get.is_mutating());
        assert!(patch.is_mutating());
    }
}
