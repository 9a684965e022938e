//! Response classification and structured Feed API errors
//!
//! Error bodies follow the platform convention
//! `{"errors": [...], "warnings": [...]}`; anything else is kept as raw text.

use std::fmt;

use reqwest::{Method, Response, StatusCode, Url};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

/// Message used when the error body is structured JSON
pub const DEFAULT_ERROR_MESSAGE: &str = "API error";

/// How the chunk loop should treat a response status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseClass {
    /// 200 (final chunk) or 206 (partial chunk)
    Chunk,
    /// 204: nothing published for these parameters
    NoContent,
    /// Any other status
    Failure,
}

impl ResponseClass {
    /// Classify a status code.
    ///
    /// Anything outside `[200, 300)` is a failure, as is any 2xx the chunk
    /// loop has no meaning for.
    pub fn of(status: StatusCode) -> Self {
        if !ApiErrorResponse::is_success_status(status) {
            return ResponseClass::Failure;
        }
        match status {
            StatusCode::OK | StatusCode::PARTIAL_CONTENT => ResponseClass::Chunk,
            StatusCode::NO_CONTENT => ResponseClass::NoContent,
            _ => ResponseClass::Failure,
        }
    }
}

/// Parameter that triggered an error or warning
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ErrorParameter {
    /// Parameter name
    pub name: String,
    /// Offending value
    pub value: String,
}

/// One error or warning entry of an API error body
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ErrorDetail {
    /// Numeric error id
    pub error_id: i64,
    /// Originating API domain
    pub domain: String,
    /// Error category (`REQUEST`, `APPLICATION`, ...)
    pub category: String,
    /// Short message
    pub message: String,
    /// Long message
    pub long_message: String,
    /// Parameters involved
    pub parameters: Vec<ErrorParameter>,
}

impl fmt::Display for ErrorDetail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "errorId: {} domain: {} category: {} message: {}",
            self.error_id, self.domain, self.category, self.message
        )?;
        if !self.parameters.is_empty() {
            let params: Vec<String> = self
                .parameters
                .iter()
                .map(|p| format!("{}={}", p.name, p.value))
                .collect();
            write!(f, " parameters: {}", params.join(", "))?;
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    errors: Vec<ErrorDetail>,
    #[serde(default)]
    warnings: Vec<ErrorDetail>,
}

/// Non-success Feed API response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiErrorResponse {
    /// Method of the request that failed
    pub method: Method,
    /// URL of the request that failed
    pub url: Url,
    /// Response status
    pub status: StatusCode,
    /// Summary, or the raw body when it was not a JSON error document
    pub message: String,
    /// Reported errors
    pub errors: Vec<ErrorDetail>,
    /// Reported warnings
    pub warnings: Vec<ErrorDetail>,
}

impl ApiErrorResponse {
    /// Whether `status` is in the inclusive success range `[200, 300)`.
    pub fn is_success_status(status: StatusCode) -> bool {
        (200..300).contains(&status.as_u16())
    }

    /// Build from a status and an already-read body.
    ///
    /// A JSON object fills `errors` and `warnings` and keeps the default
    /// message; JSON `null` changes nothing. Any body that does not decode
    /// that way, the empty body included, becomes the message verbatim.
    pub fn from_body(method: Method, url: Url, status: StatusCode, body: &str) -> Self {
        let mut response = Self::new(method, url, status);

        let parsed = match serde_json::from_str::<Value>(body) {
            Ok(Value::Null) => return response,
            Ok(value @ Value::Object(_)) => serde_json::from_value::<ErrorBody>(value),
            Ok(other) => {
                debug!("Error body is JSON but not an object: {}", other);
                response.message = body.to_string();
                return response;
            }
            Err(e) => Err(e),
        };

        match parsed {
            Ok(parsed) => {
                response.errors = parsed.errors;
                response.warnings = parsed.warnings;
            }
            Err(e) => {
                debug!("Error body is not a JSON error document: {}", e);
                response.message = body.to_string();
            }
        }

        response
    }

    fn new(method: Method, url: Url, status: StatusCode) -> Self {
        Self {
            method,
            url,
            status,
            message: DEFAULT_ERROR_MESSAGE.to_string(),
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    /// Read the whole body of `response` and build the error from it.
    ///
    /// A body that cannot be read leaves the default message in place.
    pub async fn from_response(method: Method, url: Url, response: Response) -> Self {
        let status = response.status();
        match response.text().await {
            Ok(body) => Self::from_body(method, url, status, &body),
            Err(e) => {
                debug!("Failed to read error body: {}", e);
                Self::new(method, url, status)
            }
        }
    }
}

impl fmt::Display for ApiErrorResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} - {} {}: {} - errors: [{}] - warnings: [{}]",
            self.message,
            self.method,
            self.url,
            self.status.as_u16(),
            join_details(&self.errors),
            join_details(&self.warnings)
        )
    }
}

impl std::error::Error for ApiErrorResponse {}

fn join_details(details: &[ErrorDetail]) -> String {
    details
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
