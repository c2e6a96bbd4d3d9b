//! Response types for the pricing API.
//!
//! This module defines the error body, the mapping from engine errors to
//! HTTP statuses, and the composite breakdown response.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::EngineError;
use crate::models::{CostBreakdown, PieceZonePrice, PriceComparison};

/// API error response structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    /// Error code for programmatic handling.
    pub code: String,
    /// Human-readable error message.
    pub message: String,
    /// Optional structured details about the error.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl ApiError {
    /// Creates a new API error.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
        }
    }

    /// Creates a new API error with details.
    pub fn with_details(code: impl Into<String>, message: impl Into<String>, details: Value) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: Some(details),
        }
    }

    /// Creates a validation error response.
    pub fn validation_error(message: impl Into<String>) -> Self {
        Self::new("VALIDATION_ERROR", message)
    }

    /// Creates a malformed JSON error response.
    pub fn malformed_json(message: impl Into<String>) -> Self {
        Self::new("MALFORMED_JSON", message)
    }
}

/// API error with HTTP status code.
#[derive(Debug)]
pub struct ApiErrorResponse {
    /// The HTTP status code.
    pub status: StatusCode,
    /// The error body.
    pub error: ApiError,
}

impl ApiErrorResponse {
    /// A 400 response with the given body.
    pub fn bad_request(error: ApiError) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            error,
        }
    }
}

impl IntoResponse for ApiErrorResponse {
    fn into_response(self) -> Response {
        (self.status, Json(self.error)).into_response()
    }
}

impl From<EngineError> for ApiErrorResponse {
    fn from(error: EngineError) -> Self {
        let code = error.code();
        match error {
            EngineError::Validation {
                message, details, ..
            } => ApiErrorResponse {
                status: StatusCode::BAD_REQUEST,
                error: ApiError {
                    code,
                    message,
                    details,
                },
            },
            EngineError::NotFound { .. } => ApiErrorResponse {
                status: StatusCode::NOT_FOUND,
                error: ApiError::new(code, error.to_string()),
            },
            EngineError::Conflict { message, .. } => ApiErrorResponse {
                status: StatusCode::CONFLICT,
                error: ApiError::new(code, message),
            },
            EngineError::ConfigNotFound { .. } | EngineError::ConfigParseError { .. } => {
                ApiErrorResponse {
                    status: StatusCode::INTERNAL_SERVER_ERROR,
                    error: ApiError::new(code, error.to_string()),
                }
            }
            EngineError::Persistence { .. } => ApiErrorResponse {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                error: ApiError::new(code, "The ledger store failed"),
            },
        }
    }
}

/// Liveness response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Always `ok`.
    pub status: String,
    /// Crate version.
    pub version: String,
}

/// Whether a zone's month is closed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonthStatusResponse {
    /// The zone.
    pub zone_id: String,
    /// First day of the month.
    pub month: NaiveDate,
    /// True once the month has been closed.
    pub closed: bool,
}

/// A breakdown, optionally with a price comparison and the price it
/// published.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BreakdownResponse {
    /// The breakdown fields, inline.
    #[serde(flatten)]
    pub breakdown: CostBreakdown,
    /// Present when the request asked for a comparison.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comparison: Option<PriceComparison>,
    /// Present when the request asked to publish.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published: Option<PieceZonePrice>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_api_error_serialization() {
        let error = ApiError::new("TEST_ERROR", "Test message");
        let json = serde_json::to_string(&error).unwrap();
        assert!(json.contains("\"code\":\"TEST_ERROR\""));
        assert!(json.contains("\"message\":\"Test message\""));
        assert!(!json.contains("details"));
    }

    #[test]
    fn test_api_error_with_details_serialization() {
        let error = ApiError::with_details("TEST_ERROR", "Test message", json!({"fields": ["a"]}));
        let json = serde_json::to_value(&error).unwrap();
        assert_eq!(json["details"]["fields"][0], "a");
    }

    #[test]
    fn test_engine_errors_map_to_statuses() {
        let cases = [
            (
                EngineError::validation("MISSING_MATERIAL_PRICES", "x"),
                StatusCode::BAD_REQUEST,
                "MISSING_MATERIAL_PRICES",
            ),
            (
                EngineError::not_found("piece", "P9"),
                StatusCode::NOT_FOUND,
                "PIECE_NOT_FOUND",
            ),
            (
                EngineError::conflict("PERIOD_CLOSED", "closed"),
                StatusCode::CONFLICT,
                "PERIOD_CLOSED",
            ),
            (
                EngineError::Persistence {
                    message: "disk I/O error".to_string(),
                },
                StatusCode::INTERNAL_SERVER_ERROR,
                "PERSISTENCE_ERROR",
            ),
        ];

        for (engine_error, status, code) in cases {
            let response: ApiErrorResponse = engine_error.into();
            assert_eq!(response.status, status);
            assert_eq!(response.error.code, code);
        }
    }

    #[test]
    fn test_validation_details_are_kept() {
        let engine_error = EngineError::validation_with_details(
            "INVALID_PARAMETER",
            "negative",
            json!({"fields": ["profit_per_ton"]}),
        );
        let response: ApiErrorResponse = engine_error.into();
        assert_eq!(
            response.error.details.unwrap()["fields"][0],
            "profit_per_ton"
        );
    }

    #[test]
    fn test_persistence_message_is_not_leaked() {
        let response: ApiErrorResponse = EngineError::Persistence {
            message: "no such table: zones".to_string(),
        }
        .into();
        assert!(!response.error.message.contains("zones"));
    }
}
