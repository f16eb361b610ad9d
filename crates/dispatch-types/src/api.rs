//! API types for HTTP endpoints and error responses.
//!
//! Defines the error envelope returned by the dispatch API so every
//! endpoint reports failures in the same shape.

use axum::{
	http::StatusCode,
	response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};

/// Structured error body returned by the API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
	/// Machine-readable error type, e.g. "invalid_transition".
	pub error_type: String,
	/// Human-readable message.
	pub message: String,
	/// Optional structured details, e.g. valid next statuses.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub details: Option<serde_json::Value>,
}

/// Errors surfaced by API endpoints.
#[derive(Debug, Clone)]
pub enum ApiError {
	/// Bad request with validation errors (400).
	BadRequest {
		error_type: String,
		message: String,
		details: Option<serde_json::Value>,
	},
	/// Unprocessable entity for business logic failures (422).
	UnprocessableEntity {
		error_type: String,
		message: String,
		details: Option<serde_json::Value>,
	},
	/// Service unavailable, typically a storage collaborator outage (503).
	ServiceUnavailable { error_type: String, message: String },
	/// Internal server error (500).
	InternalServerError { error_type: String, message: String },
}

impl ApiError {
	/// HTTP status code for this error.
	pub fn status_code(&self) -> StatusCode {
		match self {
			ApiError::BadRequest { .. } => StatusCode::BAD_REQUEST,
			ApiError::UnprocessableEntity { .. } => StatusCode::UNPROCESSABLE_ENTITY,
			ApiError::ServiceUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
			ApiError::InternalServerError { .. } => StatusCode::INTERNAL_SERVER_ERROR,
		}
	}

	fn into_body(self) -> ErrorResponse {
		match self {
			ApiError::BadRequest {
				error_type,
				message,
				details,
			}
			| ApiError::UnprocessableEntity {
				error_type,
				message,
				details,
			} => ErrorResponse {
				error_type,
				message,
				details,
			},
			ApiError::ServiceUnavailable {
				error_type,
				message,
			}
			| ApiError::InternalServerError {
				error_type,
				message,
			} => ErrorResponse {
				error_type,
				message,
				details: None,
			},
		}
	}
}

impl IntoResponse for ApiError {
	fn into_response(self) -> Response {
		let status = self.status_code();
		(status, Json(self.into_body())).into_response()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn status_codes_match_variants() {
		let bad = ApiError::BadRequest {
			error_type: "missing_field".into(),
			message: "weight".into(),
			details: None,
		};
		assert_eq!(bad.status_code(), StatusCode::BAD_REQUEST);

		let unavailable = ApiError::ServiceUnavailable {
			error_type: "storage".into(),
			message: "down".into(),
		};
		assert_eq!(unavailable.status_code(), StatusCode::SERVICE_UNAVAILABLE);
	}

	#[test]
	fn body_preserves_details() {
		let err = ApiError::UnprocessableEntity {
			error_type: "invalid_transition".into(),
			message: "no edge".into(),
			details: Some(serde_json::json!({"valid_options": ["Pending"]})),
		};
		let body = err.into_body();
		assert_eq!(body.error_type, "invalid_transition");
		assert!(body.details.is_some());
	}
}
