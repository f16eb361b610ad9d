//! Order lifecycle endpoints.
//!
//! These endpoints are stateless: the caller submits the order(s) to act on
//! and receives the updated values back. Persisting the result is the
//! caller's responsibility.

use crate::server::AppState;
use axum::extract::{Path, State};
use axum::response::Json;
use dispatch_lifecycle::{calculate_metrics, valid_next_statuses, BulkResult, LifecycleError};
use dispatch_types::{
	ApiError, AuditContext, Order, OrderMetrics, OrderStatus, StatusChange, Transition,
};
use serde::{Deserialize, Serialize};

/// Request body for POST /api/orders/transition.
#[derive(Debug, Deserialize)]
pub struct TransitionRequest {
	pub order: Order,
	pub change: StatusChange,
	#[serde(default)]
	pub audit: AuditContext,
}

/// Response body for a successful transition.
#[derive(Debug, Serialize)]
pub struct TransitionResponse {
	pub order: Order,
	/// The transition record that was appended.
	pub transition: Transition,
}

/// Handles POST /api/orders/transition requests.
pub async fn transition(
	State(state): State<AppState>,
	Json(request): Json<TransitionRequest>,
) -> Result<Json<TransitionResponse>, ApiError> {
	let updated = state
		.lifecycle
		.transition(&request.order, &request.change, &request.audit)
		.map_err(lifecycle_error)?;

	// The engine always appends exactly one record on success.
	let transition = updated
		.status_history
		.last()
		.cloned()
		.ok_or_else(|| ApiError::InternalServerError {
			error_type: "missing_transition".to_string(),
			message: "transition applied without a history record".to_string(),
		})?;

	Ok(Json(TransitionResponse {
		order: updated,
		transition,
	}))
}

/// Request body for POST /api/orders/transition/bulk.
#[derive(Debug, Deserialize)]
pub struct BulkTransitionRequest {
	pub orders: Vec<Order>,
	pub change: StatusChange,
	#[serde(default)]
	pub audit: AuditContext,
}

/// Handles POST /api/orders/transition/bulk requests.
///
/// Per-item failures are reported inside the result; the endpoint itself
/// only fails on malformed input.
pub async fn bulk_transition(
	State(state): State<AppState>,
	Json(request): Json<BulkTransitionRequest>,
) -> Result<Json<BulkResult>, ApiError> {
	let result =
		state
			.lifecycle
			.bulk_transition(&request.orders, &request.change, &request.audit);
	Ok(Json(result))
}

/// Handles POST /api/orders/metrics requests.
pub async fn metrics(Json(order): Json<Order>) -> Result<Json<OrderMetrics>, ApiError> {
	Ok(Json(calculate_metrics(&order)))
}

/// Handles GET /api/statuses/{status}/next requests.
pub async fn next_statuses(
	Path(status): Path<String>,
) -> Result<Json<Vec<OrderStatus>>, ApiError> {
	let status: OrderStatus = status.parse().map_err(|_| ApiError::BadRequest {
		error_type: "unknown_status".to_string(),
		message: format!("Unknown order status '{}'", status),
		details: None,
	})?;

	Ok(Json(valid_next_statuses(status)))
}

fn lifecycle_error(err: LifecycleError) -> ApiError {
	match &err {
		LifecycleError::InvalidTransition { valid_options, .. } => {
			ApiError::UnprocessableEntity {
				error_type: "invalid_transition".to_string(),
				message: err.to_string(),
				details: Some(serde_json::json!({ "valid_options": valid_options })),
			}
		}
	}
}
