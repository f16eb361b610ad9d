//! Carrier routing endpoints.

use crate::server::AppState;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Json;
use dispatch_routing::RoutingError;
use dispatch_storage::StorageError;
use dispatch_types::{
	ApiError, CarrierPerformanceRecord, DispatchEvent, RoutingContext, RoutingEvent,
	ScoringResult, ShipmentOutcome, Zone,
};
use serde::Deserialize;

/// Handles POST /api/routing/optimal requests.
pub async fn optimal(
	State(state): State<AppState>,
	Json(context): Json<RoutingContext>,
) -> Result<Json<ScoringResult>, ApiError> {
	let result = state
		.routing
		.get_optimal_carrier(&context)
		.await
		.map_err(routing_error)?;

	state
		.event_bus
		.publish(DispatchEvent::Routing(RoutingEvent::CarrierSelected {
			carrier_id: result.carrier.id.clone(),
			zone: context.zone,
			cost: result.cost,
			score: result.score,
		}));

	Ok(Json(result))
}

/// Request body for POST /api/routing/performance.
#[derive(Debug, Deserialize)]
pub struct RecordPerformanceRequest {
	pub carrier_id: String,
	#[serde(flatten)]
	pub outcome: ShipmentOutcome,
}

/// Handles POST /api/routing/performance requests.
///
/// Folds one shipment outcome into the carrier's lane history and returns
/// the updated record.
pub async fn record_performance(
	State(state): State<AppState>,
	Json(request): Json<RecordPerformanceRequest>,
) -> Result<Json<CarrierPerformanceRecord>, ApiError> {
	if state.registry.get(&request.carrier_id).is_none() {
		return Err(ApiError::BadRequest {
			error_type: "unknown_carrier".to_string(),
			message: format!("Unknown carrier '{}'", request.carrier_id),
			details: None,
		});
	}

	let record = state
		.performance
		.record(&request.carrier_id, &request.outcome)
		.await
		.map_err(storage_error)?;

	state
		.event_bus
		.publish(DispatchEvent::Routing(RoutingEvent::PerformanceRecorded {
			carrier_id: request.carrier_id.clone(),
			zone: request.outcome.zone,
			total_shipments: record.total_shipments,
			is_degraded: record.is_degraded,
		}));

	Ok(Json(record))
}

/// Handles DELETE /api/routing/history/{zone} requests.
///
/// Operational reset of a zone's telemetry; every carrier in the zone goes
/// back to the cold-start reliability prior.
pub async fn reset_history(
	State(state): State<AppState>,
	Path(zone): Path<String>,
) -> Result<StatusCode, ApiError> {
	let zone: Zone = zone.parse().map_err(|_| ApiError::BadRequest {
		error_type: "unknown_zone".to_string(),
		message: format!("Unknown zone '{}'", zone),
		details: None,
	})?;

	state
		.performance
		.reset_zone(zone)
		.await
		.map_err(storage_error)?;

	Ok(StatusCode::NO_CONTENT)
}

fn routing_error(err: RoutingError) -> ApiError {
	match err {
		RoutingError::MissingField(field) => ApiError::BadRequest {
			error_type: "missing_field".to_string(),
			message: err.to_string(),
			details: Some(serde_json::json!({ "field": field })),
		},
		RoutingError::NoEligibleCarrier => ApiError::UnprocessableEntity {
			error_type: "no_eligible_carrier".to_string(),
			message: err.to_string(),
			details: None,
		},
	}
}

fn storage_error(err: StorageError) -> ApiError {
	ApiError::ServiceUnavailable {
		error_type: "storage_unavailable".to_string(),
		message: err.to_string(),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::apis::orders::tests::test_state;
	use dispatch_types::Priority;

	fn context() -> RoutingContext {
		RoutingContext {
			pincode: "400001".to_string(),
			weight: 0.5,
			amount: 1000.0,
			zone: Zone::Tier3,
			cod_required: false,
			priority: Priority::Standard,
		}
	}

	#[tokio::test]
	async fn optimal_endpoint_returns_ranked_result() {
		let state = test_state();
		let Json(result) = optimal(State(state), Json(context())).await.unwrap();
		assert_eq!(result.carrier.id, "delhivery");
		assert_eq!(result.alternates.len(), 1);
	}

	#[tokio::test]
	async fn missing_field_maps_to_bad_request() {
		let state = test_state();
		let mut ctx = context();
		ctx.pincode = String::new();

		let err = optimal(State(state), Json(ctx)).await.unwrap_err();
		assert!(matches!(err, ApiError::BadRequest { .. }));
	}

	#[tokio::test]
	async fn heavy_cod_order_maps_to_unprocessable_entity() {
		let state = test_state();
		let mut ctx = context();
		ctx.zone = Zone::Metro;
		ctx.weight = 45.0;
		ctx.cod_required = true;

		let err = optimal(State(state), Json(ctx)).await.unwrap_err();
		match err {
			ApiError::UnprocessableEntity { error_type, .. } => {
				assert_eq!(error_type, "no_eligible_carrier")
			}
			other => panic!("unexpected error: {:?}", other),
		}
	}

	#[tokio::test]
	async fn record_performance_round_trips_through_store() {
		let state = test_state();
		let request = RecordPerformanceRequest {
			carrier_id: "delhivery".to_string(),
			outcome: ShipmentOutcome {
				zone: Zone::Metro,
				success: true,
				delivery_days: 1.0,
				cost: 45.0,
			},
		};

		let Json(record) = record_performance(State(state.clone()), Json(request))
			.await
			.unwrap();
		assert_eq!(record.total_shipments, 1);
		assert_eq!(record.successful, 1);

		let history = state.performance.zone_history(Zone::Metro).await;
		assert_eq!(history["delhivery"], record);
	}

	#[tokio::test]
	async fn unknown_carrier_is_rejected() {
		let state = test_state();
		let request = RecordPerformanceRequest {
			carrier_id: "carrier-pigeon".to_string(),
			outcome: ShipmentOutcome {
				zone: Zone::Metro,
				success: true,
				delivery_days: 1.0,
				cost: 45.0,
			},
		};

		let err = record_performance(State(state), Json(request))
			.await
			.unwrap_err();
		assert!(matches!(err, ApiError::BadRequest { .. }));
	}

	#[tokio::test]
	async fn reset_history_clears_zone() {
		let state = test_state();
		state
			.performance
			.record(
				"fedex",
				&ShipmentOutcome {
					zone: Zone::Metro,
					success: true,
					delivery_days: 1.0,
					cost: 75.0,
				},
			)
			.await
			.unwrap();

		let status = reset_history(State(state.clone()), Path("metro".to_string()))
			.await
			.unwrap();
		assert_eq!(status, StatusCode::NO_CONTENT);
		assert!(state.performance.zone_history(Zone::Metro).await.is_empty());

		let err = reset_history(State(state), Path("tier9".to_string()))
			.await
			.unwrap_err();
		assert!(matches!(err, ApiError::BadRequest { .. }));
	}
}
