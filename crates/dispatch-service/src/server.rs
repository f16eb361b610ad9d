//! HTTP server for the dispatch API.
//!
//! This module provides a minimal HTTP server exposing the lifecycle and
//! routing engines. The API is stateless with respect to orders: every
//! request carries the order(s) it operates on, and the updated values are
//! returned to the caller for persistence.

use axum::{
	extract::State,
	response::Json,
	routing::{delete, get, post},
	Router,
};
use dispatch_config::{ApiConfig, Config};
use dispatch_lifecycle::LifecycleEngine;
use dispatch_routing::{CarrierRegistry, PerformanceStore, RoutingEngine};
use dispatch_storage::StorageService;
use dispatch_types::{ApiError, EventBus};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;

/// Shared application state for the API server.
#[derive(Clone)]
pub struct AppState {
	/// Complete configuration.
	pub config: Config,
	/// Storage service backing the performance store.
	pub storage: Arc<StorageService>,
	/// Static carrier registry.
	pub registry: Arc<CarrierRegistry>,
	/// Rolling carrier telemetry.
	pub performance: Arc<PerformanceStore>,
	/// Order lifecycle engine.
	pub lifecycle: Arc<LifecycleEngine>,
	/// Carrier routing engine.
	pub routing: Arc<RoutingEngine>,
	/// Bus carrying audit and notification events.
	pub event_bus: EventBus,
}

/// Starts the HTTP server for the API.
pub async fn start_server(
	api_config: ApiConfig,
	state: AppState,
) -> Result<(), Box<dyn std::error::Error>> {
	let app = router(state);

	let bind_address = format!("{}:{}", api_config.host, api_config.port);
	let listener = TcpListener::bind(&bind_address).await?;

	tracing::info!("Dispatch API server starting on {}", bind_address);

	axum::serve(listener, app).await?;

	Ok(())
}

/// Builds the API router.
pub fn router(state: AppState) -> Router {
	Router::new()
		.nest(
			"/api",
			Router::new()
				.route("/health", get(handle_health))
				.route("/orders/transition", post(crate::apis::orders::transition))
				.route(
					"/orders/transition/bulk",
					post(crate::apis::orders::bulk_transition),
				)
				.route("/orders/metrics", post(crate::apis::orders::metrics))
				.route(
					"/statuses/{status}/next",
					get(crate::apis::orders::next_statuses),
				)
				.route("/routing/optimal", post(crate::apis::routing::optimal))
				.route(
					"/routing/performance",
					post(crate::apis::routing::record_performance),
				)
				.route(
					"/routing/history/{zone}",
					delete(crate::apis::routing::reset_history),
				),
		)
		.layer(ServiceBuilder::new().layer(CorsLayer::permissive()))
		.with_state(state)
}

/// Handles GET /api/health requests.
async fn handle_health(
	State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, ApiError> {
	Ok(Json(serde_json::json!({
		"status": "ok",
		"service": state.config.service.id,
		"carriers": state.registry.len(),
	})))
}
