//! Carrier routing module for the dispatch system.
//!
//! This module selects the best shipping carrier for an order: the registry
//! holds the static per-carrier capability and rate profiles, the
//! performance store maintains rolling per-lane delivery statistics, and
//! the routing engine filters eligible carriers and ranks them by a
//! weighted cost / SLA / reliability score.

use thiserror::Error;

pub mod engine;
pub mod performance;
pub mod registry;

pub use engine::RoutingEngine;
pub use performance::PerformanceStore;
pub use registry::CarrierRegistry;

/// Errors that can occur during carrier routing.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RoutingError {
	/// A required routing input is absent or unusable. Caller error, not
	/// retryable without correction.
	#[error("Missing required field: {0}")]
	MissingField(&'static str),
	/// No registry entry satisfies the weight/zone/COD constraints. Requires
	/// manual carrier assignment or an order hold.
	#[error("No eligible carriers for this order")]
	NoEligibleCarrier,
}
