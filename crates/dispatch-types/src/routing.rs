//! Routing request and result types.
//!
//! The routing context carries the order attributes the scorer needs; the
//! scoring result is the ephemeral, per-request ranking handed back to the
//! caller. Neither is persisted by the core.

use crate::carrier::{CarrierProfile, Zone};
use serde::{Deserialize, Serialize};

/// Delivery priority requested for a shipment.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
	#[default]
	Standard,
	Express,
}

/// Order attributes evaluated by the routing engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutingContext {
	/// Destination pincode.
	pub pincode: String,
	/// Shipment weight in kg.
	pub weight: f64,
	/// Order value, used for the COD surcharge.
	#[serde(default)]
	pub amount: f64,
	/// Destination zone.
	pub zone: Zone,
	/// Whether the order must be collected cash-on-delivery.
	#[serde(default)]
	pub cod_required: bool,
	/// Requested delivery priority.
	#[serde(default)]
	pub priority: Priority,
}

impl RoutingContext {
	/// True when the order was requested as express priority.
	pub fn is_express(&self) -> bool {
		self.priority == Priority::Express
	}
}

/// A runner-up carrier in a scoring result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankedAlternate {
	pub carrier: CarrierProfile,
	/// Estimated shipping cost for this carrier.
	pub cost: f64,
	/// Promised delivery days in the order's zone.
	pub sla_days: u32,
	/// Reported score, clamped to 100 with one decimal.
	pub score: f64,
}

/// Outcome of one routing request: the chosen carrier plus up to two
/// ranked alternates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringResult {
	pub carrier: CarrierProfile,
	pub cost: f64,
	pub sla_days: u32,
	/// Reported score, clamped to 100 with one decimal.
	pub score: f64,
	pub alternates: Vec<RankedAlternate>,
}
