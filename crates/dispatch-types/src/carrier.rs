//! Carrier types for the routing engine.
//!
//! Defines the static carrier capability profiles loaded at startup and the
//! rolling per-lane performance records maintained from shipment outcomes.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::str::FromStr;

/// Coarse geographic tier used to bucket carrier rates and SLAs.
#[derive(
	Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord,
)]
#[serde(rename_all = "lowercase")]
pub enum Zone {
	Metro,
	Tier1,
	Tier2,
	Tier3,
}

impl Zone {
	/// Returns the wire label for this zone.
	pub fn as_str(&self) -> &'static str {
		match self {
			Zone::Metro => "metro",
			Zone::Tier1 => "tier1",
			Zone::Tier2 => "tier2",
			Zone::Tier3 => "tier3",
		}
	}

	/// Flat surcharge added to shipping cost for this zone.
	pub fn premium(&self) -> f64 {
		match self {
			Zone::Metro => 0.0,
			Zone::Tier1 => 10.0,
			Zone::Tier2 => 20.0,
			Zone::Tier3 => 30.0,
		}
	}

	/// Returns an iterator over all zone variants.
	pub fn all() -> impl Iterator<Item = Self> {
		[Self::Metro, Self::Tier1, Self::Tier2, Self::Tier3].into_iter()
	}
}

impl fmt::Display for Zone {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for Zone {
	type Err = ();

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Self::all().find(|zone| zone.as_str() == s).ok_or(())
	}
}

/// Static capability and rate profile for one shipping carrier.
///
/// Registry data: loaded at startup, never mutated at runtime.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CarrierProfile {
	/// Stable identifier, e.g. "delhivery".
	pub id: String,
	/// Display name.
	pub name: String,
	/// Maximum shipment weight in kg.
	pub weight_limit: f64,
	/// Whether the carrier accepts cash-on-delivery shipments.
	pub cod_enabled: bool,
	/// Base shipping rate for a minimum-weight parcel.
	pub base_rate: f64,
	/// Premium-trust flag; earns a bonus on express shipments.
	#[serde(default)]
	pub premium: bool,
	/// Zones this carrier serves.
	pub zones: BTreeSet<Zone>,
	/// Promised delivery days per served zone.
	pub sla_days: HashMap<Zone, u32>,
}

impl CarrierProfile {
	/// Promised delivery days for a zone, if the carrier serves it.
	pub fn sla_for(&self, zone: Zone) -> Option<u32> {
		self.sla_days.get(&zone).copied()
	}

	/// Whether the carrier serves the given zone.
	pub fn serves(&self, zone: Zone) -> bool {
		self.zones.contains(&zone)
	}
}

/// Shipment totals exceeding this count make the degradation check active.
pub const DEGRADED_MIN_SHIPMENTS: u64 = 10;
/// Success ratio below which an active carrier lane is flagged degraded.
pub const DEGRADED_SUCCESS_FLOOR: f64 = 0.6;

/// Rolling statistics for one (carrier, zone) lane.
///
/// Invariant: `total_shipments == successful + failed`. `is_degraded` is a
/// pure function of the counters and is recomputed on every outcome, so a
/// lane recovers automatically once its success ratio climbs back over the
/// floor.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CarrierPerformanceRecord {
	pub total_shipments: u64,
	pub successful: u64,
	pub failed: u64,
	/// Running average delivery time in days.
	pub avg_delivery_days: f64,
	/// Running average shipping cost.
	pub avg_cost: f64,
	pub is_degraded: bool,
}

impl CarrierPerformanceRecord {
	/// Fraction of recorded shipments that succeeded (0 when empty).
	pub fn success_ratio(&self) -> f64 {
		if self.total_shipments == 0 {
			0.0
		} else {
			self.successful as f64 / self.total_shipments as f64
		}
	}

	/// Folds one shipment outcome into the record.
	///
	/// Updates counters, incremental running averages, and the degradation
	/// flag in a single step so a record read back from storage is always
	/// internally consistent.
	pub fn apply(&mut self, outcome: &ShipmentOutcome) {
		let n = self.total_shipments + 1;
		self.total_shipments = n;
		if outcome.success {
			self.successful += 1;
		} else {
			self.failed += 1;
		}

		self.avg_delivery_days =
			(self.avg_delivery_days * (n - 1) as f64 + outcome.delivery_days) / n as f64;
		self.avg_cost = (self.avg_cost * (n - 1) as f64 + outcome.cost) / n as f64;

		self.is_degraded = self.total_shipments > DEGRADED_MIN_SHIPMENTS
			&& self.success_ratio() < DEGRADED_SUCCESS_FLOOR;
	}
}

/// One completed shipment outcome, the input to performance recording.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShipmentOutcome {
	/// Zone the shipment was delivered in.
	pub zone: Zone,
	/// Whether the delivery succeeded (false for RTO/lost shipments).
	pub success: bool,
	/// Actual delivery time in days.
	pub delivery_days: f64,
	/// Actual shipping cost.
	pub cost: f64,
}
