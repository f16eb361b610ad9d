//! Order lifecycle types for the dispatch system.
//!
//! This module defines the order structure, the status enum that drives the
//! lifecycle state machine, the immutable transition records that form an
//! order's audit trail, and the typed status-change requests used to apply
//! transitions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Actor recorded on a transition when no explicit user is supplied.
pub const SYSTEM_ACTOR: &str = "system";

/// Status of an order in the dispatch system.
///
/// Serialized labels match the dashboard's historical wire format
/// (`"MTP-Applied"`, `"Out-for-Delivery"`, ...), so stored histories written
/// by older components remain readable.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum OrderStatus {
	/// Order has entered the system and awaits processing.
	Pending,
	/// Manufacturing/packing ticket applied.
	#[serde(rename = "MTP-Applied")]
	MtpApplied,
	/// Quality check passed.
	#[serde(rename = "QA-Passed")]
	QaPassed,
	/// A carrier has been assigned for shipping.
	#[serde(rename = "Carrier-Assigned")]
	CarrierAssigned,
	/// Shipping label generated and AWB allocated.
	#[serde(rename = "Label-Generated")]
	LabelGenerated,
	/// Package handed over to the carrier.
	#[serde(rename = "Picked-Up")]
	PickedUp,
	/// Package moving through the carrier network.
	#[serde(rename = "In-Transit")]
	InTransit,
	/// Package out with the delivery agent.
	#[serde(rename = "Out-for-Delivery")]
	OutForDelivery,
	/// Package delivered. Terminal.
	Delivered,
	/// Delivery failed, return-to-origin started.
	#[serde(rename = "RTO-Initiated")]
	RtoInitiated,
	/// Return shipment moving back to origin.
	#[serde(rename = "RTO-In-Transit")]
	RtoInTransit,
	/// Return shipment received at origin; order may be re-shipped.
	#[serde(rename = "RTO-Delivered")]
	RtoDelivered,
	/// Order cancelled. Terminal.
	Cancelled,
	/// Order parked pending a manual decision.
	#[serde(rename = "On-Hold")]
	OnHold,
}

impl OrderStatus {
	/// Returns the wire label for this status.
	pub fn as_str(&self) -> &'static str {
		match self {
			OrderStatus::Pending => "Pending",
			OrderStatus::MtpApplied => "MTP-Applied",
			OrderStatus::QaPassed => "QA-Passed",
			OrderStatus::CarrierAssigned => "Carrier-Assigned",
			OrderStatus::LabelGenerated => "Label-Generated",
			OrderStatus::PickedUp => "Picked-Up",
			OrderStatus::InTransit => "In-Transit",
			OrderStatus::OutForDelivery => "Out-for-Delivery",
			OrderStatus::Delivered => "Delivered",
			OrderStatus::RtoInitiated => "RTO-Initiated",
			OrderStatus::RtoInTransit => "RTO-In-Transit",
			OrderStatus::RtoDelivered => "RTO-Delivered",
			OrderStatus::Cancelled => "Cancelled",
			OrderStatus::OnHold => "On-Hold",
		}
	}

	/// Returns an iterator over all status variants in declaration order.
	pub fn all() -> impl Iterator<Item = Self> {
		[
			Self::Pending,
			Self::MtpApplied,
			Self::QaPassed,
			Self::CarrierAssigned,
			Self::LabelGenerated,
			Self::PickedUp,
			Self::InTransit,
			Self::OutForDelivery,
			Self::Delivered,
			Self::RtoInitiated,
			Self::RtoInTransit,
			Self::RtoDelivered,
			Self::Cancelled,
			Self::OnHold,
		]
		.into_iter()
	}

	/// True for statuses with no outgoing transitions.
	pub fn is_terminal(&self) -> bool {
		matches!(self, OrderStatus::Delivered | OrderStatus::Cancelled)
	}

	/// True for the return-to-origin leg of the lifecycle.
	pub fn is_rto(&self) -> bool {
		matches!(
			self,
			OrderStatus::RtoInitiated | OrderStatus::RtoInTransit | OrderStatus::RtoDelivered
		)
	}
}

impl fmt::Display for OrderStatus {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for OrderStatus {
	type Err = ();

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Self::all().find(|status| status.as_str() == s).ok_or(())
	}
}

/// A single recorded status change in an order's history.
///
/// Transition records are append-only: once pushed onto an order's history
/// they are never modified or removed. The creation record carries
/// `from: None`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Transition {
	/// Status the order left, or None for the creation record.
	pub from: Option<OrderStatus>,
	/// Status the order entered.
	pub to: OrderStatus,
	/// When the change was applied. Non-decreasing within one history.
	pub timestamp: DateTime<Utc>,
	/// Actor that requested the change.
	#[serde(default = "default_actor")]
	pub user: String,
	/// Free-form reason supplied with the change.
	#[serde(default)]
	pub reason: String,
	/// Free-form operator notes.
	#[serde(default)]
	pub notes: String,
}

fn default_actor() -> String {
	SYSTEM_ACTOR.to_string()
}

/// An order tracked by the dispatch system.
///
/// Invariant: `status` always equals the `to` field of the last history
/// entry (or the initial status when the history is empty). Orders are
/// mutated only through the lifecycle engine and are never deleted, only
/// transitioned into a terminal status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
	/// Unique identifier for this order.
	pub id: String,
	/// Current status of the order.
	pub status: OrderStatus,
	/// Append-only audit trail of status changes.
	#[serde(default)]
	pub status_history: Vec<Transition>,
	/// Assigned carrier, set when entering Carrier-Assigned.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub carrier: Option<String>,
	/// Carrier tracking reference, set when entering Label-Generated.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub awb: Option<String>,
	/// Delivery timestamp, set when entering Delivered.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub delivery_date: Option<DateTime<Utc>>,
	/// Why the order went into the RTO leg, set on RTO transitions.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub rto_reason: Option<String>,
	/// Free-form metadata carried alongside the order.
	#[serde(default)]
	pub metadata: HashMap<String, serde_json::Value>,
	/// Timestamp when this order entered the system.
	pub created_at: DateTime<Utc>,
	/// Timestamp when this order was last updated.
	pub updated_at: DateTime<Utc>,
}

impl Order {
	/// Creates a new order in Pending with a seeded creation record.
	pub fn new(id: impl Into<String>) -> Self {
		let now = Utc::now();
		Self {
			id: id.into(),
			status: OrderStatus::Pending,
			status_history: vec![Transition {
				from: None,
				to: OrderStatus::Pending,
				timestamp: now,
				user: SYSTEM_ACTOR.to_string(),
				reason: "order created".to_string(),
				notes: String::new(),
			}],
			carrier: None,
			awb: None,
			delivery_date: None,
			rto_reason: None,
			metadata: HashMap::new(),
			created_at: now,
			updated_at: now,
		}
	}

	/// Timestamp of the first transition into the given status, if any.
	pub fn first_entered(&self, status: OrderStatus) -> Option<DateTime<Utc>> {
		self.status_history
			.iter()
			.find(|t| t.to == status)
			.map(|t| t.timestamp)
	}
}

/// A typed status-change request.
///
/// Each target status carries exactly the payload it needs, so
/// status-specific fields (carrier, AWB, RTO reason) can only land on the
/// order when the matching transition is applied. Serialized with the target
/// status label as the tag, e.g.
/// `{"status": "Carrier-Assigned", "carrier": "delhivery"}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "status")]
pub enum StatusChange {
	/// Return the order to Pending (un-assign or re-ship).
	Pending,
	#[serde(rename = "MTP-Applied")]
	MtpApplied,
	#[serde(rename = "QA-Passed")]
	QaPassed,
	#[serde(rename = "Carrier-Assigned")]
	CarrierAssigned {
		/// Identifier of the carrier taking the shipment.
		carrier: String,
	},
	#[serde(rename = "Label-Generated")]
	LabelGenerated {
		/// Tracking reference allocated by the carrier.
		awb: String,
	},
	#[serde(rename = "Picked-Up")]
	PickedUp,
	#[serde(rename = "In-Transit")]
	InTransit,
	#[serde(rename = "Out-for-Delivery")]
	OutForDelivery,
	Delivered {
		/// Delivery timestamp; omitted when only the status is known.
		#[serde(default, skip_serializing_if = "Option::is_none")]
		delivery_date: Option<DateTime<Utc>>,
	},
	#[serde(rename = "RTO-Initiated")]
	RtoInitiated {
		#[serde(default, skip_serializing_if = "Option::is_none")]
		reason: Option<String>,
	},
	#[serde(rename = "RTO-In-Transit")]
	RtoInTransit {
		#[serde(default, skip_serializing_if = "Option::is_none")]
		reason: Option<String>,
	},
	#[serde(rename = "RTO-Delivered")]
	RtoDelivered {
		#[serde(default, skip_serializing_if = "Option::is_none")]
		reason: Option<String>,
	},
	Cancelled,
	#[serde(rename = "On-Hold")]
	OnHold,
}

impl StatusChange {
	/// The target status this change transitions into.
	pub fn status(&self) -> OrderStatus {
		match self {
			StatusChange::Pending => OrderStatus::Pending,
			StatusChange::MtpApplied => OrderStatus::MtpApplied,
			StatusChange::QaPassed => OrderStatus::QaPassed,
			StatusChange::CarrierAssigned { .. } => OrderStatus::CarrierAssigned,
			StatusChange::LabelGenerated { .. } => OrderStatus::LabelGenerated,
			StatusChange::PickedUp => OrderStatus::PickedUp,
			StatusChange::InTransit => OrderStatus::InTransit,
			StatusChange::OutForDelivery => OrderStatus::OutForDelivery,
			StatusChange::Delivered { .. } => OrderStatus::Delivered,
			StatusChange::RtoInitiated { .. } => OrderStatus::RtoInitiated,
			StatusChange::RtoInTransit { .. } => OrderStatus::RtoInTransit,
			StatusChange::RtoDelivered { .. } => OrderStatus::RtoDelivered,
			StatusChange::Cancelled => OrderStatus::Cancelled,
			StatusChange::OnHold => OrderStatus::OnHold,
		}
	}
}

/// Audit context accompanying a status change.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuditContext {
	/// Actor requesting the change; defaults to the system actor.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub user: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub reason: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub notes: Option<String>,
}

impl AuditContext {
	/// Actor to record, falling back to the system actor.
	pub fn actor(&self) -> &str {
		self.user.as_deref().unwrap_or(SYSTEM_ACTOR)
	}
}

/// Durations derived from an order's status history.
///
/// A milestone missing from the history leaves the corresponding field
/// `None`; callers must treat "undefined" and "zero" as distinct.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct OrderMetrics {
	/// Hours between order creation and carrier pickup.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub processing_hours: Option<i64>,
	/// Days between pickup and delivery.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub transit_days: Option<i64>,
	/// Days between creation and delivery.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub total_days: Option<i64>,
	/// Number of recorded transitions.
	pub transition_count: usize,
}
