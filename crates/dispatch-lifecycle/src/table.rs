//! Static order status transition table.
//!
//! The permitted status graph is fixed at compile time. Each source status
//! maps to an explicit set of destinations; everything not listed is
//! rejected. Delivered and Cancelled are terminal, and RTO-Delivered keeps
//! a single edge back to Pending for the re-ship cycle.

use dispatch_types::OrderStatus;
use once_cell::sync::Lazy;
use std::collections::{HashMap, HashSet};

/// Static transition table - each status maps to its allowed next statuses.
static TRANSITIONS: Lazy<HashMap<OrderStatus, HashSet<OrderStatus>>> = Lazy::new(|| {
	use OrderStatus::*;

	let mut m = HashMap::new();
	m.insert(
		Pending,
		HashSet::from([MtpApplied, QaPassed, CarrierAssigned, Cancelled, OnHold]),
	);
	m.insert(
		MtpApplied,
		HashSet::from([QaPassed, CarrierAssigned, Cancelled, OnHold]),
	);
	m.insert(QaPassed, HashSet::from([CarrierAssigned, Cancelled]));
	// Pending edge is the un-assign path
	m.insert(
		CarrierAssigned,
		HashSet::from([LabelGenerated, Pending, Cancelled]),
	);
	// CarrierAssigned edge is the label re-generate path
	m.insert(
		LabelGenerated,
		HashSet::from([PickedUp, CarrierAssigned, Cancelled]),
	);
	m.insert(PickedUp, HashSet::from([InTransit, RtoInitiated]));
	m.insert(InTransit, HashSet::from([OutForDelivery, RtoInitiated]));
	m.insert(OutForDelivery, HashSet::from([Delivered, RtoInitiated]));
	m.insert(Delivered, HashSet::new()); // terminal
	m.insert(RtoInitiated, HashSet::from([RtoInTransit]));
	m.insert(RtoInTransit, HashSet::from([RtoDelivered]));
	m.insert(RtoDelivered, HashSet::from([Pending])); // re-ship
	m.insert(Cancelled, HashSet::new()); // terminal
	m.insert(OnHold, HashSet::from([Pending, Cancelled]));
	m
});

/// Checks whether the edge `current -> target` exists in the table.
pub fn is_valid_transition(current: OrderStatus, target: OrderStatus) -> bool {
	TRANSITIONS
		.get(&current)
		.is_some_and(|set| set.contains(&target))
}

/// Returns the permitted destinations for a status.
///
/// The result is in status declaration order so UI choice lists and error
/// diagnostics are deterministic.
pub fn valid_next_statuses(current: OrderStatus) -> Vec<OrderStatus> {
	let Some(allowed) = TRANSITIONS.get(&current) else {
		return Vec::new();
	};
	OrderStatus::all()
		.filter(|status| allowed.contains(status))
		.collect()
}
