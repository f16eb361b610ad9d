//! Order lifecycle engine.
//!
//! Validates a requested status change against the transition table and
//! applies it to a copy of the order: the transition record is appended to
//! the history, the status and timestamps are updated, and the change's
//! typed payload is copied onto the order. The input order is never touched,
//! so a failed transition leaves the caller's state exactly as it was.
//! Persistence is the caller's responsibility; the engine only publishes a
//! fire-and-forget event on success.

use crate::table::{is_valid_transition, valid_next_statuses};
use chrono::{DateTime, Utc};
use dispatch_types::{
	AuditContext, DispatchEvent, EventBus, LifecycleEvent, Order, OrderStatus, StatusChange,
	Transition,
};
use thiserror::Error;

/// Errors that can occur while applying a status change.
#[derive(Debug, Clone, Error)]
pub enum LifecycleError {
	/// The requested edge is not in the transition table. Carries the
	/// permitted destinations so the caller can present choices.
	#[error("Invalid transition from {from} to {to}")]
	InvalidTransition {
		from: OrderStatus,
		to: OrderStatus,
		valid_options: Vec<OrderStatus>,
	},
}

impl LifecycleError {
	/// Permitted destinations at the point of failure.
	pub fn valid_options(&self) -> &[OrderStatus] {
		match self {
			LifecycleError::InvalidTransition { valid_options, .. } => valid_options,
		}
	}
}

/// Applies validated status changes to orders.
#[derive(Clone)]
pub struct LifecycleEngine {
	event_bus: EventBus,
}

impl LifecycleEngine {
	pub fn new(event_bus: EventBus) -> Self {
		Self { event_bus }
	}

	pub(crate) fn event_bus(&self) -> &EventBus {
		&self.event_bus
	}

	/// Validates and applies a status change, returning the updated order.
	///
	/// On failure the error carries the valid destination set and the input
	/// order is untouched.
	pub fn transition(
		&self,
		order: &Order,
		change: &StatusChange,
		audit: &AuditContext,
	) -> Result<Order, LifecycleError> {
		self.transition_at(order, change, audit, Utc::now())
	}

	/// Applies a status change with an explicit timestamp.
	///
	/// The timestamp is clamped so it never precedes the last history entry,
	/// keeping each order's history non-decreasing even when the wall clock
	/// steps backwards.
	pub fn transition_at(
		&self,
		order: &Order,
		change: &StatusChange,
		audit: &AuditContext,
		now: DateTime<Utc>,
	) -> Result<Order, LifecycleError> {
		let target = change.status();

		if !is_valid_transition(order.status, target) {
			return Err(LifecycleError::InvalidTransition {
				from: order.status,
				to: target,
				valid_options: valid_next_statuses(order.status),
			});
		}

		let timestamp = order
			.status_history
			.last()
			.map(|last| last.timestamp.max(now))
			.unwrap_or(now);

		let record = Transition {
			from: Some(order.status),
			to: target,
			timestamp,
			user: audit.actor().to_string(),
			reason: audit.reason.clone().unwrap_or_default(),
			notes: audit.notes.clone().unwrap_or_default(),
		};

		let mut updated = order.clone();
		updated.status_history.push(record.clone());
		updated.status = target;
		updated.updated_at = timestamp;
		apply_payload(&mut updated, change);

		tracing::debug!(
			order_id = %updated.id,
			from = %record.from.map(|s| s.as_str()).unwrap_or("-"),
			to = %target,
			"applied status change"
		);

		self.event_bus
			.publish(DispatchEvent::Lifecycle(LifecycleEvent::TransitionApplied {
				order_id: updated.id.clone(),
				from: record.from,
				to: target,
				user: record.user.clone(),
				reason: record.reason.clone(),
				timestamp,
			}));

		Ok(updated)
	}
}

/// Copies a change's payload onto the order.
///
/// Only the variant being applied can touch its fields, so a carrier set by
/// an earlier assignment is never overwritten by an unrelated change.
fn apply_payload(order: &mut Order, change: &StatusChange) {
	match change {
		StatusChange::CarrierAssigned { carrier } => {
			order.carrier = Some(carrier.clone());
		}
		StatusChange::LabelGenerated { awb } => {
			order.awb = Some(awb.clone());
		}
		StatusChange::Delivered { delivery_date } => {
			if let Some(date) = delivery_date {
				order.delivery_date = Some(*date);
			}
		}
		StatusChange::RtoInitiated { reason }
		| StatusChange::RtoInTransit { reason }
		| StatusChange::RtoDelivered { reason } => {
			if let Some(reason) = reason {
				order.rto_reason = Some(reason.clone());
			}
		}
		_ => {}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use chrono::Duration;

	fn engine() -> LifecycleEngine {
		LifecycleEngine::new(EventBus::new())
	}

	fn audit(user: &str) -> AuditContext {
		AuditContext {
			user: Some(user.to_string()),
			reason: Some("test".to_string()),
			notes: None,
		}
	}

	#[test]
	fn happy_path_walks_to_delivered() {
		let engine = engine();
		let audit = AuditContext::default();
		let changes = [
			StatusChange::MtpApplied,
			StatusChange::CarrierAssigned {
				carrier: "delhivery".to_string(),
			},
			StatusChange::LabelGenerated {
				awb: "AWB12345".to_string(),
			},
			StatusChange::PickedUp,
			StatusChange::InTransit,
			StatusChange::OutForDelivery,
			StatusChange::Delivered {
				delivery_date: None,
			},
		];

		let mut order = Order::new("ORD-100");
		for change in &changes {
			order = engine.transition(&order, change, &audit).unwrap();
		}

		assert_eq!(order.status, OrderStatus::Delivered);
		// creation record + 7 transitions
		assert_eq!(order.status_history.len(), 8);
		assert_eq!(order.carrier.as_deref(), Some("delhivery"));
		assert_eq!(order.awb.as_deref(), Some("AWB12345"));
		// Invariant: status equals the last record's destination
		assert_eq!(order.status_history.last().unwrap().to, order.status);
	}

	#[test]
	fn walking_listed_destinations_never_fails() {
		let engine = engine();
		let audit = AuditContext::default();

		// From Pending, follow the first listed destination until a terminal
		// status or a revisit; every hop must validate.
		let mut order = Order::new("ORD-WALK");
		let mut seen = vec![order.status];
		loop {
			let options = valid_next_statuses(order.status);
			let Some(next) = options.into_iter().find(|s| !seen.contains(s)) else {
				break;
			};
			let change = change_for(next);
			order = engine
				.transition(&order, &change, &audit)
				.unwrap_or_else(|e| panic!("listed edge rejected: {}", e));
			seen.push(next);
		}
	}

	fn change_for(status: OrderStatus) -> StatusChange {
		match status {
			OrderStatus::Pending => StatusChange::Pending,
			OrderStatus::MtpApplied => StatusChange::MtpApplied,
			OrderStatus::QaPassed => StatusChange::QaPassed,
			OrderStatus::CarrierAssigned => StatusChange::CarrierAssigned {
				carrier: "delhivery".to_string(),
			},
			OrderStatus::LabelGenerated => StatusChange::LabelGenerated {
				awb: "AWB-1".to_string(),
			},
			OrderStatus::PickedUp => StatusChange::PickedUp,
			OrderStatus::InTransit => StatusChange::InTransit,
			OrderStatus::OutForDelivery => StatusChange::OutForDelivery,
			OrderStatus::Delivered => StatusChange::Delivered {
				delivery_date: None,
			},
			OrderStatus::RtoInitiated => StatusChange::RtoInitiated { reason: None },
			OrderStatus::RtoInTransit => StatusChange::RtoInTransit { reason: None },
			OrderStatus::RtoDelivered => StatusChange::RtoDelivered { reason: None },
			OrderStatus::Cancelled => StatusChange::Cancelled,
			OrderStatus::OnHold => StatusChange::OnHold,
		}
	}

	#[test]
	fn invalid_transition_reports_options_and_keeps_input() {
		let engine = engine();
		let order = Order::new("ORD-101");
		let before = order.clone();

		let err = engine
			.transition(
				&order,
				&StatusChange::Delivered {
					delivery_date: None,
				},
				&AuditContext::default(),
			)
			.unwrap_err();

		let LifecycleError::InvalidTransition {
			from,
			to,
			valid_options,
		} = err;
		assert_eq!(from, OrderStatus::Pending);
		assert_eq!(to, OrderStatus::Delivered);
		assert!(valid_options.contains(&OrderStatus::MtpApplied));
		assert!(valid_options.contains(&OrderStatus::Cancelled));

		// Failure never mutates the caller's order
		assert_eq!(order.status, before.status);
		assert_eq!(order.status_history, before.status_history);
	}

	#[test]
	fn delivered_is_terminal_with_empty_options() {
		let engine = engine();
		let mut order = Order::new("ORD-102");
		order.status = OrderStatus::Delivered;

		for change in [
			StatusChange::Pending,
			StatusChange::RtoInitiated { reason: None },
			StatusChange::Cancelled,
		] {
			let err = engine
				.transition(&order, &change, &AuditContext::default())
				.unwrap_err();
			assert!(err.valid_options().is_empty());
		}
	}

	#[test]
	fn payload_only_lands_on_matching_transition() {
		let engine = engine();
		let audit = AuditContext::default();

		let order = Order::new("ORD-103");
		let order = engine
			.transition(
				&order,
				&StatusChange::CarrierAssigned {
					carrier: "bluedart".to_string(),
				},
				&audit,
			)
			.unwrap();
		assert_eq!(order.carrier.as_deref(), Some("bluedart"));
		assert_eq!(order.awb, None);

		// Un-assign back to Pending: the carrier field is not cleared, and no
		// unrelated field is touched.
		let order = engine
			.transition(&order, &StatusChange::Pending, &audit)
			.unwrap();
		assert_eq!(order.carrier.as_deref(), Some("bluedart"));
		assert_eq!(order.rto_reason, None);
	}

	#[test]
	fn rto_reason_is_recorded_on_rto_changes() {
		let engine = engine();
		let audit = AuditContext::default();

		let mut order = Order::new("ORD-104");
		order.status = OrderStatus::InTransit;

		let order = engine
			.transition(
				&order,
				&StatusChange::RtoInitiated {
					reason: Some("address unreachable".to_string()),
				},
				&audit,
			)
			.unwrap();
		assert_eq!(order.status, OrderStatus::RtoInitiated);
		assert_eq!(order.rto_reason.as_deref(), Some("address unreachable"));
	}

	#[test]
	fn audit_context_defaults_to_system_actor() {
		let engine = engine();
		let order = Order::new("ORD-105");

		let updated = engine
			.transition(&order, &StatusChange::OnHold, &AuditContext::default())
			.unwrap();
		assert_eq!(updated.status_history.last().unwrap().user, "system");

		let updated = engine
			.transition(&order, &StatusChange::OnHold, &audit("ops@example"))
			.unwrap();
		assert_eq!(updated.status_history.last().unwrap().user, "ops@example");
	}

	#[test]
	fn timestamps_never_decrease() {
		let engine = engine();
		let audit = AuditContext::default();
		let order = Order::new("ORD-106");
		let seeded = order.status_history[0].timestamp;

		// Clock stepping backwards is clamped to the last history entry.
		let past = seeded - Duration::hours(1);
		let updated = engine
			.transition_at(&order, &StatusChange::MtpApplied, &audit, past)
			.unwrap();
		assert_eq!(updated.status_history.last().unwrap().timestamp, seeded);

		let later = seeded + Duration::minutes(5);
		let updated = engine
			.transition_at(&updated, &StatusChange::QaPassed, &audit, later)
			.unwrap();
		assert_eq!(updated.status_history.last().unwrap().timestamp, later);
	}

	#[tokio::test]
	async fn successful_transition_publishes_event() {
		let bus = EventBus::new();
		let mut rx = bus.subscribe();
		let engine = LifecycleEngine::new(bus);

		let order = Order::new("ORD-107");
		engine
			.transition(&order, &StatusChange::MtpApplied, &audit("qa-bot"))
			.unwrap();

		match rx.recv().await.unwrap() {
			DispatchEvent::Lifecycle(LifecycleEvent::TransitionApplied {
				order_id,
				from,
				to,
				user,
				..
			}) => {
				assert_eq!(order_id, "ORD-107");
				assert_eq!(from, Some(OrderStatus::Pending));
				assert_eq!(to, OrderStatus::MtpApplied);
				assert_eq!(user, "qa-bot");
			}
			other => panic!("unexpected event: {:?}", other),
		}
	}
}
