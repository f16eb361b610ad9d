//! Bulk transition orchestrator.
//!
//! Applies one status change independently to each order in a batch. Items
//! never affect each other: a failed order is reported with its diagnostics
//! and left untouched, and already-succeeded items are never rolled back.

use crate::engine::{LifecycleEngine, LifecycleError};
use dispatch_types::{
	AuditContext, DispatchEvent, LifecycleEvent, Order, OrderStatus, StatusChange,
};
use serde::{Deserialize, Serialize};

/// Diagnostics for one order that could not be transitioned.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulkFailure {
	pub order_id: String,
	/// Human-readable error message.
	pub error: String,
	/// Destinations that were permitted from the order's status.
	pub valid_options: Vec<OrderStatus>,
}

/// Outcome of a bulk transition.
///
/// `successful.len() + failed.len()` always equals `total_attempted`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulkResult {
	/// Updated orders, in input order.
	pub successful: Vec<Order>,
	/// Failures, in input order.
	pub failed: Vec<BulkFailure>,
	pub total_attempted: usize,
}

impl LifecycleEngine {
	/// Applies `change` to every order in the batch.
	///
	/// Each order either transitions fully or is reported as failed with its
	/// original state untouched; processing order does not affect outcomes.
	pub fn bulk_transition(
		&self,
		orders: &[Order],
		change: &StatusChange,
		audit: &AuditContext,
	) -> BulkResult {
		let mut result = BulkResult {
			successful: Vec::new(),
			failed: Vec::new(),
			total_attempted: orders.len(),
		};

		for order in orders {
			match self.transition(order, change, audit) {
				Ok(updated) => result.successful.push(updated),
				Err(err) => {
					let LifecycleError::InvalidTransition { valid_options, .. } = &err;
					result.failed.push(BulkFailure {
						order_id: order.id.clone(),
						error: err.to_string(),
						valid_options: valid_options.clone(),
					});
				}
			}
		}

		tracing::info!(
			to = %change.status(),
			total = result.total_attempted,
			succeeded = result.successful.len(),
			failed = result.failed.len(),
			"bulk transition finished"
		);

		self.event_bus()
			.publish(DispatchEvent::Lifecycle(LifecycleEvent::BulkCompleted {
				to: change.status(),
				total_attempted: result.total_attempted,
				succeeded: result.successful.len(),
				failed: result.failed.len(),
			}));

		result
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use dispatch_types::EventBus;

	fn engine() -> LifecycleEngine {
		LifecycleEngine::new(EventBus::new())
	}

	fn pending_order(id: &str) -> Order {
		Order::new(id)
	}

	fn delivered_order(id: &str) -> Order {
		let mut order = Order::new(id);
		order.status = OrderStatus::Delivered;
		order
	}

	#[test]
	fn counts_always_reconcile() {
		let engine = engine();
		let orders = vec![
			pending_order("B-1"),
			delivered_order("B-2"),
			pending_order("B-3"),
			delivered_order("B-4"),
		];

		let result = engine.bulk_transition(
			&orders,
			&StatusChange::Cancelled,
			&AuditContext::default(),
		);

		assert_eq!(result.total_attempted, 4);
		assert_eq!(result.successful.len() + result.failed.len(), 4);
		assert_eq!(result.successful.len(), 2);
		assert_eq!(result.failed.len(), 2);
	}

	#[test]
	fn failures_carry_diagnostics_and_leave_input_alone() {
		let engine = engine();
		let orders = vec![delivered_order("B-10")];
		let before = orders[0].clone();

		let result = engine.bulk_transition(
			&orders,
			&StatusChange::Pending,
			&AuditContext::default(),
		);

		assert!(result.successful.is_empty());
		let failure = &result.failed[0];
		assert_eq!(failure.order_id, "B-10");
		assert!(failure.error.contains("Invalid transition"));
		assert!(failure.valid_options.is_empty());

		assert_eq!(orders[0].status, before.status);
		assert_eq!(orders[0].status_history, before.status_history);
	}

	#[test]
	fn one_failure_never_aborts_the_batch() {
		let engine = engine();
		let orders = vec![
			delivered_order("B-20"),
			pending_order("B-21"),
			pending_order("B-22"),
		];

		let result = engine.bulk_transition(
			&orders,
			&StatusChange::OnHold,
			&AuditContext::default(),
		);

		// The leading failure does not stop the rest of the batch.
		assert_eq!(result.failed.len(), 1);
		assert_eq!(result.successful.len(), 2);
		assert!(result
			.successful
			.iter()
			.all(|o| o.status == OrderStatus::OnHold));
	}

	#[test]
	fn empty_batch_is_a_noop() {
		let engine = engine();
		let result =
			engine.bulk_transition(&[], &StatusChange::Cancelled, &AuditContext::default());
		assert_eq!(result.total_attempted, 0);
		assert!(result.successful.is_empty());
		assert!(result.failed.is_empty());
	}
}
