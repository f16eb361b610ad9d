//! Lifecycle metrics derived from an order's status history.
//!
//! Milestones are the first transitions into Pending, Picked-Up, and
//! Delivered. A milestone missing from the history leaves its metric
//! undefined rather than zero; callers must keep the two cases distinct.

use dispatch_types::{Order, OrderMetrics, OrderStatus};

const SECS_PER_HOUR: f64 = 3_600.0;
const SECS_PER_DAY: f64 = 86_400.0;

/// Derives milestone durations from an order's status history.
pub fn calculate_metrics(order: &Order) -> OrderMetrics {
	let created_at = order.first_entered(OrderStatus::Pending);
	let picked_at = order.first_entered(OrderStatus::PickedUp);
	let delivered_at = order.first_entered(OrderStatus::Delivered);

	let mut metrics = OrderMetrics {
		transition_count: order.status_history.len(),
		..Default::default()
	};

	if let (Some(created), Some(picked)) = (created_at, picked_at) {
		let hours = (picked - created).num_seconds() as f64 / SECS_PER_HOUR;
		metrics.processing_hours = Some(hours.round() as i64);
	}

	if let (Some(picked), Some(delivered)) = (picked_at, delivered_at) {
		let days = (delivered - picked).num_seconds() as f64 / SECS_PER_DAY;
		metrics.transit_days = Some(days.round() as i64);
	}

	if let (Some(created), Some(delivered)) = (created_at, delivered_at) {
		let days = (delivered - created).num_seconds() as f64 / SECS_PER_DAY;
		metrics.total_days = Some(days.round() as i64);
	}

	metrics
}
