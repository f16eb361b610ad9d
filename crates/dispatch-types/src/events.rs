//! Event types for collaborator notification.
//!
//! The engines emit fire-and-forget events whenever something observable
//! happens: a transition is applied, a batch completes, a carrier is chosen,
//! a shipment outcome is folded into the performance history. Audit and
//! notification collaborators subscribe to the bus; the engines never wait
//! on them.

use crate::carrier::Zone;
use crate::order::OrderStatus;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Main event type encompassing all dispatch events.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum DispatchEvent {
	/// Events from the order lifecycle engine.
	Lifecycle(LifecycleEvent),
	/// Events from the carrier routing engine.
	Routing(RoutingEvent),
}

/// Events related to order status changes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum LifecycleEvent {
	/// A transition was validated and applied.
	TransitionApplied {
		order_id: String,
		from: Option<OrderStatus>,
		to: OrderStatus,
		user: String,
		reason: String,
		timestamp: DateTime<Utc>,
	},
	/// A bulk transition finished.
	BulkCompleted {
		to: OrderStatus,
		total_attempted: usize,
		succeeded: usize,
		failed: usize,
	},
}

/// Events related to carrier routing and telemetry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum RoutingEvent {
	/// A routing request selected a carrier.
	CarrierSelected {
		carrier_id: String,
		zone: Zone,
		cost: f64,
		score: f64,
	},
	/// A shipment outcome was folded into the performance history.
	PerformanceRecorded {
		carrier_id: String,
		zone: Zone,
		total_shipments: u64,
		is_degraded: bool,
	},
}

/// Default capacity of the event channel.
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Broadcast bus carrying dispatch events to any number of subscribers.
///
/// Publishing is fire-and-forget: a bus with no subscribers silently drops
/// events, and a slow subscriber lags rather than blocking the publisher.
#[derive(Debug, Clone)]
pub struct EventBus {
	sender: broadcast::Sender<DispatchEvent>,
}

impl EventBus {
	/// Creates a new event bus with the default capacity.
	pub fn new() -> Self {
		let (sender, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
		Self { sender }
	}

	/// Publishes an event to all current subscribers.
	///
	/// Returns the number of subscribers the event reached; zero is not an
	/// error.
	pub fn publish(&self, event: DispatchEvent) -> usize {
		self.sender.send(event).unwrap_or(0)
	}

	/// Creates a new subscription to the bus.
	pub fn subscribe(&self) -> broadcast::Receiver<DispatchEvent> {
		self.sender.subscribe()
	}
}

impl Default for EventBus {
	fn default() -> Self {
		Self::new()
	}
}
