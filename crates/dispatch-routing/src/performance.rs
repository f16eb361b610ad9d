//! Carrier performance store.
//!
//! Maintains the rolling per-(carrier, zone) delivery statistics behind the
//! reliability score. Each zone's history lives under one storage key
//! (`carrier-history:<zone>`) as a map of carrier id to record. Updates are
//! read-modify-write cycles, so they are serialized per zone through an
//! async mutex; the running-average and degradation updates are not
//! commutative and a lost update would silently skew every future routing
//! decision on that lane.

use dispatch_storage::{StorageError, StorageService};
use dispatch_types::{CarrierPerformanceRecord, ShipmentOutcome, StorageKey, Zone};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::timeout;

/// Default deadline for a single storage call.
pub const DEFAULT_OP_TIMEOUT: Duration = Duration::from_secs(5);
/// Default retention for zone histories.
pub const DEFAULT_HISTORY_TTL: Duration = Duration::from_secs(90 * 24 * 60 * 60);

/// Durable rolling statistics per carrier per zone.
pub struct PerformanceStore {
	storage: Arc<StorageService>,
	/// Per-zone update locks; lazily created on first use.
	zone_locks: Mutex<HashMap<Zone, Arc<Mutex<()>>>>,
	op_timeout: Duration,
	history_ttl: Duration,
}

impl PerformanceStore {
	/// Creates a store with the default deadline and retention.
	pub fn new(storage: Arc<StorageService>) -> Self {
		Self::with_settings(storage, DEFAULT_OP_TIMEOUT, DEFAULT_HISTORY_TTL)
	}

	/// Creates a store with explicit storage deadline and history retention.
	pub fn with_settings(
		storage: Arc<StorageService>,
		op_timeout: Duration,
		history_ttl: Duration,
	) -> Self {
		Self {
			storage,
			zone_locks: Mutex::new(HashMap::new()),
			op_timeout,
			history_ttl,
		}
	}

	async fn zone_lock(&self, zone: Zone) -> Arc<Mutex<()>> {
		let mut locks = self.zone_locks.lock().await;
		locks.entry(zone).or_default().clone()
	}

	/// Loads the performance history for a zone.
	///
	/// Degrades gracefully: a missing key yields an empty history, and an
	/// unreachable or timed-out backend yields an empty history after a
	/// warning, so routing stays available with the cold-start reliability
	/// prior while telemetry is down.
	pub async fn zone_history(&self, zone: Zone) -> HashMap<String, CarrierPerformanceRecord> {
		let read = self.storage.retrieve::<HashMap<String, CarrierPerformanceRecord>>(
			StorageKey::CarrierHistory.as_str(),
			zone.as_str(),
		);

		match timeout(self.op_timeout, read).await {
			Ok(Ok(history)) => history,
			Ok(Err(StorageError::NotFound)) => HashMap::new(),
			Ok(Err(e)) => {
				tracing::warn!(zone = %zone, error = %e, "performance history unavailable, using empty history");
				HashMap::new()
			}
			Err(_) => {
				tracing::warn!(zone = %zone, "performance history read timed out, using empty history");
				HashMap::new()
			}
		}
	}

	/// Folds one shipment outcome into the (carrier, zone) record and
	/// persists the updated zone history.
	///
	/// The read-modify-write cycle holds the zone's update lock, so
	/// concurrent outcomes for the same zone can never lose an update.
	/// Returns the updated record.
	pub async fn record(
		&self,
		carrier_id: &str,
		outcome: &ShipmentOutcome,
	) -> Result<CarrierPerformanceRecord, StorageError> {
		let lock = self.zone_lock(outcome.zone).await;
		let _guard = lock.lock().await;

		let read = self.storage.retrieve::<HashMap<String, CarrierPerformanceRecord>>(
			StorageKey::CarrierHistory.as_str(),
			outcome.zone.as_str(),
		);
		let mut history = match timeout(self.op_timeout, read).await {
			Ok(Ok(history)) => history,
			Ok(Err(StorageError::NotFound)) => HashMap::new(),
			Ok(Err(e)) => return Err(e),
			Err(_) => {
				return Err(StorageError::Backend(
					"performance history read timed out".to_string(),
				))
			}
		};

		let record = history.entry(carrier_id.to_string()).or_default();
		record.apply(outcome);
		let updated = record.clone();

		let write = self.storage.store_with_ttl(
			StorageKey::CarrierHistory.as_str(),
			outcome.zone.as_str(),
			&history,
			Some(self.history_ttl),
		);
		match timeout(self.op_timeout, write).await {
			Ok(Ok(())) => {}
			Ok(Err(e)) => return Err(e),
			Err(_) => {
				return Err(StorageError::Backend(
					"performance history write timed out".to_string(),
				))
			}
		}

		tracing::debug!(
			carrier = carrier_id,
			zone = %outcome.zone,
			total = updated.total_shipments,
			degraded = updated.is_degraded,
			"recorded shipment outcome"
		);

		Ok(updated)
	}

	/// Drops the stored history for a zone.
	///
	/// Operational reset: the next routing request sees every carrier at the
	/// cold-start prior.
	pub async fn reset_zone(&self, zone: Zone) -> Result<(), StorageError> {
		let lock = self.zone_lock(zone).await;
		let _guard = lock.lock().await;
		self.storage
			.remove(StorageKey::CarrierHistory.as_str(), zone.as_str())
			.await
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use async_trait::async_trait;
	use dispatch_storage::implementations::memory::MemoryStorage;
	use dispatch_storage::StorageInterface;
	use dispatch_types::ConfigSchema;

	fn store() -> PerformanceStore {
		PerformanceStore::new(Arc::new(StorageService::new(Box::new(MemoryStorage::new()))))
	}

	fn outcome(zone: Zone, success: bool) -> ShipmentOutcome {
		ShipmentOutcome {
			zone,
			success,
			delivery_days: 2.0,
			cost: 50.0,
		}
	}

	#[tokio::test]
	async fn first_outcome_creates_record() {
		let store = store();

		let record = store
			.record("delhivery", &outcome(Zone::Metro, true))
			.await
			.unwrap();
		assert_eq!(record.total_shipments, 1);
		assert_eq!(record.successful, 1);
		assert!((record.avg_delivery_days - 2.0).abs() < 1e-9);

		let history = store.zone_history(Zone::Metro).await;
		assert_eq!(history.len(), 1);
		assert_eq!(history["delhivery"], record);
	}

	#[tokio::test]
	async fn zones_are_isolated() {
		let store = store();
		store
			.record("delhivery", &outcome(Zone::Metro, true))
			.await
			.unwrap();
		store
			.record("delhivery", &outcome(Zone::Tier3, false))
			.await
			.unwrap();

		let metro = store.zone_history(Zone::Metro).await;
		let tier3 = store.zone_history(Zone::Tier3).await;
		assert_eq!(metro["delhivery"].successful, 1);
		assert_eq!(tier3["delhivery"].failed, 1);
	}

	#[tokio::test]
	async fn concurrent_records_do_not_lose_updates() {
		let store = Arc::new(store());

		let mut handles = Vec::new();
		for i in 0..20 {
			let store = Arc::clone(&store);
			handles.push(tokio::spawn(async move {
				store
					.record("xpressbees", &outcome(Zone::Tier1, i % 2 == 0))
					.await
					.unwrap();
			}));
		}
		for handle in handles {
			handle.await.unwrap();
		}

		let history = store.zone_history(Zone::Tier1).await;
		let record = &history["xpressbees"];
		assert_eq!(record.total_shipments, 20);
		assert_eq!(record.successful + record.failed, 20);
	}

	#[tokio::test]
	async fn reset_zone_clears_history() {
		let store = store();
		store
			.record("fedex", &outcome(Zone::Metro, true))
			.await
			.unwrap();
		store.reset_zone(Zone::Metro).await.unwrap();
		assert!(store.zone_history(Zone::Metro).await.is_empty());
	}

	/// Backend that fails every operation, simulating an outage.
	struct UnavailableStorage;

	#[async_trait]
	impl StorageInterface for UnavailableStorage {
		async fn get_bytes(&self, _key: &str) -> Result<Vec<u8>, StorageError> {
			Err(StorageError::Backend("connection refused".to_string()))
		}

		async fn set_bytes(
			&self,
			_key: &str,
			_value: Vec<u8>,
			_ttl: Option<Duration>,
		) -> Result<(), StorageError> {
			Err(StorageError::Backend("connection refused".to_string()))
		}

		async fn delete(&self, _key: &str) -> Result<(), StorageError> {
			Err(StorageError::Backend("connection refused".to_string()))
		}

		async fn exists(&self, _key: &str) -> Result<bool, StorageError> {
			Err(StorageError::Backend("connection refused".to_string()))
		}

		fn config_schema(&self) -> Box<dyn ConfigSchema> {
			unimplemented!("not used in tests")
		}
	}

	#[tokio::test]
	async fn unavailable_backend_degrades_reads_and_fails_writes() {
		let store = PerformanceStore::new(Arc::new(StorageService::new(Box::new(
			UnavailableStorage,
		))));

		// Reads degrade to an empty history so routing stays available.
		assert!(store.zone_history(Zone::Metro).await.is_empty());

		// Writes surface the failure.
		let result = store.record("delhivery", &outcome(Zone::Metro, true)).await;
		assert!(matches!(result, Err(StorageError::Backend(_))));
	}
}
