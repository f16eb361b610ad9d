//! Main entry point for the dispatch service.
//!
//! This binary wires the order lifecycle engine and the carrier routing
//! engine to a configured storage backend and exposes them over a stateless
//! HTTP API: orders travel in request bodies and only carrier telemetry is
//! persisted by this service.

use clap::Parser;
use dispatch_config::{Config, StorageConfig};
use dispatch_routing::{CarrierRegistry, PerformanceStore, RoutingEngine};
use dispatch_storage::{StorageFactory, StorageInterface, StorageService};
use dispatch_types::EventBus;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

mod apis;
mod server;

use dispatch_lifecycle::LifecycleEngine;
use server::AppState;

/// Command-line arguments for the dispatch service.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
	/// Path to configuration file
	#[arg(short, long, default_value = "config.toml")]
	config: PathBuf,

	/// Log level (trace, debug, info, warn, error)
	#[arg(short, long, default_value = "info")]
	log_level: String,
}

/// Main entry point for the dispatch service.
///
/// This function:
/// 1. Parses command-line arguments
/// 2. Initializes logging infrastructure
/// 3. Loads configuration from file
/// 4. Builds the engines over the configured storage backend
/// 5. Serves the HTTP API until interrupted
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
	let args = Args::parse();

	// Initialize tracing with env filter
	use tracing_subscriber::{fmt, EnvFilter};

	let default_directive = args.log_level.to_string();
	let env_filter =
		EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));

	fmt()
		.with_env_filter(env_filter)
		.with_thread_ids(true)
		.with_target(true)
		.init();

	tracing::info!("Started dispatch");

	let config = Config::from_file(args.config.to_str().ok_or("Invalid config path")?).await?;
	tracing::info!("Loaded configuration [{}]", config.service.id);

	let state = build_state(config.clone())?;

	// Forward lifecycle and routing events to the log until real audit and
	// notification collaborators are attached.
	spawn_event_logger(state.event_bus.clone());

	// Periodically drop expired telemetry from storage.
	spawn_storage_cleanup(
		Arc::clone(&state.storage),
		config.storage.cleanup_interval_seconds,
	);

	let api_enabled = config.api.as_ref().is_some_and(|api| api.enabled);
	if api_enabled {
		let api_config = config.api.clone().unwrap();
		server::start_server(api_config, state).await?;
	} else {
		tracing::warn!("API server disabled; running storage maintenance only");
		tokio::signal::ctrl_c().await?;
	}

	tracing::info!("Stopped dispatch");
	Ok(())
}

/// Builds the shared application state from configuration.
fn build_state(config: Config) -> Result<AppState, Box<dyn std::error::Error>> {
	let backend = create_storage_backend(&config.storage)?;
	let storage = Arc::new(StorageService::new(backend));

	let registry = if config.carriers.is_empty() {
		CarrierRegistry::with_default_fleet()
	} else {
		CarrierRegistry::from_profiles(config.carriers.clone())
	};
	let registry = Arc::new(registry);
	tracing::info!("Carrier registry loaded with {} carriers", registry.len());

	let performance = Arc::new(PerformanceStore::with_settings(
		Arc::clone(&storage),
		Duration::from_millis(config.routing.storage_timeout_ms),
		Duration::from_secs(config.routing.performance_ttl_days * 24 * 60 * 60),
	));

	let event_bus = EventBus::new();
	let lifecycle = Arc::new(LifecycleEngine::new(event_bus.clone()));
	let routing = Arc::new(RoutingEngine::new(
		Arc::clone(&registry),
		Arc::clone(&performance),
	));

	Ok(AppState {
		config,
		storage,
		registry,
		performance,
		lifecycle,
		routing,
		event_bus,
	})
}

/// Creates the configured storage backend and validates its configuration.
fn create_storage_backend(
	config: &StorageConfig,
) -> Result<Box<dyn StorageInterface>, Box<dyn std::error::Error>> {
	let factories: HashMap<&str, StorageFactory> =
		dispatch_storage::get_all_implementations().into_iter().collect();

	let factory = factories
		.get(config.primary.as_str())
		.ok_or_else(|| format!("Unknown storage backend '{}'", config.primary))?;

	let backend_config = config
		.implementations
		.get(&config.primary)
		.cloned()
		.unwrap_or(toml::Value::Table(toml::map::Map::new()));

	let backend = factory(&backend_config)?;
	backend
		.config_schema()
		.validate(&backend_config)
		.map_err(|e| format!("Invalid '{}' storage config: {}", config.primary, e))?;

	tracing::info!("Using '{}' storage backend", config.primary);
	Ok(backend)
}

/// Subscribes to the event bus and logs every event.
fn spawn_event_logger(event_bus: EventBus) {
	let mut rx = event_bus.subscribe();
	tokio::spawn(async move {
		loop {
			match rx.recv().await {
				Ok(event) => tracing::info!(target: "dispatch::events", ?event, "event"),
				Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
					tracing::warn!(skipped, "event logger lagged behind");
				}
				Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
			}
		}
	});
}

/// Runs expired-entry cleanup on the configured interval.
fn spawn_storage_cleanup(storage: Arc<StorageService>, interval_seconds: u64) {
	tokio::spawn(async move {
		let mut interval = tokio::time::interval(Duration::from_secs(interval_seconds));
		loop {
			interval.tick().await;
			match storage.cleanup_expired().await {
				Ok(0) => {}
				Ok(removed) => tracing::info!(removed, "removed expired storage entries"),
				Err(e) => tracing::warn!(error = %e, "storage cleanup failed"),
			}
		}
	});
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::str::FromStr;

	fn test_config() -> Config {
		Config::from_str(
			r#"
[service]
id = "dispatch-test"

[storage]
primary = "memory"
cleanup_interval_seconds = 3600
[storage.implementations.memory]
"#,
		)
		.unwrap()
	}

	#[test]
	fn test_args_default_values() {
		let args = Args {
			config: PathBuf::from("config.toml"),
			log_level: "info".to_string(),
		};

		assert_eq!(args.config, PathBuf::from("config.toml"));
		assert_eq!(args.log_level, "info");
	}

	#[test]
	fn build_state_with_minimal_config() {
		let state = build_state(test_config()).unwrap();
		assert_eq!(state.config.service.id, "dispatch-test");
		// No carriers configured: the built-in fleet is used.
		assert_eq!(state.registry.len(), 4);
	}

	#[test]
	fn unknown_storage_backend_is_rejected() {
		let mut config = test_config();
		config.storage.primary = "redis".to_string();
		let err = build_state(config).err().expect("expected build failure");
		assert!(err.to_string().contains("Unknown storage backend"));
	}

	#[test]
	fn configured_carriers_replace_default_fleet() {
		let config = Config::from_str(
			r#"
[service]
id = "dispatch-test"

[storage]
primary = "memory"
cleanup_interval_seconds = 3600
[storage.implementations.memory]

[[carriers]]
id = "speedy"
name = "Speedy"
weight_limit = 20.0
cod_enabled = true
base_rate = 40.0
zones = ["metro"]
[carriers.sla_days]
metro = 1
"#,
		)
		.unwrap();

		let state = build_state(config).unwrap();
		assert_eq!(state.registry.len(), 1);
		assert!(state.registry.get("speedy").is_some());
	}
}
