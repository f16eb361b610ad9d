//! Configuration module for the dispatch system.
//!
//! This module provides structures and utilities for managing dispatch
//! configuration. It supports loading configuration from TOML files and
//! provides validation to ensure all required configuration values are
//! properly set.
//!
//! ## Modular Configuration Support
//!
//! Configurations can be split into multiple files for better organization:
//! - Use `include = ["file1.toml", "file2.toml"]` to include other config files
//! - Each top-level section must be unique across all files (no duplicates allowed)

mod loader;

use dispatch_types::CarrierProfile;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

/// Errors that can occur during configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
	/// Error that occurs during file I/O operations.
	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),
	/// Error that occurs when parsing TOML configuration.
	#[error("Configuration error: {0}")]
	Parse(String),
	/// Error that occurs when configuration validation fails.
	#[error("Validation error: {0}")]
	Validation(String),
}

impl From<toml::de::Error> for ConfigError {
	fn from(err: toml::de::Error) -> Self {
		// Extract just the message without the huge input dump
		let message = err.message().to_string();
		ConfigError::Parse(message)
	}
}

/// Main configuration structure for the dispatch service.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
	/// Configuration specific to this dispatch instance.
	pub service: ServiceConfig,
	/// Configuration for the storage backend.
	pub storage: StorageConfig,
	/// Tunables for the routing engine's performance store.
	#[serde(default)]
	pub routing: RoutingConfig,
	/// Carrier registry entries; empty means the built-in fleet.
	#[serde(default)]
	pub carriers: Vec<CarrierProfile>,
	/// Configuration for the HTTP API server.
	pub api: Option<ApiConfig>,
}

/// Configuration specific to the dispatch instance.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServiceConfig {
	/// Unique identifier for this dispatch instance.
	pub id: String,
}

/// Configuration for the storage backend.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
	/// Which implementation to use as primary.
	pub primary: String,
	/// Map of storage implementation names to their configurations.
	pub implementations: HashMap<String, toml::Value>,
	/// Interval in seconds for cleaning up expired storage entries.
	pub cleanup_interval_seconds: u64,
}

/// Tunables for the carrier performance store.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RoutingConfig {
	/// Retention for per-zone carrier histories, in days.
	#[serde(default = "default_performance_ttl_days")]
	pub performance_ttl_days: u64,
	/// Deadline for a single performance-store storage call, in ms.
	#[serde(default = "default_storage_timeout_ms")]
	pub storage_timeout_ms: u64,
}

impl Default for RoutingConfig {
	fn default() -> Self {
		Self {
			performance_ttl_days: default_performance_ttl_days(),
			storage_timeout_ms: default_storage_timeout_ms(),
		}
	}
}

/// Returns the default carrier history retention in days.
fn default_performance_ttl_days() -> u64 {
	90
}

/// Returns the default performance-store storage deadline in ms.
fn default_storage_timeout_ms() -> u64 {
	5_000
}

/// Configuration for the HTTP API server.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiConfig {
	/// Whether the API server is enabled.
	#[serde(default)]
	pub enabled: bool,
	/// Host address to bind the server to.
	#[serde(default = "default_api_host")]
	pub host: String,
	/// Port to bind the server to.
	#[serde(default = "default_api_port")]
	pub port: u16,
	/// Request timeout in seconds.
	#[serde(default = "default_api_timeout")]
	pub timeout_seconds: u64,
}

/// Returns the default API host.
fn default_api_host() -> String {
	"127.0.0.1".to_string()
}

/// Returns the default API port.
fn default_api_port() -> u16 {
	3000
}

/// Returns the default API timeout in seconds.
fn default_api_timeout() -> u64 {
	30
}

/// Resolves environment variables in a string.
///
/// Replaces ${VAR_NAME} with the value of the environment variable VAR_NAME.
/// Supports default values with ${VAR_NAME:-default_value}.
///
/// Input strings are limited to 1MB to prevent ReDoS attacks.
pub(crate) fn resolve_env_vars(input: &str) -> Result<String, ConfigError> {
	const MAX_INPUT_SIZE: usize = 1024 * 1024; // 1MB
	if input.len() > MAX_INPUT_SIZE {
		return Err(ConfigError::Validation(format!(
			"Configuration file too large: {} bytes (max: {} bytes)",
			input.len(),
			MAX_INPUT_SIZE
		)));
	}

	let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]{0,127})(?::-([^}]{0,256}))?\}")
		.map_err(|e| ConfigError::Parse(format!("Regex error: {}", e)))?;

	let mut result = input.to_string();
	let mut replacements = Vec::new();

	for cap in re.captures_iter(input) {
		let full_match = cap.get(0).unwrap();
		let var_name = cap.get(1).unwrap().as_str();
		let default_value = cap.get(2).map(|m| m.as_str());

		let value = match std::env::var(var_name) {
			Ok(v) => v,
			Err(_) => {
				if let Some(default) = default_value {
					default.to_string()
				} else {
					return Err(ConfigError::Validation(format!(
						"Environment variable '{}' not found",
						var_name
					)));
				}
			}
		};

		replacements.push((full_match.start(), full_match.end(), value));
	}

	// Apply replacements in reverse order to maintain positions
	for (start, end, value) in replacements.iter().rev() {
		result.replace_range(start..end, value);
	}

	Ok(result)
}

impl Config {
	/// Loads configuration from a file with environment variable resolution.
	///
	/// This method supports modular configuration through include directives:
	/// - `include = ["file1.toml", "file2.toml"]` - Include specific files
	///
	/// Each top-level section must be unique across all configuration files.
	pub async fn from_file(path: &str) -> Result<Self, ConfigError> {
		let path_buf = Path::new(path);
		let base_dir = path_buf.parent().unwrap_or_else(|| Path::new("."));

		let mut loader = loader::ConfigLoader::new(base_dir);
		let file_name = path_buf
			.file_name()
			.ok_or_else(|| ConfigError::Validation(format!("Invalid path: {}", path)))?;
		loader.load_config(file_name).await
	}

	/// Validates the configuration to ensure all required fields are
	/// properly set.
	fn validate(&self) -> Result<(), ConfigError> {
		if self.service.id.is_empty() {
			return Err(ConfigError::Validation("Service ID cannot be empty".into()));
		}

		// Validate storage config
		if self.storage.implementations.is_empty() {
			return Err(ConfigError::Validation(
				"At least one storage implementation must be configured".into(),
			));
		}
		if self.storage.primary.is_empty() {
			return Err(ConfigError::Validation(
				"Storage primary implementation cannot be empty".into(),
			));
		}
		if !self
			.storage
			.implementations
			.contains_key(&self.storage.primary)
		{
			return Err(ConfigError::Validation(format!(
				"Primary storage '{}' not found in implementations",
				self.storage.primary
			)));
		}
		if self.storage.cleanup_interval_seconds == 0 {
			return Err(ConfigError::Validation(
				"Storage cleanup_interval_seconds must be greater than 0".into(),
			));
		}
		if self.storage.cleanup_interval_seconds > 86400 {
			return Err(ConfigError::Validation(
				"Storage cleanup_interval_seconds cannot exceed 86400 (24 hours)".into(),
			));
		}

		// Validate routing tunables
		if self.routing.performance_ttl_days == 0 {
			return Err(ConfigError::Validation(
				"routing.performance_ttl_days must be greater than 0".into(),
			));
		}
		if self.routing.storage_timeout_ms == 0 {
			return Err(ConfigError::Validation(
				"routing.storage_timeout_ms must be greater than 0".into(),
			));
		}

		// Validate carrier registry entries
		let mut seen_ids = HashSet::new();
		for carrier in &self.carriers {
			if carrier.id.is_empty() {
				return Err(ConfigError::Validation("Carrier id cannot be empty".into()));
			}
			if !seen_ids.insert(carrier.id.as_str()) {
				return Err(ConfigError::Validation(format!(
					"Duplicate carrier id '{}'",
					carrier.id
				)));
			}
			if carrier.weight_limit <= 0.0 {
				return Err(ConfigError::Validation(format!(
					"Carrier '{}' must have a positive weight_limit",
					carrier.id
				)));
			}
			if carrier.base_rate < 0.0 {
				return Err(ConfigError::Validation(format!(
					"Carrier '{}' must have a non-negative base_rate",
					carrier.id
				)));
			}
			if carrier.zones.is_empty() {
				return Err(ConfigError::Validation(format!(
					"Carrier '{}' must serve at least one zone",
					carrier.id
				)));
			}
			for zone in &carrier.zones {
				match carrier.sla_days.get(zone) {
					Some(days) if *days >= 1 => {}
					Some(_) => {
						return Err(ConfigError::Validation(format!(
							"Carrier '{}' has a zero-day SLA for zone {}",
							carrier.id, zone
						)))
					}
					None => {
						return Err(ConfigError::Validation(format!(
							"Carrier '{}' serves zone {} without an SLA",
							carrier.id, zone
						)))
					}
				}
			}
		}

		Ok(())
	}
}

/// Implementation of FromStr trait for Config to enable parsing from string.
///
/// Environment variables are resolved and the configuration is automatically
/// validated after parsing.
impl FromStr for Config {
	type Err = ConfigError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let resolved = resolve_env_vars(s)?;
		let config: Config = toml::from_str(&resolved)?;
		config.validate()?;
		Ok(config)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	const BASE_CONFIG: &str = r#"
[service]
id = "dispatch-test"

[storage]
primary = "memory"
cleanup_interval_seconds = 3600
[storage.implementations.memory]
"#;

	#[test]
	fn test_env_var_resolution() {
		std::env::set_var("TEST_DISPATCH_HOST", "localhost");
		std::env::set_var("TEST_DISPATCH_PORT", "5432");

		let input = "host = \"${TEST_DISPATCH_HOST}:${TEST_DISPATCH_PORT}\"";
		let result = resolve_env_vars(input).unwrap();
		assert_eq!(result, "host = \"localhost:5432\"");

		std::env::remove_var("TEST_DISPATCH_HOST");
		std::env::remove_var("TEST_DISPATCH_PORT");
	}

	#[test]
	fn test_env_var_with_default() {
		let input = "value = \"${MISSING_VAR:-default_value}\"";
		let result = resolve_env_vars(input).unwrap();
		assert_eq!(result, "value = \"default_value\"");
	}

	#[test]
	fn test_missing_env_var_error() {
		let input = "value = \"${MISSING_VAR}\"";
		let result = resolve_env_vars(input);
		assert!(result.is_err());
		assert!(result.unwrap_err().to_string().contains("MISSING_VAR"));
	}

	#[test]
	fn minimal_config_parses_with_defaults() {
		let config: Config = BASE_CONFIG.parse().unwrap();
		assert_eq!(config.service.id, "dispatch-test");
		assert_eq!(config.routing.performance_ttl_days, 90);
		assert_eq!(config.routing.storage_timeout_ms, 5_000);
		assert!(config.carriers.is_empty());
		assert!(config.api.is_none());
	}

	#[test]
	fn config_with_env_vars_parses() {
		std::env::set_var("TEST_DISPATCH_ID", "dispatch-env");

		let config_str = r#"
[service]
id = "${TEST_DISPATCH_ID}"

[storage]
primary = "memory"
cleanup_interval_seconds = 600
[storage.implementations.memory]

[api]
enabled = true
port = 8080
"#;
		let config: Config = config_str.parse().unwrap();
		assert_eq!(config.service.id, "dispatch-env");
		let api = config.api.unwrap();
		assert!(api.enabled);
		assert_eq!(api.port, 8080);
		assert_eq!(api.host, "127.0.0.1");

		std::env::remove_var("TEST_DISPATCH_ID");
	}

	#[test]
	fn unknown_primary_storage_rejected() {
		let config_str = r#"
[service]
id = "dispatch-test"

[storage]
primary = "redis"
cleanup_interval_seconds = 3600
[storage.implementations.memory]
"#;
		let err = config_str.parse::<Config>().unwrap_err();
		assert!(err.to_string().contains("Primary storage 'redis'"));
	}

	#[test]
	fn carrier_entries_are_validated() {
		let config_str = format!(
			"{}\n{}",
			BASE_CONFIG,
			r#"
[[carriers]]
id = "speedy"
name = "Speedy"
weight_limit = 20.0
cod_enabled = true
base_rate = 40.0
zones = ["metro", "tier1"]
[carriers.sla_days]
metro = 1
"#
		);
		let err = config_str.parse::<Config>().unwrap_err();
		assert!(err
			.to_string()
			.contains("serves zone tier1 without an SLA"));
	}

	#[test]
	fn duplicate_carrier_ids_rejected() {
		let carrier = r#"
[[carriers]]
id = "speedy"
name = "Speedy"
weight_limit = 20.0
cod_enabled = true
base_rate = 40.0
zones = ["metro"]
[carriers.sla_days]
metro = 1
"#;
		let config_str = format!("{}\n{}\n{}", BASE_CONFIG, carrier, carrier);
		let err = config_str.parse::<Config>().unwrap_err();
		assert!(err.to_string().contains("Duplicate carrier id"));
	}

	#[test]
	fn valid_carrier_entry_accepted() {
		let config_str = format!(
			"{}\n{}",
			BASE_CONFIG,
			r#"
[[carriers]]
id = "speedy"
name = "Speedy"
weight_limit = 20.0
cod_enabled = true
base_rate = 40.0
premium = true
zones = ["metro", "tier1"]
[carriers.sla_days]
metro = 1
tier1 = 2
"#
		);
		let config: Config = config_str.parse().unwrap();
		assert_eq!(config.carriers.len(), 1);
		assert!(config.carriers[0].premium);
	}
}
