//! Static carrier registry.
//!
//! Holds the capability, rate, and SLA profile of every known carrier.
//! Profiles are loaded once at startup (from the built-in fleet or from
//! configuration) and never mutated at runtime. Carriers are kept in a
//! BTreeMap so iteration order, and therefore scoring tie-breaks, are
//! deterministic.

use dispatch_types::{CarrierProfile, Zone};
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Registry of carrier capability profiles, keyed by carrier id.
#[derive(Debug, Clone)]
pub struct CarrierRegistry {
	carriers: BTreeMap<String, CarrierProfile>,
}

impl CarrierRegistry {
	/// Builds a registry from a list of profiles.
	///
	/// Later entries with a duplicate id replace earlier ones; configuration
	/// validation rejects duplicates before this point.
	pub fn from_profiles(profiles: impl IntoIterator<Item = CarrierProfile>) -> Self {
		Self {
			carriers: profiles
				.into_iter()
				.map(|profile| (profile.id.clone(), profile))
				.collect(),
		}
	}

	/// Builds the registry with the built-in production fleet and its
	/// historical rate cards.
	pub fn with_default_fleet() -> Self {
		Self::from_profiles([
			CarrierProfile {
				id: "delhivery".to_string(),
				name: "Delhivery".to_string(),
				weight_limit: 30.0,
				cod_enabled: true,
				base_rate: 45.0,
				premium: false,
				zones: BTreeSet::from([Zone::Metro, Zone::Tier1, Zone::Tier2, Zone::Tier3]),
				sla_days: HashMap::from([
					(Zone::Metro, 1),
					(Zone::Tier1, 2),
					(Zone::Tier2, 3),
					(Zone::Tier3, 5),
				]),
			},
			CarrierProfile {
				id: "xpressbees".to_string(),
				name: "XpressBees".to_string(),
				weight_limit: 25.0,
				cod_enabled: true,
				base_rate: 50.0,
				premium: false,
				zones: BTreeSet::from([Zone::Metro, Zone::Tier1, Zone::Tier2, Zone::Tier3]),
				sla_days: HashMap::from([
					(Zone::Metro, 2),
					(Zone::Tier1, 2),
					(Zone::Tier2, 3),
					(Zone::Tier3, 5),
				]),
			},
			CarrierProfile {
				id: "bluedart".to_string(),
				name: "BlueDart".to_string(),
				weight_limit: 40.0,
				cod_enabled: true,
				base_rate: 65.0,
				premium: true,
				zones: BTreeSet::from([Zone::Metro, Zone::Tier1]),
				sla_days: HashMap::from([(Zone::Metro, 1), (Zone::Tier1, 2)]),
			},
			CarrierProfile {
				id: "fedex".to_string(),
				name: "FedEx".to_string(),
				weight_limit: 50.0,
				cod_enabled: false,
				base_rate: 75.0,
				premium: false,
				zones: BTreeSet::from([Zone::Metro, Zone::Tier1]),
				sla_days: HashMap::from([(Zone::Metro, 1), (Zone::Tier1, 1)]),
			},
		])
	}

	/// Looks up a carrier profile by id.
	pub fn get(&self, id: &str) -> Option<&CarrierProfile> {
		self.carriers.get(id)
	}

	/// Iterates profiles in ascending id order.
	pub fn iter(&self) -> impl Iterator<Item = &CarrierProfile> {
		self.carriers.values()
	}

	/// Profiles serving the given zone, in ascending id order.
	pub fn carriers_for_zone(&self, zone: Zone) -> Vec<&CarrierProfile> {
		self.iter().filter(|profile| profile.serves(zone)).collect()
	}

	pub fn len(&self) -> usize {
		self.carriers.len()
	}

	pub fn is_empty(&self) -> bool {
		self.carriers.is_empty()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn default_fleet_has_four_carriers() {
		let registry = CarrierRegistry::with_default_fleet();
		assert_eq!(registry.len(), 4);
		assert!(registry.get("delhivery").is_some());
		assert!(registry.get("bluedart").is_some_and(|c| c.premium));
		assert!(registry.get("fedex").is_some_and(|c| !c.cod_enabled));
	}

	#[test]
	fn every_served_zone_has_an_sla() {
		let registry = CarrierRegistry::with_default_fleet();
		for profile in registry.iter() {
			for zone in &profile.zones {
				assert!(
					profile.sla_for(*zone).is_some(),
					"{} serves {} without an SLA",
					profile.id,
					zone
				);
			}
		}
	}

	#[test]
	fn zone_filter_matches_served_zones() {
		let registry = CarrierRegistry::with_default_fleet();
		let tier3: Vec<&str> = registry
			.carriers_for_zone(Zone::Tier3)
			.iter()
			.map(|c| c.id.as_str())
			.collect();
		assert_eq!(tier3, vec!["delhivery", "xpressbees"]);

		let metro = registry.carriers_for_zone(Zone::Metro);
		assert_eq!(metro.len(), 4);
	}

	#[test]
	fn iteration_is_id_ordered() {
		let registry = CarrierRegistry::with_default_fleet();
		let ids: Vec<&str> = registry.iter().map(|c| c.id.as_str()).collect();
		let mut sorted = ids.clone();
		sorted.sort_unstable();
		assert_eq!(ids, sorted);
	}
}
