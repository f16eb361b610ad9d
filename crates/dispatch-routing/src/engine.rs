//! Carrier routing engine.
//!
//! Filters the registry down to carriers that can take the shipment, scores
//! each against cost, SLA, and historical reliability, applies the express
//! and degradation modifiers, and ranks by the raw sum. Only the reported
//! values are clamped; ranking always uses the raw score so the clamp can
//! never manufacture ties. For a fixed context and performance snapshot the
//! result is fully deterministic.

use crate::performance::PerformanceStore;
use crate::registry::CarrierRegistry;
use crate::RoutingError;
use dispatch_types::{
	CarrierPerformanceRecord, CarrierProfile, RankedAlternate, RoutingContext, ScoringResult,
};
use std::sync::Arc;

/// Weighted-total coefficients.
const COST_WEIGHT: f64 = 0.4;
const SLA_WEIGHT: f64 = 0.3;
const RELIABILITY_WEIGHT: f64 = 0.3;

/// Cost at which the cost score bottoms out at zero.
const COST_CEILING: f64 = 300.0;
/// Score deducted per promised day beyond the first.
const SLA_DAY_PENALTY: f64 = 20.0;

/// Reliability used until a lane has enough recorded shipments.
const RELIABILITY_PRIOR: f64 = 80.0;
/// Recorded shipments needed before the raw success ratio is trusted.
const RELIABILITY_MIN_SAMPLE: u64 = 6;

/// Penalty applied to lanes currently flagged degraded.
const DEGRADED_PENALTY: f64 = 50.0;
/// Express bonus for carriers promising delivery within a day.
const EXPRESS_FAST_SLA_BONUS: f64 = 15.0;
/// Additional express bonus for premium-flagged carriers.
const PREMIUM_TRUST_BONUS: f64 = 10.0;
const EXPRESS_SLA_THRESHOLD_DAYS: u32 = 1;

/// Weight included in the base rate; surcharge applies above this.
const INCLUDED_WEIGHT_KG: f64 = 0.5;
/// Surcharge per kg above the included weight.
const WEIGHT_SURCHARGE_PER_KG: f64 = 15.0;
/// COD surcharge as a fraction of order value, rounded up.
const COD_RATE: f64 = 0.01;

/// Number of runner-up carriers reported alongside the winner.
const MAX_ALTERNATES: usize = 2;

/// Selects and ranks carriers for shipments.
pub struct RoutingEngine {
	registry: Arc<CarrierRegistry>,
	performance: Arc<PerformanceStore>,
}

struct ScoredCarrier<'a> {
	profile: &'a CarrierProfile,
	cost: f64,
	sla_days: u32,
	raw_score: f64,
}

impl RoutingEngine {
	pub fn new(registry: Arc<CarrierRegistry>, performance: Arc<PerformanceStore>) -> Self {
		Self {
			registry,
			performance,
		}
	}

	/// Returns the best carrier for the order plus up to two alternates.
	///
	/// Reads the zone's performance history once up front; everything after
	/// that is a pure function of the context and that snapshot.
	pub async fn get_optimal_carrier(
		&self,
		ctx: &RoutingContext,
	) -> Result<ScoringResult, RoutingError> {
		if ctx.pincode.trim().is_empty() {
			return Err(RoutingError::MissingField("pincode"));
		}
		if !(ctx.weight > 0.0) {
			return Err(RoutingError::MissingField("weight"));
		}

		let history = self.performance.zone_history(ctx.zone).await;

		let mut scored: Vec<ScoredCarrier<'_>> = self
			.registry
			.iter()
			.filter(|profile| is_eligible(profile, ctx))
			.map(|profile| {
				let cost = estimate_cost(profile, ctx);
				// Eligibility guarantees the zone is served.
				let sla_days = profile.sla_for(ctx.zone).unwrap_or(u32::MAX);
				let raw_score =
					raw_score(profile, ctx, cost, sla_days, history.get(&profile.id));
				ScoredCarrier {
					profile,
					cost,
					sla_days,
					raw_score,
				}
			})
			.collect();

		if scored.is_empty() {
			return Err(RoutingError::NoEligibleCarrier);
		}

		// Rank on the raw score; the registry's id order breaks exact ties.
		scored.sort_by(|a, b| b.raw_score.total_cmp(&a.raw_score));

		let best = &scored[0];
		tracing::debug!(
			carrier = %best.profile.id,
			zone = %ctx.zone,
			cost = best.cost,
			score = best.raw_score,
			"selected carrier"
		);

		Ok(ScoringResult {
			carrier: best.profile.clone(),
			cost: best.cost,
			sla_days: best.sla_days,
			score: reported_score(best.raw_score),
			alternates: scored
				.iter()
				.skip(1)
				.take(MAX_ALTERNATES)
				.map(|entry| RankedAlternate {
					carrier: entry.profile.clone(),
					cost: entry.cost,
					sla_days: entry.sla_days,
					score: reported_score(entry.raw_score),
				})
				.collect(),
		})
	}
}

/// A carrier can take the shipment when it accepts the weight, serves the
/// zone, and supports COD if the order needs it.
fn is_eligible(profile: &CarrierProfile, ctx: &RoutingContext) -> bool {
	profile.weight_limit >= ctx.weight
		&& profile.serves(ctx.zone)
		&& profile.sla_for(ctx.zone).is_some()
		&& (!ctx.cod_required || profile.cod_enabled)
}

/// Estimated shipping cost, rounded to two decimals.
fn estimate_cost(profile: &CarrierProfile, ctx: &RoutingContext) -> f64 {
	let mut cost = profile.base_rate;
	cost += (ctx.weight - INCLUDED_WEIGHT_KG).max(0.0) * WEIGHT_SURCHARGE_PER_KG;
	cost += ctx.zone.premium();
	if ctx.cod_required {
		cost += (ctx.amount * COD_RATE).ceil();
	}
	(cost * 100.0).round() / 100.0
}

/// Weighted total plus contextual modifiers, unclamped.
fn raw_score(
	profile: &CarrierProfile,
	ctx: &RoutingContext,
	cost: f64,
	sla_days: u32,
	record: Option<&CarrierPerformanceRecord>,
) -> f64 {
	let cost_score = (100.0 - cost / COST_CEILING * 100.0).max(0.0);
	let sla_score = (100.0 - (sla_days as f64 - 1.0) * SLA_DAY_PENALTY).max(0.0);
	let reliability_score = match record {
		Some(record) if record.total_shipments >= RELIABILITY_MIN_SAMPLE => {
			100.0 * record.successful as f64 / record.total_shipments as f64
		}
		// Cold start: unproven lanes get a neutral prior instead of a penalty.
		_ => RELIABILITY_PRIOR,
	};

	let mut score = COST_WEIGHT * cost_score
		+ SLA_WEIGHT * sla_score
		+ RELIABILITY_WEIGHT * reliability_score;

	if ctx.is_express() && sla_days <= EXPRESS_SLA_THRESHOLD_DAYS {
		score += EXPRESS_FAST_SLA_BONUS;
		if profile.premium {
			score += PREMIUM_TRUST_BONUS;
		}
	}
	if record.is_some_and(|r| r.is_degraded) {
		score -= DEGRADED_PENALTY;
	}

	score
}

/// Clamps the reported score to 100 with one decimal. Ranking has already
/// happened on the raw value by the time this runs.
fn reported_score(raw: f64) -> f64 {
	(raw.min(100.0) * 10.0).round() / 10.0
}
