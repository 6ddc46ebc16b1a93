use super::types::{BaseQuantities, DerivedFeatures, FeatureRow, TruckAggregate};
use super::utility::{finite_or_zero, safe_ratio};

/// Value substituted for every ratio whose denominator is zero.
const ZERO_FALLBACK: f64 = 0.0;

impl DerivedFeatures {
    /// Computes every derived feature from one row's base quantities.
    ///
    /// The calculation is row-local. Ratios with a zero denominator are 0,
    /// and a final sweep replaces anything non-finite with 0.
    pub fn compute(base: &BaseQuantities) -> Self {
        let km_per_liter = safe_ratio(base.distance_km, base.liters, ZERO_FALLBACK);
        let maintenance_per_km = safe_ratio(base.maintenance, base.distance_km, ZERO_FALLBACK);
        let total_cost = base.fuel + base.maintenance + base.fixed_costs;
        let cost_per_km = safe_ratio(total_cost, base.distance_km, ZERO_FALLBACK);
        let cost_per_kg = safe_ratio(total_cost, base.weight_kg, ZERO_FALLBACK);
        let revenue_per_km = safe_ratio(base.net_revenue, base.distance_km, ZERO_FALLBACK);
        let revenue_per_kg = safe_ratio(base.net_revenue, base.weight_kg, ZERO_FALLBACK);
        let fuel_cost_per_km = safe_ratio(base.fuel, base.distance_km, ZERO_FALLBACK);
        let fixed_cost_per_km = safe_ratio(base.fixed_costs, base.distance_km, ZERO_FALLBACK);
        let net_profit = base.net_revenue - total_cost;

        DerivedFeatures {
            km_per_liter,
            maintenance_per_km,
            total_cost,
            cost_per_km,
            cost_per_kg,
            revenue_per_km,
            revenue_per_kg,
            fuel_cost_per_km,
            fixed_cost_per_km,
            net_profit,
        }
        .map(finite_or_zero)
    }
}

impl FeatureRow {
    pub fn from_aggregate(aggregate: TruckAggregate) -> Self {
        let base = aggregate.per_trip.map(finite_or_zero);
        FeatureRow {
            derived: DerivedFeatures::compute(&base),
            key: aggregate.key,
            trips: aggregate.trips,
            base,
        }
    }
}

/// Extends every truck aggregate with its derived features.
pub fn derive_features(aggregates: Vec<TruckAggregate>) -> Vec<FeatureRow> {
    aggregates.into_iter().map(FeatureRow::from_aggregate).collect()
}
