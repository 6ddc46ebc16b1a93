use std::collections::BTreeMap;
use tracing::{debug, info};

use super::types::{BaseQuantities, CostRow, FreightRow, JoinedTables, TruckAggregate, TruckKey};

/// Sums of the cost-side quantities for one truck.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CostTotals {
    pub km_traveled: i64,
    pub liters: f64,
    pub fuel: f64,
    pub maintenance: f64,
    pub fixed_costs: f64,
}

/// Sums of the freight-side quantities for one truck.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FreightTotals {
    pub net_revenue: f64,
    pub weight_kg: f64,
    pub weight_cubic: f64,
    pub goods_value: f64,
}

fn cost_key(row: &CostRow) -> Option<TruckKey> {
    TruckKey::from_parts(
        row.record.truck_id.as_ref(),
        row.truck_type.as_ref(),
        row.plate.as_ref(),
    )
}

fn freight_key(row: &FreightRow) -> Option<TruckKey> {
    TruckKey::from_parts(
        row.record.truck_id.as_ref(),
        row.truck_type.as_ref(),
        row.plate.as_ref(),
    )
}

/// Groups the cost side by truck. Rows with an incomplete key are skipped.
pub fn sum_costs(rows: &[CostRow]) -> BTreeMap<TruckKey, CostTotals> {
    let mut totals: BTreeMap<TruckKey, CostTotals> = BTreeMap::new();
    for row in rows {
        let Some(key) = cost_key(row) else { continue };
        let t = totals.entry(key).or_default();
        t.km_traveled = t.km_traveled.saturating_add(row.record.km_traveled);
        t.liters += row.record.liters;
        t.fuel += row.record.fuel;
        t.maintenance += row.record.maintenance;
        t.fixed_costs += row.record.fixed_costs;
    }
    totals
}

/// Groups the freight side by truck. Rows with an incomplete key are skipped.
pub fn sum_freight(rows: &[FreightRow]) -> BTreeMap<TruckKey, FreightTotals> {
    let mut totals: BTreeMap<TruckKey, FreightTotals> = BTreeMap::new();
    for row in rows {
        let Some(key) = freight_key(row) else { continue };
        let t = totals.entry(key).or_default();
        t.net_revenue += row.record.net_revenue;
        t.weight_kg += row.record.weight_kg;
        t.weight_cubic += row.record.weight_cubic;
        t.goods_value += row.record.goods_value;
    }
    totals
}

/// One joined freight row is one trip.
pub fn count_trips(rows: &[FreightRow]) -> BTreeMap<TruckKey, u32> {
    let mut trips: BTreeMap<TruckKey, u32> = BTreeMap::new();
    for key in rows.iter().filter_map(freight_key) {
        *trips.entry(key).or_default() += 1;
    }
    trips
}

/// Sums both sides per truck, keeps only trucks present on both sides, and
/// divides every sum by the truck's trip count.
#[tracing::instrument(skip_all)]
pub fn aggregate_trucks(joined: &JoinedTables) -> Vec<TruckAggregate> {
    let costs = sum_costs(&joined.costs);
    let freight = sum_freight(&joined.freight);
    let trips = count_trips(&joined.freight);

    let dropped_cost_only = costs.keys().filter(|k| !freight.contains_key(*k)).count();
    let dropped_freight_only = freight.keys().filter(|k| !costs.contains_key(*k)).count();

    let aggregates: Vec<TruckAggregate> = costs
        .into_iter()
        .filter_map(|(key, cost)| {
            let freight = freight.get(&key)?;
            let trips = trips.get(&key).copied().unwrap_or(1).max(1);
            let totals = BaseQuantities {
                distance_km: cost.km_traveled as f64,
                liters: cost.liters,
                fuel: cost.fuel,
                maintenance: cost.maintenance,
                fixed_costs: cost.fixed_costs,
                net_revenue: freight.net_revenue,
                weight_kg: freight.weight_kg,
                weight_cubic: freight.weight_cubic,
                goods_value: freight.goods_value,
            };
            debug!(truck_id = %key.truck_id, trips, "Truck aggregated");
            Some(TruckAggregate {
                key,
                trips,
                per_trip: totals / f64::from(trips),
            })
        })
        .collect();

    info!(
        trucks = aggregates.len(),
        dropped_cost_only,
        dropped_freight_only,
        "Truck aggregates built"
    );
    aggregates
}
