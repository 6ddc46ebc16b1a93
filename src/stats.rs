//! Descriptive statistics over the feature and city tables.

use serde::Serialize;
use std::collections::BTreeMap;

use crate::pipeline::types::{CityStat, FeatureRow};
use crate::pipeline::utility::{mean, quantile};
use crate::scenario::TruckTypeMeans;

/// Mean per-km cost breakdown for one truck type.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CostProfile {
    pub truck_type: String,
    pub trucks: usize,
    pub cost_per_km: f64,
    pub maintenance_per_km: f64,
    pub fuel_cost_per_km: f64,
    pub fixed_cost_per_km: f64,
}

/// Five-number summary of one distribution.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Distribution {
    pub truck_type: String,
    pub count: usize,
    pub min: f64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub max: f64,
}

impl Distribution {
    fn from_values(truck_type: String, mut values: Vec<f64>) -> Self {
        values.sort_by(f64::total_cmp);
        Distribution {
            truck_type,
            count: values.len(),
            min: values.first().copied().unwrap_or(0.0),
            q1: quantile(&values, 0.25),
            median: quantile(&values, 0.5),
            q3: quantile(&values, 0.75),
            max: values.last().copied().unwrap_or(0.0),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CityGoodsValue {
    pub city: String,
    pub goods_value: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GeoPoint {
    pub longitude: f64,
    pub latitude: f64,
}

/// Starting values for a scenario of one truck type.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScenarioDefaults {
    pub truck_type: String,
    pub distance_km: f64,
    pub weight_kg: f64,
    pub weight_cubic: f64,
    pub goods_value: f64,
}

fn group_by_type(features: &[FeatureRow]) -> BTreeMap<&str, Vec<&FeatureRow>> {
    let mut groups: BTreeMap<&str, Vec<&FeatureRow>> = BTreeMap::new();
    for row in features {
        groups.entry(row.truck_type()).or_default().push(row);
    }
    groups
}

pub fn truck_type_cost_profile(features: &[FeatureRow]) -> Vec<CostProfile> {
    group_by_type(features)
        .into_iter()
        .map(|(truck_type, rows)| {
            let avg = |f: fn(&FeatureRow) -> f64| {
                mean(&rows.iter().map(|r| f(r)).collect::<Vec<_>>())
            };
            CostProfile {
                truck_type: truck_type.to_string(),
                trucks: rows.len(),
                cost_per_km: avg(|r| r.derived.cost_per_km),
                maintenance_per_km: avg(|r| r.derived.maintenance_per_km),
                fuel_cost_per_km: avg(|r| r.derived.fuel_cost_per_km),
                fixed_cost_per_km: avg(|r| r.derived.fixed_cost_per_km),
            }
        })
        .collect()
}

pub fn cost_per_km_distribution(features: &[FeatureRow]) -> Vec<Distribution> {
    group_by_type(features)
        .into_iter()
        .map(|(truck_type, rows)| {
            let values = rows.iter().map(|r| r.derived.cost_per_km).collect();
            Distribution::from_values(truck_type.to_string(), values)
        })
        .collect()
}

/// The `n` cities with the highest goods value.
///
/// Goods value is truncated to whole units. A city listed once per
/// coordinate pair collapses to a single entry when the values agree.
pub fn top_cities(cities: &[CityStat], n: usize) -> Vec<CityGoodsValue> {
    let mut ranked: Vec<CityGoodsValue> = cities
        .iter()
        .map(|c| CityGoodsValue {
            city: c.city.clone(),
            goods_value: c.goods_value.trunc() as i64,
        })
        .collect();
    ranked.sort_by(|a, b| b.goods_value.cmp(&a.goods_value).then_with(|| a.city.cmp(&b.city)));
    ranked.dedup();
    ranked.truncate(n);
    ranked
}

/// Coordinates present in the city table, in table order.
pub fn geo_points(cities: &[CityStat]) -> Vec<GeoPoint> {
    cities
        .iter()
        .filter_map(|c| {
            Some(GeoPoint {
                longitude: c.longitude?,
                latitude: c.latitude?,
            })
        })
        .collect()
}

pub fn scenario_defaults(means: &TruckTypeMeans, truck_type: &str) -> Option<ScenarioDefaults> {
    let m = means.get(truck_type)?;
    Some(ScenarioDefaults {
        truck_type: truck_type.to_string(),
        distance_km: m.base.distance_km,
        weight_kg: m.base.weight_kg,
        weight_cubic: m.base.weight_cubic,
        goods_value: m.base.goods_value,
    })
}
