//! Single-row inference input built from truck-type means plus overrides.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::ScenarioError;
use crate::model::FeatureSource;
use crate::pipeline::types::{BaseQuantities, DerivedFeatures, FeatureRow};
use crate::schema;

/// Mean of every numerical feature over the rows sharing one truck type.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TypeMeans {
    pub rows: usize,
    pub base: BaseQuantities,
    pub derived: DerivedFeatures,
}

/// Per-truck-type means of the training feature table, computed once per
/// dataset and shared read-only by every scenario request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TruckTypeMeans {
    by_type: BTreeMap<String, TypeMeans>,
}

impl TruckTypeMeans {
    pub fn from_features(features: &[FeatureRow]) -> Self {
        let mut by_type: BTreeMap<String, TypeMeans> = BTreeMap::new();
        for row in features {
            let entry = by_type.entry(row.truck_type().to_string()).or_default();
            entry.rows += 1;
            entry.base += row.base;
            entry.derived += row.derived;
        }
        for means in by_type.values_mut() {
            let n = means.rows as f64;
            means.base = means.base / n;
            means.derived = means.derived / n;
        }
        Self { by_type }
    }

    pub fn get(&self, truck_type: &str) -> Option<&TypeMeans> {
        self.by_type.get(truck_type)
    }

    /// Known truck types, sorted.
    pub fn truck_types(&self) -> impl Iterator<Item = &str> {
        self.by_type.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.by_type.is_empty()
    }

    pub fn len(&self) -> usize {
        self.by_type.len()
    }
}

/// Caller-facing scenario: a known truck type plus optional overrides.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScenarioRequest {
    pub truck_type: String,
    #[serde(default)]
    pub distance_km: Option<f64>,
    #[serde(default)]
    pub weight_kg: Option<f64>,
    #[serde(default)]
    pub weight_cubic: Option<f64>,
    #[serde(default)]
    pub goods_value: Option<f64>,
}

impl ScenarioRequest {
    pub fn new(truck_type: impl Into<String>) -> Self {
        Self {
            truck_type: truck_type.into(),
            ..Default::default()
        }
    }
}

/// Inference-ready row with the same columns as a training [`FeatureRow`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScenarioRow {
    pub truck_type: String,
    pub base: BaseQuantities,
    pub derived: DerivedFeatures,
}

impl FeatureSource for ScenarioRow {
    fn categorical(&self, column: &str) -> Option<&str> {
        (column == schema::TRUCK_TYPE).then_some(self.truck_type.as_str())
    }

    fn numeric(&self, column: &str) -> Option<f64> {
        self.base.get(column).or_else(|| self.derived.get(column))
    }
}

/// Seeds a row from the truck type's means, applies the overrides, and
/// recomputes every derived feature from the result.
///
/// A non-finite override counts as not supplied.
pub fn build_scenario(
    request: &ScenarioRequest,
    means: &TruckTypeMeans,
) -> Result<ScenarioRow, ScenarioError> {
    let seed = means
        .get(&request.truck_type)
        .ok_or_else(|| ScenarioError::UnknownTruckType(request.truck_type.clone()))?;

    let mut base = seed.base;
    let overrides = [
        (&mut base.distance_km, request.distance_km),
        (&mut base.weight_kg, request.weight_kg),
        (&mut base.weight_cubic, request.weight_cubic),
        (&mut base.goods_value, request.goods_value),
    ];
    for (field, value) in overrides {
        if let Some(v) = value.filter(|v| v.is_finite()) {
            *field = v;
        }
    }

    Ok(ScenarioRow {
        truck_type: request.truck_type.clone(),
        derived: DerivedFeatures::compute(&base),
        base,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::types::TruckKey;

    fn row(id: &str, kind: &str, base: BaseQuantities) -> FeatureRow {
        FeatureRow {
            key: TruckKey {
                truck_id: id.into(),
                truck_type: kind.into(),
                plate: format!("P-{id}"),
            },
            trips: 1,
            derived: DerivedFeatures::compute(&base),
            base,
        }
    }

    fn heavy() -> BaseQuantities {
        BaseQuantities {
            distance_km: 500.0,
            liters: 125.0,
            fuel: 2000.0,
            maintenance: 300.0,
            fixed_costs: 100.0,
            net_revenue: 3200.0,
            weight_kg: 8000.0,
            weight_cubic: 30.0,
            goods_value: 150_000.0,
        }
    }

    fn means() -> TruckTypeMeans {
        TruckTypeMeans::from_features(&[
            row("1", "Heavy", heavy()),
            row(
                "2",
                "Light",
                BaseQuantities {
                    distance_km: 120.0,
                    fuel: 400.0,
                    net_revenue: 900.0,
                    ..heavy()
                },
            ),
            row(
                "3",
                "Light",
                BaseQuantities {
                    distance_km: 80.0,
                    fuel: 300.0,
                    net_revenue: 500.0,
                    ..heavy()
                },
            ),
        ])
    }

    #[test]
    fn test_means_per_type() {
        let m = means();
        assert_eq!(m.truck_types().collect::<Vec<_>>(), vec!["Heavy", "Light"]);
        let light = m.get("Light").unwrap();
        assert_eq!(light.rows, 2);
        assert_eq!(light.base.distance_km, 100.0);
        assert_eq!(light.base.fuel, 350.0);
    }

    #[test]
    fn test_heavy_scenario_defaults() {
        let scenario = build_scenario(&ScenarioRequest::new("Heavy"), &means()).unwrap();
        assert_eq!(scenario.derived.total_cost, 2400.0);
        assert_eq!(scenario.derived.net_profit, 800.0);
        assert_eq!(scenario.derived.cost_per_km, 4.8);
        assert_eq!(scenario.derived.revenue_per_km, 6.4);
    }

    #[test]
    fn test_distance_override_recomputes_ratios() {
        let request = ScenarioRequest {
            distance_km: Some(250.0),
            ..ScenarioRequest::new("Heavy")
        };
        let scenario = build_scenario(&request, &means()).unwrap();
        assert_eq!(scenario.base.distance_km, 250.0);
        assert_eq!(scenario.derived.cost_per_km, 9.6);
        assert_eq!(scenario.derived.revenue_per_km, 12.8);
        assert_eq!(scenario.derived.net_profit, 800.0);
    }

    #[test]
    fn test_no_overrides_match_type_means() {
        let m = means();
        // Ratios only reproduce exactly for a single-truck type.
        let heavy = build_scenario(&ScenarioRequest::new("Heavy"), &m).unwrap();
        let expected = m.get("Heavy").unwrap().derived;
        assert!((heavy.derived.cost_per_km - expected.cost_per_km).abs() < 1e-9);
        assert!((heavy.derived.km_per_liter - expected.km_per_liter).abs() < 1e-9);
        assert!((heavy.derived.revenue_per_kg - expected.revenue_per_kg).abs() < 1e-9);

        // Sums are linear, so they match for any type.
        let light = build_scenario(&ScenarioRequest::new("Light"), &m).unwrap();
        let expected = m.get("Light").unwrap().derived;
        assert!((light.derived.total_cost - expected.total_cost).abs() < 1e-9);
        assert!((light.derived.net_profit - expected.net_profit).abs() < 1e-9);
    }

    #[test]
    fn test_doubling_distance_lowers_per_km_figures() {
        let m = means();
        let at = |km: f64| {
            let request = ScenarioRequest {
                distance_km: Some(km),
                weight_kg: Some(5000.0),
                ..ScenarioRequest::new("Light")
            };
            build_scenario(&request, &m).unwrap()
        };
        let single = at(150.0);
        let double = at(300.0);
        assert!(double.derived.cost_per_km < single.derived.cost_per_km);
        assert!(double.derived.revenue_per_km < single.derived.revenue_per_km);
    }

    #[test]
    fn test_unknown_truck_type() {
        let err = build_scenario(&ScenarioRequest::new("Hovercraft"), &means()).unwrap_err();
        assert_eq!(err, ScenarioError::UnknownTruckType("Hovercraft".into()));
    }

    #[test]
    fn test_non_finite_override_is_ignored() {
        let request = ScenarioRequest {
            distance_km: Some(f64::NAN),
            goods_value: Some(f64::INFINITY),
            ..ScenarioRequest::new("Heavy")
        };
        let scenario = build_scenario(&request, &means()).unwrap();
        assert_eq!(scenario.base.distance_km, 500.0);
        assert_eq!(scenario.base.goods_value, 150_000.0);
    }

    #[test]
    fn test_zero_distance_override() {
        let request = ScenarioRequest {
            distance_km: Some(0.0),
            ..ScenarioRequest::new("Heavy")
        };
        let scenario = build_scenario(&request, &means()).unwrap();
        assert_eq!(scenario.derived.cost_per_km, 0.0);
        assert_eq!(scenario.derived.revenue_per_km, 0.0);
    }

    #[test]
    fn test_scenario_row_has_every_contract_column() {
        let scenario = build_scenario(&ScenarioRequest::new("Heavy"), &means()).unwrap();
        let schema = schema::FeatureSchema::standard();
        assert_eq!(scenario.categorical(schema::TRUCK_TYPE), Some("Heavy"));
        for column in &schema.numerical {
            assert!(scenario.numeric(column).is_some(), "{column}");
        }
    }
}
