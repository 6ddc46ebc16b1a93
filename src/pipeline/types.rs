//! Data types flowing through the feature pipeline.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::ops::{AddAssign, Div};

use crate::schema;

/// One cleaned maintenance/fuel log entry.
#[derive(Debug, Clone, PartialEq)]
pub struct CostRecord {
    pub truck_id: Option<String>,
    pub truck_type: Option<String>,
    pub plate: Option<String>,
    pub date: Option<NaiveDate>,
    pub km_traveled: i64,
    pub liters: f64,
    pub fuel: f64,
    pub maintenance: f64,
    pub fixed_costs: f64,
}

/// One cleaned freight/order entry. `net_revenue` is already rescaled to
/// currency units.
#[derive(Debug, Clone, PartialEq)]
pub struct FreightRecord {
    pub truck_id: Option<String>,
    pub customer_id: Option<String>,
    pub truck_type: Option<String>,
    pub plate: Option<String>,
    pub date: Option<NaiveDate>,
    pub year: Option<String>,
    pub city: Option<String>,
    pub net_revenue: f64,
    pub weight_kg: f64,
    pub weight_cubic: f64,
    pub goods_value: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VehicleDim {
    pub truck_id: String,
    pub truck_type: Option<String>,
    pub plate: Option<String>,
    /// Manufacture year; surfaces as "Truck Age" after the join.
    pub year: Option<String>,
    pub city: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CustomerDim {
    pub customer_id: String,
    pub city: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub year: Option<String>,
}

/// A cost record after the left join to the vehicle table.
#[derive(Debug, Clone, PartialEq)]
pub struct CostRow {
    pub record: CostRecord,
    pub truck_type: Option<String>,
    pub plate: Option<String>,
}

/// A freight record after the left joins to the vehicle and customer tables,
/// with the City/Year collisions already resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct FreightRow {
    pub record: FreightRecord,
    pub truck_type: Option<String>,
    pub plate: Option<String>,
    pub truck_age: Option<String>,
    pub year: Option<String>,
    pub city: Option<String>,
}

/// Output of the source joiner.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JoinedTables {
    pub costs: Vec<CostRow>,
    pub freight: Vec<FreightRow>,
    /// Whether any joined source carried a City column at all.
    pub has_city: bool,
}

/// Grain of the truck aggregate.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TruckKey {
    pub truck_id: String,
    pub truck_type: String,
    pub plate: String,
}

impl TruckKey {
    /// Builds the key only when all three parts are present.
    pub fn from_parts(
        truck_id: Option<&String>,
        truck_type: Option<&String>,
        plate: Option<&String>,
    ) -> Option<Self> {
        Some(Self {
            truck_id: truck_id?.clone(),
            truck_type: truck_type?.clone(),
            plate: plate?.clone(),
        })
    }
}

/// The quantities summed per truck and normalized per trip.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BaseQuantities {
    pub distance_km: f64,
    pub liters: f64,
    pub fuel: f64,
    pub maintenance: f64,
    pub fixed_costs: f64,
    pub net_revenue: f64,
    pub weight_kg: f64,
    pub weight_cubic: f64,
    pub goods_value: f64,
}

impl BaseQuantities {
    pub fn get(&self, column: &str) -> Option<f64> {
        let value = match column {
            schema::DISTANCE_KM => self.distance_km,
            schema::LITERS => self.liters,
            schema::FUEL => self.fuel,
            schema::MAINTENANCE => self.maintenance,
            schema::FIXED_COSTS => self.fixed_costs,
            schema::NET_REVENUE => self.net_revenue,
            schema::WEIGHT_KG => self.weight_kg,
            schema::WEIGHT_CUBIC => self.weight_cubic,
            schema::GOODS_VALUE => self.goods_value,
            _ => return None,
        };
        Some(value)
    }

    /// Applies `f` to every field.
    pub fn map(self, f: impl Fn(f64) -> f64) -> Self {
        Self {
            distance_km: f(self.distance_km),
            liters: f(self.liters),
            fuel: f(self.fuel),
            maintenance: f(self.maintenance),
            fixed_costs: f(self.fixed_costs),
            net_revenue: f(self.net_revenue),
            weight_kg: f(self.weight_kg),
            weight_cubic: f(self.weight_cubic),
            goods_value: f(self.goods_value),
        }
    }
}

impl AddAssign for BaseQuantities {
    fn add_assign(&mut self, rhs: Self) {
        self.distance_km += rhs.distance_km;
        self.liters += rhs.liters;
        self.fuel += rhs.fuel;
        self.maintenance += rhs.maintenance;
        self.fixed_costs += rhs.fixed_costs;
        self.net_revenue += rhs.net_revenue;
        self.weight_kg += rhs.weight_kg;
        self.weight_cubic += rhs.weight_cubic;
        self.goods_value += rhs.goods_value;
    }
}

impl Div<f64> for BaseQuantities {
    type Output = Self;

    fn div(self, rhs: f64) -> Self {
        self.map(|v| v / rhs)
    }
}

/// Per-trip quantities for one truck.
#[derive(Debug, Clone, PartialEq)]
pub struct TruckAggregate {
    pub key: TruckKey,
    /// Always at least 1.
    pub trips: u32,
    pub per_trip: BaseQuantities,
}

/// The ratio and sum features derived from [`BaseQuantities`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DerivedFeatures {
    pub km_per_liter: f64,
    pub maintenance_per_km: f64,
    pub total_cost: f64,
    pub cost_per_km: f64,
    pub cost_per_kg: f64,
    pub revenue_per_km: f64,
    pub revenue_per_kg: f64,
    pub fuel_cost_per_km: f64,
    pub fixed_cost_per_km: f64,
    pub net_profit: f64,
}

impl DerivedFeatures {
    pub fn get(&self, column: &str) -> Option<f64> {
        let value = match column {
            schema::KM_PER_LITER => self.km_per_liter,
            schema::MAINTENANCE_PER_KM => self.maintenance_per_km,
            schema::TOTAL_COST => self.total_cost,
            schema::COST_PER_KM => self.cost_per_km,
            schema::COST_PER_KG => self.cost_per_kg,
            schema::REVENUE_PER_KM => self.revenue_per_km,
            schema::REVENUE_PER_KG => self.revenue_per_kg,
            schema::FUEL_COST_PER_KM => self.fuel_cost_per_km,
            schema::FIXED_COST_PER_KM => self.fixed_cost_per_km,
            schema::NET_PROFIT => self.net_profit,
            _ => return None,
        };
        Some(value)
    }

    pub fn map(self, f: impl Fn(f64) -> f64) -> Self {
        Self {
            km_per_liter: f(self.km_per_liter),
            maintenance_per_km: f(self.maintenance_per_km),
            total_cost: f(self.total_cost),
            cost_per_km: f(self.cost_per_km),
            cost_per_kg: f(self.cost_per_kg),
            revenue_per_km: f(self.revenue_per_km),
            revenue_per_kg: f(self.revenue_per_kg),
            fuel_cost_per_km: f(self.fuel_cost_per_km),
            fixed_cost_per_km: f(self.fixed_cost_per_km),
            net_profit: f(self.net_profit),
        }
    }
}

impl AddAssign for DerivedFeatures {
    fn add_assign(&mut self, rhs: Self) {
        self.km_per_liter += rhs.km_per_liter;
        self.maintenance_per_km += rhs.maintenance_per_km;
        self.total_cost += rhs.total_cost;
        self.cost_per_km += rhs.cost_per_km;
        self.cost_per_kg += rhs.cost_per_kg;
        self.revenue_per_km += rhs.revenue_per_km;
        self.revenue_per_kg += rhs.revenue_per_kg;
        self.fuel_cost_per_km += rhs.fuel_cost_per_km;
        self.fixed_cost_per_km += rhs.fixed_cost_per_km;
        self.net_profit += rhs.net_profit;
    }
}

impl Div<f64> for DerivedFeatures {
    type Output = Self;

    fn div(self, rhs: f64) -> Self {
        self.map(|v| v / rhs)
    }
}

/// One row of the training feature table.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureRow {
    pub key: TruckKey,
    pub trips: u32,
    pub base: BaseQuantities,
    pub derived: DerivedFeatures,
}

impl FeatureRow {
    pub fn truck_type(&self) -> &str {
        &self.key.truck_type
    }

    /// Looks up any base or derived numeric column by name.
    pub fn value(&self, column: &str) -> Option<f64> {
        self.base.get(column).or_else(|| self.derived.get(column))
    }
}

/// City-level freight totals, optionally joined with customer coordinates.
///
/// A city with several coordinate pairs in the customer table appears once
/// per pair.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CityStat {
    #[serde(rename = "City")]
    pub city: String,
    #[serde(rename = "Weight (Kg)")]
    pub weight_kg: f64,
    #[serde(rename = "Weight (Cubic)")]
    pub weight_cubic: f64,
    #[serde(rename = "Goods Value")]
    pub goods_value: f64,
    #[serde(rename = "Latitude")]
    pub latitude: Option<f64>,
    #[serde(rename = "Longitude")]
    pub longitude: Option<f64>,
    /// Distinct customers at this (city, latitude, longitude).
    #[serde(rename = "Customers")]
    pub customers: Option<usize>,
}
