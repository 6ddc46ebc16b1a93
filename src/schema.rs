//! Column names shared by every stage, and the feature-table contract.
//!
//! The raw column labels follow the source exports verbatim. The
//! [`FeatureSchema`] value is built once and handed by reference to the
//! stages that address columns by name (model fitting, prediction, export)
//! so they cannot drift apart.

use serde::{Deserialize, Serialize};

// Identifiers
pub const TRUCK_ID: &str = "Truck ID";
pub const CUSTOMER_ID: &str = "Customer ID";
pub const DATE: &str = "Date";
pub const PLATE: &str = "Plate";
pub const NUM_TRIPS: &str = "Num Trips";

// Dimension attributes
pub const TRUCK_TYPE: &str = "Truck Type";
pub const YEAR: &str = "Year";
pub const TRUCK_AGE: &str = "Truck Age";
pub const CITY: &str = "City";
pub const LATITUDE: &str = "Latitude";
pub const LONGITUDE: &str = "Longitude";

// Raw numeric columns
pub const DISTANCE_KM: &str = "KM Traveled";
pub const LITERS: &str = "Liters";
pub const FUEL: &str = "Fuel";
pub const MAINTENANCE: &str = "Maintenance";
pub const FIXED_COSTS: &str = "Fixed Costs";
pub const NET_REVENUE: &str = "Net Revenue";
pub const WEIGHT_KG: &str = "Weight (Kg)";
pub const WEIGHT_CUBIC: &str = "Weight (Cubic)";
pub const GOODS_VALUE: &str = "Goods Value";

// Derived columns
pub const KM_PER_LITER: &str = "KM per Liter";
pub const MAINTENANCE_PER_KM: &str = "Maintenance per KM";
pub const TOTAL_COST: &str = "Total Costs";
pub const COST_PER_KM: &str = "Costs per KM";
pub const COST_PER_KG: &str = "Costs per kg";
pub const REVENUE_PER_KM: &str = "Revenue per KM";
pub const REVENUE_PER_KG: &str = "Revenue per kg";
pub const FUEL_COST_PER_KM: &str = "Fuel costs per KM";
pub const FIXED_COST_PER_KM: &str = "Fixed costs per KM";
pub const NET_PROFIT: &str = "Net Profit";

/// Categorical value used when the model is probed with a synthetic row.
pub const UNKNOWN_CATEGORY: &str = "Unknown";

/// Column contract between the feature pipeline and the regressor.
///
/// Changing the column set invalidates every persisted model artifact, which
/// is why artifacts embed the schema they were trained with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureSchema {
    pub categorical: Vec<String>,
    pub numerical: Vec<String>,
    pub target: String,
}

impl FeatureSchema {
    /// The feature table produced by [`crate::pipeline::run`].
    pub fn standard() -> Self {
        let numerical = [
            DISTANCE_KM,
            LITERS,
            FUEL,
            MAINTENANCE,
            FIXED_COSTS,
            NET_REVENUE,
            WEIGHT_KG,
            WEIGHT_CUBIC,
            GOODS_VALUE,
            KM_PER_LITER,
            MAINTENANCE_PER_KM,
            TOTAL_COST,
            COST_PER_KM,
            COST_PER_KG,
            REVENUE_PER_KM,
            REVENUE_PER_KG,
            FUEL_COST_PER_KM,
            FIXED_COST_PER_KM,
        ];

        Self {
            categorical: vec![TRUCK_TYPE.to_string()],
            numerical: numerical.iter().map(|c| c.to_string()).collect(),
            target: NET_PROFIT.to_string(),
        }
    }

    /// Every column the regressor reads, categorical first.
    pub fn input_columns(&self) -> impl Iterator<Item = &str> {
        self.categorical
            .iter()
            .chain(self.numerical.iter())
            .map(String::as_str)
    }
}

impl Default for FeatureSchema {
    fn default() -> Self {
        Self::standard()
    }
}
