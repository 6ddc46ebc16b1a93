//! Output formatting and persistence for the feature and city tables.
//!
//! CSV and JSON writers for the exported tables, plus the console rendering
//! used by the CLI (markdown tables, thousands-separated money).

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use num_format::{Locale, ToFormattedString};
use serde::Serialize;
use std::fs;
use std::path::Path;
use tabled::{Table, Tabled, settings::Style};
use tracing::info;

use crate::model::FeatureSource;
use crate::pipeline::types::{FeatureRow, FreightRow};
use crate::pipeline::utility::finite_or_zero;
use crate::schema::{self, FeatureSchema};
use crate::stats::{CityGoodsValue, CostProfile, Distribution, ScenarioDefaults};

const CURRENCY_SYMBOL: &str = "₹";

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating directory {}", parent.display()))?;
    }
    Ok(())
}

/// Writes serializable rows as CSV with a header row.
pub fn write_csv<T: Serialize>(path: &Path, rows: &[T]) -> Result<()> {
    ensure_parent(path)?;
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("creating {}", path.display()))?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    info!(path = %path.display(), rows = rows.len(), "CSV written");
    Ok(())
}

pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    ensure_parent(path)?;
    let json = serde_json::to_string_pretty(value)?;
    fs::write(path, json).with_context(|| format!("writing {}", path.display()))?;
    info!(path = %path.display(), "JSON written");
    Ok(())
}

/// Header of the exported feature table: identifying columns, then the
/// schema's inputs, then the target.
pub fn feature_table_header(schema: &FeatureSchema) -> Vec<&str> {
    [schema::TRUCK_ID, schema::PLATE, schema::NUM_TRIPS]
        .into_iter()
        .chain(schema.input_columns())
        .chain(std::iter::once(schema.target.as_str()))
        .collect()
}

/// Writes the feature table with exactly the columns the schema names.
pub fn write_feature_csv(path: &Path, schema: &FeatureSchema, rows: &[FeatureRow]) -> Result<()> {
    ensure_parent(path)?;
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("creating {}", path.display()))?;
    writer.write_record(feature_table_header(schema))?;

    for row in rows {
        let mut record = vec![
            row.key.truck_id.clone(),
            row.key.plate.clone(),
            row.trips.to_string(),
        ];
        record.extend(
            schema
                .categorical
                .iter()
                .map(|c| row.categorical(c).unwrap_or_default().to_string()),
        );
        record.extend(
            schema
                .numerical
                .iter()
                .chain(std::iter::once(&schema.target))
                .map(|c| row.numeric(c).unwrap_or_default().to_string()),
        );
        writer.write_record(&record)?;
    }
    writer.flush()?;
    info!(path = %path.display(), rows = rows.len(), "Feature table written");
    Ok(())
}

/// Columns of the exported trip table. `Year` is the trip/customer year and
/// `Truck Age` the vehicle's manufacture year.
pub const TRIP_TABLE_HEADER: [&str; 12] = [
    schema::TRUCK_ID,
    schema::CUSTOMER_ID,
    schema::DATE,
    schema::TRUCK_TYPE,
    schema::PLATE,
    schema::TRUCK_AGE,
    schema::YEAR,
    schema::CITY,
    schema::NET_REVENUE,
    schema::WEIGHT_KG,
    schema::WEIGHT_CUBIC,
    schema::GOODS_VALUE,
];

/// Writes the joined freight table, one row per trip.
pub fn write_trip_csv(path: &Path, rows: &[FreightRow]) -> Result<()> {
    ensure_parent(path)?;
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("creating {}", path.display()))?;
    writer.write_record(TRIP_TABLE_HEADER)?;

    for row in rows {
        let text = |v: &Option<String>| v.clone().unwrap_or_default();
        writer.write_record([
            text(&row.record.truck_id),
            text(&row.record.customer_id),
            row.record
                .date
                .map(|d| d.format("%Y-%m-%d").to_string())
                .unwrap_or_default(),
            text(&row.truck_type),
            text(&row.plate),
            text(&row.truck_age),
            text(&row.year),
            text(&row.city),
            row.record.net_revenue.to_string(),
            row.record.weight_kg.to_string(),
            row.record.weight_cubic.to_string(),
            row.record.goods_value.to_string(),
        ])?;
    }
    writer.flush()?;
    info!(path = %path.display(), rows = rows.len(), "Trip table written");
    Ok(())
}

/// Summary written next to the exported tables by `preprocess`.
#[derive(Debug, Clone, Serialize)]
pub struct DatasetSummary {
    pub generated_at: DateTime<Utc>,
    pub feature_rows: usize,
    pub city_rows: usize,
    pub trip_rows: usize,
    pub truck_types: Vec<CostProfile>,
}

/// Fixed decimals with `en` thousands separators, e.g. `-1,234.50`.
pub fn format_number(value: f64, decimals: usize) -> String {
    let value = finite_or_zero(value);
    let fixed = format!("{:.*}", decimals, value.abs());
    let (int_part, frac_part) = fixed.split_once('.').unwrap_or((fixed.as_str(), ""));

    let mut out = String::new();
    // No sign on values that round to zero.
    if value < 0.0 && fixed.bytes().any(|b| b.is_ascii_digit() && b != b'0') {
        out.push('-');
    }
    // Beyond u128 the digits are printed without separators.
    match int_part.parse::<u128>() {
        Ok(int_value) => out.push_str(&int_value.to_formatted_string(&Locale::en)),
        Err(_) => out.push_str(int_part),
    }
    if decimals > 0 {
        out.push('.');
        out.push_str(frac_part);
    }
    out
}

pub fn format_currency(value: f64) -> String {
    format!("{CURRENCY_SYMBOL} {}", format_number(value, 2))
}

pub fn format_count(n: usize) -> String {
    n.to_formatted_string(&Locale::en)
}

#[derive(Debug, Clone, Tabled)]
pub struct CostProfileLine {
    #[tabled(rename = "Truck Type")]
    pub truck_type: String,
    #[tabled(rename = "Trucks")]
    pub trucks: String,
    #[tabled(rename = "Costs per KM")]
    pub cost_per_km: String,
    #[tabled(rename = "Maintenance per KM")]
    pub maintenance_per_km: String,
    #[tabled(rename = "Fuel costs per KM")]
    pub fuel_cost_per_km: String,
    #[tabled(rename = "Fixed costs per KM")]
    pub fixed_cost_per_km: String,
}

impl From<&CostProfile> for CostProfileLine {
    fn from(p: &CostProfile) -> Self {
        Self {
            truck_type: p.truck_type.clone(),
            trucks: format_count(p.trucks),
            cost_per_km: format_number(p.cost_per_km, 2),
            maintenance_per_km: format_number(p.maintenance_per_km, 2),
            fuel_cost_per_km: format_number(p.fuel_cost_per_km, 2),
            fixed_cost_per_km: format_number(p.fixed_cost_per_km, 2),
        }
    }
}

#[derive(Debug, Clone, Tabled)]
pub struct DistributionLine {
    #[tabled(rename = "Truck Type")]
    pub truck_type: String,
    #[tabled(rename = "N")]
    pub count: String,
    #[tabled(rename = "Min")]
    pub min: String,
    #[tabled(rename = "Q1")]
    pub q1: String,
    #[tabled(rename = "Median")]
    pub median: String,
    #[tabled(rename = "Q3")]
    pub q3: String,
    #[tabled(rename = "Max")]
    pub max: String,
}

impl From<&Distribution> for DistributionLine {
    fn from(d: &Distribution) -> Self {
        Self {
            truck_type: d.truck_type.clone(),
            count: format_count(d.count),
            min: format_number(d.min, 2),
            q1: format_number(d.q1, 2),
            median: format_number(d.median, 2),
            q3: format_number(d.q3, 2),
            max: format_number(d.max, 2),
        }
    }
}

#[derive(Debug, Clone, Tabled)]
pub struct CityLine {
    #[tabled(rename = "Rank")]
    pub rank: usize,
    #[tabled(rename = "City")]
    pub city: String,
    #[tabled(rename = "Goods Value")]
    pub goods_value: String,
}

pub fn city_lines(top: &[CityGoodsValue]) -> Vec<CityLine> {
    top.iter()
        .enumerate()
        .map(|(i, c)| CityLine {
            rank: i + 1,
            city: c.city.clone(),
            goods_value: format_currency(c.goods_value as f64),
        })
        .collect()
}

#[derive(Debug, Clone, Tabled)]
pub struct DefaultsLine {
    #[tabled(rename = "Truck Type")]
    pub truck_type: String,
    #[tabled(rename = "KM Traveled")]
    pub distance_km: String,
    #[tabled(rename = "Weight (Kg)")]
    pub weight_kg: String,
    #[tabled(rename = "Weight (Cubic)")]
    pub weight_cubic: String,
    #[tabled(rename = "Goods Value")]
    pub goods_value: String,
}

impl From<&ScenarioDefaults> for DefaultsLine {
    fn from(d: &ScenarioDefaults) -> Self {
        Self {
            truck_type: d.truck_type.clone(),
            distance_km: format_number(d.distance_km, 1),
            weight_kg: format_number(d.weight_kg, 1),
            weight_cubic: format_number(d.weight_cubic, 2),
            goods_value: format_currency(d.goods_value),
        }
    }
}

/// Renders rows as a markdown table, or a placeholder when there are none.
pub fn render_table<T: Tabled>(rows: Vec<T>) -> String {
    if rows.is_empty() {
        return "(no rows)".to_string();
    }
    Table::new(rows).with(Style::markdown()).to_string()
}

pub fn print_table<T: Tabled>(title: &str, rows: Vec<T>) {
    println!("\n{title}\n");
    println!("{}\n", render_table(rows));
}
