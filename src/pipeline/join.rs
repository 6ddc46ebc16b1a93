//! Cleans the raw fact tables and joins them to the vehicle and customer
//! dimensions.
//!
//! Both joins are left outer joins: a fact row always survives, with the
//! dimension side left empty when no key matches. Only the truck-grain
//! aggregation downstream drops rows.

use std::collections::HashMap;
use tracing::{debug, info};

use super::normalize::{
    NumericRule, date_column, integer_column, numeric_column, optional_number,
};
use super::types::{
    CostRecord, CostRow, CustomerDim, FreightRecord, FreightRow, JoinedTables, VehicleDim,
};
use crate::loader::{RawTable, RawTables};
use crate::schema;

/// Freight revenue is exported in thousands.
pub const NET_REVENUE_SCALE: f64 = 1000.0;

/// Trims a natural key and reduces spreadsheet float renderings (`"12.0"`)
/// to their integer form.
pub fn normalize_key(cell: Option<String>) -> Option<String> {
    let cell = cell?;
    let trimmed = cell.trim();
    if trimmed.is_empty() {
        return None;
    }
    match trimmed.strip_suffix(".0") {
        Some(int) if !int.is_empty() && int.bytes().all(|b| b.is_ascii_digit()) => {
            Some(int.to_string())
        }
        _ => Some(trimmed.to_string()),
    }
}

fn key_column(table: &RawTable, name: &str) -> Vec<Option<String>> {
    table
        .text_column(name)
        .into_iter()
        .map(normalize_key)
        .collect()
}

/// Drops data rows whose distance cell repeats the column label, which the
/// cost export emits when several sheets are concatenated.
pub fn remove_repeated_headers(costs: &RawTable) -> RawTable {
    let Some(idx) = costs.column_index(schema::DISTANCE_KM) else {
        return costs.clone();
    };
    let cleaned = costs.filter_rows(|row| row[idx].trim() != schema::DISTANCE_KM);
    let removed = costs.len() - cleaned.len();
    if removed > 0 {
        info!(removed, "Removed repeated header rows from cost table");
    }
    cleaned
}

/// Cleans the cost table. Cost figures already use point decimals.
pub fn clean_costs(table: &RawTable) -> Vec<CostRecord> {
    let table = remove_repeated_headers(table);

    let truck_ids = key_column(&table, schema::TRUCK_ID);
    let truck_types = table.text_column(schema::TRUCK_TYPE);
    let plates = table.text_column(schema::PLATE);
    let dates = date_column(&table, schema::DATE);
    let km = integer_column(&table, schema::DISTANCE_KM, NumericRule::PLAIN);
    let liters = numeric_column(&table, schema::LITERS, NumericRule::PLAIN);
    let fuel = numeric_column(&table, schema::FUEL, NumericRule::PLAIN);
    let maintenance = numeric_column(&table, schema::MAINTENANCE, NumericRule::PLAIN);
    let fixed = numeric_column(&table, schema::FIXED_COSTS, NumericRule::PLAIN);

    truck_ids
        .into_iter()
        .zip(truck_types)
        .zip(plates)
        .enumerate()
        .map(|(i, ((truck_id, truck_type), plate))| CostRecord {
            truck_id,
            truck_type,
            plate,
            date: dates[i],
            km_traveled: km[i],
            liters: liters[i],
            fuel: fuel[i],
            maintenance: maintenance[i],
            fixed_costs: fixed[i],
        })
        .collect()
}

/// Cleans the freight table: decimal commas for revenue and weights,
/// thousands commas for goods value, revenue rescaled to currency units.
pub fn clean_freight(table: &RawTable) -> Vec<FreightRecord> {
    let truck_ids = key_column(table, schema::TRUCK_ID);
    let customer_ids = key_column(table, schema::CUSTOMER_ID);
    let truck_types = table.text_column(schema::TRUCK_TYPE);
    let plates = table.text_column(schema::PLATE);
    let years = table.text_column(schema::YEAR);
    let cities = table.text_column(schema::CITY);
    let dates = date_column(table, schema::DATE);
    let revenue = numeric_column(table, schema::NET_REVENUE, NumericRule::DECIMAL_COMMA);
    let weight_kg = numeric_column(table, schema::WEIGHT_KG, NumericRule::DECIMAL_COMMA);
    let weight_cubic = numeric_column(table, schema::WEIGHT_CUBIC, NumericRule::DECIMAL_COMMA);
    let goods_value = numeric_column(table, schema::GOODS_VALUE, NumericRule::THOUSANDS_COMMA);

    (0..table.len())
        .map(|i| FreightRecord {
            truck_id: truck_ids[i].clone(),
            customer_id: customer_ids[i].clone(),
            truck_type: truck_types[i].clone(),
            plate: plates[i].clone(),
            date: dates[i],
            year: years[i].clone(),
            city: cities[i].clone(),
            net_revenue: revenue[i] * NET_REVENUE_SCALE,
            weight_kg: weight_kg[i],
            weight_cubic: weight_cubic[i],
            goods_value: goods_value[i],
        })
        .collect()
}

/// Reads the vehicle dimension. Rows without a truck identifier cannot be
/// joined and are skipped.
pub fn read_vehicles(table: &RawTable) -> Vec<VehicleDim> {
    let ids = key_column(table, schema::TRUCK_ID);
    let types = table.text_column(schema::TRUCK_TYPE);
    let plates = table.text_column(schema::PLATE);
    let years = table.text_column(schema::YEAR);
    let cities = table.text_column(schema::CITY);

    ids.into_iter()
        .enumerate()
        .filter_map(|(i, id)| {
            Some(VehicleDim {
                truck_id: id?,
                truck_type: types[i].clone(),
                plate: plates[i].clone(),
                year: years[i].clone(),
                city: cities[i].clone(),
            })
        })
        .collect()
}

/// Reads the customer dimension. Rows without a customer identifier are
/// skipped.
pub fn read_customers(table: &RawTable) -> Vec<CustomerDim> {
    let ids = key_column(table, schema::CUSTOMER_ID);
    let cities = table.text_column(schema::CITY);
    let years = table.text_column(schema::YEAR);
    let coordinate = |name: &str| -> Vec<Option<f64>> {
        match table.column(name) {
            Some(cells) => cells
                .into_iter()
                .map(|c| optional_number(c, NumericRule::DECIMAL_COMMA))
                .collect(),
            None => vec![None; table.len()],
        }
    };
    let latitudes = coordinate(schema::LATITUDE);
    let longitudes = coordinate(schema::LONGITUDE);

    ids.into_iter()
        .enumerate()
        .filter_map(|(i, id)| {
            Some(CustomerDim {
                customer_id: id?,
                city: cities[i].clone(),
                latitude: latitudes[i],
                longitude: longitudes[i],
                year: years[i].clone(),
            })
        })
        .collect()
}

/// Relational left outer join.
///
/// Every left row appears at least once: once per matching right row, or once
/// paired with `None`. Left rows without a key never match.
pub fn left_join<'a, L, R>(
    left: &'a [L],
    right: &'a [R],
    left_key: impl Fn(&L) -> Option<&str>,
    right_key: impl Fn(&R) -> &str,
) -> Vec<(&'a L, Option<&'a R>)> {
    let mut index: HashMap<&str, Vec<&R>> = HashMap::new();
    for r in right {
        index.entry(right_key(r)).or_default().push(r);
    }

    let mut joined = Vec::with_capacity(left.len());
    for l in left {
        match left_key(l).and_then(|k| index.get(k)) {
            Some(matches) => joined.extend(matches.iter().map(|r| (l, Some(*r)))),
            None => joined.push((l, None)),
        }
    }
    joined
}

/// Cleans all four tables and produces the joined cost-side and freight-side
/// tables.
#[tracing::instrument(skip_all)]
pub fn join_sources(tables: &RawTables) -> JoinedTables {
    let vehicles = read_vehicles(&tables.vehicles);
    let customers = read_customers(&tables.customers);
    let costs = clean_costs(&tables.costs);
    let freight = clean_freight(&tables.freight);

    // City can come from the freight/vehicle side or from the customer side;
    // when the former exists it shadows the latter.
    let left_has_city =
        tables.freight.has_column(schema::CITY) || tables.vehicles.has_column(schema::CITY);
    let has_city = left_has_city || tables.customers.has_column(schema::CITY);

    let freight_vehicles = left_join(
        &freight,
        &vehicles,
        |f| f.truck_id.as_deref(),
        |v| v.truck_id.as_str(),
    );
    let unmatched_vehicles = freight_vehicles.iter().filter(|(_, v)| v.is_none()).count();

    let freight_customers = left_join(
        &freight_vehicles,
        &customers,
        |(f, _)| f.customer_id.as_deref(),
        |c| c.customer_id.as_str(),
    );
    let unmatched_customers = freight_customers.iter().filter(|(_, c)| c.is_none()).count();

    let freight_rows: Vec<FreightRow> = freight_customers
        .into_iter()
        .map(|(&(record, vehicle), customer)| {
            let left_city = record
                .city
                .clone()
                .or_else(|| vehicle.and_then(|v| v.city.clone()));
            let city = if left_has_city {
                left_city
            } else {
                customer.and_then(|c| c.city.clone())
            };

            FreightRow {
                record: record.clone(),
                truck_type: vehicle
                    .and_then(|v| v.truck_type.clone())
                    .or_else(|| record.truck_type.clone()),
                plate: vehicle
                    .and_then(|v| v.plate.clone())
                    .or_else(|| record.plate.clone()),
                truck_age: vehicle.and_then(|v| v.year.clone()),
                year: record
                    .year
                    .clone()
                    .or_else(|| customer.and_then(|c| c.year.clone())),
                city,
            }
        })
        .collect();

    let cost_vehicles = left_join(
        &costs,
        &vehicles,
        |c| c.truck_id.as_deref(),
        |v| v.truck_id.as_str(),
    );
    let unmatched_cost_vehicles = cost_vehicles.iter().filter(|(_, v)| v.is_none()).count();

    let cost_rows: Vec<CostRow> = cost_vehicles
        .into_iter()
        .map(|(record, vehicle)| CostRow {
            record: record.clone(),
            truck_type: vehicle
                .and_then(|v| v.truck_type.clone())
                .or_else(|| record.truck_type.clone()),
            plate: vehicle
                .and_then(|v| v.plate.clone())
                .or_else(|| record.plate.clone()),
        })
        .collect();

    debug!(
        unmatched_vehicles,
        unmatched_customers,
        unmatched_cost_vehicles,
        "Dimension rows missing for join keys"
    );
    info!(
        cost_rows = cost_rows.len(),
        freight_rows = freight_rows.len(),
        has_city,
        "Sources joined"
    );

    JoinedTables {
        costs: cost_rows,
        freight: freight_rows,
        has_city,
    }
}
