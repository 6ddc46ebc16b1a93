//! Raw fleet tables to per-truck, per-trip feature table.
//!
//! Stages run in order, each consuming the full output of the previous one:
//! [`normalize`] cleans cells, [`join`] attaches the vehicle and customer
//! dimensions, [`aggregate`] sums to truck grain and divides by trip count,
//! [`features`] derives the ratio features. [`city`] is an independent branch
//! over the joined freight table for descriptive statistics.

pub mod aggregate;
pub mod city;
pub mod features;
pub mod join;
pub mod normalize;
pub mod types;
pub mod utility;

use tracing::info;

use crate::loader::RawTables;
use types::{CityStat, FeatureRow, FreightRow};

/// Everything the pipeline derives from one set of raw tables.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PipelineOutput {
    pub features: Vec<FeatureRow>,
    pub cities: Vec<CityStat>,
    /// The joined freight table, one row per trip.
    pub trips: Vec<FreightRow>,
}

/// Runs every stage over `tables`. The input is not modified.
#[tracing::instrument(skip_all)]
pub fn run(tables: &RawTables) -> PipelineOutput {
    let joined = join::join_sources(tables);
    let aggregates = aggregate::aggregate_trucks(&joined);
    let features = features::derive_features(aggregates);

    let customers = join::read_customers(&tables.customers);
    let cities = city::city_stats(&joined, &customers);

    info!(
        features = features.len(),
        cities = cities.len(),
        trips = joined.freight.len(),
        "Feature pipeline finished"
    );
    PipelineOutput {
        features,
        cities,
        trips: joined.freight,
    }
}
