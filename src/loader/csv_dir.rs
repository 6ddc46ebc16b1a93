use anyhow::{Context, Result};
use csv::ReaderBuilder;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::{RawTable, RawTables, TableSource};
use crate::config::PipelineConfig;

/// Reads the four source tables from CSV files.
#[derive(Debug, Clone)]
pub struct CsvDirSource {
    vehicles: PathBuf,
    customers: PathBuf,
    costs: PathBuf,
    freight: PathBuf,
    cost_header_row: usize,
}

impl CsvDirSource {
    pub fn new(config: &PipelineConfig) -> Self {
        Self {
            vehicles: config.vehicles_path(),
            customers: config.customers_path(),
            costs: config.costs_path(),
            freight: config.freight_path(),
            cost_header_row: config.cost_header_row,
        }
    }
}

impl TableSource for CsvDirSource {
    #[tracing::instrument(skip(self), fields(costs = %self.costs.display()))]
    fn load(&self) -> Result<RawTables> {
        let tables = RawTables {
            vehicles: read_csv_table(&self.vehicles, 0)?,
            customers: read_csv_table(&self.customers, 0)?,
            costs: read_csv_table(&self.costs, self.cost_header_row)?,
            freight: read_csv_table(&self.freight, 0)?,
        };

        info!(
            vehicles = tables.vehicles.len(),
            customers = tables.customers.len(),
            costs = tables.costs.len(),
            freight = tables.freight.len(),
            "Source tables loaded"
        );
        Ok(tables)
    }
}

/// Reads a CSV file into a [`RawTable`], skipping `skip_lines` physical
/// lines before the header row.
///
/// The preamble is cut before parsing because the CSV reader drops blank
/// lines, which would shift the header when counted as records. An empty
/// file yields an empty table with no columns.
pub fn read_csv_table(path: &Path, skip_lines: usize) -> Result<RawTable> {
    let content =
        fs::read_to_string(path).with_context(|| format!("opening {}", path.display()))?;
    let body = content
        .splitn(skip_lines + 1, '\n')
        .nth(skip_lines)
        .unwrap_or_default();

    let mut rdr = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(body.as_bytes());

    let mut records = rdr.records();

    let headers: Vec<String> = match records.next() {
        Some(record) => record
            .with_context(|| format!("reading header of {}", path.display()))?
            .iter()
            .map(str::to_string)
            .collect(),
        None => return Ok(RawTable::default()),
    };

    let mut rows = Vec::new();
    for result in records {
        let record = result.with_context(|| format!("reading {}", path.display()))?;
        rows.push(record.iter().map(str::to_string).collect());
    }

    debug!(path = %path.display(), columns = headers.len(), rows = rows.len(), "CSV table read");
    Ok(RawTable::new(headers, rows))
}
