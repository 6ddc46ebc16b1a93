//! Raw source tables and the trait that supplies them.
//!
//! [`RawTable`] keeps every cell as the exported text so the cleaning rules in
//! [`crate::pipeline::normalize`] decide what a value means.
//! [`TableSource`] is the seam between the pipeline and wherever the four
//! tables come from; [`CsvDirSource`] reads them from a directory of CSVs.

mod csv_dir;

pub use csv_dir::{CsvDirSource, read_csv_table};

use anyhow::Result;

/// A header row plus string cells. Every row is padded to the header width.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawTable {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl RawTable {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        let headers: Vec<String> = headers
            .into_iter()
            .map(|h| h.trim_start_matches('\u{feff}').trim().to_string())
            .collect();
        let width = headers.len();
        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.resize(width, String::new());
                row
            })
            .collect();
        Self { headers, rows }
    }

    /// Builds a table from string slices. Mostly useful for fixtures.
    pub fn from_strs(headers: &[&str], rows: &[&[&str]]) -> Self {
        Self::new(
            headers.iter().map(|h| h.to_string()).collect(),
            rows.iter()
                .map(|row| row.iter().map(|c| c.to_string()).collect())
                .collect(),
        )
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// Cells of `name` in row order, or `None` when the column is absent.
    pub fn column(&self, name: &str) -> Option<Vec<&str>> {
        let idx = self.column_index(name)?;
        Some(self.rows.iter().map(|row| row[idx].as_str()).collect())
    }

    /// Cells of `name` as optional text: blank cells, the literal `nan` and
    /// an absent column all read as `None`.
    pub fn text_column(&self, name: &str) -> Vec<Option<String>> {
        match self.column(name) {
            Some(cells) => cells.into_iter().map(non_blank).collect(),
            None => vec![None; self.len()],
        }
    }

    /// A new table holding only the rows for which `keep` returns true.
    pub fn filter_rows(&self, keep: impl Fn(&[String]) -> bool) -> RawTable {
        RawTable {
            headers: self.headers.clone(),
            rows: self.rows.iter().filter(|r| keep(r)).cloned().collect(),
        }
    }
}

fn non_blank(cell: &str) -> Option<String> {
    let cell = cell.trim();
    if cell.is_empty() || cell.eq_ignore_ascii_case("nan") {
        None
    } else {
        Some(cell.to_string())
    }
}

/// The four tables the pipeline starts from.
#[derive(Debug, Clone, Default)]
pub struct RawTables {
    pub vehicles: RawTable,
    pub customers: RawTable,
    pub costs: RawTable,
    pub freight: RawTable,
}

/// Supplies the raw tables. Read once per dataset build.
pub trait TableSource: Send + Sync {
    fn load(&self) -> Result<RawTables>;
}

impl TableSource for RawTables {
    fn load(&self) -> Result<RawTables> {
        Ok(self.clone())
    }
}
