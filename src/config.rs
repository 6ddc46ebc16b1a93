use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Runtime settings for loading the source tables and training the model.
///
/// Stored as a JSON object on disk, every key optional:
/// ```json
/// {
///   "data_dir": "data",
///   "costs_file": "fCosts.csv",
///   "cost_header_row": 2,
///   "model_path": "data/model_pipeline.json.gz",
///   "ridge_alpha": 1.0
/// }
/// ```
/// Environment variables (`FLEET_*`) override whatever the file provides.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub data_dir: PathBuf,
    pub vehicles_file: String,
    pub customers_file: String,
    pub costs_file: String,
    pub freight_file: String,
    /// Physical lines above the header of the cost export, blank lines
    /// included, the way a spreadsheet counts rows.
    pub cost_header_row: usize,
    pub model_path: PathBuf,
    pub ridge_alpha: f64,
    /// Every n-th feature row is held out to evaluate a freshly trained model.
    pub holdout_every: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            vehicles_file: "vehicles.csv".to_string(),
            customers_file: "customers.csv".to_string(),
            costs_file: "fCosts.csv".to_string(),
            freight_file: "fFreight.csv".to_string(),
            cost_header_row: 2,
            model_path: PathBuf::from("data/model_pipeline.json.gz"),
            ridge_alpha: 1.0,
            holdout_every: 5,
        }
    }
}

impl PipelineConfig {
    /// Loads the config from a JSON file at `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config: PipelineConfig = serde_json::from_str(&content)
            .with_context(|| format!("parsing config {}", path.display()))?;
        Ok(config)
    }

    /// Applies `FLEET_*` environment overrides on top of `self`.
    pub fn with_env_overrides(self) -> Result<Self> {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        if let Some(dir) = lookup("FLEET_DATA_DIR") {
            self.data_dir = PathBuf::from(dir);
        }
        if let Some(path) = lookup("FLEET_MODEL_PATH") {
            self.model_path = PathBuf::from(path);
        }
        if let Some(rows) = lookup("FLEET_COST_HEADER_ROW") {
            self.cost_header_row = rows
                .trim()
                .parse()
                .with_context(|| format!("FLEET_COST_HEADER_ROW={rows}"))?;
        }
        if let Some(alpha) = lookup("FLEET_RIDGE_ALPHA") {
            self.ridge_alpha = alpha
                .trim()
                .parse()
                .with_context(|| format!("FLEET_RIDGE_ALPHA={alpha}"))?;
        }
        if let Some(every) = lookup("FLEET_HOLDOUT_EVERY") {
            self.holdout_every = every
                .trim()
                .parse()
                .with_context(|| format!("FLEET_HOLDOUT_EVERY={every}"))?;
        }
        Ok(self)
    }

    pub fn vehicles_path(&self) -> PathBuf {
        self.data_dir.join(&self.vehicles_file)
    }

    pub fn customers_path(&self) -> PathBuf {
        self.data_dir.join(&self.customers_file)
    }

    pub fn costs_path(&self) -> PathBuf {
        self.data_dir.join(&self.costs_file)
    }

    pub fn freight_path(&self) -> PathBuf {
        self.data_dir.join(&self.freight_file)
    }
}
