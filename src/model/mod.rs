//! Profit regressor: the fit/predict contract, the ridge implementation and
//! artifact persistence.
//!
//! Everything outside this module addresses the regressor only through
//! [`FeatureSource`] rows and [`Regressor`], so the algorithm can change
//! without touching the pipeline or the scenario builder.

pub mod artifact;
pub mod ridge;

pub use artifact::{FORMAT_VERSION, ModelArtifact};
pub use ridge::RidgeRegressor;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::ModelError;
use crate::pipeline::types::FeatureRow;
use crate::pipeline::utility::mean;
use crate::schema::{self, FeatureSchema};

/// Name-based access to one input row.
pub trait FeatureSource {
    fn categorical(&self, column: &str) -> Option<&str>;
    fn numeric(&self, column: &str) -> Option<f64>;
}

impl<T: FeatureSource> FeatureSource for &T {
    fn categorical(&self, column: &str) -> Option<&str> {
        (**self).categorical(column)
    }

    fn numeric(&self, column: &str) -> Option<f64> {
        (**self).numeric(column)
    }
}

impl FeatureSource for FeatureRow {
    fn categorical(&self, column: &str) -> Option<&str> {
        (column == schema::TRUCK_TYPE).then(|| self.truck_type())
    }

    fn numeric(&self, column: &str) -> Option<f64> {
        self.value(column)
    }
}

pub trait Regressor: Sized {
    fn fit<R: FeatureSource>(
        schema: &FeatureSchema,
        rows: &[R],
        targets: &[f64],
        alpha: f64,
    ) -> Result<Self, ModelError>;

    /// One prediction per row, or [`ModelError::ShapeMismatch`] naming every
    /// column some row lacks.
    fn predict<R: FeatureSource>(&self, rows: &[R]) -> Result<Vec<f64>, ModelError>;
}

/// Goodness of fit on the held-out rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitMetrics {
    pub r2: f64,
    pub mae: f64,
    pub mse: f64,
    pub rmse: f64,
    pub train_rows: usize,
    pub test_rows: usize,
}

impl FitMetrics {
    pub fn evaluate(predicted: &[f64], actual: &[f64], train_rows: usize) -> Self {
        let errors: Vec<f64> = predicted.iter().zip(actual).map(|(p, a)| p - a).collect();
        let mae = mean(&errors.iter().map(|e| e.abs()).collect::<Vec<_>>());
        let mse = mean(&errors.iter().map(|e| e * e).collect::<Vec<_>>());

        let actual_mean = mean(actual);
        let total: f64 = actual.iter().map(|a| (a - actual_mean).powi(2)).sum();
        let residual: f64 = errors.iter().map(|e| e * e).sum();
        // A constant target gives r2 = 0 rather than a division by zero.
        let r2 = if total > 0.0 { 1.0 - residual / total } else { 0.0 };

        FitMetrics {
            r2,
            mae,
            mse,
            rmse: mse.sqrt(),
            train_rows,
            test_rows: actual.len(),
        }
    }
}

/// Splits off every `holdout_every`-th row for evaluation. Too few rows (or a
/// step below 2) means no holdout at all.
fn split_holdout<T>(rows: &[T], holdout_every: usize) -> (Vec<&T>, Vec<&T>) {
    if holdout_every < 2 || rows.len() < holdout_every {
        return (rows.iter().collect(), Vec::new());
    }
    let mut train = Vec::with_capacity(rows.len());
    let mut test = Vec::new();
    for (i, row) in rows.iter().enumerate() {
        if (i + 1) % holdout_every == 0 {
            test.push(row);
        } else {
            train.push(row);
        }
    }
    (train, test)
}

fn targets(schema: &FeatureSchema, rows: &[&FeatureRow]) -> Vec<f64> {
    rows.iter()
        .map(|r| r.value(&schema.target).unwrap_or(0.0))
        .collect()
}

/// Fits a ridge model on the feature table and packages it as an artifact.
#[tracing::instrument(skip(rows), fields(rows = rows.len()))]
pub fn train_model(
    schema: &FeatureSchema,
    rows: &[FeatureRow],
    alpha: f64,
    holdout_every: usize,
) -> Result<ModelArtifact, ModelError> {
    let (train, test) = split_holdout(rows, holdout_every);
    let train_targets = targets(schema, &train);
    let model = RidgeRegressor::fit(schema, &train, &train_targets, alpha)?;

    let metrics = if test.is_empty() {
        info!(train_rows = train.len(), "Too few rows for a holdout, metrics skipped");
        None
    } else {
        let predicted = model.predict(&test)?;
        let m = FitMetrics::evaluate(&predicted, &targets(schema, &test), train.len());
        info!(
            r2 = m.r2,
            mae = m.mae,
            mse = m.mse,
            rmse = m.rmse,
            train_rows = m.train_rows,
            test_rows = m.test_rows,
            "Model evaluated on holdout rows"
        );
        Some(m)
    };

    Ok(ModelArtifact::new(schema.clone(), model, metrics))
}
