//! Caller-facing error types.
//!
//! Malformed numbers, duplicated header rows and unmatched join keys never
//! reach this module: the pipeline recovers from them locally. What remains
//! are the failures a caller has to react to.

use std::path::PathBuf;
use thiserror::Error;

/// Scenario construction failures.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ScenarioError {
    /// The truck type never appeared in the training feature table, so there
    /// is no statistics row to seed the scenario from.
    #[error("unknown truck type '{0}': no training statistics to build a scenario from")]
    UnknownTruckType(String),
}

/// Model artifact and regressor failures.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("model artifact unavailable at {}: {reason}", path.display())]
    ArtifactUnavailable { path: PathBuf, reason: String },

    #[error("prediction input is missing required column(s): {}", missing.join(", "))]
    ShapeMismatch { missing: Vec<String> },

    #[error("model artifact failed its sanity check: {0}")]
    SanityCheck(String),

    #[error("cannot train a model on an empty feature table")]
    EmptyTrainingSet,

    #[error("model training failed: {0}")]
    Training(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Errors surfaced by [`crate::service::FleetService`].
#[derive(Debug, Error)]
pub enum FleetError {
    #[error(transparent)]
    Lookup(#[from] ScenarioError),

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error("failed to load source tables: {0:#}")]
    Source(anyhow::Error),

    #[error("model retraining failed: {0}")]
    Retrain(Box<FleetError>),
}
