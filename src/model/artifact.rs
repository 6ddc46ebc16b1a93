use chrono::{DateTime, Utc};
use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;
use tracing::{debug, info};

use super::{FeatureSource, FitMetrics, Regressor, RidgeRegressor};
use crate::error::ModelError;
use crate::schema::{FeatureSchema, UNKNOWN_CATEGORY};

/// Bumped whenever the serialized layout changes.
pub const FORMAT_VERSION: u32 = 1;

/// A trained model together with the schema it was fitted against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub format_version: u32,
    pub trained_at: DateTime<Utc>,
    pub schema: FeatureSchema,
    pub model: RidgeRegressor,
    pub metrics: Option<FitMetrics>,
}

/// All-zero numerics and "Unknown" categoricals for every schema column.
struct ProbeRow<'a> {
    schema: &'a FeatureSchema,
}

impl FeatureSource for ProbeRow<'_> {
    fn categorical(&self, column: &str) -> Option<&str> {
        self.schema
            .categorical
            .iter()
            .any(|c| c == column)
            .then_some(UNKNOWN_CATEGORY)
    }

    fn numeric(&self, column: &str) -> Option<f64> {
        self.schema.numerical.iter().any(|c| c == column).then_some(0.0)
    }
}

impl ModelArtifact {
    pub fn new(schema: FeatureSchema, model: RidgeRegressor, metrics: Option<FitMetrics>) -> Self {
        Self {
            format_version: FORMAT_VERSION,
            trained_at: Utc::now(),
            schema,
            model,
            metrics,
        }
    }

    pub fn predict<R: FeatureSource>(&self, rows: &[R]) -> Result<Vec<f64>, ModelError> {
        self.model.predict(rows)
    }

    /// Writes the artifact as gzip-compressed JSON, creating parent
    /// directories as needed.
    pub fn save(&self, path: &Path) -> Result<(), ModelError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let file = File::create(path)?;
        let mut encoder = GzEncoder::new(BufWriter::new(file), Compression::default());
        serde_json::to_writer(&mut encoder, self)?;
        encoder.finish()?.flush()?;
        info!(path = %path.display(), "Model artifact saved");
        Ok(())
    }

    /// Reads an artifact. Every failure, including a version mismatch, is
    /// reported as [`ModelError::ArtifactUnavailable`].
    pub fn load(path: &Path) -> Result<Self, ModelError> {
        let unavailable = |reason: String| ModelError::ArtifactUnavailable {
            path: path.to_path_buf(),
            reason,
        };

        let file = File::open(path).map_err(|e| unavailable(e.to_string()))?;
        let decoder = GzDecoder::new(BufReader::new(file));
        let artifact: ModelArtifact =
            serde_json::from_reader(decoder).map_err(|e| unavailable(e.to_string()))?;

        if artifact.format_version != FORMAT_VERSION {
            return Err(unavailable(format!(
                "format version {} (expected {FORMAT_VERSION})",
                artifact.format_version
            )));
        }
        debug!(path = %path.display(), trained_at = %artifact.trained_at, "Model artifact loaded");
        Ok(artifact)
    }

    /// Runs one synthetic prediction to confirm the artifact can serve rows
    /// shaped like `schema`.
    pub fn sanity_check(&self, schema: &FeatureSchema) -> Result<(), ModelError> {
        if self.schema != *schema {
            return Err(ModelError::SanityCheck(
                "trained against a different feature schema".into(),
            ));
        }
        let prediction = self.predict(&[ProbeRow { schema }])?;
        match prediction.first() {
            Some(p) if p.is_finite() => Ok(()),
            Some(p) => Err(ModelError::SanityCheck(format!("non-finite prediction {p}"))),
            None => Err(ModelError::SanityCheck("no prediction returned".into())),
        }
    }
}
