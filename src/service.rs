//! Memoized dataset and model behind one serving facade.
//!
//! [`FleetService`] builds the feature table once, loads or trains the model
//! once, and answers scenario requests against both. A missing or unusable
//! model artifact triggers a single retrain from the loaded tables; if that
//! retrain fails too, the error is returned to the caller.

use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{error, info, warn};

use crate::cache::Memo;
use crate::config::PipelineConfig;
use crate::error::FleetError;
use crate::loader::TableSource;
use crate::model::{FeatureSource, ModelArtifact, train_model};
use crate::pipeline::types::{CityStat, FeatureRow, FreightRow};
use crate::pipeline::{self, PipelineOutput};
use crate::scenario::{ScenarioRequest, TruckTypeMeans, build_scenario};
use crate::schema::FeatureSchema;

/// The pipeline output plus the per-type means scenarios are seeded from.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    pub features: Vec<FeatureRow>,
    pub cities: Vec<CityStat>,
    pub trips: Vec<FreightRow>,
    pub means: TruckTypeMeans,
}

impl From<PipelineOutput> for Dataset {
    fn from(output: PipelineOutput) -> Self {
        Self {
            means: TruckTypeMeans::from_features(&output.features),
            features: output.features,
            cities: output.cities,
            trips: output.trips,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Profitability {
    Profitable,
    Unprofitable,
}

impl Profitability {
    pub fn from_prediction(net_profit: f64) -> Self {
        if net_profit > 0.0 {
            Profitability::Profitable
        } else {
            Profitability::Unprofitable
        }
    }
}

impl fmt::Display for Profitability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Profitability::Profitable => write!(f, "profitable"),
            Profitability::Unprofitable => write!(f, "not profitable"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScenarioOutcome {
    pub truck_type: String,
    pub predicted_net_profit: f64,
    pub verdict: Profitability,
}

pub struct FleetService<S> {
    source: S,
    config: PipelineConfig,
    schema: FeatureSchema,
    dataset: Memo<Dataset>,
    model: Memo<ModelArtifact>,
    retrains: AtomicUsize,
}

impl<S: TableSource> FleetService<S> {
    pub fn new(source: S, config: PipelineConfig) -> Self {
        Self {
            source,
            config,
            schema: FeatureSchema::standard(),
            dataset: Memo::new(),
            model: Memo::new(),
            retrains: AtomicUsize::new(0),
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    /// The feature table, city statistics and type means, built on first use.
    #[tracing::instrument(skip(self))]
    pub fn dataset(&self) -> Result<Arc<Dataset>, FleetError> {
        self.dataset.get_or_try_init(|| {
            let tables = self.source.load().map_err(FleetError::Source)?;
            let dataset = Dataset::from(pipeline::run(&tables));
            info!(
                features = dataset.features.len(),
                truck_types = dataset.means.len(),
                "Dataset ready"
            );
            Ok::<_, FleetError>(dataset)
        })
    }

    /// The serving model: the persisted artifact if it loads and passes the
    /// sanity check, otherwise a freshly trained one.
    pub fn get_pipeline(&self) -> Result<Arc<ModelArtifact>, FleetError> {
        self.model.get_or_try_init(|| self.load_or_retrain())
    }

    /// Trains on the current dataset, persists the artifact and serves it
    /// from now on.
    #[tracing::instrument(skip(self))]
    pub fn retrain(&self) -> Result<Arc<ModelArtifact>, FleetError> {
        let artifact = self.train_and_persist()?;
        Ok(self.model.replace(artifact))
    }

    /// Drops the cached dataset and model. The next request rebuilds both.
    pub fn invalidate(&self) {
        self.dataset.invalidate();
        self.model.invalidate();
        info!("Cached dataset and model invalidated");
    }

    /// How many times a model has been trained by this service.
    pub fn retrain_count(&self) -> usize {
        self.retrains.load(Ordering::SeqCst)
    }

    pub fn truck_types(&self) -> Result<Vec<String>, FleetError> {
        Ok(self
            .dataset()?
            .means
            .truck_types()
            .map(str::to_string)
            .collect())
    }

    /// Predicts net profit for one scenario. The truck type is validated
    /// before any model is loaded.
    #[tracing::instrument(skip(self), fields(truck_type = %request.truck_type))]
    pub fn predict_scenario(
        &self,
        request: &ScenarioRequest,
    ) -> Result<ScenarioOutcome, FleetError> {
        let dataset = self.dataset()?;
        let row = build_scenario(request, &dataset.means)?;
        let model = self.get_pipeline()?;

        let prediction = model
            .predict(&[&row])?
            .first()
            .copied()
            .unwrap_or_default();
        let verdict = Profitability::from_prediction(prediction);
        info!(prediction, %verdict, "Scenario predicted");

        Ok(ScenarioOutcome {
            truck_type: request.truck_type.clone(),
            predicted_net_profit: prediction,
            verdict,
        })
    }

    /// Scores caller-built rows with the serving model, one prediction per
    /// row. Rows lacking a column the model needs are rejected with the
    /// column names.
    pub fn predict_rows<R: FeatureSource>(&self, rows: &[R]) -> Result<Vec<f64>, FleetError> {
        let model = self.get_pipeline()?;
        Ok(model.predict(rows)?)
    }

    fn load_or_retrain(&self) -> Result<ModelArtifact, FleetError> {
        let path = &self.config.model_path;
        let loaded = ModelArtifact::load(path)
            .and_then(|artifact| artifact.sanity_check(&self.schema).map(|()| artifact));

        match loaded {
            Ok(artifact) => {
                info!(path = %path.display(), "Using persisted model");
                Ok(artifact)
            }
            Err(e) => {
                warn!(error = %e, "Persisted model unusable, retraining");
                self.train_and_persist()
                    .map_err(|e| FleetError::Retrain(Box::new(e)))
            }
        }
    }

    fn train_and_persist(&self) -> Result<ModelArtifact, FleetError> {
        self.retrains.fetch_add(1, Ordering::SeqCst);
        let dataset = self.dataset()?;
        let artifact = train_model(
            &self.schema,
            &dataset.features,
            self.config.ridge_alpha,
            self.config.holdout_every,
        )?;

        // The fresh model is served even when it cannot be written out.
        if let Err(e) = artifact.save(&self.config.model_path) {
            error!(
                error = %e,
                path = %self.config.model_path.display(),
                "Failed to persist model artifact"
            );
        }
        Ok(artifact)
    }
}
