//! L2-regularised linear regression over one-hot and standardised columns.

use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use super::{FeatureSource, Regressor};
use crate::error::ModelError;
use crate::pipeline::utility::finite_or_zero;
use crate::schema::FeatureSchema;

const MIN_SCALE: f64 = 1e-12;

/// Levels seen for one categorical column during fitting. Values outside
/// this set encode as all zeros.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OneHotColumn {
    pub column: String,
    pub levels: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScaledColumn {
    pub column: String,
    pub mean: f64,
    pub scale: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RidgeRegressor {
    pub alpha: f64,
    pub categorical: Vec<OneHotColumn>,
    pub numerical: Vec<ScaledColumn>,
    pub intercept: f64,
    /// One weight per encoded input, categorical blocks first.
    pub weights: Vec<f64>,
}

impl RidgeRegressor {
    fn width(&self) -> usize {
        self.categorical.iter().map(|c| c.levels.len()).sum::<usize>() + self.numerical.len()
    }

    /// Encodes one row, recording absent columns in `missing`.
    fn encode<R: FeatureSource>(&self, row: &R, missing: &mut BTreeSet<String>) -> Vec<f64> {
        let mut encoded = Vec::with_capacity(self.width());
        for col in &self.categorical {
            let value = row.categorical(&col.column);
            if value.is_none() {
                missing.insert(col.column.clone());
            }
            encoded.extend(
                col.levels
                    .iter()
                    .map(|level| if Some(level.as_str()) == value { 1.0 } else { 0.0 }),
            );
        }
        for col in &self.numerical {
            let value = match row.numeric(&col.column) {
                Some(v) => finite_or_zero(v),
                None => {
                    missing.insert(col.column.clone());
                    0.0
                }
            };
            encoded.push((value - col.mean) / col.scale);
        }
        encoded
    }

    /// Encodes every row into an `n × width` matrix.
    fn encode_all<R: FeatureSource>(&self, rows: &[R]) -> Result<DMatrix<f64>, ModelError> {
        let mut missing = BTreeSet::new();
        let flat: Vec<f64> = rows
            .iter()
            .flat_map(|r| self.encode(r, &mut missing))
            .collect();
        if missing.is_empty() {
            Ok(DMatrix::from_row_slice(rows.len(), self.width(), &flat))
        } else {
            Err(ModelError::ShapeMismatch {
                missing: missing.into_iter().collect(),
            })
        }
    }
}

fn missing_in<R: FeatureSource>(schema: &FeatureSchema, rows: &[R]) -> Vec<String> {
    let mut missing = BTreeSet::new();
    for row in rows {
        for col in &schema.categorical {
            if row.categorical(col).is_none() {
                missing.insert(col.clone());
            }
        }
        for col in &schema.numerical {
            if row.numeric(col).is_none() {
                missing.insert(col.clone());
            }
        }
    }
    missing.into_iter().collect()
}

impl Regressor for RidgeRegressor {
    fn fit<R: FeatureSource>(
        schema: &FeatureSchema,
        rows: &[R],
        targets: &[f64],
        alpha: f64,
    ) -> Result<Self, ModelError> {
        if rows.is_empty() {
            return Err(ModelError::EmptyTrainingSet);
        }
        if rows.len() != targets.len() {
            return Err(ModelError::Training(format!(
                "{} rows but {} targets",
                rows.len(),
                targets.len()
            )));
        }
        if !(alpha.is_finite() && alpha >= 0.0) {
            return Err(ModelError::Training(format!("invalid ridge alpha {alpha}")));
        }
        let missing = missing_in(schema, rows);
        if !missing.is_empty() {
            return Err(ModelError::ShapeMismatch { missing });
        }

        let categorical = schema
            .categorical
            .iter()
            .map(|column| {
                let levels: BTreeSet<&str> =
                    rows.iter().filter_map(|r| r.categorical(column)).collect();
                OneHotColumn {
                    column: column.clone(),
                    levels: levels.into_iter().map(str::to_string).collect(),
                }
            })
            .collect();

        let raw = DMatrix::from_fn(rows.len(), schema.numerical.len(), |i, j| {
            rows[i]
                .numeric(&schema.numerical[j])
                .map(finite_or_zero)
                .unwrap_or(0.0)
        });
        let numerical = schema
            .numerical
            .iter()
            .zip(raw.column_iter())
            .map(|(column, values)| {
                // Population variance, as a standard scaler uses.
                let std = values.variance().sqrt();
                ScaledColumn {
                    column: column.clone(),
                    mean: values.mean(),
                    scale: if std > MIN_SCALE { std } else { 1.0 },
                }
            })
            .collect();

        let mut model = RidgeRegressor {
            alpha,
            categorical,
            numerical,
            intercept: 0.0,
            weights: Vec::new(),
        };

        // Normal equations with a leading intercept column that is not penalised.
        let design = model.encode_all(rows)?.insert_column(0, 1.0);
        let y = DVector::from_iterator(targets.len(), targets.iter().copied().map(finite_or_zero));
        let mut gram = design.tr_mul(&design);
        for i in 1..gram.nrows() {
            gram[(i, i)] += alpha;
        }
        let rhs = design.tr_mul(&y);

        let solution = gram
            .lu()
            .solve(&rhs)
            .filter(|x| x.iter().all(|v| v.is_finite()))
            .ok_or_else(|| {
                ModelError::Training("normal equations are singular; increase ridge alpha".into())
            })?;
        model.intercept = solution[0];
        model.weights = solution.iter().skip(1).copied().collect();
        Ok(model)
    }

    fn predict<R: FeatureSource>(&self, rows: &[R]) -> Result<Vec<f64>, ModelError> {
        if self.weights.len() != self.width() {
            return Err(ModelError::Training(format!(
                "model has {} weights for {} encoded inputs",
                self.weights.len(),
                self.width()
            )));
        }
        let encoded = self.encode_all(rows)?;
        let weights = DVector::from_column_slice(&self.weights);
        let predicted = (encoded * weights).add_scalar(self.intercept);
        Ok(predicted.iter().copied().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    struct Row {
        kind: &'static str,
        values: HashMap<&'static str, f64>,
    }

    impl FeatureSource for Row {
        fn categorical(&self, column: &str) -> Option<&str> {
            (column == "kind").then_some(self.kind)
        }

        fn numeric(&self, column: &str) -> Option<f64> {
            self.values.get(column).copied()
        }
    }

    fn row(kind: &'static str, x: f64, flat: f64) -> Row {
        Row {
            kind,
            values: HashMap::from([("x", x), ("flat", flat)]),
        }
    }

    fn schema() -> FeatureSchema {
        FeatureSchema {
            categorical: vec!["kind".into()],
            numerical: vec!["x".into(), "flat".into()],
            target: "y".into(),
        }
    }

    #[test]
    fn test_recovers_linear_relationship() {
        // y = 3x + 10 for kind a, 3x + 20 for kind b
        let rows: Vec<Row> = (0..10)
            .map(|i| row(if i % 2 == 0 { "a" } else { "b" }, i as f64, 7.0))
            .collect();
        let targets: Vec<f64> = rows
            .iter()
            .map(|r| 3.0 * r.values["x"] + if r.kind == "a" { 10.0 } else { 20.0 })
            .collect();

        let model = RidgeRegressor::fit(&schema(), &rows, &targets, 1e-6).unwrap();
        let predicted = model.predict(&rows).unwrap();
        for (p, t) in predicted.iter().zip(&targets) {
            assert!((p - t).abs() < 1e-4, "{p} vs {t}");
        }
        // Constant column is scaled by 1, not by zero.
        assert_eq!(model.numerical[1].scale, 1.0);
    }

    #[test]
    fn test_unknown_level_encodes_as_zeros() {
        let rows = vec![row("a", 1.0, 0.0), row("b", 2.0, 0.0), row("a", 3.0, 0.0)];
        let model = RidgeRegressor::fit(&schema(), &rows, &[1.0, 2.0, 3.0], 1.0).unwrap();
        let predicted = model.predict(&[row("zzz", 2.0, 0.0)]).unwrap();
        assert!(predicted[0].is_finite());
    }

    #[test]
    fn test_missing_columns_are_named() {
        let rows = vec![row("a", 1.0, 0.0), row("b", 2.0, 0.0)];
        let model = RidgeRegressor::fit(&schema(), &rows, &[1.0, 2.0], 1.0).unwrap();
        let incomplete = Row {
            kind: "a",
            values: HashMap::new(),
        };
        match model.predict(&[incomplete]) {
            Err(ModelError::ShapeMismatch { missing }) => {
                assert_eq!(missing, vec!["flat".to_string(), "x".to_string()])
            }
            other => panic!("expected shape mismatch, got {other:?}"),
        }
    }

    #[test]
    fn test_zero_alpha_is_ordinary_least_squares() {
        let schema = FeatureSchema {
            categorical: Vec::new(),
            numerical: vec!["x".into()],
            target: "y".into(),
        };
        let rows: Vec<Row> = (0..6).map(|i| row("a", i as f64, 0.0)).collect();
        let targets: Vec<f64> = (0..6).map(|i| 2.0 * i as f64 + 1.0).collect();

        let model = RidgeRegressor::fit(&schema, &rows, &targets, 0.0).unwrap();
        assert!((model.intercept - 6.0).abs() < 1e-9, "{}", model.intercept);
        let predicted = model.predict(&[row("a", 10.0, 0.0)]).unwrap();
        assert!((predicted[0] - 21.0).abs() < 1e-9, "{}", predicted[0]);
    }

    #[test]
    fn test_singular_system_is_a_training_error() {
        // One level plus the intercept and constant columns leave no unique
        // solution without a penalty.
        let rows = vec![row("a", 7.0, 0.0), row("a", 7.0, 0.0)];
        assert!(matches!(
            RidgeRegressor::fit(&schema(), &rows, &[1.0, 2.0], 0.0),
            Err(ModelError::Training(_))
        ));
    }

    #[test]
    fn test_weight_count_must_match_encoding() {
        let rows = vec![row("a", 1.0, 0.0), row("b", 2.0, 0.0)];
        let mut model = RidgeRegressor::fit(&schema(), &rows, &[1.0, 2.0], 1.0).unwrap();
        model.weights.pop();
        assert!(matches!(model.predict(&rows), Err(ModelError::Training(_))));
    }

    #[test]
    fn test_empty_training_set() {
        let rows: Vec<Row> = Vec::new();
        assert!(matches!(
            RidgeRegressor::fit(&schema(), &rows, &[], 1.0),
            Err(ModelError::EmptyTrainingSet)
        ));
    }

    #[test]
    fn test_target_length_mismatch() {
        let rows = vec![row("a", 1.0, 0.0)];
        assert!(matches!(
            RidgeRegressor::fit(&schema(), &rows, &[1.0, 2.0], 1.0),
            Err(ModelError::Training(_))
        ));
    }
}
