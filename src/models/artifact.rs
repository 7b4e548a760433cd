use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::models::domain::RegionBands;

/// Price unit a regression model was trained to emit.
///
/// Newer training runs record this explicitly; legacy artifacts omit it and
/// rely on the interpreter's bounds-based disambiguation at prediction time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputUnit {
    TotalPrice,
    PerSquareFoot,
    PerSquareMeter,
    PerSquareFootMonthly,
}

/// Linear regression model restored from a training run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearModel {
    pub coefficients: Vec<f64>,
    pub intercept: f64,
}

impl LinearModel {
    /// Apply the model to an already-encoded feature vector.
    ///
    /// A vector shorter than the coefficient list contributes zero for the
    /// missing tail, matching the neutral-padding contract of the builder.
    pub fn predict(&self, features: &[f64]) -> f64 {
        let n = self.coefficients.len().min(features.len());
        self.intercept
            + self.coefficients[..n]
                .iter()
                .zip(&features[..n])
                .map(|(c, x)| c * x)
                .sum::<f64>()
    }
}

/// Serialized artifact shape: one combined model, or a map keyed by property
/// type. Normalized here at load time so downstream code never re-inspects
/// which shape it was given.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "format", rename_all = "snake_case")]
pub enum ModelArtifactFormat {
    Combined {
        model: LinearModel,
    },
    PerPropertyType {
        models: HashMap<String, LinearModel>,
        /// Sub-model used when the specific property type has no trained
        /// variant, e.g. "Office".
        #[serde(rename = "defaultType")]
        default_type: String,
    },
}

/// Per-column fill values recorded by the training pipeline for missing data
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Imputer {
    #[serde(rename = "fillValues")]
    pub fill_values: HashMap<String, f64>,
}

/// Performance metrics recorded at training time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelMetrics {
    #[serde(rename = "rSquared")]
    pub r_squared: f64,
    pub mae: f64,
    #[serde(rename = "trainingRows")]
    pub training_rows: u64,
}

/// Categorical column with the category labels seen at training time.
/// Dummy columns follow drop-first encoding: the first category has no
/// column of its own.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoricalColumn {
    pub name: String,
    pub categories: Vec<String>,
}

/// A persisted regression model plus the schema metadata needed to rebuild
/// its input feature vector at inference time. Loaded once per process and
/// shared read-only across all concurrent queries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelArtifact {
    #[serde(flatten)]
    pub format: ModelArtifactFormat,
    /// Exact post-encoding column names, in the order the model expects.
    #[serde(rename = "expectedFeatureNames")]
    pub expected_feature_names: Vec<String>,
    #[serde(rename = "categoricalColumns", default)]
    pub categorical_columns: Vec<CategoricalColumn>,
    #[serde(default)]
    pub imputer: Option<Imputer>,
    #[serde(default)]
    pub metrics: Option<ModelMetrics>,
    #[serde(rename = "outputUnit", default)]
    pub output_unit: Option<OutputUnit>,
    /// Band convention this artifact was trained with, when it differs from
    /// the configured default.
    #[serde(rename = "regionBands", default)]
    pub region_bands: Option<RegionBands>,
}

impl ModelArtifact {
    /// Resolve the model for a property type. For a per-type artifact this
    /// is the exact sub-model, falling back to the recorded default type;
    /// a combined artifact always answers with its single model.
    pub fn model_for(&self, property_type: &str) -> Option<&LinearModel> {
        match &self.format {
            ModelArtifactFormat::Combined { model } => Some(model),
            ModelArtifactFormat::PerPropertyType {
                models,
                default_type,
            } => models
                .get(property_type)
                .or_else(|| models.get(default_type)),
        }
    }

    /// The exact sub-model for a property type, without the default
    /// fallback. `None` for combined artifacts.
    pub fn exact_model_for(&self, property_type: &str) -> Option<&LinearModel> {
        match &self.format {
            ModelArtifactFormat::Combined { .. } => None,
            ModelArtifactFormat::PerPropertyType { models, .. } => models.get(property_type),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn linear(coeffs: Vec<f64>, intercept: f64) -> LinearModel {
        LinearModel {
            coefficients: coeffs,
            intercept,
        }
    }

    #[test]
    fn test_linear_predict() {
        let model = linear(vec![2.0, 3.0], 1.0);
        let y = model.predict(&[10.0, 100.0]);
        assert_eq!(y, 1.0 + 20.0 + 300.0);
    }

    #[test]
    fn test_linear_predict_short_vector_pads_zero() {
        let model = linear(vec![2.0, 3.0, 4.0], 1.0);
        let y = model.predict(&[10.0]);
        assert_eq!(y, 21.0);
    }

    #[test]
    fn test_per_type_fallback_to_default() {
        let mut models = HashMap::new();
        models.insert("Office".to_string(), linear(vec![1.0], 5.0));
        models.insert("Retail".to_string(), linear(vec![1.0], 9.0));

        let artifact = ModelArtifact {
            format: ModelArtifactFormat::PerPropertyType {
                models,
                default_type: "Office".to_string(),
            },
            expected_feature_names: vec!["area_sqft".to_string()],
            categorical_columns: vec![],
            imputer: None,
            metrics: None,
            output_unit: None,
            region_bands: None,
        };

        assert_eq!(artifact.model_for("Retail").unwrap().intercept, 9.0);
        // Unknown type falls back to the default sub-model
        assert_eq!(artifact.model_for("Medical Suite").unwrap().intercept, 5.0);
        assert!(artifact.exact_model_for("Medical Suite").is_none());
    }

    #[test]
    fn test_artifact_json_round_trip() {
        let artifact = ModelArtifact {
            format: ModelArtifactFormat::Combined {
                model: linear(vec![1.5], 100.0),
            },
            expected_feature_names: vec!["area_sqft".to_string()],
            categorical_columns: vec![CategoricalColumn {
                name: "region".to_string(),
                categories: vec!["Central Core".to_string(), "Rest Central".to_string()],
            }],
            imputer: None,
            metrics: None,
            output_unit: Some(OutputUnit::PerSquareFoot),
            region_bands: None,
        };

        let json = serde_json::to_string(&artifact).unwrap();
        let back: ModelArtifact = serde_json::from_str(&json).unwrap();
        assert_eq!(back, artifact);
        assert!(json.contains("\"format\":\"combined\""));
    }
}
