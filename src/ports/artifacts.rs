//! Artifact port: where the fitted models and their metadata come from.
//!
//! The training job is a black box; this trait is its boundary. The default
//! adapter reads a directory of JSON files.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::classifier::{Classifier, LinearClassifier};
use crate::domain::{BackgroundSample, FieldAlias, FittedPreprocessor, RiskBandThresholds};

/// Errors raised while loading model artifacts.
#[derive(Debug, thiserror::Error)]
pub enum ArtifactError {
    #[error("Artifact not found: {0}")]
    NotFound(String),

    #[error("Failed to read artifact: {0}")]
    Read(String),

    #[error("Malformed artifact: {0}")]
    Malformed(String),

    #[error("Artifact integrity check failed: {0}")]
    Integrity(String),
}

fn default_model_versions() -> BTreeMap<String, String> {
    let mut versions = BTreeMap::new();
    versions.insert("gradient_boosting".to_string(), "v1.0".to_string());
    versions.insert("logistic_regression".to_string(), "v1.0".to_string());
    versions
}

fn default_aliases() -> Vec<FieldAlias> {
    vec![FieldAlias::cardiovascular_history()]
}

/// Training metadata: column order, band cuts and version labels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelMetadata {
    /// Feature names in training order
    pub features: Vec<String>,

    pub risk_bands: RiskBandThresholds,

    #[serde(default = "default_model_versions")]
    pub model_versions: BTreeMap<String, String>,

    #[serde(default = "default_aliases")]
    pub aliases: Vec<FieldAlias>,
}

impl ModelMetadata {
    #[must_use]
    pub fn new(features: Vec<String>, risk_bands: RiskBandThresholds) -> Self {
        Self {
            features,
            risk_bands,
            model_versions: default_model_versions(),
            aliases: default_aliases(),
        }
    }
}

/// Source of the fitted artifacts produced by training.
pub trait ArtifactSource: Send + Sync {
    /// Human-readable location, used in log lines.
    fn describe(&self) -> String;

    /// # Errors
    /// Returns error if the metadata is missing or malformed.
    fn load_metadata(&self) -> Result<ModelMetadata, ArtifactError>;

    /// # Errors
    /// Returns error if the preprocessor is missing or malformed.
    fn load_preprocessor(&self) -> Result<FittedPreprocessor, ArtifactError>;

    /// The nonlinear model behind the headline score.
    ///
    /// # Errors
    /// Returns error if the model is missing or malformed.
    fn load_risk_model(&self) -> Result<Arc<dyn Classifier>, ArtifactError>;

    /// The linear model used only for explanations.
    ///
    /// # Errors
    /// Returns error if the model is missing or malformed.
    fn load_surrogate(&self) -> Result<Arc<dyn LinearClassifier>, ArtifactError>;

    /// The transformed background sample, `None` when none was persisted.
    ///
    /// # Errors
    /// Returns error if a background exists but cannot be read.
    fn load_background(&self) -> Result<Option<BackgroundSample>, ArtifactError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metadata_defaults() {
        let meta: ModelMetadata = serde_json::from_str(
            r#"{"features": ["age", "gender"], "risk_bands": {"low": 0.2, "high": 0.5}}"#,
        )
        .expect("Should parse");

        assert_eq!(meta.features, vec!["age", "gender"]);
        assert_eq!(meta.risk_bands.low, 0.2);
        assert_eq!(meta.model_versions["gradient_boosting"], "v1.0");
        assert_eq!(meta.model_versions["logistic_regression"], "v1.0");
        assert_eq!(meta.aliases[0].canonical, "cvd");
    }
}
