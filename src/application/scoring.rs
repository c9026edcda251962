//! Scoring service: the "score and explain" use case.
//!
//! Pipeline per request:
//! 1. Resolve field aliases
//! 2. Transform once through the shared preprocessor
//! 3. Score with the risk model and assign a band
//! 4. Attribute with the selected explainer and rank
//!
//! Requests share nothing mutable, so one service can be used from any
//! number of threads.

use std::sync::Arc;

use super::model_store::ModelStore;
use crate::domain::{rank_attributions, FeatureVector, ScoreResponse};
use crate::{GlycoriskError, Result};

/// Service that scores and explains feature vectors.
#[derive(Debug, Clone)]
pub struct ScoringService {
    store: Arc<ModelStore>,
}

impl ScoringService {
    /// Create a service over a loaded store.
    #[must_use]
    pub fn new(store: Arc<ModelStore>) -> Self {
        Self { store }
    }

    #[must_use]
    pub fn store(&self) -> &Arc<ModelStore> {
        &self.store
    }

    /// Score one feature vector and explain the result.
    ///
    /// # Errors
    /// Returns `SchemaViolation` if the transformed row does not match the
    /// model width.
    pub fn score_and_explain(&self, row: &FeatureVector) -> Result<ScoreResponse> {
        let store = &self.store;
        let preprocessor = store.preprocessor();

        tracing::debug!(fields = row.len(), "Step 1: Normalizing field aliases");
        let normalized = preprocessor.normalize(row);

        tracing::debug!("Step 2: Transforming features");
        let x = preprocessor.transform(&normalized);
        let expected = store.risk_model().n_features();
        if x.len() != expected {
            return Err(GlycoriskError::SchemaViolation {
                expected,
                got: x.len(),
            });
        }

        tracing::debug!("Step 3: Scoring");
        let probability = store.risk_model().predict_proba(x.as_slice());
        let band = store.thresholds().classify(probability);

        tracing::debug!(explainer = %store.explainer().kind(), "Step 4: Attributing");
        let attributions = store.explainer().attribute(&x);
        let explanation =
            rank_attributions(&attributions, store.schema(), &normalized, store.top_k());

        tracing::debug!(band = %band, items = explanation.len(), "Scoring complete");

        Ok(ScoreResponse::new(
            probability,
            band,
            explanation,
            store.model_versions().clone(),
        ))
    }
}
