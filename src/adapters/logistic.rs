//! Logistic regression surrogate used for explanations.

use serde::{Deserialize, Serialize};

use crate::ports::{ArtifactError, Classifier, LinearClassifier};

/// Numerically stable logistic function.
#[inline]
pub(crate) fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}

/// Fitted linear classifier: `P(y=1) = σ(bias + w·x)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogisticSurrogate {
    weights: Vec<f64>,
    bias: f64,
}

impl LogisticSurrogate {
    /// # Errors
    /// Returns error if the weight vector is empty or the bias is not finite.
    pub fn new(weights: Vec<f64>, bias: f64) -> Result<Self, ArtifactError> {
        let model = Self { weights, bias };
        model.validate()?;
        Ok(model)
    }

    /// # Errors
    /// Returns error if the weight vector is empty or the bias is not finite.
    pub fn validate(&self) -> Result<(), ArtifactError> {
        if self.weights.is_empty() {
            return Err(ArtifactError::Malformed(
                "Surrogate model has no weights".into(),
            ));
        }
        if !self.bias.is_finite() {
            return Err(ArtifactError::Malformed(
                "Surrogate model bias is not finite".into(),
            ));
        }
        Ok(())
    }

    /// Log-odds of the positive class.
    #[must_use]
    pub fn decision_function(&self, row: &[f64]) -> f64 {
        self.weights
            .iter()
            .zip(row)
            .fold(self.bias, |z, (w, x)| z + w * x)
    }
}

impl Classifier for LogisticSurrogate {
    fn n_features(&self) -> usize {
        self.weights.len()
    }

    fn predict_proba(&self, row: &[f64]) -> f64 {
        sigmoid(self.decision_function(row))
    }
}

impl LinearClassifier for LogisticSurrogate {
    fn weights(&self) -> &[f64] {
        &self.weights
    }

    fn bias(&self) -> f64 {
        self.bias
    }
}
