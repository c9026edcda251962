//! Classifier port: probability-of-positive-class over a transformed row.
//!
//! Both the nonlinear risk model and the linear surrogate sit behind this
//! trait, so the pipeline never depends on how a model was fitted.

/// A fitted binary classifier.
///
/// Implementations must be pure: the same row always yields the same
/// probability, and shared references may be used from many threads.
pub trait Classifier: Send + Sync + std::fmt::Debug {
    /// Number of input columns the model was fitted on.
    fn n_features(&self) -> usize;

    /// Probability of the positive outcome.
    ///
    /// Callers guarantee `row.len() == self.n_features()`; the risk scorer
    /// checks this before calling.
    fn predict_proba(&self, row: &[f64]) -> f64;
}

/// A classifier whose decision function is `bias + Σ wᵢ·xᵢ`.
///
/// Exposing the coefficients is what makes closed-form attribution possible.
pub trait LinearClassifier: Classifier {
    fn weights(&self) -> &[f64];

    fn bias(&self) -> f64;
}
