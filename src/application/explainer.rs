//! Feature attribution against a background sample.
//!
//! Two attributors share one output contract (a signed value per transformed
//! column, positive meaning "pushes toward the positive class"):
//!
//! - [`LinearAttributor`]: exact closed form for a linear surrogate,
//!   `w_i · (x_i − mean_bg_i)` in log-odds space.
//! - [`SamplingAttributor`]: model-agnostic permutation-sampling Shapley
//!   estimate on the surrogate's probability. Seeded, so repeated calls are
//!   bit-identical.
//!
//! [`Explainer`] picks one at store construction and never changes.

use std::fmt;
use std::sync::Arc;

use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;

use crate::config::{DEFAULT_SAMPLING_PERMUTATIONS, DEFAULT_SAMPLING_SEED};
use crate::domain::{BackgroundSample, TransformedVector};
use crate::ports::LinearClassifier;

/// Reasons an attributor cannot be built.
#[derive(Debug, thiserror::Error)]
pub enum ExplainError {
    #[error("Background sample is unusable: {0}")]
    Background(String),

    #[error("Surrogate expects {expected} features, background has {got}")]
    WidthMismatch { expected: usize, got: usize },

    #[error("Surrogate weights contain non-finite values")]
    NonFiniteWeights,

    #[error("No usable background rows remain")]
    NoUsableBackground,
}

/// Which attributor an [`Explainer`] runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExplainerKind {
    ClosedForm,
    SamplingBased,
}

impl ExplainerKind {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ClosedForm => "closed_form",
            Self::SamplingBased => "sampling_based",
        }
    }
}

impl fmt::Display for ExplainerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parameters of the sampling-based attributor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SamplingParams {
    pub permutations: usize,
    pub seed: u64,
}

impl Default for SamplingParams {
    fn default() -> Self {
        Self {
            permutations: DEFAULT_SAMPLING_PERMUTATIONS,
            seed: DEFAULT_SAMPLING_SEED,
        }
    }
}

/// Closed-form attribution for a linear surrogate.
#[derive(Debug, Clone)]
pub struct LinearAttributor {
    weights: Vec<f64>,
    baseline: Vec<f64>,
}

impl LinearAttributor {
    /// # Errors
    /// Returns error if the background is empty, ragged, non-finite, or a
    /// different width from the surrogate, or if the weights are non-finite.
    pub fn new(
        surrogate: &dyn LinearClassifier,
        background: &BackgroundSample,
    ) -> Result<Self, ExplainError> {
        let weights = surrogate.weights().to_vec();
        if weights.iter().any(|w| !w.is_finite()) {
            return Err(ExplainError::NonFiniteWeights);
        }
        if let Some(first) = background.rows().first() {
            if first.len() != weights.len() {
                return Err(ExplainError::WidthMismatch {
                    expected: weights.len(),
                    got: first.len(),
                });
            }
        }
        background
            .check(weights.len())
            .map_err(ExplainError::Background)?;

        Ok(Self {
            baseline: background.column_means(),
            weights,
        })
    }

    /// Background column means the attributions are measured from.
    #[must_use]
    pub fn baseline(&self) -> &[f64] {
        &self.baseline
    }

    #[must_use]
    pub fn attribute(&self, x: &TransformedVector) -> Vec<f64> {
        self.weights
            .iter()
            .zip(&self.baseline)
            .zip(x.as_slice())
            .map(|((w, mean), xi)| w * (xi - mean))
            .collect()
    }
}

/// Permutation-sampling Shapley estimate on surrogate probability.
#[derive(Debug, Clone)]
pub struct SamplingAttributor {
    surrogate: Arc<dyn LinearClassifier>,
    background: BackgroundSample,
    params: SamplingParams,
}

impl SamplingAttributor {
    /// Malformed rows of `background` are dropped; if none survive,
    /// `fallback` is used instead.
    ///
    /// # Errors
    /// Returns error if neither sample has a usable row.
    pub fn new(
        surrogate: Arc<dyn LinearClassifier>,
        background: &BackgroundSample,
        fallback: &BackgroundSample,
        params: SamplingParams,
    ) -> Result<Self, ExplainError> {
        let width = surrogate.n_features();
        let mut usable = background.retain_valid(width);
        if usable.len() < background.len() {
            tracing::warn!(
                dropped = background.len() - usable.len(),
                "Discarded malformed background rows"
            );
        }
        if usable.is_empty() {
            usable = fallback.retain_valid(width);
        }
        if usable.is_empty() {
            return Err(ExplainError::NoUsableBackground);
        }

        Ok(Self {
            surrogate,
            background: usable,
            params: SamplingParams {
                permutations: params.permutations.max(1),
                seed: params.seed,
            },
        })
    }

    #[must_use]
    pub fn background(&self) -> &BackgroundSample {
        &self.background
    }

    #[must_use]
    pub fn attribute(&self, x: &TransformedVector) -> Vec<f64> {
        let x = x.as_slice();
        let width = x.len();
        let rows = self.background.rows();
        let mut rng = ChaCha20Rng::seed_from_u64(self.params.seed);
        let mut order: Vec<usize> = (0..width).collect();
        let mut phi = vec![0.0; width];

        for _ in 0..self.params.permutations {
            let mut z = rows[rng.gen_range(0..rows.len())].clone();
            order.shuffle(&mut rng);

            let mut prev = self.surrogate.predict_proba(&z);
            for &j in &order {
                z[j] = x[j];
                let cur = self.surrogate.predict_proba(&z);
                phi[j] += cur - prev;
                prev = cur;
            }
        }

        let m = self.params.permutations as f64;
        phi.iter_mut().for_each(|v| *v /= m);
        phi
    }
}

/// The attributor chosen for this model store.
#[derive(Debug, Clone)]
pub enum Explainer {
    ClosedForm(LinearAttributor),
    SamplingBased(SamplingAttributor),
}

impl Explainer {
    /// Build the closed-form attributor, falling back to sampling when the
    /// background or surrogate does not support it.
    ///
    /// # Errors
    /// Returns error only if the fallback cannot be built either.
    pub fn select(
        surrogate: Arc<dyn LinearClassifier>,
        background: &BackgroundSample,
        fallback: &BackgroundSample,
        params: SamplingParams,
    ) -> Result<Self, ExplainError> {
        let closed = LinearAttributor::new(surrogate.as_ref(), background);
        match closed {
            Ok(closed) => Ok(Self::ClosedForm(closed)),
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    permutations = params.permutations,
                    "Closed-form explainer unavailable, using sampling-based attributions"
                );
                SamplingAttributor::new(surrogate, background, fallback, params)
                    .map(Self::SamplingBased)
            }
        }
    }

    /// Signed attribution per transformed column.
    #[must_use]
    pub fn attribute(&self, x: &TransformedVector) -> Vec<f64> {
        match self {
            Self::ClosedForm(a) => a.attribute(x),
            Self::SamplingBased(a) => a.attribute(x),
        }
    }

    /// Whether attributions are estimates rather than exact values.
    #[must_use]
    pub fn is_approximate(&self) -> bool {
        matches!(self, Self::SamplingBased(_))
    }

    #[must_use]
    pub fn kind(&self) -> ExplainerKind {
        match self {
            Self::ClosedForm(_) => ExplainerKind::ClosedForm,
            Self::SamplingBased(_) => ExplainerKind::SamplingBased,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::LogisticSurrogate;

    fn surrogate() -> Arc<dyn LinearClassifier> {
        Arc::new(LogisticSurrogate::new(vec![0.8, -0.5, 1.2], -0.3).expect("valid"))
    }

    fn background() -> BackgroundSample {
        BackgroundSample::new(vec![
            vec![0.0, 1.0, -1.0],
            vec![1.0, 0.0, 0.0],
            vec![-1.0, 2.0, 1.0],
        ])
    }

    fn fallback() -> BackgroundSample {
        BackgroundSample::new(vec![vec![0.0, 0.0, 0.0]; 4])
    }

    #[test]
    fn test_closed_form_values() {
        let s = surrogate();
        let a = LinearAttributor::new(s.as_ref(), &background()).expect("closed form");
        assert_eq!(a.baseline(), &[0.0, 1.0, 0.0]);

        let attrs = a.attribute(&TransformedVector::new(vec![1.0, 3.0, -2.0]));
        assert!((attrs[0] - 0.8).abs() < 1e-12);
        assert!((attrs[1] - (-1.0)).abs() < 1e-12);
        assert!((attrs[2] - (-2.4)).abs() < 1e-12);
    }

    #[test]
    fn test_centroid_attributions_are_zero() {
        let s = surrogate();
        let a = LinearAttributor::new(s.as_ref(), &background()).expect("closed form");
        let centroid = TransformedVector::new(a.baseline().to_vec());
        assert!(a.attribute(&centroid).iter().all(|v| v.abs() < 1e-12));
    }

    #[test]
    fn test_closed_form_rejects_bad_backgrounds() {
        let s = surrogate();
        let empty = BackgroundSample::default();
        let ragged = BackgroundSample::new(vec![vec![0.0, 0.0, 0.0], vec![0.0]]);
        let narrow = BackgroundSample::new(vec![vec![0.0, 0.0]]);
        let nan = BackgroundSample::new(vec![vec![0.0, f64::NAN, 0.0]]);

        assert!(LinearAttributor::new(s.as_ref(), &empty).is_err());
        assert!(LinearAttributor::new(s.as_ref(), &ragged).is_err());
        assert!(matches!(
            LinearAttributor::new(s.as_ref(), &narrow),
            Err(ExplainError::WidthMismatch {
                expected: 3,
                got: 2
            })
        ));
        assert!(LinearAttributor::new(s.as_ref(), &nan).is_err());
    }

    #[test]
    fn test_select_prefers_closed_form() {
        let explainer =
            Explainer::select(surrogate(), &background(), &fallback(), SamplingParams::default())
                .expect("explainer");
        assert_eq!(explainer.kind(), ExplainerKind::ClosedForm);
        assert!(!explainer.is_approximate());
    }

    #[test]
    fn test_select_falls_back_on_malformed_background() {
        let bad = BackgroundSample::new(vec![vec![0.0, 1.0, -1.0], vec![f64::INFINITY, 0.0, 0.0]]);
        let explainer =
            Explainer::select(surrogate(), &bad, &fallback(), SamplingParams::default())
                .expect("explainer");
        assert_eq!(explainer.kind(), ExplainerKind::SamplingBased);
        assert!(explainer.is_approximate());

        match &explainer {
            Explainer::SamplingBased(a) => assert_eq!(a.background().len(), 1),
            Explainer::ClosedForm(_) => panic!("expected sampling attributor"),
        }

        let attrs = explainer.attribute(&TransformedVector::new(vec![1.0, 0.5, 2.0]));
        assert_eq!(attrs.len(), 3);
        assert!(attrs.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_sampling_uses_fallback_when_nothing_survives() {
        let bad = BackgroundSample::new(vec![vec![1.0], vec![f64::NAN, 0.0, 0.0]]);
        let a = SamplingAttributor::new(surrogate(), &bad, &fallback(), SamplingParams::default())
            .expect("sampling");
        assert_eq!(a.background().len(), 4);

        let none = BackgroundSample::default();
        assert!(matches!(
            SamplingAttributor::new(surrogate(), &none, &none, SamplingParams::default()),
            Err(ExplainError::NoUsableBackground)
        ));
    }

    #[test]
    fn test_sampling_is_deterministic() {
        let a = SamplingAttributor::new(
            surrogate(),
            &background(),
            &fallback(),
            SamplingParams::default(),
        )
        .expect("sampling");
        let x = TransformedVector::new(vec![2.0, -1.0, 0.5]);
        assert_eq!(a.attribute(&x), a.attribute(&x));
    }

    #[test]
    fn test_sampling_efficiency_single_row() {
        let s = surrogate();
        let row = vec![0.2, -0.4, 0.1];
        let single = BackgroundSample::new(vec![row.clone()]);
        let a = SamplingAttributor::new(
            Arc::clone(&s),
            &single,
            &fallback(),
            SamplingParams {
                permutations: 16,
                seed: 7,
            },
        )
        .expect("sampling");

        let x = TransformedVector::new(vec![1.5, 0.3, -0.8]);
        let total: f64 = a.attribute(&x).iter().sum();
        let expected = s.predict_proba(x.as_slice()) - s.predict_proba(&row);
        assert!((total - expected).abs() < 1e-9);
    }

    #[test]
    fn test_sampling_signs_follow_weights() {
        let single = BackgroundSample::new(vec![vec![0.0, 0.0, 0.0]]);
        let a = SamplingAttributor::new(surrogate(), &single, &fallback(), SamplingParams::default())
            .expect("sampling");
        let attrs = a.attribute(&TransformedVector::new(vec![1.0, 1.0, 1.0]));
        assert!(attrs[0] > 0.0);
        assert!(attrs[1] < 0.0);
        assert!(attrs[2] > 0.0);
    }
}
