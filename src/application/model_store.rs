//! Model store: every fitted artifact, loaded once and shared read-only.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, OnceLock};

use super::explainer::{Explainer, SamplingParams};
use crate::config::EngineConfig;
use crate::domain::{
    BackgroundSample, FeatureSchema, FittedPreprocessor, RiskBandThresholds, TransformedVector,
    DEFAULT_TOP_K,
};
use crate::ports::{ArtifactError, ArtifactSource, Classifier};
use crate::{GlycoriskError, Result};

/// Immutable bundle of fitted artifacts.
///
/// Built once before the first request and shared as `Arc<ModelStore>`;
/// nothing in it changes afterwards.
#[derive(Debug)]
pub struct ModelStore {
    schema: FeatureSchema,
    thresholds: RiskBandThresholds,
    model_versions: BTreeMap<String, String>,
    preprocessor: Arc<FittedPreprocessor>,
    risk_model: Arc<dyn Classifier>,
    explainer: Explainer,
    background: BackgroundSample,
    background_synthesized: bool,
    top_k: usize,
}

impl ModelStore {
    /// Load and cross-check every artifact from `source`.
    ///
    /// # Errors
    /// Returns error if an artifact is missing, malformed, fails integrity
    /// checks, or disagrees with the others on column count or order.
    pub fn load(source: &dyn ArtifactSource, config: &EngineConfig) -> Result<Arc<Self>> {
        tracing::info!(source = %source.describe(), "Loading model artifacts");

        let metadata = source.load_metadata()?;
        let preprocessor = source
            .load_preprocessor()?
            .with_aliases(metadata.aliases.clone());

        let schema = preprocessor.schema();
        if !schema.names().eq(metadata.features.iter().map(String::as_str)) {
            return Err(ArtifactError::Malformed(format!(
                "Preprocessor columns [{}] do not match metadata features [{}]",
                schema.names().collect::<Vec<_>>().join(", "),
                metadata.features.join(", ")
            ))
            .into());
        }
        let width = schema.len();

        let risk_model = source.load_risk_model()?;
        if risk_model.n_features() != width {
            return Err(ArtifactError::Malformed(format!(
                "Risk model expects {} features, schema has {width}",
                risk_model.n_features()
            ))
            .into());
        }

        let surrogate = source.load_surrogate()?;
        if surrogate.n_features() != width {
            return Err(ArtifactError::Malformed(format!(
                "Surrogate expects {} features, schema has {width}",
                surrogate.n_features()
            ))
            .into());
        }

        let synthesized = Self::synthesize_background(&preprocessor, config.background_size);
        let (background, background_synthesized) = match source.load_background()? {
            Some(bg) => (bg, false),
            None => {
                tracing::warn!(
                    rows = synthesized.len(),
                    "No background sample persisted; using all-zero rows in transformed space. \
                     Attributions are measured against the training means."
                );
                (synthesized.clone(), true)
            }
        };

        let params = SamplingParams {
            permutations: config.sampling_permutations,
            seed: config.sampling_seed,
        };
        let explainer = Explainer::select(surrogate, &background, &synthesized, params)?;

        tracing::info!(
            features = width,
            explainer = %explainer.kind(),
            background_rows = background.len(),
            low = metadata.risk_bands.low,
            high = metadata.risk_bands.high,
            "Model store ready"
        );

        Ok(Arc::new(Self {
            schema,
            thresholds: metadata.risk_bands,
            model_versions: metadata.model_versions,
            preprocessor: Arc::new(preprocessor),
            risk_model,
            explainer,
            background,
            background_synthesized,
            top_k: DEFAULT_TOP_K,
        }))
    }

    /// `size` rows of zeros in transformed space, i.e. the training means.
    ///
    /// The all-zero raw instance is transformed only to learn the output width.
    #[must_use]
    pub fn synthesize_background(preprocessor: &FittedPreprocessor, size: usize) -> BackgroundSample {
        let zero = preprocessor.transform(&preprocessor.zero_instance());
        BackgroundSample::replicate(&TransformedVector::new(vec![0.0; zero.len()]), size)
    }

    #[must_use]
    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    #[must_use]
    pub fn thresholds(&self) -> &RiskBandThresholds {
        &self.thresholds
    }

    #[must_use]
    pub fn model_versions(&self) -> &BTreeMap<String, String> {
        &self.model_versions
    }

    #[must_use]
    pub fn preprocessor(&self) -> &Arc<FittedPreprocessor> {
        &self.preprocessor
    }

    #[must_use]
    pub fn risk_model(&self) -> &dyn Classifier {
        self.risk_model.as_ref()
    }

    #[must_use]
    pub fn explainer(&self) -> &Explainer {
        &self.explainer
    }

    #[must_use]
    pub fn background(&self) -> &BackgroundSample {
        &self.background
    }

    /// Whether the background was synthesized instead of loaded.
    #[must_use]
    pub fn background_is_synthesized(&self) -> bool {
        self.background_synthesized
    }

    #[must_use]
    pub fn top_k(&self) -> usize {
        self.top_k
    }
}

/// One-shot, lock-guarded holder for a lazily built [`ModelStore`].
///
/// Callers either see no store or a complete one.
#[derive(Debug, Default)]
pub struct StartupBarrier {
    store: OnceLock<Arc<ModelStore>>,
    init_lock: Mutex<()>,
}

impl StartupBarrier {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            store: OnceLock::new(),
            init_lock: Mutex::new(()),
        }
    }

    /// The store, if initialization has completed.
    ///
    /// # Errors
    /// Returns `NotInitialized` before the first successful `get_or_init`.
    pub fn get(&self) -> Result<Arc<ModelStore>> {
        self.store.get().cloned().ok_or(GlycoriskError::NotInitialized)
    }

    /// Run `init` exactly once; concurrent callers wait for the winner.
    /// A failed `init` leaves the barrier empty so a later call can retry.
    ///
    /// # Errors
    /// Returns the error from `init`, or `NotInitialized` if the lock is poisoned.
    pub fn get_or_init(
        &self,
        init: impl FnOnce() -> Result<Arc<ModelStore>>,
    ) -> Result<Arc<ModelStore>> {
        if let Some(store) = self.store.get() {
            return Ok(Arc::clone(store));
        }
        let _guard = self
            .init_lock
            .lock()
            .map_err(|_| GlycoriskError::NotInitialized)?;
        if let Some(store) = self.store.get() {
            return Ok(Arc::clone(store));
        }
        let store = init()?;
        let _ = self.store.set(Arc::clone(&store));
        Ok(store)
    }
}
