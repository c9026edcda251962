//! # Glycorisk
//!
//! Diabetes risk scoring with per-feature explanations.
//!
//! This crate provides:
//! - A fitted feature preprocessor shared by every model in the pipeline
//! - Gradient-boosted risk scoring and Low/Medium/High banding
//! - Signed, ranked feature attributions from a linear surrogate model
//!
//! ## Architecture
//!
//! The crate follows Hexagonal Architecture:
//! - `domain`: Core types (feature schema, feature vectors, preprocessing, bands, explanations)
//! - `ports`: Trait definitions for model inference and artifact loading
//! - `adapters`: Concrete implementations (tree ensemble, logistic surrogate, artifact directory)
//! - `application`: Model store, explainer selection, scoring pipeline, batch worker
//! - `config`: Runtime configuration

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;

pub use application::{Explainer, ModelStore, ScoringService};
pub use config::EngineConfig;
pub use domain::{FeatureVector, RiskBand, ScoreResponse};

/// Result type for Glycorisk operations
pub type Result<T> = std::result::Result<T, GlycoriskError>;

/// Main error type for Glycorisk.
///
/// Every variant is an internal error: input validation happens before a
/// feature vector reaches the core, so nothing here should be reported to a
/// caller as a bad request.
#[derive(Debug, thiserror::Error)]
pub enum GlycoriskError {
    #[error("Schema violation: expected {expected} columns, got {got}")]
    SchemaViolation { expected: usize, got: usize },

    #[error("Model artifact error: {0}")]
    Artifact(#[from] ports::ArtifactError),

    #[error("Explainer construction failed: {0}")]
    Explainer(#[from] application::ExplainError),

    #[error("Model store not initialized")]
    NotInitialized,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl GlycoriskError {
    /// Whether this error belongs to the internal-error class.
    #[must_use]
    pub fn is_internal(&self) -> bool {
        true
    }
}
