//! Application layer: Use cases and services.
//!
//! This module wires the domain to the ports: the model store loads and
//! cross-checks artifacts once, and the scoring service runs the per-request
//! pipeline against it.

mod explainer;
mod model_store;
mod scoring;
mod worker;

pub use explainer::{
    ExplainError, Explainer, ExplainerKind, LinearAttributor, SamplingAttributor, SamplingParams,
};
pub use model_store::{ModelStore, StartupBarrier};
pub use scoring::ScoringService;
pub use worker::{BatchProgress, BatchWorker, BatchWorkerHandle};
