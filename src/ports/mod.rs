//! Ports layer: Trait definitions for external operations.
//!
//! Following Hexagonal Architecture, these traits define the boundaries
//! between the scoring pipeline and the fitted models / artifact storage.

mod artifacts;
mod classifier;

pub use artifacts::{ArtifactError, ArtifactSource, ModelMetadata};
pub use classifier::{Classifier, LinearClassifier};
