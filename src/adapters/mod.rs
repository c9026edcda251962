//! Adapters layer: Concrete implementations of ports.
//!
//! - `gbdt`: gradient-boosted tree ensemble (risk model)
//! - `logistic`: logistic regression surrogate (explanations)
//! - `artifact_dir`: JSON artifact directory with manifest/signature checks
//! - `sanitize`: identifier filtering for logs

pub mod artifact_dir;
pub mod gbdt;
pub mod logistic;
pub mod sanitize;

pub use artifact_dir::{ArtifactDirectory, ArtifactManifest, IntegrityPolicy};
pub use gbdt::{GradientBoostedTrees, RegressionTree, TreeNode};
pub use logistic::LogisticSurrogate;
