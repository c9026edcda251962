//! Domain layer: Core types and pure logic.
//!
//! Everything here is a pure function of its inputs plus immutable fitted
//! parameters. No I/O, no model inference.

mod background;
mod explanation;
mod features;
mod preprocess;
mod risk;
mod schema;

pub use background::{BackgroundSample, DEFAULT_BACKGROUND_SIZE};
pub use explanation::{rank_attributions, Direction, ExplanationItem, ScoreResponse, DEFAULT_TOP_K};
pub use features::{DiaHealthFeatures, FeatureValue, FeatureVector};
pub use preprocess::{ColumnTransform, FittedPreprocessor, TransformedVector, DEFAULT_UNKNOWN_CODE};
pub use risk::{RiskBand, RiskBandThresholds};
pub use schema::{FeatureKind, FeatureSchema, FeatureSlot, FieldAlias};
