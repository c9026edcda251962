//! Fitted preprocessing transform.
//!
//! Numeric columns are mean-imputed then standardized; categorical columns are
//! mode-imputed then ordinal-encoded, with unseen categories mapped to a
//! reserved code. The parameters are produced by the training job and never
//! change afterwards.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

use super::features::{FeatureValue, FeatureVector};
use super::schema::{FeatureKind, FeatureSchema, FeatureSlot, FieldAlias};

/// Code assigned to categories never seen during training.
pub const DEFAULT_UNKNOWN_CODE: f64 = -1.0;

fn default_unknown_code() -> f64 {
    DEFAULT_UNKNOWN_CODE
}

/// Fitted parameters for one output column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ColumnTransform {
    Numeric {
        name: String,
        impute_mean: f64,
        scale_mean: f64,
        scale_std: f64,
    },
    Categorical {
        name: String,
        mode: String,
        categories: BTreeMap<String, f64>,
        #[serde(default = "default_unknown_code")]
        unknown_code: f64,
    },
}

impl ColumnTransform {
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Numeric { name, .. } | Self::Categorical { name, .. } => name,
        }
    }

    #[must_use]
    pub fn kind(&self) -> FeatureKind {
        match self {
            Self::Numeric { .. } => FeatureKind::Numeric,
            Self::Categorical { .. } => FeatureKind::Categorical,
        }
    }

    /// Transform one raw value (`None` when the field is absent).
    #[must_use]
    pub fn apply(&self, value: Option<&FeatureValue>) -> f64 {
        match self {
            Self::Numeric {
                impute_mean,
                scale_mean,
                scale_std,
                ..
            } => {
                let x = value.and_then(FeatureValue::as_number).unwrap_or(*impute_mean);
                // Constant training columns have std 0; scale by 1 like the fitted scaler does.
                let std = if scale_std.is_finite() && *scale_std > 0.0 {
                    *scale_std
                } else {
                    1.0
                };
                (x - scale_mean) / std
            }
            Self::Categorical {
                mode,
                categories,
                unknown_code,
                ..
            } => {
                let key = value
                    .and_then(FeatureValue::category_key)
                    .unwrap_or_else(|| mode.clone());
                categories.get(&key).copied().unwrap_or(*unknown_code)
            }
        }
    }

    fn check(&self) -> Result<(), String> {
        match self {
            Self::Numeric {
                name,
                impute_mean,
                scale_mean,
                ..
            } => {
                if !impute_mean.is_finite() || !scale_mean.is_finite() {
                    return Err(format!("Numeric column {name} has non-finite parameters"));
                }
            }
            Self::Categorical {
                name,
                categories,
                unknown_code,
                ..
            } => {
                if !unknown_code.is_finite() || categories.values().any(|c| !c.is_finite()) {
                    return Err(format!("Categorical column {name} has non-finite codes"));
                }
            }
        }
        Ok(())
    }
}

/// Fixed-length numeric row in schema column order.
#[derive(Debug, Clone, PartialEq)]
pub struct TransformedVector(Vec<f64>);

impl TransformedVector {
    #[must_use]
    pub fn new(values: Vec<f64>) -> Self {
        Self(values)
    }

    #[must_use]
    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<f64>> for TransformedVector {
    fn from(v: Vec<f64>) -> Self {
        Self(v)
    }
}

/// The training-time preprocessing transform.
///
/// One instance is shared by the risk scorer and the explainer so that both
/// see identical columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FittedPreprocessor {
    columns: Vec<ColumnTransform>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    aliases: Vec<FieldAlias>,
}

impl FittedPreprocessor {
    #[must_use]
    pub fn new(columns: Vec<ColumnTransform>) -> Self {
        Self {
            columns,
            aliases: Vec::new(),
        }
    }

    /// Attach the legacy field aliases resolved before encoding.
    #[must_use]
    pub fn with_aliases(mut self, aliases: Vec<FieldAlias>) -> Self {
        self.aliases = aliases;
        self
    }

    #[must_use]
    pub fn columns(&self) -> &[ColumnTransform] {
        &self.columns
    }

    #[must_use]
    pub fn aliases(&self) -> &[FieldAlias] {
        &self.aliases
    }

    /// Number of output columns.
    #[must_use]
    pub fn width(&self) -> usize {
        self.columns.len()
    }

    /// Structural checks run once at load time.
    ///
    /// # Errors
    /// Returns a description of the first problem found.
    pub fn validate(&self) -> Result<(), String> {
        if self.columns.is_empty() {
            return Err("Preprocessor has no columns".into());
        }
        let mut seen = HashSet::new();
        for column in &self.columns {
            if !seen.insert(column.name()) {
                return Err(format!("Duplicate preprocessor column {}", column.name()));
            }
            column.check()?;
        }
        Ok(())
    }

    /// The feature schema implied by the fitted columns.
    #[must_use]
    pub fn schema(&self) -> FeatureSchema {
        let slots = self
            .columns
            .iter()
            .map(|c| FeatureSlot {
                name: c.name().to_string(),
                kind: c.kind(),
            })
            .collect();
        FeatureSchema::new(slots, self.aliases.clone())
    }

    /// Resolve aliased fields to their canonical names.
    #[must_use]
    pub fn normalize(&self, row: &FeatureVector) -> FeatureVector {
        row.normalize_aliases(&self.aliases)
    }

    /// Transform a raw row into the fixed-width model input.
    #[must_use]
    pub fn transform(&self, row: &FeatureVector) -> TransformedVector {
        let row = self.normalize(row);
        TransformedVector(
            self.columns
                .iter()
                .map(|c| c.apply(row.get(c.name())))
                .collect(),
        )
    }

    /// A row holding `0` in every schema slot.
    #[must_use]
    pub fn zero_instance(&self) -> FeatureVector {
        self.columns
            .iter()
            .map(|c| (c.name().to_string(), FeatureValue::Number(0.0)))
            .collect()
    }
}
