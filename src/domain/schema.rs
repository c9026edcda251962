//! Feature schema: the ordered column contract shared by every model.
//!
//! Based on the DiaHealth dataset features used at training time.

use serde::{Deserialize, Serialize};

/// Semantic type of a feature slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureKind {
    /// Continuous or 0/1 integer value, mean-imputed and standardized.
    Numeric,
    /// Label value, mode-imputed and ordinal-encoded.
    Categorical,
}

/// One named column of the schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureSlot {
    pub name: String,
    pub kind: FeatureKind,
}

impl FeatureSlot {
    #[must_use]
    pub fn numeric(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: FeatureKind::Numeric,
        }
    }

    #[must_use]
    pub fn categorical(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: FeatureKind::Categorical,
        }
    }
}

/// A field that historically shipped under two names.
///
/// Requests may carry either name; the canonical one wins when both are
/// present and `default` is used when neither is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldAlias {
    pub canonical: String,
    pub legacy: String,
    #[serde(default)]
    pub default: f64,
}

impl FieldAlias {
    /// Cardiovascular disease history flag (`cvd`, formerly `cardiovascular_disease`).
    #[must_use]
    pub fn cardiovascular_history() -> Self {
        Self {
            canonical: "cvd".to_string(),
            legacy: "cardiovascular_disease".to_string(),
            default: 0.0,
        }
    }
}

/// Ordered sequence of feature slots fixed at training time.
///
/// The preprocessor, the risk model and the surrogate all consume columns in
/// exactly this order.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureSchema {
    slots: Vec<FeatureSlot>,
    aliases: Vec<FieldAlias>,
}

impl FeatureSchema {
    #[must_use]
    pub fn new(slots: Vec<FeatureSlot>, aliases: Vec<FieldAlias>) -> Self {
        Self { slots, aliases }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    #[must_use]
    pub fn slots(&self) -> &[FeatureSlot] {
        &self.slots
    }

    #[must_use]
    pub fn aliases(&self) -> &[FieldAlias] {
        &self.aliases
    }

    /// Name of the column at `index`, if it falls inside the named schema.
    #[must_use]
    pub fn name(&self, index: usize) -> Option<&str> {
        self.slots.get(index).map(|s| s.name.as_str())
    }

    #[must_use]
    pub fn position(&self, name: &str) -> Option<usize> {
        self.slots.iter().position(|s| s.name == name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.slots.iter().map(|s| s.name.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DIAHEALTH_FEATURES: [&str; 14] = [
        "age",
        "gender",
        "pulse_rate",
        "systolic_bp",
        "diastolic_bp",
        "glucose",
        "height",
        "weight",
        "bmi",
        "family_diabetes",
        "hypertensive",
        "family_hypertension",
        "cvd",
        "stroke",
    ];

    fn diahealth() -> FeatureSchema {
        let slots = DIAHEALTH_FEATURES
            .iter()
            .map(|&name| {
                if name == "gender" {
                    FeatureSlot::categorical(name)
                } else {
                    FeatureSlot::numeric(name)
                }
            })
            .collect();
        FeatureSchema::new(slots, vec![FieldAlias::cardiovascular_history()])
    }

    #[test]
    fn test_diahealth_schema_order() {
        let schema = diahealth();
        assert_eq!(schema.len(), 14);
        assert_eq!(schema.name(0), Some("age"));
        assert_eq!(schema.name(12), Some("cvd"));
        assert_eq!(schema.name(14), None);
        assert_eq!(schema.position("glucose"), Some(5));
        assert_eq!(schema.slots()[1].kind, FeatureKind::Categorical);
        assert_eq!(schema.slots()[5].kind, FeatureKind::Numeric);
    }

    #[test]
    fn test_default_alias_is_cvd() {
        let schema = diahealth();
        let alias = &schema.aliases()[0];
        assert_eq!(alias.canonical, "cvd");
        assert_eq!(alias.legacy, "cardiovascular_disease");
        assert_eq!(alias.default, 0.0);
    }
}
