//! Feature vector types for diabetes risk prediction.
//!
//! Based on the DiaHealth dataset (demographics, vitals, fasting glucose,
//! anthropometrics and family/clinical history flags).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::schema::FieldAlias;

/// A single raw feature value as delivered by the validation layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FeatureValue {
    /// Explicit `null`.
    Missing,
    Flag(bool),
    Number(f64),
    Text(String),
}

impl FeatureValue {
    /// Numeric reading of the value, `None` when it should be imputed.
    #[must_use]
    pub fn as_number(&self) -> Option<f64> {
        let v = match self {
            Self::Missing => return None,
            Self::Flag(b) => {
                if *b {
                    1.0
                } else {
                    0.0
                }
            }
            Self::Number(n) => *n,
            Self::Text(s) => s.trim().parse::<f64>().ok()?,
        };
        v.is_finite().then_some(v)
    }

    /// Lookup key for a categorical encoding table, `None` when missing.
    #[must_use]
    pub fn category_key(&self) -> Option<String> {
        match self {
            Self::Missing => None,
            Self::Text(s) => Some(s.clone()),
            other => Some(other.display()),
        }
    }

    /// Display string used in explanations.
    #[must_use]
    pub fn display(&self) -> String {
        match self {
            Self::Missing => "missing".to_string(),
            Self::Flag(b) => String::from(if *b { "1" } else { "0" }),
            Self::Number(n) => format!("{n}"),
            Self::Text(s) => s.clone(),
        }
    }

    #[must_use]
    pub fn is_missing(&self) -> bool {
        matches!(self, Self::Missing)
    }
}

impl From<f64> for FeatureValue {
    fn from(v: f64) -> Self {
        Self::Number(v)
    }
}

impl From<u8> for FeatureValue {
    fn from(v: u8) -> Self {
        Self::Number(f64::from(v))
    }
}

impl From<&str> for FeatureValue {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<String> for FeatureValue {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

/// One row of named raw feature values.
///
/// Fields that are not part of the schema (for example the training label
/// `diabetic`) are carried along but never read.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureVector {
    values: BTreeMap<String, FeatureValue>,
}

impl FeatureVector {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<FeatureValue>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<FeatureValue>) {
        self.values.insert(name.into(), value.into());
    }

    pub fn remove(&mut self, name: &str) -> Option<FeatureValue> {
        self.values.remove(name)
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&FeatureValue> {
        self.values.get(name)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Resolve every aliased field to its canonical name.
    ///
    /// After normalization the legacy names are gone and each canonical name
    /// holds a value.
    #[must_use]
    pub fn normalize_aliases(&self, aliases: &[FieldAlias]) -> Self {
        let mut out = self.clone();
        for alias in aliases {
            let legacy = out.values.remove(&alias.legacy);
            let canonical_present = out
                .values
                .get(&alias.canonical)
                .is_some_and(|v| !v.is_missing());
            if canonical_present {
                continue;
            }
            let resolved = legacy
                .filter(|v| !v.is_missing())
                .unwrap_or(FeatureValue::Number(alias.default));
            out.values.insert(alias.canonical.clone(), resolved);
        }
        out
    }
}

impl FromIterator<(String, FeatureValue)> for FeatureVector {
    fn from_iter<I: IntoIterator<Item = (String, FeatureValue)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

/// Typed DiaHealth record, convenient for callers that hold structured data.
///
/// The cardiovascular history flag may arrive under either of its two names.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DiaHealthFeatures {
    /// Age in years
    pub age: f64,

    /// "Male" or "Female"
    pub gender: String,

    /// Resting pulse in beats per minute
    pub pulse_rate: f64,

    /// Systolic blood pressure in mmHg
    pub systolic_bp: f64,

    /// Diastolic blood pressure in mmHg
    pub diastolic_bp: f64,

    /// Fasting glucose in mmol/L
    pub glucose: f64,

    /// Height in meters
    pub height: f64,

    /// Weight in kg
    pub weight: f64,

    pub bmi: f64,

    /// Family history of diabetes: 0 = no, 1 = yes
    pub family_diabetes: u8,

    /// Diagnosed hypertension: 0 = no, 1 = yes
    pub hypertensive: u8,

    /// Family history of hypertension: 0 = no, 1 = yes
    pub family_hypertension: u8,

    /// Cardiovascular disease history: 0 = no, 1 = yes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cvd: Option<u8>,

    /// Legacy name of `cvd`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cardiovascular_disease: Option<u8>,

    /// Prior stroke: 0 = no, 1 = yes
    pub stroke: u8,
}

impl DiaHealthFeatures {
    /// Convert to a named feature vector. Alias fields are passed through as
    /// given; normalization happens in the scoring pipeline.
    #[must_use]
    pub fn to_feature_vector(&self) -> FeatureVector {
        let mut v = FeatureVector::new()
            .with("age", self.age)
            .with("gender", self.gender.as_str())
            .with("pulse_rate", self.pulse_rate)
            .with("systolic_bp", self.systolic_bp)
            .with("diastolic_bp", self.diastolic_bp)
            .with("glucose", self.glucose)
            .with("height", self.height)
            .with("weight", self.weight)
            .with("bmi", self.bmi)
            .with("family_diabetes", self.family_diabetes)
            .with("hypertensive", self.hypertensive)
            .with("family_hypertension", self.family_hypertension)
            .with("stroke", self.stroke);
        if let Some(cvd) = self.cvd {
            v.insert("cvd", cvd);
        }
        if let Some(legacy) = self.cardiovascular_disease {
            v.insert("cardiovascular_disease", legacy);
        }
        v
    }
}

impl From<&DiaHealthFeatures> for FeatureVector {
    fn from(f: &DiaHealthFeatures) -> Self {
        f.to_feature_vector()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feature_value_from_json() {
        let v: FeatureVector = serde_json::from_str(
            r#"{"age": 54, "gender": "Male", "glucose": 7.8, "cvd": null, "stroke": false}"#,
        )
        .expect("Should parse");

        assert_eq!(v.get("age"), Some(&FeatureValue::Number(54.0)));
        assert_eq!(v.get("gender"), Some(&FeatureValue::Text("Male".into())));
        assert_eq!(v.get("cvd"), Some(&FeatureValue::Missing));
        assert_eq!(v.get("stroke"), Some(&FeatureValue::Flag(false)));
    }

    #[test]
    fn test_display_strings() {
        assert_eq!(FeatureValue::Number(54.0).display(), "54");
        assert_eq!(FeatureValue::Number(7.8).display(), "7.8");
        assert_eq!(FeatureValue::Text("Male".into()).display(), "Male");
        assert_eq!(FeatureValue::Flag(true).display(), "1");
        assert_eq!(FeatureValue::Missing.display(), "missing");
    }

    #[test]
    fn test_as_number() {
        assert_eq!(FeatureValue::Number(1.5).as_number(), Some(1.5));
        assert_eq!(FeatureValue::Text(" 2.5 ".into()).as_number(), Some(2.5));
        assert_eq!(FeatureValue::Text("Male".into()).as_number(), None);
        assert_eq!(FeatureValue::Number(f64::NAN).as_number(), None);
        assert_eq!(FeatureValue::Missing.as_number(), None);
    }

    #[test]
    fn test_alias_legacy_only() {
        let aliases = [FieldAlias::cardiovascular_history()];
        let v = FeatureVector::new().with("cardiovascular_disease", 1u8);
        let n = v.normalize_aliases(&aliases);

        assert_eq!(n.get("cvd"), Some(&FeatureValue::Number(1.0)));
        assert!(n.get("cardiovascular_disease").is_none());
    }

    #[test]
    fn test_alias_canonical_wins() {
        let aliases = [FieldAlias::cardiovascular_history()];
        let v = FeatureVector::new()
            .with("cvd", 0u8)
            .with("cardiovascular_disease", 1u8);
        let n = v.normalize_aliases(&aliases);

        assert_eq!(n.get("cvd"), Some(&FeatureValue::Number(0.0)));
        assert!(n.get("cardiovascular_disease").is_none());
    }

    #[test]
    fn test_alias_default_when_absent() {
        let aliases = [FieldAlias::cardiovascular_history()];
        let n = FeatureVector::new().normalize_aliases(&aliases);
        assert_eq!(n.get("cvd"), Some(&FeatureValue::Number(0.0)));
    }

    #[test]
    fn test_typed_features_to_vector() {
        let f = DiaHealthFeatures {
            age: 54.0,
            gender: "Male".into(),
            cardiovascular_disease: Some(1),
            ..Default::default()
        };
        let v = f.to_feature_vector();
        assert_eq!(v.get("gender"), Some(&FeatureValue::Text("Male".into())));
        assert!(v.get("cvd").is_none());
        assert_eq!(
            v.get("cardiovascular_disease"),
            Some(&FeatureValue::Number(1.0))
        );
    }
}
