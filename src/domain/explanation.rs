//! Explanation output: ranked attribution items and the scoring response.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::features::FeatureVector;
use super::risk::RiskBand;
use super::schema::FeatureSchema;

/// Number of features shown in an explanation.
pub const DEFAULT_TOP_K: usize = 5;

/// Which way a feature pushed the prediction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    #[serde(rename = "increases risk")]
    IncreasesRisk,
    #[serde(rename = "decreases risk")]
    DecreasesRisk,
}

impl Direction {
    /// Strictly positive contributions increase risk; zero counts as decreasing.
    #[must_use]
    pub fn from_signed(value: f64) -> Self {
        if value > 0.0 {
            Self::IncreasesRisk
        } else {
            Self::DecreasesRisk
        }
    }
}

/// One displayed feature contribution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExplanationItem {
    /// Schema name, or `f{index}` for columns beyond the named schema
    pub feature: String,

    /// Raw input value as a display string; `None` beyond the named schema
    pub value: Option<String>,

    /// Absolute attribution
    #[serde(rename = "shap_abs")]
    pub magnitude: f64,

    pub direction: Direction,
}

/// Result of the "score and explain" operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreResponse {
    /// Probability of the positive outcome, rounded to 4 decimals
    pub risk_score: f64,

    pub risk_band: RiskBand,

    /// Up to five items, most influential first
    pub explanation: Vec<ExplanationItem>,

    /// Model role → version string
    pub model_versions: BTreeMap<String, String>,
}

impl ScoreResponse {
    #[must_use]
    pub fn new(
        probability: f64,
        risk_band: RiskBand,
        explanation: Vec<ExplanationItem>,
        model_versions: BTreeMap<String, String>,
    ) -> Self {
        Self {
            risk_score: round_to_4(probability),
            risk_band,
            explanation,
            model_versions,
        }
    }
}

fn round_to_4(p: f64) -> f64 {
    (p * 10_000.0).round() / 10_000.0
}

/// Select the `top_k` largest attributions by magnitude.
///
/// Sorting is stable, so exact ties keep schema column order.
#[must_use]
pub fn rank_attributions(
    attributions: &[f64],
    schema: &FeatureSchema,
    row: &FeatureVector,
    top_k: usize,
) -> Vec<ExplanationItem> {
    let mut order: Vec<usize> = (0..attributions.len()).collect();
    order.sort_by(|&a, &b| attributions[b].abs().total_cmp(&attributions[a].abs()));

    order
        .into_iter()
        .take(top_k)
        .map(|i| {
            let signed = attributions[i];
            let (feature, value) = match schema.name(i) {
                Some(name) => (
                    name.to_string(),
                    Some(
                        row.get(name)
                            .map_or_else(|| "missing".to_string(), |v| v.display()),
                    ),
                ),
                None => (format!("f{i}"), None),
            };
            ExplanationItem {
                feature,
                value,
                magnitude: signed.abs(),
                direction: Direction::from_signed(signed),
            }
        })
        .collect()
}
