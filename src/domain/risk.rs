//! Risk band classification.
//!
//! Maps the scorer's probability onto a three-level ordinal category.

use serde::{Deserialize, Serialize};

/// Ordinal risk category. Ordering follows severity: `Low < Medium < High`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RiskBand {
    /// Below the low cut
    Low,
    /// Between the cuts, follow-up recommended
    Medium,
    /// At or above the high cut
    High,
}

impl RiskBand {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
        }
    }
}

impl std::fmt::Display for RiskBand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Calibrated band boundaries, `low < high`, shipped with the model artifacts.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskBandThresholds {
    pub low: f64,
    pub high: f64,
}

impl Default for RiskBandThresholds {
    fn default() -> Self {
        Self {
            low: 0.20,
            high: 0.50,
        }
    }
}

impl RiskBandThresholds {
    /// Create thresholds, checking ordering and range.
    ///
    /// # Errors
    /// Returns error if the cuts are not finite, outside `[0, 1]`, or not strictly ordered.
    pub fn new(low: f64, high: f64) -> Result<Self, String> {
        let t = Self { low, high };
        t.validate()?;
        Ok(t)
    }

    /// # Errors
    /// Returns error if the cuts are not finite, outside `[0, 1]`, or not strictly ordered.
    pub fn validate(&self) -> Result<(), String> {
        let in_range = |v: f64| v.is_finite() && (0.0..=1.0).contains(&v);
        if !in_range(self.low) || !in_range(self.high) {
            return Err(format!(
                "Risk band thresholds must lie in [0, 1], got low={} high={}",
                self.low, self.high
            ));
        }
        if self.low >= self.high {
            return Err(format!(
                "Risk band thresholds must satisfy low < high, got low={} high={}",
                self.low, self.high
            ));
        }
        Ok(())
    }

    /// Classify a probability. Equality at a cut promotes to the higher band;
    /// NaN falls through to `High`.
    #[must_use]
    pub fn classify(&self, probability: f64) -> RiskBand {
        if probability < self.low {
            RiskBand::Low
        } else if probability < self.high {
            RiskBand::Medium
        } else {
            RiskBand::High
        }
    }
}
