//! Background reference sample for attributions.

use serde::{Deserialize, Serialize};

use super::preprocess::TransformedVector;

/// Rows used when training did not persist a background sample.
pub const DEFAULT_BACKGROUND_SIZE: usize = 50;

/// A fixed set of transformed rows representing a typical population.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BackgroundSample {
    rows: Vec<Vec<f64>>,
}

impl BackgroundSample {
    #[must_use]
    pub fn new(rows: Vec<Vec<f64>>) -> Self {
        Self { rows }
    }

    /// Replicate one transformed row `size` times.
    ///
    /// The result satisfies the shape contract but carries no distributional
    /// information.
    #[must_use]
    pub fn replicate(row: &TransformedVector, size: usize) -> Self {
        Self {
            rows: vec![row.as_slice().to_vec(); size.max(1)],
        }
    }

    #[must_use]
    pub fn rows(&self) -> &[Vec<f64>] {
        &self.rows
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Check the sample is non-empty, rectangular with `width` columns, and finite.
    ///
    /// # Errors
    /// Returns a description of the first defect.
    pub fn check(&self, width: usize) -> Result<(), String> {
        if self.rows.is_empty() {
            return Err("background sample is empty".into());
        }
        for (i, row) in self.rows.iter().enumerate() {
            if row.len() != width {
                return Err(format!(
                    "background row {i} has {} columns, expected {width}",
                    row.len()
                ));
            }
            if row.iter().any(|v| !v.is_finite()) {
                return Err(format!("background row {i} contains non-finite values"));
            }
        }
        Ok(())
    }

    /// Keep only rows with `width` finite columns.
    #[must_use]
    pub fn retain_valid(&self, width: usize) -> Self {
        Self {
            rows: self
                .rows
                .iter()
                .filter(|r| r.len() == width && r.iter().all(|v| v.is_finite()))
                .cloned()
                .collect(),
        }
    }

    /// Column means, summed in row order.
    ///
    /// Only meaningful after `check` has passed.
    #[must_use]
    pub fn column_means(&self) -> Vec<f64> {
        let width = self.rows.first().map_or(0, Vec::len);
        let mut sums = vec![0.0; width];
        for row in &self.rows {
            for (s, v) in sums.iter_mut().zip(row) {
                *s += v;
            }
        }
        let n = self.rows.len() as f64;
        sums.into_iter().map(|s| s / n).collect()
    }
}
