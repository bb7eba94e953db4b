//! Bounded scores
//!
//! Duplicate similarity, fraud risk, and all of their sub-scores live on the
//! same `[0, 100]` scale. Constructing a [`Score`] clamps, so no arithmetic on
//! raw `f64`s can leak an out-of-range value into a decision.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A score clamped to `[0, 100]`. NaN becomes 0.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[serde(from = "f64", into = "f64")]
pub struct Score(f64);

impl Score {
    pub const MIN: Score = Score(0.0);
    pub const MAX: Score = Score(100.0);

    pub fn new(raw: f64) -> Self {
        if raw.is_nan() {
            return Self::MIN;
        }
        Self(raw.clamp(0.0, 100.0))
    }

    /// Builds a score from a `[0, 1]` ratio.
    pub fn from_ratio(ratio: f64) -> Self {
        Self::new(ratio * 100.0)
    }

    pub fn value(self) -> f64 {
        self.0
    }

    /// Contribution of this score to a weighted sum.
    pub fn weighted(self, weight: f64) -> f64 {
        self.0 * weight
    }

    /// Value rounded to two decimals, for reports.
    pub fn rounded(self) -> f64 {
        (self.0 * 100.0).round() / 100.0
    }
}

impl From<f64> for Score {
    fn from(raw: f64) -> Self {
        Self::new(raw)
    }
}

impl From<Score> for f64 {
    fn from(score: Score) -> f64 {
        score.0
    }
}

impl fmt::Display for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}
