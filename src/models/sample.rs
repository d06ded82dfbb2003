//! Ground-truth samples and classification thresholds

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One labeled water-quality observation from an uploaded ground-truth CSV.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub latitude: f64,
    pub longitude: f64,
    /// Observed cyanobacteria density in the upload's normalized units.
    pub observed_density: f64,
    /// Model bloom score in [0, 1] recorded when the sample was taken.
    pub model_score: f64,
}

impl Sample {
    /// Ground-truth label: density at or above the bloom definition cutoff.
    pub fn is_bloom(&self, density_cutoff: f64) -> bool {
        self.observed_density >= density_cutoff
    }
}

/// Rejected threshold configuration.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
#[error("invalid thresholds: require 0 <= tier1 < tier2, got tier1={tier1}, tier2={tier2}")]
pub struct InvalidThresholds {
    pub tier1: f64,
    pub tier2: f64,
}

/// Escalating alert thresholds: Tier 1 = "Probable", Tier 2 = "Confirmed".
///
/// Invariant: `0 <= tier1 < tier2`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThresholdPair {
    pub tier1: f64,
    pub tier2: f64,
}

impl ThresholdPair {
    pub fn new(tier1: f64, tier2: f64) -> Result<Self, InvalidThresholds> {
        if tier1 >= 0.0 && tier1 < tier2 {
            Ok(Self { tier1, tier2 })
        } else {
            Err(InvalidThresholds { tier1, tier2 })
        }
    }

    /// Tier a score falls into.
    pub fn classify(&self, score: f64) -> Severity {
        if score >= self.tier2 {
            Severity::Confirmed
        } else if score >= self.tier1 {
            Severity::Probable
        } else {
            Severity::Normal
        }
    }

    /// Binary detection label used for scoring: Tier 1 or above counts
    /// as a positive.
    pub fn predicts_bloom(&self, score: f64) -> bool {
        score >= self.tier1
    }

    pub fn margin(&self) -> f64 {
        self.tier2 - self.tier1
    }
}

/// Alert severity for a scored observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    #[serde(rename = "Normal")]
    Normal,
    #[serde(rename = "Tier 1 (Probable)")]
    Probable,
    #[serde(rename = "Tier 2 (Confirmed)")]
    Confirmed,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Normal => "Normal",
            Severity::Probable => "Tier 1 (Probable)",
            Severity::Confirmed => "Tier 2 (Confirmed)",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_threshold_invariant() {
        assert!(ThresholdPair::new(0.85, 0.93).is_ok());
        assert!(ThresholdPair::new(0.93, 0.85).is_err());
        assert!(ThresholdPair::new(0.85, 0.85).is_err());
        assert!(ThresholdPair::new(-0.1, 0.5).is_err());
    }

    #[test]
    fn test_classify_tiers() {
        let pair = ThresholdPair::new(0.85, 0.93).unwrap();
        assert_eq!(pair.classify(0.5), Severity::Normal);
        assert_eq!(pair.classify(0.85), Severity::Probable);
        assert_eq!(pair.classify(0.95), Severity::Confirmed);
        assert!(pair.predicts_bloom(0.85));
        assert!(!pair.predicts_bloom(0.84));
    }
}
