//! Classification metrics for threshold calibration.

use serde::{Deserialize, Serialize};

use crate::models::{Sample, ThresholdPair};

/// Precision / recall / F1, each in [0, 1] and 0 under an empty
/// denominator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
}

impl Metrics {
    fn from_counts(true_pos: u64, false_pos: u64, false_neg: u64) -> Self {
        let precision = ratio(true_pos, true_pos + false_pos);
        let recall = ratio(true_pos, true_pos + false_neg);
        let f1 = if precision + recall == 0.0 {
            0.0
        } else {
            2.0 * precision * recall / (precision + recall)
        };
        Self { precision, recall, f1 }
    }
}

fn ratio(numerator: u64, denominator: u64) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

/// Score a threshold pair against ground truth.
///
/// `score` supplies the model-predicted bloom score for a sample; Tier 1
/// or above counts as a positive detection, and the ground-truth label
/// is the sample's observed density against `density_cutoff`.
pub fn evaluate<F>(
    samples: &[Sample],
    thresholds: &ThresholdPair,
    density_cutoff: f64,
    score: F,
) -> Metrics
where
    F: Fn(&Sample) -> f64,
{
    let mut true_pos = 0u64;
    let mut false_pos = 0u64;
    let mut false_neg = 0u64;
    for sample in samples {
        let actual = sample.is_bloom(density_cutoff);
        let predicted = thresholds.predicts_bloom(score(sample));
        match (predicted, actual) {
            (true, true) => true_pos += 1,
            (true, false) => false_pos += 1,
            (false, true) => false_neg += 1,
            (false, false) => {}
        }
    }
    Metrics::from_counts(true_pos, false_pos, false_neg)
}
