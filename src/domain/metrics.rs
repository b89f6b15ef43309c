// ============================================================
// Layer 3 — Classification Metrics
// ============================================================
// Pure functions from (predicted labels, true labels) to the
// standard binary-classification quality numbers.
//
// Label 1 (positive) is the positive class:
//
//   accuracy  = (tp + tn) / n
//   precision = tp / (tp + fp)
//   recall    = tp / (tp + fn)
//   f1        = 2 * precision * recall / (precision + recall)
//
// A zero denominator yields 0.0 instead of NaN, so a model that
// never predicts "positive" reports precision 0.0.

use anyhow::{ensure, Result};
use serde::{Deserialize, Serialize};

/// Confusion-matrix counts for the positive class.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfusionCounts {
    pub true_positive:  usize,
    pub false_positive: usize,
    pub true_negative:  usize,
    pub false_negative: usize,
}

impl ConfusionCounts {
    pub fn total(&self) -> usize {
        self.true_positive + self.false_positive + self.true_negative + self.false_negative
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ClassificationMetrics {
    pub accuracy:  f64,
    pub precision: f64,
    pub recall:    f64,
    pub f1:        f64,
    pub counts:    ConfusionCounts,
}

impl ClassificationMetrics {
    /// Compute all metrics from parallel prediction / label-id slices.
    pub fn compute(predictions: &[u8], labels: &[u8]) -> Result<Self> {
        ensure!(
            predictions.len() == labels.len(),
            "predictions ({}) and labels ({}) differ in length",
            predictions.len(),
            labels.len()
        );

        let mut counts = ConfusionCounts::default();
        for (&pred, &truth) in predictions.iter().zip(labels) {
            match (pred == 1, truth == 1) {
                (true, true)   => counts.true_positive  += 1,
                (true, false)  => counts.false_positive += 1,
                (false, false) => counts.true_negative  += 1,
                (false, true)  => counts.false_negative += 1,
            }
        }

        Ok(Self::from_counts(counts))
    }

    pub fn from_counts(counts: ConfusionCounts) -> Self {
        let accuracy  = ratio(counts.true_positive + counts.true_negative, counts.total());
        let precision = ratio(counts.true_positive, counts.true_positive + counts.false_positive);
        let recall    = ratio(counts.true_positive, counts.true_positive + counts.false_negative);
        let f1 = if precision + recall > 0.0 {
            2.0 * precision * recall / (precision + recall)
        } else {
            0.0
        };
        Self { accuracy, precision, recall, f1, counts }
    }
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 { 0.0 } else { num as f64 / den as f64 }
}
