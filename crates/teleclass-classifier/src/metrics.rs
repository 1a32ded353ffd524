//! Set-based evaluation metrics.

use std::collections::BTreeSet;

use serde::Serialize;

/// Precision and recall averaged over documents; F1 from those averages.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Metrics {
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
}

/// Score predicted class sets against true ones, pairwise.
///
/// A document with an empty prediction contributes 0 precision, one with an
/// empty truth set contributes 0 recall. No documents gives all zeros.
pub fn evaluate_predictions(predictions: &[BTreeSet<String>], truth: &[BTreeSet<String>]) -> Metrics {
    let n = predictions.len().min(truth.len());
    if n == 0 {
        return Metrics::default();
    }

    let mut precision = 0.0;
    let mut recall = 0.0;
    for (pred, actual) in predictions.iter().zip(truth) {
        let hits = pred.intersection(actual).count() as f64;
        if !pred.is_empty() {
            precision += hits / pred.len() as f64;
        }
        if !actual.is_empty() {
            recall += hits / actual.len() as f64;
        }
    }
    precision /= n as f64;
    recall /= n as f64;

    let f1 = if precision + recall > 0.0 {
        2.0 * precision * recall / (precision + recall)
    } else {
        0.0
    };

    Metrics {
        precision,
        recall,
        f1,
    }
}
