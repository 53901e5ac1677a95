use serde::{Deserialize, Serialize};

/// Precision, recall and F1 for one class.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ClassMetrics {
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    /// Held-out samples whose true label is this class.
    pub support: usize,
}

/// Held-out evaluation of one training run.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EvaluationMetrics {
    pub accuracy: f64,
    /// Authentic postings (label 0).
    pub real: ClassMetrics,
    /// Fraudulent postings (label 1).
    pub fake: ClassMetrics,
    /// `confusion[actual][predicted]`
    pub confusion: [[usize; 2]; 2],
    pub train_size: usize,
    pub test_size: usize,
}

impl EvaluationMetrics {
    /// Computes metrics from parallel slices of true and predicted labels.
    /// Ratios with an empty denominator are reported as 0.
    pub fn compute(actual: &[u8], predicted: &[u8], train_size: usize) -> Self {
        let mut confusion = [[0usize; 2]; 2];
        for (&a, &p) in actual.iter().zip(predicted) {
            confusion[usize::from(a.min(1))][usize::from(p.min(1))] += 1;
        }

        let total = confusion.iter().flatten().sum::<usize>();
        let correct = confusion[0][0] + confusion[1][1];
        Self {
            accuracy: ratio(correct, total),
            real: Self::class_metrics(&confusion, 0),
            fake: Self::class_metrics(&confusion, 1),
            confusion,
            train_size,
            test_size: total,
        }
    }

    fn class_metrics(confusion: &[[usize; 2]; 2], class: usize) -> ClassMetrics {
        let other = 1 - class;
        let true_pos = confusion[class][class];
        let false_pos = confusion[other][class];
        let false_neg = confusion[class][other];

        let precision = ratio(true_pos, true_pos + false_pos);
        let recall = ratio(true_pos, true_pos + false_neg);
        let f1 = if precision + recall > 0.0 {
            2.0 * precision * recall / (precision + recall)
        } else {
            0.0
        };
        ClassMetrics {
            precision,
            recall,
            f1,
            support: true_pos + false_neg,
        }
    }
}

fn ratio(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}
