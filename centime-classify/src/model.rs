//! Linear multi-class classifier with a trivial most-frequent fallback

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use crate::features::SparseVec;

const EPOCHS: usize = 300;
const LEARNING_RATE: f64 = 0.3;

/// Fitted classifier persisted inside the model bundle.
///
/// Single-label training data gets the trivial variant; everything else is
/// multinomial logistic regression.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Classifier {
    MostFrequent { class: usize },
    Logistic(LogisticModel),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogisticModel {
    n_features: usize,
    /// Per-class weight vectors, dense.
    weights: Vec<Vec<f64>>,
    intercepts: Vec<f64>,
}

impl Classifier {
    pub fn predict_proba(&self, x: &SparseVec, n_classes: usize) -> Vec<f64> {
        match self {
            Classifier::MostFrequent { class } => {
                let mut probs = vec![0.0; n_classes];
                if let Some(p) = probs.get_mut(*class) {
                    *p = 1.0;
                }
                probs
            }
            Classifier::Logistic(model) => model.predict_proba(x),
        }
    }

    pub fn predict(&self, x: &SparseVec, n_classes: usize) -> usize {
        let probs = self.predict_proba(x, n_classes);
        probs
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(index, _)| index)
            .unwrap_or(0)
    }
}

impl LogisticModel {
    pub fn n_features(&self) -> usize {
        self.n_features
    }

    fn scores(&self, x: &SparseVec) -> Vec<f64> {
        self.weights
            .iter()
            .zip(&self.intercepts)
            .map(|(weights, intercept)| {
                intercept
                    + x.iter()
                        .map(|(index, value)| weights.get(*index).copied().unwrap_or(0.0) * value)
                        .sum::<f64>()
            })
            .collect()
    }

    pub fn predict_proba(&self, x: &SparseVec) -> Vec<f64> {
        softmax(&self.scores(x))
    }
}

fn softmax(scores: &[f64]) -> Vec<f64> {
    let max = scores.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let exps: Vec<f64> = scores.iter().map(|s| (s - max).exp()).collect();
    let total: f64 = exps.iter().sum();
    exps.iter().map(|e| e / total).collect()
}

/// Fit a multinomial logistic regression by stochastic gradient descent
/// with class-balanced sample weights (`n / (k * class_count)`).
///
/// Sample order is shuffled with the caller's seeded rng so training is
/// reproducible.
pub fn fit_logistic(
    rows: &[SparseVec],
    y: &[usize],
    n_classes: usize,
    n_features: usize,
    rng: &mut StdRng,
) -> LogisticModel {
    let mut class_counts = vec![0usize; n_classes];
    for &label in y {
        class_counts[label] += 1;
    }
    let n = y.len() as f64;
    let class_weights: Vec<f64> = class_counts
        .iter()
        .map(|&count| {
            if count == 0 {
                0.0
            } else {
                n / (n_classes as f64 * count as f64)
            }
        })
        .collect();

    let mut model = LogisticModel {
        n_features,
        weights: vec![vec![0.0; n_features]; n_classes],
        intercepts: vec![0.0; n_classes],
    };

    let mut order: Vec<usize> = (0..rows.len()).collect();
    for _ in 0..EPOCHS {
        order.shuffle(rng);
        for &sample in &order {
            let x = &rows[sample];
            let probs = model.predict_proba(x);
            let weight = class_weights[y[sample]];
            for class in 0..n_classes {
                let target = if class == y[sample] { 1.0 } else { 0.0 };
                let gradient = (probs[class] - target) * weight * LEARNING_RATE;
                if gradient == 0.0 {
                    continue;
                }
                let class_weights_row = &mut model.weights[class];
                for (index, value) in x {
                    class_weights_row[*index] -= gradient * value;
                }
                model.intercepts[class] -= gradient;
            }
        }
    }
    model
}
