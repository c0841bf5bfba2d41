//! Local text + metadata classifier for transaction categories.
//!
//! Char n-grams and transaction metadata feed a linear classifier; the
//! fitted vectorizers, classifier, and label set persist to disk as one
//! JSON bundle. No bundle on disk is the valid untrained state.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use centime_core::normalize_description;

use crate::features::{MetaVectorizer, SparseVec, TextVectorizer, combine, meta_features};
use crate::model::{Classifier, fit_logistic};
use crate::overrides::OverrideStore;
use crate::rules::fallback_category;

/// Model predictions at or above this probability are auto-applied;
/// anything lower defers to the rule fallback.
pub const AUTO_APPLY_THRESHOLD: f64 = 0.58;

const SPLIT_SEED: u64 = 42;

/// One labeled sample for training.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingExample {
    pub description: String,
    #[serde(default)]
    pub amount: Option<f64>,
    #[serde(default)]
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub account_type: Option<String>,
    pub category: String,
}

/// Where a prediction came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PredictionSource {
    Model,
    ModelUnconfident,
    Rules,
    Override,
    None,
}

impl PredictionSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            PredictionSource::Model => "model",
            PredictionSource::ModelUnconfident => "model_unconfident",
            PredictionSource::Rules => "rules",
            PredictionSource::Override => "override",
            PredictionSource::None => "none",
        }
    }
}

/// Prediction details reported to callers.
#[derive(Debug, Clone, Serialize)]
pub struct Prediction {
    pub category: Option<String>,
    pub confidence: Option<f64>,
    pub source: PredictionSource,
    /// Top-5 labels with probabilities, ranked descending.
    pub top_categories: Vec<(String, f64)>,
    pub normalized_description: String,
}

/// Outcome of a training run.
#[derive(Debug, Clone, Serialize)]
pub struct TrainReport {
    pub trained: bool,
    pub samples: usize,
    pub labels: Vec<String>,
    pub accuracy: Option<f64>,
    pub macro_f1: Option<f64>,
    pub heldout_samples: usize,
    pub saved_to: Option<PathBuf>,
}

impl TrainReport {
    fn skipped() -> TrainReport {
        TrainReport {
            trained: false,
            samples: 0,
            labels: Vec::new(),
            accuracy: None,
            macro_f1: None,
            heldout_samples: 0,
            saved_to: None,
        }
    }
}

/// Model metadata for status endpoints.
#[derive(Debug, Clone, Serialize)]
pub struct CategorizerStatus {
    pub trained: bool,
    pub trained_at: Option<DateTime<Utc>>,
    pub labels: Vec<String>,
    pub model_path: PathBuf,
}

/// Everything a deployed model needs, persisted as one atomic document.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ModelBundle {
    text_vectorizer: TextVectorizer,
    meta_vectorizer: MetaVectorizer,
    classifier: Classifier,
    labels: Vec<String>,
    trained_at: DateTime<Utc>,
}

/// The categorizer handle: an explicitly owned, swappable model value.
///
/// Training replaces the bundle wholesale (swap-on-success); prediction
/// reads whatever bundle is currently loaded.
pub struct SmartCategorizer {
    model_path: PathBuf,
    bundle: Option<ModelBundle>,
}

impl SmartCategorizer {
    /// Open a categorizer rooted at `model_path`, loading any persisted
    /// bundle. A missing file is the untrained state, not an error.
    pub fn open(model_path: impl Into<PathBuf>) -> Result<SmartCategorizer> {
        let model_path = model_path.into();
        let bundle = if model_path.exists() {
            let raw = fs::read_to_string(&model_path)
                .with_context(|| format!("read {}", model_path.display()))?;
            Some(serde_json::from_str(&raw)
                .with_context(|| format!("decode model bundle {}", model_path.display()))?)
        } else {
            None
        };
        Ok(SmartCategorizer { model_path, bundle })
    }

    pub fn model_path(&self) -> &Path {
        &self.model_path
    }

    fn transform(&self, bundle: &ModelBundle, normalized: &str, meta: &BTreeMap<String, String>) -> SparseVec {
        combine(
            bundle.text_vectorizer.transform(normalized),
            bundle.meta_vectorizer.transform(meta),
            bundle.text_vectorizer.dim(),
        )
    }

    /// Predict a category for one description plus optional metadata.
    ///
    /// Without a loaded bundle the result is an explicit "no prediction"
    /// (source `none`); callers fall back to rule-based categorization.
    pub fn predict(
        &self,
        description: &str,
        amount: Option<f64>,
        date: Option<NaiveDate>,
        account_type: Option<&str>,
    ) -> Prediction {
        let normalized = normalize_description(description);
        let Some(bundle) = &self.bundle else {
            return Prediction {
                category: None,
                confidence: None,
                source: PredictionSource::None,
                top_categories: Vec::new(),
                normalized_description: normalized,
            };
        };

        let meta = meta_features(amount, date, account_type);
        let vector = self.transform(bundle, &normalized, &meta);
        let probs = bundle.classifier.predict_proba(&vector, bundle.labels.len());

        let mut ranked: Vec<usize> = (0..probs.len()).collect();
        ranked.sort_by(|a, b| probs[*b].total_cmp(&probs[*a]));
        let top_categories: Vec<(String, f64)> = ranked
            .iter()
            .take(5)
            .map(|&index| (bundle.labels[index].clone(), probs[index]))
            .collect();

        let (best_label, best_conf) = match top_categories.first() {
            Some((label, conf)) => (label.clone(), *conf),
            None => {
                return Prediction {
                    category: None,
                    confidence: None,
                    source: PredictionSource::None,
                    top_categories,
                    normalized_description: normalized,
                };
            }
        };

        let confident = best_conf >= AUTO_APPLY_THRESHOLD;
        Prediction {
            category: confident.then_some(best_label),
            confidence: Some(best_conf),
            source: if confident {
                PredictionSource::Model
            } else {
                PredictionSource::ModelUnconfident
            },
            top_categories,
            normalized_description: normalized,
        }
    }

    /// Full retrain from scratch: fresh vectorizers, fresh classifier,
    /// bundle replaced wholesale on success.
    ///
    /// An empty sample set reports `trained: false` and leaves any
    /// existing bundle untouched.
    pub fn train(&mut self, samples: &[TrainingExample]) -> Result<TrainReport> {
        if samples.is_empty() {
            return Ok(TrainReport::skipped());
        }

        let texts: Vec<String> = samples
            .iter()
            .map(|s| normalize_description(&s.description))
            .collect();
        let metas: Vec<BTreeMap<String, String>> = samples
            .iter()
            .map(|s| meta_features(s.amount, s.date, s.account_type.as_deref()))
            .collect();

        let mut labels: Vec<String> = samples.iter().map(|s| s.category.clone()).collect();
        labels.sort();
        labels.dedup();
        let label_index: BTreeMap<&str, usize> = labels
            .iter()
            .enumerate()
            .map(|(index, label)| (label.as_str(), index))
            .collect();
        let y: Vec<usize> = samples
            .iter()
            .map(|s| label_index[s.category.as_str()])
            .collect();

        let text_vectorizer = TextVectorizer::fit(&texts);
        let meta_vectorizer = MetaVectorizer::fit(&metas);
        let n_features = text_vectorizer.dim() + meta_vectorizer.dim();
        let rows: Vec<SparseVec> = texts
            .iter()
            .zip(&metas)
            .map(|(text, meta)| {
                combine(
                    text_vectorizer.transform(text),
                    meta_vectorizer.transform(meta),
                    text_vectorizer.dim(),
                )
            })
            .collect();

        let n_classes = labels.len();
        let n_samples = samples.len();
        let mut class_counts = vec![0usize; n_classes];
        for &label in &y {
            class_counts[label] += 1;
        }
        let min_class_size = class_counts.iter().copied().min().unwrap_or(0);
        let desired_test_size = ((n_samples as f64 * 0.2).round() as usize).max(1);

        let mut accuracy = None;
        let mut macro_f1 = None;
        let mut heldout = 0usize;
        let mut rng = StdRng::seed_from_u64(SPLIT_SEED);

        let classifier = if n_classes == 1 {
            let class = class_counts
                .iter()
                .enumerate()
                .max_by_key(|(_, count)| **count)
                .map(|(index, _)| index)
                .unwrap_or(0);
            Classifier::MostFrequent { class }
        } else if n_samples >= 30.max(n_classes * 5)
            && min_class_size >= 2
            && desired_test_size >= n_classes
        {
            let (train_idx, test_idx) = stratified_split(&y, n_classes, &mut rng);
            let train_rows: Vec<SparseVec> = train_idx.iter().map(|&i| rows[i].clone()).collect();
            let train_y: Vec<usize> = train_idx.iter().map(|&i| y[i]).collect();
            let eval_model =
                fit_logistic(&train_rows, &train_y, n_classes, n_features, &mut rng);
            let eval = Classifier::Logistic(eval_model);
            let predictions: Vec<usize> = test_idx
                .iter()
                .map(|&i| eval.predict(&rows[i], n_classes))
                .collect();
            let truth: Vec<usize> = test_idx.iter().map(|&i| y[i]).collect();
            accuracy = Some(accuracy_score(&truth, &predictions));
            macro_f1 = Some(macro_f1_score(&truth, &predictions, n_classes));
            heldout = test_idx.len();
            tracing::info!(
                heldout,
                accuracy = accuracy.unwrap_or_default(),
                "holdout evaluation complete, refitting on full data"
            );
            // deployed model refits on the full dataset
            Classifier::Logistic(fit_logistic(&rows, &y, n_classes, n_features, &mut rng))
        } else {
            Classifier::Logistic(fit_logistic(&rows, &y, n_classes, n_features, &mut rng))
        };

        let bundle = ModelBundle {
            text_vectorizer,
            meta_vectorizer,
            classifier,
            labels: labels.clone(),
            trained_at: Utc::now(),
        };
        self.save(&bundle)?;
        self.bundle = Some(bundle);

        Ok(TrainReport {
            trained: true,
            samples: n_samples,
            labels,
            accuracy,
            macro_f1,
            heldout_samples: heldout,
            saved_to: Some(self.model_path.clone()),
        })
    }

    fn save(&self, bundle: &ModelBundle) -> Result<()> {
        if let Some(parent) = self.model_path.parent() {
            fs::create_dir_all(parent).with_context(|| format!("create {}", parent.display()))?;
        }
        let json = serde_json::to_string_pretty(bundle)?;
        fs::write(&self.model_path, json)
            .with_context(|| format!("write {}", self.model_path.display()))?;
        Ok(())
    }

    pub fn status(&self) -> CategorizerStatus {
        match &self.bundle {
            Some(bundle) => CategorizerStatus {
                trained: true,
                trained_at: Some(bundle.trained_at),
                labels: bundle.labels.clone(),
                model_path: self.model_path.clone(),
            },
            None => CategorizerStatus {
                trained: false,
                trained_at: None,
                labels: Vec::new(),
                model_path: self.model_path.clone(),
            },
        }
    }
}

/// Per-class 20% holdout, at least one test sample per class.
fn stratified_split(
    y: &[usize],
    n_classes: usize,
    rng: &mut StdRng,
) -> (Vec<usize>, Vec<usize>) {
    let mut by_class: Vec<Vec<usize>> = vec![Vec::new(); n_classes];
    for (index, &label) in y.iter().enumerate() {
        by_class[label].push(index);
    }
    let mut train = Vec::new();
    let mut test = Vec::new();
    for mut members in by_class {
        members.shuffle(rng);
        let take = ((members.len() as f64 * 0.2).round() as usize).max(1);
        for (position, index) in members.into_iter().enumerate() {
            if position < take {
                test.push(index);
            } else {
                train.push(index);
            }
        }
    }
    (train, test)
}

fn accuracy_score(truth: &[usize], predictions: &[usize]) -> f64 {
    if truth.is_empty() {
        return 0.0;
    }
    let hits = truth
        .iter()
        .zip(predictions)
        .filter(|(t, p)| t == p)
        .count();
    hits as f64 / truth.len() as f64
}

/// Macro-averaged F1 over the classes present in the holdout truth or
/// predictions.
fn macro_f1_score(truth: &[usize], predictions: &[usize], n_classes: usize) -> f64 {
    let mut f1s = Vec::new();
    for class in 0..n_classes {
        let tp = truth
            .iter()
            .zip(predictions)
            .filter(|(t, p)| **t == class && **p == class)
            .count() as f64;
        let fp = truth
            .iter()
            .zip(predictions)
            .filter(|(t, p)| **t != class && **p == class)
            .count() as f64;
        let fn_ = truth
            .iter()
            .zip(predictions)
            .filter(|(t, p)| **t == class && **p != class)
            .count() as f64;
        if tp + fp + fn_ == 0.0 {
            continue;
        }
        let f1 = if tp == 0.0 {
            0.0
        } else {
            2.0 * tp / (2.0 * tp + fp + fn_)
        };
        f1s.push(f1);
    }
    if f1s.is_empty() {
        0.0
    } else {
        f1s.iter().sum::<f64>() / f1s.len() as f64
    }
}

/// Layered categorization: override store hit, then the model, then the
/// keyword rules, then uncategorized.
pub fn categorize_with_details(
    categorizer: &SmartCategorizer,
    overrides: Option<&OverrideStore>,
    description: &str,
    amount: Option<f64>,
    date: Option<NaiveDate>,
    account_type: Option<&str>,
) -> Prediction {
    if let Some(store) = overrides {
        if let Some(category) = store.lookup(description) {
            return Prediction {
                category: Some(category),
                confidence: None,
                source: PredictionSource::Override,
                top_categories: Vec::new(),
                normalized_description: normalize_description(description),
            };
        }
    }
    let prediction = categorizer.predict(description, amount, date, account_type);
    if prediction.category.is_none() {
        if let Some(fallback) = fallback_category(description) {
            return Prediction {
                category: Some(fallback.to_string()),
                confidence: None,
                source: PredictionSource::Rules,
                top_categories: Vec::new(),
                normalized_description: prediction.normalized_description,
            };
        }
    }
    prediction
}

/// Predict a single category, applying the rule fallback when the model
/// has nothing confident to say.
pub fn categorize_transaction(
    categorizer: &SmartCategorizer,
    description: &str,
    amount: Option<f64>,
    date: Option<NaiveDate>,
    account_type: Option<&str>,
) -> Option<String> {
    let prediction = categorizer.predict(description, amount, date, account_type);
    if prediction.category.is_some() {
        return prediction.category;
    }
    fallback_category(description).map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(description: &str, amount: f64, category: &str) -> TrainingExample {
        TrainingExample {
            description: description.to_string(),
            amount: Some(amount),
            date: NaiveDate::from_ymd_opt(2024, 1, 15),
            account_type: Some("chequing".to_string()),
            category: category.to_string(),
        }
    }

    fn open_in(dir: &tempfile::TempDir) -> SmartCategorizer {
        SmartCategorizer::open(dir.path().join("categorizer.json")).unwrap()
    }

    #[test]
    fn test_untrained_predicts_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let categorizer = open_in(&dir);
        let prediction = categorizer.predict("STARBUCKS COFFEE 123", None, None, None);
        assert_eq!(prediction.category, None);
        assert_eq!(prediction.source, PredictionSource::None);
        assert!(prediction.top_categories.is_empty());
        assert_eq!(prediction.normalized_description, "starbucks coffee");
    }

    #[test]
    fn test_empty_training_set_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let mut categorizer = open_in(&dir);
        let report = categorizer.train(&[]).unwrap();
        assert!(!report.trained);
        assert_eq!(report.samples, 0);
        assert_eq!(report.heldout_samples, 0);
        assert!(report.saved_to.is_none());
        assert!(!categorizer.status().trained);
    }

    #[test]
    fn test_single_label_trains_trivial_model() {
        let dir = tempfile::tempdir().unwrap();
        let mut categorizer = open_in(&dir);
        let samples: Vec<TrainingExample> = (0..5)
            .map(|i| sample(&format!("STARBUCKS COFFEE {i}"), -4.5, "Restaurants"))
            .collect();
        let report = categorizer.train(&samples).unwrap();
        assert!(report.trained);
        assert_eq!(report.samples, 5);
        assert_eq!(report.labels, vec!["Restaurants".to_string()]);
        assert_eq!(report.accuracy, None);
        assert_eq!(report.macro_f1, None);
        assert_eq!(report.heldout_samples, 0);

        let prediction = categorizer.predict("STARBUCKS COFFEE 9", Some(-4.5), None, None);
        assert_eq!(prediction.category.as_deref(), Some("Restaurants"));
        assert_eq!(prediction.source, PredictionSource::Model);
        assert_eq!(prediction.confidence, Some(1.0));
    }

    #[test]
    fn test_small_multiclass_skips_holdout() {
        let dir = tempfile::tempdir().unwrap();
        let mut categorizer = open_in(&dir);
        let mut samples = Vec::new();
        for i in 0..6 {
            samples.push(sample(&format!("STARBUCKS COFFEE {i}"), -4.5, "Restaurants"));
            samples.push(sample(&format!("PAYROLL ACME {i}"), 2000.0, "Income"));
        }
        // 12 samples < 30: direct fit, no metrics
        let report = categorizer.train(&samples).unwrap();
        assert!(report.trained);
        assert_eq!(report.accuracy, None);
        assert_eq!(report.heldout_samples, 0);
        assert_eq!(report.labels.len(), 2);
    }

    #[test]
    fn test_stratified_split_reserves_every_class() {
        let y = vec![0, 0, 0, 0, 0, 0, 0, 0, 1, 1];
        let mut rng = StdRng::seed_from_u64(SPLIT_SEED);
        let (train, test) = stratified_split(&y, 2, &mut rng);
        assert_eq!(train.len() + test.len(), y.len());
        assert!(test.iter().any(|&i| y[i] == 0));
        assert!(test.iter().any(|&i| y[i] == 1));
    }

    #[test]
    fn test_metrics_helpers() {
        let truth = vec![0, 0, 1, 1];
        let predictions = vec![0, 1, 1, 1];
        assert_eq!(accuracy_score(&truth, &predictions), 0.75);
        let f1 = macro_f1_score(&truth, &predictions, 2);
        // class 0: p=1, r=0.5, f1=2/3; class 1: p=2/3, r=1, f1=0.8
        assert!((f1 - (2.0 / 3.0 + 0.8) / 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_rules_fallback_when_untrained() {
        let dir = tempfile::tempdir().unwrap();
        let categorizer = open_in(&dir);
        let prediction = categorize_with_details(
            &categorizer,
            None,
            "grocery store payment",
            None,
            None,
            None,
        );
        assert_eq!(prediction.category.as_deref(), Some("Groceries"));
        assert_eq!(prediction.source, PredictionSource::Rules);
        assert_eq!(
            categorize_transaction(&categorizer, "uber trip home", None, None, None).as_deref(),
            Some("Transportation")
        );
    }
}
