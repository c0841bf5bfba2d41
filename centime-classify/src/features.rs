//! Feature extraction: tf-idf over character n-grams plus one-hot
//! transaction metadata
//!
//! Vectorizers are fitted from scratch on every train call and persisted
//! inside the model bundle; they are never updated incrementally.

use std::collections::{BTreeMap, HashMap};

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

/// Sparse feature vector: (index, value) pairs sorted by index.
pub type SparseVec = Vec<(usize, f64)>;

const NGRAM_MIN: usize = 3;
const NGRAM_MAX: usize = 5;
const MIN_DF: usize = 2;
const MAX_FEATURES: usize = 120_000;

/// tf-idf over ASCII character n-grams of length 3-5.
///
/// Smoothed idf and l2-normalized rows, so every transformed vector has
/// unit norm (or is empty when nothing in the text is in-vocabulary).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextVectorizer {
    vocabulary: HashMap<String, usize>,
    idf: Vec<f64>,
}

fn char_ngrams(text: &str) -> Vec<String> {
    let folded: Vec<char> = text.chars().filter(char::is_ascii).collect();
    let mut grams = Vec::new();
    for n in NGRAM_MIN..=NGRAM_MAX {
        if folded.len() < n {
            break;
        }
        for window in folded.windows(n) {
            grams.push(window.iter().collect());
        }
    }
    grams
}

impl TextVectorizer {
    /// Build a fresh vocabulary from normalized descriptions: terms seen in
    /// at least [`MIN_DF`] documents, capped at [`MAX_FEATURES`] by corpus
    /// frequency, indexed in sorted term order.
    pub fn fit(texts: &[String]) -> TextVectorizer {
        let n_docs = texts.len();
        let mut doc_freq: HashMap<String, usize> = HashMap::new();
        let mut corpus_freq: HashMap<String, usize> = HashMap::new();
        for text in texts {
            let grams = char_ngrams(text);
            for gram in &grams {
                *corpus_freq.entry(gram.clone()).or_default() += 1;
            }
            let mut unique: Vec<&String> = grams.iter().collect();
            unique.sort();
            unique.dedup();
            for gram in unique {
                *doc_freq.entry(gram.clone()).or_default() += 1;
            }
        }

        let mut terms: Vec<(String, usize)> = doc_freq
            .into_iter()
            .filter(|(_, df)| *df >= MIN_DF)
            .collect();
        if terms.len() > MAX_FEATURES {
            terms.sort_by(|a, b| {
                corpus_freq[&b.0]
                    .cmp(&corpus_freq[&a.0])
                    .then_with(|| a.0.cmp(&b.0))
            });
            terms.truncate(MAX_FEATURES);
        }
        terms.sort_by(|a, b| a.0.cmp(&b.0));

        let mut vocabulary = HashMap::with_capacity(terms.len());
        let mut idf = Vec::with_capacity(terms.len());
        for (index, (term, df)) in terms.into_iter().enumerate() {
            vocabulary.insert(term, index);
            idf.push((((1 + n_docs) as f64) / ((1 + df) as f64)).ln() + 1.0);
        }
        TextVectorizer { vocabulary, idf }
    }

    pub fn dim(&self) -> usize {
        self.idf.len()
    }

    pub fn transform(&self, text: &str) -> SparseVec {
        let mut counts: HashMap<usize, f64> = HashMap::new();
        for gram in char_ngrams(text) {
            if let Some(&index) = self.vocabulary.get(&gram) {
                *counts.entry(index).or_default() += 1.0;
            }
        }
        let mut vector: SparseVec = counts
            .into_iter()
            .map(|(index, tf)| (index, tf * self.idf[index]))
            .collect();
        let norm: f64 = vector.iter().map(|(_, v)| v * v).sum::<f64>().sqrt();
        if norm > 0.0 {
            for (_, value) in &mut vector {
                *value /= norm;
            }
        }
        vector.sort_by_key(|(index, _)| *index);
        vector
    }
}

/// One-hot vectorizer over `key=value` metadata features.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetaVectorizer {
    vocabulary: HashMap<String, usize>,
}

impl MetaVectorizer {
    pub fn fit(rows: &[BTreeMap<String, String>]) -> MetaVectorizer {
        let mut terms: Vec<String> = rows
            .iter()
            .flat_map(|row| row.iter().map(|(k, v)| format!("{k}={v}")))
            .collect();
        terms.sort();
        terms.dedup();
        let vocabulary = terms
            .into_iter()
            .enumerate()
            .map(|(index, term)| (term, index))
            .collect();
        MetaVectorizer { vocabulary }
    }

    pub fn dim(&self) -> usize {
        self.vocabulary.len()
    }

    pub fn transform(&self, row: &BTreeMap<String, String>) -> SparseVec {
        let mut vector: SparseVec = row
            .iter()
            .filter_map(|(k, v)| {
                self.vocabulary
                    .get(&format!("{k}={v}"))
                    .map(|&index| (index, 1.0))
            })
            .collect();
        vector.sort_by_key(|(index, _)| *index);
        vector
    }
}

/// Derive metadata features for one transaction.
///
/// Amount contributes its sign and a log-scaled magnitude bucket, the date
/// its month and day-of-week (Monday = 0), the account type its lowercased
/// name. Non-finite amounts contribute nothing.
pub fn meta_features(
    amount: Option<f64>,
    date: Option<NaiveDate>,
    account_type: Option<&str>,
) -> BTreeMap<String, String> {
    let mut meta = BTreeMap::new();
    if let Some(amount) = amount {
        if amount.is_finite() {
            let sign = if amount > 0.0 { "credit" } else { "debit" };
            meta.insert("amount_sign".to_string(), sign.to_string());
            let bucket = ((amount.abs() + 1.0).log10() * 3.0).round() as i64;
            meta.insert("amount_bucket".to_string(), bucket.to_string());
        }
    }
    if let Some(date) = date {
        meta.insert("month".to_string(), date.month().to_string());
        meta.insert(
            "dow".to_string(),
            date.weekday().num_days_from_monday().to_string(),
        );
    }
    if let Some(account_type) = account_type {
        meta.insert("account_type".to_string(), account_type.to_lowercase());
    }
    meta
}

/// Concatenate a text vector and a meta vector into one feature space.
pub fn combine(text: SparseVec, meta: SparseVec, text_dim: usize) -> SparseVec {
    let mut combined = text;
    combined.extend(meta.into_iter().map(|(index, value)| (index + text_dim, value)));
    combined
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fit_sample() -> TextVectorizer {
        TextVectorizer::fit(&[
            "starbucks coffee".to_string(),
            "starbucks latte".to_string(),
            "payroll acme".to_string(),
        ])
    }

    #[test]
    fn test_min_df_filters_singleton_grams() {
        let vectorizer = fit_sample();
        // "starbucks" grams appear in two documents, "payroll" grams in one
        assert!(vectorizer.vocabulary.contains_key("sta"));
        assert!(!vectorizer.vocabulary.contains_key("pay"));
    }

    #[test]
    fn test_transform_is_l2_normalized() {
        let vectorizer = fit_sample();
        let vector = vectorizer.transform("starbucks coffee");
        assert!(!vector.is_empty());
        let norm: f64 = vector.iter().map(|(_, v)| v * v).sum();
        assert!((norm - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_out_of_vocabulary_transforms_to_empty() {
        let vectorizer = fit_sample();
        assert!(vectorizer.transform("zzzz qqqq").is_empty());
    }

    #[test]
    fn test_meta_features_buckets_and_sign() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(); // a Monday
        let meta = meta_features(Some(-42.0), Some(date), Some("Chequing"));
        assert_eq!(meta["amount_sign"], "debit");
        // round(log10(43) * 3) = round(4.90) = 5
        assert_eq!(meta["amount_bucket"], "5");
        assert_eq!(meta["month"], "1");
        assert_eq!(meta["dow"], "0");
        assert_eq!(meta["account_type"], "chequing");
    }

    #[test]
    fn test_meta_features_skip_non_finite_amounts() {
        let meta = meta_features(Some(f64::NAN), None, None);
        assert!(meta.is_empty());
    }

    #[test]
    fn test_meta_vectorizer_round_trip() {
        let rows = vec![
            meta_features(Some(10.0), None, Some("chequing")),
            meta_features(Some(-10.0), None, Some("credit")),
        ];
        let vectorizer = MetaVectorizer::fit(&rows);
        let vector = vectorizer.transform(&rows[0]);
        assert_eq!(vector.len(), rows[0].len());
        // unseen values contribute nothing
        let unseen = meta_features(Some(10.0), None, Some("brokerage"));
        let vector = vectorizer.transform(&unseen);
        assert_eq!(vector.len(), 2); // amount_sign + amount_bucket still known
    }

    #[test]
    fn test_combine_offsets_meta_indices() {
        let combined = combine(vec![(0, 1.0)], vec![(0, 1.0), (2, 1.0)], 10);
        assert_eq!(combined, vec![(0, 1.0), (10, 1.0), (12, 1.0)]);
    }
}
