//! Merchant description normalization shared by features and override keys

use std::sync::LazyLock;

use regex::Regex;

/// Card/processor boilerplate that carries no merchant signal.
pub const STOPWORDS: &[&str] = &[
    "pos",
    "visa",
    "debit",
    "credit",
    "purchase",
    "auth",
    "card",
    "transaction",
    "withdrawal",
    "deposit",
    "online",
    "transfer",
];

// strip long digit runs (timestamps, ids)
static DIGIT_RUNS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d{2,}").unwrap());
static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// Canonicalize a raw statement description.
///
/// Lowercases, drops digit runs and stopwords, collapses whitespace. The
/// output is used both as the classifier text feature and as the override
/// store key, so the two always agree on what a description "is".
pub fn normalize_description(text: &str) -> String {
    let lowered = text.to_lowercase().replace([';', ','], " ");
    let stripped = DIGIT_RUNS.replace_all(&lowered, " ");
    let collapsed = WHITESPACE.replace_all(&stripped, " ");
    collapsed
        .split(' ')
        .filter(|tok| !tok.is_empty() && !STOPWORDS.contains(tok))
        .collect::<Vec<_>>()
        .join(" ")
        .trim()
        .to_string()
}
