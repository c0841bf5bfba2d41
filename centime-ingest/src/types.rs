use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Caller's hint for which parser family to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StatementFormat {
    Csv,
    Pdf,
}

impl StatementFormat {
    /// Guess the format from a file extension. Unknown extensions default
    /// to CSV, the more forgiving path.
    pub fn from_path(path: &Path) -> StatementFormat {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("pdf") => StatementFormat::Pdf,
            _ => StatementFormat::Csv,
        }
    }
}

/// Normalized output of statement parsers (bank-agnostic).
///
/// Rows only materialize with a valid date, non-empty description, and a
/// parseable amount; anything less is dropped inside the parser.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawTransaction {
    pub date: NaiveDate,
    pub description: String,
    /// Negative = withdrawal/spend, positive = deposit/credit.
    pub amount: f64,
    /// Optional running balance (debit/chequing statements often include this)
    pub balance: Option<f64>,
}
