//! Amount and date token cleaning shared by every statement parser
//!
//! Bank exports emit amounts in accounting notation (`($1,234.56)`) and
//! dates as compact tokens (`JAN15`, `01/15/24`, `JAN 15`) with no reliable
//! separator or year. These helpers never panic; they return `None` for
//! anything unparseable and let the caller drop the row.

use std::sync::LazyLock;

use chrono::{Datelike, NaiveDate};
use regex::Regex;

static EXPLICIT_YEAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/\d{2,4}|\d{4}").unwrap());

static MONTH_DAY_COMPACT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(JAN|FEB|MAR|APR|MAY|JUN|JUL|AUG|SEPT|SEP|OCT|NOV|DEC)(\d{1,2})$").unwrap()
});

static YEAR_HINT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:JAN|FEB|MAR|APR|MAY|JUN|JUL|AUG|SEPT|SEP|OCT|NOV|DEC)\s*\d{1,2}[-/ ]+(\d{2,4})")
        .unwrap()
});

/// Formats a date candidate may take after token normalization.
/// `%y` comes before `%Y` so bank-style 2-digit years land in 2000+YY
/// instead of the literal year 24.
const CANDIDATE_FORMATS: &[&str] = &[
    "%m/%d/%y",
    "%m/%d/%Y",
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%Y%m%d",
    "%b %d %Y",
    "%b %d, %Y",
    "%b%d %Y",
    "%d %b %Y",
];

fn month_number(abbrev: &str) -> Option<u32> {
    match abbrev {
        "JAN" => Some(1),
        "FEB" => Some(2),
        "MAR" => Some(3),
        "APR" => Some(4),
        "MAY" => Some(5),
        "JUN" => Some(6),
        "JUL" => Some(7),
        "AUG" => Some(8),
        "SEP" | "SEPT" => Some(9),
        "OCT" => Some(10),
        "NOV" => Some(11),
        "DEC" => Some(12),
        _ => None,
    }
}

/// Clean an accounting-formatted amount string into a signed number.
///
/// Strips `$`, thousands commas, and whitespace; `(...)` and the Unicode
/// minus both denote negative. The result is negative whenever either
/// marker is present, even if both are. Empty or non-numeric input yields
/// `None`.
pub fn clean_amount(raw: &str) -> Option<f64> {
    let mut text = raw.trim();
    if text.is_empty() {
        return None;
    }
    let mut negative = false;
    if let Some(inner) = text.strip_prefix('(').and_then(|v| v.strip_suffix(')')) {
        negative = true;
        text = inner;
    }
    let cleaned: String = text
        .replace('$', "")
        .replace(',', "")
        .replace(' ', "")
        .replace('\u{2212}', "-");
    if cleaned.is_empty() {
        return None;
    }
    let number: f64 = cleaned.parse().ok()?;
    if negative || number < 0.0 {
        Some(-number.abs())
    } else {
        Some(number)
    }
}

/// Scan combined document text for a month-abbrev + day + year pattern and
/// return the first year found (2-digit years normalized to 2000+YY).
pub fn infer_fallback_year(text: &str) -> Option<i32> {
    let caps = YEAR_HINT.captures(text)?;
    let year: i32 = caps[1].parse().ok()?;
    Some(if year < 100 { year + 2000 } else { year })
}

fn parse_candidate(candidate: &str) -> Option<NaiveDate> {
    CANDIDATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(candidate, fmt).ok())
}

/// Parse a bank date token, trying progressively looser candidates.
///
/// Candidates in order: the compacted token, the space-preserving variant,
/// the raw token, a synthesized `MON DD` when the compact form is a
/// month-abbrev + digits, and a month-day/year split on the last slash.
/// Tokens carrying no explicit year take `fallback_year` when supplied;
/// month-abbrev + day tokens with no year evidence at all resolve to `None`.
pub fn parse_date_token(token: &str, fallback_year: Option<i32>) -> Option<NaiveDate> {
    let token = token.trim();
    if token.is_empty() {
        return None;
    }
    let normalized: String = token
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '/' || *c == ' ')
        .collect::<String>()
        .to_uppercase();
    let compact = normalized.replace(' ', "");
    let explicit_year = EXPLICIT_YEAR.is_match(&normalized);

    let mut candidates: Vec<String> = Vec::new();
    if !compact.is_empty() {
        candidates.push(compact.clone());
    }
    if normalized.contains(' ') {
        candidates.push(normalized.clone());
    }
    candidates.push(token.to_string());
    if let Some(caps) = MONTH_DAY_COMPACT.captures(&compact) {
        candidates.push(format!("{} {}", &caps[1], &caps[2]));
    }
    if let Some((month_day, year_part)) = normalized.rsplit_once('/') {
        if !month_day.is_empty() {
            if let Ok(mut year) = year_part.trim().parse::<i32>() {
                if year < 100 {
                    year += 2000;
                }
                candidates.push(format!("{} {}", month_day.trim().replace('/', " "), year));
            }
        }
    }

    for candidate in &candidates {
        if let Some(date) = parse_candidate(candidate) {
            if !explicit_year {
                if let Some(year) = fallback_year {
                    return NaiveDate::from_ymd_opt(year, date.month(), date.day());
                }
            }
            return Some(date);
        }
    }

    // No generic format matched; a bare MON+DD token still works if the
    // surrounding document told us the year.
    if let Some(year) = fallback_year {
        if let Some(caps) = MONTH_DAY_COMPACT.captures(&compact) {
            let month = month_number(&caps[1])?;
            let day: u32 = caps[2].parse().ok()?;
            return NaiveDate::from_ymd_opt(year, month, day);
        }
    }

    None
}
