//! CSV statement parsing: header-detected standard format with a
//! headerless withdrawal/deposit fallback
//!
//! Standard shape:
//!   Date,Description,Amount[,Balance]
//! Headerless statement shape (no header row):
//!   date, description, withdrawal, deposit[, balance]

use std::collections::HashMap;

use csv::ReaderBuilder;

use crate::error::ParseError;
use crate::tokens::{clean_amount, parse_date_token};
use crate::types::RawTransaction;

/// Case/space/underscore-insensitive header key.
fn normalize_header(name: &str) -> String {
    name.trim()
        .to_lowercase()
        .replace([' ', '_'], "")
}

fn decode_utf8(bytes: &[u8]) -> String {
    // Tolerate a UTF-8 BOM from spreadsheet exports.
    let bytes = bytes.strip_prefix(b"\xef\xbb\xbf").unwrap_or(bytes);
    String::from_utf8_lossy(bytes).into_owned()
}

/// Parse CSV statement bytes, trying the standard header format first and
/// the headerless statement layout second. Rows missing a valid date,
/// description, or amount are dropped. Fails only when neither shape
/// yields a single row.
pub fn parse_csv(bytes: &[u8]) -> Result<Vec<RawTransaction>, ParseError> {
    let text = decode_utf8(bytes);
    match try_standard_format(&text) {
        // Headers matched but every row was invalid: the file is in a
        // recognized shape with no usable data, not a headerless export.
        Some(rows) if !rows.is_empty() => return Ok(rows),
        Some(_) => return Err(ParseError::UnrecognizedCsv),
        None => {}
    }
    match try_statement_format(&text) {
        Some(rows) if !rows.is_empty() => Ok(rows),
        _ => Err(ParseError::UnrecognizedCsv),
    }
}

fn try_standard_format(text: &str) -> Option<Vec<RawTransaction>> {
    let mut rdr = ReaderBuilder::new()
        .flexible(true)
        .from_reader(text.as_bytes());
    let headers = rdr.headers().ok()?.clone();
    let header_map: HashMap<String, usize> = headers
        .iter()
        .enumerate()
        .map(|(idx, name)| (normalize_header(name), idx))
        .collect();

    let date_idx = *header_map.get("date")?;
    let desc_idx = *header_map.get("description")?;
    let amount_idx = *header_map.get("amount")?;
    let balance_idx = header_map.get("balance").copied();

    let mut rows = Vec::new();
    for record in rdr.records() {
        let Ok(record) = record else { continue };
        let Some(date) = record.get(date_idx).and_then(|s| parse_date_token(s, None)) else {
            continue;
        };
        let description = record.get(desc_idx).unwrap_or("").trim().to_string();
        if description.is_empty() {
            continue;
        }
        let Some(amount) = record.get(amount_idx).and_then(clean_amount) else {
            continue;
        };
        let balance = balance_idx
            .and_then(|idx| record.get(idx))
            .and_then(clean_amount);
        rows.push(RawTransaction {
            date,
            description,
            amount,
            balance,
        });
    }
    Some(rows)
}

fn try_statement_format(text: &str) -> Option<Vec<RawTransaction>> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(text.as_bytes());
    let records: Vec<csv::StringRecord> = rdr.records().filter_map(Result::ok).collect();
    if records.first().map_or(true, |r| r.len() < 4) {
        return None;
    }

    let mut rows = Vec::new();
    for record in &records {
        if record.len() < 4 {
            continue;
        }
        let Some(date) = record.get(0).and_then(|s| parse_date_token(s, None)) else {
            continue;
        };
        let description = record.get(1).unwrap_or("").trim().to_string();
        if description.is_empty() {
            continue;
        }
        let withdrawal = record.get(2).and_then(clean_amount).unwrap_or(0.0);
        let deposit = record.get(3).and_then(clean_amount).unwrap_or(0.0);
        let balance = if record.len() >= 5 {
            record.get(4).and_then(clean_amount)
        } else {
            None
        };
        rows.push(RawTransaction {
            date,
            description,
            amount: deposit - withdrawal,
            balance,
        });
    }
    Some(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_standard_format_round_trip() {
        let csv = "Date,Description,Amount\n\
                   2024-01-15,COFFEE SHOP,-4.50\n\
                   2024-01-16,PAYROLL DEPOSIT,2000.00\n";
        let rows = parse_csv(csv.as_bytes()).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].date, date(2024, 1, 15));
        assert_eq!(rows[0].amount, -4.50);
        assert_eq!(rows[1].date, date(2024, 1, 16));
        assert_eq!(rows[1].amount, 2000.00);
        assert_eq!(rows[0].balance, None);
    }

    #[test]
    fn test_standard_format_header_aliases() {
        // header matching is case/space/underscore-insensitive
        let csv = "DATE, Description ,AMOUNT,Balance\n\
                   01/15/2024,STORE,-10.00,990.00\n";
        let rows = parse_csv(csv.as_bytes()).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].balance, Some(990.0));
    }

    #[test]
    fn test_standard_format_drops_bad_rows() {
        let csv = "Date,Description,Amount\n\
                   not-a-date,COFFEE,-4.50\n\
                   2024-01-16,,2000.00\n\
                   2024-01-17,OK ROW,not-a-number\n\
                   2024-01-18,KEPT,12.00\n";
        let rows = parse_csv(csv.as_bytes()).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].description, "KEPT");
    }

    #[test]
    fn test_headerless_statement_format() {
        let csv = "01/15/24,GROCERY STORE,50.00,0.00,450.00\n\
                   01/16/24,PAY,0.00,1200.00,1650.00\n";
        let rows = parse_csv(csv.as_bytes()).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].date, date(2024, 1, 15));
        assert_eq!(rows[0].amount, -50.00);
        assert_eq!(rows[0].balance, Some(450.00));
        assert_eq!(rows[1].amount, 1200.00);
    }

    #[test]
    fn test_headerless_four_columns_has_no_balance() {
        let csv = "01/15/24,GROCERY STORE,50.00,0.00\n";
        let rows = parse_csv(csv.as_bytes()).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].amount, -50.00);
        assert_eq!(rows[0].balance, None);
    }

    #[test]
    fn test_unrecognized_format_errors() {
        let csv = "just,three,cols\nfoo,bar,baz\n";
        let err = parse_csv(csv.as_bytes()).unwrap_err();
        assert!(matches!(err, ParseError::UnrecognizedCsv));
        assert!(err.to_string().contains("Date, Description, Amount"));
    }

    #[test]
    fn test_bom_is_tolerated() {
        let csv = "\u{feff}Date,Description,Amount\n2024-02-01,SHOP,-1.00\n";
        let rows = parse_csv(csv.as_bytes()).unwrap();
        assert_eq!(rows.len(), 1);
    }
}
