//! PDF statement extraction: a strategy chain over per-page text
//!
//! Strategies run per page in fixed order and their outputs are
//! concatenated. A line occasionally captured by both strategies is
//! accepted; bank layouts rarely trigger both at once.
//!
//! Expected table-style section after PDF-to-text:
//!   Date     Description              Withdrawals   Deposits    Balance
//!   JAN 5    E-TRANSFER SENT          120.00                    1,430.50
//!   JAN 7    PAYROLL DEPOSIT                        2,000.00    3,430.50

use std::sync::LazyLock;

use regex::Regex;

use crate::error::ParseError;
use crate::tokens::{clean_amount, infer_fallback_year, parse_date_token};
use crate::types::RawTransaction;

/// A table header must contain at least one of these to be considered.
const HEADER_KEYWORDS: &[&str] = &[
    "description",
    "withdrawal",
    "deposit",
    "date",
    "balance",
    "transaction",
];

/// Closed set of extraction strategies, run in declaration order.
///
/// New approaches (OCR, ML layout models) slot in as further variants
/// without touching the extractor loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionStrategy {
    /// Column-aligned table blocks keyed off a header line.
    Table,
    /// Line scan for `<month-abbrev+day> <description> <amount>` rows.
    RegexText,
}

impl ExtractionStrategy {
    pub fn extract(&self, page_text: &str, fallback_year: Option<i32>) -> Vec<RawTransaction> {
        match self {
            ExtractionStrategy::Table => extract_table_rows(page_text, fallback_year),
            ExtractionStrategy::RegexText => extract_regex_rows(page_text, fallback_year),
        }
    }
}

/// Generic PDF transaction extractor composed of multiple strategies.
pub struct PdfExtractor {
    strategies: Vec<ExtractionStrategy>,
}

impl Default for PdfExtractor {
    fn default() -> Self {
        Self {
            strategies: vec![ExtractionStrategy::Table, ExtractionStrategy::RegexText],
        }
    }
}

impl PdfExtractor {
    pub fn with_strategies(strategies: Vec<ExtractionStrategy>) -> Self {
        Self { strategies }
    }

    /// Extract transactions from PDF bytes.
    ///
    /// One fallback year is inferred from the full document text so that
    /// year-less date tokens parse consistently across pages.
    pub fn extract(&self, bytes: &[u8]) -> Result<Vec<RawTransaction>, ParseError> {
        let pages = pdf_extract::extract_text_from_mem_by_pages(bytes)?;
        let combined = pages.join("\n");
        let fallback_year = infer_fallback_year(&combined);
        tracing::debug!(pages = pages.len(), ?fallback_year, "extracted pdf text");

        let mut transactions = Vec::new();
        for (page_no, page_text) in pages.iter().enumerate() {
            for strategy in &self.strategies {
                let rows = strategy.extract(page_text, fallback_year);
                if !rows.is_empty() {
                    tracing::debug!(
                        page = page_no + 1,
                        strategy = ?strategy,
                        rows = rows.len(),
                        "strategy produced rows"
                    );
                }
                transactions.extend(rows);
            }
        }

        if transactions.is_empty() {
            return Err(ParseError::NoTransactions);
        }
        Ok(transactions)
    }
}

// ---------------------------------------------------------------------------
// Table strategy
// ---------------------------------------------------------------------------

/// Positional cells of one visual table row; a cell may hold newline-joined
/// sub-values when several transactions stack in one row.
type Table = Vec<Vec<String>>;

static CELL_SEPARATOR: LazyLock<Regex> = LazyLock::new(|| Regex::new(r" {2,}|\t").unwrap());

fn extract_table_rows(page_text: &str, fallback_year: Option<i32>) -> Vec<RawTransaction> {
    detect_tables(page_text)
        .iter()
        .flat_map(|table| rows_from_table(table, fallback_year))
        .collect()
}

/// Text segments of a line split on runs of 2+ spaces, with their column
/// offsets.
fn segment_line(line: &str) -> Vec<(usize, String)> {
    let mut segments = Vec::new();
    let mut last = 0usize;
    for sep in CELL_SEPARATOR.find_iter(line) {
        if sep.start() > last {
            let text = line[last..sep.start()].trim();
            if !text.is_empty() {
                segments.push((last, text.to_string()));
            }
        }
        last = sep.end();
    }
    if last < line.len() {
        let text = line[last..].trim();
        if !text.is_empty() {
            segments.push((last, text.to_string()));
        }
    }
    segments
}

/// Assign each segment to the header column whose start offset is nearest.
/// Two segments landing in one column stack as newline-joined sub-values.
fn align_to_columns(segments: &[(usize, String)], col_starts: &[usize]) -> Vec<String> {
    let mut cells = vec![String::new(); col_starts.len()];
    for (start, text) in segments {
        let Some(best) = col_starts
            .iter()
            .enumerate()
            .min_by_key(|(_, col_start)| start.abs_diff(**col_start))
            .map(|(idx, _)| idx)
        else {
            continue;
        };
        if cells[best].is_empty() {
            cells[best] = text.clone();
        } else {
            cells[best].push('\n');
            cells[best].push_str(text);
        }
    }
    cells
}

/// Recover table blocks from extracted text: a line containing a known
/// header keyword starts a block, following non-empty lines become rows
/// aligned to the header's column offsets, and a blank line ends it.
fn detect_tables(page_text: &str) -> Vec<Table> {
    let mut tables = Vec::new();
    // (header column offsets, accumulated rows) for the open block
    let mut current: Option<(Vec<usize>, Table)> = None;

    for line in page_text.lines() {
        if line.trim().is_empty() {
            if let Some((_, table)) = current.take() {
                if table.len() > 1 {
                    tables.push(table);
                }
            }
            continue;
        }
        let segments = segment_line(line);
        current = match current.take() {
            Some((col_starts, mut table)) => {
                table.push(align_to_columns(&segments, &col_starts));
                Some((col_starts, table))
            }
            None => {
                let texts: Vec<String> = segments.iter().map(|(_, text)| text.clone()).collect();
                if segments.len() >= 2 && header_matches(&texts) {
                    let col_starts = segments.into_iter().map(|(start, _)| start).collect();
                    Some((col_starts, vec![texts]))
                } else {
                    None
                }
            }
        };
    }
    if let Some((_, table)) = current.take() {
        if table.len() > 1 {
            tables.push(table);
        }
    }
    tables
}

fn header_matches(cells: &[String]) -> bool {
    cells.iter().any(|cell| {
        let lowered = cell.to_lowercase();
        HEADER_KEYWORDS.iter().any(|kw| lowered.contains(kw))
    })
}

fn find_index(header: &[String], keywords: &[&str]) -> Option<usize> {
    header
        .iter()
        .position(|cell| keywords.iter().any(|kw| cell.contains(kw)))
}

fn split_cell(cell: &str) -> Vec<String> {
    cell.replace('\r', "\n")
        .split('\n')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(str::to_string)
        .collect()
}

fn value_at(split_cols: &[Vec<String>], column_idx: Option<usize>, row_idx: usize) -> String {
    let Some(column_idx) = column_idx else {
        return String::new();
    };
    split_cols
        .get(column_idx)
        .and_then(|column| column.get(row_idx))
        .cloned()
        .unwrap_or_default()
}

fn rows_from_table(table: &Table, fallback_year: Option<i32>) -> Vec<RawTransaction> {
    let Some(header_row) = table.first() else {
        return Vec::new();
    };
    if !header_matches(header_row) {
        return Vec::new();
    }
    let header: Vec<String> = header_row.iter().map(|c| c.trim().to_lowercase()).collect();

    let desc_idx = find_index(&header, &["description", "transaction", "details"]).unwrap_or(0);
    let mut withdraw_idx = find_index(&header, &["withdraw", "debit"]);
    let mut deposit_idx = find_index(&header, &["deposit", "credit"]);
    let mut date_idx = find_index(&header, &["date"]);
    let mut balance_idx = find_index(&header, &["balance"]);
    // Ambiguous headers fall back to the conventional column positions.
    if withdraw_idx.is_none() && header.len() > 1 {
        withdraw_idx = Some(1);
    }
    if deposit_idx.is_none() && header.len() > 2 {
        deposit_idx = Some(2);
    }
    if date_idx.is_none() && header.len() > 3 {
        date_idx = Some(3);
    }
    if balance_idx.is_none() && header.len() > 4 {
        balance_idx = Some(4);
    }

    let mut out = Vec::new();
    for raw_row in &table[1..] {
        let split_cols: Vec<Vec<String>> = raw_row.iter().map(|cell| split_cell(cell)).collect();
        let max_len = split_cols.iter().map(Vec::len).max().unwrap_or(0);
        for sub_row in 0..max_len {
            let description = value_at(&split_cols, Some(desc_idx), sub_row);
            let withdrawal = value_at(&split_cols, withdraw_idx, sub_row);
            let deposit = value_at(&split_cols, deposit_idx, sub_row);
            let date_token = value_at(&split_cols, date_idx, sub_row);

            if description.is_empty() && withdrawal.is_empty() && deposit.is_empty() {
                continue;
            }
            // Running-balance markers, not transactions.
            let upper = description.to_uppercase();
            if upper.starts_with("STARTING") || upper.starts_with("ENDING") {
                continue;
            }
            if description.is_empty() {
                continue;
            }

            let Some(date) = parse_date_token(&date_token, fallback_year) else {
                continue;
            };
            let debit = clean_amount(&withdrawal);
            let credit = clean_amount(&deposit);
            let amount = match (debit, credit) {
                (Some(d), _) if d != 0.0 => -d.abs(),
                (_, Some(c)) if c != 0.0 => c.abs(),
                _ => continue,
            };
            let balance = balance_idx
                .map(|idx| value_at(&split_cols, Some(idx), sub_row))
                .and_then(|text| clean_amount(&text));

            out.push(RawTransaction {
                date,
                description,
                amount,
                balance,
            });
        }
    }
    out
}

// ---------------------------------------------------------------------------
// Regex text strategy
// ---------------------------------------------------------------------------

// <month-abbrev+day> <description> <optional sign><optional $><amount>
static LINE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"(?i)^(?P<date>(?:JAN|FEB|MAR|APR|MAY|JUN|JUL|AUG|SEPT|SEP|OCT|NOV|DEC)[A-Z\s]*\d{1,2})",
        r"\s+(?P<desc>.+?)\s+",
        r"(?P<amount>[+\-]?\$?\d[\d,]*(?:\.\d{2})?)$"
    ))
    .unwrap()
});

/// Fallback scan of plain text lines for date + amount patterns; useful
/// when a statement's layout defeats table recovery.
fn extract_regex_rows(page_text: &str, fallback_year: Option<i32>) -> Vec<RawTransaction> {
    page_text
        .lines()
        .filter_map(|line| {
            let caps = LINE_RE.captures(line.trim())?;
            let date = parse_date_token(&caps["date"], fallback_year)?;
            let amount = clean_amount(&caps["amount"])?;
            let description = caps["desc"].trim().to_string();
            if description.is_empty() {
                return None;
            }
            Some(RawTransaction {
                date,
                description,
                amount,
                balance: None,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn statement_line(c0: &str, c1: &str, c2: &str, c3: &str, c4: &str) -> String {
        format!("{c0:<9}{c1:<19}{c2:<14}{c3:<11}{c4}\n")
    }

    fn sample_table_page() -> String {
        let mut page = String::new();
        page.push_str(&statement_line(
            "Date",
            "Description",
            "Withdrawals",
            "Deposits",
            "Balance",
        ));
        page.push_str(&statement_line(
            "JAN 5",
            "E-TRANSFER SENT",
            "120.00",
            "",
            "1,430.50",
        ));
        page.push_str(&statement_line(
            "JAN 7",
            "PAYROLL DEPOSIT",
            "",
            "2,000.00",
            "3,430.50",
        ));
        page
    }

    #[test]
    fn test_table_strategy_basic() {
        let rows = extract_table_rows(&sample_table_page(), Some(2024));
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].date, date(2024, 1, 5));
        assert_eq!(rows[0].amount, -120.00);
        assert_eq!(rows[0].balance, Some(1430.50));
        assert_eq!(rows[1].date, date(2024, 1, 7));
        assert_eq!(rows[1].amount, 2000.00);
        assert_eq!(rows[1].balance, Some(3430.50));
    }

    #[test]
    fn test_table_strategy_skips_balance_markers() {
        let mut page = String::new();
        page.push_str(&statement_line(
            "Date",
            "Description",
            "Withdrawals",
            "Deposits",
            "Balance",
        ));
        page.push_str(&statement_line("JAN 1", "STARTING BALANCE", "", "", "1,000.00"));
        page.push_str(&statement_line("JAN 5", "WEB PAYMENT", "120.00", "", "880.00"));
        page.push_str(&statement_line("JAN 31", "ENDING BALANCE", "", "", "880.00"));
        let rows = extract_table_rows(&page, Some(2024));
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].description, "WEB PAYMENT");
        assert_eq!(rows[0].amount, -120.00);
    }

    #[test]
    fn test_table_rows_with_stacked_sub_values() {
        // one visual row carrying two stacked transactions per cell
        let table: Table = vec![
            vec![
                "Date".into(),
                "Description".into(),
                "Withdrawals".into(),
                "Deposits".into(),
            ],
            vec![
                "JAN 5\nJAN 6".into(),
                "COFFEE\nBOOKSTORE".into(),
                "4.50\n30.00".into(),
                String::new(),
            ],
        ];
        let rows = rows_from_table(&table, Some(2024));
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].description, "COFFEE");
        assert_eq!(rows[0].amount, -4.50);
        assert_eq!(rows[1].date, date(2024, 1, 6));
        assert_eq!(rows[1].amount, -30.00);
    }

    #[test]
    fn test_table_rows_without_dates_are_dropped() {
        let table: Table = vec![
            vec!["Date".into(), "Description".into(), "Withdrawals".into()],
            vec![String::new(), "MYSTERY ROW".into(), "10.00".into()],
        ];
        assert!(rows_from_table(&table, Some(2024)).is_empty());
    }

    #[test]
    fn test_blank_line_ends_a_table_block() {
        let mut page = sample_table_page();
        page.push('\n');
        page.push_str("JAN 9    SHOULD NOT APPEAR  10.00\n");
        let rows = extract_table_rows(&page, Some(2024));
        assert_eq!(rows.len(), 2);
    }

    #[test]
    fn test_regex_strategy_matches_statement_lines() {
        let page = "\
Account Summary
JAN 15  INTERAC E-TRANSFER SENT  -$45.00
JAN 16  PAYROLL ACME INC  2,000.00
Totals do not match this pattern
";
        let rows = extract_regex_rows(page, Some(2024));
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].date, date(2024, 1, 15));
        assert_eq!(rows[0].amount, -45.00);
        assert_eq!(rows[0].description, "INTERAC E-TRANSFER SENT");
        assert_eq!(rows[1].amount, 2000.00);
    }

    #[test]
    fn test_regex_strategy_ignores_non_matching_lines() {
        let page = "no transactions on this page\n123 not a date line 45.00\n";
        assert!(extract_regex_rows(page, Some(2024)).is_empty());
    }

    #[test]
    fn test_extractor_reports_pdf_failures() {
        let err = PdfExtractor::default().extract(b"not a pdf").unwrap_err();
        assert!(matches!(err, ParseError::Pdf(_)));
    }
}
