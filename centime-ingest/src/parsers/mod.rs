//! Statement parser families: CSV (header + headerless) and PDF (strategy chain)

pub mod csv;
pub mod pdf;

use crate::error::ParseError;
use crate::types::{RawTransaction, StatementFormat};

/// Parse raw statement bytes using the hinted format family.
pub fn parse_statement(
    bytes: &[u8],
    format: StatementFormat,
) -> Result<Vec<RawTransaction>, ParseError> {
    match format {
        StatementFormat::Csv => csv::parse_csv(bytes),
        StatementFormat::Pdf => pdf::PdfExtractor::default().extract(bytes),
    }
}
