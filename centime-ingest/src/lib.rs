//! centime-ingest: statement ingestion (CSV and PDF) and the token
//! cleaning utilities the parsers share.

pub mod error;
pub mod parsers;
pub mod tokens;
pub mod types;

pub use error::ParseError;
pub use parsers::parse_statement;
pub use parsers::pdf::{ExtractionStrategy, PdfExtractor};
pub use tokens::{clean_amount, infer_fallback_year, parse_date_token};
pub use types::{RawTransaction, StatementFormat};
