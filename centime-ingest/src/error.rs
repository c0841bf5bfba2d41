//! Parse failure taxonomy surfaced to callers
//!
//! Individual bad rows are never errors; they are dropped during parsing.
//! Only whole-document failures reach this type.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ParseError {
    /// Statement bytes matched neither recognized CSV shape.
    #[error(
        "CSV format not recognized. Provide headers (Date, Description, Amount) \
         or a headerless export with columns date, description, withdrawal, deposit, balance."
    )]
    UnrecognizedCsv,

    /// Every page and strategy produced zero rows.
    #[error(
        "no recognizable transactions found in PDF; \
         ensure the statement contains tabular data"
    )]
    NoTransactions,

    /// The PDF could not be opened or its text extracted.
    #[error("unable to parse PDF")]
    Pdf(#[from] pdf_extract::OutputError),
}
