use thiserror::Error;

/// Errors raised while turning a statement file into canonical transactions.
///
/// Only `HeaderNotFound` aborts an upload outright; decode failures are
/// treated by callers as "no rows".
#[derive(Error, Debug)]
pub enum StatementError {
    /// The fallback bank-export layout needs a row carrying `Description`,
    /// `Debit Amount` and `Credit Amount`.
    #[error("could not find a header row with Description, Debit Amount and Credit Amount; check your file format")]
    HeaderNotFound,

    #[error("unsupported statement format: .{0}")]
    UnsupportedFormat(String),

    #[error("failed to read statement file: {0}")]
    Read(#[from] std::io::Error),

    #[error("failed to decode spreadsheet: {0}")]
    Spreadsheet(#[from] calamine::Error),

    #[error("failed to decode csv: {0}")]
    Csv(#[from] csv::Error),
}

impl StatementError {
    /// Decode-stage failures; the upload flow shows these as an empty
    /// statement rather than aborting.
    pub fn is_parse_failure(&self) -> bool {
        !matches!(self, StatementError::HeaderNotFound)
    }
}
