//! Statement layout detection.

use crate::types::{Cell, Sheet};

/// Columns a pre-normalized export must carry, matched case-insensitively
/// against the first-row headers.
const CANONICAL_COLUMNS: [&str; 3] = ["type", "amount", "description"];

/// Labels that mark the header row of a raw bank export. Matched exactly,
/// including case, anywhere in the sheet.
pub(crate) const BANK_EXPORT_COLUMNS: [&str; 3] = ["Description", "Debit Amount", "Credit Amount"];

/// The two statement layouts the normalizer understands, chosen once per
/// sheet before any row is transformed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementFormat {
    /// Sheet already carries type/amount/description columns; rows pass
    /// through with field renaming only.
    Canonical,
    /// Raw bank export; transactions start on the row after `header_row`.
    BankExport { header_row: usize },
}

/// Decide which layout a sheet uses. `None` means neither matched.
pub fn detect(sheet: &Sheet) -> Option<StatementFormat> {
    let header: Vec<String> = sheet.header().iter().map(|h| h.to_lowercase()).collect();
    let has_data_rows = sheet.raw_rows().len() > 1;
    if has_data_rows && CANONICAL_COLUMNS.iter().all(|c| header.iter().any(|h| h == c)) {
        return Some(StatementFormat::Canonical);
    }

    let header_row = sheet.raw_rows().iter().position(|row| {
        BANK_EXPORT_COLUMNS
            .iter()
            .all(|&label| row.iter().any(|cell| cell.as_str() == Some(label)))
    })?;
    Some(StatementFormat::BankExport { header_row })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text_row(cells: &[&str]) -> Vec<Cell> {
        cells.iter().map(|c| Cell::Text(c.to_string())).collect()
    }

    #[test]
    fn test_detects_canonical_case_insensitively() {
        let sheet = Sheet::new(vec![
            text_row(&["Type", "Amount", "Description", "Category"]),
            text_row(&["debit", "100", "groceries", "Food"]),
        ]);
        assert_eq!(detect(&sheet), Some(StatementFormat::Canonical));
    }

    #[test]
    fn test_canonical_needs_a_data_row() {
        let sheet = Sheet::new(vec![text_row(&["type", "amount", "description"])]);
        assert_eq!(detect(&sheet), None);
    }

    #[test]
    fn test_detects_bank_export_below_preamble() {
        let sheet = Sheet::new(vec![
            text_row(&["Account Statement"]),
            text_row(&[""]),
            text_row(&["Txn Date", "Description", "Debit Amount", "Credit Amount"]),
            text_row(&["01/06/2024", "POS/AMAZON/1/Shopping", "500", ""]),
        ]);
        assert_eq!(detect(&sheet), Some(StatementFormat::BankExport { header_row: 2 }));
    }

    #[test]
    fn test_bank_export_labels_are_case_sensitive() {
        let sheet = Sheet::new(vec![
            text_row(&["txn date", "description", "debit amount", "credit amount"]),
            text_row(&["01/06/2024", "POS/AMAZON/1/Shopping", "500", ""]),
        ]);
        assert_eq!(detect(&sheet), None);
    }
}
