//! Tabular statement data as it arrives from the spreadsheet decoder.

use std::collections::HashMap;

/// A spreadsheet cell reduced to the shapes the pipeline cares about.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Text(String),
    Number(f64),
}

impl Cell {
    /// Exact text content, `None` for non-text cells. Used for exact-case
    /// header matching.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Cell::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Render the cell as text. Whole numbers print without a fraction so a
    /// numeric header like `2024` matches its text form.
    pub fn to_text(&self) -> String {
        match self {
            Cell::Empty => String::new(),
            Cell::Text(s) => s.clone(),
            Cell::Number(n) => {
                if n.fract() == 0.0 && n.abs() < 1e15 {
                    format!("{}", *n as i64)
                } else {
                    n.to_string()
                }
            }
        }
    }

    /// Numeric value: numbers pass through, text is parsed after trimming
    /// and dropping comma separators. Blank or unparseable text is `None`.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Cell::Number(n) => Some(*n),
            Cell::Text(s) => {
                let s = s.trim().replace(',', "");
                if s.is_empty() {
                    return None;
                }
                s.parse().ok()
            }
            Cell::Empty => None,
        }
    }

    pub fn is_blank(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Text(s) => s.trim().is_empty(),
            Cell::Number(_) => false,
        }
    }
}

/// First worksheet of an uploaded statement.
///
/// Exposed two ways: raw positional rows (needed when the real header is not
/// on row 0) and header-keyed records built from row 0, mirroring how a
/// sheet-to-records conversion reads a clean export.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Sheet {
    rows: Vec<Vec<Cell>>,
}

impl Sheet {
    pub fn new(rows: Vec<Vec<Cell>>) -> Self {
        Self { rows }
    }

    pub fn raw_rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.rows.iter().all(|r| r.iter().all(Cell::is_blank))
    }

    /// Row 0 rendered as header labels.
    pub fn header(&self) -> Vec<String> {
        self.rows
            .first()
            .map(|row| row.iter().map(Cell::to_text).collect())
            .unwrap_or_default()
    }

    /// Rows below row 0, keyed by the row-0 header labels. Blank header
    /// labels are skipped.
    pub fn records(&self) -> Vec<HashMap<String, Cell>> {
        let header = self.header();
        self.rows
            .iter()
            .skip(1)
            .map(|row| {
                header
                    .iter()
                    .enumerate()
                    .filter(|(_, label)| !label.trim().is_empty())
                    .map(|(i, label)| {
                        (label.clone(), row.get(i).cloned().unwrap_or(Cell::Empty))
                    })
                    .collect()
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_as_f64_handles_text_numbers() {
        assert_eq!(Cell::Number(500.0).as_f64(), Some(500.0));
        assert_eq!(Cell::Text(" 1,234.50 ".to_string()).as_f64(), Some(1234.50));
        assert_eq!(Cell::Text("".to_string()).as_f64(), None);
        assert_eq!(Cell::Text("n/a".to_string()).as_f64(), None);
        assert_eq!(Cell::Empty.as_f64(), None);
    }

    #[test]
    fn test_cell_to_text_drops_whole_number_fraction() {
        assert_eq!(Cell::Number(2024.0).to_text(), "2024");
        assert_eq!(Cell::Number(12.5).to_text(), "12.5");
    }

    #[test]
    fn test_records_keyed_by_first_row() {
        let sheet = Sheet::new(vec![
            vec![Cell::Text("type".into()), Cell::Text("amount".into())],
            vec![Cell::Text("debit".into()), Cell::Number(100.0)],
        ]);
        let records = sheet.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0]["type"], Cell::Text("debit".into()));
        assert_eq!(records[0]["amount"], Cell::Number(100.0));
    }

    #[test]
    fn test_sheet_with_only_blank_cells_is_empty() {
        let sheet = Sheet::new(vec![vec![Cell::Empty, Cell::Text("  ".into())]]);
        assert!(sheet.is_empty());
        assert!(Sheet::default().is_empty());
    }
}
