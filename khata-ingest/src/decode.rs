//! Statement file decoding into positional cell rows.
//!
//! Supported formats: `.xlsx` / `.xls` via calamine (first worksheet only)
//! and `.csv`. Excel datetime cells render as ISO date text so the
//! normalizer sees the same shape regardless of source format.

use std::path::Path;

use calamine::{open_workbook_auto, Data, Reader};

use crate::errors::StatementError;
use crate::types::{Cell, Sheet};

/// Decode the first sheet of a statement file.
pub fn read_statement(path: impl AsRef<Path>) -> Result<Sheet, StatementError> {
    let path = path.as_ref();
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    match ext.as_str() {
        "csv" => read_csv(path),
        "xlsx" | "xls" => read_workbook(path),
        _ => Err(StatementError::UnsupportedFormat(ext)),
    }
}

fn read_workbook(path: &Path) -> Result<Sheet, StatementError> {
    let mut workbook = open_workbook_auto(path)?;

    let sheet_names = workbook.sheet_names().to_vec();
    let Some(first) = sheet_names.first() else {
        return Ok(Sheet::default());
    };

    let range = workbook.worksheet_range(first)?;
    let rows = range
        .rows()
        .map(|row| row.iter().map(convert_cell).collect())
        .collect();

    Ok(Sheet::new(rows))
}

fn convert_cell(data: &Data) -> Cell {
    match data {
        Data::Empty => Cell::Empty,
        Data::String(s) => Cell::Text(s.clone()),
        Data::Float(f) => Cell::Number(*f),
        Data::Int(i) => Cell::Number(*i as f64),
        Data::Bool(b) => Cell::Text(b.to_string()),
        Data::DateTime(dt) => match dt.as_datetime() {
            Some(d) => Cell::Text(d.format("%Y-%m-%d").to_string()),
            None => Cell::Number(dt.as_f64()),
        },
        Data::DateTimeIso(s) | Data::DurationIso(s) => Cell::Text(s.clone()),
        Data::Error(_) => Cell::Empty,
    }
}

fn read_csv(path: &Path) -> Result<Sheet, StatementError> {
    let mut rdr = csv::ReaderBuilder::new()
        .flexible(true)
        .has_headers(false)
        .from_path(path)?;

    let mut rows = Vec::new();
    for result in rdr.records() {
        let record = result?;
        let row = record
            .iter()
            .map(|field| {
                if field.is_empty() {
                    Cell::Empty
                } else {
                    Cell::Text(field.to_string())
                }
            })
            .collect();
        rows.push(row);
    }

    Ok(Sheet::new(rows))
}
