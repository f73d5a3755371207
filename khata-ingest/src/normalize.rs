//! Statement-to-transaction normalization.
//!
//! Converts a decoded sheet into canonical transactions along one of two
//! paths: clean `type/amount/description` exports pass through with field
//! renaming only, raw bank exports are reconstructed from the detected
//! header row and the slash-encoded description lines.

use std::collections::HashMap;

use chrono::{Duration, NaiveDate};
use rand::Rng;

use khata_core::{Transaction, TxnType, ACCOUNT_HOLDER, UNCATEGORIZED};

use crate::description::{DescriptionParser, SlashDelimited};
use crate::errors::StatementError;
use crate::format::{detect, StatementFormat, BANK_EXPORT_COLUMNS};
use crate::types::{Cell, Sheet};

const DESCRIPTION_COL: &str = BANK_EXPORT_COLUMNS[0];
const DEBIT_COL: &str = BANK_EXPORT_COLUMNS[1];
const CREDIT_COL: &str = BANK_EXPORT_COLUMNS[2];
const DATE_COL: &str = "Txn Date";

/// Result of a normalization run. Skip counters are the diagnostic trace for
/// rows excluded by validation; they are never errors.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NormalizeOutput {
    pub transactions: Vec<Transaction>,
    /// Rows with neither a positive debit nor a positive credit amount.
    pub skipped_zero_amount: usize,
    /// Summary/footer rows whose description contains "total".
    pub skipped_total_rows: usize,
    /// Clean-schema rows whose type column is neither debit nor credit.
    pub skipped_bad_type: usize,
}

/// Normalizes decoded statement sheets into canonical transactions.
///
/// The account holder is the fixed party on bank-export rows; the
/// description parser is pluggable per bank format.
pub struct Normalizer<P = SlashDelimited> {
    account_holder: String,
    parser: P,
}

impl Default for Normalizer<SlashDelimited> {
    fn default() -> Self {
        Self::new()
    }
}

impl Normalizer<SlashDelimited> {
    pub fn new() -> Self {
        Self::with_account_holder(ACCOUNT_HOLDER)
    }

    pub fn with_account_holder(name: impl Into<String>) -> Self {
        Self {
            account_holder: name.into(),
            parser: SlashDelimited,
        }
    }
}

impl<P: DescriptionParser> Normalizer<P> {
    pub fn with_parser(parser: P, account_holder: impl Into<String>) -> Self {
        Self {
            account_holder: account_holder.into(),
            parser,
        }
    }

    /// Normalize a sheet. An empty sheet produces an empty result; a sheet
    /// that matches neither layout fails with `HeaderNotFound` and produces
    /// nothing.
    pub fn normalize(&self, sheet: &Sheet) -> Result<NormalizeOutput, StatementError> {
        if sheet.is_empty() {
            return Ok(NormalizeOutput::default());
        }

        match detect(sheet) {
            Some(StatementFormat::Canonical) => Ok(self.normalize_canonical(sheet)),
            Some(StatementFormat::BankExport { header_row }) => {
                Ok(self.normalize_bank_export(sheet, header_row))
            }
            None => Err(StatementError::HeaderNotFound),
        }
    }

    /// Clean-schema path: the sheet already carries canonical columns. Rows
    /// are renamed into place; no merchant/category extraction, no total-row
    /// filter.
    fn normalize_canonical(&self, sheet: &Sheet) -> NormalizeOutput {
        let mut out = NormalizeOutput::default();

        for record in sheet.records() {
            if record.values().all(Cell::is_blank) {
                continue;
            }

            let kind = match field(&record, "type")
                .map(|c| c.to_text().trim().to_lowercase())
                .as_deref()
            {
                Some("debit") => TxnType::Debit,
                Some("credit") => TxnType::Credit,
                _ => {
                    out.skipped_bad_type += 1;
                    continue;
                }
            };

            let amount = field(&record, "amount").and_then(Cell::as_f64).unwrap_or(0.0);
            if amount <= 0.0 {
                out.skipped_zero_amount += 1;
                continue;
            }

            let transaction_id = text_field(&record, "transaction_id")
                .unwrap_or_else(generate_transaction_id);
            let date = text_field(&record, "date").or_else(|| text_field(&record, "txn date"));

            out.transactions.push(Transaction {
                date,
                transaction_id,
                sender: text_field(&record, "sender").unwrap_or_default(),
                receiver: text_field(&record, "receiver").unwrap_or_default(),
                category: text_field(&record, "category")
                    .unwrap_or_else(|| UNCATEGORIZED.to_string()),
                amount,
                kind,
                description: text_field(&record, "description").unwrap_or_default(),
            });
        }

        out
    }

    /// Bank-export path: rebuild label-to-value records from the detected
    /// header row, then derive direction, parties and category per row.
    fn normalize_bank_export(&self, sheet: &Sheet, header_row: usize) -> NormalizeOutput {
        let mut out = NormalizeOutput::default();

        let headers: Vec<String> = sheet.raw_rows()[header_row]
            .iter()
            .map(Cell::to_text)
            .collect();

        for row in &sheet.raw_rows()[header_row + 1..] {
            if row.iter().all(Cell::is_blank) {
                continue;
            }

            let record: HashMap<&str, &Cell> = headers
                .iter()
                .enumerate()
                .filter(|(_, label)| !label.trim().is_empty())
                .filter_map(|(i, label)| row.get(i).map(|cell| (label.as_str(), cell)))
                .collect();

            let description = record
                .get(DESCRIPTION_COL)
                .map(|c| c.to_text())
                .unwrap_or_default();
            let merchant = self.parser.merchant(&description);
            let category = self.parser.category(&description);

            let debit = record.get(DEBIT_COL).and_then(|c| c.as_f64()).unwrap_or(0.0);
            let credit = record.get(CREDIT_COL).and_then(|c| c.as_f64()).unwrap_or(0.0);

            let (kind, amount, sender, receiver) = if debit > 0.0 {
                (TxnType::Debit, debit, self.account_holder.clone(), merchant)
            } else if credit > 0.0 {
                (TxnType::Credit, credit, merchant, self.account_holder.clone())
            } else {
                out.skipped_zero_amount += 1;
                continue;
            };

            let txn = Transaction {
                date: record.get(DATE_COL).copied().and_then(resolve_date),
                transaction_id: generate_transaction_id(),
                sender,
                receiver,
                category,
                amount,
                kind,
                description,
            };

            // Summary/footer rows survive construction but are never kept.
            if txn.description.to_lowercase().contains("total") {
                out.skipped_total_rows += 1;
                continue;
            }

            out.transactions.push(txn);
        }

        out
    }
}

/// Case-insensitive field lookup for clean-schema records, whose headers may
/// be capitalized.
fn field<'a>(record: &'a HashMap<String, Cell>, name: &str) -> Option<&'a Cell> {
    record
        .iter()
        .find(|(key, _)| key.to_lowercase() == name)
        .map(|(_, cell)| cell)
}

fn text_field(record: &HashMap<String, Cell>, name: &str) -> Option<String> {
    let text = field(record, name)?.to_text();
    let text = text.trim();
    if text.is_empty() {
        None
    } else {
        Some(text.to_string())
    }
}

/// Statement date formats tried in order. Slash dates are DD/MM/YYYY first;
/// a date like 06/25/2024 still resolves through the later US fallback.
const DATE_FORMATS: [&str; 4] = ["%d/%m/%Y", "%d-%m-%Y", "%Y-%m-%d", "%m/%d/%Y"];

/// Resolve a `Txn Date` cell to `YYYY-MM-DD`, or `None` when unparseable.
/// Callers substitute a fallback date before persistence.
fn resolve_date(cell: &Cell) -> Option<String> {
    match cell {
        Cell::Empty => None,
        Cell::Number(serial) => excel_serial_to_date(*serial),
        Cell::Text(s) => {
            let s = s.trim();
            if s.is_empty() {
                return None;
            }
            DATE_FORMATS
                .iter()
                .find_map(|&fmt| NaiveDate::parse_from_str(s, fmt).ok())
                .map(|d| d.format("%Y-%m-%d").to_string())
        }
    }
}

/// Excel serial day count, epoch 1899-12-30.
fn excel_serial_to_date(serial: f64) -> Option<String> {
    if !(1.0..200_000.0).contains(&serial) {
        return None;
    }
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?;
    let date = epoch.checked_add_signed(Duration::days(serial as i64))?;
    Some(date.format("%Y-%m-%d").to_string())
}

const ID_CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// 8-character opaque token. Uniqueness is probabilistic and not checked
/// against the store.
fn generate_transaction_id() -> String {
    let mut rng = rand::thread_rng();
    (0..8)
        .map(|_| ID_CHARSET[rng.gen_range(0..ID_CHARSET.len())] as char)
        .collect()
}
