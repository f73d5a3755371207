//! Canonical transaction records used uniformly downstream, regardless of
//! the statement format they were normalized from.

use serde::{Deserialize, Serialize};

/// Fixed account-holder party on normalized bank exports. The normalizer
/// accepts an override; this is the default.
pub const ACCOUNT_HOLDER: &str = "DEEPAK";

/// Category assigned when extraction finds nothing usable.
pub const UNCATEGORIZED: &str = "Uncategorized";

/// Direction of money movement. Stored records may carry capitalized
/// variants, hence the aliases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TxnType {
    #[serde(alias = "Debit", alias = "DEBIT")]
    Debit,
    #[serde(alias = "Credit", alias = "CREDIT")]
    Credit,
}

impl TxnType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TxnType::Debit => "debit",
            TxnType::Credit => "credit",
        }
    }
}

/// A normalized transaction record.
///
/// `date` is `YYYY-MM-DD` when the normalizer could parse the statement date;
/// pre-normalized (clean-schema) uploads keep their original date string.
/// Aliases cover the legacy capitalized field names that older stored records
/// and raw sheet rows use.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    #[serde(default, alias = "Date", alias = "Txn Date")]
    pub date: Option<String>,
    #[serde(default)]
    pub transaction_id: String,
    #[serde(default)]
    pub sender: String,
    #[serde(default)]
    pub receiver: String,
    #[serde(default = "default_category", alias = "Category")]
    pub category: String,
    #[serde(alias = "Amount")]
    pub amount: f64,
    #[serde(rename = "type", alias = "Type")]
    pub kind: TxnType,
    #[serde(default, alias = "Description")]
    pub description: String,
}

fn default_category() -> String {
    UNCATEGORIZED.to_string()
}

impl Transaction {
    pub fn is_debit(&self) -> bool {
        self.kind == TxnType::Debit
    }

    pub fn is_credit(&self) -> bool {
        self.kind == TxnType::Credit
    }

    /// Category key used for aggregation: trimmed, blank falls back to
    /// `Uncategorized`.
    pub fn category_key(&self) -> &str {
        let c = self.category.trim();
        if c.is_empty() { UNCATEGORIZED } else { c }
    }

    /// Merchant key used for aggregation: the receiver when present,
    /// otherwise the description, reduced to its first `/`-delimited segment.
    pub fn merchant_key(&self) -> &str {
        let source = if self.receiver.trim().is_empty() {
            &self.description
        } else {
            &self.receiver
        };
        source.split('/').next().unwrap_or("").trim()
    }
}
