//! Deterministic spending statistics derived from canonical transactions.
//!
//! Recomputed from scratch on every upload or month view; the aggregator
//! holds no state and, given the same records, produces identical output.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::transaction::{Transaction, TxnType};

/// Month bucket for transactions whose date cannot be parsed. Sorts after
/// numeric `YYYY-MM` keys in the monthly trend.
pub const UNKNOWN_MONTH: &str = "Unknown";

/// Per-category debit total for the category breakdown chart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartInsight {
    pub label: String,
    pub amount: f64,
}

/// Per-merchant debit total.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MerchantTotal {
    pub merchant: String,
    pub amount: f64,
}

/// Per-month debit total.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyTrend {
    pub month: String,
    pub amount: f64,
}

/// Summary statistics for one batch of transactions. An immutable snapshot;
/// never mutated incrementally.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatsSummary {
    pub total_spent: f64,
    pub total_income: f64,
    pub num_transactions: usize,
    pub average_transaction: f64,
    pub highest_category: String,
    pub chart_insights: Vec<ChartInsight>,
    pub top_merchants: Vec<MerchantTotal>,
    pub monthly_trends: Vec<MonthlyTrend>,
}

/// How many merchants the top-merchant list keeps, applied after sorting.
const TOP_MERCHANTS: usize = 10;

/// Bucket a transaction date string into a `YYYY-MM` month key.
///
/// Slash-delimited dates are read as DD/MM/YYYY and rebuilt literally from
/// their segments (no zero padding, matching the stored historical keys);
/// other strings go through ISO parsing. Anything unparseable lands in the
/// literal `Unknown` bucket.
pub fn month_key(date: &str) -> String {
    if date.contains('/') {
        let parts: Vec<&str> = date.split('/').collect();
        if parts.len() == 3 {
            return format!("{}-{}", parts[2], parts[1]);
        }
        return date.to_string();
    }
    if let Ok(d) = NaiveDate::parse_from_str(date, "%Y-%m-%d") {
        return d.format("%Y-%m").to_string();
    }
    UNKNOWN_MONTH.to_string()
}

/// Add `amount` to the entry for `key`, keeping first-seen order so that the
/// later stable sort preserves encounter order on ties.
fn bump(totals: &mut Vec<(String, f64)>, key: &str, amount: f64) {
    if let Some(entry) = totals.iter_mut().find(|(k, _)| k == key) {
        entry.1 += amount;
    } else {
        totals.push((key.to_string(), amount));
    }
}

/// Compute summary statistics from a batch of transactions.
///
/// Returns `None` for an empty batch so callers can distinguish "nothing
/// uploaded" from "uploaded, all zero". Category, merchant and month totals
/// accumulate over debit rows only; income over credit rows only.
pub fn aggregate(transactions: &[Transaction]) -> Option<StatsSummary> {
    if transactions.is_empty() {
        return None;
    }

    let mut total_spent = 0.0;
    let mut total_income = 0.0;
    let mut categories: Vec<(String, f64)> = Vec::new();
    let mut merchants: Vec<(String, f64)> = Vec::new();
    let mut months: Vec<(String, f64)> = Vec::new();

    for t in transactions {
        match t.kind {
            TxnType::Debit => {
                total_spent += t.amount;
                bump(&mut categories, t.category_key(), t.amount);
                bump(&mut merchants, t.merchant_key(), t.amount);
                let month = match t.date.as_deref() {
                    Some(d) if !d.trim().is_empty() => month_key(d),
                    _ => UNKNOWN_MONTH.to_string(),
                };
                bump(&mut months, &month, t.amount);
            }
            TxnType::Credit => {
                total_income += t.amount;
            }
        }
    }

    categories.sort_by(|a, b| b.1.total_cmp(&a.1));
    merchants.sort_by(|a, b| b.1.total_cmp(&a.1));
    months.sort_by(|a, b| a.0.cmp(&b.0));

    let chart_insights: Vec<ChartInsight> = categories
        .into_iter()
        .map(|(label, amount)| ChartInsight { label, amount })
        .collect();

    let mut top_merchants: Vec<MerchantTotal> = merchants
        .into_iter()
        .map(|(merchant, amount)| MerchantTotal { merchant, amount })
        .collect();
    top_merchants.truncate(TOP_MERCHANTS);

    let monthly_trends: Vec<MonthlyTrend> = months
        .into_iter()
        .map(|(month, amount)| MonthlyTrend { month, amount })
        .collect();

    let highest_category = chart_insights
        .first()
        .map(|c| c.label.clone())
        .unwrap_or_else(|| "-".to_string());

    let num_transactions = transactions.len();

    Some(StatsSummary {
        total_spent,
        total_income,
        num_transactions,
        average_transaction: total_spent / num_transactions as f64,
        highest_category,
        chart_insights,
        top_merchants,
        monthly_trends,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transaction::ACCOUNT_HOLDER;

    fn txn(kind: TxnType, amount: f64, category: &str, merchant: &str, date: &str) -> Transaction {
        Transaction {
            date: if date.is_empty() { None } else { Some(date.to_string()) },
            transaction_id: "TESTID00".to_string(),
            sender: if kind == TxnType::Debit { ACCOUNT_HOLDER.to_string() } else { merchant.to_string() },
            receiver: if kind == TxnType::Debit { merchant.to_string() } else { ACCOUNT_HOLDER.to_string() },
            category: category.to_string(),
            amount,
            kind,
            description: format!("POS/{merchant}/0000/{category}"),
        }
    }

    #[test]
    fn test_aggregate_empty_is_no_data() {
        assert!(aggregate(&[]).is_none());
    }

    #[test]
    fn test_totals_split_by_direction() {
        let txns = vec![
            txn(TxnType::Debit, 500.0, "Shopping", "AMAZON", "2024-06-01"),
            txn(TxnType::Debit, 200.0, "Food", "SWIGGY", "2024-06-02"),
            txn(TxnType::Credit, 1000.0, "Salary", "ACME", "2024-06-03"),
        ];
        let stats = aggregate(&txns).unwrap();
        assert_eq!(stats.total_spent, 700.0);
        assert_eq!(stats.total_income, 1000.0);
        assert_eq!(stats.num_transactions, 3);
    }

    #[test]
    fn test_average_uses_full_transaction_count() {
        let txns = vec![
            txn(TxnType::Debit, 300.0, "Food", "SWIGGY", "2024-06-01"),
            txn(TxnType::Credit, 900.0, "Salary", "ACME", "2024-06-02"),
        ];
        let stats = aggregate(&txns).unwrap();
        assert_eq!(stats.average_transaction, 150.0);
    }

    #[test]
    fn test_chart_insights_sorted_and_partition_spend() {
        let txns = vec![
            txn(TxnType::Debit, 100.0, "Food", "SWIGGY", "2024-06-01"),
            txn(TxnType::Debit, 400.0, "Shopping", "AMAZON", "2024-06-02"),
            txn(TxnType::Debit, 50.0, "Food", "ZOMATO", "2024-06-03"),
            txn(TxnType::Debit, 75.0, "", "CAB", "2024-06-04"),
        ];
        let stats = aggregate(&txns).unwrap();

        for pair in stats.chart_insights.windows(2) {
            assert!(pair[0].amount >= pair[1].amount);
        }
        let insight_sum: f64 = stats.chart_insights.iter().map(|c| c.amount).sum();
        assert_eq!(insight_sum, stats.total_spent);

        assert_eq!(stats.chart_insights[0].label, "Shopping");
        assert_eq!(stats.highest_category, "Shopping");
        // Blank category joins the Uncategorized bucket.
        assert!(stats.chart_insights.iter().any(|c| c.label == "Uncategorized" && c.amount == 75.0));
    }

    #[test]
    fn test_top_merchants_is_sorted_prefix_of_ten() {
        let txns: Vec<Transaction> = (0..14)
            .map(|i| {
                txn(
                    TxnType::Debit,
                    10.0 * (i + 1) as f64,
                    "Misc",
                    &format!("MERCHANT{i}"),
                    "2024-06-01",
                )
            })
            .collect();
        let stats = aggregate(&txns).unwrap();
        assert_eq!(stats.top_merchants.len(), 10);
        assert_eq!(stats.top_merchants[0].merchant, "MERCHANT13");
        assert_eq!(stats.top_merchants[0].amount, 140.0);
        assert_eq!(stats.top_merchants[9].amount, 50.0);
    }

    #[test]
    fn test_monthly_trends_sorted_ascending() {
        let txns = vec![
            txn(TxnType::Debit, 10.0, "Food", "A", "2024-07-05"),
            txn(TxnType::Debit, 20.0, "Food", "B", "2024-05-02"),
            txn(TxnType::Debit, 30.0, "Food", "C", "2024-06-09"),
        ];
        let stats = aggregate(&txns).unwrap();
        let months: Vec<&str> = stats.monthly_trends.iter().map(|m| m.month.as_str()).collect();
        assert_eq!(months, vec!["2024-05", "2024-06", "2024-07"]);
    }

    #[test]
    fn test_month_key_formats() {
        assert_eq!(month_key("01/06/2024"), "2024-06");
        assert_eq!(month_key("2024-06-15"), "2024-06");
        assert_eq!(month_key("garbage"), UNKNOWN_MONTH);
        // Two-segment slash dates fall through as-is.
        assert_eq!(month_key("06/2024"), "06/2024");
    }

    #[test]
    fn test_unknown_month_sorts_after_numeric_keys() {
        let txns = vec![
            txn(TxnType::Debit, 10.0, "Food", "A", "not-a-date"),
            txn(TxnType::Debit, 20.0, "Food", "B", "2024-06-09"),
            txn(TxnType::Debit, 5.0, "Food", "C", ""),
        ];
        let stats = aggregate(&txns).unwrap();
        let months: Vec<&str> = stats.monthly_trends.iter().map(|m| m.month.as_str()).collect();
        assert_eq!(months, vec!["2024-06", UNKNOWN_MONTH]);
        assert_eq!(stats.monthly_trends[1].amount, 15.0);
    }

    #[test]
    fn test_merchant_falls_back_to_description_segment() {
        let mut t = txn(TxnType::Debit, 42.0, "Food", "SWIGGY", "2024-06-01");
        t.receiver = String::new();
        t.description = "UPI/SWIGGY/123/Food".to_string();
        let stats = aggregate(&[t]).unwrap();
        assert_eq!(stats.top_merchants[0].merchant, "UPI");
    }

    #[test]
    fn test_tie_break_keeps_encounter_order() {
        let txns = vec![
            txn(TxnType::Debit, 100.0, "Food", "FIRST", "2024-06-01"),
            txn(TxnType::Debit, 100.0, "Travel", "SECOND", "2024-06-02"),
        ];
        let stats = aggregate(&txns).unwrap();
        assert_eq!(stats.chart_insights[0].label, "Food");
        assert_eq!(stats.chart_insights[1].label, "Travel");
        assert_eq!(stats.top_merchants[0].merchant, "FIRST");
    }

    #[test]
    fn test_aggregate_legacy_records_roundtrip() {
        let raw = r#"[
            {"Txn Date": "01/06/2024", "Amount": 500, "Type": "Debit",
             "Category": "Shopping", "Description": "POS/AMAZON/1/Shopping"},
            {"date": "2024-06-03", "amount": 1200.5, "type": "credit",
             "category": "Salary", "description": "NEFT/ACME"}
        ]"#;
        let txns: Vec<Transaction> = serde_json::from_str(raw).unwrap();
        let stats = aggregate(&txns).unwrap();
        assert_eq!(stats.total_spent, 500.0);
        assert_eq!(stats.total_income, 1200.5);
        // DD/MM/YYYY legacy date buckets into 2024-06.
        assert_eq!(stats.monthly_trends[0].month, "2024-06");
    }
}
