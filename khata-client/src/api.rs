//! HTTP client for the month-keyed persistence API.
//!
//! Base URL and bearer token come from explicit configuration; nothing here
//! reads the environment. Failed calls surface the server's `error` message
//! when the body carries one, so callers can show it and keep their
//! in-memory data for a retry.

use anyhow::{bail, Context, Result};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use khata_core::{aggregate, ChartInsight, MerchantTotal, MonthlyTrend, StatsSummary, Transaction};

/// Flat wire shape for stored monthly stats: the three scalar columns plus
/// everything else nested under `stats_json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadStats {
    pub total_spent: f64,
    pub total_income: f64,
    pub num_transactions: usize,
    pub stats_json: StatsJson,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatsJson {
    #[serde(default)]
    pub average_transaction: f64,
    #[serde(default = "dash")]
    pub highest_category: String,
    #[serde(default)]
    pub chart_insights: Vec<ChartInsight>,
    #[serde(default)]
    pub top_merchants: Vec<MerchantTotal>,
    #[serde(default)]
    pub monthly_trends: Vec<MonthlyTrend>,
}

fn dash() -> String {
    "-".to_string()
}

impl Default for StatsJson {
    fn default() -> Self {
        Self {
            average_transaction: 0.0,
            highest_category: dash(),
            chart_insights: Vec::new(),
            top_merchants: Vec::new(),
            monthly_trends: Vec::new(),
        }
    }
}

/// The stored stats columns round money to two decimals.
fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

impl UploadStats {
    pub fn from_summary(stats: &StatsSummary) -> Self {
        Self {
            total_spent: round2(stats.total_spent),
            total_income: round2(stats.total_income),
            num_transactions: stats.num_transactions,
            stats_json: StatsJson {
                average_transaction: round2(stats.average_transaction),
                highest_category: stats.highest_category.clone(),
                chart_insights: stats.chart_insights.clone(),
                top_merchants: stats.top_merchants.clone(),
                monthly_trends: stats.monthly_trends.clone(),
            },
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct UploadResponse {
    #[serde(default)]
    pub message: String,
    pub month_key: String,
    #[serde(default)]
    pub transactions_saved: usize,
}

/// One row of the all-months listing.
#[derive(Debug, Clone, Deserialize)]
pub struct MonthSummary {
    pub month_key: String,
    #[serde(default)]
    pub total_spent: f64,
    #[serde(default)]
    pub total_income: f64,
    #[serde(default)]
    pub num_transactions: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoredStats {
    pub month_key: String,
    #[serde(default)]
    pub total_spent: f64,
    #[serde(default)]
    pub total_income: f64,
    #[serde(default)]
    pub num_transactions: usize,
    #[serde(default)]
    pub stats_json: StatsJson,
}

/// A stored month: stats row plus its transactions.
#[derive(Debug, Clone, Deserialize)]
pub struct MonthData {
    pub stats: StoredStats,
    #[serde(default)]
    pub transactions: Vec<Transaction>,
}

impl MonthData {
    /// Rebuild a display summary from the stored record. Older rows may have
    /// an empty `stats_json`; the category breakdown is recomputed from the
    /// transactions in that case, and the transaction count always comes
    /// from the fetched list.
    pub fn to_summary(&self) -> StatsSummary {
        let stored = &self.stats;
        let average_transaction = if stored.num_transactions > 0 {
            stored.total_spent / stored.num_transactions as f64
        } else {
            0.0
        };

        let chart_insights = if stored.stats_json.chart_insights.is_empty() {
            aggregate(&self.transactions)
                .map(|s| s.chart_insights)
                .unwrap_or_default()
        } else {
            stored.stats_json.chart_insights.clone()
        };

        let highest_category = chart_insights
            .first()
            .map(|c| c.label.clone())
            .unwrap_or_else(dash);

        StatsSummary {
            total_spent: stored.total_spent,
            total_income: stored.total_income,
            num_transactions: self.transactions.len(),
            average_transaction,
            highest_category,
            chart_insights,
            top_merchants: stored.stats_json.top_merchants.clone(),
            monthly_trends: stored.stats_json.monthly_trends.clone(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DeleteResponse {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub transactions_deleted: usize,
    #[serde(default)]
    pub stats_deleted: usize,
}

/// Async client for the persistence API.
#[derive(Debug, Clone)]
pub struct ApiClient {
    base_url: String,
    token: Option<String>,
    http: reqwest::Client,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>, token: Option<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token,
            http: reqwest::Client::new(),
        }
    }

    fn request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        let mut req = self.http.request(method, format!("{}{}", self.base_url, path));
        if let Some(token) = &self.token {
            req = req.bearer_auth(token);
        }
        req
    }

    /// Replace a month's stored transactions and stats.
    pub async fn upload(
        &self,
        transactions: &[Transaction],
        stats: &StatsSummary,
        month_key: &str,
    ) -> Result<UploadResponse> {
        #[derive(Serialize)]
        struct Req<'a> {
            transactions: &'a [Transaction],
            stats: UploadStats,
            month_key: &'a str,
        }

        let resp = self
            .request(Method::POST, "/transactions/upload/")
            .json(&Req {
                transactions,
                stats: UploadStats::from_summary(stats),
                month_key,
            })
            .send()
            .await
            .context("upload request")?;

        read_json(resp, "upload").await
    }

    pub async fn list_months(&self) -> Result<Vec<MonthSummary>> {
        let resp = self
            .request(Method::GET, "/transactions/monthly/")
            .send()
            .await
            .context("month list request")?;
        read_json(resp, "month list").await
    }

    pub async fn month(&self, month_key: &str) -> Result<MonthData> {
        let resp = self
            .request(Method::GET, &format!("/transactions/monthly/{month_key}/"))
            .send()
            .await
            .context("month fetch request")?;
        read_json(resp, "month fetch").await
    }

    pub async fn delete_month(&self, month_key: &str) -> Result<DeleteResponse> {
        let resp = self
            .request(Method::DELETE, &format!("/transactions/monthly/{month_key}/"))
            .send()
            .await
            .context("month delete request")?;
        read_json(resp, "month delete").await
    }
}

async fn read_json<T: DeserializeOwned>(resp: reqwest::Response, what: &str) -> Result<T> {
    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        let msg = server_error(&body).unwrap_or(body);
        bail!("{what} failed: {status} {msg}");
    }
    resp.json().await.with_context(|| format!("parse {what} response"))
}

/// Pull the `error` field out of an API error body, if it has one.
fn server_error(body: &str) -> Option<String> {
    #[derive(Deserialize)]
    struct ErrBody {
        error: Option<String>,
    }
    serde_json::from_str::<ErrBody>(body).ok()?.error
}

#[cfg(test)]
mod tests {
    use super::*;
    use khata_core::TxnType;

    fn summary() -> StatsSummary {
        StatsSummary {
            total_spent: 1234.567,
            total_income: 1000.004,
            num_transactions: 3,
            average_transaction: 411.522333,
            highest_category: "Shopping".to_string(),
            chart_insights: vec![ChartInsight { label: "Shopping".to_string(), amount: 1234.567 }],
            top_merchants: vec![],
            monthly_trends: vec![],
        }
    }

    #[test]
    fn test_upload_stats_rounds_money_columns() {
        let wire = UploadStats::from_summary(&summary());
        assert_eq!(wire.total_spent, 1234.57);
        assert_eq!(wire.total_income, 1000.0);
        assert_eq!(wire.num_transactions, 3);
        assert_eq!(wire.stats_json.average_transaction, 411.52);
        assert_eq!(wire.stats_json.highest_category, "Shopping");
    }

    #[test]
    fn test_server_error_extraction() {
        assert_eq!(
            server_error(r#"{"error": "No data found for this month"}"#).as_deref(),
            Some("No data found for this month")
        );
        assert_eq!(server_error("<html>gateway timeout</html>"), None);
        assert_eq!(server_error(r#"{"detail": "nope"}"#), None);
    }

    #[test]
    fn test_month_data_recomputes_missing_chart_insights() {
        let data = MonthData {
            stats: StoredStats {
                month_key: "2024-06".to_string(),
                total_spent: 700.0,
                total_income: 0.0,
                num_transactions: 2,
                stats_json: StatsJson::default(),
            },
            transactions: vec![
                Transaction {
                    date: Some("2024-06-01".to_string()),
                    transaction_id: "A".to_string(),
                    sender: "DEEPAK".to_string(),
                    receiver: "AMAZON".to_string(),
                    category: "Shopping".to_string(),
                    amount: 500.0,
                    kind: TxnType::Debit,
                    description: "POS/AMAZON/1/Shopping".to_string(),
                },
                Transaction {
                    date: Some("2024-06-02".to_string()),
                    transaction_id: "B".to_string(),
                    sender: "DEEPAK".to_string(),
                    receiver: "SWIGGY".to_string(),
                    category: "Food".to_string(),
                    amount: 200.0,
                    kind: TxnType::Debit,
                    description: "UPI/SWIGGY/2/Food".to_string(),
                },
            ],
        };

        let s = data.to_summary();
        assert_eq!(s.num_transactions, 2);
        assert_eq!(s.average_transaction, 350.0);
        assert_eq!(s.chart_insights.len(), 2);
        assert_eq!(s.chart_insights[0].label, "Shopping");
        assert_eq!(s.highest_category, "Shopping");
    }

    #[test]
    fn test_stored_stats_tolerates_missing_json_blob() {
        let raw = r#"{"stats": {"month_key": "2024-06", "total_spent": 10.0}, "transactions": []}"#;
        let data: MonthData = serde_json::from_str(raw).unwrap();
        assert_eq!(data.stats.stats_json.highest_category, "-");
        let s = data.to_summary();
        assert_eq!(s.num_transactions, 0);
        assert_eq!(s.average_transaction, 0.0);
        assert_eq!(s.highest_category, "-");
    }
}
