//! AI insight and chat calls over precomputed statistics.
//!
//! The model is never asked to calculate totals; it receives the serialized
//! stats plus a capped CSV sample of transactions and returns qualitative
//! analysis. Every failure path degrades to placeholder content so the
//! upload flow never blocks on the AI collaborator.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use khata_core::{StatsSummary, Transaction};

/// Transaction rows included in prompts; the rest are dropped to cap tokens.
const SAMPLE_ROWS: usize = 50;

const CHAT_FALLBACK: &str = "Sorry, I couldn't process that request right now.";

/// Structured insight payload returned by the model.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Insights {
    #[serde(default)]
    pub anomalies: Vec<serde_json::Value>,
    #[serde(default)]
    pub financial_health_score: f64,
    #[serde(default)]
    pub health_score_reason: String,
    #[serde(default)]
    pub reports: Vec<String>,
    #[serde(default)]
    pub suggestions: Vec<String>,
}

impl Insights {
    /// Placeholder shown when the provider reports quota exhaustion.
    pub fn quota_exhausted() -> Self {
        Self {
            reports: vec!["AI quota limit reached. Please wait or upgrade your API plan.".to_string()],
            suggestions: vec!["AI insights temporarily unavailable".to_string()],
            ..Self::default()
        }
    }

    /// Placeholder for any other provider failure.
    pub fn unavailable() -> Self {
        Self {
            reports: vec!["AI currently unavailable.".to_string()],
            ..Self::default()
        }
    }
}

/// Gemini `generateContent` client. Key and model come from explicit
/// configuration.
#[derive(Debug, Clone)]
pub struct InsightsClient {
    api_key: String,
    model: String,
    http: reqwest::Client,
}

impl InsightsClient {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.into(),
            http: reqwest::Client::new(),
        }
    }

    /// Qualitative insights for one month of data. Infallible by contract:
    /// provider errors come back as placeholder content.
    pub async fn insights(&self, transactions: &[Transaction], stats: &StatsSummary) -> Insights {
        match self.try_insights(transactions, stats).await {
            Ok(insights) => insights,
            Err(e) => {
                let msg = format!("{e:#}");
                if msg.contains("quota") || msg.contains("429") {
                    Insights::quota_exhausted()
                } else {
                    Insights::unavailable()
                }
            }
        }
    }

    async fn try_insights(
        &self,
        transactions: &[Transaction],
        stats: &StatsSummary,
    ) -> Result<Insights> {
        let prompt = insight_prompt(transactions, stats)?;
        let text = self.generate(&prompt).await?;
        let cleaned = strip_code_fences(&text);
        serde_json::from_str(&cleaned).context("parse insight json")
    }

    /// Free-form question over one month of data. Falls back to a fixed
    /// apology line on any failure.
    pub async fn ask(
        &self,
        question: &str,
        transactions: &[Transaction],
        stats: &StatsSummary,
    ) -> String {
        let answer = async {
            let prompt = chat_prompt(question, transactions, stats)?;
            self.generate(&prompt).await
        }
        .await;

        match answer {
            Ok(text) => text,
            Err(_) => CHAT_FALLBACK.to_string(),
        }
    }

    async fn generate(&self, prompt: &str) -> Result<String> {
        #[derive(Serialize)]
        struct Part {
            text: String,
        }

        #[derive(Serialize)]
        struct Content {
            parts: Vec<Part>,
        }

        #[derive(Serialize)]
        struct Req {
            contents: Vec<Content>,
        }

        #[derive(Deserialize)]
        struct Resp {
            #[serde(default)]
            candidates: Vec<Candidate>,
        }

        #[derive(Deserialize)]
        struct Candidate {
            content: Option<RespContent>,
        }

        #[derive(Deserialize)]
        struct RespContent {
            #[serde(default)]
            parts: Vec<RespPart>,
        }

        #[derive(Deserialize)]
        struct RespPart {
            text: Option<String>,
        }

        let url = format!(
            "https://generativelanguage.googleapis.com/v1beta/models/{}:generateContent?key={}",
            self.model, self.api_key
        );

        let body = Req {
            contents: vec![Content {
                parts: vec![Part {
                    text: prompt.to_string(),
                }],
            }],
        };

        let resp = self
            .http
            .post(&url)
            .json(&body)
            .send()
            .await
            .context("gemini request")?;

        let status = resp.status();
        if !status.is_success() {
            let txt = resp.text().await.unwrap_or_default();
            bail!("gemini error: {status} {txt}");
        }

        let out: Resp = resp.json().await.context("parse gemini response")?;
        let mut s = String::new();
        for candidate in out.candidates {
            if let Some(content) = candidate.content {
                for part in content.parts {
                    if let Some(text) = part.text {
                        s.push_str(&text);
                    }
                }
            }
        }
        Ok(s.trim().to_string())
    }
}

fn insight_prompt(transactions: &[Transaction], stats: &StatsSummary) -> Result<String> {
    let stats_json = serde_json::to_string_pretty(stats).context("serialize stats")?;
    let csv_data = csv_sample(transactions)?;

    Ok(format!(
        r#"You are a financial analyst. I have already calculated the hard numbers.
Here are the calculated statistics:
{stats_json}

Here is a sample of the raw transaction data (first {SAMPLE_ROWS} rows):
{csv_data}

Your job is to provide QUALITATIVE analysis. Do NOT recalculate totals.
1. Provide specific, actionable suggestions. Make them SHORT and SWEET. Max 3 bullet points. Each point under 10 words.
2. Write a brief executive summary report.

Return JSON format:
{{
  "anomalies": [],
  "financial_health_score": 0,
  "health_score_reason": "",
  "reports": ["..."],
  "suggestions": ["Make coffee at home to save $50/mo", "Cancel unused gym membership", "Switch to high-yield savings"]
}}
Only return JSON."#
    ))
}

fn chat_prompt(
    question: &str,
    transactions: &[Transaction],
    stats: &StatsSummary,
) -> Result<String> {
    let stats_json = serde_json::to_string(stats).context("serialize stats")?;
    let csv_data = csv_sample(transactions)?;

    Ok(format!(
        r#"User Question: "{question}"

Context:
- Calculated Stats: {stats_json}
- Transaction Sample: {csv_data}

Answer the user's question concisely and accurately based on the data provided. If the answer requires calculating something new (like "how much did I spend on Uber?"), estimate it from the sample or explain you only see a sample. Be helpful and friendly."#
    ))
}

/// Serialize at most `SAMPLE_ROWS` transactions as CSV for prompt context.
pub fn csv_sample(transactions: &[Transaction]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(Vec::new());
    wtr.write_record([
        "date",
        "transaction_id",
        "sender",
        "receiver",
        "category",
        "amount",
        "type",
        "description",
    ])?;

    for t in transactions.iter().take(SAMPLE_ROWS) {
        let amount = t.amount.to_string();
        wtr.write_record([
            t.date.as_deref().unwrap_or(""),
            t.transaction_id.as_str(),
            t.sender.as_str(),
            t.receiver.as_str(),
            t.category.as_str(),
            amount.as_str(),
            t.kind.as_str(),
            t.description.as_str(),
        ])?;
    }

    let bytes = wtr
        .into_inner()
        .map_err(|e| anyhow::anyhow!("flush csv sample: {e}"))?;
    String::from_utf8(bytes).context("csv sample utf8")
}

/// Models often wrap their JSON in markdown code fences; peel them off.
fn strip_code_fences(text: &str) -> String {
    let t = text.trim();
    if !t.starts_with("```") {
        return t.to_string();
    }
    t.trim_start_matches("```json")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use khata_core::TxnType;

    fn txn(i: usize) -> Transaction {
        Transaction {
            date: Some("2024-06-01".to_string()),
            transaction_id: format!("ID{i:06}"),
            sender: "DEEPAK".to_string(),
            receiver: format!("SHOP{i}"),
            category: "Shopping".to_string(),
            amount: 10.0 + i as f64,
            kind: TxnType::Debit,
            description: format!("POS/SHOP{i}/0/Shopping"),
        }
    }

    #[test]
    fn test_csv_sample_caps_at_fifty_rows() {
        let txns: Vec<Transaction> = (0..80).map(txn).collect();
        let csv = csv_sample(&txns).unwrap();
        // Header plus 50 data rows.
        assert_eq!(csv.trim_end().lines().count(), 51);
        assert!(csv.starts_with("date,transaction_id,sender"));
        assert!(csv.contains("SHOP49"));
        assert!(!csv.contains("SHOP50"));
    }

    #[test]
    fn test_strip_code_fences() {
        assert_eq!(strip_code_fences("{\"a\": 1}"), "{\"a\": 1}");
        assert_eq!(strip_code_fences("```json\n{\"a\": 1}\n```"), "{\"a\": 1}");
        assert_eq!(strip_code_fences("```\n{\"a\": 1}\n```"), "{\"a\": 1}");
    }

    #[test]
    fn test_insights_parse_tolerates_missing_fields() {
        let parsed: Insights =
            serde_json::from_str(r#"{"suggestions": ["Cook at home"]}"#).unwrap();
        assert_eq!(parsed.suggestions, vec!["Cook at home"]);
        assert!(parsed.reports.is_empty());
        assert_eq!(parsed.financial_health_score, 0.0);
    }

    #[test]
    fn test_placeholders_have_content() {
        assert!(!Insights::quota_exhausted().reports.is_empty());
        assert!(!Insights::unavailable().reports.is_empty());
    }
}
