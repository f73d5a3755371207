use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use khata_client::{ApiClient, Insights, InsightsClient};
use khata_core::{aggregate, StatsSummary};
use khata_ingest::{read_statement, NormalizeOutput, Normalizer};

mod config;
mod state;

#[derive(Parser, Debug)]
#[command(name = "khata", version, about = "Personal finance dashboard CLI")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Normalize a bank statement, show stats, and store it under a month
    Upload {
        /// Statement file (.xlsx, .xls or .csv)
        #[arg(long)]
        file: PathBuf,

        /// Month the statement belongs to (YYYY-MM)
        #[arg(long)]
        month: String,

        /// Skip the AI insight step
        #[arg(long)]
        skip_ai: bool,
    },

    /// List stored months
    Months,

    /// Show a stored month's stats and transactions count
    Show {
        month: String,

        /// Skip the AI insight step
        #[arg(long)]
        skip_ai: bool,
    },

    /// Delete a stored month
    Delete { month: String },

    /// Re-send an upload stashed after a persistence failure
    Retry { month: String },

    /// Ask the assistant a question about a stored month
    Chat {
        /// Month to load as context (YYYY-MM)
        #[arg(long)]
        month: String,

        question: String,
    },

    /// Config management
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Write the default ~/.khata/config.toml
    Init,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Upload { file, month, skip_ai } => upload(file, &month, skip_ai).await,
        Command::Months => months().await,
        Command::Show { month, skip_ai } => show(&month, skip_ai).await,
        Command::Delete { month } => delete(&month).await,
        Command::Retry { month } => retry(&month).await,
        Command::Chat { month, question } => chat(&month, &question).await,
        Command::Config { command } => match command {
            ConfigCommand::Init => config::init_config(),
        },
    }
}

async fn upload(file: PathBuf, month: &str, skip_ai: bool) -> Result<()> {
    validate_month_key(month)?;
    if !file.exists() {
        bail!("statement not found: {}", file.display());
    }

    // Decode failures mean "no rows", not a crash; only a missing header row
    // aborts the upload.
    let sheet = match read_statement(&file) {
        Ok(sheet) => sheet,
        Err(err) if err.is_parse_failure() => {
            println!("Could not read {} ({err}); nothing to upload.", file.display());
            return Ok(());
        }
        Err(err) => return Err(err.into()),
    };

    let output = Normalizer::new()
        .normalize(&sheet)
        .with_context(|| format!("normalizing {}", file.display()))?;
    report_skips(&output);

    let mut transactions = output.transactions;
    if transactions.is_empty() {
        println!("No transactions found in {}.", file.display());
        return Ok(());
    }

    // Rows without a parseable date get the first day of the statement month.
    for t in &mut transactions {
        if t.date.is_none() {
            t.date = Some(format!("{month}-01"));
        }
    }

    let Some(stats) = aggregate(&transactions) else {
        println!("No data to aggregate.");
        return Ok(());
    };

    println!("Parsed {} transactions from {}", transactions.len(), file.display());
    print_stats(&stats);

    let cfg = config::load_config()?;

    // The AI step fails independently; it never blocks persistence.
    if !skip_ai {
        match insights_client(&cfg) {
            Some(client) => print_insights(&client.insights(&transactions, &stats).await),
            None => println!("\n(no gemini_api_key configured; skipping AI insights)"),
        }
    }

    let api = api_client(&cfg);
    match api.upload(&transactions, &stats, month).await {
        Ok(resp) => {
            state::clear_pending(month)?;
            println!("\nSaved month {}: {}", resp.month_key, resp.message);
            Ok(())
        }
        Err(err) => {
            let stash = state::stash_pending(&state::PendingUpload {
                month_key: month.to_string(),
                transactions,
                stats,
            })?;
            eprintln!("\nUpload failed: {err:#}");
            eprintln!("Normalized data kept at {}", stash.display());
            bail!("persistence failed; run `khata retry {month}` to re-send without re-uploading")
        }
    }
}

async fn months() -> Result<()> {
    let cfg = config::load_config()?;
    let summaries = api_client(&cfg).list_months().await?;

    if summaries.is_empty() {
        println!("No months stored yet. Upload a statement first.");
        return Ok(());
    }

    println!("{:<10} {:>12} {:>12} {:>6}", "month", "spent", "income", "txns");
    for m in summaries {
        println!(
            "{:<10} {:>12.2} {:>12.2} {:>6}",
            m.month_key, m.total_spent, m.total_income, m.num_transactions
        );
    }
    Ok(())
}

async fn show(month: &str, skip_ai: bool) -> Result<()> {
    validate_month_key(month)?;
    let cfg = config::load_config()?;
    let data = api_client(&cfg).month(month).await?;
    let stats = data.to_summary();

    println!("Month {month}: {} transactions", data.transactions.len());
    print_stats(&stats);

    if !skip_ai {
        if let Some(client) = insights_client(&cfg) {
            print_insights(&client.insights(&data.transactions, &stats).await);
        }
    }
    Ok(())
}

async fn delete(month: &str) -> Result<()> {
    validate_month_key(month)?;
    let cfg = config::load_config()?;
    let resp = api_client(&cfg).delete_month(month).await?;
    println!(
        "{} ({} transactions, {} stats rows)",
        resp.message, resp.transactions_deleted, resp.stats_deleted
    );
    Ok(())
}

async fn retry(month: &str) -> Result<()> {
    validate_month_key(month)?;
    let Some(pending) = state::read_pending(month)? else {
        bail!("no pending upload for {month}");
    };

    let cfg = config::load_config()?;
    let resp = api_client(&cfg)
        .upload(&pending.transactions, &pending.stats, month)
        .await?;
    state::clear_pending(month)?;
    println!("Saved month {}: {}", resp.month_key, resp.message);
    Ok(())
}

async fn chat(month: &str, question: &str) -> Result<()> {
    validate_month_key(month)?;
    let cfg = config::load_config()?;
    let Some(client) = insights_client(&cfg) else {
        bail!("no gemini_api_key configured; run `khata config init` and set [ai] gemini_api_key");
    };

    let data = api_client(&cfg).month(month).await?;
    let stats = data.to_summary();
    let answer = client.ask(question, &data.transactions, &stats).await;
    println!("{answer}");
    Ok(())
}

fn api_client(cfg: &config::Config) -> ApiClient {
    ApiClient::new(cfg.api.base_url.as_str(), cfg.api.token.clone())
}

fn insights_client(cfg: &config::Config) -> Option<InsightsClient> {
    cfg.ai
        .gemini_api_key
        .as_ref()
        .map(|key| InsightsClient::new(key.clone(), cfg.ai.model.clone()))
}

fn validate_month_key(month: &str) -> Result<()> {
    let ok = month.len() == 7
        && month.as_bytes()[4] == b'-'
        && month[..4].chars().all(|c| c.is_ascii_digit())
        && month[5..].chars().all(|c| c.is_ascii_digit())
        && matches!(month[5..].parse::<u32>(), Ok(1..=12));
    if !ok {
        bail!("invalid month key: {month} (expected YYYY-MM)");
    }
    Ok(())
}

fn report_skips(output: &NormalizeOutput) {
    if output.skipped_zero_amount > 0 {
        println!("Skipped {} rows with no debit or credit amount", output.skipped_zero_amount);
    }
    if output.skipped_total_rows > 0 {
        println!("Skipped {} summary/total rows", output.skipped_total_rows);
    }
    if output.skipped_bad_type > 0 {
        println!("Skipped {} rows with an unusable type column", output.skipped_bad_type);
    }
}

fn print_stats(stats: &StatsSummary) {
    println!("\n== Month summary ==");
    println!("Total spent:   {:>12.2}", stats.total_spent);
    println!("Total income:  {:>12.2}", stats.total_income);
    println!("Transactions:  {:>12}", stats.num_transactions);
    println!("Avg per txn:   {:>12.2}", stats.average_transaction);
    println!("Top category:  {}", stats.highest_category);

    if !stats.chart_insights.is_empty() {
        println!("\nSpending by category:");
        for c in &stats.chart_insights {
            println!("  {:<24} {:>12.2}", c.label, c.amount);
        }
    }

    if !stats.top_merchants.is_empty() {
        println!("\nTop merchants:");
        for m in &stats.top_merchants {
            println!("  {:<24} {:>12.2}", m.merchant, m.amount);
        }
    }

    if !stats.monthly_trends.is_empty() {
        println!("\nMonthly trend:");
        for t in &stats.monthly_trends {
            println!("  {:<10} {:>12.2}", t.month, t.amount);
        }
    }
}

fn print_insights(insights: &Insights) {
    println!("\n== AI insights ==");
    if insights.financial_health_score > 0.0 {
        println!("Health score: {:.0}", insights.financial_health_score);
        if !insights.health_score_reason.is_empty() {
            println!("  {}", insights.health_score_reason);
        }
    }
    for r in &insights.reports {
        println!("- {r}");
    }
    if !insights.suggestions.is_empty() {
        println!("Suggestions:");
        for s in &insights.suggestions {
            println!("  - {s}");
        }
    }
    if !insights.anomalies.is_empty() {
        println!("Anomalies:");
        for a in &insights.anomalies {
            println!("  - {a}");
        }
    }
}
