//! khata-core: canonical transaction records and deterministic statistics.

pub mod stats;
pub mod transaction;

pub use stats::{aggregate, month_key, ChartInsight, MerchantTotal, MonthlyTrend, StatsSummary};
pub use transaction::{Transaction, TxnType, ACCOUNT_HOLDER, UNCATEGORIZED};
