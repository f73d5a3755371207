//! khata-client: thin HTTP collaborators, the month-keyed persistence API
//! and the AI insight/chat service.

pub mod api;
pub mod insights;

pub use api::{
    ApiClient, DeleteResponse, MonthData, MonthSummary, StatsJson, StoredStats, UploadResponse,
    UploadStats,
};
pub use insights::{csv_sample, Insights, InsightsClient};
