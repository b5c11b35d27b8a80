mod client;
mod config;
mod conversions;
mod issue_repository;
mod models;
mod schema;
mod telemetry_store;

pub use client::ClickHouseClient;
pub use config::ClickHouseConfig;
pub use issue_repository::ClickHouseIssueRepository;
pub use models::{IssueRow, TelemetryRow};
pub use schema::ensure_schema;
pub use telemetry_store::ClickHouseTelemetryStore;
