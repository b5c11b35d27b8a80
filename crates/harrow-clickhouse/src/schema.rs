use anyhow::{Context, Result};
use tracing::info;

use crate::client::ClickHouseClient;
use crate::config::ClickHouseConfig;

/// Creates the telemetry and issue tables if they do not exist yet.
/// Idempotent; safe to run at every agent start. The issues table is a
/// ReplacingMergeTree so issue updates are plain inserts collapsed to
/// the latest version at read time.
pub async fn ensure_schema(client: &ClickHouseClient, config: &ClickHouseConfig) -> Result<()> {
    let telemetry_ddl = format!(
        "CREATE TABLE IF NOT EXISTS {} (
             captured_at DateTime,
             received_at DateTime,
             signals String
         ) ENGINE = MergeTree
         ORDER BY captured_at",
        config.telemetry_table
    );
    client
        .get_client()
        .query(&telemetry_ddl)
        .execute()
        .await
        .with_context(|| format!("creating table {}", config.telemetry_table))?;

    let issues_ddl = format!(
        "CREATE TABLE IF NOT EXISTS {} (
             issue_id String,
             spn UInt32,
             fmi UInt8,
             description String,
             category String,
             status LowCardinality(String),
             first_seen DateTime,
             last_seen DateTime,
             occurrence_count UInt32,
             resolved_by Nullable(String),
             resolved_at Nullable(DateTime),
             notes Nullable(String),
             updated_at DateTime64(3)
         ) ENGINE = ReplacingMergeTree(updated_at)
         ORDER BY issue_id",
        config.issues_table
    );
    client
        .get_client()
        .query(&issues_ddl)
        .execute()
        .await
        .with_context(|| format!("creating table {}", config.issues_table))?;

    info!(
        telemetry_table = %config.telemetry_table,
        issues_table = %config.issues_table,
        "ClickHouse schema ready"
    );
    Ok(())
}
