use chrono::{DateTime, Utc};
use clickhouse::Row;
use serde::{Deserialize, Serialize};

/// One telemetry row. Signal maps are stored as a JSON string so the
/// column schema stays stable while signal names vary across machines.
#[derive(Debug, Clone, Row, Serialize, Deserialize)]
pub struct TelemetryRow {
    #[serde(with = "clickhouse::serde::chrono::datetime")]
    pub captured_at: DateTime<Utc>,
    #[serde(with = "clickhouse::serde::chrono::datetime")]
    pub received_at: DateTime<Utc>,
    pub signals: String,
}

/// One version of a diagnostic issue. The table is a
/// ReplacingMergeTree keyed by issue_id and versioned by updated_at:
/// every state change is an insert, and reads collapse to the latest
/// version. That keeps the wire append-only.
#[derive(Debug, Clone, Row, Serialize, Deserialize)]
pub struct IssueRow {
    pub issue_id: String,
    pub spn: u32,
    pub fmi: u8,
    pub description: String,
    pub category: String,
    pub status: String,
    #[serde(with = "clickhouse::serde::chrono::datetime")]
    pub first_seen: DateTime<Utc>,
    #[serde(with = "clickhouse::serde::chrono::datetime")]
    pub last_seen: DateTime<Utc>,
    pub occurrence_count: u32,
    pub resolved_by: Option<String>,
    #[serde(with = "clickhouse::serde::chrono::datetime::option")]
    pub resolved_at: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    #[serde(with = "clickhouse::serde::chrono::datetime64::millis")]
    pub updated_at: DateTime<Utc>,
}
