use config::{Config, ConfigError, Environment};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServiceConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    // OpenTelemetry configuration
    /// Service name reported to the collector
    #[serde(default = "default_otel_service_name")]
    pub otel_service_name: String,

    /// OTLP endpoint
    #[serde(default = "default_otel_endpoint")]
    pub otel_endpoint: String,

    /// Whether to export traces and logs over OTLP
    #[serde(default)]
    pub otel_enabled: bool,

    // ClickHouse configuration
    /// ClickHouse HTTP URL
    #[serde(default = "default_clickhouse_url")]
    pub clickhouse_url: String,

    /// ClickHouse database name
    #[serde(default = "default_clickhouse_database")]
    pub clickhouse_database: String,

    /// ClickHouse username
    #[serde(default = "default_clickhouse_username")]
    pub clickhouse_username: String,

    /// ClickHouse password
    #[serde(default = "default_clickhouse_password")]
    pub clickhouse_password: String,

    /// Telemetry table name
    #[serde(default = "default_telemetry_table")]
    pub telemetry_table: String,

    /// Issues table name
    #[serde(default = "default_issues_table")]
    pub issues_table: String,

    /// Timeout for any single remote call in seconds
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    // Local queue configuration
    /// Path of the SQLite queue file
    #[serde(default = "default_queue_path")]
    pub queue_path: String,

    /// Pending-row cap; oldest rows are dropped beyond this
    #[serde(default = "default_max_pending_samples")]
    pub max_pending_samples: u64,

    // Scheduling
    /// Seconds between samples
    #[serde(default = "default_sample_interval_secs")]
    pub sample_interval_secs: u64,

    /// Seconds between drain cycles
    #[serde(default = "default_drain_interval_secs")]
    pub drain_interval_secs: u64,

    /// Seconds between status summaries
    #[serde(default = "default_status_interval_secs")]
    pub status_interval_secs: u64,

    // Queries
    /// Most recent rows scanned per window query
    #[serde(default = "default_query_scan_depth")]
    pub query_scan_depth: u32,

    /// Generate simulated samples instead of reading a bus
    #[serde(default = "default_demo_mode")]
    pub demo_mode: bool,
}

impl ServiceConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let config = Config::builder()
            .add_source(Environment::default())
            .build()?;
        config.try_deserialize()
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_otel_service_name() -> String {
    "harrow-agent".to_string()
}

fn default_otel_endpoint() -> String {
    "http://localhost:4317".to_string()
}

fn default_clickhouse_url() -> String {
    "http://localhost:8123".to_string()
}

fn default_clickhouse_database() -> String {
    "harrow".to_string()
}

fn default_clickhouse_username() -> String {
    "default".to_string()
}

fn default_clickhouse_password() -> String {
    "".to_string()
}

fn default_telemetry_table() -> String {
    "telemetry".to_string()
}

fn default_issues_table() -> String {
    "issues".to_string()
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_queue_path() -> String {
    "data/offline_queue.db".to_string()
}

fn default_max_pending_samples() -> u64 {
    100_000
}

fn default_sample_interval_secs() -> u64 {
    30
}

fn default_drain_interval_secs() -> u64 {
    60
}

fn default_status_interval_secs() -> u64 {
    300
}

fn default_query_scan_depth() -> u32 {
    5_000
}

fn default_demo_mode() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_fill_every_field() {
        let config: ServiceConfig = serde_json::from_str("{}").unwrap();

        assert_eq!(config.log_level, "info");
        assert_eq!(config.sample_interval_secs, 30);
        assert_eq!(config.drain_interval_secs, 60);
        assert_eq!(config.query_scan_depth, 5_000);
        assert!(config.demo_mode);
        assert!(!config.otel_enabled);
    }
}
