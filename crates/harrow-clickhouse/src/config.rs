use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClickHouseConfig {
    pub url: String,
    pub database: String,
    pub username: String,
    pub password: String,
    pub telemetry_table: String,
    pub issues_table: String,
    pub request_timeout_secs: u64,
}

impl Default for ClickHouseConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:8123".to_string(),
            database: "harrow".to_string(),
            username: "default".to_string(),
            password: "".to_string(),
            telemetry_table: "telemetry".to_string(),
            issues_table: "issues".to_string(),
            request_timeout_secs: 30,
        }
    }
}
