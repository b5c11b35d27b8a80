use std::sync::Arc;

use chrono::{Duration, Utc};
use tracing::debug;

use crate::error::DomainResult;
use crate::issue::{DiagnosticIssue, QueryIssuesInput};
use crate::repository::{IssueRepository, TelemetryStore};
use crate::sample::StoredRecord;

/// Result of a windowed telemetry query, newest-first.
///
/// The read scans at most a fixed number of recent rows. When the scan
/// depth was filled, `truncated` is set: very sparse old data inside
/// the requested window may be missing. That is a documented
/// approximation, not an error.
#[derive(Debug, Clone, PartialEq)]
pub struct TelemetryWindow {
    pub records: Vec<StoredRecord>,
    pub truncated: bool,
    pub scanned: usize,
}

/// Read-only query surface for presentation layers: recent telemetry
/// windows and issue listings. Never mutates either store.
pub struct QueryService {
    store: Arc<dyn TelemetryStore>,
    issues: Arc<dyn IssueRepository>,
    scan_depth: u32,
}

impl QueryService {
    pub fn new(
        store: Arc<dyn TelemetryStore>,
        issues: Arc<dyn IssueRepository>,
        scan_depth: u32,
    ) -> Self {
        Self {
            store,
            issues,
            scan_depth,
        }
    }

    /// All stored records captured within the last `hours` hours,
    /// newest-first, bounded by the configured scan depth. The scanned
    /// slice is filtered and sorted here; the store makes no ordering
    /// promise.
    pub async fn recent_telemetry(&self, hours: u32) -> DomainResult<TelemetryWindow> {
        let scanned_rows = self.store.recent_slice(self.scan_depth).await?;
        let scanned = scanned_rows.len();
        let truncated = self.scan_depth > 0 && scanned == self.scan_depth as usize;

        let now = Utc::now();
        let cutoff = now - Duration::hours(i64::from(hours));
        let mut records: Vec<StoredRecord> = scanned_rows
            .into_iter()
            .filter(|record| record.captured_at >= cutoff && record.captured_at <= now)
            .collect();
        records.sort_by(|a, b| b.captured_at.cmp(&a.captured_at));

        if truncated {
            debug!(
                scan_depth = self.scan_depth,
                hours, "Window scan hit the depth bound; older rows in the window may be missing"
            );
        }

        Ok(TelemetryWindow {
            records,
            truncated,
            scanned,
        })
    }

    pub async fn query_issues(
        &self,
        input: QueryIssuesInput,
    ) -> DomainResult<Vec<DiagnosticIssue>> {
        self.issues.list(input).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::{MockIssueRepository, MockTelemetryStore};
    use chrono::{DateTime, Utc};
    use std::collections::BTreeMap;

    fn record(captured_at: DateTime<Utc>) -> StoredRecord {
        let mut signals = BTreeMap::new();
        signals.insert("EngineSpeed".to_string(), 1500.0.into());
        StoredRecord {
            captured_at,
            received_at: captured_at,
            signals,
        }
    }

    fn service_with_rows(rows: Vec<StoredRecord>, scan_depth: u32) -> QueryService {
        let mut store = MockTelemetryStore::new();
        store
            .expect_recent_slice()
            .times(1)
            .returning(move |_| Ok(rows.clone()));
        QueryService::new(
            Arc::new(store),
            Arc::new(MockIssueRepository::new()),
            scan_depth,
        )
    }

    #[tokio::test]
    async fn filters_to_the_requested_window() {
        let now = Utc::now();
        let service = service_with_rows(
            vec![
                record(now - Duration::minutes(90)),
                record(now - Duration::minutes(30)),
            ],
            100,
        );

        let window = service.recent_telemetry(1).await.unwrap();

        assert_eq!(window.records.len(), 1);
        assert_eq!(window.scanned, 2);
        assert!(!window.truncated);
        assert!(window.records[0].captured_at > now - Duration::minutes(31));
    }

    #[tokio::test]
    async fn sorts_newest_first_without_trusting_store_order() {
        let now = Utc::now();
        let service = service_with_rows(
            vec![
                record(now - Duration::minutes(40)),
                record(now - Duration::minutes(5)),
                record(now - Duration::minutes(20)),
            ],
            100,
        );

        let window = service.recent_telemetry(1).await.unwrap();

        let times: Vec<_> = window.records.iter().map(|r| r.captured_at).collect();
        let mut sorted = times.clone();
        sorted.sort_by(|a, b| b.cmp(a));
        assert_eq!(times, sorted);
        assert_eq!(window.records.len(), 3);
    }

    #[tokio::test]
    async fn flags_truncation_when_the_scan_depth_is_filled() {
        let now = Utc::now();
        let rows: Vec<_> = (0..4)
            .map(|i| record(now - Duration::minutes(i)))
            .collect();
        let service = service_with_rows(rows, 4);

        let window = service.recent_telemetry(1).await.unwrap();

        assert!(window.truncated);
        assert_eq!(window.scanned, 4);
    }
}
