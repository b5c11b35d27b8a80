//! End-to-end exercise of the buffering pipeline: a flaky in-process
//! store standing in for ClickHouse, a real on-disk queue, and the
//! domain services wired the way the agent wires them.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;

use harrow_domain::{
    DeliveryOutcome, DomainResult, FaultService, InMemoryIssueRepository, QueryIssuesInput,
    QueryService, ResolveIssueInput, StatusFilter, StoredRecord, SyncService, TelemetrySample,
    TelemetryStore,
};
use harrow_sqlite::SqliteQueue;

/// Telemetry store double with a connectivity switch and a set of
/// sample values whose appends are rejected.
#[derive(Default)]
struct FlakyStore {
    online: AtomicBool,
    rejected_values: Mutex<Vec<f64>>,
    appended: Mutex<Vec<TelemetrySample>>,
}

impl FlakyStore {
    fn new_online() -> Arc<Self> {
        let store = Self::default();
        store.online.store(true, Ordering::SeqCst);
        Arc::new(store)
    }

    fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }

    async fn reject_value(&self, value: f64) {
        self.rejected_values.lock().await.push(value);
    }

    async fn accept_everything(&self) {
        self.rejected_values.lock().await.clear();
    }

    async fn appended_values(&self) -> Vec<f64> {
        self.appended
            .lock()
            .await
            .iter()
            .map(|sample| sample.numeric_signal("EngineSpeed").unwrap_or(-1.0))
            .collect()
    }
}

#[async_trait]
impl TelemetryStore for FlakyStore {
    async fn append(&self, sample: &TelemetrySample) -> DomainResult<()> {
        if !self.online.load(Ordering::SeqCst) {
            return Err(anyhow::anyhow!("connection refused").into());
        }
        let value = sample.numeric_signal("EngineSpeed").unwrap_or(-1.0);
        if self.rejected_values.lock().await.contains(&value) {
            return Err(anyhow::anyhow!("write rejected").into());
        }
        self.appended.lock().await.push(sample.clone());
        Ok(())
    }

    async fn recent_slice(&self, limit: u32) -> DomainResult<Vec<StoredRecord>> {
        let appended = self.appended.lock().await;
        let records = appended
            .iter()
            .rev()
            .take(limit as usize)
            .map(|sample| StoredRecord {
                captured_at: sample.captured_at,
                received_at: sample.captured_at,
                signals: sample.signals.clone(),
            })
            .collect();
        Ok(records)
    }

    async fn ping(&self) -> DomainResult<()> {
        if self.online.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(anyhow::anyhow!("no route to host").into())
        }
    }
}

fn sample_numbered(n: f64) -> TelemetrySample {
    let mut sample = TelemetrySample::new(Utc::now());
    sample.signals.insert("EngineSpeed".to_string(), n.into());
    sample
}

fn fault_sample(spn: u32, fmi: u8) -> TelemetrySample {
    let mut sample = TelemetrySample::new(Utc::now());
    sample
        .signals
        .insert("ActiveDtc1Spn".to_string(), (spn as f64).into());
    sample
        .signals
        .insert("ActiveDtc1Fmi".to_string(), (fmi as f64).into());
    sample
}

#[tokio::test]
async fn outage_buffers_and_reconnection_reconciles_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let queue = Arc::new(SqliteQueue::open(dir.path().join("queue.db")).unwrap());
    let store = FlakyStore::new_online();
    let sync = SyncService::new(store.clone(), queue.clone());

    // Online: straight through, nothing buffered.
    let outcome = sync.deliver(&sample_numbered(1.0)).await.unwrap();
    assert_eq!(outcome, DeliveryOutcome::Delivered);
    assert_eq!(sync.queue_stats().await.unwrap().pending_entries, 0);

    // Outage: every sample lands in the queue, in order.
    store.set_online(false);
    for n in [2.0, 3.0, 4.0] {
        let outcome = sync.deliver(&sample_numbered(n)).await.unwrap();
        assert!(matches!(outcome, DeliveryOutcome::Buffered(_)));
    }
    assert_eq!(sync.queue_stats().await.unwrap().pending_entries, 3);

    // Still offline: the drain probe notices and touches nothing.
    assert_eq!(sync.drain_queue().await.unwrap(), 0);

    // Back online: everything reconciles in production order.
    store.set_online(true);
    assert_eq!(sync.drain_queue().await.unwrap(), 3);
    assert_eq!(sync.queue_stats().await.unwrap().pending_entries, 0);
    assert_eq!(store.appended_values().await, vec![1.0, 2.0, 3.0, 4.0]);
}

#[tokio::test]
async fn partial_drain_keeps_the_rest_for_the_next_cycle() {
    let dir = tempfile::tempdir().unwrap();
    let queue = Arc::new(SqliteQueue::open(dir.path().join("queue.db")).unwrap());
    let store = FlakyStore::new_online();
    let sync = SyncService::new(store.clone(), queue.clone());

    store.set_online(false);
    for n in [1.0, 2.0, 3.0] {
        sync.deliver(&sample_numbered(n)).await.unwrap();
    }

    // First two appends succeed, the third is rejected mid-drain.
    store.set_online(true);
    store.reject_value(3.0).await;

    assert_eq!(sync.drain_queue().await.unwrap(), 2);
    assert_eq!(sync.queue_stats().await.unwrap().pending_entries, 1);

    // Next cycle picks up the remaining entry first.
    store.accept_everything().await;
    assert_eq!(sync.drain_queue().await.unwrap(), 1);
    assert_eq!(sync.queue_stats().await.unwrap().pending_entries, 0);
    assert_eq!(store.appended_values().await, vec![1.0, 2.0, 3.0]);
}

#[tokio::test]
async fn faults_dedup_resolve_and_query_across_the_pipeline() {
    let issues = Arc::new(InMemoryIssueRepository::new());
    let faults = FaultService::new(issues.clone());

    for _ in 0..3 {
        faults.observe(&fault_sample(100, 5)).await.unwrap();
    }

    let active = faults
        .query_issues(QueryIssuesInput {
            status: StatusFilter::Active,
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].occurrence_count, 3);

    let resolved = faults
        .resolve(ResolveIssueInput {
            issue_id: active[0].issue_id.clone(),
            resolved_by: "tech1".to_string(),
            notes: Some("replaced sensor".to_string()),
        })
        .await
        .unwrap();
    assert_eq!(
        resolved.resolution.as_ref().map(|r| r.resolved_by.as_str()),
        Some("tech1")
    );

    let still_active = faults
        .query_issues(QueryIssuesInput {
            status: StatusFilter::Active,
            ..Default::default()
        })
        .await
        .unwrap();
    assert!(still_active.is_empty());
}

#[tokio::test]
async fn windowed_query_sees_delivered_samples() {
    let dir = tempfile::tempdir().unwrap();
    let queue = Arc::new(SqliteQueue::open(dir.path().join("queue.db")).unwrap());
    let store = FlakyStore::new_online();
    let issues = Arc::new(InMemoryIssueRepository::new());
    let sync = SyncService::new(store.clone(), queue);
    let queries = QueryService::new(store.clone(), issues, 100);

    for n in [1.0, 2.0] {
        sync.deliver(&sample_numbered(n)).await.unwrap();
    }

    let window = queries.recent_telemetry(1).await.unwrap();
    assert_eq!(window.records.len(), 2);
    assert!(!window.truncated);
}
