use async_trait::async_trait;

use crate::error::DomainResult;
use crate::issue::{DiagnosticIssue, QueryIssuesInput};
use crate::sample::{QueueEntry, QueueStats, StoredRecord, TelemetrySample};

/// Remote append store for telemetry. Append-only: nothing in this
/// interface mutates or deletes a stored record. Infrastructure crates
/// implement this trait.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TelemetryStore: Send + Sync {
    /// Append one sample. Idempotency is not guaranteed by the store;
    /// retries may duplicate.
    async fn append(&self, sample: &TelemetrySample) -> DomainResult<()>;

    /// The most recent `limit` records. No ordering promise to callers;
    /// consumers filter and sort client-side.
    async fn recent_slice(&self, limit: u32) -> DomainResult<Vec<StoredRecord>>;

    /// Lightweight reachability probe.
    async fn ping(&self) -> DomainResult<()>;
}

/// Local durable FIFO of samples awaiting upload. Contents survive
/// process restart in sequence order.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DurableQueue: Send + Sync {
    /// Buffer a sample, returning its assigned sequence number. Fails
    /// with `StorageFailure` if the medium is unusable.
    async fn enqueue(&self, sample: &TelemetrySample) -> DomainResult<i64>;

    /// The lowest-sequence pending entry, if any.
    async fn peek_oldest(&self) -> DomainResult<Option<QueueEntry>>;

    /// Remove one entry. Removing an already-removed sequence is a
    /// no-op, not an error.
    async fn remove(&self, sequence: i64) -> DomainResult<()>;

    /// Pending count and oldest pending timestamp for operational
    /// visibility.
    async fn stats(&self) -> DomainResult<QueueStats>;
}

/// Persistence for diagnostic issues, keyed by issue id.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait IssueRepository: Send + Sync {
    async fn get(&self, issue_id: &str) -> DomainResult<Option<DiagnosticIssue>>;

    /// Insert or replace the stored state of one issue.
    async fn upsert(&self, issue: &DiagnosticIssue) -> DomainResult<()>;

    async fn list(&self, input: QueryIssuesInput) -> DomainResult<Vec<DiagnosticIssue>>;
}
