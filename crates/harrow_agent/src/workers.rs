use std::sync::Arc;
use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use harrow_domain::{
    DeliveryOutcome, DomainError, FaultService, QueryIssuesInput, QueryService, SampleSource,
    StatusFilter, SyncService,
};

/// Pulls a sample every interval, delivers it, and feeds it to the
/// fault lifecycle engine. A local queue failure is fatal: it means
/// buffering is broken and telemetry loss is imminent.
pub struct IngestWorker {
    source: Box<dyn SampleSource>,
    sync: Arc<SyncService>,
    faults: Arc<FaultService>,
    interval: Duration,
}

impl IngestWorker {
    pub fn new(
        source: Box<dyn SampleSource>,
        sync: Arc<SyncService>,
        faults: Arc<FaultService>,
        interval: Duration,
    ) -> Self {
        Self {
            source,
            sync,
            faults,
            interval,
        }
    }

    pub async fn run(mut self, token: CancellationToken) -> anyhow::Result<()> {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = token.cancelled() => {
                    info!("Ingest worker stopping");
                    return Ok(());
                }
                _ = ticker.tick() => {}
            }

            let Some(sample) = self.source.next_sample() else {
                info!("Sample source exhausted, ingest worker stopping");
                return Ok(());
            };

            match self.sync.deliver(&sample).await {
                Ok(DeliveryOutcome::Delivered) => {
                    debug!(captured_at = %sample.captured_at, "Sample delivered");
                }
                Ok(DeliveryOutcome::Buffered(sequence)) => {
                    debug!(sequence, "Sample buffered for later upload");
                }
                Err(err @ DomainError::StorageFailure(_)) => {
                    error!(error = %err, "Local queue unusable, telemetry loss is imminent");
                    return Err(err.into());
                }
                Err(err) => return Err(err.into()),
            }

            // A remote hiccup here must not take ingestion down; the
            // issue state converges on the next observation.
            if let Err(err) = self.faults.observe(&sample).await {
                warn!(error = %err, "Fault observation failed for this sample");
            }
        }
    }
}

/// Periodically reconciles the local queue against the remote store and
/// reports what is still waiting.
pub struct DrainWorker {
    sync: Arc<SyncService>,
    interval: Duration,
}

impl DrainWorker {
    pub fn new(sync: Arc<SyncService>, interval: Duration) -> Self {
        Self { sync, interval }
    }

    pub async fn run(self, token: CancellationToken) -> anyhow::Result<()> {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = token.cancelled() => {
                    info!("Drain worker stopping");
                    return Ok(());
                }
                _ = ticker.tick() => {}
            }

            match self.sync.drain_queue().await {
                Ok(0) => {}
                Ok(drained) => info!(drained, "Reconciled buffered samples"),
                Err(err) => {
                    error!(error = %err, "Queue drain failed");
                    return Err(err.into());
                }
            }

            match self.sync.queue_stats().await {
                Ok(stats) if stats.pending_entries > 0 => {
                    info!(
                        pending = stats.pending_entries,
                        oldest_enqueued_at = ?stats.oldest_enqueued_at,
                        "Samples awaiting upload"
                    );
                }
                Ok(_) => {}
                Err(err) => warn!(error = %err, "Failed to read queue stats"),
            }
        }
    }
}

/// Periodic operational summary: recent window size and active issue
/// count. Skipped quietly while the store is unreachable.
pub struct StatusWorker {
    queries: Arc<QueryService>,
    faults: Arc<FaultService>,
    interval: Duration,
}

impl StatusWorker {
    pub fn new(queries: Arc<QueryService>, faults: Arc<FaultService>, interval: Duration) -> Self {
        Self {
            queries,
            faults,
            interval,
        }
    }

    pub async fn run(self, token: CancellationToken) -> anyhow::Result<()> {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = token.cancelled() => {
                    info!("Status worker stopping");
                    return Ok(());
                }
                _ = ticker.tick() => {}
            }

            let window = match self.queries.recent_telemetry(1).await {
                Ok(window) => window,
                Err(err) => {
                    debug!(error = %err, "Status summary skipped, store unreachable");
                    continue;
                }
            };
            let active_issues = match self
                .faults
                .query_issues(QueryIssuesInput {
                    status: StatusFilter::Active,
                    ..Default::default()
                })
                .await
            {
                Ok(issues) => issues.len(),
                Err(err) => {
                    debug!(error = %err, "Status summary skipped, issue table unreachable");
                    continue;
                }
            };

            info!(
                records_last_hour = window.records.len(),
                window_truncated = window.truncated,
                active_issues,
                "Agent status"
            );
        }
    }
}
