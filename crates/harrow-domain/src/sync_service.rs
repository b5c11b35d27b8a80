use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::error::DomainResult;
use crate::repository::{DurableQueue, TelemetryStore};
use crate::sample::{QueueStats, TelemetrySample};

/// How a delivered sample reached safety.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// Appended directly to the remote store.
    Delivered,
    /// Buffered locally under the given sequence number.
    Buffered(i64),
}

/// Orchestrates delivery: direct append first, local buffering on any
/// append failure, and periodic drains that reconcile the buffer once
/// the store is reachable again.
///
/// Remote failures never escape `deliver`; the only error a producer
/// can see is a local `StorageFailure`, which means buffering itself is
/// broken and telemetry loss is imminent.
pub struct SyncService {
    store: Arc<dyn TelemetryStore>,
    queue: Arc<dyn DurableQueue>,
}

impl SyncService {
    pub fn new(store: Arc<dyn TelemetryStore>, queue: Arc<dyn DurableQueue>) -> Self {
        Self { store, queue }
    }

    /// Deliver one sample, falling back to the local queue if the
    /// remote append fails for any reason.
    pub async fn deliver(&self, sample: &TelemetrySample) -> DomainResult<DeliveryOutcome> {
        match self.store.append(sample).await {
            Ok(()) => {
                debug!(captured_at = %sample.captured_at, "Appended sample to remote store");
                Ok(DeliveryOutcome::Delivered)
            }
            Err(err) => {
                warn!(
                    captured_at = %sample.captured_at,
                    error = %err,
                    "Direct append failed, buffering sample locally"
                );
                let sequence = self.queue.enqueue(sample).await?;
                debug!(sequence, "Sample buffered");
                Ok(DeliveryOutcome::Buffered(sequence))
            }
        }
    }

    /// Empirical connectivity check. A failing probe counts as offline;
    /// nothing is inferred from earlier results.
    pub async fn is_online(&self) -> bool {
        match self.store.ping().await {
            Ok(()) => true,
            Err(err) => {
                debug!(error = %err, "Reachability probe failed");
                false
            }
        }
    }

    /// Drain buffered entries oldest-first. Each entry is removed only
    /// after the store acknowledged its append; the first failed append
    /// stops the drain until the next scheduled cycle. A partially
    /// drained queue is a valid steady state.
    pub async fn drain_queue(&self) -> DomainResult<usize> {
        if !self.is_online().await {
            debug!("Store unreachable, skipping drain");
            return Ok(0);
        }

        let mut drained = 0usize;
        loop {
            let Some(entry) = self.queue.peek_oldest().await? else {
                break;
            };
            match self.store.append(&entry.sample).await {
                Ok(()) => {
                    self.queue.remove(entry.sequence).await?;
                    drained += 1;
                }
                Err(err) => {
                    warn!(
                        sequence = entry.sequence,
                        error = %err,
                        "Drain append failed, stopping until next cycle"
                    );
                    break;
                }
            }
        }

        if drained > 0 {
            info!(drained, "Drained buffered samples to remote store");
        }
        Ok(drained)
    }

    pub async fn queue_stats(&self) -> DomainResult<QueueStats> {
        self.queue.stats().await
    }
}
