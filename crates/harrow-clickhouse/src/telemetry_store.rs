use std::time::Duration;

use anyhow::anyhow;
use async_trait::async_trait;
use chrono::Utc;
use tracing::{error, warn};

use harrow_domain::{DomainError, DomainResult, StoredRecord, TelemetrySample, TelemetryStore};

use crate::client::ClickHouseClient;
use crate::models::TelemetryRow;

/// ClickHouse implementation of the remote telemetry store. Every
/// network call is bounded by the configured timeout; an elapsed
/// timeout is a failure, never a call left pending.
#[derive(Clone)]
pub struct ClickHouseTelemetryStore {
    client: ClickHouseClient,
    table: String,
    timeout: Duration,
}

impl ClickHouseTelemetryStore {
    pub fn new(client: ClickHouseClient, table: String, timeout: Duration) -> Self {
        Self {
            client,
            table,
            timeout,
        }
    }
}

#[async_trait]
impl TelemetryStore for ClickHouseTelemetryStore {
    async fn append(&self, sample: &TelemetrySample) -> DomainResult<()> {
        let row = TelemetryRow::from_sample(sample, Utc::now());
        let write = async {
            let mut insert = self
                .client
                .get_client()
                .insert::<TelemetryRow>(&self.table)?;
            insert.write(&row).await?;
            insert.end().await
        };

        tokio::time::timeout(self.timeout, write)
            .await
            .map_err(|_| {
                DomainError::RepositoryError(anyhow!(
                    "append timed out after {:?}",
                    self.timeout
                ))
            })?
            .map_err(|err| {
                error!("Failed to append telemetry row: {}", err);
                DomainError::RepositoryError(err.into())
            })
    }

    async fn recent_slice(&self, limit: u32) -> DomainResult<Vec<StoredRecord>> {
        let sql = format!(
            "SELECT ?fields FROM {} ORDER BY captured_at DESC LIMIT ?",
            self.table
        );
        let fetch = self
            .client
            .get_client()
            .query(&sql)
            .bind(limit)
            .fetch_all::<TelemetryRow>();

        let rows = tokio::time::timeout(self.timeout, fetch)
            .await
            .map_err(|_| {
                DomainError::RepositoryError(anyhow!(
                    "window read timed out after {:?}",
                    self.timeout
                ))
            })?
            .map_err(|err| {
                error!("Failed to read telemetry window: {}", err);
                DomainError::RepositoryError(err.into())
            })?;

        // A single corrupt payload must not make the whole window
        // unreadable.
        let records = rows
            .into_iter()
            .filter_map(|row| match StoredRecord::try_from(row) {
                Ok(record) => Some(record),
                Err(err) => {
                    warn!("Skipping unreadable telemetry row: {}", err);
                    None
                }
            })
            .collect();
        Ok(records)
    }

    async fn ping(&self) -> DomainResult<()> {
        tokio::time::timeout(self.timeout, self.client.ping())
            .await
            .map_err(|_| {
                DomainError::RepositoryError(anyhow!("probe timed out after {:?}", self.timeout))
            })?
            .map_err(DomainError::RepositoryError)
    }
}
