use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use harrow_domain::{
    DomainError, DomainResult, DurableQueue, QueueEntry, QueueStats, TelemetrySample,
};

// WAL keeps readers cheap while the single writer appends; the queue
// file must stay readable for operational tooling while the agent runs.
const SCHEMA_SQL: &str = r#"
PRAGMA journal_mode = WAL;
PRAGMA synchronous = NORMAL;

CREATE TABLE IF NOT EXISTS pending_samples (
    seq INTEGER PRIMARY KEY AUTOINCREMENT,
    captured_at TEXT NOT NULL,
    signals TEXT NOT NULL,
    enqueued_at TEXT NOT NULL
);
"#;

/// SQLite-backed durable queue of samples awaiting upload. Entries
/// survive process restart in sequence order; removal is idempotent.
pub struct SqliteQueue {
    conn: Mutex<Connection>,
    max_pending: Option<u64>,
}

impl SqliteQueue {
    /// Opens (creating if needed) the queue file and its schema.
    pub fn open(path: impl AsRef<Path>) -> DomainResult<Self> {
        let path = path.as_ref();
        if let Some(dir) = path.parent() {
            if !dir.as_os_str().is_empty() {
                std::fs::create_dir_all(dir).map_err(storage_err)?;
            }
        }

        let conn = Connection::open(path).map_err(storage_err)?;
        conn.execute_batch(SCHEMA_SQL).map_err(storage_err)?;

        info!(path = %path.display(), "Opened local sample queue");
        Ok(Self {
            conn: Mutex::new(conn),
            max_pending: None,
        })
    }

    /// Caps the pending row count. When the cap is exceeded the oldest
    /// rows are dropped with a warning, so a long outage cannot fill
    /// the device's disk.
    pub fn with_max_pending(mut self, max_pending: u64) -> Self {
        self.max_pending = Some(max_pending);
        self
    }

    fn enforce_cap(conn: &Connection, max_pending: u64) -> DomainResult<()> {
        let pending: i64 = conn
            .query_row("SELECT COUNT(*) FROM pending_samples", [], |row| row.get(0))
            .map_err(storage_err)?;
        let overflow = pending - max_pending as i64;
        if overflow > 0 {
            conn.execute(
                "DELETE FROM pending_samples WHERE seq IN (
                     SELECT seq FROM pending_samples ORDER BY seq ASC LIMIT ?1
                 )",
                params![overflow],
            )
            .map_err(storage_err)?;
            warn!(
                dropped = overflow,
                max_pending, "Pending queue over capacity, dropped oldest samples"
            );
        }
        Ok(())
    }
}

fn storage_err(err: impl std::fmt::Display) -> DomainError {
    DomainError::StorageFailure(err.to_string())
}

fn parse_instant(text: &str) -> DomainResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(text)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|err| storage_err(format!("corrupt timestamp {:?}: {}", text, err)))
}

#[async_trait]
impl DurableQueue for SqliteQueue {
    async fn enqueue(&self, sample: &TelemetrySample) -> DomainResult<i64> {
        let signals = serde_json::to_string(&sample.signals).map_err(storage_err)?;
        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT INTO pending_samples (captured_at, signals, enqueued_at)
             VALUES (?1, ?2, ?3)",
            params![
                sample.captured_at.to_rfc3339(),
                signals,
                Utc::now().to_rfc3339()
            ],
        )
        .map_err(storage_err)?;
        let sequence = conn.last_insert_rowid();

        if let Some(max_pending) = self.max_pending {
            Self::enforce_cap(&conn, max_pending)?;
        }

        debug!(sequence, "Buffered sample locally");
        Ok(sequence)
    }

    async fn peek_oldest(&self) -> DomainResult<Option<QueueEntry>> {
        let conn = self.conn.lock().await;
        let row = conn
            .query_row(
                "SELECT seq, captured_at, signals, enqueued_at
                 FROM pending_samples ORDER BY seq ASC LIMIT 1",
                [],
                |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                    ))
                },
            )
            .optional()
            .map_err(storage_err)?;

        match row {
            None => Ok(None),
            Some((sequence, captured_at, signals, enqueued_at)) => Ok(Some(QueueEntry {
                sequence,
                sample: TelemetrySample {
                    captured_at: parse_instant(&captured_at)?,
                    signals: serde_json::from_str(&signals).map_err(storage_err)?,
                },
                enqueued_at: parse_instant(&enqueued_at)?,
            })),
        }
    }

    async fn remove(&self, sequence: i64) -> DomainResult<()> {
        let conn = self.conn.lock().await;
        let removed = conn
            .execute(
                "DELETE FROM pending_samples WHERE seq = ?1",
                params![sequence],
            )
            .map_err(storage_err)?;
        // Zero rows means the entry was already removed; fine under
        // at-least-once crash recovery.
        debug!(sequence, removed, "Removed drained entry");
        Ok(())
    }

    async fn stats(&self) -> DomainResult<QueueStats> {
        let conn = self.conn.lock().await;
        let pending: i64 = conn
            .query_row("SELECT COUNT(*) FROM pending_samples", [], |row| row.get(0))
            .map_err(storage_err)?;
        let oldest: Option<String> = conn
            .query_row(
                "SELECT enqueued_at FROM pending_samples ORDER BY seq ASC LIMIT 1",
                [],
                |row| row.get(0),
            )
            .optional()
            .map_err(storage_err)?;

        Ok(QueueStats {
            pending_entries: pending as u64,
            oldest_enqueued_at: oldest.map(|text| parse_instant(&text)).transpose()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn sample_numbered(n: f64) -> TelemetrySample {
        let mut sample = TelemetrySample::new(Utc::now());
        sample.signals.insert("EngineSpeed".to_string(), n.into());
        sample
            .signals
            .insert("Gear".to_string(), "neutral".into());
        sample
    }

    #[tokio::test]
    async fn assigns_increasing_sequences_and_preserves_order() {
        let dir = tempfile::tempdir().unwrap();
        let queue = SqliteQueue::open(dir.path().join("queue.db")).unwrap();

        let first = queue.enqueue(&sample_numbered(1.0)).await.unwrap();
        let second = queue.enqueue(&sample_numbered(2.0)).await.unwrap();
        assert!(second > first);

        let oldest = queue.peek_oldest().await.unwrap().unwrap();
        assert_eq!(oldest.sequence, first);
        assert_eq!(oldest.sample.numeric_signal("EngineSpeed"), Some(1.0));

        queue.remove(first).await.unwrap();
        let next = queue.peek_oldest().await.unwrap().unwrap();
        assert_eq!(next.sequence, second);
    }

    #[tokio::test]
    async fn round_trips_signal_values() {
        let dir = tempfile::tempdir().unwrap();
        let queue = SqliteQueue::open(dir.path().join("queue.db")).unwrap();
        let sample = sample_numbered(1234.5);

        queue.enqueue(&sample).await.unwrap();
        let entry = queue.peek_oldest().await.unwrap().unwrap();

        assert_eq!(entry.sample.signals, sample.signals);
        assert_eq!(
            entry.sample.captured_at.timestamp(),
            sample.captured_at.timestamp()
        );
    }

    #[tokio::test]
    async fn remove_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let queue = SqliteQueue::open(dir.path().join("queue.db")).unwrap();

        let sequence = queue.enqueue(&sample_numbered(1.0)).await.unwrap();
        queue.remove(sequence).await.unwrap();
        queue.remove(sequence).await.unwrap();

        assert!(queue.peek_oldest().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn survives_reopen_with_contents_intact() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("queue.db");

        {
            let queue = SqliteQueue::open(&path).unwrap();
            queue.enqueue(&sample_numbered(1.0)).await.unwrap();
            queue.enqueue(&sample_numbered(2.0)).await.unwrap();
        }

        let reopened = SqliteQueue::open(&path).unwrap();
        let stats = reopened.stats().await.unwrap();
        assert_eq!(stats.pending_entries, 2);

        let oldest = reopened.peek_oldest().await.unwrap().unwrap();
        assert_eq!(oldest.sample.numeric_signal("EngineSpeed"), Some(1.0));
    }

    #[tokio::test]
    async fn stats_reports_pending_and_oldest() {
        let dir = tempfile::tempdir().unwrap();
        let queue = SqliteQueue::open(dir.path().join("queue.db")).unwrap();

        let empty = queue.stats().await.unwrap();
        assert_eq!(empty.pending_entries, 0);
        assert!(empty.oldest_enqueued_at.is_none());

        queue.enqueue(&sample_numbered(1.0)).await.unwrap();
        queue.enqueue(&sample_numbered(2.0)).await.unwrap();

        let stats = queue.stats().await.unwrap();
        assert_eq!(stats.pending_entries, 2);
        let oldest = stats.oldest_enqueued_at.unwrap();
        assert!(Utc::now() - oldest < Duration::minutes(1));
    }

    #[tokio::test]
    async fn cap_drops_oldest_when_exceeded() {
        let dir = tempfile::tempdir().unwrap();
        let queue = SqliteQueue::open(dir.path().join("queue.db"))
            .unwrap()
            .with_max_pending(2);

        queue.enqueue(&sample_numbered(1.0)).await.unwrap();
        queue.enqueue(&sample_numbered(2.0)).await.unwrap();
        queue.enqueue(&sample_numbered(3.0)).await.unwrap();

        let stats = queue.stats().await.unwrap();
        assert_eq!(stats.pending_entries, 2);

        let oldest = queue.peek_oldest().await.unwrap().unwrap();
        assert_eq!(oldest.sample.numeric_signal("EngineSpeed"), Some(2.0));
    }
}
