use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Value of a single decoded signal. Bus decoders emit numbers for
/// physical quantities and strings for enumerated states; anything else
/// is carried as text so unknown signals survive the round trip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SignalValue {
    Number(f64),
    Text(String),
}

impl SignalValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            SignalValue::Number(n) => Some(*n),
            SignalValue::Text(_) => None,
        }
    }
}

impl From<f64> for SignalValue {
    fn from(value: f64) -> Self {
        SignalValue::Number(value)
    }
}

impl From<&str> for SignalValue {
    fn from(value: &str) -> Self {
        SignalValue::Text(value.to_string())
    }
}

/// One timestamped reading: a snapshot of named signal values captured
/// from the machine at a single instant. Keys are not required to be
/// uniform across samples.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetrySample {
    pub captured_at: DateTime<Utc>,
    pub signals: BTreeMap<String, SignalValue>,
}

impl TelemetrySample {
    pub fn new(captured_at: DateTime<Utc>) -> Self {
        Self {
            captured_at,
            signals: BTreeMap::new(),
        }
    }

    pub fn signal(&self, name: &str) -> Option<&SignalValue> {
        self.signals.get(name)
    }

    pub fn numeric_signal(&self, name: &str) -> Option<f64> {
        self.signals.get(name).and_then(SignalValue::as_f64)
    }
}

/// A sample as persisted in the remote store. `received_at` is stamped
/// by the writer at append time and distinguishes ingest order from
/// capture order. Rows are append-only and never mutated.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredRecord {
    pub captured_at: DateTime<Utc>,
    pub received_at: DateTime<Utc>,
    pub signals: BTreeMap<String, SignalValue>,
}

/// A buffered sample awaiting upload. Sequence numbers are assigned by
/// the queue, strictly increasing within one queue file.
#[derive(Debug, Clone, PartialEq)]
pub struct QueueEntry {
    pub sequence: i64,
    pub sample: TelemetrySample,
    pub enqueued_at: DateTime<Utc>,
}

/// Operational snapshot of the local queue.
#[derive(Debug, Clone, PartialEq)]
pub struct QueueStats {
    pub pending_entries: u64,
    pub oldest_enqueued_at: Option<DateTime<Utc>>,
}

/// Pull boundary with the bus decoder. Returning `None` means the
/// source is exhausted and ingestion should stop.
pub trait SampleSource: Send {
    fn next_sample(&mut self) -> Option<TelemetrySample>;
}
