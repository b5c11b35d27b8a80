use anyhow::{anyhow, Context};
use chrono::{DateTime, Utc};

use harrow_domain::{
    DiagnosticIssue, IssueResolution, IssueStatus, StoredRecord, TelemetrySample,
};

use crate::models::{IssueRow, TelemetryRow};

impl TelemetryRow {
    pub fn from_sample(sample: &TelemetrySample, received_at: DateTime<Utc>) -> Self {
        let signals = serde_json::to_string(&sample.signals).unwrap_or_else(|_| "{}".to_string());
        Self {
            captured_at: sample.captured_at,
            received_at,
            signals,
        }
    }
}

impl TryFrom<TelemetryRow> for StoredRecord {
    type Error = anyhow::Error;

    fn try_from(row: TelemetryRow) -> Result<Self, Self::Error> {
        let signals = serde_json::from_str(&row.signals)
            .with_context(|| format!("corrupt signals payload at {}", row.captured_at))?;
        Ok(StoredRecord {
            captured_at: row.captured_at,
            received_at: row.received_at,
            signals,
        })
    }
}

impl IssueRow {
    pub fn from_issue(issue: &DiagnosticIssue, updated_at: DateTime<Utc>) -> Self {
        let (resolved_by, resolved_at, notes) = match &issue.resolution {
            Some(resolution) => (
                Some(resolution.resolved_by.clone()),
                Some(resolution.resolved_at),
                resolution.notes.clone(),
            ),
            None => (None, None, None),
        };
        Self {
            issue_id: issue.issue_id.clone(),
            spn: issue.spn,
            fmi: issue.fmi,
            description: issue.description.clone(),
            category: issue.category.clone(),
            status: issue.status.as_str().to_string(),
            first_seen: issue.first_seen,
            last_seen: issue.last_seen,
            occurrence_count: issue.occurrence_count,
            resolved_by,
            resolved_at,
            notes,
            updated_at,
        }
    }
}

impl TryFrom<IssueRow> for DiagnosticIssue {
    type Error = anyhow::Error;

    fn try_from(row: IssueRow) -> Result<Self, Self::Error> {
        let status = IssueStatus::try_from(row.status.as_str()).map_err(|err| anyhow!(err))?;
        let resolution = match (status, row.resolved_by, row.resolved_at) {
            (IssueStatus::Resolved, Some(resolved_by), Some(resolved_at)) => {
                Some(IssueResolution {
                    resolved_by,
                    resolved_at,
                    notes: row.notes,
                })
            }
            (IssueStatus::Resolved, _, _) => {
                return Err(anyhow!(
                    "resolved issue {} is missing resolution fields",
                    row.issue_id
                ));
            }
            _ => None,
        };

        Ok(DiagnosticIssue {
            issue_id: row.issue_id,
            spn: row.spn,
            fmi: row.fmi,
            description: row.description,
            category: row.category,
            status,
            first_seen: row.first_seen,
            last_seen: row.last_seen,
            occurrence_count: row.occurrence_count,
            resolution,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use harrow_domain::FaultObservation;
    use std::collections::BTreeMap;

    #[test]
    fn sample_to_row_serializes_signals() {
        let mut signals = BTreeMap::new();
        signals.insert("EngineSpeed".to_string(), 1500.5.into());
        signals.insert("Gear".to_string(), "neutral".into());
        let sample = TelemetrySample {
            captured_at: Utc::now(),
            signals,
        };

        let row = TelemetryRow::from_sample(&sample, Utc::now());

        assert!(row.signals.contains("EngineSpeed"));
        assert!(row.signals.contains("1500.5"));
        assert!(row.signals.contains("neutral"));
    }

    #[test]
    fn row_to_record_round_trips() {
        let mut signals = BTreeMap::new();
        signals.insert("FuelLevel".to_string(), 75.0.into());
        let sample = TelemetrySample {
            captured_at: Utc::now(),
            signals: signals.clone(),
        };

        let record =
            StoredRecord::try_from(TelemetryRow::from_sample(&sample, Utc::now())).unwrap();

        assert_eq!(record.signals, signals);
    }

    #[test]
    fn corrupt_signals_payload_is_an_error() {
        let row = TelemetryRow {
            captured_at: Utc::now(),
            received_at: Utc::now(),
            signals: "not json".to_string(),
        };

        assert!(StoredRecord::try_from(row).is_err());
    }

    #[test]
    fn issue_round_trips_through_row() {
        let mut issue = DiagnosticIssue::open(&FaultObservation::from_codes(100, 1), Utc::now());
        issue.status = IssueStatus::Resolved;
        issue.resolution = Some(IssueResolution {
            resolved_by: "tech1".to_string(),
            resolved_at: Utc::now(),
            notes: Some("replaced sensor".to_string()),
        });

        let row = IssueRow::from_issue(&issue, Utc::now());
        let back = DiagnosticIssue::try_from(row).unwrap();

        assert_eq!(back.issue_id, issue.issue_id);
        assert_eq!(back.status, IssueStatus::Resolved);
        assert_eq!(
            back.resolution.as_ref().map(|r| r.resolved_by.as_str()),
            Some("tech1")
        );
    }

    #[test]
    fn resolved_row_without_fields_is_rejected() {
        let issue = DiagnosticIssue::open(&FaultObservation::from_codes(100, 1), Utc::now());
        let mut row = IssueRow::from_issue(&issue, Utc::now());
        row.status = "resolved".to_string();

        assert!(DiagnosticIssue::try_from(row).is_err());
    }
}
