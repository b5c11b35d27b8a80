use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::fault::FaultObservation;

/// Lifecycle state of a diagnostic issue. Resolution is a transition,
/// not a deletion; resolved issues stay queryable indefinitely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueStatus {
    Active,
    Resolved,
}

impl IssueStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            IssueStatus::Active => "active",
            IssueStatus::Resolved => "resolved",
        }
    }
}

impl TryFrom<&str> for IssueStatus {
    type Error = String;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "active" => Ok(IssueStatus::Active),
            "resolved" => Ok(IssueStatus::Resolved),
            other => Err(format!("unknown issue status: {}", other)),
        }
    }
}

/// Operator resolution details, present exactly while an issue is
/// resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct IssueResolution {
    pub resolved_by: String,
    pub resolved_at: DateTime<Utc>,
    pub notes: Option<String>,
}

/// Deterministic issue id for a fault condition. One id per (spn, fmi)
/// pair, so repeated sightings of the same condition always land on the
/// same issue.
pub fn issue_id(spn: u32, fmi: u8) -> String {
    format!("{}-{}", spn, fmi)
}

/// A deduplicated fault condition with its observation history and
/// lifecycle state.
#[derive(Debug, Clone, PartialEq)]
pub struct DiagnosticIssue {
    pub issue_id: String,
    pub spn: u32,
    pub fmi: u8,
    pub description: String,
    pub category: String,
    pub status: IssueStatus,
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
    pub occurrence_count: u32,
    pub resolution: Option<IssueResolution>,
}

impl DiagnosticIssue {
    /// Opens a new issue from its first sighting.
    pub fn open(observation: &FaultObservation, seen_at: DateTime<Utc>) -> Self {
        Self {
            issue_id: issue_id(observation.spn, observation.fmi),
            spn: observation.spn,
            fmi: observation.fmi,
            description: observation.description.clone(),
            category: observation.category.clone(),
            status: IssueStatus::Active,
            first_seen: seen_at,
            last_seen: seen_at,
            occurrence_count: 1,
            resolution: None,
        }
    }

    pub fn dedup_key(&self) -> (u32, u8) {
        (self.spn, self.fmi)
    }

    pub fn is_active(&self) -> bool {
        self.status == IssueStatus::Active
    }
}

/// Status dimension of an issue query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusFilter {
    Active,
    Resolved,
    #[default]
    All,
}

impl StatusFilter {
    pub fn accepts(&self, status: IssueStatus) -> bool {
        match self {
            StatusFilter::Active => status == IssueStatus::Active,
            StatusFilter::Resolved => status == IssueStatus::Resolved,
            StatusFilter::All => true,
        }
    }
}

/// Input for listing issues: status filter intersected with an optional
/// inclusive window on last_seen. No implicit limit; callers paginate.
#[derive(Debug, Clone, Default)]
pub struct QueryIssuesInput {
    pub status: StatusFilter,
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
}

impl QueryIssuesInput {
    pub fn matches(&self, issue: &DiagnosticIssue) -> bool {
        if !self.status.accepts(issue.status) {
            return false;
        }
        if let Some(since) = self.since {
            if issue.last_seen < since {
                return false;
            }
        }
        if let Some(until) = self.until {
            if issue.last_seen > until {
                return false;
            }
        }
        true
    }
}

/// Input for resolving an active issue.
#[derive(Debug, Clone)]
pub struct ResolveIssueInput {
    pub issue_id: String,
    pub resolved_by: String,
    pub notes: Option<String>,
}
