use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::DomainResult;
use crate::issue::{DiagnosticIssue, QueryIssuesInput};
use crate::repository::IssueRepository;

/// In-memory issue table. Backs tests and demo runs; anything durable
/// should use a store-backed implementation instead.
#[derive(Default)]
pub struct InMemoryIssueRepository {
    issues: RwLock<HashMap<String, DiagnosticIssue>>,
}

impl InMemoryIssueRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl IssueRepository for InMemoryIssueRepository {
    async fn get(&self, issue_id: &str) -> DomainResult<Option<DiagnosticIssue>> {
        let issues = self.issues.read().await;
        Ok(issues.get(issue_id).cloned())
    }

    async fn upsert(&self, issue: &DiagnosticIssue) -> DomainResult<()> {
        let mut issues = self.issues.write().await;
        issues.insert(issue.issue_id.clone(), issue.clone());
        Ok(())
    }

    async fn list(&self, input: QueryIssuesInput) -> DomainResult<Vec<DiagnosticIssue>> {
        let issues = self.issues.read().await;
        let mut matching: Vec<DiagnosticIssue> = issues
            .values()
            .filter(|issue| input.matches(issue))
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.last_seen.cmp(&a.last_seen));
        Ok(matching)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fault::FaultObservation;
    use crate::issue::{IssueStatus, StatusFilter};
    use chrono::{Duration, Utc};

    #[tokio::test]
    async fn upsert_replaces_existing_state() {
        let repository = InMemoryIssueRepository::new();
        let mut issue = DiagnosticIssue::open(&FaultObservation::from_codes(100, 1), Utc::now());

        repository.upsert(&issue).await.unwrap();
        issue.occurrence_count = 5;
        repository.upsert(&issue).await.unwrap();

        let stored = repository.get(&issue.issue_id).await.unwrap().unwrap();
        assert_eq!(stored.occurrence_count, 5);
    }

    #[tokio::test]
    async fn list_filters_by_status_and_window() {
        let repository = InMemoryIssueRepository::new();
        let now = Utc::now();

        let mut old_issue = DiagnosticIssue::open(
            &FaultObservation::from_codes(100, 1),
            now - Duration::hours(5),
        );
        old_issue.status = IssueStatus::Resolved;
        let recent_issue =
            DiagnosticIssue::open(&FaultObservation::from_codes(110, 0), now - Duration::hours(1));
        repository.upsert(&old_issue).await.unwrap();
        repository.upsert(&recent_issue).await.unwrap();

        let active = repository
            .list(QueryIssuesInput {
                status: StatusFilter::Active,
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].issue_id, recent_issue.issue_id);

        let windowed = repository
            .list(QueryIssuesInput {
                status: StatusFilter::All,
                since: Some(now - Duration::hours(2)),
                until: None,
            })
            .await
            .unwrap();
        assert_eq!(windowed.len(), 1);
        assert_eq!(windowed[0].issue_id, recent_issue.issue_id);
    }
}
