use std::time::Duration;

use anyhow::anyhow;
use async_trait::async_trait;
use chrono::Utc;
use tracing::{debug, error};

use harrow_domain::{
    DiagnosticIssue, DomainError, DomainResult, IssueRepository, QueryIssuesInput, StatusFilter,
};

use crate::client::ClickHouseClient;
use crate::models::IssueRow;

/// ClickHouse implementation of the issue table. Upserts insert a new
/// row version into a ReplacingMergeTree; reads use FINAL so callers
/// always see the latest version of each issue.
#[derive(Clone)]
pub struct ClickHouseIssueRepository {
    client: ClickHouseClient,
    table: String,
    timeout: Duration,
}

impl ClickHouseIssueRepository {
    pub fn new(client: ClickHouseClient, table: String, timeout: Duration) -> Self {
        Self {
            client,
            table,
            timeout,
        }
    }
}

#[async_trait]
impl IssueRepository for ClickHouseIssueRepository {
    async fn get(&self, issue_id: &str) -> DomainResult<Option<DiagnosticIssue>> {
        let sql = format!(
            "SELECT ?fields FROM {} FINAL WHERE issue_id = ?",
            self.table
        );
        let fetch = self
            .client
            .get_client()
            .query(&sql)
            .bind(issue_id)
            .fetch_optional::<IssueRow>();

        let row = tokio::time::timeout(self.timeout, fetch)
            .await
            .map_err(|_| {
                DomainError::RepositoryError(anyhow!(
                    "issue lookup timed out after {:?}",
                    self.timeout
                ))
            })?
            .map_err(|err| {
                error!("Failed to look up issue: {}", err);
                DomainError::RepositoryError(err.into())
            })?;

        row.map(DiagnosticIssue::try_from)
            .transpose()
            .map_err(DomainError::RepositoryError)
    }

    async fn upsert(&self, issue: &DiagnosticIssue) -> DomainResult<()> {
        let row = IssueRow::from_issue(issue, Utc::now());
        let write = async {
            let mut insert = self.client.get_client().insert::<IssueRow>(&self.table)?;
            insert.write(&row).await?;
            insert.end().await
        };

        tokio::time::timeout(self.timeout, write)
            .await
            .map_err(|_| {
                DomainError::RepositoryError(anyhow!(
                    "issue upsert timed out after {:?}",
                    self.timeout
                ))
            })?
            .map_err(|err| {
                error!("Failed to write issue version: {}", err);
                DomainError::RepositoryError(err.into())
            })?;

        debug!(issue_id = %issue.issue_id, status = issue.status.as_str(), "Stored issue version");
        Ok(())
    }

    async fn list(&self, input: QueryIssuesInput) -> DomainResult<Vec<DiagnosticIssue>> {
        let mut sql = format!("SELECT ?fields FROM {} FINAL", self.table);
        let mut clauses: Vec<&str> = Vec::new();
        match input.status {
            StatusFilter::Active => clauses.push("status = 'active'"),
            StatusFilter::Resolved => clauses.push("status = 'resolved'"),
            StatusFilter::All => {}
        }
        if input.since.is_some() {
            clauses.push("last_seen >= toDateTime(?)");
        }
        if input.until.is_some() {
            clauses.push("last_seen <= toDateTime(?)");
        }
        if !clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }
        sql.push_str(" ORDER BY last_seen DESC");

        let mut query = self.client.get_client().query(&sql);
        if let Some(since) = input.since {
            query = query.bind(since.timestamp());
        }
        if let Some(until) = input.until {
            query = query.bind(until.timestamp());
        }

        let rows = tokio::time::timeout(self.timeout, query.fetch_all::<IssueRow>())
            .await
            .map_err(|_| {
                DomainError::RepositoryError(anyhow!(
                    "issue listing timed out after {:?}",
                    self.timeout
                ))
            })?
            .map_err(|err| {
                error!("Failed to list issues: {}", err);
                DomainError::RepositoryError(err.into())
            })?;

        rows.into_iter()
            .map(|row| DiagnosticIssue::try_from(row).map_err(DomainError::RepositoryError))
            .collect()
    }
}
