use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::error::{DomainError, DomainResult};
use crate::fault::extract_observations;
use crate::issue::{
    issue_id, DiagnosticIssue, IssueResolution, IssueStatus, QueryIssuesInput, ResolveIssueInput,
};
use crate::repository::IssueRepository;
use crate::sample::TelemetrySample;

/// Deduplicates raw fault codes into lifecycle-tracked issues.
///
/// Each `observe` call is one observation cycle. A resolved issue whose
/// fault is still present in consecutive cycles stays resolved; if the
/// fault disappears for at least one cycle and then returns, the same
/// issue reopens with its history intact. The previous cycle's key set
/// lives in memory only, so after a restart the first re-observation of
/// a resolved issue reopens it.
pub struct FaultService {
    issues: Arc<dyn IssueRepository>,
    previous_cycle: Mutex<HashSet<(u32, u8)>>,
}

impl FaultService {
    pub fn new(issues: Arc<dyn IssueRepository>) -> Self {
        Self {
            issues,
            previous_cycle: Mutex::new(HashSet::new()),
        }
    }

    /// Feed one sample through the lifecycle engine. Returns the issues
    /// created or updated by this cycle.
    pub async fn observe(&self, sample: &TelemetrySample) -> DomainResult<Vec<DiagnosticIssue>> {
        let observations = extract_observations(sample);
        let seen_last_cycle = self.previous_cycle.lock().await.clone();

        let now = Utc::now();
        let mut current_cycle = HashSet::new();
        let mut touched = Vec::new();

        for observation in observations {
            let key = observation.dedup_key();
            current_cycle.insert(key);
            let id = issue_id(observation.spn, observation.fmi);

            let issue = match self.issues.get(&id).await? {
                None => {
                    info!(
                        issue_id = %id,
                        spn = observation.spn,
                        fmi = observation.fmi,
                        category = %observation.category,
                        "Opened diagnostic issue"
                    );
                    DiagnosticIssue::open(&observation, now)
                }
                Some(mut existing) if existing.is_active() => {
                    existing.last_seen = now;
                    existing.occurrence_count += 1;
                    existing.description = observation.description;
                    existing.category = observation.category;
                    debug!(
                        issue_id = %id,
                        occurrence_count = existing.occurrence_count,
                        "Recorded repeat occurrence"
                    );
                    existing
                }
                Some(resolved) => {
                    if seen_last_cycle.contains(&key) {
                        // Continuously present since resolution; the
                        // operator's decision stands until the fault
                        // clears at least once.
                        debug!(issue_id = %id, "Fault still present on resolved issue");
                        continue;
                    }
                    let mut reopened = resolved;
                    reopened.status = IssueStatus::Active;
                    reopened.resolution = None;
                    reopened.last_seen = now;
                    reopened.occurrence_count += 1;
                    reopened.description = observation.description;
                    reopened.category = observation.category;
                    info!(issue_id = %id, "Reopened issue after fault returned");
                    reopened
                }
            };

            self.issues.upsert(&issue).await?;
            touched.push(issue);
        }

        *self.previous_cycle.lock().await = current_cycle;
        Ok(touched)
    }

    /// Resolve an active issue. Rejected without state change if the id
    /// is unknown or the issue is already resolved. There is no reopen
    /// through this interface; only a fresh observation can reopen.
    pub async fn resolve(&self, input: ResolveIssueInput) -> DomainResult<DiagnosticIssue> {
        let issue = self
            .issues
            .get(&input.issue_id)
            .await?
            .ok_or_else(|| DomainError::IssueNotFound(input.issue_id.clone()))?;

        if !issue.is_active() {
            return Err(DomainError::IssueAlreadyResolved(input.issue_id));
        }

        let mut resolved = issue;
        resolved.status = IssueStatus::Resolved;
        resolved.resolution = Some(IssueResolution {
            resolved_by: input.resolved_by,
            resolved_at: Utc::now(),
            notes: input.notes,
        });
        self.issues.upsert(&resolved).await?;

        info!(issue_id = %resolved.issue_id, "Issue resolved");
        Ok(resolved)
    }

    pub async fn query_issues(
        &self,
        input: QueryIssuesInput,
    ) -> DomainResult<Vec<DiagnosticIssue>> {
        self.issues.list(input).await
    }
}
