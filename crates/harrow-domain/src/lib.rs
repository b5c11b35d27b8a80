pub mod error;
pub mod fault;
pub mod fault_service;
pub mod in_memory_issue_repository;
pub mod issue;
pub mod query_service;
pub mod repository;
pub mod sample;
pub mod sync_service;

pub use error::{DomainError, DomainResult};
pub use fault::{extract_observations, FaultObservation};
pub use fault_service::FaultService;
pub use in_memory_issue_repository::InMemoryIssueRepository;
pub use issue::{
    issue_id, DiagnosticIssue, IssueResolution, IssueStatus, QueryIssuesInput, ResolveIssueInput,
    StatusFilter,
};
pub use query_service::{QueryService, TelemetryWindow};
pub use repository::{DurableQueue, IssueRepository, TelemetryStore};
pub use sample::{
    QueueEntry, QueueStats, SampleSource, SignalValue, StoredRecord, TelemetrySample,
};
pub use sync_service::{DeliveryOutcome, SyncService};
