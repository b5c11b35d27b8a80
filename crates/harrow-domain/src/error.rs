use thiserror::Error;

#[derive(Error, Debug)]
pub enum DomainError {
    #[error("Issue not found: {0}")]
    IssueNotFound(String),

    #[error("Issue already resolved: {0}")]
    IssueAlreadyResolved(String),

    #[error("Local queue storage failure: {0}")]
    StorageFailure(String),

    #[error("Repository error: {0}")]
    RepositoryError(#[from] anyhow::Error),
}

pub type DomainResult<T> = Result<T, DomainError>;
