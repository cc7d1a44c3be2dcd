use std::fmt::Display;

use thiserror::Error;

pub type Result<T, E = WorkflowError> = std::result::Result<T, E>;

/// Remote calls issued against the content API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    GetFile,
    PutFile,
    GetRef,
    CreateRef,
    ListDir,
    CreatePullRequest,
    MergePullRequest,
    ListPullRequests,
    GetUser,
}

impl Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::GetFile => "get file",
            Self::PutFile => "put file",
            Self::GetRef => "get ref",
            Self::CreateRef => "create ref",
            Self::ListDir => "list directory",
            Self::CreatePullRequest => "create pull request",
            Self::MergePullRequest => "merge pull request",
            Self::ListPullRequests => "list pull requests",
            Self::GetUser => "get user",
        })
    }
}

/// A non-success response from the remote system.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{operation} failed with status {status}: {message}")]
pub struct RemoteFailure {
    pub operation: Operation,
    pub status: u16,
    pub message: String,
}

impl RemoteFailure {
    pub fn new(operation: Operation, status: u16, message: impl Into<String>) -> Self {
        Self {
            operation,
            status,
            message: message.into(),
        }
    }
}

/// Every failure a workflow operation can surface to its caller.
#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("GitHub not authenticated")]
    Unauthenticated,

    #[error("{0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(RemoteFailure),

    #[error("Conflict: {0}")]
    Conflict(RemoteFailure),

    #[error("Remote error: {0}")]
    Remote(RemoteFailure),

    /// The request never produced a response (connection or timeout failure).
    #[error("Remote error: {operation} failed: {message}")]
    Unreachable {
        operation: Operation,
        message: String,
        timed_out: bool,
    },
}

impl WorkflowError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Classify a non-success status for the given operation.
    ///
    /// 404 is always `NotFound`. Version mismatches on writes and ref
    /// creation (409/422) and non-mergeable PRs (405/409) are `Conflict`.
    pub fn from_status(failure: RemoteFailure) -> Self {
        use Operation::*;
        match (failure.operation, failure.status) {
            (_, 404) => Self::NotFound(failure),
            (PutFile | CreateRef, 409 | 422) => Self::Conflict(failure),
            (MergePullRequest, 405 | 409) => Self::Conflict(failure),
            _ => Self::Remote(failure),
        }
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}
