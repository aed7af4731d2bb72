use log::error;
use thiserror::Error;

use crate::models::category::Category;
use crate::models::status::WorkflowStatus;
use crate::models::workflow::WorkflowId;

/// Errors surfaced synchronously to the caller of a station operation.
///
/// Hook failures never show up here: once a job is accepted its outcome is
/// reported through the workflow status.
#[derive(Debug, Error)]
pub enum StationError {
    #[error("workflow {0} not found")]
    NotFound(WorkflowId),

    #[error("workflow {0} already has an active job")]
    WorkflowBusy(WorkflowId),

    #[error("job queue is full ({capacity} pending jobs)")]
    QueueFull { capacity: usize },

    #[error("unknown capture driver: {0:?}")]
    UnknownDriver(String),

    #[error("cannot apply {event} to a workflow in state {from}")]
    InvalidTransition {
        from: WorkflowStatus,
        event: &'static str,
    },

    #[error("category {0} is not active in this station mode")]
    CategoryInactive(Category),

    #[error("invalid workflow name {0:?}: non-ASCII characters and \"/\" are not permitted")]
    InvalidName(String),

    #[error("invalid category: {0:?}")]
    InvalidCategory(String),

    #[error("invalid workflow configuration: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

pub type StationResult<T> = Result<T, StationError>;

/// Log the full error chain and hand the error back to the caller.
pub fn handle_error(error: anyhow::Error) -> anyhow::Error {
    let chain: Vec<String> = error.chain().map(|e| e.to_string()).collect();
    error!("{}", chain.join("\n  caused by: "));
    error
}
