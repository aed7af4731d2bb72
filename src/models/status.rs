//! Workflow state machine.
//!
//! ```text
//! created -> capturing -> captured -> processing -> done
//!    \           \            \            \
//!     `-----------`------------`------------`--> failed
//! ```
//!
//! `done` and `failed` close a pipeline run but not the workflow: a retake
//! re-enters `capturing`, a retry or reprocess re-enters `processing`.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::common::errors::{StationError, StationResult};
use crate::models::category::Category;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum WorkflowStatus {
    Created,
    Capturing,
    Captured,
    Processing,
    Done,
    Failed {
        category: Category,
        extension: String,
        detail: String,
    },
}

/// Details carried by a failed pipeline run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failure {
    pub category: Category,
    pub extension: String,
    pub detail: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusEvent {
    StartCapture,
    FinishCapture,
    StartProcessing,
    FinishProcessing,
    Fail(Failure),
}

impl StatusEvent {
    /// Event that opens a stage of the given category.
    pub fn start(category: Category) -> Self {
        match category {
            Category::Capture => StatusEvent::StartCapture,
            Category::Process | Category::Output => StatusEvent::StartProcessing,
        }
    }

    /// Event that closes a stage of the given category.
    pub fn finish(category: Category) -> Self {
        match category {
            Category::Capture => StatusEvent::FinishCapture,
            Category::Process | Category::Output => StatusEvent::FinishProcessing,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            StatusEvent::StartCapture => "start_capture",
            StatusEvent::FinishCapture => "finish_capture",
            StatusEvent::StartProcessing => "start_processing",
            StatusEvent::FinishProcessing => "finish_processing",
            StatusEvent::Fail(_) => "fail",
        }
    }
}

impl WorkflowStatus {
    /// Initial status of a workflow handed over with a known step, e.g. from a
    /// scanner station to a processor station.
    pub fn from_step(step: Option<Category>, step_done: bool) -> Self {
        match (step, step_done) {
            (Some(Category::Capture), true) => WorkflowStatus::Captured,
            (Some(Category::Process | Category::Output), true) => WorkflowStatus::Done,
            _ => WorkflowStatus::Created,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, WorkflowStatus::Done | WorkflowStatus::Failed { .. })
    }

    pub fn name(&self) -> &'static str {
        match self {
            WorkflowStatus::Created => "created",
            WorkflowStatus::Capturing => "capturing",
            WorkflowStatus::Captured => "captured",
            WorkflowStatus::Processing => "processing",
            WorkflowStatus::Done => "done",
            WorkflowStatus::Failed { .. } => "failed",
        }
    }

    pub fn can_apply(&self, event: &StatusEvent) -> bool {
        self.apply(event.clone()).is_ok()
    }

    /// Compute the status reached by `event`, or reject the transition.
    pub fn apply(&self, event: StatusEvent) -> StationResult<WorkflowStatus> {
        use WorkflowStatus::*;

        let next = match (self, &event) {
            (Created | Captured | Done | Failed { .. }, StatusEvent::StartCapture) => Capturing,
            (Capturing, StatusEvent::FinishCapture) => Captured,
            (Captured | Done | Failed { .. }, StatusEvent::StartProcessing) => Processing,
            (Processing, StatusEvent::FinishProcessing) => Done,
            (Created | Capturing | Captured | Processing, StatusEvent::Fail(failure)) => Failed {
                category: failure.category,
                extension: failure.extension.clone(),
                detail: failure.detail.clone(),
            },
            _ => {
                return Err(StationError::InvalidTransition {
                    from: self.clone(),
                    event: event.name(),
                });
            }
        };
        Ok(next)
    }
}

impl fmt::Display for WorkflowStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkflowStatus::Failed {
                category,
                extension,
                ..
            } => write!(f, "failed ({category} / {extension})"),
            other => f.write_str(other.name()),
        }
    }
}
