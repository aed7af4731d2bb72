use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::category::Category;
use crate::models::workflow::WorkflowId;

pub type JobId = Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Running,
    Succeeded,
    Failed,
}

impl JobStatus {
    pub fn is_active(self) -> bool {
        matches!(self, JobStatus::Pending | JobStatus::Running)
    }
}

/// One request to run a workflow through the hooks of a category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    pub id: JobId,
    pub workflow_id: WorkflowId,
    pub category: Category,
    pub enqueued_at: DateTime<Utc>,
    pub status: JobStatus,
}

/// What the caller of `enqueue` gets back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobHandle {
    pub id: JobId,
    pub workflow_id: WorkflowId,
    pub category: Category,
    pub enqueued_at: DateTime<Utc>,
    pub status: JobStatus,
}

impl Job {
    pub fn new(workflow_id: WorkflowId, category: Category) -> Self {
        Self {
            id: Uuid::new_v4(),
            workflow_id,
            category,
            enqueued_at: Utc::now(),
            status: JobStatus::Pending,
        }
    }

    pub fn handle(&self) -> JobHandle {
        JobHandle {
            id: self.id,
            workflow_id: self.workflow_id,
            category: self.category,
            enqueued_at: self.enqueued_at,
            status: self.status,
        }
    }
}
