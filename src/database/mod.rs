pub mod store;

use anyhow::Result;
use serde_json::Value;

use crate::models::workflow::{NewWorkflow, Workflow, WorkflowId};

/// Persistence of workflows. Implementations must be safe to share between
/// request handlers and the processing worker.
pub trait WorkflowStore: Send + Sync {
    /// Persist a new workflow and assign its id.
    fn create(&self, draft: NewWorkflow) -> Result<Workflow>;

    /// Persist the pipeline progress of `workflow` (status, step, images,
    /// outputs, capture start) onto the stored record, keeping the stored
    /// configuration. Returns the record as written, or `None` when the
    /// workflow does not exist.
    fn save_progress(&self, workflow: &Workflow) -> Result<Option<Workflow>>;

    fn get(&self, id: WorkflowId) -> Result<Option<Workflow>>;

    fn list(&self) -> Result<Vec<Workflow>>;

    /// Deep-merge `fragment` into the workflow configuration in one write.
    /// Returns `None` when the workflow does not exist.
    fn update_config(&self, id: WorkflowId, fragment: &Value) -> Result<Option<Workflow>>;
}
