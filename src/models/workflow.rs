use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;
use std::path::PathBuf;

use crate::common::errors::StationResult;
use crate::models::category::Category;
use crate::models::status::{StatusEvent, WorkflowStatus};

pub type WorkflowId = u64;

/// A single digitization project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Workflow {
    pub id: WorkflowId,
    pub name: String,
    pub path: PathBuf,
    pub step: Option<Category>,
    pub step_done: bool,
    pub images: Vec<PathBuf>,
    pub out_files: BTreeSet<PathBuf>,
    pub capture_start: Option<DateTime<Utc>>,
    pub status: WorkflowStatus,
    pub config: Value,
}

/// Everything needed to create a workflow; the store assigns the id.
#[derive(Debug, Clone)]
pub struct NewWorkflow {
    pub name: String,
    pub path: PathBuf,
    pub step: Option<Category>,
    pub step_done: bool,
    pub config: Value,
}

/// Row of the workflow listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowSummary {
    pub id: WorkflowId,
    pub name: String,
    pub step: Option<Category>,
    pub step_done: bool,
    pub status: WorkflowStatus,
    pub image_count: usize,
}

impl Workflow {
    pub fn new(id: WorkflowId, draft: NewWorkflow) -> Self {
        Self {
            id,
            name: draft.name,
            path: draft.path,
            status: WorkflowStatus::from_step(draft.step, draft.step_done),
            step: draft.step,
            step_done: draft.step_done,
            images: Vec::new(),
            out_files: BTreeSet::new(),
            capture_start: None,
            config: draft.config,
        }
    }

    pub fn summary(&self) -> WorkflowSummary {
        WorkflowSummary {
            id: self.id,
            name: self.name.clone(),
            step: self.step,
            step_done: self.step_done,
            status: self.status.clone(),
            image_count: self.images.len(),
        }
    }

    /// Open a pipeline stage: moves the status and records step bookkeeping.
    pub fn begin_stage(&mut self, category: Category) -> StationResult<()> {
        self.status = self.status.apply(StatusEvent::start(category))?;
        if category == Category::Capture {
            self.capture_start = Some(Utc::now());
        }
        self.step = Some(category);
        self.step_done = false;
        Ok(())
    }

    pub fn finish_stage(&mut self, category: Category) -> StationResult<()> {
        self.status = self.status.apply(StatusEvent::finish(category))?;
        self.step_done = true;
        Ok(())
    }

    pub fn apply(&mut self, event: StatusEvent) -> StationResult<()> {
        self.status = self.status.apply(event)?;
        Ok(())
    }

    /// Copy the fields the pipeline owns from `progress`; name, path and
    /// configuration stay as they are.
    pub fn take_progress(&mut self, progress: &Workflow) {
        self.step = progress.step;
        self.step_done = progress.step_done;
        self.images = progress.images.clone();
        self.out_files = progress.out_files.clone();
        self.capture_start = progress.capture_start;
        self.status = progress.status.clone();
    }

    /// Name of the selected capture driver, if any.
    pub fn driver(&self) -> Option<&str> {
        self.config.get("driver").and_then(Value::as_str)
    }

    /// Deep-merge a configuration fragment: objects merge key by key, any
    /// other value replaces what was there.
    pub fn merge_config(&mut self, fragment: &Value) {
        merge_value(&mut self.config, fragment);
    }

    /// Option overrides stored for one extension (`config.<name>`).
    pub fn options_for(&self, name: &str) -> Option<&serde_json::Map<String, Value>> {
        self.config.get(name).and_then(Value::as_object)
    }
}

pub fn merge_value(target: &mut Value, fragment: &Value) {
    match (target, fragment) {
        (Value::Object(target), Value::Object(fragment)) => {
            for (key, value) in fragment {
                match target.get_mut(key) {
                    Some(existing) => merge_value(existing, value),
                    None => {
                        target.insert(key.clone(), value.clone());
                    }
                }
            }
        }
        (target, fragment) => *target = fragment.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn draft() -> NewWorkflow {
        NewWorkflow {
            name: "sample".to_string(),
            path: PathBuf::from("/scans/sample"),
            step: None,
            step_done: false,
            config: json!({"driver": "dummy", "dummy": {"pages": 2}}),
        }
    }

    #[test]
    fn merge_config_is_deep() {
        let mut workflow = Workflow::new(1, draft());
        workflow.merge_config(&json!({"dummy": {"width": 10}, "plugins": ["rawcheck"]}));
        assert_eq!(
            workflow.config,
            json!({
                "driver": "dummy",
                "dummy": {"pages": 2, "width": 10},
                "plugins": ["rawcheck"],
            })
        );

        workflow.merge_config(&json!({"driver": "directory", "plugins": []}));
        assert_eq!(workflow.driver(), Some("directory"));
        assert_eq!(workflow.config["plugins"], json!([]));
    }

    #[test]
    fn capture_stage_records_start_time() {
        let mut workflow = Workflow::new(1, draft());
        assert!(workflow.capture_start.is_none());
        workflow.begin_stage(Category::Capture).unwrap();
        assert_eq!(workflow.status, WorkflowStatus::Capturing);
        assert_eq!(workflow.step, Some(Category::Capture));
        assert!(!workflow.step_done);
        assert!(workflow.capture_start.is_some());

        workflow.finish_stage(Category::Capture).unwrap();
        assert_eq!(workflow.status, WorkflowStatus::Captured);
        assert!(workflow.step_done);
    }

    #[test]
    fn rejected_stage_leaves_workflow_untouched() {
        let mut workflow = Workflow::new(1, draft());
        let before = workflow.clone();
        assert!(workflow.begin_stage(Category::Output).is_err());
        assert_eq!(workflow, before);
    }
}
