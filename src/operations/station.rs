use log::info;
use path_clean::PathClean;
use regex::Regex;
use serde::Deserialize;
use serde_json::{Value, json};
use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock};

use crate::background::queue::JobQueue;
use crate::common::errors::{StationError, StationResult};
use crate::config::{AppConfig, Mode};
use crate::database::WorkflowStore;
use crate::extensions::gate::active_categories;
use crate::extensions::registry::ExtensionRegistry;
use crate::models::category::Category;
use crate::models::job::JobHandle;
use crate::models::status::StatusEvent;
use crate::models::workflow::{NewWorkflow, Workflow, WorkflowId, WorkflowSummary, merge_value};
use crate::schema::aggregator::{ConfigTemplateAggregator, MergedSchema};
use crate::utils::ensure_dir;

// Printable ASCII except "/"
static NAME_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[\x20-\x2E\x30-\x7E]+$").expect("workflow name pattern must compile")
});

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateWorkflow {
    pub name: String,
    #[serde(default)]
    pub config: Option<Value>,
    #[serde(default)]
    pub step: Option<Category>,
    #[serde(default, alias = "stepDone")]
    pub step_done: bool,
}

impl CreateWorkflow {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

/// Everything a running station shares between request handlers and the
/// processing worker.
pub struct Station {
    config: AppConfig,
    store: Arc<dyn WorkflowStore>,
    registry: Arc<ExtensionRegistry>,
    aggregator: ConfigTemplateAggregator,
    queue: JobQueue,
    temp_dir: PathBuf,
}

impl Station {
    pub fn new(
        config: AppConfig,
        store: Arc<dyn WorkflowStore>,
        registry: Arc<ExtensionRegistry>,
        temp_dir: impl Into<PathBuf>,
    ) -> Self {
        let aggregator = ConfigTemplateAggregator::new(store.clone(), registry.clone(), config.mode);
        let queue = JobQueue::new(config.queue_capacity);
        Self {
            config,
            store,
            registry,
            aggregator,
            queue,
            temp_dir: temp_dir.into(),
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn mode(&self) -> Mode {
        self.config.mode
    }

    pub fn store(&self) -> &dyn WorkflowStore {
        self.store.as_ref()
    }

    pub fn registry(&self) -> &ExtensionRegistry {
        &self.registry
    }

    pub fn aggregator(&self) -> &ConfigTemplateAggregator {
        &self.aggregator
    }

    pub fn queue(&self) -> &JobQueue {
        &self.queue
    }

    /// Scratch directory handed to hooks.
    pub fn temp_dir(&self) -> &Path {
        &self.temp_dir
    }

    // ────────────────────────────────────────────────────────────────
    // Workflows
    // ────────────────────────────────────────────────────────────────

    pub fn create_workflow(&self, request: CreateWorkflow) -> StationResult<Workflow> {
        if !NAME_PATTERN.is_match(&request.name) {
            return Err(StationError::InvalidName(request.name));
        }
        let project_dir = self.config.project_dir.clean();
        let path = project_dir.join(&request.name).clean();
        // "." and ".." pass the pattern but do not name a sub-directory
        if path.parent() != Some(project_dir.as_path()) {
            return Err(StationError::InvalidName(request.name));
        }

        let mut config = json!({ "driver": self.config.default_driver });
        match request.config {
            Some(fragment @ Value::Object(_)) => merge_value(&mut config, &fragment),
            Some(Value::Null) | None => {}
            Some(other) => {
                return Err(StationError::InvalidConfig(format!(
                    "expected an object, got {}",
                    other
                )));
            }
        }

        ensure_dir(&path)?;
        let workflow = self.store.create(NewWorkflow {
            name: request.name,
            path,
            step: request.step,
            step_done: request.step_done,
            config,
        })?;
        info!(
            "Created workflow {} ({:?}) in state {}",
            workflow.id, workflow.name, workflow.status
        );
        Ok(workflow)
    }

    pub fn list_workflows(&self) -> StationResult<Vec<WorkflowSummary>> {
        Ok(self
            .store
            .list()?
            .iter()
            .map(Workflow::summary)
            .collect())
    }

    pub fn get_workflow(&self, id: WorkflowId) -> StationResult<Workflow> {
        self.store.get(id)?.ok_or(StationError::NotFound(id))
    }

    // ────────────────────────────────────────────────────────────────
    // Configuration
    // ────────────────────────────────────────────────────────────────

    pub fn get_config(&self, id: WorkflowId) -> StationResult<Value> {
        Ok(self.get_workflow(id)?.config)
    }

    /// Deep-merge `fragment` into the workflow configuration and return the
    /// result. The cached schema is dropped before this returns.
    pub fn update_config(&self, id: WorkflowId, fragment: &Value) -> StationResult<Value> {
        if !fragment.is_object() {
            return Err(StationError::InvalidConfig(format!(
                "expected an object, got {}",
                fragment
            )));
        }
        let workflow = self
            .store
            .update_config(id, fragment)?
            .ok_or(StationError::NotFound(id))?;
        self.aggregator.invalidate(id);
        info!("Updated configuration of workflow {}", id);
        Ok(workflow.config)
    }

    pub fn get_schema(&self, id: WorkflowId) -> StationResult<Arc<MergedSchema>> {
        self.aggregator.get_schema(id)
    }

    // ────────────────────────────────────────────────────────────────
    // Jobs
    // ────────────────────────────────────────────────────────────────

    /// Queue a run of the `category` hooks for a workflow.
    pub fn trigger(&self, id: WorkflowId, category: Category) -> StationResult<JobHandle> {
        let workflow = self.get_workflow(id)?;
        if !active_categories(self.mode()).contains(&category) {
            return Err(StationError::CategoryInactive(category));
        }
        if self.queue.active_job(id).is_some() {
            return Err(StationError::WorkflowBusy(id));
        }
        let event = StatusEvent::start(category);
        if !workflow.status.can_apply(&event) {
            return Err(StationError::InvalidTransition {
                from: workflow.status,
                event: event.name(),
            });
        }
        let handle = self.queue.enqueue(id, category)?;
        info!(
            "Queued {} job {} for workflow {} ({}/{} pending)",
            category,
            handle.id,
            id,
            self.queue.size(),
            self.queue.capacity()
        );
        Ok(handle)
    }

    pub fn jobs(&self) -> Vec<JobHandle> {
        self.queue.snapshot()
    }
}
