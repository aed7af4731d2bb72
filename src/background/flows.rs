use anyhow::{Result, anyhow};
use log::{error, info, warn};
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::task::spawn_blocking;

use crate::common::errors::{StationError, handle_error};
use crate::extensions::HookContext;
use crate::extensions::gate::active_categories;
use crate::extensions::resolver::{Resolution, resolve};
use crate::models::category::Category;
use crate::models::job::{Job, JobStatus};
use crate::models::status::{Failure, StatusEvent};
use crate::models::workflow::{Workflow, WorkflowId};
use crate::operations::station::Station;
use crate::schema::aggregator::{MergedSchema, merge_templates};

/// Recorded as the failing extension when the station itself broke a stage.
const STATION: &str = "station";

/// Why a stage stopped early. Either way the workflow ends up failed.
#[derive(Debug, Error)]
enum StageError {
    /// The driver or a hook failed.
    #[error("{} failed: {}", .0.extension, .0.detail)]
    Hook(Failure),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl StageError {
    fn hook(category: Category, extension: impl Into<String>, err: impl std::fmt::Display) -> Self {
        StageError::Hook(Failure {
            category,
            extension: extension.into(),
            detail: err.to_string(),
        })
    }

    fn into_failure(self, category: Category) -> Failure {
        match self {
            StageError::Hook(failure) => failure,
            StageError::Internal(err) => Failure {
                category,
                extension: STATION.to_string(),
                detail: format!("{:#}", err),
            },
        }
    }
}

/// Run one job to completion and report its outcome.
///
/// Never panics and never returns early on hook failure: the worker loop
/// relies on this to keep going.
pub async fn run_job(station: &Station, job: &Job) -> JobStatus {
    let start_time = Instant::now();
    info!(
        "Running {} job {} for workflow {}",
        job.category, job.id, job.workflow_id
    );
    match execute(station, job).await {
        Ok(()) => {
            let duration = format!("{:?}", start_time.elapsed());
            info!(duration = &*duration; "Job {} for workflow {} succeeded", job.id, job.workflow_id);
            JobStatus::Succeeded
        }
        Err(err) => {
            handle_error(err.context(format!(
                "{} job {} for workflow {} failed",
                job.category, job.id, job.workflow_id
            )));
            JobStatus::Failed
        }
    }
}

async fn execute(station: &Station, job: &Job) -> Result<()> {
    let mut workflow = station
        .store()
        .get(job.workflow_id)?
        .ok_or_else(|| anyhow!("workflow {} no longer exists", job.workflow_id))?;

    // Until the started stage is stored, failing here leaves the record as it was.
    workflow.begin_stage(job.category)?;
    persist(station, &mut workflow)?;

    let outcome = match run_stage(station, job.category, &mut workflow).await {
        Ok(()) => finish(station, job.category, &mut workflow),
        Err(err) => Err(err),
    };
    match outcome {
        Ok(()) => {
            info!("Workflow {} is now {}", workflow.id, workflow.status);
            Ok(())
        }
        Err(err) => {
            let failure = err.into_failure(job.category);
            let message = format!("{} failed: {}", failure.extension, failure.detail);
            fail_workflow(station, &mut workflow, failure);
            Err(anyhow!(message))
        }
    }
}

fn finish(station: &Station, category: Category, workflow: &mut Workflow) -> Result<(), StageError> {
    let mut finished = workflow.clone();
    finished.finish_stage(category).map_err(anyhow::Error::from)?;
    persist(station, &mut finished)?;
    *workflow = finished;
    Ok(())
}

/// Mark the workflow failed and store it. A store error is only logged: the
/// job has failed already.
fn fail_workflow(station: &Station, workflow: &mut Workflow, failure: Failure) {
    if let Err(err) = workflow.apply(StatusEvent::Fail(failure)) {
        handle_error(anyhow::Error::from(err).context(format!(
            "Failed to mark workflow {} as failed",
            workflow.id
        )));
        return;
    }
    if let Err(err) = persist(station, workflow) {
        error!(
            "Workflow {} failed but the failure could not be stored: {:#}",
            workflow.id, err
        );
    }
}

/// Store the stage progress and pick up the configuration as it is now.
fn persist(station: &Station, workflow: &mut Workflow) -> Result<()> {
    let stored = station
        .store()
        .save_progress(workflow)?
        .ok_or_else(|| anyhow!("workflow {} no longer exists", workflow.id))?;
    workflow.config = stored.config;
    Ok(())
}

/// The cached schema resolves every category of the mode, including the
/// driver. A stage that needs no driver falls back to its own templates when
/// the configured driver is unknown.
fn load_schema(
    station: &Station,
    id: WorkflowId,
    resolution: &Resolution,
) -> Result<Arc<MergedSchema>, StageError> {
    match station.aggregator().get_schema(id) {
        Ok(schema) => Ok(schema),
        Err(StationError::UnknownDriver(driver)) if resolution.driver.is_none() => {
            warn!(
                "Unknown driver {} on workflow {}, using stage templates only",
                driver, id
            );
            Ok(Arc::new(merge_templates(resolution)))
        }
        Err(err) => Err(StageError::Internal(
            anyhow::Error::from(err).context("Failed to load configuration schema"),
        )),
    }
}

async fn run_stage(
    station: &Station,
    category: Category,
    workflow: &mut Workflow,
) -> Result<(), StageError> {
    let categories: BTreeSet<Category> = active_categories(station.mode())
        .into_iter()
        .filter(|active| *active == category)
        .collect();
    let resolution = resolve(station.registry(), &categories, &workflow.config)
        .map_err(|err| StageError::hook(category, workflow.driver().unwrap_or("driver"), err))?;
    let schema = load_schema(station, workflow.id, &resolution)?;
    let timeout = station.config().hook_timeout();

    if let Some(driver) = resolution.driver.clone() {
        let name = driver.name().to_string();
        let ctx = HookContext::new(
            category,
            schema.template(&name),
            workflow.options_for(&name),
            station.temp_dir(),
        );
        let snapshot = workflow.clone();
        let images = run_blocking(timeout, move || driver.capture(&snapshot, &ctx))
            .await
            .map_err(|err| StageError::hook(category, &name, format!("{:#}", err)))?;
        info!(
            "Driver {} captured {} image(s) for workflow {}",
            name,
            images.len(),
            workflow.id
        );
        workflow.images.extend(images);
        persist(station, workflow)?;
    }

    for extension in resolution.for_category(category) {
        let name = extension.name().to_string();
        let ctx = HookContext::new(
            category,
            schema.template(&name),
            workflow.options_for(&name),
            station.temp_dir(),
        );
        let start_time = Instant::now();
        let extension = extension.clone();
        let mut draft = workflow.clone();
        let updated = run_blocking(timeout, move || {
            extension.execute_hook(&mut draft, &ctx)?;
            Ok(draft)
        })
        .await
        .map_err(|err| {
            warn!("Hook {} failed on workflow {}: {:#}", name, workflow.id, err);
            StageError::hook(category, &name, format!("{:#}", err))
        })?;
        *workflow = updated;
        persist(station, workflow)?;
        let duration = format!("{:?}", start_time.elapsed());
        info!(duration = &*duration; "Hook {} done for workflow {}", name, workflow.id);
    }
    Ok(())
}

/// Run `task` on the blocking pool, bounded by `timeout` when set.
///
/// A task that outlives its timeout keeps its thread; only the wait is abandoned.
async fn run_blocking<T, F>(timeout: Option<Duration>, task: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    let handle = spawn_blocking(task);
    let joined = match timeout {
        Some(limit) => tokio::time::timeout(limit, handle)
            .await
            .map_err(|_| anyhow!("timed out after {:?}", limit))?,
        None => handle.await,
    };
    joined.map_err(|e| anyhow!("Join error: {}", e))?
}
