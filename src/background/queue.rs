use log::debug;
use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::sync::{Notify, watch};

use crate::common::errors::{StationError, StationResult};
use crate::models::category::Category;
use crate::models::job::{Job, JobHandle, JobStatus};
use crate::models::workflow::WorkflowId;

/// Result of waiting on the queue.
#[derive(Debug)]
pub enum Dequeued {
    Job(Job),
    Stop,
}

#[derive(Default)]
struct QueueState {
    pending: VecDeque<Job>,
    /// Pending and running jobs, one per workflow at most.
    active: HashMap<WorkflowId, Job>,
}

/// Bounded FIFO of jobs shared by request handlers and the processing worker.
pub struct JobQueue {
    state: Mutex<QueueState>,
    notify: Notify,
    capacity: usize,
}

impl JobQueue {
    pub fn new(capacity: usize) -> Self {
        Self {
            state: Mutex::new(QueueState::default()),
            notify: Notify::new(),
            capacity,
        }
    }

    fn state(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Accept a job for `workflow_id`. Never blocks.
    pub fn enqueue(&self, workflow_id: WorkflowId, category: Category) -> StationResult<JobHandle> {
        let handle = {
            let mut state = self.state();
            if state
                .active
                .get(&workflow_id)
                .is_some_and(|job| job.status.is_active())
            {
                return Err(StationError::WorkflowBusy(workflow_id));
            }
            if state.pending.len() >= self.capacity {
                return Err(StationError::QueueFull {
                    capacity: self.capacity,
                });
            }
            let job = Job::new(workflow_id, category);
            let handle = job.handle();
            state.active.insert(workflow_id, job.clone());
            state.pending.push_back(job);
            handle
        };
        debug!(
            "Enqueued job {} ({}) for workflow {}",
            handle.id, handle.category, workflow_id
        );
        self.notify.notify_one();
        Ok(handle)
    }

    /// Wait for the next job, or for `shutdown` to turn true.
    ///
    /// Shutdown is checked before the pending list, so a stop request leaves
    /// queued jobs in place for the next worker.
    pub async fn dequeue(&self, shutdown: &mut watch::Receiver<bool>) -> Dequeued {
        loop {
            if *shutdown.borrow_and_update() {
                return Dequeued::Stop;
            }
            if let Some(job) = self.pop_front() {
                return Dequeued::Job(job);
            }
            tokio::select! {
                _ = self.notify.notified() => {}
                changed = shutdown.changed() => {
                    // Sender gone: nobody can restart this worker.
                    if changed.is_err() {
                        return Dequeued::Stop;
                    }
                }
            }
        }
    }

    fn pop_front(&self) -> Option<Job> {
        let mut state = self.state();
        let mut job = state.pending.pop_front()?;
        job.status = JobStatus::Running;
        if let Some(active) = state.active.get_mut(&job.workflow_id) {
            active.status = JobStatus::Running;
        }
        Some(job)
    }

    /// Release the workflow of a finished job.
    pub fn complete(&self, job: &Job) {
        let mut state = self.state();
        if state
            .active
            .get(&job.workflow_id)
            .is_some_and(|active| active.id == job.id)
        {
            state.active.remove(&job.workflow_id);
        }
    }

    /// Number of jobs waiting to run.
    pub fn size(&self) -> usize {
        self.state().pending.len()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn active_job(&self, workflow_id: WorkflowId) -> Option<JobHandle> {
        self.state().active.get(&workflow_id).map(Job::handle)
    }

    /// Running job first, then pending jobs in execution order.
    pub fn snapshot(&self) -> Vec<JobHandle> {
        let state = self.state();
        let running = state
            .active
            .values()
            .filter(|job| job.status == JobStatus::Running);
        running
            .chain(state.pending.iter())
            .map(Job::handle)
            .collect()
    }
}
