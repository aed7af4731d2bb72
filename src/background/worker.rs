use anyhow::{Context, Result};
use log::{error, info};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::JoinHandle;
use tokio::sync::watch;

use crate::background::flows::run_job;
use crate::background::queue::Dequeued;
use crate::operations::station::Station;

/// Owner of the single background thread that executes queued jobs.
///
/// The current job always runs to completion: `stop` is only observed
/// between jobs.
pub struct ProcessingWorker {
    station: Arc<Station>,
    shutdown: watch::Sender<bool>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl ProcessingWorker {
    pub fn new(station: Arc<Station>) -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            station,
            shutdown,
            handle: Mutex::new(None),
        }
    }

    fn handle(&self) -> MutexGuard<'_, Option<JoinHandle<()>>> {
        self.handle.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Spawn the worker thread. Does nothing if it is already running.
    pub fn start(&self) -> Result<()> {
        let mut handle = self.handle();
        if handle.as_ref().is_some_and(|running| !running.is_finished()) {
            return Ok(());
        }
        // Reap a thread that exited on its own.
        if let Some(finished) = handle.take() {
            if finished.join().is_err() {
                error!("Processing worker thread panicked");
            }
        }

        self.shutdown.send_replace(false);
        let shutdown = self.shutdown.subscribe();
        let station = self.station.clone();
        let thread = std::thread::Builder::new()
            .name("processing-worker".to_string())
            .spawn(move || worker_thread(station, shutdown))
            .context("Failed to spawn processing worker thread")?;
        *handle = Some(thread);
        info!("Processing worker started");
        Ok(())
    }

    /// Signal the worker and wait for it to exit. Safe to call repeatedly.
    pub fn stop(&self) {
        let mut handle = self.handle();
        self.shutdown.send_replace(true);
        if let Some(thread) = handle.take() {
            if thread.join().is_err() {
                error!("Processing worker thread panicked");
            }
            info!(
                "Processing worker stopped ({} job(s) left in queue)",
                self.station.queue().size()
            );
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle()
            .as_ref()
            .is_some_and(|running| !running.is_finished())
    }
}

impl Drop for ProcessingWorker {
    fn drop(&mut self) {
        self.stop();
    }
}

fn worker_thread(station: Arc<Station>, shutdown: watch::Receiver<bool>) {
    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(err) => {
            error!("Failed to build processing worker runtime: {}", err);
            return;
        }
    };
    runtime.block_on(worker_loop(&station, shutdown));
    // Blocking tasks abandoned by the hook watchdog must not hold up `stop`.
    runtime.shutdown_background();
}

async fn worker_loop(station: &Station, mut shutdown: watch::Receiver<bool>) {
    loop {
        match station.queue().dequeue(&mut shutdown).await {
            Dequeued::Stop => break,
            Dequeued::Job(job) => {
                let status = run_job(station, &job).await;
                station.queue().complete(&job);
                info!(
                    "Job {} finished as {:?} ({} pending)",
                    job.id,
                    status,
                    station.queue().size()
                );
            }
        }
    }
}
