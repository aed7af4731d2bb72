#![allow(dead_code)]

use anyhow::{Result, bail};
use serde_json::Value;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use scan_station::config::{AppConfig, Mode};
use scan_station::database::WorkflowStore;
use scan_station::database::store::RedbWorkflowStore;
use scan_station::extensions::builtin::dummy::DummyDriver;
use scan_station::extensions::registry::ExtensionRegistry;
use scan_station::extensions::{ConfigTemplate, Extension, HookContext, PluginOption};
use scan_station::models::category::Category;
use scan_station::models::workflow::{NewWorkflow, Workflow, WorkflowId};
use scan_station::operations::station::Station;

pub const WAIT_LIMIT: Duration = Duration::from_secs(10);

/// Appends `"<name>:<workflow id>"` to a shared log on every run.
pub struct Recording {
    pub name: &'static str,
    pub category: Category,
    pub log: Arc<Mutex<Vec<String>>>,
}

impl Extension for Recording {
    fn name(&self) -> &str {
        self.name
    }

    fn category(&self) -> Category {
        self.category
    }

    fn configuration_template(&self) -> Result<Option<ConfigTemplate>> {
        let mut template = ConfigTemplate::new();
        template.insert("tag".to_string(), PluginOption::new("default", "Tag"));
        Ok(Some(template))
    }

    fn execute_hook(&self, workflow: &mut Workflow, _ctx: &HookContext) -> Result<()> {
        self.log
            .lock()
            .unwrap()
            .push(format!("{}:{}", self.name, workflow.id));
        Ok(())
    }
}

/// Always fails.
pub struct Failing {
    pub name: &'static str,
    pub category: Category,
}

impl Extension for Failing {
    fn name(&self) -> &str {
        self.name
    }

    fn category(&self) -> Category {
        self.category
    }

    fn execute_hook(&self, _workflow: &mut Workflow, _ctx: &HookContext) -> Result<()> {
        bail!("page feeder jammed")
    }
}

/// Blocks every run until opened.
#[derive(Default)]
pub struct Gate {
    pub entered: AtomicBool,
    pub open: AtomicBool,
}

impl Gate {
    pub fn open(&self) {
        self.open.store(true, Ordering::SeqCst);
    }

    pub fn wait_entered(&self) {
        wait_until("gate entered", || self.entered.load(Ordering::SeqCst));
    }
}

pub struct Gated(pub Arc<Gate>);

impl Extension for Gated {
    fn name(&self) -> &str {
        "gate"
    }

    fn category(&self) -> Category {
        Category::Process
    }

    fn execute_hook(&self, _workflow: &mut Workflow, _ctx: &HookContext) -> Result<()> {
        self.0.entered.store(true, Ordering::SeqCst);
        let start = Instant::now();
        while !self.0.open.load(Ordering::SeqCst) {
            if start.elapsed() > WAIT_LIMIT {
                bail!("gate never opened");
            }
            std::thread::sleep(Duration::from_millis(5));
        }
        Ok(())
    }
}

/// Sleeps past any reasonable hook timeout.
pub struct Sleepy;

impl Extension for Sleepy {
    fn name(&self) -> &str {
        "sleepy"
    }

    fn category(&self) -> Category {
        Category::Process
    }

    fn execute_hook(&self, _workflow: &mut Workflow, _ctx: &HookContext) -> Result<()> {
        std::thread::sleep(Duration::from_secs(3));
        Ok(())
    }
}

/// In-memory store whose progress writes fail for the listed call numbers
/// (counted from 1).
pub struct FlakyStore {
    inner: RedbWorkflowStore,
    failing: Vec<usize>,
    calls: AtomicUsize,
}

impl FlakyStore {
    pub fn failing_on(failing: Vec<usize>) -> Self {
        Self {
            inner: RedbWorkflowStore::in_memory().unwrap(),
            failing,
            calls: AtomicUsize::new(0),
        }
    }
}

impl WorkflowStore for FlakyStore {
    fn create(&self, draft: NewWorkflow) -> Result<Workflow> {
        self.inner.create(draft)
    }

    fn save_progress(&self, workflow: &Workflow) -> Result<Option<Workflow>> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.failing.contains(&call) {
            bail!("disk full");
        }
        self.inner.save_progress(workflow)
    }

    fn get(&self, id: WorkflowId) -> Result<Option<Workflow>> {
        self.inner.get(id)
    }

    fn list(&self) -> Result<Vec<Workflow>> {
        self.inner.list()
    }

    fn update_config(&self, id: WorkflowId, fragment: &Value) -> Result<Option<Workflow>> {
        self.inner.update_config(id, fragment)
    }
}

pub fn config(mode: Mode, dir: &Path) -> AppConfig {
    AppConfig {
        mode,
        project_dir: dir.join("scans"),
        database: dir.join("db/workflows.redb"),
        ..AppConfig::default()
    }
}

pub fn station(config: AppConfig, registry: ExtensionRegistry, dir: &Path) -> Arc<Station> {
    station_with_store(
        config,
        registry,
        Arc::new(RedbWorkflowStore::in_memory().unwrap()),
        dir,
    )
}

pub fn station_with_store(
    config: AppConfig,
    registry: ExtensionRegistry,
    store: Arc<dyn WorkflowStore>,
    dir: &Path,
) -> Arc<Station> {
    Arc::new(Station::new(config, store, Arc::new(registry), dir.join("tmp")))
}

pub fn registry(extensions: Vec<Arc<dyn Extension>>) -> ExtensionRegistry {
    ExtensionRegistry::new(extensions, vec![Arc::new(DummyDriver)]).unwrap()
}

pub fn wait_until(what: &str, mut condition: impl FnMut() -> bool) {
    let start = Instant::now();
    while !condition() {
        assert!(start.elapsed() < WAIT_LIMIT, "timed out waiting for {what}");
        std::thread::sleep(Duration::from_millis(10));
    }
}

/// Wait until the workflow has no queued or running job, then return it.
pub fn wait_idle(station: &Station, id: WorkflowId) -> Workflow {
    wait_until("workflow to go idle", || station.queue().active_job(id).is_none());
    station.get_workflow(id).unwrap()
}
