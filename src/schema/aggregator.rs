use dashmap::DashMap;
use log::{debug, warn};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use crate::common::errors::{StationError, StationResult};
use crate::config::Mode;
use crate::database::WorkflowStore;
use crate::extensions::gate::active_categories;
use crate::extensions::registry::ExtensionRegistry;
use crate::extensions::resolver::{Resolution, ResolutionSnapshot, resolve};
use crate::extensions::ConfigTemplate;
use crate::models::workflow::WorkflowId;

/// Configuration options of every active extension and driver of a workflow,
/// keyed by extension or driver name.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MergedSchema {
    #[serde(flatten)]
    pub options: BTreeMap<String, ConfigTemplate>,
    /// Entities whose template could not be retrieved, with the error message.
    #[serde(skip)]
    pub failures: BTreeMap<String, String>,
    #[serde(skip)]
    pub snapshot: ResolutionSnapshot,
}

impl MergedSchema {
    pub fn template(&self, name: &str) -> Option<&ConfigTemplate> {
        self.options.get(name)
    }
}

#[derive(Default)]
struct Slot {
    /// Bumped by every invalidation.
    generation: u64,
    schema: Option<Arc<MergedSchema>>,
}

/// Builds merged configuration schemas and caches them per workflow.
///
/// An entry is only published if no invalidation happened while it was being
/// computed, so a reader never sees a schema older than the last config update.
pub struct ConfigTemplateAggregator {
    store: Arc<dyn WorkflowStore>,
    registry: Arc<ExtensionRegistry>,
    mode: Mode,
    slots: DashMap<WorkflowId, Slot>,
}

impl ConfigTemplateAggregator {
    pub fn new(store: Arc<dyn WorkflowStore>, registry: Arc<ExtensionRegistry>, mode: Mode) -> Self {
        Self {
            store,
            registry,
            mode,
            slots: DashMap::new(),
        }
    }

    pub fn get_schema(&self, id: WorkflowId) -> StationResult<Arc<MergedSchema>> {
        loop {
            let generation = match self.slots.get(&id) {
                Some(slot) => match &slot.schema {
                    Some(schema) => return Ok(schema.clone()),
                    None => slot.generation,
                },
                None => 0,
            };

            let schema = Arc::new(self.compute(id)?);

            let mut slot = self.slots.entry(id).or_default();
            if slot.generation == generation {
                slot.schema = Some(schema.clone());
                return Ok(schema);
            }
            debug!("Schema for workflow {} invalidated while computing, retrying", id);
        }
    }

    /// Drop the cached schema of a workflow. Must run before a config update
    /// is reported as successful.
    pub fn invalidate(&self, id: WorkflowId) {
        let mut slot = self.slots.entry(id).or_default();
        slot.generation += 1;
        slot.schema = None;
    }

    pub fn is_cached(&self, id: WorkflowId) -> bool {
        self.slots
            .get(&id)
            .is_some_and(|slot| slot.schema.is_some())
    }

    fn compute(&self, id: WorkflowId) -> StationResult<MergedSchema> {
        let start_time = Instant::now();
        let workflow = self.store.get(id)?.ok_or(StationError::NotFound(id))?;
        let resolution = resolve(
            &self.registry,
            &active_categories(self.mode),
            &workflow.config,
        )?;
        let schema = merge_templates(&resolution);
        let duration = format!("{:?}", start_time.elapsed());
        debug!(duration = &*duration; "Built config schema for workflow {}", id);
        Ok(schema)
    }
}

/// Merge the templates of every entity in `resolution`, uncached.
pub fn merge_templates(resolution: &Resolution) -> MergedSchema {
    let mut options = BTreeMap::new();
    let mut failures = BTreeMap::new();

    let extension_templates = resolution
        .extensions
        .iter()
        .map(|extension| (extension.name(), extension.configuration_template()));
    let driver_template = resolution
        .driver
        .iter()
        .map(|driver| (driver.name(), driver.configuration_template()));

    for (name, template) in extension_templates.chain(driver_template) {
        match template {
            Ok(Some(template)) => {
                options.insert(name.to_string(), template);
            }
            Ok(None) => {}
            Err(err) => {
                warn!("Failed to retrieve configuration template of {}: {:#}", name, err);
                failures.insert(name.to_string(), format!("{:#}", err));
            }
        }
    }

    MergedSchema {
        options,
        failures,
        snapshot: resolution.snapshot(),
    }
}
