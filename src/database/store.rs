use anyhow::{Context, Result};
use redb::backends::InMemoryBackend;
use redb::{Database, ReadableTable, TableDefinition};
use serde_json::Value;
use std::path::Path;

use crate::database::WorkflowStore;
use crate::models::workflow::{NewWorkflow, Workflow, WorkflowId};

// Key: WorkflowId -> Value: Workflow (JSON)
pub const WORKFLOW_TABLE: TableDefinition<u64, &[u8]> = TableDefinition::new("workflow");

/// Workflow store backed by a redb file.
pub struct RedbWorkflowStore {
    db: Database,
}

impl RedbWorkflowStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create directory tree {:?}", parent))?;
        }
        let db = Database::create(path)
            .with_context(|| format!("Failed to open workflow database {:?}", path))?;
        Self::initialize(db)
    }

    /// Store that lives and dies with the process; used by tests.
    pub fn in_memory() -> Result<Self> {
        let db = Database::builder().create_with_backend(InMemoryBackend::new())?;
        Self::initialize(db)
    }

    fn initialize(db: Database) -> Result<Self> {
        let txn = db.begin_write()?;
        let _ = txn.open_table(WORKFLOW_TABLE)?;
        txn.commit()?;
        Ok(Self { db })
    }
}

fn decode(bytes: &[u8]) -> Result<Workflow> {
    serde_json::from_slice(bytes).context("Failed to decode workflow record")
}

impl WorkflowStore for RedbWorkflowStore {
    fn create(&self, draft: NewWorkflow) -> Result<Workflow> {
        let txn = self.db.begin_write()?;
        let workflow = {
            let mut table = txn.open_table(WORKFLOW_TABLE)?;
            let id: WorkflowId = match table.last()? {
                Some((key, _)) => key.value() + 1,
                None => 1,
            };
            let workflow = Workflow::new(id, draft);
            let bytes = serde_json::to_vec(&workflow)?;
            table.insert(id, bytes.as_slice())?;
            workflow
        };
        txn.commit()?;
        Ok(workflow)
    }

    fn save_progress(&self, workflow: &Workflow) -> Result<Option<Workflow>> {
        let txn = self.db.begin_write()?;
        let written = {
            let mut table = txn.open_table(WORKFLOW_TABLE)?;
            let mut stored = match table.get(workflow.id)? {
                Some(value) => decode(value.value())?,
                None => return Ok(None),
            };
            stored.take_progress(workflow);
            let bytes = serde_json::to_vec(&stored)?;
            table.insert(workflow.id, bytes.as_slice())?;
            stored
        };
        txn.commit()?;
        Ok(Some(written))
    }

    fn get(&self, id: WorkflowId) -> Result<Option<Workflow>> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(WORKFLOW_TABLE)?;
        match table.get(id)? {
            Some(value) => Ok(Some(decode(value.value())?)),
            None => Ok(None),
        }
    }

    fn list(&self) -> Result<Vec<Workflow>> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(WORKFLOW_TABLE)?;
        let mut workflows = Vec::new();
        for entry in table.iter()? {
            let (_, value) = entry?;
            workflows.push(decode(value.value())?);
        }
        Ok(workflows)
    }

    fn update_config(&self, id: WorkflowId, fragment: &Value) -> Result<Option<Workflow>> {
        let txn = self.db.begin_write()?;
        let updated = {
            let mut table = txn.open_table(WORKFLOW_TABLE)?;
            let current = match table.get(id)? {
                Some(value) => decode(value.value())?,
                None => return Ok(None),
            };
            let mut workflow = current;
            workflow.merge_config(fragment);
            let bytes = serde_json::to_vec(&workflow)?;
            table.insert(id, bytes.as_slice())?;
            workflow
        };
        txn.commit()?;
        Ok(Some(updated))
    }
}
