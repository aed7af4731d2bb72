use anyhow::{Context, Result};
use chrono::Utc;
use serde_json::json;
use std::fs;
use std::path::PathBuf;

use crate::extensions::{ConfigTemplate, Extension, HookContext, PluginOption};
use crate::models::category::Category;
use crate::models::workflow::Workflow;
use crate::utils::{PathExt, done_dir, ensure_dir, out_dir};

/// Writes a JSON description of the scanned book next to the outputs.
pub struct Manifest;

impl Extension for Manifest {
    fn name(&self) -> &str {
        "manifest"
    }

    fn category(&self) -> Category {
        Category::Output
    }

    fn configuration_template(&self) -> Result<Option<ConfigTemplate>> {
        let mut template = ConfigTemplate::new();
        template.insert(
            "filename".to_string(),
            PluginOption::new(json!("manifest.json"), "Name of the manifest file"),
        );
        Ok(Some(template))
    }

    fn execute_hook(&self, workflow: &mut Workflow, ctx: &HookContext) -> Result<()> {
        let filename = ctx.str_option("filename").unwrap_or("manifest.json");
        let dir = ensure_dir(out_dir(&workflow.path))?;

        let manifest = json!({
            "name": workflow.name,
            "captureStart": workflow.capture_start,
            "images": workflow.images,
            "processed": processed_pages(workflow)?,
            "generatedAt": Utc::now(),
        });
        let dest = dir.join(filename);
        let bytes = serde_json::to_vec_pretty(&manifest)?;
        fs::write(&dest, bytes).with_context(|| format!("failed to write manifest {:?}", dest))?;

        workflow.out_files.insert(dest);
        Ok(())
    }
}

fn processed_pages(workflow: &Workflow) -> Result<Vec<PathBuf>> {
    let dir = done_dir(&workflow.path);
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let mut pages = Vec::new();
    for entry in fs::read_dir(&dir).with_context(|| format!("failed to read {:?}", dir))? {
        let path = entry?.path();
        if path.is_image() {
            pages.push(path);
        }
    }
    pages.sort();
    Ok(pages)
}
