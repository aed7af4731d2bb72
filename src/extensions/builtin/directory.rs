use anyhow::{Context, Result, bail};
use serde_json::json;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::extensions::{ConfigTemplate, Driver, HookContext, PluginOption};
use crate::models::workflow::Workflow;
use crate::utils::{PathExt, ensure_dir, page_file_name, raw_dir};

/// Capture driver that imports images another device already wrote to disk.
pub struct DirectoryDriver;

impl Driver for DirectoryDriver {
    fn name(&self) -> &str {
        "directory"
    }

    fn configuration_template(&self) -> Result<Option<ConfigTemplate>> {
        let mut template = ConfigTemplate::new();
        template.insert(
            "source".to_string(),
            PluginOption::new(json!(""), "Directory to import captured images from"),
        );
        template.insert(
            "recursive".to_string(),
            PluginOption::new(json!(false), "Descend into sub-directories"),
        );
        Ok(Some(template))
    }

    fn capture(&self, workflow: &Workflow, ctx: &HookContext) -> Result<Vec<PathBuf>> {
        let source = ctx.str_option("source").unwrap_or_default();
        if source.is_empty() {
            bail!("no source directory configured");
        }
        let recursive = ctx
            .option("recursive")
            .and_then(|value| value.as_bool())
            .unwrap_or(false);
        let sources = list_images(Path::new(source), recursive)?;
        if sources.is_empty() {
            bail!("no images found in {:?}", source);
        }

        let dir = ensure_dir(raw_dir(&workflow.path))?;
        let first = workflow.images.len();
        sources
            .iter()
            .enumerate()
            .map(|(offset, source)| {
                let dest = dir.join(page_file_name(first + offset, source.ext_lower()));
                fs::copy(source, &dest).with_context(|| {
                    format!("failed to copy file from {:?} to {:?}", source, dest)
                })?;
                Ok(dest)
            })
            .collect()
    }
}

fn list_images(source: &Path, recursive: bool) -> Result<Vec<PathBuf>> {
    if !source.is_dir() {
        bail!("source {:?} is not a directory", source);
    }
    let walker = WalkDir::new(source)
        .min_depth(1)
        .max_depth(if recursive { usize::MAX } else { 1 })
        .sort_by_file_name();
    let mut images = Vec::new();
    for entry in walker {
        let entry = entry.with_context(|| format!("failed to read {:?}", source))?;
        if entry.file_type().is_file() && entry.path().is_image() {
            images.push(entry.into_path());
        }
    }
    Ok(images)
}
