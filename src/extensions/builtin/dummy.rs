use anyhow::{Context, Result};
use image::{ImageFormat, Rgb, RgbImage};
use serde_json::json;
use std::path::PathBuf;

use crate::extensions::{ConfigTemplate, Driver, HookContext, PluginOption};
use crate::models::workflow::Workflow;
use crate::utils::{ensure_dir, page_file_name, raw_dir};

/// Capture driver without hardware: every shot writes blank pages.
pub struct DummyDriver;

impl Driver for DummyDriver {
    fn name(&self) -> &str {
        "dummy"
    }

    fn configuration_template(&self) -> Result<Option<ConfigTemplate>> {
        let mut template = ConfigTemplate::new();
        template.insert(
            "pages".to_string(),
            PluginOption::new(json!(2), "Pages written per capture"),
        );
        template.insert(
            "width".to_string(),
            PluginOption::new(json!(64), "Width of the generated pages in pixels"),
        );
        template.insert(
            "height".to_string(),
            PluginOption::new(json!(96), "Height of the generated pages in pixels"),
        );
        Ok(Some(template))
    }

    fn capture(&self, workflow: &Workflow, ctx: &HookContext) -> Result<Vec<PathBuf>> {
        let pages = usize::try_from(ctx.u64_option("pages", 2)).context("pages out of range")?;
        let width = u32::try_from(ctx.u64_option("width", 64))
            .context("width out of range")?
            .max(1);
        let height = u32::try_from(ctx.u64_option("height", 96))
            .context("height out of range")?
            .max(1);
        let dir = ensure_dir(raw_dir(&workflow.path))?;

        let first = workflow.images.len();
        (first..first + pages)
            .map(|index| {
                let shade = (index % 2) as u8 * 64 + 128;
                let page = RgbImage::from_pixel(width, height, Rgb([shade, shade, shade]));
                let path = dir.join(page_file_name(index, "png"));
                page.save_with_format(&path, ImageFormat::Png)
                    .with_context(|| format!("failed to write page {:?}", path))?;
                Ok(path)
            })
            .collect()
    }
}
