use anyhow::{Context, Result, bail};
use image::DynamicImage;
use log::debug;
use serde_json::json;

use crate::extensions::{ConfigTemplate, Extension, HookContext, PluginOption};
use crate::models::category::Category;
use crate::models::workflow::Workflow;
use crate::utils::{done_dir, ensure_dir};

/// Turns pages upright. Two-camera rigs shoot odd and even pages from
/// opposite sides, so each side gets its own angle.
pub struct AutoRotate;

impl Extension for AutoRotate {
    fn name(&self) -> &str {
        "autorotate"
    }

    fn category(&self) -> Category {
        Category::Process
    }

    fn configuration_template(&self) -> Result<Option<ConfigTemplate>> {
        let mut template = ConfigTemplate::new();
        template.insert(
            "rotate_odd".to_string(),
            PluginOption::choice(json!([-90, 90, 180, 0]), "Rotation applied to odd pages"),
        );
        template.insert(
            "rotate_even".to_string(),
            PluginOption::choice(json!([90, -90, 180, 0]), "Rotation applied to even pages"),
        );
        Ok(Some(template))
    }

    fn execute_hook(&self, workflow: &mut Workflow, ctx: &HookContext) -> Result<()> {
        let rotate_odd = ctx.i64_option("rotate_odd", -90);
        let rotate_even = ctx.i64_option("rotate_even", 90);
        let dir = ensure_dir(done_dir(&workflow.path))?;

        for (index, source) in workflow.images.iter().enumerate() {
            // Page numbers start at one, so index 0 is an odd page.
            let angle = if index % 2 == 0 { rotate_odd } else { rotate_even };
            let page = image::open(source)
                .with_context(|| format!("failed to decode image {:?}", source))?;
            let rotated = rotate(page, angle)?;
            let file_name = source
                .file_name()
                .with_context(|| format!("image path {:?} has no file name", source))?;
            let dest = dir.join(file_name);
            rotated
                .save(&dest)
                .with_context(|| format!("failed to save rotated page to {:?}", dest))?;
            debug!("Rotated {:?} by {} degrees", source, angle);
        }
        Ok(())
    }
}

fn rotate(page: DynamicImage, angle: i64) -> Result<DynamicImage> {
    Ok(match angle.rem_euclid(360) {
        0 => page,
        90 => page.rotate90(),
        180 => page.rotate180(),
        270 => page.rotate270(),
        _ => bail!("unsupported rotation angle {}", angle),
    })
}
