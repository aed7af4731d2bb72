use anyhow::{Context, Result, bail};
use serde_json::json;
use std::fs;

use crate::extensions::{ConfigTemplate, Extension, HookContext, PluginOption};
use crate::models::category::Category;
use crate::models::workflow::Workflow;

/// Rejects a capture whose images are missing or truncated.
pub struct RawCheck;

impl Extension for RawCheck {
    fn name(&self) -> &str {
        "rawcheck"
    }

    fn category(&self) -> Category {
        Category::Capture
    }

    fn configuration_template(&self) -> Result<Option<ConfigTemplate>> {
        let mut template = ConfigTemplate::new();
        template.insert(
            "min_bytes".to_string(),
            PluginOption::new(json!(1), "Minimum size of a captured image in bytes"),
        );
        Ok(Some(template))
    }

    fn execute_hook(&self, workflow: &mut Workflow, ctx: &HookContext) -> Result<()> {
        let min_bytes = ctx.u64_option("min_bytes", 1);
        for image in &workflow.images {
            let size = fs::metadata(image)
                .with_context(|| format!("captured image {:?} is missing", image))?
                .len();
            if size < min_bytes {
                bail!(
                    "captured image {:?} has {} bytes, expected at least {}",
                    image,
                    size,
                    min_bytes
                );
            }
        }
        Ok(())
    }
}
