//! Pluggable pipeline units.
//!
//! - `gate`: mode → active categories
//! - `registry`: the fixed set of extensions and drivers built at startup
//! - `resolver`: extensions and driver that apply to one workflow
//! - `builtin`: extensions and drivers shipped with the station

pub mod builtin;
pub mod gate;
pub mod registry;
pub mod resolver;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::models::category::Category;
use crate::models::workflow::Workflow;

/// One configurable option exposed by an extension or driver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PluginOption {
    /// Default value; for selectable options, the list of choices.
    pub value: Value,
    pub docstring: String,
    pub selectable: bool,
}

impl PluginOption {
    pub fn new(value: impl Into<Value>, docstring: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            docstring: docstring.into(),
            selectable: false,
        }
    }

    pub fn choice(choices: impl Into<Value>, docstring: impl Into<String>) -> Self {
        Self {
            value: choices.into(),
            docstring: docstring.into(),
            selectable: true,
        }
    }

    /// Value used when the workflow does not override the option.
    pub fn default_value(&self) -> Value {
        match (&self.value, self.selectable) {
            (Value::Array(choices), true) => choices.first().cloned().unwrap_or(Value::Null),
            (value, _) => value.clone(),
        }
    }
}

pub type ConfigTemplate = BTreeMap<String, PluginOption>;

/// Options and scratch space handed to a hook.
#[derive(Debug, Clone)]
pub struct HookContext {
    pub category: Category,
    /// Template defaults overlaid with the workflow's overrides.
    pub options: Map<String, Value>,
    pub temp_dir: PathBuf,
}

impl HookContext {
    pub fn new(
        category: Category,
        template: Option<&ConfigTemplate>,
        overrides: Option<&Map<String, Value>>,
        temp_dir: &Path,
    ) -> Self {
        let mut options: Map<String, Value> = template
            .map(|template| {
                template
                    .iter()
                    .map(|(key, option)| (key.clone(), option.default_value()))
                    .collect()
            })
            .unwrap_or_default();
        if let Some(overrides) = overrides {
            for (key, value) in overrides {
                options.insert(key.clone(), value.clone());
            }
        }
        Self {
            category,
            options,
            temp_dir: temp_dir.to_path_buf(),
        }
    }

    pub fn option(&self, key: &str) -> Option<&Value> {
        self.options.get(key)
    }

    pub fn u64_option(&self, key: &str, fallback: u64) -> u64 {
        self.option(key).and_then(Value::as_u64).unwrap_or(fallback)
    }

    pub fn i64_option(&self, key: &str, fallback: i64) -> i64 {
        self.option(key).and_then(Value::as_i64).unwrap_or(fallback)
    }

    pub fn str_option(&self, key: &str) -> Option<&str> {
        self.option(key).and_then(Value::as_str)
    }
}

/// A pipeline extension implementing the hook of one category.
pub trait Extension: Send + Sync {
    fn name(&self) -> &str;

    fn category(&self) -> Category;

    fn configuration_template(&self) -> Result<Option<ConfigTemplate>> {
        Ok(None)
    }

    /// Run the hook. Called on a blocking thread; may do file or device I/O.
    fn execute_hook(&self, workflow: &mut Workflow, ctx: &HookContext) -> Result<()>;
}

/// A capture device.
pub trait Driver: Send + Sync {
    fn name(&self) -> &str;

    fn configuration_template(&self) -> Result<Option<ConfigTemplate>> {
        Ok(None)
    }

    /// Capture the next images for `workflow` and return their paths in page order.
    fn capture(&self, workflow: &Workflow, ctx: &HookContext) -> Result<Vec<PathBuf>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn selectable_options_default_to_first_choice() {
        let option = PluginOption::choice(json!([90, -90, 180]), "Rotation");
        assert_eq!(option.default_value(), json!(90));
        let option = PluginOption::new(json!([1, 2]), "List value");
        assert_eq!(option.default_value(), json!([1, 2]));
    }

    #[test]
    fn hook_context_overlays_overrides_on_defaults() {
        let mut template = ConfigTemplate::new();
        template.insert("pages".to_string(), PluginOption::new(2, "Pages"));
        template.insert("width".to_string(), PluginOption::new(64, "Width"));
        let overrides = json!({"pages": 4, "extra": true});

        let ctx = HookContext::new(
            Category::Capture,
            Some(&template),
            overrides.as_object(),
            Path::new("/tmp"),
        );
        assert_eq!(ctx.u64_option("pages", 0), 4);
        assert_eq!(ctx.u64_option("width", 0), 64);
        assert_eq!(ctx.option("extra"), Some(&json!(true)));
    }
}
