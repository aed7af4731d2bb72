use serde_json::Value;
use std::collections::BTreeSet;
use std::sync::Arc;

use crate::common::errors::{StationError, StationResult};
use crate::extensions::registry::ExtensionRegistry;
use crate::extensions::{Driver, Extension};
use crate::models::category::Category;

/// Extensions and driver that apply to one workflow, in execution order.
#[derive(Clone)]
pub struct Resolution {
    pub extensions: Vec<Arc<dyn Extension>>,
    pub driver: Option<Arc<dyn Driver>>,
}

/// Names that identify a resolution; two equal snapshots yield the same schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolutionSnapshot {
    pub extensions: Vec<String>,
    pub driver: Option<String>,
}

impl Resolution {
    pub fn snapshot(&self) -> ResolutionSnapshot {
        ResolutionSnapshot {
            extensions: self
                .extensions
                .iter()
                .map(|extension| extension.name().to_string())
                .collect(),
            driver: self.driver.as_ref().map(|driver| driver.name().to_string()),
        }
    }

    pub fn for_category(&self, category: Category) -> impl Iterator<Item = &Arc<dyn Extension>> {
        self.extensions
            .iter()
            .filter(move |extension| extension.category() == category)
    }
}

/// Select the extensions of `categories` enabled by `config`, plus the
/// configured driver when capture is among them.
///
/// `config.plugins`, when present, restricts the enabled extensions by name.
pub fn resolve(
    registry: &ExtensionRegistry,
    categories: &BTreeSet<Category>,
    config: &Value,
) -> StationResult<Resolution> {
    let enabled: Option<BTreeSet<&str>> = config
        .get("plugins")
        .and_then(Value::as_array)
        .map(|plugins| plugins.iter().filter_map(Value::as_str).collect());

    let mut extensions = Vec::new();
    // BTreeSet iterates categories in pipeline priority order.
    for category in categories {
        extensions.extend(
            registry
                .extensions()
                .iter()
                .filter(|extension| extension.category() == *category)
                .filter(|extension| {
                    enabled
                        .as_ref()
                        .is_none_or(|names| names.contains(extension.name()))
                })
                .cloned(),
        );
    }

    let driver = if categories.contains(&Category::Capture) {
        let name = config
            .get("driver")
            .and_then(Value::as_str)
            .unwrap_or_default();
        let driver = registry
            .driver(name)
            .ok_or_else(|| StationError::UnknownDriver(name.to_string()))?;
        Some(driver)
    } else {
        None
    };

    Ok(Resolution { extensions, driver })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Mode;
    use crate::extensions::gate::active_categories;
    use serde_json::json;

    fn names(resolution: &Resolution) -> Vec<String> {
        resolution.snapshot().extensions
    }

    #[test]
    fn concatenates_categories_in_priority_order() {
        let registry = ExtensionRegistry::builtin();
        let resolution = resolve(
            &registry,
            &active_categories(Mode::Full),
            &json!({"driver": "dummy"}),
        )
        .unwrap();
        assert_eq!(names(&resolution), vec!["rawcheck", "autorotate", "manifest"]);
        assert_eq!(resolution.snapshot().driver.as_deref(), Some("dummy"));
    }

    #[test]
    fn processor_mode_needs_no_driver() {
        let registry = ExtensionRegistry::builtin();
        let resolution = resolve(
            &registry,
            &active_categories(Mode::Processor),
            &json!({"driver": "not-installed"}),
        )
        .unwrap();
        assert_eq!(names(&resolution), vec!["autorotate", "manifest"]);
        assert!(resolution.driver.is_none());
    }

    #[test]
    fn plugins_list_restricts_extensions() {
        let registry = ExtensionRegistry::builtin();
        let resolution = resolve(
            &registry,
            &active_categories(Mode::Full),
            &json!({"driver": "dummy", "plugins": ["manifest", "rawcheck"]}),
        )
        .unwrap();
        // Registry order wins over the order of the plugins list.
        assert_eq!(names(&resolution), vec!["rawcheck", "manifest"]);
    }

    #[test]
    fn unknown_or_missing_driver_fails_capture_modes() {
        let registry = ExtensionRegistry::builtin();
        let scanner = active_categories(Mode::Scanner);
        assert!(matches!(
            resolve(&registry, &scanner, &json!({"driver": "gphoto2"})),
            Err(StationError::UnknownDriver(name)) if name == "gphoto2"
        ));
        assert!(matches!(
            resolve(&registry, &scanner, &json!({})),
            Err(StationError::UnknownDriver(_))
        ));
    }

    #[test]
    fn filters_by_category() {
        let registry = ExtensionRegistry::builtin();
        let resolution = resolve(
            &registry,
            &active_categories(Mode::Full),
            &json!({"driver": "dummy"}),
        )
        .unwrap();
        let process: Vec<&str> = resolution
            .for_category(Category::Process)
            .map(|extension| extension.name())
            .collect();
        assert_eq!(process, vec!["autorotate"]);
    }
}
