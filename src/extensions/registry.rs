use anyhow::{Result, bail};
use std::collections::HashSet;
use std::sync::Arc;

use crate::extensions::builtin::{
    autorotate::AutoRotate, directory::DirectoryDriver, dummy::DummyDriver, manifest::Manifest,
    rawcheck::RawCheck,
};
use crate::extensions::{Driver, Extension};

/// Process-wide set of extensions and drivers, fixed at startup.
///
/// Registration order is the execution order inside a category.
pub struct ExtensionRegistry {
    extensions: Vec<Arc<dyn Extension>>,
    drivers: Vec<Arc<dyn Driver>>,
}

impl ExtensionRegistry {
    /// Build a registry, rejecting duplicated names: merged schemas are keyed
    /// by name, so an extension and a driver may not share one either.
    pub fn new(extensions: Vec<Arc<dyn Extension>>, drivers: Vec<Arc<dyn Driver>>) -> Result<Self> {
        let mut seen = HashSet::new();
        let names = extensions
            .iter()
            .map(|extension| extension.name())
            .chain(drivers.iter().map(|driver| driver.name()));
        for name in names {
            if !seen.insert(name.to_string()) {
                bail!("Duplicate extension or driver name: {}", name);
            }
        }
        Ok(Self {
            extensions,
            drivers,
        })
    }

    /// Extensions and drivers shipped with the station.
    pub fn builtin() -> Self {
        Self {
            extensions: vec![
                Arc::new(RawCheck),
                Arc::new(AutoRotate),
                Arc::new(Manifest),
            ],
            drivers: vec![Arc::new(DummyDriver), Arc::new(DirectoryDriver)],
        }
    }

    pub fn extensions(&self) -> &[Arc<dyn Extension>] {
        &self.extensions
    }

    pub fn driver(&self, name: &str) -> Option<Arc<dyn Driver>> {
        self.drivers
            .iter()
            .find(|driver| driver.name() == name)
            .cloned()
    }

    pub fn driver_names(&self) -> Vec<&str> {
        self.drivers.iter().map(|driver| driver.name()).collect()
    }
}
