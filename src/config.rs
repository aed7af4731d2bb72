use anyhow::{Context, Result};
use dotenv::dotenv;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use crate::common::{DEFAULT_DRIVER, DEFAULT_PORT, DEFAULT_QUEUE_CAPACITY};

/// Deployment-wide setting selecting which pipeline categories run here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Capture only; processing happens on another station.
    Scanner,
    /// Process and output only; workflows arrive already captured.
    Processor,
    #[default]
    Full,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Mode::Scanner => "scanner",
            Mode::Processor => "processor",
            Mode::Full => "full",
        })
    }
}

/// Station configuration, read once at startup and passed to whoever needs it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Mode to run the station in
    pub mode: Mode,
    /// Verbose logging and Rocket debug profile
    pub debug: bool,
    /// Directory for project folders
    pub project_dir: PathBuf,
    /// Path to the workflow database file
    pub database: PathBuf,
    pub address: String,
    pub port: u16,
    /// Pending jobs accepted before `enqueue` answers with `QueueFull`
    pub queue_capacity: usize,
    /// Upper bound for a single hook; unset means hooks may run forever
    pub hook_timeout_secs: Option<u64>,
    /// Capture driver written into the configuration of new workflows
    pub default_driver: String,
    /// Address of the station that processes captured workflows; only
    /// meaningful in scanner mode, empty when there is none
    pub postprocessing_server: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            mode: Mode::Full,
            debug: false,
            project_dir: PathBuf::from("./scans"),
            database: PathBuf::from("./db/workflows.redb"),
            address: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            hook_timeout_secs: None,
            default_driver: DEFAULT_DRIVER.to_string(),
            postprocessing_server: String::new(),
        }
    }
}

impl AppConfig {
    /// Load from `STATION_*` environment variables, after reading `.env`.
    pub fn load() -> Result<Self> {
        dotenv().ok();
        envy::prefixed("STATION_")
            .from_env::<AppConfig>()
            .context("Failed to read STATION_* environment variables")
    }

    pub fn hook_timeout(&self) -> Option<Duration> {
        self.hook_timeout_secs.map(Duration::from_secs)
    }

    /// The postprocessing server, if this is a scanner station that has one.
    pub fn postprocessing_server(&self) -> Option<&str> {
        match self.mode {
            Mode::Scanner if !self.postprocessing_server.is_empty() => {
                Some(&self.postprocessing_server)
            }
            _ => None,
        }
    }
}
