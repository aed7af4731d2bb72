use anyhow::{Context, Result, anyhow};
use log::info;
use std::sync::Arc;

use scan_station::api::build_rocket;
use scan_station::background::worker::ProcessingWorker;
use scan_station::bootstrap::setup::{initialize_folder, initialize_logger};
use scan_station::common::ROCKET_RUNTIME;
use scan_station::common::errors::handle_error;
use scan_station::config::AppConfig;
use scan_station::database::store::RedbWorkflowStore;
use scan_station::extensions::registry::ExtensionRegistry;
use scan_station::operations::station::Station;

fn main() -> Result<()> {
    let config = AppConfig::load()?;
    initialize_logger(config.debug);
    info!(
        "Starting station in {} mode (queue capacity {})",
        config.mode, config.queue_capacity
    );
    if let Some(server) = config.postprocessing_server() {
        info!("Captured workflows are processed by {}", server);
    }
    initialize_folder(&config)?;

    let store = Arc::new(RedbWorkflowStore::open(&config.database)?);
    let registry = Arc::new(ExtensionRegistry::builtin());
    let temp_dir = tempfile::Builder::new()
        .prefix("scan-station-")
        .tempdir()
        .context("Failed to create temporary directory")?;

    let station = Arc::new(Station::new(
        config,
        store,
        registry,
        temp_dir.path(),
    ));

    let worker = ProcessingWorker::new(station.clone());
    worker.start()?;

    let served = ROCKET_RUNTIME.block_on(async { build_rocket(station).launch().await });

    worker.stop();
    temp_dir.close().context("Failed to remove temporary directory")?;

    if let Err(err) = served {
        return Err(handle_error(anyhow!("Rocket server failed: {}", err)));
    }
    info!("Station shut down");
    Ok(())
}
