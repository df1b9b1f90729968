/*
 * Voxel Ants Simulation
 *
 * This application simulates a colony of ants foraging through a block of
 * soil. Agents alternate between two states:
 * 1. Searching: follow nutrient and food trails, eating into the soil they hit
 * 2. Returning: follow the wander trail back to the nest
 *
 * Usage: voxel_ants [config.json]
 *
 * The optional JSON file overrides any subset of the simulation parameters.
 * Log verbosity is controlled with RUST_LOG (for example RUST_LOG=voxel_ants=debug).
 */

use std::fs;

use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::EnvFilter;

use voxel_ants::app;
use voxel_ants::{Simulation, SimulationConfig};

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

fn load_config(path: Option<String>) -> Result<SimulationConfig> {
    let Some(path) = path else {
        return Ok(SimulationConfig::default());
    };

    let text =
        fs::read_to_string(&path).with_context(|| format!("failed to read config file {path}"))?;
    let config = SimulationConfig::from_json_str(&text)
        .with_context(|| format!("failed to parse config file {path}"))?;
    info!(%path, "Loaded configuration");
    Ok(config)
}

fn main() -> Result<()> {
    init_tracing();

    let config = load_config(std::env::args().nth(1))?;
    let simulation = Simulation::new(config).context("failed to build the simulation")?;
    app::install_simulation(simulation);

    nannou::app(app::model).update(app::update).run();
    Ok(())
}
