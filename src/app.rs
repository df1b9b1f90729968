/*
 * Application Module
 *
 * This module defines the viewer model and its per-frame update. The
 * simulation itself runs on the SimulationWorker thread; each frame the
 * viewer:
 * - forwards panel commands (play, pause, step, reset, step time) to the worker
 * - pulls render records from each field, holding one field lock at a time
 * - hands the records to the renderer
 */

use std::sync::Mutex;

use nannou::prelude::*;
use nannou_egui::Egui;
use tracing::{error, warn};

use crate::camera::Camera;
use crate::config::SimulationConfig;
use crate::error::SimResult;
use crate::export::{AgentRenderRecord, PheromoneRenderRecord, RenderSettings, SoilRenderRecord};
use crate::input;
use crate::renderer;
use crate::simulation::{Simulation, SimulationWorker};
use crate::stats::DebugInfo;
use crate::ui::{self, PanelState};

// Simulation built by the binary before the window exists
static PENDING_SIMULATION: Mutex<Option<Simulation>> = Mutex::new(None);

/// Hand a ready simulation to the next `model` call.
pub fn install_simulation(simulation: Simulation) {
    match PENDING_SIMULATION.lock() {
        Ok(mut slot) => *slot = Some(simulation),
        Err(poisoned) => *poisoned.into_inner() = Some(simulation),
    }
}

fn take_simulation() -> Option<Simulation> {
    match PENDING_SIMULATION.lock() {
        Ok(mut slot) => slot.take(),
        Err(poisoned) => poisoned.into_inner().take(),
    }
}

#[derive(Default)]
pub struct FrameRecords {
    pub soil: Vec<SoilRenderRecord>,
    pub pheromones: Vec<PheromoneRenderRecord>,
    pub agents: Vec<AgentRenderRecord>,
}

// Main model for the application
pub struct Model {
    pub worker: SimulationWorker,
    pub config: SimulationConfig,
    pub settings: RenderSettings,
    pub panel: PanelState,
    pub egui: Egui,
    pub debug_info: DebugInfo,
    pub camera: Camera,
    pub mouse_position: Vec2,
    pub records: FrameRecords,
}

fn default_camera(config: &SimulationConfig) -> Camera {
    let [x, y, z] = config.soil_dimensions;
    let size = vec3(x as f32, y as f32, z as f32);
    Camera::looking_at(size * 0.5, size.length() * 1.2)
}

// Initialize the model
pub fn model(app: &App) -> Model {
    let monitor = app.primary_monitor().expect("Failed to get primary monitor");
    let monitor_size = monitor.size();

    // Calculate window size based on monitor size (80% of monitor size)
    let window_width = monitor_size.width as f32 * 0.8;
    let window_height = monitor_size.height as f32 * 0.8;

    let window_id = app
        .new_window()
        .title("Voxel Ants")
        .size(window_width as u32, window_height as u32)
        .view(renderer::view)
        .mouse_moved(input::mouse_moved)
        .mouse_pressed(input::mouse_pressed)
        .mouse_released(input::mouse_released)
        .mouse_wheel(input::mouse_wheel)
        .key_pressed(input::key_pressed)
        .raw_event(input::raw_window_event)
        .build()
        .expect("Failed to build the main window");

    let window = app.window(window_id).expect("Main window closed during setup");
    let egui = Egui::from_window(&window);

    let simulation = match take_simulation() {
        Some(simulation) => simulation,
        None => Simulation::new(SimulationConfig::default())
            .expect("Default configuration must be valid"),
    };
    let config = simulation.config().clone();
    let worker = SimulationWorker::spawn(simulation).expect("Failed to start the simulation");

    Model {
        worker,
        panel: PanelState::new(&config),
        camera: default_camera(&config),
        config,
        settings: RenderSettings::default(),
        egui,
        debug_info: DebugInfo::default(),
        mouse_position: Vec2::ZERO,
        records: FrameRecords::default(),
    }
}

// Pull fresh render records, one field lock at a time
fn refresh_records(model: &mut Model) -> SimResult<()> {
    let world = model.worker.world();
    let settings = &model.settings;

    model.records.soil = if settings.render_soil {
        world.lock_soil()?.export_soil_render_data(
            settings.soil_mode.is_soil_condition(),
            settings.nutrient_threshold,
            settings.soil_clip.as_ref(),
        )
    } else {
        Vec::new()
    };

    model.records.pheromones = if settings.render_pheromones {
        world
            .lock_pheromones()?
            .export_pheromone_render_data(&settings.channel_filter, settings.pheromone_clip.as_ref())
    } else {
        Vec::new()
    };

    model.records.agents = if settings.render_agents {
        world
            .lock_agents()?
            .export_agent_render_data(settings.dedup_agents, settings.agent_clip.as_ref())
    } else {
        Vec::new()
    };

    Ok(())
}

// Update the model
pub fn update(app: &App, model: &mut Model, update: Update) {
    model.debug_info.fps = app.fps();
    model.debug_info.frame_time = update.since_last;

    let response = ui::update_ui(
        &mut model.egui,
        &mut model.panel,
        &mut model.settings,
        &model.config,
        &model.debug_info,
    );

    for command in response.commands {
        if model.worker.send(command).is_err() {
            warn!(?command, "Simulation worker is gone, command dropped");
        }
    }
    if response.reset_view {
        model.camera.reset();
    }

    if let Err(err) = refresh_records(model) {
        error!(%err, "Failed to export render data");
    }

    model.debug_info.last_tick = model.worker.latest_summary();
    model.debug_info.soil_records = model.records.soil.len();
    model.debug_info.pheromone_records = model.records.pheromones.len();
    model.debug_info.agent_records = model.records.agents.len();
}
