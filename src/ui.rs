/*
 * UI Module
 *
 * This module builds the control panel with nannou_egui and draws the debug
 * overlay. The panel never touches the simulation directly: playback changes
 * come back as SimulationCommands for the worker, render options are written
 * into RenderSettings.
 */

use nannou::glam::Vec3;
use nannou_egui::{egui, Egui};

use crate::config::SimulationConfig;
use crate::export::{ClipBox, RenderSettings, SoilRenderMode};
use crate::pheromone::PheromoneKind;
use crate::simulation::SimulationCommand;
use crate::stats::DebugInfo;

// Panel-local state that is not a render setting
pub struct PanelState {
    pub show_panel: bool,
    pub running: bool,
    pub step_time: f32,
    pub show_debug: bool,
    pub cutaway: bool,
    pub cutaway_height: f32,
}

impl PanelState {
    pub fn new(config: &SimulationConfig) -> Self {
        Self {
            show_panel: true,
            running: false,
            step_time: config.step_time,
            show_debug: false,
            cutaway: false,
            cutaway_height: config.soil_dimensions[1] as f32,
        }
    }
}

#[derive(Debug, Default)]
pub struct UiResponse {
    pub commands: Vec<SimulationCommand>,
    pub reset_view: bool,
}

/// Horizontal cut through every field at `height`, in soil cell units.
pub fn cutaway_clip(config: &SimulationConfig, height: f32) -> ClipBox {
    let [x, _, z] = config.soil_dimensions;
    ClipBox::new(
        Vec3::new(-1.0, -1.0, -1.0),
        Vec3::new(x as f32, height, z as f32),
    )
}

// Update the UI and collect the commands for the simulation worker
pub fn update_ui(
    egui: &mut Egui,
    panel: &mut PanelState,
    settings: &mut RenderSettings,
    config: &SimulationConfig,
    debug_info: &DebugInfo,
) -> UiResponse {
    let mut response = UiResponse::default();
    let ctx = egui.begin_frame();

    if !panel.show_panel {
        return response;
    }

    egui::Window::new("Simulation Controls")
        .default_pos([10.0, 10.0])
        .show(&ctx, |ui| {
            ui.label(if panel.running { "running" } else { "idle" });
            if ui.checkbox(&mut panel.running, "Run").changed() {
                response.commands.push(if panel.running {
                    SimulationCommand::Play
                } else {
                    SimulationCommand::Pause
                });
            }
            if ui.button("Reset Model").clicked() {
                response.commands.push(SimulationCommand::Reset);
            }
            if ui.button("Step").clicked() {
                response.commands.push(SimulationCommand::Step);
            }
            let step_slider =
                egui::Slider::new(&mut panel.step_time, SimulationConfig::get_step_time_range())
                    .text("Step time");
            if ui.add(step_slider).changed() {
                response
                    .commands
                    .push(SimulationCommand::SetStepTime(panel.step_time));
            }

            ui.collapsing("Visualization", |ui| {
                ui.add(
                    egui::Slider::new(&mut settings.nutrient_threshold, 0.0..=1.0)
                        .text("Nutrient Threshold"),
                );
                ui.horizontal(|ui| {
                    ui.radio_value(&mut settings.soil_mode, SoilRenderMode::Soil, "soil");
                    ui.radio_value(&mut settings.soil_mode, SoilRenderMode::Root, "root");
                });
                ui.checkbox(&mut settings.render_soil, "Render soil");
                ui.checkbox(&mut settings.render_agents, "Render agents");
                ui.checkbox(&mut settings.render_pheromones, "Render pheromones");
                ui.checkbox(&mut settings.dedup_agents, "One agent per cell");
            });

            ui.collapsing("Pheromone Channels", |ui| {
                for kind in PheromoneKind::ALL {
                    let mut enabled = settings.channel_filter.includes(kind);
                    if ui.checkbox(&mut enabled, kind.name()).changed() {
                        settings.channel_filter.set(kind, enabled);
                    }
                }
            });

            ui.collapsing("Cutaway", |ui| {
                ui.checkbox(&mut panel.cutaway, "Clip above height");
                let max_height = config.soil_dimensions[1] as f32;
                ui.add(
                    egui::Slider::new(&mut panel.cutaway_height, 0.0..=max_height).text("Height"),
                );
            });

            ui.separator();
            if ui.button("Reset view").clicked() {
                response.reset_view = true;
            }
            ui.checkbox(&mut panel.show_debug, "Show Debug Info");

            ui.separator();
            ui.label(format!(
                "Application average {:.3} ms/frame ({:.1} FPS)",
                debug_info.frame_time.as_secs_f64() * 1000.0,
                debug_info.fps
            ));
        });

    let clip = panel
        .cutaway
        .then(|| cutaway_clip(config, panel.cutaway_height));
    settings.soil_clip = clip;
    settings.pheromone_clip = clip;
    settings.agent_clip = clip;

    response
}

// Draw debug information on the screen
pub fn draw_debug_info(draw: &nannou::Draw, debug_info: &DebugInfo, window_rect: nannou::geom::Rect) {
    let mut lines = debug_info.tick_lines();
    lines.push(format!("FPS: {:.1}", debug_info.fps));
    lines.push(format!("Soil records: {}", debug_info.soil_records));
    lines.push(format!("Pheromone records: {}", debug_info.pheromone_records));
    lines.push(format!("Agent records: {}", debug_info.agent_records));

    // Background panel in the top-right corner
    let margin = 20.0;
    let line_height = 20.0;
    let panel_width = 220.0;
    let panel_height = line_height * lines.len() as f32 + margin;
    let panel_x = window_rect.right() - panel_width / 2.0;
    let panel_y = window_rect.top() - panel_height / 2.0;

    draw.rect()
        .x_y(panel_x, panel_y)
        .w_h(panel_width, panel_height)
        .color(nannou::color::rgba(0.0, 0.0, 0.0, 0.7));

    let text_x = window_rect.right() - panel_width + margin;
    let text_y = window_rect.top() - margin;
    for (i, text) in lines.iter().enumerate() {
        let y = text_y - (i as f32 * line_height);

        // Position the text with a fixed offset from the left edge of the panel
        draw.text(text)
            .x_y(text_x + 70.0, y)
            .color(nannou::color::WHITE)
            .font_size(14);
    }
}
