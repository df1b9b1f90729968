/*
 * Input Module
 *
 * This module handles user input events for the viewer window.
 *
 * Features:
 * - Camera orbit with mouse drag
 * - Camera zoom with mouse wheel
 * - Keyboard shortcuts: P toggles the panel, Space toggles play, S steps,
 *   R resets the model
 * - Forwarding raw events to egui
 */

use nannou::prelude::*;
use nannou::winit::event::{MouseButton, MouseScrollDelta, TouchPhase};
use tracing::warn;

use crate::app::Model;
use crate::simulation::SimulationCommand;

// Mouse moved event handler
pub fn mouse_moved(_app: &App, model: &mut Model, pos: Point2) {
    let new_pos = Vec2::new(pos.x, pos.y);

    if model.camera.is_dragging {
        model.camera.drag(new_pos);
    }

    // Always update the stored mouse position
    model.mouse_position = new_pos;
}

// Mouse pressed event handler
pub fn mouse_pressed(_app: &App, model: &mut Model, button: MouseButton) {
    if button == MouseButton::Left {
        // Clicks on the panel never start an orbit
        if !model.egui.ctx().is_pointer_over_area() {
            model.camera.start_drag(model.mouse_position);
        }
    }
}

// Mouse released event handler
pub fn mouse_released(_app: &App, model: &mut Model, button: MouseButton) {
    if button == MouseButton::Left {
        model.camera.end_drag();
    }
}

// Mouse wheel event handler for zooming
pub fn mouse_wheel(_app: &App, model: &mut Model, delta: MouseScrollDelta, _phase: TouchPhase) {
    if model.egui.ctx().is_pointer_over_area() {
        return;
    }
    match delta {
        MouseScrollDelta::LineDelta(x, y) => {
            model.camera.zoom(vec2(x, y));
        }
        MouseScrollDelta::PixelDelta(pos) => {
            model.camera.zoom(vec2(pos.x as f32, pos.y as f32) * 0.01);
        }
    }
}

// Keyboard shortcuts mirroring the panel buttons
pub fn key_pressed(_app: &App, model: &mut Model, key: Key) {
    let command = match key {
        Key::P => {
            model.panel.show_panel = !model.panel.show_panel;
            None
        }
        Key::Space => {
            model.panel.running = !model.panel.running;
            Some(if model.panel.running {
                SimulationCommand::Play
            } else {
                SimulationCommand::Pause
            })
        }
        Key::S => Some(SimulationCommand::Step),
        Key::R => Some(SimulationCommand::Reset),
        _ => None,
    };

    if let Some(command) = command {
        if model.worker.send(command).is_err() {
            warn!(?command, "Simulation worker is gone, command dropped");
        }
    }
}

// Handle raw window events for egui
pub fn raw_window_event(_app: &App, model: &mut Model, event: &nannou::winit::event::WindowEvent) {
    model.egui.handle_raw_event(event);
}
