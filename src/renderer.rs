/*
 * Renderer Module
 *
 * This module draws the render records exported for the current frame.
 * Every record is an instance transform of a unit cube; the renderer
 * projects the cube center through the orbit camera and draws a square
 * sized by the perspective scale. Instances are sorted back to front so
 * nearer cells cover farther ones.
 */

use std::cmp::Ordering;

use nannou::glam::Mat4;
use nannou::prelude::*;

use crate::app::{FrameRecords, Model};
use crate::camera::Camera;
use crate::export::SoilRenderMode;
use crate::ui;

struct Instance {
    screen: Vec2,
    depth: f32,
    size: f32,
    color: Rgba,
}

fn cube_center(transform: &Mat4) -> Vec3 {
    transform.transform_point3(Vec3::new(0.5, 0.5, 0.5))
}

fn cube_size(transform: &Mat4) -> f32 {
    transform.x_axis.truncate().length()
}

fn soil_color(nutrient: f32, mode: SoilRenderMode) -> Rgba {
    match mode {
        SoilRenderMode::Soil => {
            let n = nutrient.clamp(0.0, 1.0);
            rgba(0.25 + 0.45 * n, 0.15 + 0.3 * n, 0.08 + 0.1 * n, 0.9)
        }
        SoilRenderMode::Root => rgba(0.95, 0.85, 0.6, 0.4),
    }
}

fn collect_instances(
    records: &FrameRecords,
    mode: SoilRenderMode,
    camera: &Camera,
    window_rect: Rect,
) -> Vec<Instance> {
    let view = camera.view_matrix();
    let mut instances = Vec::with_capacity(
        records.soil.len() + records.pheromones.len() + records.agents.len(),
    );

    let mut push = |transform: &Mat4, color: Rgba| {
        if let Some(projected) = camera.project(&view, cube_center(transform), window_rect) {
            instances.push(Instance {
                screen: projected.screen,
                depth: projected.depth,
                size: cube_size(transform) * projected.scale,
                color,
            });
        }
    };

    for record in &records.soil {
        push(&record.transform, soil_color(record.nutrient, mode));
    }
    for record in &records.pheromones {
        let c = record.color.min(Vec3::ONE);
        push(&record.transform, rgba(c.x, c.y, c.z, 0.6));
    }
    for record in &records.agents {
        let c = record.color;
        push(&record.transform, rgba(c.x, c.y, c.z, 1.0));
    }

    // Painter's order: farthest first
    instances.sort_by(|a, b| b.depth.partial_cmp(&a.depth).unwrap_or(Ordering::Equal));
    instances
}

// Outline of the soil block so an empty export still shows where the lattice is
fn draw_bounds(draw: &Draw, model: &Model, window_rect: Rect) {
    let [x, y, z] = model.config.soil_dimensions;
    let max = Vec3::new(x as f32, y as f32, z as f32);
    let corner = |i: usize| {
        Vec3::new(
            if i & 1 == 0 { 0.0 } else { max.x },
            if i & 2 == 0 { 0.0 } else { max.y },
            if i & 4 == 0 { 0.0 } else { max.z },
        )
    };

    let view = model.camera.view_matrix();
    for a in 0..8 {
        for bit in [1, 2, 4] {
            let b = a | bit;
            if a == b {
                continue;
            }
            let start = model.camera.project(&view, corner(a), window_rect);
            let end = model.camera.project(&view, corner(b), window_rect);
            if let (Some(start), Some(end)) = (start, end) {
                draw.line()
                    .start(start.screen)
                    .end(end.screen)
                    .weight(1.0)
                    .color(rgba(0.3, 0.3, 0.3, 1.0));
            }
        }
    }
}

// Render the model
pub fn view(app: &App, model: &Model, frame: Frame) {
    let draw = app.draw();
    draw.background().color(BLACK);

    let window_rect = app.window_rect();
    draw_bounds(&draw, model, window_rect);

    let instances = collect_instances(
        &model.records,
        model.settings.soil_mode,
        &model.camera,
        window_rect,
    );
    for instance in &instances {
        draw.rect()
            .xy(instance.screen)
            .w_h(instance.size, instance.size)
            .color(instance.color);
    }

    if model.panel.show_debug {
        // Ring around the first agent so one individual can be followed
        if let Some(first) = model.records.agents.first() {
            let anchor = cube_center(&first.transform);
            let view = model.camera.view_matrix();
            if let Some(projected) = model.camera.project(&view, anchor, window_rect) {
                draw.ellipse()
                    .xy(projected.screen)
                    .radius(4.0)
                    .no_fill()
                    .stroke(YELLOW)
                    .stroke_weight(1.0);
            }
        }
        ui::draw_debug_info(&draw, &model.debug_info, window_rect);
    }

    if let Err(err) = draw.to_frame(app, &frame) {
        tracing::error!(?err, "Failed to draw frame");
    }
    if let Err(err) = model.egui.draw_to_frame(&frame) {
        tracing::error!(?err, "Failed to draw control panel");
    }
}
