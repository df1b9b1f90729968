/*
 * Camera Module
 *
 * This module defines an orbit Camera around the soil block. Dragging with
 * the mouse orbits, the wheel moves the camera closer or further away. The
 * camera projects world points (soil cell units) into window coordinates so
 * the renderer can draw every instance as a screen-space quad.
 */

use nannou::glam::Mat4;
use nannou::prelude::*;

// Closest depth still drawn in front of the camera
const NEAR_PLANE: f32 = 0.1;

#[derive(Debug, Clone, Copy)]
pub struct Projected {
    pub screen: Vec2,
    pub depth: f32,
    /// Pixels per world unit at this depth.
    pub scale: f32,
}

pub struct Camera {
    pub target: Vec3,
    pub yaw: f32,
    pub pitch: f32,
    pub distance: f32,
    pub min_distance: f32,
    pub max_distance: f32,
    pub focal_length: f32,
    pub is_dragging: bool,
    pub last_cursor_pos: Vec2,
}

impl Camera {
    pub fn looking_at(target: Vec3, distance: f32) -> Self {
        Self {
            target,
            yaw: 0.6,
            pitch: 0.5,
            distance,
            min_distance: 2.0,
            max_distance: distance * 4.0,
            focal_length: 1.2,
            is_dragging: false,
            last_cursor_pos: Vec2::ZERO,
        }
    }

    pub fn eye(&self) -> Vec3 {
        let (sin_yaw, cos_yaw) = self.yaw.sin_cos();
        let (sin_pitch, cos_pitch) = self.pitch.sin_cos();
        self.target + Vec3::new(cos_pitch * sin_yaw, sin_pitch, cos_pitch * cos_yaw) * self.distance
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.eye(), self.target, Vec3::new(0.0, 1.0, 0.0))
    }

    // Convert a point from world space to screen space, None when behind the camera
    pub fn project(&self, view: &Mat4, point: Vec3, window_rect: Rect) -> Option<Projected> {
        let in_view = view.transform_point3(point);
        let depth = -in_view.z;
        if depth <= NEAR_PLANE {
            return None;
        }

        let scale = self.focal_length * window_rect.h() / depth;
        Some(Projected {
            screen: window_rect.xy() + vec2(in_view.x, in_view.y) * scale,
            depth,
            scale,
        })
    }

    // Handle mouse wheel events for zooming
    pub fn zoom(&mut self, scroll_delta: Vec2) {
        let zoom_factor = 1.0 - scroll_delta.y * 0.1;
        self.distance = (self.distance * zoom_factor).clamp(self.min_distance, self.max_distance);
    }

    pub fn start_drag(&mut self, position: Vec2) {
        self.last_cursor_pos = position;
        self.is_dragging = true;
    }

    // Orbit while dragging
    pub fn drag(&mut self, position: Vec2) {
        if self.is_dragging {
            let delta = position - self.last_cursor_pos;

            if delta.length_squared() > 0.0 {
                self.yaw -= delta.x * 0.01;
                self.pitch = (self.pitch - delta.y * 0.01).clamp(-1.5, 1.5);
                self.last_cursor_pos = position;
            }
        }
    }

    pub fn end_drag(&mut self) {
        self.is_dragging = false;
    }

    pub fn reset(&mut self) {
        *self = Self::looking_at(self.target, self.max_distance / 4.0);
    }
}
