/*
 * Agent Module
 *
 * This module defines the Agent struct and the per-tick foraging behavior.
 * Each agent alternates between two states:
 * 1. Searching: follow nutrient and Food pheromone, lay Wander pheromone
 * 2. Returning: follow Wander pheromone home, lay Food pheromone
 *
 * A tick runs in two passes over the whole population. The first pass senses
 * and picks a new heading for every agent against an unchanged field; the
 * second pass moves the agents one at a time, bouncing off the lattice
 * boundary and solid soil, eating into the soil they hit and depositing
 * pheromone along the way.
 */

use std::f32::consts::TAU;

use nannou::glam::Vec3;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use tracing::warn;

use crate::config::SimulationConfig;
use crate::error::SimResult;
use crate::pheromone::{PheromoneField, PheromoneKind};
use crate::soil::SoilField;

/// Upper bound on collision retries before an agent gives up moving for a tick.
pub const MAX_BOUNCE_RETRIES: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentState {
    Searching,
    Returning,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveOutcome {
    Moved,
    /// Every retry collided; the agent stayed in place this tick.
    Stuck,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoveReport {
    pub outcome: MoveOutcome,
    pub cavity_opened: bool,
}

// Orthonormal sensing frame around the current heading
#[derive(Debug, Clone, Copy)]
pub struct Frame {
    pub front: Vec3,
    pub right: Vec3,
    pub up: Vec3,
}

impl Frame {
    pub fn from_direction(front: Vec3) -> Self {
        // Cross with the world axis least aligned with front so the product never degenerates
        let abs = front.abs();
        let axis = if abs.x <= abs.y && abs.x <= abs.z {
            Vec3::new(1.0, 0.0, 0.0)
        } else if abs.y <= abs.z {
            Vec3::new(0.0, 1.0, 0.0)
        } else {
            Vec3::new(0.0, 0.0, 1.0)
        };

        let right = front.cross(axis).normalize();
        let up = right.cross(front).normalize();
        Self { front, right, up }
    }
}

/// Axis-aligned box agents treat as home, in pheromone-lattice units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NestBox {
    pub min: Vec3,
    pub max: Vec3,
}

impl NestBox {
    pub fn from_config(config: &SimulationConfig) -> Self {
        let dims = config.pheromone_dimensions();
        let center_x = (dims[0] / 2) as f32;
        let center_z = (dims[2] / 2) as f32;
        let top = dims[1] as f32;

        Self {
            min: Vec3::new(
                center_x - config.nest_half_width,
                top - config.nest_depth,
                center_z - config.nest_half_width,
            ),
            max: Vec3::new(
                center_x + config.nest_half_width,
                top,
                center_z + config.nest_half_width,
            ),
        }
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    pub fn contains(&self, position: Vec3) -> bool {
        position.x >= self.min.x
            && position.x <= self.max.x
            && position.y >= self.min.y
            && position.y <= self.max.y
            && position.z >= self.min.z
            && position.z <= self.max.z
    }
}

// Largest continuous coordinate on each axis that still maps into the lattice
fn lattice_max(pheromones: &PheromoneField) -> [f32; 3] {
    let dims = pheromones.dimensions();
    [
        (dims.x - 1) as f32,
        (dims.y - 1) as f32,
        (dims.z - 1) as f32,
    ]
}

fn in_lattice(position: Vec3, max: &[f32; 3]) -> bool {
    let p: [f32; 3] = position.into();
    p.iter().zip(max.iter()).all(|(&v, &m)| v >= 0.0 && v <= m)
}

#[derive(Debug, Clone)]
pub struct Agent {
    pub state: AgentState,
    pub direction: Vec3,
    pub position: Vec3,
}

impl Agent {
    /// A zero or non-finite heading falls back to the spawn heading (down).
    pub fn new(position: Vec3, direction: Vec3) -> Self {
        let length = direction.length();
        let direction = if length.is_finite() && length > f32::EPSILON {
            direction / length
        } else {
            Vec3::new(0.0, -1.0, 0.0)
        };
        Self {
            state: AgentState::Searching,
            direction,
            position,
        }
    }

    pub fn with_state(mut self, state: AgentState) -> Self {
        self.state = state;
        self
    }

    // Sample points on the sensing cone plus the straight-ahead point
    pub fn sample_points(&self, config: &SimulationConfig) -> Vec<Vec3> {
        let frame = Frame::from_direction(self.direction);
        let count = config.number_radial_samples;
        let (sin_angle, cos_angle) = config.sensor_angle.sin_cos();

        let mut points = Vec::with_capacity(count + 1);
        for i in 0..count {
            let theta = TAU * i as f32 / count as f32;
            let radial = frame.up * theta.sin() + frame.right * theta.cos();
            let offset = (radial * sin_angle + frame.front * cos_angle).normalize();
            points.push(self.position + offset * config.sensor_distance);
        }
        points.push(self.position + frame.front * config.sensor_distance);
        points
    }

    fn weight_at(
        &self,
        sample: Vec3,
        soil: &SoilField,
        pheromones: &PheromoneField,
        config: &SimulationConfig,
    ) -> SimResult<f32> {
        let cell = PheromoneField::cell_of(sample);
        let weight = match self.state {
            AgentState::Searching => {
                let nutrient = soil.nutrient(SoilField::cell_of(sample))?;
                nutrient * config.nutrient_weight
                    + pheromones.channel(cell, PheromoneKind::Food) * config.food_weight
            }
            AgentState::Returning => {
                pheromones.channel(cell, PheromoneKind::Wander) * config.wander_weight
            }
        };
        Ok(weight)
    }

    /// Every in-bounds sample sharing the highest weight, with that weight.
    pub fn sense(
        &self,
        soil: &SoilField,
        pheromones: &PheromoneField,
        config: &SimulationConfig,
    ) -> SimResult<Option<(Vec<Vec3>, f32)>> {
        let max = lattice_max(pheromones);
        let mut best: Vec<Vec3> = Vec::new();
        let mut best_weight = f32::NEG_INFINITY;

        for sample in self.sample_points(config) {
            if !in_lattice(sample, &max) {
                continue;
            }
            let weight = self.weight_at(sample, soil, pheromones, config)?;
            if weight > best_weight {
                best.clear();
                best.push(sample);
                best_weight = weight;
            } else if weight == best_weight {
                best.push(sample);
            }
        }

        if best.is_empty() {
            return Ok(None);
        }
        Ok(Some((best, best_weight)))
    }

    /// Choose the heading for this tick without mutating anything.
    pub fn decide<R: Rng>(
        &self,
        soil: &SoilField,
        pheromones: &PheromoneField,
        config: &SimulationConfig,
        rng: &mut R,
    ) -> SimResult<Vec3> {
        // Only a positive signal is a gradient worth following
        let target = match self.sense(soil, pheromones, config)? {
            Some((best, weight)) if weight > 0.0 => best.choose(rng).copied(),
            _ => None,
        };

        let direction = match target {
            Some(target) => {
                let offset = target - self.position;
                if offset.length_squared() <= f32::EPSILON {
                    self.direction
                } else {
                    turn_toward(self.direction, offset.normalize(), config.turn_speed)
                }
            }
            None => random_walk(self.direction, config.random_movement_angle, rng),
        };
        Ok(direction)
    }

    /// Bounce, nest check, deposit and commit the move for one tick.
    pub fn advance(
        &mut self,
        soil: &mut SoilField,
        pheromones: &mut PheromoneField,
        config: &SimulationConfig,
        nest: &NestBox,
    ) -> SimResult<MoveReport> {
        let max = lattice_max(pheromones);
        let current_cell: [i32; 3] = SoilField::cell_of(self.position).into();
        let mut cavity_opened = false;
        let mut free = false;

        for _ in 0..MAX_BOUNCE_RETRIES {
            let next: [f32; 3] = (self.position + self.direction * config.move_speed).into();
            let mut direction: [f32; 3] = self.direction.into();

            // Leaving the lattice reflects the offending axes
            let mut out_of_bounds = false;
            for axis in 0..3 {
                if next[axis] < 0.0 || next[axis] > max[axis] {
                    direction[axis] = -direction[axis];
                    out_of_bounds = true;
                }
            }
            if out_of_bounds {
                self.direction = Vec3::from(direction);
                continue;
            }

            let next_cell = SoilField::cell_of(Vec3::from(next));
            if !soil.is_solid(next_cell)? {
                free = true;
                break;
            }

            if self.state == AgentState::Searching {
                cavity_opened |= soil.deplete(next_cell, config.depletion_amount)?;
                self.state = AgentState::Returning;
            }

            let next_cell: [i32; 3] = next_cell.into();
            let mut reflected = false;
            for axis in 0..3 {
                if next_cell[axis] != current_cell[axis] {
                    direction[axis] = -direction[axis];
                    reflected = true;
                }
            }
            self.direction = if reflected {
                Vec3::from(direction)
            } else {
                -self.direction
            };
        }

        if self.state == AgentState::Returning && nest.contains(self.position) {
            self.state = AgentState::Searching;
        }

        let kind = match self.state {
            AgentState::Searching => PheromoneKind::Wander,
            AgentState::Returning => PheromoneKind::Food,
        };
        pheromones.deposit(PheromoneField::cell_of(self.position), kind, config.deposit_amount)?;

        if !free {
            warn!(
                position = ?self.position,
                retries = MAX_BOUNCE_RETRIES,
                "Agent enclosed on every axis, skipping its move"
            );
            return Ok(MoveReport {
                outcome: MoveOutcome::Stuck,
                cavity_opened,
            });
        }

        self.position += self.direction * config.move_speed;
        Ok(MoveReport {
            outcome: MoveOutcome::Moved,
            cavity_opened,
        })
    }
}

/// Rotate `current` toward `desired` by at most `max_angle` radians.
pub fn turn_toward(current: Vec3, desired: Vec3, max_angle: f32) -> Vec3 {
    let angle = current.dot(desired).clamp(-1.0, 1.0).acos();
    if angle <= max_angle {
        return desired;
    }

    let mut axis = current.cross(desired);
    if axis.length_squared() < 1e-12 {
        // Directly behind: any perpendicular axis will do
        axis = Frame::from_direction(current).up;
    }
    let axis = axis.normalize();

    // Rodrigues rotation with the axis perpendicular to `current`
    let (sin, cos) = max_angle.sin_cos();
    (current * cos + axis.cross(current) * sin).normalize()
}

/// Deflect the heading by a random angle of at most `max_angle`.
pub fn random_walk<R: Rng>(current: Vec3, max_angle: f32, rng: &mut R) -> Vec3 {
    let frame = Frame::from_direction(current);
    let phi = rng.gen::<f32>() * TAU;
    let deflection = rng.gen::<f32>() * max_angle;

    let sideways = frame.right * phi.cos() + frame.up * phi.sin();
    (current + sideways * deflection.tan()).normalize()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PopulationReport {
    pub stuck_agents: usize,
    pub cavities_opened: usize,
}

#[derive(Debug, Clone, Default)]
pub struct AgentPopulation {
    pub agents: Vec<Agent>,
}

impl AgentPopulation {
    pub fn new(agents: Vec<Agent>) -> Self {
        Self { agents }
    }

    /// Place `agent_count` agents inside the nest box, heading down.
    pub fn spawn<R: Rng>(config: &SimulationConfig, rng: &mut R) -> Self {
        let nest = NestBox::from_config(config);
        let dims = config.pheromone_dimensions();
        let upper = Vec3::new(
            (dims[0] - 1) as f32,
            (dims[1] - 1) as f32,
            (dims[2] - 1) as f32,
        );
        let lower = nest.min.max(Vec3::ZERO);
        let upper = nest.max.min(upper);

        let agents = (0..config.agent_count)
            .map(|_| {
                let position = Vec3::new(
                    lower.x + rng.gen::<f32>() * (upper.x - lower.x).max(0.0),
                    lower.y + rng.gen::<f32>() * (upper.y - lower.y).max(0.0),
                    lower.z + rng.gen::<f32>() * (upper.z - lower.z).max(0.0),
                );
                Agent::new(position, Vec3::new(0.0, -1.0, 0.0))
            })
            .collect();

        Self { agents }
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Agent> {
        self.agents.iter()
    }

    pub fn count(&self, state: AgentState) -> usize {
        self.agents.iter().filter(|agent| agent.state == state).count()
    }

    /// Run the decide-all then move-all passes for one tick.
    pub fn step<R: Rng>(
        &mut self,
        soil: &mut SoilField,
        pheromones: &mut PheromoneField,
        config: &SimulationConfig,
        rng: &mut R,
    ) -> SimResult<PopulationReport> {
        let tick_seed: u64 = rng.gen();

        // First pass: every heading is decided against the same field state
        let (soil_view, pheromone_view): (&SoilField, &PheromoneField) = (soil, pheromones);
        let decide = |(i, agent): (usize, &Agent)| {
            let mut agent_rng = StdRng::seed_from_u64(agent_seed(tick_seed, i));
            agent.decide(soil_view, pheromone_view, config, &mut agent_rng)
        };
        let directions: Vec<Vec3> = if config.enable_parallel {
            self.agents
                .par_iter()
                .enumerate()
                .map(decide)
                .collect::<SimResult<Vec<Vec3>>>()?
        } else {
            self.agents
                .iter()
                .enumerate()
                .map(decide)
                .collect::<SimResult<Vec<Vec3>>>()?
        };

        for (agent, direction) in self.agents.iter_mut().zip(directions) {
            agent.direction = direction;
        }

        // Second pass: move agents sequentially against the shared fields
        let nest = NestBox::from_config(config);
        let mut report = PopulationReport::default();
        for agent in &mut self.agents {
            let moved = agent.advance(soil, pheromones, config, &nest)?;
            if moved.outcome == MoveOutcome::Stuck {
                report.stuck_agents += 1;
            }
            if moved.cavity_opened {
                report.cavities_opened += 1;
            }
        }

        Ok(report)
    }
}

// Per-agent seed so parallel and sequential sensing draw identical numbers
fn agent_seed(tick_seed: u64, index: usize) -> u64 {
    tick_seed ^ (index as u64 + 1).wrapping_mul(0x9E37_79B9_7F4A_7C15)
}
