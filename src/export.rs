/*
 * Render Export Module
 *
 * This module turns the simulation state into flat render records that a
 * renderer can draw as instances. Exports are pulled once per frame while
 * the caller holds the field lock, and return owned records so the lock can
 * be released before any drawing happens.
 *
 * Culling applied here:
 * - Soil cells whose 6 face neighbours share their solidity are interior and skipped
 * - Records outside the optional clip box are skipped
 * - Pheromone cells whose filtered color is zero are dropped
 */

use std::collections::BTreeMap;

use nannou::glam::{IVec3, Mat4, Vec3};

use crate::agent::{AgentPopulation, AgentState};
use crate::pheromone::{PheromoneField, PheromoneKind, NUMBER_OF_PHEROMONES};
use crate::soil::SoilField;
use crate::PHEROMONE_SCALE;

/// Axis-aligned box in world (soil cell) units, bounds inclusive.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClipBox {
    pub min: Vec3,
    pub max: Vec3,
}

impl ClipBox {
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, point: Vec3) -> bool {
        point.x >= self.min.x
            && point.x <= self.max.x
            && point.y >= self.min.y
            && point.y <= self.max.y
            && point.z >= self.min.z
            && point.z <= self.max.z
    }
}

fn passes_clip(clip: Option<&ClipBox>, point: Vec3) -> bool {
    clip.map_or(true, |clip| clip.contains(point))
}

/// Which pheromone channels contribute to the exported color.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelFilter {
    pub enabled: [bool; NUMBER_OF_PHEROMONES],
}

impl Default for ChannelFilter {
    fn default() -> Self {
        Self::all()
    }
}

impl ChannelFilter {
    pub fn all() -> Self {
        Self {
            enabled: [true; NUMBER_OF_PHEROMONES],
        }
    }

    pub fn only(kinds: &[PheromoneKind]) -> Self {
        let mut enabled = [false; NUMBER_OF_PHEROMONES];
        for kind in kinds {
            enabled[kind.index()] = true;
        }
        Self { enabled }
    }

    pub fn includes(&self, kind: PheromoneKind) -> bool {
        self.enabled[kind.index()]
    }

    pub fn set(&mut self, kind: PheromoneKind, enabled: bool) {
        self.enabled[kind.index()] = enabled;
    }
}

/// Unit color each channel contributes.
pub fn basis_color(kind: PheromoneKind) -> Vec3 {
    match kind {
        PheromoneKind::Wander => Vec3::new(0.0, 1.0, 0.0),
        PheromoneKind::Food => Vec3::new(0.0, 0.0, 1.0),
        PheromoneKind::Root => Vec3::new(1.0, 0.0, 0.0),
    }
}

pub fn agent_color(state: AgentState) -> Vec3 {
    match state {
        AgentState::Returning => Vec3::new(0.0, 0.0, 1.0),
        AgentState::Searching => Vec3::new(1.0, 0.0, 0.0),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SoilRenderMode {
    /// Draw the remaining solid soil.
    Soil,
    /// Draw the carved cavities.
    Root,
}

impl SoilRenderMode {
    pub fn is_soil_condition(self) -> bool {
        self == SoilRenderMode::Soil
    }
}

// Viewer-side options, never read by the simulation
#[derive(Debug, Clone)]
pub struct RenderSettings {
    pub nutrient_threshold: f32,
    pub soil_mode: SoilRenderMode,
    pub render_soil: bool,
    pub render_agents: bool,
    pub render_pheromones: bool,
    pub channel_filter: ChannelFilter,
    pub soil_clip: Option<ClipBox>,
    pub pheromone_clip: Option<ClipBox>,
    pub agent_clip: Option<ClipBox>,
    pub dedup_agents: bool,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            nutrient_threshold: 0.0,
            soil_mode: SoilRenderMode::Soil,
            render_soil: true,
            render_agents: true,
            render_pheromones: false,
            channel_filter: ChannelFilter::all(),
            soil_clip: None,
            pheromone_clip: None,
            agent_clip: None,
            dedup_agents: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SoilRenderRecord {
    pub transform: Mat4,
    pub nutrient: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PheromoneRenderRecord {
    pub transform: Mat4,
    pub color: Vec3,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AgentRenderRecord {
    pub transform: Mat4,
    pub color: Vec3,
}

/// Translation component of an instance transform.
#[inline]
pub fn translation_of(transform: &Mat4) -> Vec3 {
    transform.w_axis.truncate()
}

// Pheromone-lattice position to world units, centered on the soil cell it sits in
fn lattice_translation(position: Vec3) -> Vec3 {
    (position - Vec3::ONE) / PHEROMONE_SCALE as f32
}

fn lattice_transform(position: Vec3) -> Mat4 {
    Mat4::from_translation(lattice_translation(position))
        * Mat4::from_scale(Vec3::splat(1.0 / PHEROMONE_SCALE as f32))
}

impl SoilField {
    /// Boundary-exposed cells whose solidity equals `is_soil_condition`.
    ///
    /// Solid cells below `nutrient_threshold` are left out; cavities are
    /// exported regardless of the threshold.
    pub fn export_soil_render_data(
        &self,
        is_soil_condition: bool,
        nutrient_threshold: f32,
        clip: Option<&ClipBox>,
    ) -> Vec<SoilRenderRecord> {
        let grid = self.grid();
        let faces = [
            IVec3::new(-1, 0, 0),
            IVec3::new(1, 0, 0),
            IVec3::new(0, -1, 0),
            IVec3::new(0, 1, 0),
            IVec3::new(0, 0, -1),
            IVec3::new(0, 0, 1),
        ];

        let mut records = Vec::new();
        for index in 0..grid.capacity() {
            let voxel = match grid.get(index) {
                Some(voxel) => voxel,
                None => continue,
            };
            if voxel.is_soil != is_soil_condition {
                continue;
            }
            if is_soil_condition && voxel.nutrient < nutrient_threshold {
                continue;
            }

            let cell = grid.index_to_pos(index);
            let matching = faces
                .iter()
                .filter_map(|&offset| grid.get_pos(cell + offset))
                .filter(|neighbour| neighbour.is_soil == is_soil_condition)
                .count();
            if matching == faces.len() {
                continue;
            }

            let translation = Vec3::new(cell.x as f32, cell.y as f32, cell.z as f32);
            if !passes_clip(clip, translation) {
                continue;
            }

            records.push(SoilRenderRecord {
                transform: Mat4::from_translation(translation),
                nutrient: voxel.nutrient,
            });
        }
        records
    }
}

impl PheromoneField {
    /// Colored records for every occupied cell passing the filter and clip box.
    ///
    /// Each channel is normalized by its largest value among the emitted
    /// cells. Cells that are zero on every channel are dropped from the
    /// occupancy set as a side effect.
    pub fn export_pheromone_render_data(
        &mut self,
        filter: &ChannelFilter,
        clip: Option<&ClipBox>,
    ) -> Vec<PheromoneRenderRecord> {
        let mut emptied = Vec::new();
        let mut candidates: Vec<(Vec3, [f32; NUMBER_OF_PHEROMONES])> = Vec::new();
        let mut maxima = [0.0_f32; NUMBER_OF_PHEROMONES];

        let grid = self.grid();
        for &index in grid.occupied() {
            let voxel = match grid.get(index) {
                Some(voxel) => *voxel,
                None => continue,
            };
            if voxel.is_empty() {
                emptied.push(index);
                continue;
            }

            let cell = grid.index_to_pos(index);
            let position = Vec3::new(cell.x as f32, cell.y as f32, cell.z as f32);
            if !passes_clip(clip, lattice_translation(position)) {
                continue;
            }

            let mut values = [0.0_f32; NUMBER_OF_PHEROMONES];
            for kind in PheromoneKind::ALL {
                if filter.includes(kind) {
                    values[kind.index()] = voxel[kind];
                }
            }
            for (max, &value) in maxima.iter_mut().zip(values.iter()) {
                *max = max.max(value);
            }
            candidates.push((position, values));
        }

        for index in emptied {
            self.grid_mut().mark_unoccupied(index);
        }

        candidates
            .into_iter()
            .filter_map(|(position, values)| {
                let mut color = Vec3::ZERO;
                for kind in PheromoneKind::ALL {
                    let max = maxima[kind.index()];
                    // A channel with no signal stays at zero instead of dividing by it
                    if max > 0.0 {
                        color += basis_color(kind) * (values[kind.index()] / max);
                    }
                }
                if color == Vec3::ZERO {
                    return None;
                }
                Some(PheromoneRenderRecord {
                    transform: lattice_transform(position),
                    color,
                })
            })
            .collect()
    }
}

impl AgentPopulation {
    /// One record per agent, or one per occupied pheromone cell when `dedup`
    /// is set. A deduplicated cell shows blue if any agent in it is returning.
    pub fn export_agent_render_data(
        &self,
        dedup: bool,
        clip: Option<&ClipBox>,
    ) -> Vec<AgentRenderRecord> {
        if !dedup {
            return self
                .iter()
                .filter(|agent| passes_clip(clip, lattice_translation(agent.position)))
                .map(|agent| AgentRenderRecord {
                    transform: lattice_transform(agent.position),
                    color: agent_color(agent.state),
                })
                .collect();
        }

        let mut cells: BTreeMap<[i32; 3], AgentState> = BTreeMap::new();
        for agent in self.iter() {
            let cell: [i32; 3] = PheromoneField::cell_of(agent.position).into();
            let state = cells.entry(cell).or_insert(agent.state);
            if agent.state == AgentState::Returning {
                *state = AgentState::Returning;
            }
        }

        cells
            .into_iter()
            .map(|(cell, state)| {
                (
                    Vec3::new(cell[0] as f32, cell[1] as f32, cell[2] as f32),
                    state,
                )
            })
            .filter(|(position, _)| passes_clip(clip, lattice_translation(*position)))
            .map(|(position, state)| AgentRenderRecord {
                transform: lattice_transform(position),
                color: agent_color(state),
            })
            .collect()
    }
}
