/*
 * Pheromone Module
 *
 * This module defines the pheromone lattice. It is 3x finer than the soil
 * lattice on every axis and stores three independent channels per cell:
 * - Wander: laid by searching agents, followed home by returning agents
 * - Food: laid by returning agents, followed out by searching agents
 * - Root: permanent trail marker produced when Food accumulates
 *
 * One tick of the field runs reaction, diffusion and evaporation in that
 * order, each over the occupied cells only. Agents deposit afterwards.
 */

use std::collections::BTreeMap;
use std::ops::{Index, IndexMut};

use nannou::glam::{IVec3, Vec3};

use crate::config::SimulationConfig;
use crate::error::SimResult;
use crate::soil::SoilField;
use crate::voxel_grid::VoxelGrid;

pub const NUMBER_OF_PHEROMONES: usize = 3;

/// Values at or below this collapse to zero during evaporation.
pub const EVAPORATION_EPSILON: f32 = 0.02;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PheromoneKind {
    Wander,
    Food,
    Root,
}

impl PheromoneKind {
    pub const ALL: [PheromoneKind; NUMBER_OF_PHEROMONES] =
        [PheromoneKind::Wander, PheromoneKind::Food, PheromoneKind::Root];

    #[inline]
    pub const fn index(self) -> usize {
        match self {
            PheromoneKind::Wander => 0,
            PheromoneKind::Food => 1,
            PheromoneKind::Root => 2,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            PheromoneKind::Wander => "wander",
            PheromoneKind::Food => "food",
            PheromoneKind::Root => "root",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PheromoneVoxel {
    pub channels: [f32; NUMBER_OF_PHEROMONES],
}

impl PheromoneVoxel {
    pub fn is_empty(&self) -> bool {
        self.channels.iter().all(|&value| value == 0.0)
    }
}

impl Index<PheromoneKind> for PheromoneVoxel {
    type Output = f32;

    fn index(&self, kind: PheromoneKind) -> &f32 {
        &self.channels[kind.index()]
    }
}

impl IndexMut<PheromoneKind> for PheromoneVoxel {
    fn index_mut(&mut self, kind: PheromoneKind) -> &mut f32 {
        &mut self.channels[kind.index()]
    }
}

#[derive(Debug, Clone)]
pub struct PheromoneField {
    grid: VoxelGrid<PheromoneVoxel>,
}

impl PheromoneField {
    pub fn new(dimensions: [usize; 3]) -> Self {
        Self {
            grid: VoxelGrid::new(dimensions[0], dimensions[1], dimensions[2]),
        }
    }

    pub fn grid(&self) -> &VoxelGrid<PheromoneVoxel> {
        &self.grid
    }

    pub(crate) fn grid_mut(&mut self) -> &mut VoxelGrid<PheromoneVoxel> {
        &mut self.grid
    }

    pub fn dimensions(&self) -> IVec3 {
        self.grid.dimensions()
    }

    #[inline]
    pub fn contains(&self, cell: IVec3) -> bool {
        self.grid.contains(cell)
    }

    /// Pheromone cell containing a continuous position.
    #[inline]
    pub fn cell_of(position: Vec3) -> IVec3 {
        let cell = position.floor();
        IVec3::new(cell.x as i32, cell.y as i32, cell.z as i32)
    }

    /// Read one channel without touching occupancy. Outside the lattice reads 0.
    pub fn channel(&self, cell: IVec3, kind: PheromoneKind) -> f32 {
        self.grid.get_pos(cell).map_or(0.0, |voxel| voxel[kind])
    }

    pub fn voxel(&self, cell: IVec3) -> Option<PheromoneVoxel> {
        self.grid.get_pos(cell).copied()
    }

    pub fn deposit(&mut self, cell: IVec3, kind: PheromoneKind, amount: f32) -> SimResult<()> {
        let voxel = self.grid.at_pos(cell)?;
        voxel[kind] += amount;
        Ok(())
    }

    /// Overwrite a whole cell, marking it occupied.
    pub fn set(&mut self, cell: IVec3, voxel: PheromoneVoxel) -> SimResult<()> {
        *self.grid.at_pos(cell)? = voxel;
        Ok(())
    }

    /// Sum of one channel over the occupied cells.
    pub fn total(&self, kind: PheromoneKind) -> f32 {
        self.grid
            .occupied()
            .iter()
            .filter_map(|&index| self.grid.get(index))
            .map(|voxel| voxel[kind])
            .sum()
    }

    pub fn occupied_count(&self) -> usize {
        self.grid.occupied().len()
    }

    pub fn clear(&mut self) {
        self.grid.clear();
    }

    /// Consolidate Food into Root wherever Food exceeds the threshold.
    /// Returns how many cells reacted.
    pub fn react(&mut self, threshold: f32) -> SimResult<usize> {
        let mut reactions = 0;
        for index in self.grid.occupied_snapshot() {
            let voxel = self.grid.at(index as i64)?;
            if voxel[PheromoneKind::Food] > threshold {
                voxel[PheromoneKind::Root] += 1.0;
                voxel[PheromoneKind::Food] -= threshold;
                reactions += 1;
            }
        }
        Ok(reactions)
    }

    /// Spread every channel into the open 26-connected neighbors.
    ///
    /// All contributions are accumulated into a fresh map before any cell is
    /// written, so the result does not depend on iteration order.
    pub fn diffuse(&mut self, soil: &SoilField, config: &SimulationConfig) -> SimResult<()> {
        let rates: Vec<f32> = PheromoneKind::ALL
            .iter()
            .map(|&kind| config.channel(kind).diffusion_rate)
            .collect();

        let mut next: BTreeMap<usize, PheromoneVoxel> = BTreeMap::new();
        let mut neighbours: Vec<usize> = Vec::with_capacity(26);

        for &index in self.grid.occupied() {
            let origin = self.grid.index_to_pos(index);
            let original = match self.grid.get(index) {
                Some(voxel) => *voxel,
                None => continue,
            };

            neighbours.clear();
            for dz in -1..=1 {
                for dy in -1..=1 {
                    for dx in -1..=1 {
                        // Skip the center cell
                        if dx == 0 && dy == 0 && dz == 0 {
                            continue;
                        }

                        let neighbour = origin + IVec3::new(dx, dy, dz);
                        if !self.grid.contains(neighbour) {
                            continue;
                        }

                        if soil.is_solid(SoilField::cell_under(neighbour))? {
                            continue;
                        }

                        neighbours.push(self.grid.pos_to_index(neighbour) as usize);
                    }
                }
            }

            let retained = next.entry(index).or_default();
            if neighbours.is_empty() {
                for channel in 0..NUMBER_OF_PHEROMONES {
                    retained.channels[channel] += original.channels[channel];
                }
                continue;
            }

            let mut share = PheromoneVoxel::default();
            for (channel, &rate) in rates.iter().enumerate() {
                retained.channels[channel] += original.channels[channel] * (1.0 - rate);
                share.channels[channel] =
                    original.channels[channel] * rate / neighbours.len() as f32;
            }

            // Nothing moves, so the neighbours stay untouched
            if share.is_empty() {
                continue;
            }

            for &neighbour in &neighbours {
                let target = next.entry(neighbour).or_default();
                for channel in 0..NUMBER_OF_PHEROMONES {
                    target.channels[channel] += share.channels[channel];
                }
            }
        }

        for (index, voxel) in next {
            *self.grid.at(index as i64)? = voxel;
        }
        Ok(())
    }

    /// Logarithmic decay of every channel. Values at or below the floor
    /// collapse to zero on every channel, Root included. Cells left fully
    /// empty drop out of the occupancy set once the pass is done.
    pub fn evaporate(&mut self, config: &SimulationConfig) -> SimResult<()> {
        let mut emptied = Vec::new();

        for index in self.grid.occupied_snapshot() {
            let voxel = self.grid.at(index as i64)?;
            // A zero rate keeps values above the floor since ln(1) = 0
            for kind in PheromoneKind::ALL {
                voxel[kind] = evaporate_value(voxel[kind], config.channel(kind).evaporation_rate);
            }
            if voxel.is_empty() {
                emptied.push(index);
            }
        }

        for index in emptied {
            self.grid.mark_unoccupied(index);
        }
        Ok(())
    }
}

#[inline]
pub fn evaporate_value(value: f32, rate: f32) -> f32 {
    if value > EVAPORATION_EPSILON {
        (value - (rate * value + 1.0).ln()).max(0.0)
    } else {
        0.0
    }
}
