/*
 * Soil Module
 *
 * This module defines the soil lattice: one SoilVoxel per cell holding the
 * nutrient left in the cell and whether the cell is still solid. Solid cells
 * block agent movement and pheromone diffusion. A cell that is depleted to
 * zero nutrient, or carved out as part of the nest, becomes a permanent
 * cavity.
 */

use nannou::glam::{IVec3, Vec3};
use rand::Rng;
use tracing::debug;

use crate::config::SimulationConfig;
use crate::error::SimResult;
use crate::voxel_grid::VoxelGrid;
use crate::PHEROMONE_SCALE;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SoilVoxel {
    pub nutrient: f32,
    pub is_soil: bool,
}

impl Default for SoilVoxel {
    fn default() -> Self {
        Self {
            nutrient: 0.0,
            is_soil: true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SoilField {
    grid: VoxelGrid<SoilVoxel>,
}

impl SoilField {
    /// A fully solid field with no nutrient.
    pub fn new(dimensions: [usize; 3]) -> Self {
        Self {
            grid: VoxelGrid::new(dimensions[0], dimensions[1], dimensions[2]),
        }
    }

    /// A fully solid field with the same nutrient in every cell.
    pub fn filled(dimensions: [usize; 3], nutrient: f32) -> Self {
        let mut field = Self::new(dimensions);
        for index in 0..field.grid.capacity() {
            if let Ok(voxel) = field.grid.at(index as i64) {
                voxel.nutrient = nutrient;
            }
        }
        field
    }

    /// Build the soil from random nutrient sources and carve the nest cavity.
    pub fn generate<R: Rng>(config: &SimulationConfig, rng: &mut R) -> SimResult<Self> {
        let mut field = Self::new(config.soil_dimensions);
        let dims = field.dimensions();

        let sources: Vec<Vec3> = (0..config.source_count)
            .map(|_| {
                Vec3::new(
                    rng.gen_range(0..dims.x) as f32,
                    rng.gen_range(0..dims.y) as f32,
                    rng.gen_range(0..dims.z) as f32,
                )
            })
            .collect();

        for z in 0..dims.z {
            for y in 0..dims.y {
                for x in 0..dims.x {
                    let cell = Vec3::new(x as f32, y as f32, z as f32);
                    let nearest = sources
                        .iter()
                        .map(|source| cell.distance(*source))
                        .fold(f32::INFINITY, f32::min);

                    let falloff = config.falloff_scale / (nearest + config.falloff_scale);
                    let voxel = field.grid.at_pos(IVec3::new(x, y, z))?;
                    voxel.nutrient = falloff.clamp(config.nutrient_min, config.nutrient_max);
                }
            }
        }

        field.carve_nest(config.nest_cavity_half_width, config.nest_cavity_depth)?;

        debug!(
            sources = sources.len(),
            cavities = field.count_cavities(),
            "Generated soil field"
        );
        Ok(field)
    }

    // Carve a box around the horizontal center of the top layers
    fn carve_nest(&mut self, half_width: i32, depth: i32) -> SimResult<()> {
        let dims = self.dimensions();
        let center_x = dims.x / 2;
        let center_z = dims.z / 2;

        for x in (center_x - half_width)..=(center_x + half_width) {
            for y in (dims.y - depth)..dims.y {
                for z in (center_z - half_width)..=(center_z + half_width) {
                    let cell = IVec3::new(x, y, z);
                    if !self.contains(cell) {
                        continue;
                    }
                    self.carve(cell)?;
                }
            }
        }
        Ok(())
    }

    pub fn grid(&self) -> &VoxelGrid<SoilVoxel> {
        &self.grid
    }

    pub fn dimensions(&self) -> IVec3 {
        self.grid.dimensions()
    }

    #[inline]
    pub fn contains(&self, cell: IVec3) -> bool {
        self.grid.contains(cell)
    }

    /// Soil cell containing a position given in pheromone-lattice units.
    #[inline]
    pub fn cell_of(position: Vec3) -> IVec3 {
        let scaled = (position / PHEROMONE_SCALE as f32).floor();
        IVec3::new(scaled.x as i32, scaled.y as i32, scaled.z as i32)
    }

    /// Soil cell directly under a pheromone cell.
    #[inline]
    pub fn cell_under(pheromone_cell: IVec3) -> IVec3 {
        IVec3::new(
            pheromone_cell.x.div_euclid(PHEROMONE_SCALE),
            pheromone_cell.y.div_euclid(PHEROMONE_SCALE),
            pheromone_cell.z.div_euclid(PHEROMONE_SCALE),
        )
    }

    pub fn voxel(&self, cell: IVec3) -> SimResult<SoilVoxel> {
        self.grid.read_pos(cell).copied()
    }

    pub fn nutrient(&self, cell: IVec3) -> SimResult<f32> {
        Ok(self.voxel(cell)?.nutrient)
    }

    pub fn is_open(&self, cell: IVec3) -> SimResult<bool> {
        Ok(!self.voxel(cell)?.is_soil)
    }

    pub fn is_solid(&self, cell: IVec3) -> SimResult<bool> {
        Ok(self.voxel(cell)?.is_soil)
    }

    /// Turn a cell into a permanent cavity.
    pub fn carve(&mut self, cell: IVec3) -> SimResult<()> {
        let voxel = self.grid.at_pos(cell)?;
        voxel.is_soil = false;
        voxel.nutrient = 0.0;
        Ok(())
    }

    /// Remove nutrient from a solid cell. Returns true only on the call that
    /// turns the cell into a cavity; cavities are left untouched.
    pub fn deplete(&mut self, cell: IVec3, amount: f32) -> SimResult<bool> {
        let voxel = self.grid.at_pos(cell)?;
        if !voxel.is_soil {
            return Ok(false);
        }

        voxel.nutrient -= amount;
        if voxel.nutrient <= 0.0 {
            voxel.nutrient = 0.0;
            voxel.is_soil = false;
            return Ok(true);
        }
        Ok(false)
    }

    pub fn count_cavities(&self) -> usize {
        (0..self.grid.capacity())
            .filter_map(|index| self.grid.get(index))
            .filter(|voxel| !voxel.is_soil)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SimError;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_deplete_until_cavity() {
        let mut soil = SoilField::filled([4, 4, 4], 2.5);
        let cell = IVec3::new(1, 2, 3);

        assert_eq!(soil.deplete(cell, 1.0), Ok(false));
        assert_eq!(soil.deplete(cell, 1.0), Ok(false));
        assert!(soil.is_solid(cell).unwrap());

        assert_eq!(soil.deplete(cell, 1.0), Ok(true));
        let voxel = soil.voxel(cell).unwrap();
        assert_eq!(voxel.nutrient, 0.0);
        assert!(!voxel.is_soil);
    }

    #[test]
    fn test_depletion_is_final() {
        let mut soil = SoilField::filled([2, 2, 2], 1.0);
        let cell = IVec3::new(0, 0, 0);

        assert_eq!(soil.deplete(cell, 1.0), Ok(true));
        for _ in 0..5 {
            assert_eq!(soil.deplete(cell, 1.0), Ok(false));
            assert!(soil.is_open(cell).unwrap());
            assert_eq!(soil.nutrient(cell).unwrap(), 0.0);
        }
    }

    #[test]
    fn test_out_of_range_queries_fail() {
        let mut soil = SoilField::filled([2, 2, 2], 1.0);

        assert!(matches!(
            soil.is_open(IVec3::new(2, 0, 0)),
            Err(SimError::OutOfBounds { .. })
        ));
        assert!(soil.deplete(IVec3::new(0, -1, 0), 1.0).is_err());
    }

    #[test]
    fn test_generate_carves_nest_and_bounds_nutrient() {
        let config = SimulationConfig {
            soil_dimensions: [12, 6, 12],
            ..SimulationConfig::default()
        };
        let mut rng = StdRng::seed_from_u64(11);
        let soil = SoilField::generate(&config, &mut rng).unwrap();

        // The top two layers around the center are open
        let top = IVec3::new(6, 5, 6);
        let below_top = IVec3::new(6, 4, 6);
        assert!(soil.is_open(top).unwrap());
        assert!(soil.is_open(below_top).unwrap());
        assert_eq!(soil.nutrient(top).unwrap(), 0.0);

        // The rest of the field stays solid with bounded nutrient
        assert!(soil.is_solid(IVec3::new(6, 0, 6)).unwrap());
        assert!(soil.is_solid(IVec3::new(0, 5, 0)).unwrap());
        for index in 0..soil.grid().capacity() {
            let voxel = soil.grid().get(index).unwrap();
            if voxel.is_soil {
                assert!(voxel.nutrient > 0.0 && voxel.nutrient <= config.nutrient_max);
            }
        }

        // 9 x 2 x 9 nest box
        assert_eq!(soil.count_cavities(), 162);
    }

    #[test]
    fn test_cell_of_scales_down() {
        assert_eq!(SoilField::cell_of(Vec3::new(0.0, 2.9, 3.0)), IVec3::new(0, 0, 1));
        assert_eq!(SoilField::cell_of(Vec3::new(8.99, 6.5, 11.2)), IVec3::new(2, 2, 3));
        assert_eq!(SoilField::cell_under(IVec3::new(0, 2, 3)), IVec3::new(0, 0, 1));
        assert_eq!(SoilField::cell_under(IVec3::new(8, 9, 5)), IVec3::new(2, 3, 1));
    }
}
