/*
 * Voxel Grid Module
 *
 * This module defines the VoxelGrid container shared by the soil and
 * pheromone fields. Storage is a dense, fixed-size buffer addressed with
 * x varying fastest, then y, then z. Alongside the buffer the grid keeps an
 * ordered occupancy set of the cells that have been touched, so sparse
 * algorithms (pheromone diffusion, evaporation, export) only visit active
 * cells instead of the whole volume.
 *
 * Reading and touching are separate operations:
 * - `get` / `get_pos` read without side effects
 * - `at` / `at_pos` are bounds-checked and mark the cell occupied
 */

use std::collections::BTreeSet;

use nannou::glam::IVec3;

use crate::error::{SimError, SimResult};

#[derive(Debug, Clone)]
pub struct VoxelGrid<T> {
    x_len: i32,
    y_len: i32,
    z_len: i32,
    data: Vec<T>,
    occupied: BTreeSet<usize>,
}

impl<T: Default + Clone> VoxelGrid<T> {
    pub fn new(x_len: usize, y_len: usize, z_len: usize) -> Self {
        let capacity = x_len * y_len * z_len;
        Self {
            x_len: x_len as i32,
            y_len: y_len as i32,
            z_len: z_len as i32,
            data: vec![T::default(); capacity],
            occupied: BTreeSet::new(),
        }
    }

    // Reset every cell to its default value and forget all occupancy
    pub fn clear(&mut self) {
        for cell in &mut self.data {
            *cell = T::default();
        }
        self.occupied.clear();
    }
}

impl<T> VoxelGrid<T> {
    pub fn dimensions(&self) -> IVec3 {
        IVec3::new(self.x_len, self.y_len, self.z_len)
    }

    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn contains(&self, pos: IVec3) -> bool {
        pos.x >= 0
            && pos.x < self.x_len
            && pos.y >= 0
            && pos.y < self.y_len
            && pos.z >= 0
            && pos.z < self.z_len
    }

    /// Linear index of a coordinate. Pure: no bounds check, no touch.
    #[inline]
    pub fn pos_to_index(&self, pos: IVec3) -> i64 {
        let x_len = self.x_len as i64;
        let y_len = self.y_len as i64;
        pos.x as i64 + pos.y as i64 * x_len + pos.z as i64 * x_len * y_len
    }

    /// Inverse of `pos_to_index` for any index it produced inside the extents.
    #[inline]
    pub fn index_to_pos(&self, index: usize) -> IVec3 {
        let x_len = self.x_len as usize;
        let layer = x_len * self.y_len as usize;
        let z = index / layer;
        let rest = index % layer;
        IVec3::new((rest % x_len) as i32, (rest / x_len) as i32, z as i32)
    }

    fn checked_index(&self, index: i64) -> SimResult<usize> {
        if index < 0 || index as u64 >= self.data.len() as u64 {
            return Err(SimError::OutOfBounds {
                index,
                capacity: self.data.len(),
            });
        }
        Ok(index as usize)
    }

    fn checked_pos(&self, pos: IVec3) -> SimResult<usize> {
        let index = self.pos_to_index(pos);
        if !self.contains(pos) {
            return Err(SimError::OutOfBounds {
                index,
                capacity: self.data.len(),
            });
        }
        self.checked_index(index)
    }

    /// Touching access by linear index.
    pub fn at(&mut self, index: i64) -> SimResult<&mut T> {
        let index = self.checked_index(index)?;
        self.occupied.insert(index);
        Ok(&mut self.data[index])
    }

    /// Touching access by coordinate.
    pub fn at_pos(&mut self, pos: IVec3) -> SimResult<&mut T> {
        let index = self.checked_pos(pos)?;
        self.occupied.insert(index);
        Ok(&mut self.data[index])
    }

    /// Read without marking the cell occupied.
    pub fn get(&self, index: usize) -> Option<&T> {
        self.data.get(index)
    }

    pub fn get_pos(&self, pos: IVec3) -> Option<&T> {
        if !self.contains(pos) {
            return None;
        }
        self.data.get(self.pos_to_index(pos) as usize)
    }

    /// Bounds-checked read that does not touch occupancy.
    pub fn read_pos(&self, pos: IVec3) -> SimResult<&T> {
        let index = self.checked_pos(pos)?;
        Ok(&self.data[index])
    }

    pub fn mark_unoccupied(&mut self, index: usize) {
        self.occupied.remove(&index);
    }

    pub fn mark_unoccupied_pos(&mut self, pos: IVec3) {
        if self.contains(pos) {
            let index = self.pos_to_index(pos) as usize;
            self.occupied.remove(&index);
        }
    }

    pub fn is_occupied(&self, index: usize) -> bool {
        self.occupied.contains(&index)
    }

    pub fn occupied(&self) -> &BTreeSet<usize> {
        &self.occupied
    }

    // Copy of the occupancy set, safe to iterate while the grid is mutated
    pub fn occupied_snapshot(&self) -> Vec<usize> {
        self.occupied.iter().copied().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_round_trip() {
        let grid: VoxelGrid<f32> = VoxelGrid::new(5, 4, 3);

        for z in 0..3 {
            for y in 0..4 {
                for x in 0..5 {
                    let pos = IVec3::new(x, y, z);
                    let index = grid.pos_to_index(pos);
                    assert_eq!(grid.index_to_pos(index as usize), pos);
                }
            }
        }
    }

    #[test]
    fn test_linear_layout_is_x_fastest() {
        let grid: VoxelGrid<u8> = VoxelGrid::new(4, 4, 4);

        assert_eq!(grid.pos_to_index(IVec3::new(0, 0, 0)), 0);
        assert_eq!(grid.pos_to_index(IVec3::new(1, 0, 0)), 1);
        assert_eq!(grid.pos_to_index(IVec3::new(0, 1, 0)), 4);
        assert_eq!(grid.pos_to_index(IVec3::new(0, 0, 1)), 16);
        assert_eq!(grid.pos_to_index(IVec3::new(3, 3, 3)), 63);
    }

    #[test]
    fn test_at_marks_occupied() {
        let mut grid: VoxelGrid<f32> = VoxelGrid::new(4, 4, 4);

        *grid.at(10).unwrap() = 2.5;
        assert!(grid.occupied().contains(&10));

        // Reading through `at` still touches the cell
        let _ = grid.at_pos(IVec3::new(1, 2, 3)).unwrap();
        let index = grid.pos_to_index(IVec3::new(1, 2, 3)) as usize;
        assert!(grid.is_occupied(index));
    }

    #[test]
    fn test_get_does_not_touch() {
        let mut grid: VoxelGrid<f32> = VoxelGrid::new(4, 4, 4);
        *grid.at(5).unwrap() = 1.0;
        grid.mark_unoccupied(5);

        assert_eq!(grid.get(5), Some(&1.0));
        assert_eq!(grid.get_pos(IVec3::new(1, 1, 0)), Some(&1.0));
        assert!(grid.occupied().is_empty());
    }

    #[test]
    fn test_mark_unoccupied_is_idempotent() {
        let mut grid: VoxelGrid<f32> = VoxelGrid::new(4, 4, 4);
        grid.at(7).unwrap();

        grid.mark_unoccupied(7);
        assert!(!grid.is_occupied(7));

        grid.mark_unoccupied(7);
        assert!(!grid.is_occupied(7));
        assert!(grid.occupied().is_empty());
    }

    #[test]
    fn test_out_of_bounds() {
        let mut grid: VoxelGrid<f32> = VoxelGrid::new(4, 4, 4);

        assert_eq!(
            grid.at(-1).unwrap_err(),
            SimError::OutOfBounds { index: -1, capacity: 64 }
        );
        assert!(matches!(grid.at(64), Err(SimError::OutOfBounds { index: 64, .. })));

        // A negative coordinate whose linear index would alias a valid cell
        assert!(grid.at_pos(IVec3::new(-1, 1, 0)).is_err());
        assert!(grid.at_pos(IVec3::new(4, 0, 0)).is_err());
        assert!(grid.get_pos(IVec3::new(0, 0, 4)).is_none());

        // Failed accesses leave occupancy untouched
        assert!(grid.occupied().is_empty());
    }

    #[test]
    fn test_clear_resets_cells_and_occupancy() {
        let mut grid: VoxelGrid<f32> = VoxelGrid::new(2, 2, 2);
        *grid.at(3).unwrap() = 9.0;

        grid.clear();

        assert_eq!(grid.get(3), Some(&0.0));
        assert!(grid.occupied().is_empty());
        assert_eq!(grid.capacity(), 8);
        assert_eq!(grid.dimensions(), IVec3::new(2, 2, 2));
    }
}
