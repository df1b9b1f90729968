/*
 * Simulation Configuration Module
 *
 * This module defines the SimulationConfig struct holding every parameter
 * the simulation kernel reads: lattice extents, population size, tick
 * cadence, per-channel pheromone rates, sensing and movement parameters,
 * soil generation and nest geometry. The config is built once, validated,
 * and passed by reference into the simulation; nothing in the kernel reads
 * process-wide mutable parameters.
 *
 * Render-side options (filters, clip boxes, toggles) live in
 * `export::RenderSettings` since they belong to the viewer, not the model.
 */

use serde::{Deserialize, Serialize};
use std::f32::consts::PI;

use crate::error::{SimError, SimResult};
use crate::pheromone::{PheromoneKind, NUMBER_OF_PHEROMONES};
use crate::PHEROMONE_SCALE;

/// Static per-channel pheromone properties.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChannelProperties {
    pub evaporation_rate: f32,
    pub diffusion_rate: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Soil lattice extents (x, y, z). The pheromone lattice is 3x finer.
    pub soil_dimensions: [usize; 3],
    pub agent_count: usize,
    /// Seconds of wall time per logical tick.
    pub step_time: f32,

    // Pheromone field, indexed by PheromoneKind
    pub channels: [ChannelProperties; NUMBER_OF_PHEROMONES],
    pub reaction_threshold: f32,

    // Sensing
    pub sensor_angle: f32,
    pub sensor_distance: f32,
    pub number_radial_samples: usize,
    pub turn_speed: f32,
    pub move_speed: f32,
    pub random_movement_angle: f32,
    pub nutrient_weight: f32,
    pub food_weight: f32,
    pub wander_weight: f32,

    // Interaction with the fields
    pub deposit_amount: f32,
    pub depletion_amount: f32,

    // Soil generation
    pub source_count: usize,
    pub falloff_scale: f32,
    pub nutrient_min: f32,
    pub nutrient_max: f32,
    /// Half-width of the carved nest cavity, in soil cells.
    pub nest_cavity_half_width: i32,
    /// Number of top soil layers carved for the nest cavity.
    pub nest_cavity_depth: i32,

    /// Half-width of the nest box agents return to, in pheromone units.
    pub nest_half_width: f32,
    /// Depth of the nest box below the top of the lattice, in pheromone units.
    pub nest_depth: f32,

    // Performance settings
    pub enable_parallel: bool,
    pub rng_seed: Option<u64>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        let mut channels = [ChannelProperties {
            evaporation_rate: 0.05,
            diffusion_rate: 0.3,
        }; NUMBER_OF_PHEROMONES];
        // Root marks established trails: it never diffuses or evaporates
        channels[PheromoneKind::Root.index()] = ChannelProperties {
            evaporation_rate: 0.0,
            diffusion_rate: 0.0,
        };

        Self {
            soil_dimensions: [24, 16, 24],
            agent_count: 200,
            step_time: 0.1,
            channels,
            reaction_threshold: 5.0,
            sensor_angle: PI / 8.0,
            sensor_distance: 2.0,
            number_radial_samples: 8,
            turn_speed: 0.3,
            move_speed: 1.0,
            random_movement_angle: PI / 6.0,
            nutrient_weight: 1.0,
            food_weight: 1.0,
            wander_weight: 1.0,
            deposit_amount: 10.0,
            depletion_amount: 1.0,
            source_count: 5,
            falloff_scale: 50.0,
            nutrient_min: 0.0,
            nutrient_max: 1.0,
            nest_cavity_half_width: 4,
            nest_cavity_depth: 2,
            nest_half_width: 2.0,
            nest_depth: 2.0,
            enable_parallel: true,
            rng_seed: None,
        }
    }
}

impl SimulationConfig {
    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn channel(&self, kind: PheromoneKind) -> ChannelProperties {
        self.channels[kind.index()]
    }

    /// Pheromone lattice extents, 3x the soil extents on every axis.
    pub fn pheromone_dimensions(&self) -> [usize; 3] {
        let scale = PHEROMONE_SCALE as usize;
        [
            self.soil_dimensions[0] * scale,
            self.soil_dimensions[1] * scale,
            self.soil_dimensions[2] * scale,
        ]
    }

    pub fn validate(&self) -> SimResult<()> {
        if self.soil_dimensions.iter().any(|&len| len == 0) {
            return Err(SimError::InvalidConfig("soil dimensions must be non-zero"));
        }
        // Checked so an oversized lattice is rejected instead of overflowing
        let scale = PHEROMONE_SCALE as usize;
        let cells = self
            .soil_dimensions
            .iter()
            .try_fold(1usize, |cells, &len| {
                len.checked_mul(scale).and_then(|len| cells.checked_mul(len))
            });
        match cells {
            Some(cells) if cells <= i32::MAX as usize => {}
            _ => {
                return Err(SimError::InvalidConfig(
                    "pheromone lattice is too large to address",
                ))
            }
        }
        if !(self.step_time >= 0.0) {
            return Err(SimError::InvalidConfig("step_time must be non-negative"));
        }
        for channel in &self.channels {
            if !(0.0..=1.0).contains(&channel.diffusion_rate) {
                return Err(SimError::InvalidConfig("diffusion rates must lie in [0, 1]"));
            }
            if !(0.0..=1.0).contains(&channel.evaporation_rate) {
                return Err(SimError::InvalidConfig("evaporation rates must lie in [0, 1]"));
            }
        }
        if self.reaction_threshold <= 0.0 {
            return Err(SimError::InvalidConfig("reaction_threshold must be positive"));
        }
        if self.number_radial_samples == 0 {
            return Err(SimError::InvalidConfig("number_radial_samples must be non-zero"));
        }
        if self.sensor_distance <= 0.0 {
            return Err(SimError::InvalidConfig("sensor_distance must be positive"));
        }
        if self.move_speed <= 0.0 {
            return Err(SimError::InvalidConfig("move_speed must be positive"));
        }
        if self.turn_speed < 0.0 || self.random_movement_angle < 0.0 {
            return Err(SimError::InvalidConfig("turn and wander angles must be non-negative"));
        }
        if self.random_movement_angle >= PI / 2.0 {
            return Err(SimError::InvalidConfig("random_movement_angle must be below pi/2"));
        }
        if self.deposit_amount < 0.0 || self.depletion_amount <= 0.0 {
            return Err(SimError::InvalidConfig(
                "deposit_amount must be non-negative and depletion_amount positive",
            ));
        }
        if self.source_count == 0 {
            return Err(SimError::InvalidConfig("source_count must be non-zero"));
        }
        if self.falloff_scale <= 0.0 {
            return Err(SimError::InvalidConfig("falloff_scale must be positive"));
        }
        if self.nutrient_min < 0.0 || self.nutrient_min > self.nutrient_max {
            return Err(SimError::InvalidConfig(
                "nutrient bounds must satisfy 0 <= nutrient_min <= nutrient_max",
            ));
        }
        if self.nest_cavity_half_width < 0 || self.nest_cavity_depth < 0 {
            return Err(SimError::InvalidConfig("nest cavity extents must be non-negative"));
        }
        if self.nest_half_width < 0.0 || self.nest_depth < 0.0 {
            return Err(SimError::InvalidConfig("nest box extents must be non-negative"));
        }
        Ok(())
    }

    // Get parameter ranges for UI sliders
    pub fn get_step_time_range() -> std::ops::RangeInclusive<f32> {
        0.0..=5.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = SimulationConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.pheromone_dimensions(), [72, 48, 72]);
        assert_eq!(config.channel(PheromoneKind::Root).diffusion_rate, 0.0);
        assert_eq!(config.channel(PheromoneKind::Root).evaporation_rate, 0.0);
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let config = SimulationConfig {
            soil_dimensions: [0, 4, 4],
            ..SimulationConfig::default()
        };
        assert!(matches!(config.validate(), Err(SimError::InvalidConfig(_))));

        let mut config = SimulationConfig::default();
        config.channels[0].diffusion_rate = 1.5;
        assert!(config.validate().is_err());

        let config = SimulationConfig {
            number_radial_samples: 0,
            ..SimulationConfig::default()
        };
        assert!(config.validate().is_err());

        let config = SimulationConfig {
            nutrient_min: 2.0,
            nutrient_max: 1.0,
            ..SimulationConfig::default()
        };
        assert!(config.validate().is_err());

        // Large enough to overflow the cell count
        let config = SimulationConfig::from_json_str(
            r#"{ "soil_dimensions": [10000000, 10000000, 10000000] }"#,
        )
        .unwrap();
        assert_eq!(
            config.validate(),
            Err(SimError::InvalidConfig("pheromone lattice is too large to address"))
        );

        let config = SimulationConfig {
            soil_dimensions: [usize::MAX, 1, 1],
            ..SimulationConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config =
            SimulationConfig::from_json_str(r#"{ "agent_count": 3, "rng_seed": 7 }"#).unwrap();
        assert_eq!(config.agent_count, 3);
        assert_eq!(config.rng_seed, Some(7));
        assert_eq!(config.number_radial_samples, 8);
        assert!(config.validate().is_ok());
    }
}
