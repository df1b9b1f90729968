/*
 * Voxel Ants Simulation - Module Definitions
 *
 * This file defines the module structure for the ant foraging simulation.
 * The simulation kernel (grid, fields, agents, orchestrator, exports) has no
 * windowing dependency beyond the math types; the viewer modules at the
 * bottom drive it through the render-data exports.
 */

// Re-export key components for easier access
pub use agent::{Agent, AgentPopulation, AgentState, MoveOutcome, NestBox};
pub use config::SimulationConfig;
pub use error::{SimError, SimResult};
pub use export::{ChannelFilter, ClipBox, RenderSettings, SoilRenderMode};
pub use pheromone::{PheromoneField, PheromoneKind};
pub use simulation::{SharedWorld, Simulation, SimulationCommand, SimulationWorker, TickClock};
pub use soil::SoilField;
pub use stats::{DebugInfo, TickSummary};
pub use voxel_grid::VoxelGrid;

// Simulation kernel
pub mod agent;
pub mod config;
pub mod error;
pub mod export;
pub mod pheromone;
pub mod simulation;
pub mod soil;
pub mod stats;
pub mod voxel_grid;

// Viewer
pub mod app;
pub mod camera;
pub mod input;
pub mod renderer;
pub mod ui;

// Constants
/// Pheromone cells per soil cell along each axis.
pub const PHEROMONE_SCALE: i32 = 3;
