/*
 * Statistics Module
 *
 * This module defines the per-tick summary produced by the simulation and the
 * DebugInfo struct the viewer fills in each frame for the control panel.
 *
 * Includes metrics for:
 * - FPS and frame time
 * - Tick counter and population split by state
 * - Cavities opened and agents that could not move
 * - Number of records exported per field
 */

use std::time::Duration;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickSummary {
    pub tick: u64,
    pub searching: usize,
    pub returning: usize,
    pub cavities_opened: usize,
    pub stuck_agents: usize,
    pub occupied_pheromone_cells: usize,
}

// Debug information to display
#[derive(Debug, Clone, Default)]
pub struct DebugInfo {
    pub fps: f32,
    pub frame_time: Duration,
    pub last_tick: Option<TickSummary>,
    pub soil_records: usize,
    pub pheromone_records: usize,
    pub agent_records: usize,
}

impl DebugInfo {
    pub fn tick_lines(&self) -> Vec<String> {
        match &self.last_tick {
            Some(summary) => vec![
                format!("Tick: {}", summary.tick),
                format!("Searching: {}", summary.searching),
                format!("Returning: {}", summary.returning),
                format!("Cavities opened: {}", summary.cavities_opened),
                format!("Stuck agents: {}", summary.stuck_agents),
                format!("Pheromone cells: {}", summary.occupied_pheromone_cells),
            ],
            None => vec!["Tick: -".to_string()],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tick_lines() {
        let mut info = DebugInfo::default();
        assert_eq!(info.tick_lines(), vec!["Tick: -".to_string()]);

        info.last_tick = Some(TickSummary {
            tick: 4,
            searching: 3,
            returning: 1,
            ..TickSummary::default()
        });
        let lines = info.tick_lines();
        assert_eq!(lines.len(), 6);
        assert_eq!(lines[0], "Tick: 4");
        assert_eq!(lines[2], "Returning: 1");
    }
}
