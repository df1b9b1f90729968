use std::thread;
use std::time::{Duration, Instant};

use nannou::glam::{IVec3, Vec3};
use voxel_ants::export::translation_of;
use voxel_ants::{
    Agent, AgentPopulation, AgentState, ChannelFilter, ClipBox, NestBox, PheromoneField,
    PheromoneKind, SimError, Simulation, SimulationCommand, SimulationConfig, SimulationWorker,
    SoilField,
};

fn assert_vec_close(a: Vec3, b: Vec3) {
    assert!((a - b).length() < 1e-4, "{:?} != {:?}", a, b);
}

// A single straight tunnel: cells 0 and 1 open, cells 2 and 3 solid
fn tunnel_config() -> SimulationConfig {
    SimulationConfig {
        soil_dimensions: [4, 1, 1],
        agent_count: 1,
        turn_speed: 0.0,
        random_movement_angle: 0.0,
        move_speed: 3.0,
        nest_half_width: 0.0,
        nest_depth: 0.0,
        nest_cavity_half_width: 0,
        nest_cavity_depth: 0,
        rng_seed: Some(11),
        ..SimulationConfig::default()
    }
}

#[test]
fn searching_agent_eats_into_soil_and_turns_back() {
    let config = tunnel_config();
    let mut soil = SoilField::filled(config.soil_dimensions, 1.0);
    soil.carve(IVec3::new(0, 0, 0)).unwrap();
    soil.carve(IVec3::new(1, 0, 0)).unwrap();
    let pheromones = PheromoneField::new(config.pheromone_dimensions());
    let agents = AgentPopulation::new(vec![Agent::new(
        Vec3::new(4.5, 1.5, 1.5),
        Vec3::new(1.0, 0.0, 0.0),
    )]);

    let mut simulation = Simulation::from_parts(config.clone(), soil, pheromones, agents).unwrap();
    let summary = simulation.step().unwrap();

    assert_eq!(summary.returning, 1);
    assert_eq!(summary.cavities_opened, 1);
    assert_eq!(summary.stuck_agents, 0);

    let world = simulation.world();
    let agents = world.lock_agents().unwrap();
    let agent = agents.iter().next().unwrap();
    assert_eq!(agent.state, AgentState::Returning);
    assert_vec_close(agent.direction, Vec3::new(-1.0, 0.0, 0.0));
    assert_vec_close(agent.position, Vec3::new(1.5, 1.5, 1.5));

    let soil = world.lock_soil().unwrap();
    let eaten = soil.voxel(IVec3::new(2, 0, 0)).unwrap();
    assert!(!eaten.is_soil);
    assert_eq!(eaten.nutrient, 0.0);
    assert!(soil.is_solid(IVec3::new(3, 0, 0)).unwrap());

    // Food is laid where the agent stood when it turned around
    let pheromones = world.lock_pheromones().unwrap();
    let food = pheromones.channel(IVec3::new(4, 1, 1), PheromoneKind::Food);
    assert!((food - config.deposit_amount).abs() < 1e-5);
    assert_eq!(pheromones.total(PheromoneKind::Wander), 0.0);
}

#[test]
fn returning_agent_reenters_nest_and_searches_again() {
    let config = SimulationConfig {
        soil_dimensions: [8, 6, 8],
        agent_count: 1,
        rng_seed: Some(5),
        ..SimulationConfig::default()
    };
    let nest = NestBox::from_config(&config);
    assert_vec_close(nest.center(), Vec3::new(12.0, 17.0, 12.0));

    let mut simulation = Simulation::new(config.clone()).unwrap();
    *simulation.world().lock_agents().unwrap() = AgentPopulation::new(vec![Agent::new(
        nest.center(),
        Vec3::new(0.0, -1.0, 0.0),
    )
    .with_state(AgentState::Returning)]);

    let summary = simulation.step().unwrap();
    assert_eq!(summary.searching, 1);
    assert_eq!(summary.returning, 0);

    let pheromones = simulation.world().lock_pheromones().unwrap();
    let cell = PheromoneField::cell_of(nest.center());
    assert!(pheromones.channel(cell, PheromoneKind::Wander) > 0.0);
    assert_eq!(pheromones.channel(cell, PheromoneKind::Food), 0.0);
}

#[test]
fn pheromone_export_shows_only_enabled_channels() {
    let mut field = PheromoneField::new([9, 9, 9]);
    field.deposit(IVec3::new(4, 4, 4), PheromoneKind::Food, 2.0).unwrap();
    field.deposit(IVec3::new(1, 7, 2), PheromoneKind::Wander, 8.0).unwrap();

    let food_only = ChannelFilter::only(&[PheromoneKind::Food]);
    let records = field.export_pheromone_render_data(&food_only, None);

    assert_eq!(records.len(), 1);
    assert_vec_close(records[0].color, Vec3::new(0.0, 0.0, 1.0));
    assert_vec_close(translation_of(&records[0].transform), Vec3::new(1.0, 1.0, 1.0));

    let everything = field.export_pheromone_render_data(&ChannelFilter::all(), None);
    assert_eq!(everything.len(), 2);
}

#[test]
fn soil_export_clip_box_keeps_exposed_cells_inside() {
    let soil = SoilField::filled([4, 4, 4], 1.0);
    let clip = ClipBox::new(Vec3::ZERO, Vec3::ONE);

    let records = soil.export_soil_render_data(true, 0.0, Some(&clip));

    // The 2x2x2 corner minus (1, 1, 1), which is buried on all six faces
    assert_eq!(records.len(), 7);
    for record in &records {
        let translation = translation_of(&record.transform);
        assert!(clip.contains(translation));
        assert_ne!(translation, Vec3::ONE);
    }
}

#[test]
fn depleted_soil_never_returns() {
    let mut soil = SoilField::filled([2, 2, 2], 0.5);
    let cell = IVec3::new(1, 0, 1);

    assert!(soil.deplete(cell, 0.5).unwrap());
    for _ in 0..3 {
        assert!(!soil.deplete(cell, 0.5).unwrap());
    }
    assert!(soil.is_open(cell).unwrap());
    assert_eq!(soil.count_cavities(), 1);
}

#[test]
fn pheromone_mass_only_leaves_through_evaporation() {
    let config = SimulationConfig {
        soil_dimensions: [3, 3, 3],
        agent_count: 0,
        rng_seed: Some(2),
        ..SimulationConfig::default()
    };
    let mut soil = SoilField::filled(config.soil_dimensions, 1.0);
    for x in 0..3 {
        for y in 0..3 {
            for z in 0..3 {
                soil.carve(IVec3::new(x, y, z)).unwrap();
            }
        }
    }
    let mut pheromones = PheromoneField::new(config.pheromone_dimensions());
    pheromones.deposit(IVec3::new(4, 4, 4), PheromoneKind::Wander, 9.0).unwrap();

    pheromones.diffuse(&soil, &config).unwrap();
    assert!((pheromones.total(PheromoneKind::Wander) - 9.0).abs() < 1e-3);

    let before = pheromones.total(PheromoneKind::Wander);
    pheromones.evaporate(&config).unwrap();
    assert!(pheromones.total(PheromoneKind::Wander) < before);
}

#[test]
fn mismatched_fields_are_rejected() {
    let config = SimulationConfig {
        soil_dimensions: [4, 4, 4],
        ..SimulationConfig::default()
    };
    let soil = SoilField::filled([4, 4, 4], 1.0);
    let pheromones = PheromoneField::new([8, 12, 12]);

    let result = Simulation::from_parts(config, soil, pheromones, AgentPopulation::default());
    assert!(matches!(result, Err(SimError::InvalidConfig(_))));
}

fn wait_for(worker: &SimulationWorker, done: impl Fn(u64) -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        if let Some(summary) = worker.latest_summary() {
            if done(summary.tick) {
                return true;
            }
        }
        thread::sleep(Duration::from_millis(5));
    }
    false
}

#[test]
fn worker_steps_and_resets_on_command() {
    let config = SimulationConfig {
        soil_dimensions: [6, 6, 6],
        agent_count: 10,
        rng_seed: Some(3),
        ..SimulationConfig::default()
    };
    let worker = SimulationWorker::spawn(Simulation::new(config).unwrap()).unwrap();

    worker.send(SimulationCommand::Step).unwrap();
    worker.send(SimulationCommand::Step).unwrap();
    assert!(wait_for(&worker, |tick| tick == 2));

    worker.send(SimulationCommand::Reset).unwrap();
    assert!(wait_for(&worker, |tick| tick == 0));
    assert_eq!(worker.world().lock_agents().unwrap().len(), 10);
}
