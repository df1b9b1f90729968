/*
 * Simulation Module
 *
 * This module owns the simulation state and advances it one tick at a time.
 * A tick runs four phases strictly in order:
 * 1. Reaction: Food above the threshold consolidates into Root
 * 2. Diffusion: every channel spreads into open neighbouring cells
 * 3. Evaporation: every channel decays, emptied cells leave the occupancy set
 * 4. Agents: sense and decide for the whole population, then move one by one
 *
 * Each field sits behind its own mutex so the render loop can export from
 * one field between ticks. A tick takes all three locks up front and holds
 * them until every phase is done. When several locks are held they are
 * always taken in the order soil, pheromones, agents.
 *
 * The SimulationWorker runs ticks on a background thread, paced by a
 * TickClock, and takes Play/Pause/Step/Reset/Shutdown commands over a
 * channel.
 */

use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;
use std::time::{Duration, Instant};

use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{debug, error, info};

use crate::agent::{AgentPopulation, AgentState, PopulationReport};
use crate::config::SimulationConfig;
use crate::error::{SimError, SimResult};
use crate::pheromone::PheromoneField;
use crate::soil::SoilField;
use crate::stats::TickSummary;
use crate::PHEROMONE_SCALE;

// How long a running worker waits for a command before checking the clock
const POLL_INTERVAL: Duration = Duration::from_millis(1);

fn lock<'a, T>(mutex: &'a Mutex<T>, name: &'static str) -> SimResult<MutexGuard<'a, T>> {
    mutex.lock().map_err(|_| SimError::LockPoisoned(name))
}

/// Handles to the three fields, shared between the worker and the renderer.
#[derive(Clone)]
pub struct SharedWorld {
    pub soil: Arc<Mutex<SoilField>>,
    pub pheromones: Arc<Mutex<PheromoneField>>,
    pub agents: Arc<Mutex<AgentPopulation>>,
}

impl SharedWorld {
    pub fn new(soil: SoilField, pheromones: PheromoneField, agents: AgentPopulation) -> Self {
        Self {
            soil: Arc::new(Mutex::new(soil)),
            pheromones: Arc::new(Mutex::new(pheromones)),
            agents: Arc::new(Mutex::new(agents)),
        }
    }

    pub fn lock_soil(&self) -> SimResult<MutexGuard<'_, SoilField>> {
        lock(&self.soil, "soil")
    }

    pub fn lock_pheromones(&self) -> SimResult<MutexGuard<'_, PheromoneField>> {
        lock(&self.pheromones, "pheromone")
    }

    pub fn lock_agents(&self) -> SimResult<MutexGuard<'_, AgentPopulation>> {
        lock(&self.agents, "agent")
    }
}

fn seeded_rng(config: &SimulationConfig) -> StdRng {
    match config.rng_seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

pub struct Simulation {
    config: SimulationConfig,
    world: SharedWorld,
    rng: StdRng,
    tick: u64,
}

impl Simulation {
    /// Validate the config, generate the soil and spawn agents in the nest.
    pub fn new(config: SimulationConfig) -> SimResult<Self> {
        config.validate()?;
        let mut rng = seeded_rng(&config);

        let soil = SoilField::generate(&config, &mut rng)?;
        let pheromones = PheromoneField::new(config.pheromone_dimensions());
        let agents = AgentPopulation::spawn(&config, &mut rng);

        info!(
            soil = ?config.soil_dimensions,
            agents = agents.len(),
            seed = ?config.rng_seed,
            "Simulation created"
        );

        Ok(Self {
            config,
            world: SharedWorld::new(soil, pheromones, agents),
            rng,
            tick: 0,
        })
    }

    /// Build a simulation around fields prepared by the caller.
    pub fn from_parts(
        config: SimulationConfig,
        soil: SoilField,
        pheromones: PheromoneField,
        agents: AgentPopulation,
    ) -> SimResult<Self> {
        config.validate()?;
        let soil_dims: [i32; 3] = soil.dimensions().into();
        let pheromone_dims: [i32; 3] = pheromones.dimensions().into();
        let aligned = soil_dims
            .iter()
            .zip(pheromone_dims.iter())
            .all(|(&soil_len, &pheromone_len)| soil_len * PHEROMONE_SCALE == pheromone_len);
        if !aligned {
            return Err(SimError::InvalidConfig(
                "pheromone lattice must be 3x the soil lattice on every axis",
            ));
        }
        let configured = soil_dims
            .iter()
            .zip(config.soil_dimensions.iter())
            .all(|(&len, &expected)| len as usize == expected);
        if !configured {
            return Err(SimError::InvalidConfig(
                "soil field does not match the configured soil dimensions",
            ));
        }
        let rng = seeded_rng(&config);

        Ok(Self {
            config,
            world: SharedWorld::new(soil, pheromones, agents),
            rng,
            tick: 0,
        })
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn world(&self) -> &SharedWorld {
        &self.world
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    /// Advance the simulation by one tick.
    ///
    /// All three locks are taken before the first write, so a poisoned lock
    /// fails the tick without advancing any field.
    pub fn step(&mut self) -> SimResult<TickSummary> {
        let config = &self.config;
        let mut soil = self.world.lock_soil()?;
        let mut pheromones = self.world.lock_pheromones()?;
        let mut agents = self.world.lock_agents()?;

        let reactions = pheromones.react(config.reaction_threshold)?;
        debug!(reactions, "Reaction phase");
        pheromones.diffuse(&soil, config)?;
        pheromones.evaporate(config)?;
        let report = agents.step(&mut soil, &mut pheromones, config, &mut self.rng)?;

        self.tick += 1;
        let summary = summarize(self.tick, &pheromones, &agents, report);
        debug!(
            tick = summary.tick,
            searching = summary.searching,
            returning = summary.returning,
            cavities_opened = summary.cavities_opened,
            stuck = summary.stuck_agents,
            pheromone_cells = summary.occupied_pheromone_cells,
            "Tick complete"
        );
        Ok(summary)
    }

    /// Regenerate the soil, clear every pheromone and respawn the agents.
    pub fn reset(&mut self) -> SimResult<TickSummary> {
        let mut soil = self.world.lock_soil()?;
        let mut pheromones = self.world.lock_pheromones()?;
        let mut agents = self.world.lock_agents()?;

        *soil = SoilField::generate(&self.config, &mut self.rng)?;
        pheromones.clear();
        *agents = AgentPopulation::spawn(&self.config, &mut self.rng);
        self.tick = 0;

        info!(agents = agents.len(), "Simulation reset");
        Ok(summarize(0, &pheromones, &agents, PopulationReport::default()))
    }

    /// Summary of the current state without advancing.
    pub fn summary(&self) -> SimResult<TickSummary> {
        let pheromones = self.world.lock_pheromones()?;
        let agents = self.world.lock_agents()?;
        Ok(summarize(
            self.tick,
            &pheromones,
            &agents,
            PopulationReport::default(),
        ))
    }
}

fn summarize(
    tick: u64,
    pheromones: &PheromoneField,
    agents: &AgentPopulation,
    report: PopulationReport,
) -> TickSummary {
    TickSummary {
        tick,
        searching: agents.count(AgentState::Searching),
        returning: agents.count(AgentState::Returning),
        cavities_opened: report.cavities_opened,
        stuck_agents: report.stuck_agents,
        occupied_pheromone_cells: pheromones.occupied_count(),
    }
}

/// Fixed-cadence accumulator. Elapsed time adds up until it exceeds the step
/// time; then one tick fires and the accumulator starts over from zero.
#[derive(Debug, Clone, Copy, Default)]
pub struct TickClock {
    accumulator: f32,
}

impl TickClock {
    pub fn advance(&mut self, elapsed: f32, step_time: f32) -> bool {
        self.accumulator += elapsed;
        if self.accumulator > step_time {
            self.accumulator = 0.0;
            return true;
        }
        false
    }

    pub fn accumulated(&self) -> f32 {
        self.accumulator
    }

    pub fn reset(&mut self) {
        self.accumulator = 0.0;
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SimulationCommand {
    Play,
    Pause,
    /// Run exactly one tick, whether or not the worker is playing.
    Step,
    Reset,
    SetStepTime(f32),
    Shutdown,
}

/// Background thread driving a Simulation.
///
/// The worker starts paused. Dropping it sends Shutdown and joins the thread.
pub struct SimulationWorker {
    sender: mpsc::Sender<SimulationCommand>,
    world: SharedWorld,
    latest: Arc<Mutex<Option<TickSummary>>>,
    handle: Option<thread::JoinHandle<()>>,
}

impl SimulationWorker {
    pub fn spawn(simulation: Simulation) -> SimResult<Self> {
        let world = simulation.world().clone();
        let latest = Arc::new(Mutex::new(simulation.summary().ok()));
        let (sender, receiver) = mpsc::channel::<SimulationCommand>();

        let worker_latest = Arc::clone(&latest);
        let handle = thread::Builder::new()
            .name("voxel-ants-simulation".into())
            .spawn(move || run_worker(simulation, receiver, worker_latest))
            .map_err(|err| SimError::Worker(format!("failed to spawn simulation thread: {err}")))?;

        Ok(Self {
            sender,
            world,
            latest,
            handle: Some(handle),
        })
    }

    pub fn send(
        &self,
        command: SimulationCommand,
    ) -> Result<(), mpsc::SendError<SimulationCommand>> {
        self.sender.send(command)
    }

    pub fn world(&self) -> &SharedWorld {
        &self.world
    }

    pub fn latest_summary(&self) -> Option<TickSummary> {
        self.latest.lock().ok().and_then(|summary| *summary)
    }
}

impl Drop for SimulationWorker {
    fn drop(&mut self) {
        let _ = self.sender.send(SimulationCommand::Shutdown);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                error!("Simulation thread panicked");
            }
        }
    }
}

fn publish(latest: &Mutex<Option<TickSummary>>, summary: TickSummary) {
    if let Ok(mut slot) = latest.lock() {
        *slot = Some(summary);
    }
}

fn run_worker(
    mut simulation: Simulation,
    receiver: mpsc::Receiver<SimulationCommand>,
    latest: Arc<Mutex<Option<TickSummary>>>,
) {
    let mut running = false;
    let mut step_time = simulation.config().step_time;
    let mut clock = TickClock::default();
    let mut last_update = Instant::now();

    loop {
        // Block while paused; poll while playing so the clock keeps moving
        let command = if running {
            match receiver.recv_timeout(POLL_INTERVAL) {
                Ok(command) => Some(command),
                Err(RecvTimeoutError::Timeout) => None,
                Err(RecvTimeoutError::Disconnected) => break,
            }
        } else {
            match receiver.recv() {
                Ok(command) => Some(command),
                Err(_) => break,
            }
        };

        let mut tick_now = false;
        match command {
            Some(SimulationCommand::Play) => {
                running = true;
                clock.reset();
                last_update = Instant::now();
            }
            Some(SimulationCommand::Pause) => running = false,
            Some(SimulationCommand::Step) => tick_now = true,
            Some(SimulationCommand::Reset) => match simulation.reset() {
                Ok(summary) => publish(&latest, summary),
                Err(err) => {
                    error!(%err, "Reset failed");
                    running = false;
                }
            },
            Some(SimulationCommand::SetStepTime(seconds)) => step_time = seconds.max(0.0),
            Some(SimulationCommand::Shutdown) => break,
            None => {}
        }

        if running {
            let now = Instant::now();
            let elapsed = now.duration_since(last_update).as_secs_f32();
            last_update = now;
            tick_now |= clock.advance(elapsed, step_time);
        }

        if tick_now {
            match simulation.step() {
                Ok(summary) => publish(&latest, summary),
                Err(err) => {
                    // A failed tick is a bug; stop rather than keep failing every frame
                    error!(%err, tick = simulation.tick(), "Tick failed, pausing");
                    running = false;
                }
            }
        }
    }

    info!(tick = simulation.tick(), "Simulation worker stopped");
}
