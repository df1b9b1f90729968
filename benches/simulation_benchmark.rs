/*
 * Simulation Benchmark
 *
 * Measures the hot paths of a tick: a full step for growing colonies, the
 * diffusion phase on its own, and the render-data exports the viewer pulls
 * every frame.
 */

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use nannou::glam::IVec3;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::Duration;

use voxel_ants::{
    ChannelFilter, PheromoneField, PheromoneKind, Simulation, SimulationConfig, SoilField,
};

fn bench_config(agent_count: usize) -> SimulationConfig {
    SimulationConfig {
        soil_dimensions: [24, 16, 24],
        agent_count,
        rng_seed: Some(42),
        ..SimulationConfig::default()
    }
}

// Scatter deposits over the lattice so diffusion and export have work to do
fn seeded_pheromones(config: &SimulationConfig, cells: usize) -> PheromoneField {
    let dims = config.pheromone_dimensions();
    let mut field = PheromoneField::new(dims);
    let mut rng = StdRng::seed_from_u64(7);
    for i in 0..cells {
        let cell = IVec3::new(
            rng.gen_range(0..dims[0] as i32),
            rng.gen_range(0..dims[1] as i32),
            rng.gen_range(0..dims[2] as i32),
        );
        let kind = PheromoneKind::ALL[i % PheromoneKind::ALL.len()];
        // Cells come from the lattice extent, so the deposit cannot miss
        let _ = field.deposit(cell, kind, rng.gen_range(1.0..10.0));
    }
    field
}

// Benchmark a whole tick for different colony sizes
fn bench_step(c: &mut Criterion) {
    let mut group = c.benchmark_group("step");

    for agent_count in [100, 500, 2000].iter() {
        group.bench_with_input(
            BenchmarkId::from_parameter(agent_count),
            agent_count,
            |b, &n| {
                let mut simulation =
                    Simulation::new(bench_config(n)).expect("benchmark config is valid");
                b.iter(|| black_box(simulation.step().expect("tick failed")));
            },
        );
    }

    group.finish();
}

// Benchmark the diffusion phase for different numbers of occupied cells
fn bench_diffusion(c: &mut Criterion) {
    let mut group = c.benchmark_group("diffusion");
    let config = bench_config(0);
    let mut rng = StdRng::seed_from_u64(3);
    let soil = SoilField::generate(&config, &mut rng).expect("soil generation failed");

    for cells in [100, 1000, 10000].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(cells), cells, |b, &n| {
            let field = seeded_pheromones(&config, n);
            b.iter(|| {
                let mut field = field.clone();
                field.diffuse(&soil, &config).expect("diffusion failed");
                black_box(field.occupied_count())
            });
        });
    }

    group.finish();
}

// Benchmark the per-frame exports
fn bench_exports(c: &mut Criterion) {
    let mut group = c.benchmark_group("exports");
    let config = bench_config(500);
    let mut rng = StdRng::seed_from_u64(5);
    let soil = SoilField::generate(&config, &mut rng).expect("soil generation failed");

    group.bench_function("soil", |b| {
        b.iter(|| black_box(soil.export_soil_render_data(true, 0.2, None)))
    });

    let field = seeded_pheromones(&config, 5000);
    group.bench_function("pheromones", |b| {
        b.iter(|| {
            let mut field = field.clone();
            black_box(field.export_pheromone_render_data(&ChannelFilter::all(), None))
        })
    });

    group.finish();
}

// Configure the benchmarks
criterion_group! {
    name = benches;
    config = Criterion::default()
        .sample_size(10)
        .measurement_time(Duration::from_secs(5))
        .warm_up_time(Duration::from_secs(1));
    targets = bench_step, bench_diffusion, bench_exports
}

criterion_main!(benches);
