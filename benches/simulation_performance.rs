use criterion::{black_box, criterion_group, criterion_main, Criterion};
use race_pack::{
    config::{SimulationConfig, StrategyKind},
    simulation::{RaceManager, RaceState},
};

fn prepared_race(config: &SimulationConfig) -> (RaceManager, RaceState) {
    let mut manager = RaceManager::new(config, Some(42));
    let mut state = RaceState::new(config.racers.simulation.dt);
    state.player = Some(manager.track().start_pose());
    manager.initialize(&mut state);

    // Let the pack get up to speed before measuring
    for _ in 0..50 {
        manager.update(&mut state);
    }
    (manager, state)
}

fn benchmark_race_update(c: &mut Criterion) {
    let config = SimulationConfig::load_from_files("track.toml", "racers.toml")
        .expect("Failed to load configuration");

    let (mut manager, mut state) = prepared_race(&config);
    c.bench_function("segment_plan_update", |b| {
        b.iter(|| manager.update(black_box(&mut state)))
    });

    let mut chase = config.clone();
    chase.racers.simulation.strategy = StrategyKind::WaypointChase;
    let (mut manager, mut state) = prepared_race(&chase);
    c.bench_function("waypoint_chase_update", |b| {
        b.iter(|| manager.update(black_box(&mut state)))
    });
}

fn benchmark_pool_scaling(c: &mut Criterion) {
    let config = SimulationConfig::load_from_files("track.toml", "racers.toml")
        .expect("Failed to load configuration");

    let mut group = c.benchmark_group("pool_scaling");

    for pool_size in [25u32, 50, 99, 200].iter() {
        let mut sized = config.clone();
        sized.racers.simulation.pool_size = *pool_size;
        let (mut manager, mut state) = prepared_race(&sized);

        group.bench_with_input(format!("{}_agents", pool_size), pool_size, |b, _pool_size| {
            b.iter(|| manager.update(black_box(&mut state)));
        });
    }

    group.finish();
}

fn benchmark_spawn_placement(c: &mut Criterion) {
    let config = SimulationConfig::load_from_files("track.toml", "racers.toml")
        .expect("Failed to load configuration");
    let mut manager = RaceManager::new(&config, Some(42));

    c.bench_function("spawn_99_agents", |b| {
        b.iter(|| {
            let mut state = RaceState::new(config.racers.simulation.dt);
            manager.initialize(black_box(&mut state))
        })
    });
}

criterion_group!(
    benches,
    benchmark_race_update,
    benchmark_pool_scaling,
    benchmark_spawn_placement
);
criterion_main!(benches);
