use race_pack::{
    config::{ConfigError, RacersConfig, SimulationConfig, StrategyKind, Validate},
    simulation::{
        Agent, AgentId, AgentPool, AgentState, AgentTraits, PhysicsEngine, Point, RaceManager, RaceState,
        Rotation, TickTimer, Vec3,
    },
};
use anyhow::Result;

fn run(config: &SimulationConfig, seed: u64, ticks: usize) -> RaceState {
    let mut manager = RaceManager::new(config, Some(seed));
    let mut state = RaceState::new(config.racers.simulation.dt);
    state.player = Some(manager.track().start_pose());
    manager.initialize(&mut state);
    for _ in 0..ticks {
        manager.update(&mut state);
    }
    state
}

#[test]
fn test_shipped_configuration_loads() -> Result<()> {
    let config = SimulationConfig::load_from_files("track.toml", "racers.toml")?;

    assert_eq!(config.racers.simulation.pool_size, 99);
    assert_eq!(config.racers.segment_plan.personalities.len(), 3);
    assert_eq!(config.racers.waypoint_chase.personalities.len(), 4);
    assert!(config.track.track.waypoints.len() >= 2);
    Ok(())
}

#[test]
fn test_seeded_races_are_reproducible() -> Result<()> {
    let config = SimulationConfig::load_from_files("track.toml", "racers.toml")?;

    let a = run(&config, 12345, 150);
    let b = run(&config, 12345, 150);

    for (x, y) in a.pool.iter().zip(b.pool.iter()) {
        assert_eq!(x.position, y.position, "agent {} diverged", x.id.0);
        assert_eq!(x.state, y.state);
        assert_eq!(x.traits, y.traits);
    }
    assert_eq!(a.scheduler.len(), b.scheduler.len());
    Ok(())
}

#[test]
fn test_full_pool_races_forward() -> Result<()> {
    let config = SimulationConfig::load_from_files("track.toml", "racers.toml")?;
    let mut manager = RaceManager::new(&config, Some(7));
    let mut state = RaceState::new(config.racers.simulation.dt);

    let report = manager.initialize(&mut state);
    assert_eq!(report.placements.len(), 99);
    assert_eq!(state.pool.active_count(), 99);

    let start: Vec<Point> = state.pool.iter().map(|a| a.position).collect();
    for _ in 0..250 {
        manager.update(&mut state);
    }

    let moved = state
        .pool
        .iter()
        .zip(&start)
        .filter(|(agent, start)| (agent.position - **start).norm() > 5.0)
        .count();
    assert!(moved > 90, "only {} agents moved", moved);

    for agent in state.pool.iter() {
        assert!(agent.position.coords.iter().all(|c| c.is_finite()));
        assert_ne!(agent.state, AgentState::Recovering);
    }
    assert!((state.time - 5.0).abs() < 1e-6);
    Ok(())
}

#[test]
fn test_waypoint_chase_strategy_runs() -> Result<()> {
    let mut config = SimulationConfig::load_from_files("track.toml", "racers.toml")?;
    config.racers.simulation.strategy = StrategyKind::WaypointChase;
    config.racers.simulation.pool_size = 20;

    let mut manager = RaceManager::new(&config, Some(99));
    assert_eq!(manager.strategy_name(), "waypoint-chase");

    let mut state = RaceState::new(config.racers.simulation.dt);
    manager.initialize(&mut state);
    let initial: Vec<usize> = state.pool.iter().map(|a| a.chase.target).collect();
    for _ in 0..400 {
        manager.update(&mut state);
    }

    let advanced = state.pool.iter().filter(|a| a.chase.target != initial[a.id.0]).count();
    assert!(advanced > 0);
    for agent in state.pool.iter() {
        assert!(agent.position.coords.iter().all(|c| c.is_finite()));
    }
    Ok(())
}

// An empty track leaves agents parked but the race still ticks
#[test]
fn test_empty_track_keeps_agents_inert() -> Result<()> {
    let mut config = SimulationConfig::default();
    config.track.track.waypoints.clear();
    config.racers.simulation.pool_size = 5;

    let state = run(&config, 1, 50);
    for agent in state.pool.iter() {
        assert!(agent.plan.is_empty());
        assert_eq!(agent.velocity, Vec3::zeros());
    }
    assert_eq!(state.tick, 50);
    Ok(())
}

#[test]
fn test_invalid_thresholds_are_rejected() {
    let mut config = RacersConfig::default();
    config.segment_plan.personalities[1].upper_bound = 0.2;

    match config.validate() {
        Err(ConfigError::BadThreshold { index, .. }) => assert_eq!(index, 1),
        other => panic!("expected a threshold error, got {:?}", other),
    }
}

#[test]
fn test_inverted_spawn_range_is_rejected() {
    let mut config = RacersConfig::default();
    config.spawn.forward_min = 300.0;
    assert!(matches!(config.validate(), Err(ConfigError::InvertedRange { .. })));
}

#[test]
fn test_partial_racer_file_uses_defaults() -> Result<()> {
    let track = std::fs::read_to_string("track.toml")?;
    let config = SimulationConfig::from_toml_strs(&track, "[simulation]\npool_size = 12\n")?;

    assert_eq!(config.racers.simulation.pool_size, 12);
    assert_eq!(config.racers.crash.impact_threshold, 4.0);
    assert_eq!(config.racers.speed_tier_table().len(), 4);
    Ok(())
}

#[test]
fn test_contacts_report_each_pair_once() {
    let config = RacersConfig::default();
    let mut physics = PhysicsEngine::new(&config.steering);

    let mut pool = AgentPool::new((0..3).map(|i| Agent::new(AgentId(i), AgentTraits::default())).collect());
    pool.activate(AgentId(0), Point::new(0.0, 1.0, 0.0), Rotation::identity());
    pool.activate(AgentId(1), Point::new(0.0, 1.0, 1.0), Rotation::identity());
    pool.activate(AgentId(2), Point::new(50.0, 1.0, 0.0), Rotation::identity());
    if let Some(agent) = pool.get_mut(AgentId(0)) {
        agent.velocity = Vec3::new(0.0, 0.0, 10.0);
    }

    let events = physics.detect_collisions(&pool);
    assert_eq!(events.len(), 2);
    assert!(events.iter().all(|e| (e.relative_speed - 10.0).abs() < 1e-5));
    assert_eq!(physics.contact_count(), 1);

    // Still touching: no new events
    assert!(physics.detect_collisions(&pool).is_empty());
}

#[test]
fn test_contacts_report_again_after_reset() {
    let config = RacersConfig::default();
    let mut physics = PhysicsEngine::new(&config.steering);

    let mut pool = AgentPool::new((0..2).map(|i| Agent::new(AgentId(i), AgentTraits::default())).collect());
    pool.activate(AgentId(0), Point::new(0.0, 1.0, 0.0), Rotation::identity());
    pool.activate(AgentId(1), Point::new(0.5, 1.0, 0.0), Rotation::identity());

    assert_eq!(physics.detect_collisions(&pool).len(), 2);
    assert!(physics.detect_collisions(&pool).is_empty());

    physics.reset();
    assert_eq!(physics.contact_count(), 0);
    assert_eq!(physics.detect_collisions(&pool).len(), 2);
}

#[test]
fn test_reinitialize_clears_contacts() {
    let mut config = SimulationConfig::default();
    config.racers.simulation.pool_size = 10;
    config.racers.spawn.forward_min = 20.0;
    config.racers.spawn.forward_max = 20.2;
    config.racers.spawn.side_range = 0.0;
    config.racers.spawn.min_spawn_distance = 0.0;
    config.racers.spawn.lateral_jitter_min = 0.0;
    config.racers.spawn.lateral_jitter_max = 0.0;
    config.racers.spawn.forward_jitter_min = 0.0;
    config.racers.spawn.forward_jitter_max = 0.0;
    config.racers.spawn.push_strength = 0.0;

    let mut manager = RaceManager::new(&config, Some(3));
    let mut state = RaceState::new(config.racers.simulation.dt);
    manager.initialize(&mut state);
    manager.update(&mut state);
    assert!(manager.physics().contact_count() > 0);

    let mut state = RaceState::new(config.racers.simulation.dt);
    manager.initialize(&mut state);
    assert_eq!(manager.physics().contact_count(), 0);

    manager.update(&mut state);
    assert!(manager.physics().contact_count() > 0);
}

#[test]
fn test_tick_timer_averages_samples() {
    let mut timer = TickTimer::new(4);
    assert_eq!(timer.ticks_per_second(), 0.0);

    for _ in 0..6 {
        timer.start_tick();
        timer.end_tick();
    }
    assert_eq!(timer.sample_count(), 4);

    // end without start records nothing
    timer.end_tick();
    assert_eq!(timer.sample_count(), 4);
}
