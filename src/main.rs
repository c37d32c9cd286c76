use anyhow::Result;
use clap::{Parser, ValueEnum};
use log::info;

use race_pack::{
    config::{SimulationConfig, StrategyKind, Validate},
    simulation::{AgentState, RaceManager, RaceState, TickTimer},
};

#[derive(Parser)]
#[command(name = "race-pack")]
#[command(about = "Headless run of an autonomous racing pack")]
struct Args {
    /// Track configuration file
    #[arg(short, long, default_value = "track.toml")]
    track: String,

    /// Racer tuning file
    #[arg(short, long, default_value = "racers.toml")]
    racers: String,

    /// Random seed for reproducible races (overrides the file)
    #[arg(short, long)]
    seed: Option<u64>,

    /// Steering strategy (overrides the file)
    #[arg(long, value_enum)]
    strategy: Option<Strategy>,

    /// Simulated seconds to run (overrides the file)
    #[arg(short, long)]
    duration: Option<f32>,

    /// Run without a player pose; agents never try to catch up
    #[arg(long)]
    no_player: bool,

    /// Enable verbose logging for per-agent events
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum Strategy {
    /// Follow precomputed drive plans
    SegmentPlan,
    /// Chase waypoints live with a wandering heading
    WaypointChase,
}

impl From<Strategy> for StrategyKind {
    fn from(strategy: Strategy) -> Self {
        match strategy {
            Strategy::SegmentPlan => StrategyKind::SegmentPlan,
            Strategy::WaypointChase => StrategyKind::WaypointChase,
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    env_logger::Builder::from_default_env()
        .filter_level(if args.verbose { log::LevelFilter::Debug } else { log::LevelFilter::Info })
        .init();
    info!("Starting race pack");

    let mut config = SimulationConfig::load_from_files(&args.track, &args.racers)?;
    if let Some(strategy) = args.strategy {
        config.racers.simulation.strategy = strategy.into();
    }
    if let Some(duration) = args.duration {
        config.racers.simulation.simulation_duration = duration;
    }
    config.racers.validate()?;

    let seed = args.seed.or(config.racers.random.seed);
    let dt = config.racers.simulation.dt;
    let duration = config.racers.simulation.simulation_duration;

    info!(
        "Track '{}' ({}), {} waypoints",
        config.track.track.name,
        config.track.track.description,
        config.track.track.waypoints.len()
    );
    info!(
        "Pool of {} agents, dt {:.3}s, {:.1}s to simulate, seed {:?}",
        config.racers.simulation.pool_size, dt, duration, seed
    );

    let mut manager = RaceManager::new(&config, seed);
    let mut state = RaceState::new(dt);
    if !args.no_player {
        state.player = Some(manager.track().start_pose());
    }

    let report = manager.initialize(&mut state);
    info!(
        "Spawn: {} placed, {} fallbacks, {} pushes",
        report.placements.len(),
        report.fallback_count(),
        report.pushes
    );

    let mut timer = TickTimer::new(config.racers.performance.timing_samples as usize);
    let total_ticks = (duration / dt).ceil() as u64;
    let ticks_per_second = (1.0 / dt).round().max(1.0) as u64;
    let mut total_crashes = 0usize;

    while state.tick < total_ticks {
        let crashed_before = state.pool.count_in_state(AgentState::Crashed);

        if config.racers.performance.enable_tick_timing {
            timer.start_tick();
        }
        manager.update(&mut state);
        if config.racers.performance.enable_tick_timing {
            timer.end_tick();
        }

        let crashed_after = state.pool.count_in_state(AgentState::Crashed);
        total_crashes += crashed_after.saturating_sub(crashed_before);

        if state.tick % ticks_per_second == 0 {
            info!(
                "t={:.1}s racing {} crashed {} pending recoveries {}",
                state.time,
                manager.racing_count(&state),
                crashed_after,
                state.scheduler.len()
            );
        }
    }

    info!("=== Race summary ===");
    info!("Simulated {:.1}s over {} ticks with {} steering", state.time, state.tick, manager.strategy_name());
    info!("Crashes observed: {}", total_crashes);
    info!("Tiers: {:?}", state.pool.tier_counts());
    if config.racers.performance.enable_tick_timing && timer.sample_count() > 0 {
        info!(
            "Average tick {:.3}ms ({:.0} ticks/s)",
            timer.average_tick_time().as_secs_f64() * 1000.0,
            timer.ticks_per_second()
        );
    }

    Ok(())
}
