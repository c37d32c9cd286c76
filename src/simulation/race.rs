use super::{
    Agent, AgentId, AgentPool, AgentState, AgentStateMachine, ChaseProgress, DrivePlanBuilder, PhysicsEngine, RaceState,
    ReferenceFrame, SegmentPlanFollower, SpawnPlacementResolver, SpawnReport, SteeringController,
    SteeringStrategy, TickContext, Track, TraitAssigner, WaypointChaseFollower, WaypointSource, WorldQuery,
};
use crate::config::{RacersConfig, SimulationConfig, StrategyKind};
use rand::rngs::StdRng;
use rand::SeedableRng;

pub struct RaceManager {
    config: RacersConfig,
    track: Track,
    traits: TraitAssigner,
    controller: SteeringController,
    state_machine: AgentStateMachine,
    physics: PhysicsEngine,
    spawner: SpawnPlacementResolver,
    rng: StdRng,
}

impl RaceManager {
    pub fn new(config: &SimulationConfig, seed: Option<u64>) -> Self {
        Self::with_track(Track::from_config(&config.track), config.racers.clone(), seed)
    }

    pub fn with_track(track: Track, config: RacersConfig, seed: Option<u64>) -> Self {
        let rng = if let Some(seed) = seed {
            StdRng::seed_from_u64(seed)
        } else {
            StdRng::from_entropy()
        };

        // Each strategy keeps its own personality table
        let strategy: Box<dyn SteeringStrategy> = match config.simulation.strategy {
            StrategyKind::SegmentPlan => Box::new(SegmentPlanFollower),
            StrategyKind::WaypointChase => Box::new(WaypointChaseFollower::new(&config.waypoint_chase)),
        };
        let personalities = match config.simulation.strategy {
            StrategyKind::SegmentPlan => config.segment_plan.personalities.clone(),
            StrategyKind::WaypointChase => config.waypoint_chase.personalities.clone(),
        };

        Self {
            traits: TraitAssigner::new(personalities, config.speed_tier_table()),
            controller: SteeringController::new(config.steering.clone(), strategy),
            state_machine: AgentStateMachine::new(config.crash),
            physics: PhysicsEngine::new(&config.steering),
            spawner: SpawnPlacementResolver::new(config.spawn, config.steering.agent_radius),
            track,
            config,
            rng,
        }
    }

    pub fn track(&self) -> &Track {
        &self.track
    }

    pub fn strategy_name(&self) -> &'static str {
        self.controller.strategy_name()
    }

    pub fn state_machine(&self) -> &AgentStateMachine {
        &self.state_machine
    }

    pub fn physics(&self) -> &PhysicsEngine {
        &self.physics
    }

    pub fn initialize(&mut self, state: &mut RaceState) -> SpawnReport {
        let pool_size = self.config.simulation.pool_size as usize;
        let agents = (0..pool_size)
            .map(|i| Agent::new(AgentId(i), self.traits.assign(&mut self.rng)))
            .collect();
        state.pool = AgentPool::new(agents);
        state.scheduler = Default::default();
        self.physics.reset();

        let pose = state.player.unwrap_or_else(|| self.track.start_pose());
        let frame = ReferenceFrame::from_pose(&pose);
        let report = self.spawner.place_all(&mut state.pool, &frame, &mut self.rng);

        // Plans start where each agent was placed
        let builder = DrivePlanBuilder::new(&self.track, &self.config.segment_plan);
        let waypoints = self.track.waypoints();
        for agent in state.pool.iter_mut() {
            let plan = builder.build(agent.traits.lane_offset, agent.position);
            agent.set_plan(plan);
            agent.chase = ChaseProgress::starting_at(&agent.position, &agent.forward(), waypoints);
        }

        if self.track.waypoints().len() < 2 {
            log::warn!("Track '{}' is too short, agents will stay inert", self.track.name);
        }
        log::info!(
            "Initialized {} agents on '{}' with {} steering: {:?}",
            state.pool.len(),
            self.track.name,
            self.strategy_name(),
            state.pool.personality_counts()
        );

        report
    }

    pub fn update(&mut self, state: &mut RaceState) {
        let dt = state.dt;

        self.state_machine.fire_due(&mut state.pool, &mut state.scheduler, state.time);

        let ctx = TickContext {
            dt,
            player: state.player.as_ref(),
            waypoints: self.track.waypoints(),
        };
        let agent_radius = self.config.steering.agent_radius;

        // Sequential so later agents see earlier agents' updates
        for index in 0..state.pool.len() {
            let output = {
                let agents = state.pool.agents();
                let world = WorldQuery::new(agents, &self.track.ground, agent_radius);
                self.controller.steer(&agents[index], &ctx, &world, &mut self.rng)
            };

            if let (Some(output), Some(agent)) = (output, state.pool.get_mut(AgentId(index))) {
                self.controller.apply(agent, output, &ctx, &mut self.rng);
            }
        }

        self.physics.integrate(&mut state.pool, dt);

        for event in self.physics.detect_collisions(&state.pool) {
            if let Some(agent) = state.pool.get_mut(event.agent) {
                self.state_machine
                    .on_collision(agent, event.relative_speed, state.time, &mut state.scheduler);
            }
        }

        state.advance_clock();
    }

    pub fn report_collision(&mut self, state: &mut RaceState, agent: AgentId, relative_speed: f32) -> bool {
        match state.pool.get_mut(agent) {
            Some(agent) => self
                .state_machine
                .on_collision(agent, relative_speed, state.time, &mut state.scheduler),
            None => false,
        }
    }

    pub fn racing_count(&self, state: &RaceState) -> usize {
        state.pool.count_in_state(AgentState::Racing)
    }
}
