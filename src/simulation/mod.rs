use nalgebra::{Point3, UnitQuaternion, Vector3};
use std::collections::{HashMap, VecDeque};
use std::time::Duration;

pub mod personality;
pub mod plan;
pub mod physics;
pub mod steering;
pub mod state_machine;
pub mod spawn;
pub mod race;

pub use personality::*;
pub use plan::*;
pub use physics::*;
pub use steering::*;
pub use state_machine::*;
pub use spawn::*;
pub use race::*;

pub type Vec3 = Vector3<f32>;
pub type Point = Point3<f32>;
pub type Rotation = UnitQuaternion<f32>;

pub fn up() -> Vec3 {
    Vector3::y()
}

pub fn look_rotation(forward: &Vec3) -> Option<Rotation> {
    let horizontal = Vec3::new(forward.x, 0.0, forward.z);
    if horizontal.norm_squared() < 1e-8 {
        return None;
    }
    Some(UnitQuaternion::face_towards(forward, &up()))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AgentId(pub usize);

// Written by an external detail selector, never read by the core
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MovementMode {
    #[default]
    Full,
    Simple,
    Fake,
}

#[derive(Debug, Clone)]
pub struct Agent {
    pub id: AgentId,
    pub active: bool,
    pub category: Category,
    pub position: Point,
    pub orientation: Rotation,
    pub velocity: Vec3,
    pub current_speed: f32,
    pub traits: AgentTraits,
    pub state: AgentState,
    pub plan: DrivePlan,
    pub cursor: PlanCursor,
    pub chase: ChaseProgress,
    pub movement_mode: MovementMode,
}

impl Agent {
    pub fn new(id: AgentId, traits: AgentTraits) -> Self {
        Self {
            id,
            active: false,
            category: Category::Vehicle,
            position: Point::origin(),
            orientation: Rotation::identity(),
            velocity: Vec3::zeros(),
            current_speed: 0.0,
            traits,
            state: AgentState::Racing,
            plan: DrivePlan::default(),
            cursor: PlanCursor::default(),
            chase: ChaseProgress::default(),
            movement_mode: MovementMode::Full,
        }
    }

    pub fn forward(&self) -> Vec3 {
        self.orientation * Vec3::z()
    }

    pub fn right(&self) -> Vec3 {
        self.orientation * Vec3::x()
    }

    pub fn is_racing(&self) -> bool {
        self.active && self.state == AgentState::Racing
    }

    pub fn set_plan(&mut self, plan: DrivePlan) {
        self.plan = plan;
        self.cursor = PlanCursor::default();
    }
}

#[derive(Debug, Clone, Default)]
pub struct AgentPool {
    agents: Vec<Agent>,
}

impl AgentPool {
    pub fn new(agents: Vec<Agent>) -> Self {
        Self { agents }
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    pub fn agents(&self) -> &[Agent] {
        &self.agents
    }

    pub fn get(&self, id: AgentId) -> Option<&Agent> {
        self.agents.get(id.0)
    }

    pub fn get_mut(&mut self, id: AgentId) -> Option<&mut Agent> {
        self.agents.get_mut(id.0)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Agent> {
        self.agents.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Agent> {
        self.agents.iter_mut()
    }

    pub fn active(&self) -> impl Iterator<Item = &Agent> {
        self.agents.iter().filter(|a| a.active)
    }

    pub fn active_count(&self) -> usize {
        self.active().count()
    }

    pub fn activate(&mut self, id: AgentId, position: Point, orientation: Rotation) -> bool {
        match self.agents.get_mut(id.0) {
            Some(agent) => {
                agent.position = position;
                agent.orientation = orientation;
                agent.velocity = Vec3::zeros();
                agent.active = true;
                true
            }
            None => false,
        }
    }

    pub fn deactivate_all(&mut self) {
        for agent in &mut self.agents {
            agent.active = false;
        }
    }

    pub fn set_movement_mode(&mut self, id: AgentId, mode: MovementMode) -> bool {
        match self.agents.get_mut(id.0) {
            Some(agent) => {
                agent.movement_mode = mode;
                true
            }
            None => false,
        }
    }

    pub fn count_in_state(&self, state: AgentState) -> usize {
        self.active().filter(|a| a.state == state).count()
    }

    pub fn personality_counts(&self) -> HashMap<Personality, usize> {
        let mut counts = HashMap::new();
        for agent in &self.agents {
            *counts.entry(agent.traits.personality).or_insert(0) += 1;
        }
        counts
    }

    pub fn tier_counts(&self) -> HashMap<SpeedTier, usize> {
        let mut counts = HashMap::new();
        for agent in &self.agents {
            *counts.entry(agent.traits.tier).or_insert(0) += 1;
        }
        counts
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlayerPose {
    pub position: Point,
    pub forward: Vec3,
}

#[derive(Debug, Clone)]
pub struct RaceState {
    pub pool: AgentPool,
    pub player: Option<PlayerPose>,
    pub scheduler: Scheduler,
    pub time: f64,
    pub dt: f32,
    pub tick: u64,
}

impl RaceState {
    pub fn new(dt: f32) -> Self {
        Self {
            pool: AgentPool::default(),
            player: None,
            scheduler: Scheduler::default(),
            time: 0.0,
            dt,
            tick: 0,
        }
    }

    // Derived from the tick count so it never drifts
    pub fn advance_clock(&mut self) {
        self.tick += 1;
        self.time = self.tick as f64 * self.dt as f64;
    }
}

#[derive(Debug)]
pub struct TickTimer {
    samples: VecDeque<Duration>,
    max_samples: usize,
    current_start: Option<instant::Instant>,
}

impl TickTimer {
    pub fn new(max_samples: usize) -> Self {
        Self {
            samples: VecDeque::with_capacity(max_samples),
            max_samples: max_samples.max(1),
            current_start: None,
        }
    }

    pub fn start_tick(&mut self) {
        self.current_start = Some(instant::Instant::now());
    }

    pub fn end_tick(&mut self) {
        if let Some(start) = self.current_start.take() {
            if self.samples.len() >= self.max_samples {
                self.samples.pop_front();
            }
            self.samples.push_back(start.elapsed());
        }
    }

    pub fn sample_count(&self) -> usize {
        self.samples.len()
    }

    pub fn average_tick_time(&self) -> Duration {
        if self.samples.is_empty() {
            return Duration::ZERO;
        }

        let total: Duration = self.samples.iter().sum();
        total / self.samples.len() as u32
    }

    pub fn ticks_per_second(&self) -> f32 {
        let average = self.average_tick_time();
        if average.is_zero() {
            return 0.0;
        }
        1.0 / average.as_secs_f32()
    }
}
