use super::{
    look_rotation, rotate_about_up, signed_angle, up, Agent, Category, PlayerPose, Point, RayHit,
    Rotation, SpatialQuery, SteeringParams, Vec3, Waypoint,
};
use crate::config::{SteeringTuning, WaypointChaseTuning};
use nalgebra::UnitQuaternion;
use rand::{Rng, RngCore};
use rand_distr::{Distribution, Normal};

const MIN_HEADING_SPEED_SQUARED: f32 = 0.1;

pub struct TickContext<'a> {
    pub dt: f32,
    pub player: Option<&'a PlayerPose>,
    pub waypoints: &'a [Waypoint],
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ChaseProgress {
    pub target: usize,
    pub wander_angle: f32,
}

impl ChaseProgress {
    pub fn starting_at(position: &Point, forward: &Vec3, waypoints: &[Waypoint]) -> Self {
        let nearest = waypoints
            .iter()
            .enumerate()
            .min_by(|(_, a), (_, b)| {
                let da = (a.position - position).norm_squared();
                let db = (b.position - position).norm_squared();
                da.total_cmp(&db)
            })
            .map(|(i, _)| i);

        let target = match nearest {
            Some(i) if (waypoints[i].position - position).dot(forward) < 0.0 => (i + 1) % waypoints.len(),
            Some(i) => i,
            None => 0,
        };
        Self { target, wander_angle: 0.0 }
    }
}

pub trait SteeringStrategy {
    fn name(&self) -> &'static str;

    fn desired_direction(&self, agent: &Agent, waypoints: &[Waypoint]) -> Option<Vec3>;

    fn advance(&self, agent: &mut Agent, travelled: f32, waypoints: &[Waypoint], dt: f32, rng: &mut dyn RngCore);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SegmentPlanFollower;

impl SteeringStrategy for SegmentPlanFollower {
    fn name(&self) -> &'static str {
        "segment-plan"
    }

    fn desired_direction(&self, agent: &Agent, _waypoints: &[Waypoint]) -> Option<Vec3> {
        agent.cursor.current(&agent.plan).map(|segment| segment.direction)
    }

    fn advance(&self, agent: &mut Agent, travelled: f32, _waypoints: &[Waypoint], _dt: f32, _rng: &mut dyn RngCore) {
        if agent.cursor.advance(travelled, &agent.plan) {
            log::trace!("Agent {} entered segment {}", agent.id.0, agent.cursor.index);
        }
    }
}

#[derive(Debug, Clone)]
pub struct WaypointChaseFollower {
    look_ahead_distance: f32,
    wander_step: Option<Normal<f32>>,
    wander_max: f32,
}

impl WaypointChaseFollower {
    pub fn new(tuning: &WaypointChaseTuning) -> Self {
        let sigma = tuning.wander_sigma_deg.to_radians().abs();
        Self {
            look_ahead_distance: tuning.look_ahead_distance,
            wander_step: Normal::new(0.0, sigma).ok(),
            wander_max: tuning.wander_max_deg.to_radians().abs(),
        }
    }
}

impl SteeringStrategy for WaypointChaseFollower {
    fn name(&self) -> &'static str {
        "waypoint-chase"
    }

    fn desired_direction(&self, agent: &Agent, waypoints: &[Waypoint]) -> Option<Vec3> {
        if waypoints.is_empty() {
            return None;
        }

        let mut target = waypoints[agent.chase.target % waypoints.len()].position;
        let toward = match (target - agent.position).try_normalize(f32::EPSILON) {
            Some(toward) => toward,
            None => return Some(agent.forward()),
        };
        target += up().cross(&toward) * agent.traits.lane_offset;

        let direction = (target - agent.position).try_normalize(f32::EPSILON).unwrap_or(toward);
        Some(rotate_about_up(&direction, agent.chase.wander_angle))
    }

    fn advance(&self, agent: &mut Agent, _travelled: f32, waypoints: &[Waypoint], dt: f32, rng: &mut dyn RngCore) {
        if waypoints.is_empty() {
            return;
        }

        let index = agent.chase.target % waypoints.len();
        if (waypoints[index].position - agent.position).norm() < self.look_ahead_distance {
            agent.chase.target = (index + 1) % waypoints.len();
        }

        if let Some(wander) = &self.wander_step {
            let step = wander.sample(rng) * dt.sqrt();
            agent.chase.wander_angle = (agent.chase.wander_angle + step).clamp(-self.wander_max, self.wander_max);
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SteeringOutput {
    pub speed: f32,
    pub velocity: Vec3,
    pub orientation: Rotation,
    pub position: Point,
    pub travelled: f32,
    pub grounded: bool,
}

pub struct SteeringController {
    tuning: SteeringTuning,
    strategy: Box<dyn SteeringStrategy>,
}

impl SteeringController {
    pub fn new(tuning: SteeringTuning, strategy: Box<dyn SteeringStrategy>) -> Self {
        Self { tuning, strategy }
    }

    pub fn tuning(&self) -> &SteeringTuning {
        &self.tuning
    }

    pub fn strategy_name(&self) -> &'static str {
        self.strategy.name()
    }

    pub fn steer(
        &self,
        agent: &Agent,
        ctx: &TickContext<'_>,
        world: &dyn SpatialQuery,
        rng: &mut dyn RngCore,
    ) -> Option<SteeringOutput> {
        if !agent.is_racing() {
            return None;
        }
        let desired = self.strategy.desired_direction(agent, ctx.waypoints)?;

        let speed = self.update_speed(agent, ctx.player, ctx.dt, rng);
        let desired = self.apply_avoidance(agent, &desired, world);

        let heading = if agent.velocity.norm_squared() > MIN_HEADING_SPEED_SQUARED {
            agent.velocity.normalize()
        } else {
            agent.forward()
        };
        let steered = smooth_steer(&heading, &desired, &agent.traits.steering, ctx.dt);

        let blend = (ctx.dt * self.tuning.velocity_blend_rate).clamp(0.0, 1.0);
        let mut velocity = agent.velocity.lerp(&(steered * speed), blend);

        let mut orientation = match look_rotation(&steered) {
            Some(target) => slerp(&agent.orientation, &target, ctx.dt * agent.traits.steering.turn_rate),
            None => agent.orientation,
        };

        let travelled = velocity.norm() * ctx.dt;

        let mut position = agent.position;
        let grounded = match self.probe_ground(&position, world) {
            Some(hit) => {
                position.y = hit.point.y + self.tuning.ground_clearance;
                orientation = align_to_ground(&orientation, &hit.normal, ctx.dt * self.tuning.ground_align_rate);
                velocity.y = 0.0;
                true
            }
            None => false,
        };

        Some(SteeringOutput {
            speed,
            velocity,
            orientation,
            position,
            travelled,
            grounded,
        })
    }

    pub fn apply(&self, agent: &mut Agent, output: SteeringOutput, ctx: &TickContext<'_>, rng: &mut dyn RngCore) {
        agent.current_speed = output.speed;
        agent.velocity = output.velocity;
        agent.orientation = output.orientation;
        agent.position = output.position;
        self.strategy.advance(agent, output.travelled, ctx.waypoints, ctx.dt, rng);
    }

    pub fn update_speed(&self, agent: &Agent, player: Option<&PlayerPose>, dt: f32, rng: &mut dyn RngCore) -> f32 {
        let tuning = &self.tuning;
        let traits = &agent.traits;
        let mut speed = tuning.base_speed * traits.speed_multiplier * traits.personality_speed_factor;

        if let Some(player) = player {
            let offset = player.position - agent.position;
            let distance = offset.norm();
            if distance > f32::EPSILON {
                let facing = agent.forward().dot(&(offset / distance));
                if facing > tuning.facing_threshold && distance < tuning.catch_up_range {
                    let catch_chance = traits.catch_up_bias
                        * inverse_lerp(tuning.catch_up_range, tuning.catch_up_full_range, distance);
                    if rng.gen::<f32>() < catch_chance * dt {
                        speed += tuning.catch_up_boost;
                    }
                }
            }
        }

        let low = tuning.base_speed * tuning.min_speed_factor;
        let high = tuning.base_speed * tuning.max_speed_factor;
        speed.max(low).min(high)
    }

    pub fn apply_avoidance(&self, agent: &Agent, desired: &Vec3, world: &dyn SpatialQuery) -> Vec3 {
        let origin = agent.position + up() * self.tuning.avoid_height;
        let hit = world.sphere_cast(
            &origin,
            self.tuning.avoid_radius,
            desired,
            self.tuning.avoid_distance,
            Category::Vehicle,
            Some(agent.id),
        );

        match hit {
            Some(hit) => {
                let away = up().cross(&hit.normal);
                (desired + away * self.tuning.avoid_strength)
                    .try_normalize(f32::EPSILON)
                    .unwrap_or(*desired)
            }
            None => *desired,
        }
    }

    fn probe_ground(&self, position: &Point, world: &dyn SpatialQuery) -> Option<RayHit> {
        let origin = position + up() * self.tuning.ground_probe_height;
        world.raycast(&origin, &(-up()), self.tuning.ground_check_distance, Category::Ground)
    }
}

// Never turns by more than max_steer_angle * dt * responsiveness per call
pub fn smooth_steer(current: &Vec3, desired: &Vec3, params: &SteeringParams, dt: f32) -> Vec3 {
    let max = params.max_steer_angle.to_radians();
    let angle = signed_angle(current, desired).clamp(-max, max);
    rotate_about_up(current, angle * dt * params.responsiveness)
}

pub fn inverse_lerp(a: f32, b: f32, value: f32) -> f32 {
    if (b - a).abs() < f32::EPSILON {
        return 0.0;
    }
    ((value - a) / (b - a)).clamp(0.0, 1.0)
}

fn slerp(from: &Rotation, to: &Rotation, t: f32) -> Rotation {
    let t = t.clamp(0.0, 1.0);
    from.try_slerp(to, t, 1e-6).unwrap_or(*to)
}

fn align_to_ground(orientation: &Rotation, normal: &Vec3, t: f32) -> Rotation {
    let current_up = orientation * up();
    let tilt = UnitQuaternion::rotation_between(&current_up, normal).unwrap_or_else(UnitQuaternion::identity);
    slerp(orientation, &(tilt * orientation), t)
}
