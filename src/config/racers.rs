use serde::{Deserialize, Serialize};
use super::{ensure_finite, ensure_non_negative, ensure_ordered, ensure_positive, ConfigError, Validate};
use crate::simulation::{Personality, SpeedTier};

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct RacersConfig {
    pub simulation: SimulationParams,
    pub steering: SteeringTuning,
    pub segment_plan: SegmentPlanTuning,
    pub waypoint_chase: WaypointChaseTuning,
    pub speed_tiers: Vec<SpeedTierProfile>,
    pub crash: CrashRules,
    pub spawn: SpawnParams,
    pub random: RandomConfig,
    pub performance: PerformanceConfig,
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    #[default]
    SegmentPlan,
    WaypointChase,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SimulationParams {
    pub pool_size: u32,
    pub dt: f32,
    pub simulation_duration: f32,
    pub strategy: StrategyKind,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SteeringTuning {
    pub base_speed: f32,
    pub catch_up_boost: f32,
    pub catch_up_range: f32,
    pub catch_up_full_range: f32,
    pub facing_threshold: f32,
    pub min_speed_factor: f32,
    pub max_speed_factor: f32,
    pub avoid_distance: f32,
    pub avoid_radius: f32,
    pub avoid_height: f32,
    pub avoid_strength: f32,
    pub velocity_blend_rate: f32,
    pub ground_probe_height: f32,
    pub ground_check_distance: f32,
    pub ground_clearance: f32,
    pub ground_align_rate: f32,
    pub agent_radius: f32,
    pub coast_drag: f32,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SegmentPlanTuning {
    pub curve_smoothness: f32,
    pub turn_strength: f32,
    pub turn_threshold_deg: f32,
    pub personalities: Vec<PersonalityProfile>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct WaypointChaseTuning {
    pub look_ahead_distance: f32,
    pub wander_sigma_deg: f32,
    pub wander_max_deg: f32,
    pub personalities: Vec<PersonalityProfile>,
}

// A draw below upper_bound, and at or above the previous row's bound, selects the row
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq)]
pub struct PersonalityProfile {
    pub personality: Personality,
    pub upper_bound: f32,
    pub turn_rate: f32,
    pub responsiveness: f32,
    pub max_steer_angle: f32,
    pub speed_factor: f32,
    pub lane_offset_range: f32,
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq)]
pub struct SpeedTierProfile {
    pub tier: SpeedTier,
    pub upper_bound: f32,
    pub multiplier_min: f32,
    pub multiplier_max: f32,
    pub catch_up_bias: f32,
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct CrashRules {
    pub impact_threshold: f32,
    pub recovery_delay: f32,
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct SpawnParams {
    pub forward_min: f32,
    pub forward_max: f32,
    pub side_range: f32,
    pub min_spawn_distance: f32,
    pub max_attempts: u32,
    pub lateral_jitter_min: f32,
    pub lateral_jitter_max: f32,
    pub forward_jitter_min: f32,
    pub forward_jitter_max: f32,
    pub separation_half_extents: [f32; 3],
    pub push_strength: f32,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct RandomConfig {
    pub seed: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PerformanceConfig {
    pub enable_tick_timing: bool,
    pub timing_samples: u32,
}

impl Default for SimulationParams {
    fn default() -> Self {
        Self {
            pool_size: 99,
            dt: 1.0 / 50.0, // 50 Hz fixed timestep
            simulation_duration: 60.0,
            strategy: StrategyKind::SegmentPlan,
        }
    }
}

impl Default for SteeringTuning {
    fn default() -> Self {
        Self {
            base_speed: 12.0,
            catch_up_boost: 4.0,
            catch_up_range: 40.0,
            catch_up_full_range: 10.0,
            facing_threshold: 0.15,
            min_speed_factor: 0.8,
            max_speed_factor: 1.6,
            avoid_distance: 3.0,
            avoid_radius: 0.6,
            avoid_height: 0.5,
            avoid_strength: 2.0,
            velocity_blend_rate: 4.0,
            ground_probe_height: 1.5,
            ground_check_distance: 3.0,
            ground_clearance: 1.0,
            ground_align_rate: 8.0,
            agent_radius: 0.6,
            coast_drag: 0.5,
        }
    }
}

fn profile(
    personality: Personality,
    upper_bound: f32,
    (turn_rate, responsiveness, max_steer_angle): (f32, f32, f32),
    speed_factor: f32,
    lane_offset_range: f32,
) -> PersonalityProfile {
    PersonalityProfile {
        personality,
        upper_bound,
        turn_rate,
        responsiveness,
        max_steer_angle,
        speed_factor,
        lane_offset_range,
    }
}

impl Default for SegmentPlanTuning {
    fn default() -> Self {
        Self {
            curve_smoothness: 4.0,
            turn_strength: 1.0,
            turn_threshold_deg: 3.0,
            personalities: vec![
                profile(Personality::Racer, 0.35, (7.0, 9.0, 35.0), 1.1, 0.5),
                profile(Personality::Challenger, 0.6, (6.0, 7.0, 40.0), 1.05, 1.0),
                profile(Personality::Drifter, 1.0, (4.0, 4.0, 55.0), 0.9, 2.0),
            ],
        }
    }
}

impl Default for WaypointChaseTuning {
    fn default() -> Self {
        Self {
            look_ahead_distance: 6.0,
            wander_sigma_deg: 25.0,
            wander_max_deg: 12.0,
            personalities: vec![
                profile(Personality::Racer, 0.35, (7.0, 8.0, 35.0), 1.1, 0.5),
                profile(Personality::Challenger, 0.6, (6.0, 7.0, 40.0), 1.05, 1.0),
                profile(Personality::Blocker, 0.8, (5.0, 6.0, 30.0), 1.0, 0.75),
                profile(Personality::Drifter, 1.0, (4.0, 4.0, 55.0), 0.9, 2.0),
            ],
        }
    }
}

pub fn default_speed_tiers() -> Vec<SpeedTierProfile> {
    let tier = |tier: SpeedTier, upper_bound: f32, multiplier_min: f32, multiplier_max: f32, catch_up_bias: f32| SpeedTierProfile {
        tier,
        upper_bound,
        multiplier_min,
        multiplier_max,
        catch_up_bias,
    };
    vec![
        tier(SpeedTier::Slow, 0.25, 0.85, 0.95, 0.1),
        tier(SpeedTier::Normal, 0.6, 0.95, 1.05, 0.3),
        tier(SpeedTier::Fast, 0.85, 1.05, 1.15, 0.6),
        tier(SpeedTier::Elite, 1.0, 1.15, 1.3, 1.0),
    ]
}

impl Default for CrashRules {
    fn default() -> Self {
        Self {
            impact_threshold: 4.0,
            recovery_delay: 1.2,
        }
    }
}

impl Default for SpawnParams {
    fn default() -> Self {
        Self {
            forward_min: 20.0,
            forward_max: 220.0,
            side_range: 8.0,
            min_spawn_distance: 3.5,
            max_attempts: 25,
            lateral_jitter_min: -0.15,
            lateral_jitter_max: 0.15,
            forward_jitter_min: -0.3,
            forward_jitter_max: 0.3,
            separation_half_extents: [0.5, 0.5, 0.5],
            push_strength: 1.2,
        }
    }
}

impl Default for PerformanceConfig {
    fn default() -> Self {
        Self {
            enable_tick_timing: true,
            timing_samples: 120,
        }
    }
}

impl RacersConfig {
    pub fn speed_tier_table(&self) -> Vec<SpeedTierProfile> {
        if self.speed_tiers.is_empty() {
            log::debug!("No speed tiers configured, using built-in tiers");
            default_speed_tiers()
        } else {
            self.speed_tiers.clone()
        }
    }
}

fn validate_bounds(table: &'static str, bounds: impl Iterator<Item = f32>) -> Result<(), ConfigError> {
    let mut previous = 0.0;
    let mut seen = 0;
    for (index, value) in bounds.enumerate() {
        if value <= previous || value > 1.0 {
            return Err(ConfigError::BadThreshold { table, index, value });
        }
        previous = value;
        seen += 1;
    }
    if seen == 0 {
        return Err(ConfigError::EmptyTable { table });
    }
    Ok(())
}

fn validate_personalities(table: &'static str, rows: &[PersonalityProfile]) -> Result<(), ConfigError> {
    validate_bounds(table, rows.iter().map(|row| row.upper_bound))?;
    for row in rows {
        let name = format!("{table}.{:?}", row.personality);
        ensure_positive(&format!("{name}.turn_rate"), row.turn_rate)?;
        ensure_positive(&format!("{name}.responsiveness"), row.responsiveness)?;
        ensure_positive(&format!("{name}.max_steer_angle"), row.max_steer_angle)?;
        ensure_positive(&format!("{name}.speed_factor"), row.speed_factor)?;
        ensure_non_negative(&format!("{name}.lane_offset_range"), row.lane_offset_range)?;
    }
    Ok(())
}

impl Validate for RacersConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        // Validate simulation parameters
        let sim = &self.simulation;
        if sim.pool_size == 0 {
            return Err(ConfigError::NotPositive { field: "simulation.pool_size".into(), value: 0.0 });
        }
        ensure_positive("simulation.dt", sim.dt)?;
        ensure_positive("simulation.simulation_duration", sim.simulation_duration)?;

        // Validate steering tuning
        let steering = &self.steering;
        ensure_positive("steering.base_speed", steering.base_speed)?;
        ensure_ordered("steering speed factors", steering.min_speed_factor, steering.max_speed_factor)?;
        ensure_ordered("steering catch-up ranges", steering.catch_up_full_range, steering.catch_up_range)?;
        ensure_positive("steering.avoid_radius", steering.avoid_radius)?;
        ensure_positive("steering.velocity_blend_rate", steering.velocity_blend_rate)?;
        ensure_positive("steering.ground_check_distance", steering.ground_check_distance)?;
        ensure_positive("steering.agent_radius", steering.agent_radius)?;

        // Validate trait tables
        validate_personalities("segment_plan.personalities", &self.segment_plan.personalities)?;
        validate_personalities("waypoint_chase.personalities", &self.waypoint_chase.personalities)?;
        ensure_positive("segment_plan.turn_threshold_deg", self.segment_plan.turn_threshold_deg)?;
        ensure_non_negative("segment_plan.curve_smoothness", self.segment_plan.curve_smoothness)?;
        ensure_finite("segment_plan.turn_strength", self.segment_plan.turn_strength)?;
        ensure_positive("waypoint_chase.look_ahead_distance", self.waypoint_chase.look_ahead_distance)?;
        ensure_finite("waypoint_chase.wander_sigma_deg", self.waypoint_chase.wander_sigma_deg)?;
        ensure_finite("waypoint_chase.wander_max_deg", self.waypoint_chase.wander_max_deg)?;

        let tiers = self.speed_tier_table();
        validate_bounds("speed_tiers", tiers.iter().map(|tier| tier.upper_bound))?;
        for tier in &tiers {
            ensure_ordered(&format!("speed_tiers.{:?}.multiplier", tier.tier), tier.multiplier_min, tier.multiplier_max)?;
            if !(0.0..=1.0).contains(&tier.catch_up_bias) {
                return Err(ConfigError::OutOfUnitRange {
                    field: format!("speed_tiers.{:?}.catch_up_bias", tier.tier),
                    value: tier.catch_up_bias,
                });
            }
        }

        // Validate crash rules
        ensure_positive("crash.recovery_delay", self.crash.recovery_delay)?;

        // Validate spawn parameters
        let spawn = &self.spawn;
        ensure_ordered("spawn.forward", spawn.forward_min, spawn.forward_max)?;
        ensure_ordered("spawn.lateral_jitter", spawn.lateral_jitter_min, spawn.lateral_jitter_max)?;
        ensure_ordered("spawn.forward_jitter", spawn.forward_jitter_min, spawn.forward_jitter_max)?;
        ensure_non_negative("spawn.side_range", spawn.side_range)?;
        ensure_non_negative("spawn.min_spawn_distance", spawn.min_spawn_distance)?;
        if spawn.max_attempts == 0 {
            return Err(ConfigError::NotPositive { field: "spawn.max_attempts".into(), value: 0.0 });
        }

        // Validate performance config
        if self.performance.timing_samples == 0 {
            return Err(ConfigError::NotPositive { field: "performance.timing_samples".into(), value: 0.0 });
        }

        Ok(())
    }
}
