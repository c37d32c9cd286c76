use crate::config::{PersonalityProfile, SpeedTierProfile};
use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Personality {
    Racer,
    Challenger,
    Drifter,
    Blocker,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SpeedTier {
    Slow,
    Normal,
    Fast,
    Elite,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SteeringParams {
    pub turn_rate: f32,
    pub responsiveness: f32,
    pub max_steer_angle: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AgentTraits {
    pub personality: Personality,
    pub steering: SteeringParams,
    pub personality_speed_factor: f32,
    pub tier: SpeedTier,
    pub speed_multiplier: f32,
    pub catch_up_bias: f32,
    pub lane_offset: f32,
}

impl Default for AgentTraits {
    fn default() -> Self {
        Self {
            personality: Personality::Racer,
            steering: SteeringParams {
                turn_rate: 6.0,
                responsiveness: 8.0,
                max_steer_angle: 45.0,
            },
            personality_speed_factor: 1.0,
            tier: SpeedTier::Normal,
            speed_multiplier: 1.0,
            catch_up_bias: 0.0,
            lane_offset: 0.0,
        }
    }
}

impl From<&PersonalityProfile> for SteeringParams {
    fn from(profile: &PersonalityProfile) -> Self {
        Self {
            turn_rate: profile.turn_rate,
            responsiveness: profile.responsiveness,
            max_steer_angle: profile.max_steer_angle,
        }
    }
}

fn bucket<T>(rows: &[T], draw: f32, upper_bound: impl Fn(&T) -> f32) -> Option<&T> {
    rows.iter()
        .find(|row| draw < upper_bound(row))
        .or_else(|| rows.last())
}

#[derive(Debug, Clone)]
pub struct TraitAssigner {
    personalities: Vec<PersonalityProfile>,
    speed_tiers: Vec<SpeedTierProfile>,
}

impl TraitAssigner {
    pub fn new(personalities: Vec<PersonalityProfile>, speed_tiers: Vec<SpeedTierProfile>) -> Self {
        Self { personalities, speed_tiers }
    }

    pub fn personality_table(&self) -> &[PersonalityProfile] {
        &self.personalities
    }

    pub fn personality_for(&self, draw: f32) -> Option<&PersonalityProfile> {
        bucket(&self.personalities, draw, |row| row.upper_bound)
    }

    pub fn tier_for(&self, draw: f32) -> Option<&SpeedTierProfile> {
        bucket(&self.speed_tiers, draw, |row| row.upper_bound)
    }

    pub fn assign_personality(&self, rng: &mut dyn RngCore) -> (Personality, SteeringParams, f32) {
        let draw: f32 = rng.gen();
        match self.personality_for(draw) {
            Some(profile) => (profile.personality, SteeringParams::from(profile), profile.speed_factor),
            None => {
                let fallback = AgentTraits::default();
                (fallback.personality, fallback.steering, fallback.personality_speed_factor)
            }
        }
    }

    pub fn assign_speed_tier(&self, rng: &mut dyn RngCore) -> (SpeedTier, f32, f32) {
        let draw: f32 = rng.gen();
        match self.tier_for(draw).copied() {
            Some(tier) => {
                let multiplier = rng.gen_range(tier.multiplier_min..=tier.multiplier_max);
                (tier.tier, multiplier, tier.catch_up_bias)
            }
            None => (SpeedTier::Normal, 1.0, 0.0),
        }
    }

    pub fn assign_lane_offset(&self, personality: Personality, rng: &mut dyn RngCore) -> f32 {
        let range = self
            .personalities
            .iter()
            .find(|row| row.personality == personality)
            .map(|row| row.lane_offset_range)
            .unwrap_or(0.0);

        if range > 0.0 {
            rng.gen_range(-range..=range)
        } else {
            0.0
        }
    }

    pub fn assign(&self, rng: &mut dyn RngCore) -> AgentTraits {
        let (tier, speed_multiplier, catch_up_bias) = self.assign_speed_tier(rng);
        let (personality, steering, personality_speed_factor) = self.assign_personality(rng);
        let lane_offset = self.assign_lane_offset(personality, rng);

        AgentTraits {
            personality,
            steering,
            personality_speed_factor,
            tier,
            speed_multiplier,
            catch_up_bias,
            lane_offset,
        }
    }
}
