use super::{look_rotation, up, AgentId, AgentPool, Category, PlayerPose, Point, Rotation, SpatialQuery, Vec3, WorldQuery};
use crate::config::SpawnParams;
use rand::Rng;

const COINCIDENT_SQUARED: f32 = 0.01;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReferenceFrame {
    pub origin: Point,
    pub forward: Vec3,
    pub right: Vec3,
}

impl ReferenceFrame {
    pub fn from_pose(pose: &PlayerPose) -> Self {
        let forward = pose.forward.try_normalize(f32::EPSILON).unwrap_or_else(Vec3::z);
        let right = up()
            .cross(&forward)
            .try_normalize(f32::EPSILON)
            .unwrap_or_else(Vec3::x);
        Self {
            origin: pose.position,
            forward,
            right,
        }
    }

    pub fn point(&self, forward_offset: f32, lateral_offset: f32) -> Point {
        self.origin + self.forward * forward_offset + self.right * lateral_offset
    }

    pub fn orientation(&self) -> Rotation {
        look_rotation(&self.forward).unwrap_or_else(Rotation::identity)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpawnRecord {
    pub position: Point,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub agent: AgentId,
    // Before jitter, equal to position for fallbacks
    pub candidate: Point,
    pub position: Point,
    pub attempts: u32,
    pub fallback: bool,
}

#[derive(Debug, Clone, Default)]
pub struct SpawnReport {
    pub placements: Vec<Placement>,
    pub records: Vec<SpawnRecord>,
    pub pushes: usize,
}

impl SpawnReport {
    pub fn fallback_count(&self) -> usize {
        self.placements.iter().filter(|p| p.fallback).count()
    }
}

#[derive(Debug, Clone)]
pub struct SpawnPlacementResolver {
    params: SpawnParams,
    agent_radius: f32,
}

impl SpawnPlacementResolver {
    pub fn new(params: SpawnParams, agent_radius: f32) -> Self {
        Self { params, agent_radius }
    }

    pub fn params(&self) -> &SpawnParams {
        &self.params
    }

    // Must run before the first tick
    pub fn place_all<R: Rng + ?Sized>(&self, pool: &mut AgentPool, frame: &ReferenceFrame, rng: &mut R) -> SpawnReport {
        if pool.active_count() > 0 {
            log::warn!("Spawn placement started with {} active agents, deactivating them", pool.active_count());
            pool.deactivate_all();
        }

        let mut report = SpawnReport::default();
        let ids: Vec<AgentId> = pool.iter().map(|a| a.id).collect();

        for id in ids {
            let placement = self.place(pool, id, frame, &mut report, rng);
            report.placements.push(placement);
        }

        log::info!(
            "Placed {} agents ({} fallbacks, {} pushes)",
            report.placements.len(),
            report.fallback_count(),
            report.pushes
        );
        report
    }

    fn place<R: Rng + ?Sized>(
        &self,
        pool: &mut AgentPool,
        id: AgentId,
        frame: &ReferenceFrame,
        report: &mut SpawnReport,
        rng: &mut R,
    ) -> Placement {
        let params = &self.params;
        let orientation = frame.orientation();

        for attempt in 1..=params.max_attempts {
            let candidate = self.candidate(frame, rng);
            if !self.is_separated(&candidate, &report.records) {
                continue;
            }

            // Jitter is cosmetic and not checked against the separation
            let position = candidate
                + frame.right * rng.gen_range(params.lateral_jitter_min..=params.lateral_jitter_max)
                + frame.forward * rng.gen_range(params.forward_jitter_min..=params.forward_jitter_max);

            pool.activate(id, position, orientation);
            report.records.push(SpawnRecord { position: candidate });
            report.pushes += self.resolve_overlap(pool, id);

            return Placement {
                agent: id,
                candidate,
                position,
                attempts: attempt,
                fallback: false,
            };
        }

        let lateral = rng.gen_range(-params.side_range..=params.side_range);
        let position = frame.point(params.forward_max, lateral);
        log::debug!(
            "Agent {} found no free spot in {} attempts, falling back to ({:.1}, {:.1}, {:.1})",
            id.0, params.max_attempts, position.x, position.y, position.z
        );
        pool.activate(id, position, orientation);

        Placement {
            agent: id,
            candidate: position,
            position,
            attempts: params.max_attempts,
            fallback: true,
        }
    }

    pub fn candidate<R: Rng + ?Sized>(&self, frame: &ReferenceFrame, rng: &mut R) -> Point {
        let forward = rng.gen_range(self.params.forward_min..=self.params.forward_max);
        let lateral = rng.gen_range(-self.params.side_range..=self.params.side_range);
        frame.point(forward, lateral)
    }

    pub fn is_separated(&self, candidate: &Point, records: &[SpawnRecord]) -> bool {
        records
            .iter()
            .all(|record| (candidate - record.position).norm() >= self.params.min_spawn_distance)
    }

    pub fn resolve_overlap(&self, pool: &mut AgentPool, placed: AgentId) -> usize {
        let (center, orientation, fallback_axis) = match pool.get(placed) {
            Some(agent) => (agent.position, agent.orientation, agent.right()),
            None => return 0,
        };

        let half_extents = Vec3::from(self.params.separation_half_extents);
        let hits = WorldQuery::new(pool.agents(), &[], self.agent_radius)
            .overlap_box(&center, &half_extents, &orientation, Category::Vehicle);

        let mut pushed = 0;
        for id in hits.into_iter().filter(|&id| id != placed) {
            if let Some(other) = pool.get_mut(id) {
                let mut away = other.position - center;
                away.y = 0.0;
                if away.norm_squared() < COINCIDENT_SQUARED {
                    away = fallback_axis;
                }
                if let Some(direction) = away.try_normalize(f32::EPSILON) {
                    other.position += direction * self.params.push_strength;
                    pushed += 1;
                }
            }
        }
        pushed
    }
}
