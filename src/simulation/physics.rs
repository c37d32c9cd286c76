use super::{Agent, AgentId, AgentPool, AgentState, Point, Rotation, Vec3};
use crate::config::SteeringTuning;
use std::collections::HashSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Vehicle,
    Ground,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit {
    pub point: Point,
    pub normal: Vec3,
    pub distance: f32,
    pub agent: Option<AgentId>,
}

pub trait SpatialQuery {
    // Entities already overlapping the sphere at origin are not reported
    fn sphere_cast(
        &self,
        origin: &Point,
        radius: f32,
        direction: &Vec3,
        max_distance: f32,
        category: Category,
        ignore: Option<AgentId>,
    ) -> Option<RayHit>;

    fn raycast(&self, origin: &Point, direction: &Vec3, max_distance: f32, category: Category) -> Option<RayHit> {
        self.sphere_cast(origin, 0.0, direction, max_distance, category, None)
    }

    fn overlap_box(&self, center: &Point, half_extents: &Vec3, orientation: &Rotation, category: Category) -> Vec<AgentId>;
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GroundPlane {
    pub point: Point,
    pub normal: Vec3,
    pub category: Category,
}

impl GroundPlane {
    pub fn new(point: Point, normal: Vec3) -> Option<Self> {
        normal.try_normalize(f32::EPSILON).map(|normal| Self {
            point,
            normal,
            category: Category::Ground,
        })
    }

    pub fn flat(height: f32) -> Self {
        Self {
            point: Point::new(0.0, height, 0.0),
            normal: Vec3::y(),
            category: Category::Ground,
        }
    }

    fn sweep(&self, origin: &Point, radius: f32, direction: &Vec3, max_distance: f32) -> Option<RayHit> {
        // Face the normal toward the side the sweep starts on
        let mut normal = self.normal;
        let mut separation = normal.dot(&(origin - self.point));
        if separation < 0.0 {
            normal = -normal;
            separation = -separation;
        }
        if separation < radius {
            return None;
        }

        let approach = -normal.dot(direction);
        if approach <= f32::EPSILON {
            return None;
        }

        let distance = (separation - radius) / approach;
        if distance > max_distance {
            return None;
        }

        Some(RayHit {
            point: origin + direction * distance - normal * radius,
            normal,
            distance,
            agent: None,
        })
    }
}

pub struct WorldQuery<'a> {
    agents: &'a [Agent],
    ground: &'a [GroundPlane],
    agent_radius: f32,
}

impl<'a> WorldQuery<'a> {
    pub fn new(agents: &'a [Agent], ground: &'a [GroundPlane], agent_radius: f32) -> Self {
        Self { agents, ground, agent_radius }
    }

    fn sweep_agent(&self, agent: &Agent, origin: &Point, radius: f32, direction: &Vec3, max_distance: f32) -> Option<RayHit> {
        let reach = radius + self.agent_radius;
        let offset = origin - agent.position;
        let c = offset.norm_squared() - reach * reach;
        if c <= 0.0 {
            return None;
        }

        let b = offset.dot(direction);
        if b > 0.0 {
            return None;
        }

        let discriminant = b * b - c;
        if discriminant < 0.0 {
            return None;
        }

        let distance = -b - discriminant.sqrt();
        if distance > max_distance {
            return None;
        }

        let center = origin + direction * distance;
        let normal = (center - agent.position).try_normalize(f32::EPSILON).unwrap_or(-direction);
        Some(RayHit {
            point: agent.position + normal * self.agent_radius,
            normal,
            distance,
            agent: Some(agent.id),
        })
    }
}

impl SpatialQuery for WorldQuery<'_> {
    fn sphere_cast(
        &self,
        origin: &Point,
        radius: f32,
        direction: &Vec3,
        max_distance: f32,
        category: Category,
        ignore: Option<AgentId>,
    ) -> Option<RayHit> {
        let direction = direction.try_normalize(f32::EPSILON)?;

        let agent_hits = self
            .agents
            .iter()
            .filter(|a| a.active && a.category == category && Some(a.id) != ignore)
            .filter_map(|a| self.sweep_agent(a, origin, radius, &direction, max_distance));

        let ground_hits = self
            .ground
            .iter()
            .filter(|g| g.category == category)
            .filter_map(|g| g.sweep(origin, radius, &direction, max_distance));

        agent_hits
            .chain(ground_hits)
            .min_by(|a, b| a.distance.total_cmp(&b.distance))
    }

    fn overlap_box(&self, center: &Point, half_extents: &Vec3, orientation: &Rotation, category: Category) -> Vec<AgentId> {
        let radius_squared = self.agent_radius * self.agent_radius;

        self.agents
            .iter()
            .filter(|a| a.active && a.category == category)
            .filter(|a| {
                let local = orientation.inverse_transform_vector(&(a.position - center));
                let closest = Vec3::new(
                    local.x.clamp(-half_extents.x, half_extents.x),
                    local.y.clamp(-half_extents.y, half_extents.y),
                    local.z.clamp(-half_extents.z, half_extents.z),
                );
                (local - closest).norm_squared() <= radius_squared
            })
            .map(|a| a.id)
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CollisionEvent {
    pub agent: AgentId,
    pub other: AgentId,
    pub relative_speed: f32,
}

pub struct PhysicsEngine {
    agent_radius: f32,
    coast_drag: f32,
    contacts: HashSet<(AgentId, AgentId)>,
}

impl PhysicsEngine {
    pub fn new(tuning: &SteeringTuning) -> Self {
        Self {
            agent_radius: tuning.agent_radius,
            coast_drag: tuning.coast_drag,
            contacts: HashSet::new(),
        }
    }

    pub fn integrate(&self, pool: &mut AgentPool, dt: f32) {
        let damping = (1.0 - self.coast_drag * dt).max(0.0);

        for agent in pool.iter_mut().filter(|a| a.active) {
            if agent.state != AgentState::Racing {
                // Coasting, no controller input
                agent.velocity *= damping;
                agent.current_speed = agent.velocity.norm();
            }
            agent.position += agent.velocity * dt;
        }
    }

    pub fn detect_collisions(&mut self, pool: &AgentPool) -> Vec<CollisionEvent> {
        let reach = 2.0 * self.agent_radius;
        let reach_squared = reach * reach;
        let agents = pool.agents();

        let mut touching = HashSet::new();
        let mut events = Vec::new();

        for (i, a) in agents.iter().enumerate().filter(|(_, a)| a.active) {
            for b in agents[i + 1..].iter().filter(|b| b.active) {
                if (a.position - b.position).norm_squared() > reach_squared {
                    continue;
                }

                let pair = (a.id, b.id);
                if !self.contacts.contains(&pair) {
                    let relative_speed = (a.velocity - b.velocity).norm();
                    log::debug!("Contact between agent {} and {} at {:.2} units/s", a.id.0, b.id.0, relative_speed);
                    events.push(CollisionEvent { agent: a.id, other: b.id, relative_speed });
                    events.push(CollisionEvent { agent: b.id, other: a.id, relative_speed });
                }
                touching.insert(pair);
            }
        }

        self.contacts = touching;
        events
    }

    // Forget touching pairs so the next contact reports again
    pub fn reset(&mut self) {
        self.contacts.clear();
    }

    pub fn contact_count(&self) -> usize {
        self.contacts.len()
    }
}
