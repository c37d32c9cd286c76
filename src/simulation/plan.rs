use super::{up, GroundPlane, Point, PlayerPose, Vec3};
use crate::config::{SegmentPlanTuning, TrackConfig};
use nalgebra::{UnitQuaternion, Vector3};

// Waypoint pairs closer than this are skipped
pub const MIN_SEGMENT_LENGTH: f32 = 1e-4;

const LANE_STEER_GAIN: f32 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Waypoint {
    pub position: Point,
    pub forward: Vec3,
}

pub trait WaypointSource {
    fn waypoints(&self) -> &[Waypoint];
}

impl WaypointSource for [Waypoint] {
    fn waypoints(&self) -> &[Waypoint] {
        self
    }
}

impl WaypointSource for Vec<Waypoint> {
    fn waypoints(&self) -> &[Waypoint] {
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct Track {
    pub name: String,
    waypoints: Vec<Waypoint>,
    pub ground: Vec<GroundPlane>,
    pub player_start: Option<PlayerPose>,
}

impl Track {
    pub fn new(name: impl Into<String>, waypoints: Vec<Waypoint>, ground: Vec<GroundPlane>) -> Self {
        Self {
            name: name.into(),
            waypoints,
            ground,
            player_start: None,
        }
    }

    pub fn from_positions(name: impl Into<String>, positions: &[Point], ground: Vec<GroundPlane>) -> Self {
        let waypoints = positions
            .iter()
            .enumerate()
            .map(|(i, &position)| Waypoint {
                position,
                forward: derived_forward(positions, i),
            })
            .collect();
        Self::new(name, waypoints, ground)
    }

    pub fn from_config(config: &TrackConfig) -> Self {
        let layout = &config.track;
        let positions: Vec<Point> = layout
            .waypoints
            .iter()
            .map(|w| Point::from(w.position))
            .collect();

        let waypoints = layout
            .waypoints
            .iter()
            .enumerate()
            .map(|(i, spec)| Waypoint {
                position: positions[i],
                forward: spec
                    .forward
                    .and_then(|f| Vector3::from(f).try_normalize(f32::EPSILON))
                    .unwrap_or_else(|| derived_forward(&positions, i)),
            })
            .collect();

        let ground = layout
            .ground
            .iter()
            .filter_map(|plane| GroundPlane::new(Point::from(plane.point), Vector3::from(plane.normal)))
            .collect();

        let mut track = Self::new(layout.name.clone(), waypoints, ground);
        track.player_start = layout.player.and_then(|player| {
            Vector3::from(player.forward)
                .try_normalize(f32::EPSILON)
                .map(|forward| PlayerPose { position: Point::from(player.position), forward })
        });
        track
    }

    pub fn start_pose(&self) -> PlayerPose {
        if let Some(pose) = self.player_start {
            return pose;
        }
        match self.waypoints.first() {
            Some(first) => PlayerPose { position: first.position, forward: first.forward },
            None => PlayerPose { position: Point::origin(), forward: Vec3::z() },
        }
    }
}

impl WaypointSource for Track {
    fn waypoints(&self) -> &[Waypoint] {
        &self.waypoints
    }
}

fn derived_forward(positions: &[Point], i: usize) -> Vec3 {
    let toward = match (positions.get(i), positions.get(i + 1)) {
        (Some(a), Some(b)) => b - a,
        _ if i > 0 => positions[i] - positions[i - 1],
        _ => Vec3::z(),
    };
    toward.try_normalize(MIN_SEGMENT_LENGTH).unwrap_or_else(Vec3::z)
}

// Yaw only: both vectors are flattened onto the ground plane first
pub fn signed_angle(from: &Vec3, to: &Vec3) -> f32 {
    let from = horizontal(from);
    let to = horizontal(to);
    if from.norm_squared() * to.norm_squared() < f32::EPSILON {
        return 0.0;
    }
    from.cross(&to).dot(&up()).atan2(from.dot(&to))
}

pub fn horizontal(v: &Vec3) -> Vec3 {
    v - up() * v.dot(&up())
}

pub fn rotate_about_up(v: &Vec3, angle: f32) -> Vec3 {
    UnitQuaternion::from_axis_angle(&Vector3::y_axis(), angle) * v
}

pub fn lateral(direction: &Vec3) -> Vec3 {
    direction.cross(&up())
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DriveSegment {
    pub start: Point,
    pub direction: Vec3,
    pub length: f32,
}

impl DriveSegment {
    pub fn displacement(&self) -> Vec3 {
        self.direction * self.length
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DrivePlan {
    segments: Vec<DriveSegment>,
}

impl DrivePlan {
    pub fn from_segments(segments: Vec<DriveSegment>) -> Self {
        Self { segments }
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn segments(&self) -> &[DriveSegment] {
        &self.segments
    }

    pub fn segment(&self, index: usize) -> Option<&DriveSegment> {
        self.segments.get(index)
    }

    pub fn total_length(&self) -> f32 {
        self.segments.iter().map(|s| s.length).sum()
    }

    pub fn polyline(&self, start: Point) -> Vec<Point> {
        let mut points = Vec::with_capacity(self.segments.len() + 1);
        let mut cursor = start;
        points.push(cursor);
        for segment in &self.segments {
            cursor += segment.displacement();
            points.push(cursor);
        }
        points
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PlanCursor {
    pub index: usize,
    pub travelled: f32,
}

impl PlanCursor {
    // True when the segment completed; wraps to the first after the last
    pub fn advance(&mut self, distance: f32, plan: &DrivePlan) -> bool {
        if plan.is_empty() {
            return false;
        }
        if self.index >= plan.len() {
            self.index = 0;
        }

        self.travelled += distance;
        if self.travelled >= plan.segments[self.index].length {
            self.travelled = 0.0;
            self.index = (self.index + 1) % plan.len();
            return true;
        }
        false
    }

    pub fn current<'a>(&self, plan: &'a DrivePlan) -> Option<&'a DriveSegment> {
        if plan.is_empty() {
            return None;
        }
        plan.segment(self.index % plan.len())
    }
}

pub struct DrivePlanBuilder<'a, S: WaypointSource + ?Sized> {
    source: &'a S,
    curve_smoothness: f32,
    turn_strength: f32,
    turn_threshold: f32,
}

impl<'a, S: WaypointSource + ?Sized> DrivePlanBuilder<'a, S> {
    pub fn new(source: &'a S, tuning: &SegmentPlanTuning) -> Self {
        Self {
            source,
            curve_smoothness: tuning.curve_smoothness,
            turn_strength: tuning.turn_strength,
            turn_threshold: tuning.turn_threshold_deg.to_radians(),
        }
    }

    pub fn curve_steps(&self) -> usize {
        (self.curve_smoothness.round().max(0.0) as usize).max(2)
    }

    pub fn build(&self, lane_offset: f32, start: Point) -> DrivePlan {
        let points = self.source.waypoints();
        let mut plan = DrivePlan::default();
        if points.len() < 2 {
            return plan;
        }

        let mut position = start;
        let mut previous: Option<Vec3> = None;

        for (i, pair) in points.windows(2).enumerate() {
            let delta = pair[1].position - pair[0].position;
            let distance = delta.norm();
            if distance < MIN_SEGMENT_LENGTH {
                log::debug!("Skipping coincident waypoints {} and {}", i, i + 1);
                continue;
            }
            let direction = delta / distance;

            if let Some(previous_direction) = previous {
                let angle = signed_angle(&previous_direction, &direction);
                if angle.abs() > self.turn_threshold {
                    self.push_curve(&mut plan, &mut position, (previous_direction, direction), angle, distance, lane_offset);
                    previous = Some(direction);
                    continue;
                }
            }

            self.push_straight(&mut plan, &mut position, direction, distance, lane_offset);
            previous = Some(direction);
        }

        plan
    }

    fn push_straight(&self, plan: &mut DrivePlan, position: &mut Point, direction: Vec3, distance: f32, lane_offset: f32) {
        let steering = skew(&direction, lane_offset * LANE_STEER_GAIN);
        plan.segments.push(DriveSegment {
            start: *position,
            direction: steering,
            length: distance,
        });
        *position += direction * distance;
    }

    // The lane offset only skews the emitted direction. `base` alone advances
    // the position so the plan stays on the waypoint centerline. Heading turns
    // about the vertical while the climb follows the new pair's slope.
    fn push_curve(
        &self,
        plan: &mut DrivePlan,
        position: &mut Point,
        (from, to): (Vec3, Vec3),
        angle: f32,
        distance: f32,
        lane_offset: f32,
    ) {
        let steps = self.curve_steps();
        let step_angle = angle / steps as f32;
        let step_distance = distance / steps as f32;
        let mut heading = horizontal(&from).try_normalize(f32::EPSILON).unwrap_or_else(Vec3::z);
        let climb = up() * to.dot(&up());
        let run = horizontal(&to).norm();

        for _ in 0..steps {
            heading = rotate_about_up(&heading, step_angle);
            let base = heading * run + climb;
            let steering = skew(&base, lane_offset * self.turn_strength * LANE_STEER_GAIN);
            plan.segments.push(DriveSegment {
                start: *position,
                direction: steering,
                length: step_distance,
            });
            *position += base * step_distance;
        }
    }
}

fn skew(direction: &Vec3, amount: f32) -> Vec3 {
    (direction + lateral(direction) * amount)
        .try_normalize(f32::EPSILON)
        .unwrap_or(*direction)
}
