use serde::{Deserialize, Serialize};
use super::{ConfigError, Validate};

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct TrackConfig {
    pub track: TrackLayout,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TrackLayout {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub waypoints: Vec<WaypointSpec>,
    #[serde(default = "default_ground")]
    pub ground: Vec<GroundPlaneSpec>,
    #[serde(default)]
    pub player: Option<PlayerStart>,
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq)]
pub struct WaypointSpec {
    pub position: [f32; 3],
    // Derived from the next waypoint when omitted
    #[serde(default)]
    pub forward: Option<[f32; 3]>,
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq)]
pub struct GroundPlaneSpec {
    pub point: [f32; 3],
    pub normal: [f32; 3],
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq)]
pub struct PlayerStart {
    pub position: [f32; 3],
    pub forward: [f32; 3],
}

fn default_ground() -> Vec<GroundPlaneSpec> {
    vec![GroundPlaneSpec { point: [0.0, 0.0, 0.0], normal: [0.0, 1.0, 0.0] }]
}

impl Default for TrackLayout {
    fn default() -> Self {
        let corners = [
            [0.0, 0.0, 0.0],
            [0.0, 0.0, 100.0],
            [0.0, 0.0, 200.0],
            [60.0, 0.0, 200.0],
            [60.0, 0.0, 100.0],
            [60.0, 0.0, 0.0],
            [0.0, 0.0, 0.0],
        ];
        Self {
            name: "Default Loop".to_string(),
            description: "Rectangular test loop".to_string(),
            waypoints: corners
                .iter()
                .map(|&position| WaypointSpec { position, forward: None })
                .collect(),
            ground: default_ground(),
            player: None,
        }
    }
}

fn is_zero(v: [f32; 3]) -> bool {
    v.iter().all(|c| c.abs() < f32::EPSILON)
}

impl Validate for TrackConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        let track = &self.track;

        if track.waypoints.len() < 2 {
            // Legal, racers simply stay inert
            log::warn!("Track '{}' has {} waypoints, drive plans will be empty", track.name, track.waypoints.len());
        }

        for (index, waypoint) in track.waypoints.iter().enumerate() {
            if let Some(forward) = waypoint.forward {
                if is_zero(forward) {
                    return Err(ConfigError::DegenerateForward { index });
                }
            }
        }

        for (index, plane) in track.ground.iter().enumerate() {
            if is_zero(plane.normal) {
                return Err(ConfigError::DegenerateGround { index });
            }
        }

        Ok(())
    }
}
