use anyhow::Result;
use thiserror::Error;

pub mod track;
pub mod racers;

pub use track::*;
pub use racers::*;

#[derive(Debug, Clone, Default)]
pub struct SimulationConfig {
    pub track: TrackConfig,
    pub racers: RacersConfig,
}

impl SimulationConfig {
    pub fn load_from_files(track_path: &str, racers_path: &str) -> Result<Self> {
        let track_content = std::fs::read_to_string(track_path)?;
        let racers_content = std::fs::read_to_string(racers_path)?;

        Self::from_toml_strs(&track_content, &racers_content)
    }

    pub fn from_toml_strs(track_content: &str, racers_content: &str) -> Result<Self> {
        let track: TrackConfig = toml::from_str(track_content)?;
        let racers: RacersConfig = toml::from_str(racers_content)?;

        // Validate configurations
        track.validate()?;
        racers.validate()?;

        Ok(SimulationConfig { track, racers })
    }
}

pub trait Validate {
    fn validate(&self) -> Result<(), ConfigError>;
}

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{table} table must contain at least one entry")]
    EmptyTable { table: &'static str },
    #[error("{table} thresholds must strictly increase within (0, 1], entry {index} has {value}")]
    BadThreshold { table: &'static str, index: usize, value: f32 },
    #[error("{field} range [{min}, {max}] is inverted")]
    InvertedRange { field: String, min: f32, max: f32 },
    #[error("{field} must be positive, got {value}")]
    NotPositive { field: String, value: f32 },
    #[error("{field} must be finite, got {value}")]
    NotFinite { field: String, value: f32 },
    #[error("{field} must be in range [0, 1], got {value}")]
    OutOfUnitRange { field: String, value: f32 },
    #[error("waypoint {index} has a zero-length forward direction")]
    DegenerateForward { index: usize },
    #[error("ground plane {index} has a zero-length normal")]
    DegenerateGround { index: usize },
}

pub(crate) fn ensure_positive(field: &str, value: f32) -> Result<(), ConfigError> {
    if value > 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(ConfigError::NotPositive { field: field.to_string(), value })
    }
}

pub(crate) fn ensure_finite(field: &str, value: f32) -> Result<(), ConfigError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(ConfigError::NotFinite { field: field.to_string(), value })
    }
}

pub(crate) fn ensure_non_negative(field: &str, value: f32) -> Result<(), ConfigError> {
    ensure_finite(field, value)?;
    if value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::NotPositive { field: field.to_string(), value })
    }
}

// Sampled with gen_range, so both ends must be finite
pub(crate) fn ensure_ordered(field: &str, min: f32, max: f32) -> Result<(), ConfigError> {
    ensure_finite(&format!("{field} min"), min)?;
    ensure_finite(&format!("{field} max"), max)?;
    if min <= max {
        Ok(())
    } else {
        Err(ConfigError::InvertedRange { field: field.to_string(), min, max })
    }
}
