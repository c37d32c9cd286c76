use race_pack::config::{default_speed_tiers, ConfigError, RacersConfig, SimulationConfig, Validate};
use anyhow::Result;

fn not_finite(config: &RacersConfig) -> String {
    match config.validate() {
        Err(ConfigError::NotFinite { field, value }) => {
            assert!(!value.is_finite());
            field
        }
        other => panic!("expected a non-finite error, got {:?}", other),
    }
}

#[test]
fn test_infinite_lane_offset_from_file_is_rejected() -> Result<()> {
    let track = std::fs::read_to_string("track.toml")?;
    let racers = r#"
[[segment_plan.personalities]]
personality = "racer"
upper_bound = 1.0
turn_rate = 7.0
responsiveness = 9.0
max_steer_angle = 35.0
speed_factor = 1.1
lane_offset_range = inf
"#;

    let error = SimulationConfig::from_toml_strs(&track, racers).unwrap_err();
    match error.downcast_ref::<ConfigError>() {
        Some(ConfigError::NotFinite { field, .. }) => assert!(field.ends_with("lane_offset_range")),
        other => panic!("expected a non-finite error, got {:?}", other),
    }
    Ok(())
}

#[test]
fn test_infinite_lane_offset_is_rejected() {
    let mut config = RacersConfig::default();
    config.waypoint_chase.personalities[2].lane_offset_range = f32::INFINITY;
    assert_eq!(not_finite(&config), "waypoint_chase.personalities.Blocker.lane_offset_range");
}

#[test]
fn test_infinite_multiplier_bounds_are_rejected() {
    let mut config = RacersConfig::default();
    config.speed_tiers = default_speed_tiers();
    config.speed_tiers[3].multiplier_max = f32::INFINITY;
    assert_eq!(not_finite(&config), "speed_tiers.Elite.multiplier max");

    config.speed_tiers[3].multiplier_max = 1.3;
    config.speed_tiers[0].multiplier_min = f32::NEG_INFINITY;
    assert_eq!(not_finite(&config), "speed_tiers.Slow.multiplier min");
}

#[test]
fn test_infinite_spawn_ranges_are_rejected() {
    let mut config = RacersConfig::default();
    config.spawn.forward_max = f32::INFINITY;
    assert_eq!(not_finite(&config), "spawn.forward max");

    let mut config = RacersConfig::default();
    config.spawn.forward_min = f32::NEG_INFINITY;
    assert_eq!(not_finite(&config), "spawn.forward min");

    let mut config = RacersConfig::default();
    config.spawn.side_range = f32::INFINITY;
    assert_eq!(not_finite(&config), "spawn.side_range");

    let mut config = RacersConfig::default();
    config.spawn.min_spawn_distance = f32::INFINITY;
    assert_eq!(not_finite(&config), "spawn.min_spawn_distance");
}

#[test]
fn test_infinite_jitter_bounds_are_rejected() {
    let mut config = RacersConfig::default();
    config.spawn.lateral_jitter_min = f32::NEG_INFINITY;
    assert_eq!(not_finite(&config), "spawn.lateral_jitter min");

    let mut config = RacersConfig::default();
    config.spawn.forward_jitter_max = f32::INFINITY;
    assert_eq!(not_finite(&config), "spawn.forward_jitter max");
}

#[test]
fn test_infinite_plan_shaping_is_rejected() {
    let mut config = RacersConfig::default();
    config.segment_plan.curve_smoothness = f32::INFINITY;
    assert_eq!(not_finite(&config), "segment_plan.curve_smoothness");

    let mut config = RacersConfig::default();
    config.segment_plan.turn_strength = f32::NAN;
    assert_eq!(not_finite(&config), "segment_plan.turn_strength");
}

#[test]
fn test_negative_spawn_distances_are_rejected() {
    let mut config = RacersConfig::default();
    config.spawn.side_range = -1.0;
    assert!(matches!(
        config.validate(),
        Err(ConfigError::NotPositive { field, .. }) if field == "spawn.side_range"
    ));
}

#[test]
fn test_defaults_validate() {
    assert_eq!(RacersConfig::default().validate(), Ok(()));
}
