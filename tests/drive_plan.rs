use race_pack::{
    config::SegmentPlanTuning,
    simulation::{signed_angle, DrivePlan, DrivePlanBuilder, PlanCursor, Point, Track, Vec3, Waypoint},
};

const EPS: f32 = 1e-4;

fn track(points: &[[f32; 3]]) -> Track {
    let positions: Vec<Point> = points.iter().map(|&p| Point::from(p)).collect();
    Track::from_positions("test", &positions, Vec::new())
}

fn assert_vec_close(actual: &Vec3, expected: &Vec3) {
    assert!(
        (actual - expected).norm() < EPS,
        "expected {:?}, got {:?}",
        expected,
        actual
    );
}

#[test]
fn test_collinear_waypoints_reconstruct_polyline() {
    let track = track(&[[0.0, 0.0, 0.0], [0.0, 0.0, 10.0], [0.0, 0.0, 25.0], [0.0, 0.0, 40.0]]);
    let tuning = SegmentPlanTuning::default();
    let plan = DrivePlanBuilder::new(&track, &tuning).build(0.0, Point::origin());

    assert_eq!(plan.len(), 3);
    assert!((plan.total_length() - 40.0).abs() < EPS);

    let polyline = plan.polyline(Point::origin());
    let last = polyline.last().copied().unwrap();
    assert_vec_close(&last.coords, &Vec3::new(0.0, 0.0, 40.0));

    for segment in plan.segments() {
        assert_vec_close(&segment.direction, &Vec3::z());
    }
}

/// A 90 degree corner is split into curve_smoothness steps of equal angle
#[test]
fn test_right_angle_turn_is_subdivided() {
    let track = track(&[[0.0, 0.0, 0.0], [0.0, 0.0, 10.0], [10.0, 0.0, 10.0]]);
    let tuning = SegmentPlanTuning {
        curve_smoothness: 4.0,
        ..Default::default()
    };
    let builder = DrivePlanBuilder::new(&track, &tuning);
    assert_eq!(builder.curve_steps(), 4);

    let plan = builder.build(0.0, Point::origin());
    assert_eq!(plan.len(), 5, "one straight plus four curve steps");

    let step = 22.5f32.to_radians();
    let mut previous = plan.segments()[0].direction;
    for segment in &plan.segments()[1..] {
        assert!((segment.length - 2.5).abs() < EPS);
        let angle = signed_angle(&previous, &segment.direction);
        assert!((angle.abs() - step).abs() < 1e-3, "step angle was {}", angle.to_degrees());
        previous = segment.direction;
    }

    let last = plan.segments().last().unwrap();
    assert_vec_close(&last.direction, &Vec3::x());
}

#[test]
fn test_curve_steps_has_lower_bound() {
    let track = track(&[[0.0, 0.0, 0.0], [0.0, 0.0, 10.0], [10.0, 0.0, 10.0]]);
    let tuning = SegmentPlanTuning {
        curve_smoothness: 0.0,
        ..Default::default()
    };
    let builder = DrivePlanBuilder::new(&track, &tuning);
    assert_eq!(builder.curve_steps(), 2);
    assert_eq!(builder.build(0.0, Point::origin()).len(), 3);
}

#[test]
fn test_shallow_bend_stays_straight() {
    let track = track(&[[0.0, 0.0, 0.0], [0.0, 0.0, 50.0], [1.0, 0.0, 100.0]]);
    let tuning = SegmentPlanTuning::default();
    let plan = DrivePlanBuilder::new(&track, &tuning).build(0.0, Point::origin());
    assert_eq!(plan.len(), 2);
}

// Lane offsets skew directions but never move segment starts
#[test]
fn test_lane_offset_only_skews_direction() {
    let track = track(&[[0.0, 0.0, 0.0], [0.0, 0.0, 20.0], [20.0, 0.0, 20.0], [20.0, 0.0, 0.0]]);
    let tuning = SegmentPlanTuning::default();
    let builder = DrivePlanBuilder::new(&track, &tuning);

    let center = builder.build(0.0, Point::origin());
    let offset = builder.build(1.5, Point::origin());
    assert_eq!(center.len(), offset.len());

    let mut skewed = 0;
    for (a, b) in center.segments().iter().zip(offset.segments()) {
        assert_vec_close(&a.start.coords, &b.start.coords);
        assert!((a.length - b.length).abs() < EPS);
        assert!((b.direction.norm() - 1.0).abs() < EPS);
        if (a.direction - b.direction).norm() > EPS {
            skewed += 1;
        }
    }
    assert_eq!(skewed, center.len());
}

#[test]
fn test_slope_change_stays_on_polyline() {
    let track = track(&[[0.0, 0.0, 0.0], [0.0, 0.0, 10.0], [0.0, 5.0, 20.0]]);
    let tuning = SegmentPlanTuning::default();
    let plan = DrivePlanBuilder::new(&track, &tuning).build(0.0, Point::origin());

    assert_eq!(plan.len(), 2);
    let polyline = plan.polyline(Point::origin());
    assert_vec_close(&polyline[1].coords, &Vec3::new(0.0, 0.0, 10.0));
    assert_vec_close(&polyline[2].coords, &Vec3::new(0.0, 5.0, 20.0));
    assert!(signed_angle(&Vec3::z(), &Vec3::new(0.0, 5.0, 10.0)).abs() < EPS);
}

#[test]
fn test_climbing_corner_turns_about_vertical() {
    let track = track(&[[0.0, 0.0, 0.0], [0.0, 0.0, 10.0], [10.0, 10.0, 10.0]]);
    let tuning = SegmentPlanTuning {
        curve_smoothness: 4.0,
        ..Default::default()
    };
    let plan = DrivePlanBuilder::new(&track, &tuning).build(0.0, Point::origin());

    assert_eq!(plan.len(), 5);
    let climb = std::f32::consts::FRAC_1_SQRT_2;
    for segment in &plan.segments()[1..] {
        assert!((segment.direction.norm() - 1.0).abs() < EPS);
        assert!((segment.direction.y - climb).abs() < EPS);
    }

    // Total rise matches the waypoints even though the heading sweeps
    let end = plan.polyline(Point::origin()).last().copied().unwrap();
    assert!((end.y - 10.0).abs() < 1e-3);
    assert_vec_close(&plan.segments()[4].direction, &Vec3::new(climb, climb, 0.0));
}

// Coincident waypoints are skipped instead of producing NaN directions
#[test]
fn test_coincident_waypoints_are_skipped() {
    let track = track(&[[0.0, 0.0, 0.0], [0.0, 0.0, 10.0], [0.0, 0.0, 10.0], [0.0, 0.0, 20.0]]);
    let tuning = SegmentPlanTuning::default();
    let plan = DrivePlanBuilder::new(&track, &tuning).build(0.0, Point::origin());

    assert_eq!(plan.len(), 2);
    for segment in plan.segments() {
        assert!(segment.direction.iter().all(|c| c.is_finite()));
    }
}

#[test]
fn test_short_tracks_produce_empty_plans() {
    let tuning = SegmentPlanTuning::default();

    let empty: Vec<Waypoint> = Vec::new();
    assert!(DrivePlanBuilder::new(&empty, &tuning).build(0.0, Point::origin()).is_empty());

    let single = track(&[[5.0, 0.0, 5.0]]);
    assert!(DrivePlanBuilder::new(&single, &tuning).build(0.0, Point::origin()).is_empty());
}

/// The cursor resets its accumulator on each completed segment and wraps at the end
#[test]
fn test_cursor_wraps_after_last_segment() {
    let track = track(&[[0.0, 0.0, 0.0], [0.0, 0.0, 4.0], [0.0, 0.0, 8.0]]);
    let tuning = SegmentPlanTuning::default();
    let plan = DrivePlanBuilder::new(&track, &tuning).build(0.0, Point::origin());
    assert_eq!(plan.len(), 2);

    let mut cursor = PlanCursor::default();
    assert!(!cursor.advance(3.0, &plan));
    assert_eq!(cursor.index, 0);
    assert!((cursor.travelled - 3.0).abs() < EPS);

    assert!(cursor.advance(1.5, &plan));
    assert_eq!(cursor.index, 1);
    assert_eq!(cursor.travelled, 0.0);

    assert!(cursor.advance(4.0, &plan));
    assert_eq!(cursor.index, 0, "cursor wraps to the first segment");
}

#[test]
fn test_cursor_on_empty_plan_is_inert() {
    let plan = DrivePlan::default();
    let mut cursor = PlanCursor::default();
    assert!(!cursor.advance(10.0, &plan));
    assert!(cursor.current(&plan).is_none());
}
