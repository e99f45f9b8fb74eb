use tinyg_gcode::CanonicalMove;
use tinyg_motion::axis::AxisConfig;
use tinyg_motion::planner::MotionPlanner;
use tinyg_motion::{MoveState, PlannerError};

const STEPS_PER_UNIT: [f32; 4] = [80.0, 80.0, 400.0, 20.0];

fn axes() -> [AxisConfig; 4] {
    let mut a = [AxisConfig::default(); 4];
    for axis in a.iter_mut() {
        axis.velocity_max = 300.0;
        axis.feedrate_max = 300.0;
        axis.jerk_max = 2_000_000.0;
        axis.junction_deviation = 0.05;
    }
    a
}

#[test]
fn corner_reduces_exit_and_entry_velocity_to_junction_limit() {
    let axes = axes();
    let mut planner: MotionPlanner<8> = MotionPlanner::new([0.0; 4], 0.005);

    planner
        .enqueue(&CanonicalMove::feed([10.0, 0.0, 0.0, 0.0], 6000.0, 1), &axes, &STEPS_PER_UNIT)
        .unwrap();
    planner
        .enqueue(&CanonicalMove::feed([10.0, 10.0, 0.0, 0.0], 6000.0, 2), &axes, &STEPS_PER_UNIT)
        .unwrap();

    let first = planner.head_move().unwrap();
    assert!(first.v_exit < first.v_cruise_requested, "a 90 degree corner must restrict exit velocity");
    assert!(first.v_exit > 0.0, "a 90 degree corner is not a full reversal; some cornering speed survives");
}

#[test]
fn full_reversal_junction_forces_a_stop() {
    let axes = axes();
    let mut planner: MotionPlanner<8> = MotionPlanner::new([0.0; 4], 0.005);

    planner
        .enqueue(&CanonicalMove::feed([10.0, 0.0, 0.0, 0.0], 600.0, 1), &axes, &STEPS_PER_UNIT)
        .unwrap();
    planner
        .enqueue(&CanonicalMove::feed([0.0, 0.0, 0.0, 0.0], 600.0, 2), &axes, &STEPS_PER_UNIT)
        .unwrap();

    let first = planner.head_move().unwrap();
    assert!(first.v_exit.abs() < 1e-3, "reversing direction must force the junction velocity to zero");
}

#[test]
fn collinear_junction_keeps_cruise_speed() {
    let axes = axes();
    let mut planner: MotionPlanner<8> = MotionPlanner::new([0.0; 4], 0.005);

    planner
        .enqueue(&CanonicalMove::feed([10.0, 0.0, 0.0, 0.0], 1200.0, 1), &axes, &STEPS_PER_UNIT)
        .unwrap();
    planner
        .enqueue(&CanonicalMove::feed([20.0, 0.0, 0.0, 0.0], 1200.0, 2), &axes, &STEPS_PER_UNIT)
        .unwrap();

    let first = planner.head_move().unwrap();
    let expected_cruise = 1200.0 / 60.0;
    assert!(
        (first.v_exit - expected_cruise).abs() < 1e-2,
        "a straight-through junction should not slow the machine down: got {}",
        first.v_exit
    );
}

#[test]
fn queue_full_reports_eagain_equivalent_and_loses_no_move() {
    let axes = axes();
    let mut planner: MotionPlanner<4> = MotionPlanner::new([0.0; 4], 0.005);

    for i in 0..4 {
        planner
            .enqueue(&CanonicalMove::feed([(i + 1) as f32, 0.0, 0.0, 0.0], 600.0, i as u32), &axes, &STEPS_PER_UNIT)
            .unwrap();
    }

    let result = planner.enqueue(&CanonicalMove::feed([10.0, 0.0, 0.0, 0.0], 600.0, 99), &axes, &STEPS_PER_UNIT);
    assert_eq!(result, Err(PlannerError::QueueFull));
    assert_eq!(planner.len(), 4);
}

#[test]
fn running_move_is_never_mutated_by_a_later_enqueue() {
    let axes = axes();
    let mut planner: MotionPlanner<8> = MotionPlanner::new([0.0; 4], 0.005);
    planner
        .enqueue(&CanonicalMove::feed([10.0, 0.0, 0.0, 0.0], 600.0, 1), &axes, &STEPS_PER_UNIT)
        .unwrap();

    let running = planner.start_head().unwrap().clone();
    assert_eq!(running.state, MoveState::Running);

    planner
        .enqueue(&CanonicalMove::feed([10.0, 10.0, 0.0, 0.0], 600.0, 2), &axes, &STEPS_PER_UNIT)
        .unwrap();

    let still_running = planner.head_move().unwrap();
    assert_eq!(still_running.v_entry, running.v_entry);
    assert_eq!(still_running.v_exit, running.v_exit);
}

#[test]
fn zero_length_move_is_rejected() {
    let axes = axes();
    let mut planner: MotionPlanner<8> = MotionPlanner::new([5.0, 5.0, 0.0, 0.0], 0.005);
    let result = planner.enqueue(&CanonicalMove::feed([5.0, 5.0, 0.0, 0.0], 600.0, 1), &axes, &STEPS_PER_UNIT);
    assert_eq!(result, Err(PlannerError::ZeroLengthMove));
}
