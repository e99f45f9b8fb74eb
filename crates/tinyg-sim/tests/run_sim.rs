//! Runs a small G-code program through the full pipeline in-process and
//! checks the resulting step counts and machine state, the way CI would
//! validate a simulated job without attaching to real hardware.

use std::path::Path;

use tinyg_hal::Axis;
use tinyg_motion::{AxisConfig, MAX_AXES};
use tinyg_scheduler::MachineState;
use tinyg_sim::SimMachine;

fn axes() -> [AxisConfig; MAX_AXES] {
    let mut axes = [AxisConfig::default(); MAX_AXES];
    for axis in axes.iter_mut() {
        axis.velocity_max = 300.0;
        axis.feedrate_max = 300.0;
        axis.jerk_max = 2_000_000.0;
        axis.junction_deviation = 0.05;
        axis.travel_max = 500.0;
    }
    axes
}

#[test]
fn a_short_program_moves_x_and_y_and_returns_to_reset() {
    tracing_subscriber::fmt::try_init().ok();

    let steps_per_unit = [80.0_f32; MAX_AXES];
    let gcode = ["G21", "G1 X10 Y5 F600", "G1 X0 Y0 F600", "M2"];
    let mut machine = SimMachine::new(steps_per_unit, axes(), &gcode);

    machine.run_ticks(20_000);

    let position = machine.position_steps();
    assert!((position[0]).abs() < 2, "x should return near the origin, got {}", position[0]);
    assert!((position[1]).abs() < 2, "y should return near the origin, got {}", position[1]);
    assert_ne!(machine.state(), MachineState::Alarm);

    let trace_path = Path::new(concat!(env!("CARGO_TARGET_TMPDIR"), "/run_sim_trace.json"));
    machine.dump_trace(trace_path).expect("trace dump should succeed");
    assert!(trace_path.exists());
}

#[test]
fn a_tripped_limit_switch_raises_an_alarm() {
    let steps_per_unit = [80.0_f32; MAX_AXES];
    let gcode = ["G1 X50 F600"];
    let mut machine = SimMachine::new(steps_per_unit, axes(), &gcode);

    machine.run_ticks(50);
    machine.trip_switch(Axis::X, tinyg_hal::LimitEnd::Max);
    machine.run_ticks(50);

    assert_eq!(machine.state(), MachineState::Alarm);
}
