//! # Motion Planner and Segment Runtime
//!
//! Turns canonical moves into a re-planned, jerk-limited velocity profile
//! (`planner`) and subdivides the head of that plan into fixed-duration
//! segments for the stepper executor (`segment`).
//!
//! `no_std` by default; enable the `std` feature (which also flips on
//! `tinyg-gcode/std`) for host-side tooling such as `tinyg-sim`.

#![cfg_attr(not(feature = "std"), no_std)]

pub mod axis;
pub mod error;
pub mod move_buffer;
pub mod planner;
pub mod segment;

pub use axis::{AxisConfig, AxisMode, HomingConfig, Microsteps, MotorConfig, Polarity};
pub use error::PlannerError;
pub use move_buffer::{MoveKind, MoveState, PlannedMove, SCurveTiming, MAX_AXES};
pub use planner::{MotionPlanner, DEFAULT_CAPACITY, RESERVATION_THRESHOLD};
pub use segment::{Segment, SegmentRuntime, StepConsumer, StepProducer, StepQueue, SEGMENT_SECONDS};
