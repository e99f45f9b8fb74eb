//! # Cooperative Scheduler
//!
//! A single-threaded, non-preemptive dispatch loop that runs the limit
//! switch handler, the motion-queue runner, the homing cycle, and the
//! command-line reader in strict priority order, honoring `EAGAIN`
//! backpressure between them (spec §4.1, §5 "Scheduling model").

#![cfg_attr(not(feature = "std"), no_std)]

pub mod homing;
pub mod limit;
pub mod machine_state;
pub mod scheduler;
pub mod task;

pub use homing::{AxisJog, HomingCycle};
pub use limit::{poll_limit_switches, LimitEvent};
pub use machine_state::MachineState;
pub use scheduler::{LineSource, Scheduler};
pub use task::TaskOutcome;
