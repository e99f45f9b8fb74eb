//! In-process simulation harness for the motion pipeline: mock HAL plus a
//! deterministic driver that runs the scheduler and stepper executor
//! together without any real hardware or inter-process link.

pub mod harness;
pub mod mock_hal;

pub use harness::{SimMachine, TraceEntry, TraceState};
pub use mock_hal::{MockAux, MockPins, MockSwitch, MockTimer};
