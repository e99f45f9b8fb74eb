//! Mock HAL implementations standing in for real GPIO/timer peripherals.
//!
//! Grounded on the simulated-MCU idea of exercising the real pipeline
//! against recorded, inspectable fakes instead of sockets to a separate
//! process: since this design runs scheduler and executor in one process,
//! the fakes just need to be `tinyg_hal` trait impls a test can assert on.

use tinyg_hal::{Axis, AuxOutputs, LimitEnd, LimitSwitch, MotorPins, Timer};
use tinyg_motion::MAX_AXES;

#[derive(Debug, Default, Clone, Copy)]
pub struct MockPins {
    pub step_high: bool,
    pub step_pulses: u32,
    pub dir_forward: bool,
    pub enabled: bool,
}

impl MotorPins for MockPins {
    fn set_step(&mut self, high: bool) {
        if high && !self.step_high {
            self.step_pulses += 1;
        }
        self.step_high = high;
    }
    fn set_dir(&mut self, forward: bool) {
        self.dir_forward = forward;
    }
    fn enable(&mut self, on: bool) {
        self.enabled = on;
    }
}

/// A limit switch whose trip state the test (or homing scenario) sets
/// directly, rather than deriving it from simulated travel.
#[derive(Debug, Default, Clone, Copy)]
pub struct MockSwitch {
    pub min_triggered: bool,
    pub max_triggered: bool,
}

impl LimitSwitch for MockSwitch {
    fn read_limit(&self, end: LimitEnd) -> bool {
        match end {
            LimitEnd::Min => self.min_triggered,
            LimitEnd::Max => self.max_triggered,
        }
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct MockTimer {
    pub armed_us: u32,
    pub stopped: bool,
}

impl Timer for MockTimer {
    fn arm(&mut self, period_us: u32) {
        self.armed_us = period_us;
        self.stopped = false;
    }
    fn stop(&mut self) {
        self.stopped = true;
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct MockAux {
    pub spindle_on: bool,
    pub spindle_clockwise: bool,
    pub mist: bool,
    pub flood: bool,
}

impl AuxOutputs for MockAux {
    fn set_spindle(&mut self, on: bool, clockwise: bool) {
        self.spindle_on = on;
        self.spindle_clockwise = clockwise;
    }
    fn set_coolant_mist(&mut self, on: bool) {
        self.mist = on;
    }
    fn set_coolant_flood(&mut self, on: bool) {
        self.flood = on;
    }
}

pub fn default_switches() -> [(Axis, MockSwitch); MAX_AXES] {
    Axis::ALL.map(|a| (a, MockSwitch::default()))
}
