//! Hardware-abstraction traits for the motion pipeline.
//!
//! The stepper executor, limit-switch handler and homing cycle are written
//! against these traits instead of a chip's peripheral-access crate. This is
//! what makes the core pipeline testable on a host: `tinyg-sim` and unit
//! tests supply mock implementations, while `tinyg-firmware` wires real
//! `embedded-hal` GPIO/timer peripherals behind them.

#![no_std]

/// One of the (up to four) axes the machine addresses logically.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Axis {
    X,
    Y,
    Z,
    A,
}

impl Axis {
    pub const ALL: [Axis; 4] = [Axis::X, Axis::Y, Axis::Z, Axis::A];

    pub fn index(self) -> usize {
        match self {
            Axis::X => 0,
            Axis::Y => 1,
            Axis::Z => 2,
            Axis::A => 3,
        }
    }

    /// `true` for linear axes (X/Y/Z), `false` for rotary axes (A/B/C).
    pub fn is_linear(self) -> bool {
        !matches!(self, Axis::A)
    }
}

/// Which limit switch on an axis: the minimum-travel or maximum-travel end.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum LimitEnd {
    Min,
    Max,
}

/// A single motor's step/direction/enable/microstep outputs.
///
/// One motor maps to exactly one logical axis (spec §3 "Motor"); a
/// microcontroller with N motor drivers implements N of these.
pub trait MotorPins {
    /// Drive the STEP line. `high` asserts the pulse; the executor clears it
    /// again from the pulse-off one-shot after the driver's minimum pulse
    /// width has elapsed.
    fn set_step(&mut self, high: bool);

    /// Drive the DIRECTION line. `forward` is the motor's configured
    /// positive-polarity direction.
    fn set_dir(&mut self, forward: bool);

    /// Enable or disable the driver (idle power-down).
    fn enable(&mut self, on: bool);
}

/// Limit-switch (endstop) inputs for one axis.
pub trait LimitSwitch {
    /// `true` when the switch at `end` is triggered.
    fn read_limit(&self, end: LimitEnd) -> bool;
}

/// A hardware timer capable of arming a one-shot or periodic callback some
/// number of microseconds in the future. Both the step-pulse ISR driver and
/// the pulse-off one-shot are expressed in terms of this trait.
pub trait Timer {
    /// Arm the timer to fire once after `period_us` microseconds.
    fn arm(&mut self, period_us: u32);

    /// Stop the timer; no further callback fires until re-armed.
    fn stop(&mut self);
}

/// Spindle and coolant outputs. Kept deliberately minimal: spec.md puts
/// "spindle and coolant pin wiggling" and "per-chip register programming"
/// out of scope, so this trait only carries the on/off/direction contract
/// the canonical machine's command-sync records need to signal.
pub trait AuxOutputs {
    fn set_spindle(&mut self, on: bool, clockwise: bool);
    fn set_coolant_mist(&mut self, on: bool);
    fn set_coolant_flood(&mut self, on: bool);
}
