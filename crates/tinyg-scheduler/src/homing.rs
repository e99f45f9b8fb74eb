//! The homing cycle: a per-axis search/backoff/latch state machine driven
//! once per scheduler tick (spec §4.1 "Homing cycle tick"; per-axis
//! parameters come from `tinyg_motion::HomingConfig`).
//!
//! Homing drives motors directly at a constant commanded velocity rather
//! than through the jerk-limited planner — there is no G-code move to plan,
//! only a search toward a switch — so it talks to an `AxisJog` sink instead
//! of enqueuing a `CanonicalMove`.

use tinyg_hal::{Axis, LimitEnd, LimitSwitch};
use tinyg_motion::HomingConfig;

/// Direct single-axis velocity command, bypassing the move queue. Positive
/// velocity drives toward the axis's positive end.
pub trait AxisJog {
    fn jog(&mut self, axis: Axis, velocity: f32);
    fn stop(&mut self, axis: Axis);
    fn zero_position(&mut self, axis: Axis);
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum Phase {
    Search,
    Backoff,
    Latch,
    ZeroOut,
}

#[derive(Debug, Copy, Clone)]
struct AxisHoming {
    axis: Axis,
    end: LimitEnd,
    phase: Phase,
    backoff_remaining: f32,
}

/// Sequences the configured homing axes one at a time: search for the
/// switch at `search_velocity`, back off `zero_backoff`, re-approach slowly
/// at `latch_velocity` for a precise trip, then zero `machine_position_steps`.
pub struct HomingCycle {
    queue: heapless::Vec<AxisHoming, 4>,
    active: Option<AxisHoming>,
}

impl Default for HomingCycle {
    fn default() -> Self {
        Self::new()
    }
}

impl HomingCycle {
    pub const fn new() -> Self {
        Self { queue: heapless::Vec::new(), active: None }
    }

    pub fn is_active(&self) -> bool {
        self.active.is_some() || !self.queue.is_empty()
    }

    /// Start homing the given axes, in order, toward the given limit end.
    pub fn start(&mut self, axes: &[(Axis, LimitEnd)]) {
        self.queue.clear();
        // `Vec::pop` removes from the end, so push in reverse to dequeue in
        // the caller's given order.
        for &(axis, end) in axes.iter().rev() {
            let _ = self.queue.push(AxisHoming { axis, end, phase: Phase::Search, backoff_remaining: 0.0 });
        }
        self.active = self.queue.pop();
    }

    pub fn abort<J: AxisJog>(&mut self, jog: &mut J) {
        if let Some(cur) = self.active.take() {
            jog.stop(cur.axis);
        }
        self.queue.clear();
    }

    /// One scheduler tick. `dt` is the time since the last tick (seconds).
    /// Returns `true` once every queued axis has finished homing.
    pub fn tick<J: AxisJog, L: LimitSwitch>(
        &mut self,
        dt: f32,
        configs: &[(Axis, HomingConfig)],
        switches: &[(Axis, L)],
        jog: &mut J,
    ) -> bool {
        let Some(mut cur) = self.active else {
            return true;
        };

        let config = configs.iter().find(|(a, _)| *a == cur.axis).map(|(_, c)| *c).unwrap_or(HomingConfig {
            search_velocity: 0.0,
            latch_velocity: 0.0,
            zero_backoff: 0.0,
        });
        let triggered = switches.iter().find(|(a, _)| *a == cur.axis).map(|(_, s)| s.read_limit(cur.end)).unwrap_or(false);

        match cur.phase {
            Phase::Search => {
                jog.jog(cur.axis, config.search_velocity);
                if triggered {
                    jog.stop(cur.axis);
                    cur.phase = Phase::Backoff;
                    cur.backoff_remaining = config.zero_backoff;
                }
            }
            Phase::Backoff => {
                let retreat = -config.search_velocity.signum() * config.search_velocity.abs().min(config.latch_velocity * 4.0);
                jog.jog(cur.axis, retreat);
                cur.backoff_remaining -= retreat.abs() * dt;
                if cur.backoff_remaining <= 0.0 {
                    jog.stop(cur.axis);
                    cur.phase = Phase::Latch;
                }
            }
            Phase::Latch => {
                jog.jog(cur.axis, config.latch_velocity);
                if triggered {
                    jog.stop(cur.axis);
                    cur.phase = Phase::ZeroOut;
                }
            }
            Phase::ZeroOut => {
                jog.zero_position(cur.axis);
                self.active = self.queue.pop();
                return self.active.is_none();
            }
        }

        self.active = Some(cur);
        false
    }
}
