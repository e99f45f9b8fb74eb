//! The motion planner: a fixed-capacity ring of planned moves, junction
//! velocity computation, and the backward re-planning pass (spec §4.3
//! "Motion planner").

use crate::axis::AxisConfig;
use crate::error::PlannerError;
use crate::move_buffer::{MoveState, PlannedMove, MAX_AXES};
use tinyg_gcode::CanonicalMove;

#[cfg(feature = "std")]
mod mathf {
    pub fn sqrtf(x: f32) -> f32 {
        x.sqrt()
    }
}
#[cfg(not(feature = "std"))]
mod mathf {
    pub use libm::sqrtf;
}
use mathf::sqrtf;

const EPS: f32 = 1e-6;

/// Default ring capacity. Spec §4.3 recommends N ≥ 28; rounded up for a
/// comfortable lookahead margin.
pub const DEFAULT_CAPACITY: usize = 32;

/// The reservation threshold below which the command-line reader must stop
/// accepting new blocks (spec §4.1 backpressure, §8 "Buffer backpressure").
pub const RESERVATION_THRESHOLD: usize = 2;

fn junction_velocity(a: &PlannedMove, b: &PlannedMove, axes: &[AxisConfig; MAX_AXES], segment_seconds: f32) -> f32 {
    if a.length < EPS || b.length < EPS {
        // A dwell or a command-sync record forces a full stop on both sides.
        return 0.0;
    }
    let mut dot = 0.0;
    for i in 0..MAX_AXES {
        dot += a.unit_vector[i] * b.unit_vector[i];
    }
    let cos_theta = (-dot).clamp(-1.0, 1.0);
    let sin_half = sqrtf(((1.0 - cos_theta) * 0.5).max(0.0));

    if sin_half >= 0.999_999 {
        // Collinear: the corner imposes no limit beyond the two requested
        // cruise speeds (spec §8 "Colinear junction").
        return a.v_cruise_requested.min(b.v_cruise_requested);
    }

    let mut a_max = f32::MAX;
    let mut delta = f32::MAX;
    let mut engaged = false;
    for i in 0..MAX_AXES {
        if a.unit_vector[i].abs() > EPS || b.unit_vector[i].abs() > EPS {
            a_max = a_max.min(axes[i].accel_max(segment_seconds));
            delta = delta.min(axes[i].junction_deviation);
            engaged = true;
        }
    }
    if !engaged || a_max <= 0.0 {
        return 0.0;
    }

    let v_sq = a_max * delta * sin_half / (1.0 - sin_half);
    sqrtf(v_sq.max(0.0)).min(a.v_cruise_requested).min(b.v_cruise_requested)
}

/// A fixed-capacity ring of planned moves sitting between the canonical
/// machine (producer) and the segment runtime (consumer). Single producer,
/// single consumer (spec §3 "Planned Move (buffer)" invariant).
pub struct MotionPlanner<const N: usize = DEFAULT_CAPACITY> {
    ring: [PlannedMove; N],
    head: usize,
    len: usize,
    last_target: [f32; MAX_AXES],
    /// Velocity the machine is actually at the moment the head move starts
    /// (0 at rest; the previous head move's `v_exit` once a move completes).
    entry_velocity_floor: f32,
    segment_seconds: f32,
}

impl<const N: usize> MotionPlanner<N> {
    pub fn new(initial_position: [f32; MAX_AXES], segment_seconds: f32) -> Self {
        Self {
            ring: [PlannedMove::default(); N],
            head: 0,
            len: 0,
            last_target: initial_position,
            entry_velocity_floor: 0.0,
            segment_seconds,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn free_slots(&self) -> usize {
        N - self.len
    }

    /// Whether the command-line reader may accept another block without
    /// risking the planner queue filling under it (spec §8 "Backpressure").
    pub fn has_room(&self) -> bool {
        self.free_slots() > RESERVATION_THRESHOLD
    }

    fn index(&self, offset: usize) -> usize {
        (self.head + offset) % N
    }

    /// Enqueue a canonical move, grounding its acceleration/jerk/junction
    /// limits in the per-axis configuration, then re-plan the tail of the
    /// ring.
    pub fn enqueue(
        &mut self,
        mv: &CanonicalMove,
        axes: &[AxisConfig; MAX_AXES],
        steps_per_unit: &[f32; MAX_AXES],
    ) -> Result<(), PlannerError> {
        if self.len == N {
            return Err(PlannerError::QueueFull);
        }

        let mut accel_max = f32::MAX;
        let mut jerk = f32::MAX;
        for axis in axes.iter() {
            accel_max = accel_max.min(axis.accel_max(self.segment_seconds));
            jerk = jerk.min(axis.jerk_max);
        }
        let junction_deviation = axes.iter().fold(f32::MAX, |m, a| m.min(a.junction_deviation));

        let planned = PlannedMove::from_canonical(
            mv,
            self.last_target,
            steps_per_unit,
            accel_max,
            jerk,
            junction_deviation,
        );

        let is_motion = matches!(mv.move_type, tinyg_gcode::MoveType::Seek | tinyg_gcode::MoveType::Feed);
        if is_motion && planned.length < EPS {
            return Err(PlannerError::ZeroLengthMove);
        }

        self.last_target = mv.target;
        let idx = self.index(self.len);
        self.ring[idx] = planned;
        self.len += 1;

        self.replan(axes);
        Ok(())
    }

    /// Backward re-planning pass from the newest move to the oldest
    /// recomputable move (spec §4.3 "Re-planning pass").
    fn replan(&mut self, axes: &[AxisConfig; MAX_AXES]) {
        if self.len == 0 {
            return;
        }
        let last = self.len - 1;
        let mut i = self.len;
        while i > 0 {
            i -= 1;
            let idx = self.index(i);
            if !self.ring[idx].recomputable {
                break;
            }

            let v_exit = if i == last {
                0.0
            } else {
                let next_idx = self.index(i + 1);
                let next_entry = self.ring[next_idx].v_entry;
                next_entry.min(self.ring[idx].v_cruise_requested)
            };

            let prev_junction = if i == 0 {
                self.entry_velocity_floor
            } else {
                let prev_idx = self.index(i - 1);
                junction_velocity(&self.ring[prev_idx], &self.ring[idx], axes, self.segment_seconds)
            };

            let cur = &mut self.ring[idx];
            cur.v_exit = v_exit;
            let feasible_from_exit = sqrtf(v_exit * v_exit + 2.0 * cur.accel_max * cur.length);
            cur.v_entry = prev_junction.min(feasible_from_exit).min(cur.v_cruise_requested);
            cur.v_cruise = cur.v_cruise_requested;
            cur.recompute_timing();
            cur.state = MoveState::Planned;
        }
    }

    /// Drop every queued move and reset to idle (spec §4.6: a limit trip or
    /// reset flushes both the planner ring and the step queue).
    pub fn flush(&mut self) {
        self.head = 0;
        self.len = 0;
        self.entry_velocity_floor = 0.0;
    }

    /// The target of the most recently enqueued move, i.e. where the
    /// machine is heading once the queue drains.
    pub fn last_target(&self) -> [f32; MAX_AXES] {
        self.last_target
    }

    /// Flush the queue and re-anchor planning to `position` (spec §4.5: a
    /// feedhold resume re-plans from wherever the machine actually stopped,
    /// not from the pre-hold target).
    pub fn resume_from(&mut self, position: [f32; MAX_AXES]) {
        self.flush();
        self.last_target = position;
    }

    pub fn head_move(&self) -> Option<&PlannedMove> {
        if self.len == 0 {
            None
        } else {
            Some(&self.ring[self.head])
        }
    }

    /// Mark the head move as running and freeze it against further
    /// re-planning (spec §3 invariant: "the planner must never mutate a
    /// running move").
    pub fn start_head(&mut self) -> Option<&PlannedMove> {
        if self.len == 0 {
            return None;
        }
        let idx = self.head;
        self.ring[idx].state = MoveState::Running;
        self.ring[idx].recomputable = false;
        Some(&self.ring[idx])
    }

    /// Retire the head move once the segment runtime reports it complete.
    pub fn complete_head(&mut self) {
        if self.len == 0 {
            return;
        }
        let idx = self.head;
        self.ring[idx].state = MoveState::Completed;
        self.entry_velocity_floor = self.ring[idx].v_exit;
        self.head = (self.head + 1) % N;
        self.len -= 1;
    }
}
