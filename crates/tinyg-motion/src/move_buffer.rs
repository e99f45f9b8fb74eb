//! The planned-move buffer and its jerk-limited S-curve trajectory shape
//! (spec §3 "Planned Move (buffer)", §4.3 "Trajectory shape").

use tinyg_gcode::{CanonicalMove, SyncCommand};

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

pub const MAX_AXES: usize = 4;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum MoveState {
    Empty,
    Queued,
    Planned,
    Running,
    Completed,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum MoveKind {
    Seek,
    Feed,
    Dwell,
    CommandSync,
}

/// The jerk-limited 7-segment S-curve timing for one move's velocity
/// profile: jerk-up / const-accel / jerk-down (head), constant velocity
/// (body), jerk-down / const-decel / jerk-up (tail).
#[derive(Debug, Copy, Clone, Default)]
pub struct SCurveTiming {
    pub t_j1: f32,
    pub t_a: f32,
    pub t_j2: f32,
    pub t_body: f32,
    pub t_j3: f32,
    pub t_d: f32,
    pub t_j4: f32,
}

impl SCurveTiming {
    pub fn total(&self) -> f32 {
        self.t_j1 + self.t_a + self.t_j2 + self.t_body + self.t_j3 + self.t_d + self.t_j4
    }
}

/// One slot in the planner's fixed-capacity ring (spec §3).
#[derive(Debug, Copy, Clone)]
pub struct PlannedMove {
    pub state: MoveState,
    pub kind: MoveKind,
    pub start: [f32; MAX_AXES],
    pub unit_vector: [f32; MAX_AXES],
    pub length: f32,
    pub step_deltas: [i32; MAX_AXES],
    pub steps_per_unit: [f32; MAX_AXES],
    pub v_entry_requested: f32,
    pub v_cruise_requested: f32,
    pub v_exit_requested: f32,
    pub v_entry: f32,
    pub v_cruise: f32,
    pub v_exit: f32,
    pub accel_max: f32,
    pub jerk: f32,
    pub junction_deviation: f32,
    pub junction_max_velocity: f32,
    pub timing: SCurveTiming,
    pub recomputable: bool,
    pub line_number: u32,
    pub dwell_seconds: f32,
    pub sync: Option<SyncCommand>,
}

impl Default for PlannedMove {
    fn default() -> Self {
        Self {
            state: MoveState::Empty,
            kind: MoveKind::Feed,
            start: [0.0; MAX_AXES],
            unit_vector: [0.0; MAX_AXES],
            length: 0.0,
            step_deltas: [0; MAX_AXES],
            steps_per_unit: [0.0; MAX_AXES],
            v_entry_requested: 0.0,
            v_cruise_requested: 0.0,
            v_exit_requested: 0.0,
            v_entry: 0.0,
            v_cruise: 0.0,
            v_exit: 0.0,
            accel_max: 0.0,
            jerk: 0.0,
            junction_deviation: 0.0,
            junction_max_velocity: f32::MAX,
            timing: SCurveTiming::default(),
            recomputable: true,
            line_number: 0,
            dwell_seconds: 0.0,
            sync: None,
        }
    }
}

impl PlannedMove {
    pub fn from_canonical(
        mv: &CanonicalMove,
        start: [f32; MAX_AXES],
        steps_per_unit: &[f32; MAX_AXES],
        accel_max: f32,
        jerk: f32,
        junction_deviation: f32,
    ) -> Self {
        let mut unit_vector = [0.0; MAX_AXES];
        let mut step_deltas = [0; MAX_AXES];
        let mut dist_sq = 0.0;
        for i in 0..MAX_AXES {
            let d = mv.target[i] - start[i];
            dist_sq += d * d;
            step_deltas[i] = (d * steps_per_unit[i]).round() as i32;
        }
        let length = sqrtf(dist_sq);
        if length > 1e-9 {
            for i in 0..MAX_AXES {
                unit_vector[i] = (mv.target[i] - start[i]) / length;
            }
        }
        let kind = match mv.move_type {
            tinyg_gcode::MoveType::Seek => MoveKind::Seek,
            tinyg_gcode::MoveType::Feed => MoveKind::Feed,
            tinyg_gcode::MoveType::Dwell => MoveKind::Dwell,
            tinyg_gcode::MoveType::CommandSync => MoveKind::CommandSync,
        };
        let v_cruise_requested = mv.feed_rate / 60.0; // feed rate is units/min
        Self {
            state: MoveState::Queued,
            kind,
            start,
            unit_vector,
            length,
            step_deltas,
            steps_per_unit: *steps_per_unit,
            v_entry_requested: 0.0,
            v_cruise_requested,
            v_exit_requested: 0.0,
            v_entry: 0.0,
            v_cruise: v_cruise_requested,
            v_exit: 0.0,
            accel_max,
            jerk,
            junction_deviation,
            junction_max_velocity: f32::MAX,
            timing: SCurveTiming::default(),
            recomputable: true,
            line_number: mv.line_number,
            dwell_seconds: mv.dwell_seconds,
            sync: mv.sync,
        }
    }

    /// Recompute the head/body/tail S-curve timing for the current
    /// `v_entry`/`v_cruise`/`v_exit`/`length` (spec §4.3).
    ///
    /// If head+tail distance exceeds the move length, `v_cruise` is reduced
    /// to the largest value that fits exactly (a "peaked" profile); if no
    /// acceleration/deceleration fits at all the shape degenerates to a
    /// single ramp and `v_cruise = min(v_entry, v_exit)`.
    pub fn recompute_timing(&mut self) {
        if self.length < 1e-9 || self.accel_max <= 0.0 || self.jerk <= 0.0 {
            self.timing = SCurveTiming::default();
            return;
        }
        let accel_dist = (self.v_cruise * self.v_cruise - self.v_entry * self.v_entry).max(0.0)
            / (2.0 * self.accel_max);
        let decel_dist = (self.v_cruise * self.v_cruise - self.v_exit * self.v_exit).max(0.0)
            / (2.0 * self.accel_max);

        if accel_dist + decel_dist > self.length {
            // Triangle / peaked profile: no cruise segment.
            let peak_sq = (2.0 * self.accel_max * self.length
                + self.v_entry * self.v_entry
                + self.v_exit * self.v_exit)
                / 2.0;
            self.v_cruise = sqrtf(peak_sq.max(self.v_entry.min(self.v_exit).powi(2)));
            self.timing.t_body = 0.0;
        } else {
            let cruise_dist = self.length - accel_dist - decel_dist;
            self.timing.t_body = if self.v_cruise > 1e-9 {
                cruise_dist / self.v_cruise
            } else {
                0.0
            };
        }

        let accel_time = (self.v_cruise - self.v_entry).abs() / self.accel_max;
        let decel_time = (self.v_cruise - self.v_exit).abs() / self.accel_max;
        self.timing.t_j1 = (accel_time / 2.0).min(self.accel_max / self.jerk);
        self.timing.t_a = (accel_time - 2.0 * self.timing.t_j1).max(0.0);
        self.timing.t_j2 = self.timing.t_j1;
        self.timing.t_j3 = (decel_time / 2.0).min(self.accel_max / self.jerk);
        self.timing.t_d = (decel_time - 2.0 * self.timing.t_j3).max(0.0);
        self.timing.t_j4 = self.timing.t_j3;
    }

    /// Velocity and acceleration at time `t` into the move's profile
    /// (teacher's `get_velocity_and_accel`, generalized to this crate's
    /// field names).
    pub fn velocity_at(&self, t: f32) -> (f32, f32) {
        let s = &self.timing;
        let j = self.jerk;
        let t1 = s.t_j1;
        let t2 = t1 + s.t_a;
        let t3 = t2 + s.t_j2;
        let t4 = t3 + s.t_body;
        let t5 = t4 + s.t_j3;
        let t6 = t5 + s.t_d;

        if t < t1 {
            (self.v_entry + 0.5 * j * t * t, j * t)
        } else if t < t2 {
            (self.v_entry + 0.5 * j * t1 * t1 + self.accel_max * (t - t1), self.accel_max)
        } else if t < t3 {
            let dt = t3 - t;
            (self.v_cruise - 0.5 * j * dt * dt, j * dt)
        } else if t < t4 {
            (self.v_cruise, 0.0)
        } else if t < t5 {
            let dt = t - t4;
            (self.v_cruise - 0.5 * j * dt * dt, -j * dt)
        } else if t < t6 {
            let dt = t - t5;
            (
                self.v_cruise - 0.5 * j * s.t_j3 * s.t_j3 - self.accel_max * dt,
                -self.accel_max,
            )
        } else {
            let dt = (t6 + s.t_j4 - t).max(0.0);
            (self.v_exit + 0.5 * j * dt * dt, -j * dt)
        }
    }

    pub fn dominant_axis_steps(&self) -> u32 {
        self.step_deltas.iter().map(|s| s.unsigned_abs()).max().unwrap_or(0)
    }
}
