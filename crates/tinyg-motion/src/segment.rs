//! The segment runtime: subdivides the head planned move into fixed-duration
//! segments for the stepper executor (spec §4.4 "Segment runtime").

use crate::move_buffer::{MoveKind, PlannedMove, SCurveTiming, MAX_AXES};
use crate::planner::MotionPlanner;
use heapless::spsc::{Consumer, Producer, Queue};
use tinyg_gcode::SyncCommand;

/// Segment period in seconds. Spec §4.4 recommends 1-10ms; 5ms is the
/// teacher's own `DEFAULT_SEGMENT_SECONDS` choice for its step generator.
pub const SEGMENT_SECONDS: f32 = 0.005;

/// A fixed-duration chunk handed to the stepper executor (spec §3
/// "Segment (step command)"). `duration_us` is always a small multiple of
/// the ISR period and at least the configured minimum segment time.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Segment {
    pub step_deltas: [i32; MAX_AXES],
    pub duration_us: u32,
    pub line_number: u32,
    pub last_flag: bool,
    /// A spindle/coolant/tool-change command riding this segment (spec §4.4
    /// "Dwell and command-sync"). `None` for ordinary motion/dwell segments.
    /// The executor signals it to the host interface at the moment it
    /// dequeues this segment, before stepping begins (spec §4.4, §8
    /// "Ordering": the command takes effect between the preceding and
    /// following move).
    pub sync: Option<SyncCommand>,
}

impl Segment {
    pub const fn idle(duration_us: u32, line_number: u32, last_flag: bool) -> Self {
        Self { step_deltas: [0; MAX_AXES], duration_us, line_number, last_flag, sync: None }
    }
}

/// Step-queue capacity. Spec §3 requires capacity ≥ 2; a few slots of
/// headroom keep the stepper executor fed across one scheduler tick.
pub const STEP_QUEUE_CAPACITY: usize = 8;

pub type StepQueue = Queue<Segment, STEP_QUEUE_CAPACITY>;
pub type StepProducer<'a> = Producer<'a, Segment, STEP_QUEUE_CAPACITY>;
pub type StepConsumer<'a> = Consumer<'a, Segment, STEP_QUEUE_CAPACITY>;

const MIN_SEGMENT_SECONDS: f32 = SEGMENT_SECONDS;

/// Phase cursor and per-axis fractional residual accumulator for the move
/// currently being subdivided.
struct Cursor {
    phase: f32,
    residual: [f32; MAX_AXES],
    dwell_remaining: f32,
    /// Distance travelled along the head move's unit vector so far, used to
    /// anchor a feedhold's stopping point (spec §4.5).
    distance_traveled: f32,
}

impl Cursor {
    const fn new() -> Self {
        Self { phase: 0.0, residual: [0.0; MAX_AXES], dwell_remaining: 0.0, distance_traveled: 0.0 }
    }
}

/// A synthesized decelerate-to-zero tail, built from whatever velocity the
/// head move was at when the hold was requested (spec §4.5 "Feedhold").
/// Reuses `PlannedMove::velocity_at` by shaping a timing profile that is all
/// tail (jerk-down / const-decel / jerk-up to zero, no head or body).
struct HoldState {
    decel: PlannedMove,
    phase: f32,
    residual: [f32; MAX_AXES],
    distance_before_hold: f32,
    distance_during_hold: f32,
}

impl HoldState {
    fn capture(head: &PlannedMove, cursor: &Cursor) -> Self {
        let (v_start, _) = head.velocity_at(cursor.phase);
        let accel_max = head.accel_max.max(1e-6);
        let jerk = head.jerk.max(1e-6);
        let decel_time = v_start.abs() / accel_max;
        let t_j = (decel_time / 2.0).min(accel_max / jerk);
        let t_d = (decel_time - 2.0 * t_j).max(0.0);
        let timing = SCurveTiming { t_j1: 0.0, t_a: 0.0, t_j2: 0.0, t_body: 0.0, t_j3: t_j, t_d, t_j4: t_j };

        let decel = PlannedMove {
            v_entry: v_start,
            v_cruise: v_start,
            v_exit: 0.0,
            accel_max: head.accel_max,
            jerk: head.jerk,
            timing,
            unit_vector: head.unit_vector,
            steps_per_unit: head.steps_per_unit,
            start: head.start,
            length: head.length,
            line_number: head.line_number,
            ..PlannedMove::default()
        };

        Self {
            decel,
            phase: 0.0,
            residual: [0.0; MAX_AXES],
            distance_before_hold: cursor.distance_traveled,
            distance_during_hold: 0.0,
        }
    }

    /// Where the machine physically came to rest, for the resume/re-plan
    /// path (spec §4.5 "Resume re-plans from the current position").
    fn stopped_position(&self) -> [f32; MAX_AXES] {
        let total_distance = (self.distance_before_hold + self.distance_during_hold).min(self.decel.length);
        let mut position = self.decel.start;
        for i in 0..MAX_AXES {
            position[i] += self.decel.unit_vector[i] * total_distance;
        }
        position
    }
}

/// Consumes the planner's head move and produces segments (spec §4.4).
pub struct SegmentRuntime {
    cursor: Cursor,
    active: bool,
    hold_requested: bool,
    hold: Option<HoldState>,
    /// Paused once a hold has fully decelerated to zero (or had nothing to
    /// decelerate). Blocks further dispatch until `resume()`.
    paused: bool,
    /// Set once a requested hold settles: `Some(position)` if a move was
    /// truncated mid-flight, `None` if nothing was running. Taken by the
    /// scheduler via `take_settled_hold`.
    settled: Option<Option<[f32; MAX_AXES]>>,
}

impl Default for SegmentRuntime {
    fn default() -> Self {
        Self::new()
    }
}

impl SegmentRuntime {
    pub const fn new() -> Self {
        Self { cursor: Cursor::new(), active: false, hold_requested: false, hold: None, paused: false, settled: None }
    }

    /// Abandon whatever move is in flight (spec §4.6: a limit trip or reset
    /// truncates the current move rather than letting it run to completion).
    pub fn reset(&mut self) {
        self.cursor = Cursor::new();
        self.active = false;
        self.hold_requested = false;
        self.hold = None;
        self.paused = false;
        self.settled = None;
    }

    /// Request a feedhold: the runtime stops advancing through the current
    /// move's tail and instead decelerates to zero (spec §4.5).
    pub fn request_hold(&mut self) {
        self.hold_requested = true;
    }

    /// `true` from the moment a hold is requested until `resume()` is
    /// called, spanning both the deceleration and the fully-stopped pause.
    pub fn is_holding(&self) -> bool {
        self.hold_requested || self.hold.is_some() || self.paused
    }

    /// Take the hold's settlement, if it reached zero velocity since the
    /// last call. See `settled` for what the payload means.
    pub fn take_settled_hold(&mut self) -> Option<Option<[f32; MAX_AXES]>> {
        self.settled.take()
    }

    /// Clear the hold and allow the planner's head move to be (re)started.
    /// The caller is responsible for re-anchoring the planner beforehand
    /// (spec §4.5 "Resume re-plans from the current position").
    pub fn resume(&mut self) {
        self.cursor = Cursor::new();
        self.active = false;
        self.hold_requested = false;
        self.hold = None;
        self.paused = false;
        self.settled = None;
    }

    /// Drive one iteration: if a move is running, advance its phase cursor
    /// by one segment and push the result; otherwise start the planner's
    /// head move. Returns `true` if the runtime made progress (a segment was
    /// enqueued, or the phase cursor advanced while coalescing a
    /// below-threshold segment).
    pub fn tick<const N: usize>(&mut self, planner: &mut MotionPlanner<N>, producer: &mut StepProducer) -> bool {
        if self.paused {
            return false;
        }
        if !producer.ready() {
            return false;
        }

        if let Some(mut hold) = self.hold.take() {
            let finished = self.advance_hold(producer, &mut hold);
            if finished {
                self.settled = Some(Some(hold.stopped_position()));
                self.active = false;
                self.paused = true;
            } else {
                self.hold = Some(hold);
            }
            return true;
        }

        if self.hold_requested {
            self.hold_requested = false;
            if self.active {
                let head = planner.head_move().expect("active runtime implies a head move");
                self.hold = Some(HoldState::capture(head, &self.cursor));
                return true;
            }
            self.settled = Some(None);
            self.paused = true;
            return false;
        }

        if !self.active {
            let Some(head) = planner.start_head() else {
                return false;
            };
            self.cursor = Cursor::new();
            self.cursor.dwell_remaining = head.dwell_seconds;
            self.active = true;
        }

        let finished = {
            let head = planner.head_move().expect("active runtime implies a head move");
            match head.kind {
                MoveKind::Dwell => self.advance_dwell(producer, head),
                MoveKind::CommandSync => self.advance_command_sync(producer, head),
                MoveKind::Seek | MoveKind::Feed => self.advance_motion(producer, head),
            }
        };

        if finished {
            planner.complete_head();
            self.active = false;
        }
        true
    }

    /// Integrate the synthesized decel-to-zero tail across one Δt, the
    /// feedhold counterpart to `advance_motion`.
    fn advance_hold(&mut self, producer: &mut StepProducer, hold: &mut HoldState) -> bool {
        let total_time = hold.decel.timing.total();
        let mut dt = (total_time - hold.phase).min(SEGMENT_SECONDS);
        if dt < 0.0 {
            dt = 0.0;
        }

        let (v_start, _) = hold.decel.velocity_at(hold.phase);
        let (v_end, _) = hold.decel.velocity_at(hold.phase + dt);
        let distance = 0.5 * (v_start + v_end) * dt;
        hold.distance_during_hold += distance;

        let mut step_deltas = [0i32; MAX_AXES];
        for i in 0..MAX_AXES {
            let axis_distance = distance * hold.decel.unit_vector[i];
            let exact_steps = axis_distance * hold.decel.steps_per_unit[i] + hold.residual[i];
            let whole = exact_steps.trunc();
            hold.residual[i] = exact_steps - whole;
            step_deltas[i] = whole as i32;
        }

        hold.phase += dt;
        let done = hold.phase >= total_time - 1e-6;

        if done {
            for i in 0..MAX_AXES {
                step_deltas[i] += hold.residual[i].round() as i32;
                hold.residual[i] = 0.0;
            }
        }

        let duration_us = (dt.max(MIN_SEGMENT_SECONDS) * 1_000_000.0) as u32;
        let _ = producer.enqueue(Segment {
            step_deltas,
            duration_us,
            line_number: hold.decel.line_number,
            last_flag: done,
            sync: None,
        });
        done
    }

    fn advance_dwell(&mut self, producer: &mut StepProducer, head: &PlannedMove) -> bool {
        let dt = self.cursor.dwell_remaining.min(SEGMENT_SECONDS);
        self.cursor.dwell_remaining -= dt;
        let done = self.cursor.dwell_remaining <= 1e-6;
        let _ = producer.enqueue(Segment::idle((dt * 1_000_000.0) as u32, head.line_number, done));
        done
    }

    fn advance_command_sync(&mut self, producer: &mut StepProducer, head: &PlannedMove) -> bool {
        // Command-sync records carry no motion of their own; a single idle
        // segment carries the `SyncCommand` through to the executor, which
        // signals it at dequeue (spec §4.4 "Dwell and command-sync").
        let _ = producer.enqueue(Segment {
            step_deltas: [0; MAX_AXES],
            duration_us: 0,
            line_number: head.line_number,
            last_flag: true,
            sync: head.sync,
        });
        true
    }

    /// Integrate the jerk profile across one Δt, emit per-axis step deltas,
    /// and report whether the move is fully consumed.
    fn advance_motion(&mut self, producer: &mut StepProducer, head: &PlannedMove) -> bool {
        let total_time = head.timing.total().max(SEGMENT_SECONDS);
        let mut dt = (total_time - self.cursor.phase).min(SEGMENT_SECONDS);
        if dt < 0.0 {
            dt = 0.0;
        }

        let (v_start, _) = head.velocity_at(self.cursor.phase);
        let (v_end, _) = head.velocity_at(self.cursor.phase + dt);
        // Trapezoidal integration of the velocity profile over the slice.
        let distance = 0.5 * (v_start + v_end) * dt;
        self.cursor.distance_traveled += distance;

        let mut step_deltas = [0i32; MAX_AXES];
        let mut any_steps = false;
        for i in 0..MAX_AXES {
            let axis_distance = distance * head.unit_vector[i];
            let exact_steps = axis_distance * head.steps_per_unit[i] + self.cursor.residual[i];
            let whole = exact_steps.trunc();
            self.cursor.residual[i] = exact_steps - whole;
            step_deltas[i] = whole as i32;
            if step_deltas[i] != 0 {
                any_steps = true;
            }
        }

        self.cursor.phase += dt;
        let done = self.cursor.phase >= total_time - 1e-6;

        if !any_steps && !done {
            // Minimum-segment coalescing (spec §4.4): extend the phase
            // cursor without emitting until at least one axis steps, or the
            // move ends.
            return false;
        }

        if done {
            // Eliminate drift by clamping the final segment's residual so the
            // accumulated steps equal the move's pre-computed integer total.
            for i in 0..MAX_AXES {
                step_deltas[i] += self.cursor.residual[i].round() as i32;
                self.cursor.residual[i] = 0.0;
            }
        }

        let duration_us = (dt.max(MIN_SEGMENT_SECONDS) * 1_000_000.0) as u32;
        let _ = producer.enqueue(Segment {
            step_deltas,
            duration_us,
            line_number: head.line_number,
            last_flag: done,
            sync: None,
        });
        done
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::axis::AxisConfig;
    use crate::planner::MotionPlanner;
    use tinyg_gcode::CanonicalMove;

    fn axes() -> [AxisConfig; MAX_AXES] {
        let mut a = [AxisConfig::default(); MAX_AXES];
        for axis in a.iter_mut() {
            axis.velocity_max = 200.0;
            axis.feedrate_max = 200.0;
            axis.jerk_max = 5_000_000.0;
            axis.junction_deviation = 0.05;
        }
        a
    }

    #[test]
    fn single_linear_move_runs_to_completion_and_conserves_steps() {
        let axes = axes();
        let steps_per_unit = [80.0; MAX_AXES];
        let mut planner: MotionPlanner<32> = MotionPlanner::new([0.0; MAX_AXES], SEGMENT_SECONDS);
        let mv = CanonicalMove::feed([10.0, 0.0, 0.0, 0.0], 600.0, 1);
        planner.enqueue(&mv, &axes, &steps_per_unit).unwrap();

        let mut queue: StepQueue = Queue::new();
        let (mut producer, mut consumer) = queue.split();
        let mut runtime = SegmentRuntime::new();

        let mut total_steps_x = 0i32;
        let mut last_seen = false;
        for _ in 0..100_000 {
            if !runtime.tick(&mut planner, &mut producer) && producer.ready() {
                break;
            }
            while let Some(seg) = consumer.dequeue() {
                total_steps_x += seg.step_deltas[0];
                if seg.last_flag {
                    last_seen = true;
                }
            }
            if last_seen && planner.is_empty() {
                break;
            }
        }

        assert!(last_seen, "expected the move to signal its final segment");
        assert_eq!(total_steps_x, 800);
    }
}
