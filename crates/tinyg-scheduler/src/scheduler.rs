//! The dispatch loop itself (spec §4.1 "Dispatch order").

use heapless::Vec;
use tinyg_gcode::{CanonicalMachine, Emission, GResult, MAX_EMISSIONS};
use tinyg_hal::{Axis, LimitSwitch};
use tinyg_motion::segment::{SegmentRuntime, StepProducer};
use tinyg_motion::{AxisConfig, MotionPlanner, PlannerError, MAX_AXES};

use crate::homing::{AxisJog, HomingCycle};
use crate::limit::{poll_limit_switches, LimitEvent};
use crate::machine_state::MachineState;
use crate::task::TaskOutcome;

/// Supplies one already-normalized line of G-code text when one is ready.
/// The reader task only calls this when the planner has room (spec §4.2
/// backpressure), so an implementation need not rate-limit itself.
pub trait LineSource {
    fn next_line(&mut self) -> Option<heapless::String<128>>;
}

/// Decouples the scheduler from the concrete stepper executor type: any
/// executor can report an underrun (spec §4.6 "Underrun in executor"),
/// which the scheduler turns into an alarm.
pub trait UnderrunSource {
    fn has_underrun(&self) -> bool;
    fn clear_underrun(&self);
}

/// Ties the canonical machine, planner, and segment runtime together and
/// runs them as priority-ordered cooperative tasks.
pub struct Scheduler<const N: usize, R: LineSource> {
    pub canonical: CanonicalMachine,
    pub planner: MotionPlanner<N>,
    pub runtime: SegmentRuntime,
    pub homing: HomingCycle,
    pub state: MachineState,
    reader: R,
    steps_per_unit: [f32; MAX_AXES],
    /// Emissions from the most recently parsed line that could not be
    /// enqueued yet because the planner ring filled mid-line (spec §8.5 "no
    /// move is lost"). Drained a few at a time as the planner frees slots,
    /// ahead of reading any further line.
    pending_emissions: Vec<Emission, MAX_EMISSIONS>,
    pending_pos: usize,
    /// Where the machine settled once a requested feedhold finished
    /// decelerating: `Some(Some(pos))` if a move was truncated mid-flight,
    /// `Some(None)` if nothing was running. Cleared by `request_resume`.
    hold_settlement: Option<Option<[f32; MAX_AXES]>>,
}

impl<const N: usize, R: LineSource> Scheduler<N, R> {
    pub fn new(planner: MotionPlanner<N>, reader: R, steps_per_unit: [f32; MAX_AXES]) -> Self {
        Self {
            canonical: CanonicalMachine::new(),
            planner,
            runtime: SegmentRuntime::new(),
            homing: HomingCycle::default(),
            state: MachineState::Reset,
            reader,
            steps_per_unit,
            pending_emissions: Vec::new(),
            pending_pos: 0,
            hold_settlement: None,
        }
    }

    /// Request a feedhold (spec §4.5): the segment runtime decelerates the
    /// current move to zero instead of running it to completion. A no-op
    /// while alarmed, homing, or already holding.
    pub fn request_feedhold(&mut self) {
        if matches!(self.state, MachineState::Alarm | MachineState::Homing | MachineState::Hold) {
            return;
        }
        self.runtime.request_hold();
        self.state = MachineState::Hold;
    }

    /// How many of the most recently parsed line's emissions are still
    /// waiting for planner room. Zero once the whole line has drained.
    pub fn pending_emissions_remaining(&self) -> usize {
        self.pending_emissions.len() - self.pending_pos
    }

    /// Resume after a feedhold has fully settled (spec §4.5 "Resume
    /// re-plans from the current position"). Returns `false` if not
    /// currently holding, or the hold hasn't finished decelerating yet.
    pub fn request_resume(&mut self) -> bool {
        if !matches!(self.state, MachineState::Hold) {
            return false;
        }
        let Some(settlement) = self.hold_settlement.take() else {
            return false;
        };
        let position = settlement.unwrap_or_else(|| self.planner.last_target());
        self.planner.resume_from(position);
        self.runtime.resume();
        self.state = MachineState::Reset;
        true
    }

    /// One pass of the full dispatch order. `axes` are consulted for
    /// planning limits; `producer` is the stepper's step-queue half.
    pub fn dispatch<L: LimitSwitch, J: AxisJog, U: UnderrunSource>(
        &mut self,
        axes: &[AxisConfig; MAX_AXES],
        switches: &[(Axis, L)],
        jog: &mut J,
        producer: &mut StepProducer,
        homing_configs: &[(Axis, tinyg_motion::HomingConfig)],
        underrun: &U,
        dt: f32,
    ) -> TaskOutcome {
        if underrun.has_underrun() {
            self.raise_alarm(jog, switches, LimitEvent::default());
            return TaskOutcome::Ok;
        }

        let (limit_outcome, event) = poll_limit_switches(switches);
        if !event.is_empty() && !matches!(self.state, MachineState::Homing) {
            self.raise_alarm(jog, switches, event);
            return TaskOutcome::Ok;
        }
        if limit_outcome.is_eagain() {
            return TaskOutcome::Eagain;
        }

        if matches!(self.state, MachineState::Hold) {
            return self.run_feedhold(producer);
        }

        let motion_outcome = self.run_motion_queue(producer);
        if motion_outcome.is_eagain() {
            return TaskOutcome::Eagain;
        }

        if self.homing.is_active() {
            let done = self.homing.tick(dt, homing_configs, switches, jog);
            if done {
                self.state = MachineState::Reset;
            }
            return TaskOutcome::Ok;
        }

        if self.planner.has_room() || self.pending_pos < self.pending_emissions.len() {
            return self.read_one_line(axes);
        }
        TaskOutcome::Noop
    }

    fn run_motion_queue(&mut self, producer: &mut StepProducer) -> TaskOutcome {
        if self.planner.is_empty() {
            return TaskOutcome::Noop;
        }
        if self.runtime.tick(&mut self.planner, producer) {
            TaskOutcome::Ok
        } else {
            TaskOutcome::Eagain
        }
    }

    /// Advance a feedhold in progress: decelerate the head move to zero (or,
    /// if nothing was running, settle immediately), capturing where the
    /// machine came to rest for `request_resume` (spec §4.5).
    fn run_feedhold(&mut self, producer: &mut StepProducer) -> TaskOutcome {
        let progressed = self.runtime.tick(&mut self.planner, producer);
        if let Some(settlement) = self.runtime.take_settled_hold() {
            self.hold_settlement = Some(settlement);
        }
        if progressed {
            TaskOutcome::Ok
        } else {
            TaskOutcome::Eagain
        }
    }

    fn read_one_line(&mut self, axes: &[AxisConfig; MAX_AXES]) -> TaskOutcome {
        if self.pending_pos < self.pending_emissions.len() {
            return self.drain_pending(axes);
        }
        let Some(line) = self.reader.next_line() else {
            return TaskOutcome::Noop;
        };
        match self.process_line(&line, axes) {
            Ok(outcome) => outcome,
            Err(_status) => TaskOutcome::Ok, // bad input: status returned upstream, pipeline unaffected
        }
    }

    fn process_line(&mut self, line: &str, axes: &[AxisConfig; MAX_AXES]) -> GResult<TaskOutcome> {
        let emissions = self.canonical.process_line(line)?;
        self.pending_emissions = emissions;
        self.pending_pos = 0;
        Ok(self.drain_pending(axes))
    }

    /// Enqueue as many of the current line's buffered emissions as the
    /// planner has room for, stopping the moment it fills rather than
    /// dropping the rest (spec §8.5 "no move is lost"). Whatever remains
    /// stays buffered and is re-offered ahead of any further line on later
    /// dispatch ticks.
    fn drain_pending(&mut self, axes: &[AxisConfig; MAX_AXES]) -> TaskOutcome {
        while self.pending_pos < self.pending_emissions.len() {
            if let Emission::Move(mv) = self.pending_emissions[self.pending_pos] {
                match self.planner.enqueue(&mv, axes, &self.steps_per_unit) {
                    Ok(()) => {}
                    // Ring full: a flow-control condition, not a parse error.
                    // Leave `pending_pos` where it is so this same emission
                    // is retried once the planner frees a slot.
                    Err(PlannerError::QueueFull) => return TaskOutcome::Eagain,
                    // A degenerate chord (e.g. zero length): drop it and
                    // keep draining the rest of the line, same as the
                    // canonical machine's own zero-length-move handling.
                    Err(PlannerError::ZeroLengthMove | PlannerError::StepQueueFull) => {}
                }
            }
            self.pending_pos += 1;
        }
        self.pending_emissions.clear();
        self.pending_pos = 0;
        TaskOutcome::Ok
    }

    fn raise_alarm<L: LimitSwitch, J: AxisJog>(&mut self, jog: &mut J, _switches: &[(Axis, L)], _event: LimitEvent) {
        self.state = MachineState::Alarm;
        for axis in Axis::ALL {
            jog.stop(axis);
        }
        self.planner.flush();
        self.runtime.reset();
        self.pending_emissions.clear();
        self.pending_pos = 0;
        self.hold_settlement = None;
    }
}
