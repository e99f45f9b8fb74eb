#![no_std]
//! # Stepper Executor
//!
//! Realizes fixed-duration segments as electrical step pulses using a
//! per-axis Bresenham/DDA distribution, driven by a periodic high-priority
//! timer interrupt, with a separate one-shot timer to clear the STEP pins
//! after the driver's minimum pulse width.
//!
//! Grounded on the pipelined queue-and-ISR shape of a dedicated stepper
//! driver task, adapted here from a single variable-interval step queue to
//! the fixed-tick, multi-axis DDA distribution this design's segments need.

use core::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use tinyg_gcode::SyncCommand;
use tinyg_hal::{AuxOutputs, MotorPins, Timer};
use tinyg_motion::segment::{Segment, StepConsumer};
use tinyg_motion::MAX_AXES;

#[derive(Debug, Copy, Clone, Default)]
struct AxisRunState {
    counter: u32,
    steps_abs: u32,
    steps_remaining: u32,
    direction_positive: bool,
}

/// Consumes the step queue and drives `MotorPins` for each axis.
///
/// `on_tick` must be called from the periodic step-rate timer interrupt;
/// `on_pulse_timer_interrupt` must be called from the short one-shot pulse
/// timer's interrupt. Both run in ISR context; all other methods are for the
/// non-ISR scheduler task that feeds the queue and drains notifications.
pub struct StepperExecutor<'q, P, T, A>
where
    P: MotorPins,
    T: Timer,
    A: AuxOutputs,
{
    pins: [P; MAX_AXES],
    pulse_timer: T,
    pulse_width_us: u32,
    consumer: StepConsumer<'q>,
    aux: A,
    axes: [AxisRunState; MAX_AXES],
    segment_ticks: u32,
    current_line_number: u32,
    current_last_flag: bool,
    loaded: bool,
    position_steps: [i32; MAX_AXES],
    completed_moves: AtomicU32,
    underrun: AtomicBool,
}

impl<'q, P, T, A> StepperExecutor<'q, P, T, A>
where
    P: MotorPins,
    T: Timer,
    A: AuxOutputs,
{
    pub fn new(pins: [P; MAX_AXES], pulse_timer: T, consumer: StepConsumer<'q>, pulse_width_us: u32, aux: A) -> Self {
        Self {
            pins,
            pulse_timer,
            pulse_width_us,
            consumer,
            aux,
            axes: [AxisRunState::default(); MAX_AXES],
            segment_ticks: 1,
            current_line_number: 0,
            current_last_flag: false,
            loaded: false,
            position_steps: [0; MAX_AXES],
            completed_moves: AtomicU32::new(0),
            underrun: AtomicBool::new(false),
        }
    }

    /// The fixed-rate timer interrupt handler (spec §4.5 "Timing model").
    /// `tick_period_us` is the caller's fixed ISR period; it must match the
    /// period used to convert each segment's `duration_us` into
    /// `segment_ticks` at load time.
    pub fn on_tick(&mut self, tick_period_us: u32) {
        if !self.loaded && !self.load_next_segment(tick_period_us) {
            return;
        }

        let mut any_stepped = false;
        for i in 0..MAX_AXES {
            let axis = &mut self.axes[i];
            if axis.steps_remaining == 0 {
                continue;
            }
            axis.counter += axis.steps_abs;
            if axis.counter >= self.segment_ticks {
                axis.counter -= self.segment_ticks;
                self.pins[i].set_step(true);
                axis.steps_remaining -= 1;
                self.position_steps[i] += if axis.direction_positive { 1 } else { -1 };
                any_stepped = true;
            }
        }
        let all_done = self.axes.iter().all(|a| a.steps_remaining == 0);

        if any_stepped {
            self.pulse_timer.arm(self.pulse_width_us);
        }

        if all_done {
            self.loaded = false;
            if self.current_last_flag {
                self.completed_moves.fetch_add(1, Ordering::Release);
            }
            if !self.load_next_segment(tick_period_us) && self.current_last_flag {
                // Queue drained right after signalling completion: expected
                // idle state, not an underrun.
            } else if !self.loaded && !self.current_last_flag {
                self.underrun.store(true, Ordering::Release);
            }
        }
    }

    /// The pulse-off one-shot timer interrupt: clears every STEP pin
    /// (spec §4.5 step 2).
    pub fn on_pulse_timer_interrupt(&mut self) {
        for pin in self.pins.iter_mut() {
            pin.set_step(false);
        }
        self.pulse_timer.stop();
    }

    /// Load the next queued segment. Sets direction pins before any STEP
    /// pulse of the new segment (spec §4.5 "Direction setup"). Returns
    /// `false` if the queue was empty.
    fn load_next_segment(&mut self, tick_period_us: u32) -> bool {
        let Some(seg) = self.consumer.dequeue() else {
            return false;
        };
        self.apply_segment(&seg, tick_period_us);
        true
    }

    fn apply_segment(&mut self, seg: &Segment, tick_period_us: u32) {
        self.segment_ticks = (seg.duration_us / tick_period_us.max(1)).max(1);
        self.current_line_number = seg.line_number;
        self.current_last_flag = seg.last_flag;
        self.loaded = true;

        if let Some(cmd) = seg.sync {
            self.dispatch_sync(cmd);
        }

        for i in 0..MAX_AXES {
            let delta = seg.step_deltas[i];
            let positive = delta >= 0;
            self.pins[i].set_dir(positive);
            self.axes[i] = AxisRunState {
                counter: 0,
                steps_abs: delta.unsigned_abs(),
                steps_remaining: delta.unsigned_abs(),
                direction_positive: positive,
            };
        }
    }

    /// Signal a queued spindle/coolant/tool-change command to the aux
    /// outputs at the moment its carrying segment is dequeued (spec §4.4:
    /// "signal the command ... to the host interface at the moment of
    /// dequeue"). Runs in ISR context, same as the step pulses themselves.
    fn dispatch_sync(&mut self, cmd: SyncCommand) {
        match cmd {
            SyncCommand::SetSpindle { on, clockwise, .. } => self.aux.set_spindle(on, clockwise),
            SyncCommand::SetCoolantMist(on) => self.aux.set_coolant_mist(on),
            SyncCommand::SetCoolantFlood(on) => self.aux.set_coolant_flood(on),
            SyncCommand::SetTool(_) => {}
        }
    }

    /// Drain the count of moves the ISR has signalled complete since the
    /// last call. Meant for the non-ISR motion-queue-runner task, which
    /// advances the planner head that many times (spec §4.5 "Concurrency":
    /// the executor never touches the planner directly).
    pub fn take_completed_count(&self) -> u32 {
        self.completed_moves.swap(0, Ordering::AcqRel)
    }

    pub fn has_underrun(&self) -> bool {
        self.underrun.load(Ordering::Acquire)
    }

    pub fn clear_underrun(&self) {
        self.underrun.store(false, Ordering::Release);
    }

    pub fn position_steps(&self) -> &[i32; MAX_AXES] {
        &self.position_steps
    }

    pub fn current_line_number(&self) -> u32 {
        self.current_line_number
    }

    pub fn aux(&self) -> &A {
        &self.aux
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use heapless::spsc::Queue;
    use tinyg_motion::segment::STEP_QUEUE_CAPACITY;

    #[derive(Default)]
    struct MockPins {
        step: bool,
        dir: bool,
        enabled: bool,
        step_pulses: u32,
    }

    impl MotorPins for MockPins {
        fn set_step(&mut self, high: bool) {
            if high && !self.step {
                self.step_pulses += 1;
            }
            self.step = high;
        }
        fn set_dir(&mut self, positive: bool) {
            self.dir = positive;
        }
        fn enable(&mut self, enabled: bool) {
            self.enabled = enabled;
        }
    }

    #[derive(Default)]
    struct MockTimer {
        armed_us: u32,
        stopped: bool,
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

    #[derive(Debug, Default, Clone, Copy, PartialEq)]
    struct MockAux {
        spindle_on: bool,
        spindle_clockwise: bool,
        mist: bool,
        flood: bool,
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

    #[test]
    fn single_axis_segment_produces_the_requested_step_count() {
        let mut queue: Queue<Segment, STEP_QUEUE_CAPACITY> = Queue::new();
        let (mut producer, consumer) = queue.split();
        producer
            .enqueue(Segment { step_deltas: [4, 0, 0, 0], duration_us: 1000, line_number: 1, last_flag: true, sync: None })
            .unwrap();

        let pins = [MockPins::default(), MockPins::default(), MockPins::default(), MockPins::default()];
        let mut exec = StepperExecutor::new(pins, MockTimer::default(), consumer, 2, MockAux::default());

        for _ in 0..200 {
            exec.on_tick(10);
        }

        assert_eq!(exec.position_steps()[0], 4);
        assert_eq!(exec.take_completed_count(), 1);
        assert!(!exec.has_underrun());
    }

    #[test]
    fn empty_queue_after_non_final_segment_marks_underrun() {
        let mut queue: Queue<Segment, STEP_QUEUE_CAPACITY> = Queue::new();
        let (mut producer, consumer) = queue.split();
        producer
            .enqueue(Segment { step_deltas: [1, 0, 0, 0], duration_us: 100, line_number: 1, last_flag: false, sync: None })
            .unwrap();

        let pins = [MockPins::default(), MockPins::default(), MockPins::default(), MockPins::default()];
        let mut exec = StepperExecutor::new(pins, MockTimer::default(), consumer, 2, MockAux::default());

        for _ in 0..50 {
            exec.on_tick(10);
        }

        assert!(exec.has_underrun());
    }

    #[test]
    fn command_sync_segment_dispatches_to_aux_at_dequeue() {
        let mut queue: Queue<Segment, STEP_QUEUE_CAPACITY> = Queue::new();
        let (mut producer, consumer) = queue.split();
        producer
            .enqueue(Segment {
                step_deltas: [0; MAX_AXES],
                duration_us: 0,
                line_number: 1,
                last_flag: true,
                sync: Some(SyncCommand::SetSpindle { on: true, clockwise: true, speed: 1000.0 }),
            })
            .unwrap();
        producer
            .enqueue(Segment {
                step_deltas: [0; MAX_AXES],
                duration_us: 0,
                line_number: 2,
                last_flag: true,
                sync: Some(SyncCommand::SetCoolantMist(true)),
            })
            .unwrap();

        let pins = [MockPins::default(), MockPins::default(), MockPins::default(), MockPins::default()];
        let mut exec = StepperExecutor::new(pins, MockTimer::default(), consumer, 2, MockAux::default());

        // Both carry zero motion, so they drain and dispatch in the same tick.
        exec.on_tick(10);
        assert!(exec.aux().spindle_on);
        assert!(exec.aux().spindle_clockwise);
        assert!(exec.aux().mist);
    }
}
