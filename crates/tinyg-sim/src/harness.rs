//! Drives the scheduler and stepper executor together for a fixed number of
//! ticks and records a trace of what happened, the way a CI run would want
//! to inspect a simulated job after the fact without attaching a debugger.

use serde::Serialize;
use std::collections::VecDeque;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use tracing::{info, instrument};

use tinyg_hal::{Axis, MotorPins};
use tinyg_motion::segment::{StepConsumer, StepProducer, StepQueue};
use tinyg_motion::{AxisConfig, HomingConfig, MotionPlanner, MAX_AXES};
use tinyg_scheduler::scheduler::UnderrunSource;
use tinyg_scheduler::{AxisJog, LineSource, MachineState, Scheduler, TaskOutcome};
use tinyg_stepper::StepperExecutor;

use crate::mock_hal::{default_switches, MockAux, MockPins, MockSwitch, MockTimer};

const PLANNER_CAPACITY: usize = 16;
const TICK_PERIOD_US: u32 = 10;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub enum TraceState {
    Reset,
    Cycle,
    Run,
    Hold,
    Homing,
    Jog,
    Alarm,
    End,
}

impl From<MachineState> for TraceState {
    fn from(s: MachineState) -> Self {
        match s {
            MachineState::Reset => TraceState::Reset,
            MachineState::Cycle => TraceState::Cycle,
            MachineState::Run => TraceState::Run,
            MachineState::Hold => TraceState::Hold,
            MachineState::Homing => TraceState::Homing,
            MachineState::Jog => TraceState::Jog,
            MachineState::Alarm => TraceState::Alarm,
            MachineState::End => TraceState::End,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TraceEntry {
    pub tick: u64,
    pub state: TraceState,
    pub position_steps: [i32; MAX_AXES],
    pub dispatch_outcome: &'static str,
}

struct VecLineSource(VecDeque<heapless::String<128>>);
impl LineSource for VecLineSource {
    fn next_line(&mut self) -> Option<heapless::String<128>> {
        self.0.pop_front()
    }
}

struct MockUnderrun(bool);
impl UnderrunSource for MockUnderrun {
    fn has_underrun(&self) -> bool {
        self.0
    }
    fn clear_underrun(&self) {}
}

fn outcome_label(outcome: TaskOutcome) -> &'static str {
    match outcome {
        TaskOutcome::Ok => "ok",
        TaskOutcome::Noop => "noop",
        TaskOutcome::Eagain => "eagain",
    }
}

/// Wires a `Scheduler` and `StepperExecutor` together over mock peripherals
/// and runs them for a given number of step-rate ticks, exactly as the
/// firmware's main loop would, minus real interrupts.
pub struct SimMachine {
    scheduler: Scheduler<PLANNER_CAPACITY, VecLineSource>,
    executor: StepperExecutor<'static, MockPins, MockTimer, MockAux>,
    producer: StepProducer<'static>,
    axes: [AxisConfig; MAX_AXES],
    homing_configs: [(Axis, HomingConfig); MAX_AXES],
    switches: [(Axis, MockSwitch); MAX_AXES],
    jog_pins: [MockPins; MAX_AXES],
    jog_residual: [f32; MAX_AXES],
    trace: Vec<TraceEntry>,
    tick: u64,
}

impl SimMachine {
    pub fn new(steps_per_unit: [f32; MAX_AXES], axes: [AxisConfig; MAX_AXES], gcode: &[&str]) -> Self {
        let queue: &'static mut StepQueue = Box::leak(Box::new(StepQueue::new()));
        let (producer, consumer): (StepProducer<'static>, StepConsumer<'static>) = queue.split();

        let planner: MotionPlanner<PLANNER_CAPACITY> = MotionPlanner::new([0.0; MAX_AXES], tinyg_motion::SEGMENT_SECONDS);
        let lines = gcode.iter().map(|l| heapless::String::try_from(*l).unwrap()).collect();
        let scheduler = Scheduler::new(planner, VecLineSource(lines), steps_per_unit);

        let pins = [MockPins::default(); MAX_AXES];
        let executor = StepperExecutor::new(pins, MockTimer::default(), consumer, 2, MockAux::default());

        Self {
            scheduler,
            executor,
            producer,
            axes,
            homing_configs: Axis::ALL.map(|a| (a, HomingConfig::default())),
            switches: default_switches(),
            jog_pins: [MockPins::default(); MAX_AXES],
            jog_residual: [0.0; MAX_AXES],
            trace: Vec::new(),
            tick: 0,
        }
    }

    pub fn jog_pins(&self) -> &[MockPins; MAX_AXES] {
        &self.jog_pins
    }

    pub fn trip_switch(&mut self, axis: Axis, end: tinyg_hal::LimitEnd) {
        for (a, sw) in self.switches.iter_mut() {
            if *a == axis {
                match end {
                    tinyg_hal::LimitEnd::Min => sw.min_triggered = true,
                    tinyg_hal::LimitEnd::Max => sw.max_triggered = true,
                }
            }
        }
    }

    pub fn state(&self) -> MachineState {
        self.scheduler.state
    }

    pub fn position_steps(&self) -> [i32; MAX_AXES] {
        *self.executor.position_steps()
    }

    pub fn aux(&self) -> MockAux {
        *self.executor.aux()
    }

    #[instrument(skip(self))]
    pub fn run_ticks(&mut self, n: u64) {
        for _ in 0..n {
            self.executor.on_tick(TICK_PERIOD_US);
            let underrun = MockUnderrun(self.executor.has_underrun());
            self.executor.clear_underrun();

            let dt = tinyg_motion::SEGMENT_SECONDS;
            let mut jog = SimJog { pins: &mut self.jog_pins, residual: &mut self.jog_residual, dt };
            let outcome =
                self.scheduler
                    .dispatch(&self.axes, &self.switches, &mut jog, &mut self.producer, &self.homing_configs, &underrun, dt);

            self.trace.push(TraceEntry {
                tick: self.tick,
                state: self.scheduler.state.into(),
                position_steps: self.position_steps(),
                dispatch_outcome: outcome_label(outcome),
            });
            self.tick += 1;
        }
        info!(ticks = n, final_state = ?self.scheduler.state, "simulation run complete");
    }

    pub fn dump_trace(&self, path: &Path) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(&self.trace)?;
        File::create(path)?.write_all(json.as_bytes())?;
        Ok(())
    }

    pub fn trace(&self) -> &[TraceEntry] {
        &self.trace
    }
}

struct SimJog<'a> {
    pins: &'a mut [MockPins; MAX_AXES],
    residual: &'a mut [f32; MAX_AXES],
    dt: f32,
}

impl<'a> AxisJog for SimJog<'a> {
    fn jog(&mut self, axis: Axis, velocity: f32) {
        let i = axis.index();
        self.pins[i].set_dir(velocity >= 0.0);
        self.residual[i] += velocity * self.dt;
        while self.residual[i].abs() >= 1.0 {
            self.pins[i].set_step(true);
            self.pins[i].set_step(false);
            self.residual[i] -= self.residual[i].signum();
        }
    }
    fn stop(&mut self, axis: Axis) {
        self.residual[axis.index()] = 0.0;
    }
    fn zero_position(&mut self, _axis: Axis) {}
}
