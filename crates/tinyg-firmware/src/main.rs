//! Bare-metal entry point.
//!
//! There is deliberately no RTIC or Embassy application here: the dispatch
//! model is the cooperative, non-preemptive scheduler from spec §4.1, not a
//! priority-preemptive executor. On real hardware, `StepperExecutor::on_tick`
//! and `on_pulse_timer_interrupt` are the only code that needs binding to
//! actual interrupt vectors (the step-rate timer and the pulse-off
//! one-shot); everything else, including the scheduler dispatch below, runs
//! from the main loop between interrupts.
//!
//! No chip PAC is targeted here, so the motor/limit/timer/aux peripherals
//! are a no-op stand-in (`NullBoard`, below) exercising the same trait
//! surface a real board implements. Swapping in a real board means
//! providing a `Board` impl over that chip's GPIO/timer HAL and binding the
//! two ISR entry points above to its timers.

#![no_std]
#![no_main]

use core::sync::atomic::{AtomicBool, Ordering};
use cortex_m_rt::entry;

use heapless::spsc::Queue;
use tinyg_hal::{Axis, AuxOutputs, LimitEnd, LimitSwitch, MotorPins, Timer};
use tinyg_motion::segment::{Segment, StepConsumer, StepProducer, STEP_QUEUE_CAPACITY};
use tinyg_motion::{AxisConfig, HomingConfig, MotionPlanner, MAX_AXES};
use tinyg_scheduler::{AxisJog, LineSource, Scheduler};
use tinyg_stepper::StepperExecutor;

use tinyg_firmware::board::Board;

use defmt_rtt as _;
use panic_probe as _;

const PLANNER_CAPACITY: usize = 16;
const SEGMENT_SECONDS: f32 = tinyg_motion::SEGMENT_SECONDS;
const PULSE_WIDTH_US: u32 = 2;
const TICK_PERIOD_US: u32 = 10;

#[derive(Default)]
struct NullPins {
    step: bool,
}
impl MotorPins for NullPins {
    fn set_step(&mut self, high: bool) {
        self.step = high;
    }
    fn set_dir(&mut self, _forward: bool) {}
    fn enable(&mut self, _on: bool) {}
}

struct NullSwitch;
impl LimitSwitch for NullSwitch {
    fn read_limit(&self, _end: LimitEnd) -> bool {
        false
    }
}

#[derive(Default)]
struct NullTimer {
    armed_us: u32,
}
impl Timer for NullTimer {
    fn arm(&mut self, period_us: u32) {
        self.armed_us = period_us;
    }
    fn stop(&mut self) {
        self.armed_us = 0;
    }
}

#[derive(Default)]
struct NullAux;
impl AuxOutputs for NullAux {
    fn set_spindle(&mut self, _on: bool, _clockwise: bool) {}
    fn set_coolant_mist(&mut self, _on: bool) {}
    fn set_coolant_flood(&mut self, _on: bool) {}
}

/// No real target is wired up; every peripheral is a no-op. A board
/// bring-up replaces this with GPIO/timer types from that chip's HAL crate.
///
/// Its motors and aux outputs are separate from the ones `StepperExecutor`
/// drives below: a real board hands out split pin ownership (one half to
/// the ISR-owned executor, one half to the homing jog on the main loop) the
/// way its GPIO HAL supports; faking that split meaningfully needs real
/// peripheral types, so this stand-in just gives each consumer its own
/// no-op set.
struct NullBoard {
    motors: [NullPins; MAX_AXES],
    limits: [NullSwitch; MAX_AXES],
    pulse_timer: NullTimer,
    aux: NullAux,
}

impl Board for NullBoard {
    type Motor = NullPins;
    type Limit = NullSwitch;
    type PulseTimer = NullTimer;
    type Aux = NullAux;

    fn motors(&mut self) -> &mut [Self::Motor; MAX_AXES] {
        &mut self.motors
    }
    fn limits(&mut self) -> &mut [Self::Limit; MAX_AXES] {
        &mut self.limits
    }
    fn pulse_timer(&mut self) -> &mut Self::PulseTimer {
        &mut self.pulse_timer
    }
    fn aux(&mut self) -> &mut Self::Aux {
        &mut self.aux
    }
}

/// Always empty: there is no host command link wired up on this stand-in
/// board. A real board's USART/USB reader implements `LineSource` instead.
struct NoLines;
impl LineSource for NoLines {
    fn next_line(&mut self) -> Option<heapless::String<128>> {
        None
    }
}

/// Drives homing jogs directly through a set of motor pins at a coarse,
/// software-timed step rate. Precision matters far less here than during a
/// planned cut, so a fractional-step accumulator advanced once per
/// dispatch tick is accurate enough to find a switch.
struct PinJog<'a, P: MotorPins> {
    pins: &'a mut [P; MAX_AXES],
    steps_per_unit: [f32; MAX_AXES],
    residual: &'a mut [f32; MAX_AXES],
    dt: f32,
}

impl<'a, P: MotorPins> AxisJog for PinJog<'a, P> {
    fn jog(&mut self, axis: Axis, velocity: f32) {
        let i = axis.index();
        self.pins[i].set_dir(velocity >= 0.0);
        self.residual[i] += velocity * self.steps_per_unit[i] * self.dt;
        while self.residual[i].abs() >= 1.0 {
            self.pins[i].set_step(true);
            self.pins[i].set_step(false);
            self.residual[i] -= self.residual[i].signum();
        }
    }

    fn stop(&mut self, axis: Axis) {
        self.residual[axis.index()] = 0.0;
    }

    fn zero_position(&mut self, _axis: Axis) {
        // Machine position bookkeeping lives on `AxisConfig`, owned by the
        // caller, which resets `machine_position_steps` once this returns.
    }
}

static UNDERRUN: AtomicBool = AtomicBool::new(false);
static mut STEP_QUEUE: Queue<Segment, STEP_QUEUE_CAPACITY> = Queue::new();

struct UnderrunFlag;
impl tinyg_scheduler::scheduler::UnderrunSource for UnderrunFlag {
    fn has_underrun(&self) -> bool {
        UNDERRUN.load(Ordering::Acquire)
    }
    fn clear_underrun(&self) {
        UNDERRUN.store(false, Ordering::Release);
    }
}

fn axis_configs() -> [AxisConfig; MAX_AXES] {
    let mut axes = [AxisConfig::default(); MAX_AXES];
    for axis in axes.iter_mut() {
        axis.velocity_max = 200.0;
        axis.feedrate_max = 200.0;
        axis.jerk_max = 500_000.0;
        axis.junction_deviation = 0.05;
        axis.travel_max = 300.0;
    }
    axes
}

fn homing_configs() -> [(Axis, HomingConfig); MAX_AXES] {
    Axis::ALL.map(|a| (a, HomingConfig::default()))
}

#[entry]
fn main() -> ! {
    defmt::info!("tinyg-firmware starting");

    let mut board = NullBoard {
        motors: [NullPins::default(), NullPins::default(), NullPins::default(), NullPins::default()],
        limits: [NullSwitch, NullSwitch, NullSwitch, NullSwitch],
        pulse_timer: NullTimer::default(),
        aux: NullAux::default(),
    };

    let steps_per_unit = [80.0_f32; MAX_AXES];
    let planner: MotionPlanner<PLANNER_CAPACITY> = MotionPlanner::new([0.0; MAX_AXES], SEGMENT_SECONDS);
    let mut scheduler = Scheduler::new(planner, NoLines, steps_per_unit);

    #[allow(static_mut_refs)]
    let (mut producer, consumer): (StepProducer<'static>, StepConsumer<'static>) = unsafe { STEP_QUEUE.split() };

    let executor_pins = [NullPins::default(), NullPins::default(), NullPins::default(), NullPins::default()];
    let mut executor =
        StepperExecutor::new(executor_pins, NullTimer::default(), consumer, PULSE_WIDTH_US, NullAux::default());

    let axes = axis_configs();
    let homing_cfgs = homing_configs();
    let switches: [(Axis, NullSwitch); MAX_AXES] = Axis::ALL.map(|a| (a, NullSwitch));
    let mut jog_residual = [0.0_f32; MAX_AXES];

    loop {
        // Stands in for the step-rate timer ISR firing every `TICK_PERIOD_US`.
        executor.on_tick(TICK_PERIOD_US);
        if executor.has_underrun() {
            UNDERRUN.store(true, Ordering::Release);
            executor.clear_underrun();
        }

        let dt = SEGMENT_SECONDS;
        let mut jog = PinJog { pins: board.motors(), steps_per_unit, residual: &mut jog_residual, dt };
        let underrun = UnderrunFlag;
        scheduler.dispatch(&axes, &switches, &mut jog, &mut producer, &homing_cfgs, &underrun, dt);
    }
}
