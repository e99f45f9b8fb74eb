use heapless::spsc::Queue;
use std::collections::VecDeque;
use tinyg_gcode::{CanonicalMove, GResult};
use tinyg_hal::{Axis, LimitEnd, LimitSwitch};
use tinyg_motion::segment::{Segment, STEP_QUEUE_CAPACITY};
use tinyg_motion::{AxisConfig, HomingConfig, MotionPlanner, MAX_AXES};
use tinyg_scheduler::{AxisJog, LineSource, MachineState, Scheduler};

struct MockSwitch {
    triggered: bool,
}
impl LimitSwitch for MockSwitch {
    fn read_limit(&self, _end: LimitEnd) -> bool {
        self.triggered
    }
}

struct MockJog;
impl AxisJog for MockJog {
    fn jog(&mut self, _axis: Axis, _velocity: f32) {}
    fn stop(&mut self, _axis: Axis) {}
    fn zero_position(&mut self, _axis: Axis) {}
}

struct MockUnderrun {
    tripped: bool,
}
impl tinyg_scheduler::scheduler::UnderrunSource for MockUnderrun {
    fn has_underrun(&self) -> bool {
        self.tripped
    }
    fn clear_underrun(&self) {}
}

struct NoLines;
impl LineSource for NoLines {
    fn next_line(&mut self) -> Option<heapless::String<128>> {
        None
    }
}

struct OneLine(Option<heapless::String<128>>);
impl LineSource for OneLine {
    fn next_line(&mut self) -> Option<heapless::String<128>> {
        self.0.take()
    }
}

struct Lines(VecDeque<heapless::String<128>>);
impl LineSource for Lines {
    fn next_line(&mut self) -> Option<heapless::String<128>> {
        self.0.pop_front()
    }
}

fn axes() -> [AxisConfig; MAX_AXES] {
    let mut a = [AxisConfig::default(); MAX_AXES];
    for axis in a.iter_mut() {
        axis.velocity_max = 300.0;
        axis.feedrate_max = 300.0;
        axis.jerk_max = 2_000_000.0;
        axis.junction_deviation = 0.05;
    }
    a
}

fn homing_configs() -> [(Axis, HomingConfig); MAX_AXES] {
    Axis::ALL.map(|a| (a, HomingConfig::default()))
}

#[test]
fn limit_trip_outside_homing_raises_alarm_and_outranks_reading() -> GResult<()> {
    let axes = axes();
    let planner: MotionPlanner<8> = MotionPlanner::new([0.0; MAX_AXES], 0.005);
    let mut scheduler = Scheduler::new(planner, NoLines, [80.0; MAX_AXES]);

    let switches: [(Axis, MockSwitch); MAX_AXES] = Axis::ALL.map(|a| (a, MockSwitch { triggered: a == Axis::X }));
    let mut jog = MockJog;
    let underrun = MockUnderrun { tripped: false };
    let mut queue: Queue<Segment, STEP_QUEUE_CAPACITY> = Queue::new();
    let (mut producer, _consumer) = queue.split();

    let outcome = scheduler.dispatch(&axes, &switches, &mut jog, &mut producer, &homing_configs(), &underrun, 0.005);
    assert_eq!(outcome, tinyg_scheduler::TaskOutcome::Ok);
    assert_eq!(scheduler.state, MachineState::Alarm);
    Ok(())
}

#[test]
fn executor_underrun_raises_alarm() {
    let axes = axes();
    let planner: MotionPlanner<8> = MotionPlanner::new([0.0; MAX_AXES], 0.005);
    let mut scheduler = Scheduler::new(planner, NoLines, [80.0; MAX_AXES]);

    let switches: [(Axis, MockSwitch); MAX_AXES] = Axis::ALL.map(|a| (a, MockSwitch { triggered: false }));
    let mut jog = MockJog;
    let underrun = MockUnderrun { tripped: true };
    let mut queue: Queue<Segment, STEP_QUEUE_CAPACITY> = Queue::new();
    let (mut producer, _consumer) = queue.split();

    scheduler.dispatch(&axes, &switches, &mut jog, &mut producer, &homing_configs(), &underrun, 0.005);
    assert_eq!(scheduler.state, MachineState::Alarm);
}

#[test]
fn a_queued_line_is_parsed_into_the_planner_when_room_is_available() {
    let axes = axes();
    let planner: MotionPlanner<8> = MotionPlanner::new([0.0; MAX_AXES], 0.005);
    let line: heapless::String<128> = "G1 X10 F600".try_into().unwrap();
    let mut scheduler = Scheduler::new(planner, OneLine(Some(line)), [80.0; MAX_AXES]);

    let switches: [(Axis, MockSwitch); MAX_AXES] = Axis::ALL.map(|a| (a, MockSwitch { triggered: false }));
    let mut jog = MockJog;
    let underrun = MockUnderrun { tripped: false };
    let mut queue: Queue<Segment, STEP_QUEUE_CAPACITY> = Queue::new();
    let (mut producer, _consumer) = queue.split();

    scheduler.dispatch(&axes, &switches, &mut jog, &mut producer, &homing_configs(), &underrun, 0.005);
    assert_eq!(scheduler.planner.len(), 1);
}

#[test]
fn an_arc_with_more_chords_than_planner_room_is_not_dropped() {
    let axes = axes();
    let planner: MotionPlanner<4> = MotionPlanner::new([0.0; MAX_AXES], 0.005);
    let line: heapless::String<128> = "G21 G90 G17 G3 I5 J0 F300".try_into().unwrap();
    let mut scheduler = Scheduler::new(planner, Lines(VecDeque::from([line])), [80.0; MAX_AXES]);
    // A handful of coarse chords is plenty to outrun a 4-slot ring without
    // needing a near-512-chord line just to exercise the backpressure path.
    scheduler.canonical.arc_params.segment_len = 0.5;

    let switches: [(Axis, MockSwitch); MAX_AXES] = Axis::ALL.map(|a| (a, MockSwitch { triggered: false }));
    let mut jog = MockJog;
    let underrun = MockUnderrun { tripped: false };
    let mut queue: Queue<Segment, STEP_QUEUE_CAPACITY> = Queue::new();
    let (mut producer, mut consumer) = queue.split();

    // First tick: the line parses into far more chords than 4 planner slots
    // can hold, so some must still be waiting once the ring first fills.
    scheduler.dispatch(&axes, &switches, &mut jog, &mut producer, &homing_configs(), &underrun, 0.005);
    while consumer.dequeue().is_some() {}
    let remaining_after_first_tick = scheduler.pending_emissions_remaining();
    assert!(remaining_after_first_tick > 0, "expected the arc to overflow a 4-slot ring on the first pass");

    // Draining segments lets the segment runtime retire planner slots as
    // each chord finishes, which frees room for the rest of the buffered
    // chords over many further ticks (spec §8.5 "no move is lost").
    for _ in 0..20_000 {
        scheduler.dispatch(&axes, &switches, &mut jog, &mut producer, &homing_configs(), &underrun, 0.005);
        while consumer.dequeue().is_some() {}
        if scheduler.pending_emissions_remaining() == 0 && scheduler.planner.is_empty() {
            break;
        }
    }

    assert_eq!(scheduler.pending_emissions_remaining(), 0, "chords were left stranded in the pending buffer");
    assert_eq!(scheduler.canonical.modal.work_position[0], 0.0);
    assert_eq!(scheduler.canonical.modal.work_position[1], 0.0);
}

#[test]
fn feedhold_decelerates_then_resume_replans_from_the_stop_position() {
    let axes = axes();
    let mut planner: MotionPlanner<8> = MotionPlanner::new([0.0; MAX_AXES], 0.005);
    let mv = CanonicalMove::feed([100.0, 0.0, 0.0, 0.0], 3000.0, 1);
    planner.enqueue(&mv, &axes, &[80.0; MAX_AXES]).unwrap();
    let mut scheduler = Scheduler::new(planner, NoLines, [80.0; MAX_AXES]);

    let switches: [(Axis, MockSwitch); MAX_AXES] = Axis::ALL.map(|a| (a, MockSwitch { triggered: false }));
    let mut jog = MockJog;
    let underrun = MockUnderrun { tripped: false };
    let mut queue: Queue<Segment, STEP_QUEUE_CAPACITY> = Queue::new();
    let (mut producer, mut consumer) = queue.split();

    // Let the head move actually start running before holding.
    for _ in 0..5 {
        scheduler.dispatch(&axes, &switches, &mut jog, &mut producer, &homing_configs(), &underrun, 0.005);
        while consumer.dequeue().is_some() {}
    }

    scheduler.request_feedhold();
    assert_eq!(scheduler.state, MachineState::Hold);
    assert!(!scheduler.request_resume(), "resume must wait for the hold to settle");

    let mut resumed = false;
    for _ in 0..100_000 {
        scheduler.dispatch(&axes, &switches, &mut jog, &mut producer, &homing_configs(), &underrun, 0.005);
        while consumer.dequeue().is_some() {}
        if scheduler.request_resume() {
            resumed = true;
            break;
        }
    }

    assert!(resumed, "feedhold never settled");
    assert_eq!(scheduler.state, MachineState::Reset);
    assert!(scheduler.planner.is_empty());
    let stop = scheduler.planner.last_target();
    assert!(stop[0] > 0.0 && stop[0] < 100.0, "expected a partial, truncated stop, got {stop:?}");
}
