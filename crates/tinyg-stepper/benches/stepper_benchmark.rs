use criterion::{black_box, criterion_group, criterion_main, Criterion};
use heapless::spsc::Queue;
use tinyg_hal::{AuxOutputs, MotorPins, Timer};
use tinyg_motion::segment::{Segment, STEP_QUEUE_CAPACITY};
use tinyg_stepper::StepperExecutor;

#[derive(Default)]
struct NullPins;
impl MotorPins for NullPins {
    fn set_step(&mut self, _high: bool) {}
    fn set_dir(&mut self, _forward: bool) {}
    fn enable(&mut self, _on: bool) {}
}

#[derive(Default)]
struct NullTimer;
impl Timer for NullTimer {
    fn arm(&mut self, _period_us: u32) {}
    fn stop(&mut self) {}
}

#[derive(Default)]
struct NullAux;
impl AuxOutputs for NullAux {
    fn set_spindle(&mut self, _on: bool, _clockwise: bool) {}
    fn set_coolant_mist(&mut self, _on: bool) {}
    fn set_coolant_flood(&mut self, _on: bool) {}
}

fn benchmark_on_tick(c: &mut Criterion) {
    let mut queue: Queue<Segment, STEP_QUEUE_CAPACITY> = Queue::new();
    let (mut producer, consumer) = queue.split();
    for _ in 0..STEP_QUEUE_CAPACITY - 1 {
        let _ = producer.enqueue(Segment {
            step_deltas: [40, 40, 0, 0],
            duration_us: 5000,
            line_number: 1,
            last_flag: false,
            sync: None,
        });
    }

    let pins = [NullPins, NullPins, NullPins, NullPins];
    let mut exec = StepperExecutor::new(pins, NullTimer, consumer, 2, NullAux::default());

    c.bench_function("stepper_on_tick", |b| {
        b.iter(|| {
            exec.on_tick(black_box(10));
        })
    });
}

criterion_group!(benches, benchmark_on_tick);
criterion_main!(benches);
