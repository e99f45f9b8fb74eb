//! Error type for the motion planning crate (grounded on the teacher's
//! `motion::errors::PlannerError`, widened to the moves this design adds).

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum PlannerError {
    /// The move queue is full; caller should propagate `EAGAIN` (spec §4.3
    /// "Queue contract").
    QueueFull,
    /// The requested move has zero length.
    ZeroLengthMove,
    /// The step-queue producer rejected a segment (it was full — should not
    /// happen if the bounded-latency invariant holds, spec §8).
    StepQueueFull,
}
