//! The canonical status-code set (spec §6), shared by the parser, the
//! canonical machine and everything downstream that needs to report the
//! same vocabulary of outcomes back up through the cooperative scheduler.

/// Outcome of a call into the parser, canonical machine, planner or
/// scheduler task. Mirrors the flat status-code enumeration TinyG's C
/// implementation used for every layer, expressed here as a single
/// `#[non_exhaustive]`-free enum so a `match` stays exhaustive as the
/// pipeline grows.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum StatusCode {
    /// Call succeeded and did useful work.
    Ok,
    /// Call would have blocked; caller should stop and retry next
    /// scheduler iteration (spec §4.1 cooperative backpressure).
    Eagain,
    /// Call had nothing to do.
    Noop,
    /// A multi-step operation (e.g. homing) finished.
    Complete,
    /// A full line was read from the input stream.
    Eol,
    /// The input stream is exhausted.
    Eof,
    /// The host requested the controller quit/reset.
    Quit,
    UnrecognizedCommand,
    ExpectedCommandLetter,
    UnsupportedStatement,
    BadNumberFormat,
    FloatingPointError,
    MotionControlError,
    ArcSpecificationError,
    ZeroLengthMove,
    MaxFeedRateExceeded,
    MaxSeekRateExceeded,
    MaxTravelExceeded,
    MaxSpindleSpeedExceeded,
    BufferFull,
    BufferEmpty,
    /// More than one word from the same modal group appeared in a block.
    ModalGroupViolation,
}

impl StatusCode {
    /// Input errors (spec §7): the block is rejected and parsing state must
    /// not advance. Flow codes (`Eagain`/`Noop`) and machine alarms are not
    /// input errors.
    pub fn is_input_error(self) -> bool {
        matches!(
            self,
            StatusCode::UnrecognizedCommand
                | StatusCode::ExpectedCommandLetter
                | StatusCode::UnsupportedStatement
                | StatusCode::BadNumberFormat
                | StatusCode::FloatingPointError
                | StatusCode::MotionControlError
                | StatusCode::ArcSpecificationError
                | StatusCode::MaxFeedRateExceeded
                | StatusCode::MaxSeekRateExceeded
                | StatusCode::MaxTravelExceeded
                | StatusCode::MaxSpindleSpeedExceeded
                | StatusCode::ModalGroupViolation
        )
    }
}

pub type GResult<T> = Result<T, StatusCode>;
