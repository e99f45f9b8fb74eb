//! Canonical operations emitted by the canonical machine (spec §3 "Canonical
//! Move", §4.2 "Canonical operations emitted").

use crate::modal::{DistanceMode, FeedRateMode, PathControlMode, Plane, Units};

/// The kind of motion a `CanonicalMove` represents.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum MoveType {
    /// G0: traverse at the machine's seek rate, no feed-rate limiting.
    Seek,
    /// G1, and each chord of a decomposed G2/G3 arc.
    Feed,
    /// G4: a commanded idle period.
    Dwell,
    /// A non-motion event (spindle/coolant/tool change) that must execute
    /// in queue order relative to motion, never concurrently with it.
    CommandSync,
}

/// A synchronous command riding the move queue alongside motion (spec
/// §4.2: "queued as command-sync records so they execute in motion order").
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum SyncCommand {
    SetSpindle { on: bool, clockwise: bool, speed: f32 },
    SetCoolantMist(bool),
    SetCoolantFlood(bool),
    SetTool(u32),
}

/// A unit of work passed from the canonical machine to the planner (spec
/// §3). `target` is always expressed in absolute machine coordinates,
/// millimeters/degrees, floating point.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct CanonicalMove {
    pub target: [f32; 4],
    pub feed_rate: f32,
    pub move_type: MoveType,
    pub line_number: u32,
    pub dwell_seconds: f32,
    pub sync: Option<SyncCommand>,
}

impl CanonicalMove {
    pub fn seek(target: [f32; 4], line_number: u32) -> Self {
        Self {
            target,
            feed_rate: 0.0,
            move_type: MoveType::Seek,
            line_number,
            dwell_seconds: 0.0,
            sync: None,
        }
    }

    pub fn feed(target: [f32; 4], feed_rate: f32, line_number: u32) -> Self {
        Self {
            target,
            feed_rate,
            move_type: MoveType::Feed,
            line_number,
            dwell_seconds: 0.0,
            sync: None,
        }
    }

    pub fn dwell(seconds: f32, target: [f32; 4], line_number: u32) -> Self {
        Self {
            target,
            feed_rate: 0.0,
            move_type: MoveType::Dwell,
            line_number,
            dwell_seconds: seconds,
            sync: None,
        }
    }

    pub fn command_sync(cmd: SyncCommand, target: [f32; 4], line_number: u32) -> Self {
        Self {
            target,
            feed_rate: 0.0,
            move_type: MoveType::CommandSync,
            line_number,
            dwell_seconds: 0.0,
            sync: Some(cmd),
        }
    }
}

/// Non-motion canonical operations that mutate modal state immediately
/// (they do not ride the move queue; spec §4.2 lists them separately from
/// the motion/command-sync ops).
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum ModalOp {
    SetUnits(Units),
    SetPlane(Plane),
    SetDistanceMode(DistanceMode),
    SetFeedRateMode(FeedRateMode),
    SetCoordinateSystem(usize),
    SetOriginOffsets([f32; 4]),
    SetPathControl(PathControlMode),
    ProgramStop,
    ProgramEnd,
}
