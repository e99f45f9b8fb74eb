//! The G-code modal state machine (spec §3 "G-code Model").

use tinyg_hal::Axis;

pub const NUM_AXES: usize = 4;
pub const NUM_COORD_SYSTEMS: usize = 6; // G54..G59

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Units {
    Millimeters,
    Inches,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Plane {
    Xy,
    Xz,
    Yz,
}

impl Plane {
    /// The axis perpendicular to the plane, used by arc decomposition to
    /// resolve which pair of axis words (I/J/K, or the third coordinate)
    /// describe the arc.
    pub fn normal_axis(self) -> Axis {
        match self {
            Plane::Xy => Axis::Z,
            Plane::Xz => Axis::Y,
            Plane::Yz => Axis::X,
        }
    }

    pub fn in_plane_axes(self) -> (Axis, Axis) {
        match self {
            Plane::Xy => (Axis::X, Axis::Y),
            Plane::Xz => (Axis::X, Axis::Z),
            Plane::Yz => (Axis::Y, Axis::Z),
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum DistanceMode {
    Absolute,
    Incremental,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum FeedRateMode {
    UnitsPerMinute,
    InverseTime,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum PathControlMode {
    ExactStop,
    ExactPath,
    Continuous,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum MotionMode {
    Seek,   // G0
    Feed,   // G1
    ArcCw,  // G2
    ArcCcw, // G3
    Cancelled, // G80
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SpindleState {
    Off,
    Clockwise,
    CounterClockwise,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct CoolantState {
    pub mist: bool,
    pub flood: bool,
}

/// One of the nine RS-274/NGC modal groups that bound which words may
/// coexist in a single block (spec §4.2). A block containing two words from
/// the same group fails with `ModalGroupViolation`.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ModalGroup {
    Motion,
    Plane,
    Units,
    Distance,
    FeedRateMode,
    CoordinateSystem,
    Spindle,
    Tool,
    Stopping,
    NonModal,
}

/// The full modal state carried between blocks. Owned privately by the
/// canonical machine; parsing a block advances this only on success (spec
/// §3 invariant).
#[derive(Debug, Clone, Copy)]
pub struct ModalState {
    pub units: Units,
    pub plane: Plane,
    pub distance_mode: DistanceMode,
    pub feed_rate_mode: FeedRateMode,
    pub path_control: PathControlMode,
    pub motion_mode: MotionMode,
    pub spindle: SpindleState,
    pub coolant: CoolantState,
    pub active_coord_system: usize, // 0..NUM_COORD_SYSTEMS, i.e. G54..G59
    pub coord_offsets: [[f32; NUM_AXES]; NUM_COORD_SYSTEMS],
    pub origin_offsets: [f32; NUM_AXES], // G92
    pub work_position: [f32; NUM_AXES],
    pub feed_rate: f32,
    pub spindle_speed: f32,
    pub tool: u32,
    pub line_number: u32,
    /// G53: apply machine coordinates for exactly the block it appears in.
    pub one_shot_machine_coords: bool,
}

impl Default for ModalState {
    fn default() -> Self {
        Self {
            units: Units::Millimeters,
            plane: Plane::Xy,
            distance_mode: DistanceMode::Absolute,
            feed_rate_mode: FeedRateMode::UnitsPerMinute,
            path_control: PathControlMode::ExactPath,
            motion_mode: MotionMode::Cancelled,
            spindle: SpindleState::Off,
            coolant: CoolantState::default(),
            active_coord_system: 0,
            coord_offsets: [[0.0; NUM_AXES]; NUM_COORD_SYSTEMS],
            origin_offsets: [0.0; NUM_AXES],
            work_position: [0.0; NUM_AXES],
            feed_rate: 0.0,
            spindle_speed: 0.0,
            tool: 0,
            line_number: 0,
            one_shot_machine_coords: false,
        }
    }
}

impl ModalState {
    /// Absolute machine-coordinate target for `value` specified on `axis`,
    /// honoring distance mode, active coordinate-system offset and G92
    /// origin offsets (spec §4.2 "Coordinate math").
    ///
    /// `value` must already be in millimeters/degrees (inches are scaled by
    /// the parser before reaching here, per spec §4.2).
    pub fn resolve_target(&self, axis: Axis, value: f32) -> f32 {
        let i = axis.index();
        if self.one_shot_machine_coords {
            return value;
        }
        let base = match self.distance_mode {
            DistanceMode::Absolute => {
                self.coord_offsets[self.active_coord_system][i] + self.origin_offsets[i] + value
            }
            DistanceMode::Incremental => self.work_position[i] + value,
        };
        base
    }
}
