//! Status report data (spec §6 "Status report"). Only the shape is in
//! scope; periodic emission/formatting is a host-side feature left
//! unimplemented here.

use tinyg_gcode::Units;
use tinyg_motion::MAX_AXES;
use tinyg_scheduler::MachineState;

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct StatusReport {
    pub line_number: u32,
    pub work_position: [f32; MAX_AXES],
    pub velocity: f32,
    pub units: Units,
    pub state: MachineState,
}

impl StatusReport {
    pub fn new(units: Units) -> Self {
        Self {
            line_number: 0,
            work_position: [0.0; MAX_AXES],
            velocity: 0.0,
            units,
            state: MachineState::Reset,
        }
    }
}
