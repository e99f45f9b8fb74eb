//! Combined machine state reported to the host (spec §4.7 "Status report").

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum MachineState {
    Reset,
    Cycle,
    Run,
    Hold,
    Homing,
    Jog,
    Alarm,
    End,
}

impl Default for MachineState {
    fn default() -> Self {
        MachineState::Reset
    }
}
