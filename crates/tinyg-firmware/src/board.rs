//! Board wiring abstraction: bundles the HAL instances a concrete target
//! provides into the shapes the scheduler and stepper executor expect. No
//! chip PAC is targeted here; a real board crate implements `Board` over
//! its own GPIO/timer types the way `driver-drv8825`/`driver-endstop`
//! implement the mcu-drivers traits over theirs.

use tinyg_hal::{AuxOutputs, LimitSwitch, MotorPins, Timer};
use tinyg_motion::MAX_AXES;

/// Everything the pipeline needs from the physical board: four motor
/// channels, four limit switches (one per axis), a shared pulse-off timer,
/// and the spindle/coolant aux outputs.
pub trait Board {
    type Motor: MotorPins;
    type Limit: LimitSwitch;
    type PulseTimer: Timer;
    type Aux: AuxOutputs;

    fn motors(&mut self) -> &mut [Self::Motor; MAX_AXES];
    fn limits(&mut self) -> &mut [Self::Limit; MAX_AXES];
    fn pulse_timer(&mut self) -> &mut Self::PulseTimer;
    fn aux(&mut self) -> &mut Self::Aux;
}
