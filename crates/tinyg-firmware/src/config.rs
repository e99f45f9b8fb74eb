//! The configuration surface: short `key=value` tokens that reach the core
//! pipeline only through setter hooks (spec §4.8/§6 "Configuration
//! surface"). Parsing/storage/persistence are explicitly out of scope; this
//! module is the narrow interface the core allows the (unbuilt) config
//! layer to call into.

use tinyg_motion::{AxisConfig, Microsteps, MotorConfig, Polarity, MAX_AXES};

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum AxisParam {
    VelocityMax,
    FeedrateMax,
    JerkMax,
    JunctionDeviation,
    TravelMax,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum MotorParam {
    StepAngle,
    TravelPerRev,
    Microsteps,
    Polarity,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum GlobalParam {
    JunctionAcceleration,
    MinSegmentTime,
    MinLineLength,
    ArcSegmentLength,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ParamId {
    Axis(usize, AxisParam),
    Motor(usize, MotorParam),
    Global(GlobalParam),
}

/// Parse a short token such as `xvm`, `1sa`, or `ja` into a `ParamId`.
/// Axis tokens are `<axis-letter><2-letter-code>`; motor tokens are
/// `<motor-number><2-letter-code>`; global tokens have no prefix.
pub fn parse_token(token: &str) -> Option<ParamId> {
    let mut chars = token.chars();
    let first = chars.next()?;

    if let Some(axis) = axis_index(first) {
        return match &token[1..] {
            "vm" => Some(ParamId::Axis(axis, AxisParam::VelocityMax)),
            "fr" => Some(ParamId::Axis(axis, AxisParam::FeedrateMax)),
            "jm" => Some(ParamId::Axis(axis, AxisParam::JerkMax)),
            "jd" => Some(ParamId::Axis(axis, AxisParam::JunctionDeviation)),
            "tm" => Some(ParamId::Axis(axis, AxisParam::TravelMax)),
            _ => None,
        };
    }

    if first.is_ascii_digit() {
        let motor = first.to_digit(10)? as usize;
        if motor == 0 || motor > MAX_AXES {
            return None;
        }
        return match &token[1..] {
            "sa" => Some(ParamId::Motor(motor - 1, MotorParam::StepAngle)),
            "tr" => Some(ParamId::Motor(motor - 1, MotorParam::TravelPerRev)),
            "mi" => Some(ParamId::Motor(motor - 1, MotorParam::Microsteps)),
            "po" => Some(ParamId::Motor(motor - 1, MotorParam::Polarity)),
            _ => None,
        };
    }

    match token {
        "ja" => Some(ParamId::Global(GlobalParam::JunctionAcceleration)),
        "mt" => Some(ParamId::Global(GlobalParam::MinSegmentTime)),
        "ml" => Some(ParamId::Global(GlobalParam::MinLineLength)),
        "ma" => Some(ParamId::Global(GlobalParam::ArcSegmentLength)),
        _ => None,
    }
}

fn axis_index(letter: char) -> Option<usize> {
    match letter.to_ascii_lowercase() {
        'x' => Some(0),
        'y' => Some(1),
        'z' => Some(2),
        'a' => Some(3),
        _ => None,
    }
}

#[derive(Debug, Copy, Clone)]
pub struct GlobalParams {
    pub junction_acceleration: f32,
    pub min_segment_time: f32,
    pub min_line_length: f32,
    pub arc_segment_length: f32,
}

impl Default for GlobalParams {
    fn default() -> Self {
        Self {
            junction_acceleration: 0.0,
            min_segment_time: 0.005,
            min_line_length: 0.01,
            arc_segment_length: 0.03,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ConfigError {
    UnknownToken,
    AxisOutOfRange,
    InvalidValue,
}

/// Apply a `key=value` setting. Re-derives `steps_per_unit` atomically via
/// `MotorConfig::rederive` when a motor geometry field changes (spec §3
/// "Motor" invariant), and bounds-checks values that would otherwise allow
/// the planner to compute nonsensical limits.
pub fn apply_float(
    axes: &mut [AxisConfig; MAX_AXES],
    motors: &mut [MotorConfig; MAX_AXES],
    global: &mut GlobalParams,
    id: ParamId,
    value: f32,
) -> Result<(), ConfigError> {
    if value < 0.0 || !value.is_finite() {
        return Err(ConfigError::InvalidValue);
    }
    match id {
        ParamId::Axis(i, param) => {
            let axis = axes.get_mut(i).ok_or(ConfigError::AxisOutOfRange)?;
            match param {
                AxisParam::VelocityMax => axis.velocity_max = value,
                AxisParam::FeedrateMax => axis.feedrate_max = value,
                AxisParam::JerkMax => axis.jerk_max = value,
                AxisParam::JunctionDeviation => axis.junction_deviation = value,
                AxisParam::TravelMax => axis.travel_max = value,
            }
            Ok(())
        }
        ParamId::Motor(i, param) => {
            let motor = motors.get_mut(i).ok_or(ConfigError::AxisOutOfRange)?;
            match param {
                MotorParam::StepAngle => motor.set_step_angle(value),
                MotorParam::TravelPerRev => motor.set_travel_per_rev(value),
                MotorParam::Microsteps | MotorParam::Polarity => return Err(ConfigError::InvalidValue),
            }
            Ok(())
        }
        ParamId::Global(param) => {
            match param {
                GlobalParam::JunctionAcceleration => global.junction_acceleration = value,
                GlobalParam::MinSegmentTime => global.min_segment_time = value,
                GlobalParam::MinLineLength => global.min_line_length = value,
                GlobalParam::ArcSegmentLength => global.arc_segment_length = value,
            }
            Ok(())
        }
    }
}

pub fn apply_microsteps(
    motors: &mut [MotorConfig; MAX_AXES],
    motor_index: usize,
    microsteps: Microsteps,
) -> Result<(), ConfigError> {
    motors.get_mut(motor_index).ok_or(ConfigError::AxisOutOfRange)?.set_microsteps(microsteps);
    Ok(())
}

pub fn apply_polarity(motors: &mut [MotorConfig; MAX_AXES], motor_index: usize, polarity: Polarity) -> Result<(), ConfigError> {
    let motor = motors.get_mut(motor_index).ok_or(ConfigError::AxisOutOfRange)?;
    motor.polarity = polarity;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_axis_motor_and_global_tokens() {
        assert_eq!(parse_token("xvm"), Some(ParamId::Axis(0, AxisParam::VelocityMax)));
        assert_eq!(parse_token("1sa"), Some(ParamId::Motor(0, MotorParam::StepAngle)));
        assert_eq!(parse_token("ja"), Some(ParamId::Global(GlobalParam::JunctionAcceleration)));
        assert_eq!(parse_token("zz"), None);
    }

    #[test]
    fn changing_step_angle_rederives_steps_per_unit() {
        let mut motors = [MotorConfig::new(1.8, 40.0, Microsteps::Full, Polarity::Normal); MAX_AXES];
        let before = motors[0].steps_per_unit();
        apply_float(
            &mut [AxisConfig::default(); MAX_AXES],
            &mut motors,
            &mut GlobalParams::default(),
            ParamId::Motor(0, MotorParam::StepAngle),
            0.9,
        )
        .unwrap();
        assert!((motors[0].steps_per_unit() - before * 2.0).abs() < 1e-3);
    }
}
