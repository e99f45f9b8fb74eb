//! Axis and motor configuration (spec §3 "Axis", "Motor").

/// Operating mode of a logical axis.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum AxisMode {
    Disabled,
    Standard,
    Inhibited,
    RadiusMode,
    SlavedTo(tinyg_hal::Axis),
}

/// Homing parameters for one axis. Homing sequencing itself lives in
/// `tinyg-scheduler` (spec §4.1 "Homing cycle tick"); these are the
/// per-axis numbers that sequence consults.
#[derive(Debug, Copy, Clone)]
pub struct HomingConfig {
    pub search_velocity: f32,
    pub latch_velocity: f32,
    pub zero_backoff: f32,
}

impl Default for HomingConfig {
    fn default() -> Self {
        Self {
            search_velocity: 500.0,
            latch_velocity: 25.0,
            zero_backoff: 2.0,
        }
    }
}

/// Per-axis motion limits and the authoritative machine position.
///
/// Invariant (spec §3): `machine_position_steps` is the post-executor
/// position and is modified only by the stepper executor's completion path;
/// the planner and segment runtime only ever read it.
#[derive(Debug, Copy, Clone)]
pub struct AxisConfig {
    pub mode: AxisMode,
    pub velocity_max: f32,   // units/sec
    pub feedrate_max: f32,   // units/sec
    pub jerk_max: f32,       // units/sec^3
    pub junction_deviation: f32,
    pub travel_max: f32,
    pub homing: HomingConfig,
    pub machine_position_steps: i32,
}

impl Default for AxisConfig {
    fn default() -> Self {
        Self {
            mode: AxisMode::Standard,
            velocity_max: 0.0,
            feedrate_max: 0.0,
            jerk_max: 0.0,
            junction_deviation: 0.05,
            travel_max: 0.0,
            homing: HomingConfig::default(),
            machine_position_steps: 0,
        }
    }
}

impl AxisConfig {
    /// The maximum acceleration derivable from this axis's jerk limit over
    /// the segment time budget (spec §4.3 junction velocity formula).
    pub fn accel_max(&self, segment_seconds: f32) -> f32 {
        self.jerk_max * segment_seconds
    }
}

/// Microstepping resolution, matching the `driver-drv8825`-style output
/// pin combinations the HAL sets on a microstep select.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Microsteps {
    Full = 1,
    Half = 2,
    Quarter = 4,
    Eighth = 8,
}

impl Microsteps {
    pub fn factor(self) -> u32 {
        self as u32
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Polarity {
    Normal,
    Inverted,
}

/// A physical motor mapped 1:1 onto an axis in this design (spec §3 allows
/// 1:N but the core pipeline's per-axis accumulator only needs the merged
/// `steps_per_unit`; multi-motor axes sum their contributions upstream of
/// this struct, which is out of the core pipeline's scope).
#[derive(Debug, Copy, Clone)]
pub struct MotorConfig {
    pub step_angle_deg: f32,
    pub travel_per_rev: f32,
    pub microsteps: Microsteps,
    pub polarity: Polarity,
    pub idle_power_down: bool,
    steps_per_unit: f32,
}

impl MotorConfig {
    pub fn new(step_angle_deg: f32, travel_per_rev: f32, microsteps: Microsteps, polarity: Polarity) -> Self {
        let mut m = Self {
            step_angle_deg,
            travel_per_rev,
            microsteps,
            polarity,
            idle_power_down: false,
            steps_per_unit: 0.0,
        };
        m.rederive();
        m
    }

    pub fn steps_per_unit(&self) -> f32 {
        self.steps_per_unit
    }

    /// Recompute `steps_per_unit` from step angle, travel-per-revolution and
    /// microsteps. Must be called atomically with respect to the planner
    /// whenever any of the three inputs changes (spec §3 invariant) — in
    /// this design that means calling it only from the configuration
    /// setter-hook dispatch (`tinyg-firmware::config`), never while a move
    /// referencing the old value is still queued.
    pub fn rederive(&mut self) {
        let steps_per_rev = 360.0 / self.step_angle_deg * self.microsteps.factor() as f32;
        self.steps_per_unit = steps_per_rev / self.travel_per_rev;
    }

    pub fn set_step_angle(&mut self, deg: f32) {
        self.step_angle_deg = deg;
        self.rederive();
    }

    pub fn set_travel_per_rev(&mut self, travel: f32) {
        self.travel_per_rev = travel;
        self.rederive();
    }

    pub fn set_microsteps(&mut self, microsteps: Microsteps) {
        self.microsteps = microsteps;
        self.rederive();
    }
}
