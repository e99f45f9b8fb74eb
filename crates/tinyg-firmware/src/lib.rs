//! Board wiring, configuration surface, and status-report shape for the
//! TinyG-style motion pipeline. The pipeline itself (`tinyg-gcode`,
//! `tinyg-motion`, `tinyg-stepper`, `tinyg-scheduler`) is target-agnostic;
//! this crate is the one place a concrete board plugs in.

#![no_std]

pub mod board;
pub mod config;
pub mod status_report;

pub use board::Board;
pub use config::{apply_float, apply_microsteps, apply_polarity, parse_token, AxisParam, ConfigError, GlobalParam, GlobalParams, MotorParam, ParamId};
pub use status_report::StatusReport;
