//! # G-code Parser and Canonical Machine
//!
//! Tokenizes normalized RS-274/NGC blocks, enforces modal-group exclusivity,
//! tracks modal state, and translates each block into the canonical
//! operations the motion planner consumes — including arc decomposition
//! into short linear chords.
//!
//! This mirrors the teacher workspace's `motion` crate convention of being
//! usable both `no_std` on the firmware and with `std` in host-side tests
//! and the `tinyg-sim` harness.

#![cfg_attr(not(feature = "std"), no_std)]

pub mod canonical;
pub mod modal;
pub mod ops;
pub mod parser;
pub mod status;

pub use canonical::{CanonicalMachine, Emission, MAX_EMISSIONS};
pub use modal::{ModalState, Plane, Units};
pub use ops::{CanonicalMove, ModalOp, MoveType, SyncCommand};
pub use status::{GResult, StatusCode};
