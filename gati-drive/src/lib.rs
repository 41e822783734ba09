//! GatiDrive - motion control core for a small differential-drive robot
//!
//! Turns wheel-encoder ticks into distance/heading estimates and uses them to
//! run one of two behaviours:
//!
//! - **Roam**: drive straight, escape contacts and floor edges with scripted
//!   reverse-and-pivot maneuvers, and break out of corners
//! - **Circuit**: follow up to four (distance, turn) segments under
//!   proportional control, pausing on contact until resumed or reset
//!
//! Hardware is reached only through the traits in [`core::hardware`]; a run
//! receives one object implementing all of them.
//!
//! ## Features
//!
//! - `mock` (default): [`sim::SimulatedRobot`] for hardware-free runs and tests

pub mod config;
pub mod control;
pub mod core;
pub mod drive;
pub mod error;
pub mod odometry;
pub mod sensors;

#[cfg(feature = "mock")]
pub mod sim;

// Re-export commonly used types
pub use config::Config;
pub use control::{
    control_link, run_circuit, run_distance, run_roam, Circuit, ControlHandle, ControlLink, PathSegment,
    RoamOutcome, RoamSetup, RunOutcome, SegmentSetup,
};
pub use crate::core::hardware::RobotHardware;
pub use error::{Error, Result};
