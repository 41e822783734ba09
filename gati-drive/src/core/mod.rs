//! Core abstractions shared by both controllers.
//!
//! - [`hardware`]: Traits the robot (or the simulator) implements
//! - [`types`]: Encoder deltas, pose increments, sensor frames

pub mod hardware;
pub mod types;
