//! Motion controllers
//!
//! - [`roam`]: reactive obstacle and floor-edge avoidance
//! - [`segment`]: closed-loop (distance, turn) circuit follower
//! - [`runner`]: synchronous control loops that own the hardware for one run
//! - [`signals`]: operator stop/resume/reset and per-cycle status

pub mod roam;
pub mod runner;
pub mod segment;
pub mod signals;

pub use roam::{AvoidanceMode, AvoidanceState, RoamController};
pub use runner::{run_circuit, run_distance, run_roam, RoamOutcome, RoamSetup, RunOutcome, SegmentSetup};
pub use segment::{Circuit, PathSegment, SegmentController, SegmentPhase, SegmentRunState};
pub use signals::{control_link, ControlHandle, ControlLink, ControlSignal, ControllerMode, ControllerStatus};
