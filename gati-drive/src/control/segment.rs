//! Segment path controller
//!
//! Runs an operator circuit of up to [`MAX_SEGMENTS`] (distance, turn) legs.
//! Each segment drives straight under proportional distance braking and
//! heading hold, then spins in place to the segment's turn angle. Contact on
//! either switch pauses the run until the operator resumes or resets it.
//!
//! ```text
//! Countdown ─► Driving{Straight} ─► Driving{Turn} ─► SegmentDone ─► Driving{Straight} (next)
//!                   │  contact            │                │
//!                   └──► PausedOnObstacle ◄┘                └─► Completed (last segment)
//!
//! any non-terminal state ── stop / reset ──► Aborted
//! ```

use crate::config::{ControlParameters, RobotGeometry, SegmentConfig};
use crate::control::signals::{ControlSignal, ControllerMode, ControllerStatus};
use crate::core::types::{AccumulatedPose, ContactSide, PoseIncrement, SensorSnapshot};
use crate::drive::{cm_s_to_motor_units, WheelCommand};
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// Largest number of legs in a circuit
pub const MAX_SEGMENTS: usize = 4;

/// Longest distance the operator can enter for one leg (cm)
pub const MAX_SEGMENT_DISTANCE_CM: f32 = 9999.0;

/// One leg of an operator route
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct PathSegment {
    /// Straight-line distance (cm)
    pub distance_cm: f32,
    /// Turn after the straight leg (deg, positive = CCW)
    #[serde(default)]
    pub turn_deg: f32,
}

impl PathSegment {
    pub fn new(distance_cm: f32, turn_deg: f32) -> Self {
        Self {
            distance_cm,
            turn_deg,
        }
    }

    /// Leg with no turn
    pub fn straight(distance_cm: f32) -> Self {
        Self::new(distance_cm, 0.0)
    }
}

/// Validated, immutable sequence of segments
#[derive(Debug, Clone, PartialEq)]
pub struct Circuit {
    segments: Vec<PathSegment>,
}

impl Circuit {
    pub fn new(segments: Vec<PathSegment>) -> Result<Self> {
        if segments.is_empty() {
            return Err(Error::InvalidCircuit("no segments".into()));
        }
        if segments.len() > MAX_SEGMENTS {
            return Err(Error::InvalidCircuit(format!(
                "{} segments, at most {} allowed",
                segments.len(),
                MAX_SEGMENTS
            )));
        }
        for (i, seg) in segments.iter().enumerate() {
            if !(seg.distance_cm.is_finite()
                && (0.0..=MAX_SEGMENT_DISTANCE_CM).contains(&seg.distance_cm))
            {
                return Err(Error::InvalidCircuit(format!(
                    "segment {} distance {} outside 0..={}cm",
                    i, seg.distance_cm, MAX_SEGMENT_DISTANCE_CM
                )));
            }
            if !seg.turn_deg.is_finite() {
                return Err(Error::InvalidCircuit(format!(
                    "segment {} turn angle is not finite",
                    i
                )));
            }
        }
        Ok(Self { segments })
    }

    /// One straight leg, used by "drive N cm"
    pub fn single(distance_cm: f32) -> Result<Self> {
        Self::new(vec![PathSegment::straight(distance_cm)])
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }
}

/// Part of a segment being driven
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Leg {
    Straight,
    Turn,
}

/// Segment run state with per-state data
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentRunState {
    /// Safety delay before any motion
    Countdown,
    Driving { leg: Leg },
    /// Motors held at zero after a contact
    PausedOnObstacle { side: ContactSide, leg: Leg },
    /// Current segment finished; the next step advances
    SegmentDone,
    /// Every segment finished
    Completed,
    /// Stopped or reset by the operator, progress discarded
    Aborted,
}

/// Flat view of [`SegmentRunState`] for status and logging
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentPhase {
    Countdown,
    Driving,
    PausedOnObstacle,
    SegmentDone,
    Completed,
    Aborted,
}

impl SegmentRunState {
    pub fn phase(&self) -> SegmentPhase {
        match self {
            SegmentRunState::Countdown => SegmentPhase::Countdown,
            SegmentRunState::Driving { .. } => SegmentPhase::Driving,
            SegmentRunState::PausedOnObstacle { .. } => SegmentPhase::PausedOnObstacle,
            SegmentRunState::SegmentDone => SegmentPhase::SegmentDone,
            SegmentRunState::Completed => SegmentPhase::Completed,
            SegmentRunState::Aborted => SegmentPhase::Aborted,
        }
    }

    /// True once the run can make no further progress
    pub fn is_terminal(&self) -> bool {
        matches!(self, SegmentRunState::Completed | SegmentRunState::Aborted)
    }
}

/// Proportional circuit follower
#[derive(Debug)]
pub struct SegmentController {
    params: ControlParameters,
    geometry: RobotGeometry,
    turn_tolerance_deg: f32,
    circuit: Circuit,

    state: SegmentRunState,
    index: usize,
    /// Odometry since the start of the current segment
    pose: AccumulatedPose,
    commanded_speed_cm_s: f32,
    last_contact: Option<ContactSide>,

    /// Last debug log time (for throttling)
    last_log: Option<Instant>,
}

impl SegmentController {
    pub fn new(
        params: ControlParameters,
        geometry: RobotGeometry,
        config: &SegmentConfig,
        circuit: Circuit,
    ) -> Self {
        Self {
            params,
            geometry,
            turn_tolerance_deg: config.turn_tolerance_deg,
            circuit,
            state: SegmentRunState::Countdown,
            index: 0,
            pose: AccumulatedPose::default(),
            commanded_speed_cm_s: 0.0,
            last_contact: None,
            last_log: None,
        }
    }

    pub fn state(&self) -> SegmentRunState {
        self.state
    }

    pub fn phase(&self) -> SegmentPhase {
        self.state.phase()
    }

    pub fn segment_index(&self) -> usize {
        self.index
    }

    pub fn pose(&self) -> AccumulatedPose {
        self.pose
    }

    pub fn commanded_speed_cm_s(&self) -> f32 {
        self.commanded_speed_cm_s
    }

    pub fn last_contact(&self) -> Option<ContactSide> {
        self.last_contact
    }

    pub fn circuit(&self) -> &Circuit {
        &self.circuit
    }

    /// Status record for the display layer
    pub fn status(&self) -> ControllerStatus {
        ControllerStatus {
            mode: ControllerMode::Segment(self.phase()),
            segment_index: self.index,
            distance_cm: self.pose.total_distance_cm,
            heading_deg: self.pose.heading_deg,
            commanded_speed_cm_s: self.commanded_speed_cm_s,
            last_contact: self.last_contact,
            stuck_count: 0,
        }
    }

    /// Leave the countdown and start the first segment
    pub fn finish_countdown(&mut self) {
        if self.state == SegmentRunState::Countdown {
            self.pose.reset();
            self.transition(SegmentRunState::Driving { leg: Leg::Straight });
        }
    }

    /// Continue after an obstacle pause; returns false if not paused
    ///
    /// Accumulated distance is kept, so the segment finishes where it would
    /// have without the interruption.
    pub fn resume(&mut self) -> bool {
        match self.state {
            SegmentRunState::PausedOnObstacle { leg, .. } => {
                self.transition(SegmentRunState::Driving { leg });
                true
            }
            _ => false,
        }
    }

    /// Abort the run and discard accumulated progress
    pub fn reset(&mut self) {
        self.abort("reset");
    }

    /// Abort the run (same outcome as [`SegmentController::reset`])
    pub fn stop(&mut self) {
        self.abort("stop");
    }

    /// Apply an operator signal
    pub fn handle_signal(&mut self, signal: ControlSignal) {
        match signal {
            ControlSignal::Stop => self.stop(),
            ControlSignal::Reset => self.reset(),
            ControlSignal::Resume => {
                if !self.resume() {
                    log::debug!("SegmentController: resume ignored in {:?}", self.phase());
                }
            }
        }
    }

    fn abort(&mut self, reason: &str) {
        if self.state.is_terminal() {
            return;
        }
        log::info!(
            "SegmentController: {} in {:?}, segment {} progress {:.1}cm discarded",
            reason,
            self.phase(),
            self.index,
            self.pose.total_distance_cm
        );
        self.pose.reset();
        self.commanded_speed_cm_s = 0.0;
        self.transition(SegmentRunState::Aborted);
    }

    fn transition(&mut self, next: SegmentRunState) {
        if self.state != next {
            log::info!(
                "SegmentController: {:?} -> {:?} (segment {}/{})",
                self.state,
                next,
                self.index + 1,
                self.circuit.len()
            );
            self.state = next;
        }
    }

    /// Advance one control cycle
    pub fn step(&mut self, sensors: &SensorSnapshot, increment: PoseIncrement) -> WheelCommand {
        match self.state {
            SegmentRunState::Countdown | SegmentRunState::Completed | SegmentRunState::Aborted => {
                WheelCommand::STOP
            }
            SegmentRunState::PausedOnObstacle { .. } => {
                // Coasting still counts toward the segment
                self.pose.accumulate(increment);
                WheelCommand::STOP
            }
            SegmentRunState::SegmentDone => {
                self.advance_segment();
                WheelCommand::STOP
            }
            SegmentRunState::Driving { leg } => {
                self.pose.accumulate(increment);

                if let Some(side) = sensors.contact() {
                    self.last_contact = Some(side);
                    self.commanded_speed_cm_s = 0.0;
                    self.transition(SegmentRunState::PausedOnObstacle { side, leg });
                    return WheelCommand::STOP;
                }

                match leg {
                    Leg::Straight => self.drive_straight(),
                    Leg::Turn => self.drive_turn(),
                }
            }
        }
    }

    fn segment(&self) -> PathSegment {
        self.circuit.segments[self.index]
    }

    fn drive_straight(&mut self) -> WheelCommand {
        let segment = self.segment();
        let distance_error = segment.distance_cm - self.pose.total_distance_cm;

        if distance_error <= 0.0 {
            self.commanded_speed_cm_s = 0.0;
            if segment.turn_deg != 0.0 {
                self.transition(SegmentRunState::Driving { leg: Leg::Turn });
                return self.drive_turn();
            }
            self.transition(SegmentRunState::SegmentDone);
            return WheelCommand::STOP;
        }

        let speed = self.params.saturate(self.params.kp_distance * distance_error);
        let heading_error = -self.pose.heading_deg;
        let correction = self.params.kp_heading * heading_error;
        self.commanded_speed_cm_s = speed;

        let left = self.params.saturate(speed - correction);
        let right = self.params.saturate(speed + correction);

        self.log_progress(distance_error, heading_error);

        WheelCommand::new(
            cm_s_to_motor_units(left, &self.geometry),
            cm_s_to_motor_units(right, &self.geometry),
        )
    }

    fn drive_turn(&mut self) -> WheelCommand {
        let heading_error = self.segment().turn_deg - self.pose.heading_deg;

        if heading_error.abs() <= self.turn_tolerance_deg {
            self.commanded_speed_cm_s = 0.0;
            self.transition(SegmentRunState::SegmentDone);
            return WheelCommand::STOP;
        }

        let speed = self.params.saturate(self.params.kp_heading * heading_error.abs());
        self.commanded_speed_cm_s = speed;
        WheelCommand::pivot_towards(heading_error, cm_s_to_motor_units(speed, &self.geometry))
    }

    fn advance_segment(&mut self) {
        log::info!(
            "SegmentController: Segment {} done at {:.1}cm, {:.1}°",
            self.index,
            self.pose.total_distance_cm,
            self.pose.heading_deg
        );

        if self.index + 1 < self.circuit.len() {
            self.index += 1;
            self.pose.reset();
            self.transition(SegmentRunState::Driving { leg: Leg::Straight });
        } else {
            self.transition(SegmentRunState::Completed);
        }
    }

    fn log_progress(&mut self, distance_error: f32, heading_error: f32) {
        let should_log = match self.last_log {
            Some(last) => last.elapsed() >= Duration::from_secs(1),
            None => true,
        };
        if should_log {
            log::debug!(
                "SegmentController: seg {} remaining {:.1}cm, heading err {:.1}°, v={:.1}cm/s",
                self.index,
                distance_error,
                heading_error,
                self.commanded_speed_cm_s
            );
            self.last_log = Some(Instant::now());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn controller(segments: Vec<PathSegment>) -> SegmentController {
        let mut ctl = SegmentController::new(
            ControlParameters::default(),
            RobotGeometry::default(),
            &SegmentConfig::default(),
            Circuit::new(segments).unwrap(),
        );
        ctl.finish_countdown();
        ctl
    }

    fn clear() -> SensorSnapshot {
        SensorSnapshot::default()
    }

    #[test]
    fn test_circuit_validation() {
        assert!(Circuit::new(vec![]).is_err());
        assert!(Circuit::new(vec![PathSegment::straight(10.0); 4]).is_ok());
        assert!(Circuit::new(vec![PathSegment::straight(10.0); 5]).is_err());
        assert!(Circuit::single(10_000.0).is_err());
        assert!(Circuit::single(-1.0).is_err());
        assert!(Circuit::new(vec![PathSegment::new(10.0, f32::NAN)]).is_err());
        assert_eq!(Circuit::single(25.0).unwrap().len(), 1);
    }

    #[test]
    fn test_countdown_holds_motors() {
        let mut ctl = SegmentController::new(
            ControlParameters::default(),
            RobotGeometry::default(),
            &SegmentConfig::default(),
            Circuit::single(100.0).unwrap(),
        );
        let cmd = ctl.step(&SensorSnapshot::with_contacts(true, true), PoseIncrement::ZERO);
        assert_eq!(cmd, WheelCommand::STOP);
        assert_eq!(ctl.phase(), SegmentPhase::Countdown);
    }

    #[test]
    fn test_monotonic_braking_to_segment_done() {
        let mut ctl = controller(vec![PathSegment::straight(100.0)]);
        let params = ControlParameters::default();
        let mut speeds = Vec::new();

        let mut increment = PoseIncrement::ZERO;
        while ctl.phase() == SegmentPhase::Driving {
            let cmd = ctl.step(&clear(), increment);
            if ctl.phase() == SegmentPhase::Driving {
                assert_eq!(cmd.left, cmd.right);
                speeds.push(ctl.commanded_speed_cm_s());
            }
            increment = PoseIncrement::new(1.0, 0.0);
            assert!(speeds.len() <= 200);
        }

        assert_eq!(ctl.phase(), SegmentPhase::SegmentDone);
        assert!(ctl.pose().total_distance_cm >= 100.0);

        for pair in speeds.windows(2) {
            assert!(pair[1] <= pair[0]);
            let inside = |v: f32| v > params.min_speed_cm_s && v < params.max_speed_cm_s;
            if inside(pair[0]) && inside(pair[1]) {
                assert!(pair[1] < pair[0]);
            }
        }
        assert!(speeds
            .iter()
            .all(|&v| v >= params.min_speed_cm_s && v <= params.max_speed_cm_s));

        ctl.step(&clear(), PoseIncrement::ZERO);
        assert_eq!(ctl.phase(), SegmentPhase::Completed);
    }

    #[test]
    fn test_heading_correction_steers_back() {
        let mut ctl = controller(vec![PathSegment::straight(100.0)]);
        // Drifted counter-clockwise: right wheel must slow down
        let cmd = ctl.step(&clear(), PoseIncrement::new(0.0, 5.0));
        assert!(cmd.left > cmd.right);
    }

    #[test]
    fn test_pause_resume_keeps_distance() {
        let mut ctl = controller(vec![PathSegment::straight(100.0)]);
        ctl.step(&clear(), PoseIncrement::new(30.0, 0.0));

        let cmd = ctl.step(&SensorSnapshot::with_contacts(true, false), PoseIncrement::new(1.0, 0.0));
        assert_eq!(cmd, WheelCommand::STOP);
        assert_eq!(
            ctl.state(),
            SegmentRunState::PausedOnObstacle {
                side: ContactSide::Left,
                leg: Leg::Straight
            }
        );
        let paused_distance = ctl.pose().total_distance_cm;

        assert_eq!(ctl.step(&clear(), PoseIncrement::ZERO), WheelCommand::STOP);
        assert!(ctl.resume());
        assert_eq!(ctl.phase(), SegmentPhase::Driving);
        assert_eq!(ctl.pose().total_distance_cm, paused_distance);
        assert_eq!(ctl.last_contact(), Some(ContactSide::Left));
        assert!(!ctl.resume());
    }

    #[test]
    fn test_reset_discards_progress() {
        let mut ctl = controller(vec![PathSegment::straight(100.0)]);
        ctl.step(&clear(), PoseIncrement::new(30.0, 0.0));
        ctl.step(&SensorSnapshot::with_contacts(false, true), PoseIncrement::ZERO);

        ctl.handle_signal(ControlSignal::Reset);
        assert_eq!(ctl.phase(), SegmentPhase::Aborted);
        assert_eq!(ctl.pose(), AccumulatedPose::default());
        assert_eq!(ctl.step(&clear(), PoseIncrement::new(5.0, 0.0)), WheelCommand::STOP);

        // Repeated stops after abort are no-ops
        ctl.stop();
        ctl.stop();
        assert_eq!(ctl.phase(), SegmentPhase::Aborted);
    }

    #[test]
    fn test_turn_leg_pivots_toward_target() {
        let mut ctl = controller(vec![PathSegment::new(10.0, 90.0), PathSegment::straight(10.0)]);
        ctl.step(&clear(), PoseIncrement::new(10.0, 0.0));
        assert_eq!(ctl.state(), SegmentRunState::Driving { leg: Leg::Turn });

        let cmd = ctl.step(&clear(), PoseIncrement::ZERO);
        assert!(cmd.left < 0 && cmd.right > 0);

        ctl.step(&clear(), PoseIncrement::new(0.0, 89.0));
        assert_eq!(ctl.phase(), SegmentPhase::SegmentDone);

        ctl.step(&clear(), PoseIncrement::ZERO);
        assert_eq!(ctl.segment_index(), 1);
        assert_eq!(ctl.pose(), AccumulatedPose::default());
        assert_eq!(ctl.state(), SegmentRunState::Driving { leg: Leg::Straight });
    }
}
