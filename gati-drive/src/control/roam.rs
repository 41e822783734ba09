//! Reactive avoidance ("roam") controller
//!
//! Drives straight until a contact switch closes or the floor disappears
//! under the whole reflectance array, then runs a scripted two-phase escape:
//! reverse for a distance budget, pivot for an angle budget, back to forward.
//!
//! ```text
//!                 contact L / R / both              budget done
//!   Forward ────────────────────────────► Avoid* ─────────────────► Forward
//!      │  all lines above threshold                                  (stuck += 1)
//!      ├───────────────────────────────► EdgeAvoid ───────────────► Forward
//!      │  stuck >= limit
//!      └───────────────────────────────► EscapeCorner ────────────► Forward
//!                                                                    (stuck = 0)
//! ```
//!
//! Phases are open loop: they end when accumulated odometry crosses the
//! budget, not when the sensors clear. [`RoamController::step`] is a pure
//! function of its inputs and the controller's own state, so the whole
//! machine can be exercised with scripted frames.

use crate::config::{ControlParameters, RoamConfig};
use crate::control::signals::{ControllerMode, ControllerStatus};
use crate::core::types::{AccumulatedPose, ContactSide, LineSensor, PoseIncrement, SensorSnapshot};
use crate::drive::WheelCommand;

/// Flat view of [`AvoidanceState`] for status and logging
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AvoidanceMode {
    Forward,
    AvoidLeft,
    AvoidRight,
    AvoidBoth,
    EscapeCorner,
    EdgeAvoid,
}

/// Stationary pivot direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pivot {
    /// Counter-clockwise (left wheel back, right wheel forward)
    Left,
    /// Clockwise (left wheel forward, right wheel back)
    Right,
}

/// Phase of an escape maneuver
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManeuverPhase {
    /// Both wheels backward until the distance budget is used
    Reverse,
    /// Spin in place until the angle budget is used
    Turn,
}

/// One scripted escape: reverse, then pivot
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Maneuver {
    pub phase: ManeuverPhase,
    pub reverse_cm: f32,
    pub turn_deg: f32,
    pub pivot: Pivot,
    /// Odometry accumulated since the current phase began
    pub progress: AccumulatedPose,
}

impl Maneuver {
    pub fn new(reverse_cm: f32, turn_deg: f32, pivot: Pivot) -> Self {
        Self {
            phase: ManeuverPhase::Reverse,
            reverse_cm,
            turn_deg,
            pivot,
            progress: AccumulatedPose::default(),
        }
    }

    /// Feed one increment; returns true once the turn budget is used up
    fn advance(&mut self, increment: PoseIncrement) -> bool {
        self.progress.accumulate(increment);
        match self.phase {
            ManeuverPhase::Reverse => {
                if -self.progress.total_distance_cm >= self.reverse_cm {
                    self.phase = ManeuverPhase::Turn;
                    self.progress.reset();
                }
                false
            }
            ManeuverPhase::Turn => self.progress.heading_deg.abs() >= self.turn_deg,
        }
    }

    fn command(&self, params: &ControlParameters) -> WheelCommand {
        match (self.phase, self.pivot) {
            (ManeuverPhase::Reverse, _) => WheelCommand::reverse(params.reverse_speed),
            (ManeuverPhase::Turn, Pivot::Left) => WheelCommand::pivot_left(params.turn_speed),
            (ManeuverPhase::Turn, Pivot::Right) => WheelCommand::pivot_right(params.turn_speed),
        }
    }
}

/// Roam state with per-state data
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AvoidanceState {
    /// Driving straight at base speed
    Forward,
    /// Escaping a left-side contact
    AvoidLeft(Maneuver),
    /// Escaping a right-side contact
    AvoidRight(Maneuver),
    /// Escaping a head-on contact
    AvoidBoth(Maneuver),
    /// Half turn after repeated maneuvers without progress
    EscapeCorner(Maneuver),
    /// Backing away from a floor edge
    EdgeAvoid { sensor: LineSensor, maneuver: Maneuver },
}

impl AvoidanceState {
    pub fn mode(&self) -> AvoidanceMode {
        match self {
            AvoidanceState::Forward => AvoidanceMode::Forward,
            AvoidanceState::AvoidLeft(_) => AvoidanceMode::AvoidLeft,
            AvoidanceState::AvoidRight(_) => AvoidanceMode::AvoidRight,
            AvoidanceState::AvoidBoth(_) => AvoidanceMode::AvoidBoth,
            AvoidanceState::EscapeCorner(_) => AvoidanceMode::EscapeCorner,
            AvoidanceState::EdgeAvoid { .. } => AvoidanceMode::EdgeAvoid,
        }
    }

    /// The active maneuver, if any
    pub fn maneuver(&self) -> Option<&Maneuver> {
        match self {
            AvoidanceState::Forward => None,
            AvoidanceState::AvoidLeft(m)
            | AvoidanceState::AvoidRight(m)
            | AvoidanceState::AvoidBoth(m)
            | AvoidanceState::EscapeCorner(m)
            | AvoidanceState::EdgeAvoid { maneuver: m, .. } => Some(m),
        }
    }

    fn maneuver_mut(&mut self) -> Option<&mut Maneuver> {
        match self {
            AvoidanceState::Forward => None,
            AvoidanceState::AvoidLeft(m)
            | AvoidanceState::AvoidRight(m)
            | AvoidanceState::AvoidBoth(m)
            | AvoidanceState::EscapeCorner(m)
            | AvoidanceState::EdgeAvoid { maneuver: m, .. } => Some(m),
        }
    }
}

/// Reactive avoidance state machine
#[derive(Debug)]
pub struct RoamController {
    params: ControlParameters,
    config: RoamConfig,
    state: AvoidanceState,
    stuck_count: u32,
    /// Forward travel since the last maneuver ended (cm)
    forward_progress_cm: f32,
    /// Odometry totals for the whole run
    pose: AccumulatedPose,
    last_contact: Option<ContactSide>,
}

impl RoamController {
    pub fn new(params: ControlParameters, config: RoamConfig) -> Self {
        Self {
            params,
            config,
            state: AvoidanceState::Forward,
            stuck_count: 0,
            forward_progress_cm: 0.0,
            pose: AccumulatedPose::default(),
            last_contact: None,
        }
    }

    pub fn state(&self) -> &AvoidanceState {
        &self.state
    }

    pub fn mode(&self) -> AvoidanceMode {
        self.state.mode()
    }

    pub fn stuck_count(&self) -> u32 {
        self.stuck_count
    }

    /// Odometry totals since the controller was created
    pub fn pose(&self) -> AccumulatedPose {
        self.pose
    }

    pub fn last_contact(&self) -> Option<ContactSide> {
        self.last_contact
    }

    /// Status record for the display layer
    pub fn status(&self) -> ControllerStatus {
        ControllerStatus {
            mode: ControllerMode::Roam(self.mode()),
            segment_index: 0,
            distance_cm: self.pose.total_distance_cm,
            heading_deg: self.pose.heading_deg,
            commanded_speed_cm_s: 0.0,
            last_contact: self.last_contact,
            stuck_count: self.stuck_count,
        }
    }

    /// Advance one control cycle
    ///
    /// `increment` is the motion measured since the previous call. The
    /// returned command is for the cycle that follows.
    pub fn step(&mut self, sensors: &SensorSnapshot, increment: PoseIncrement) -> WheelCommand {
        self.pose.accumulate(increment);
        if let Some(side) = sensors.contact() {
            self.last_contact = Some(side);
        }

        let finished = self.state.maneuver_mut().map(|m| m.advance(increment));
        match finished {
            None => self.step_forward(sensors, increment),
            Some(false) => self
                .state
                .maneuver()
                .map(|m| m.command(&self.params))
                .unwrap_or(WheelCommand::STOP),
            Some(true) => self.complete_maneuver(),
        }
    }

    fn step_forward(&mut self, sensors: &SensorSnapshot, increment: PoseIncrement) -> WheelCommand {
        self.forward_progress_cm += increment.distance_cm;
        if self.stuck_count > 0 && self.forward_progress_cm > self.config.progress_reset_cm {
            log::debug!(
                "RoamController: {:.1}cm of clear travel, stuck count {} -> 0",
                self.forward_progress_cm,
                self.stuck_count
            );
            self.stuck_count = 0;
        }

        let next = if self.stuck_count >= self.config.stuck_limit {
            Some(self.corner_escape())
        } else if let Some(side) = sensors.contact() {
            Some(self.contact_maneuver(side))
        } else if sensors.all_lines_above(self.config.edge_threshold) {
            Some(self.edge_maneuver(sensors.strongest_line_sensor()))
        } else {
            None
        };

        match next {
            Some(state) => {
                self.enter(state);
                WheelCommand::STOP
            }
            None => WheelCommand::straight(self.params.base_speed),
        }
    }

    fn complete_maneuver(&mut self) -> WheelCommand {
        match self.state {
            AvoidanceState::EscapeCorner(_) => self.stuck_count = 0,
            AvoidanceState::EdgeAvoid { .. } => {}
            _ => self.stuck_count += 1,
        }
        self.forward_progress_cm = 0.0;

        if self.stuck_count >= self.config.stuck_limit {
            log::info!(
                "RoamController: {} maneuvers without progress",
                self.stuck_count
            );
            let escape = self.corner_escape();
            self.enter(escape);
            return WheelCommand::STOP;
        }

        self.enter(AvoidanceState::Forward);
        WheelCommand::straight(self.params.base_speed)
    }

    fn enter(&mut self, state: AvoidanceState) {
        log::info!(
            "RoamController: {:?} -> {:?} (stuck={})",
            self.state.mode(),
            state.mode(),
            self.stuck_count
        );
        self.state = state;
    }

    fn contact_maneuver(&self, side: ContactSide) -> AvoidanceState {
        let c = &self.config;
        match side {
            ContactSide::Left => {
                AvoidanceState::AvoidLeft(Maneuver::new(c.side_reverse_cm, c.side_turn_deg, Pivot::Right))
            }
            ContactSide::Right => {
                AvoidanceState::AvoidRight(Maneuver::new(c.side_reverse_cm, c.side_turn_deg, Pivot::Left))
            }
            ContactSide::Both => {
                AvoidanceState::AvoidBoth(Maneuver::new(c.both_reverse_cm, c.both_turn_deg, Pivot::Right))
            }
        }
    }

    fn corner_escape(&self) -> AvoidanceState {
        AvoidanceState::EscapeCorner(Maneuver::new(
            self.config.corner_reverse_cm,
            self.config.corner_turn_deg,
            Pivot::Right,
        ))
    }

    fn edge_maneuver(&self, sensor: LineSensor) -> AvoidanceState {
        let pivot = match sensor {
            LineSensor::Rightmost => Pivot::Left,
            _ => Pivot::Right,
        };
        AvoidanceState::EdgeAvoid {
            sensor,
            maneuver: Maneuver::new(
                self.config.edge_reverse_cm,
                self.config.edge_turn_deg[sensor.index()],
                pivot,
            ),
        }
    }
}
