//! Roam Behaviour Tests
//!
//! Closed-loop runs of the reactive avoidance controller against the
//! simulated robot:
//! - Head-on and side contacts pick the matching escape
//! - Floor edges are backed away from before the chassis leaves the table
//! - Repeated contacts escalate to the corner escape
//! - Sensor transients and operator stop are handled without surprises
//!
//! Run with: `cargo test --test roam_behaviour`

use approx::assert_relative_eq;
use gati_drive::config::{Config, ControlParameters, RobotGeometry, RoamConfig};
use gati_drive::control::roam::{AvoidanceState, Pivot};
use gati_drive::control::runner::RoamStopReason;
use gati_drive::control::{control_link, run_roam, AvoidanceMode, RoamController, RoamSetup};
use gati_drive::core::hardware::EncoderSource;
use gati_drive::core::types::{ContactReading, LineSensor};
use gati_drive::drive::{DriveOutput, WheelCommand};
use gati_drive::odometry::OdometryIntegrator;
use gati_drive::sensors::SensorPoller;
use gati_drive::sim::{Rect, SimConfig, SimulatedRobot};
use std::thread;
use std::time::Duration;

// ============================================================================
// Test Rig
// ============================================================================

/// One controller cycle at a time, with the same wiring as `run_roam`
struct Rig {
    robot: SimulatedRobot,
    poller: SensorPoller,
    odometry: OdometryIntegrator,
    drive: DriveOutput,
    roam: RoamController,
}

impl Rig {
    fn new(config: SimConfig) -> Self {
        let geometry = RobotGeometry::default();
        let mut robot = SimulatedRobot::new(geometry, config).unwrap();
        let mut poller = SensorPoller::new();
        poller.prepare(&mut robot).unwrap();
        Self {
            robot,
            poller,
            odometry: OdometryIntegrator::new(geometry),
            drive: DriveOutput::new(geometry.max_motor_units),
            roam: RoamController::new(ControlParameters::default(), RoamConfig::default()),
        }
    }

    fn cycle(&mut self) -> WheelCommand {
        let sensors = self.poller.poll(&mut self.robot);
        let increment = self.odometry.update(self.robot.read_and_reset_deltas());
        let command = self.roam.step(&sensors, increment);
        self.drive.apply(&mut self.robot, command);
        command
    }

    /// Cycle until `mode` is entered; returns the command of that cycle
    fn run_until(&mut self, mode: AvoidanceMode, limit: usize) -> WheelCommand {
        for _ in 0..limit {
            let cmd = self.cycle();
            if self.roam.mode() == mode {
                return cmd;
            }
        }
        panic!("{:?} not reached in {} cycles", mode, limit);
    }
}

/// Unbounded floor, no noise, optional obstacles
fn open_floor(obstacles: Vec<Rect>) -> SimConfig {
    let mut config = SimConfig::ideal();
    config.obstacles = obstacles
        .into_iter()
        .map(|r| gati_drive::sim::config::ObstacleConfig {
            x_min: r.x_min,
            y_min: r.y_min,
            x_max: r.x_max,
            y_max: r.y_max,
        })
        .collect();
    config
}

// ============================================================================
// Contacts
// ============================================================================

#[test]
fn test_head_on_wall_triggers_avoid_both() {
    let mut rig = Rig::new(open_floor(vec![Rect::new(130.0, 0.0, 140.0, 150.0)]));

    let cmd = rig.run_until(AvoidanceMode::AvoidBoth, 2000);
    assert_eq!(cmd, WheelCommand::STOP);

    // Reverse phase: equal negative wheel speeds
    let cmd = rig.cycle();
    assert!(cmd.left < 0);
    assert_eq!(cmd.left, cmd.right);

    rig.run_until(AvoidanceMode::Forward, 2000);
    assert_eq!(rig.roam.stuck_count(), 1);

    // Turned roughly a quarter turn clockwise and backed off the wall
    let pose = rig.robot.pose();
    assert_relative_eq!(pose.heading_deg, -90.0, epsilon = 5.0);
    assert!(pose.x_cm < 130.0 - 4.8);
}

#[test]
fn test_left_front_obstacle_pivots_right() {
    // Box reaching in from the left of the path
    let mut rig = Rig::new(open_floor(vec![Rect::new(120.0, 78.0, 130.0, 100.0)]));

    rig.run_until(AvoidanceMode::AvoidLeft, 2000);
    match rig.roam.state() {
        AvoidanceState::AvoidLeft(m) => assert_eq!(m.pivot, Pivot::Right),
        other => panic!("unexpected state {:?}", other),
    }

    rig.run_until(AvoidanceMode::Forward, 2000);
    assert!(rig.robot.pose().heading_deg < -25.0);
}

#[test]
fn test_persistent_contact_escalates_to_corner_escape() {
    let mut rig = Rig::new(SimConfig::ideal());
    rig.robot.force_contact(Some(ContactReading {
        left: false,
        right: true,
    }));

    for expected in 1..=2u32 {
        rig.run_until(AvoidanceMode::AvoidRight, 10);
        rig.run_until(AvoidanceMode::Forward, 2000);
        assert_eq!(rig.roam.stuck_count(), expected);
    }

    // Third maneuver goes straight to the corner escape
    rig.run_until(AvoidanceMode::AvoidRight, 10);
    rig.run_until(AvoidanceMode::EscapeCorner, 2000);
    assert_eq!(rig.roam.stuck_count(), 3);

    let heading_before = rig.robot.pose().heading_deg;
    rig.robot.force_contact(None);
    rig.run_until(AvoidanceMode::Forward, 4000);
    assert_eq!(rig.roam.stuck_count(), 0);

    let turned = (rig.robot.pose().heading_deg - heading_before + 540.0) % 360.0 - 180.0;
    assert_relative_eq!(turned.abs(), 180.0, epsilon = 5.0);
}

// ============================================================================
// Floor Edge
// ============================================================================

#[test]
fn test_edge_is_avoided_before_leaving_table() {
    let mut config = SimConfig::ideal();
    config.arena.bounded = true;
    config.start_x_cm = 170.0;
    let mut rig = Rig::new(config);

    let mut max_x: f32 = 0.0;
    for _ in 0..400 {
        rig.cycle();
        max_x = max_x.max(rig.robot.pose().x_cm);
        if rig.roam.mode() == AvoidanceMode::EdgeAvoid {
            break;
        }
    }
    assert_eq!(rig.roam.mode(), AvoidanceMode::EdgeAvoid);

    // Noise-free readings tie, so the leftmost sensor is reported
    match rig.roam.state() {
        AvoidanceState::EdgeAvoid { sensor, maneuver } => {
            assert_eq!(*sensor, LineSensor::Leftmost);
            assert_eq!(maneuver.turn_deg, 130.0);
        }
        other => panic!("unexpected state {:?}", other),
    }

    rig.run_until(AvoidanceMode::Forward, 4000);
    max_x = max_x.max(rig.robot.pose().x_cm);
    assert!(max_x < 200.0, "chassis centre reached x={:.1}", max_x);

    // Edge maneuvers do not count toward the stuck limit
    assert_eq!(rig.roam.stuck_count(), 0);
    assert_relative_eq!(rig.robot.pose().heading_deg, -130.0, epsilon = 5.0);
}

// ============================================================================
// Runner
// ============================================================================

#[test]
fn test_sensor_transients_do_not_stop_roaming() {
    let mut robot = SimulatedRobot::new(RobotGeometry::default(), SimConfig::ideal()).unwrap();
    robot.fail_contact_reads(10);
    robot.fail_line_reads(10);

    let (_handle, link) = control_link();
    let setup = RoamSetup {
        sample_period: Duration::ZERO,
        max_cycles: Some(100),
        ..RoamSetup::from_config(&Config::default())
    };

    let outcome = run_roam(&mut robot, &setup, &link).unwrap();
    assert_eq!(outcome.reason, RoamStopReason::CycleLimit);
    assert_eq!(outcome.final_mode, AvoidanceMode::Forward);
    assert!(outcome.pose.total_distance_cm > 0.0);
    assert_eq!(robot.wheel_speeds(), (0, 0));
}

#[test]
fn test_stop_from_another_thread() {
    let mut robot = SimulatedRobot::new(RobotGeometry::default(), SimConfig::ideal()).unwrap();
    let (handle, link) = control_link();

    let stopper = thread::spawn(move || {
        thread::sleep(Duration::from_millis(50));
        handle.stop();
        handle
    });

    let setup = RoamSetup {
        sample_period: Duration::from_millis(1),
        max_cycles: Some(100_000),
        ..RoamSetup::from_config(&Config::default())
    };
    let outcome = run_roam(&mut robot, &setup, &link).unwrap();
    let handle = stopper.join().unwrap();

    assert_eq!(outcome.reason, RoamStopReason::Signal);
    assert!(outcome.cycles > 0);
    assert_eq!(robot.wheel_speeds(), (0, 0));

    // The run has returned; further stops are harmless
    drop(link);
    handle.stop();
    handle.stop();
}
