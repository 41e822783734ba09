//! Differential-drive output
//!
//! Controllers produce a [`WheelCommand`] each cycle; [`DriveOutput`] is the
//! single writer to the [`MotionActuator`] during a controller's tenure.

use crate::config::RobotGeometry;
use crate::core::hardware::MotionActuator;

/// Left/right wheel speed setpoints (motor units, positive = forward)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WheelCommand {
    pub left: i16,
    pub right: i16,
}

impl WheelCommand {
    /// Both wheels stopped
    pub const STOP: Self = Self { left: 0, right: 0 };

    pub fn new(left: i16, right: i16) -> Self {
        Self { left, right }
    }

    /// Both wheels forward at `speed`
    pub fn straight(speed: i16) -> Self {
        Self::new(speed, speed)
    }

    /// Both wheels backward at `speed`
    pub fn reverse(speed: i16) -> Self {
        Self::new(-speed, -speed)
    }

    /// Spin in place counter-clockwise
    pub fn pivot_left(speed: i16) -> Self {
        Self::new(-speed, speed)
    }

    /// Spin in place clockwise
    pub fn pivot_right(speed: i16) -> Self {
        Self::new(speed, -speed)
    }

    /// Spin in place towards the sign of `heading_deg` (positive = CCW)
    pub fn pivot_towards(heading_deg: f32, speed: i16) -> Self {
        if heading_deg >= 0.0 {
            Self::pivot_left(speed)
        } else {
            Self::pivot_right(speed)
        }
    }

    /// True if both wheels are commanded to zero
    pub fn is_stopped(&self) -> bool {
        self.left == 0 && self.right == 0
    }

    /// Clamp both wheels to `±limit`
    pub fn saturated(self, limit: i16) -> Self {
        let limit = limit.saturating_abs();
        Self {
            left: self.left.clamp(-limit, limit),
            right: self.right.clamp(-limit, limit),
        }
    }
}

/// Convert a wheel speed in cm/s to motor units, saturated to the driver range
pub fn cm_s_to_motor_units(speed_cm_s: f32, geometry: &RobotGeometry) -> i16 {
    let limit = geometry.max_motor_units as f32;
    (speed_cm_s * geometry.motor_units_per_cm_s)
        .round()
        .clamp(-limit, limit) as i16
}

/// Single writer to the wheel motors
#[derive(Debug)]
pub struct DriveOutput {
    /// Last command written, `None` before the first write
    last: Option<WheelCommand>,
    /// Driver saturation limit
    max_units: i16,
}

impl DriveOutput {
    pub fn new(max_units: i16) -> Self {
        Self {
            last: None,
            max_units,
        }
    }

    /// Saturate and write a command
    pub fn apply<A: MotionActuator + ?Sized>(&mut self, hw: &mut A, command: WheelCommand) {
        let command = command.saturated(self.max_units);
        hw.set_wheel_speeds(command.left, command.right);
        self.last = Some(command);
    }

    /// Stop both wheels; a no-op if they are already commanded to zero
    pub fn stop<A: MotionActuator + ?Sized>(&mut self, hw: &mut A) {
        if self.last.map_or(true, |c| !c.is_stopped()) {
            hw.set_wheel_speeds(0, 0);
            self.last = Some(WheelCommand::STOP);
        }
    }

    /// Last command written
    pub fn last(&self) -> Option<WheelCommand> {
        self.last
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorder {
        writes: Vec<(i16, i16)>,
    }

    impl MotionActuator for Recorder {
        fn set_wheel_speeds(&mut self, left: i16, right: i16) {
            self.writes.push((left, right));
        }
    }

    #[test]
    fn test_command_constructors() {
        assert_eq!(WheelCommand::straight(90), WheelCommand::new(90, 90));
        assert_eq!(WheelCommand::reverse(72), WheelCommand::new(-72, -72));
        assert_eq!(WheelCommand::pivot_left(45), WheelCommand::new(-45, 45));
        assert_eq!(WheelCommand::pivot_right(45), WheelCommand::new(45, -45));
        assert_eq!(WheelCommand::pivot_towards(-10.0, 45), WheelCommand::pivot_right(45));
        assert!(WheelCommand::STOP.is_stopped());
    }

    #[test]
    fn test_saturation() {
        let cmd = WheelCommand::new(500, -900).saturated(400);
        assert_eq!(cmd, WheelCommand::new(400, -400));
    }

    #[test]
    fn test_cm_s_conversion() {
        let geometry = RobotGeometry::default();
        assert_eq!(cm_s_to_motor_units(10.0, &geometry), 40);
        assert_eq!(cm_s_to_motor_units(-10.0, &geometry), -40);
        assert_eq!(cm_s_to_motor_units(1000.0, &geometry), geometry.max_motor_units);
    }

    #[test]
    fn test_repeated_stop_writes_once() {
        let mut hw = Recorder::default();
        let mut drive = DriveOutput::new(400);

        drive.apply(&mut hw, WheelCommand::straight(90));
        drive.stop(&mut hw);
        drive.stop(&mut hw);
        drive.stop(&mut hw);

        assert_eq!(hw.writes, vec![(90, 90), (0, 0)]);
        assert_eq!(drive.last(), Some(WheelCommand::STOP));
    }

    #[test]
    fn test_first_stop_always_writes() {
        let mut hw = Recorder::default();
        let mut drive = DriveOutput::new(400);
        drive.stop(&mut hw);
        assert_eq!(hw.writes, vec![(0, 0)]);
    }
}
