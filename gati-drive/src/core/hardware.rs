//! Hardware collaborator traits
//!
//! The controllers never touch device registers directly. A robot backend (or
//! the simulator in [`crate::sim`]) implements these four traits and is handed
//! to a controller run as one explicit context object.

use crate::core::types::{ContactReading, EncoderDelta, LINE_SENSOR_COUNT};
use crate::error::Result;

/// Differential-drive command sink
pub trait MotionActuator {
    /// Set both wheel speeds in motor units (positive = forward).
    ///
    /// Takes effect immediately; there is no acknowledgement.
    fn set_wheel_speeds(&mut self, left: i16, right: i16);
}

/// Destructive encoder reader
pub trait EncoderSource {
    /// Return ticks since the previous call and zero the hardware counters.
    ///
    /// Must be called at most once per control cycle. Implementations build
    /// the result with [`EncoderDelta::from_counts`] and reset any counter it
    /// flags as overflowed.
    fn read_and_reset_deltas(&mut self) -> EncoderDelta;
}

/// Front contact switches
pub trait ContactSensors {
    /// Sample both switches (level, not edge triggered)
    fn read(&mut self) -> Result<ContactReading>;
}

/// Downward-facing reflectance array
pub trait ReflectanceArray {
    /// Run the calibration sweep
    fn calibrate(&mut self) -> Result<()>;

    /// Whether [`ReflectanceArray::calibrate`] has completed
    fn is_calibrated(&self) -> bool;

    /// Calibrated readings in array order, 0..=1000
    fn read_calibrated(&mut self) -> Result<[u16; LINE_SENSOR_COUNT]>;
}

/// Everything a controller needs from the robot
pub trait RobotHardware: MotionActuator + EncoderSource + ContactSensors + ReflectanceArray {}

impl<T> RobotHardware for T where T: MotionActuator + EncoderSource + ContactSensors + ReflectanceArray {}
