//! Core data types for encoder ticks, dead-reckoned pose, and sensor frames.
//!
//! Key types:
//! - [`EncoderDelta`]: Ticks since the previous destructive encoder read
//! - [`PoseIncrement`] / [`AccumulatedPose`]: Odometry output and its running sum
//! - [`SensorSnapshot`]: One consistent frame of contact and reflectance readings

/// Number of reflectance sensors under the front edge of the chassis
pub const LINE_SENSOR_COUNT: usize = 5;

/// Largest counter magnitude that still fits the signed 16-bit encoder range
pub const ENCODER_COUNT_LIMIT: i32 = i16::MAX as i32;

/// Calibrated reflectance reading for "nothing reflected back" (floor absent)
pub const REFLECTANCE_MAX: u16 = 1000;

/// Encoder ticks accumulated since the previous read
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EncoderDelta {
    /// Left wheel ticks (positive = forward)
    pub left_ticks: i32,
    /// Right wheel ticks (positive = forward)
    pub right_ticks: i32,
}

/// Which counters overflowed during a read and must be force-reset
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CounterOverflow {
    pub left: bool,
    pub right: bool,
}

impl CounterOverflow {
    /// True if either counter overflowed
    pub fn any(&self) -> bool {
        self.left || self.right
    }
}

impl EncoderDelta {
    /// Create a delta from tick counts
    pub fn new(left_ticks: i32, right_ticks: i32) -> Self {
        Self {
            left_ticks,
            right_ticks,
        }
    }

    /// Build a delta from raw counter readings.
    ///
    /// A counter whose magnitude left the signed 16-bit range can no longer be
    /// trusted: it contributes zero ticks for this cycle and is flagged so the
    /// encoder source resets it. This bounds the damage to one cycle's worth of
    /// integration error.
    pub fn from_counts(left: i32, right: i32) -> (Self, CounterOverflow) {
        let overflow = CounterOverflow {
            left: left.unsigned_abs() > ENCODER_COUNT_LIMIT as u32,
            right: right.unsigned_abs() > ENCODER_COUNT_LIMIT as u32,
        };

        if overflow.any() {
            log::warn!(
                "EncoderDelta: Counter overflow (L={}, R={}), forcing reset",
                left,
                right
            );
        }

        let delta = Self {
            left_ticks: if overflow.left { 0 } else { left },
            right_ticks: if overflow.right { 0 } else { right },
        };
        (delta, overflow)
    }

    /// True if neither wheel moved
    pub fn is_zero(&self) -> bool {
        self.left_ticks == 0 && self.right_ticks == 0
    }
}

/// Motion derived from one [`EncoderDelta`]
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PoseIncrement {
    /// Linear travel of the chassis center (cm, positive = forward)
    pub distance_cm: f32,
    /// Heading change (degrees, positive = counter-clockwise)
    pub heading_delta_deg: f32,
}

impl PoseIncrement {
    /// No motion
    pub const ZERO: Self = Self {
        distance_cm: 0.0,
        heading_delta_deg: 0.0,
    };

    pub fn new(distance_cm: f32, heading_delta_deg: f32) -> Self {
        Self {
            distance_cm,
            heading_delta_deg,
        }
    }
}

/// Running sum of pose increments, owned by whichever controller is active
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AccumulatedPose {
    /// Signed distance travelled since the last reset (cm)
    pub total_distance_cm: f32,
    /// Heading relative to the last reset (degrees, positive = CCW)
    pub heading_deg: f32,
}

impl AccumulatedPose {
    /// Add one increment
    #[inline]
    pub fn accumulate(&mut self, increment: PoseIncrement) {
        self.total_distance_cm += increment.distance_cm;
        self.heading_deg += increment.heading_delta_deg;
    }

    /// Zero both totals
    #[inline]
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Raw state of the two front contact switches
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ContactReading {
    pub left: bool,
    pub right: bool,
}

/// Side of the chassis that touched an obstacle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContactSide {
    Left,
    Right,
    Both,
}

impl ContactSide {
    /// Classify a pair of contact flags
    pub fn from_flags(left: bool, right: bool) -> Option<Self> {
        match (left, right) {
            (true, true) => Some(Self::Both),
            (true, false) => Some(Self::Left),
            (false, true) => Some(Self::Right),
            (false, false) => None,
        }
    }
}

/// Position of one reflectance sensor, left to right
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineSensor {
    Leftmost,
    CenterLeft,
    Center,
    CenterRight,
    Rightmost,
}

impl LineSensor {
    /// All sensors in array order
    pub const ALL: [LineSensor; LINE_SENSOR_COUNT] = [
        LineSensor::Leftmost,
        LineSensor::CenterLeft,
        LineSensor::Center,
        LineSensor::CenterRight,
        LineSensor::Rightmost,
    ];

    /// Index into the reading array
    pub fn index(self) -> usize {
        match self {
            LineSensor::Leftmost => 0,
            LineSensor::CenterLeft => 1,
            LineSensor::Center => 2,
            LineSensor::CenterRight => 3,
            LineSensor::Rightmost => 4,
        }
    }

    /// Sensor at array index, if in range
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }
}

/// One polling pass over the contact and reflectance sensors
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SensorSnapshot {
    pub bump_left: bool,
    pub bump_right: bool,
    /// Calibrated readings, 0 (bright floor) to [`REFLECTANCE_MAX`] (no floor)
    pub line_sensors: [u16; LINE_SENSOR_COUNT],
}

impl SensorSnapshot {
    /// Frame with the given contact state and a uniformly bright floor
    pub fn with_contacts(bump_left: bool, bump_right: bool) -> Self {
        Self {
            bump_left,
            bump_right,
            line_sensors: [0; LINE_SENSOR_COUNT],
        }
    }

    /// Which side (if any) is in contact
    pub fn contact(&self) -> Option<ContactSide> {
        ContactSide::from_flags(self.bump_left, self.bump_right)
    }

    /// True when every reflectance sensor exceeds `threshold`
    pub fn all_lines_above(&self, threshold: u16) -> bool {
        self.line_sensors.iter().all(|&v| v > threshold)
    }

    /// Sensor with the strongest reading (lowest index wins ties)
    pub fn strongest_line_sensor(&self) -> LineSensor {
        let mut best = 0;
        for (i, &value) in self.line_sensors.iter().enumerate() {
            if value > self.line_sensors[best] {
                best = i;
            }
        }
        LineSensor::ALL[best]
    }
}
