//! Configuration for gati-drive
//!
//! Loads robot geometry, controller gains, roam maneuver budgets, and the
//! operator's circuit from a TOML file. Every key has a default matching a
//! 3pi+-class robot (32 mm wheels, 30:1 gearbox, ~9.6 cm track), so a partial
//! file is valid.
//!
//! ```toml
//! [control]
//! base_speed = 90
//! kp_distance = 1.5
//!
//! [[circuit.segments]]
//! distance_cm = 60.0
//! turn_deg = 90.0
//! ```

use crate::control::segment::{Circuit, PathSegment};
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::f32::consts::PI;
use std::fs;
use std::path::Path;
use std::time::Duration;

#[cfg(feature = "mock")]
use crate::sim::SimConfig;

/// Top-level application configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub robot: RobotGeometry,
    #[serde(default)]
    pub control: ControlParameters,
    #[serde(default)]
    pub roam: RoamConfig,
    #[serde(default)]
    pub segment: SegmentConfig,
    #[serde(default)]
    pub circuit: CircuitConfig,
    #[cfg(feature = "mock")]
    #[serde(default)]
    pub simulation: SimConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

// ============================================================================
// Robot geometry
// ============================================================================

/// Fixed drivetrain constants used by odometry and speed conversion
#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
pub struct RobotGeometry {
    /// Wheel diameter (cm)
    #[serde(default = "default_wheel_diameter_cm")]
    pub wheel_diameter_cm: f32,

    /// Encoder ticks per wheel revolution, gearbox included
    #[serde(default = "default_ticks_per_revolution")]
    pub ticks_per_revolution: f32,

    /// Distance between the wheel contact patches (cm)
    #[serde(default = "default_wheel_base_cm")]
    pub wheel_base_cm: f32,

    /// Motor command units that produce 1 cm/s of wheel speed
    #[serde(default = "default_motor_units_per_cm_s")]
    pub motor_units_per_cm_s: f32,

    /// Largest motor command magnitude the driver accepts
    #[serde(default = "default_max_motor_units")]
    pub max_motor_units: i16,
}

fn default_wheel_diameter_cm() -> f32 {
    3.2
}
fn default_ticks_per_revolution() -> f32 {
    358.3
}
fn default_wheel_base_cm() -> f32 {
    9.6
}
fn default_motor_units_per_cm_s() -> f32 {
    4.0
}
fn default_max_motor_units() -> i16 {
    400
}

impl Default for RobotGeometry {
    fn default() -> Self {
        Self {
            wheel_diameter_cm: default_wheel_diameter_cm(),
            ticks_per_revolution: default_ticks_per_revolution(),
            wheel_base_cm: default_wheel_base_cm(),
            motor_units_per_cm_s: default_motor_units_per_cm_s(),
            max_motor_units: default_max_motor_units(),
        }
    }
}

impl RobotGeometry {
    /// Wheel travel per encoder tick (cm)
    #[inline]
    pub fn cm_per_tick(&self) -> f32 {
        PI * self.wheel_diameter_cm / self.ticks_per_revolution
    }

    /// Convert a tick count to wheel travel (cm)
    #[inline]
    pub fn ticks_to_cm(&self, ticks: i32) -> f32 {
        ticks as f32 * self.cm_per_tick()
    }

    /// Convert wheel travel (cm) to the nearest whole tick count
    #[inline]
    pub fn cm_to_ticks(&self, cm: f32) -> i32 {
        (cm / self.cm_per_tick()).round() as i32
    }

    /// Check that every constant is physically meaningful
    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("wheel_diameter_cm", self.wheel_diameter_cm),
            ("ticks_per_revolution", self.ticks_per_revolution),
            ("wheel_base_cm", self.wheel_base_cm),
            ("motor_units_per_cm_s", self.motor_units_per_cm_s),
        ];
        for (name, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(Error::Config(format!(
                    "robot.{} must be positive, got {}",
                    name, value
                )));
            }
        }
        if self.max_motor_units <= 0 {
            return Err(Error::Config(format!(
                "robot.max_motor_units must be positive, got {}",
                self.max_motor_units
            )));
        }
        Ok(())
    }
}

// ============================================================================
// Control parameters
// ============================================================================

/// Operator-entered speeds and gains, read-only to the controllers
#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
#[serde(default)]
pub struct ControlParameters {
    /// Roam forward speed (motor units)
    pub base_speed: i16,
    /// Roam reverse speed during escape maneuvers (motor units)
    pub reverse_speed: i16,
    /// Roam pivot speed during escape maneuvers (motor units)
    pub turn_speed: i16,
    /// Segment mode lower speed bound (cm/s)
    pub min_speed_cm_s: f32,
    /// Segment mode upper speed bound (cm/s)
    pub max_speed_cm_s: f32,
    /// Distance braking gain ((cm/s) per cm of remaining distance)
    pub kp_distance: f32,
    /// Heading correction gain ((cm/s) per degree of heading error)
    pub kp_heading: f32,
}

impl Default for ControlParameters {
    fn default() -> Self {
        Self::from_base_speed(90)
    }
}

impl ControlParameters {
    /// Derive reverse and turn speeds from a roam base speed
    ///
    /// Reverse runs at 80% and pivots at 50% of the forward speed.
    pub fn from_base_speed(base_speed: i16) -> Self {
        Self {
            base_speed,
            reverse_speed: (base_speed as f32 / 1.25) as i16,
            turn_speed: base_speed / 2,
            min_speed_cm_s: 5.0,
            max_speed_cm_s: 40.0,
            kp_distance: 1.5,
            kp_heading: 0.8,
        }
    }

    /// Clamp a segment-mode speed to the saturation bounds
    ///
    /// Never panics; with inverted bounds the upper bound wins.
    #[inline]
    pub fn saturate(&self, speed_cm_s: f32) -> f32 {
        speed_cm_s.max(self.min_speed_cm_s).min(self.max_speed_cm_s)
    }

    /// Check bounds and gains against the drivetrain limits
    pub fn validate(&self, geometry: &RobotGeometry) -> Result<()> {
        for (name, speed) in [
            ("base_speed", self.base_speed),
            ("reverse_speed", self.reverse_speed),
            ("turn_speed", self.turn_speed),
        ] {
            if speed < 0 || speed > geometry.max_motor_units {
                return Err(Error::Config(format!(
                    "control.{} must be within 0..={}, got {}",
                    name, geometry.max_motor_units, speed
                )));
            }
        }

        // Escape phases only end once their budget is used up
        for (name, speed) in [
            ("reverse_speed", self.reverse_speed),
            ("turn_speed", self.turn_speed),
        ] {
            if speed == 0 {
                return Err(Error::Config(format!(
                    "control.{} must be positive so escape maneuvers finish",
                    name
                )));
            }
        }

        if !(self.min_speed_cm_s.is_finite() && self.min_speed_cm_s > 0.0) {
            return Err(Error::Config(format!(
                "control.min_speed_cm_s must be positive, got {}",
                self.min_speed_cm_s
            )));
        }
        if !(self.max_speed_cm_s.is_finite() && self.max_speed_cm_s >= self.min_speed_cm_s) {
            return Err(Error::Config(format!(
                "control.max_speed_cm_s ({}) must be >= min_speed_cm_s ({})",
                self.max_speed_cm_s, self.min_speed_cm_s
            )));
        }

        for (name, gain) in [
            ("kp_distance", self.kp_distance),
            ("kp_heading", self.kp_heading),
        ] {
            if !(gain.is_finite() && gain >= 0.0) {
                return Err(Error::Config(format!(
                    "control.{} must be non-negative, got {}",
                    name, gain
                )));
            }
        }
        Ok(())
    }
}

// ============================================================================
// Roam configuration
// ============================================================================

/// Thresholds and open-loop maneuver budgets for roaming
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RoamConfig {
    /// Control cycle period (ms, 0 = run as fast as the loop allows)
    pub sample_period_ms: u64,
    /// Calibrated reading above which a line sensor sees no floor
    pub edge_threshold: u16,
    /// Maneuvers without forward progress before the corner escape
    pub stuck_limit: u32,
    /// Uninterrupted forward travel that clears the stuck counter (cm)
    pub progress_reset_cm: f32,
    /// Single-side contact: reverse distance (cm)
    pub side_reverse_cm: f32,
    /// Single-side contact: pivot angle away from the contact (deg)
    pub side_turn_deg: f32,
    /// Both-side contact: reverse distance (cm)
    pub both_reverse_cm: f32,
    /// Both-side contact: pivot angle (deg)
    pub both_turn_deg: f32,
    /// Corner escape: reverse distance (cm)
    pub corner_reverse_cm: f32,
    /// Corner escape: pivot angle (deg)
    pub corner_turn_deg: f32,
    /// Floor edge: reverse distance (cm)
    pub edge_reverse_cm: f32,
    /// Floor edge: pivot angle per triggering sensor, leftmost to rightmost (deg)
    pub edge_turn_deg: [f32; 5],
}

impl Default for RoamConfig {
    fn default() -> Self {
        Self {
            sample_period_ms: 10,
            edge_threshold: 650,
            stuck_limit: 3,
            progress_reset_cm: 56.0,
            side_reverse_cm: 2.8,
            side_turn_deg: 35.0,
            both_reverse_cm: 5.6,
            both_turn_deg: 90.0,
            corner_reverse_cm: 5.6,
            corner_turn_deg: 180.0,
            edge_reverse_cm: 16.8,
            edge_turn_deg: [130.0, 110.0, 90.0, 110.0, 130.0],
        }
    }
}

impl RoamConfig {
    /// Control cycle period
    pub fn sample_period(&self) -> Duration {
        Duration::from_millis(self.sample_period_ms)
    }

    /// Check that every budget terminates
    pub fn validate(&self) -> Result<()> {
        if self.stuck_limit == 0 {
            return Err(Error::Config("roam.stuck_limit must be at least 1".into()));
        }

        let budgets = [
            ("progress_reset_cm", self.progress_reset_cm),
            ("side_reverse_cm", self.side_reverse_cm),
            ("side_turn_deg", self.side_turn_deg),
            ("both_reverse_cm", self.both_reverse_cm),
            ("both_turn_deg", self.both_turn_deg),
            ("corner_reverse_cm", self.corner_reverse_cm),
            ("corner_turn_deg", self.corner_turn_deg),
            ("edge_reverse_cm", self.edge_reverse_cm),
        ];
        for (name, value) in budgets.into_iter().chain(
            self.edge_turn_deg
                .iter()
                .map(|&v| ("edge_turn_deg", v)),
        ) {
            if !(value.is_finite() && value > 0.0) {
                return Err(Error::Config(format!(
                    "roam.{} must be positive, got {}",
                    name, value
                )));
            }
        }
        Ok(())
    }
}

// ============================================================================
// Segment configuration
// ============================================================================

/// Timing for the segment path controller
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SegmentConfig {
    /// Odometry sampling period (ms, 0 = run as fast as the loop allows)
    pub sample_period_ms: u64,
    /// Safety countdown before the wheels move (ms)
    pub countdown_ms: u64,
    /// Heading error accepted as "turn complete" (deg)
    pub turn_tolerance_deg: f32,
}

impl Default for SegmentConfig {
    fn default() -> Self {
        Self {
            sample_period_ms: 20,
            countdown_ms: 3000,
            turn_tolerance_deg: 2.0,
        }
    }
}

impl SegmentConfig {
    pub fn sample_period(&self) -> Duration {
        Duration::from_millis(self.sample_period_ms)
    }

    pub fn countdown(&self) -> Duration {
        Duration::from_millis(self.countdown_ms)
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.turn_tolerance_deg.is_finite() && self.turn_tolerance_deg > 0.0) {
            return Err(Error::Config(format!(
                "segment.turn_tolerance_deg must be positive, got {}",
                self.turn_tolerance_deg
            )));
        }
        Ok(())
    }
}

/// Operator route as stored on disk
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CircuitConfig {
    #[serde(default = "default_segments")]
    pub segments: Vec<PathSegment>,
}

fn default_segments() -> Vec<PathSegment> {
    vec![PathSegment::straight(100.0)]
}

impl Default for CircuitConfig {
    fn default() -> Self {
        Self {
            segments: default_segments(),
        }
    }
}

impl CircuitConfig {
    /// Validate and freeze into a [`Circuit`]
    pub fn to_circuit(&self) -> Result<Circuit> {
        Circuit::new(self.segments.clone())
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Config {
    /// Load and validate configuration from a TOML file
    ///
    /// # Example
    /// ```no_run
    /// use gati_drive::config::Config;
    ///
    /// let config = Config::load("gati.toml")?;
    /// # Ok::<(), gati_drive::Error>(())
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Parse and validate configuration from TOML text
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let contents = toml::to_string_pretty(self)?;
        fs::write(path, contents)?;
        Ok(())
    }

    /// Validate every section
    pub fn validate(&self) -> Result<()> {
        self.robot.validate()?;
        self.control.validate(&self.robot)?;
        self.roam.validate()?;
        self.segment.validate()?;
        self.circuit.to_circuit()?;
        Ok(())
    }
}
