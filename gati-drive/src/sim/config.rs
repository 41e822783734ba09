//! Simulated robot configuration
//!
//! Every parameter has a default, so an empty `[simulation]` section gives a
//! 200 x 150 cm table top with no obstacles and light wheel slip.
//!
//! ```text
//! SimConfig
//! ├── random_seed, time_step_ms          # Simulation control
//! ├── start_x_cm / start_y_cm / start_heading_deg
//! ├── robot_radius_cm, collision_mode
//! ├── ArenaConfig                        # Table top, outside = no floor
//! ├── Vec<ObstacleConfig>                # Axis-aligned boxes (bumpers)
//! ├── LineArrayConfig                    # Reflectance sensor placement/levels
//! ├── ContactConfig                      # Bumper arcs
//! └── SimNoiseConfig                     # Wheel slip, reflectance noise
//! ```

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Encoder and sensor noise
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SimNoiseConfig {
    /// Wheel slip standard deviation (multiplicative, 0.0-1.0)
    #[serde(default = "default_slip_stddev")]
    pub slip_stddev: f32,

    /// Systematic slip bias (multiplicative)
    #[serde(default)]
    pub slip_bias: f32,

    /// Enable quantization noise (±0.5 tick jitter)
    #[serde(default)]
    pub quantization_noise: bool,

    /// Reflectance reading standard deviation (calibrated units)
    #[serde(default = "default_reflectance_stddev")]
    pub reflectance_stddev: f32,
}

fn default_slip_stddev() -> f32 {
    0.002
}
fn default_reflectance_stddev() -> f32 {
    10.0
}

impl Default for SimNoiseConfig {
    fn default() -> Self {
        Self {
            slip_stddev: default_slip_stddev(),
            slip_bias: 0.0,
            quantization_noise: false,
            reflectance_stddev: default_reflectance_stddev(),
        }
    }
}

/// Table-top floor; anything outside reads as "no floor"
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ArenaConfig {
    /// Floor width along +X from the origin (cm)
    #[serde(default = "default_arena_width")]
    pub width_cm: f32,

    /// Floor depth along +Y from the origin (cm)
    #[serde(default = "default_arena_height")]
    pub height_cm: f32,

    /// When false the floor is unbounded and no edge is ever seen
    #[serde(default = "default_true")]
    pub bounded: bool,
}

fn default_arena_width() -> f32 {
    200.0
}
fn default_arena_height() -> f32 {
    150.0
}
fn default_true() -> bool {
    true
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self {
            width_cm: default_arena_width(),
            height_cm: default_arena_height(),
            bounded: true,
        }
    }
}

/// Axis-aligned box obstacle (cm)
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct ObstacleConfig {
    pub x_min: f32,
    pub y_min: f32,
    pub x_max: f32,
    pub y_max: f32,
}

/// Reflectance array placement and levels
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LineArrayConfig {
    /// Distance of the array ahead of the axle (cm)
    #[serde(default = "default_forward_offset")]
    pub forward_offset_cm: f32,

    /// Lateral spacing between neighbouring sensors (cm)
    #[serde(default = "default_sensor_spacing")]
    pub spacing_cm: f32,

    /// Calibrated reading over floor
    #[serde(default = "default_floor_reading")]
    pub floor_reading: u16,

    /// Calibrated reading with no floor below
    #[serde(default = "default_edge_reading")]
    pub edge_reading: u16,
}

fn default_forward_offset() -> f32 {
    4.0
}
fn default_sensor_spacing() -> f32 {
    1.2
}
fn default_floor_reading() -> u16 {
    150
}
fn default_edge_reading() -> u16 {
    950
}

impl Default for LineArrayConfig {
    fn default() -> Self {
        Self {
            forward_offset_cm: default_forward_offset(),
            spacing_cm: default_sensor_spacing(),
            floor_reading: default_floor_reading(),
            edge_reading: default_edge_reading(),
        }
    }
}

/// Front bumper arcs
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ContactConfig {
    /// Extra reach beyond the body radius that closes a switch (cm)
    #[serde(default = "default_trigger_distance")]
    pub trigger_distance_cm: f32,

    /// Half-width of each bumper arc, measured from straight ahead (deg)
    #[serde(default = "default_arc_deg")]
    pub arc_deg: f32,
}

fn default_trigger_distance() -> f32 {
    0.5
}
fn default_arc_deg() -> f32 {
    70.0
}

impl Default for ContactConfig {
    fn default() -> Self {
        Self {
            trigger_distance_cm: default_trigger_distance(),
            arc_deg: default_arc_deg(),
        }
    }
}

/// Top-level simulation configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SimConfig {
    /// Random seed for reproducible noise (0 = random each run)
    #[serde(default = "default_seed")]
    pub random_seed: u64,

    /// Simulated time advanced per encoder read (ms)
    #[serde(default = "default_time_step_ms")]
    pub time_step_ms: u64,

    /// Initial robot X position (cm)
    #[serde(default = "default_start_x")]
    pub start_x_cm: f32,

    /// Initial robot Y position (cm)
    #[serde(default = "default_start_y")]
    pub start_y_cm: f32,

    /// Initial orientation (deg, CCW from +X)
    #[serde(default)]
    pub start_heading_deg: f32,

    /// Body collision radius (cm)
    #[serde(default = "default_robot_radius")]
    pub robot_radius_cm: f32,

    /// Collision behavior: "stop" or "passthrough"
    #[serde(default = "default_collision_mode")]
    pub collision_mode: String,

    #[serde(default)]
    pub arena: ArenaConfig,

    #[serde(default)]
    pub obstacles: Vec<ObstacleConfig>,

    #[serde(default)]
    pub line_array: LineArrayConfig,

    #[serde(default)]
    pub contacts: ContactConfig,

    #[serde(default)]
    pub noise: SimNoiseConfig,
}

fn default_seed() -> u64 {
    42
}
fn default_time_step_ms() -> u64 {
    10
}
fn default_start_x() -> f32 {
    100.0
}
fn default_start_y() -> f32 {
    75.0
}
fn default_robot_radius() -> f32 {
    4.8
}
fn default_collision_mode() -> String {
    "stop".to_string()
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            random_seed: default_seed(),
            time_step_ms: default_time_step_ms(),
            start_x_cm: default_start_x(),
            start_y_cm: default_start_y(),
            start_heading_deg: 0.0,
            robot_radius_cm: default_robot_radius(),
            collision_mode: default_collision_mode(),
            arena: ArenaConfig::default(),
            obstacles: Vec::new(),
            line_array: LineArrayConfig::default(),
            contacts: ContactConfig::default(),
            noise: SimNoiseConfig::default(),
        }
    }
}

impl SimConfig {
    /// Noise-free, unbounded floor; handy for exact kinematics checks
    pub fn ideal() -> Self {
        Self {
            arena: ArenaConfig {
                bounded: false,
                ..ArenaConfig::default()
            },
            noise: SimNoiseConfig {
                slip_stddev: 0.0,
                slip_bias: 0.0,
                quantization_noise: false,
                reflectance_stddev: 0.0,
            },
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.time_step_ms == 0 {
            return Err(Error::Config("simulation.time_step_ms must be positive".into()));
        }
        if !(self.robot_radius_cm.is_finite() && self.robot_radius_cm > 0.0) {
            return Err(Error::Config(format!(
                "simulation.robot_radius_cm must be positive, got {}",
                self.robot_radius_cm
            )));
        }
        if !matches!(self.collision_mode.as_str(), "stop" | "passthrough") {
            return Err(Error::Config(format!(
                "simulation.collision_mode must be \"stop\" or \"passthrough\", got {:?}",
                self.collision_mode
            )));
        }
        for (i, o) in self.obstacles.iter().enumerate() {
            if !(o.x_min < o.x_max && o.y_min < o.y_max) {
                return Err(Error::Config(format!(
                    "simulation.obstacles[{}] has an empty extent",
                    i
                )));
            }
        }
        Ok(())
    }
}
