//! Simulated differential-drive robot for hardware-free runs
//!
//! [`SimulatedRobot`] implements every collaborator trait in
//! [`crate::core::hardware`], so it can be handed to any runner in place of a
//! real robot.
//!
//! | Component | Simulation Method |
//! |-----------|-------------------|
//! | Wheels / encoders | Differential drive kinematics + slip noise |
//! | Contact switches | Two bumper arcs sampled against box obstacles |
//! | Reflectance array | Floor lookup under five sensor points |
//!
//! # Time model
//!
//! There is no simulation thread. Each call to
//! [`EncoderSource::read_and_reset_deltas`] advances the world by one fixed
//! `time_step_ms` at the current wheel speeds, so simulated time follows the
//! controller's cycle count rather than the wall clock, and tests can run
//! with a zero sample period.
//!
//! # Test hooks
//!
//! - [`SimulatedRobot::force_contact`]: hold the bumpers in a given state
//! - [`SimulatedRobot::fail_contact_reads`] / [`SimulatedRobot::fail_line_reads`]:
//!   make the next N reads return a sensor transient
//! - [`SimulatedRobot::inject_encoder_ticks`]: add a raw tick burst, e.g. to
//!   push a counter past the 16-bit range

pub mod config;
pub mod encoder_sim;
pub mod noise;
pub mod physics;
pub mod sensor_sim;
pub mod world;

pub use config::SimConfig;
pub use world::{Rect, World};

use crate::config::RobotGeometry;
use crate::core::hardware::{ContactSensors, EncoderSource, MotionActuator, ReflectanceArray};
use crate::core::types::{ContactReading, EncoderDelta, LINE_SENSOR_COUNT};
use crate::error::{Error, Result};
use encoder_sim::EncoderSimulator;
use noise::NoiseGenerator;
use physics::{CollisionMode, PhysicsState};
use sensor_sim::{ContactSimulator, LineArraySimulator};
use std::time::Duration;

/// True pose of the simulated chassis
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimPose {
    pub x_cm: f32,
    pub y_cm: f32,
    /// CCW from +X, in [-180, 180)
    pub heading_deg: f32,
}

/// Simulated robot implementing [`crate::core::hardware::RobotHardware`]
pub struct SimulatedRobot {
    geometry: RobotGeometry,
    config: SimConfig,
    world: World,
    physics: PhysicsState,
    encoders: EncoderSimulator,
    contacts: ContactSimulator,
    line_array: LineArraySimulator,
    noise: NoiseGenerator,

    /// Commanded wheel speeds (motor units)
    speeds: (i16, i16),
    calibrated: bool,
    elapsed: Duration,
    collisions: u64,

    forced_contact: Option<ContactReading>,
    contact_faults: u32,
    line_faults: u32,
}

impl SimulatedRobot {
    /// Build a robot at the configured start pose
    pub fn new(geometry: RobotGeometry, config: SimConfig) -> Result<Self> {
        geometry.validate()?;
        config.validate()?;

        let world = World::from_config(&config);
        let physics = PhysicsState::new(
            config.start_x_cm,
            config.start_y_cm,
            config.start_heading_deg.to_radians(),
            config.robot_radius_cm,
            CollisionMode::from_config(&config.collision_mode),
        );
        if physics.check_collision(physics.x(), physics.y(), &world) {
            return Err(Error::Config(format!(
                "simulation start ({:.1}, {:.1}) overlaps an obstacle",
                config.start_x_cm, config.start_y_cm
            )));
        }

        log::info!(
            "SimulatedRobot: Start ({:.1}, {:.1}) cm, {:.0}°, {} obstacles, step {}ms, seed {}",
            config.start_x_cm,
            config.start_y_cm,
            config.start_heading_deg,
            config.obstacles.len(),
            config.time_step_ms,
            config.random_seed
        );

        Ok(Self {
            encoders: EncoderSimulator::new(&config.noise, 1.0 / geometry.cm_per_tick()),
            contacts: ContactSimulator::new(&config.contacts),
            line_array: LineArraySimulator::new(&config.line_array),
            noise: NoiseGenerator::new(config.random_seed),
            geometry,
            world,
            physics,
            config,
            speeds: (0, 0),
            calibrated: false,
            elapsed: Duration::ZERO,
            collisions: 0,
            forced_contact: None,
            contact_faults: 0,
            line_faults: 0,
        })
    }

    /// Ground-truth pose
    pub fn pose(&self) -> SimPose {
        SimPose {
            x_cm: self.physics.x(),
            y_cm: self.physics.y(),
            heading_deg: self.physics.theta().to_degrees(),
        }
    }

    /// Teleport the chassis (heading in degrees)
    pub fn set_pose(&mut self, x_cm: f32, y_cm: f32, heading_deg: f32) {
        self.physics.set_pose(x_cm, y_cm, heading_deg.to_radians());
    }

    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    /// Last wheel command received
    pub fn wheel_speeds(&self) -> (i16, i16) {
        self.speeds
    }

    /// Simulated time since construction
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// Steps in which translation was blocked by an obstacle
    pub fn collisions(&self) -> u64 {
        self.collisions
    }

    /// Encoder reads that discarded an overflowed counter
    pub fn overflow_resets(&self) -> u64 {
        self.encoders.overflow_resets()
    }

    /// Hold the bumpers at `reading` (`None` returns to world-driven contacts)
    pub fn force_contact(&mut self, reading: Option<ContactReading>) {
        self.forced_contact = reading;
    }

    /// Make the next `n` contact reads fail
    pub fn fail_contact_reads(&mut self, n: u32) {
        self.contact_faults = n;
    }

    /// Make the next `n` reflectance reads fail
    pub fn fail_line_reads(&mut self, n: u32) {
        self.line_faults = n;
    }

    /// Add raw ticks to the hardware counters
    pub fn inject_encoder_ticks(&mut self, left: i32, right: i32) {
        self.encoders.inject(left, right);
    }

    /// Advance the world by one time step at the current wheel speeds
    fn advance(&mut self) {
        let dt = Duration::from_millis(self.config.time_step_ms);
        let dt_s = dt.as_secs_f32();
        let per_unit = 1.0 / self.geometry.motor_units_per_cm_s;

        let left_cm = self.speeds.0 as f32 * per_unit * dt_s;
        let right_cm = self.speeds.1 as f32 * per_unit * dt_s;

        if self
            .physics
            .update(left_cm, right_cm, self.geometry.wheel_base_cm, &self.world)
        {
            self.collisions += 1;
        }
        // Wheels turn (and count) even when pushing against an obstacle
        self.encoders.update(left_cm, right_cm, &mut self.noise);
        self.elapsed += dt;
    }
}

impl MotionActuator for SimulatedRobot {
    fn set_wheel_speeds(&mut self, left: i16, right: i16) {
        let limit = self.geometry.max_motor_units;
        self.speeds = (left.clamp(-limit, limit), right.clamp(-limit, limit));
    }
}

impl EncoderSource for SimulatedRobot {
    fn read_and_reset_deltas(&mut self) -> EncoderDelta {
        self.advance();
        self.encoders.read_and_reset()
    }
}

impl ContactSensors for SimulatedRobot {
    fn read(&mut self) -> Result<ContactReading> {
        if self.contact_faults > 0 {
            self.contact_faults -= 1;
            return Err(Error::SensorRead("contact switches"));
        }
        if let Some(forced) = self.forced_contact {
            return Ok(forced);
        }
        Ok(self.contacts.check(
            &self.world,
            self.physics.x(),
            self.physics.y(),
            self.physics.theta(),
            self.physics.robot_radius(),
        ))
    }
}

impl ReflectanceArray for SimulatedRobot {
    fn calibrate(&mut self) -> Result<()> {
        self.calibrated = true;
        Ok(())
    }

    fn is_calibrated(&self) -> bool {
        self.calibrated
    }

    fn read_calibrated(&mut self) -> Result<[u16; LINE_SENSOR_COUNT]> {
        if !self.calibrated {
            return Err(Error::SensorRead("reflectance array not calibrated"));
        }
        if self.line_faults > 0 {
            self.line_faults -= 1;
            return Err(Error::SensorRead("reflectance array"));
        }
        Ok(self.line_array.read(
            &self.world,
            self.physics.x(),
            self.physics.y(),
            self.physics.theta(),
            self.config.noise.reflectance_stddev,
            &mut self.noise,
        ))
    }
}
