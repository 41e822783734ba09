//! Dead-reckoning odometry from wheel encoder deltas
//!
//! [`integrate`] is a pure conversion from one [`EncoderDelta`] to a
//! [`PoseIncrement`] using differential drive kinematics:
//!
//! ```text
//! distance = (d_left + d_right) / 2
//! heading  = (d_right - d_left) / wheel_base     (positive = CCW)
//! ```
//!
//! [`OdometryIntegrator`] wraps it with a running total for the controller
//! that currently owns the encoders.

use crate::config::RobotGeometry;
use crate::core::types::{AccumulatedPose, EncoderDelta, PoseIncrement};
use std::time::{Duration, Instant};

/// Convert one encoder delta into chassis motion
pub fn integrate(delta: EncoderDelta, geometry: &RobotGeometry) -> PoseIncrement {
    let left_cm = geometry.ticks_to_cm(delta.left_ticks);
    let right_cm = geometry.ticks_to_cm(delta.right_ticks);

    let distance_cm = (left_cm + right_cm) / 2.0;
    let heading_rad = (right_cm - left_cm) / geometry.wheel_base_cm;

    PoseIncrement {
        distance_cm,
        heading_delta_deg: heading_rad.to_degrees(),
    }
}

/// Odometry integrator with a running total
pub struct OdometryIntegrator {
    geometry: RobotGeometry,

    /// Totals since the last reset
    totals: AccumulatedPose,

    /// Last debug log time (for throttling)
    last_log: Option<Instant>,
}

impl OdometryIntegrator {
    /// Create a new integrator with zeroed totals
    pub fn new(geometry: RobotGeometry) -> Self {
        log::debug!(
            "OdometryIntegrator: Initialized with wheel_base={:.2}cm, {:.4}cm/tick",
            geometry.wheel_base_cm,
            geometry.cm_per_tick()
        );

        Self {
            geometry,
            totals: AccumulatedPose::default(),
            last_log: None,
        }
    }

    /// Geometry used for conversion
    pub fn geometry(&self) -> &RobotGeometry {
        &self.geometry
    }

    /// Convert a delta without touching the totals
    #[inline]
    pub fn integrate(&self, delta: EncoderDelta) -> PoseIncrement {
        integrate(delta, &self.geometry)
    }

    /// Convert a delta and add it to the totals
    pub fn update(&mut self, delta: EncoderDelta) -> PoseIncrement {
        let increment = self.integrate(delta);
        self.totals.accumulate(increment);

        let should_log = match self.last_log {
            Some(last) => last.elapsed() >= Duration::from_secs(1),
            None => true,
        };
        if should_log && !delta.is_zero() {
            log::debug!(
                "OdometryIntegrator: ΔL={}, ΔR={} -> total {:.1}cm, {:.1}°",
                delta.left_ticks,
                delta.right_ticks,
                self.totals.total_distance_cm,
                self.totals.heading_deg
            );
            self.last_log = Some(Instant::now());
        }

        increment
    }

    /// Totals since the last reset
    pub fn totals(&self) -> AccumulatedPose {
        self.totals
    }

    /// Zero the totals
    pub fn reset(&mut self) {
        self.totals.reset();
    }
}
