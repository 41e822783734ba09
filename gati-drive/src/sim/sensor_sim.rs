//! Bumper and reflectance array simulation

use super::config::{ContactConfig, LineArrayConfig};
use super::noise::NoiseGenerator;
use super::world::World;
use crate::core::types::{ContactReading, LINE_SENSOR_COUNT, REFLECTANCE_MAX};

/// Bumper simulator using two angular zones either side of straight ahead
pub struct ContactSimulator {
    config: ContactConfig,
}

impl ContactSimulator {
    pub fn new(config: &ContactConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }

    /// Sample both arcs just outside the body circle
    pub fn check(&self, world: &World, x: f32, y: f32, theta: f32, robot_radius: f32) -> ContactReading {
        let reach = robot_radius + self.config.trigger_distance_cm;
        let arc = self.config.arc_deg.to_radians();
        let num_samples = 16;

        let zone_hit = |start: f32, end: f32| {
            (0..=num_samples).any(|i| {
                let local = start + (i as f32 / num_samples as f32) * (end - start);
                let world_angle = theta + local;
                world.is_occupied(x + reach * world_angle.cos(), y + reach * world_angle.sin())
            })
        };

        // Left is counter-clockwise of the heading
        ContactReading {
            left: zone_hit(0.0, arc),
            right: zone_hit(-arc, 0.0),
        }
    }
}

/// Downward reflectance array simulator
pub struct LineArraySimulator {
    config: LineArrayConfig,
}

impl LineArraySimulator {
    pub fn new(config: &LineArrayConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }

    /// Sensor positions in the robot frame, leftmost first
    pub fn sensor_offsets(&self) -> [(f32, f32); LINE_SENSOR_COUNT] {
        let s = self.config.spacing_cm;
        let fwd = self.config.forward_offset_cm;
        [(fwd, 2.0 * s), (fwd, s), (fwd, 0.0), (fwd, -s), (fwd, -2.0 * s)]
    }

    /// Calibrated readings at the current pose
    pub fn read(
        &self,
        world: &World,
        x: f32,
        y: f32,
        theta: f32,
        stddev: f32,
        noise: &mut NoiseGenerator,
    ) -> [u16; LINE_SENSOR_COUNT] {
        let (sin_t, cos_t) = theta.sin_cos();
        let mut values = [0u16; LINE_SENSOR_COUNT];

        for (value, (sx, sy)) in values.iter_mut().zip(self.sensor_offsets()) {
            let wx = x + sx * cos_t - sy * sin_t;
            let wy = y + sx * sin_t + sy * cos_t;
            let base = if world.has_floor(wx, wy) {
                self.config.floor_reading
            } else {
                self.config.edge_reading
            };
            let noisy = base as f32 + noise.gaussian(stddev);
            *value = noisy.round().clamp(0.0, REFLECTANCE_MAX as f32) as u16;
        }
        values
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::world::Rect;

    #[test]
    fn test_bumper_sides() {
        let sim = ContactSimulator::new(&ContactConfig::default());
        // Obstacle ahead and to the left
        let world = World::new(None, vec![Rect::new(2.0, 3.0, 10.0, 10.0)]);
        let reading = sim.check(&world, 0.0, 0.0, 0.0, 4.8);
        assert!(reading.left);
        assert!(!reading.right);

        // Wall straight ahead closes both
        let world = World::new(None, vec![Rect::new(5.0, -20.0, 8.0, 20.0)]);
        let reading = sim.check(&world, 0.0, 0.0, 0.0, 4.8);
        assert!(reading.left && reading.right);
    }

    #[test]
    fn test_line_array_sees_edge() {
        let sim = LineArraySimulator::new(&LineArrayConfig::default());
        let mut noise = NoiseGenerator::new(1);
        let world = World::new(Some(Rect::new(0.0, 0.0, 100.0, 100.0)), vec![]);

        let on_floor = sim.read(&world, 50.0, 50.0, 0.0, 0.0, &mut noise);
        assert_eq!(on_floor, [150; LINE_SENSOR_COUNT]);

        // Array hangs over the right-hand edge
        let over = sim.read(&world, 98.0, 50.0, 0.0, 0.0, &mut noise);
        assert_eq!(over, [950; LINE_SENSOR_COUNT]);
    }
}
