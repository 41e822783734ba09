//! Differential-drive kinematics and collision handling (cm, rad)

use super::world::World;
use std::f32::consts::{PI, TAU};

/// Collision handling mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollisionMode {
    /// Translation into an obstacle is refused; rotation still applies
    Stop,
    /// Obstacles are ignored for motion (bumpers still fire)
    Passthrough,
}

impl CollisionMode {
    /// Parse collision mode from config string
    pub fn from_config(mode: &str) -> Self {
        match mode {
            "passthrough" => Self::Passthrough,
            _ => Self::Stop,
        }
    }
}

/// Chassis pose in the world frame
#[derive(Debug, Clone)]
pub struct PhysicsState {
    /// X position (cm)
    x: f32,
    /// Y position (cm)
    y: f32,
    /// Orientation (rad, CCW from +X)
    theta: f32,
    collision_mode: CollisionMode,
    robot_radius: f32,
}

impl PhysicsState {
    pub fn new(x: f32, y: f32, theta: f32, robot_radius: f32, collision_mode: CollisionMode) -> Self {
        Self {
            x,
            y,
            theta: normalize_angle(theta),
            collision_mode,
            robot_radius,
        }
    }

    #[inline]
    pub fn x(&self) -> f32 {
        self.x
    }

    #[inline]
    pub fn y(&self) -> f32 {
        self.y
    }

    #[inline]
    pub fn theta(&self) -> f32 {
        self.theta
    }

    pub fn robot_radius(&self) -> f32 {
        self.robot_radius
    }

    /// Teleport (test hook)
    pub fn set_pose(&mut self, x: f32, y: f32, theta: f32) {
        self.x = x;
        self.y = y;
        self.theta = normalize_angle(theta);
    }

    /// Apply one step of wheel travel
    ///
    /// Returns true if translation was blocked by an obstacle.
    pub fn update(&mut self, left_cm: f32, right_cm: f32, wheel_base_cm: f32, world: &World) -> bool {
        let distance = (left_cm + right_cm) / 2.0;
        let dtheta = (right_cm - left_cm) / wheel_base_cm;

        let (new_x, new_y) = if dtheta.abs() < 1e-6 {
            (
                self.x + distance * self.theta.cos(),
                self.y + distance * self.theta.sin(),
            )
        } else {
            // Arc motion
            let r = distance / dtheta;
            let new_theta = self.theta + dtheta;
            (
                self.x + r * (new_theta.sin() - self.theta.sin()),
                self.y + r * (self.theta.cos() - new_theta.cos()),
            )
        };
        let new_theta = normalize_angle(self.theta + dtheta);

        let blocked = self.collision_mode == CollisionMode::Stop
            && distance.abs() > 0.0
            && self.check_collision(new_x, new_y, world);

        if !blocked {
            self.x = new_x;
            self.y = new_y;
        }
        self.theta = new_theta;
        blocked
    }

    /// True if the body circle at (x, y) overlaps an obstacle
    pub fn check_collision(&self, x: f32, y: f32, world: &World) -> bool {
        let num_checks = 16;
        for i in 0..num_checks {
            let angle = (i as f32 / num_checks as f32) * TAU;
            if world.is_occupied(
                x + self.robot_radius * angle.cos(),
                y + self.robot_radius * angle.sin(),
            ) {
                return true;
            }
        }
        world.is_occupied(x, y)
    }
}

/// Normalize angle to [-π, π)
pub fn normalize_angle(angle: f32) -> f32 {
    let mut a = angle % TAU;
    if a >= PI {
        a -= TAU;
    } else if a < -PI {
        a += TAU;
    }
    a
}
