//! Static simulation world: table-top floor plus box obstacles (cm)

use super::config::{ObstacleConfig, SimConfig};

/// Axis-aligned rectangle
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x_min: f32,
    pub y_min: f32,
    pub x_max: f32,
    pub y_max: f32,
}

impl Rect {
    pub fn new(x_min: f32, y_min: f32, x_max: f32, y_max: f32) -> Self {
        Self {
            x_min,
            y_min,
            x_max,
            y_max,
        }
    }

    #[inline]
    pub fn contains(&self, x: f32, y: f32) -> bool {
        x >= self.x_min && x <= self.x_max && y >= self.y_min && y <= self.y_max
    }
}

impl From<ObstacleConfig> for Rect {
    fn from(o: ObstacleConfig) -> Self {
        Rect::new(o.x_min, o.y_min, o.x_max, o.y_max)
    }
}

/// Floor extent and obstacles
#[derive(Debug, Clone, Default)]
pub struct World {
    /// `None` = floor everywhere
    floor: Option<Rect>,
    obstacles: Vec<Rect>,
}

impl World {
    pub fn new(floor: Option<Rect>, obstacles: Vec<Rect>) -> Self {
        Self { floor, obstacles }
    }

    pub fn from_config(config: &SimConfig) -> Self {
        let floor = config
            .arena
            .bounded
            .then(|| Rect::new(0.0, 0.0, config.arena.width_cm, config.arena.height_cm));
        let obstacles = config.obstacles.iter().copied().map(Rect::from).collect();
        Self::new(floor, obstacles)
    }

    /// Add an obstacle after construction
    pub fn add_obstacle(&mut self, rect: Rect) {
        self.obstacles.push(rect);
    }

    /// True if a solid obstacle occupies the point
    pub fn is_occupied(&self, x: f32, y: f32) -> bool {
        self.obstacles.iter().any(|o| o.contains(x, y))
    }

    /// True if there is floor under the point
    pub fn has_floor(&self, x: f32, y: f32) -> bool {
        self.floor.map_or(true, |f| f.contains(x, y))
    }
}
