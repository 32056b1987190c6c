use serde::Deserialize;
use std::fmt;

/// Upper bound (exclusive) of a client heading value.
pub const MAX_HEADING: i32 = 61794;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
pub struct Location {
    pub x: i32,
    pub y: i32,
    pub z: i32,
    #[serde(default = "random_heading")]
    pub heading: i32,
}

fn random_heading() -> i32 {
    -1
}

impl Location {
    pub fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z, heading: 0 }
    }

    pub fn with_heading(self, heading: i32) -> Self {
        Self { heading, ..self }
    }

    pub fn has_random_heading(&self) -> bool {
        self.heading == -1
    }

    /// Spawns placed at the map origin carry no usable coordinates.
    pub fn is_unset(&self) -> bool {
        self.x == 0 && self.y == 0
    }

    pub fn distance_2d(&self, other: &Location) -> f64 {
        let dx = f64::from(self.x - other.x);
        let dy = f64::from(self.y - other.y);
        (dx * dx + dy * dy).sqrt()
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}
