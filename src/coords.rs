use std::collections::HashMap;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

/// Hex sides of a pointy-top tile, listed clockwise starting east.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString, Display, EnumIter,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum Direction {
    East,
    SouthEast,
    SouthWest,
    West,
    NorthWest,
    NorthEast,
}

impl Direction {
    pub const CLOCKWISE: [Direction; 6] = [
        Direction::East,
        Direction::SouthEast,
        Direction::SouthWest,
        Direction::West,
        Direction::NorthWest,
        Direction::NorthEast,
    ];

    pub fn clockwise_next(self) -> Direction {
        let idx = Self::CLOCKWISE
            .iter()
            .position(|d| *d == self)
            .unwrap_or_default();
        Self::CLOCKWISE[(idx + 1) % Self::CLOCKWISE.len()]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CubeCoord {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl CubeCoord {
    pub fn new(x: i32, y: i32, z: i32) -> Self {
        debug_assert!(x + y + z == 0, "cube coordinates must sum to zero");
        Self { x, y, z }
    }

    pub fn add(self, other: CubeCoord) -> Self {
        CubeCoord::new(self.x + other.x, self.y + other.y, self.z + other.z)
    }

    pub fn neighbor(self, direction: Direction) -> Self {
        self.add(UNIT_VECTORS[&direction])
    }

    pub fn neighbors(self) -> impl Iterator<Item = CubeCoord> {
        Direction::CLOCKWISE
            .into_iter()
            .map(move |direction| self.neighbor(direction))
    }

    pub fn distance(self, other: CubeCoord) -> i32 {
        ((self.x - other.x).abs() + (self.y - other.y).abs() + (self.z - other.z).abs()) / 2
    }
}

impl Default for CubeCoord {
    fn default() -> Self {
        CubeCoord::new(0, 0, 0)
    }
}

pub static UNIT_VECTORS: Lazy<HashMap<Direction, CubeCoord>> = Lazy::new(|| {
    use Direction::*;
    HashMap::from([
        (NorthEast, CubeCoord::new(1, 0, -1)),
        (SouthWest, CubeCoord::new(-1, 0, 1)),
        (NorthWest, CubeCoord::new(0, 1, -1)),
        (SouthEast, CubeCoord::new(0, -1, 1)),
        (East, CubeCoord::new(1, -1, 0)),
        (West, CubeCoord::new(-1, 1, 0)),
    ])
});

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn consecutive_directions_are_mutual_neighbors() {
        let origin = CubeCoord::default();
        for direction in Direction::CLOCKWISE {
            let a = origin.neighbor(direction);
            let b = origin.neighbor(direction.clockwise_next());
            assert_eq!(a.distance(b), 1, "{direction} and its successor");
        }
    }

    #[test]
    fn neighbors_are_at_distance_one() {
        let center = CubeCoord::new(1, -1, 0);
        assert_eq!(center.neighbors().count(), 6);
        assert!(center.neighbors().all(|n| n.distance(center) == 1));
    }
}
