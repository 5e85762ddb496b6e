use serde::{Deserialize, Serialize};
use std::fmt;

/// Travel direction of an agent. An idle bridge has no direction, which the
/// gate models as `Option<Direction>::None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Northbound,
    Southbound,
}

impl Direction {
    pub const ALL: [Direction; 2] = [Direction::Northbound, Direction::Southbound];

    pub fn opposite(self) -> Self {
        match self {
            Direction::Northbound => Direction::Southbound,
            Direction::Southbound => Direction::Northbound,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Northbound => write!(f, "Northbound"),
            Direction::Southbound => write!(f, "Southbound"),
        }
    }
}

/// A pair of counters, one per direction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectionTally {
    pub north: usize,
    pub south: usize,
}

impl DirectionTally {
    pub fn get(&self, direction: Direction) -> usize {
        match direction {
            Direction::Northbound => self.north,
            Direction::Southbound => self.south,
        }
    }

    pub fn get_mut(&mut self, direction: Direction) -> &mut usize {
        match direction {
            Direction::Northbound => &mut self.north,
            Direction::Southbound => &mut self.south,
        }
    }

    pub fn total(&self) -> usize {
        self.north + self.south
    }
}
