// SPDX-License-Identifier: Apache-2.0

use std::fmt;
use std::str::FromStr;

/// Data direction of a port as declared by its entity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Direction {
    In,
    Out,
    InOut,
}

impl Direction {
    /// Returns the opposite direction. `InOut` is its own opposite.
    pub fn flip(&self) -> Direction {
        match self {
            Direction::In => Direction::Out,
            Direction::Out => Direction::In,
            Direction::InOut => Direction::InOut,
        }
    }

    /// Whether a port of this direction can be wired to a port of direction
    /// `other` on the same hierarchy level.
    pub(crate) fn compatible_with(&self, other: &Direction) -> bool {
        matches!(
            (self, other),
            (Direction::InOut, _)
                | (_, Direction::InOut)
                | (Direction::In, Direction::Out)
                | (Direction::Out, Direction::In)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::In => "in",
            Direction::Out => "out",
            Direction::InOut => "inout",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Direction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "in" => Ok(Direction::In),
            "out" => Ok(Direction::Out),
            "inout" => Ok(Direction::InOut),
            other => Err(format!("unknown direction '{other}'")),
        }
    }
}
