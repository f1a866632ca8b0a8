//! The six axis-aligned directions between face-adjacent voxels.

use std::fmt;

use crate::pos::BlockPos;

/// An axis-aligned unit step. Ordinals are stable and used as face-mask bits.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Direction {
    /// -y
    Down = 0,
    /// +y
    Up = 1,
    /// -z
    North = 2,
    /// +z
    South = 3,
    /// -x
    West = 4,
    /// +x
    East = 5,
}

impl Direction {
    /// All six directions in ordinal order.
    pub const ALL: [Direction; 6] = [
        Direction::Down,
        Direction::Up,
        Direction::North,
        Direction::South,
        Direction::West,
        Direction::East,
    ];

    /// The direction pointing the other way.
    pub const fn opposite(self) -> Self {
        match self {
            Direction::Down => Direction::Up,
            Direction::Up => Direction::Down,
            Direction::North => Direction::South,
            Direction::South => Direction::North,
            Direction::West => Direction::East,
            Direction::East => Direction::West,
        }
    }

    /// Unit offset `(dx, dy, dz)`.
    pub const fn step(self) -> (i32, i32, i32) {
        match self {
            Direction::Down => (0, -1, 0),
            Direction::Up => (0, 1, 0),
            Direction::North => (0, 0, -1),
            Direction::South => (0, 0, 1),
            Direction::West => (-1, 0, 0),
            Direction::East => (1, 0, 0),
        }
    }

    /// Stable index in `0..6`.
    pub const fn ordinal(self) -> usize {
        self as usize
    }

    /// Direction of travel from `from` to a face-adjacent `to`.
    ///
    /// Returns `None` unless the two positions differ by exactly one unit on
    /// exactly one axis.
    pub fn between(from: BlockPos, to: BlockPos) -> Option<Self> {
        let delta = (
            (to.x - from.x).signum(),
            (to.y - from.y).signum(),
            (to.z - from.z).signum(),
        );
        let dir = match delta {
            (0, -1, 0) => Direction::Down,
            (0, 1, 0) => Direction::Up,
            (0, 0, -1) => Direction::North,
            (0, 0, 1) => Direction::South,
            (-1, 0, 0) => Direction::West,
            (1, 0, 0) => Direction::East,
            _ => return None,
        };
        (from.offset(dir) == to).then_some(dir)
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Direction::Down => "down",
            Direction::Up => "up",
            Direction::North => "north",
            Direction::South => "south",
            Direction::West => "west",
            Direction::East => "east",
        };
        f.write_str(name)
    }
}
