use std::fmt;

/// Unique identifier for any entity tracked in the arena.
///
/// Ids are arena indices; they are allocated monotonically within an episode
/// and never reused, so a stale id can be detected by the `alive` flag on the
/// entity it points at.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EntityId(pub u32);

impl EntityId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Discrete grid position expressed in tile coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    /// Sentinel for entities that are not on the grid (garrisoned or dead).
    pub const OFF_GRID: Self = Self { x: -1, y: -1 };

    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    #[inline]
    pub fn is_off_grid(self) -> bool {
        self == Self::OFF_GRID
    }

    pub fn offset(self, dx: i32, dy: i32) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }

    pub fn step(self, direction: Direction) -> Self {
        let (dx, dy) = direction.delta();
        self.offset(dx, dy)
    }

    /// Manhattan distance; trade profit and dropoff proximity use this.
    pub fn manhattan(self, other: Self) -> u32 {
        self.x.abs_diff(other.x) + self.y.abs_diff(other.y)
    }

    /// Chessboard distance; attack ranges and the observation window use this.
    pub fn chebyshev(self, other: Self) -> u32 {
        self.x.abs_diff(other.x).max(self.y.abs_diff(other.y))
    }
}

impl Default for Position {
    fn default() -> Self {
        Self::OFF_GRID
    }
}

/// Eight compass directions in action-argument order.
///
/// The discriminant IS the wire encoding for Move/Attack/Use arguments, so
/// the order here is part of the external contract.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, strum::EnumCount, strum::FromRepr)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum Direction {
    #[default]
    North = 0,
    South = 1,
    West = 2,
    East = 3,
    NorthWest = 4,
    NorthEast = 5,
    SouthWest = 6,
    SouthEast = 7,
}

impl Direction {
    pub const CARDINAL: [Direction; 4] = [
        Direction::North,
        Direction::East,
        Direction::South,
        Direction::West,
    ];

    pub const ALL: [Direction; 8] = [
        Direction::North,
        Direction::South,
        Direction::West,
        Direction::East,
        Direction::NorthWest,
        Direction::NorthEast,
        Direction::SouthWest,
        Direction::SouthEast,
    ];

    /// Grid delta; `y` grows southward.
    pub fn delta(self) -> (i32, i32) {
        match self {
            Direction::North => (0, -1),
            Direction::South => (0, 1),
            Direction::West => (-1, 0),
            Direction::East => (1, 0),
            Direction::NorthWest => (-1, -1),
            Direction::NorthEast => (1, -1),
            Direction::SouthWest => (-1, 1),
            Direction::SouthEast => (1, 1),
        }
    }

    /// Only cardinal steps pass the elevation-legality rule.
    #[inline]
    pub fn is_cardinal(self) -> bool {
        let (dx, dy) = self.delta();
        dx.abs() + dy.abs() == 1
    }

    /// Direction from `from` toward `to`, preferring the axis with the larger
    /// gap. Used by scripted movement and rally pathing.
    pub fn toward(from: Position, to: Position) -> Option<Direction> {
        let dx = to.x - from.x;
        let dy = to.y - from.y;
        if dx == 0 && dy == 0 {
            return None;
        }
        Some(if dx.abs() >= dy.abs() {
            if dx > 0 { Direction::East } else { Direction::West }
        } else if dy > 0 {
            Direction::South
        } else {
            Direction::North
        })
    }
}

/// Discrete simulation time; one tick per `step` call.
pub type Tick = u64;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cardinal_predicate_matches_delta() {
        for direction in Direction::ALL {
            let (dx, dy) = direction.delta();
            assert_eq!(direction.is_cardinal(), dx.abs() + dy.abs() == 1);
        }
    }

    #[test]
    fn toward_prefers_larger_axis() {
        let from = Position::new(5, 5);
        assert_eq!(
            Direction::toward(from, Position::new(9, 6)),
            Some(Direction::East)
        );
        assert_eq!(
            Direction::toward(from, Position::new(5, 2)),
            Some(Direction::North)
        );
        assert_eq!(Direction::toward(from, from), None);
    }

    #[test]
    fn argument_order_is_stable() {
        // The wire encoding of Move/Attack arguments.
        let reprs: Vec<u8> = Direction::ALL.iter().map(|d| *d as u8).collect();
        assert_eq!(reprs, vec![0, 1, 2, 3, 4, 5, 6, 7]);
    }
}
