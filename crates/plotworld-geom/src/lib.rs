//! Plot grid coordinate algebra shared by generation, lookup and mutation.
#![forbid(unsafe_code)]

use core::fmt;

use serde::{Deserialize, Serialize};

/// Reduce a world axis coordinate into `[0, period)`, also for negative inputs.
#[inline]
pub fn rasterize(world_axis: i32, period: i32) -> i32 {
    debug_assert!(period > 0);
    ((world_axis % period) + period) % period
}

/// True on the single-block seam between road body and plot body.
#[inline]
pub fn is_on_road_border(raster: i32, road_width: i32) -> bool {
    raster == road_width - 1
}

/// One grid cell. Ordered by `x`, then `z`, which fixes the locking order.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct PlotCoord {
    pub x: i32,
    pub z: i32,
}

impl PlotCoord {
    #[inline]
    pub const fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }

    #[inline]
    pub fn offset(self, dx: i32, dz: i32) -> Self {
        Self {
            x: self.x + dx,
            z: self.z + dz,
        }
    }

    /// Neighbouring cell one grid period away.
    #[inline]
    pub fn side(self, direction: Direction) -> Self {
        let (dx, dz) = direction.step();
        self.offset(dx, dz)
    }

    /// Direction from `self` to `other` when the two share an edge.
    pub fn direction_to(self, other: PlotCoord) -> Option<Direction> {
        Direction::ALL.into_iter().find(|d| self.side(*d) == other)
    }

    #[inline]
    pub fn is_adjacent(self, other: PlotCoord) -> bool {
        self.direction_to(other).is_some()
    }
}

impl fmt::Display for PlotCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{};{}", self.x, self.z)
    }
}

impl From<(i32, i32)> for PlotCoord {
    fn from(value: (i32, i32)) -> Self {
        Self::new(value.0, value.1)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(test, derive(proptest_derive::Arbitrary))]
pub enum Direction {
    North,
    East,
    South,
    West,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::North,
        Direction::East,
        Direction::South,
        Direction::West,
    ];

    /// Grid step for this direction; north is towards negative z.
    #[inline]
    pub fn step(self) -> (i32, i32) {
        match self {
            Direction::North => (0, -1),
            Direction::East => (1, 0),
            Direction::South => (0, 1),
            Direction::West => (-1, 0),
        }
    }

    #[inline]
    pub fn opposite(self) -> Self {
        match self {
            Direction::North => Direction::South,
            Direction::East => Direction::West,
            Direction::South => Direction::North,
            Direction::West => Direction::East,
        }
    }

    /// Map a facing angle already normalised to `[0, 360)` onto the four
    /// 90 degree sectors centred on N/E/S/W. Sector ranges are half-open.
    pub fn from_facing_angle(rotation: f64) -> Result<Self, GridError> {
        if !(0.0..360.0).contains(&rotation) {
            return Err(GridError::AngleOutOfRange(rotation));
        }
        let direction = if rotation < 45.0 || rotation >= 315.0 {
            Direction::North
        } else if rotation < 135.0 {
            Direction::East
        } else if rotation < 225.0 {
            Direction::South
        } else {
            Direction::West
        };
        Ok(direction)
    }

    /// Resolve the direction a player is looking at from their raw yaw.
    pub fn from_player_yaw(yaw: f64) -> Result<Self, GridError> {
        let mut rotation = (yaw - 180.0) % 360.0;
        if rotation < 0.0 {
            rotation += 360.0;
        }
        // -0.0 and values within an ulp of 360 after the lift
        if rotation >= 360.0 {
            rotation -= 360.0;
        }
        Self::from_facing_angle(rotation)
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Direction::North => "north",
            Direction::East => "east",
            Direction::South => "south",
            Direction::West => "west",
        };
        f.write_str(name)
    }
}

/// Inclusive horizontal block box plus the ground height of its world.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BlockBounds {
    pub min_x: i32,
    pub min_z: i32,
    pub max_x: i32,
    pub max_z: i32,
    pub ground_y: i32,
}

impl BlockBounds {
    #[inline]
    pub const fn new(min_x: i32, min_z: i32, max_x: i32, max_z: i32, ground_y: i32) -> Self {
        Self {
            min_x,
            min_z,
            max_x,
            max_z,
            ground_y,
        }
    }

    #[inline]
    pub fn contains(&self, x: i32, z: i32) -> bool {
        x >= self.min_x && x <= self.max_x && z >= self.min_z && z <= self.max_z
    }

    #[inline]
    pub fn width_x(&self) -> i32 {
        self.max_x - self.min_x + 1
    }

    #[inline]
    pub fn width_z(&self) -> i32 {
        self.max_z - self.min_z + 1
    }

    /// Grow the box by `n` blocks on every horizontal side.
    #[inline]
    pub fn expanded(&self, n: i32) -> Self {
        Self::new(
            self.min_x.saturating_sub(n),
            self.min_z.saturating_sub(n),
            self.max_x.saturating_add(n),
            self.max_z.saturating_add(n),
            self.ground_y,
        )
    }

    /// Every `(x, z)` column inside the box, x-major.
    pub fn columns(&self) -> impl Iterator<Item = (i32, i32)> + use<> {
        let (min_x, max_x, min_z, max_z) = (self.min_x, self.max_x, self.min_z, self.max_z);
        (min_x..=max_x).flat_map(move |x| (min_z..=max_z).map(move |z| (x, z)))
    }

    /// The one-block outline of the box, each column visited once.
    pub fn perimeter(&self) -> impl Iterator<Item = (i32, i32)> + use<> {
        let b = *self;
        b.columns().filter(move |&(x, z)| {
            x == b.min_x || x == b.max_x || z == b.min_z || z == b.max_z
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GridError {
    AngleOutOfRange(f64),
}

impl fmt::Display for GridError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GridError::AngleOutOfRange(angle) => {
                write!(f, "facing angle {angle} is outside [0, 360)")
            }
        }
    }
}

impl std::error::Error for GridError {}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn facing_angles_resolve_to_sectors() {
        let cases = [
            (0.0, Direction::North),
            (44.0, Direction::North),
            (45.0, Direction::East),
            (134.0, Direction::East),
            (135.0, Direction::South),
            (225.0, Direction::West),
            (314.0, Direction::West),
            (315.0, Direction::North),
            (359.0, Direction::North),
        ];
        for (angle, expected) in cases {
            assert_eq!(Direction::from_facing_angle(angle), Ok(expected), "{angle}");
        }
    }

    #[test]
    fn facing_angle_outside_range_is_an_error() {
        assert!(Direction::from_facing_angle(360.0).is_err());
        assert!(Direction::from_facing_angle(-0.5).is_err());
        assert!(Direction::from_facing_angle(f64::NAN).is_err());
    }

    #[test]
    fn player_yaw_is_normalised_before_lookup() {
        // yaw 180 faces rotation 0
        assert_eq!(Direction::from_player_yaw(180.0), Ok(Direction::North));
        assert_eq!(Direction::from_player_yaw(0.0), Ok(Direction::South));
        assert_eq!(Direction::from_player_yaw(270.0), Ok(Direction::East));
        assert_eq!(Direction::from_player_yaw(-270.0), Ok(Direction::West));
    }

    #[test]
    fn perimeter_visits_outline_once() {
        let b = BlockBounds::new(0, 0, 3, 2, 64);
        let ring: Vec<_> = b.perimeter().collect();
        assert_eq!(ring.len(), 2 * 4 + 2 * 1);
        assert!(ring.iter().all(|&(x, z)| b.contains(x, z)));
    }

    proptest! {
        #[test]
        fn side_then_opposite_is_identity(x in -10_000i32..10_000, z in -10_000i32..10_000, d in any::<Direction>()) {
            let c = PlotCoord::new(x, z);
            prop_assert_eq!(c.side(d).side(d.opposite()), c);
            prop_assert_eq!(c.direction_to(c.side(d)), Some(d));
        }
    }
}
