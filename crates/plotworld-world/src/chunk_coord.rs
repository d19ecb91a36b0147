use plotworld_geom::BlockBounds;
use serde::{Deserialize, Serialize};

/// Horizontal edge length of one chunk column.
pub const CHUNK_EDGE: usize = 16;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChunkCoord {
    pub cx: i32,
    pub cz: i32,
}

impl ChunkCoord {
    #[inline]
    pub const fn new(cx: i32, cz: i32) -> Self {
        Self { cx, cz }
    }

    /// Chunk column holding world column `(x, z)`.
    #[inline]
    pub fn containing(x: i32, z: i32) -> Self {
        let edge = CHUNK_EDGE as i32;
        Self {
            cx: x.div_euclid(edge),
            cz: z.div_euclid(edge),
        }
    }

    #[inline]
    pub fn origin_x(self) -> i32 {
        self.cx * CHUNK_EDGE as i32
    }

    #[inline]
    pub fn origin_z(self) -> i32 {
        self.cz * CHUNK_EDGE as i32
    }

    /// Column-local offsets of world column `(x, z)` inside its chunk.
    #[inline]
    pub fn local(x: i32, z: i32) -> (usize, usize) {
        let edge = CHUNK_EDGE as i32;
        (x.rem_euclid(edge) as usize, z.rem_euclid(edge) as usize)
    }

    #[inline]
    pub fn offset(self, dx: i32, dz: i32) -> Self {
        Self {
            cx: self.cx + dx,
            cz: self.cz + dz,
        }
    }

    /// All chunk columns intersecting the bounds, x-major.
    pub fn covering(bounds: &BlockBounds) -> impl Iterator<Item = ChunkCoord> + use<> {
        let lo = Self::containing(bounds.min_x, bounds.min_z);
        let hi = Self::containing(bounds.max_x, bounds.max_z);
        (lo.cx..=hi.cx).flat_map(move |cx| (lo.cz..=hi.cz).map(move |cz| ChunkCoord::new(cx, cz)))
    }
}

impl From<(i32, i32)> for ChunkCoord {
    fn from(value: (i32, i32)) -> Self {
        Self::new(value.0, value.1)
    }
}

impl From<ChunkCoord> for (i32, i32) {
    fn from(value: ChunkCoord) -> Self {
        (value.cx, value.cz)
    }
}
