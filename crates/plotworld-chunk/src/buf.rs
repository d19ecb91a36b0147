use plotworld_blocks::{BiomeId, Material};
use plotworld_world::{CHUNK_EDGE, ChunkCoord};

/// One chunk column: voxels for `[min_y, min_y + sy)` plus a biome per column.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChunkBuf {
    pub coord: ChunkCoord,
    pub min_y: i32,
    pub sy: usize,
    pub blocks: Vec<Material>,
    pub biomes: Vec<BiomeId>,
}

impl ChunkBuf {
    pub fn new_empty(coord: ChunkCoord, min_y: i32, max_y: i32) -> Self {
        let sy = (max_y - min_y).max(0) as usize;
        Self {
            coord,
            min_y,
            sy,
            blocks: vec![Material::AIR; CHUNK_EDGE * CHUNK_EDGE * sy],
            biomes: vec![BiomeId::default(); CHUNK_EDGE * CHUNK_EDGE],
        }
    }

    #[inline]
    pub fn max_y(&self) -> i32 {
        self.min_y + self.sy as i32
    }

    #[inline]
    pub fn idx(&self, x: usize, ly: usize, z: usize) -> usize {
        (ly * CHUNK_EDGE + z) * CHUNK_EDGE + x
    }

    #[inline]
    fn local_y(&self, y: i32) -> Option<usize> {
        if y < self.min_y || y >= self.max_y() {
            return None;
        }
        Some((y - self.min_y) as usize)
    }

    #[inline]
    pub fn get(&self, x: usize, y: i32, z: usize) -> Option<Material> {
        let ly = self.local_y(y)?;
        if x >= CHUNK_EDGE || z >= CHUNK_EDGE {
            return None;
        }
        Some(self.blocks[self.idx(x, ly, z)])
    }

    /// Returns false when the position lies outside the column.
    #[inline]
    pub fn set(&mut self, x: usize, y: i32, z: usize, material: Material) -> bool {
        let Some(ly) = self.local_y(y) else {
            return false;
        };
        if x >= CHUNK_EDGE || z >= CHUNK_EDGE {
            return false;
        }
        let i = self.idx(x, ly, z);
        self.blocks[i] = material;
        true
    }

    #[inline]
    pub fn biome(&self, x: usize, z: usize) -> BiomeId {
        self.biomes[z * CHUNK_EDGE + x]
    }

    #[inline]
    pub fn set_biome(&mut self, x: usize, z: usize, biome: BiomeId) {
        self.biomes[z * CHUNK_EDGE + x] = biome;
    }

    #[inline]
    pub fn has_non_air(&self) -> bool {
        self.blocks.iter().any(|b| !b.is_air())
    }
}
