use std::fmt;

use plotworld_blocks::{BiomeId, Material};
use plotworld_world::ChunkCoord;

use crate::buf::ChunkBuf;

/// Host world storage, addressed per chunk column with local offsets in
/// `[0, CHUNK_EDGE)`. Implementations are shared between worker threads.
pub trait VoxelBackend: Send + Sync {
    fn min_y(&self) -> i32;

    /// Exclusive.
    fn max_y(&self) -> i32;

    fn set_voxel(
        &self,
        chunk: ChunkCoord,
        x: usize,
        y: i32,
        z: usize,
        material: Material,
    ) -> Result<(), VoxelError>;

    fn voxel(&self, chunk: ChunkCoord, x: usize, y: i32, z: usize) -> Result<Material, VoxelError>;

    fn set_biome(&self, chunk: ChunkCoord, x: usize, z: usize, biome: BiomeId)
    -> Result<(), VoxelError>;

    fn biome(&self, chunk: ChunkCoord, x: usize, z: usize) -> Result<BiomeId, VoxelError>;

    /// Replace a whole column at once. The default goes voxel by voxel.
    fn store_chunk(&self, buf: ChunkBuf) -> Result<(), VoxelError> {
        for z in 0..plotworld_world::CHUNK_EDGE {
            for x in 0..plotworld_world::CHUNK_EDGE {
                self.set_biome(buf.coord, x, z, buf.biome(x, z))?;
                for y in buf.min_y..buf.max_y() {
                    if let Some(m) = buf.get(x, y, z) {
                        self.set_voxel(buf.coord, x, y, z, m)?;
                    }
                }
            }
        }
        Ok(())
    }

    fn set_voxel_at(&self, x: i32, y: i32, z: i32, material: Material) -> Result<(), VoxelError> {
        let (lx, lz) = ChunkCoord::local(x, z);
        self.set_voxel(ChunkCoord::containing(x, z), lx, y, lz, material)
    }

    fn voxel_at(&self, x: i32, y: i32, z: i32) -> Result<Material, VoxelError> {
        let (lx, lz) = ChunkCoord::local(x, z);
        self.voxel(ChunkCoord::containing(x, z), lx, y, lz)
    }

    fn set_biome_at(&self, x: i32, z: i32, biome: BiomeId) -> Result<(), VoxelError> {
        let (lx, lz) = ChunkCoord::local(x, z);
        self.set_biome(ChunkCoord::containing(x, z), lx, lz, biome)
    }

    fn biome_at(&self, x: i32, z: i32) -> Result<BiomeId, VoxelError> {
        let (lx, lz) = ChunkCoord::local(x, z);
        self.biome(ChunkCoord::containing(x, z), lx, lz)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VoxelError {
    ChunkNotLoaded(ChunkCoord),
    OutOfBounds { x: usize, y: i32, z: usize },
    Io(String),
}

impl fmt::Display for VoxelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VoxelError::ChunkNotLoaded(c) => write!(f, "chunk {},{} is not loaded", c.cx, c.cz),
            VoxelError::OutOfBounds { x, y, z } => {
                write!(f, "voxel {},{},{} is outside the chunk column", x, y, z)
            }
            VoxelError::Io(msg) => write!(f, "voxel backend failure: {}", msg),
        }
    }
}

impl std::error::Error for VoxelError {}
