use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use hashbrown::HashMap;
use plotworld_blocks::{BiomeId, Material};
use plotworld_world::{ChunkCoord, WorldLayout};

use crate::backend::{VoxelBackend, VoxelError};
use crate::buf::ChunkBuf;
use crate::generator::ChunkGenerator;

#[derive(Clone, Copy, Debug, Default)]
pub struct MemoryBackendStats {
    pub chunks: usize,
    pub voxel_writes: u64,
    pub biome_writes: u64,
}

/// In-process world storage. Each chunk column has its own mutex so
/// workers on different plot sets only contend on shared chunks.
pub struct MemoryBackend {
    min_y: i32,
    max_y: i32,
    chunks: RwLock<HashMap<ChunkCoord, Arc<Mutex<ChunkBuf>>>>,
    voxel_writes: AtomicU64,
    biome_writes: AtomicU64,
}

impl MemoryBackend {
    pub fn new(min_y: i32, max_y: i32) -> Self {
        Self {
            min_y,
            max_y,
            chunks: RwLock::new(HashMap::new()),
            voxel_writes: AtomicU64::new(0),
            biome_writes: AtomicU64::new(0),
        }
    }

    pub fn for_layout(layout: &WorldLayout) -> Self {
        Self::new(layout.min_y, layout.max_y)
    }

    pub fn is_loaded(&self, coord: ChunkCoord) -> bool {
        self.chunks
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(&coord)
    }

    /// Generate every chunk in the inclusive range that is not loaded yet.
    pub fn ensure_generated(
        &self,
        generator: &dyn ChunkGenerator,
        from: ChunkCoord,
        to: ChunkCoord,
    ) -> Result<usize, VoxelError> {
        let mut generated = 0;
        for cx in from.cx.min(to.cx)..=from.cx.max(to.cx) {
            for cz in from.cz.min(to.cz)..=from.cz.max(to.cz) {
                let coord = ChunkCoord::new(cx, cz);
                if self.is_loaded(coord) {
                    continue;
                }
                generator.generate_chunk(self, coord)?;
                generator.populate_chunk(self, coord)?;
                generated += 1;
            }
        }
        if generated > 0 {
            log::debug!("generated {} chunk(s)", generated);
        }
        Ok(generated)
    }

    pub fn snapshot(&self, coord: ChunkCoord) -> Option<ChunkBuf> {
        let chunk = self.lookup(coord)?;
        let guard = chunk.lock().unwrap_or_else(PoisonError::into_inner);
        Some(guard.clone())
    }

    pub fn stats(&self) -> MemoryBackendStats {
        MemoryBackendStats {
            chunks: self
                .chunks
                .read()
                .map(|m| m.len())
                .unwrap_or(0),
            voxel_writes: self.voxel_writes.load(Ordering::Relaxed),
            biome_writes: self.biome_writes.load(Ordering::Relaxed),
        }
    }

    fn lookup(&self, coord: ChunkCoord) -> Option<Arc<Mutex<ChunkBuf>>> {
        self.chunks
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&coord)
            .cloned()
    }

    fn with_chunk<R>(
        &self,
        coord: ChunkCoord,
        f: impl FnOnce(&mut ChunkBuf) -> Result<R, VoxelError>,
    ) -> Result<R, VoxelError> {
        let chunk = self.lookup(coord).ok_or(VoxelError::ChunkNotLoaded(coord))?;
        let mut guard = chunk.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut guard)
    }
}

impl VoxelBackend for MemoryBackend {
    fn min_y(&self) -> i32 {
        self.min_y
    }

    fn max_y(&self) -> i32 {
        self.max_y
    }

    fn set_voxel(
        &self,
        chunk: ChunkCoord,
        x: usize,
        y: i32,
        z: usize,
        material: Material,
    ) -> Result<(), VoxelError> {
        self.with_chunk(chunk, |buf| {
            if buf.set(x, y, z, material) {
                self.voxel_writes.fetch_add(1, Ordering::Relaxed);
                Ok(())
            } else {
                Err(VoxelError::OutOfBounds { x, y, z })
            }
        })
    }

    fn voxel(&self, chunk: ChunkCoord, x: usize, y: i32, z: usize) -> Result<Material, VoxelError> {
        self.with_chunk(chunk, |buf| {
            buf.get(x, y, z).ok_or(VoxelError::OutOfBounds { x, y, z })
        })
    }

    fn set_biome(
        &self,
        chunk: ChunkCoord,
        x: usize,
        z: usize,
        biome: BiomeId,
    ) -> Result<(), VoxelError> {
        self.with_chunk(chunk, |buf| {
            if x >= plotworld_world::CHUNK_EDGE || z >= plotworld_world::CHUNK_EDGE {
                return Err(VoxelError::OutOfBounds { x, y: 0, z });
            }
            buf.set_biome(x, z, biome);
            self.biome_writes.fetch_add(1, Ordering::Relaxed);
            Ok(())
        })
    }

    fn biome(&self, chunk: ChunkCoord, x: usize, z: usize) -> Result<BiomeId, VoxelError> {
        self.with_chunk(chunk, |buf| {
            if x >= plotworld_world::CHUNK_EDGE || z >= plotworld_world::CHUNK_EDGE {
                return Err(VoxelError::OutOfBounds { x, y: 0, z });
            }
            Ok(buf.biome(x, z))
        })
    }

    fn store_chunk(&self, buf: ChunkBuf) -> Result<(), VoxelError> {
        if buf.min_y != self.min_y || buf.max_y() != self.max_y {
            return Err(VoxelError::OutOfBounds {
                x: 0,
                y: buf.max_y(),
                z: 0,
            });
        }
        let coord = buf.coord;
        self.chunks
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(coord, Arc::new(Mutex::new(buf)));
        Ok(())
    }
}
