use plotworld_world::{CHUNK_EDGE, ChunkCoord, WorldLayout};

use crate::backend::{VoxelBackend, VoxelError};
use crate::buf::ChunkBuf;

/// Capability the host world system drives during world generation.
pub trait ChunkGenerator: Send + Sync {
    fn generate_chunk(&self, world: &dyn VoxelBackend, coord: ChunkCoord) -> Result<(), VoxelError>;

    /// Decoration pass. Nothing to decorate on plot worlds.
    fn populate_chunk(&self, _world: &dyn VoxelBackend, _coord: ChunkCoord) -> Result<(), VoxelError> {
        Ok(())
    }
}

#[derive(Clone, Copy, Debug)]
pub struct PlotGenerator {
    layout: WorldLayout,
}

impl PlotGenerator {
    pub const NAME: &'static str = "plotworld";

    pub fn new(layout: WorldLayout) -> Self {
        Self { layout }
    }

    #[inline]
    pub fn layout(&self) -> &WorldLayout {
        &self.layout
    }
}

impl ChunkGenerator for PlotGenerator {
    fn generate_chunk(&self, world: &dyn VoxelBackend, coord: ChunkCoord) -> Result<(), VoxelError> {
        let buf = generate_chunk_buffer(&self.layout, coord, world.min_y(), world.max_y());
        world.store_chunk(buf)
    }
}

/// Fill one chunk column from the layout alone. Deterministic per chunk.
pub fn generate_chunk_buffer(
    layout: &WorldLayout,
    coord: ChunkCoord,
    min_y: i32,
    max_y: i32,
) -> ChunkBuf {
    let grid = layout.grid();
    let mut buf = ChunkBuf::new_empty(coord, min_y, max_y);
    let base_x = coord.origin_x();
    let base_z = coord.origin_z();
    let border_y = layout.ground_height + 1;
    for lx in 0..CHUNK_EDGE {
        let wx = base_x + lx as i32;
        for lz in 0..CHUNK_EDGE {
            let wz = base_z + lz as i32;
            buf.set_biome(lx, lz, layout.biome);
            if grid.is_road(wx, wz) {
                let on_border = grid.is_border_column(wx, wz);
                for y in min_y..=border_y.min(max_y - 1) {
                    if y == min_y {
                        buf.set(lx, y, lz, layout.plot_bottom);
                    } else if y == border_y {
                        if on_border {
                            buf.set(lx, y, lz, layout.border);
                        }
                    } else {
                        buf.set(lx, y, lz, layout.road);
                    }
                }
            } else {
                for y in min_y..=layout.ground_height.min(max_y - 1) {
                    if y == min_y {
                        buf.set(lx, y, lz, layout.plot_bottom);
                    } else if y == layout.ground_height {
                        buf.set(lx, y, lz, layout.plot_floor);
                    } else {
                        buf.set(lx, y, lz, layout.plot_fill);
                    }
                }
            }
        }
    }
    buf
}

#[cfg(test)]
mod tests {
    use super::*;
    use plotworld_blocks::Material;

    #[test]
    fn plot_column_layers() {
        let layout = WorldLayout::with_defaults().unwrap();
        let buf = generate_chunk_buffer(&layout, ChunkCoord::new(0, 0), 0, 256);
        // (5, 5) is inside plot (0, 0)
        assert_eq!(buf.get(5, 0, 5), Some(layout.plot_bottom));
        assert_eq!(buf.get(5, 1, 5), Some(layout.plot_fill));
        assert_eq!(buf.get(5, 63, 5), Some(layout.plot_fill));
        assert_eq!(buf.get(5, 64, 5), Some(layout.plot_floor));
        assert_eq!(buf.get(5, 65, 5), Some(Material::AIR));
        assert_eq!(buf.biome(5, 5), layout.biome);
    }

    #[test]
    fn road_column_layers() {
        let layout = WorldLayout::with_defaults().unwrap();
        // x = -3 is road body, x = -1 is the seam
        let buf = generate_chunk_buffer(&layout, ChunkCoord::new(-1, 0), 0, 256);
        assert_eq!(buf.get(13, 0, 5), Some(layout.plot_bottom));
        assert_eq!(buf.get(13, 64, 5), Some(layout.road));
        assert_eq!(buf.get(13, 65, 5), Some(Material::AIR));
        assert_eq!(buf.get(15, 64, 5), Some(layout.road));
        assert_eq!(buf.get(15, 65, 5), Some(layout.border));
        assert_eq!(buf.get(15, 66, 5), Some(Material::AIR));
    }

    #[test]
    fn populate_is_a_no_op() {
        let layout = WorldLayout::with_defaults().unwrap();
        let backend = crate::MemoryBackend::new(0, 256);
        let generator = PlotGenerator::new(layout);
        generator.generate_chunk(&backend, ChunkCoord::new(0, 0)).unwrap();
        let before = backend.snapshot(ChunkCoord::new(0, 0));
        generator.populate_chunk(&backend, ChunkCoord::new(0, 0)).unwrap();
        assert_eq!(backend.snapshot(ChunkCoord::new(0, 0)), before);
    }
}
