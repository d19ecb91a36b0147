use plotworld_blocks::Material;
use plotworld_chunk::{ChunkGenerator, MemoryBackend, PlotGenerator, VoxelBackend, generate_chunk_buffer};
use plotworld_world::{CHUNK_EDGE, ChunkCoord, WorldLayout, WorldLayoutConfig};
use proptest::prelude::*;

fn layout() -> WorldLayout {
    WorldLayout::with_defaults().unwrap()
}

fn check_chunk(layout: &WorldLayout, coord: ChunkCoord) {
    let grid = layout.grid();
    let buf = generate_chunk_buffer(layout, coord, layout.min_y, layout.max_y);
    for lx in 0..CHUNK_EDGE {
        for lz in 0..CHUNK_EDGE {
            let wx = coord.origin_x() + lx as i32;
            let wz = coord.origin_z() + lz as i32;
            assert_eq!(buf.get(lx, layout.min_y, lz), Some(layout.plot_bottom));
            let seam = grid.raster(wx) == 6 || grid.raster(wz) == 6;
            let top = buf.get(lx, 65, lz).unwrap();
            assert_eq!(top == layout.border, seam, "column {wx},{wz}");
            if grid.is_road(wx, wz) {
                assert_eq!(buf.get(lx, 64, lz), Some(layout.road));
            } else {
                assert_eq!(buf.get(lx, 64, lz), Some(layout.plot_floor));
                assert_eq!(top, Material::AIR);
            }
            assert_eq!(buf.get(lx, 66, lz), Some(Material::AIR));
        }
    }
}

#[test]
fn default_world_chunk_origin_and_neighbours() {
    let layout = layout();
    for cx in -1..=2 {
        for cz in -1..=2 {
            check_chunk(&layout, ChunkCoord::new(cx, cz));
        }
    }
}

#[test]
fn chunk_straddling_a_road_has_both_kinds_of_column() {
    let layout = layout();
    let grid = layout.grid();
    // x 32..=38 is the road east of plot (0, 0)
    let coord = ChunkCoord::new(2, 0);
    let buf = generate_chunk_buffer(&layout, coord, layout.min_y, layout.max_y);
    assert!(grid.is_road(32, 0) && !grid.is_road(39, 0));
    assert_eq!(buf.get(0, 64, 0), Some(layout.road));
    assert_eq!(buf.get(6, 65, 0), Some(layout.border));
    assert_eq!(buf.get(7, 64, 0), Some(layout.plot_floor));
}

#[test]
fn generator_writes_into_the_backend() {
    let layout = layout();
    let backend = MemoryBackend::for_layout(&layout);
    let generator = PlotGenerator::new(layout);
    generator.generate_chunk(&backend, ChunkCoord::new(0, 0)).unwrap();
    assert_eq!(backend.voxel_at(3, 64, 3), Ok(layout.plot_floor));
    assert_eq!(backend.biome_at(3, 3), Ok(layout.biome));
    let n = backend
        .ensure_generated(&generator, ChunkCoord::new(0, 0), ChunkCoord::new(1, 1))
        .unwrap();
    assert_eq!(n, 3);
}

#[test]
fn negative_min_y_puts_bottom_at_the_floor_of_the_world() {
    let mut cfg = WorldLayoutConfig::default();
    cfg.min_y = -64;
    cfg.max_y = 320;
    let layout = WorldLayout::from_config(&cfg, &Default::default(), &Default::default()).unwrap();
    let buf = generate_chunk_buffer(&layout, ChunkCoord::new(0, 0), -64, 320);
    assert_eq!(buf.get(0, -64, 0), Some(layout.plot_bottom));
    assert_eq!(buf.get(0, -63, 0), Some(layout.plot_fill));
}

proptest! {
    // Generation is a pure function of the chunk coordinate
    #[test]
    fn generation_is_deterministic(cx in -2000i32..2000, cz in -2000i32..2000) {
        let layout = layout();
        let a = generate_chunk_buffer(&layout, ChunkCoord::new(cx, cz), 0, 80);
        let b = generate_chunk_buffer(&layout, ChunkCoord::new(cx, cz), 0, 80);
        prop_assert_eq!(a, b);
    }

    // Border sits exactly on seam columns anywhere in the world
    #[test]
    fn border_only_on_seams(cx in -2000i32..2000, cz in -2000i32..2000, road in 2i32..10, plot in 1i32..40) {
        let mut cfg = WorldLayoutConfig::default();
        cfg.road_width = road;
        cfg.plot_size = plot;
        cfg.max_y = 80;
        let layout = WorldLayout::from_config(&cfg, &Default::default(), &Default::default()).unwrap();
        let grid = layout.grid();
        let coord = ChunkCoord::new(cx, cz);
        let buf = generate_chunk_buffer(&layout, coord, 0, 80);
        for lx in 0..CHUNK_EDGE {
            for lz in 0..CHUNK_EDGE {
                let wx = coord.origin_x() + lx as i32;
                let wz = coord.origin_z() + lz as i32;
                let seam = grid.raster(wx) == road - 1 || grid.raster(wz) == road - 1;
                prop_assert_eq!(buf.get(lx, 65, lz) == Some(layout.border), seam);
            }
        }
    }
}
