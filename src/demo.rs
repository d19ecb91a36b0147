use std::error::Error;
use std::sync::{Arc, RwLock};

use crossbeam_channel::unbounded;
use plotworld_blocks::{BiomeCatalog, MaterialPalette};
use plotworld_chunk::{MemoryBackend, PlotGenerator, VoxelBackend};
use plotworld_geom::{BlockBounds, Direction, PlotCoord};
use plotworld_plots::{LockManager, PlotRegistry};
use plotworld_runtime::{
    MutationData, MutationReport, MutationRequest, MutationRuntime, MutationWorld,
};
use plotworld_world::{ChunkCoord, WorldLayout};

use crate::config::AppConfig;
use crate::render::render_map;

fn summarize(report: &MutationReport, biomes: &BiomeCatalog, palette: &MaterialPalette) -> String {
    match &report.result {
        Ok(MutationData::Biome { biome, plots }) => format!(
            "biome -> {} on {} in {}",
            biomes.name_of(*biome),
            plots.describe(),
            report.elapsed_string()
        ),
        Ok(MutationData::Border { material, plots }) => format!(
            "border -> {} on {} in {}",
            palette.name(*material).unwrap_or("?"),
            plots.describe(),
            report.elapsed_string()
        ),
        Ok(MutationData::Merge { plots }) => format!(
            "merge -> {} in {}",
            plots.describe(),
            report.elapsed_string()
        ),
        Err(err) => format!("{} failed: {}", report.kind, err),
    }
}

/// Claims a row of plots, then drives merges, borders and biome changes
/// through the runtime and prints the resulting map.
pub fn run(cfg: &AppConfig, plots_x: i32, biome: &[String]) -> Result<(), Box<dyn Error>> {
    let palette = Arc::new(cfg.palette()?);
    let biomes = Arc::new(BiomeCatalog::vanilla());
    let biome_id = biomes
        .resolve(biome)
        .ok_or_else(|| format!("unknown biome '{}'", biome.join(" ")))?;
    let layout = cfg.resolve_layout(&palette, &biomes)?;
    let grid = layout.grid();
    let plots_x = plots_x.max(2);

    let first = grid.plot_bounds(PlotCoord::new(0, 0));
    let last = grid.plot_bounds(PlotCoord::new(plots_x - 1, 1));
    let area = BlockBounds::new(first.min_x, first.min_z, last.max_x, last.max_z, layout.ground_height)
        .expanded(layout.road_width + 1);
    let memory = Arc::new(MemoryBackend::for_layout(&layout));
    let generated = memory.ensure_generated(
        &PlotGenerator::new(layout),
        ChunkCoord::containing(area.min_x, area.min_z),
        ChunkCoord::containing(area.max_x, area.max_z),
    )?;
    log::info!("generated {} chunk(s) for the demo area", generated);

    let mut registry = PlotRegistry::new(cfg.world.as_str());
    for x in 0..plots_x {
        for z in 0..2 {
            registry.claim(PlotCoord::new(x, z), Some("demo"));
        }
    }
    let registry = Arc::new(RwLock::new(registry));
    let locks = Arc::new(LockManager::new());
    let backend: Arc<dyn VoxelBackend> = memory.clone();
    let world = MutationWorld::new(layout, backend, registry, Arc::clone(&locks))
        .with_palette(Arc::clone(&palette));
    let runtime = MutationRuntime::new(world, &cfg.runtime)?;

    let say = |report: MutationReport| println!("{}", summarize(&report, &biomes, &palette));

    // Yaw 270 faces east after normalisation.
    let east = Direction::from_player_yaw(270.0)?;
    say(runtime
        .request(MutationRequest::Merge {
            plot: PlotCoord::new(0, 0),
            direction: east,
        })
        .wait());
    say(runtime
        .request(MutationRequest::Merge {
            plot: PlotCoord::new(1, 0),
            direction: Direction::South,
        })
        .wait());
    say(runtime
        .request(MutationRequest::Merge {
            plot: PlotCoord::new(0, 1),
            direction: Direction::North,
        })
        .wait());
    // Already part of the group.
    say(runtime
        .request(MutationRequest::Merge {
            plot: PlotCoord::new(1, 1),
            direction: Direction::West,
        })
        .wait());

    let border = palette
        .get_id("cobblestone")
        .unwrap_or(layout.border);

    // The second request shares the merged group with the first and is
    // rejected if the first still holds it.
    let (tx, rx) = unbounded();
    let requests = [
        MutationRequest::Border {
            plot: PlotCoord::new(0, 0),
            material: border,
        },
        MutationRequest::Biome {
            plot: PlotCoord::new(1, 1),
            biome: biome_id,
        },
        MutationRequest::Biome {
            plot: PlotCoord::new(plots_x - 1, 1),
            biome: biome_id,
        },
    ];
    for request in requests {
        let tx = tx.clone();
        runtime.request_with(request, move |report| {
            let _ = tx.send(report);
        });
    }
    drop(tx);
    let (queued, inflight) = runtime.queue_debug_counts();
    log::debug!("queued={} inflight={}", queued, inflight);
    for report in rx.iter() {
        say(report);
    }

    println!();
    print!(
        "{}",
        render_map(
            memory.as_ref(),
            &layout,
            area.min_x,
            area.min_z,
            area.width_x(),
            area.width_z()
        )?
    );
    spawn_note(&layout);
    Ok(())
}

fn spawn_note(layout: &WorldLayout) {
    let (x, y, z) = layout.spawn_position();
    log::info!("spawn at {},{},{}", x, y, z);
}
