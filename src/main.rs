mod config;
mod demo;
mod render;

use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use plotworld_blocks::BiomeCatalog;
use plotworld_chunk::{MemoryBackend, PlotGenerator};
use plotworld_geom::Direction;
use plotworld_world::ChunkCoord;

use crate::config::AppConfig;

#[derive(Parser)]
#[command(name = "plotworld", about = "Plot world generator and plot mutation runtime")]
struct Cli {
    /// TOML config; defaults apply when the file is missing
    #[arg(long, default_value = "plotworld.toml")]
    config: PathBuf,
    /// Log filter when RUST_LOG is unset (error, warn, info, debug, trace)
    #[arg(long, default_value = "info")]
    log_level: String,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Generate a region and print it as an ASCII map
    Map {
        #[arg(long, default_value_t = -8, allow_hyphen_values = true)]
        x: i32,
        #[arg(long, default_value_t = -8, allow_hyphen_values = true)]
        z: i32,
        #[arg(long, default_value_t = 96)]
        width: i32,
        #[arg(long, default_value_t = 48)]
        depth: i32,
    },
    /// Resolve a block column to its plot or road segment
    Locate {
        #[arg(allow_hyphen_values = true)]
        x: i32,
        #[arg(allow_hyphen_values = true)]
        z: i32,
        /// Also resolve the merge direction for this player yaw
        #[arg(long, allow_hyphen_values = true)]
        yaw: Option<f64>,
    },
    /// Claim plots, merge them, change borders and biomes, print the result
    Demo {
        /// Plots per row
        #[arg(long, default_value_t = 3)]
        plots: i32,
        /// Biome applied to the merged group, e.g. `--biome birch forest`
        #[arg(long, num_args = 1.., default_value = "desert")]
        biome: Vec<String>,
    },
}

fn main() {
    let cli = Cli::parse();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&cli.log_level))
        .init();
    if let Err(e) = run(cli) {
        log::error!("{}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    let cfg = AppConfig::load_or_default(&cli.config)?;
    match cli.command {
        Command::Map {
            x,
            z,
            width,
            depth,
        } => {
            let palette = cfg.palette()?;
            let layout = cfg.resolve_layout(&palette, &BiomeCatalog::vanilla())?;
            let memory = Arc::new(MemoryBackend::for_layout(&layout));
            memory.ensure_generated(
                &PlotGenerator::new(layout),
                ChunkCoord::containing(x, z),
                ChunkCoord::containing(x + width.max(1) - 1, z + depth.max(1) - 1),
            )?;
            print!(
                "{}",
                render::render_map(memory.as_ref(), &layout, x, z, width, depth)?
            );
            let stats = memory.stats();
            log::info!(
                "{} chunk(s), {} voxel write(s)",
                stats.chunks,
                stats.voxel_writes
            );
        }
        Command::Locate { x, z, yaw } => {
            let palette = cfg.palette()?;
            let layout = cfg.resolve_layout(&palette, &BiomeCatalog::vanilla())?;
            let grid = layout.grid();
            match grid.plot_at(x, z) {
                Some(plot) => {
                    let b = grid.plot_bounds(plot);
                    println!(
                        "plot {} spans x {}..={} z {}..={}",
                        plot, b.min_x, b.max_x, b.min_z, b.max_z
                    );
                }
                None => {
                    let segment = grid.segment_at(x, z);
                    println!(
                        "road {:?} (cell {}), border column: {}",
                        segment,
                        grid.world_to_plot(x, z),
                        grid.is_border_column(x, z)
                    );
                }
            }
            if let Some(yaw) = yaw {
                let direction = Direction::from_player_yaw(yaw)?;
                let target = grid.world_to_plot(x, z).side(direction);
                println!("facing {:?}, merge target {}", direction, target);
            }
        }
        Command::Demo { plots, biome } => demo::run(&cfg, plots, &biome)?,
    }
    Ok(())
}
