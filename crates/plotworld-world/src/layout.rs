use std::error::Error;
use std::fmt;
use std::fs;
use std::path::Path;

use plotworld_blocks::{BiomeCatalog, BiomeId, Material, MaterialPalette};
use serde::{Deserialize, Serialize};

use crate::grid::PlotGrid;

/// Per-world layout as written in config. Fixed once the world exists.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorldLayoutConfig {
    #[serde(default = "default_road_width")]
    pub road_width: i32,
    #[serde(default = "default_plot_size")]
    pub plot_size: i32,
    #[serde(default = "default_ground_height")]
    pub ground_height: i32,
    /// Shift applied to world coordinates before rasterizing.
    #[serde(default = "default_origin_shift")]
    pub origin_shift: i32,
    #[serde(default = "default_min_y")]
    pub min_y: i32,
    /// Exclusive.
    #[serde(default = "default_max_y")]
    pub max_y: i32,
    #[serde(default = "default_biome")]
    pub biome: String,
    #[serde(default)]
    pub blocks: LayoutBlocks,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayoutBlocks {
    #[serde(default = "default_road_block")]
    pub road: String,
    #[serde(default = "default_border_block")]
    pub border: String,
    #[serde(default = "default_plot_floor_block")]
    pub plot_floor: String,
    #[serde(default = "default_plot_fill_block")]
    pub plot_fill: String,
    #[serde(default = "default_plot_bottom_block")]
    pub plot_bottom: String,
}

fn default_road_width() -> i32 {
    7
}
fn default_plot_size() -> i32 {
    32
}
fn default_ground_height() -> i32 {
    64
}
fn default_origin_shift() -> i32 {
    7
}
fn default_min_y() -> i32 {
    0
}
fn default_max_y() -> i32 {
    256
}
fn default_biome() -> String {
    "plains".into()
}
fn default_road_block() -> String {
    "oak_planks".into()
}
fn default_border_block() -> String {
    "stone_slab".into()
}
fn default_plot_floor_block() -> String {
    "grass".into()
}
fn default_plot_fill_block() -> String {
    "dirt".into()
}
fn default_plot_bottom_block() -> String {
    "bedrock".into()
}

impl Default for LayoutBlocks {
    fn default() -> Self {
        Self {
            road: default_road_block(),
            border: default_border_block(),
            plot_floor: default_plot_floor_block(),
            plot_fill: default_plot_fill_block(),
            plot_bottom: default_plot_bottom_block(),
        }
    }
}

impl Default for WorldLayoutConfig {
    fn default() -> Self {
        Self {
            road_width: default_road_width(),
            plot_size: default_plot_size(),
            ground_height: default_ground_height(),
            origin_shift: default_origin_shift(),
            min_y: default_min_y(),
            max_y: default_max_y(),
            biome: default_biome(),
            blocks: LayoutBlocks::default(),
        }
    }
}

// Generator preset as handed over by the host when the world was created.
#[derive(Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct LegacyPreset {
    road_width: Option<i32>,
    plot_size: Option<i32>,
    ground_height: Option<i32>,
    road_block: Option<String>,
    wall_block: Option<String>,
    plot_floor_block: Option<String>,
    plot_fill_block: Option<String>,
    bottom_block: Option<String>,
}

impl WorldLayoutConfig {
    /// Parse a JSON generator preset; missing keys and an empty preset keep defaults.
    pub fn from_preset_json(preset: &str) -> Result<Self, Box<dyn Error>> {
        let preset: LegacyPreset = if preset.trim().is_empty() {
            LegacyPreset::default()
        } else {
            serde_json::from_str::<Option<LegacyPreset>>(preset)?.unwrap_or_default()
        };
        let mut cfg = Self::default();
        if let Some(v) = preset.road_width {
            cfg.road_width = v;
        }
        if let Some(v) = preset.plot_size {
            cfg.plot_size = v;
        }
        if let Some(v) = preset.ground_height {
            cfg.ground_height = v;
        }
        let blocks = &mut cfg.blocks;
        for (slot, value) in [
            (&mut blocks.road, preset.road_block),
            (&mut blocks.border, preset.wall_block),
            (&mut blocks.plot_floor, preset.plot_floor_block),
            (&mut blocks.plot_fill, preset.plot_fill_block),
            (&mut blocks.plot_bottom, preset.bottom_block),
        ] {
            if let Some(v) = value {
                *slot = v;
            }
        }
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), LayoutError> {
        // A one-wide road would share its seam column between both neighbours.
        if !(2..=MAX_ROAD_WIDTH).contains(&self.road_width) {
            return Err(LayoutError::InvalidDimension(
                "road_width must lie in 2..=1024",
            ));
        }
        if !(1..=MAX_PLOT_SIZE).contains(&self.plot_size) {
            return Err(LayoutError::InvalidDimension(
                "plot_size must lie in 1..=4096",
            ));
        }
        if self.origin_shift.unsigned_abs() > MAX_ORIGIN_SHIFT {
            return Err(LayoutError::InvalidDimension(
                "origin_shift must lie within +/-1048576",
            ));
        }
        if self.min_y < -HEIGHT_LIMIT || self.max_y > HEIGHT_LIMIT {
            return Err(LayoutError::InvalidDimension(
                "min_y and max_y must lie within +/-4096",
            ));
        }
        if self.ground_height <= self.min_y {
            return Err(LayoutError::InvalidDimension(
                "ground_height must lie above min_y",
            ));
        }
        match self.ground_height.checked_add(1) {
            Some(border_y) if border_y < self.max_y => Ok(()),
            _ => Err(LayoutError::InvalidDimension(
                "ground_height + 1 must lie below max_y",
            )),
        }
    }
}

const MAX_ROAD_WIDTH: i32 = 1024;
const MAX_PLOT_SIZE: i32 = 4096;
const MAX_ORIGIN_SHIFT: u32 = 1 << 20;
const HEIGHT_LIMIT: i32 = 4096;

pub fn load_layout_from_path(path: &Path) -> Result<WorldLayoutConfig, Box<dyn Error>> {
    let s = fs::read_to_string(path)?;
    let cfg: WorldLayoutConfig = toml::from_str(&s)?;
    cfg.validate()?;
    Ok(cfg)
}

/// Layout with block and biome names resolved, used in tight loops.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WorldLayout {
    pub road_width: i32,
    pub plot_size: i32,
    pub ground_height: i32,
    pub origin_shift: i32,
    pub min_y: i32,
    pub max_y: i32,
    pub biome: BiomeId,
    pub road: Material,
    pub border: Material,
    pub plot_floor: Material,
    pub plot_fill: Material,
    pub plot_bottom: Material,
}

impl WorldLayout {
    pub fn from_config(
        cfg: &WorldLayoutConfig,
        palette: &MaterialPalette,
        biomes: &BiomeCatalog,
    ) -> Result<Self, LayoutError> {
        cfg.validate()?;
        let resolve = |slot: &'static str, name: &str| {
            palette
                .get_id(name)
                .ok_or_else(|| LayoutError::UnknownMaterial {
                    slot,
                    name: name.to_string(),
                })
        };
        let biome = biomes
            .get(&cfg.biome)
            .ok_or_else(|| LayoutError::UnknownBiome(cfg.biome.clone()))?;
        Ok(Self {
            road_width: cfg.road_width,
            plot_size: cfg.plot_size,
            ground_height: cfg.ground_height,
            origin_shift: cfg.origin_shift,
            min_y: cfg.min_y,
            max_y: cfg.max_y,
            biome,
            road: resolve("road", &cfg.blocks.road)?,
            border: resolve("border", &cfg.blocks.border)?,
            plot_floor: resolve("plot_floor", &cfg.blocks.plot_floor)?,
            plot_fill: resolve("plot_fill", &cfg.blocks.plot_fill)?,
            plot_bottom: resolve("plot_bottom", &cfg.blocks.plot_bottom)?,
        })
    }

    /// Default config against the default palette and vanilla biomes.
    pub fn with_defaults() -> Result<Self, LayoutError> {
        Self::from_config(
            &WorldLayoutConfig::default(),
            &MaterialPalette::default(),
            &BiomeCatalog::vanilla(),
        )
    }

    #[inline]
    pub fn grid(&self) -> PlotGrid {
        PlotGrid::new(
            self.road_width,
            self.plot_size,
            self.origin_shift,
            self.ground_height,
        )
    }

    /// Layer the border sits on.
    #[inline]
    pub fn border_y(&self) -> i32 {
        self.ground_height + 1
    }

    #[inline]
    pub fn spawn_position(&self) -> (i32, i32, i32) {
        (0, self.ground_height + 1, 0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LayoutError {
    InvalidDimension(&'static str),
    UnknownMaterial { slot: &'static str, name: String },
    UnknownBiome(String),
}

impl fmt::Display for LayoutError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LayoutError::InvalidDimension(msg) => write!(f, "invalid layout: {}", msg),
            LayoutError::UnknownMaterial { slot, name } => {
                write!(f, "unknown material '{}' for {} block", name, slot)
            }
            LayoutError::UnknownBiome(name) => write!(f, "unknown biome '{}'", name),
        }
    }
}

impl Error for LayoutError {}
