use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};

use plotworld_blocks::{BiomeCatalog, MaterialPalette};
use plotworld_runtime::RuntimeConfig;
use plotworld_world::{WorldLayout, WorldLayoutConfig, load_layout_from_path};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_world")]
    pub world: String,
    #[serde(default)]
    pub layout: WorldLayoutConfig,
    /// Standalone layout TOML. Replaces `layout` when set.
    #[serde(default)]
    pub layout_file: Option<PathBuf>,
    /// Legacy generator preset (JSON). Replaces `layout` when set.
    #[serde(default)]
    pub preset: Option<String>,
    #[serde(default)]
    pub runtime: RuntimeConfig,
    /// Material names in palette order; air is always id 0.
    #[serde(default)]
    pub materials: Option<Vec<String>>,
    /// Palette TOML (`materials = [...]`). Takes precedence over `materials`.
    #[serde(default)]
    pub materials_file: Option<PathBuf>,
}

fn default_world() -> String {
    "plots".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            world: default_world(),
            layout: WorldLayoutConfig::default(),
            layout_file: None,
            preset: None,
            runtime: RuntimeConfig::default(),
            materials: None,
            materials_file: None,
        }
    }
}

impl AppConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, Box<dyn Error>> {
        Ok(toml::from_str(s)?)
    }

    pub fn load_from_path(path: &Path) -> Result<Self, Box<dyn Error>> {
        let s = fs::read_to_string(path)?;
        Self::from_toml_str(&s)
    }

    /// Config file if present, otherwise defaults.
    pub fn load_or_default(path: &Path) -> Result<Self, Box<dyn Error>> {
        if !path.exists() {
            log::info!("config {} not found; using defaults", path.display());
            return Ok(Self::default());
        }
        let cfg = Self::load_from_path(path)?;
        log::info!("loaded config from {}", path.display());
        Ok(cfg)
    }

    pub fn palette(&self) -> Result<MaterialPalette, Box<dyn Error>> {
        if let Some(path) = &self.materials_file {
            log::debug!("loading palette from {}", path.display());
            return MaterialPalette::from_path(path);
        }
        match &self.materials {
            Some(names) => Ok(MaterialPalette::from_names(names.iter())?),
            None => Ok(MaterialPalette::default()),
        }
    }

    /// Preset wins over `layout_file`, which wins over the inline section.
    pub fn layout_config(&self) -> Result<WorldLayoutConfig, Box<dyn Error>> {
        if let Some(json) = &self.preset {
            return WorldLayoutConfig::from_preset_json(json);
        }
        match &self.layout_file {
            Some(path) => {
                log::debug!("loading layout from {}", path.display());
                load_layout_from_path(path)
            }
            None => Ok(self.layout.clone()),
        }
    }

    pub fn resolve_layout(
        &self,
        palette: &MaterialPalette,
        biomes: &BiomeCatalog,
    ) -> Result<WorldLayout, Box<dyn Error>> {
        let cfg = self.layout_config()?;
        Ok(WorldLayout::from_config(&cfg, palette, biomes)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_is_the_default_config() {
        let cfg = AppConfig::from_toml_str("").unwrap();
        assert_eq!(cfg, AppConfig::default());
        assert_eq!(cfg.runtime.max_group_size, 64);
    }

    #[test]
    fn sections_override_defaults() {
        let cfg = AppConfig::from_toml_str(
            r#"
            world = "creative"

            [layout]
            road_width = 5
            plot_size = 20

            [layout.blocks]
            border = "cobblestone"

            [runtime]
            workers = 3
            "#,
        )
        .unwrap();
        assert_eq!(cfg.world, "creative");
        assert_eq!(cfg.layout.road_width, 5);
        assert_eq!(cfg.layout.ground_height, 64);
        assert_eq!(cfg.layout.blocks.border, "cobblestone");
        assert_eq!(cfg.runtime.workers, 3);
        let palette = cfg.palette().unwrap();
        let layout = cfg
            .resolve_layout(&palette, &BiomeCatalog::vanilla())
            .unwrap();
        assert_eq!(layout.border, palette.get_id("cobblestone").unwrap());
    }

    #[test]
    fn preset_replaces_layout_section() {
        let cfg = AppConfig::from_toml_str(
            r#"preset = '{"RoadWidth": 4, "PlotSize": 16, "GroundHeight": 40}'"#,
        )
        .unwrap();
        let layout = cfg.layout_config().unwrap();
        assert_eq!(
            (layout.road_width, layout.plot_size, layout.ground_height),
            (4, 16, 40)
        );
    }

    #[test]
    fn unknown_material_is_rejected() {
        let cfg = AppConfig::from_toml_str(
            r#"
            materials = ["air", "bedrock", "dirt"]
            "#,
        )
        .unwrap();
        assert!(
            cfg.resolve_layout(&cfg.palette().unwrap(), &BiomeCatalog::vanilla())
                .is_err()
        );
    }

    #[test]
    fn layout_and_palette_files_are_followed() {
        let dir = std::env::temp_dir().join(format!("plotworld-config-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let layout_path = dir.join("layout.toml");
        fs::write(&layout_path, "road_width = 3\n[blocks]\nborder = \"glass\"\n").unwrap();
        let palette_path = dir.join("palette.toml");
        fs::write(
            &palette_path,
            "materials = [\"bedrock\", \"dirt\", \"grass\", \"oak_planks\", \"glass\"]\n",
        )
        .unwrap();

        let cfg = AppConfig {
            layout_file: Some(layout_path),
            materials_file: Some(palette_path),
            ..AppConfig::default()
        };
        let palette = cfg.palette().unwrap();
        let layout = cfg.resolve_layout(&palette, &BiomeCatalog::vanilla()).unwrap();
        fs::remove_dir_all(&dir).unwrap();
        assert_eq!(layout.road_width, 3);
        assert_eq!(layout.border, palette.get_id("glass").unwrap());
        assert_eq!(palette.len(), 6);
    }
}
