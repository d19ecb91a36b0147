use std::error::Error;
use std::fmt;
use std::fs;
use std::path::Path;

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};

/// Palette index of one voxel material. Id 0 is always air.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Material(pub u16);

impl Material {
    pub const AIR: Material = Material(0);

    #[inline]
    pub fn is_air(self) -> bool {
        self == Material::AIR
    }
}

const DEFAULT_MATERIALS: &[&str] = &[
    "air",
    "bedrock",
    "stone",
    "dirt",
    "grass",
    "oak_planks",
    "stone_slab",
    "cobblestone",
    "sandstone",
    "quartz_block",
    "glass",
    "oak_fence",
];

#[derive(Clone, Debug)]
pub struct MaterialPalette {
    names: Vec<String>,
    by_name: HashMap<String, Material>,
}

impl MaterialPalette {
    /// Build a palette from names; ids follow list order with `air` forced to 0.
    pub fn from_names<I, S>(names: I) -> Result<Self, PaletteError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut palette = Self {
            names: vec!["air".to_string()],
            by_name: HashMap::new(),
        };
        palette.by_name.insert("air".to_string(), Material::AIR);
        for name in names {
            let name = name.into();
            if palette.by_name.contains_key(&name) {
                continue;
            }
            let id = u16::try_from(palette.names.len())
                .map(Material)
                .map_err(|_| PaletteError::TooManyMaterials(name.clone()))?;
            palette.by_name.insert(name.clone(), id);
            palette.names.push(name);
        }
        Ok(palette)
    }

    pub fn get_id(&self, name: &str) -> Option<Material> {
        self.by_name.get(name).copied()
    }

    pub fn name(&self, id: Material) -> Option<&str> {
        self.names.get(id.0 as usize).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn from_toml_str(toml_str: &str) -> Result<Self, Box<dyn Error>> {
        let cfg: PaletteConfig = toml::from_str(toml_str)?;
        Ok(Self::from_names(cfg.materials)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, Box<dyn Error>> {
        let s = fs::read_to_string(path)?;
        Self::from_toml_str(&s)
    }
}

impl Default for MaterialPalette {
    fn default() -> Self {
        let names: Vec<String> = DEFAULT_MATERIALS.iter().map(|n| n.to_string()).collect();
        let by_name = names
            .iter()
            .enumerate()
            .map(|(i, n)| (n.clone(), Material(i as u16)))
            .collect();
        Self { names, by_name }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaletteError {
    /// Ids are 16-bit; the named material did not fit.
    TooManyMaterials(String),
}

impl fmt::Display for PaletteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PaletteError::TooManyMaterials(name) => {
                write!(f, "palette is full; cannot add material '{}'", name)
            }
        }
    }
}

impl Error for PaletteError {}

// --- Config ---

#[derive(Deserialize)]
pub struct PaletteConfig {
    // materials = ["air", "bedrock", ...]
    pub materials: Vec<String>,
}
