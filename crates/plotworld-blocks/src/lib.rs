//! Material and biome identifiers.
#![forbid(unsafe_code)]

pub mod biome;
pub mod material;

pub use biome::{BiomeCatalog, BiomeId};
pub use material::{Material, MaterialPalette, PaletteError};
