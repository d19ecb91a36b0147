use hashbrown::HashMap;
use serde::{Deserialize, Serialize};

/// Per-column biome attribute.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BiomeId(pub u8);

impl BiomeId {
    pub const OCEAN: BiomeId = BiomeId(0);
    pub const PLAINS: BiomeId = BiomeId(1);
}

// Bedrock edition numbering.
const VANILLA_BIOMES: &[(&str, u8)] = &[
    ("OCEAN", 0),
    ("PLAINS", 1),
    ("DESERT", 2),
    ("EXTREME_HILLS", 3),
    ("FOREST", 4),
    ("TAIGA", 5),
    ("SWAMPLAND", 6),
    ("RIVER", 7),
    ("HELL", 8),
    ("THE_END", 9),
    ("FROZEN_OCEAN", 10),
    ("FROZEN_RIVER", 11),
    ("ICE_PLAINS", 12),
    ("ICE_MOUNTAINS", 13),
    ("MUSHROOM_ISLAND", 14),
    ("MUSHROOM_ISLAND_SHORE", 15),
    ("BEACH", 16),
    ("DESERT_HILLS", 17),
    ("FOREST_HILLS", 18),
    ("TAIGA_HILLS", 19),
    ("EXTREME_HILLS_EDGE", 20),
    ("JUNGLE", 21),
    ("JUNGLE_HILLS", 22),
    ("JUNGLE_EDGE", 23),
    ("DEEP_OCEAN", 24),
    ("STONE_BEACH", 25),
    ("COLD_BEACH", 26),
    ("BIRCH_FOREST", 27),
    ("BIRCH_FOREST_HILLS", 28),
    ("ROOFED_FOREST", 29),
    ("COLD_TAIGA", 30),
    ("COLD_TAIGA_HILLS", 31),
    ("MEGA_TAIGA", 32),
    ("MEGA_TAIGA_HILLS", 33),
    ("EXTREME_HILLS_PLUS_TREES", 34),
    ("SAVANNA", 35),
    ("SAVANNA_PLATEAU", 36),
    ("MESA", 37),
    ("MESA_PLATEAU_STONE", 38),
    ("MESA_PLATEAU", 39),
];

#[derive(Clone, Debug)]
pub struct BiomeCatalog {
    entries: Vec<(String, BiomeId)>,
    by_name: HashMap<String, BiomeId>,
}

impl BiomeCatalog {
    pub fn vanilla() -> Self {
        let entries: Vec<(String, BiomeId)> = VANILLA_BIOMES
            .iter()
            .map(|(name, id)| ((*name).to_string(), BiomeId(*id)))
            .collect();
        let by_name = entries.iter().map(|(n, id)| (n.clone(), *id)).collect();
        Self { entries, by_name }
    }

    /// Look a biome up by user input; words are joined with `_` and upper-cased.
    pub fn resolve<S: AsRef<str>>(&self, words: &[S]) -> Option<BiomeId> {
        let key = words
            .iter()
            .map(|w| w.as_ref())
            .collect::<Vec<_>>()
            .join("_")
            .to_uppercase();
        self.by_name.get(&key).copied()
    }

    pub fn get(&self, name: &str) -> Option<BiomeId> {
        self.by_name.get(&name.to_uppercase()).copied()
    }

    pub fn name_of(&self, id: BiomeId) -> String {
        self.entries
            .iter()
            .find(|(_, b)| *b == id)
            .map(|(n, _)| n.clone())
            .unwrap_or_else(|| format!("Unknown (BiomeID: {})", id.0))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(n, _)| n.as_str())
    }
}

impl Default for BiomeCatalog {
    fn default() -> Self {
        Self::vanilla()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_joins_words() {
        let cat = BiomeCatalog::vanilla();
        assert_eq!(cat.resolve(&["birch", "forest"]), Some(BiomeId(27)));
        assert_eq!(cat.resolve(&["Plains"]), Some(BiomeId::PLAINS));
        assert_eq!(cat.resolve(&["nowhere"]), None);
    }

    #[test]
    fn unknown_ids_get_a_placeholder_name() {
        let cat = BiomeCatalog::vanilla();
        assert_eq!(cat.name_of(BiomeId(4)), "FOREST");
        assert_eq!(cat.name_of(BiomeId(200)), "Unknown (BiomeID: 200)");
    }
}
