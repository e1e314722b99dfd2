//! # World Tile Descriptor
//!
//! The per-tile attributes a world provides to landform generation.
//!
//! Everything here is plain data. The engine reads it and never writes it back.

use std::fmt;
use std::sync::Arc;

use landforge_core::WorldSeed;
use serde::{Deserialize, Serialize};

/// Identity of a biome.
///
/// Cheap to clone; biome grids hand these out per sampled cell.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct BiomeId(Arc<str>);

impl BiomeId {
    /// Creates a biome id.
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self(Arc::from(name))
    }

    /// The biome's name.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for BiomeId {
    fn from(value: String) -> Self {
        Self(Arc::from(value))
    }
}

impl From<&str> for BiomeId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<BiomeId> for String {
    fn from(value: BiomeId) -> Self {
        value.0.to_string()
    }
}

impl fmt::Debug for BiomeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BiomeId({})", self.0)
    }
}

impl fmt::Display for BiomeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A neighbouring biome and the compass direction it lies in.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BorderingBiome {
    /// The neighbour's biome.
    pub biome: BiomeId,
    /// Direction of the neighbour in degrees.
    pub angle: f64,
}

impl BorderingBiome {
    /// Creates a bordering biome entry.
    #[must_use]
    pub fn new(biome: impl Into<BiomeId>, angle: f64) -> Self {
        Self {
            biome: biome.into(),
            angle,
        }
    }
}

/// Large-scale shape of the terrain around a tile.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Topology {
    /// Matches every tile. Only meaningful in requirements.
    Any,
    /// No coast or cliff.
    #[default]
    Inland,
    /// Water on one side.
    CoastOneSide,
    /// Water on two adjacent sides.
    CoastTwoSides,
    /// Water on every side.
    CoastAllSides,
    /// A single cliff face.
    CliffOneSide,
    /// Cliffs on two adjacent sides.
    CliffTwoSides,
    /// A corridor between two cliffs.
    Valley,
}

/// Terrain ruggedness, ordered from flattest to roughest.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Hilliness {
    /// Open plains.
    #[default]
    Flat = 1,
    /// Rolling hills.
    SmallHills = 2,
    /// Steep hills.
    LargeHills = 3,
    /// Mountain terrain.
    Mountainous = 4,
    /// Impassable peaks.
    Impassable = 5,
}

impl Hilliness {
    /// Numeric level in `1..=5`.
    #[inline]
    #[must_use]
    pub const fn level(self) -> u8 {
        self as u8
    }
}

/// What, if anything, occupies a tile.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum WorldObjectKind {
    /// A settlement.
    Settlement,
    /// A site, which may request its own map size.
    Site {
        /// Map size the site wants, overriding the world default.
        preferred_map_size: Option<(u32, u32)>,
    },
    /// Anything else.
    Other,
}

/// An object placed on a world tile.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WorldObject {
    /// The object's kind.
    pub kind: WorldObjectKind,
    /// True if the player owns the object.
    pub player_owned: bool,
}

/// The main road crossing a tile.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Road {
    /// Movement cost factor along the road; lower means a bigger road.
    pub movement_cost_multiplier: f64,
    /// Direction in degrees.
    pub angle: f64,
}

/// The main river crossing a tile.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct River {
    /// River width in cells.
    pub width: f64,
    /// Direction in degrees.
    pub angle: f64,
}

/// Attributes of the world tile being generated.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TileInfo {
    /// The tile's own biome.
    pub biome: BiomeId,
    /// Terrain shape classification.
    pub topology: Topology,
    /// Ruggedness.
    pub hilliness: Hilliness,
    /// Elevation in metres.
    pub elevation: f64,
    /// Average temperature in degrees Celsius.
    pub temperature: f64,
    /// Yearly rainfall in millimetres.
    pub rainfall: f64,
    /// Swampiness in `[0, 1]`.
    pub swampiness: f64,
    /// True if the tile has caves.
    pub has_caves: bool,
    /// Whatever occupies the tile.
    pub world_object: Option<WorldObject>,
    /// The largest road crossing the tile.
    pub main_road: Option<Road>,
    /// The largest river crossing the tile.
    pub main_river: Option<River>,
    /// Neighbouring biomes that differ from `biome`.
    pub bordering_biomes: Vec<BorderingBiome>,
    /// Target map width and height in cells.
    pub map_size: (u32, u32),
    /// Stable per-tile seed.
    pub seed: WorldSeed,
}

impl Default for TileInfo {
    fn default() -> Self {
        Self {
            biome: BiomeId::new("TemperateForest"),
            topology: Topology::Inland,
            hilliness: Hilliness::Flat,
            elevation: 1000.0,
            temperature: 20.0,
            rainfall: 1000.0,
            swampiness: 0.0,
            has_caves: true,
            world_object: None,
            main_road: None,
            main_river: None,
            bordering_biomes: Vec::new(),
            map_size: (250, 250),
            seed: WorldSeed::default(),
        }
    }
}

impl TileInfo {
    /// Map width in cells.
    #[inline]
    #[must_use]
    pub const fn map_width(&self) -> u32 {
        self.map_size.0
    }

    /// Map height in cells.
    #[inline]
    #[must_use]
    pub const fn map_height(&self) -> u32 {
        self.map_size.1
    }
}
