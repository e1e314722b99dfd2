//! # Coast Classification
//!
//! Splits a coast noise value into deep water, shallow water and beach.

use serde::{Deserialize, Serialize};

use crate::tile::BiomeId;

/// Band a coast noise value falls into.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CoastTerrain {
    /// Open water.
    Deep,
    /// Wadeable water.
    Shallow,
    /// Dry shoreline.
    Beach,
}

/// Thresholds and terrain names for coast painting.
///
/// Defaults keep the host's own terrain. Overrides replace a band's terrain
/// name outright.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoastConfig {
    /// Values below this are deep water.
    pub threshold_shallow: f64,
    /// Values below this (and above `threshold_shallow`) are shallow water.
    pub threshold_beach: f64,
    /// Replaces the deep water terrain.
    pub deep_terrain: Option<String>,
    /// Replaces the shallow water terrain.
    pub shallow_terrain: Option<String>,
    /// Replaces the beach terrain.
    pub beach_terrain: Option<String>,
}

impl Default for CoastConfig {
    fn default() -> Self {
        Self {
            threshold_shallow: 0.1,
            threshold_beach: 0.45,
            deep_terrain: None,
            shallow_terrain: None,
            beach_terrain: None,
        }
    }
}

/// Symbolic name resolved by the host to its deep water terrain.
pub const DEEP_WATER: &str = "$water=deep";
/// Symbolic name resolved by the host to its shallow water terrain.
pub const SHALLOW_WATER: &str = "$water=shallow";

impl CoastConfig {
    /// Classifies a coast noise value. Values of 1 or more are inland.
    #[must_use]
    pub fn classify(&self, noise: f64) -> Option<CoastTerrain> {
        if noise < self.threshold_shallow {
            Some(CoastTerrain::Deep)
        } else if noise < self.threshold_beach {
            Some(CoastTerrain::Shallow)
        } else if noise < 1.0 {
            Some(CoastTerrain::Beach)
        } else {
            None
        }
    }

    /// Terrain name to paint for `band` on a tile of `biome`.
    ///
    /// Beaches are sand, or ice on sea-ice tiles.
    #[must_use]
    pub fn terrain_name(&self, band: CoastTerrain, biome: &BiomeId) -> String {
        let (custom, fallback) = match band {
            CoastTerrain::Deep => (&self.deep_terrain, DEEP_WATER),
            CoastTerrain::Shallow => (&self.shallow_terrain, SHALLOW_WATER),
            CoastTerrain::Beach => {
                let beach = if biome.as_str() == "SeaIce" { "Ice" } else { "Sand" };
                (&self.beach_terrain, beach)
            }
        };
        custom.clone().unwrap_or_else(|| fallback.to_string())
    }
}
