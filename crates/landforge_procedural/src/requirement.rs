//! # World Tile Requirements
//!
//! Decides whether a landform may be placed on a world tile.
//!
//! The check is a short-circuiting chain evaluated in a fixed order:
//!
//! ```text
//! topology → hilliness → elevation → temperature → rainfall → swampiness
//!          → caves → settlements/sites → map size → road/river
//! ```
//!
//! It never fails: missing roads and rivers count as a zero score.

use serde::{Deserialize, Serialize};

use crate::tile::{TileInfo, Topology, WorldObjectKind};

/// Inclusive `[min, max]` range.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct FloatRange {
    /// Lower bound, inclusive.
    pub min: f64,
    /// Upper bound, inclusive.
    pub max: f64,
}

impl FloatRange {
    /// Creates a range.
    #[inline]
    #[must_use]
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// Returns true if `min <= value <= max`.
    #[inline]
    #[must_use]
    pub fn includes(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }
}

/// Placement constraints of a landform.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldTileRequirement {
    /// Required topology; `Any` disables the check.
    pub topology: Topology,
    /// Relative selection weight among eligible landforms.
    pub commonness: f64,
    /// Tiles with caves are allowed.
    pub allow_caves: bool,
    /// Tiles without caves are rejected.
    pub require_caves: bool,
    /// Non-player settlements are allowed.
    pub allow_settlements: bool,
    /// Non-player sites are allowed.
    pub allow_sites: bool,
    /// Hilliness level, 1 to 5.
    pub hilliness: FloatRange,
    /// Road score, `1 - movement cost multiplier`.
    pub road: FloatRange,
    /// River width.
    pub river: FloatRange,
    /// Elevation in metres.
    pub elevation: FloatRange,
    /// Average temperature.
    pub temperature: FloatRange,
    /// Yearly rainfall.
    pub rainfall: FloatRange,
    /// Swampiness.
    pub swampiness: FloatRange,
    /// The lesser of map width and height.
    pub map_size: FloatRange,
}

impl Default for WorldTileRequirement {
    fn default() -> Self {
        Self {
            topology: Topology::Inland,
            commonness: 1.0,
            allow_caves: true,
            require_caves: false,
            allow_settlements: false,
            allow_sites: false,
            hilliness: FloatRange::new(1.0, 5.0),
            road: FloatRange::new(0.0, 1.0),
            river: FloatRange::new(0.0, 1.0),
            elevation: FloatRange::new(0.0, 5000.0),
            temperature: FloatRange::new(-100.0, 100.0),
            rainfall: FloatRange::new(0.0, 5000.0),
            swampiness: FloatRange::new(0.0, 1.0),
            map_size: FloatRange::new(250.0, 1000.0),
        }
    }
}

impl WorldTileRequirement {
    /// Returns true if a landform with these requirements fits `tile`.
    #[must_use]
    pub fn check_requirements(&self, tile: &TileInfo) -> bool {
        if self.topology != Topology::Any && tile.topology != self.topology {
            return false;
        }
        if !self.hilliness.includes(f64::from(tile.hilliness.level())) {
            return false;
        }
        if !self.elevation.includes(tile.elevation)
            || !self.temperature.includes(tile.temperature)
            || !self.rainfall.includes(tile.rainfall)
            || !self.swampiness.includes(tile.swampiness)
        {
            return false;
        }
        if !self.allow_caves && tile.has_caves {
            return false;
        }
        if self.require_caves && !tile.has_caves {
            return false;
        }

        let mut expected_size = tile.map_size;
        if let Some(object) = &tile.world_object {
            match &object.kind {
                WorldObjectKind::Settlement if !self.allow_settlements && !object.player_owned => {
                    return false;
                }
                WorldObjectKind::Site { .. } if !self.allow_sites && !object.player_owned => {
                    return false;
                }
                _ => {}
            }
            if let WorldObjectKind::Site {
                preferred_map_size: Some(size),
            } = object.kind
            {
                expected_size = size;
            }
        }
        if !self.map_size_matches(expected_size) {
            return false;
        }

        let river_width = tile.main_river.map_or(0.0, |river| river.width);
        let road_multiplier = tile.main_road.map_or(1.0, |road| road.movement_cost_multiplier);
        if self.road.max <= 0.0 && road_multiplier < 1.0 {
            return false;
        }
        if self.river.max <= 0.0 && river_width > 0.0 {
            return false;
        }

        self.road.includes(1.0 - road_multiplier) || self.river.includes(river_width)
    }

    /// Map-size check alone, for maps that already exist.
    #[must_use]
    pub fn check_map_requirements(&self, map_width: u32, map_height: u32) -> bool {
        self.map_size_matches((map_width, map_height))
    }

    fn map_size_matches(&self, (width, height): (u32, u32)) -> bool {
        self.map_size.includes(f64::from(width.min(height)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tile::{Hilliness, River, Road, WorldObject};

    fn tile() -> TileInfo {
        TileInfo::default()
    }

    #[test]
    fn test_defaults_accept_default_tile() {
        assert!(WorldTileRequirement::default().check_requirements(&tile()));
    }

    #[test]
    fn test_topology_any_skips_check() {
        let mut req = WorldTileRequirement::default();
        let mut coastal = tile();
        coastal.topology = Topology::CoastOneSide;
        assert!(!req.check_requirements(&coastal));

        req.topology = Topology::Any;
        assert!(req.check_requirements(&coastal));
    }

    #[test]
    fn test_hilliness_range() {
        let req = WorldTileRequirement {
            hilliness: FloatRange::new(3.0, 4.0),
            ..WorldTileRequirement::default()
        };
        let mut t = tile();
        t.hilliness = Hilliness::LargeHills;
        assert!(req.check_requirements(&t));
        t.hilliness = Hilliness::Impassable;
        assert!(!req.check_requirements(&t));
    }

    #[test]
    fn test_caves_flags() {
        let mut t = tile();
        let forbid = WorldTileRequirement {
            allow_caves: false,
            ..WorldTileRequirement::default()
        };
        assert!(!forbid.check_requirements(&t));

        t.has_caves = false;
        assert!(forbid.check_requirements(&t));

        let require = WorldTileRequirement {
            require_caves: true,
            ..WorldTileRequirement::default()
        };
        assert!(!require.check_requirements(&t));
    }

    #[test]
    fn test_player_settlement_exempt() {
        let req = WorldTileRequirement::default();
        let mut t = tile();
        t.world_object = Some(WorldObject {
            kind: WorldObjectKind::Settlement,
            player_owned: false,
        });
        assert!(!req.check_requirements(&t));

        t.world_object = Some(WorldObject {
            kind: WorldObjectKind::Settlement,
            player_owned: true,
        });
        assert!(req.check_requirements(&t));
    }

    #[test]
    fn test_site_preferred_map_size() {
        let req = WorldTileRequirement {
            allow_sites: true,
            ..WorldTileRequirement::default()
        };
        let mut t = tile();
        t.world_object = Some(WorldObject {
            kind: WorldObjectKind::Site {
                preferred_map_size: Some((120, 300)),
            },
            player_owned: false,
        });
        // min(120, 300) is below the default 250..1000 range
        assert!(!req.check_requirements(&t));
    }

    #[test]
    fn test_road_forbidden_when_max_zero() {
        let req = WorldTileRequirement {
            road: FloatRange::new(0.0, 0.0),
            ..WorldTileRequirement::default()
        };
        let mut t = tile();
        assert!(req.check_requirements(&t));

        t.main_road = Some(Road {
            movement_cost_multiplier: 0.5,
            angle: 0.0,
        });
        assert!(!req.check_requirements(&t));
    }

    #[test]
    fn test_river_or_road_satisfies() {
        let req = WorldTileRequirement {
            road: FloatRange::new(0.4, 1.0),
            river: FloatRange::new(0.5, 1.0),
            ..WorldTileRequirement::default()
        };
        let mut t = tile();
        // Neither road score 0 nor river width 0 is in range
        assert!(!req.check_requirements(&t));

        t.main_river = Some(River {
            width: 0.8,
            angle: 90.0,
        });
        assert!(req.check_requirements(&t));
    }

    #[test]
    fn test_map_requirements() {
        let req = WorldTileRequirement::default();
        assert!(req.check_map_requirements(250, 400));
        assert!(!req.check_map_requirements(400, 200));
    }
}
