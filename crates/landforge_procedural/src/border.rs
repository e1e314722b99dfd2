//! # Biome Border Blending
//!
//! Fades a tile's biome into its neighbours.
//!
//! Each bordering biome brings its own selection field, authored facing a
//! fixed direction. It is rotated by `angle + 90°` about the map centre so
//! that it faces that neighbour, and each cell takes the biome whose rotated
//! field scores highest there. Fields drawn independently per border keep
//! borders at close angles from shadowing each other.

use landforge_core::grid::rotate;
use landforge_core::{Grid, GridFunction, MaxSelect};

use crate::tile::{BiomeId, BorderingBiome};

/// Directional biome selection with an optional authored override.
pub struct BiomeBorderBlend {
    select: MaxSelect<BiomeId>,
}

impl BiomeBorderBlend {
    /// Builds the blend for a `map_width` x `map_height` map.
    ///
    /// `selections` pairs up with `borders`; a border without a selection
    /// takes no part. Wherever `pre` yields a biome, that biome wins.
    /// Elsewhere the highest positive border score picks the neighbour, and
    /// `primary` is kept when no score exceeds zero.
    #[must_use]
    pub fn new(
        primary: BiomeId,
        pre: Option<Grid<Option<BiomeId>>>,
        borders: &[BorderingBiome],
        selections: Vec<Grid<f64>>,
        map_width: u32,
        map_height: u32,
    ) -> Self {
        let pivot_x = f64::from(map_width) / 2.0;
        let pivot_z = f64::from(map_height) / 2.0;

        let (candidates, labels): (Vec<Grid<f64>>, Vec<BiomeId>) = borders
            .iter()
            .zip(selections)
            .map(|(border, selection)| {
                let facing = rotate(selection, pivot_x, pivot_z, border.angle + 90.0);
                (facing, border.biome.clone())
            })
            .unzip();

        Self {
            select: MaxSelect::new(pre, candidates, labels, primary),
        }
    }

    /// Number of bordering biomes taking part.
    #[must_use]
    pub fn border_count(&self) -> usize {
        self.select.candidate_count()
    }
}

impl GridFunction<BiomeId> for BiomeBorderBlend {
    #[inline]
    fn value_at(&self, x: f64, z: f64) -> BiomeId {
        self.select.value_at(x, z)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use landforge_core::grid::{constant, from_fn};

    /// Scores rise toward -z in authoring space, so after the +90° offset a
    /// border at angle 0 faces +x.
    fn gradient() -> Grid<f64> {
        from_fn(|_x, z| (50.0 - z) / 50.0)
    }

    #[test]
    fn test_no_borders_returns_primary() {
        let blend = BiomeBorderBlend::new(BiomeId::new("Tundra"), None, &[], vec![constant(5.0)], 100, 100);
        assert_eq!(blend.border_count(), 0);
        for i in 0..20 {
            let c = f64::from(i) * 5.0;
            assert_eq!(blend.value_at(c, 100.0 - c).as_str(), "Tundra");
        }
    }

    #[test]
    fn test_border_faces_its_angle() {
        let borders = [BorderingBiome::new("Desert", 0.0)];
        let blend = BiomeBorderBlend::new(BiomeId::new("Forest"), None, &borders, vec![gradient()], 100, 100);

        assert_eq!(blend.value_at(95.0, 50.0).as_str(), "Desert");
        assert_eq!(blend.value_at(5.0, 50.0).as_str(), "Forest");
    }

    #[test]
    fn test_override_wins() {
        let pre: Grid<Option<BiomeId>> = constant(Some(BiomeId::new("Lake")));
        let borders = [BorderingBiome::new("Desert", 0.0), BorderingBiome::new("Swamp", 180.0)];
        let selections = vec![constant(1.0), constant(1.0)];
        let blend = BiomeBorderBlend::new(BiomeId::new("Forest"), Some(pre), &borders, selections, 100, 100);

        assert_eq!(blend.value_at(95.0, 50.0).as_str(), "Lake");
        assert_eq!(blend.value_at(5.0, 50.0).as_str(), "Lake");
    }

    #[test]
    fn test_equal_scores_keep_first_border() {
        let borders = [BorderingBiome::new("Desert", 0.0), BorderingBiome::new("Swamp", 90.0)];
        let selections = vec![constant(0.5), constant(0.5)];
        let blend = BiomeBorderBlend::new(BiomeId::new("Forest"), None, &borders, selections, 100, 100);
        assert_eq!(blend.value_at(10.0, 10.0).as_str(), "Desert");
    }

    #[test]
    fn test_borders_at_one_angle_use_their_own_fields() {
        // Desert scores on the left half, Swamp on the right
        let borders = [BorderingBiome::new("Desert", 0.0), BorderingBiome::new("Swamp", 0.0)];
        let left = from_fn(|x, _z| if x < 50.0 { 1.0 } else { 0.0 });
        let right = from_fn(|x, _z| if x >= 50.0 { 1.0 } else { 0.0 });
        let blend = BiomeBorderBlend::new(BiomeId::new("Forest"), None, &borders, vec![left, right], 100, 100);

        assert_eq!(blend.border_count(), 2);
        assert_eq!(blend.value_at(50.0, 20.0).as_str(), "Desert");
        assert_eq!(blend.value_at(50.0, 80.0).as_str(), "Swamp");
    }

    #[test]
    fn test_border_without_selection_is_skipped() {
        let borders = [BorderingBiome::new("Desert", 0.0), BorderingBiome::new("Swamp", 0.0)];
        let blend = BiomeBorderBlend::new(BiomeId::new("Forest"), None, &borders, vec![constant(1.0)], 100, 100);
        assert_eq!(blend.border_count(), 1);
        assert_eq!(blend.value_at(10.0, 10.0).as_str(), "Desert");
    }
}
