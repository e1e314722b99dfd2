//! Picks the landform for a world tile.

use landforge_procedural::TileInfo;
use rand::Rng;

use crate::landform::Landform;

/// Chooses one landform that fits `tile`, weighted by commonness.
///
/// Landforms without a requirement node never qualify. Returns `None` when
/// nothing fits or every fitting landform has zero commonness.
pub fn select_landform<'a, R: Rng + ?Sized>(
    tile: &TileInfo,
    candidates: impl IntoIterator<Item = &'a Landform>,
    rng: &mut R,
) -> Option<&'a Landform> {
    let eligible: Vec<(&Landform, f64)> = candidates
        .into_iter()
        .filter_map(|landform| {
            let requirement = landform.world_tile_requirement()?;
            let weight = requirement.commonness;
            (requirement.check_requirements(tile) && weight > 0.0 && weight.is_finite()).then_some((landform, weight))
        })
        .collect();

    let total: f64 = eligible.iter().map(|(_, weight)| weight).sum();
    if eligible.is_empty() || total <= 0.0 {
        return None;
    }

    let mut roll = rng.gen::<f64>() * total;
    for &(landform, weight) in &eligible {
        if roll < weight {
            return Some(landform);
        }
        roll -= weight;
    }
    // Rounding can leave the roll just past the last weight
    eligible.last().map(|(landform, _)| *landform)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::LandformManifest;
    use crate::node::NodeKind;
    use landforge_procedural::{Topology, WorldTileRequirement};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn landform(id: &str, requirement: Option<WorldTileRequirement>) -> Landform {
        let mut landform = Landform::new(LandformManifest::new(id));
        if let Some(requirement) = requirement {
            landform.graph_mut().add_node(NodeKind::WorldTileReq(requirement));
        }
        landform
    }

    fn weighted(commonness: f64) -> WorldTileRequirement {
        WorldTileRequirement {
            commonness,
            ..WorldTileRequirement::default()
        }
    }

    #[test]
    fn test_requires_requirement_node() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let candidates = [landform("Bare", None)];
        assert!(select_landform(&TileInfo::default(), &candidates, &mut rng).is_none());
    }

    #[test]
    fn test_filters_by_requirement() {
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        let coastal = WorldTileRequirement {
            topology: Topology::CoastOneSide,
            ..weighted(100.0)
        };
        let candidates = [landform("Coast", Some(coastal)), landform("Plain", Some(weighted(0.01)))];
        for _ in 0..20 {
            let picked = select_landform(&TileInfo::default(), &candidates, &mut rng).unwrap();
            assert_eq!(picked.id(), "Plain");
        }
    }

    #[test]
    fn test_zero_commonness_never_picked() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let candidates = [landform("Never", Some(weighted(0.0)))];
        assert!(select_landform(&TileInfo::default(), &candidates, &mut rng).is_none());
    }

    #[test]
    fn test_weights_shape_the_draw() {
        let mut rng = ChaCha8Rng::seed_from_u64(4);
        let candidates = [landform("Rare", Some(weighted(1.0))), landform("Common", Some(weighted(9.0)))];
        let common = (0..1000)
            .filter(|_| select_landform(&TileInfo::default(), &candidates, &mut rng).unwrap().id() == "Common")
            .count();
        assert!((820..=970).contains(&common), "common picked {common} times");
    }
}
