//! # Landform Generation
//!
//! End-to-end runs from a definition to sampled map layers.

use landforge::{
    GenerationSettings, Landform, LandformDefinition, LandformManifest, NodeKind, RotateParams, Singleton,
    TunnelNodeParams,
};
use landforge_core::{grid, WorldSeed};
use landforge_procedural::{BorderingBiome, NoiseParams, TileInfo};

const CAVERNS: &str = r#"
root_seed = 2024

[manifest]
id = "Caverns"
display_name = "Caverns"
revision_version = 2

[[nodes]]
id = 1
kind = "InputElevation"

[[nodes]]
id = 2
kind = { Noise = { frequency = 0.03, octaves = 3, scale = 0.5, bias = 0.5 } }

[[nodes]]
id = 3
kind = { Math = { op = "Add" } }

[[nodes]]
id = 4
kind = "OutputElevation"

[[nodes]]
id = 5
kind = { Const = { value = 1.0 } }

[[nodes]]
id = 6
kind = { Tunnels = { input_threshold = 0.5 } }

[[nodes]]
id = 7
kind = "OutputCaves"

[[nodes]]
id = 8
kind = { WorldTileReq = { commonness = 3.0, topology = "Any", map_size = { min = 50.0, max = 500.0 } } }

[[edges]]
from = 1
from_port = "Elevation"
to = 3
to_port = "A"

[[edges]]
from = 2
from_port = "Output"
to = 3
to_port = "B"

[[edges]]
from = 3
from_port = "Output"
to = 4
to_port = "Elevation"

[[edges]]
from = 5
from_port = "Output"
to = 6
to_port = "Input"

[[edges]]
from = 6
from_port = "Output"
to = 7
to_port = "Caves"
"#;

fn tile(size: u32) -> TileInfo {
    TileInfo {
        map_size: (size, size),
        ..TileInfo::default()
    }
}

fn caverns() -> Landform {
    let definition = LandformDefinition::from_toml_str(CAVERNS, "Caverns.toml").unwrap();
    Landform::from_definition(definition, "Caverns.toml").unwrap()
}

#[test]
fn test_missing_elevation_falls_back_to_baseline() {
    let mut landform = Landform::new(LandformManifest::new("CavesOnly"));
    let graph = landform.graph_mut();
    let rock = graph.add_node(NodeKind::Const { value: 1.0 });
    let tunnels = graph.add_node(NodeKind::Tunnels(TunnelNodeParams::default()));
    let caves = graph.add_node(NodeKind::OutputCaves);
    graph.connect(rock, "Output", tunnels, "Input").unwrap();
    graph.connect(tunnels, "Output", caves, "Caves").unwrap();

    let baseline = grid::from_fn(|x, z| x * 0.5 + z);
    let generated = landform.generate(tile(50), baseline, &GenerationSettings::default());

    assert_eq!(*generated.elevation.get(10, 4), 9.0);
    assert_eq!(*generated.elevation.get(49, 49), 73.5);
    assert!(generated.caves.count_where(|&c| c > 0.0) > 0);
}

#[test]
fn test_definition_generates_every_layer() {
    let mut landform = caverns();
    assert_eq!(landform.id(), "Caverns");
    assert_eq!(landform.world_tile_requirement().unwrap().commonness, 3.0);

    let generated = landform.generate(tile(80), grid::constant(10.0), &GenerationSettings::default());
    assert_eq!((generated.elevation.width(), generated.elevation.height()), (80, 80));

    // Half-amplitude noise around 0.5 on top of the baseline
    assert!(generated.elevation.as_slice().iter().all(|&e| (9.9..=11.1).contains(&e)));
    assert!(generated.elevation.as_slice().iter().any(|&e| e != generated.elevation.as_slice()[0]));
    assert!(generated.caves.count_where(|&c| c > 0.0) > 0);
    assert!(generated.biomes.as_slice().iter().all(|b| b.as_str() == "TemperateForest"));
}

#[test]
fn test_regeneration_is_reproducible() {
    let mut landform = caverns();
    let settings = GenerationSettings::default();

    let first = landform.generate(tile(64), grid::zero(), &settings);
    let second = landform.generate(tile(64), grid::zero(), &settings);
    assert_eq!(first, second);

    landform.graph().reseed(WorldSeed::new(7));
    let reseeded = landform.generate(tile(64), grid::zero(), &settings);
    assert_ne!(reseeded.elevation, first.elevation);

    landform.graph().reseed(WorldSeed::new(2024));
    assert_eq!(landform.generate(tile(64), grid::zero(), &settings), first);
}

#[test]
fn test_same_landform_on_different_map_sizes() {
    let mut landform = caverns();
    let settings = GenerationSettings::default();

    let small = landform.generate(tile(100), grid::zero(), &settings);
    let large = landform.generate(tile(200), grid::zero(), &settings);

    // Node space is stretched over the map, so features land in the same place
    let a = *small.elevation.get(30, 40);
    let b = *large.elevation.get(60, 80);
    assert!((a - b).abs() < 1e-9, "{a} vs {b}");
}

#[test]
fn test_transitions_reach_bordering_biomes() {
    let mut landform = caverns();
    let graph = landform.graph_mut();
    let gradient = graph.add_node(NodeKind::Rotate(RotateParams::default()));
    let ramp = graph.singleton(Singleton::InputElevation).unwrap();
    let output = graph.add_node(NodeKind::OutputBiomeGrid);
    graph.connect(ramp, "Elevation", gradient, "Input").unwrap();
    graph.connect(gradient, "Output", output, "Transitions").unwrap();

    let mut info = tile(100);
    info.bordering_biomes = vec![BorderingBiome::new("Desert", 0.0)];

    // Scores are positive for z < 50; the border's 90 degree offset turns them to face +x
    let baseline = grid::from_fn(|_x, z| 50.0 - z);
    let settings = GenerationSettings {
        enable_landform_scaling: false,
        ..GenerationSettings::default()
    };
    let generated = landform.generate(info, baseline, &settings);

    assert_eq!(generated.biomes.get(95, 50).as_str(), "Desert");
    assert_eq!(generated.biomes.get(5, 50).as_str(), "TemperateForest");
}

#[test]
fn test_toml_round_trip_of_generated_definition() {
    let mut landform = caverns();
    let text = landform.to_definition().to_toml_string().unwrap();
    let mut again = Landform::from_definition(LandformDefinition::from_toml_str(&text, "again").unwrap(), "again").unwrap();

    let settings = GenerationSettings::default();
    assert_eq!(
        again.generate(tile(60), grid::zero(), &settings),
        landform.generate(tile(60), grid::zero(), &settings)
    );
}

#[test]
fn test_tile_seed_varies_output() {
    let mut landform = caverns();
    let settings = GenerationSettings::default();
    let seeded = |seed| TileInfo {
        seed: WorldSeed::new(seed),
        ..tile(64)
    };

    let first = landform.generate(seeded(1), grid::zero(), &settings);
    let second = landform.generate(seeded(2), grid::zero(), &settings);
    assert_ne!(first.elevation, second.elevation);

    // Revisiting a tile gives it back unchanged
    assert_eq!(landform.generate(seeded(1), grid::zero(), &settings), first);
}

#[test]
fn test_borders_at_one_angle_both_appear() {
    let mut landform = Landform::new(LandformManifest::new("Patchwork"));
    let graph = landform.graph_mut();
    let noise = graph.add_node(NodeKind::Noise(NoiseParams {
        frequency: 0.05,
        octaves: 1,
        ..NoiseParams::default()
    }));
    let output = graph.add_node(NodeKind::OutputBiomeGrid);
    graph.connect(noise, "Output", output, "Transitions").unwrap();

    let mut info = tile(100);
    info.bordering_biomes = vec![BorderingBiome::new("Desert", 0.0), BorderingBiome::new("Swamp", 0.0)];
    let settings = GenerationSettings {
        enable_landform_scaling: false,
        ..GenerationSettings::default()
    };
    let generated = landform.generate(info.clone(), grid::zero(), &settings);

    let count = |name: &str| generated.biomes.count_where(|b| b.as_str() == name);
    assert!(count("Desert") > 0, "no desert cells");
    assert!(count("Swamp") > 0, "no swamp cells");
    assert!(count("Desert") + count("Swamp") < 100 * 100);

    assert_eq!(landform.generate(info, grid::zero(), &settings), generated);
}
