//! # Landforms
//!
//! A landform is a manifest plus the node graph that generates it.
//!
//! The graph works in node space. The accessors here read the terminal
//! nodes and hand back map-space grids:
//!
//! ```text
//!   OutputElevation.Elevation ──transform(1/f)──▶ elevation()   (else baseline)
//!   OutputBiomeGrid.Biome Grid ─transform(1/f)─┐
//!   OutputBiomeGrid.Transitions ─transform(1/f)┴▶ biome_grid()  (border blend)
//!   OutputCaves.Caves ─────────transform(1/f)──▶ caves()        (else zero)
//!   OutputCoast.Coast ─────────transform(1/f)──▶ coast_terrain() (else none)
//! ```
//!
//! Every node seed mixes in the seed of the tile being generated, so one
//! landform looks different on every tile and the same on revisits.

use std::sync::Arc;

use landforge_core::grid;
use landforge_core::{Grid, GridBuffer, GridFunction, LandformError, LandformResult};
use landforge_procedural::{BiomeBorderBlend, BiomeId, CoastConfig, TileInfo, WorldTileRequirement};
use tracing::debug;

use crate::definition::{EdgeDefinition, LandformDefinition, LandformManifest, NodeDefinition};
use crate::graph::{GenerationContext, LandformGraph, PortValue};
use crate::node::{NodeKind, Singleton};
use crate::settings::GenerationSettings;

/// The map-space layers of a generated landform.
#[derive(Clone, Debug, PartialEq)]
pub struct GeneratedLandform {
    /// Elevation per map cell.
    pub elevation: GridBuffer<f64>,
    /// Biome per map cell.
    pub biomes: GridBuffer<BiomeId>,
    /// Cave mask per map cell; positive where carved.
    pub caves: GridBuffer<f64>,
    /// Coast terrain per map cell; `None` inland.
    pub terrain: GridBuffer<Option<String>>,
}

/// A named landform graph.
#[derive(Debug)]
pub struct Landform {
    /// Identity and bookkeeping.
    pub manifest: LandformManifest,
    graph: LandformGraph,
}

impl Landform {
    /// An empty landform.
    #[must_use]
    pub fn new(manifest: LandformManifest) -> Self {
        Self {
            manifest,
            graph: LandformGraph::default(),
        }
    }

    /// Builds the graph described by `definition`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidDefinition` naming `source_name` if a node id clashes
    /// or an edge cannot be connected.
    pub fn from_definition(definition: LandformDefinition, source_name: &str) -> LandformResult<Self> {
        let invalid = |e: LandformError| LandformError::InvalidDefinition {
            source_name: source_name.to_string(),
            reason: e.to_string(),
        };

        let mut graph = LandformGraph::new(definition.root_seed);
        for node in definition.nodes {
            graph.add_node_with_id(node.id, node.kind).map_err(invalid)?;
        }
        for edge in &definition.edges {
            graph
                .connect(edge.from, &edge.from_port, edge.to, &edge.to_port)
                .map_err(invalid)?;
        }

        Ok(Self {
            manifest: definition.manifest,
            graph,
        })
    }

    /// The storable form of this landform.
    #[must_use]
    pub fn to_definition(&self) -> LandformDefinition {
        LandformDefinition {
            root_seed: self.graph.root_seed(),
            manifest: self.manifest.clone(),
            nodes: self
                .graph
                .nodes()
                .map(|(id, kind)| NodeDefinition { id, kind: kind.clone() })
                .collect(),
            edges: self
                .graph
                .edges()
                .into_iter()
                .map(|edge| EdgeDefinition {
                    from: edge.from,
                    from_port: edge.from_port.to_string(),
                    to: edge.to,
                    to_port: edge.to_port.to_string(),
                })
                .collect(),
        }
    }

    /// The manifest id.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.manifest.id
    }

    /// The node graph.
    #[must_use]
    pub const fn graph(&self) -> &LandformGraph {
        &self.graph
    }

    /// The node graph, for structural edits.
    pub fn graph_mut(&mut self) -> &mut LandformGraph {
        &mut self.graph
    }

    /// The placement requirements, if the graph has a requirement node.
    #[must_use]
    pub fn world_tile_requirement(&self) -> Option<&WorldTileRequirement> {
        let node = self.graph.singleton(Singleton::WorldTileReq)?;
        match self.graph.node(node)? {
            NodeKind::WorldTileReq(requirement) => Some(requirement),
            _ => None,
        }
    }

    // =========================================================================
    // Map-space outputs
    // =========================================================================

    /// Final elevation in map space; the context's baseline when the graph
    /// defines none.
    #[must_use]
    pub fn elevation(&self) -> Grid<f64> {
        let context = self.graph.context();
        match self.terminal_input(Singleton::OutputElevation, "Elevation") {
            Some(PortValue::Value(supplier)) => grid::transform(supplier.get(), 1.0 / context.node_space_factor),
            _ => context.baseline_elevation,
        }
    }

    /// Final biome per map cell.
    ///
    /// Cells where the biome input yields nothing fall back to the tile's
    /// biome, blended into the bordering biomes when `Transitions` is
    /// connected. `Transitions` is pulled once per border under its own
    /// seed draw, so every border gets an independent selection field.
    pub fn biome_grid(&mut self) -> Grid<BiomeId> {
        let context = self.graph.context();
        let to_map = 1.0 / context.node_space_factor;
        let borders = context.tile.bordering_biomes.as_slice();

        let pre = match self.terminal_input(Singleton::OutputBiomeGrid, "Biome Grid") {
            Some(PortValue::Biome(supplier)) => Some(grid::transform(supplier.get(), to_map)),
            _ => None,
        };
        let selections: Vec<Grid<f64>> = match self.terminal_input(Singleton::OutputBiomeGrid, "Transitions") {
            Some(PortValue::Value(supplier)) if !borders.is_empty() => {
                let selections = (1..=borders.len() as u64)
                    .map(|draw| {
                        self.graph.redraw(draw);
                        grid::transform(supplier.get(), to_map)
                    })
                    .collect();
                self.graph.redraw(0);
                selections
            }
            _ => Vec::new(),
        };

        let (map_width, map_height) = context.tile.map_size;
        Arc::new(BiomeBorderBlend::new(
            context.tile.biome.clone(),
            pre,
            borders,
            selections,
            map_width,
            map_height,
        ))
    }

    /// Cave mask in map space; zero when the graph carves nothing.
    #[must_use]
    pub fn caves(&self) -> Grid<f64> {
        match self.terminal_input(Singleton::OutputCaves, "Caves") {
            Some(PortValue::Value(supplier)) => {
                grid::transform(supplier.get(), 1.0 / self.graph.context().node_space_factor)
            }
            _ => grid::zero(),
        }
    }

    /// Coast noise in map space, if the graph defines any.
    #[must_use]
    pub fn coast(&self) -> Option<Grid<f64>> {
        match self.terminal_input(Singleton::OutputCoast, "Coast") {
            Some(PortValue::Value(supplier)) => Some(grid::transform(
                supplier.get(),
                1.0 / self.graph.context().node_space_factor,
            )),
            _ => None,
        }
    }

    /// Terrain painted by the coast noise: deep water, shallow water or
    /// beach per `config`, `None` inland or when the graph has no coast.
    #[must_use]
    pub fn coast_terrain(&self, config: &CoastConfig) -> Grid<Option<String>> {
        let Some(coast) = self.coast() else {
            return grid::constant(None);
        };
        let config = config.clone();
        let biome = self.graph.context().tile.biome;
        grid::from_fn(move |x, z| {
            config
                .classify(coast.value_at(x, z))
                .map(|band| config.terrain_name(band, &biome))
        })
    }

    /// Generates the landform for `tile` and samples every map cell.
    ///
    /// Node seeds mix in `tile.seed`; the same tile always yields the same
    /// layers.
    pub fn generate(&mut self, tile: TileInfo, baseline: Grid<f64>, settings: &GenerationSettings) -> GeneratedLandform {
        let factor = settings.node_space_factor(tile.map_width(), tile.map_height());
        let context = GenerationContext::new(tile, baseline, factor);
        let (width, height) = (context.map_width(), context.map_height());

        debug!(
            landform = %self.manifest.id,
            tile_seed = context.tile.seed.value(),
            width,
            height,
            node_space_factor = factor,
            "Generating landform"
        );
        self.graph.set_context(context);

        let elevation = GridBuffer::sample(&*self.elevation(), width, height);
        let caves = GridBuffer::sample(&*self.caves(), width, height);
        let terrain = GridBuffer::sample(&*self.coast_terrain(&settings.coast), width, height);
        let biomes = GridBuffer::sample(&*self.biome_grid(), width, height);
        GeneratedLandform {
            elevation,
            biomes,
            caves,
            terrain,
        }
    }

    fn terminal_input(&self, slot: Singleton, port: &str) -> Option<PortValue> {
        let node = self.graph.singleton(slot)?;
        self.graph.input(node, port).ok().flatten()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::MathOp;
    use landforge_core::WorldSeed;
    use landforge_procedural::BorderingBiome;

    fn tile(size: u32) -> TileInfo {
        TileInfo {
            map_size: (size, size),
            ..TileInfo::default()
        }
    }

    fn unscaled() -> GenerationSettings {
        GenerationSettings {
            enable_landform_scaling: false,
            ..GenerationSettings::default()
        }
    }

    #[test]
    fn test_empty_graph_uses_baseline() {
        let mut landform = Landform::new(LandformManifest::new("Flat"));
        let generated = landform.generate(tile(20), grid::constant(7.0), &unscaled());

        assert!(generated.elevation.as_slice().iter().all(|&v| v == 7.0));
        assert!(generated.caves.as_slice().iter().all(|&v| v == 0.0));
        assert!(generated.biomes.as_slice().iter().all(|b| b.as_str() == "TemperateForest"));
        assert!(generated.terrain.as_slice().iter().all(Option::is_none));
    }

    #[test]
    fn test_coast_paints_terrain() {
        let mut landform = Landform::new(LandformManifest::new("Shore"));
        let graph = landform.graph_mut();
        let shallow = graph.add_node(NodeKind::Const { value: 0.3 });
        let output = graph.add_node(NodeKind::OutputCoast);
        graph.connect(shallow, "Output", output, "Coast").unwrap();

        let generated = landform.generate(tile(16), grid::zero(), &unscaled());
        assert!(generated.terrain.as_slice().iter().all(|t| t.as_deref() == Some("$water=shallow")));

        let mut settings = unscaled();
        settings.coast.shallow_terrain = Some("Marsh".to_string());
        let generated = landform.generate(tile(16), grid::zero(), &settings);
        assert!(generated.terrain.as_slice().iter().all(|t| t.as_deref() == Some("Marsh")));

        // Inland values paint nothing
        let graph = landform.graph_mut();
        let inland = graph.add_node(NodeKind::Const { value: 1.5 });
        graph.connect(inland, "Output", output, "Coast").unwrap();
        let generated = landform.generate(tile(16), grid::zero(), &unscaled());
        assert!(generated.terrain.as_slice().iter().all(Option::is_none));
    }

    #[test]
    fn test_elevation_scaled_to_map() {
        let mut landform = Landform::new(LandformManifest::new("Ramp"));
        let graph = landform.graph_mut();
        let input = graph.add_node(NodeKind::InputElevation);
        let output = graph.add_node(NodeKind::OutputElevation);
        graph.connect(input, "Elevation", output, "Elevation").unwrap();

        // Node space is 250 cells across a 125-cell map
        let ramp = grid::from_fn(|x, _z| x);
        let generated = landform.generate(tile(125), ramp, &GenerationSettings::default());
        assert_eq!(*generated.elevation.get(40, 3), 40.0);
        assert_eq!(*generated.elevation.get(124, 0), 124.0);
    }

    #[test]
    fn test_node_space_constants_survive_scaling() {
        let mut landform = Landform::new(LandformManifest::new("Raised"));
        let graph = landform.graph_mut();
        let input = graph.add_node(NodeKind::InputElevation);
        let lift = graph.add_node(NodeKind::Const { value: 5.0 });
        let sum = graph.add_node(NodeKind::Math { op: MathOp::Add });
        let output = graph.add_node(NodeKind::OutputElevation);
        graph.connect(input, "Elevation", sum, "A").unwrap();
        graph.connect(lift, "Output", sum, "B").unwrap();
        graph.connect(sum, "Output", output, "Elevation").unwrap();

        let generated = landform.generate(tile(500), grid::constant(10.0), &GenerationSettings::default());
        assert!(generated.elevation.as_slice().iter().all(|&v| v == 15.0));
    }

    #[test]
    fn test_transitions_blend_borders() {
        let mut landform = Landform::new(LandformManifest::new("Edge"));
        let graph = landform.graph_mut();
        let selection = graph.add_node(NodeKind::Const { value: 1.0 });
        let output = graph.add_node(NodeKind::OutputBiomeGrid);
        graph.connect(selection, "Output", output, "Transitions").unwrap();

        let mut info = tile(10);
        info.bordering_biomes = vec![BorderingBiome::new("Desert", 0.0)];
        let generated = landform.generate(info.clone(), grid::zero(), &unscaled());
        assert!(generated.biomes.as_slice().iter().all(|b| b.as_str() == "Desert"));

        // Without transitions the borders are ignored
        landform.graph_mut().disconnect(output, "Transitions").unwrap();
        let generated = landform.generate(info, grid::zero(), &unscaled());
        assert!(generated.biomes.as_slice().iter().all(|b| b.as_str() == "TemperateForest"));
    }

    #[test]
    fn test_definition_round_trip() {
        let mut landform = Landform::new(LandformManifest::new("Hills"));
        let graph = landform.graph_mut();
        graph.set_root_seed(WorldSeed::new(99));
        let noise = graph.add_node(NodeKind::Noise(landforge_procedural::NoiseParams::default()));
        let output = graph.add_node(NodeKind::OutputElevation);
        graph.connect(noise, "Output", output, "Elevation").unwrap();
        graph
            .add_node_with_id(crate::node::NodeId(10), NodeKind::WorldTileReq(WorldTileRequirement::default()))
            .unwrap();

        let definition = landform.to_definition();
        assert_eq!(definition.nodes.len(), 3);
        assert_eq!(definition.edges.len(), 1);

        let mut rebuilt = Landform::from_definition(definition.clone(), "Hills.toml").unwrap();
        assert_eq!(rebuilt.to_definition(), definition);
        assert_eq!(rebuilt.graph().root_seed(), WorldSeed::new(99));
        assert!(rebuilt.world_tile_requirement().is_some());

        let a = landform.generate(tile(30), grid::zero(), &unscaled());
        let b = rebuilt.generate(tile(30), grid::zero(), &unscaled());
        assert_eq!(a, b);
    }

    #[test]
    fn test_bad_edge_is_invalid_definition() {
        let mut definition = Landform::new(LandformManifest::new("Broken")).to_definition();
        definition.edges.push(EdgeDefinition {
            from: crate::node::NodeId(1),
            from_port: "Output".to_string(),
            to: crate::node::NodeId(2),
            to_port: "A".to_string(),
        });
        let err = Landform::from_definition(definition, "Broken.toml").unwrap_err();
        assert!(matches!(err, LandformError::InvalidDefinition { ref source_name, .. } if source_name == "Broken.toml"));
    }
}
