//! # Landform Graph
//!
//! A DAG of typed nodes evaluated lazily by pulling output ports.
//!
//! ## Ownership
//!
//! ```text
//! LandformGraph
//!   ├── nodes:      NodeId → NodeKind          (arena, ids never reused)
//!   ├── edges:      (to, input) → (from, output)
//!   ├── singletons: Singleton → NodeId         (plain id lookups)
//!   ├── shared:     generation, root seed, context  ◀── read by suppliers
//!   └── published:  NodeId → [PortValue]        (one calculation per node)
//! ```
//!
//! ## Evaluation
//!
//! Pulling an output calculates its node once and publishes one supplier per
//! output port. Calculation only wires suppliers together; the grids
//! themselves are built when a supplier is first `get()`-ed.
//!
//! Suppliers read the root seed and the generation context when they
//! compute, so reseeding or switching tiles only bumps the generation and
//! the same supplier instances recompute. Structural edits drop the
//! published suppliers so the next pull recalculates.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use landforge_core::grid;
use landforge_core::{
    Cache, Generation, Grid, GridBuffer, GridFunction, LandformError, LandformResult, RandomSource, Supplier,
    WorldSeed,
};
use landforge_procedural::{BiomeId, NoiseField, TileInfo, TunnelGenerator, TunnelOutputs};
use parking_lot::{Mutex, RwLock};
use tracing::debug;

use crate::node::{NodeId, NodeKind, PortKind, Singleton, TunnelNodeParams};

/// Scalar grid supplier.
pub type ValueSupplier = Supplier<Grid<f64>>;

/// Optional-biome grid supplier.
pub type BiomeSupplier = Supplier<Grid<Option<BiomeId>>>;

/// What the world provides for one generation run.
#[derive(Clone)]
pub struct GenerationContext {
    /// The tile being generated.
    pub tile: TileInfo,
    /// Elevation used when the graph defines none, in map space.
    pub baseline_elevation: Grid<f64>,
    /// Node-space cells per map cell.
    pub node_space_factor: f64,
}

impl GenerationContext {
    /// Creates a context.
    #[must_use]
    pub fn new(tile: TileInfo, baseline_elevation: Grid<f64>, node_space_factor: f64) -> Self {
        let node_space_factor = if node_space_factor > 0.0 && node_space_factor.is_finite() {
            node_space_factor
        } else {
            1.0
        };
        Self {
            tile,
            baseline_elevation,
            node_space_factor,
        }
    }

    /// Map width in cells, at least 1.
    #[must_use]
    pub fn map_width(&self) -> usize {
        self.tile.map_width().max(1) as usize
    }

    /// Map height in cells, at least 1.
    #[must_use]
    pub fn map_height(&self) -> usize {
        self.tile.map_height().max(1) as usize
    }
}

impl Default for GenerationContext {
    fn default() -> Self {
        Self::new(TileInfo::default(), grid::zero(), 1.0)
    }
}

impl fmt::Debug for GenerationContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GenerationContext")
            .field("tile", &self.tile)
            .field("node_space_factor", &self.node_space_factor)
            .finish_non_exhaustive()
    }
}

/// A published output port.
#[derive(Clone, Debug)]
pub enum PortValue {
    /// Scalar grid.
    Value(ValueSupplier),
    /// Optional-biome grid.
    Biome(BiomeSupplier),
}

impl PortValue {
    /// The grid type carried.
    #[must_use]
    pub const fn kind(&self) -> PortKind {
        match self {
            Self::Value(_) => PortKind::Value,
            Self::Biome(_) => PortKind::Biome,
        }
    }

    /// The scalar supplier, if this is a value port.
    #[must_use]
    pub const fn as_value(&self) -> Option<&ValueSupplier> {
        match self {
            Self::Value(s) => Some(s),
            Self::Biome(_) => None,
        }
    }

    /// The biome supplier, if this is a biome port.
    #[must_use]
    pub const fn as_biome(&self) -> Option<&BiomeSupplier> {
        match self {
            Self::Biome(s) => Some(s),
            Self::Value(_) => None,
        }
    }

    /// Returns true if both are the same supplier instance.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Value(a), Self::Value(b)) => Supplier::ptr_eq(a, b),
            (Self::Biome(a), Self::Biome(b)) => Supplier::ptr_eq(a, b),
            _ => false,
        }
    }
}

/// A connection from an output port to an input port.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Edge {
    /// Upstream node.
    pub from: NodeId,
    /// Output port on `from`.
    pub from_port: &'static str,
    /// Downstream node.
    pub to: NodeId,
    /// Input port on `to`.
    pub to_port: &'static str,
}

/// State read by suppliers at compute time.
struct Shared {
    generation: Generation,
    root_seed: AtomicU64,
    /// Extra draw mixed into node seeds; 0 leaves them untouched.
    draw: AtomicU64,
    context: RwLock<GenerationContext>,
}

impl Shared {
    fn node_seed(&self, id: NodeId) -> WorldSeed {
        let tile_seed = self.context.read().tile.seed;
        let mut seed = WorldSeed::new(self.root_seed.load(Ordering::Acquire)).mix(tile_seed);
        let draw = self.draw.load(Ordering::Acquire);
        if draw != 0 {
            seed = seed.derive(draw);
        }
        seed.for_node(id.value())
    }
}

/// The tunnel node's three grids, in node space.
#[derive(Clone)]
struct TunnelGrids {
    caves: Grid<f64>,
    depths: Grid<f64>,
    offsets: Grid<f64>,
}

/// A landform's node graph.
pub struct LandformGraph {
    nodes: BTreeMap<NodeId, NodeKind>,
    /// Input `(node, port index)` to the output feeding it.
    edges: BTreeMap<(NodeId, usize), (NodeId, usize)>,
    singletons: HashMap<Singleton, NodeId>,
    next_id: u64,
    shared: Arc<Shared>,
    published: Mutex<HashMap<NodeId, Arc<[PortValue]>>>,
    calculations: AtomicUsize,
}

impl Default for LandformGraph {
    fn default() -> Self {
        Self::new(WorldSeed::default())
    }
}

impl fmt::Debug for LandformGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LandformGraph")
            .field("nodes", &self.nodes)
            .field("edges", &self.edges.len())
            .field("root_seed", &self.root_seed())
            .finish_non_exhaustive()
    }
}

impl LandformGraph {
    /// Creates an empty graph.
    #[must_use]
    pub fn new(root_seed: WorldSeed) -> Self {
        Self {
            nodes: BTreeMap::new(),
            edges: BTreeMap::new(),
            singletons: HashMap::new(),
            next_id: 1,
            shared: Arc::new(Shared {
                generation: Generation::new(),
                root_seed: AtomicU64::new(root_seed.value()),
                draw: AtomicU64::new(0),
                context: RwLock::new(GenerationContext::default()),
            }),
            published: Mutex::new(HashMap::new()),
            calculations: AtomicUsize::new(0),
        }
    }

    // =========================================================================
    // Node lifecycle
    // =========================================================================

    /// Adds a node and returns its id.
    ///
    /// Adding a singleton kind deletes the node currently holding that slot.
    pub fn add_node(&mut self, kind: NodeKind) -> NodeId {
        let id = NodeId(self.next_id);
        self.place(id, kind);
        id
    }

    /// Adds a node under a caller-chosen id.
    ///
    /// # Errors
    ///
    /// Returns `InvalidDefinition` if the id is zero or already taken.
    pub fn add_node_with_id(&mut self, id: NodeId, kind: NodeKind) -> LandformResult<()> {
        if id.value() == 0 || self.nodes.contains_key(&id) {
            return Err(LandformError::InvalidDefinition {
                source_name: format!("node {id}"),
                reason: "node id is zero or already in use".to_string(),
            });
        }
        self.place(id, kind);
        Ok(())
    }

    fn place(&mut self, id: NodeId, kind: NodeKind) {
        if let Some(slot) = kind.singleton() {
            if let Some(existing) = self.singletons.get(&slot).copied() {
                debug!(%existing, replacement = %id, kind = kind.name(), "Replacing singleton node");
                self.detach(existing);
            }
            self.singletons.insert(slot, id);
        }
        self.nodes.insert(id, kind);
        self.next_id = self.next_id.max(id.value() + 1);
        self.invalidate();
    }

    /// Removes a node together with every edge touching it.
    ///
    /// # Errors
    ///
    /// Returns `NodeNotFound` if the node does not exist.
    pub fn remove_node(&mut self, id: NodeId) -> LandformResult<NodeKind> {
        self.detach(id).ok_or(LandformError::NodeNotFound(id.value()))
    }

    fn detach(&mut self, id: NodeId) -> Option<NodeKind> {
        let kind = self.nodes.remove(&id)?;
        self.edges.retain(|(to, _), (from, _)| *to != id && *from != id);
        if let Some(slot) = kind.singleton() {
            if self.singletons.get(&slot) == Some(&id) {
                self.singletons.remove(&slot);
            }
        }
        self.invalidate();
        Some(kind)
    }

    /// Replaces a node's parameters.
    ///
    /// # Errors
    ///
    /// Returns `NodeNotFound` for an unknown node and `InvalidConfig` if
    /// `kind` is a different kind of node.
    pub fn set_kind(&mut self, id: NodeId, kind: NodeKind) -> LandformResult<()> {
        let slot = self.nodes.get_mut(&id).ok_or(LandformError::NodeNotFound(id.value()))?;
        if slot.name() != kind.name() {
            return Err(LandformError::InvalidConfig(format!(
                "cannot turn {} node {id} into {}",
                slot.name(),
                kind.name()
            )));
        }
        *slot = kind;
        self.invalidate();
        Ok(())
    }

    /// The node's kind and parameters.
    #[must_use]
    pub fn node(&self, id: NodeId) -> Option<&NodeKind> {
        self.nodes.get(&id)
    }

    /// All nodes in id order.
    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &NodeKind)> {
        self.nodes.iter().map(|(id, kind)| (*id, kind))
    }

    /// Number of nodes.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// The node holding a singleton slot.
    #[must_use]
    pub fn singleton(&self, slot: Singleton) -> Option<NodeId> {
        self.singletons.get(&slot).copied()
    }

    // =========================================================================
    // Edges
    // =========================================================================

    /// Connects `from.out_port` to `to.in_port`, replacing any edge already
    /// feeding that input.
    ///
    /// # Errors
    ///
    /// Returns `NodeNotFound`, `PortNotFound`, `PortTypeMismatch`, or
    /// `CycleDetected` if the edge would close a loop.
    pub fn connect(&mut self, from: NodeId, out_port: &str, to: NodeId, in_port: &str) -> LandformResult<()> {
        let from_kind = self.nodes.get(&from).ok_or(LandformError::NodeNotFound(from.value()))?;
        let to_kind = self.nodes.get(&to).ok_or(LandformError::NodeNotFound(to.value()))?;

        let out_index = from_kind.output_index(out_port).ok_or_else(|| LandformError::PortNotFound {
            node: from.value(),
            port: out_port.to_string(),
            direction: "output",
        })?;
        let in_index = to_kind.input_index(in_port).ok_or_else(|| LandformError::PortNotFound {
            node: to.value(),
            port: in_port.to_string(),
            direction: "input",
        })?;

        let out_kind = from_kind.outputs()[out_index].kind;
        let in_kind = to_kind.inputs()[in_index].kind;
        if out_kind != in_kind {
            return Err(LandformError::PortTypeMismatch {
                from: out_kind.name(),
                to: in_kind.name(),
            });
        }

        if from == to || self.reaches(to, from) {
            return Err(LandformError::CycleDetected {
                from: from.value(),
                to: to.value(),
            });
        }

        self.edges.insert((to, in_index), (from, out_index));
        self.invalidate();
        Ok(())
    }

    /// Removes the edge feeding `to.in_port`. Returns true if one existed.
    ///
    /// # Errors
    ///
    /// Returns `NodeNotFound` or `PortNotFound`.
    pub fn disconnect(&mut self, to: NodeId, in_port: &str) -> LandformResult<bool> {
        let index = self.input_port_index(to, in_port)?;
        let removed = self.edges.remove(&(to, index)).is_some();
        if removed {
            self.invalidate();
        }
        Ok(removed)
    }

    /// All edges, ordered by downstream node and port.
    #[must_use]
    pub fn edges(&self) -> Vec<Edge> {
        self.edges
            .iter()
            .filter_map(|(&(to, in_index), &(from, out_index))| {
                Some(Edge {
                    from,
                    from_port: self.nodes.get(&from)?.outputs()[out_index].name,
                    to,
                    to_port: self.nodes.get(&to)?.inputs()[in_index].name,
                })
            })
            .collect()
    }

    /// True if `target` is downstream of `start` (or is `start`).
    fn reaches(&self, start: NodeId, target: NodeId) -> bool {
        let mut stack = vec![start];
        let mut seen = vec![start];
        while let Some(node) = stack.pop() {
            if node == target {
                return true;
            }
            for (&(to, _), &(from, _)) in &self.edges {
                if from == node && !seen.contains(&to) {
                    seen.push(to);
                    stack.push(to);
                }
            }
        }
        false
    }

    fn is_output_connected(&self, node: NodeId, out_index: usize) -> bool {
        self.edges.values().any(|&(from, index)| from == node && index == out_index)
    }

    fn input_port_index(&self, node: NodeId, port: &str) -> LandformResult<usize> {
        let kind = self.nodes.get(&node).ok_or(LandformError::NodeNotFound(node.value()))?;
        kind.input_index(port).ok_or_else(|| LandformError::PortNotFound {
            node: node.value(),
            port: port.to_string(),
            direction: "input",
        })
    }

    // =========================================================================
    // Seeds, context, reset
    // =========================================================================

    /// The graph's root seed.
    #[must_use]
    pub fn root_seed(&self) -> WorldSeed {
        WorldSeed::new(self.shared.root_seed.load(Ordering::Acquire))
    }

    /// Sets the root seed and invalidates every supplier.
    pub fn set_root_seed(&self, seed: WorldSeed) {
        self.shared.root_seed.store(seed.value(), Ordering::Release);
        self.reset();
    }

    /// Mixes `draw` into every node seed and invalidates every supplier.
    ///
    /// Draw 0 restores the plain seeds. Used to sample one output several
    /// times with independent randomness.
    pub fn redraw(&self, draw: u64) {
        self.shared.draw.store(draw, Ordering::Release);
        self.reset();
    }

    /// The effective seed of a node: root seed, the context tile's seed and
    /// the node's id.
    #[must_use]
    pub fn node_seed(&self, id: NodeId) -> WorldSeed {
        self.shared.node_seed(id)
    }

    /// The current generation context.
    #[must_use]
    pub fn context(&self) -> GenerationContext {
        self.shared.context.read().clone()
    }

    /// Replaces the generation context and invalidates every supplier.
    pub fn set_context(&self, context: GenerationContext) {
        *self.shared.context.write() = context;
        self.reset();
    }

    /// The generation counter shared by every supplier of this graph.
    #[must_use]
    pub fn generation(&self) -> &Generation {
        &self.shared.generation
    }

    /// Invalidates every supplier's cache. Published suppliers stay.
    pub fn reset(&self) {
        self.shared.generation.bump();
    }

    /// Structural edit: drop published suppliers and invalidate caches.
    fn invalidate(&mut self) {
        self.published.get_mut().clear();
        self.reset();
    }

    /// Recomputes every terminal output, optionally under a new root seed.
    pub fn traverse_all(&self, seed: Option<WorldSeed>) {
        match seed {
            Some(seed) => self.set_root_seed(seed),
            None => self.reset(),
        }
        debug!(root_seed = self.root_seed().value(), nodes = self.nodes.len(), "Traversing landform graph");

        for slot in [
            Singleton::OutputElevation,
            Singleton::OutputBiomeGrid,
            Singleton::OutputCaves,
            Singleton::OutputCoast,
        ] {
            let Some(terminal) = self.singleton(slot) else {
                continue;
            };
            let inputs = self.nodes.get(&terminal).map_or(0, |kind| kind.inputs().len());
            for index in 0..inputs {
                match self.source_of(terminal, index) {
                    Some(PortValue::Value(supplier)) => {
                        let _ = supplier.get();
                    }
                    Some(PortValue::Biome(supplier)) => {
                        let _ = supplier.get();
                    }
                    None => {}
                }
            }
        }
    }

    /// Assigns a new root seed and recomputes.
    pub fn reseed(&self, seed: WorldSeed) {
        self.traverse_all(Some(seed));
    }

    // =========================================================================
    // Evaluation
    // =========================================================================

    /// The supplier published on `node.port`.
    ///
    /// # Errors
    ///
    /// Returns `NodeNotFound` or `PortNotFound`.
    pub fn output(&self, node: NodeId, port: &str) -> LandformResult<PortValue> {
        let kind = self.nodes.get(&node).ok_or(LandformError::NodeNotFound(node.value()))?;
        let index = kind.output_index(port).ok_or_else(|| LandformError::PortNotFound {
            node: node.value(),
            port: port.to_string(),
            direction: "output",
        })?;
        Ok(self.resolve(node, kind)[index].clone())
    }

    /// The supplier feeding `node.port`, or `None` if unconnected.
    ///
    /// # Errors
    ///
    /// Returns `NodeNotFound` or `PortNotFound`.
    pub fn input(&self, node: NodeId, port: &str) -> LandformResult<Option<PortValue>> {
        let index = self.input_port_index(node, port)?;
        Ok(self.source_of(node, index))
    }

    /// Number of node calculations performed so far.
    #[must_use]
    pub fn calculation_count(&self) -> usize {
        self.calculations.load(Ordering::Relaxed)
    }

    fn source_of(&self, node: NodeId, in_index: usize) -> Option<PortValue> {
        let &(from, out_index) = self.edges.get(&(node, in_index))?;
        let kind = self.nodes.get(&from)?;
        self.resolve(from, kind).get(out_index).cloned()
    }

    fn resolve(&self, id: NodeId, kind: &NodeKind) -> Arc<[PortValue]> {
        if let Some(outputs) = self.published.lock().get(&id) {
            return Arc::clone(outputs);
        }
        // Not holding the lock: calculating pulls upstream nodes
        let outputs: Arc<[PortValue]> = self.calculate(id, kind).into();
        self.published.lock().insert(id, Arc::clone(&outputs));
        outputs
    }

    fn value_input(&self, node: NodeId, index: usize) -> ValueSupplier {
        match self.source_of(node, index) {
            Some(PortValue::Value(supplier)) => supplier,
            _ => Supplier::new(&self.shared.generation, grid::zero),
        }
    }

    fn calculate(&self, id: NodeId, kind: &NodeKind) -> Vec<PortValue> {
        self.calculations.fetch_add(1, Ordering::Relaxed);
        let generation = &self.shared.generation;

        match kind {
            NodeKind::InputElevation => {
                let shared = Arc::clone(&self.shared);
                vec![PortValue::Value(Supplier::new(generation, move || {
                    let context = shared.context.read();
                    grid::transform(context.baseline_elevation.clone(), context.node_space_factor)
                }))]
            }
            NodeKind::InputBiomeGrid => {
                let shared = Arc::clone(&self.shared);
                vec![PortValue::Biome(Supplier::new(generation, move || {
                    grid::constant(Some(shared.context.read().tile.biome.clone()))
                }))]
            }
            NodeKind::Const { value } => {
                let value = *value;
                vec![PortValue::Value(Supplier::new(generation, move || grid::constant(value)))]
            }
            NodeKind::Noise(params) => {
                let shared = Arc::clone(&self.shared);
                let params = params.clone();
                vec![PortValue::Value(Supplier::new(generation, move || {
                    Arc::new(NoiseField::new(shared.node_seed(id), params.clone())) as Grid<f64>
                }))]
            }
            NodeKind::Math { op } => {
                let (op, a, b) = (*op, self.value_input(id, 0), self.value_input(id, 1));
                vec![PortValue::Value(Supplier::new(generation, move || {
                    let (a, b) = (a.get(), b.get());
                    grid::from_fn(move |x, z| op.apply(a.value_at(x, z), b.value_at(x, z)))
                }))]
            }
            NodeKind::Rotate(params) => {
                let input = self.value_input(id, 0);
                let (angle, pivot_x, pivot_z) = (params.angle, params.pivot_x, params.pivot_z);
                vec![PortValue::Value(Supplier::new(generation, move || {
                    grid::rotate(input.get(), pivot_x, pivot_z, angle)
                }))]
            }
            NodeKind::Tunnels(params) => self.calculate_tunnels(id, params),
            NodeKind::BiomeConst { biome } => {
                let biome = biome.clone();
                vec![PortValue::Biome(Supplier::new(generation, move || {
                    grid::constant(Some(biome.clone()))
                }))]
            }
            NodeKind::BiomeSelect { threshold, biome } => {
                let (threshold, biome, input) = (*threshold, biome.clone(), self.value_input(id, 0));
                vec![PortValue::Biome(Supplier::new(generation, move || {
                    let field = input.get();
                    let biome = biome.clone();
                    grid::from_fn(move |x, z| (field.value_at(x, z) > threshold).then(|| biome.clone()))
                }))]
            }
            NodeKind::OutputElevation
            | NodeKind::OutputBiomeGrid
            | NodeKind::OutputCaves
            | NodeKind::OutputCoast
            | NodeKind::WorldTileReq(_) => Vec::new(),
        }
    }

    /// Carves in map space and publishes the grids back in node space.
    fn calculate_tunnels(&self, id: NodeId, params: &TunnelNodeParams) -> Vec<PortValue> {
        let shared = Arc::clone(&self.shared);
        let input = self.value_input(id, 0);
        let params = params.clone();
        let outputs = TunnelOutputs {
            depths: self.is_output_connected(id, 1),
            offsets: self.is_output_connected(id, 2),
        };

        let run = Supplier::new(&self.shared.generation, move || {
            let (factor, width, height) = {
                let context = shared.context.read();
                (context.node_space_factor, context.map_width(), context.map_height())
            };
            let rock = grid::transform(input.get(), 1.0 / factor);
            let threshold = params.input_threshold;
            let accept = |x: usize, z: usize| rock.value_at(x as f64, z as f64) > threshold;

            let mut source = RandomSource::new(shared.node_seed(id));
            let outcome = TunnelGenerator::new(params.tunnels.clone()).generate_validated(
                width,
                height,
                &mut source,
                &accept,
                outputs,
                params.min_edge_cells,
            );

            let to_node_space = |buffer: Option<GridBuffer<f64>>| -> Grid<f64> {
                buffer.map_or_else(grid::zero, |buffer| {
                    let cached: Grid<f64> = Arc::new(Cache::from_buffer(buffer));
                    grid::transform(cached, factor)
                })
            };
            TunnelGrids {
                caves: to_node_space(Some(outcome.result.caves)),
                depths: to_node_space(outcome.result.depths),
                offsets: to_node_space(outcome.result.offsets),
            }
        });

        vec![
            PortValue::Value(run.map(|grids| grids.caves)),
            PortValue::Value(run.map(|grids| grids.depths)),
            PortValue::Value(run.map(|grids| grids.offsets)),
        ]
    }
}
