//! # Node Kinds
//!
//! The closed set of node kinds a landform graph is built from.
//!
//! Every kind has a fixed port schema. Ports carry one of two grid types:
//!
//! | Port kind | Grid | Missing input resolves to |
//! |-----------|------|---------------------------|
//! | `Value`   | `Grid<f64>` | `Zero` |
//! | `Biome`   | `Grid<Option<BiomeId>>` | `None` everywhere |

use std::fmt;

use landforge_procedural::{BiomeId, NoiseParams, TunnelParams, WorldTileRequirement};
use serde::{Deserialize, Serialize};

/// Stable identifier of a node within its graph.
///
/// Ids are never reused, so they stay valid as seeds across edits.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub u64);

impl NodeId {
    /// The raw id.
    #[inline]
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Grid type carried by a port.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PortKind {
    /// Scalar field.
    Value,
    /// Optional biome per cell.
    Biome,
}

impl PortKind {
    /// Human-readable type name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Value => "value",
            Self::Biome => "biome",
        }
    }
}

/// A named, typed port.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PortSpec {
    /// Port name, unique per direction on a node.
    pub name: &'static str,
    /// Grid type.
    pub kind: PortKind,
}

const fn port(name: &'static str, kind: PortKind) -> PortSpec {
    PortSpec { name, kind }
}

const NO_PORTS: &[PortSpec] = &[];
const VALUE_OUT: &[PortSpec] = &[port("Output", PortKind::Value)];
const VALUE_IN: &[PortSpec] = &[port("Input", PortKind::Value)];
const BIOME_OUT: &[PortSpec] = &[port("Output", PortKind::Biome)];
const ELEVATION: &[PortSpec] = &[port("Elevation", PortKind::Value)];
const BIOME_GRID: &[PortSpec] = &[port("Biome Grid", PortKind::Biome)];
const BIOME_OUTPUT_IN: &[PortSpec] = &[port("Biome Grid", PortKind::Biome), port("Transitions", PortKind::Value)];
const CAVES_IN: &[PortSpec] = &[port("Caves", PortKind::Value)];
const COAST_IN: &[PortSpec] = &[port("Coast", PortKind::Value)];
const MATH_IN: &[PortSpec] = &[port("A", PortKind::Value), port("B", PortKind::Value)];
const TUNNELS_OUT: &[PortSpec] = &[
    port("Output", PortKind::Value),
    port("Depths", PortKind::Value),
    port("Offsets", PortKind::Value),
];

/// Node kinds of which a graph holds at most one.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Singleton {
    /// Publishes the baseline elevation.
    InputElevation,
    /// Publishes the tile's own biome.
    InputBiomeGrid,
    /// Final elevation.
    OutputElevation,
    /// Final biome grid.
    OutputBiomeGrid,
    /// Final cave mask.
    OutputCaves,
    /// Final coast noise.
    OutputCoast,
    /// Placement requirements.
    WorldTileReq,
}

/// Binary operation of a math node.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum MathOp {
    /// `a + b`
    #[default]
    Add,
    /// `a - b`
    Subtract,
    /// `a * b`
    Multiply,
    /// `min(a, b)`
    Min,
    /// `max(a, b)`
    Max,
}

impl MathOp {
    /// Applies the operation.
    #[inline]
    #[must_use]
    pub fn apply(self, a: f64, b: f64) -> f64 {
        match self {
            Self::Add => a + b,
            Self::Subtract => a - b,
            Self::Multiply => a * b,
            Self::Min => a.min(b),
            Self::Max => a.max(b),
        }
    }
}

/// Parameters of a rotation node.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RotateParams {
    /// Rotation in degrees.
    pub angle: f64,
    /// Pivot x in node space.
    pub pivot_x: f64,
    /// Pivot z in node space.
    pub pivot_z: f64,
}

/// Parameters of a tunnel node.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TunnelNodeParams {
    /// Cells whose input exceeds this are rock and may be carved.
    pub input_threshold: f64,
    /// Edge cells an attempt must carve to be accepted.
    pub min_edge_cells: usize,
    /// Shape of the tunnel network.
    pub tunnels: TunnelParams,
}

impl Default for TunnelNodeParams {
    fn default() -> Self {
        Self {
            input_threshold: 0.7,
            min_edge_cells: 0,
            tunnels: TunnelParams::default(),
        }
    }
}

/// A node kind together with its parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum NodeKind {
    /// Baseline elevation mapped into node space.
    InputElevation,
    /// The tile's biome everywhere.
    InputBiomeGrid,
    /// Terminal node for the final elevation.
    OutputElevation,
    /// Terminal node for the final biome grid.
    OutputBiomeGrid,
    /// Terminal node for the final cave mask.
    OutputCaves,
    /// Terminal node for coast noise, painted into water and beach terrain.
    OutputCoast,
    /// Placement requirements; has no ports.
    WorldTileReq(WorldTileRequirement),
    /// A constant field.
    Const {
        /// The constant.
        value: f64,
    },
    /// Seeded fractal noise.
    Noise(NoiseParams),
    /// Cellwise binary operation.
    Math {
        /// The operation.
        op: MathOp,
    },
    /// Rotation about a pivot.
    Rotate(RotateParams),
    /// Cave carving.
    Tunnels(TunnelNodeParams),
    /// One biome everywhere.
    BiomeConst {
        /// The biome.
        biome: BiomeId,
    },
    /// A biome wherever the input exceeds a threshold.
    BiomeSelect {
        /// Input level above which `biome` is placed.
        threshold: f64,
        /// The biome.
        biome: BiomeId,
    },
}

impl NodeKind {
    /// Short name used in logs and errors.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::InputElevation => "InputElevation",
            Self::InputBiomeGrid => "InputBiomeGrid",
            Self::OutputElevation => "OutputElevation",
            Self::OutputBiomeGrid => "OutputBiomeGrid",
            Self::OutputCaves => "OutputCaves",
            Self::OutputCoast => "OutputCoast",
            Self::WorldTileReq(_) => "WorldTileReq",
            Self::Const { .. } => "Const",
            Self::Noise(_) => "Noise",
            Self::Math { .. } => "Math",
            Self::Rotate(_) => "Rotate",
            Self::Tunnels(_) => "Tunnels",
            Self::BiomeConst { .. } => "BiomeConst",
            Self::BiomeSelect { .. } => "BiomeSelect",
        }
    }

    /// Input ports, in declaration order.
    #[must_use]
    pub const fn inputs(&self) -> &'static [PortSpec] {
        match self {
            Self::OutputElevation => ELEVATION,
            Self::OutputBiomeGrid => BIOME_OUTPUT_IN,
            Self::OutputCaves => CAVES_IN,
            Self::OutputCoast => COAST_IN,
            Self::Math { .. } => MATH_IN,
            Self::Rotate(_) | Self::Tunnels(_) | Self::BiomeSelect { .. } => VALUE_IN,
            Self::InputElevation
            | Self::InputBiomeGrid
            | Self::WorldTileReq(_)
            | Self::Const { .. }
            | Self::Noise(_)
            | Self::BiomeConst { .. } => NO_PORTS,
        }
    }

    /// Output ports, in declaration order.
    #[must_use]
    pub const fn outputs(&self) -> &'static [PortSpec] {
        match self {
            Self::InputElevation => ELEVATION,
            Self::InputBiomeGrid => BIOME_GRID,
            Self::Const { .. } | Self::Noise(_) | Self::Math { .. } | Self::Rotate(_) => VALUE_OUT,
            Self::Tunnels(_) => TUNNELS_OUT,
            Self::BiomeConst { .. } | Self::BiomeSelect { .. } => BIOME_OUT,
            Self::OutputElevation
            | Self::OutputBiomeGrid
            | Self::OutputCaves
            | Self::OutputCoast
            | Self::WorldTileReq(_) => NO_PORTS,
        }
    }

    /// The singleton slot this kind occupies, if any.
    #[must_use]
    pub const fn singleton(&self) -> Option<Singleton> {
        match self {
            Self::InputElevation => Some(Singleton::InputElevation),
            Self::InputBiomeGrid => Some(Singleton::InputBiomeGrid),
            Self::OutputElevation => Some(Singleton::OutputElevation),
            Self::OutputBiomeGrid => Some(Singleton::OutputBiomeGrid),
            Self::OutputCaves => Some(Singleton::OutputCaves),
            Self::OutputCoast => Some(Singleton::OutputCoast),
            Self::WorldTileReq(_) => Some(Singleton::WorldTileReq),
            _ => None,
        }
    }

    /// Index of the input port named `name`.
    #[must_use]
    pub fn input_index(&self, name: &str) -> Option<usize> {
        self.inputs().iter().position(|p| p.name == name)
    }

    /// Index of the output port named `name`.
    #[must_use]
    pub fn output_index(&self, name: &str) -> Option<usize> {
        self.outputs().iter().position(|p| p.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_port_schemas() {
        let tunnels = NodeKind::Tunnels(TunnelNodeParams::default());
        assert_eq!(tunnels.inputs().len(), 1);
        assert_eq!(tunnels.output_index("Offsets"), Some(2));
        assert_eq!(tunnels.output_index("Caves"), None);

        let out = NodeKind::OutputBiomeGrid;
        assert_eq!(out.input_index("Transitions"), Some(1));
        assert_eq!(out.inputs()[0].kind, PortKind::Biome);
        assert!(out.outputs().is_empty());
    }

    #[test]
    fn test_singletons() {
        assert_eq!(NodeKind::OutputElevation.singleton(), Some(Singleton::OutputElevation));
        assert_eq!(
            NodeKind::WorldTileReq(WorldTileRequirement::default()).singleton(),
            Some(Singleton::WorldTileReq)
        );
        assert_eq!(NodeKind::Const { value: 1.0 }.singleton(), None);
    }

    #[test]
    fn test_math_ops() {
        assert_eq!(MathOp::Subtract.apply(5.0, 2.0), 3.0);
        assert_eq!(MathOp::Min.apply(5.0, 2.0), 2.0);
        assert_eq!(MathOp::Max.apply(5.0, 2.0), 5.0);
        assert_eq!(MathOp::Multiply.apply(5.0, 2.0), 10.0);
    }
}
