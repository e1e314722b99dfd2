//! # Landform Definitions
//!
//! The on-disk form of a landform: a manifest, a root seed, nodes and edges.
//!
//! ```toml
//! root_seed = 1337
//!
//! [manifest]
//! id = "Canyon"
//! revision_version = 3
//!
//! [[nodes]]
//! id = 1
//! kind = "InputElevation"
//!
//! [[nodes]]
//! id = 2
//! kind = { Noise = { frequency = 0.05, octaves = 4 } }
//!
//! [[edges]]
//! from = 2
//! from_port = "Output"
//! to = 3
//! to_port = "Elevation"
//! ```

use landforge_core::{LandformError, LandformResult, WorldSeed};
use serde::{Deserialize, Serialize};

use crate::node::{NodeId, NodeKind};

/// Identity and bookkeeping of a landform.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LandformManifest {
    /// Unique id; also the file name stem.
    pub id: String,
    /// Name shown to players, if different from the id.
    pub display_name: Option<String>,
    /// Bumped by the author whenever the source definition changes.
    pub revision_version: u32,
    /// Created by the user rather than shipped.
    pub is_custom: bool,
    /// A shipped landform the user has modified.
    pub is_edited: bool,
    /// Creation time, milliseconds since the Unix epoch.
    pub time_created: i64,
}

impl Default for LandformManifest {
    fn default() -> Self {
        Self::new("NewLandform")
    }
}

impl LandformManifest {
    /// A fresh manifest for `id`.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: None,
            revision_version: 1,
            is_custom: false,
            is_edited: false,
            time_created: 0,
        }
    }
}

/// A node as stored in a definition.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NodeDefinition {
    /// Stable id.
    pub id: NodeId,
    /// Kind and parameters.
    pub kind: NodeKind,
}

/// An edge as stored in a definition.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeDefinition {
    /// Upstream node.
    pub from: NodeId,
    /// Output port name on `from`.
    pub from_port: String,
    /// Downstream node.
    pub to: NodeId,
    /// Input port name on `to`.
    pub to_port: String,
}

/// A whole landform as stored on disk.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LandformDefinition {
    /// Root seed of the graph.
    #[serde(with = "seed_bits")]
    pub root_seed: WorldSeed,
    /// Identity and bookkeeping.
    pub manifest: LandformManifest,
    /// Nodes in id order.
    pub nodes: Vec<NodeDefinition>,
    /// Edges in downstream order.
    pub edges: Vec<EdgeDefinition>,
}

impl LandformDefinition {
    /// Parses a definition. `source_name` labels errors.
    ///
    /// # Errors
    ///
    /// Returns `InvalidDefinition` if the text is not a valid definition.
    pub fn from_toml_str(text: &str, source_name: &str) -> LandformResult<Self> {
        toml::from_str(text).map_err(|e| LandformError::InvalidDefinition {
            source_name: source_name.to_string(),
            reason: e.to_string(),
        })
    }

    /// Serialises the definition.
    ///
    /// # Errors
    ///
    /// Returns `InvalidDefinition` if serialisation fails.
    pub fn to_toml_string(&self) -> LandformResult<String> {
        toml::to_string(self).map_err(|e| LandformError::InvalidDefinition {
            source_name: self.manifest.id.clone(),
            reason: e.to_string(),
        })
    }
}

/// TOML integers are signed, so seeds are stored as their two's complement bits.
mod seed_bits {
    use landforge_core::WorldSeed;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(seed: &WorldSeed, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i64(seed.value() as i64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<WorldSeed, D::Error> {
        i64::deserialize(deserializer).map(|bits| WorldSeed::new(bits as u64))
    }
}
