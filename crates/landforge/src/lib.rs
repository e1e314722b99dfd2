//! # LANDFORGE Landform Graphs
//!
//! Node graphs that compose grid functions into finished landforms, and the
//! machinery around them: definitions on disk, layered loading, selection
//! for a world tile and background previews.
//!
//! ## Architecture Rules
//!
//! 1. **Pull evaluation** - Requesting an output calculates its node once
//!    and publishes suppliers; nothing runs until a grid is sampled
//! 2. **Stable seeds** - A node's seed is its id mixed into the root seed, so
//!    editing one node never disturbs another
//! 3. **Graceful loading** - A broken definition file is skipped with a
//!    warning, never fatal
//! 4. **One display thread** - Preview results are handed out by `poll()`
//!
//! ## Example
//!
//! ```rust,ignore
//! use landforge::{GenerationSettings, Landform, LandformManifest, NodeKind};
//! use landforge_core::grid;
//! use landforge_procedural::{NoiseParams, TileInfo};
//!
//! let mut landform = Landform::new(LandformManifest::new("Hills"));
//! let graph = landform.graph_mut();
//! let noise = graph.add_node(NodeKind::Noise(NoiseParams::default()));
//! let output = graph.add_node(NodeKind::OutputElevation);
//! graph.connect(noise, "Output", output, "Elevation")?;
//!
//! let generated = landform.generate(TileInfo::default(), grid::zero(), &GenerationSettings::default());
//! println!("{}", generated.elevation.get(10, 10));
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod definition;
pub mod graph;
pub mod landform;
pub mod manager;
pub mod node;
pub mod preview;
pub mod select;
pub mod settings;

pub use definition::{EdgeDefinition, LandformDefinition, LandformManifest, NodeDefinition};
pub use graph::{BiomeSupplier, Edge, GenerationContext, LandformGraph, PortValue, ValueSupplier};
pub use landform::{GeneratedLandform, Landform};
pub use manager::{LandformManager, LandformMap, CURRENT_VERSION};
pub use node::{MathOp, NodeId, NodeKind, PortKind, PortSpec, RotateParams, Singleton, TunnelNodeParams};
pub use preview::{preview_job, CancelToken, PreviewEvent, PreviewImage, PreviewJob, PreviewScheduler};
pub use select::select_landform;
pub use settings::GenerationSettings;
