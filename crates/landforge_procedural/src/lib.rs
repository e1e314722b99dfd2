//! # LANDFORGE Procedural Generation
//!
//! The algorithms that turn grid functions into landform features.
//!
//! ## Design Principles
//!
//! 1. **Deterministic**: Same seed always produces the same caves and borders
//! 2. **Graceful**: Unlucky draws degrade to empty results, never to errors
//! 3. **Pure**: No I/O, no threads, no global state
//!
//! ## Core Components
//!
//! - `SimplexNoise` / `NoiseField`: seeded scalar fields
//! - `TunnelGenerator`: branching random-walk cave carving with bounded retries
//! - `BiomeBorderBlend`: picks neighbouring biomes by directional selection
//! - `WorldTileRequirement`: decides whether a landform fits a world tile
//! - `CoastConfig`: deep/shallow/beach classification of coast noise
//!
//! ## Example
//!
//! ```rust,ignore
//! use landforge_procedural::{TunnelGenerator, TunnelParams, TunnelOutputs};
//! use landforge_core::{RandomSource, WorldSeed};
//!
//! let generator = TunnelGenerator::new(TunnelParams::default());
//! let mut source = RandomSource::new(WorldSeed::new(42));
//!
//! let outcome = generator.generate_validated(
//!     100, 100, &mut source, &|_, _| true, TunnelOutputs::default(), 0,
//! );
//! assert!(outcome.attempts <= 10);
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod border;
pub mod coast;
pub mod noise;
pub mod requirement;
pub mod tile;
pub mod tunnels;
pub mod validate;

pub use border::BiomeBorderBlend;
pub use coast::{CoastConfig, CoastTerrain};
pub use noise::{NoiseField, NoiseParams, SimplexNoise};
pub use requirement::{FloatRange, WorldTileRequirement};
pub use tile::{
    BiomeId, BorderingBiome, Hilliness, River, Road, TileInfo, Topology, WorldObject, WorldObjectKind,
};
pub use tunnels::{
    TunnelGenerator, TunnelOutcome, TunnelOutputs, TunnelParams, TunnelResult, MAX_ATTEMPTS,
};
pub use validate::count_edge_cells;
