//! # LANDFORGE Core Engine
//!
//! The computational substrate every landform is built from.
//!
//! ## Architecture Rules
//!
//! 1. **Pure fields** - A `GridFunction` is a referentially transparent
//!    mapping from `(x, z)` to a value
//! 2. **Lazy producers** - A `Supplier` computes once per generation and
//!    serves the identical result until the generation moves on
//! 3. **Explicit randomness** - Every random draw comes from a seed that was
//!    passed in; there is no global RNG
//!
//! ## Example
//!
//! ```rust,ignore
//! use landforge_core::{grid, Generation, Supplier};
//!
//! let generation = Generation::new();
//! let supplier = Supplier::new(&generation, || grid::constant(1.5));
//!
//! let field = supplier.get();
//! assert_eq!(field.value_at(10.0, 20.0), 1.5);
//!
//! // Invalidate every supplier sharing this generation
//! supplier.reset();
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod error;
pub mod grid;
pub mod seed;
pub mod supplier;

pub use error::{LandformError, LandformResult};
pub use grid::{
    Cache, Constant, FnGrid, Grid, GridBuffer, GridFunction, MaxSelect, Rotate, Transform, Zero,
};
pub use seed::{RandomSource, WorldSeed};
pub use supplier::{Generation, Supplier};
