//! # Grid Functions
//!
//! A `GridFunction<T>` maps continuous 2D coordinates `(x, z)` to a `T`.
//!
//! Grid functions are pure: between cache invalidations, sampling the same
//! coordinate always yields the same value. They compose by wrapping: a
//! `Rotate` holds the function it rotates, a `Transform` the function it
//! rescales, and so on. Composition is cheap because every handle is a
//! shared [`Grid`].
//!
//! ## Coordinate spaces
//!
//! Nodes are authored in a fixed-size "node space"; maps come in many sizes.
//! [`Transform`] converts between the two, and [`Cache`] pins an expensive
//! upstream chain to one evaluation per integer cell.

mod ops;

use std::sync::Arc;

pub use ops::{Cache, Constant, FnGrid, MaxSelect, Rotate, Transform, Zero};

/// A pure, continuous-domain 2D field.
pub trait GridFunction<T>: Send + Sync {
    /// Samples the field at `(x, z)`.
    fn value_at(&self, x: f64, z: f64) -> T;
}

/// Shared handle to a grid function.
pub type Grid<T> = Arc<dyn GridFunction<T>>;

impl<T, G: GridFunction<T> + ?Sized> GridFunction<T> for Arc<G> {
    #[inline]
    fn value_at(&self, x: f64, z: f64) -> T {
        (**self).value_at(x, z)
    }
}

/// The zero field.
#[must_use]
pub fn zero() -> Grid<f64> {
    Arc::new(Zero)
}

/// A field returning `value` everywhere.
#[must_use]
pub fn constant<T: Clone + Send + Sync + 'static>(value: T) -> Grid<T> {
    Arc::new(Constant::new(value))
}

/// Wraps a closure as a grid.
#[must_use]
pub fn from_fn<T, F>(f: F) -> Grid<T>
where
    T: 'static,
    F: Fn(f64, f64) -> T + Send + Sync + 'static,
{
    Arc::new(FnGrid::new(f))
}

/// Evaluates `inner` at `(x / scale, z / scale)`.
#[must_use]
pub fn transform<T: 'static>(inner: Grid<T>, scale: f64) -> Grid<T> {
    Arc::new(Transform::new(inner, scale))
}

/// Rotates `inner` by `angle_deg` about `(pivot_x, pivot_z)`.
#[must_use]
pub fn rotate<T: 'static>(inner: Grid<T>, pivot_x: f64, pivot_z: f64, angle_deg: f64) -> Grid<T> {
    Arc::new(Rotate::new(inner, pivot_x, pivot_z, angle_deg))
}

/// Row-major storage of one value per integer cell.
///
/// Cell `(x, z)` lives at index `z * width + x`.
#[derive(Clone, Debug, PartialEq)]
pub struct GridBuffer<T> {
    width: usize,
    height: usize,
    data: Vec<T>,
}

impl<T: Clone> GridBuffer<T> {
    /// Creates a buffer with every cell set to `fill`.
    #[must_use]
    pub fn new(width: usize, height: usize, fill: T) -> Self {
        Self {
            width,
            height,
            data: vec![fill; width * height],
        }
    }
}

impl<T> GridBuffer<T> {
    /// Creates a buffer by calling `f(x, z)` for every cell.
    #[must_use]
    pub fn from_fn(width: usize, height: usize, mut f: impl FnMut(usize, usize) -> T) -> Self {
        let mut data = Vec::with_capacity(width * height);
        for z in 0..height {
            for x in 0..width {
                data.push(f(x, z));
            }
        }
        Self {
            width,
            height,
            data,
        }
    }

    /// Wraps row-major `data`. Returns `None` unless it holds exactly
    /// `width * height` cells.
    #[must_use]
    pub fn from_vec(width: usize, height: usize, data: Vec<T>) -> Option<Self> {
        (data.len() == width * height).then_some(Self { width, height, data })
    }

    /// Materialises `function` at every integer cell.
    #[must_use]
    pub fn sample(function: &dyn GridFunction<T>, width: usize, height: usize) -> Self {
        Self::from_fn(width, height, |x, z| function.value_at(x as f64, z as f64))
    }

    /// Width in cells.
    #[inline]
    #[must_use]
    pub const fn width(&self) -> usize {
        self.width
    }

    /// Height in cells.
    #[inline]
    #[must_use]
    pub const fn height(&self) -> usize {
        self.height
    }

    /// Returns true if `(x, z)` lies inside the buffer.
    #[inline]
    #[must_use]
    pub const fn contains(&self, x: i64, z: i64) -> bool {
        x >= 0 && z >= 0 && (x as usize) < self.width && (z as usize) < self.height
    }

    /// Returns the value at cell `(x, z)`.
    ///
    /// # Panics
    ///
    /// Panics if the cell is out of bounds.
    #[inline]
    #[must_use]
    pub fn get(&self, x: usize, z: usize) -> &T {
        &self.data[z * self.width + x]
    }

    /// Overwrites the value at cell `(x, z)`.
    ///
    /// # Panics
    ///
    /// Panics if the cell is out of bounds.
    #[inline]
    pub fn set(&mut self, x: usize, z: usize, value: T) {
        self.data[z * self.width + x] = value;
    }

    /// Mutable access to cell `(x, z)`.
    ///
    /// # Panics
    ///
    /// Panics if the cell is out of bounds.
    #[inline]
    pub fn get_mut(&mut self, x: usize, z: usize) -> &mut T {
        &mut self.data[z * self.width + x]
    }

    /// Nearest-cell lookup for a continuous coordinate, clamped to the edges.
    ///
    /// # Panics
    ///
    /// Panics if the buffer is empty.
    #[inline]
    #[must_use]
    pub fn sample_nearest(&self, x: f64, z: f64) -> &T {
        let ix = clamp_index(x, self.width);
        let iz = clamp_index(z, self.height);
        self.get(ix, iz)
    }

    /// All cells in row-major order.
    #[inline]
    #[must_use]
    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    /// Number of cells satisfying `predicate`.
    #[must_use]
    pub fn count_where(&self, predicate: impl Fn(&T) -> bool) -> usize {
        self.data.iter().filter(|v| predicate(v)).count()
    }
}

#[inline]
fn clamp_index(coord: f64, len: usize) -> usize {
    let rounded = coord.round();
    if rounded <= 0.0 || rounded.is_nan() {
        0
    } else {
        (rounded as usize).min(len.saturating_sub(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buffer_row_major() {
        let buffer = GridBuffer::from_fn(3, 2, |x, z| x + 10 * z);
        assert_eq!(buffer.as_slice(), &[0, 1, 2, 10, 11, 12]);
        assert_eq!(*buffer.get(2, 1), 12);

        let same = GridBuffer::from_vec(3, 2, vec![0, 1, 2, 10, 11, 12]).unwrap();
        assert_eq!(same, buffer);
        assert!(GridBuffer::from_vec(3, 3, vec![0; 8]).is_none());
    }

    #[test]
    fn test_nearest_sampling_clamps() {
        let buffer = GridBuffer::from_fn(4, 4, |x, z| (x, z));
        assert_eq!(*buffer.sample_nearest(1.4, 2.6), (1, 3));
        assert_eq!(*buffer.sample_nearest(-5.0, 100.0), (0, 3));
    }

    #[test]
    fn test_sample_materialises_function() {
        let f = from_fn(|x, z| x * 2.0 + z);
        let buffer = GridBuffer::sample(&*f, 3, 3);
        assert_eq!(*buffer.get(2, 1), 5.0);
        assert_eq!(buffer.count_where(|v| *v > 3.0), 4);
    }
}
