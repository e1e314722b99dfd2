//! Grid function combinators.

use super::{Grid, GridBuffer, GridFunction};

/// The zero field.
#[derive(Clone, Copy, Debug, Default)]
pub struct Zero;

impl GridFunction<f64> for Zero {
    #[inline]
    fn value_at(&self, _x: f64, _z: f64) -> f64 {
        0.0
    }
}

/// Ignores coordinates and always returns the same value.
#[derive(Clone, Debug)]
pub struct Constant<T> {
    value: T,
}

impl<T> Constant<T> {
    /// Creates a constant field.
    #[must_use]
    pub const fn new(value: T) -> Self {
        Self { value }
    }
}

impl<T: Clone + Send + Sync> GridFunction<T> for Constant<T> {
    #[inline]
    fn value_at(&self, _x: f64, _z: f64) -> T {
        self.value.clone()
    }
}

/// Adapts a closure into a grid function.
pub struct FnGrid<F> {
    f: F,
}

impl<F> FnGrid<F> {
    /// Wraps `f`.
    #[must_use]
    pub const fn new(f: F) -> Self {
        Self { f }
    }
}

impl<T, F: Fn(f64, f64) -> T + Send + Sync> GridFunction<T> for FnGrid<F> {
    #[inline]
    fn value_at(&self, x: f64, z: f64) -> T {
        (self.f)(x, z)
    }
}

/// Evaluates the inner function at `(x / scale, z / scale)`.
///
/// `Transform(Transform(f, s), 1 / s)` is `f` up to rounding.
pub struct Transform<T> {
    inner: Grid<T>,
    scale: f64,
}

impl<T> Transform<T> {
    /// Creates a scaling transform. A zero scale is treated as identity.
    #[must_use]
    pub fn new(inner: Grid<T>, scale: f64) -> Self {
        let scale = if scale == 0.0 || !scale.is_finite() { 1.0 } else { scale };
        Self { inner, scale }
    }

    /// The scale factor.
    #[inline]
    #[must_use]
    pub const fn scale(&self) -> f64 {
        self.scale
    }
}

impl<T> GridFunction<T> for Transform<T> {
    #[inline]
    fn value_at(&self, x: f64, z: f64) -> T {
        self.inner.value_at(x / self.scale, z / self.scale)
    }
}

/// Rotates the inner function by a fixed angle about a pivot.
///
/// Sampling `(x, z)` evaluates the inner function at `(x, z)` rotated by
/// `-angle`, so the field as a whole appears rotated by `+angle`.
pub struct Rotate<T> {
    inner: Grid<T>,
    pivot_x: f64,
    pivot_z: f64,
    sin: f64,
    cos: f64,
}

impl<T> Rotate<T> {
    /// Creates a rotation of `angle_deg` degrees about `(pivot_x, pivot_z)`.
    #[must_use]
    pub fn new(inner: Grid<T>, pivot_x: f64, pivot_z: f64, angle_deg: f64) -> Self {
        let (sin, cos) = angle_deg.to_radians().sin_cos();
        Self {
            inner,
            pivot_x,
            pivot_z,
            sin,
            cos,
        }
    }
}

impl<T> GridFunction<T> for Rotate<T> {
    #[inline]
    fn value_at(&self, x: f64, z: f64) -> T {
        let dx = x - self.pivot_x;
        let dz = z - self.pivot_z;
        let rx = dx * self.cos + dz * self.sin;
        let rz = -dx * self.sin + dz * self.cos;
        self.inner.value_at(self.pivot_x + rx, self.pivot_z + rz)
    }
}

/// A materialised grid served by nearest-cell lookup.
///
/// The upstream function is evaluated exactly once per cell of
/// `[0, width) x [0, height)`; coordinates outside the grid clamp to the
/// nearest edge cell.
#[derive(Clone, Debug)]
pub struct Cache<T> {
    buffer: GridBuffer<T>,
}

impl<T> Cache<T> {
    /// Evaluates `function` over every cell and stores the results.
    ///
    /// Degenerate sizes are widened to a single cell.
    #[must_use]
    pub fn new(function: &dyn GridFunction<T>, width: usize, height: usize) -> Self {
        Self {
            buffer: GridBuffer::sample(function, width.max(1), height.max(1)),
        }
    }

    /// Serves an already materialised buffer.
    ///
    /// Sampling panics if `buffer` holds no cells.
    #[must_use]
    pub const fn from_buffer(buffer: GridBuffer<T>) -> Self {
        Self { buffer }
    }

    /// The backing buffer.
    #[must_use]
    pub const fn buffer(&self) -> &GridBuffer<T> {
        &self.buffer
    }
}

impl<T: Clone + Send + Sync> GridFunction<T> for Cache<T> {
    #[inline]
    fn value_at(&self, x: f64, z: f64) -> T {
        self.buffer.sample_nearest(x, z).clone()
    }
}

/// Label selection by maximum score.
///
/// If the override function yields `Some` at a coordinate, that value wins
/// unconditionally. Otherwise every candidate is scored and the label of the
/// strictly greatest positive score is returned; the primary label is
/// returned when no score exceeds zero. On exact ties the first candidate
/// wins.
pub struct MaxSelect<T> {
    pre: Option<Grid<Option<T>>>,
    candidates: Vec<Grid<f64>>,
    labels: Vec<T>,
    primary: T,
}

impl<T> MaxSelect<T> {
    /// Creates a selection over paired `candidates` and `labels`.
    ///
    /// Extra entries on the longer side are ignored.
    #[must_use]
    pub fn new(
        pre: Option<Grid<Option<T>>>,
        mut candidates: Vec<Grid<f64>>,
        mut labels: Vec<T>,
        primary: T,
    ) -> Self {
        let len = candidates.len().min(labels.len());
        candidates.truncate(len);
        labels.truncate(len);
        Self {
            pre,
            candidates,
            labels,
            primary,
        }
    }

    /// Number of scored candidates.
    #[must_use]
    pub fn candidate_count(&self) -> usize {
        self.candidates.len()
    }
}

impl<T: Clone + Send + Sync> GridFunction<T> for MaxSelect<T> {
    fn value_at(&self, x: f64, z: f64) -> T {
        if let Some(value) = self.pre.as_ref().and_then(|pre| pre.value_at(x, z)) {
            return value;
        }

        let mut best = 0.0;
        let mut label = &self.primary;
        for (candidate, candidate_label) in self.candidates.iter().zip(&self.labels) {
            let score = candidate.value_at(x, z);
            if score > best {
                best = score;
                label = candidate_label;
            }
        }
        label.clone()
    }
}
