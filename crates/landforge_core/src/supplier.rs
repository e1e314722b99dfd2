//! # Suppliers
//!
//! A `Supplier<T>` is a deferred computation producing a `T` (usually a
//! [`Grid`](crate::Grid)). The first `get()` computes; later calls return the
//! identical cached value until the supplier's [`Generation`] moves on.
//!
//! ## Reset protocol
//!
//! Every supplier built for one graph shares that graph's `Generation`.
//! `reset()` bumps the counter once; each supplier notices its stale stamp on
//! the next `get()` and recomputes. Invalidation therefore reaches every
//! transitive dependency exactly once, however many paths lead to it, and
//! no graph walk is needed.
//!
//! ```text
//!   generation: 3 ──bump──▶ 4
//!
//!   supplier A [stamp 3] ─get()─▶ stale, recompute ─▶ [stamp 4]
//!   supplier B [stamp 3] ─get()─▶ stale, recompute ─▶ [stamp 4]
//! ```

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

/// Shared invalidation counter.
///
/// Cloning yields another handle to the same counter.
#[derive(Clone, Debug, Default)]
pub struct Generation(Arc<AtomicU64>);

impl Generation {
    /// Creates a counter starting at zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The current generation.
    #[inline]
    #[must_use]
    pub fn current(&self) -> u64 {
        self.0.load(Ordering::Acquire)
    }

    /// Invalidates everything stamped with an older generation.
    ///
    /// Returns the new generation.
    pub fn bump(&self) -> u64 {
        self.0.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// Returns true if both handles share one counter.
    #[must_use]
    pub fn same_counter(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

type Compute<T> = dyn Fn() -> T + Send + Sync;

struct Inner<T> {
    generation: Generation,
    compute: Box<Compute<T>>,
    cache: Mutex<Option<(u64, T)>>,
}

/// A lazy, cacheable producer with generation-stamped invalidation.
///
/// Cloning a supplier shares its cache: clones are the same supplier.
pub struct Supplier<T> {
    inner: Arc<Inner<T>>,
}

impl<T> Clone for Supplier<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> fmt::Debug for Supplier<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Supplier")
            .field("generation", &self.inner.generation.current())
            .field("cached", &self.is_cached())
            .finish()
    }
}

impl<T: Clone + Send + 'static> Supplier<T> {
    /// Creates a supplier that runs `compute` once per generation.
    #[must_use]
    pub fn new(generation: &Generation, compute: impl Fn() -> T + Send + Sync + 'static) -> Self {
        Self {
            inner: Arc::new(Inner {
                generation: generation.clone(),
                compute: Box::new(compute),
                cache: Mutex::new(None),
            }),
        }
    }

    /// Creates a supplier that always yields `value`.
    #[must_use]
    pub fn of(generation: &Generation, value: T) -> Self
    where
        T: Sync,
    {
        Self::new(generation, move || value.clone())
    }

    /// Returns the cached value, computing it first if the cache is stale.
    ///
    /// The cache lock is held while computing, so concurrent callers wait for
    /// the one computation instead of repeating it. Upstream suppliers are
    /// separate locks; the graph is acyclic so this cannot deadlock.
    pub fn get(&self) -> T {
        let stamp = self.inner.generation.current();
        let mut cache = self.inner.cache.lock();
        if let Some((cached_at, value)) = cache.as_ref() {
            if *cached_at == stamp {
                return value.clone();
            }
        }
        let value = (self.inner.compute)();
        *cache = Some((stamp, value.clone()));
        value
    }

    /// Invalidates this supplier and every supplier sharing its generation.
    pub fn reset(&self) {
        self.inner.generation.bump();
    }

    /// `reset()` followed by `get()`.
    pub fn reset_and_get(&self) -> T {
        self.reset();
        self.get()
    }

    /// Derives a supplier that applies `f` to this supplier's value.
    ///
    /// The derived supplier shares the generation, so resetting either one
    /// invalidates both.
    #[must_use]
    pub fn map<U, F>(&self, f: F) -> Supplier<U>
    where
        U: Clone + Send + 'static,
        F: Fn(T) -> U + Send + Sync + 'static,
    {
        let source = self.clone();
        Supplier::new(&self.inner.generation, move || f(source.get()))
    }
}

impl<T> Supplier<T> {
    /// Returns true if a value computed under the current generation is held.
    #[must_use]
    pub fn is_cached(&self) -> bool {
        let stamp = self.inner.generation.current();
        matches!(self.inner.cache.lock().as_ref(), Some((cached_at, _)) if *cached_at == stamp)
    }

    /// The generation this supplier is stamped against.
    #[must_use]
    pub fn generation(&self) -> &Generation {
        &self.inner.generation
    }

    /// Returns true if both handles refer to the same supplier.
    #[must_use]
    pub fn ptr_eq(a: &Self, b: &Self) -> bool {
        Arc::ptr_eq(&a.inner, &b.inner)
    }
}
