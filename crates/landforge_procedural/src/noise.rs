//! # Simplex Noise Fields
//!
//! Seeded 2D simplex noise and a [`GridFunction`] wrapper for noise nodes.
//!
//! ## Determinism Guarantee
//!
//! Given the same `WorldSeed` and `NoiseParams`, a `NoiseField` produces
//! exactly the same values on any platform.

use landforge_core::{GridFunction, WorldSeed};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

/// Gradient directions for 2D simplex: the eight compass points.
const GRADIENTS: [[f64; 2]; 8] = [
    [1.0, 0.0],
    [1.0, 1.0],
    [0.0, 1.0],
    [-1.0, 1.0],
    [-1.0, 0.0],
    [-1.0, -1.0],
    [0.0, -1.0],
    [1.0, -1.0],
];

/// 2D Simplex noise generator.
///
/// Produces smooth, continuous noise values in the range [-1, 1].
pub struct SimplexNoise {
    /// 256 shuffled entries, doubled so lookups never wrap.
    perm: [u8; 512],
}

impl SimplexNoise {
    /// Skewing factor for 2D simplex grid: (sqrt(3) - 1) / 2.
    const F2: f64 = 0.366_025_403_784_439;
    /// Unskewing factor for 2D simplex grid: (3 - sqrt(3)) / 6.
    const G2: f64 = 0.211_324_865_405_187;

    /// Creates a new simplex noise generator from a seed.
    #[must_use]
    pub fn new(seed: WorldSeed) -> Self {
        let mut table: Vec<u8> = (0..=255).collect();
        let mut rng = ChaCha8Rng::seed_from_u64(seed.value());
        table.shuffle(&mut rng);

        let mut perm = [0u8; 512];
        for (i, slot) in perm.iter_mut().enumerate() {
            *slot = table[i & 255];
        }
        Self { perm }
    }

    #[inline]
    fn hash(&self, index: usize) -> usize {
        usize::from(self.perm[index & 511])
    }

    /// Samples 2D simplex noise at `(x, z)`.
    ///
    /// # Returns
    ///
    /// A value in the range [-1, 1].
    #[must_use]
    pub fn sample(&self, x: f64, z: f64) -> f64 {
        let skew = (x + z) * Self::F2;
        let i = (x + skew).floor();
        let j = (z + skew).floor();

        let unskew = (i + j) * Self::G2;
        let x0 = x - (i - unskew);
        let z0 = z - (j - unskew);

        // Upper or lower triangle of the skewed cell
        let (i1, j1) = if x0 > z0 { (1, 0) } else { (0, 1) };

        let x1 = x0 - f64::from(i1) + Self::G2;
        let z1 = z0 - f64::from(j1) + Self::G2;
        let x2 = x0 - 1.0 + 2.0 * Self::G2;
        let z2 = z0 - 1.0 + 2.0 * Self::G2;

        let ii = (i as i64 & 255) as usize;
        let jj = (j as i64 & 255) as usize;
        let i1 = i1 as usize;
        let j1 = j1 as usize;

        let g0 = self.hash(ii + self.hash(jj));
        let g1 = self.hash(ii + i1 + self.hash(jj + j1));
        let g2 = self.hash(ii + 1 + self.hash(jj + 1));

        70.0 * (corner(x0, z0, g0) + corner(x1, z1, g1) + corner(x2, z2, g2))
    }

    /// Fractal noise: `octaves` layers of [`sample`](Self::sample), each at
    /// `lacunarity` times the previous frequency and `persistence` times the
    /// previous amplitude, normalised back to roughly [-1, 1].
    #[must_use]
    pub fn octaved(&self, x: f64, z: f64, octaves: u32, persistence: f64, lacunarity: f64) -> f64 {
        let mut total = 0.0;
        let mut amplitude = 1.0;
        let mut frequency = 1.0;
        let mut max_amplitude = 0.0;

        for _ in 0..octaves.max(1) {
            total += self.sample(x * frequency, z * frequency) * amplitude;
            max_amplitude += amplitude;
            amplitude *= persistence;
            frequency *= lacunarity;
        }

        total / max_amplitude
    }
}

#[inline]
fn corner(x: f64, z: f64, hash: usize) -> f64 {
    let t = 0.5 - x * x - z * z;
    if t < 0.0 {
        return 0.0;
    }
    let [gx, gz] = GRADIENTS[hash % GRADIENTS.len()];
    let t2 = t * t;
    t2 * t2 * (x * gx + z * gz)
}

/// Parameters of a noise node.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NoiseParams {
    /// Base frequency in cycles per node-space cell.
    pub frequency: f64,
    /// Frequency multiplier per octave.
    pub lacunarity: f64,
    /// Amplitude multiplier per octave.
    pub persistence: f64,
    /// Number of octaves.
    pub octaves: u32,
    /// Output multiplier.
    pub scale: f64,
    /// Added after scaling.
    pub bias: f64,
}

impl Default for NoiseParams {
    fn default() -> Self {
        Self {
            frequency: 0.02,
            lacunarity: 2.0,
            persistence: 0.5,
            octaves: 6,
            scale: 1.0,
            bias: 0.0,
        }
    }
}

/// `bias + scale * octaved(x * frequency, z * frequency)`.
pub struct NoiseField {
    noise: SimplexNoise,
    params: NoiseParams,
}

impl NoiseField {
    /// Creates a field for `seed`.
    #[must_use]
    pub fn new(seed: WorldSeed, params: NoiseParams) -> Self {
        Self {
            noise: SimplexNoise::new(seed),
            params,
        }
    }

    /// The parameters this field was built with.
    #[must_use]
    pub const fn params(&self) -> &NoiseParams {
        &self.params
    }
}

impl GridFunction<f64> for NoiseField {
    fn value_at(&self, x: f64, z: f64) -> f64 {
        let p = &self.params;
        let n = self.noise.octaved(
            x * p.frequency,
            z * p.frequency,
            p.octaves,
            p.persistence,
            p.lacunarity,
        );
        p.bias + p.scale * n
    }
}
