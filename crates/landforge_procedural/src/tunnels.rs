//! # Tunnel Generator
//!
//! Carves cave networks with branching random walks.
//!
//! ## Algorithm
//!
//! ```text
//! accept mask ──flood fill──▶ rock groups
//!                                │
//!          per group: open + closed tunnel counts (density × area, capped)
//!                                │
//!   open:   start on a group edge cell, head toward the group centre
//!   closed: start inside the group, never break through its edge
//!                                │
//!   walk:   heading drifts, width shrinks, branches spawn past a minimum
//!           distance, stop at zero width or an uncarvable cell
//!                                │
//!                      rasterise into caves / depths / offsets
//! ```
//!
//! [`TunnelGenerator::generate_validated`] repeats this with fresh child
//! seeds until enough edge cells are carved, keeping the best attempt when
//! none succeeds. Exhausting the attempts is not an error.

use std::f64::consts::FRAC_1_SQRT_2;

use landforge_core::{GridBuffer, RandomSource, WorldSeed};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::validate::{count_edge_cells, neighbours};

/// Attempts made by [`TunnelGenerator::generate_validated`].
pub const MAX_ATTEMPTS: u32 = 10;

/// Width of a tunnel with a width multiplier of 1.
pub const BASE_TUNNEL_WIDTH: f64 = 5.4;

/// Distance advanced per walk step, in cells.
const STEP: f64 = 0.5;

/// Width lost by a branch relative to its parent, per unit of offset multiplier.
const BRANCH_WIDTH_OFFSET: f64 = 0.2;

/// Upper bound on walks (trunk plus branches) per tunnel.
const MAX_WALKS_PER_TUNNEL: usize = 64;

/// Connected region sizes counted during validation.
const VALIDATION_MIN_REGION: usize = 1;
const VALIDATION_MAX_REGION: usize = 9999;

/// Shape parameters of a tunnel network.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TunnelParams {
    /// Open tunnels per 10,000 cells of rock.
    pub open_tunnels_per_10k: f64,
    /// Closed tunnels per 10,000 cells of rock.
    pub closed_tunnels_per_10k: f64,
    /// Cap on open tunnels per rock group.
    pub max_open_tunnels_per_rock_group: u32,
    /// Cap on closed tunnels per rock group.
    pub max_closed_tunnels_per_rock_group: u32,
    /// Lower bound of the initial width multiplier.
    pub width_multiplier_min: f64,
    /// Upper bound of the initial width multiplier.
    pub width_multiplier_max: f64,
    /// Width lost per cell travelled.
    pub width_reduction_per_cell: f64,
    /// Probability per step of spawning a branch on a free side.
    pub branch_chance: f64,
    /// Distance a walk must cover before it may branch.
    pub branch_min_distance_from_start: f64,
    /// Scales how much narrower a branch starts than its parent.
    pub branch_width_offset_multiplier: f64,
    /// Maximum heading change per step, in degrees.
    pub direction_change_speed: f64,
}

impl Default for TunnelParams {
    fn default() -> Self {
        Self {
            open_tunnels_per_10k: 5.8,
            closed_tunnels_per_10k: 2.5,
            max_open_tunnels_per_rock_group: 3,
            max_closed_tunnels_per_rock_group: 1,
            width_multiplier_min: 0.8,
            width_multiplier_max: 1.0,
            width_reduction_per_cell: 0.034,
            branch_chance: 0.1,
            branch_min_distance_from_start: 15.0,
            branch_width_offset_multiplier: 1.0,
            direction_change_speed: 8.0,
        }
    }
}

/// Optional grids to produce alongside the cave mask.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TunnelOutputs {
    /// Distance-from-centreline falloff, 1 on the centreline.
    pub depths: bool,
    /// Signed lateral distance from the centreline.
    pub offsets: bool,
}

/// One generation attempt.
#[derive(Clone, Debug)]
pub struct TunnelResult {
    /// 1 for carved cells, 0 elsewhere.
    pub caves: GridBuffer<f64>,
    /// Present if requested.
    pub depths: Option<GridBuffer<f64>>,
    /// Present if requested.
    pub offsets: Option<GridBuffer<f64>>,
    /// Parameters used.
    pub params: TunnelParams,
    /// Seed this attempt was drawn from.
    pub seed: WorldSeed,
    /// Open tunnels started.
    pub open_tunnels: usize,
    /// Closed tunnels started.
    pub closed_tunnels: usize,
}

impl TunnelResult {
    /// Number of carved cells.
    #[must_use]
    pub fn carved_cells(&self) -> usize {
        self.caves.count_where(|v| *v > 0.0)
    }
}

/// Outcome of the validate-and-retry loop.
#[derive(Clone, Debug)]
pub struct TunnelOutcome {
    /// The accepted attempt, or the best one if none passed.
    pub result: TunnelResult,
    /// Attempts made, at most [`MAX_ATTEMPTS`].
    pub attempts: u32,
    /// Validated edge-cell count of `result`.
    pub accepted_cells: usize,
    /// True if `result` met the required minimum.
    pub passed: bool,
}

/// Branching random-walk cave carver.
#[derive(Clone, Debug, Default)]
pub struct TunnelGenerator {
    params: TunnelParams,
}

impl TunnelGenerator {
    /// Creates a generator.
    #[must_use]
    pub const fn new(params: TunnelParams) -> Self {
        Self { params }
    }

    /// The generator's parameters.
    #[must_use]
    pub const fn params(&self) -> &TunnelParams {
        &self.params
    }

    /// Carves one network over a `width` x `height` grid.
    ///
    /// Only cells where `accept(x, z)` holds are ever carved.
    #[must_use]
    pub fn generate(
        &self,
        width: usize,
        height: usize,
        seed: WorldSeed,
        accept: &dyn Fn(usize, usize) -> bool,
        outputs: TunnelOutputs,
    ) -> TunnelResult {
        let mut carver = Carver::new(&self.params, width, height, seed, accept);
        carver.carve_all();
        carver.finish(self.params.clone(), outputs)
    }

    /// Generates with fresh child seeds from `source` until at least
    /// `min_edge_cells` edge cells are carved, up to [`MAX_ATTEMPTS`] times.
    ///
    /// If no attempt passes, the attempt with the highest count is returned
    /// (the earliest one on ties).
    #[must_use]
    pub fn generate_validated(
        &self,
        width: usize,
        height: usize,
        source: &mut RandomSource,
        accept: &dyn Fn(usize, usize) -> bool,
        outputs: TunnelOutputs,
        min_edge_cells: usize,
    ) -> TunnelOutcome {
        let mut best: Option<(TunnelResult, usize, u32)> = None;

        for attempt in 1..=MAX_ATTEMPTS {
            let seed = source.next_seed();
            let result = self.generate(width, height, seed, accept, outputs);
            let count = count_edge_cells(&result.caves, VALIDATION_MIN_REGION, VALIDATION_MAX_REGION, true);

            if count >= min_edge_cells {
                debug!(attempt, count, min_edge_cells, "Tunnel validation passed");
                return TunnelOutcome {
                    result,
                    attempts: attempt,
                    accepted_cells: count,
                    passed: true,
                };
            }
            debug!(attempt, count, min_edge_cells, "Tunnel validation failed");

            if best.as_ref().map_or(true, |(_, best_count, _)| count > *best_count) {
                best = Some((result, count, attempt));
            }
        }

        // MAX_ATTEMPTS is non-zero, so at least one attempt was recorded
        let (result, count, attempt) = best.unwrap_or_else(|| {
            let seed = source.next_seed();
            (self.generate(width, height, seed, accept, outputs), 0, 0)
        });
        warn!(
            best_attempt = attempt,
            count, min_edge_cells, "Tunnel validation exhausted all attempts"
        );
        TunnelOutcome {
            result,
            attempts: MAX_ATTEMPTS,
            accepted_cells: count,
            passed: false,
        }
    }
}

/// A connected region of acceptable cells.
struct RockGroup {
    edge: Vec<(usize, usize)>,
    interior: Vec<(usize, usize)>,
    centroid: (f64, f64),
}

impl RockGroup {
    fn area(&self) -> usize {
        self.edge.len() + self.interior.len()
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum TunnelClass {
    Open,
    Closed,
}

#[derive(Clone, Copy)]
struct Walk {
    x: f64,
    z: f64,
    heading: f64,
    width: f64,
    travelled: f64,
    branched: [bool; 2],
}

struct Carver<'a> {
    params: &'a TunnelParams,
    width: usize,
    height: usize,
    seed: WorldSeed,
    rng: ChaCha8Rng,
    /// Rock group index per cell.
    group_of: Vec<Option<usize>>,
    /// True for cells on the edge of their rock group.
    is_edge: Vec<bool>,
    groups: Vec<RockGroup>,
    caves: GridBuffer<f64>,
    depths: GridBuffer<f64>,
    offsets: GridBuffer<f64>,
    open_tunnels: usize,
    closed_tunnels: usize,
}

impl<'a> Carver<'a> {
    fn new(
        params: &'a TunnelParams,
        width: usize,
        height: usize,
        seed: WorldSeed,
        accept: &dyn Fn(usize, usize) -> bool,
    ) -> Self {
        let mut carver = Self {
            params,
            width,
            height,
            seed,
            rng: ChaCha8Rng::seed_from_u64(seed.value()),
            group_of: vec![None; width * height],
            is_edge: vec![false; width * height],
            groups: Vec::new(),
            caves: GridBuffer::new(width, height, 0.0),
            depths: GridBuffer::new(width, height, 0.0),
            offsets: GridBuffer::new(width, height, 0.0),
            open_tunnels: 0,
            closed_tunnels: 0,
        };
        carver.find_rock_groups(accept);
        carver
    }

    fn find_rock_groups(&mut self, accept: &dyn Fn(usize, usize) -> bool) {
        let (width, height) = (self.width, self.height);
        let accepted: Vec<bool> = (0..width * height).map(|i| accept(i % width, i / width)).collect();
        let mut stack = Vec::new();

        for start in 0..width * height {
            if !accepted[start] || self.group_of[start].is_some() {
                continue;
            }

            let index = self.groups.len();
            let mut group = RockGroup {
                edge: Vec::new(),
                interior: Vec::new(),
                centroid: (0.0, 0.0),
            };
            let (mut sum_x, mut sum_z) = (0.0, 0.0);
            self.group_of[start] = Some(index);
            stack.push((start % width, start / width));

            while let Some((x, z)) = stack.pop() {
                sum_x += x as f64;
                sum_z += z as f64;

                let on_border = x == 0 || z == 0 || x + 1 == width || z + 1 == height;
                let mut edge = on_border;
                for (nx, nz) in neighbours(x, z, width, height) {
                    let n = nz * width + nx;
                    if !accepted[n] {
                        edge = true;
                    } else if self.group_of[n].is_none() {
                        self.group_of[n] = Some(index);
                        stack.push((nx, nz));
                    }
                }

                self.is_edge[z * width + x] = edge;
                if edge {
                    group.edge.push((x, z));
                } else {
                    group.interior.push((x, z));
                }
            }

            let area = group.area() as f64;
            group.centroid = (sum_x / area, sum_z / area);
            self.groups.push(group);
        }
    }

    fn carve_all(&mut self) {
        for group in 0..self.groups.len() {
            let area = self.groups[group].area() as f64;
            let open = self.tunnel_count(area, self.params.open_tunnels_per_10k, self.params.max_open_tunnels_per_rock_group);
            let closed = self.tunnel_count(
                area,
                self.params.closed_tunnels_per_10k,
                self.params.max_closed_tunnels_per_rock_group,
            );

            for _ in 0..open {
                if self.start_tunnel(group, TunnelClass::Open) {
                    self.open_tunnels += 1;
                }
            }
            for _ in 0..closed {
                if self.start_tunnel(group, TunnelClass::Closed) {
                    self.closed_tunnels += 1;
                }
            }
        }
    }

    /// `density * area / 10_000`, jittered by ±10% and randomly rounded.
    fn tunnel_count(&mut self, area: f64, per_10k: f64, cap: u32) -> u32 {
        if per_10k <= 0.0 || cap == 0 {
            return 0;
        }
        let expected = area * self.rng.gen_range(0.9..=1.1) * per_10k / 10_000.0;
        let whole = expected.floor();
        let extra = u32::from(self.rng.gen::<f64>() < expected - whole);
        (whole as u32 + extra).min(cap)
    }

    fn start_tunnel(&mut self, group: usize, class: TunnelClass) -> bool {
        let candidates = match class {
            TunnelClass::Open => &self.groups[group].edge,
            TunnelClass::Closed => &self.groups[group].interior,
        };
        if candidates.is_empty() {
            return false;
        }
        let (x, z) = candidates[self.rng.gen_range(0..candidates.len())];
        let (x, z) = (x as f64, z as f64);

        let heading = match class {
            TunnelClass::Open => {
                let (cx, cz) = self.groups[group].centroid;
                (cz - z).atan2(cx - x).to_degrees() + self.rng.gen_range(-45.0..=45.0)
            }
            TunnelClass::Closed => self.rng.gen_range(0.0..360.0),
        };

        let (lo, hi) = ordered(self.params.width_multiplier_min, self.params.width_multiplier_max);
        let multiplier = if lo < hi { self.rng.gen_range(lo..=hi) } else { lo };

        self.run_walks(
            group,
            class,
            Walk {
                x,
                z,
                heading,
                width: BASE_TUNNEL_WIDTH * multiplier,
                travelled: 0.0,
                branched: [false; 2],
            },
        );
        true
    }

    fn run_walks(&mut self, group: usize, class: TunnelClass, trunk: Walk) {
        let max_steps = (self.width + self.height) * 4;
        let branch_chance = self.params.branch_chance.clamp(0.0, 1.0);
        let mut pending = vec![trunk];
        let mut walks = 0;

        while let Some(mut walk) = pending.pop() {
            walks += 1;
            if walks > MAX_WALKS_PER_TUNNEL {
                break;
            }

            for _ in 0..max_steps {
                if walk.width <= 0.0 {
                    break;
                }
                self.stamp(group, class, &walk);

                if walk.travelled > self.params.branch_min_distance_from_start {
                    for (side, sign) in [(0, 1.0), (1, -1.0)] {
                        if !walk.branched[side] && self.rng.gen::<f64>() < branch_chance {
                            walk.branched[side] = true;
                            let turn = self.rng.gen_range(40.0..=90.0) * sign;
                            pending.push(Walk {
                                heading: walk.heading + turn,
                                width: walk.width - BRANCH_WIDTH_OFFSET * self.params.branch_width_offset_multiplier,
                                travelled: 0.0,
                                branched: [false; 2],
                                ..walk
                            });
                        }
                    }
                }

                walk.heading += self.rng.gen_range(-1.0..=1.0) * self.params.direction_change_speed;
                let (sin, cos) = walk.heading.to_radians().sin_cos();
                let (nx, nz) = (walk.x + cos * STEP, walk.z + sin * STEP);
                if !self.carvable_at(group, class, nx, nz) {
                    break;
                }
                walk.x = nx;
                walk.z = nz;
                walk.width -= self.params.width_reduction_per_cell * STEP;
                walk.travelled += STEP;
            }
        }
    }

    fn cell(&self, x: f64, z: f64) -> Option<usize> {
        let (rx, rz) = (x.round(), z.round());
        if rx < 0.0 || rz < 0.0 || rx >= self.width as f64 || rz >= self.height as f64 {
            return None;
        }
        Some(rz as usize * self.width + rx as usize)
    }

    fn carvable(&self, group: usize, class: TunnelClass, index: usize) -> bool {
        self.group_of[index] == Some(group) && (class == TunnelClass::Open || !self.is_edge[index])
    }

    fn carvable_at(&self, group: usize, class: TunnelClass, x: f64, z: f64) -> bool {
        self.cell(x, z).is_some_and(|index| self.carvable(group, class, index))
    }

    fn stamp(&mut self, group: usize, class: TunnelClass, walk: &Walk) {
        let reach = (walk.width * 0.5).max(FRAC_1_SQRT_2);
        let (sin, cos) = walk.heading.to_radians().sin_cos();

        let min_x = (walk.x - reach).floor().max(0.0) as usize;
        let min_z = (walk.z - reach).floor().max(0.0) as usize;
        let max_x = ((walk.x + reach).ceil().max(0.0) as usize).min(self.width.saturating_sub(1));
        let max_z = ((walk.z + reach).ceil().max(0.0) as usize).min(self.height.saturating_sub(1));

        for z in min_z..=max_z {
            for x in min_x..=max_x {
                let index = z * self.width + x;
                if index >= self.group_of.len() || !self.carvable(group, class, index) {
                    continue;
                }
                let dx = x as f64 - walk.x;
                let dz = z as f64 - walk.z;
                let distance = dx.hypot(dz);
                if distance > reach {
                    continue;
                }

                self.caves.set(x, z, 1.0);
                let depth = 1.0 - distance / reach;
                if depth > *self.depths.get(x, z) {
                    self.depths.set(x, z, depth);
                    // Left of the heading is positive
                    self.offsets.set(x, z, dz * cos - dx * sin);
                }
            }
        }
    }

    fn finish(self, params: TunnelParams, outputs: TunnelOutputs) -> TunnelResult {
        TunnelResult {
            caves: self.caves,
            depths: outputs.depths.then_some(self.depths),
            offsets: outputs.offsets.then_some(self.offsets),
            params,
            seed: self.seed,
            open_tunnels: self.open_tunnels,
            closed_tunnels: self.closed_tunnels,
        }
    }
}

fn ordered(a: f64, b: f64) -> (f64, f64) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_seed_same_caves() {
        let generator = TunnelGenerator::default();
        let a = generator.generate(60, 60, WorldSeed::new(3), &|_, _| true, TunnelOutputs::default());
        let b = generator.generate(60, 60, WorldSeed::new(3), &|_, _| true, TunnelOutputs::default());
        assert_eq!(a.caves, b.caves);
        assert_eq!(a.open_tunnels, b.open_tunnels);
    }

    #[test]
    fn test_never_carves_rejected_cells() {
        let generator = TunnelGenerator::new(TunnelParams {
            open_tunnels_per_10k: 20.0,
            closed_tunnels_per_10k: 10.0,
            ..TunnelParams::default()
        });
        let accept = |x: usize, _z: usize| x < 30;
        let result = generator.generate(60, 40, WorldSeed::new(11), &accept, TunnelOutputs::default());

        for z in 0..40 {
            for x in 30..60 {
                assert_eq!(*result.caves.get(x, z), 0.0, "carved rejected cell ({x}, {z})");
            }
        }
    }

    #[test]
    fn test_optional_outputs() {
        let generator = TunnelGenerator::default();
        let without = generator.generate(20, 20, WorldSeed::new(1), &|_, _| true, TunnelOutputs::default());
        assert!(without.depths.is_none() && without.offsets.is_none());

        let with = generator.generate(
            20,
            20,
            WorldSeed::new(1),
            &|_, _| true,
            TunnelOutputs {
                depths: true,
                offsets: true,
            },
        );
        let depths = with.depths.as_ref().unwrap();
        for (cave, depth) in with.caves.as_slice().iter().zip(depths.as_slice()) {
            if *cave == 0.0 {
                assert_eq!(*depth, 0.0);
            }
            assert!((0.0..=1.0).contains(depth));
        }
    }

    #[test]
    fn test_tunnel_count_respects_cap() {
        let params = TunnelParams {
            open_tunnels_per_10k: 500.0,
            closed_tunnels_per_10k: 500.0,
            max_open_tunnels_per_rock_group: 2,
            max_closed_tunnels_per_rock_group: 1,
            ..TunnelParams::default()
        };
        let result = TunnelGenerator::new(params).generate(40, 40, WorldSeed::new(8), &|_, _| true, TunnelOutputs::default());
        assert_eq!(result.open_tunnels, 2);
        assert_eq!(result.closed_tunnels, 1);
    }

    #[test]
    fn test_closed_tunnels_stay_inside() {
        let params = TunnelParams {
            open_tunnels_per_10k: 0.0,
            closed_tunnels_per_10k: 50.0,
            max_closed_tunnels_per_rock_group: 4,
            ..TunnelParams::default()
        };
        let result = TunnelGenerator::new(params).generate(40, 40, WorldSeed::new(21), &|_, _| true, TunnelOutputs::default());
        assert!(result.closed_tunnels > 0);
        assert_eq!(count_edge_cells(&result.caves, 1, 9999, true), 0);
    }
}
