//! Chord selection strategies.
//!
//! Every strategy implements [`Strategy::generate`]: given a darkness map and
//! parameters it returns an ordered list of chords, pushing each one to a
//! [`ProgressSink`] the moment it is committed and polling a [`CancelToken`]
//! at the start of every iteration.
//!
//! # Strategies
//!
//! - `greedy`: [`GreedyResidual`] - biased sampling, length-normalized SSE gain, pruning
//! - `coverage`: [`CoverageMulticover`] - multicover greedy on a residual darkness map
//! - `graph`: [`ExactIlp`] - 0/1 program with a cardinality constraint
//! - `hough_greedy`: [`EdgeGuidedGreedy`] - residual greedy over edge-detected chords
//! - `annealing`: [`SimulatedAnnealingSwap`] - swap moves with Metropolis acceptance
//! - `memetic`: [`MemeticGa`] - genetic search with duplicate repair
//! - `fearless`: [`MultiThreadFearlessGreedy`] - coloured threads, asymmetric scoring
//!
//! # Cancellation
//!
//! Cancellation is not an error. A cancelled run returns `Ok` with
//! [`StopReason::Cancelled`] and exactly the chords already delivered to the
//! sink. Fixed-cardinality strategies commit only once their search has
//! finished, so cancelling them mid-search yields an empty result.

mod annealing;
mod coverage;
mod edge_greedy;
mod exact;
mod fearless;
mod greedy;
mod memetic;
mod registry;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use super::{AnchorLayout, CandidateSet, ChordRasterizer, DarknessMap};
use crate::schema::{
    Chord, ChordVector, ConfigError, GenerateResult, StopReason, StrategyParams,
};

pub use annealing::SimulatedAnnealingSwap;
pub use coverage::CoverageMulticover;
pub use edge_greedy::EdgeGuidedGreedy;
pub use exact::{
    BinaryProgram, CardinalitySolver, ExactIlp, IntegerSolver, Solution, SolveStatus,
    SolverError,
};
pub use fearless::MultiThreadFearlessGreedy;
pub use greedy::GreedyResidual;
pub use memetic::MemeticGa;
pub use registry::{REGISTRY, StrategyRegistry, generate_string_vectors};

/// A chord selection algorithm.
pub trait Strategy: Send + Sync {
    /// Registry key.
    fn key(&self) -> &'static str;

    /// Select chords for `darkness`.
    fn generate(
        &self,
        darkness: &DarknessMap,
        params: &StrategyParams,
        sink: &mut dyn ProgressSink,
        cancel: &CancelToken,
    ) -> Result<GenerateResult, StrategyError>;
}

/// Receives each committed chord, in commit order, exactly once.
///
/// Called synchronously from the computing thread; implementations should
/// return quickly.
pub trait ProgressSink {
    fn on_chord(&mut self, from: usize, to: usize);
}

impl<F: FnMut(usize, usize)> ProgressSink for F {
    fn on_chord(&mut self, from: usize, to: usize) {
        self(from, to)
    }
}

/// Sink that discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl ProgressSink for NullSink {
    fn on_chord(&mut self, _from: usize, _to: usize) {}
}

/// Cooperative cancellation flag shared between a job owner and its worker.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

/// Strategy failures.
#[derive(Debug, thiserror::Error)]
pub enum StrategyError {
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigError),
    #[error("Degenerate input: {0}")]
    DegenerateInput(String),
    #[error("Solver error: {0}")]
    Solver(#[from] SolverError),
}

/// Append-only result vector that forwards each commit to the sink.
pub struct ChordLog<'a> {
    chords: Vec<ChordVector>,
    sink: &'a mut dyn ProgressSink,
    limit: usize,
}

impl<'a> ChordLog<'a> {
    pub fn new(sink: &'a mut dyn ProgressSink, limit: usize) -> Self {
        Self {
            chords: Vec::with_capacity(limit.min(4096)),
            sink,
            limit,
        }
    }

    /// Record a chord and notify the sink.
    pub fn commit(&mut self, chord: Chord) {
        debug_assert!(!self.is_full());
        let v = chord.to_vector();
        self.chords.push(v);
        self.sink.on_chord(v.from, v.to);
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.chords.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.chords.is_empty()
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.chords.len() >= self.limit
    }

    pub fn finish(self, stop_reason: StopReason) -> GenerateResult {
        GenerateResult {
            chords: self.chords,
            stop_reason,
        }
    }
}

/// Per-run geometry shared by all strategies.
pub(crate) struct RunSetup {
    pub layout: AnchorLayout,
    pub raster: ChordRasterizer,
}

impl RunSetup {
    /// Validate parameters and lay out anchors on a `width × height` grid.
    pub fn new(
        params: &StrategyParams,
        width: usize,
        height: usize,
        margin: f64,
    ) -> Result<Self, StrategyError> {
        params.validate()?;
        if width == 0 || height == 0 {
            return Err(ConfigError::InvalidDimensions.into());
        }
        let layout = AnchorLayout::generate(params.n_anchors, width, height, margin)?;
        let raster = ChordRasterizer::new(width, height, params.line_thickness);
        Ok(Self { layout, raster })
    }

    /// Setup at the darkness map's own resolution.
    pub fn for_map(darkness: &DarknessMap, params: &StrategyParams) -> Result<Self, StrategyError> {
        if darkness.data.len() != darkness.width * darkness.height {
            return Err(ConfigError::InvalidDimensions.into());
        }
        Self::new(params, darkness.width, darkness.height, params.margin)
    }

    pub fn full_candidates(&self, darkness: &DarknessMap) -> CandidateSet {
        CandidateSet::full(&self.layout, &self.raster, darkness)
    }
}

/// Seed for deterministic sub-steps such as edge-guided reduction.
#[inline]
pub(crate) fn reduction_seed(params: &StrategyParams) -> u64 {
    params.seed.unwrap_or(0)
}

pub(crate) fn require_candidates(set: &CandidateSet) -> Result<(), StrategyError> {
    if set.is_empty() {
        return Err(StrategyError::DegenerateInput(
            "candidate universe is empty".to_string(),
        ));
    }
    Ok(())
}

/// `length^alpha`, guarded against zero-length chords.
#[inline]
pub(crate) fn length_norm(length: f64, alpha: f64) -> f64 {
    length.powf(alpha) + 1e-6
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::compute::DarknessMap;
    use crate::schema::{IntensityGrid, StrategyParams};

    /// 64×64 image with a dark cross, a ring and a diagonal band.
    pub fn sample_map(size: usize) -> DarknessMap {
        let mut image = IntensityGrid::filled(size, size, 255);
        let c = size as f64 / 2.0;
        for y in 0..size {
            for x in 0..size {
                let dx = x as f64 - c;
                let dy = y as f64 - c;
                let r = (dx * dx + dy * dy).sqrt();
                if x == size / 2 || y == size / 3 {
                    image.set(x, y, 0);
                } else if (r - size as f64 / 4.0).abs() < 1.5 {
                    image.set(x, y, 60);
                } else if x.abs_diff(y) < 3 {
                    image.set(x, y, 120);
                }
            }
        }
        DarknessMap::from_intensity(&image)
    }

    pub fn small_params(algorithm: &str) -> StrategyParams {
        StrategyParams {
            algorithm: algorithm.to_string(),
            n_anchors: 16,
            n_strings: 12,
            line_thickness: 1,
            sample_pairs: 200,
            margin: 2.0,
            seed: Some(11),
            ..Default::default()
        }
    }
}
