//! Candidate chord sets.
//!
//! A candidate set is the universe of chords a strategy may pick from, with
//! each chord's mask, length and static coverage (mask · darkness) computed
//! once up front. Sets only ever shrink.

use std::collections::BTreeSet;

use rand::SeedableRng;
use rand::rngs::StdRng;

use super::{
    AnchorLayout, ChordMask, ChordRasterizer, DarknessMap, HoughParams, Point, detect_edges,
    probabilistic_hough,
};
use crate::schema::{CandidateMode, Chord, EdgeDetectionConfig};

/// One eligible chord with its precomputed data.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub chord: Chord,
    pub mask: ChordMask,
    /// Euclidean distance between the two anchors.
    pub length: f64,
    /// Dot product of the mask against the darkness map.
    pub static_coverage: f64,
}

/// How the set was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CandidateOrigin {
    /// All anchor pairs.
    Full,
    /// Chords snapped from detected line segments.
    EdgeGuided,
    /// Edge-guided reduction found too few chords; all pairs were used.
    EdgeFallback,
}

#[derive(Debug, Clone)]
pub struct CandidateSet {
    candidates: Vec<Candidate>,
    origin: CandidateOrigin,
}

impl CandidateSet {
    /// Build the set requested by `mode`.
    pub fn build(
        mode: CandidateMode,
        layout: &AnchorLayout,
        raster: &ChordRasterizer,
        darkness: &DarknessMap,
        edges: &EdgeDetectionConfig,
        seed: u64,
    ) -> Self {
        match mode {
            CandidateMode::Full => Self::full(layout, raster, darkness),
            CandidateMode::EdgeGuided => {
                Self::edge_guided(layout, raster, darkness, edges, seed)
            }
        }
    }

    /// All `C(n, 2)` chords.
    pub fn full(layout: &AnchorLayout, raster: &ChordRasterizer, darkness: &DarknessMap) -> Self {
        let chords: Vec<Chord> = Chord::enumerate(layout.len()).collect();
        Self::from_chords(&chords, layout, raster, darkness, CandidateOrigin::Full)
    }

    /// Chords snapped from detected line segments, falling back to the full
    /// enumeration when fewer than `config.min_candidates` survive.
    pub fn edge_guided(
        layout: &AnchorLayout,
        raster: &ChordRasterizer,
        darkness: &DarknessMap,
        config: &EdgeDetectionConfig,
        seed: u64,
    ) -> Self {
        let chords = edge_chords(layout, darkness, config, seed);
        if chords.len() < config.min_candidates {
            log::debug!(
                "Edge-guided reduction kept {} chords (< {}); using full enumeration",
                chords.len(),
                config.min_candidates
            );
            let mut set = Self::full(layout, raster, darkness);
            set.origin = CandidateOrigin::EdgeFallback;
            return set;
        }

        log::debug!("Edge-guided reduction kept {} chords", chords.len());
        Self::from_chords(&chords, layout, raster, darkness, CandidateOrigin::EdgeGuided)
    }

    /// Precompute masks, lengths and static coverage for the given chords.
    ///
    /// The output order follows `chords`.
    pub fn from_chords(
        chords: &[Chord],
        layout: &AnchorLayout,
        raster: &ChordRasterizer,
        darkness: &DarknessMap,
        origin: CandidateOrigin,
    ) -> Self {
        let candidates = chords
            .iter()
            .map(|&chord| {
                let mask = raster.chord_mask(layout, chord);
                let static_coverage = mask.dot(&darkness.data);
                Candidate {
                    chord,
                    length: layout.chord_length(chord.a(), chord.b()),
                    mask,
                    static_coverage,
                }
            })
            .collect();

        Self { candidates, origin }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    #[inline]
    pub fn get(&self, index: usize) -> &Candidate {
        &self.candidates[index]
    }

    #[inline]
    pub fn candidates(&self) -> &[Candidate] {
        &self.candidates
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Candidate> {
        self.candidates.iter()
    }

    #[inline]
    pub fn origin(&self) -> CandidateOrigin {
        self.origin
    }

    /// Dense `n_anchors × n_anchors` lookup from anchor pair to candidate index.
    pub fn index_table(&self, n_anchors: usize) -> Vec<Option<usize>> {
        let mut table = vec![None; n_anchors * n_anchors];
        for (k, c) in self.candidates.iter().enumerate() {
            table[c.chord.a() * n_anchors + c.chord.b()] = Some(k);
            table[c.chord.b() * n_anchors + c.chord.a()] = Some(k);
        }
        table
    }

    /// Drop candidates whose static coverage is below the `pct`-th percentile
    /// of the current set. Returns the threshold used.
    pub fn prune_below_percentile(&mut self, pct: f64) -> f64 {
        let coverage: Vec<f64> = self.candidates.iter().map(|c| c.static_coverage).collect();
        let threshold = percentile(&coverage, pct);
        self.candidates.retain(|c| c.static_coverage >= threshold);
        threshold
    }
}

/// Percentile with linear interpolation between closest ranks.
pub fn percentile(values: &[f64], pct: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let rank = (pct.clamp(0.0, 100.0) / 100.0) * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    let frac = rank - lo as f64;
    sorted[lo] + (sorted[hi] - sorted[lo]) * frac
}

/// Detect line segments in the source image and snap them onto anchor pairs.
///
/// Endpoints snap to the nearest anchor (ties to the lowest index); segments
/// whose ends land on the same anchor are dropped. The result is sorted and
/// de-duplicated.
pub fn edge_chords(
    layout: &AnchorLayout,
    darkness: &DarknessMap,
    config: &EdgeDetectionConfig,
    seed: u64,
) -> Vec<Chord> {
    let intensity = darkness.intensity_unit();
    let edges = detect_edges(&intensity, darkness.width, darkness.height, config);

    let mut rng = StdRng::seed_from_u64(seed);
    let segments = probabilistic_hough(
        &edges,
        HoughParams {
            threshold: config.hough_threshold,
            line_length: config.line_length,
            line_gap: config.line_gap,
        },
        &mut rng,
    );

    let to_point = |(x, y): (usize, usize)| Point {
        x: x as f64,
        y: y as f64,
    };

    let chords: BTreeSet<Chord> = segments
        .iter()
        .filter_map(|s| {
            let i = layout.nearest(to_point(s.start));
            let j = layout.nearest(to_point(s.end));
            Chord::new(i, j)
        })
        .collect();

    chords.into_iter().collect()
}
