//! Multi-thread "fearless" greedy on a downsampled colour canvas.

use std::collections::HashSet;

use rayon::prelude::*;

use super::{
    CancelToken, ChordLog, ProgressSink, RunSetup, Strategy, StrategyError, require_candidates,
};
use crate::compute::{CandidateSet, DarknessMap};
use crate::schema::{GenerateResult, StopReason, StrategyParams};

type Rgb = [f32; 3];

/// Multi-thread fearless greedy strategy.
///
/// Every coloured thread walks from anchor to anchor. Per iteration each
/// thread proposes its best chord leaving its current anchor, and the best
/// proposal over all threads is alpha-blended into the canvas. Error increases
/// are damped by `fearless.damping`, so a move may darken a few wrong pixels
/// as long as it fixes more.
#[derive(Debug, Default, Clone, Copy)]
pub struct MultiThreadFearlessGreedy;

struct ThreadState {
    color: Rgb,
    anchor: usize,
    /// `(anchor, candidate)` moves this thread already made.
    used: HashSet<(usize, usize)>,
}

/// Alpha-blended RGB canvas plus the target it approximates.
struct ColorCanvas {
    target: Vec<Rgb>,
    current: Vec<Rgb>,
    alpha: f32,
}

impl ColorCanvas {
    fn new(darkness: &DarknessMap, alpha: f32) -> Self {
        let target = darkness
            .data
            .iter()
            .map(|&d| {
                let v = 1.0 - d;
                [v, v, v]
            })
            .collect();
        Self {
            target,
            current: vec![[1.0; 3]; darkness.len()],
            alpha,
        }
    }

    #[inline]
    fn blend(&self, pixel: Rgb, color: Rgb) -> Rgb {
        std::array::from_fn(|c| self.alpha * color[c] + (1.0 - self.alpha) * pixel[c])
    }

    /// Asymmetric error change of blending `color` over `pixels`.
    fn score(&self, pixels: &[u32], color: Rgb, damping: f32) -> f64 {
        pixels
            .iter()
            .map(|&p| {
                let p = p as usize;
                let cur = self.current[p];
                let new = self.blend(cur, color);
                let delta = dist_sq(self.target[p], new) - dist_sq(self.target[p], cur);
                let delta = if delta < 0.0 { delta } else { delta * damping };
                delta as f64
            })
            .sum()
    }

    fn draw(&mut self, pixels: &[u32], color: Rgb) {
        for &p in pixels {
            let p = p as usize;
            self.current[p] = self.blend(self.current[p], color);
        }
    }
}

#[inline]
fn dist_sq(a: Rgb, b: Rgb) -> f32 {
    (0..3).map(|c| (a[c] - b[c]) * (a[c] - b[c])).sum()
}

/// Best move for one thread: `(score, candidate)`, ties to the lowest candidate.
fn propose(
    thread: &ThreadState,
    canvas: &ColorCanvas,
    set: &CandidateSet,
    table: &[Option<usize>],
    n_anchors: usize,
    damping: f32,
) -> Option<(f64, usize)> {
    let mut best: Option<(f64, usize)> = None;
    for other in 0..n_anchors {
        let Some(k) = table[thread.anchor * n_anchors + other] else {
            continue;
        };
        if thread.used.contains(&(thread.anchor, k)) {
            continue;
        }
        let score = canvas.score(set.get(k).mask.pixels(), thread.color, damping);
        if best.is_none_or(|(s, _)| score < s) {
            best = Some((score, k));
        }
    }
    best
}

impl Strategy for MultiThreadFearlessGreedy {
    fn key(&self) -> &'static str {
        "fearless"
    }

    fn generate(
        &self,
        darkness: &DarknessMap,
        params: &StrategyParams,
        sink: &mut dyn ProgressSink,
        cancel: &CancelToken,
    ) -> Result<GenerateResult, StrategyError> {
        params.validate()?;
        let config = &params.fearless;
        let factor = config.downscale;

        let small = darkness.downsample(factor);
        let setup = RunSetup::new(params, small.width, small.height, params.margin / factor as f64)?;
        let set = setup.full_candidates(&small);
        require_candidates(&set)?;

        let n_anchors = setup.layout.len();
        let table = set.index_table(n_anchors);
        let mut canvas = ColorCanvas::new(&small, 1.0 / factor as f32);
        let mut threads: Vec<ThreadState> = config
            .thread_colors
            .iter()
            .map(|rgb| ThreadState {
                color: rgb.map(|c| c as f32 / 255.0),
                anchor: config.start_anchor,
                used: HashSet::new(),
            })
            .collect();
        let mut log = ChordLog::new(sink, params.n_strings);

        log::info!(
            "Fearless: {} threads on {}x{} canvas, {} strings",
            threads.len(),
            small.width,
            small.height,
            params.n_strings
        );

        while !log.is_full() {
            if cancel.is_cancelled() {
                log::info!("Fearless cancelled after {} strings", log.len());
                return Ok(log.finish(StopReason::Cancelled));
            }

            let proposals: Vec<Option<(f64, usize)>> = threads
                .par_iter()
                .map(|t| propose(t, &canvas, &set, &table, n_anchors, config.damping))
                .collect();

            let mut best: Option<(usize, f64, usize)> = None;
            for (t, proposal) in proposals.into_iter().enumerate() {
                if let Some((score, k)) = proposal {
                    if best.is_none_or(|(_, s, _)| score < s) {
                        best = Some((t, score, k));
                    }
                }
            }

            let Some((t, score, k)) = best.filter(|&(_, s, _)| s < config.tolerance as f64) else {
                log::debug!("Fearless: no acceptable move after {} strings", log.len());
                return Ok(log.finish(StopReason::NoImprovement));
            };

            let cand = set.get(k);
            let thread = &mut threads[t];
            canvas.draw(cand.mask.pixels(), thread.color);
            thread.used.insert((thread.anchor, k));
            thread.anchor = cand.chord.other(thread.anchor).unwrap_or(thread.anchor);
            log.commit(cand.chord);
            log::trace!("Fearless: thread {t} drew {:?} ({score:.4})", cand.chord);
        }

        Ok(log.finish(StopReason::Completed))
    }
}

#[cfg(test)]
mod tests {
    use super::super::NullSink;
    use super::super::test_support::{sample_map, small_params};
    use super::*;
    use crate::schema::{FearlessConfig, IntensityGrid};

    fn run(darkness: &DarknessMap, params: &StrategyParams) -> GenerateResult {
        MultiThreadFearlessGreedy
            .generate(darkness, params, &mut NullSink, &CancelToken::new())
            .unwrap()
    }

    #[test]
    fn test_single_thread_walks_a_path() {
        let map = sample_map(96);
        let params = small_params("fearless");
        let result = run(&map, &params);
        assert!(!result.is_empty());

        let first = result.chords[0];
        assert!(first.from == 0 || first.to == 0);
        for w in result.chords.windows(2) {
            let shares = [w[0].from, w[0].to].iter().any(|a| *a == w[1].from || *a == w[1].to);
            assert!(shares, "{:?} -> {:?}", w[0], w[1]);
        }
    }

    #[test]
    fn test_white_image_has_no_acceptable_move() {
        let map = DarknessMap::from_intensity(&IntensityGrid::filled(64, 64, 255));
        let params = small_params("fearless");
        let result = run(&map, &params);
        assert!(result.is_empty());
        assert_eq!(result.stop_reason, StopReason::NoImprovement);
    }

    #[test]
    fn test_multiple_threads_deterministic() {
        let map = sample_map(96);
        let params = StrategyParams {
            fearless: FearlessConfig {
                thread_colors: vec![[0, 0, 0], [90, 90, 90], [200, 30, 30]],
                ..Default::default()
            },
            ..small_params("fearless")
        };
        let a = run(&map, &params);
        let b = run(&map, &params);
        assert_eq!(a.chords, b.chords);
        assert!(a.len() <= params.n_strings);
    }

    #[test]
    fn test_score_is_asymmetric() {
        let map = DarknessMap::from_values(2, 1, vec![1.0, 0.0]);
        let canvas = ColorCanvas::new(&map, 0.5);
        let black = [0.0; 3];

        let gain = canvas.score(&[0], black, 0.2);
        let loss = canvas.score(&[1], black, 0.2);
        assert!(gain < 0.0);
        assert!(loss > 0.0);
        assert!((gain - (0.75 - 3.0)).abs() < 1e-6);
        assert!((loss - 0.2 * 0.75).abs() < 1e-6);
    }

    #[test]
    fn test_thread_never_repeats_a_move() {
        let map = DarknessMap::from_values(24, 24, vec![1.0; 24 * 24]);
        let params = small_params("fearless");
        let setup = RunSetup::new(&params, 24, 24, 1.0).unwrap();
        let set = setup.full_candidates(&map);
        let n_anchors = setup.layout.len();
        let table = set.index_table(n_anchors);
        let canvas = ColorCanvas::new(&map, 0.5);

        let mut thread = ThreadState {
            color: [0.0; 3],
            anchor: 0,
            used: HashSet::new(),
        };
        let (_, first) = propose(&thread, &canvas, &set, &table, n_anchors, 0.2).unwrap();
        thread.used.insert((0, first));
        let (_, second) = propose(&thread, &canvas, &set, &table, n_anchors, 0.2).unwrap();
        assert_ne!(first, second);

        for other in 1..n_anchors {
            thread.used.insert((0, table[other].unwrap()));
        }
        assert!(propose(&thread, &canvas, &set, &table, n_anchors, 0.2).is_none());
    }

    #[test]
    fn test_walk_has_no_repeated_moves() {
        let map = sample_map(96);
        let params = StrategyParams {
            n_strings: 40,
            ..small_params("fearless")
        };
        let result = run(&map, &params);

        let mut anchor = params.fearless.start_anchor;
        let mut moves = HashSet::new();
        for v in &result.chords {
            let next = if v.from == anchor { v.to } else { v.from };
            assert!(moves.insert((anchor, next)), "repeated move {anchor} -> {next}");
            anchor = next;
        }
    }
}
