//! Greedy residual search with biased pair sampling.

use rand_distr::{Distribution, WeightedAliasIndex};

use super::{
    CancelToken, ChordLog, ProgressSink, RunSetup, Strategy, StrategyError, length_norm,
};
use crate::compute::{Canvas, CandidateSet, DarknessMap, SearchRng};
use crate::schema::{Chord, GenerateResult, StopReason, StrategyParams};

/// Sampling distributions with less total weight than this are degenerate.
const WEIGHT_EPSILON: f64 = 1e-9;

/// Greedy residual strategy.
///
/// Each iteration weights anchors by the residual darkness under their
/// chords, samples `sample_pairs` anchor pairs from that distribution and
/// commits the sampled chord with the best length-normalized error
/// reduction. The working set is pruned by static coverage every
/// `greedy.prune_every` commits.
///
/// The gain counts only the clamped residual `max(target - ink, 0)` under a
/// chord. Overdraw on pixels lighter than full ink is not penalized, so a
/// committed chord can raise the canvas SSE against the target.
#[derive(Debug, Default, Clone, Copy)]
pub struct GreedyResidual;

impl Strategy for GreedyResidual {
    fn key(&self) -> &'static str {
        "greedy"
    }

    fn generate(
        &self,
        darkness: &DarknessMap,
        params: &StrategyParams,
        sink: &mut dyn ProgressSink,
        cancel: &CancelToken,
    ) -> Result<GenerateResult, StrategyError> {
        let setup = RunSetup::for_map(darkness, params)?;
        let n_anchors = setup.layout.len();
        let config = &params.greedy;

        let mut working = setup.full_candidates(darkness);
        let mut table = working.index_table(n_anchors);
        let mut canvas = Canvas::new(darkness.width, darkness.height);
        let mut residual = canvas.residual(darkness);
        let mut rng = SearchRng::from_option(params.seed);
        let mut log = ChordLog::new(sink, params.n_strings);

        log::info!(
            "Greedy: {} anchors, {} strings, {} candidates, alpha {}",
            n_anchors,
            params.n_strings,
            working.len(),
            config.alpha
        );

        while !log.is_full() {
            if cancel.is_cancelled() {
                log::info!("Greedy cancelled after {} strings", log.len());
                return Ok(log.finish(StopReason::Cancelled));
            }

            let weights = anchor_weights(&working, &residual, n_anchors);
            let total: f64 = weights.iter().sum();
            if total <= WEIGHT_EPSILON {
                if log.is_empty() {
                    return Err(StrategyError::DegenerateInput(format!(
                        "anchor sampling weights sum to {total}"
                    )));
                }
                log::debug!("Greedy: residual exhausted after {} strings", log.len());
                return Ok(log.finish(StopReason::NoImprovement));
            }
            let dist = WeightedAliasIndex::new(weights)
                .map_err(|e| StrategyError::DegenerateInput(e.to_string()))?;

            let mut sampled: Vec<usize> = (0..params.sample_pairs)
                .filter_map(|_| {
                    let i = dist.sample(rng.inner());
                    let j = dist.sample(rng.inner());
                    Chord::new(i, j).and_then(|c| table[c.a() * n_anchors + c.b()])
                })
                .collect();
            sampled.sort_unstable();
            sampled.dedup();

            let mut best: Option<(usize, f64)> = None;
            for &k in &sampled {
                let cand = working.get(k);
                let gain: f64 = cand
                    .mask
                    .pixels()
                    .iter()
                    .map(|&p| {
                        let r = residual[p as usize] as f64;
                        r * r
                    })
                    .sum();
                let score = gain / length_norm(cand.length, config.alpha);
                if best.is_none_or(|(_, s)| score > s) {
                    best = Some((k, score));
                }
            }

            let Some((k, score)) = best.filter(|&(_, s)| s > 0.0) else {
                log::debug!("Greedy: no improving chord after {} strings", log.len());
                return Ok(log.finish(StopReason::NoImprovement));
            };

            let cand = working.get(k);
            canvas.draw(&cand.mask);
            for &p in cand.mask.pixels() {
                residual[p as usize] = 0.0;
            }
            log.commit(cand.chord);
            log::trace!("Greedy: chord {:?} scored {:.4}", cand.chord, score);

            if config.prune_every > 0 && log.len() % config.prune_every == 0 {
                let before = working.len();
                let threshold = working.prune_below_percentile(config.prune_percentile);
                table = working.index_table(n_anchors);
                log::debug!(
                    "Greedy: pruned {} -> {} candidates (coverage < {:.3})",
                    before,
                    working.len(),
                    threshold
                );
            }
        }

        log::info!(
            "Greedy finished: {} strings, final SSE {:.3}",
            log.len(),
            canvas.sse(darkness)
        );
        Ok(log.finish(StopReason::Completed))
    }
}

/// Residual darkness under every working chord, summed per endpoint.
fn anchor_weights(set: &CandidateSet, residual: &[f32], n_anchors: usize) -> Vec<f64> {
    let mut weights = vec![0.0f64; n_anchors];
    for cand in set.iter() {
        let s = cand.mask.dot(residual);
        weights[cand.chord.a()] += s;
        weights[cand.chord.b()] += s;
    }
    weights
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{sample_map, small_params};
    use super::super::NullSink;
    use super::*;
    use crate::compute::percentile;
    use crate::schema::{GreedyConfig, IntensityGrid};

    fn run(darkness: &DarknessMap, params: &StrategyParams) -> Result<GenerateResult, StrategyError> {
        GreedyResidual.generate(darkness, params, &mut NullSink, &CancelToken::new())
    }

    #[test]
    fn test_blank_image_is_degenerate() {
        let map = DarknessMap::from_intensity(&IntensityGrid::filled(30, 30, 255));
        let params = StrategyParams {
            n_anchors: 8,
            n_strings: 5,
            ..Default::default()
        };
        assert!(matches!(
            run(&map, &params),
            Err(StrategyError::DegenerateInput(_))
        ));
    }

    #[test]
    fn test_single_dark_pixel_yields_one_chord() {
        let mut image = IntensityGrid::filled(30, 30, 255);
        image.set(15, 15, 0);
        let map = DarknessMap::from_intensity(&image);
        let params = StrategyParams {
            n_anchors: 8,
            n_strings: 1,
            seed: Some(3),
            ..Default::default()
        };

        let result = run(&map, &params).unwrap();
        assert_eq!(result.len(), 1);
        let v = result.chords[0];
        assert!(v.from < v.to && v.to < 8);
        assert_eq!(result.stop_reason, StopReason::Completed);
    }

    #[test]
    fn test_seeded_runs_match() {
        let map = sample_map(48);
        let params = small_params("greedy");
        let a = run(&map, &params).unwrap();
        let b = run(&map, &params).unwrap();
        assert_eq!(a.chords, b.chords);
        assert!(a.len() <= params.n_strings);
    }

    #[test]
    fn test_stops_when_residual_exhausted() {
        let mut image = IntensityGrid::filled(30, 30, 255);
        image.set(15, 15, 0);
        let map = DarknessMap::from_intensity(&image);
        let params = StrategyParams {
            n_anchors: 8,
            n_strings: 10,
            seed: Some(5),
            ..Default::default()
        };

        let result = run(&map, &params).unwrap();
        assert_eq!(result.len(), 1);
        assert_eq!(result.stop_reason, StopReason::NoImprovement);
    }

    #[test]
    fn test_cancel_before_start_returns_empty() {
        let map = sample_map(40);
        let token = CancelToken::new();
        token.cancel();
        let result = GreedyResidual
            .generate(&map, &small_params("greedy"), &mut NullSink, &token)
            .unwrap();
        assert!(result.is_empty());
        assert_eq!(result.stop_reason, StopReason::Cancelled);
    }

    #[test]
    fn test_sink_sees_every_commit() {
        let map = sample_map(48);
        let params = small_params("greedy");
        let mut seen = Vec::new();
        let mut sink = |from: usize, to: usize| seen.push((from, to));
        let result = GreedyResidual
            .generate(&map, &params, &mut sink, &CancelToken::new())
            .unwrap();

        let expected: Vec<_> = result.chords.iter().map(|v| (v.from, v.to)).collect();
        assert_eq!(seen, expected);
    }

    #[test]
    fn test_pruned_runs_pick_from_surviving_candidates() {
        let map = sample_map(64);
        let params = StrategyParams {
            n_strings: 40,
            greedy: GreedyConfig {
                prune_every: 3,
                prune_percentile: 50.0,
                ..Default::default()
            },
            ..small_params("greedy")
        };

        let setup = RunSetup::for_map(&map, &params).unwrap();
        let full = setup.full_candidates(&map);
        let coverage: Vec<f64> = full.iter().map(|c| c.static_coverage).collect();
        let first_cut = percentile(&coverage, 50.0);

        let result = run(&map, &params).unwrap();
        assert!(result.len() > 3, "only {} chords", result.len());

        let lookup = |v: &crate::schema::ChordVector| {
            full.iter()
                .find(|c| (c.chord.a(), c.chord.b()) == (v.from, v.to))
                .map(|c| c.static_coverage)
                .unwrap()
        };
        // Everything after the first prune comes from the upper half
        for v in &result.chords[3..] {
            assert!(lookup(v) >= first_cut, "{v:?} below {first_cut}");
        }

        let mut unique: Vec<_> = result.chords.iter().map(|v| (v.from, v.to)).collect();
        unique.sort_unstable();
        unique.dedup();
        assert_eq!(unique.len(), result.len());
    }
}
