//! Multicover greedy on a residual darkness map.

use super::{
    CancelToken, ChordLog, ProgressSink, RunSetup, Strategy, StrategyError, length_norm,
    reduction_seed, require_candidates,
};
use crate::compute::{CandidateSet, DarknessMap};
use crate::schema::{GenerateResult, StopReason, StrategyParams};

/// Coverage multicover strategy.
///
/// No canvas is kept. Each iteration picks the chord with the largest
/// `mask · residual` and removes its proportional share,
/// `score / static_coverage`, from every pixel under the mask. Fully
/// deterministic.
#[derive(Debug, Default, Clone, Copy)]
pub struct CoverageMulticover;

impl Strategy for CoverageMulticover {
    fn key(&self) -> &'static str {
        "coverage"
    }

    fn generate(
        &self,
        darkness: &DarknessMap,
        params: &StrategyParams,
        sink: &mut dyn ProgressSink,
        cancel: &CancelToken,
    ) -> Result<GenerateResult, StrategyError> {
        let setup = RunSetup::for_map(darkness, params)?;
        let set = CandidateSet::build(
            params.candidates,
            &setup.layout,
            &setup.raster,
            darkness,
            &params.edges,
            reduction_seed(params),
        );
        require_candidates(&set)?;

        let config = &params.coverage;
        let mut residual = darkness.data.clone();
        let mut log = ChordLog::new(sink, params.n_strings);

        log::info!(
            "Coverage: {} strings over {} candidates ({:?})",
            params.n_strings,
            set.len(),
            set.origin()
        );

        while !log.is_full() {
            if cancel.is_cancelled() {
                log::info!("Coverage cancelled after {} strings", log.len());
                return Ok(log.finish(StopReason::Cancelled));
            }

            let mut best: Option<(usize, f64, f64)> = None;
            for (k, cand) in set.iter().enumerate() {
                let raw = cand.mask.dot(&residual);
                let ranked = if config.length_normalize {
                    raw / length_norm(cand.length, config.alpha)
                } else {
                    raw
                };
                if best.is_none_or(|(_, _, r)| ranked > r) {
                    best = Some((k, raw, ranked));
                }
            }

            let Some((k, raw, _)) = best.filter(|&(_, raw, _)| raw > 0.0) else {
                log::debug!("Coverage: residual exhausted after {} strings", log.len());
                return Ok(log.finish(StopReason::NoImprovement));
            };

            let cand = set.get(k);
            if cand.static_coverage > 0.0 {
                let share = (raw / cand.static_coverage) as f32;
                for &p in cand.mask.pixels() {
                    let r = &mut residual[p as usize];
                    *r = (*r - share).max(0.0);
                }
            }
            log.commit(cand.chord);
        }

        Ok(log.finish(StopReason::Completed))
    }
}

#[cfg(test)]
mod tests {
    use super::super::NullSink;
    use super::super::test_support::{sample_map, small_params};
    use super::*;
    use crate::schema::{CandidateMode, IntensityGrid};

    fn run(darkness: &DarknessMap, params: &StrategyParams) -> GenerateResult {
        CoverageMulticover
            .generate(darkness, params, &mut NullSink, &CancelToken::new())
            .unwrap()
    }

    #[test]
    fn test_deterministic() {
        let map = sample_map(48);
        let params = StrategyParams {
            seed: None,
            ..small_params("coverage")
        };
        assert_eq!(run(&map, &params).chords, run(&map, &params).chords);
    }

    #[test]
    fn test_blank_image_stops_immediately() {
        let map = DarknessMap::from_intensity(&IntensityGrid::filled(30, 30, 255));
        let params = StrategyParams {
            n_anchors: 8,
            n_strings: 5,
            ..Default::default()
        };
        let result = run(&map, &params);
        assert!(result.is_empty());
        assert_eq!(result.stop_reason, StopReason::NoImprovement);
    }

    #[test]
    fn test_first_pick_has_max_static_coverage() {
        let map = sample_map(48);
        let params = small_params("coverage");
        let result = run(&map, &params);

        let setup = RunSetup::for_map(&map, &params).unwrap();
        let set = setup.full_candidates(&map);
        let top = set
            .iter()
            .fold(None::<&crate::compute::Candidate>, |acc, c| match acc {
                Some(b) if b.static_coverage >= c.static_coverage => Some(b),
                _ => Some(c),
            })
            .unwrap();
        assert_eq!(result.chords[0], top.chord.to_vector());
    }

    #[test]
    fn test_edge_guided_mode_runs() {
        let map = sample_map(64);
        let params = StrategyParams {
            candidates: CandidateMode::EdgeGuided,
            ..small_params("coverage")
        };
        let result = run(&map, &params);
        assert!(result.len() <= params.n_strings);
        assert!(result.chords.iter().all(|v| v.from < v.to && v.to < params.n_anchors));
    }
}
