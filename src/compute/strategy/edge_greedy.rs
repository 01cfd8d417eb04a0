//! Residual greedy restricted to edge-detected chords.

use super::{
    CancelToken, ChordLog, ProgressSink, RunSetup, Strategy, StrategyError, reduction_seed,
    require_candidates,
};
use crate::compute::{Canvas, CandidateSet, DarknessMap};
use crate::schema::{GenerateResult, StopReason, StrategyParams};

/// Edge-guided greedy strategy.
///
/// Candidates come from line segments detected in the source image, snapped
/// onto anchors; too few segments fall back to every anchor pair. Each
/// iteration draws the chord covering the most missing darkness.
#[derive(Debug, Default, Clone, Copy)]
pub struct EdgeGuidedGreedy;

impl Strategy for EdgeGuidedGreedy {
    fn key(&self) -> &'static str {
        "hough_greedy"
    }

    fn generate(
        &self,
        darkness: &DarknessMap,
        params: &StrategyParams,
        sink: &mut dyn ProgressSink,
        cancel: &CancelToken,
    ) -> Result<GenerateResult, StrategyError> {
        let setup = RunSetup::for_map(darkness, params)?;
        let set = CandidateSet::edge_guided(
            &setup.layout,
            &setup.raster,
            darkness,
            &params.edges,
            reduction_seed(params),
        );
        require_candidates(&set)?;

        let mut canvas = Canvas::new(darkness.width, darkness.height);
        let mut residual = canvas.residual(darkness);
        let mut log = ChordLog::new(sink, params.n_strings);

        log::info!(
            "Edge greedy: {} strings over {} candidates ({:?})",
            params.n_strings,
            set.len(),
            set.origin()
        );

        while !log.is_full() {
            if cancel.is_cancelled() {
                return Ok(log.finish(StopReason::Cancelled));
            }

            let mut best: Option<(usize, f64)> = None;
            for (k, cand) in set.iter().enumerate() {
                let score = cand.mask.dot(&residual);
                if best.is_none_or(|(_, s)| score > s) {
                    best = Some((k, score));
                }
            }

            let Some((k, _)) = best.filter(|&(_, s)| s > 0.0) else {
                log::debug!("Edge greedy: no improving chord after {} strings", log.len());
                return Ok(log.finish(StopReason::NoImprovement));
            };

            let cand = set.get(k);
            canvas.draw(&cand.mask);
            for &p in cand.mask.pixels() {
                residual[p as usize] = 0.0;
            }
            log.commit(cand.chord);
        }

        log::info!("Edge greedy finished, SSE {:.3}", canvas.sse(darkness));
        Ok(log.finish(StopReason::Completed))
    }
}
