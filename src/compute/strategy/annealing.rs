//! Simulated annealing over fixed-size chord selections.

use super::{
    CancelToken, ChordLog, ProgressSink, RunSetup, Strategy, StrategyError, require_candidates,
};
use crate::compute::{CandidateSet, DarknessMap, SearchRng};
use crate::schema::{AnnealingConfig, ConfigError, GenerateResult, StopReason, StrategyParams};

/// Simulated annealing swap strategy.
///
/// A selection of exactly `n_strings` chords is scored as the sum of each
/// chord's standalone squared error against the target. Moves swap one
/// selected chord for one unselected chord and are accepted by the
/// Metropolis rule. The best selection seen is emitted.
#[derive(Debug, Default, Clone, Copy)]
pub struct SimulatedAnnealingSwap;

/// Squared error of drawing each chord alone on a blank canvas:
/// `Σ d² + Σ_mask (1 - 2d)`.
fn standalone_errors(set: &CandidateSet, darkness: &DarknessMap) -> Vec<f64> {
    let base: f64 = darkness.data.iter().map(|&d| (d as f64) * (d as f64)).sum();
    set.iter()
        .map(|c| base + c.mask.len() as f64 - 2.0 * c.static_coverage)
        .collect()
}

/// Geometric cooling with decaying restarts.
#[derive(Debug, Clone, Copy)]
struct Schedule {
    temperature: f64,
    restarts: usize,
}

impl Schedule {
    fn new(config: &AnnealingConfig) -> Self {
        Self {
            temperature: config.initial_temperature,
            restarts: 0,
        }
    }

    /// Cool by one step, restarting below the floor. Returns `false` once
    /// more than `max_restarts` restarts would be needed.
    fn cool(&mut self, config: &AnnealingConfig) -> bool {
        self.temperature *= config.cooling;
        if self.temperature >= config.min_temperature {
            return true;
        }
        self.restarts += 1;
        if self.restarts > config.max_restarts {
            return false;
        }
        self.temperature =
            config.initial_temperature * config.restart_decay.powi(self.restarts as i32);
        true
    }
}

struct Selection {
    chosen: Vec<usize>,
    rest: Vec<usize>,
    score: f64,
}

impl Strategy for SimulatedAnnealingSwap {
    fn key(&self) -> &'static str {
        "annealing"
    }

    fn generate(
        &self,
        darkness: &DarknessMap,
        params: &StrategyParams,
        sink: &mut dyn ProgressSink,
        cancel: &CancelToken,
    ) -> Result<GenerateResult, StrategyError> {
        let setup = RunSetup::for_map(darkness, params)?;
        let set = setup.full_candidates(darkness);
        require_candidates(&set)?;

        let n = params.n_strings;
        if n > set.len() {
            return Err(ConfigError::InfeasibleCardinality {
                requested: n,
                available: set.len(),
            }
            .into());
        }

        let config = &params.annealing;
        let cost = standalone_errors(&set, darkness);
        let mut rng = SearchRng::from_option(params.seed);

        let chosen = rng.distinct(set.len(), n);
        let mut taken = vec![false; set.len()];
        for &k in &chosen {
            taken[k] = true;
        }
        let rest: Vec<usize> = (0..set.len()).filter(|&k| !taken[k]).collect();
        let score = chosen.iter().map(|&k| cost[k]).sum();
        let mut current = Selection {
            chosen,
            rest,
            score,
        };
        let mut best = current.chosen.clone();
        let mut best_score = current.score;

        log::info!(
            "Annealing: {} of {} chords, {} iterations, initial score {:.3}",
            n,
            set.len(),
            config.iterations,
            best_score
        );

        let mut schedule = Schedule::new(config);
        let searchable = n > 0 && !current.rest.is_empty();

        for iter in 0..config.iterations {
            if cancel.is_cancelled() {
                log::info!("Annealing cancelled at iteration {iter}");
                return Ok(ChordLog::new(sink, 0).finish(StopReason::Cancelled));
            }
            if !searchable {
                break;
            }

            let i = rng.index(current.chosen.len());
            let j = rng.index(current.rest.len());
            let delta = cost[current.rest[j]] - cost[current.chosen[i]];

            if delta < 0.0 || rng.unit() < (-delta / schedule.temperature).exp() {
                std::mem::swap(&mut current.chosen[i], &mut current.rest[j]);
                current.score += delta;
                if current.score < best_score {
                    best_score = current.score;
                    best.clone_from(&current.chosen);
                }
            }

            let restarts = schedule.restarts;
            if !schedule.cool(config) {
                log::debug!("Annealing: restart limit reached at iteration {iter}");
                break;
            }
            if schedule.restarts > restarts {
                log::debug!(
                    "Annealing: restart {} at T = {:.4}",
                    schedule.restarts,
                    schedule.temperature
                );
            }
        }

        log::info!("Annealing finished, best score {:.3}", best_score);

        let mut log = ChordLog::new(sink, n);
        for k in best {
            if cancel.is_cancelled() {
                return Ok(log.finish(StopReason::Cancelled));
            }
            log.commit(set.get(k).chord);
        }
        Ok(log.finish(StopReason::Completed))
    }
}
