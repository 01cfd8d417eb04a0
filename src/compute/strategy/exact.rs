//! Exact selection as a 0/1 program with a cardinality constraint.
//!
//! The program is handed to an [`IntegerSolver`] backend, which is treated as
//! an exchangeable black box. The bundled [`CardinalitySolver`] solves this
//! program class exactly: with a single equality constraint on the number of
//! selected variables, the optimum is the `k` largest weights.

use serde::{Deserialize, Serialize};

use super::{
    CancelToken, ChordLog, ProgressSink, RunSetup, Strategy, StrategyError, reduction_seed,
    require_candidates,
};
use crate::compute::{CandidateSet, DarknessMap};
use crate::schema::{GenerateResult, StopReason, StrategyParams};

/// `maximize Σ weights[i]·x[i]  s.t.  Σ x[i] = cardinality,  x[i] ∈ {0, 1}`.
#[derive(Debug, Clone, PartialEq)]
pub struct BinaryProgram {
    pub weights: Vec<f64>,
    pub cardinality: usize,
}

/// Termination status reported by a solver backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SolveStatus {
    Optimal,
    /// Feasible but not proven optimal.
    Feasible,
    Infeasible,
    NotSolved,
}

impl std::fmt::Display for SolveStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SolveStatus::Optimal => "optimal",
            SolveStatus::Feasible => "feasible",
            SolveStatus::Infeasible => "infeasible",
            SolveStatus::NotSolved => "not solved",
        };
        f.write_str(s)
    }
}

/// Solver output: the indices with `x[i] = 1`.
#[derive(Debug, Clone, PartialEq)]
pub struct Solution {
    pub status: SolveStatus,
    pub selected: Vec<usize>,
    pub objective: f64,
}

#[derive(Debug, thiserror::Error)]
pub enum SolverError {
    #[error("Cannot select {requested} chords from {available} candidates")]
    Infeasible { requested: usize, available: usize },
    #[error("Solver finished with status '{0}'")]
    NonOptimal(SolveStatus),
    #[error("Solver backend failed: {0}")]
    Backend(String),
}

/// Integer optimization backend.
pub trait IntegerSolver: Send + Sync {
    fn solve(&self, program: &BinaryProgram) -> Result<Solution, SolverError>;
}

/// Exact backend for single-cardinality programs.
///
/// Picks the `cardinality` largest weights, ties going to the lower index.
/// The selection is returned in ascending index order.
#[derive(Debug, Default, Clone, Copy)]
pub struct CardinalitySolver;

impl IntegerSolver for CardinalitySolver {
    fn solve(&self, program: &BinaryProgram) -> Result<Solution, SolverError> {
        let k = program.cardinality;
        if k > program.weights.len() {
            return Ok(Solution {
                status: SolveStatus::Infeasible,
                selected: Vec::new(),
                objective: 0.0,
            });
        }
        if program.weights.iter().any(|w| !w.is_finite()) {
            return Err(SolverError::Backend("non-finite objective weight".to_string()));
        }

        let mut order: Vec<usize> = (0..program.weights.len()).collect();
        order.sort_by(|&i, &j| {
            program.weights[j]
                .total_cmp(&program.weights[i])
                .then(i.cmp(&j))
        });
        let mut selected = order[..k].to_vec();
        selected.sort_unstable();

        let objective = selected.iter().map(|&i| program.weights[i]).sum();
        Ok(Solution {
            status: SolveStatus::Optimal,
            selected,
            objective,
        })
    }
}

/// Exact strategy: pick the `n_strings` chords with maximal total static
/// coverage.
///
/// Chords are emitted in ascending candidate order once the solver returns.
#[derive(Debug, Default, Clone, Copy)]
pub struct ExactIlp<S = CardinalitySolver> {
    solver: S,
}

impl<S> ExactIlp<S> {
    pub const fn with_solver(solver: S) -> Self {
        Self { solver }
    }
}

impl<S: IntegerSolver> ExactIlp<S> {
    /// Solve for the selected candidate indices.
    pub fn select(&self, set: &CandidateSet, n_strings: usize) -> Result<Vec<usize>, SolverError> {
        if n_strings > set.len() {
            return Err(SolverError::Infeasible {
                requested: n_strings,
                available: set.len(),
            });
        }

        let program = BinaryProgram {
            weights: set.iter().map(|c| c.static_coverage).collect(),
            cardinality: n_strings,
        };
        let solution = self.solver.solve(&program)?;

        match solution.status {
            SolveStatus::Optimal => {}
            SolveStatus::Infeasible => {
                return Err(SolverError::Infeasible {
                    requested: n_strings,
                    available: set.len(),
                });
            }
            status => return Err(SolverError::NonOptimal(status)),
        }

        let mut check = solution.selected.clone();
        check.sort_unstable();
        check.dedup();
        if check.len() != n_strings || check.last().is_some_and(|&i| i >= set.len()) {
            return Err(SolverError::Backend(format!(
                "solution selects {} distinct valid variables, expected {}",
                check.len(),
                n_strings
            )));
        }

        log::debug!("Exact: objective {:.4}", solution.objective);
        Ok(check)
    }
}

impl<S: IntegerSolver> Strategy for ExactIlp<S> {
    fn key(&self) -> &'static str {
        "graph"
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

        log::info!(
            "Exact: choosing {} of {} candidates ({:?})",
            params.n_strings,
            set.len(),
            set.origin()
        );

        if cancel.is_cancelled() {
            return Ok(ChordLog::new(sink, 0).finish(StopReason::Cancelled));
        }
        let selected = self.select(&set, params.n_strings)?;

        let mut log = ChordLog::new(sink, params.n_strings);
        for k in selected {
            if cancel.is_cancelled() {
                return Ok(log.finish(StopReason::Cancelled));
            }
            log.commit(set.get(k).chord);
        }
        Ok(log.finish(StopReason::Completed))
    }
}

#[cfg(test)]
mod tests {
    use super::super::NullSink;
    use super::super::test_support::{sample_map, small_params};
    use super::*;
    use crate::compute::{AnchorLayout, CandidateOrigin, ChordRasterizer};
    use crate::schema::Chord;

    struct StubSolver(SolveStatus);

    impl IntegerSolver for StubSolver {
        fn solve(&self, program: &BinaryProgram) -> Result<Solution, SolverError> {
            Ok(Solution {
                status: self.0,
                selected: (0..program.cardinality).collect(),
                objective: 0.0,
            })
        }
    }

    #[test]
    fn test_cardinality_solver_matches_brute_force() {
        let weights = vec![3.0, 9.0, 1.0, 9.0, 4.0, 7.5];
        let program = BinaryProgram {
            weights: weights.clone(),
            cardinality: 2,
        };
        let solution = CardinalitySolver.solve(&program).unwrap();

        let mut best = f64::MIN;
        for i in 0..weights.len() {
            for j in (i + 1)..weights.len() {
                best = best.max(weights[i] + weights[j]);
            }
        }
        assert_eq!(solution.status, SolveStatus::Optimal);
        assert_eq!(solution.selected, vec![1, 3]);
        assert!((solution.objective - best).abs() < 1e-12);
    }

    #[test]
    fn test_cardinality_solver_ties_to_lower_index() {
        let program = BinaryProgram {
            weights: vec![2.0, 5.0, 2.0, 2.0],
            cardinality: 2,
        };
        assert_eq!(CardinalitySolver.solve(&program).unwrap().selected, vec![0, 1]);
    }

    #[test]
    fn test_infeasible_cardinality() {
        let map = sample_map(40);
        let params = StrategyParams {
            n_anchors: 4,
            n_strings: 7,
            margin: 2.0,
            ..Default::default()
        };
        let err = ExactIlp::<CardinalitySolver>::default()
            .generate(&map, &params, &mut NullSink, &CancelToken::new())
            .unwrap_err();
        assert!(matches!(
            err,
            StrategyError::Solver(SolverError::Infeasible {
                requested: 7,
                available: 6
            })
        ));
    }

    #[test]
    fn test_non_optimal_status_is_error() {
        let map = sample_map(40);
        let err = ExactIlp::with_solver(StubSolver(SolveStatus::Feasible))
            .generate(&map, &small_params("graph"), &mut NullSink, &CancelToken::new())
            .unwrap_err();
        assert!(matches!(
            err,
            StrategyError::Solver(SolverError::NonOptimal(SolveStatus::Feasible))
        ));
    }

    #[test]
    fn test_select_on_hand_built_set() {
        let layout = AnchorLayout::generate(4, 40, 40, 2.0).unwrap();
        let raster = ChordRasterizer::new(40, 40, 1);
        let map = sample_map(40);
        let chords: Vec<Chord> = Chord::enumerate(4).collect();
        let set = CandidateSet::from_chords(&chords, &layout, &raster, &map, CandidateOrigin::Full);

        let picked = ExactIlp::<CardinalitySolver>::default().select(&set, 2).unwrap();
        let score = |ks: &[usize]| ks.iter().map(|&k| set.get(k).static_coverage).sum::<f64>();

        let mut best = f64::MIN;
        for i in 0..6 {
            for j in (i + 1)..6 {
                best = best.max(score(&[i, j]));
            }
        }
        assert!((score(&picked) - best).abs() < 1e-9);
    }

    #[test]
    fn test_deterministic_output() {
        let map = sample_map(48);
        let params = small_params("graph");
        let run = || {
            ExactIlp::<CardinalitySolver>::default()
                .generate(&map, &params, &mut NullSink, &CancelToken::new())
                .unwrap()
        };
        let a = run();
        assert_eq!(a.len(), params.n_strings);
        assert_eq!(a.chords, run().chords);
    }
}
