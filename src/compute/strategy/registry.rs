//! Static table of available strategies.

use super::{
    CancelToken, CardinalitySolver, CoverageMulticover, EdgeGuidedGreedy, ExactIlp,
    GreedyResidual, MemeticGa, MultiThreadFearlessGreedy, NullSink, ProgressSink,
    SimulatedAnnealingSwap, Strategy, StrategyError,
};
use crate::compute::DarknessMap;
use crate::schema::{ConfigError, GenerateResult, IntensityGrid, StrategyParams};

static EXACT: ExactIlp<CardinalitySolver> = ExactIlp::with_solver(CardinalitySolver);

/// Maps algorithm keys to strategy singletons.
pub struct StrategyRegistry {
    entries: &'static [&'static dyn Strategy],
}

/// Every built-in strategy, in listing order.
pub static REGISTRY: StrategyRegistry = StrategyRegistry {
    entries: &[
        &GreedyResidual,
        &CoverageMulticover,
        &EXACT,
        &EdgeGuidedGreedy,
        &SimulatedAnnealingSwap,
        &MemeticGa,
        &MultiThreadFearlessGreedy,
    ],
};

impl StrategyRegistry {
    /// Registered keys, in listing order.
    pub fn keys(&self) -> Vec<&'static str> {
        self.entries.iter().map(|s| s.key()).collect()
    }

    pub fn get(&self, key: &str) -> Option<&'static dyn Strategy> {
        self.entries.iter().copied().find(|s| s.key() == key)
    }

    fn lookup(&self, key: &str) -> Result<&'static dyn Strategy, ConfigError> {
        self.get(key).ok_or_else(|| ConfigError::UnknownAlgorithm {
            key: key.to_string(),
            valid: self.keys().into_iter().map(String::from).collect(),
        })
    }

    /// Run the strategy registered under `key`.
    pub fn dispatch(
        &self,
        key: &str,
        darkness: &DarknessMap,
        params: &StrategyParams,
        sink: Option<&mut dyn ProgressSink>,
        cancel: Option<&CancelToken>,
    ) -> Result<GenerateResult, StrategyError> {
        let strategy = self.lookup(key)?;

        let mut null = NullSink;
        let sink = match sink {
            Some(s) => s,
            None => &mut null,
        };
        let idle = CancelToken::new();
        let cancel = cancel.unwrap_or(&idle);

        log::debug!(
            "Dispatching '{}' on {}x{} map",
            key,
            darkness.width,
            darkness.height
        );
        strategy.generate(darkness, params, sink, cancel)
    }

    /// Run the strategy named by `params.algorithm`.
    pub fn run(
        &self,
        darkness: &DarknessMap,
        params: &StrategyParams,
        sink: Option<&mut dyn ProgressSink>,
        cancel: Option<&CancelToken>,
    ) -> Result<GenerateResult, StrategyError> {
        self.dispatch(&params.algorithm, darkness, params, sink, cancel)
    }
}

/// Convert an intensity image and run `params.algorithm` to completion.
pub fn generate_string_vectors(
    image: &IntensityGrid,
    params: &StrategyParams,
) -> Result<GenerateResult, StrategyError> {
    image.validate()?;
    let darkness = DarknessMap::from_intensity(image);
    REGISTRY.run(&darkness, params, None, None)
}
