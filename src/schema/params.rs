//! Strategy parameter types for chord selection runs.

use serde::{Deserialize, Serialize};

/// Minimum number of anchors that still forms a polygon.
pub const MIN_ANCHORS: usize = 3;

fn default_algorithm() -> String {
    "greedy".to_string()
}
fn default_margin() -> f64 {
    10.0
}

/// Top-level parameters shared by every strategy.
///
/// The first five fields form the public parameter contract; the nested
/// sections tune individual strategies and are ignored by the others.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyParams {
    /// Number of anchors evenly spaced on the layout circle.
    pub n_anchors: usize,
    /// Maximum number of chords to commit.
    pub n_strings: usize,
    /// Chord thickness in pixels.
    pub line_thickness: usize,
    /// Candidate pairs sampled per iteration (sampling strategies only).
    pub sample_pairs: usize,
    /// Registry key of the strategy to run.
    #[serde(default = "default_algorithm")]
    pub algorithm: String,
    /// Distance between the layout circle and the image border, in pixels.
    #[serde(default = "default_margin")]
    pub margin: f64,
    /// Random seed for reproducible stochastic runs.
    #[serde(default)]
    pub seed: Option<u64>,
    /// Candidate universe used by coverage and exact selection.
    #[serde(default)]
    pub candidates: CandidateMode,
    #[serde(default)]
    pub edges: EdgeDetectionConfig,
    #[serde(default)]
    pub greedy: GreedyConfig,
    #[serde(default)]
    pub coverage: CoverageConfig,
    #[serde(default)]
    pub annealing: AnnealingConfig,
    #[serde(default)]
    pub memetic: MemeticConfig,
    #[serde(default)]
    pub fearless: FearlessConfig,
}

impl Default for StrategyParams {
    fn default() -> Self {
        Self {
            n_anchors: 180,
            n_strings: 200,
            line_thickness: 1,
            sample_pairs: 1000,
            algorithm: default_algorithm(),
            margin: default_margin(),
            seed: None,
            candidates: CandidateMode::default(),
            edges: EdgeDetectionConfig::default(),
            greedy: GreedyConfig::default(),
            coverage: CoverageConfig::default(),
            annealing: AnnealingConfig::default(),
            memetic: MemeticConfig::default(),
            fearless: FearlessConfig::default(),
        }
    }
}

/// Which chords are eligible for selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidateMode {
    /// Every anchor pair.
    #[default]
    Full,
    /// Chords snapped from detected image line segments.
    EdgeGuided,
}

/// Edge detection and line-segment extraction parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EdgeDetectionConfig {
    /// Total Gaussian smoothing sigma applied before the gradient.
    pub sigma: f32,
    /// Weak edge threshold as a fraction of the maximum gradient magnitude.
    pub low_threshold: f32,
    /// Strong edge threshold as a fraction of the maximum gradient magnitude.
    pub high_threshold: f32,
    /// Minimum accumulator votes for a Hough line.
    pub hough_threshold: usize,
    /// Minimum accepted segment length in pixels.
    pub line_length: usize,
    /// Maximum gap in pixels bridged while walking a segment.
    pub line_gap: usize,
    /// Reduced sets smaller than this fall back to full enumeration.
    pub min_candidates: usize,
}

impl Default for EdgeDetectionConfig {
    fn default() -> Self {
        Self {
            sigma: 2.0,
            low_threshold: 0.1,
            high_threshold: 0.2,
            hough_threshold: 10,
            line_length: 30,
            line_gap: 5,
            min_candidates: 100,
        }
    }
}

/// Greedy residual search tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GreedyConfig {
    /// Length normalization exponent (0 = none, 1 = full length penalty).
    pub alpha: f64,
    /// Prune the working set every this many commits.
    pub prune_every: usize,
    /// Static coverage percentile below which candidates are pruned.
    pub prune_percentile: f64,
}

impl Default for GreedyConfig {
    fn default() -> Self {
        Self {
            alpha: 0.5,
            prune_every: 50,
            prune_percentile: 10.0,
        }
    }
}

/// Coverage multicover tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoverageConfig {
    /// Divide scores by `length^alpha` when ranking.
    pub length_normalize: bool,
    /// Exponent used when `length_normalize` is set.
    #[serde(default = "default_coverage_alpha")]
    pub alpha: f64,
}

fn default_coverage_alpha() -> f64 {
    0.5
}

impl Default for CoverageConfig {
    fn default() -> Self {
        Self {
            length_normalize: false,
            alpha: default_coverage_alpha(),
        }
    }
}

/// Simulated annealing schedule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnnealingConfig {
    /// Total proposal budget.
    pub iterations: usize,
    /// Starting temperature.
    pub initial_temperature: f64,
    /// Geometric cooling factor applied after every evaluated proposal.
    pub cooling: f64,
    /// Temperature floor that triggers a restart.
    pub min_temperature: f64,
    /// Restarts allowed before the search stops.
    pub max_restarts: usize,
    /// Restart temperature is `initial * restart_decay^restarts`.
    pub restart_decay: f64,
}

impl Default for AnnealingConfig {
    fn default() -> Self {
        Self {
            iterations: 10_000,
            initial_temperature: 1.0,
            cooling: 0.995,
            min_temperature: 1e-3,
            max_restarts: 2,
            restart_decay: 0.5,
        }
    }
}

/// Memetic genetic algorithm settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemeticConfig {
    /// Chromosomes per generation.
    pub population: usize,
    /// Number of generations.
    pub generations: usize,
    /// Per-gene replacement probability.
    pub mutation_rate: f64,
    /// Fraction of the sorted population kept unchanged.
    pub elite_fraction: f64,
    /// Parents are drawn from the best this-many elites.
    pub parent_pool: usize,
}

impl Default for MemeticConfig {
    fn default() -> Self {
        Self {
            population: 30,
            generations: 100,
            mutation_rate: 0.1,
            elite_fraction: 0.5,
            parent_pool: 10,
        }
    }
}

/// Multi-thread fearless greedy settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FearlessConfig {
    /// Downsampling factor; also sets the blend factor `1 / downscale`.
    pub downscale: usize,
    /// One RGB colour per simultaneous thread.
    pub thread_colors: Vec<[u8; 3]>,
    /// Multiplier applied to per-pixel error increases.
    pub damping: f32,
    /// Only moves scoring strictly below this value are committed.
    pub tolerance: f32,
    /// Anchor every thread starts from.
    pub start_anchor: usize,
}

impl Default for FearlessConfig {
    fn default() -> Self {
        Self {
            downscale: 4,
            thread_colors: vec![[0, 0, 0]],
            damping: 0.2,
            tolerance: 0.0,
            start_anchor: 0,
        }
    }
}

impl StrategyParams {
    /// Validate the shared parameter contract and sub-configs.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.n_anchors < MIN_ANCHORS {
            return Err(ConfigError::TooFewAnchors(self.n_anchors));
        }
        if self.line_thickness == 0 {
            return Err(ConfigError::InvalidThickness);
        }
        if self.sample_pairs == 0 {
            return Err(ConfigError::InvalidSamplePairs);
        }
        if !self.margin.is_finite() || self.margin < 0.0 {
            return Err(ConfigError::InvalidMargin(self.margin));
        }

        let check = |ok: bool, what: &str| {
            if ok {
                Ok(())
            } else {
                Err(ConfigError::InvalidParameter(what.to_string()))
            }
        };

        check(self.greedy.alpha >= 0.0, "greedy.alpha must be non-negative")?;
        check(
            (0.0..=100.0).contains(&self.greedy.prune_percentile),
            "greedy.prune_percentile must be within [0, 100]",
        )?;
        check(
            self.edges.low_threshold <= self.edges.high_threshold,
            "edges.low_threshold must not exceed edges.high_threshold",
        )?;
        check(self.edges.sigma >= 0.0, "edges.sigma must be non-negative")?;
        check(
            self.annealing.cooling > 0.0 && self.annealing.cooling < 1.0,
            "annealing.cooling must be within (0, 1)",
        )?;
        check(
            self.annealing.initial_temperature > self.annealing.min_temperature,
            "annealing.initial_temperature must exceed annealing.min_temperature",
        )?;
        check(
            self.memetic.population >= 2,
            "memetic.population must be at least 2",
        )?;
        check(
            (0.0..=1.0).contains(&self.memetic.mutation_rate),
            "memetic.mutation_rate must be within [0, 1]",
        )?;
        check(
            self.memetic.elite_fraction > 0.0 && self.memetic.elite_fraction <= 1.0,
            "memetic.elite_fraction must be within (0, 1]",
        )?;
        check(
            self.fearless.downscale >= 1,
            "fearless.downscale must be at least 1",
        )?;
        check(
            !self.fearless.thread_colors.is_empty(),
            "fearless.thread_colors must name at least one thread",
        )?;
        check(
            self.fearless.start_anchor < self.n_anchors,
            "fearless.start_anchor must be a valid anchor index",
        )?;

        Ok(())
    }

    /// Number of distinct chords between `n_anchors` anchors.
    #[inline]
    pub fn chord_count(&self) -> usize {
        self.n_anchors * (self.n_anchors - 1) / 2
    }
}

/// Parameter validation errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("At least 3 anchors are required, got {0}")]
    TooFewAnchors(usize),
    #[error("Line thickness must be at least 1")]
    InvalidThickness,
    #[error("sample_pairs must be at least 1")]
    InvalidSamplePairs,
    #[error("Margin must be a non-negative finite number, got {0}")]
    InvalidMargin(f64),
    #[error("Image dimensions must be non-zero and match the pixel count")]
    InvalidDimensions,
    #[error("Layout radius must be positive, got {0}")]
    NonPositiveRadius(f64),
    #[error("Unknown algorithm '{key}'. Valid options are: {}", .valid.join(", "))]
    UnknownAlgorithm { key: String, valid: Vec<String> },
    #[error("Cannot select {requested} distinct chords from {available} candidates")]
    InfeasibleCardinality { requested: usize, available: usize },
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
}
