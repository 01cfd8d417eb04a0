//! Memetic genetic search over fixed-size chord selections.

use super::{
    CancelToken, ChordLog, ProgressSink, RunSetup, Strategy, StrategyError, require_candidates,
};
use crate::compute::{Canvas, CandidateSet, DarknessMap, SearchRng};
use crate::schema::{ConfigError, GenerateResult, MemeticConfig, StopReason, StrategyParams};

/// Memetic GA strategy.
///
/// Chromosomes are `n_strings` distinct candidate indices; fitness is the
/// squared error of rendering all of them. Each generation keeps the elite
/// fraction and refills the population with one-point crossover children of
/// elite parents, mutated and repaired back to distinct genes.
#[derive(Debug, Default, Clone, Copy)]
pub struct MemeticGa;

type Chromosome = Vec<usize>;

fn fitness(genes: &[usize], set: &CandidateSet, darkness: &DarknessMap) -> f64 {
    let mut canvas = Canvas::new(darkness.width, darkness.height);
    for &k in genes {
        canvas.draw(&set.get(k).mask);
    }
    canvas.sse(darkness)
}

/// Replace repeated genes with unused indices from `0..universe`.
fn repair(genes: &mut [usize], universe: usize, rng: &mut SearchRng) {
    let mut used = vec![false; universe];
    let mut dupes = Vec::new();
    for (pos, &g) in genes.iter().enumerate() {
        if used[g] {
            dupes.push(pos);
        } else {
            used[g] = true;
        }
    }
    if dupes.is_empty() {
        return;
    }

    let mut free: Vec<usize> = (0..universe).filter(|&k| !used[k]).collect();
    for pos in dupes {
        let pick = rng.index(free.len());
        genes[pos] = free.swap_remove(pick);
    }
}

fn breed(
    elites: &[Chromosome],
    config: &MemeticConfig,
    universe: usize,
    rng: &mut SearchRng,
) -> Chromosome {
    let pool = config.parent_pool.clamp(1, elites.len());
    let p1 = &elites[rng.index(pool)];
    let p2 = &elites[rng.index(pool)];
    let n = p1.len();

    let cut = if n > 1 { 1 + rng.index(n - 1) } else { n };
    let mut child: Chromosome = p1[..cut].iter().chain(&p2[cut..]).copied().collect();

    for gene in child.iter_mut() {
        if rng.unit() < config.mutation_rate {
            *gene = rng.index(universe);
        }
    }
    repair(&mut child, universe, rng);
    child
}

/// Score and sort a population, best (lowest error) first.
fn rank(
    population: Vec<Chromosome>,
    set: &CandidateSet,
    darkness: &DarknessMap,
) -> Vec<(f64, Chromosome)> {
    let mut scored: Vec<(f64, Chromosome)> = population
        .into_iter()
        .map(|c| (fitness(&c, set, darkness), c))
        .collect();
    scored.sort_by(|a, b| a.0.total_cmp(&b.0));
    scored
}

/// Keep the `elite_count` best unchanged and refill with their children.
fn next_generation(
    ranked: Vec<(f64, Chromosome)>,
    elite_count: usize,
    config: &MemeticConfig,
    universe: usize,
    rng: &mut SearchRng,
) -> Vec<Chromosome> {
    let mut population: Vec<Chromosome> = ranked
        .into_iter()
        .take(elite_count)
        .map(|(_, c)| c)
        .collect();
    let elites = population.len();
    while population.len() < config.population {
        let child = breed(&population[..elites], config, universe, rng);
        population.push(child);
    }
    population
}

impl Strategy for MemeticGa {
    fn key(&self) -> &'static str {
        "memetic"
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
        let universe = set.len();
        if n > universe {
            return Err(ConfigError::InfeasibleCardinality {
                requested: n,
                available: universe,
            }
            .into());
        }

        let config = &params.memetic;
        let mut rng = SearchRng::from_option(params.seed);
        let elite_count = ((config.population as f64 * config.elite_fraction).round() as usize)
            .clamp(1, config.population);

        let mut population: Vec<Chromosome> = (0..config.population)
            .map(|_| rng.distinct(universe, n))
            .collect();

        log::info!(
            "Memetic: population {}, {} generations, {} genes over {} chords",
            config.population,
            config.generations,
            n,
            universe
        );

        for generation in 0..config.generations {
            if cancel.is_cancelled() {
                log::info!("Memetic cancelled at generation {generation}");
                return Ok(ChordLog::new(sink, 0).finish(StopReason::Cancelled));
            }

            let ranked = rank(population, &set, darkness);
            if generation % 10 == 0 {
                log::debug!(
                    "Memetic: generation {generation}, best fitness {:.3}",
                    ranked[0].0
                );
            }
            population = next_generation(ranked, elite_count, config, universe, &mut rng);
        }

        let (best_fitness, best) = rank(population, &set, darkness)
            .into_iter()
            .next()
            .unwrap_or_default();
        log::info!("Memetic finished, best fitness {:.3}", best_fitness);

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
