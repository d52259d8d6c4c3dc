//! Genetic-algorithm search over boolean genomes.
//!
//! Genomes are rule inclusion masks (one 0/1 gene per dimension). Fitness
//! is the NAV gain of a backtest with that mask; a degenerate all-zero
//! genome is scored with a large penalty instead of being evaluated, so
//! the search steers away from it without failing. Generations advance by
//! tournament selection with elitism, single-point crossover and per-gene
//! mutation. Population fitness is evaluated in parallel; runs are
//! independent so this is safe.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use tracing::debug;

use super::{HistoryEntry, Objective, OptimizeError, ParamSpace, SearchResult, SearchStrategy};

/// Fitness assigned to an all-zero genome without running a backtest.
pub const EMPTY_MASK_PENALTY: f64 = -1e6;

#[derive(Debug, Clone)]
pub struct GaSearch {
    pub population: usize,
    pub generations: usize,
    /// Per-gene flip probability.
    pub mutation_rate: f64,
    /// Genomes carried unchanged into the next generation.
    pub elitism: usize,
    /// Tournament size for parent selection.
    pub tournament: usize,
    pub seed: u64,
}

impl Default for GaSearch {
    fn default() -> Self {
        Self {
            population: 10,
            generations: 20,
            mutation_rate: 0.2,
            elitism: 1,
            tournament: 3,
            seed: 42,
        }
    }
}

type Genome = Vec<bool>;

impl SearchStrategy for GaSearch {
    fn search(
        &self,
        space: &ParamSpace,
        objective: &dyn Objective,
    ) -> Result<SearchResult, OptimizeError> {
        if let Some(dim) = space.dims().iter().find(|d| !d.is_binary()) {
            return Err(OptimizeError::NonBinaryDimension {
                name: dim.name.clone(),
            });
        }
        if self.population < 2 {
            return Err(OptimizeError::PopulationTooSmall);
        }
        if self.generations == 0 {
            return Err(OptimizeError::ZeroBudget);
        }

        let n_genes = space.len();
        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut population: Vec<Genome> = (0..self.population)
            .map(|_| (0..n_genes).map(|_| rng.gen_bool(0.5)).collect())
            .collect();

        let mut history = Vec::new();
        let mut best: Option<(Genome, f64)> = None;

        for generation in 0..self.generations {
            let fitnesses: Vec<f64> = population
                .par_iter()
                .map(|genome| genome_fitness(genome, space, objective))
                .collect();

            for (genome, &fitness) in population.iter().zip(&fitnesses) {
                history.push(HistoryEntry {
                    params: materialize(space, genome),
                    score: -fitness,
                });
                let improved = best.as_ref().map_or(true, |(_, f)| fitness > *f);
                if improved {
                    best = Some((genome.clone(), fitness));
                }
            }
            debug!(
                generation,
                best_fitness = best.as_ref().map(|(_, f)| *f).unwrap_or(f64::MIN),
                "generation evaluated"
            );

            if generation + 1 == self.generations {
                break;
            }
            population = self.next_generation(&population, &fitnesses, &mut rng);
        }

        // population >= 2 guarantees at least one evaluation.
        let (genome, fitness) = best.ok_or(OptimizeError::PopulationTooSmall)?;
        Ok(SearchResult {
            best: materialize(space, &genome),
            best_score: -fitness,
            history,
        })
    }
}

impl GaSearch {
    fn next_generation(
        &self,
        population: &[Genome],
        fitnesses: &[f64],
        rng: &mut StdRng,
    ) -> Vec<Genome> {
        let mut next = Vec::with_capacity(population.len());

        // Elites survive unchanged.
        let mut ranked: Vec<usize> = (0..population.len()).collect();
        ranked.sort_by(|&a, &b| fitnesses[b].total_cmp(&fitnesses[a]));
        for &i in ranked.iter().take(self.elitism.min(population.len())) {
            next.push(population[i].clone());
        }

        while next.len() < population.len() {
            let a = self.select(population, fitnesses, rng);
            let b = self.select(population, fitnesses, rng);
            let mut child = crossover(a, b, rng);
            for gene in child.iter_mut() {
                if rng.gen_bool(self.mutation_rate) {
                    *gene = !*gene;
                }
            }
            next.push(child);
        }
        next
    }

    /// Tournament selection: best fitness among `tournament` random picks.
    fn select<'a>(
        &self,
        population: &'a [Genome],
        fitnesses: &[f64],
        rng: &mut StdRng,
    ) -> &'a Genome {
        let mut winner = rng.gen_range(0..population.len());
        for _ in 1..self.tournament.max(1) {
            let challenger = rng.gen_range(0..population.len());
            if fitnesses[challenger] > fitnesses[winner] {
                winner = challenger;
            }
        }
        &population[winner]
    }
}

/// Higher is better. The objective is a minimized score, so it is negated;
/// an all-zero genome is penalized without calling the objective.
fn genome_fitness(genome: &Genome, space: &ParamSpace, objective: &dyn Objective) -> f64 {
    if !genome.iter().any(|&g| g) {
        return EMPTY_MASK_PENALTY;
    }
    -objective.evaluate(&materialize(space, genome))
}

fn materialize(space: &ParamSpace, genome: &Genome) -> stratlab_core::domain::ParamVector {
    let indices: Vec<usize> = genome.iter().map(|&g| g as usize).collect();
    space.vector_at(&indices)
}

fn crossover(a: &Genome, b: &Genome, rng: &mut StdRng) -> Genome {
    if a.len() < 2 {
        return a.clone();
    }
    let point = rng.gen_range(1..a.len());
    let mut child = a[..point].to_vec();
    child.extend_from_slice(&b[point..]);
    child
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::optimize::ParamDim;
    use stratlab_core::domain::{ParamValue, ParamVector};

    fn mask_space(n: usize) -> ParamSpace {
        ParamSpace::new((0..n).map(|i| ParamDim::binary(format!("rule_{i}"))).collect())
            .unwrap()
    }

    fn small_search() -> GaSearch {
        GaSearch {
            population: 8,
            generations: 3,
            mutation_rate: 0.2,
            elitism: 1,
            tournament: 3,
            seed: 7,
        }
    }

    #[test]
    fn empty_mask_never_reaches_the_objective() {
        // The objective asserts it never sees an all-zero mask; the GA must
        // short-circuit those genomes with the penalty.
        let objective = |p: &ParamVector| {
            let any_on = p.iter().any(|(_, v)| v == ParamValue::Int(1));
            assert!(any_on, "objective called with an empty mask");
            -1.0
        };
        let result = small_search().search(&mask_space(5), &objective).unwrap();
        assert!(result.history.len() >= 8);
    }

    #[test]
    fn penalized_genomes_appear_in_history_with_penalty_score() {
        let objective = |_: &ParamVector| -1.0;
        let result = small_search().search(&mask_space(2), &objective).unwrap();
        // Any all-zero genome in the log carries the penalty score.
        for entry in &result.history {
            let any_on = entry.params.iter().any(|(_, v)| v == ParamValue::Int(1));
            if !any_on {
                assert_eq!(entry.score, -EMPTY_MASK_PENALTY);
            } else {
                assert_eq!(entry.score, -1.0);
            }
        }
        // The penalty can never win.
        assert_eq!(result.best_score, -1.0);
    }

    #[test]
    fn same_seed_is_deterministic() {
        let objective = |p: &ParamVector| {
            -(p.iter().filter(|(_, v)| *v == ParamValue::Int(1)).count() as f64)
        };
        let a = small_search().search(&mask_space(5), &objective).unwrap();
        let b = small_search().search(&mask_space(5), &objective).unwrap();
        assert_eq!(a.history, b.history);
        assert_eq!(a.best, b.best);
    }

    #[test]
    fn non_binary_space_is_rejected() {
        let space = ParamSpace::new(vec![ParamDim::new(
            "lookback",
            vec![ParamValue::Int(10), ParamValue::Int(20)],
        )])
        .unwrap();
        let objective = |_: &ParamVector| 0.0;
        assert!(matches!(
            small_search().search(&space, &objective),
            Err(OptimizeError::NonBinaryDimension { name }) if name == "lookback"
        ));
    }

    #[test]
    fn tiny_population_is_rejected() {
        let search = GaSearch {
            population: 1,
            ..small_search()
        };
        let objective = |_: &ParamVector| 0.0;
        assert!(matches!(
            search.search(&mask_space(3), &objective),
            Err(OptimizeError::PopulationTooSmall)
        ));
    }
}
