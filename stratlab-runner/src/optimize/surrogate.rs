//! Surrogate-model global search.
//!
//! Sequential model-based optimization over a categorical space: after a
//! handful of random probes, each following point is chosen by a cheap
//! surrogate — an inverse-distance-weighted estimate of the objective over
//! everything observed so far, minus an exploration bonus proportional to
//! the distance from the nearest observation. While unvisited candidates
//! remain they are preferred outright; the objective is deterministic, so
//! re-evaluating a known point buys nothing. The call budget is exact:
//! one history entry per evaluation, appended as it completes.

use std::collections::HashSet;

use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::debug;

use super::{HistoryEntry, Objective, OptimizeError, ParamSpace, SearchResult, SearchStrategy};

#[derive(Debug, Clone)]
pub struct SurrogateSearch {
    /// Total number of objective evaluations.
    pub budget: usize,
    /// Random probes before the surrogate takes over.
    pub n_initial: usize,
    /// Weight of the exploration bonus relative to the observed score spread.
    pub exploration: f64,
    pub seed: u64,
}

impl SurrogateSearch {
    pub fn new(budget: usize, seed: u64) -> Self {
        Self {
            budget,
            seed,
            ..Self::default()
        }
    }
}

impl Default for SurrogateSearch {
    fn default() -> Self {
        Self {
            budget: 50,
            n_initial: 10,
            exploration: 0.5,
            seed: 42,
        }
    }
}

/// Spaces up to this many points are enumerated outright; larger ones are
/// candidate-sampled per iteration.
const ENUMERATION_LIMIT: usize = 4096;
const SAMPLED_CANDIDATES: usize = 256;

impl SearchStrategy for SurrogateSearch {
    fn search(
        &self,
        space: &ParamSpace,
        objective: &dyn Objective,
    ) -> Result<SearchResult, OptimizeError> {
        if self.budget == 0 {
            return Err(OptimizeError::ZeroBudget);
        }
        let mut rng = StdRng::seed_from_u64(self.seed);
        let enumerated = if space.cardinality() <= ENUMERATION_LIMIT {
            Some(enumerate_indices(space))
        } else {
            None
        };

        let mut observed: Vec<(Vec<usize>, f64)> = Vec::with_capacity(self.budget);
        let mut visited: HashSet<Vec<usize>> = HashSet::new();
        let mut history = Vec::with_capacity(self.budget);

        for call in 0..self.budget {
            let indices = if call < self.n_initial || observed.is_empty() {
                self.probe(space, &enumerated, &visited, &mut rng)
            } else {
                self.acquire(space, &enumerated, &observed, &visited, &mut rng)
            };
            let params = space.vector_at(&indices);
            let score = objective.evaluate(&params);
            debug!(call, %score, "surrogate evaluation");
            visited.insert(indices.clone());
            observed.push((indices, score));
            history.push(HistoryEntry { params, score });
        }

        // Lowest score wins; ties go to the earliest evaluation.
        let best_idx = (0..observed.len())
            .min_by(|&a, &b| observed[a].1.total_cmp(&observed[b].1))
            .unwrap_or(0);
        Ok(SearchResult {
            best: history[best_idx].params.clone(),
            best_score: observed[best_idx].1,
            history,
        })
    }
}

impl SurrogateSearch {
    /// Random probe, preferring an unvisited point when one is known.
    fn probe(
        &self,
        space: &ParamSpace,
        enumerated: &Option<Vec<Vec<usize>>>,
        visited: &HashSet<Vec<usize>>,
        rng: &mut StdRng,
    ) -> Vec<usize> {
        if let Some(all) = enumerated {
            let unvisited: Vec<&Vec<usize>> = all.iter().filter(|p| !visited.contains(*p)).collect();
            if !unvisited.is_empty() {
                use rand::Rng;
                return unvisited[rng.gen_range(0..unvisited.len())].clone();
            }
        }
        space.sample(rng)
    }

    /// Surrogate-guided choice: minimize predicted score minus the
    /// exploration bonus over the candidate pool.
    fn acquire(
        &self,
        space: &ParamSpace,
        enumerated: &Option<Vec<Vec<usize>>>,
        observed: &[(Vec<usize>, f64)],
        visited: &HashSet<Vec<usize>>,
        rng: &mut StdRng,
    ) -> Vec<usize> {
        let pool: Vec<Vec<usize>> = match enumerated {
            Some(all) => all.clone(),
            None => (0..SAMPLED_CANDIDATES).map(|_| space.sample(rng)).collect(),
        };
        let unvisited: Vec<&Vec<usize>> = pool.iter().filter(|p| !visited.contains(*p)).collect();
        let candidates: Vec<&Vec<usize>> = if unvisited.is_empty() {
            pool.iter().collect()
        } else {
            unvisited
        };

        let scores: Vec<f64> = observed.iter().map(|(_, s)| *s).collect();
        let spread = scores.iter().cloned().fold(f64::MIN, f64::max)
            - scores.iter().cloned().fold(f64::MAX, f64::min);

        let mut best: Option<(&Vec<usize>, f64)> = None;
        for cand in candidates {
            let predicted = predict(observed, cand);
            let nearest = observed
                .iter()
                .map(|(p, _)| hamming(p, cand))
                .min()
                .unwrap_or(0) as f64;
            let acquisition = predicted - self.exploration * spread * nearest;
            match best {
                Some((_, current)) if acquisition >= current => {}
                _ => best = Some((cand, acquisition)),
            }
        }
        match best {
            Some((cand, _)) => cand.clone(),
            None => space.sample(rng),
        }
    }
}

/// Inverse-distance-weighted mean of observed scores.
fn predict(observed: &[(Vec<usize>, f64)], candidate: &[usize]) -> f64 {
    let mut num = 0.0;
    let mut den = 0.0;
    for (point, score) in observed {
        let d = hamming(point, candidate) as f64;
        let w = 1.0 / (1.0 + d * d);
        num += w * score;
        den += w;
    }
    num / den
}

fn hamming(a: &[usize], b: &[usize]) -> usize {
    a.iter().zip(b).filter(|(x, y)| x != y).count()
}

/// Every choice-index combination, mixed-radix order.
fn enumerate_indices(space: &ParamSpace) -> Vec<Vec<usize>> {
    let radices: Vec<usize> = space.dims().iter().map(|d| d.choices.len()).collect();
    let mut all = Vec::with_capacity(space.cardinality());
    let mut current = vec![0usize; radices.len()];
    loop {
        all.push(current.clone());
        let mut pos = radices.len();
        loop {
            if pos == 0 {
                return all;
            }
            pos -= 1;
            current[pos] += 1;
            if current[pos] < radices[pos] {
                break;
            }
            current[pos] = 0;
        }
    }
}
