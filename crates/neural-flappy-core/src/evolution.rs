//! Generational breeding: pick the fittest network, fold the elite into
//! it, then refill the population with the result and mutated clones of it.

use crate::config::{CrossoverMode, SimConfig};
use crate::nn::NeuralNet;
use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum EvolutionError {
    #[error("no best network found in an empty population")]
    EmptyPopulation,
}

/// What happened at one generation boundary.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EvolutionReport {
    pub best_index: usize,
    pub best_fitness: u32,
    pub threshold: u32,
    pub elite_count: usize,
    /// Selection failed and index 0 was used instead.
    pub fallback: bool,
}

/// Index of the fittest network. The first one wins ties.
pub fn select_best(networks: &[NeuralNet]) -> Result<usize, EvolutionError> {
    let mut best: Option<usize> = None;
    for (idx, net) in networks.iter().enumerate() {
        if best.is_none_or(|b| networks[b].fitness() < net.fitness()) {
            best = Some(idx);
        }
    }
    best.ok_or(EvolutionError::EmptyPopulation)
}

/// `floor(best_fitness * elite_ratio)`.
pub fn elite_threshold(best_fitness: u32, elite_ratio: f32) -> u32 {
    (f64::from(best_fitness) * f64::from(elite_ratio)).floor() as u32
}

/// Every network other than `best` with fitness at or above `threshold`,
/// in index order.
pub fn elite_indices(networks: &[NeuralNet], best: usize, threshold: u32) -> Vec<usize> {
    networks
        .iter()
        .enumerate()
        .filter(|&(idx, net)| idx != best && net.fitness() >= threshold)
        .map(|(idx, _)| idx)
        .collect()
}

/// Fold the elite into a copy of the best network.
pub fn crossover(best: &NeuralNet, elites: &[&NeuralNet], mode: CrossoverMode) -> NeuralNet {
    let mut child = best.clone();
    match mode {
        CrossoverMode::SequentialFold => {
            for elite in elites {
                child.breed(elite);
            }
        }
        CrossoverMode::CohortMean => {
            if elites.is_empty() {
                return child;
            }
            let n = (elites.len() + 1) as f32;
            let (w_ih, w_ho) = child.weights_mut();
            for (i, w) in w_ih.iter_mut().enumerate() {
                let sum = *w + elites.iter().map(|e| e.weights_in_hidden()[i]).sum::<f32>();
                *w = sum / n;
            }
            for (i, w) in w_ho.iter_mut().enumerate() {
                let sum = *w + elites.iter().map(|e| e.weights_hidden_out()[i]).sum::<f32>();
                *w = sum / n;
            }
        }
    }
    child
}

/// `size` networks: `parent` itself at index 0, mutated clones elsewhere.
/// Every returned network has zero fitness.
pub fn repopulate<R: Rng + ?Sized>(
    parent: NeuralNet,
    size: usize,
    mutation_rate: f32,
    rng: &mut R,
) -> Vec<NeuralNet> {
    let mut next = Vec::with_capacity(size.max(1));
    next.push(parent);
    for _ in 1..size {
        let child = NeuralNet::mutated_from(&next[0], mutation_rate, rng);
        next.push(child);
    }
    for net in &mut next {
        net.reset_fitness();
    }
    next
}

/// Full selection → crossover → repopulation pipeline.
pub fn breed_next_generation<R: Rng + ?Sized>(
    networks: &[NeuralNet],
    config: &SimConfig,
    rng: &mut R,
) -> Result<(Vec<NeuralNet>, EvolutionReport), EvolutionError> {
    let best_index = select_best(networks)?;
    let best = &networks[best_index];
    let threshold = elite_threshold(best.fitness(), config.elite_ratio);
    let elites: Vec<&NeuralNet> = elite_indices(networks, best_index, threshold)
        .into_iter()
        .map(|idx| &networks[idx])
        .collect();

    let report = EvolutionReport {
        best_index,
        best_fitness: best.fitness(),
        threshold,
        elite_count: elites.len(),
        fallback: false,
    };
    let child = crossover(best, &elites, config.crossover);
    let next = repopulate(child, networks.len(), config.mutation_rate, rng);
    Ok((next, report))
}
