use super::lifecycle::TickOutcome;
use super::Population;
use crate::evolution::EvolutionReport;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GenerationReport {
    pub generation: u32,
    /// Pipes passed before the last agent died.
    pub score: u32,
    /// Best score over all generations so far.
    pub best_score: u32,
    /// Running ticks, countdown excluded.
    pub ticks: u64,
    pub evolution: EvolutionReport,
}

#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct PopulationStats {
    pub population_size: usize,
    pub alive_count: usize,
    pub generation: u32,
    pub score: u32,
    pub best_score: u32,
    pub best_score_generation: u32,
    pub max_fitness: u32,
    pub mean_fitness: f32,
}

fn default_schema_version() -> u32 {
    1
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RunSummary {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub seed: u64,
    pub generations_requested: usize,
    pub generations_completed: usize,
    pub ticks: u64,
    pub final_generation: u32,
    pub best_score: u32,
    pub best_score_generation: u32,
    #[serde(default)]
    pub generations: Vec<GenerationReport>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExperimentError {
    #[error("max_ticks must be positive")]
    InvalidTickBudget,
    #[error("generations ({actual}) exceed supported maximum ({max})")]
    TooManyGenerations { max: usize, actual: usize },
    #[error("max_ticks ({actual}) exceeds supported maximum ({max})")]
    TooManyTicks { max: u64, actual: u64 },
}

impl Population {
    pub const MAX_RUN_GENERATIONS: usize = 100_000;
    pub const MAX_RUN_TICKS: u64 = 500_000_000;

    pub fn population_stats(&self) -> PopulationStats {
        let fitness = self.agents.iter().map(|a| a.network.fitness());
        let max_fitness = fitness.clone().max().unwrap_or(0);
        let total: u64 = fitness.map(u64::from).sum();
        PopulationStats {
            population_size: self.agents.len(),
            alive_count: self.alive_count(),
            generation: self.environment.generation(),
            score: self.environment.score(),
            best_score: self.environment.best_score(),
            best_score_generation: self.environment.best_score_generation(),
            max_fitness,
            mean_fitness: if self.agents.is_empty() {
                0.0
            } else {
                total as f32 / self.agents.len() as f32
            },
        }
    }

    pub fn run_generations(&mut self, generations: usize, max_ticks: u64) -> RunSummary {
        self.try_run_generations(generations, max_ticks)
            .unwrap_or_else(|e| panic!("{e}"))
    }

    /// Tick until `generations` generation boundaries have passed or
    /// `max_ticks` ticks have run, whichever comes first.
    pub fn try_run_generations(
        &mut self,
        generations: usize,
        max_ticks: u64,
    ) -> Result<RunSummary, ExperimentError> {
        if max_ticks == 0 {
            return Err(ExperimentError::InvalidTickBudget);
        }
        if generations > Self::MAX_RUN_GENERATIONS {
            return Err(ExperimentError::TooManyGenerations {
                max: Self::MAX_RUN_GENERATIONS,
                actual: generations,
            });
        }
        if max_ticks > Self::MAX_RUN_TICKS {
            return Err(ExperimentError::TooManyTicks {
                max: Self::MAX_RUN_TICKS,
                actual: max_ticks,
            });
        }

        let mut reports = Vec::with_capacity(generations);
        let mut ticks = 0u64;
        while reports.len() < generations && ticks < max_ticks {
            ticks += 1;
            if let TickOutcome::GenerationEnded(report) = self.tick_all() {
                reports.push(report);
            }
        }
        if reports.len() < generations {
            log::info!(
                "tick budget of {max_ticks} exhausted after {} of {generations} generations",
                reports.len()
            );
        }

        Ok(RunSummary {
            schema_version: 1,
            seed: self.config.seed,
            generations_requested: generations,
            generations_completed: reports.len(),
            ticks,
            final_generation: self.environment.generation(),
            best_score: self.environment.best_score(),
            best_score_generation: self.environment.best_score_generation(),
            generations: reports,
        })
    }
}
