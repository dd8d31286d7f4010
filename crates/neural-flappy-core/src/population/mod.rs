pub mod lifecycle;
pub mod metrics;

pub use lifecycle::TickOutcome;
pub use metrics::*;

use crate::agent::Agent;
use crate::config::{SimConfig, SimConfigError};
use crate::environment::Environment;
use crate::nn::NeuralNet;
use crate::persistence::{self, PersistenceError};
use rand::SeedableRng;
use rand_chacha::ChaCha12Rng;
use std::io::{BufRead, Write};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PopulationError {
    #[error(transparent)]
    Config(#[from] SimConfigError),
    #[error("networks.len() ({actual}) must match population_size ({expected})")]
    NetworkCountMismatch { expected: usize, actual: usize },
}

/// N agents flying the same course, plus everything needed to breed the
/// next generation when the last one dies.
pub struct Population {
    pub(crate) agents: Vec<Agent>,
    pub(crate) environment: Environment,
    pub(crate) config: SimConfig,
    pub(crate) rng: ChaCha12Rng,
    pub(crate) speed_multiplier: u32,
    pub(crate) tick_index: u64,
    pub(crate) generation_ticks: u64,
    pub(crate) last_report: Option<GenerationReport>,
}

impl Population {
    pub const MAX_SPEED_MULTIPLIER: u32 = 32;

    pub fn new(config: SimConfig) -> Self {
        Self::try_new(config).unwrap_or_else(|e| panic!("{e}"))
    }

    /// Population of freshly randomised networks drawn from the config seed.
    pub fn try_new(config: SimConfig) -> Result<Self, PopulationError> {
        config.validate()?;
        let mut rng = ChaCha12Rng::seed_from_u64(config.seed);
        let networks = (0..config.population_size)
            .map(|_| NeuralNet::random(&mut rng))
            .collect();
        Ok(Self::assemble(config, networks, rng))
    }

    /// Population flying the given networks, one per agent.
    pub fn with_networks(
        config: SimConfig,
        networks: Vec<NeuralNet>,
    ) -> Result<Self, PopulationError> {
        config.validate()?;
        if networks.len() != config.population_size {
            return Err(PopulationError::NetworkCountMismatch {
                expected: config.population_size,
                actual: networks.len(),
            });
        }
        let rng = ChaCha12Rng::seed_from_u64(config.seed);
        Ok(Self::assemble(config, networks, rng))
    }

    fn assemble(config: SimConfig, networks: Vec<NeuralNet>, mut rng: ChaCha12Rng) -> Self {
        let environment = Environment::new(&config, &mut rng);
        let agents = networks
            .into_iter()
            .map(|nn| Agent::new(nn, config.spawn_height, config.spawn_velocity))
            .collect();
        let mut population = Self {
            agents,
            environment,
            config,
            rng,
            speed_multiplier: 1,
            tick_index: 0,
            generation_ticks: 0,
            last_report: None,
        };
        population.restart_generation();
        population
    }

    /// Respawn every agent and lay out a fresh course. Networks and
    /// generation counters are left alone; the countdown length follows the
    /// current speed multiplier.
    pub fn restart_generation(&mut self) {
        let fast = self.speed_multiplier != 1;
        self.environment.reset(&self.config, &mut self.rng, fast);
        for agent in &mut self.agents {
            agent.respawn(self.config.spawn_height, self.config.spawn_velocity);
            agent.network.reset_fitness();
        }
        self.generation_ticks = 0;
    }

    /// Back to generation 0 with freshly randomised networks.
    pub fn reset_all(&mut self) {
        for agent in &mut self.agents {
            agent.network = NeuralNet::random(&mut self.rng);
        }
        self.environment.clear_records(0);
        self.last_report = None;
        self.restart_generation();
        log::debug!("population reset to generation 0");
    }

    /// Seed the population from a saved record: the loaded network at index 0,
    /// mutated clones of it everywhere else. A record that fails to parse
    /// leaves the population untouched.
    pub fn load_network<R: BufRead>(&mut self, source: R) -> Result<u32, PersistenceError> {
        let (generation, network) = persistence::read_record(source)?;
        self.install_network(generation, network);
        Ok(generation)
    }

    pub fn install_network(&mut self, generation: u32, network: NeuralNet) {
        let mut agents = self.agents.iter_mut();
        if let Some(first) = agents.next() {
            for agent in agents {
                agent.network =
                    NeuralNet::mutated_from(&network, self.config.mutation_rate, &mut self.rng);
            }
            first.network = network;
        }
        self.environment.clear_records(generation);
        self.last_report = None;
        self.restart_generation();
        log::debug!("installed network from generation {generation}");
    }

    /// Write the observed agent's network together with the current generation.
    pub fn save_network<W: Write>(&self, sink: &mut W) -> Result<(), PersistenceError> {
        persistence::write_record(sink, self.generation(), self.observed_network())
    }

    /// Clamp to `[1, 32]`, rounding down to a power of two. Returns the
    /// multiplier actually applied.
    pub fn set_speed_multiplier(&mut self, speed_multiplier: u32) -> u32 {
        let clamped = speed_multiplier.clamp(1, Self::MAX_SPEED_MULTIPLIER);
        self.speed_multiplier = 1 << clamped.ilog2();
        self.speed_multiplier
    }

    pub fn faster(&mut self) -> u32 {
        self.set_speed_multiplier(self.speed_multiplier.saturating_mul(2))
    }

    pub fn slower(&mut self) -> u32 {
        self.set_speed_multiplier(self.speed_multiplier / 2)
    }

    pub fn reset_speed(&mut self) -> u32 {
        self.set_speed_multiplier(1)
    }

    pub fn speed_multiplier(&self) -> u32 {
        self.speed_multiplier
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn agents(&self) -> &[Agent] {
        &self.agents
    }

    pub fn environment(&self) -> &Environment {
        &self.environment
    }

    pub fn generation(&self) -> u32 {
        self.environment.generation()
    }

    pub fn alive_count(&self) -> usize {
        self.agents.iter().filter(|a| a.alive).count()
    }

    /// Lowest-indexed living agent.
    pub fn first_alive_index(&self) -> Option<usize> {
        self.agents.iter().position(|a| a.alive)
    }

    /// Network of the first living agent, or of agent 0 when none is alive.
    pub fn observed_network(&self) -> &NeuralNet {
        let idx = self.first_alive_index().unwrap_or(0);
        &self.agents[idx].network
    }

    pub fn last_report(&self) -> Option<&GenerationReport> {
        self.last_report.as_ref()
    }

    /// Ticks advanced since construction, countdown ticks included.
    pub fn tick_index(&self) -> u64 {
        self.tick_index
    }
}
