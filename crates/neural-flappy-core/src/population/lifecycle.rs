use super::metrics::GenerationReport;
use super::Population;
use crate::evolution::{self, EvolutionReport};
use crate::nn::NeuralNet;

#[derive(Clone, Debug, PartialEq)]
pub enum TickOutcome {
    /// Still inside the pre-generation pause; nothing moved.
    Countdown,
    Running,
    /// The last agent died; the next generation is already set up.
    GenerationEnded(GenerationReport),
}

impl Population {
    /// Gravity, sensing, flap decision and integration for every living agent.
    fn step_agent_phase(&mut self, gap: f32, distance: f32) {
        let config = &self.config;
        for agent in self.agents.iter_mut().filter(|a| a.alive) {
            agent.velocity -= config.gravity * config.dt;
            let output = agent
                .network
                .activate(&[agent.position, gap, distance, agent.velocity]);
            if output > 0.0
                && agent.position <= config.flap_ceiling
                && agent.velocity < config.flap_velocity_cap
            {
                agent.velocity = config.flap_velocity;
            }
            agent.position += agent.velocity;
        }
    }

    /// Kill agents that hit a pipe or the floor; credit the rest one tick.
    fn step_collision_phase(&mut self) {
        for agent in self.agents.iter_mut().filter(|a| a.alive) {
            if self.environment.collides(&self.config, agent.position) {
                agent.alive = false;
            } else {
                agent.network.add_fitness();
            }
        }
    }

    /// Breed the next generation and restart the course.
    fn end_generation(&mut self) -> GenerationReport {
        let networks: Vec<NeuralNet> = self.agents.iter().map(|a| a.network.clone()).collect();
        let evolution = match evolution::breed_next_generation(&networks, &self.config, &mut self.rng)
        {
            Ok((next, report)) => {
                for (agent, network) in self.agents.iter_mut().zip(next) {
                    agent.network = network;
                }
                report
            }
            Err(e) => {
                log::warn!("{e}; keeping the first network as best");
                EvolutionReport {
                    best_index: 0,
                    best_fitness: networks.first().map_or(0, NeuralNet::fitness),
                    threshold: 0,
                    elite_count: 0,
                    fallback: true,
                }
            }
        };

        let report = GenerationReport {
            generation: self.environment.generation(),
            score: self.environment.score(),
            best_score: self.environment.best_score(),
            ticks: self.generation_ticks,
            evolution,
        };
        log::info!(
            "generation {} ended after {} ticks: score {}, best fitness {}, {} elite",
            report.generation,
            report.ticks,
            report.score,
            report.evolution.best_fitness,
            report.evolution.elite_count
        );

        self.environment.advance_generation();
        self.restart_generation();
        self.last_report = Some(report.clone());
        report
    }

    /// Advance the simulation by one fixed timestep.
    pub fn tick_all(&mut self) -> TickOutcome {
        self.tick_index = self.tick_index.saturating_add(1);
        if self.environment.tick_countdown(self.config.dt) {
            return TickOutcome::Countdown;
        }
        self.generation_ticks = self.generation_ticks.saturating_add(1);

        self.environment.advance_pipes(&self.config);
        let gap = self.environment.current_gap(&self.config);
        self.environment.update_score(&self.config);
        let distance = self.environment.sensing_distance(&self.config);

        self.step_agent_phase(gap, distance);
        self.step_collision_phase();

        if self.alive_count() == 0 {
            return TickOutcome::GenerationEnded(self.end_generation());
        }

        self.environment.recycle_pipe(&self.config, &mut self.rng);
        TickOutcome::Running
    }

    /// Run up to `speed_multiplier` ticks (clamped to `[1, 32]`), stopping
    /// right after a generation ends. The remaining ticks of the step are
    /// dropped.
    pub fn tick(&mut self, speed_multiplier: u32) -> Option<GenerationReport> {
        for _ in 0..speed_multiplier.clamp(1, Self::MAX_SPEED_MULTIPLIER) {
            if let TickOutcome::GenerationEnded(report) = self.tick_all() {
                return Some(report);
            }
        }
        None
    }

    /// One outer step at the stored speed multiplier.
    pub fn step(&mut self) -> Option<GenerationReport> {
        self.tick(self.speed_multiplier)
    }
}
