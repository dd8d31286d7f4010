pub mod agent;
pub mod config;
pub mod environment;
pub mod evolution;
pub mod nn;
pub mod persistence;
pub mod population;

pub use config::{CrossoverMode, SimConfig};
pub use nn::NeuralNet;
pub use population::{
    GenerationReport, Population, PopulationError, PopulationStats, RunSummary, TickOutcome,
};
