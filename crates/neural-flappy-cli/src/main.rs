use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use neural_flappy_core::persistence::{self, DEFAULT_PATH};
use neural_flappy_core::{NeuralNet, Population, SimConfig};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha12Rng;
use rayon::prelude::*;
use serde::Serialize;
use std::io::Cursor;
use std::path::{Path, PathBuf};

/// Fallback record used when no saved network exists on disk.
const BUNDLED_NETWORK: &str = include_str!("../assets/network.dat");

#[derive(Parser, Debug)]
#[command(author, version, about = "Headless neuroevolution of flappy-bird agents", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Evolve one population and print a summary
    Run(RunArgs),
    /// Print the observed agent's state once per outer step
    Watch(WatchArgs),
    /// Evolve independent populations in parallel, one per seed
    Sweep(SweepArgs),
    /// Show a saved network and the linear map it collapses to
    Inspect {
        /// Record to read; the bundled network is used if it does not exist
        path: Option<PathBuf>,
    },
}

#[derive(Args, Debug)]
struct SimArgs {
    /// JSON file with SimConfig overrides
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long)]
    seed: Option<u64>,
    /// Start from a saved network (bundled network if the file is missing)
    #[arg(long)]
    load: Option<PathBuf>,
    /// Ticks per outer step, rounded down to a power of two in [1, 32];
    /// anything above 1 also shortens the countdown
    #[arg(long, default_value_t = 1)]
    speed: u32,
}

#[derive(Args, Debug)]
struct RunArgs {
    #[command(flatten)]
    sim: SimArgs,
    #[arg(long, default_value_t = 50)]
    generations: usize,
    #[arg(long, default_value_t = 5_000_000)]
    max_ticks: u64,
    /// Save the observed network here when the run ends
    #[arg(long)]
    save: Option<PathBuf>,
    /// Print the run summary as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Args, Debug)]
struct WatchArgs {
    #[command(flatten)]
    sim: SimArgs,
    #[arg(long, default_value_t = 600)]
    steps: usize,
}

#[derive(Args, Debug)]
struct SweepArgs {
    #[arg(long)]
    config: Option<PathBuf>,
    /// Base seed the per-run seeds are drawn from
    #[arg(long, default_value_t = 42)]
    seed: u64,
    #[arg(long, default_value_t = 8)]
    seeds: usize,
    #[arg(long, default_value_t = 50)]
    generations: usize,
    #[arg(long, default_value_t = 5_000_000)]
    max_ticks: u64,
    #[arg(long)]
    json: bool,
}

#[derive(Serialize, Debug)]
struct SweepRow {
    seed: u64,
    generations_completed: usize,
    ticks: u64,
    best_score: u32,
    best_score_generation: u32,
}

fn load_config(path: Option<&Path>, seed: Option<u64>) -> Result<SimConfig> {
    let mut config = match path {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read config {}", path.display()))?;
            SimConfig::from_json_str(&text)
                .with_context(|| format!("invalid config {}", path.display()))?
        }
        None => SimConfig::default(),
    };
    if let Some(seed) = seed {
        config.seed = seed;
    }
    config.validate()?;
    Ok(config)
}

fn read_network(path: &Path) -> Result<(u32, NeuralNet)> {
    persistence::load_or(path, Cursor::new(BUNDLED_NETWORK))
        .with_context(|| format!("failed to load network {}", path.display()))
}

fn build_population(args: &SimArgs) -> Result<Population> {
    let config = load_config(args.config.as_deref(), args.seed)?;
    let mut population = Population::try_new(config)?;
    let applied = population.set_speed_multiplier(args.speed);
    if applied != args.speed {
        log::warn!("speed {} rounded to {applied}x", args.speed);
    }
    // the countdown length is picked at reset
    if applied != 1 && args.load.is_none() {
        population.restart_generation();
    }
    if let Some(path) = &args.load {
        let (generation, network) = read_network(path)?;
        population.install_network(generation, network);
        log::info!("starting from generation {generation} network");
    }
    Ok(population)
}

fn run(args: RunArgs) -> Result<()> {
    let mut population = build_population(&args.sim)?;
    let summary = population.try_run_generations(args.generations, args.max_ticks)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        for report in &summary.generations {
            println!(
                "gen {:>5}  ticks {:>7}  score {:>4}  best fitness {:>7}  elite {:>3}",
                report.generation,
                report.ticks,
                report.score,
                report.evolution.best_fitness,
                report.evolution.elite_count
            );
        }
        println!(
            "{} generations in {} ticks, best score {} (generation {})",
            summary.generations_completed,
            summary.ticks,
            summary.best_score,
            summary.best_score_generation
        );
    }

    if let Some(path) = &args.save {
        persistence::save(path, population.generation(), population.observed_network())
            .with_context(|| format!("failed to save network {}", path.display()))?;
        log::info!("saved network to {}", path.display());
    }
    Ok(())
}

fn watch(args: WatchArgs) -> Result<()> {
    let mut population = build_population(&args.sim)?;

    for _ in 0..args.steps {
        if let Some(report) = population.step() {
            println!(
                "-- generation {} over: score {}, best {}",
                report.generation, report.score, report.best_score
            );
            continue;
        }
        let env = population.environment();
        if env.is_counting_down() {
            continue;
        }
        let Some(idx) = population.first_alive_index() else {
            continue;
        };
        let agent = &population.agents()[idx];
        let net = population.observed_network();
        println!(
            "gen {:>4}  alive {:>3}  score {:>3}  pipe_x {:>7.2}  gap {:>6.1}  bird {:>3} y {:>6.1} v {:>5.2}  out {:>9.2}",
            env.generation(),
            population.alive_count(),
            env.score(),
            env.pipe_x(),
            env.current_gap(population.config()),
            idx + 1,
            agent.position,
            agent.velocity,
            net.output()
        );
    }
    Ok(())
}

fn sweep(args: SweepArgs) -> Result<()> {
    let base = load_config(args.config.as_deref(), None)?;
    let mut seeder = ChaCha12Rng::seed_from_u64(args.seed);
    let seeds: Vec<u64> = (0..args.seeds).map(|_| seeder.random::<u64>()).collect();

    let rows = seeds
        .into_par_iter()
        .map(|seed| -> Result<SweepRow> {
            let config = SimConfig {
                seed,
                ..base.clone()
            };
            let mut population = Population::try_new(config)?;
            let summary = population.try_run_generations(args.generations, args.max_ticks)?;
            Ok(SweepRow {
                seed,
                generations_completed: summary.generations_completed,
                ticks: summary.ticks,
                best_score: summary.best_score,
                best_score_generation: summary.best_score_generation,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
    } else {
        for row in &rows {
            println!(
                "seed {:>20}  generations {:>5}  ticks {:>9}  best score {:>5} (gen {})",
                row.seed,
                row.generations_completed,
                row.ticks,
                row.best_score,
                row.best_score_generation
            );
        }
    }
    Ok(())
}

fn inspect(path: Option<PathBuf>) -> Result<()> {
    let path = path.unwrap_or_else(|| PathBuf::from(DEFAULT_PATH));
    let (generation, net) = read_network(&path)?;
    println!("generation {generation}");
    for (h, row) in net.weights_in_hidden().chunks(4).enumerate() {
        println!(
            "hidden {h}: in {:>9.4?}  out {:>9.4}",
            row,
            net.weights_hidden_out()[h]
        );
    }
    let effective = net.effective_weights();
    println!(
        "effective: {:.4}*height + {:.4}*gap + {:.4}*distance + {:.4}*velocity",
        effective[0], effective[1], effective[2], effective[3]
    );
    Ok(())
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match Cli::parse().command {
        Command::Run(args) => run(args),
        Command::Watch(args) => watch(args),
        Command::Sweep(args) => sweep(args),
        Command::Inspect { path } => inspect(path),
    }
}
