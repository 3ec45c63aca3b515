//! Cluster-pay batch simulator
//!
//! Usage:
//!   rf-cluster-sim --mode base --sims 100000 --seed 7
//!   rf-cluster-sim --mode super_bonus --config game.json --books > books.jsonl

use std::fs;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use rf_cluster_pay::GameConfig;
use rf_cluster_sim::{BatchSimulator, SimulationConfig};

#[derive(Parser)]
#[command(name = "rf-cluster-sim", about = "Cluster-pay batch simulator")]
struct Cli {
    /// Bet mode to simulate
    #[arg(short, long, default_value = "base")]
    mode: String,

    /// Number of simulations
    #[arg(short = 'n', long, default_value_t = 10_000)]
    sims: usize,

    /// Base seed (sim i uses seed + i)
    #[arg(short, long, default_value_t = 0)]
    seed: u64,

    /// Worker threads (default: all cores)
    #[arg(short, long)]
    threads: Option<usize>,

    /// Game configuration JSON (default: built-in crazy_lab)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Write every book as a JSON line to stdout
    #[arg(long)]
    books: bool,
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => {
            let json = fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            GameConfig::from_json(&json).with_context(|| format!("loading {}", path.display()))?
        }
        None => GameConfig::crazy_lab(),
    };
    log::info!("Loaded game '{}'", config.game_id);

    let simulator = BatchSimulator::new(config).context("building engine")?;
    let sim = SimulationConfig {
        mode: cli.mode,
        num_sims: cli.sims,
        base_seed: cli.seed,
        threads: cli.threads,
    };
    let result = simulator
        .run(&sim)
        .with_context(|| format!("simulating mode '{}'", sim.mode))?;

    let summary = serde_json::to_string_pretty(&result.summary)?;
    if cli.books {
        let stdout = io::stdout();
        let mut out = BufWriter::new(stdout.lock());
        for book in &result.books {
            serde_json::to_writer(&mut out, book)?;
            out.write_all(b"\n")?;
        }
        out.flush()?;
        eprintln!("{summary}");
    } else {
        println!("{summary}");
    }
    Ok(())
}
