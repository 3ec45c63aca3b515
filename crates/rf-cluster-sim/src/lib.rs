//! # rf-cluster-sim: Batch simulator for cluster-pay bet modes
//!
//! Runs many independent simulations of one bet mode in parallel. Each
//! simulation owns its engine context and a `ChaCha8Rng` seeded from
//! `base_seed + sim_id`, so any single book can be replayed on its own.
//!
//! ```text
//! SimulationConfig ─► CriteriaPlan ─► rayon ─► CascadeEngine::run_spin × N
//!                                                   │
//!                                                   v
//!                                       Vec<Book> (sim order) ─► ModeSummary
//! ```

use std::collections::BTreeMap;
use std::time::Instant;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use rf_cluster_pay::{Book, CascadeEngine, ConfigError, CriteriaPlan, EngineError, GameConfig};

/// Simulator errors
#[derive(Error, Debug)]
pub enum SimError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error("Thread pool error: {0}")]
    ThreadPool(String),
}

/// Batch settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Bet mode to simulate
    pub mode: String,
    pub num_sims: usize,
    /// Sim `i` uses seed `base_seed + i`; the criteria shuffle uses `base_seed`
    pub base_seed: u64,
    /// Worker threads (None = all cores)
    pub threads: Option<usize>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            mode: "base".into(),
            num_sims: 10_000,
            base_seed: 0,
            threads: None,
        }
    }
}

impl SimulationConfig {
    /// Quick run for CI
    pub fn ci(mode: impl Into<String>) -> Self {
        Self {
            mode: mode.into(),
            num_sims: 200,
            threads: Some(2),
            ..Default::default()
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.base_seed = seed;
        self
    }

    pub fn with_sims(mut self, num_sims: usize) -> Self {
        self.num_sims = num_sims;
        self
    }
}

/// Aggregated statistics of one batch
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModeSummary {
    pub mode: String,
    pub sims: usize,
    /// Mode cost in bet multiples
    pub cost: f64,
    pub total_cost: f64,
    pub total_win: f64,
    /// total_win / total_cost
    pub rtp: f64,
    pub base_game_rtp: f64,
    pub free_game_rtp: f64,
    /// Share of sims with a non-zero payout
    pub hit_rate: f64,
    pub max_payout: f64,
    pub freegame_entries: usize,
    pub wincap_hits: usize,
    pub mean_attempts: f64,
    pub criteria_counts: BTreeMap<String, usize>,
}

impl ModeSummary {
    pub fn from_books(mode: &str, cost: f64, books: &[Book]) -> Self {
        let sims = books.len();
        let total_cost = cost * sims as f64;
        let mut summary = Self {
            mode: mode.to_string(),
            sims,
            cost,
            total_cost,
            ..Default::default()
        };
        if sims == 0 {
            return summary;
        }

        let mut base = 0.0;
        let mut free = 0.0;
        let mut hits = 0usize;
        let mut attempts = 0u64;
        for book in books {
            summary.total_win += book.payout_multiplier;
            base += book.base_game_wins;
            free += book.free_game_wins;
            if book.payout_multiplier > 0.0 {
                hits += 1;
            }
            if book.triggered_freegame {
                summary.freegame_entries += 1;
            }
            if book.wincap_triggered {
                summary.wincap_hits += 1;
            }
            summary.max_payout = summary.max_payout.max(book.payout_multiplier);
            attempts += u64::from(book.attempts);
            *summary.criteria_counts.entry(book.criteria.clone()).or_default() += 1;
        }

        if total_cost > 0.0 {
            summary.rtp = summary.total_win / total_cost;
            summary.base_game_rtp = base / total_cost;
            summary.free_game_rtp = free / total_cost;
        }
        summary.hit_rate = hits as f64 / sims as f64;
        summary.mean_attempts = attempts as f64 / sims as f64;
        summary
    }
}

/// Books of a batch plus their summary
#[derive(Debug, Clone)]
pub struct BatchResult {
    pub summary: ModeSummary,
    /// In sim order
    pub books: Vec<Book>,
}

/// Parallel batch simulator
pub struct BatchSimulator {
    engine: CascadeEngine,
}

impl BatchSimulator {
    /// Simulator with the default engine for `config`
    pub fn new(config: GameConfig) -> Result<Self, SimError> {
        Ok(Self {
            engine: CascadeEngine::new(config)?,
        })
    }

    /// Simulator around a customized engine
    pub fn with_engine(engine: CascadeEngine) -> Self {
        Self { engine }
    }

    pub fn engine(&self) -> &CascadeEngine {
        &self.engine
    }

    pub fn run(&self, sim: &SimulationConfig) -> Result<BatchResult, SimError> {
        let config = self.engine.config();
        let bet_mode = config
            .bet_mode(&sim.mode)
            .ok_or_else(|| EngineError::UnknownBetMode(sim.mode.clone()))?;

        let mut plan_rng = ChaCha8Rng::seed_from_u64(sim.base_seed);
        let plan = CriteriaPlan::allocate(bet_mode, sim.num_sims, &mut plan_rng);

        let threads = sim.threads.unwrap_or_else(num_cpus::get).max(1);
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build()
            .map_err(|e| SimError::ThreadPool(e.to_string()))?;

        log::info!(
            "Simulating {} x '{}' on {} thread(s), seed {}",
            plan.len(),
            sim.mode,
            threads,
            sim.base_seed
        );
        let started = Instant::now();

        let books: Result<Vec<Book>, EngineError> = pool.install(|| {
            (0..plan.len())
                .into_par_iter()
                .map(|sim_id| {
                    let criteria = plan.criteria_for(sim_id).ok_or_else(|| {
                        EngineError::UnknownCriteria {
                            mode: sim.mode.clone(),
                            criteria: format!("<sim {sim_id}>"),
                        }
                    })?;
                    let mut rng =
                        ChaCha8Rng::seed_from_u64(sim.base_seed.wrapping_add(sim_id as u64));
                    self.engine
                        .run_spin(sim_id as u64, &sim.mode, criteria, &mut rng)
                })
                .collect()
        });
        let books = books?;

        let summary = ModeSummary::from_books(&sim.mode, bet_mode.cost, &books);
        log::info!(
            "Finished {} sims in {:.2?}: rtp {:.4}, hit rate {:.4}, max {}",
            summary.sims,
            started.elapsed(),
            summary.rtp,
            summary.hit_rate,
            summary.max_payout
        );
        Ok(BatchResult { summary, books })
    }
}
