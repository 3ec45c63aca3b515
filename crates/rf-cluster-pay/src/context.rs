//! Per-attempt spin context
//!
//! Everything a simulation mutates lives here. A rejected attempt drops its
//! context and the next attempt starts from [`SpinContext::new`], so nothing
//! leaks between retries.

use serde::{Deserialize, Serialize};

use crate::board::{Board, CollectorId};
use crate::book::{Book, BookEvent};
use crate::collector::CollectorState;
use crate::evaluate::WinAggregate;
use crate::multiplier::HitGrid;
use crate::wins::WinManager;

/// Game phase a spin belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameType {
    #[default]
    BaseGame,
    FreeGame,
}

/// Mutable state of one attempt
#[derive(Debug, Clone)]
pub struct SpinContext {
    pub sim_id: u64,
    /// 1-based attempt number
    pub attempt: u32,
    pub criteria: String,
    pub game_type: GameType,
    pub board: Board,
    pub hits: HitGrid,
    pub collector: CollectorState,
    pub wins: WinManager,
    pub book: Book,
    /// Wins of the current reveal
    pub reveal_wins: WinAggregate,
    /// Wins of the current spin, all reveals
    pub spin_wins: WinAggregate,
    pub next_collector_id: CollectorId,
    /// Free spins played
    pub fs: u32,
    /// Free spins awarded
    pub tot_fs: u32,
    pub triggered_freegame: bool,
    pub wincap_triggered: bool,
    pub global_multiplier: u32,
}

impl SpinContext {
    pub fn new(
        sim_id: u64,
        attempt: u32,
        criteria: &str,
        rows: &[usize],
        global_multiplier: u32,
    ) -> Self {
        Self {
            sim_id,
            attempt,
            criteria: criteria.to_string(),
            game_type: GameType::BaseGame,
            board: Board::default(),
            hits: HitGrid::new(rows),
            collector: CollectorState::new(),
            wins: WinManager::new(),
            book: Book::new(sim_id, criteria),
            reveal_wins: WinAggregate::default(),
            spin_wins: WinAggregate::default(),
            next_collector_id: 0,
            fs: 0,
            tot_fs: 0,
            triggered_freegame: false,
            wincap_triggered: false,
            global_multiplier,
        }
    }

    /// Start a new spin: per-spin aggregates and collector ids restart
    pub fn begin_spin(&mut self) {
        self.wins.reset_spin_win();
        self.reveal_wins = WinAggregate::default();
        self.spin_wins = WinAggregate::default();
        self.next_collector_id = 0;
    }

    pub fn emit(&mut self, event: BookEvent) {
        self.book.push(event);
    }

    /// Record the current hit counters in the book
    pub fn emit_grid(&mut self) {
        let grid = self.hits.as_rows().to_vec();
        self.book.push(BookEvent::UpdateGridMultipliers { grid });
    }

    pub fn in_free_game(&self) -> bool {
        self.game_type == GameType::FreeGame
    }
}
