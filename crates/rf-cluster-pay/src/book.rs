//! Book: the audited event stream of one simulation
//!
//! Every accepted attempt produces a [`Book`]. Events are appended in the
//! order the engine performs them; rejected attempts leave no trace.

use serde::{Deserialize, Serialize};

use crate::board::Position;
use crate::context::GameType;
use crate::evaluate::WinRecord;

/// A single book event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum BookEvent {
    // ═══════════════════════════════════════════════════════════════════════
    // REVEALS
    // ═══════════════════════════════════════════════════════════════════════
    /// Fresh board at the start of a spin
    Reveal {
        board: Vec<Vec<String>>,
        game_type: GameType,
        reel_set: String,
    },

    /// Wins of one reveal
    WinInfo { total_win: f64, wins: Vec<WinRecord> },

    /// Exploded cells removed and refilled
    TumbleBoard {
        exploding: Vec<Position>,
        new_symbols: Vec<Vec<String>>,
    },

    /// Running win of the cascade sequence
    UpdateTumbleWin { amount: f64 },

    /// Hit counters after an update
    UpdateGridMultipliers { grid: Vec<Vec<u32>> },

    /// Collector payout at the end of a spin
    CollectorWin { win: WinRecord },

    /// Spin total once cascading stopped
    SetWin { amount: f64 },

    // ═══════════════════════════════════════════════════════════════════════
    // FREE SPINS
    // ═══════════════════════════════════════════════════════════════════════
    FreeSpinTrigger { total_fs: u32, positions: Vec<Position> },

    FreeSpinRetrigger { total_fs: u32, positions: Vec<Position> },

    /// A free spin starts
    UpdateFreeSpin { amount: u32, total: u32 },

    FreeSpinEnd { amount: f64 },

    // ═══════════════════════════════════════════════════════════════════════
    // ROUND END
    // ═══════════════════════════════════════════════════════════════════════
    /// Win cap reached, no further cascades or free spins
    WinCap { amount: f64 },

    FinalWin { amount: f64 },
}

impl BookEvent {
    /// Event type name as serialized
    pub fn type_name(&self) -> &'static str {
        match self {
            BookEvent::Reveal { .. } => "reveal",
            BookEvent::WinInfo { .. } => "winInfo",
            BookEvent::TumbleBoard { .. } => "tumbleBoard",
            BookEvent::UpdateTumbleWin { .. } => "updateTumbleWin",
            BookEvent::UpdateGridMultipliers { .. } => "updateGridMultipliers",
            BookEvent::CollectorWin { .. } => "collectorWin",
            BookEvent::SetWin { .. } => "setWin",
            BookEvent::FreeSpinTrigger { .. } => "freeSpinTrigger",
            BookEvent::FreeSpinRetrigger { .. } => "freeSpinRetrigger",
            BookEvent::UpdateFreeSpin { .. } => "updateFreeSpin",
            BookEvent::FreeSpinEnd { .. } => "freeSpinEnd",
            BookEvent::WinCap { .. } => "winCap",
            BookEvent::FinalWin { .. } => "finalWin",
        }
    }
}

/// Result of one simulation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Book {
    pub id: u64,
    pub criteria: String,
    pub events: Vec<BookEvent>,
    pub base_game_wins: f64,
    pub free_game_wins: f64,
    /// Final win in bet multiples
    pub payout_multiplier: f64,
    /// Attempts it took to satisfy the criteria
    pub attempts: u32,
    pub triggered_freegame: bool,
    pub wincap_triggered: bool,
}

impl Book {
    pub fn new(id: u64, criteria: impl Into<String>) -> Self {
        Self {
            id,
            criteria: criteria.into(),
            events: Vec::new(),
            base_game_wins: 0.0,
            free_game_wins: 0.0,
            payout_multiplier: 0.0,
            attempts: 0,
            triggered_freegame: false,
            wincap_triggered: false,
        }
    }

    pub fn push(&mut self, event: BookEvent) {
        self.events.push(event);
    }

    /// Events of a given type name
    pub fn events_of<'a>(&'a self, type_name: &'a str) -> impl Iterator<Item = &'a BookEvent> {
        self.events.iter().filter(move |e| e.type_name() == type_name)
    }
}
