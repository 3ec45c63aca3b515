//! Spin and mode level win accounting

use serde::{Deserialize, Serialize};

use crate::context::GameType;
use crate::evaluate::quantize;

/// Win totals of one bet, all in bet multiples and quantized to tenths
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WinManager {
    /// Whole bet so far, base and free game; drives the win cap and retries
    pub running_bet_win: f64,
    /// Current spin (one base spin or one free spin)
    pub spin_win: f64,
    /// Current cascade sequence
    pub tumble_win: f64,
    pub base_game_wins: f64,
    pub free_game_wins: f64,
}

impl WinManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a reveal's (or collector's) win to the spin and the bet
    pub fn update_spinwin(&mut self, amount: f64) {
        self.spin_win = quantize(self.spin_win + amount);
        self.running_bet_win = quantize(self.running_bet_win + amount);
    }

    pub fn update_tumble_win(&mut self, amount: f64) {
        self.tumble_win = quantize(self.tumble_win + amount);
    }

    pub fn reset_spin_win(&mut self) {
        self.spin_win = 0.0;
        self.tumble_win = 0.0;
    }

    /// Book the finished spin against its game type
    pub fn update_gametype_wins(&mut self, game_type: GameType) {
        match game_type {
            GameType::BaseGame => {
                self.base_game_wins = quantize(self.base_game_wins + self.spin_win);
            }
            GameType::FreeGame => {
                self.free_game_wins = quantize(self.free_game_wins + self.spin_win);
            }
        }
    }

    /// Clamp the bet total to `wincap`. Returns true when clamping happened.
    pub fn clamp_to(&mut self, wincap: f64) -> bool {
        if self.running_bet_win <= wincap {
            return false;
        }
        let excess = self.running_bet_win - wincap;
        self.running_bet_win = wincap;
        if self.free_game_wins >= excess {
            self.free_game_wins = quantize(self.free_game_wins - excess);
        } else {
            let rest = excess - self.free_game_wins;
            self.free_game_wins = 0.0;
            self.base_game_wins = quantize((self.base_game_wins - rest).max(0.0));
        }
        true
    }

    pub fn total(&self) -> f64 {
        quantize(self.base_game_wins + self.free_game_wins)
    }
}
