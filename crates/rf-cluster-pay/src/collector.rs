//! Collector symbols
//!
//! ```text
//! reset ──► IDLE ──assign──► ARMED ──collect──► COLLECTING ──finalize──► FINALIZED
//!             ▲                                                              │
//!             └──────────────────────── next spin ───────────────────────────┘
//! ```
//!
//! Collectors never explode. Each instance gets a value the first time it is
//! seen, is tallied once per spin, and the spin pays the banked total only
//! when enough instances were tallied.

use std::collections::{HashMap, HashSet};

use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::board::{Board, CollectorId, Position};
use crate::cluster::central_position;
use crate::distribution::{WeightedValue, draw_weighted};
use crate::error::{EngineError, EngineResult};
use crate::evaluate::{WinMeta, WinRecord, quantize};
use crate::multiplier::{HitGrid, spot};
use crate::symbols::SymbolRoles;

/// Symbol name of the synthetic collector win record
pub const COLLECTOR_WIN_SYMBOL: &str = "COLLECTOR";

/// Collector payout threshold used by the built-in games
pub const DEFAULT_COLLECTOR_THRESHOLD: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CollectorPhase {
    #[default]
    Idle,
    Armed,
    Collecting,
    Finalized,
}

/// A tallied collector instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectedValue {
    pub position: Position,
    pub instance: CollectorId,
    pub value: u32,
    /// Spot factor applied, never below 1
    pub factor: u32,
    pub effective: u64,
}

/// Per-spin collector bookkeeping
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CollectorState {
    phase: CollectorPhase,
    bindings: HashMap<CollectorId, u32>,
    tallied: HashSet<CollectorId>,
    accumulator: Vec<CollectedValue>,
}

impl CollectorState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> CollectorPhase {
        self.phase
    }

    pub fn binding(&self, instance: CollectorId) -> Option<u32> {
        self.bindings.get(&instance).copied()
    }

    pub fn tallied_count(&self) -> usize {
        self.tallied.len()
    }

    pub fn accumulator(&self) -> &[CollectedValue] {
        &self.accumulator
    }

    pub fn reset(&mut self) {
        self.phase = CollectorPhase::Idle;
        self.bindings.clear();
        self.tallied.clear();
        self.accumulator.clear();
    }

    /// Collector cells on `board` with their instance id, reel-major
    fn instances(
        board: &Board,
        roles: &SymbolRoles,
    ) -> EngineResult<Vec<(Position, CollectorId)>> {
        board
            .positions_where(|c| roles.is_collector(&c.symbol))
            .into_iter()
            .map(|pos| {
                board
                    .cell(pos)?
                    .instance
                    .map(|id| (pos, id))
                    .ok_or(EngineError::UnresolvedCollector(pos))
            })
            .collect()
    }

    /// Bind a value to every collector instance that has none yet.
    ///
    /// Without a value table nothing is bound and the spin continues with an
    /// empty tally.
    pub fn assign(
        &mut self,
        board: &Board,
        roles: &SymbolRoles,
        table: Option<&[WeightedValue]>,
        rng: &mut dyn RngCore,
    ) -> EngineResult<()> {
        let instances = Self::instances(board, roles)?;
        let unbound: Vec<CollectorId> = instances
            .iter()
            .map(|&(_, id)| id)
            .filter(|id| !self.bindings.contains_key(id))
            .collect();
        if unbound.is_empty() {
            return Ok(());
        }

        let Some(table) = table.filter(|t| !t.is_empty()) else {
            log::warn!(
                "No collector value table, {} collector(s) left unbound",
                unbound.len()
            );
            return Ok(());
        };

        for id in unbound {
            let Some(drawn) = draw_weighted(table, rng) else {
                log::warn!("Collector value table has no positive weight");
                return Ok(());
            };
            self.bindings.insert(id, drawn.value);
        }
        if self.phase == CollectorPhase::Idle {
            self.phase = CollectorPhase::Armed;
        }
        Ok(())
    }

    /// Tally every bound instance on the board not tallied yet this spin.
    ///
    /// `hits` must be the grid as it stood before this reveal's wins.
    pub fn collect(
        &mut self,
        board: &Board,
        roles: &SymbolRoles,
        hits: &HitGrid,
        cap: u32,
    ) -> EngineResult<()> {
        for (pos, id) in Self::instances(board, roles)? {
            if self.tallied.contains(&id) {
                continue;
            }
            let Some(&value) = self.bindings.get(&id) else {
                continue;
            };
            let factor = spot(hits.read(pos)?, cap).max(1);
            self.tallied.insert(id);
            self.accumulator.push(CollectedValue {
                position: pos,
                instance: id,
                value,
                factor,
                effective: u64::from(value) * u64::from(factor),
            });
            self.phase = CollectorPhase::Collecting;
        }
        Ok(())
    }

    /// Close the spin. Pays once when at least `threshold` instances were
    /// tallied.
    pub fn finalize(&mut self, threshold: usize) -> Option<WinRecord> {
        self.phase = CollectorPhase::Finalized;
        if self.accumulator.len() < threshold || self.accumulator.is_empty() {
            return None;
        }

        let positions: Vec<Position> = self.accumulator.iter().map(|c| c.position).collect();
        let total: u64 = self.accumulator.iter().map(|c| c.effective).sum();
        Some(WinRecord {
            symbol: COLLECTOR_WIN_SYMBOL.to_string(),
            cluster_size: self.accumulator.len(),
            win: quantize(total as f64),
            meta: WinMeta {
                global_mult: 1,
                cluster_mult: 1,
                sum_spot_mult: self.accumulator.iter().map(|c| u64::from(c.factor)).sum(),
                win_without_mult: self.accumulator.iter().map(|c| f64::from(c.value)).sum(),
                overlay: central_position(&positions).unwrap_or_default(),
            },
            positions,
        })
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// SPECIAL SYMBOL POLICY
// ═══════════════════════════════════════════════════════════════════════════════

/// Game-specific handling of non-paying special symbols, driven once per
/// spin and once per reveal by the cascade engine.
pub trait SpecialSymbolPolicy: Send + Sync {
    fn on_spin_start(&self, state: &mut CollectorState) {
        state.reset();
    }

    /// Runs right after every reveal, before win evaluation
    fn on_reveal(
        &self,
        state: &mut CollectorState,
        board: &Board,
        hits: &HitGrid,
        values: Option<&[WeightedValue]>,
        rng: &mut dyn RngCore,
    ) -> EngineResult<()>;

    /// Runs once after the cascade loop of a spin
    fn on_spin_end(&self, state: &mut CollectorState) -> Option<WinRecord>;
}

/// Collector symbols with spot-boosted values
#[derive(Debug, Clone)]
pub struct CollectorPolicy {
    pub roles: SymbolRoles,
    pub spot_cap: u32,
    pub threshold: usize,
}

impl CollectorPolicy {
    pub fn new(roles: SymbolRoles, spot_cap: u32, threshold: usize) -> Self {
        Self {
            roles,
            spot_cap,
            threshold,
        }
    }
}

impl SpecialSymbolPolicy for CollectorPolicy {
    fn on_reveal(
        &self,
        state: &mut CollectorState,
        board: &Board,
        hits: &HitGrid,
        values: Option<&[WeightedValue]>,
        rng: &mut dyn RngCore,
    ) -> EngineResult<()> {
        state.assign(board, &self.roles, values, rng)?;
        state.collect(board, &self.roles, hits, self.spot_cap)
    }

    fn on_spin_end(&self, state: &mut CollectorState) -> Option<WinRecord> {
        state.finalize(self.threshold)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    /// Four collectors on the top row of a 4x2 board
    fn collector_board() -> Board {
        let mut board = Board::from_symbols(&vec![vec!["C", "L1"]; 4]);
        let mut next = 0;
        board.tag_collectors(&SymbolRoles::default(), &mut next);
        board
    }

    /// Bind fixed values without going through the weighted draw
    fn bind(state: &mut CollectorState, values: &[u32]) {
        for (id, &value) in values.iter().enumerate() {
            state.bindings.insert(id as CollectorId, value);
        }
    }

    #[test]
    fn test_spot_factor_is_identity_when_unarmed() {
        let roles = SymbolRoles::default();
        let board = collector_board();
        let mut hits = HitGrid::new(&[2; 4]);
        for reel in 2..4 {
            hits.increment(Position::new(reel, 0)).unwrap();
            hits.increment(Position::new(reel, 0)).unwrap();
        }

        let mut state = CollectorState::new();
        bind(&mut state, &[5, 10, 5, 10]);
        state.collect(&board, &roles, &hits, 1024).unwrap();

        let effective: Vec<u64> = state.accumulator().iter().map(|c| c.effective).collect();
        assert_eq!(effective, vec![5, 10, 10, 20]);
        assert_eq!(state.phase(), CollectorPhase::Collecting);

        let win = state.finalize(DEFAULT_COLLECTOR_THRESHOLD).unwrap();
        assert_eq!(win.win, 45.0);
        assert_eq!(win.symbol, COLLECTOR_WIN_SYMBOL);
        assert_eq!(win.cluster_size, 4);
        assert_eq!(win.meta.sum_spot_mult, 6);
        assert_eq!(win.meta.win_without_mult, 30.0);
        assert_eq!(win.positions.len(), 4);
    }

    #[test]
    fn test_below_threshold_pays_nothing() {
        let roles = SymbolRoles::default();
        let mut board = Board::from_symbols(&vec![
            vec!["C", "L1"],
            vec!["C", "L1"],
            vec!["C", "L1"],
            vec!["L2", "L1"],
        ]);
        let mut next = 0;
        board.tag_collectors(&roles, &mut next);

        let mut state = CollectorState::new();
        bind(&mut state, &[5, 5, 5]);
        state.collect(&board, &roles, &HitGrid::new(&[2; 4]), 1024).unwrap();
        assert_eq!(state.tallied_count(), 3);
        assert!(state.finalize(4).is_none());
        assert_eq!(state.phase(), CollectorPhase::Finalized);
    }

    #[test]
    fn test_instance_tallied_once_per_spin() {
        let roles = SymbolRoles::default();
        let board = collector_board();
        let hits = HitGrid::new(&[2; 4]);
        let mut state = CollectorState::new();
        bind(&mut state, &[2, 2, 2, 2]);

        for _ in 0..3 {
            state.collect(&board, &roles, &hits, 1024).unwrap();
        }
        assert_eq!(state.tallied_count(), 4);
        assert_eq!(state.finalize(4).unwrap().win, 8.0);
    }

    #[test]
    fn test_assign_is_idempotent() {
        let roles = SymbolRoles::default();
        let board = collector_board();
        let table = [WeightedValue::new(2, 1), WeightedValue::new(50, 1)];
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let mut state = CollectorState::new();

        state.assign(&board, &roles, Some(&table), &mut rng).unwrap();
        assert_eq!(state.phase(), CollectorPhase::Armed);
        let first: Vec<Option<u32>> = (0..4).map(|id| state.binding(id)).collect();
        assert!(first.iter().all(|v| matches!(v, Some(2) | Some(50))));

        for _ in 0..5 {
            state.assign(&board, &roles, Some(&table), &mut rng).unwrap();
        }
        let again: Vec<Option<u32>> = (0..4).map(|id| state.binding(id)).collect();
        assert_eq!(first, again);
    }

    #[test]
    fn test_missing_table_degrades_to_empty_tally() {
        let roles = SymbolRoles::default();
        let board = collector_board();
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let policy = CollectorPolicy::new(roles, 1024, 4);
        let mut state = CollectorState::new();

        policy
            .on_reveal(&mut state, &board, &HitGrid::new(&[2; 4]), None, &mut rng)
            .unwrap();
        assert_eq!(state.tallied_count(), 0);
        assert!(policy.on_spin_end(&mut state).is_none());
    }

    #[test]
    fn test_untagged_collector_is_fatal() {
        let roles = SymbolRoles::default();
        let board = Board::from_symbols(&[vec!["L1", "C"]]);
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let mut state = CollectorState::new();
        let table = [WeightedValue::new(2, 1)];
        assert_eq!(
            state.assign(&board, &roles, Some(&table), &mut rng),
            Err(EngineError::UnresolvedCollector(Position::new(0, 1)))
        );
    }

    #[test]
    fn test_reset_clears_everything() {
        let roles = SymbolRoles::default();
        let board = collector_board();
        let mut state = CollectorState::new();
        bind(&mut state, &[1, 1, 1, 1]);
        state.collect(&board, &roles, &HitGrid::new(&[2; 4]), 1024).unwrap();

        CollectorPolicy::new(roles, 1024, 4).on_spin_start(&mut state);
        assert_eq!(state, CollectorState::new());
    }
}
