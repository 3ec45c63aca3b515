//! Spot multipliers and the hit-counter grid
//!
//! Every cell counts how often it exploded inside its persistence window.
//! The first explosion arms the cell; each further one doubles the cell's
//! contribution up to the configured cap.
//!
//! ```text
//! hits  0  1  2  3  4  5 ...
//! spot  0  0  2  4  8 16 ... (min with cap)
//! ```

use serde::{Deserialize, Serialize};

use crate::board::Position;
use crate::error::{EngineError, EngineResult};

/// Spot multiplier of a cell with `hits` explosions, capped at `cap`
pub fn spot(hits: u32, cap: u32) -> u32 {
    if hits <= 1 {
        return 0;
    }
    match 1u64.checked_shl(hits - 1) {
        Some(value) if value < u64::from(cap) => value as u32,
        _ => cap,
    }
}

/// Per-cell explosion counters, shaped like the board
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HitGrid {
    counts: Vec<Vec<u32>>,
}

impl HitGrid {
    /// Zeroed grid with `rows[reel]` rows per reel
    pub fn new(rows: &[usize]) -> Self {
        Self {
            counts: rows.iter().map(|&n| vec![0; n]).collect(),
        }
    }

    /// Zero every cell
    pub fn reset(&mut self) {
        self.fill(0);
    }

    /// Set every cell to `hits`
    pub fn fill(&mut self, hits: u32) {
        for reel in &mut self.counts {
            reel.fill(hits);
        }
    }

    pub fn increment(&mut self, pos: Position) -> EngineResult<()> {
        let cell = self
            .counts
            .get_mut(pos.reel)
            .and_then(|r| r.get_mut(pos.row))
            .ok_or(EngineError::PositionOutOfBounds(pos))?;
        *cell = cell.saturating_add(1);
        Ok(())
    }

    pub fn read(&self, pos: Position) -> EngineResult<u32> {
        self.counts
            .get(pos.reel)
            .and_then(|r| r.get(pos.row))
            .copied()
            .ok_or(EngineError::PositionOutOfBounds(pos))
    }

    /// Spot multiplier at `pos`
    pub fn spot(&self, pos: Position, cap: u32) -> EngineResult<u32> {
        self.read(pos).map(|hits| spot(hits, cap))
    }

    pub fn is_zeroed(&self) -> bool {
        self.counts.iter().flatten().all(|&h| h == 0)
    }

    /// Counters, `[reel][row]`
    pub fn as_rows(&self) -> &[Vec<u32>] {
        &self.counts
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// PERSISTENCE POLICIES
// ═══════════════════════════════════════════════════════════════════════════════

/// When the hit grid is cleared
pub trait GridPersistence: Send + Sync {
    /// Entering a free-spin feature. `preseed` pre-arms every cell.
    fn on_feature_entry(&self, _grid: &mut HitGrid, _preseed: Option<u32>) {}

    fn on_spin_start(&self, grid: &mut HitGrid);

    fn on_spin_end(&self, grid: &mut HitGrid);
}

/// Base game: multipliers live for one cascade sequence only
#[derive(Debug, Clone, Copy, Default)]
pub struct ResetEverySpin;

impl GridPersistence for ResetEverySpin {
    fn on_spin_start(&self, grid: &mut HitGrid) {
        grid.reset();
    }

    fn on_spin_end(&self, grid: &mut HitGrid) {
        grid.reset();
    }
}

/// Free game: zeroed (or pre-seeded) on entry, then kept across every free spin
#[derive(Debug, Clone, Copy, Default)]
pub struct PersistThroughFeature;

impl GridPersistence for PersistThroughFeature {
    fn on_feature_entry(&self, grid: &mut HitGrid, preseed: Option<u32>) {
        grid.fill(preseed.unwrap_or(0));
    }

    fn on_spin_start(&self, _grid: &mut HitGrid) {}

    fn on_spin_end(&self, _grid: &mut HitGrid) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spot_values() {
        assert_eq!(spot(0, 1024), 0);
        assert_eq!(spot(1, 1024), 0);
        assert_eq!(spot(2, 1024), 2);
        assert_eq!(spot(3, 1024), 4);
        assert_eq!(spot(11, 1024), 1024);
        assert_eq!(spot(12, 1024), 1024);
        assert_eq!(spot(100, 1024), 1024);
        assert_eq!(spot(5, 10), 10);
    }

    #[test]
    fn test_spot_monotonic_and_capped() {
        for cap in [1, 2, 7, 1024] {
            let mut prev = 0;
            for hits in 0..80 {
                let s = spot(hits, cap);
                assert!(s >= prev);
                assert!(s <= cap);
                prev = s;
            }
        }
    }

    #[test]
    fn test_hit_grid_ops() {
        let mut grid = HitGrid::new(&[2, 3]);
        let pos = Position::new(1, 2);
        grid.increment(pos).unwrap();
        grid.increment(pos).unwrap();
        assert_eq!(grid.read(pos).unwrap(), 2);
        assert_eq!(grid.spot(pos, 1024).unwrap(), 2);
        assert!(!grid.is_zeroed());

        assert_eq!(
            grid.increment(Position::new(0, 2)),
            Err(EngineError::PositionOutOfBounds(Position::new(0, 2)))
        );
        assert!(grid.read(Position::new(2, 0)).is_err());

        grid.reset();
        assert!(grid.is_zeroed());
        assert_eq!(grid.as_rows(), &[vec![0, 0], vec![0, 0, 0]]);
    }

    #[test]
    fn test_base_policy_clears_both_ends() {
        let mut grid = HitGrid::new(&[2, 2]);
        grid.fill(3);
        ResetEverySpin.on_spin_start(&mut grid);
        assert!(grid.is_zeroed());
        grid.fill(3);
        ResetEverySpin.on_spin_end(&mut grid);
        assert!(grid.is_zeroed());
    }

    #[test]
    fn test_feature_policy_persists() {
        let mut grid = HitGrid::new(&[2, 2]);
        grid.fill(5);
        PersistThroughFeature.on_feature_entry(&mut grid, None);
        assert!(grid.is_zeroed());

        grid.increment(Position::new(0, 0)).unwrap();
        PersistThroughFeature.on_spin_end(&mut grid);
        PersistThroughFeature.on_spin_start(&mut grid);
        assert_eq!(grid.read(Position::new(0, 0)).unwrap(), 1);

        PersistThroughFeature.on_feature_entry(&mut grid, Some(2));
        assert!(grid.as_rows().iter().flatten().all(|&h| h == 2));
        assert_eq!(grid.spot(Position::new(1, 1), 1024).unwrap(), 2);
    }
}
