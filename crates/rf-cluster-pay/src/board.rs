//! Board state, reveals and tumbles

use rand::seq::SliceRandom;
use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};

use crate::config::GameConfig;
use crate::context::GameType;
use crate::distribution::{DistributionConditions, draw_weighted};
use crate::error::{EngineError, EngineResult};
use crate::symbols::{ReelStrip, SymbolRoles};

/// Collector instance identity, stable for the life of one spin
pub type CollectorId = u32;

/// Grid cell address
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
pub struct Position {
    pub reel: usize,
    pub row: usize,
}

impl Position {
    pub fn new(reel: usize, row: usize) -> Self {
        Self { reel, row }
    }
}

impl From<(usize, usize)> for Position {
    fn from((reel, row): (usize, usize)) -> Self {
        Self { reel, row }
    }
}

/// A symbol on the board
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cell {
    pub symbol: String,
    /// Set by win evaluation, consumed by the tumble
    #[serde(default)]
    pub explode: bool,
    /// Collector instance, only for collector symbols
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance: Option<CollectorId>,
}

impl Cell {
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            explode: false,
            instance: None,
        }
    }
}

/// Revealed board, indexed `[reel][row]` with row 0 at the top
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Board {
    reels: Vec<Vec<Cell>>,
    /// Strip stop of each reel (top visible row)
    #[serde(default)]
    stops: Vec<usize>,
    /// Reel set the board was drawn from
    #[serde(default)]
    reel_set: String,
}

impl Board {
    /// Build a board from symbol names, one inner slice per reel
    pub fn from_symbols<S: AsRef<str>>(reels: &[Vec<S>]) -> Self {
        Self {
            reels: reels
                .iter()
                .map(|reel| reel.iter().map(|s| Cell::new(s.as_ref())).collect())
                .collect(),
            stops: vec![0; reels.len()],
            reel_set: String::new(),
        }
    }

    pub fn num_reels(&self) -> usize {
        self.reels.len()
    }

    pub fn rows(&self, reel: usize) -> usize {
        self.reels.get(reel).map_or(0, Vec::len)
    }

    pub fn reel_set(&self) -> &str {
        &self.reel_set
    }

    pub fn stops(&self) -> &[usize] {
        &self.stops
    }

    pub fn contains(&self, pos: Position) -> bool {
        pos.row < self.rows(pos.reel)
    }

    pub fn cell(&self, pos: Position) -> EngineResult<&Cell> {
        self.reels
            .get(pos.reel)
            .and_then(|r| r.get(pos.row))
            .ok_or(EngineError::PositionOutOfBounds(pos))
    }

    pub fn cell_mut(&mut self, pos: Position) -> EngineResult<&mut Cell> {
        self.reels
            .get_mut(pos.reel)
            .and_then(|r| r.get_mut(pos.row))
            .ok_or(EngineError::PositionOutOfBounds(pos))
    }

    pub fn symbol(&self, pos: Position) -> EngineResult<&str> {
        self.cell(pos).map(|c| c.symbol.as_str())
    }

    pub fn mark_exploded(&mut self, pos: Position) -> EngineResult<()> {
        self.cell_mut(pos)?.explode = true;
        Ok(())
    }

    /// All positions, reel-major
    pub fn positions(&self) -> impl Iterator<Item = Position> + '_ {
        self.reels
            .iter()
            .enumerate()
            .flat_map(|(reel, cells)| (0..cells.len()).map(move |row| Position { reel, row }))
    }

    /// Positions whose symbol matches `pred`, reel-major
    pub fn positions_where<F>(&self, mut pred: F) -> Vec<Position>
    where
        F: FnMut(&Cell) -> bool,
    {
        self.positions()
            .filter(|&p| self.reels[p.reel].get(p.row).is_some_and(&mut pred))
            .collect()
    }

    pub fn exploded_positions(&self) -> Vec<Position> {
        self.positions_where(|c| c.explode)
    }

    pub fn count_scatters(&self, roles: &SymbolRoles) -> usize {
        self.positions_where(|c| roles.is_scatter(&c.symbol)).len()
    }

    /// Give every collector symbol without an identity a fresh one.
    ///
    /// Survivors of a tumble keep their id; new draws get the next id.
    pub fn tag_collectors(&mut self, roles: &SymbolRoles, next_id: &mut CollectorId) {
        for cell in self.reels.iter_mut().flatten() {
            if roles.is_collector(&cell.symbol) && cell.instance.is_none() {
                cell.instance = Some(*next_id);
                *next_id += 1;
            }
        }
    }

    /// Symbol names, `[reel][row]`
    pub fn symbols(&self) -> Vec<Vec<String>> {
        self.reels
            .iter()
            .map(|r| r.iter().map(|c| c.symbol.clone()).collect())
            .collect()
    }

    /// Remove exploded cells and let survivors fall.
    ///
    /// `refill(reel, count)` returns the `count` new symbols for the top of
    /// `reel`, top to bottom. Returns the new symbols per reel.
    pub fn tumble_with<F>(&mut self, mut refill: F) -> Vec<Vec<String>>
    where
        F: FnMut(usize, usize) -> Vec<String>,
    {
        let mut added = Vec::with_capacity(self.reels.len());
        for (reel, cells) in self.reels.iter_mut().enumerate() {
            let removed = cells.iter().filter(|c| c.explode).count();
            if removed == 0 {
                added.push(Vec::new());
                continue;
            }
            let survivors: Vec<Cell> = cells.drain(..).filter(|c| !c.explode).collect();
            let fresh = refill(reel, removed);
            cells.extend(fresh.iter().map(Cell::new));
            cells.extend(survivors);
            added.push(fresh);
        }
        added
    }
}

/// What the engine asks the board source for on a fresh reveal
#[derive(Debug, Clone, Copy)]
pub struct RevealRequest<'a> {
    pub game_type: GameType,
    pub conditions: &'a DistributionConditions,
    /// Exact scatter count the board must show, for forced free-game entries
    pub forced_scatters: Option<usize>,
    /// Smallest scatter count that triggers free spins in this game type
    pub trigger_threshold: Option<usize>,
}

/// Produces boards for the cascade loop
pub trait BoardSource: Send + Sync {
    /// Fresh draw for the first reveal of a spin
    fn draw(&self, request: &RevealRequest<'_>, rng: &mut dyn RngCore) -> EngineResult<Board>;

    /// Refill exploded cells. Returns the new symbols per reel.
    fn tumble(&self, board: &mut Board) -> EngineResult<Vec<Vec<String>>>;
}

const MAX_DRAW_ATTEMPTS: u32 = 10_000;

/// Reel-strip backed board source
pub struct ReelBoardSource {
    reels: std::collections::BTreeMap<String, Vec<ReelStrip>>,
    num_rows: Vec<usize>,
    roles: SymbolRoles,
}

impl ReelBoardSource {
    pub fn from_config(config: &GameConfig) -> Self {
        Self {
            reels: config.reels.clone(),
            num_rows: config.num_rows.clone(),
            roles: config.symbols.clone(),
        }
    }

    fn strips(&self, name: &str) -> EngineResult<&[ReelStrip]> {
        self.reels
            .get(name)
            .map(Vec::as_slice)
            .ok_or_else(|| EngineError::MissingReelSet(name.to_string()))
    }

    fn window(&self, strip: &ReelStrip, stop: usize, rows: usize) -> Vec<Cell> {
        (0..rows).map(|row| Cell::new(strip.symbol_at(stop + row))).collect()
    }

    fn window_has_scatter(&self, strip: &ReelStrip, stop: usize, rows: usize) -> bool {
        (0..rows).any(|row| self.roles.is_scatter(strip.symbol_at(stop + row)))
    }

    fn random_board(
        &self,
        name: &str,
        strips: &[ReelStrip],
        forced_reels: &[usize],
        rng: &mut dyn RngCore,
    ) -> Board {
        let mut reels = Vec::with_capacity(self.num_rows.len());
        let mut stops = Vec::with_capacity(self.num_rows.len());
        for (reel, &rows) in self.num_rows.iter().enumerate() {
            let strip = &strips[reel % strips.len()];
            let stop = if forced_reels.contains(&reel) {
                let candidates: Vec<usize> = (0..strip.len())
                    .filter(|&s| self.window_has_scatter(strip, s, rows))
                    .collect();
                if candidates.is_empty() {
                    rng.random_range(0..strip.len())
                } else {
                    candidates[rng.random_range(0..candidates.len())]
                }
            } else {
                rng.random_range(0..strip.len())
            };
            reels.push(self.window(strip, stop, rows));
            stops.push(stop);
        }
        Board {
            reels,
            stops,
            reel_set: name.to_string(),
        }
    }
}

impl BoardSource for ReelBoardSource {
    fn draw(&self, request: &RevealRequest<'_>, rng: &mut dyn RngCore) -> EngineResult<Board> {
        let weights = request
            .conditions
            .reel_weights
            .get(request.game_type)
            .ok_or(EngineError::NoReelWeights(request.game_type))?;
        let name = draw_weighted(weights, rng)
            .map(|w| w.name.clone())
            .ok_or(EngineError::NoReelWeights(request.game_type))?;
        let strips = self.strips(&name)?;
        if strips.is_empty() || strips.iter().any(ReelStrip::is_empty) {
            return Err(EngineError::MissingReelSet(name));
        }

        for _ in 0..MAX_DRAW_ATTEMPTS {
            let forced_reels = match request.forced_scatters {
                Some(count) => {
                    let mut reels: Vec<usize> = (0..self.num_rows.len()).collect();
                    reels.shuffle(rng);
                    reels.truncate(count);
                    reels
                }
                None => Vec::new(),
            };
            let board = self.random_board(&name, strips, &forced_reels, rng);
            let scatters = board.count_scatters(&self.roles);
            let accepted = match (request.forced_scatters, request.trigger_threshold) {
                (Some(count), _) => scatters == count,
                (None, Some(threshold)) if request.game_type == GameType::BaseGame => {
                    scatters < threshold
                }
                _ => true,
            };
            if accepted {
                return Ok(board);
            }
        }
        Err(EngineError::DrawExhausted(MAX_DRAW_ATTEMPTS))
    }

    fn tumble(&self, board: &mut Board) -> EngineResult<Vec<Vec<String>>> {
        let strips = self.strips(&board.reel_set)?;
        if strips.is_empty() {
            return Err(EngineError::MissingReelSet(board.reel_set.clone()));
        }
        let mut stops = board.stops.clone();
        stops.resize(board.num_reels(), 0);
        let added = board.tumble_with(|reel, count| {
            let strip = &strips[reel % strips.len()];
            let len = strip.len().max(1);
            let new_stop = (stops[reel] + len * count - count) % len;
            stops[reel] = new_stop;
            (0..count)
                .map(|i| strip.symbol_at(new_stop + i).to_string())
                .collect()
        });
        board.stops = stops;
        Ok(added)
    }
}
