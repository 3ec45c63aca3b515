//! Cluster detection

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use crate::board::{Board, Position};
use crate::symbols::SymbolRoles;

/// Paying symbol -> clusters, each an ordered list of unique positions.
///
/// Keys iterate in sorted order so evaluation order is reproducible.
pub type ClusterMap = BTreeMap<String, Vec<Vec<Position>>>;

/// Finds clusters on a revealed board
pub trait ClusterFinder: Send + Sync {
    fn find(&self, board: &Board) -> ClusterMap;
}

/// Orthogonal flood fill.
///
/// Wilds join any neighbouring cluster but never seed one, so a wild can
/// belong to clusters of different symbols in the same reveal.
#[derive(Debug, Clone)]
pub struct FloodFillFinder {
    pub min_size: usize,
    pub roles: SymbolRoles,
}

impl FloodFillFinder {
    pub fn new(min_size: usize, roles: SymbolRoles) -> Self {
        Self { min_size, roles }
    }

    fn neighbours(board: &Board, pos: Position) -> impl Iterator<Item = Position> + '_ {
        let Position { reel, row } = pos;
        let candidates = [
            (reel.checked_sub(1), Some(row)),
            (reel.checked_add(1), Some(row)),
            (Some(reel), row.checked_sub(1)),
            (Some(reel), row.checked_add(1)),
        ];
        candidates
            .into_iter()
            .filter_map(|(r, c)| Some(Position::new(r?, c?)))
            .filter(move |&p| board.contains(p))
    }
}

impl ClusterFinder for FloodFillFinder {
    fn find(&self, board: &Board) -> ClusterMap {
        let seeds: BTreeSet<&str> = board
            .positions()
            .filter_map(|p| board.symbol(p).ok())
            .filter(|s| self.roles.is_regular(s))
            .collect();

        let mut clusters = ClusterMap::new();
        for symbol in seeds {
            let matches = |p: Position| {
                board
                    .symbol(p)
                    .is_ok_and(|s| s == symbol || self.roles.is_wild(s))
            };
            let mut visited: BTreeSet<Position> = BTreeSet::new();

            for start in board.positions() {
                if visited.contains(&start) || board.symbol(start).ok() != Some(symbol) {
                    continue;
                }
                let mut cluster = Vec::new();
                let mut queue = VecDeque::from([start]);
                visited.insert(start);
                while let Some(pos) = queue.pop_front() {
                    cluster.push(pos);
                    for next in Self::neighbours(board, pos) {
                        if !visited.contains(&next) && matches(next) {
                            visited.insert(next);
                            queue.push_back(next);
                        }
                    }
                }
                if cluster.len() >= self.min_size {
                    clusters.entry(symbol.to_string()).or_default().push(cluster);
                }
            }
        }
        clusters
    }
}

/// Cluster cell closest to the centroid of `positions`, first one on ties.
///
/// Used as the overlay anchor of a win.
pub fn central_position(positions: &[Position]) -> Option<Position> {
    if positions.is_empty() {
        return None;
    }
    let n = positions.len() as f64;
    let mean_reel = positions.iter().map(|p| p.reel as f64).sum::<f64>() / n;
    let mean_row = positions.iter().map(|p| p.row as f64).sum::<f64>() / n;
    let distance = |p: &Position| {
        let dr = p.reel as f64 - mean_reel;
        let dc = p.row as f64 - mean_row;
        dr * dr + dc * dc
    };

    let mut best = positions[0];
    let mut best_distance = distance(&best);
    for p in &positions[1..] {
        let d = distance(p);
        if d < best_distance {
            best = *p;
            best_distance = d;
        }
    }
    Some(best)
}
