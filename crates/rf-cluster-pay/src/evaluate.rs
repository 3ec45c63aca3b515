//! Cluster win evaluation
//!
//! ```text
//! sum_spot     = Σ spot(hits[cell], cap)      over the cluster
//! cluster_mult = 1 + sum_spot
//! win          = q(pay(size, symbol) × cluster_mult × global_mult)
//! ```
//!
//! Wins and running totals are quantized to tenths after every addition so
//! payouts stay exact multiples of 0.1 in the lookup tables.

use serde::{Deserialize, Serialize};

use crate::board::{Board, Position};
use crate::cluster::{ClusterMap, central_position};
use crate::error::EngineResult;
use crate::multiplier::HitGrid;
use crate::paytable::PayTable;

/// Bias that keeps `x.x5` from truncating down on binary floats
const QUANTIZE_EPSILON: f64 = 1e-9;

/// Round to one decimal place, half up
pub fn quantize(x: f64) -> f64 {
    ((x + QUANTIZE_EPSILON) * 10.0).round() / 10.0
}

/// Multiplier breakdown attached to a win
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WinMeta {
    pub global_mult: u32,
    pub cluster_mult: u64,
    pub sum_spot_mult: u64,
    /// Paytable value before multipliers
    pub win_without_mult: f64,
    /// Anchor for the win overlay
    pub overlay: Position,
}

/// A single priced win
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WinRecord {
    pub symbol: String,
    pub cluster_size: usize,
    /// Quantized win in bet multiples
    pub win: f64,
    pub positions: Vec<Position>,
    pub meta: WinMeta,
}

/// Ordered win records plus their quantized total
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WinAggregate {
    pub total_win: f64,
    pub wins: Vec<WinRecord>,
}

impl WinAggregate {
    pub fn push(&mut self, record: WinRecord) {
        self.total_win = quantize(self.total_win + record.win);
        self.wins.push(record);
    }

    pub fn extend(&mut self, other: &WinAggregate) {
        for record in &other.wins {
            self.push(record.clone());
        }
    }

    pub fn is_win(&self) -> bool {
        self.total_win > 0.0
    }

    /// Every (win, position) pair, in record order
    pub fn win_positions(&self) -> impl Iterator<Item = Position> + '_ {
        self.wins.iter().flat_map(|w| w.positions.iter().copied())
    }
}

/// Everything a reveal is priced against
#[derive(Debug, Clone, Copy)]
pub struct EvaluationInput<'a> {
    pub paytable: &'a PayTable,
    pub clusters: &'a ClusterMap,
    /// Hit counts as they stood before this reveal
    pub hits: &'a HitGrid,
    pub global_multiplier: u32,
    pub spot_cap: u32,
}

/// Prices the clusters of one reveal
pub trait WinEvaluator: Send + Sync {
    /// Append this reveal's wins to `aggregate` and mark winning cells on
    /// `board`.
    fn evaluate(
        &self,
        input: EvaluationInput<'_>,
        board: &mut Board,
        aggregate: &mut WinAggregate,
    ) -> EngineResult<()>;
}

/// Cluster pays boosted by per-cell spot multipliers
#[derive(Debug, Clone, Copy, Default)]
pub struct SpotMultiplierEvaluator;

impl WinEvaluator for SpotMultiplierEvaluator {
    fn evaluate(
        &self,
        input: EvaluationInput<'_>,
        board: &mut Board,
        aggregate: &mut WinAggregate,
    ) -> EngineResult<()> {
        for (symbol, clusters) in input.clusters {
            for cluster in clusters {
                let size = cluster.len();
                let Some(base_pay) = input.paytable.get(size, symbol) else {
                    continue;
                };

                let mut sum_spot = 0u64;
                for &pos in cluster {
                    sum_spot += u64::from(input.hits.spot(pos, input.spot_cap)?);
                }
                let cluster_mult = 1 + sum_spot;
                let raw_win = base_pay * cluster_mult as f64 * f64::from(input.global_multiplier);

                aggregate.push(WinRecord {
                    symbol: symbol.clone(),
                    cluster_size: size,
                    win: quantize(raw_win),
                    positions: cluster.clone(),
                    meta: WinMeta {
                        global_mult: input.global_multiplier,
                        cluster_mult,
                        sum_spot_mult: sum_spot,
                        win_without_mult: base_pay,
                        overlay: central_position(cluster).unwrap_or_default(),
                    },
                });

                for &pos in cluster {
                    board.mark_exploded(pos)?;
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EngineError;
    use crate::paytable::PayRange;

    fn h1_cluster() -> Vec<Position> {
        (0..5).map(|reel| Position::new(reel, 0)).collect()
    }

    fn board() -> Board {
        Board::from_symbols(&vec![vec!["H1", "L1"]; 5])
    }

    fn run(
        hits: &HitGrid,
        clusters: &ClusterMap,
        board: &mut Board,
    ) -> EngineResult<WinAggregate> {
        let paytable = PayTable::from_ranges(&[PayRange::new("H1", 5, 5, 1.0)]).unwrap();
        let mut aggregate = WinAggregate::default();
        SpotMultiplierEvaluator.evaluate(
            EvaluationInput {
                paytable: &paytable,
                clusters,
                hits,
                global_multiplier: 1,
                spot_cap: 1024,
            },
            board,
            &mut aggregate,
        )?;
        Ok(aggregate)
    }

    #[test]
    fn test_quantize() {
        assert_eq!(quantize(1.05), 1.1);
        assert_eq!(quantize(0.25), 0.3);
        assert_eq!(quantize(2.04), 2.0);
        assert_eq!(quantize(0.1 + 0.2), 0.3);
        for x in [0.0, 0.15, 1.2345, 7.75, 123.456, 25000.0] {
            let q = quantize(x);
            assert_eq!(quantize(q), q);
            assert!(((q * 10.0) - (q * 10.0).round()).abs() < 1e-6);
        }
    }

    #[test]
    fn test_unarmed_cluster_pays_base() {
        let hits = HitGrid::new(&[2; 5]);
        let clusters = ClusterMap::from([("H1".to_string(), vec![h1_cluster()])]);
        let mut board = board();
        let agg = run(&hits, &clusters, &mut board).unwrap();

        assert_eq!(agg.total_win, 1.0);
        assert_eq!(agg.wins[0].meta.cluster_mult, 1);
        assert_eq!(agg.wins[0].meta.sum_spot_mult, 0);
        assert_eq!(agg.wins[0].meta.overlay, Position::new(2, 0));
        assert_eq!(board.exploded_positions(), h1_cluster());
    }

    #[test]
    fn test_spot_multipliers_add_up() {
        let mut hits = HitGrid::new(&[2; 5]);
        hits.fill(3);
        let clusters = ClusterMap::from([("H1".to_string(), vec![h1_cluster()])]);
        let agg = run(&hits, &clusters, &mut board()).unwrap();

        assert_eq!(agg.wins[0].meta.sum_spot_mult, 20);
        assert_eq!(agg.wins[0].meta.cluster_mult, 21);
        assert_eq!(agg.total_win, 21.0);
    }

    #[test]
    fn test_unpriced_cluster_is_skipped() {
        let hits = HitGrid::new(&[2; 5]);
        let four: Vec<Position> = h1_cluster().into_iter().take(4).collect();
        let clusters = ClusterMap::from([
            ("H1".to_string(), vec![four]),
            ("L1".to_string(), vec![(0..5).map(|r| Position::new(r, 1)).collect()]),
        ]);
        let mut board = board();
        let agg = run(&hits, &clusters, &mut board).unwrap();
        assert!(!agg.is_win());
        assert!(agg.wins.is_empty());
        assert!(board.exploded_positions().is_empty());
    }

    #[test]
    fn test_out_of_bounds_cluster_is_fatal() {
        let hits = HitGrid::new(&[2; 5]);
        let mut cluster = h1_cluster();
        cluster[4] = Position::new(9, 0);
        let clusters = ClusterMap::from([("H1".to_string(), vec![cluster])]);
        assert_eq!(
            run(&hits, &clusters, &mut board()),
            Err(EngineError::PositionOutOfBounds(Position::new(9, 0)))
        );
    }

    #[test]
    fn test_aggregate_quantizes_running_total() {
        let record = |win: f64| WinRecord {
            symbol: "L4".into(),
            cluster_size: 5,
            win,
            positions: Vec::new(),
            meta: WinMeta {
                global_mult: 1,
                cluster_mult: 1,
                sum_spot_mult: 0,
                win_without_mult: win,
                overlay: Position::default(),
            },
        };
        let mut agg = WinAggregate::default();
        for _ in 0..10 {
            agg.push(record(0.1));
        }
        assert_eq!(agg.total_win, 1.0);
        agg.push(record(0.2));
        assert_eq!(agg.total_win, 1.2);
        assert_eq!(agg.wins.len(), 11);
    }
}
