//! Bet modes, outcome distributions and weighted draws
//!
//! A bet mode owns a list of distributions. Every simulation is assigned one
//! distribution's criteria up front; the engine then repeats the spin until
//! the realized outcome satisfies it.

use rand::seq::SliceRandom;
use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};

use crate::context::GameType;

// ═══════════════════════════════════════════════════════════════════════════════
// WEIGHTED TABLES
// ═══════════════════════════════════════════════════════════════════════════════

/// Entry of an ordered weight table
pub trait Weighted {
    fn weight(&self) -> u32;
}

/// Integer value with a draw weight (collector values)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeightedValue {
    pub value: u32,
    pub weight: u32,
}

impl WeightedValue {
    pub const fn new(value: u32, weight: u32) -> Self {
        Self { value, weight }
    }
}

impl Weighted for WeightedValue {
    fn weight(&self) -> u32 {
        self.weight
    }
}

/// Named reel set with a draw weight
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeightedReelSet {
    pub name: String,
    pub weight: u32,
}

impl WeightedReelSet {
    pub fn new(name: impl Into<String>, weight: u32) -> Self {
        Self {
            name: name.into(),
            weight,
        }
    }
}

impl Weighted for WeightedReelSet {
    fn weight(&self) -> u32 {
        self.weight
    }
}

/// Forced scatter count with a draw weight
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeightedCount {
    pub count: usize,
    pub weight: u32,
}

impl Weighted for WeightedCount {
    fn weight(&self) -> u32 {
        self.weight
    }
}

/// Proportional integer draw over an ordered table.
///
/// Sums the weights to `W`, draws `r` uniformly from `[1, W]` and returns the
/// first entry whose running sum reaches `r`. Returns `None` when the table
/// is empty or all weights are zero.
pub fn draw_weighted<'a, T: Weighted>(table: &'a [T], rng: &mut dyn RngCore) -> Option<&'a T> {
    let total: u64 = table.iter().map(|e| u64::from(e.weight())).sum();
    if total == 0 {
        return None;
    }
    let r = rng.random_range(1..=total);
    let mut running = 0u64;
    table.iter().find(|e| {
        running += u64::from(e.weight());
        running >= r
    })
}

// ═══════════════════════════════════════════════════════════════════════════════
// DISTRIBUTIONS
// ═══════════════════════════════════════════════════════════════════════════════

/// Value split by game type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ByGameType<T> {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub basegame: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub freegame: Option<T>,
}

impl<T> ByGameType<T> {
    pub fn both(value: T) -> Self
    where
        T: Clone,
    {
        Self {
            basegame: Some(value.clone()),
            freegame: Some(value),
        }
    }

    pub fn get(&self, game_type: GameType) -> Option<&T> {
        match game_type {
            GameType::BaseGame => self.basegame.as_ref(),
            GameType::FreeGame => self.freegame.as_ref(),
        }
    }
}

impl<T> Default for ByGameType<T> {
    fn default() -> Self {
        Self {
            basegame: None,
            freegame: None,
        }
    }
}

/// Conditions a distribution imposes on board generation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DistributionConditions {
    /// Reel set weights per game type
    #[serde(default)]
    pub reel_weights: ByGameType<Vec<WeightedReelSet>>,
    /// Collector value tables overriding the game-wide ones
    #[serde(default)]
    pub mult_values: ByGameType<Vec<WeightedValue>>,
    /// Scatter counts forced onto the base board when `force_freegame` is set
    #[serde(default)]
    pub scatter_triggers: Vec<WeightedCount>,
    #[serde(default)]
    pub force_wincap: bool,
    #[serde(default)]
    pub force_freegame: bool,
}

/// One outcome bucket of a bet mode
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Distribution {
    /// Criteria name ("0", "basegame", "freegame", "wincap", ...)
    pub criteria: String,
    /// Share of simulations assigned to this criteria
    pub quota: f64,
    /// Exact payout the accepted outcome must have
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub win_criteria: Option<f64>,
    #[serde(default)]
    pub conditions: DistributionConditions,
}

/// Purchasable game mode
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BetMode {
    pub name: String,
    /// Cost in bet multiples
    pub cost: f64,
    pub rtp: f64,
    pub max_win: f64,
    #[serde(default)]
    pub is_feature: bool,
    #[serde(default)]
    pub is_buybonus: bool,
    /// Hit count every cell starts with when this mode enters free spins
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feature_preseed_hits: Option<u32>,
    pub distributions: Vec<Distribution>,
}

impl BetMode {
    pub fn distribution(&self, criteria: &str) -> Option<&Distribution> {
        self.distributions.iter().find(|d| d.criteria == criteria)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// CRITERIA ALLOCATION
// ═══════════════════════════════════════════════════════════════════════════════

/// Criteria assigned to each simulation of a batch
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CriteriaPlan {
    criteria: Vec<String>,
}

impl CriteriaPlan {
    /// Split `num_sims` across the mode's distributions in proportion to
    /// their quotas, then shuffle the assignment.
    ///
    /// Counts are floored and the remainder goes to the largest fractional
    /// parts, earliest distribution first on ties.
    pub fn allocate(mode: &BetMode, num_sims: usize, rng: &mut dyn RngCore) -> Self {
        let total: f64 = mode.distributions.iter().map(|d| d.quota.max(0.0)).sum();
        if total <= 0.0 || num_sims == 0 {
            return Self::default();
        }

        let exact: Vec<f64> = mode
            .distributions
            .iter()
            .map(|d| d.quota.max(0.0) / total * num_sims as f64)
            .collect();
        let mut counts: Vec<usize> = exact.iter().map(|e| e.floor() as usize).collect();
        let mut remainder = num_sims - counts.iter().sum::<usize>();

        let mut order: Vec<usize> = (0..exact.len()).collect();
        order.sort_by(|&a, &b| {
            let fa = exact[a] - exact[a].floor();
            let fb = exact[b] - exact[b].floor();
            fb.partial_cmp(&fa).unwrap_or(std::cmp::Ordering::Equal)
        });
        for &i in order.iter().cycle() {
            if remainder == 0 {
                break;
            }
            counts[i] += 1;
            remainder -= 1;
        }

        let mut criteria = Vec::with_capacity(num_sims);
        for (dist, &count) in mode.distributions.iter().zip(&counts) {
            criteria.extend(std::iter::repeat_n(dist.criteria.clone(), count));
        }
        criteria.shuffle(rng);
        Self { criteria }
    }

    /// Criteria of simulation `sim_id`
    pub fn criteria_for(&self, sim_id: usize) -> Option<&str> {
        self.criteria.get(sim_id).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.criteria.len()
    }

    pub fn is_empty(&self) -> bool {
        self.criteria.is_empty()
    }

    /// Number of simulations assigned to `criteria`
    pub fn count(&self, criteria: &str) -> usize {
        self.criteria.iter().filter(|c| c.as_str() == criteria).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_draw_weighted_walks_configured_order() {
        let table = [
            WeightedValue::new(5, 1),
            WeightedValue::new(10, 0),
            WeightedValue::new(20, 3),
        ];
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let mut seen = [0usize; 3];
        for _ in 0..4000 {
            match draw_weighted(&table, &mut rng).unwrap().value {
                5 => seen[0] += 1,
                10 => seen[1] += 1,
                20 => seen[2] += 1,
                _ => unreachable!(),
            }
        }
        assert_eq!(seen[1], 0);
        // 1:3 split, loose bounds
        assert!(seen[0] > 800 && seen[0] < 1200, "{seen:?}");
    }

    #[test]
    fn test_draw_weighted_empty() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let empty: [WeightedValue; 0] = [];
        assert!(draw_weighted(&empty, &mut rng).is_none());
        assert!(draw_weighted(&[WeightedValue::new(2, 0)], &mut rng).is_none());
    }

    #[test]
    fn test_by_game_type() {
        let split = ByGameType {
            basegame: Some(1),
            freegame: None,
        };
        assert_eq!(split.get(GameType::BaseGame), Some(&1));
        assert_eq!(split.get(GameType::FreeGame), None);
        assert_eq!(ByGameType::both(2).get(GameType::FreeGame), Some(&2));
    }

    fn mode() -> BetMode {
        let dist = |criteria: &str, quota: f64| Distribution {
            criteria: criteria.into(),
            quota,
            win_criteria: None,
            conditions: DistributionConditions::default(),
        };
        BetMode {
            name: "base".into(),
            cost: 1.0,
            rtp: 0.97,
            max_win: 25000.0,
            is_feature: true,
            is_buybonus: false,
            feature_preseed_hits: None,
            distributions: vec![dist("wincap", 0.001), dist("0", 0.7), dist("basegame", 0.299)],
        }
    }

    #[test]
    fn test_allocate_respects_quotas() {
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let plan = CriteriaPlan::allocate(&mode(), 1000, &mut rng);
        assert_eq!(plan.len(), 1000);
        assert_eq!(plan.count("wincap"), 1);
        assert_eq!(plan.count("0"), 700);
        assert_eq!(plan.count("basegame"), 299);
        assert!(plan.criteria_for(999).is_some());
        assert!(plan.criteria_for(1000).is_none());
    }

    #[test]
    fn test_allocate_remainder() {
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let plan = CriteriaPlan::allocate(&mode(), 10, &mut rng);
        assert_eq!(plan.len(), 10);
        assert_eq!(plan.count("0"), 7);
        assert_eq!(plan.count("basegame") + plan.count("wincap"), 3);
    }
}
