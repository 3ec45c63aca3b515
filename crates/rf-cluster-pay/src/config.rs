//! Game configuration

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::collector::DEFAULT_COLLECTOR_THRESHOLD;
use crate::context::GameType;
use crate::distribution::{
    BetMode, ByGameType, Distribution, DistributionConditions, WeightedCount, WeightedReelSet,
    WeightedValue,
};
use crate::error::ConfigError;
use crate::paytable::{PayRange, PayTable};
use crate::symbols::{ReelStrip, StripLayout, SymbolRoles, generate_stacked_strips};

/// Spins awarded for a scatter count
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FreeSpinTrigger {
    pub count: usize,
    pub spins: u32,
}

impl FreeSpinTrigger {
    pub const fn new(count: usize, spins: u32) -> Self {
        Self { count, spins }
    }
}

/// Collector symbol settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectorConfig {
    /// Tallied instances needed for the spin to pay
    #[serde(default = "default_collector_threshold")]
    pub threshold: usize,
    /// Value tables per game type, used when a distribution has no override
    #[serde(default)]
    pub values: ByGameType<Vec<WeightedValue>>,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_COLLECTOR_THRESHOLD,
            values: ByGameType::default(),
        }
    }
}

fn default_collector_threshold() -> usize {
    DEFAULT_COLLECTOR_THRESHOLD
}

fn default_min_cluster_size() -> usize {
    5
}

fn default_board_mult() -> u32 {
    1024
}

fn default_global_multiplier() -> u32 {
    1
}

fn default_wincap() -> f64 {
    25_000.0
}

/// Complete description of a cluster-pay game
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameConfig {
    pub game_id: String,
    #[serde(default)]
    pub working_name: String,
    pub num_reels: usize,
    /// Rows per reel
    pub num_rows: Vec<usize>,
    #[serde(default = "default_min_cluster_size")]
    pub min_cluster_size: usize,
    pub paytable: Vec<PayRange>,
    /// Spot multiplier cap
    #[serde(default = "default_board_mult")]
    pub maximum_board_mult: u32,
    #[serde(default = "default_global_multiplier")]
    pub global_multiplier: u32,
    /// Maximum payout of one bet, in bet multiples
    #[serde(default = "default_wincap")]
    pub wincap: f64,
    #[serde(default)]
    pub symbols: SymbolRoles,
    /// Named reel sets, one strip per reel
    pub reels: BTreeMap<String, Vec<ReelStrip>>,
    #[serde(default)]
    pub freespin_triggers: ByGameType<Vec<FreeSpinTrigger>>,
    #[serde(default)]
    pub collector: CollectorConfig,
    pub bet_modes: Vec<BetMode>,
    /// Give up on a simulation after this many rejected attempts
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_attempts: Option<u32>,
}

impl GameConfig {
    /// Parse and validate a JSON configuration
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: GameConfig =
            serde_json::from_str(json).map_err(|e| ConfigError::Json(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        serde_json::to_string_pretty(self).map_err(|e| ConfigError::Json(e.to_string()))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.num_reels == 0 {
            return Err(ConfigError::InvalidGrid("no reels".into()));
        }
        if self.num_rows.len() != self.num_reels {
            return Err(ConfigError::InvalidGrid(format!(
                "{} reels but {} row counts",
                self.num_reels,
                self.num_rows.len()
            )));
        }
        if let Some(reel) = self.num_rows.iter().position(|&rows| rows == 0) {
            return Err(ConfigError::InvalidGrid(format!("reel {reel} has no rows")));
        }
        if self.min_cluster_size == 0 {
            return Err(ConfigError::InvalidValue("min_cluster_size must be >= 1".into()));
        }
        if self.maximum_board_mult == 0 {
            return Err(ConfigError::InvalidValue("maximum_board_mult must be >= 1".into()));
        }
        if self.global_multiplier == 0 {
            return Err(ConfigError::InvalidValue("global_multiplier must be >= 1".into()));
        }
        if !(self.wincap.is_finite() && self.wincap > 0.0) {
            return Err(ConfigError::InvalidValue(format!("wincap {}", self.wincap)));
        }
        if self.collector.threshold == 0 {
            return Err(ConfigError::InvalidValue("collector threshold must be >= 1".into()));
        }

        self.build_paytable()?;

        for (name, strips) in &self.reels {
            if strips.len() != self.num_reels || strips.iter().any(ReelStrip::is_empty) {
                return Err(ConfigError::MissingReelSet(format!(
                    "{name}: need {} non-empty strips",
                    self.num_reels
                )));
            }
        }

        for game_type in [GameType::BaseGame, GameType::FreeGame] {
            if let Some(triggers) = self.freespin_triggers.get(game_type) {
                if triggers.iter().any(|t| t.spins == 0) {
                    return Err(ConfigError::InvalidValue(format!(
                        "{game_type:?}: free spin trigger awards no spins"
                    )));
                }
            }
            if let Some(values) = self.collector.values.get(game_type) {
                check_weights("collector values", values.iter().map(|v| v.weight))?;
            }
        }

        if self.bet_modes.is_empty() {
            return Err(ConfigError::InvalidValue("no bet modes".into()));
        }
        for mode in &self.bet_modes {
            if mode.distributions.is_empty() {
                return Err(ConfigError::InvalidValue(format!(
                    "bet mode '{}' has no distributions",
                    mode.name
                )));
            }
            for dist in &mode.distributions {
                self.validate_distribution(&mode.name, dist)?;
            }
        }
        Ok(())
    }

    fn validate_distribution(&self, mode: &str, dist: &Distribution) -> Result<(), ConfigError> {
        if !(dist.quota.is_finite() && dist.quota > 0.0) {
            return Err(ConfigError::InvalidValue(format!(
                "{mode}/{}: quota must be positive",
                dist.criteria
            )));
        }
        let conditions = &dist.conditions;
        for game_type in [GameType::BaseGame, GameType::FreeGame] {
            if let Some(weights) = conditions.reel_weights.get(game_type) {
                check_weights("reel weights", weights.iter().map(|w| w.weight))?;
                for w in weights {
                    if !self.reels.contains_key(&w.name) {
                        return Err(ConfigError::MissingReelSet(format!(
                            "{mode}/{}: {}",
                            dist.criteria, w.name
                        )));
                    }
                }
            }
            if let Some(values) = conditions.mult_values.get(game_type) {
                check_weights("mult values", values.iter().map(|v| v.weight))?;
            }
        }
        if conditions.reel_weights.basegame.is_none() {
            return Err(ConfigError::InvalidValue(format!(
                "{mode}/{}: no base game reel weights",
                dist.criteria
            )));
        }
        if conditions.force_freegame {
            check_weights(
                "scatter triggers",
                conditions.scatter_triggers.iter().map(|s| s.weight),
            )?;
        }
        Ok(())
    }

    /// Expanded paytable
    pub fn build_paytable(&self) -> Result<PayTable, ConfigError> {
        PayTable::from_ranges(&self.paytable)
    }

    pub fn bet_mode(&self, name: &str) -> Option<&BetMode> {
        self.bet_modes.iter().find(|m| m.name == name)
    }

    /// Smallest scatter count that awards free spins in `game_type`
    pub fn trigger_threshold(&self, game_type: GameType) -> Option<usize> {
        self.freespin_triggers
            .get(game_type)?
            .iter()
            .map(|t| t.count)
            .min()
    }

    /// Free spins awarded for `scatters` in `game_type`.
    ///
    /// Counts above the largest configured key use the largest key.
    pub fn freespins_for(&self, game_type: GameType, scatters: usize) -> Option<u32> {
        let triggers = self.freespin_triggers.get(game_type)?;
        triggers
            .iter()
            .filter(|t| t.count <= scatters)
            .max_by_key(|t| t.count)
            .map(|t| t.spins)
    }

    /// Collector value table for `game_type`, distribution override first
    pub fn collector_values<'a>(
        &'a self,
        conditions: &'a DistributionConditions,
        game_type: GameType,
    ) -> Option<&'a [WeightedValue]> {
        conditions
            .mult_values
            .get(game_type)
            .or_else(|| self.collector.values.get(game_type))
            .map(Vec::as_slice)
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // PRESETS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Crazy Lab: 7×7 cluster pays with persistent spot multipliers and
    /// collector symbols
    pub fn crazy_lab() -> Self {
        const NUM_REELS: usize = 7;
        const STRIP_LENGTH: usize = 120;
        const WINCAP: f64 = 25_000.0;

        let symbols = SymbolRoles::default();

        // Sizes 5..=14 priced individually, 15..=49 share the top pay
        const PAYS: [(&str, [f64; 11]); 7] = [
            ("H1", [1.0, 1.5, 1.75, 2.0, 2.5, 5.0, 7.5, 15.0, 35.0, 70.0, 150.0]),
            ("H2", [0.75, 1.0, 1.25, 1.5, 2.0, 4.0, 6.0, 12.5, 30.0, 60.0, 100.0]),
            ("H3", [0.5, 0.75, 1.0, 1.25, 1.5, 3.0, 4.5, 10.0, 20.0, 40.0, 60.0]),
            ("L1", [0.4, 0.5, 0.75, 1.0, 1.25, 2.0, 3.0, 5.0, 10.0, 20.0, 40.0]),
            ("L2", [0.3, 0.4, 0.5, 0.75, 1.0, 1.5, 2.5, 3.5, 8.0, 15.0, 30.0]),
            ("L3", [0.25, 0.3, 0.4, 0.5, 0.75, 1.25, 2.0, 3.0, 6.0, 12.0, 25.0]),
            ("L4", [0.2, 0.25, 0.3, 0.4, 0.5, 1.0, 1.5, 2.5, 5.0, 10.0, 20.0]),
        ];
        let mut paytable = Vec::with_capacity(PAYS.len() * 11);
        for (symbol, pays) in PAYS {
            for (i, &pay) in pays.iter().enumerate() {
                let (min, max) = if i < 10 { (5 + i, 5 + i) } else { (15, 49) };
                paytable.push(PayRange::new(symbol, min, max, pay));
            }
        }

        const BASE_POOL: &[(&str, usize)] = &[
            ("H1", 2),
            ("H2", 2),
            ("H3", 3),
            ("L1", 4),
            ("L2", 4),
            ("L3", 5),
            ("L4", 5),
        ];
        const FREE_POOL: &[(&str, usize)] = &[
            ("H1", 3),
            ("H2", 3),
            ("H3", 3),
            ("L1", 4),
            ("L2", 4),
            ("L3", 4),
            ("L4", 4),
            ("W", 1),
        ];
        const WINCAP_POOL: &[(&str, usize)] = &[("H1", 6), ("W", 1)];

        let mut reels = BTreeMap::new();
        reels.insert(
            "BR0".to_string(),
            generate_stacked_strips(
                &symbols,
                NUM_REELS,
                &StripLayout {
                    pool: BASE_POOL,
                    length: STRIP_LENGTH,
                    scatter_every: 40,
                    collector_every: 30,
                },
            ),
        );
        reels.insert(
            "FR0".to_string(),
            generate_stacked_strips(
                &symbols,
                NUM_REELS,
                &StripLayout {
                    pool: FREE_POOL,
                    length: STRIP_LENGTH,
                    scatter_every: 60,
                    collector_every: 20,
                },
            ),
        );
        reels.insert(
            "WCAP".to_string(),
            generate_stacked_strips(
                &symbols,
                NUM_REELS,
                &StripLayout {
                    pool: WINCAP_POOL,
                    length: STRIP_LENGTH,
                    scatter_every: 0,
                    collector_every: 0,
                },
            ),
        );

        let triggers = vec![
            FreeSpinTrigger::new(3, 10),
            FreeSpinTrigger::new(4, 12),
            FreeSpinTrigger::new(5, 15),
            FreeSpinTrigger::new(6, 20),
            FreeSpinTrigger::new(7, 30),
        ];

        let collector_values = vec![
            WeightedValue::new(2, 10),
            WeightedValue::new(3, 20),
            WeightedValue::new(4, 30),
            WeightedValue::new(5, 20),
            WeightedValue::new(10, 20),
            WeightedValue::new(20, 20),
            WeightedValue::new(50, 10),
        ];

        let base_only = || ByGameType {
            basegame: Some(vec![WeightedReelSet::new("BR0", 1)]),
            freegame: None,
        };
        let with_free = |free: Vec<WeightedReelSet>| ByGameType {
            basegame: Some(vec![WeightedReelSet::new("BR0", 1)]),
            freegame: Some(free),
        };
        let scatters = |pairs: &[(usize, u32)]| -> Vec<WeightedCount> {
            pairs
                .iter()
                .map(|&(count, weight)| WeightedCount { count, weight })
                .collect()
        };

        let wincap_dist = |mult_values: ByGameType<Vec<WeightedValue>>| Distribution {
            criteria: "wincap".into(),
            quota: 0.0001,
            win_criteria: Some(WINCAP),
            conditions: DistributionConditions {
                reel_weights: with_free(vec![
                    WeightedReelSet::new("FR0", 1),
                    WeightedReelSet::new("WCAP", 5),
                ]),
                mult_values,
                scatter_triggers: scatters(&[(4, 1), (5, 2)]),
                force_wincap: true,
                force_freegame: true,
            },
        };
        let freegame_dist = |quota: f64| Distribution {
            criteria: "freegame".into(),
            quota,
            win_criteria: None,
            conditions: DistributionConditions {
                reel_weights: with_free(vec![WeightedReelSet::new("FR0", 1)]),
                mult_values: ByGameType::default(),
                scatter_triggers: scatters(&[(4, 5), (5, 1)]),
                force_wincap: false,
                force_freegame: true,
            },
        };
        let base_dist = |criteria: &str, quota: f64, win_criteria: Option<f64>| Distribution {
            criteria: criteria.into(),
            quota,
            win_criteria,
            conditions: DistributionConditions {
                reel_weights: base_only(),
                ..Default::default()
            },
        };

        let bet_modes = vec![
            BetMode {
                name: "base".into(),
                cost: 1.0,
                rtp: 0.97,
                max_win: WINCAP,
                is_feature: true,
                is_buybonus: false,
                feature_preseed_hits: None,
                distributions: vec![
                    wincap_dist(ByGameType::default()),
                    freegame_dist(0.002),
                    base_dist("0", 0.7, Some(0.0)),
                    base_dist("basegame", 0.2979, None),
                ],
            },
            BetMode {
                name: "bonus".into(),
                cost: 100.0,
                rtp: 0.97,
                max_win: WINCAP,
                is_feature: true,
                is_buybonus: false,
                feature_preseed_hits: None,
                distributions: vec![
                    wincap_dist(ByGameType::both(collector_values.clone())),
                    freegame_dist(0.01),
                ],
            },
            BetMode {
                name: "super_bonus".into(),
                cost: 500.0,
                rtp: 0.97,
                max_win: WINCAP,
                is_feature: true,
                is_buybonus: true,
                // Every cell starts the feature armed at the x2 spot multiplier
                feature_preseed_hits: Some(2),
                distributions: vec![
                    wincap_dist(ByGameType::both(collector_values.clone())),
                    freegame_dist(0.01),
                ],
            },
        ];

        Self {
            game_id: "crazy_lab".into(),
            working_name: "Crazy Lab".into(),
            num_reels: NUM_REELS,
            num_rows: vec![7; NUM_REELS],
            min_cluster_size: 5,
            paytable,
            maximum_board_mult: 1024,
            global_multiplier: 1,
            wincap: WINCAP,
            symbols,
            reels,
            freespin_triggers: ByGameType::both(triggers),
            collector: CollectorConfig {
                threshold: DEFAULT_COLLECTOR_THRESHOLD,
                values: ByGameType::both(collector_values),
            },
            bet_modes,
            max_attempts: None,
        }
    }
}

fn check_weights(what: &str, weights: impl Iterator<Item = u32>) -> Result<(), ConfigError> {
    let mut total = 0u64;
    for w in weights {
        if w == 0 {
            return Err(ConfigError::InvalidValue(format!("{what}: zero weight")));
        }
        total += u64::from(w);
    }
    if total == 0 {
        return Err(ConfigError::InvalidValue(format!("{what}: empty table")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crazy_lab_is_valid() {
        let config = GameConfig::crazy_lab();
        config.validate().unwrap();

        assert_eq!(config.num_rows, vec![7; 7]);
        assert_eq!(config.reels.len(), 3);
        assert!(config.reels.values().all(|strips| strips.len() == 7));

        let paytable = config.build_paytable().unwrap();
        assert_eq!(paytable.get(5, "H1"), Some(1.0));
        assert_eq!(paytable.get(14, "L4"), Some(10.0));
        assert_eq!(paytable.get(49, "H2"), Some(100.0));
        assert_eq!(paytable.get(4, "H1"), None);

        assert_eq!(
            config.bet_mode("super_bonus").and_then(|m| m.feature_preseed_hits),
            Some(2)
        );
        assert!(config.bet_mode("missing").is_none());
    }

    #[test]
    fn test_freespin_lookup_clamps() {
        let config = GameConfig::crazy_lab();
        assert_eq!(config.trigger_threshold(GameType::BaseGame), Some(3));
        assert_eq!(config.freespins_for(GameType::BaseGame, 2), None);
        assert_eq!(config.freespins_for(GameType::BaseGame, 3), Some(10));
        assert_eq!(config.freespins_for(GameType::BaseGame, 5), Some(15));
        assert_eq!(config.freespins_for(GameType::FreeGame, 9), Some(30));
    }

    #[test]
    fn test_collector_values_override() {
        let config = GameConfig::crazy_lab();
        let base = config.bet_mode("base").unwrap();
        let plain = &base.distribution("basegame").unwrap().conditions;
        assert_eq!(
            config.collector_values(plain, GameType::BaseGame).map(<[_]>::len),
            Some(7)
        );

        let mut overridden = plain.clone();
        overridden.mult_values.basegame = Some(vec![WeightedValue::new(100, 1)]);
        assert_eq!(
            config.collector_values(&overridden, GameType::BaseGame),
            Some(&[WeightedValue::new(100, 1)][..])
        );
    }

    #[test]
    fn test_json_round_trip() {
        let config = GameConfig::crazy_lab();
        let json = config.to_json().unwrap();
        let parsed = GameConfig::from_json(&json).unwrap();
        assert_eq!(parsed.game_id, config.game_id);
        assert_eq!(parsed.reels, config.reels);
        assert_eq!(parsed.freespin_triggers, config.freespin_triggers);
        assert_eq!(parsed.bet_modes.len(), 3);
        assert_eq!(
            parsed.build_paytable().unwrap().len(),
            config.build_paytable().unwrap().len()
        );
    }

    #[test]
    fn test_json_defaults() {
        let mut value = serde_json::to_value(GameConfig::crazy_lab()).unwrap();
        let object = value.as_object_mut().unwrap();
        for key in ["maximum_board_mult", "global_multiplier", "wincap", "collector", "symbols"] {
            object.remove(key);
        }
        let parsed = GameConfig::from_json(&value.to_string()).unwrap();
        assert_eq!(parsed.maximum_board_mult, 1024);
        assert_eq!(parsed.global_multiplier, 1);
        assert_eq!(parsed.wincap, 25_000.0);
        assert_eq!(parsed.collector.threshold, 4);
        assert_eq!(parsed.symbols, SymbolRoles::default());
    }

    #[test]
    fn test_validation_errors() {
        let mut config = GameConfig::crazy_lab();
        config.num_rows.pop();
        assert!(matches!(config.validate(), Err(ConfigError::InvalidGrid(_))));

        let mut config = GameConfig::crazy_lab();
        config.maximum_board_mult = 0;
        assert!(matches!(config.validate(), Err(ConfigError::InvalidValue(_))));

        let mut config = GameConfig::crazy_lab();
        config.reels.remove("WCAP");
        assert!(matches!(config.validate(), Err(ConfigError::MissingReelSet(_))));

        let mut config = GameConfig::crazy_lab();
        config.paytable.push(PayRange::new("H1", 5, 5, 9.0));
        assert!(matches!(config.validate(), Err(ConfigError::InvalidPaytable(_))));

        assert!(matches!(
            GameConfig::from_json("{ not json"),
            Err(ConfigError::Json(_))
        ));
    }
}
