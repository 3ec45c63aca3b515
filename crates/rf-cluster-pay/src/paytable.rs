//! Cluster paytable
//!
//! Pays are configured per cluster-size *range* and expanded once, at
//! configuration time, into one entry per size.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Pay value shared by a contiguous range of cluster sizes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PayRange {
    pub symbol: String,
    pub min_size: usize,
    pub max_size: usize,
    /// Pay in bet multiples
    pub pay: f64,
}

impl PayRange {
    pub fn new(symbol: impl Into<String>, min_size: usize, max_size: usize, pay: f64) -> Self {
        Self {
            symbol: symbol.into(),
            min_size,
            max_size,
            pay,
        }
    }
}

/// Expanded paytable: (cluster size, symbol) -> base pay
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PayTable {
    pays: HashMap<String, HashMap<usize, f64>>,
}

impl PayTable {
    /// Expand size ranges into individual sizes
    pub fn from_ranges(ranges: &[PayRange]) -> Result<Self, ConfigError> {
        let mut pays: HashMap<String, HashMap<usize, f64>> = HashMap::new();
        for range in ranges {
            if range.min_size == 0 || range.min_size > range.max_size {
                return Err(ConfigError::InvalidPaytable(format!(
                    "{}: bad size range {}..={}",
                    range.symbol, range.min_size, range.max_size
                )));
            }
            if !range.pay.is_finite() || range.pay < 0.0 {
                return Err(ConfigError::InvalidPaytable(format!(
                    "{}: bad pay {}",
                    range.symbol, range.pay
                )));
            }
            let sizes = pays.entry(range.symbol.clone()).or_default();
            for size in range.min_size..=range.max_size {
                if sizes.insert(size, range.pay).is_some() {
                    return Err(ConfigError::InvalidPaytable(format!(
                        "{}: size {} listed twice",
                        range.symbol, size
                    )));
                }
            }
        }
        Ok(Self { pays })
    }

    /// Base pay for a cluster of `size` cells of `symbol`
    pub fn get(&self, size: usize, symbol: &str) -> Option<f64> {
        self.pays.get(symbol)?.get(&size).copied()
    }

    /// Paying symbols, sorted
    pub fn symbols(&self) -> Vec<&str> {
        let mut symbols: Vec<&str> = self.pays.keys().map(String::as_str).collect();
        symbols.sort_unstable();
        symbols
    }

    /// Number of (size, symbol) entries
    pub fn len(&self) -> usize {
        self.pays.values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
