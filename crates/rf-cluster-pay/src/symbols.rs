//! Symbol roles and reel strips

use serde::{Deserialize, Serialize};

/// Symbol type classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SymbolType {
    /// Regular paying symbol
    Regular,
    /// Wild - assists cluster matching, never pays on its own
    Wild,
    /// Scatter - triggers free spins regardless of position
    Scatter,
    /// Collector - non-exploding, banks a value for the spin
    Collector,
}

/// Names of the special symbols used on the strips.
///
/// Anything not listed here is a regular paying symbol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolRoles {
    #[serde(default)]
    pub wild: Vec<String>,
    #[serde(default)]
    pub scatter: Vec<String>,
    #[serde(default)]
    pub collector: Vec<String>,
}

impl SymbolRoles {
    /// Classify a symbol name
    pub fn classify(&self, name: &str) -> SymbolType {
        if self.is_wild(name) {
            SymbolType::Wild
        } else if self.is_scatter(name) {
            SymbolType::Scatter
        } else if self.is_collector(name) {
            SymbolType::Collector
        } else {
            SymbolType::Regular
        }
    }

    pub fn is_wild(&self, name: &str) -> bool {
        self.wild.iter().any(|s| s == name)
    }

    pub fn is_scatter(&self, name: &str) -> bool {
        self.scatter.iter().any(|s| s == name)
    }

    pub fn is_collector(&self, name: &str) -> bool {
        self.collector.iter().any(|s| s == name)
    }

    /// Check if a symbol can seed a paying cluster
    pub fn is_regular(&self, name: &str) -> bool {
        self.classify(name) == SymbolType::Regular
    }
}

impl Default for SymbolRoles {
    fn default() -> Self {
        Self {
            wild: vec!["W".into()],
            scatter: vec!["S".into()],
            collector: vec!["C".into()],
        }
    }
}

/// A virtual reel strip
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReelStrip {
    /// Symbol names in order
    pub symbols: Vec<String>,
}

impl ReelStrip {
    /// Create a new reel strip
    pub fn new(symbols: Vec<String>) -> Self {
        Self { symbols }
    }

    /// Get symbol at position (wraps around)
    pub fn symbol_at(&self, position: usize) -> &str {
        if self.symbols.is_empty() {
            return "";
        }
        &self.symbols[position % self.symbols.len()]
    }

    /// Get total strip length
    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// Strip positions holding `symbol`
    pub fn positions_of(&self, symbol: &str) -> Vec<usize> {
        self.symbols
            .iter()
            .enumerate()
            .filter(|(_, s)| s.as_str() == symbol)
            .map(|(i, _)| i)
            .collect()
    }
}

/// Layout rule for [`generate_stacked_strips`]
#[derive(Debug, Clone)]
pub struct StripLayout<'a> {
    /// Paying symbols with their relative frequency
    pub pool: &'a [(&'a str, usize)],
    /// Strip length
    pub length: usize,
    /// Insert the scatter every N positions (0 = none)
    pub scatter_every: usize,
    /// Insert the collector every N positions (0 = none)
    pub collector_every: usize,
}

/// Generate stacked reel strips for the built-in presets.
///
/// Paying symbols come in stacks of two or three so clusters form across
/// neighbouring reels. Each reel walks the pool with a different offset.
pub fn generate_stacked_strips(
    roles: &SymbolRoles,
    reel_count: usize,
    layout: &StripLayout<'_>,
) -> Vec<ReelStrip> {
    let pool: Vec<&str> = layout
        .pool
        .iter()
        .flat_map(|&(name, freq)| std::iter::repeat_n(name, freq))
        .collect();
    let scatter = roles.scatter.first().map(String::as_str);
    let collector = roles.collector.first().map(String::as_str);

    (0..reel_count)
        .map(|reel| {
            let mut symbols = Vec::with_capacity(layout.length);
            let mut block = 0usize;
            while symbols.len() < layout.length && !pool.is_empty() {
                let name = pool[(block * 7 + reel * 5) % pool.len()];
                let stack = 2 + (block + reel) % 2;
                for _ in 0..stack {
                    let i = symbols.len();
                    if i >= layout.length {
                        break;
                    }
                    let special = match (scatter, collector) {
                        (Some(s), _)
                            if layout.scatter_every > 0
                                && i % layout.scatter_every == layout.scatter_every / 2 =>
                        {
                            Some(s)
                        }
                        (_, Some(c))
                            if layout.collector_every > 0
                                && (i + reel) % layout.collector_every == 0 =>
                        {
                            Some(c)
                        }
                        _ => None,
                    };
                    symbols.push(special.unwrap_or(name).to_string());
                }
                block += 1;
            }
            ReelStrip::new(symbols)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify() {
        let roles = SymbolRoles::default();
        assert_eq!(roles.classify("W"), SymbolType::Wild);
        assert_eq!(roles.classify("S"), SymbolType::Scatter);
        assert_eq!(roles.classify("C"), SymbolType::Collector);
        assert_eq!(roles.classify("H1"), SymbolType::Regular);
        assert!(roles.is_regular("L4"));
    }

    #[test]
    fn test_reel_strip_wrap() {
        let strip = ReelStrip::new(vec!["A".into(), "B".into(), "C".into()]);
        assert_eq!(strip.symbol_at(0), "A");
        assert_eq!(strip.symbol_at(3), "A");
        assert_eq!(strip.symbol_at(5), "C");
        assert_eq!(ReelStrip::new(Vec::new()).symbol_at(4), "");
    }

    #[test]
    fn test_stacked_strips() {
        let roles = SymbolRoles::default();
        let layout = StripLayout {
            pool: &[("H1", 1), ("L1", 3)],
            length: 60,
            scatter_every: 30,
            collector_every: 20,
        };
        let strips = generate_stacked_strips(&roles, 3, &layout);
        assert_eq!(strips.len(), 3);
        for strip in &strips {
            assert_eq!(strip.len(), 60);
            assert_eq!(strip.positions_of("S").len(), 2);
            assert!(!strip.positions_of("C").is_empty());
        }
    }
}
