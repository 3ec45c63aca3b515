//! # rf-cluster-pay: Cascading cluster-pay engine
//!
//! Finds paying clusters on a revealed grid, prices them with a paytable and
//! persistent per-cell spot multipliers, banks collector symbols once per
//! spin, and tumbles until the board stops paying.
//!
//! ## Features
//!
//! - **Spot multipliers**: Cells escalate ×2, ×4, ×8 … the more often they explode
//! - **Collectors**: Non-exploding symbols that pay once per spin above a threshold
//! - **Free spins**: Hit grid persists through the feature, optionally pre-armed
//! - **Criteria retries**: Each simulation repeats until it matches its distribution
//! - **Books**: Ordered, serde-tagged event stream per accepted simulation
//!
//! ## Architecture
//!
//! ```text
//! CascadeEngine
//!     │
//!     ├── BoardSource          (reel strips → Board, tumble refills)
//!     ├── ClusterFinder        (Board → ClusterMap)
//!     ├── WinEvaluator         (ClusterMap × HitGrid × PayTable → WinRecord)
//!     ├── SpecialSymbolPolicy  (collectors: assign → collect → finalize)
//!     └── GridPersistence      (base: reset every spin, free: persist)
//!           │
//!           v
//!     SpinContext (fresh per attempt) → Book
//! ```

pub mod board;
pub mod book;
pub mod cluster;
pub mod collector;
pub mod config;
pub mod context;
pub mod distribution;
pub mod engine;
pub mod error;
pub mod evaluate;
pub mod multiplier;
pub mod paytable;
pub mod symbols;
pub mod wins;

pub use board::*;
pub use book::*;
pub use cluster::*;
pub use collector::*;
pub use config::*;
pub use context::*;
pub use distribution::*;
pub use engine::*;
pub use error::*;
pub use evaluate::*;
pub use multiplier::*;
pub use paytable::*;
pub use symbols::*;
pub use wins::*;
