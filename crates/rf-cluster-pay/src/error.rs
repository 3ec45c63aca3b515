//! Error types for the cluster-pay engine

use thiserror::Error;

use crate::board::Position;
use crate::context::GameType;

/// Configuration errors, raised while loading or validating a [`GameConfig`].
///
/// [`GameConfig`]: crate::config::GameConfig
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("JSON parse error: {0}")]
    Json(String),

    #[error("Invalid grid: {0}")]
    InvalidGrid(String),

    #[error("Invalid paytable: {0}")]
    InvalidPaytable(String),

    #[error("Invalid value: {0}")]
    InvalidValue(String),

    #[error("Missing reel set: {0}")]
    MissingReelSet(String),
}

/// Errors that abort the current run.
///
/// These are contract violations by a collaborator (board, cluster finder)
/// or a lookup of something the configuration never declared.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    #[error("Position out of bounds: reel {}, row {}", .0.reel, .0.row)]
    PositionOutOfBounds(Position),

    #[error("Collector symbol at reel {}, row {} has no instance identity", .0.reel, .0.row)]
    UnresolvedCollector(Position),

    #[error("Unknown bet mode: {0}")]
    UnknownBetMode(String),

    #[error("Unknown criteria '{criteria}' for bet mode '{mode}'")]
    UnknownCriteria { mode: String, criteria: String },

    #[error("Missing reel set: {0}")]
    MissingReelSet(String),

    #[error("No reel weights configured for {0:?}")]
    NoReelWeights(GameType),

    #[error("Board draw exhausted after {0} attempts")]
    DrawExhausted(u32),

    #[error("Sim {sim_id} rejected {attempts} attempts")]
    RetryLimitExceeded { sim_id: u64, attempts: u32 },

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Result type alias
pub type EngineResult<T> = Result<T, EngineError>;
