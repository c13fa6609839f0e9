//! Error types
//!
//! Only level start-up can fail. Everything inside a tick degrades to a no-op.

use thiserror::Error;

use crate::GridCoord;

/// Why a level could not be started
#[derive(Debug, Error)]
pub enum LevelError {
    #[error("level grid has no rows")]
    EmptyGrid,

    #[error("row {row} has {found} cells, expected {expected}")]
    RaggedRow {
        row: usize,
        expected: usize,
        found: usize,
    },

    #[error("level grid has no player spawn ('P')")]
    MissingSpawn,

    #[error("level grid has more than one player spawn (at {first:?} and {second:?})")]
    MultipleSpawns { first: GridCoord, second: GridCoord },

    #[error("malformed level catalog: {0}")]
    Catalog(#[from] serde_json::Error),
}

/// Malformed tuning document
#[derive(Debug, Error)]
#[error("malformed tuning: {0}")]
pub struct TuningError(#[from] pub serde_json::Error);

/// Advice text could not be fetched
#[derive(Debug, Error)]
pub enum AdviceError {
    #[error("advice service is not configured")]
    Unavailable,

    #[error("advice request failed: {0}")]
    Request(String),
}
