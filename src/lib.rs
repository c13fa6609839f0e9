//! Erase Box - A tile-based puzzle platformer
//!
//! Core modules:
//! - `level`: Level grid parsing into body placement requests
//! - `sim`: Level simulation (physics world, player, interactions, blocks)
//! - `game`: Per-frame loop, lifecycle and observer callbacks
//! - `tuning`: Data-driven game balance
//! - `advice`: Post-win advice text with canned fallback

pub mod advice;
pub mod error;
pub mod game;
pub mod level;
pub mod sim;
pub mod tuning;

pub use error::{AdviceError, LevelError, TuningError};
pub use game::{Game, GameObserver, Hud};
pub use level::{Level, LevelLayout};
pub use tuning::Tuning;

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Game configuration constants
pub mod consts {
    /// Fixed simulation timestep (60 Hz, the cadence the feel was tuned at)
    pub const SIM_DT: f32 = 1.0 / 60.0;
    /// Maximum substeps per frame to prevent spiral of death
    pub const MAX_SUBSTEPS: u32 = 8;

    /// Edge length of one grid cell in pixels
    pub const TILE_SIZE: f32 = 40.0;
}

use consts::TILE_SIZE;

/// Integer cell coordinate on the level grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct GridCoord {
    pub col: i32,
    pub row: i32,
}

impl GridCoord {
    pub const fn new(col: i32, row: i32) -> Self {
        Self { col, row }
    }

    /// Cell containing a world point (floor division by tile size)
    #[inline]
    pub fn containing(point: Vec2) -> Self {
        Self {
            col: (point.x / TILE_SIZE).floor() as i32,
            row: (point.y / TILE_SIZE).floor() as i32,
        }
    }

    /// Cell whose center is nearest to a world point
    ///
    /// Used for bodies that are already grid-aligned, where it is robust
    /// against float drift right at the center.
    #[inline]
    pub fn nearest_center(point: Vec2) -> Self {
        Self {
            col: (point.x / TILE_SIZE - 0.5).round() as i32,
            row: (point.y / TILE_SIZE - 0.5).round() as i32,
        }
    }

    /// World position of this cell's center
    #[inline]
    pub fn center(self) -> Vec2 {
        Vec2::new(
            self.col as f32 * TILE_SIZE + TILE_SIZE / 2.0,
            self.row as f32 * TILE_SIZE + TILE_SIZE / 2.0,
        )
    }

    #[inline]
    pub fn offset(self, dcol: i32, drow: i32) -> Self {
        Self::new(self.col + dcol, self.row + drow)
    }
}

/// Snap a world point to the center of its enclosing cell
#[inline]
pub fn snap_to_grid(point: Vec2) -> Vec2 {
    GridCoord::containing(point).center()
}
