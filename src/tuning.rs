//! Data-driven game balance
//!
//! Every field has a default that reproduces the intended feel; a JSON
//! document can override any subset of them.

use serde::{Deserialize, Serialize};

use crate::consts::TILE_SIZE;
use crate::error::TuningError;

/// Gameplay feel and rule parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tuning {
    // === Physics ===
    /// Engine default gravity (pixels/s², +y is down)
    pub base_gravity: f32,
    /// Multiplier on base gravity for a snappier jump
    pub gravity_scale: f32,
    /// Fraction of velocity lost per 1/60 s while airborne (player only)
    pub air_drag: f32,

    // === Player ===
    /// Horizontal speed while a direction is held (pixels/s)
    pub move_speed: f32,
    /// Upward launch speed of a jump (pixels/s), clears exactly one tile
    pub jump_speed: f32,
    /// Jump only fires while vertical velocity is in `[0, jump_velocity_band)`
    pub jump_velocity_band: f32,
    /// Distance below the playfield at which the player is lost
    pub fall_margin: f32,

    // === Blocks ===
    /// Maximum distance, in tiles, between player and a placed block
    pub placement_range_tiles: f32,
    /// Elimination scan runs every N ticks
    pub elimination_interval_ticks: u64,
    /// Minimum run length that gets eliminated
    pub elimination_run: usize,

    // === Level clear ===
    /// Wall-clock delay between the win condition and the completion callback
    pub win_delay_ms: f64,

    // === Effects ===
    pub celebration_particles: usize,
    pub debris_particles_per_block: usize,
    pub placement_particles: usize,
    pub max_particles: usize,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            base_gravity: 1000.0,
            gravity_scale: 1.5,
            air_drag: 0.05,

            move_speed: 180.0,
            jump_speed: 540.0,
            jump_velocity_band: 60.0,
            fall_margin: 50.0,

            placement_range_tiles: 6.0,
            elimination_interval_ticks: 15,
            elimination_run: 4,

            win_delay_ms: 2500.0,

            celebration_particles: 80,
            debris_particles_per_block: 12,
            placement_particles: 8,
            max_particles: 600,
        }
    }
}

impl Tuning {
    /// Parse overrides from JSON; missing fields keep their defaults
    pub fn from_json(json: &str) -> Result<Self, TuningError> {
        let tuning = serde_json::from_str(json)?;
        Ok(tuning)
    }

    /// Effective downward acceleration
    #[inline]
    pub fn gravity(&self) -> f32 {
        self.base_gravity * self.gravity_scale
    }

    /// Placement range in pixels
    #[inline]
    pub fn placement_range(&self) -> f32 {
        self.placement_range_tiles * TILE_SIZE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_override_keeps_defaults() {
        let tuning = Tuning::from_json(r#"{ "move_speed": 200.0, "win_delay_ms": 10 }"#).unwrap();
        assert_eq!(tuning.move_speed, 200.0);
        assert_eq!(tuning.win_delay_ms, 10.0);
        assert_eq!(tuning.jump_speed, Tuning::default().jump_speed);
        assert_eq!(tuning.elimination_run, 4);
    }

    #[test]
    fn test_malformed_tuning_is_an_error() {
        assert!(Tuning::from_json("{ move_speed: }").is_err());
        assert!(Tuning::from_json(r#"{ "move_speed": "fast" }"#).is_err());
    }

    #[test]
    fn test_gravity_is_scaled() {
        let tuning = Tuning::default();
        assert!((tuning.gravity() - 1500.0).abs() < 0.001);
    }
}
