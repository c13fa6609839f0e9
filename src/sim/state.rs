//! Per-attempt session state
//!
//! Everything one level attempt needs lives in a [`Session`]: the physics
//! world, the counters shown on the HUD, the clear sequencer and the
//! pending win timer. Dropping the session releases all of it.

use glam::Vec2;

use super::clear::{LevelClear, WinTimer};
use super::effects::Effects;
use super::player;
use super::shape::Shape;
use super::world::{Body, BodyDef, BodyId, BodyKind, PhysicsWorld};
use crate::GridCoord;
use crate::consts::TILE_SIZE;
use crate::error::LevelError;
use crate::level::{Level, LevelLayout};
use crate::tuning::Tuning;

/// Something that happened during a tick, for the orchestrator and the
/// presentation layer
#[derive(Debug, Clone, PartialEq)]
pub enum GameEvent {
    CoinCollected { coin: BodyId, remaining: u32 },
    BlockPlaced { cell: GridCoord, remaining: u32 },
    BlocksEliminated { cells: Vec<GridCoord> },
    /// Win condition met; the completion callback is due after the delay
    LevelCleared { coins_total: u32 },
    PlayerFell { reason: String },
}

/// State of a single level attempt
#[derive(Debug)]
pub struct Session {
    pub level_id: u32,
    pub tuning: Tuning,
    pub world: PhysicsWorld,
    pub player: BodyId,
    pub spawn: Vec2,
    /// Playfield size in pixels
    pub playfield: Vec2,
    /// Coins in the level at load time
    pub coins_total: u32,
    pub coins_remaining: u32,
    pub block_limit: u32,
    pub blocks_remaining: u32,
    /// Foot sensor touches solid ground
    pub grounded: bool,
    /// Player fell out of the playfield (one-shot)
    pub fallen: bool,
    pub clear: LevelClear,
    pub win_timer: Option<WinTimer>,
    /// Simulation tick counter
    pub time_ticks: u64,
    /// Visual particles (not gameplay-affecting)
    pub effects: Effects,
    events: Vec<GameEvent>,
}

impl Session {
    /// Build the world for a level. Fails if the grid is unplayable.
    pub fn new(level: &Level, tuning: Tuning, seed: u64) -> Result<Self, LevelError> {
        let layout = LevelLayout::parse(level)?;

        let mut world = PhysicsWorld::new(tuning.gravity());
        world.add_all(layout.placements.iter().map(|p| p.body_def()));
        world.add(death_plane_def(&layout));
        let player = world.add(player::player_def(layout.spawn, &tuning));

        log::info!(
            "Level {} '{}' loaded: {} bodies, {} coins, {} blocks",
            level.id,
            level.name,
            world.bodies().len(),
            layout.coin_total,
            level.block_limit
        );

        Ok(Self {
            level_id: level.id,
            effects: Effects::new(seed, tuning.max_particles),
            tuning,
            world,
            player,
            spawn: layout.spawn,
            playfield: Vec2::new(layout.width(), layout.height()),
            coins_total: layout.coin_total,
            coins_remaining: layout.coin_total,
            block_limit: level.block_limit,
            blocks_remaining: level.block_limit,
            grounded: false,
            fallen: false,
            clear: LevelClear::default(),
            win_timer: None,
            time_ticks: 0,
            events: Vec::new(),
        })
    }

    pub fn player_body(&self) -> Option<&Body> {
        self.world.body(self.player)
    }

    pub fn player_position(&self) -> Option<Vec2> {
        self.player_body().map(|b| b.position)
    }

    /// Coins still present in the world, counted from the bodies themselves
    pub fn live_coins(&self) -> u32 {
        self.world.count(|b| b.kind == BodyKind::Coin) as u32
    }

    #[inline]
    pub fn is_clearing(&self) -> bool {
        self.clear.is_clearing()
    }

    pub fn push_event(&mut self, event: GameEvent) {
        self.events.push(event);
    }

    /// Take all events emitted since the last call
    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }

    /// Y coordinate past which the player is lost
    pub fn fall_threshold(&self) -> f32 {
        self.playfield.y + self.tuning.fall_margin
    }
}

/// Catch-all floor below the playfield. Its top sits two tiles under the
/// playfield so a falling player crosses the fall threshold first.
fn death_plane_def(layout: &LevelLayout) -> BodyDef {
    let width = layout.width() + 200.0;
    let top = layout.height() + 2.0 * TILE_SIZE;
    BodyDef::fixed(
        BodyKind::DeathPlane,
        Vec2::new(layout.width() / 2.0, top + 200.0),
        Shape::rect(width, 400.0),
        false,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn room() -> Level {
        Level {
            id: 1,
            name: "Room".to_string(),
            grid: ["#####", "#P..#", "#.o.#", "#..C#", "#####"]
                .iter()
                .map(|r| r.to_string())
                .collect(),
            block_limit: 2,
            par: None,
        }
    }

    #[test]
    fn test_session_counters_start_from_level() {
        let session = Session::new(&room(), Tuning::default(), 7).unwrap();
        assert_eq!(session.coins_total, 1);
        assert_eq!(session.coins_remaining, 1);
        assert_eq!(session.live_coins(), 1);
        assert_eq!(session.blocks_remaining, 2);
        assert_eq!(session.player_position(), Some(Vec2::new(60.0, 60.0)));
        assert_eq!(session.playfield, Vec2::new(200.0, 200.0));
        assert!(!session.is_clearing());
    }

    #[test]
    fn test_session_has_one_player_and_a_death_plane() {
        let session = Session::new(&room(), Tuning::default(), 7).unwrap();
        assert_eq!(session.world.count(|b| b.kind == BodyKind::Player), 1);
        let plane = session
            .world
            .bodies()
            .iter()
            .find(|b| b.kind == BodyKind::DeathPlane)
            .unwrap();
        let top = plane.position.y - plane.parts[0].shape.half_extents().y;
        assert!(top > session.fall_threshold());
    }

    #[test]
    fn test_unplayable_level_fails_to_start() {
        let mut level = room();
        level.grid[1] = "#...#".to_string();
        assert!(matches!(
            Session::new(&level, Tuning::default(), 0),
            Err(LevelError::MissingSpawn)
        ));
    }
}
