//! Block placement and the per-level block budget

use glam::Vec2;

use super::state::{GameEvent, Session};
use super::world::{BodyDef, BodyId, BodyKind};
use crate::GridCoord;
use crate::level::block_shape;

/// Why a placement request was ignored
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaceRejection {
    NoBlocksLeft,
    Clearing,
    NoPlayer,
    OutOfRange,
    Occupied,
}

/// Try to place a block in the cell under `target` (world pixels)
///
/// Rejections are silent no-ops for the caller; they are only logged.
pub fn place_block(session: &mut Session, target: Vec2) -> Result<BodyId, PlaceRejection> {
    let result = try_place(session, target);
    if let Err(reason) = result {
        log::debug!("Block placement at ({:.0}, {:.0}) rejected: {:?}", target.x, target.y, reason);
    }
    result
}

fn try_place(session: &mut Session, target: Vec2) -> Result<BodyId, PlaceRejection> {
    if session.blocks_remaining == 0 {
        return Err(PlaceRejection::NoBlocksLeft);
    }
    if session.is_clearing() || session.clear.is_completed() {
        return Err(PlaceRejection::Clearing);
    }
    let player = session.player_position().ok_or(PlaceRejection::NoPlayer)?;

    let cell = GridCoord::containing(target);
    let center = cell.center();
    if player.distance(center) > session.tuning.placement_range() {
        return Err(PlaceRejection::OutOfRange);
    }
    if session.world.body_at(center).is_some() {
        return Err(PlaceRejection::Occupied);
    }

    let id = session.world.add(BodyDef::fixed(
        BodyKind::Block { placed: true },
        center,
        block_shape(),
        false,
    ));
    session.blocks_remaining -= 1;
    log::debug!("Placed block at {:?}, {} left", cell, session.blocks_remaining);
    let burst = session.tuning.placement_particles;
    session.effects.placement(center, burst);
    session.push_event(GameEvent::BlockPlaced {
        cell,
        remaining: session.blocks_remaining,
    });
    Ok(id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::TILE_SIZE;
    use crate::level::Level;
    use crate::tuning::Tuning;

    fn session(grid: &[&str], blocks: u32) -> Session {
        let level = Level {
            id: 2,
            name: "Builder".to_string(),
            grid: grid.iter().map(|r| r.to_string()).collect(),
            block_limit: blocks,
            par: None,
        };
        Session::new(&level, Tuning::default(), 9).unwrap()
    }

    const WIDE: [&str; 4] = [
        "################",
        "#P.............#",
        "#..............#",
        "################",
    ];

    #[test]
    fn test_block_snaps_to_cell_center() {
        let mut session = session(&WIDE, 2);
        let id = place_block(&mut session, Vec2::new(125.0, 95.0)).unwrap();
        let body = session.world.body(id).unwrap();
        assert_eq!(body.position, Vec2::new(140.0, 100.0));
        assert_eq!(body.kind, BodyKind::Block { placed: true });
        assert!(body.is_static);
        assert_eq!(session.blocks_remaining, 1);
        assert_eq!(session.effects.particles().len(), 8);
    }

    #[test]
    fn test_budget_runs_out() {
        let mut session = session(&WIDE, 1);
        assert!(place_block(&mut session, Vec2::new(100.0, 100.0)).is_ok());
        assert_eq!(
            place_block(&mut session, Vec2::new(140.0, 100.0)),
            Err(PlaceRejection::NoBlocksLeft)
        );
        assert_eq!(session.blocks_remaining, 0);
    }

    #[test]
    fn test_occupied_cells_are_rejected() {
        let mut session = session(&WIDE, 3);
        // Wall cell
        assert_eq!(place_block(&mut session, Vec2::new(20.0, 20.0)), Err(PlaceRejection::Occupied));
        // Cell holding the player
        assert_eq!(place_block(&mut session, Vec2::new(60.0, 60.0)), Err(PlaceRejection::Occupied));
        assert!(place_block(&mut session, Vec2::new(100.0, 100.0)).is_ok());
        assert_eq!(place_block(&mut session, Vec2::new(110.0, 90.0)), Err(PlaceRejection::Occupied));
        assert_eq!(session.blocks_remaining, 2);
    }

    #[test]
    fn test_range_is_six_tiles() {
        let mut session = session(&WIDE, 3);
        // Player at (60, 60); cell (7, 1) center is (300, 60): exactly 6 tiles
        assert!(place_block(&mut session, Vec2::new(300.0, 60.0)).is_ok());
        // Cell (8, 1) is 6.5 tiles away
        assert_eq!(
            place_block(&mut session, Vec2::new(8.0 * TILE_SIZE + 1.0, 60.0)),
            Err(PlaceRejection::OutOfRange)
        );
        assert_eq!(session.blocks_remaining, 2);
    }

    #[test]
    fn test_no_placement_while_clearing() {
        let mut session = session(&WIDE, 3);
        session.clear.begin(0);
        assert_eq!(place_block(&mut session, Vec2::new(100.0, 100.0)), Err(PlaceRejection::Clearing));
        assert_eq!(session.blocks_remaining, 3);
    }
}
