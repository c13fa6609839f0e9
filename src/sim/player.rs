//! Player body and per-tick controller
//!
//! The player is a single dynamic body made of a solid hull and a foot
//! sensor slightly below it. Ground state is queried from the sensor every
//! tick rather than accumulated from contact events.

use glam::Vec2;

use super::shape::Shape;
use super::state::{GameEvent, Session};
use super::tick::TickInput;
use super::world::{BodyDef, BodyKind, Part, PartRef, PartRole};
use crate::consts::TILE_SIZE;
use crate::tuning::Tuning;

/// Reason reported when the player drops out of the playfield
pub const FALL_REASON: &str = "You fell into the endless abyss!";

/// Compound player body at `spawn`: rotation locked, frictionless
pub fn player_def(spawn: Vec2, tuning: &Tuning) -> BodyDef {
    let hull = TILE_SIZE * 0.7;
    BodyDef {
        kind: BodyKind::Player,
        position: spawn,
        is_static: false,
        air_drag: tuning.air_drag,
        friction: 0.0,
        parts: vec![
            Part {
                role: PartRole::Hull,
                offset: Vec2::ZERO,
                shape: Shape::square(hull),
                sensor: false,
            },
            Part {
                role: PartRole::FootSensor,
                offset: Vec2::new(0.0, TILE_SIZE * 0.35),
                shape: Shape::rect(TILE_SIZE * 0.5, 5.0),
                sensor: true,
            },
        ],
    }
}

/// Whether the foot sensor overlaps any solid part of another body
pub fn query_grounded(session: &Session) -> bool {
    session
        .player_body()
        .and_then(|b| b.part_index(PartRole::FootSensor))
        .is_some_and(|foot| {
            session.world.part_overlaps_solid(PartRef {
                body: session.player,
                part: foot,
            })
        })
}

/// Apply one tick of player control before the physics step
///
/// Returns false when the regular per-tick logic must not run: the level is
/// clearing (player frozen) or the player is gone or already fell.
pub fn control(session: &mut Session, input: &TickInput) -> bool {
    let player = session.player;
    let Some(body) = session.player_body() else {
        return false;
    };
    let (position, velocity, frozen) = (body.position, body.velocity, body.is_static);

    if session.is_clearing() {
        let vy = if velocity.y > 0.0 { 0.0 } else { velocity.y };
        session.world.set_velocity(player, Vec2::new(0.0, vy));
        return false;
    }
    if frozen {
        return false;
    }

    if position.y > session.fall_threshold() {
        session.world.freeze(player);
        session.fallen = true;
        session.grounded = false;
        log::info!("Player fell out of level {}", session.level_id);
        session.push_event(GameEvent::PlayerFell {
            reason: FALL_REASON.to_string(),
        });
        return false;
    }

    session.grounded = query_grounded(session);
    let tuning = &session.tuning;

    // Holding both directions cancels out
    let direction = input.right as i8 - input.left as i8;
    let vx = direction as f32 * tuning.move_speed;

    let vy = if input.jump && session.grounded && (0.0..tuning.jump_velocity_band).contains(&velocity.y) {
        -tuning.jump_speed
    } else {
        velocity.y
    };

    session.world.set_velocity(player, Vec2::new(vx, vy));
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::SIM_DT;
    use crate::level::Level;

    fn corridor(rows: &[&str]) -> Session {
        let level = Level {
            id: 3,
            name: "Corridor".to_string(),
            grid: rows.iter().map(|r| r.to_string()).collect(),
            block_limit: 0,
            par: None,
        };
        Session::new(&level, Tuning::default(), 1).unwrap()
    }

    fn settle(session: &mut Session) {
        for _ in 0..90 {
            control(session, &TickInput::default());
            session.world.step(SIM_DT);
        }
    }

    #[test]
    fn test_player_lands_and_is_grounded() {
        let mut session = corridor(&["#####", "#P..#", "#####"]);
        settle(&mut session);
        assert!(query_grounded(&session));
        let body = session.player_body().unwrap();
        // Floor row top at y=80, hull half height 14
        assert!((body.position.y - 66.0).abs() < 0.5, "y = {}", body.position.y);
        assert_eq!(body.velocity.y, 0.0);
    }

    #[test]
    fn test_airborne_jump_leaves_vertical_velocity_alone() {
        let mut session = corridor(&["#####", "#P..#", "#...#", "#...#", "#####"]);
        let player = session.player;
        let jump = TickInput { jump: true, ..TickInput::default() };

        session.world.set_velocity(player, Vec2::new(0.0, 200.0));
        assert!(control(&mut session, &jump));
        assert!(!session.grounded);
        assert_eq!(session.player_body().unwrap().velocity.y, 200.0);

        // Rising through the apex band does not re-trigger either
        session.world.set_velocity(player, Vec2::new(0.0, 30.0));
        control(&mut session, &jump);
        assert_eq!(session.player_body().unwrap().velocity.y, 30.0);
    }

    #[test]
    fn test_grounded_jump_sets_upward_velocity() {
        let mut session = corridor(&["#####", "#P..#", "#####"]);
        settle(&mut session);
        let jump = TickInput { jump: true, ..TickInput::default() };
        control(&mut session, &jump);
        assert_eq!(session.player_body().unwrap().velocity.y, -session.tuning.jump_speed);
    }

    #[test]
    fn test_horizontal_intent_sets_velocity() {
        let mut session = corridor(&["#####", "#P..#", "#####"]);
        settle(&mut session);
        control(&mut session, &TickInput { left: true, ..TickInput::default() });
        assert_eq!(session.player_body().unwrap().velocity.x, -180.0);
        control(&mut session, &TickInput { right: true, ..TickInput::default() });
        assert_eq!(session.player_body().unwrap().velocity.x, 180.0);
        control(&mut session, &TickInput { left: true, right: true, jump: false });
        assert_eq!(session.player_body().unwrap().velocity.x, 0.0);
        control(&mut session, &TickInput::default());
        assert_eq!(session.player_body().unwrap().velocity.x, 0.0);
    }

    #[test]
    fn test_clearing_freezes_player() {
        let mut session = corridor(&["#####", "#P..#", "#...#", "#####"]);
        let player = session.player;
        session.clear.begin(0);
        session.world.set_velocity(player, Vec2::new(120.0, 300.0));
        let ran = control(&mut session, &TickInput { right: true, ..TickInput::default() });
        assert!(!ran);
        assert_eq!(session.player_body().unwrap().velocity, Vec2::ZERO);

        // Rising velocity is kept
        session.world.set_velocity(player, Vec2::new(0.0, -200.0));
        control(&mut session, &TickInput::default());
        assert_eq!(session.player_body().unwrap().velocity.y, -200.0);
    }

    #[test]
    fn test_falling_out_freezes_player_once() {
        let mut session = corridor(&["#P#"]);
        let below = Vec2::new(60.0, session.fall_threshold() + 1.0);
        session.world.teleport(session.player, below);
        assert!(!control(&mut session, &TickInput::default()));
        assert!(session.fallen);
        assert!(session.player_body().unwrap().is_static);

        control(&mut session, &TickInput::default());
        let falls = session
            .drain_events()
            .into_iter()
            .filter(|e| matches!(e, GameEvent::PlayerFell { .. }))
            .count();
        assert_eq!(falls, 1);
    }
}
