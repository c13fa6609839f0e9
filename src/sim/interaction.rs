//! Contact resolution: coins and the chest
//!
//! Each contact names two parts. A player part stands for the player body,
//! so a coin picked up by the foot sensor counts the same as one hit by the
//! hull. Bodies removed earlier in the batch are skipped.
//!
//! Coins are handled before the chest, so touching the last coin and the
//! chest in the same step clears the level.

use super::clear;
use super::state::{GameEvent, Session};
use super::world::{BodyKind, Contact, PartRef, PartRole};

/// Apply the gameplay effects of contacts that began this step
pub fn resolve_contacts(session: &mut Session, contacts: &[Contact]) {
    if session.fallen {
        return;
    }

    for contact in contacts {
        note_ground_contact(session, contact);
    }

    let touched: Vec<PartRef> = contacts
        .iter()
        .filter_map(|contact| player_other(session, contact))
        .collect();

    for &other in &touched {
        if session.world.body(other.body).is_some_and(|b| b.kind == BodyKind::Coin) {
            collect_coin(session, other);
        }
    }

    for &other in &touched {
        let Some(body) = session.world.body(other.body) else {
            continue;
        };
        if body.kind == BodyKind::Chest {
            let position = body.position;
            clear::on_chest_touched(session, position);
        }
    }
}

/// The non-player side of a contact that involves the player
fn player_other(session: &Session, contact: &Contact) -> Option<PartRef> {
    if contact.a.body == session.player {
        Some(contact.b)
    } else if contact.b.body == session.player {
        Some(contact.a)
    } else {
        None
    }
}

/// Foot sensor began touching something solid. Only a hint for the current
/// tick; the per-tick query stays authoritative.
fn note_ground_contact(session: &mut Session, contact: &Contact) {
    let player = session.player;
    let is_foot = |part: PartRef| {
        part.body == player
            && session
                .world
                .body(part.body)
                .and_then(|b| b.parts.get(part.part))
                .is_some_and(|p| p.role == PartRole::FootSensor)
    };
    let is_solid = |part: PartRef| {
        session
            .world
            .body(part.body)
            .and_then(|b| b.parts.get(part.part))
            .is_some_and(|p| !p.sensor)
    };

    if (is_foot(contact.a) && is_solid(contact.b)) || (is_foot(contact.b) && is_solid(contact.a)) {
        session.grounded = true;
    }
}

fn collect_coin(session: &mut Session, coin: PartRef) {
    // Both player parts may touch the same coin in one batch
    if session.world.remove(coin.body).is_none() {
        return;
    }
    session.coins_remaining = session.coins_remaining.saturating_sub(1);
    log::debug!("Coin collected, {} left", session.coins_remaining);
    session.push_event(GameEvent::CoinCollected {
        coin: coin.body,
        remaining: session.coins_remaining,
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::SIM_DT;
    use crate::level::Level;
    use crate::sim::world::BodyId;
    use crate::tuning::Tuning;
    use glam::Vec2;

    fn session(grid: &[&str]) -> Session {
        let level = Level {
            id: 1,
            name: "Contacts".to_string(),
            grid: grid.iter().map(|r| r.to_string()).collect(),
            block_limit: 0,
            par: None,
        };
        Session::new(&level, Tuning::default(), 5).unwrap()
    }

    fn find(session: &Session, kind: BodyKind) -> BodyId {
        session
            .world
            .bodies()
            .iter()
            .find(|b| b.kind == kind)
            .map(|b| b.id)
            .unwrap()
    }

    fn teleport(session: &mut Session, to: Vec2) {
        let player = session.player;
        session.world.teleport(player, to);
    }

    fn step(session: &mut Session) {
        let contacts = session.world.step(SIM_DT);
        resolve_contacts(session, &contacts);
    }

    #[test]
    fn test_coin_collected_once_from_both_parts() {
        let mut session = session(&["#####", "#P..#", "#.o.#", "#####"]);
        let coin = find(&session, BodyKind::Coin);
        let contacts = [
            Contact::new(PartRef { body: coin, part: 0 }, PartRef { body: session.player, part: 0 }),
            Contact::new(PartRef { body: coin, part: 0 }, PartRef { body: session.player, part: 1 }),
        ];
        resolve_contacts(&mut session, &contacts);
        assert_eq!(session.coins_remaining, 0);
        assert_eq!(session.live_coins(), 0);
        let collected = session
            .drain_events()
            .into_iter()
            .filter(|e| matches!(e, GameEvent::CoinCollected { .. }))
            .count();
        assert_eq!(collected, 1);
    }

    #[test]
    fn test_walking_into_coin_collects_it() {
        let mut session = session(&["######", "#Po..#", "######"]);
        for _ in 0..30 {
            step(&mut session);
        }
        teleport(&mut session, Vec2::new(100.0, 66.0));
        step(&mut session);
        assert_eq!(session.coins_remaining, 0);
    }

    #[test]
    fn test_chest_after_all_coins_starts_clear() {
        let mut session = session(&["#####", "#P..#", "#.o.#", "#..C#", "#####"]);
        teleport(&mut session, Vec2::new(100.0, 100.0));
        step(&mut session);
        assert_eq!(session.coins_remaining, 0);
        assert!(!session.is_clearing());

        teleport(&mut session, Vec2::new(140.0, 140.0));
        step(&mut session);
        assert!(session.is_clearing());
    }

    #[test]
    fn test_last_coin_and_chest_in_one_step_clears() {
        // The chest gets the lower body id, its contact sorts first
        let mut session = session(&["######", "#P.Co#", "######"]);
        assert!(find(&session, BodyKind::Chest) < find(&session, BodyKind::Coin));

        teleport(&mut session, Vec2::new(160.0, 60.0));
        step(&mut session);
        assert_eq!(session.coins_remaining, 0);
        assert!(session.is_clearing());
        assert!(
            session
                .drain_events()
                .iter()
                .any(|e| matches!(e, GameEvent::LevelCleared { coins_total: 1 }))
        );
    }

    #[test]
    fn test_chest_with_coin_left_keeps_playing() {
        let mut session = session(&["#####", "#P..#", "#.o.#", "#..C#", "#####"]);
        for _ in 0..2 {
            teleport(&mut session, Vec2::new(60.0, 60.0));
            step(&mut session);
            teleport(&mut session, Vec2::new(140.0, 140.0));
            step(&mut session);
            assert!(!session.is_clearing());
            assert_eq!(session.coins_remaining, 1);
            assert!(session.drain_events().is_empty());
        }
    }

    #[test]
    fn test_landing_sets_ground_hint() {
        let mut session = session(&["#####", "#P..#", "#####"]);
        let mut hinted = false;
        for _ in 0..30 {
            step(&mut session);
            hinted |= session.grounded;
        }
        assert!(hinted);
    }
}
