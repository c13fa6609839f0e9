//! Fixed timestep simulation tick
//!
//! One tick: player control, periodic elimination, physics step, contact
//! resolution, then effects. Pausing is the caller's job; a paused game
//! simply doesn't call [`tick`].

use super::state::Session;
use super::{elimination, interaction, player};

/// Movement intents sampled for a single tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickInput {
    pub left: bool,
    pub right: bool,
    pub jump: bool,
}

/// Advance the session by one fixed timestep
pub fn tick(session: &mut Session, input: &TickInput, dt: f32) {
    session.time_ticks += 1;

    player::control(session, input);

    // Clearing suspends elimination; a fallen player only freezes the player
    if !session.is_clearing() {
        let interval = session.tuning.elimination_interval_ticks.max(1);
        if session.time_ticks % interval == 0 {
            elimination::eliminate(session);
        }
    }

    let contacts = session.world.step(dt);
    interaction::resolve_contacts(session, &contacts);

    session.effects.update(dt);
}
