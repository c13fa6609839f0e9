//! Level clear sequencing
//!
//! `Active -> Clearing -> Completed`, one way only. Touching the chest with
//! no coins left starts the clear; the completion callback fires from a
//! wall-clock timer owned by the session, so tearing the session down
//! cancels it.

use glam::Vec2;

use super::state::{GameEvent, Session};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ClearPhase {
    #[default]
    Active,
    Clearing,
    Completed,
}

/// One-way clear state machine
#[derive(Debug, Clone, Default)]
pub struct LevelClear {
    phase: ClearPhase,
    started_tick: Option<u64>,
}

impl LevelClear {
    pub fn phase(&self) -> ClearPhase {
        self.phase
    }

    #[inline]
    pub fn is_clearing(&self) -> bool {
        self.phase == ClearPhase::Clearing
    }

    pub fn is_completed(&self) -> bool {
        self.phase == ClearPhase::Completed
    }

    /// Tick at which clearing began
    pub fn started_tick(&self) -> Option<u64> {
        self.started_tick
    }

    /// Enter `Clearing`. Returns false if the clear already began.
    pub fn begin(&mut self, tick: u64) -> bool {
        if self.phase != ClearPhase::Active {
            return false;
        }
        self.phase = ClearPhase::Clearing;
        self.started_tick = Some(tick);
        true
    }

    /// Enter `Completed`. Returns false unless currently clearing.
    pub fn complete(&mut self) -> bool {
        if self.phase != ClearPhase::Clearing {
            return false;
        }
        self.phase = ClearPhase::Completed;
        true
    }
}

/// Pending level-complete notification
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WinTimer {
    pub fire_at_ms: f64,
    pub coins: u32,
}

impl WinTimer {
    pub fn schedule(now_ms: f64, delay_ms: f64, coins: u32) -> Self {
        Self {
            fire_at_ms: now_ms + delay_ms,
            coins,
        }
    }

    #[inline]
    pub fn is_due(&self, now_ms: f64) -> bool {
        now_ms >= self.fire_at_ms
    }
}

/// Chest touched by the player. Starts the clear if every coin is gone.
///
/// Coins are recounted from the world instead of trusting the counter, so a
/// coin removed earlier in the same batch is already accounted for.
pub fn on_chest_touched(session: &mut Session, chest_pos: Vec2) -> bool {
    if session.is_clearing() || session.clear.is_completed() {
        return false;
    }
    let live = session.live_coins();
    if live > 0 {
        log::debug!("Chest touched with {} coins left", live);
        return false;
    }
    if !session.clear.begin(session.time_ticks) {
        return false;
    }

    let burst = session.tuning.celebration_particles;
    session.effects.celebrate(chest_pos, burst);
    log::info!(
        "Level {} cleared with {} coins",
        session.level_id,
        session.coins_total
    );
    session.push_event(GameEvent::LevelCleared {
        coins_total: session.coins_total,
    });
    true
}
