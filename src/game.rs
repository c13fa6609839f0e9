//! Frame loop and level lifecycle
//!
//! [`Game`] owns at most one [`Session`] and drives it with a fixed
//! timestep accumulator. It is platform-free: the browser shell and the
//! native demo both feed it timestamps and intents and read back the HUD,
//! body snapshots and particles.

use glam::Vec2;
use serde::Serialize;

use crate::consts::{MAX_SUBSTEPS, SIM_DT};
use crate::error::LevelError;
use crate::level::Level;
use crate::sim::{BodyId, BodyKind, GameEvent, Particle, Session, TickInput, WinTimer, place_block, tick};
use crate::tuning::Tuning;

/// Callbacks into the surrounding application
pub trait GameObserver {
    /// Fires once, after the win delay, with the number of coins collected
    fn on_level_complete(&mut self, coins_collected: u32);
    /// Fires once when the player is lost
    fn on_game_over(&mut self, reason: &str);
}

impl GameObserver for () {
    fn on_level_complete(&mut self, _coins_collected: u32) {}
    fn on_game_over(&mut self, _reason: &str) {}
}

/// Values for the heads-up display
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Hud {
    pub coins_remaining: u32,
    pub blocks_remaining: u32,
    pub clearing: bool,
    pub paused: bool,
}

/// Read-only view of one body for drawing
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BodySnapshot {
    pub id: BodyId,
    pub kind: BodyKind,
    pub position: Vec2,
    pub velocity: Vec2,
}

/// Game instance: one level at a time
pub struct Game<O: GameObserver> {
    observer: O,
    tuning: Tuning,
    seed: u64,
    session: Option<Session>,
    running: bool,
    paused: bool,
    accumulator: f32,
    last_time: Option<f64>,
    input: TickInput,
}

impl<O: GameObserver> Game<O> {
    pub fn new(observer: O, tuning: Tuning) -> Self {
        Self {
            observer,
            tuning,
            seed: 0,
            session: None,
            running: false,
            paused: false,
            accumulator: 0.0,
            last_time: None,
            input: TickInput::default(),
        }
    }

    /// Seed for cosmetic particle bursts
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Tear down any current level and start `level` from scratch
    pub fn start_level(&mut self, level: &Level) -> Result<(), LevelError> {
        self.teardown();
        let seed = self.seed.wrapping_add(u64::from(level.id));
        let session = Session::new(level, self.tuning.clone(), seed)?;
        self.session = Some(session);
        self.running = true;
        self.paused = false;
        Ok(())
    }

    /// Stop the loop and release the level. Safe to call repeatedly.
    pub fn teardown(&mut self) {
        self.running = false;
        self.paused = false;
        self.accumulator = 0.0;
        self.last_time = None;
        self.input = TickInput::default();

        if let Some(mut session) = self.session.take() {
            if session.win_timer.take().is_some() {
                log::debug!("Cancelled pending level-complete for level {}", session.level_id);
            }
            session.world.clear();
            session.effects.clear();
            log::info!("Level {} torn down", session.level_id);
        }
    }

    /// Latest movement intents; sampled at every tick until changed
    pub fn set_input(&mut self, input: TickInput) {
        self.input = input;
    }

    pub fn input(&self) -> TickInput {
        self.input
    }

    /// Place a block under a world point. Returns whether one was placed.
    pub fn place_block_at(&mut self, point: Vec2) -> bool {
        if self.paused || !self.running {
            return false;
        }
        match self.session.as_mut() {
            Some(session) => place_block(session, point).is_ok(),
            None => false,
        }
    }

    pub fn toggle_pause(&mut self) -> bool {
        self.set_paused(!self.paused);
        self.paused
    }

    pub fn set_paused(&mut self, paused: bool) {
        if !self.running || self.paused == paused {
            return;
        }
        self.paused = paused;
        // Don't replay the paused interval on resume
        self.accumulator = 0.0;
        log::info!("{}", if paused { "Paused" } else { "Resumed" });
    }

    /// Advance using a wall-clock timestamp in milliseconds
    pub fn frame(&mut self, now_ms: f64) {
        let dt = match self.last_time {
            Some(last) => ((now_ms - last) / 1000.0) as f32,
            None => SIM_DT,
        };
        self.last_time = Some(now_ms);
        self.advance(dt, now_ms);
    }

    /// Run as many fixed ticks as `dt` seconds allow, then deliver events
    pub fn advance(&mut self, dt: f32, now_ms: f64) {
        if !self.running {
            return;
        }

        if let Some(session) = self.session.as_mut() {
            if self.paused {
                self.accumulator = 0.0;
            } else {
                self.accumulator += dt.clamp(0.0, 0.1);
                let mut substeps = 0;
                while self.accumulator >= SIM_DT && substeps < MAX_SUBSTEPS {
                    tick(session, &self.input, SIM_DT);
                    self.accumulator -= SIM_DT;
                    substeps += 1;
                }
            }
        }

        self.dispatch_events(now_ms);
        // Wall-clock timer: keeps counting while paused
        self.poll_win_timer(now_ms);
    }

    fn dispatch_events(&mut self, now_ms: f64) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        let delay = session.tuning.win_delay_ms;

        for event in session.drain_events() {
            match event {
                GameEvent::LevelCleared { coins_total } => {
                    session.win_timer = Some(WinTimer::schedule(now_ms, delay, coins_total));
                }
                GameEvent::PlayerFell { reason } => {
                    self.observer.on_game_over(&reason);
                }
                _ => {}
            }
        }
    }

    fn poll_win_timer(&mut self, now_ms: f64) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        let Some(timer) = session.win_timer.filter(|t| t.is_due(now_ms)) else {
            return;
        };
        session.win_timer = None;
        if !session.clear.complete() {
            return;
        }
        self.running = false;
        log::info!("Level {} complete", session.level_id);
        self.observer.on_level_complete(timer.coins);
    }

    pub fn hud(&self) -> Option<Hud> {
        self.session.as_ref().map(|s| Hud {
            coins_remaining: s.coins_remaining,
            blocks_remaining: s.blocks_remaining,
            clearing: s.is_clearing(),
            paused: self.paused,
        })
    }

    pub fn snapshots(&self) -> impl Iterator<Item = BodySnapshot> + '_ {
        self.session
            .iter()
            .flat_map(|s| s.world.bodies())
            .map(|b| BodySnapshot {
                id: b.id,
                kind: b.kind,
                position: b.position,
                velocity: b.velocity,
            })
    }

    pub fn particles(&self) -> &[Particle] {
        self.session.as_ref().map(|s| s.effects.particles()).unwrap_or(&[])
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn session_mut(&mut self) -> Option<&mut Session> {
        self.session.as_mut()
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn observer(&self) -> &O {
        &self.observer
    }

    pub fn observer_mut(&mut self) -> &mut O {
        &mut self.observer
    }
}
