//! Level simulation module
//!
//! All gameplay logic lives here. This module must stay free of rendering
//! and platform dependencies:
//! - Fixed timestep only
//! - Seeded RNG only (and only for cosmetic particles)
//! - Stable iteration order (by body id)

pub mod clear;
pub mod economy;
pub mod effects;
pub mod elimination;
pub mod interaction;
pub mod player;
pub mod shape;
pub mod state;
pub mod tick;
pub mod world;

pub use clear::{ClearPhase, LevelClear, WinTimer};
pub use economy::{PlaceRejection, place_block};
pub use effects::{EffectKind, Effects, Particle};
pub use shape::Shape;
pub use state::{GameEvent, Session};
pub use tick::{TickInput, tick};
pub use world::{Body, BodyDef, BodyId, BodyKind, Contact, Part, PartRef, PartRole, PhysicsWorld};
