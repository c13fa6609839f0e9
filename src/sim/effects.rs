//! Cosmetic particle bursts
//!
//! Presentation only: nothing in here feeds back into gameplay, and a
//! headless run can ignore it entirely.

use glam::Vec2;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use serde::Serialize;

/// Particle gravity (pixels/s²)
const PARTICLE_GRAVITY: f32 = 1800.0;

/// Number of colors in the celebration palette
pub const CELEBRATION_COLORS: u8 = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EffectKind {
    /// Fireworks at the chest when the level is cleared
    Celebration,
    /// Fragments of an eliminated block
    Debris,
    /// Puff around a freshly placed block
    Placement,
}

/// A particle for visual effects
#[derive(Debug, Clone, Serialize)]
pub struct Particle {
    pub pos: Vec2,
    pub vel: Vec2,
    pub kind: EffectKind,
    /// Palette index (celebration only)
    pub color: u8,
    /// Seconds left to live
    pub life: f32,
}

/// Particle pool with its own seeded RNG
#[derive(Debug, Clone)]
pub struct Effects {
    particles: Vec<Particle>,
    rng: Pcg32,
    max_particles: usize,
}

impl Effects {
    pub fn new(seed: u64, max_particles: usize) -> Self {
        Self {
            particles: Vec::new(),
            rng: Pcg32::seed_from_u64(seed),
            max_particles,
        }
    }

    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    /// Big burst of colored sparks, mostly upward
    pub fn celebrate(&mut self, at: Vec2, count: usize) {
        for _ in 0..count {
            let vel = Vec2::new(
                self.rng.random_range(-450.0..450.0),
                self.rng.random_range(-450.0..450.0) - 480.0,
            );
            let color = self.rng.random_range(0..CELEBRATION_COLORS);
            self.push(Particle {
                pos: at,
                vel,
                kind: EffectKind::Celebration,
                color,
                life: 2.5,
            });
        }
    }

    /// Fragments scattered around an eliminated block
    pub fn debris(&mut self, at: Vec2, count: usize) {
        for _ in 0..count {
            let jitter = Vec2::new(self.rng.random_range(-10.0..10.0), self.rng.random_range(-10.0..10.0));
            let vel = Vec2::new(self.rng.random_range(-360.0..360.0), self.rng.random_range(-360.0..360.0));
            let life = (40.0 + self.rng.random_range(0.0..20.0)) / 60.0;
            self.push(Particle {
                pos: at + jitter,
                vel,
                kind: EffectKind::Debris,
                color: 0,
                life,
            });
        }
    }

    /// Small puff around a newly placed block
    pub fn placement(&mut self, at: Vec2, count: usize) {
        for _ in 0..count {
            let jitter = Vec2::new(self.rng.random_range(-5.0..5.0), self.rng.random_range(-5.0..5.0));
            let vel = Vec2::new(self.rng.random_range(-150.0..150.0), self.rng.random_range(-150.0..150.0));
            let life = (20.0 + self.rng.random_range(0.0..10.0)) / 60.0;
            self.push(Particle {
                pos: at + jitter,
                vel,
                kind: EffectKind::Placement,
                color: 0,
                life,
            });
        }
    }

    /// Integrate and age all particles
    pub fn update(&mut self, dt: f32) {
        for particle in self.particles.iter_mut() {
            particle.pos += particle.vel * dt;
            particle.vel.y += PARTICLE_GRAVITY * dt;
            particle.life -= dt;
        }
        self.particles.retain(|p| p.life > 0.0);
    }

    pub fn clear(&mut self) {
        self.particles.clear();
    }

    fn push(&mut self, particle: Particle) {
        if self.max_particles == 0 {
            return;
        }
        if self.particles.len() >= self.max_particles {
            self.particles.remove(0);
        }
        self.particles.push(particle);
    }
}
