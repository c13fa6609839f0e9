//! Physics world: rapier2d simulation plus the gameplay view of its bodies
//!
//! rapier owns the rigid bodies and colliders. The world keeps one [`Body`]
//! record per rigid body, sorted by id so iteration order is stable, and
//! mirrors position and velocity into it after every step. Every collider
//! carries its [`PartRef`] in its user data, so collision events map
//! straight back to a body and the role of the part that touched.
//!
//! Each step returns the part pairs that *began* touching, taken from
//! rapier's `CollisionEvent::Started`.

use std::fmt;

use glam::Vec2;
use rapier2d::prelude::*;
use serde::{Deserialize, Serialize};

use super::shape::Shape;
use crate::consts::{SIM_DT, TILE_SIZE};

/// Speeds below this read as exactly zero (px/s)
const REST_SPEED: f32 = 1.0;

/// Stable body identity, never reused within a world
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BodyId(pub u32);

/// What a body is, as far as gameplay is concerned
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum BodyKind {
    Wall,
    /// Eliminable block. `placed` is true for blocks the player built
    Block { placed: bool },
    Coin,
    Chest,
    Player,
    DeathPlane,
}

impl BodyKind {
    #[inline]
    pub fn is_block(&self) -> bool {
        matches!(self, BodyKind::Block { .. })
    }
}

/// Role of a part inside its body
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PartRole {
    /// Sole part of a simple body
    Main,
    /// Solid box of the player
    Hull,
    /// Ground sensor strip beneath the player
    FootSensor,
}

/// One collision shape owned by a body
#[derive(Debug, Clone, PartialEq)]
pub struct Part {
    pub role: PartRole,
    /// Offset of the part center from the body position
    pub offset: Vec2,
    pub shape: Shape,
    /// Sensors report contacts but never push anything
    pub sensor: bool,
}

impl Part {
    pub fn main(shape: Shape, sensor: bool) -> Self {
        Self {
            role: PartRole::Main,
            offset: Vec2::ZERO,
            shape,
            sensor,
        }
    }
}

/// Reference to a part, carrying its owning body
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PartRef {
    pub body: BodyId,
    pub part: usize,
}

impl PartRef {
    fn to_user_data(self) -> u128 {
        ((self.body.0 as u128) << 32) | self.part as u128
    }

    fn from_user_data(data: u128) -> Self {
        Self {
            body: BodyId((data >> 32) as u32),
            part: (data & 0xffff_ffff) as usize,
        }
    }
}

/// A pair of parts that began touching during a step, `a < b`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Contact {
    pub a: PartRef,
    pub b: PartRef,
}

impl Contact {
    pub fn new(a: PartRef, b: PartRef) -> Self {
        if a <= b { Self { a, b } } else { Self { a: b, b: a } }
    }
}

/// Everything needed to create a body; the world assigns the id
#[derive(Debug, Clone)]
pub struct BodyDef {
    pub kind: BodyKind,
    pub position: Vec2,
    pub is_static: bool,
    /// Fraction of velocity lost per 1/60 s
    pub air_drag: f32,
    /// Surface friction of every part. Pairs use the smaller coefficient.
    pub friction: f32,
    pub parts: Vec<Part>,
}

impl BodyDef {
    /// Static single-part body
    pub fn fixed(kind: BodyKind, position: Vec2, shape: Shape, sensor: bool) -> Self {
        Self {
            kind,
            position,
            is_static: true,
            air_drag: 0.0,
            friction: 0.5,
            parts: vec![Part::main(shape, sensor)],
        }
    }
}

/// Gameplay view of one rigid body
#[derive(Debug, Clone)]
pub struct Body {
    pub id: BodyId,
    pub kind: BodyKind,
    /// Position as of the last step
    pub position: Vec2,
    /// Velocity as of the last step
    pub velocity: Vec2,
    pub is_static: bool,
    pub parts: Vec<Part>,
    handle: RigidBodyHandle,
    /// One collider per part, same order
    colliders: Vec<ColliderHandle>,
}

impl Body {
    /// Index of the first part with the given role
    pub fn part_index(&self, role: PartRole) -> Option<usize> {
        self.parts.iter().position(|p| p.role == role)
    }
}

/// Per-second damping rate that removes `air_drag` of the velocity every
/// 1/60 s
fn damping_rate(air_drag: f32) -> f32 {
    if air_drag <= 0.0 {
        return 0.0;
    }
    -(1.0 - air_drag.min(0.99)).ln() / SIM_DT
}

#[inline]
fn settle(v: Vec2) -> Vec2 {
    Vec2::new(
        if v.x.abs() < REST_SPEED { 0.0 } else { v.x },
        if v.y.abs() < REST_SPEED { 0.0 } else { v.y },
    )
}

/// Owns the rapier simulation and the body records
pub struct PhysicsWorld {
    pipeline: PhysicsPipeline,
    gravity: Vector<Real>,
    integration_params: IntegrationParameters,
    island_manager: IslandManager,
    broad_phase: DefaultBroadPhase,
    narrow_phase: NarrowPhase,
    rigid_body_set: RigidBodySet,
    collider_set: ColliderSet,
    impulse_joint_set: ImpulseJointSet,
    multibody_joint_set: MultibodyJointSet,
    ccd_solver: CCDSolver,
    query_pipeline: QueryPipeline,
    bodies: Vec<Body>,
    next_id: u32,
}

impl fmt::Debug for PhysicsWorld {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PhysicsWorld")
            .field("gravity", &self.gravity())
            .field("bodies", &self.bodies)
            .field("next_id", &self.next_id)
            .finish_non_exhaustive()
    }
}

impl PhysicsWorld {
    /// Create an empty world with downward gravity (pixels/s²)
    pub fn new(gravity: f32) -> Self {
        // Solver tolerances scale with the length unit: one tile
        let mut integration_params = IntegrationParameters::default();
        integration_params.dt = SIM_DT;
        integration_params.length_unit = TILE_SIZE;
        Self {
            pipeline: PhysicsPipeline::new(),
            gravity: vector![0.0, gravity],
            integration_params,
            island_manager: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            rigid_body_set: RigidBodySet::new(),
            collider_set: ColliderSet::new(),
            impulse_joint_set: ImpulseJointSet::new(),
            multibody_joint_set: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
            query_pipeline: QueryPipeline::new(),
            bodies: Vec::new(),
            next_id: 1,
        }
    }

    pub fn gravity(&self) -> Vec2 {
        Vec2::new(self.gravity.x, self.gravity.y)
    }

    /// Add a body and return its id
    pub fn add(&mut self, def: BodyDef) -> BodyId {
        let id = self.insert(def);
        self.query_pipeline.update(&self.collider_set);
        id
    }

    /// Add several bodies at once, ids in input order
    pub fn add_all(&mut self, defs: impl IntoIterator<Item = BodyDef>) -> Vec<BodyId> {
        let ids = defs.into_iter().map(|def| self.insert(def)).collect();
        self.query_pipeline.update(&self.collider_set);
        ids
    }

    fn insert(&mut self, def: BodyDef) -> BodyId {
        let id = BodyId(self.next_id);
        self.next_id += 1;

        let builder = if def.is_static {
            RigidBodyBuilder::fixed()
        } else {
            RigidBodyBuilder::dynamic()
                .lock_rotations()
                .can_sleep(false)
                .linear_damping(damping_rate(def.air_drag))
        };
        let handle = self
            .rigid_body_set
            .insert(builder.translation(vector![def.position.x, def.position.y]).build());

        let colliders = def
            .parts
            .iter()
            .enumerate()
            .map(|(index, part)| {
                let collider = ColliderBuilder::new(part.shape.to_collider_shape())
                    .translation(vector![part.offset.x, part.offset.y])
                    .sensor(part.sensor)
                    .density(if part.sensor { 0.0 } else { 1.0 })
                    .friction(def.friction)
                    .friction_combine_rule(CoefficientCombineRule::Min)
                    .active_events(ActiveEvents::COLLISION_EVENTS)
                    .user_data(PartRef { body: id, part: index }.to_user_data())
                    .build();
                self.collider_set
                    .insert_with_parent(collider, handle, &mut self.rigid_body_set)
            })
            .collect();

        self.bodies.push(Body {
            id,
            kind: def.kind,
            position: def.position,
            velocity: Vec2::ZERO,
            is_static: def.is_static,
            parts: def.parts,
            handle,
            colliders,
        });
        id
    }

    /// Remove a body; `None` if it was already gone
    pub fn remove(&mut self, id: BodyId) -> Option<Body> {
        let body = self.detach(id)?;
        self.query_pipeline.update(&self.collider_set);
        Some(body)
    }

    /// Remove a batch of bodies, returning the ones that existed
    pub fn remove_all(&mut self, ids: &[BodyId]) -> Vec<Body> {
        let removed: Vec<Body> = ids.iter().filter_map(|&id| self.detach(id)).collect();
        if !removed.is_empty() {
            self.query_pipeline.update(&self.collider_set);
            log::debug!("Removed {} bodies", removed.len());
        }
        removed
    }

    fn detach(&mut self, id: BodyId) -> Option<Body> {
        let index = self.index_of(id)?;
        let body = self.bodies.remove(index);
        self.rigid_body_set.remove(
            body.handle,
            &mut self.island_manager,
            &mut self.collider_set,
            &mut self.impulse_joint_set,
            &mut self.multibody_joint_set,
            true,
        );
        Some(body)
    }

    /// Drop every body and all engine state
    pub fn clear(&mut self) {
        let next_id = self.next_id;
        *self = Self::new(self.gravity.y);
        self.next_id = next_id;
    }

    /// All live bodies, sorted by id
    pub fn bodies(&self) -> &[Body] {
        &self.bodies
    }

    pub fn body(&self, id: BodyId) -> Option<&Body> {
        self.index_of(id).map(|i| &self.bodies[i])
    }

    /// Number of live bodies matching a predicate
    pub fn count(&self, pred: impl Fn(&Body) -> bool) -> usize {
        self.bodies.iter().filter(|b| pred(b)).count()
    }

    /// Set the velocity of a dynamic body. Static bodies are left alone.
    pub fn set_velocity(&mut self, id: BodyId, velocity: Vec2) {
        let Some(index) = self.index_of(id) else {
            return;
        };
        let body = &mut self.bodies[index];
        if body.is_static {
            return;
        }
        if let Some(rb) = self.rigid_body_set.get_mut(body.handle) {
            rb.set_linvel(vector![velocity.x, velocity.y], true);
            body.velocity = velocity;
        }
    }

    /// Move a body and stop it. Colliders follow on the next step.
    pub fn teleport(&mut self, id: BodyId, position: Vec2) {
        let Some(index) = self.index_of(id) else {
            return;
        };
        let body = &mut self.bodies[index];
        if let Some(rb) = self.rigid_body_set.get_mut(body.handle) {
            rb.set_translation(vector![position.x, position.y], true);
            rb.set_linvel(vector![0.0, 0.0], true);
            body.position = position;
            body.velocity = Vec2::ZERO;
        }
    }

    /// Turn a body static where it stands
    pub fn freeze(&mut self, id: BodyId) {
        let Some(index) = self.index_of(id) else {
            return;
        };
        let body = &mut self.bodies[index];
        if let Some(rb) = self.rigid_body_set.get_mut(body.handle) {
            rb.set_linvel(vector![0.0, 0.0], false);
            rb.set_body_type(RigidBodyType::Fixed, true);
            body.is_static = true;
            body.velocity = Vec2::ZERO;
        }
    }

    /// Lowest-id body whose shape contains the point
    pub fn body_at(&self, point: Vec2) -> Option<BodyId> {
        let mut hit: Option<BodyId> = None;
        self.query_pipeline.intersections_with_point(
            &self.rigid_body_set,
            &self.collider_set,
            &point![point.x, point.y],
            QueryFilter::default(),
            |handle| {
                if let Some(part) = self.part_ref(handle) {
                    hit = Some(hit.map_or(part.body, |best| best.min(part.body)));
                }
                true
            },
        );
        hit
    }

    /// Whether a part currently overlaps a solid (non-sensor) part of any
    /// other body
    pub fn part_overlaps_solid(&self, part: PartRef) -> bool {
        let Some(body) = self.body(part.body) else {
            return false;
        };
        let Some(collider) = body
            .colliders
            .get(part.part)
            .and_then(|&handle| self.collider_set.get(handle))
        else {
            return false;
        };

        let filter = QueryFilter::default()
            .exclude_sensors()
            .exclude_rigid_body(body.handle);
        self.query_pipeline
            .intersection_with_shape(
                &self.rigid_body_set,
                &self.collider_set,
                collider.position(),
                collider.shape(),
                filter,
            )
            .is_some()
    }

    /// Advance the simulation by `dt` seconds and report new contacts
    pub fn step(&mut self, dt: f32) -> Vec<Contact> {
        self.integration_params.dt = dt;

        let (collision_send, collision_recv) = rapier2d::crossbeam::channel::unbounded::<CollisionEvent>();
        let (force_send, _force_recv) = rapier2d::crossbeam::channel::unbounded::<ContactForceEvent>();
        let event_handler = ChannelEventCollector::new(collision_send, force_send);

        self.pipeline.step(
            &self.gravity,
            &self.integration_params,
            &mut self.island_manager,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.rigid_body_set,
            &mut self.collider_set,
            &mut self.impulse_joint_set,
            &mut self.multibody_joint_set,
            &mut self.ccd_solver,
            None,
            &(),
            &event_handler,
        );
        self.query_pipeline.update(&self.collider_set);
        self.read_back();

        let mut began: Vec<Contact> = collision_recv
            .try_iter()
            .filter_map(|event| match event {
                CollisionEvent::Started(h1, h2, _) => Some(Contact::new(self.part_ref(h1)?, self.part_ref(h2)?)),
                CollisionEvent::Stopped(..) => None,
            })
            .collect();
        // Channel order is not stable across runs
        began.sort();
        began.dedup();
        began
    }

    /// Copy positions and velocities of dynamic bodies out of rapier
    fn read_back(&mut self) {
        for body in self.bodies.iter_mut().filter(|b| !b.is_static) {
            if let Some(rb) = self.rigid_body_set.get(body.handle) {
                let (t, v) = (rb.translation(), rb.linvel());
                body.position = Vec2::new(t.x, t.y);
                body.velocity = settle(Vec2::new(v.x, v.y));
            }
        }
    }

    fn part_ref(&self, handle: ColliderHandle) -> Option<PartRef> {
        self.collider_set
            .get(handle)
            .map(|c| PartRef::from_user_data(c.user_data))
    }

    fn index_of(&self, id: BodyId) -> Option<usize> {
        self.bodies.binary_search_by_key(&id, |b| b.id).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn world_with_floor() -> (PhysicsWorld, BodyId) {
        let mut world = PhysicsWorld::new(1500.0);
        let floor = world.add(BodyDef::fixed(
            BodyKind::Wall,
            Vec2::new(100.0, 220.0),
            Shape::rect(400.0, 40.0),
            false,
        ));
        (world, floor)
    }

    fn crate_body(position: Vec2) -> BodyDef {
        BodyDef {
            kind: BodyKind::Player,
            position,
            is_static: false,
            air_drag: 0.0,
            friction: 0.0,
            parts: vec![Part {
                role: PartRole::Hull,
                offset: Vec2::ZERO,
                shape: Shape::square(28.0),
                sensor: false,
            }],
        }
    }

    #[test]
    fn test_ids_are_sorted_and_lookup_works() {
        let (mut world, floor) = world_with_floor();
        let a = world.add(crate_body(Vec2::new(50.0, 50.0)));
        assert!(a > floor);
        assert_eq!(world.body(a).map(|b| b.kind), Some(BodyKind::Player));
        assert!(world.remove(a).is_some());
        assert!(world.remove(a).is_none());
        assert!(world.body(a).is_none());
        assert_eq!(world.bodies().len(), 1);
    }

    #[test]
    fn test_part_ref_survives_user_data() {
        let part = PartRef { body: BodyId(77), part: 1 };
        assert_eq!(PartRef::from_user_data(part.to_user_data()), part);
    }

    #[test]
    fn test_body_falls_and_comes_to_rest() {
        let (mut world, floor) = world_with_floor();
        let id = world.add(crate_body(Vec2::new(100.0, 100.0)));

        let mut landed = false;
        for _ in 0..120 {
            for contact in world.step(SIM_DT) {
                if contact.a.body == floor || contact.b.body == floor {
                    landed = true;
                }
            }
        }
        let body = world.body(id).unwrap();
        assert!(landed);
        // Floor top is y=200, hull half height is 14
        assert!((body.position.y - 186.0).abs() < 0.5, "y = {}", body.position.y);
        assert_eq!(body.velocity.y, 0.0);
    }

    #[test]
    fn test_resting_contact_is_reported_once() {
        let (mut world, _) = world_with_floor();
        world.add(crate_body(Vec2::new(100.0, 150.0)));
        let mut reports = 0;
        for _ in 0..240 {
            reports += world.step(SIM_DT).len();
        }
        assert_eq!(reports, 1);
    }

    #[test]
    fn test_sensors_do_not_block() {
        let mut world = PhysicsWorld::new(1500.0);
        let coin = world.add(BodyDef::fixed(
            BodyKind::Coin,
            Vec2::new(100.0, 130.0),
            Shape::circle(10.0),
            true,
        ));
        let id = world.add(crate_body(Vec2::new(100.0, 100.0)));

        let mut touched = false;
        for _ in 0..30 {
            touched |= world.step(SIM_DT).iter().any(|c| c.a.body == coin || c.b.body == coin);
        }
        assert!(touched);
        assert!(world.body(id).unwrap().position.y > 150.0);
    }

    #[test]
    fn test_body_at_uses_exact_shapes() {
        let (mut world, floor) = world_with_floor();
        let coin = world.add(BodyDef::fixed(
            BodyKind::Coin,
            Vec2::new(20.0, 20.0),
            Shape::circle(10.0),
            true,
        ));
        assert_eq!(world.body_at(Vec2::new(100.0, 210.0)), Some(floor));
        assert_eq!(world.body_at(Vec2::new(20.0, 20.0)), Some(coin));
        // Inside the coin's bounds, outside its circle
        assert_eq!(world.body_at(Vec2::new(29.0, 29.0)), None);
        assert_eq!(world.body_at(Vec2::new(100.0, 100.0)), None);
    }

    #[test]
    fn test_removed_body_no_longer_occupies() {
        let (mut world, floor) = world_with_floor();
        world.remove_all(&[floor]);
        assert_eq!(world.body_at(Vec2::new(100.0, 210.0)), None);
    }

    #[test]
    fn test_static_bodies_never_move() {
        let (mut world, floor) = world_with_floor();
        for _ in 0..60 {
            world.step(SIM_DT);
        }
        assert_eq!(world.body(floor).unwrap().position, Vec2::new(100.0, 220.0));
    }

    #[test]
    fn test_frozen_body_stays_put() {
        let mut world = PhysicsWorld::new(1500.0);
        let id = world.add(crate_body(Vec2::new(0.0, 0.0)));
        for _ in 0..10 {
            world.step(SIM_DT);
        }
        world.freeze(id);
        let at = world.body(id).unwrap().position;
        for _ in 0..10 {
            world.step(SIM_DT);
        }
        let body = world.body(id).unwrap();
        assert!(body.is_static);
        assert_eq!(body.position, at);
        assert_eq!(body.velocity, Vec2::ZERO);
    }

    #[test]
    fn test_air_drag_slows_a_body() {
        let mut world = PhysicsWorld::new(0.0);
        let mut def = crate_body(Vec2::ZERO);
        def.air_drag = 0.05;
        let id = world.add(def);
        world.set_velocity(id, Vec2::new(600.0, 0.0));
        for _ in 0..60 {
            world.step(SIM_DT);
        }
        let vx = world.body(id).unwrap().velocity.x;
        // 0.95^60 of the launch speed, give or take integration
        assert!(vx > 20.0 && vx < 40.0, "vx = {vx}");
    }
}
