//! Spatial/physics substrate
//!
//! Gameplay code only sees bodies through [`SpatialBackend`]. Bodies carry a
//! [`BodyOwner`] handle back into the entity collections instead of a pointer,
//! so a removed entity can never be reached through a late contact.
//!
//! [`GridPhysics`] is the built-in backend: a spatial-hash broad phase, a
//! circle/box narrow phase, and positional correction. No restitution, no
//! rotation, no mass.

use glam::Vec2;
use rustc_hash::FxHashSet;

use super::collision::{Aabb, CollisionResult, circle_aabb, circle_circle};
use super::spatial_hash::SpatialHash;
use super::state::EntityId;
use crate::consts::MAX_TICK_MS;

/// Broad-phase cell size
pub const PHYSICS_CELL: f32 = 64.0;
/// Upper bound on substeps per physics step
pub const MAX_PHYSICS_SUBSTEPS: u32 = 16;

/// Collision category bits
pub mod category {
    pub const DEFAULT: u16 = 0x0001;
    pub const PLAYER: u16 = 0x0002;
    pub const ENEMY: u16 = 0x0004;
    pub const BULLET: u16 = 0x0008;
    pub const WALL: u16 = 0x0010;
    pub const OBSTACLE: u16 = 0x0020;
    pub const ENEMY_BULLET: u16 = 0x0040;
    pub const ITEM: u16 = 0x0080;
    pub const ALL: u16 = 0xFFFF;
}

/// Collision masks: which categories each body class interacts with
pub mod mask {
    use super::category as cat;

    /// Players walk through obstacles so they can never wall themselves in
    pub const PLAYER: u16 = cat::ENEMY | cat::WALL | cat::ENEMY_BULLET | cat::ITEM;
    pub const ENEMY: u16 = cat::PLAYER | cat::ENEMY | cat::BULLET | cat::WALL | cat::OBSTACLE;
    /// Corpses still slide against geometry but block nothing else
    pub const DYING_ENEMY: u16 = cat::WALL | cat::OBSTACLE;
    pub const BULLET: u16 = cat::ENEMY | cat::WALL | cat::OBSTACLE;
    pub const ENEMY_BULLET: u16 = cat::PLAYER | cat::WALL | cat::OBSTACLE;
    pub const WALL: u16 = cat::ALL;
    pub const OBSTACLE: u16 = cat::ALL ^ cat::PLAYER;
    pub const ITEM: u16 = cat::PLAYER;
    pub const NONE: u16 = 0;
}

/// Back-reference from a body to the entity that owns it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BodyOwner {
    Wall,
    Player(EntityId),
    Enemy(EntityId),
    Obstacle(EntityId),
    Projectile(EntityId),
    Pickup(EntityId),
}

/// Stable handle to a body; stale handles resolve to nothing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BodyHandle {
    index: u32,
    generation: u32,
}

impl BodyHandle {
    /// Handle that never resolves to a body
    pub const DETACHED: BodyHandle = BodyHandle {
        index: u32::MAX,
        generation: u32::MAX,
    };
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Shape {
    Circle { radius: f32 },
    Rect { half: Vec2 },
}

impl Shape {
    /// Smallest distance from center to edge
    fn extent(&self) -> f32 {
        match *self {
            Shape::Circle { radius } => radius,
            Shape::Rect { half } => half.min_element(),
        }
    }

    fn bounds(&self, pos: Vec2) -> Aabb {
        match *self {
            Shape::Circle { radius } => Aabb::from_center(pos, Vec2::splat(radius)),
            Shape::Rect { half } => Aabb::from_center(pos, half),
        }
    }
}

/// A physics body, also used as the creation descriptor
#[derive(Debug, Clone, Copy)]
pub struct Body {
    pub owner: BodyOwner,
    pub pos: Vec2,
    pub vel: Vec2,
    pub shape: Shape,
    pub category: u16,
    pub mask: u16,
    pub is_static: bool,
    /// Sensors report contacts but are never pushed apart
    pub sensor: bool,
    /// Fraction of velocity lost per 60 Hz frame
    pub damping: f32,
}

impl Body {
    pub fn dynamic_circle(owner: BodyOwner, pos: Vec2, radius: f32, category: u16, mask: u16) -> Self {
        Self {
            owner,
            pos,
            vel: Vec2::ZERO,
            shape: Shape::Circle { radius },
            category,
            mask,
            is_static: false,
            sensor: false,
            damping: 0.0,
        }
    }

    pub fn static_rect(owner: BodyOwner, center: Vec2, half: Vec2, category: u16, mask: u16) -> Self {
        Self {
            owner,
            pos: center,
            vel: Vec2::ZERO,
            shape: Shape::Rect { half },
            category,
            mask,
            is_static: true,
            sensor: false,
            damping: 0.0,
        }
    }

    pub fn static_circle(owner: BodyOwner, pos: Vec2, radius: f32, category: u16, mask: u16) -> Self {
        Self {
            is_static: true,
            ..Self::dynamic_circle(owner, pos, radius, category, mask)
        }
    }

    pub fn sensor(mut self) -> Self {
        self.sensor = true;
        self
    }

    pub fn with_velocity(mut self, vel: Vec2) -> Self {
        self.vel = vel;
        self
    }

    pub fn with_damping(mut self, damping: f32) -> Self {
        self.damping = damping;
        self
    }

    fn interacts_with(&self, other: &Body) -> bool {
        (self.mask & other.category) != 0 && (other.mask & self.category) != 0
    }

    fn contains_point(&self, p: Vec2) -> bool {
        match self.shape {
            Shape::Circle { radius } => self.pos.distance_squared(p) <= radius * radius,
            Shape::Rect { half } => Aabb::from_center(self.pos, half).contains(p),
        }
    }

    fn overlaps_aabb(&self, aabb: &Aabb) -> bool {
        match self.shape {
            Shape::Circle { radius } => circle_aabb(self.pos, radius, aabb).hit,
            Shape::Rect { half } => Aabb::from_center(self.pos, half).overlaps(aabb),
        }
    }

    fn overlaps_circle(&self, center: Vec2, radius: f32) -> bool {
        match self.shape {
            Shape::Circle { radius: r } => circle_circle(center, radius, self.pos, r).hit,
            Shape::Rect { half } => circle_aabb(center, radius, &Aabb::from_center(self.pos, half)).hit,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContactKind {
    /// First step this pair touched
    Begin,
    /// Pair was already touching last step
    Active,
}

/// A touching pair reported by a physics step
#[derive(Debug, Clone, Copy)]
pub struct Contact {
    pub a: BodyHandle,
    pub b: BodyHandle,
    pub owner_a: BodyOwner,
    pub owner_b: BodyOwner,
    pub kind: ContactKind,
    /// Points from `b` toward `a`
    pub normal: Vec2,
}

/// Everything gameplay code needs from a physics world
pub trait SpatialBackend {
    fn create_body(&mut self, body: Body) -> BodyHandle;
    /// Returns false for stale handles
    fn remove_body(&mut self, handle: BodyHandle) -> bool;
    fn owner(&self, handle: BodyHandle) -> Option<BodyOwner>;
    fn position(&self, handle: BodyHandle) -> Option<Vec2>;
    fn velocity(&self, handle: BodyHandle) -> Option<Vec2>;
    fn set_position(&mut self, handle: BodyHandle, pos: Vec2);
    fn set_velocity(&mut self, handle: BodyHandle, vel: Vec2);
    fn set_mask(&mut self, handle: BodyHandle, mask: u16);
    /// Static bodies covering a point
    fn query_point(&self, point: Vec2) -> Vec<BodyHandle>;
    /// Bodies overlapping a circle
    fn query_radius(&self, center: Vec2, radius: f32) -> Vec<BodyHandle>;
    /// Static bodies overlapping a box; shared edges do not count
    fn query_aabb(&self, aabb: &Aabb) -> Vec<BodyHandle>;
    /// Bounds of static walls and obstacles, for navigation grids
    fn static_aabbs(&self) -> Vec<Aabb>;
    /// Advance dynamic bodies; the delta is clamped to [`MAX_TICK_MS`]
    fn step(&mut self, dt_ms: f32);
    /// Contacts found by the last step, in discovery order
    fn drain_contacts(&mut self) -> Vec<Contact>;
    fn body_count(&self) -> usize;
    /// Drop every body
    fn clear(&mut self);
}

#[derive(Debug, Clone)]
struct Slot {
    generation: u32,
    body: Option<Body>,
}

/// Hand-rolled grid backend
#[derive(Debug, Clone)]
pub struct GridPhysics {
    slots: Vec<Slot>,
    free: Vec<u32>,
    dynamic_hash: SpatialHash,
    static_hash: SpatialHash,
    static_dirty: bool,
    previous_pairs: FxHashSet<(BodyHandle, BodyHandle)>,
    contacts: Vec<Contact>,
    near_static: Vec<usize>,
    near_dynamic: Vec<usize>,
}

impl Default for GridPhysics {
    fn default() -> Self {
        Self::new()
    }
}

impl GridPhysics {
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            dynamic_hash: SpatialHash::new(PHYSICS_CELL),
            static_hash: SpatialHash::new(PHYSICS_CELL),
            static_dirty: false,
            previous_pairs: FxHashSet::default(),
            contacts: Vec::new(),
            near_static: Vec::new(),
            near_dynamic: Vec::new(),
        }
    }

    fn get(&self, handle: BodyHandle) -> Option<&Body> {
        let slot = self.slots.get(handle.index as usize)?;
        if slot.generation != handle.generation {
            return None;
        }
        slot.body.as_ref()
    }

    fn get_mut(&mut self, handle: BodyHandle) -> Option<&mut Body> {
        let slot = self.slots.get_mut(handle.index as usize)?;
        if slot.generation != handle.generation {
            return None;
        }
        slot.body.as_mut()
    }

    fn handle_at(&self, index: usize) -> BodyHandle {
        BodyHandle {
            index: index as u32,
            generation: self.slots[index].generation,
        }
    }

    fn rebuild_static(&mut self) {
        self.static_hash.clear();
        for (i, slot) in self.slots.iter().enumerate() {
            if let Some(body) = slot.body.as_ref().filter(|b| b.is_static) {
                let b = body.shape.bounds(body.pos);
                self.static_hash.insert_aabb(i, b.min, b.max);
            }
        }
        self.static_dirty = false;
    }

    fn rebuild_dynamic(&mut self) {
        self.dynamic_hash.clear();
        for (i, slot) in self.slots.iter().enumerate() {
            if let Some(body) = slot.body.as_ref().filter(|b| !b.is_static) {
                let b = body.shape.bounds(body.pos);
                self.dynamic_hash.insert_aabb(i, b.min, b.max);
            }
        }
    }

    /// Enough substeps that no body moves further than its own extent per substep
    fn substeps_for(&self, dt: f32) -> u32 {
        let mut worst = 1.0_f32;
        for body in self.slots.iter().filter_map(|s| s.body.as_ref()) {
            if body.is_static {
                continue;
            }
            let travel = body.vel.length() * dt;
            worst = worst.max(travel / body.shape.extent().max(1.0));
        }
        (worst.ceil() as u32).clamp(1, MAX_PHYSICS_SUBSTEPS)
    }

    fn integrate(&mut self, dt: f32) {
        for body in self.slots.iter_mut().filter_map(|s| s.body.as_mut()) {
            if !body.is_static {
                body.pos += body.vel * dt;
            }
        }
    }

    /// One narrow-phase sweep over every dynamic body
    fn collide(
        &mut self,
        found: &mut Vec<(BodyHandle, BodyHandle, Vec2)>,
        seen: &mut FxHashSet<(BodyHandle, BodyHandle)>,
    ) {
        let mut near_static = std::mem::take(&mut self.near_static);
        let mut near_dynamic = std::mem::take(&mut self.near_dynamic);

        for i in 0..self.slots.len() {
            let Some(body) = self.slots[i].body else {
                continue;
            };
            if body.is_static {
                continue;
            }
            let bounds = body.shape.bounds(body.pos);
            self.static_hash
                .query_rect_into(bounds.min, bounds.max, &mut near_static);
            self.dynamic_hash
                .query_rect_into(bounds.min, bounds.max, &mut near_dynamic);

            for &j in &near_static {
                self.collide_pair(i, j, found, seen);
            }
            for &j in &near_dynamic {
                // Each dynamic pair is visited once, from its lower index
                if j > i {
                    self.collide_pair(i, j, found, seen);
                }
            }
        }

        self.near_static = near_static;
        self.near_dynamic = near_dynamic;
    }

    fn collide_pair(
        &mut self,
        i: usize,
        j: usize,
        found: &mut Vec<(BodyHandle, BodyHandle, Vec2)>,
        seen: &mut FxHashSet<(BodyHandle, BodyHandle)>,
    ) {
        let (Some(a), Some(b)) = (self.slots[i].body, self.slots[j].body) else {
            return;
        };
        if !a.interacts_with(&b) {
            return;
        }
        let result = narrow_phase(&a, &b);
        if !result.hit {
            return;
        }

        let ha = self.handle_at(i);
        let hb = self.handle_at(j);
        let (key, normal) = if ha < hb {
            ((ha, hb), result.normal)
        } else {
            ((hb, ha), -result.normal)
        };
        if seen.insert(key) {
            found.push((key.0, key.1, normal));
        }

        if a.sensor || b.sensor {
            return;
        }

        if b.is_static {
            if let Some(body) = self.slots[i].body.as_mut() {
                body.pos += result.normal * result.penetration;
                let into = body.vel.dot(result.normal);
                if into < 0.0 {
                    body.vel -= result.normal * into;
                }
            }
        } else {
            let push = result.normal * (result.penetration * 0.5);
            if let Some(body) = self.slots[i].body.as_mut() {
                body.pos += push;
            }
            if let Some(body) = self.slots[j].body.as_mut() {
                body.pos -= push;
            }
        }
    }

    fn apply_damping(&mut self, dt: f32) {
        for body in self.slots.iter_mut().filter_map(|s| s.body.as_mut()) {
            if !body.is_static && body.damping > 0.0 {
                body.vel *= (1.0 - body.damping).clamp(0.0, 1.0).powf(dt * 60.0);
            }
        }
    }
}

fn narrow_phase(a: &Body, b: &Body) -> CollisionResult {
    match (a.shape, b.shape) {
        (Shape::Circle { radius: ra }, Shape::Circle { radius: rb }) => {
            circle_circle(a.pos, ra, b.pos, rb)
        }
        (Shape::Circle { radius }, Shape::Rect { half }) => {
            circle_aabb(a.pos, radius, &Aabb::from_center(b.pos, half))
        }
        (Shape::Rect { half }, Shape::Circle { radius }) => {
            circle_aabb(b.pos, radius, &Aabb::from_center(a.pos, half)).flipped()
        }
        // Boxes are only ever static
        (Shape::Rect { .. }, Shape::Rect { .. }) => CollisionResult::miss(),
    }
}

impl SpatialBackend for GridPhysics {
    fn create_body(&mut self, body: Body) -> BodyHandle {
        if body.is_static {
            self.static_dirty = true;
        }
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.body = Some(body);
            return BodyHandle {
                index,
                generation: slot.generation,
            };
        }
        self.slots.push(Slot {
            generation: 0,
            body: Some(body),
        });
        BodyHandle {
            index: (self.slots.len() - 1) as u32,
            generation: 0,
        }
    }

    fn remove_body(&mut self, handle: BodyHandle) -> bool {
        let Some(slot) = self.slots.get_mut(handle.index as usize) else {
            return false;
        };
        if slot.generation != handle.generation {
            return false;
        }
        let Some(body) = slot.body.take() else {
            return false;
        };
        slot.generation = slot.generation.wrapping_add(1);
        if body.is_static {
            self.static_dirty = true;
        }
        self.free.push(handle.index);
        true
    }

    fn owner(&self, handle: BodyHandle) -> Option<BodyOwner> {
        self.get(handle).map(|b| b.owner)
    }

    fn position(&self, handle: BodyHandle) -> Option<Vec2> {
        self.get(handle).map(|b| b.pos)
    }

    fn velocity(&self, handle: BodyHandle) -> Option<Vec2> {
        self.get(handle).map(|b| b.vel)
    }

    fn set_position(&mut self, handle: BodyHandle, pos: Vec2) {
        let mut moved_static = false;
        if let Some(body) = self.get_mut(handle) {
            body.pos = pos;
            moved_static = body.is_static;
        }
        if moved_static {
            self.static_dirty = true;
        }
    }

    fn set_velocity(&mut self, handle: BodyHandle, vel: Vec2) {
        if let Some(body) = self.get_mut(handle) {
            body.vel = vel;
        }
    }

    fn set_mask(&mut self, handle: BodyHandle, mask: u16) {
        if let Some(body) = self.get_mut(handle) {
            body.mask = mask;
        }
    }

    fn query_point(&self, point: Vec2) -> Vec<BodyHandle> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| {
                let body = slot.body.as_ref()?;
                (body.is_static && body.contains_point(point)).then(|| self.handle_at(i))
            })
            .collect()
    }

    fn query_radius(&self, center: Vec2, radius: f32) -> Vec<BodyHandle> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| {
                let body = slot.body.as_ref()?;
                body.overlaps_circle(center, radius).then(|| self.handle_at(i))
            })
            .collect()
    }

    fn query_aabb(&self, aabb: &Aabb) -> Vec<BodyHandle> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| {
                let body = slot.body.as_ref()?;
                (body.is_static && body.overlaps_aabb(aabb)).then(|| self.handle_at(i))
            })
            .collect()
    }

    fn static_aabbs(&self) -> Vec<Aabb> {
        self.slots
            .iter()
            .filter_map(|slot| slot.body.as_ref())
            .filter(|b| {
                b.is_static && !b.sensor && (b.category & (category::WALL | category::OBSTACLE)) != 0
            })
            .map(|b| b.shape.bounds(b.pos))
            .collect()
    }

    fn step(&mut self, dt_ms: f32) {
        let dt = dt_ms.clamp(0.0, MAX_TICK_MS) / 1000.0;
        if dt <= 0.0 {
            return;
        }
        if self.static_dirty {
            self.rebuild_static();
        }

        let substeps = self.substeps_for(dt);
        let sub_dt = dt / substeps as f32;
        let mut found = Vec::new();
        let mut seen = FxHashSet::default();
        for _ in 0..substeps {
            self.integrate(sub_dt);
            self.rebuild_dynamic();
            self.collide(&mut found, &mut seen);
        }
        self.apply_damping(dt);

        for (a, b, normal) in found {
            let (Some(owner_a), Some(owner_b)) = (self.owner(a), self.owner(b)) else {
                continue;
            };
            let kind = if self.previous_pairs.contains(&(a, b)) {
                ContactKind::Active
            } else {
                ContactKind::Begin
            };
            self.contacts.push(Contact {
                a,
                b,
                owner_a,
                owner_b,
                kind,
                normal,
            });
        }
        self.previous_pairs = seen;
    }

    fn drain_contacts(&mut self) -> Vec<Contact> {
        std::mem::take(&mut self.contacts)
    }

    fn body_count(&self) -> usize {
        self.slots.iter().filter(|s| s.body.is_some()).count()
    }

    fn clear(&mut self) {
        *self = Self::new();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wall(center: Vec2, half: Vec2) -> Body {
        Body::static_rect(BodyOwner::Wall, center, half, category::WALL, mask::WALL)
    }

    #[test]
    fn test_body_is_pushed_out_of_wall() {
        let mut physics = GridPhysics::new();
        physics.create_body(wall(Vec2::new(100.0, 100.0), Vec2::new(50.0, 20.0)));
        let player = physics.create_body(
            Body::dynamic_circle(
                BodyOwner::Player(1),
                Vec2::new(100.0, 60.0),
                8.0,
                category::PLAYER,
                mask::PLAYER,
            )
            .with_velocity(Vec2::new(0.0, 600.0)),
        );

        for _ in 0..10 {
            physics.step(1000.0 / 60.0);
        }
        let pos = physics.position(player).unwrap();
        assert!(pos.y <= 80.0 - 8.0 + 0.01, "player sank into wall: {pos}");
        assert!(physics.velocity(player).unwrap().y.abs() < 1e-3);
    }

    #[test]
    fn test_player_passes_through_obstacle() {
        let mut physics = GridPhysics::new();
        physics.create_body(Body::static_rect(
            BodyOwner::Obstacle(9),
            Vec2::new(50.0, 0.0),
            Vec2::splat(8.0),
            category::OBSTACLE,
            mask::OBSTACLE,
        ));
        let player = physics.create_body(
            Body::dynamic_circle(BodyOwner::Player(1), Vec2::ZERO, 8.0, category::PLAYER, mask::PLAYER)
                .with_velocity(Vec2::new(300.0, 0.0)),
        );
        for _ in 0..30 {
            physics.step(1000.0 / 60.0);
        }
        assert!(physics.position(player).unwrap().x > 100.0);
        assert!(physics.drain_contacts().is_empty());
    }

    #[test]
    fn test_contacts_begin_then_active() {
        let mut physics = GridPhysics::new();
        let a = physics.create_body(Body::dynamic_circle(
            BodyOwner::Enemy(1),
            Vec2::ZERO,
            9.0,
            category::ENEMY,
            mask::ENEMY,
        ));
        let b = physics.create_body(Body::dynamic_circle(
            BodyOwner::Player(2),
            Vec2::new(10.0, 0.0),
            8.0,
            category::PLAYER,
            mask::PLAYER,
        ));

        physics.step(16.0);
        let first = physics.drain_contacts();
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].kind, ContactKind::Begin);
        assert_eq!((first[0].a, first[0].b), (a, b));

        // Keep them pressed together
        physics.set_velocity(a, Vec2::new(120.0, 0.0));
        physics.step(16.0);
        let second = physics.drain_contacts();
        assert_eq!(second.len(), 1);
        assert_eq!(second[0].kind, ContactKind::Active);
    }

    #[test]
    fn test_sensor_is_not_resolved() {
        let mut physics = GridPhysics::new();
        let bullet = physics.create_body(
            Body::dynamic_circle(
                BodyOwner::Projectile(3),
                Vec2::new(0.0, 0.0),
                3.0,
                category::BULLET,
                mask::BULLET,
            )
            .sensor()
            .with_velocity(Vec2::new(600.0, 0.0)),
        );
        let enemy = physics.create_body(Body::dynamic_circle(
            BodyOwner::Enemy(4),
            Vec2::new(10.0, 0.0),
            9.0,
            category::ENEMY,
            mask::ENEMY,
        ));
        physics.step(16.0);
        assert_eq!(physics.drain_contacts().len(), 1);
        assert_eq!(physics.position(enemy).unwrap(), Vec2::new(10.0, 0.0));
        assert!(physics.position(bullet).unwrap().x > 9.0);
    }

    #[test]
    fn test_fast_bullet_does_not_tunnel() {
        let mut physics = GridPhysics::new();
        physics.create_body(wall(Vec2::new(100.0, 0.0), Vec2::new(4.0, 100.0)));
        physics.create_body(
            Body::dynamic_circle(
                BodyOwner::Projectile(1),
                Vec2::ZERO,
                3.0,
                category::BULLET,
                mask::BULLET,
            )
            .sensor()
            .with_velocity(Vec2::new(1440.0, 0.0)),
        );
        for _ in 0..8 {
            physics.step(1000.0 / 60.0);
        }
        let contacts = physics.drain_contacts();
        assert!(contacts.iter().any(|c| c.owner_a == BodyOwner::Wall || c.owner_b == BodyOwner::Wall));
    }

    #[test]
    fn test_stale_handle_resolves_to_nothing() {
        let mut physics = GridPhysics::new();
        let first = physics.create_body(wall(Vec2::ZERO, Vec2::ONE));
        assert!(physics.remove_body(first));
        assert!(!physics.remove_body(first));

        let second = physics.create_body(wall(Vec2::ONE, Vec2::ONE));
        assert_ne!(first, second);
        assert_eq!(physics.owner(first), None);
        assert_eq!(physics.owner(second), Some(BodyOwner::Wall));
        assert_eq!(physics.owner(BodyHandle::DETACHED), None);
    }

    #[test]
    fn test_step_clamps_delta() {
        let mut physics = GridPhysics::new();
        let body = physics.create_body(
            Body::dynamic_circle(BodyOwner::Enemy(1), Vec2::ZERO, 9.0, category::ENEMY, mask::ENEMY)
                .with_velocity(Vec2::new(100.0, 0.0)),
        );
        physics.step(5000.0);
        let x = physics.position(body).unwrap().x;
        assert!((x - 10.0).abs() < 1e-3, "moved {x}");
    }

    #[test]
    fn test_damping_slows_bodies() {
        let mut physics = GridPhysics::new();
        let body = physics.create_body(
            Body::dynamic_circle(BodyOwner::Enemy(1), Vec2::ZERO, 9.0, category::ENEMY, mask::ENEMY)
                .with_velocity(Vec2::new(100.0, 0.0))
                .with_damping(0.05),
        );
        physics.step(1000.0 / 60.0);
        let v = physics.velocity(body).unwrap().x;
        assert!((v - 95.0).abs() < 0.01);
    }

    #[test]
    fn test_queries() {
        let mut physics = GridPhysics::new();
        let w = physics.create_body(wall(Vec2::new(100.0, 100.0), Vec2::splat(10.0)));
        let e = physics.create_body(Body::dynamic_circle(
            BodyOwner::Enemy(1),
            Vec2::new(200.0, 100.0),
            9.0,
            category::ENEMY,
            mask::ENEMY,
        ));
        assert_eq!(physics.query_point(Vec2::new(105.0, 95.0)), vec![w]);
        assert!(physics.query_point(Vec2::new(200.0, 100.0)).is_empty());
        assert_eq!(physics.query_radius(Vec2::new(150.0, 100.0), 45.0), vec![w, e]);
        // Boxes: overlap counts, a shared edge does not, dynamic bodies never do
        let cell_box = |x: f32| Aabb::from_center(Vec2::new(x, 100.0), Vec2::splat(5.0));
        assert_eq!(physics.query_aabb(&cell_box(112.0)), vec![w]);
        assert!(physics.query_aabb(&cell_box(115.0)).is_empty());
        assert!(physics.query_aabb(&cell_box(200.0)).is_empty());
        assert_eq!(physics.static_aabbs().len(), 1);
    }
}
