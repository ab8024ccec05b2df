//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Fixed timestep only
//! - Seeded RNG only
//! - Stable iteration order (by entity ID)
//! - No rendering or platform dependencies

pub mod ai;
pub mod collision;
pub mod combat;
pub mod director;
pub mod events;
pub mod input;
pub mod lifecycle;
pub mod map;
pub mod pathfinding;
pub mod physics;
pub mod session;
pub mod snapshot;
pub mod spatial_hash;
pub mod state;
pub mod tick;
pub mod weapons;

pub use collision::{Aabb, CollisionResult};
pub use director::{WavePhase, WaveState};
pub use events::GameEvent;
pub use input::{PlayerCommand, TickInput};
pub use pathfinding::OccupancyGrid;
pub use physics::{Body, BodyHandle, BodyOwner, Contact, ContactKind, GridPhysics, SpatialBackend};
pub use session::Session;
pub use snapshot::{HudSnapshot, WorldSnapshot};
pub use state::{
    Enemy, Entity, EntityId, EntityKind, GamePhase, GameState, Obstacle, ObstacleKind, Pickup,
    PickupKind, Player, Projectile, ScoreBoard,
};
pub use tick::{FrameClock, tick};
pub use weapons::{BlastSpec, ChainPolicy, WeaponKind};
