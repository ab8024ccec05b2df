//! Output events, queued during a tick and drained by the host once per frame

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::snapshot::HudSnapshot;
use super::state::{EntityId, EntityKind, ObstacleKind, PickupKind};
use super::weapons::WeaponKind;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum GameEvent {
    EnemyKilled {
        id: EntityId,
        kind: EntityKind,
        pos: Vec2,
        by_player: Option<usize>,
        points: u64,
        multiplier: u8,
    },
    PlayerDamaged {
        player: usize,
        amount: f32,
        hp: f32,
    },
    PlayerRevived {
        player: usize,
        lives_left: u8,
    },
    /// Out of lives for good
    PlayerEliminated {
        player: usize,
    },
    ProjectileFired {
        id: EntityId,
        by_player: Option<usize>,
        weapon: Option<WeaponKind>,
    },
    Explosion {
        pos: Vec2,
        radius: f32,
        /// 0 for the initial blast, +1 per chained detonation
        depth: u32,
    },
    ObstacleDestroyed {
        id: EntityId,
        kind: ObstacleKind,
        pos: Vec2,
        /// Destroyed without a follow-on explosion
        silent: bool,
    },
    ObstaclePlaced {
        id: EntityId,
        player: usize,
        kind: ObstacleKind,
        cell: (i32, i32),
    },
    ItemPickedUp {
        player: usize,
        kind: PickupKind,
    },
    WaveStarted {
        wave: u32,
        total: u32,
    },
    WaveCleared {
        wave: u32,
    },
    SurgeRaised {
        level: u32,
        multiplier: f32,
    },
    Hud(HudSnapshot),
    /// Fired exactly once per session
    GameOver {
        final_score: u64,
    },
}
