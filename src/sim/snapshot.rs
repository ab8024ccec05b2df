//! Read-only views handed to the rendering/UI layer

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::director::WavePhase;
use super::state::{Entity, EntityId, EntityKind, GameState, ObstacleKind};
use super::weapons::WeaponKind;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeaponHud {
    pub weapon: WeaponKind,
    /// -1 means infinite
    pub ammo: i32,
}

/// Throttled HUD data, indexed by player where it is a list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HudSnapshot {
    pub score: u64,
    pub multiplier: u8,
    pub healths: Vec<f32>,
    pub lives_remaining: Vec<u8>,
    pub weapons: Vec<WeaponHud>,
    pub wave: u32,
    /// Enemies left to release plus enemies still fighting
    pub enemies_left: u32,
    /// Ticks until the next wave, during the intermission
    pub countdown: Option<u32>,
    pub surge: f32,
}

impl HudSnapshot {
    pub fn capture(state: &GameState) -> Self {
        Self {
            score: state.scores.score,
            multiplier: state.scores.multiplier,
            healths: state.players.iter().map(|p| p.entity.hp.max(0.0)).collect(),
            lives_remaining: state.players.iter().map(|p| p.lives).collect(),
            weapons: state
                .players
                .iter()
                .map(|p| WeaponHud {
                    weapon: p.weapon,
                    ammo: p.ammo_for(p.weapon),
                })
                .collect(),
            wave: state.wave.wave,
            enemies_left: state.wave.remaining + state.live_enemy_count() as u32,
            countdown: match state.wave.phase {
                WavePhase::Countdown { ticks } => Some(ticks),
                _ => None,
            },
            surge: state.surge(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityView {
    pub id: EntityId,
    pub kind: EntityKind,
    pub pos: Vec2,
    pub vel: Vec2,
    pub facing: f32,
    pub radius: f32,
    pub hp: f32,
    pub max_hp: f32,
    pub dying: bool,
}

impl From<&Entity> for EntityView {
    fn from(e: &Entity) -> Self {
        Self {
            id: e.id,
            kind: e.kind,
            pos: e.pos,
            vel: e.vel,
            facing: e.facing,
            radius: e.radius,
            hp: e.hp,
            max_hp: e.max_hp,
            dying: e.is_dying(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerView {
    pub index: usize,
    pub entity: EntityView,
    pub weapon: WeaponKind,
    pub lives: u8,
    pub score: u64,
    pub kills: u32,
    pub eliminated: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObstacleView {
    pub entity: EntityView,
    pub kind: ObstacleKind,
    pub cell: (i32, i32),
}

/// Full positional picture of the arena for drawing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorldSnapshot {
    pub tick: u64,
    pub time_ms: f64,
    pub players: Vec<PlayerView>,
    pub enemies: Vec<EntityView>,
    pub obstacles: Vec<ObstacleView>,
    pub projectiles: Vec<EntityView>,
    pub pickups: Vec<EntityView>,
    pub camera: Option<Vec2>,
    pub hud: HudSnapshot,
}

impl WorldSnapshot {
    pub fn capture(state: &GameState) -> Self {
        Self {
            tick: state.time_ticks,
            time_ms: state.time_ms,
            players: state
                .players
                .iter()
                .map(|p| PlayerView {
                    index: p.index,
                    entity: EntityView::from(&p.entity),
                    weapon: p.weapon,
                    lives: p.lives,
                    score: p.score,
                    kills: p.kills,
                    eliminated: p.eliminated,
                })
                .collect(),
            enemies: state.enemies.iter().map(|e| EntityView::from(&e.entity)).collect(),
            obstacles: state
                .obstacles
                .iter()
                .filter(|o| !o.entity.dead)
                .map(|o| ObstacleView {
                    entity: EntityView::from(&o.entity),
                    kind: o.kind,
                    cell: o.cell,
                })
                .collect(),
            projectiles: state
                .projectiles
                .iter()
                .filter(|p| p.active)
                .map(|p| EntityView::from(&p.entity))
                .collect(),
            pickups: state
                .pickups
                .iter()
                .filter(|p| !p.consumed)
                .map(|p| EntityView::from(&p.entity))
                .collect(),
            camera: camera_focus(state),
            hud: HudSnapshot::capture(state),
        }
    }
}

/// Average position of players still in the fight
pub fn camera_focus(state: &GameState) -> Option<Vec2> {
    let living: Vec<Vec2> = state
        .players
        .iter()
        .filter(|p| !p.eliminated)
        .map(|p| p.entity.pos)
        .collect();
    if living.is_empty() {
        return None;
    }
    Some(living.iter().copied().sum::<Vec2>() / living.len() as f32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::SessionConfig;
    use crate::sim::physics::GridPhysics;

    fn two_player_state() -> GameState {
        let config = SessionConfig {
            player_count: 2,
            ..Default::default()
        };
        let mut state = GameState::new(&config);
        let mut physics = GridPhysics::new();
        state.spawn_player(&mut physics, 0);
        state.spawn_player(&mut physics, 1);
        state
    }

    #[test]
    fn test_hud_is_indexed_by_player() {
        let mut state = two_player_state();
        state.players[1].entity.hp = 40.0;
        state.players[1].weapon = WeaponKind::Grenade;

        let hud = HudSnapshot::capture(&state);
        assert_eq!(hud.healths, vec![100.0, 40.0]);
        assert_eq!(hud.lives_remaining, vec![3, 3]);
        assert_eq!(hud.weapons[0].ammo, -1);
        assert_eq!(hud.weapons[1].weapon, WeaponKind::Grenade);
        assert_eq!(hud.multiplier, 1);
    }

    #[test]
    fn test_camera_ignores_eliminated_players() {
        let mut state = two_player_state();
        let both = camera_focus(&state).unwrap();
        assert!((both.x - 800.0).abs() < 1e-3);

        state.players[0].eliminated = true;
        assert_eq!(camera_focus(&state), Some(state.players[1].entity.pos));

        state.players[1].eliminated = true;
        assert_eq!(camera_focus(&state), None);
    }

    #[test]
    fn test_snapshot_serializes() {
        let state = two_player_state();
        let snapshot = WorldSnapshot::capture(&state);
        let json = serde_json::to_string(&snapshot).unwrap();
        assert!(json.contains("\"players\""));
    }
}
