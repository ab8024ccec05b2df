//! Enemy AI
//!
//! Each active enemy picks the nearest player it can perceive, faces them and
//! walks at them. When walls block the view, it follows an A* route instead,
//! refreshed every few ticks. A recent hit (stun) leaves velocity alone so
//! knockback plays out. Devils also lob a slow homing virus.

use glam::Vec2;

use super::events::GameEvent;
use super::map::in_safe_zone;
use super::physics::SpatialBackend;
use super::state::{EntityKind, GameState, ProjectileSource, Shot};
use crate::consts::*;
use crate::{angle_to, direction, normalize_angle};

/// Run AI for every enemy that is still fighting
pub fn update(state: &mut GameState, physics: &mut dyn SpatialBackend) {
    let now = state.now();
    let speed_scale = state.profile().speed * state.surge();

    for ei in 0..state.enemies.len() {
        if !state.enemies[ei].entity.is_active() {
            continue;
        }
        let pos = state.enemies[ei].entity.pos;
        let target = select_target(state, pos);
        let target_id = target.map(|pi| state.players[pi].entity.id);
        state.enemies[ei].target = target_id;

        let Some(pi) = target else {
            let entity = &mut state.enemies[ei].entity;
            if !entity.is_stunned(now) {
                entity.vel = Vec2::ZERO;
                physics.set_velocity(entity.body, Vec2::ZERO);
            }
            continue;
        };
        let target_pos = state.players[pi].entity.pos;
        state.enemies[ei].entity.facing = angle_to(pos, target_pos);

        if !state.enemies[ei].entity.is_stunned(now) {
            let heading = steer(state, ei, target_pos);
            let entity = &mut state.enemies[ei].entity;
            entity.vel = heading * entity.kind.enemy_base_speed() * speed_scale;
            physics.set_velocity(entity.body, entity.vel);
        }

        if state.enemies[ei].entity.kind == EntityKind::Devil {
            devil_attack(state, physics, ei, pi);
        }
    }
}

/// Nearest player an enemy can perceive
pub fn select_target(state: &GameState, from: Vec2) -> Option<usize> {
    state
        .players
        .iter()
        .enumerate()
        .filter(|(_, p)| p.is_targetable() && !in_safe_zone(p.entity.pos))
        .min_by(|(_, a), (_, b)| {
            a.entity
                .pos
                .distance_squared(from)
                .total_cmp(&b.entity.pos.distance_squared(from))
        })
        .map(|(index, _)| index)
}

/// Unit heading toward the target, around walls if it is out of sight
fn steer(state: &mut GameState, ei: usize, target: Vec2) -> Vec2 {
    let tick = state.time_ticks;
    let nav = &state.nav;
    let enemy = &mut state.enemies[ei];
    let pos = enemy.entity.pos;

    if nav.has_line_of_sight(pos, target, LOS_MAX_DISTANCE) {
        enemy.path.clear();
        enemy.path_tick = None;
        return (target - pos).normalize_or_zero();
    }

    let stale = enemy
        .path_tick
        .is_none_or(|t| tick.saturating_sub(t) >= PATH_REFRESH_TICKS);
    if stale {
        enemy.path_tick = Some(tick);
        // No route under the iteration cap: straight pursuit until the next refresh
        enemy.path = nav
            .find_path(pos, target, PATH_MAX_ITERATIONS)
            .unwrap_or_default();
    }

    let reached = enemy
        .path
        .iter()
        .take_while(|wp| wp.distance(pos) <= WAYPOINT_REACHED)
        .count();
    enemy.path.drain(..reached);

    let next = enemy.path.first().copied().unwrap_or(target);
    (next - pos).normalize_or_zero()
}

/// Fire a homing virus at the target if in range and off cooldown
fn devil_attack(state: &mut GameState, physics: &mut dyn SpatialBackend, ei: usize, pi: usize) {
    let now = state.now();
    let devil = &state.enemies[ei].entity;
    let target = &state.players[pi].entity;
    if now - devil.last_attack_ms < DEVIL_FIRE_RATE_MS {
        return;
    }
    let offset = target.pos - devil.pos;
    if offset.length() > DEVIL_ATTACK_RANGE {
        return;
    }
    let dir = offset.normalize_or_zero();
    if dir == Vec2::ZERO {
        return;
    }

    let shot = Shot {
        pos: devil.pos + dir * (devil.radius + VIRUS_RADIUS + 1.0),
        vel: dir * VIRUS_SPEED,
        radius: VIRUS_RADIUS,
        damage: VIRUS_DAMAGE,
        source: ProjectileSource::Enemy(devil.id),
        weapon: None,
        blast: None,
        detonate_at: None,
        homing: Some(target.id),
        ttl_ms: Some(VIRUS_TTL_MS),
    };
    state.enemies[ei].entity.last_attack_ms = now;
    let id = state.spawn_projectile(physics, shot);
    state.emit(GameEvent::ProjectileFired {
        id,
        by_player: None,
        weapon: None,
    });
}

/// Turn homing projectiles toward their target at a bounded rate
pub fn steer_homing(state: &mut GameState, physics: &mut dyn SpatialBackend, dt_ms: f32) {
    let max_turn = VIRUS_TURN_RATE * dt_ms / 1000.0;
    for i in 0..state.projectiles.len() {
        if !state.projectiles[i].active {
            continue;
        }
        let Some(target_id) = state.projectiles[i].homing else {
            continue;
        };
        let Some(target_pos) = state
            .player_index_by_id(target_id)
            .map(|pi| &state.players[pi])
            .filter(|p| p.is_targetable() && !in_safe_zone(p.entity.pos))
            .map(|p| p.entity.pos)
        else {
            continue;
        };

        let entity = &mut state.projectiles[i].entity;
        let speed = entity.vel.length();
        let current = entity.vel.y.atan2(entity.vel.x);
        let turn = normalize_angle(angle_to(entity.pos, target_pos) - current).clamp(-max_turn, max_turn);
        entity.facing = current + turn;
        entity.vel = direction(entity.facing) * speed;
        physics.set_velocity(entity.body, entity.vel);
    }
}
