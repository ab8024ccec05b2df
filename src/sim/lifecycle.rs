//! Deaths, revivals and removal of spent entities

use glam::Vec2;
use rand::Rng;

use super::events::GameEvent;
use super::map::in_world;
use super::physics::{BodyHandle, SpatialBackend};
use super::state::{GamePhase, GameState, ObstacleKind, PickupKind};
use super::weapons::BlastSpec;
use crate::consts::*;

/// End-of-tick bookkeeping: lives, game over, death slides, cleanup.
///
/// The tick resolves player deaths earlier as well; the pass here only
/// catches damage dealt after that point.
pub fn update(state: &mut GameState, physics: &mut dyn SpatialBackend) {
    resolve_player_deaths(state, physics);
    check_game_over(state);
    advance_death_slides(state, physics);
    cleanup(state, physics);
}

/// Revive dead players who still have lives, eliminate the rest.
///
/// `lives` counts the life in progress, so a death with one life left is
/// final. Revival happens in the same tick as the death.
pub fn resolve_player_deaths(state: &mut GameState, physics: &mut dyn SpatialBackend) {
    let now = state.now();
    for index in 0..state.players.len() {
        let spawn = state.player_spawn_point(index);
        let player = &mut state.players[index];
        if player.eliminated || !player.entity.dead {
            continue;
        }
        player.lives = player.lives.saturating_sub(1);

        if player.lives > 0 {
            let entity = &mut player.entity;
            entity.dead = false;
            entity.hp = entity.max_hp;
            entity.pos = spawn;
            entity.vel = Vec2::ZERO;
            player.last_contact_ms = now;
            physics.set_position(entity.body, spawn);
            physics.set_velocity(entity.body, Vec2::ZERO);
            let lives_left = player.lives;
            log::info!("Player {} revived ({} lives left)", index + 1, lives_left);
            state.emit(GameEvent::PlayerRevived {
                player: index,
                lives_left,
            });
        } else {
            player.eliminated = true;
            player.entity.vel = Vec2::ZERO;
            physics.remove_body(player.entity.body);
            player.entity.body = BodyHandle::DETACHED;
            log::info!("Player {} eliminated", index + 1);
            state.emit(GameEvent::PlayerEliminated { player: index });
        }
    }
}

fn check_game_over(state: &mut GameState) {
    if state.game_over_fired || state.players.is_empty() {
        return;
    }
    if state.players.iter().all(|p| p.eliminated) {
        state.phase = GamePhase::GameOver;
        state.game_over_fired = true;
        let final_score = state.scores.score;
        log::info!(
            "Game over on wave {} with {} points",
            state.wave.wave,
            final_score
        );
        state.emit(GameEvent::GameOver { final_score });
    }
}

/// Count down dying enemies and drop them once the slide is over
fn advance_death_slides(state: &mut GameState, physics: &mut dyn SpatialBackend) {
    for enemy in &mut state.enemies {
        let entity = &mut enemy.entity;
        let Some(ticks) = entity.dying else {
            continue;
        };
        let left = ticks.saturating_sub(1);
        entity.dying = Some(left);
        if left == 0 {
            entity.dead = true;
            physics.remove_body(entity.body);
        }
    }
    state.enemies.retain(|e| !e.entity.dead);
}

/// Destroy an obstacle, paying out score and loot.
///
/// Returns the follow-on blast for explosive obstacles unless `silent`.
pub fn destroy_obstacle(
    state: &mut GameState,
    physics: &mut dyn SpatialBackend,
    oi: usize,
    credit: Option<usize>,
    silent: bool,
) -> Option<(Vec2, BlastSpec)> {
    let obstacle = &mut state.obstacles[oi];
    if obstacle.entity.dead {
        return None;
    }
    obstacle.entity.dead = true;
    obstacle.entity.hp = obstacle.entity.hp.min(0.0);
    physics.remove_body(obstacle.entity.body);

    let id = obstacle.entity.id;
    let kind = obstacle.kind;
    let pos = obstacle.entity.pos;
    let silent = silent && kind.is_explosive();
    state.emit(GameEvent::ObstacleDestroyed {
        id,
        kind,
        pos,
        silent,
    });

    if let Some(index) = credit {
        state.add_score(OBSTACLE_SCORE);
        if let Some(player) = state.players.get_mut(index) {
            player.score = player.score.saturating_add(OBSTACLE_SCORE);
        }
    }
    if kind == ObstacleKind::Wall && state.rng.random_bool(WALL_HEALTH_DROP) {
        state.spawn_pickup(physics, PickupKind::HealthPack, pos);
    }

    if silent {
        return None;
    }
    kind.blast().map(|blast| (pos, blast))
}

/// Drop spent projectiles, consumed pickups and destroyed obstacles
fn cleanup(state: &mut GameState, physics: &mut dyn SpatialBackend) {
    let now = state.now();
    for projectile in &mut state.projectiles {
        let expired = projectile.expires_ms.is_some_and(|t| now >= t);
        if expired || !in_world(projectile.entity.pos) {
            projectile.active = false;
        }
        if !projectile.active {
            physics.remove_body(projectile.entity.body);
        }
    }
    state.projectiles.retain(|p| p.active);

    for pickup in state.pickups.iter().filter(|p| p.consumed) {
        physics.remove_body(pickup.entity.body);
    }
    state.pickups.retain(|p| !p.consumed);

    state.obstacles.retain(|o| !o.entity.dead);
}
