//! Player input controller
//!
//! Hosts translate keyboard, pointer or gamepad state into a
//! [`PlayerCommand`] per player per tick. Nothing here knows which device
//! produced it.

use glam::Vec2;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::events::GameEvent;
use super::map::{cell_occupied, in_world};
use super::physics::SpatialBackend;
use super::state::{GameState, ObstacleOrigin, ProjectileSource, Shot, cell_center, grid_cell};
use super::weapons::{WeaponAction, WeaponKind};
use crate::consts::*;
use crate::{angle_to, direction};

/// Throw distance for detonators fired without an aim point
const DEFAULT_THROW: f32 = 300.0;

/// One player's intents for a single tick
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerCommand {
    /// Movement axes, each in [-1, 1]
    pub move_x: f32,
    pub move_y: f32,
    /// World-space aim point
    pub aim: Option<Vec2>,
    pub firing: bool,
    pub placing: bool,
    pub weapon_select: Option<WeaponKind>,
    pub cycle_weapon: bool,
}

/// Commands for a tick, indexed by player; missing entries mean idle
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TickInput {
    pub players: Vec<PlayerCommand>,
}

impl TickInput {
    pub fn single(command: PlayerCommand) -> Self {
        Self {
            players: vec![command],
        }
    }
}

/// Apply every player's command
pub fn apply(state: &mut GameState, physics: &mut dyn SpatialBackend, input: &TickInput) {
    for index in 0..state.players.len() {
        if !state.players[index].is_targetable() {
            continue;
        }
        let command = input.players.get(index).cloned().unwrap_or_default();
        apply_command(state, physics, index, &command);
    }
}

fn apply_command(state: &mut GameState, physics: &mut dyn SpatialBackend, index: usize, command: &PlayerCommand) {
    switch_weapon(state, index, command);

    let axes = Vec2::new(command.move_x.clamp(-1.0, 1.0), command.move_y.clamp(-1.0, 1.0));
    let entity = &mut state.players[index].entity;
    entity.vel = axes.normalize_or_zero() * PLAYER_SPEED;
    physics.set_velocity(entity.body, entity.vel);

    let weapon = state.players[index].weapon;
    let aim = if weapon.spec().auto_aim {
        auto_aim_target(state, index).or(command.aim)
    } else {
        command.aim
    };
    let player = &mut state.players[index].entity;
    if let Some(point) = aim.filter(|p| *p != player.pos) {
        player.facing = angle_to(player.pos, point);
    }

    if command.placing {
        if let Some(deployable) = pick_deployable(state, index) {
            place(state, physics, index, deployable, command.aim);
        }
    } else if command.firing {
        fire(state, physics, index, aim);
    }
}

fn switch_weapon(state: &mut GameState, index: usize, command: &PlayerCommand) {
    let player = &mut state.players[index];
    if let Some(weapon) = command.weapon_select.filter(|w| player.has_ammo(*w)) {
        player.weapon = weapon;
    }
    if command.cycle_weapon {
        // Skip empty weapons; the pistol never runs dry
        let mut next = player.weapon.next();
        while !player.has_ammo(next) {
            next = next.next();
        }
        player.weapon = next;
    }
}

/// Selected weapon if it deploys, otherwise the first deployable with ammo
fn pick_deployable(state: &GameState, index: usize) -> Option<WeaponKind> {
    let player = &state.players[index];
    if player.weapon.is_deployable() && player.has_ammo(player.weapon) {
        return Some(player.weapon);
    }
    WeaponKind::ALL
        .into_iter()
        .find(|w| w.is_deployable() && player.has_ammo(*w))
}

/// Nearest fighting enemy within aim-assist range
fn auto_aim_target(state: &GameState, index: usize) -> Option<Vec2> {
    let from = state.players[index].entity.pos;
    state
        .enemies
        .iter()
        .filter(|e| e.entity.is_active())
        .map(|e| e.entity.pos)
        .filter(|p| p.distance(from) <= AUTO_AIM_RANGE)
        .min_by(|a, b| a.distance_squared(from).total_cmp(&b.distance_squared(from)))
}

fn fire(state: &mut GameState, physics: &mut dyn SpatialBackend, index: usize, aim: Option<Vec2>) {
    let player = &mut state.players[index];
    if !player.has_ammo(player.weapon) {
        log::debug!("Player {} out of {} ammo", index + 1, player.weapon.name());
        player.weapon = WeaponKind::Pistol;
    }
    let weapon = player.weapon;
    let spec = weapon.spec();
    let now = state.now();
    if now - state.players[index].entity.last_attack_ms < spec.fire_rate_ms {
        return;
    }

    let WeaponAction::Shoot {
        damage,
        speed,
        spread,
        pellets,
        radius,
        blast,
        detonates_at_aim,
    } = spec.action
    else {
        place(state, physics, index, weapon, aim);
        return;
    };

    let origin = state.players[index].entity.pos;
    let facing = state.players[index].entity.facing;
    let detonate_at = detonates_at_aim.then(|| aim.unwrap_or(origin + direction(facing) * DEFAULT_THROW));

    for _ in 0..pellets {
        let jitter = if spread > 0.0 {
            state.rng.random_range(-spread..=spread)
        } else {
            0.0
        };
        let dir = direction(facing + jitter);
        let shot = Shot {
            pos: origin + dir * (PLAYER_RADIUS + radius + 1.0),
            vel: dir * speed,
            radius,
            damage,
            source: ProjectileSource::Player(index),
            weapon: Some(weapon),
            blast,
            detonate_at,
            homing: None,
            ttl_ms: None,
        };
        let id = state.spawn_projectile(physics, shot);
        state.emit(GameEvent::ProjectileFired {
            id,
            by_player: Some(index),
            weapon: Some(weapon),
        });
    }

    let player = &mut state.players[index];
    player.spend_ammo(weapon);
    player.entity.last_attack_ms = now;
}

/// Drop an obstacle on the grid cell under the aim point.
///
/// An occupied or out-of-world cell makes this a no-op: no ammo is spent
/// and the cooldown does not start.
fn place(state: &mut GameState, physics: &mut dyn SpatialBackend, index: usize, weapon: WeaponKind, aim: Option<Vec2>) {
    let WeaponAction::Deploy(kind) = weapon.spec().action else {
        return;
    };
    let now = state.now();
    let player = &state.players[index];
    if !player.has_ammo(weapon) || now - player.entity.last_attack_ms < weapon.spec().fire_rate_ms {
        return;
    }

    let pos = player.entity.pos;
    let target = aim.unwrap_or(pos + direction(player.entity.facing) * PLACE_RANGE);
    let target = pos + (target - pos).clamp_length_max(PLACE_RANGE);
    let cell = grid_cell(target);
    let center = cell_center(cell);
    if !in_world(center) || cell_occupied(physics, center) {
        log::debug!("Placement at {:?} rejected", cell);
        return;
    }

    let id = state.spawn_obstacle(physics, kind, cell, ObstacleOrigin::Placed { player: index });
    let player = &mut state.players[index];
    player.spend_ammo(weapon);
    player.entity.last_attack_ms = now;
    state.emit(GameEvent::ObstaclePlaced {
        id,
        player: index,
        kind,
        cell,
    });
}
