//! Combat resolution
//!
//! Turns physics contacts into damage, knockback, deaths and explosions.
//! Every handler re-checks both participants first: a projectile can touch
//! several bodies in one step, and contacts may name entities that were
//! removed or killed earlier in the same pass. Those are silent no-ops.

use std::collections::VecDeque;

use glam::Vec2;
use rand::Rng;

use super::events::GameEvent;
use super::lifecycle::destroy_obstacle;
use super::physics::{BodyOwner, Contact, ContactKind, SpatialBackend, mask};
use super::state::{EntityId, EntityKind, GameState, PickupKind};
use super::weapons::{BlastSpec, ChainPolicy, WeaponKind};
use crate::consts::*;

/// Ammo bonuses rolled on a credited kill: (cumulative chance, weapon, amount)
const LOOT_TABLE: [(f64, WeaponKind, i32); 4] = [
    (0.10, WeaponKind::Uzi, 50),
    (0.15, WeaponKind::Shotgun, 10),
    (0.20, WeaponKind::FakeWall, 5),
    (0.25, WeaponKind::Barrel, 5),
];

/// A contact pair with both sides identified
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Interaction {
    ProjectileEnemy { projectile: EntityId, enemy: EntityId },
    ProjectileObstacle { projectile: EntityId, obstacle: EntityId },
    ProjectileWall { projectile: EntityId },
    ProjectilePlayer { projectile: EntityId, player: EntityId },
    EnemyPlayer { enemy: EntityId, player: EntityId },
    EnemyEnemy { a: EntityId, b: EntityId },
    EnemyObstacle { enemy: EntityId, obstacle: EntityId },
    PlayerPickup { player: EntityId, pickup: EntityId },
}

fn classify(a: BodyOwner, b: BodyOwner) -> Option<Interaction> {
    classify_ordered(a, b).or_else(|| classify_ordered(b, a))
}

fn classify_ordered(a: BodyOwner, b: BodyOwner) -> Option<Interaction> {
    use BodyOwner::*;
    match (a, b) {
        (Projectile(projectile), Enemy(enemy)) => Some(Interaction::ProjectileEnemy { projectile, enemy }),
        (Projectile(projectile), Obstacle(obstacle)) => {
            Some(Interaction::ProjectileObstacle { projectile, obstacle })
        }
        (Projectile(projectile), Wall) => Some(Interaction::ProjectileWall { projectile }),
        (Projectile(projectile), Player(player)) => Some(Interaction::ProjectilePlayer { projectile, player }),
        (Enemy(enemy), Player(player)) => Some(Interaction::EnemyPlayer { enemy, player }),
        (Enemy(a), Enemy(b)) => Some(Interaction::EnemyEnemy { a, b }),
        (Enemy(enemy), Obstacle(obstacle)) => Some(Interaction::EnemyObstacle { enemy, obstacle }),
        (Player(player), Pickup(pickup)) => Some(Interaction::PlayerPickup { player, pickup }),
        _ => None,
    }
}

/// Apply every contact from the last physics step, in order
pub fn resolve_contacts(state: &mut GameState, physics: &mut dyn SpatialBackend, contacts: &[Contact]) {
    for contact in contacts {
        let Some(interaction) = classify(contact.owner_a, contact.owner_b) else {
            continue;
        };
        match interaction {
            Interaction::ProjectileEnemy { projectile, enemy } => {
                projectile_hits_enemy(state, physics, projectile, enemy)
            }
            Interaction::ProjectileObstacle { projectile, obstacle } => {
                projectile_hits_obstacle(state, physics, projectile, obstacle)
            }
            Interaction::ProjectileWall { projectile } => projectile_hits_wall(state, physics, projectile),
            Interaction::ProjectilePlayer { projectile, player } => {
                projectile_hits_player(state, physics, projectile, player)
            }
            Interaction::EnemyPlayer { enemy, player } => enemy_touches_player(state, enemy, player),
            Interaction::EnemyEnemy { a, b } => {
                if contact.kind == ContactKind::Begin {
                    transfer_momentum(state, physics, a, b);
                }
            }
            Interaction::EnemyObstacle { enemy, obstacle } => besiege(state, physics, enemy, obstacle),
            Interaction::PlayerPickup { player, pickup } => collect_pickup(state, player, pickup),
        }
    }
}

/// Stop a projectile from interacting with anything else
fn deactivate_projectile(state: &mut GameState, physics: &mut dyn SpatialBackend, pi: usize) {
    let projectile = &mut state.projectiles[pi];
    projectile.active = false;
    projectile.entity.dead = true;
    physics.set_mask(projectile.entity.body, mask::NONE);
}

fn live_projectile(state: &GameState, id: EntityId) -> Option<usize> {
    state.projectile_index(id).filter(|&pi| state.projectiles[pi].active)
}

fn active_enemy(state: &GameState, id: EntityId) -> Option<usize> {
    state.enemy_index(id).filter(|&ei| state.enemies[ei].entity.is_active())
}

fn live_player(state: &GameState, id: EntityId) -> Option<usize> {
    state
        .player_index_by_id(id)
        .filter(|&pi| state.players[pi].is_targetable())
}

fn projectile_hits_enemy(state: &mut GameState, physics: &mut dyn SpatialBackend, pid: EntityId, eid: EntityId) {
    let (Some(pi), Some(ei)) = (live_projectile(state, pid), active_enemy(state, eid)) else {
        return;
    };
    if state.projectiles[pi].is_enemy_origin() {
        return;
    }

    let projectile = &state.projectiles[pi];
    let damage = projectile.damage;
    let dir = projectile.entity.vel.normalize_or_zero();
    let credit = projectile.credited_player();
    let blast = projectile.blast;
    let pos = projectile.entity.pos;
    deactivate_projectile(state, physics, pi);

    if damage > 0.0 {
        strike_enemy(state, physics, ei, damage, dir, credit);
    }
    if let Some(blast) = blast {
        detonate(state, physics, pos, blast, credit);
    }
}

/// Direct hit: damage, stun, knockback along the shot, death if lethal
pub fn strike_enemy(
    state: &mut GameState,
    physics: &mut dyn SpatialBackend,
    ei: usize,
    damage: f32,
    dir: Vec2,
    credit: Option<usize>,
) {
    let now = state.now();
    let entity = &mut state.enemies[ei].entity;
    if !entity.is_active() {
        return;
    }
    entity.hp -= damage;
    entity.stun(now, STUN_MS);
    // Knockback replaces the current velocity instead of adding to it
    entity.vel = dir * damage * KNOCKBACK_PER_DAMAGE;
    physics.set_velocity(entity.body, entity.vel);

    if entity.hp <= 0.0 {
        kill_enemy(state, physics, ei, credit, dir);
    }
}

/// Start an enemy's death slide and pay out score and loot
pub fn kill_enemy(
    state: &mut GameState,
    physics: &mut dyn SpatialBackend,
    ei: usize,
    credit: Option<usize>,
    push_dir: Vec2,
) {
    let enemy = &mut state.enemies[ei];
    if enemy.entity.dead || enemy.entity.is_dying() {
        return;
    }
    enemy.entity.hp = enemy.entity.hp.min(0.0);
    enemy.entity.dying = Some(DEATH_SLIDE_TICKS);
    enemy.entity.vel += push_dir * DEATH_KNOCKBACK;
    enemy.path.clear();
    enemy.target = None;
    physics.set_mask(enemy.entity.body, mask::DYING_ENEMY);
    physics.set_velocity(enemy.entity.body, enemy.entity.vel);

    let id = enemy.entity.id;
    let kind = enemy.entity.kind;
    let pos = enemy.entity.pos;
    let points = state.register_kill(kind.kill_score(), credit);
    let multiplier = state.scores.multiplier;
    state.emit(GameEvent::EnemyKilled {
        id,
        kind,
        pos,
        by_player: credit,
        points,
        multiplier,
    });

    roll_loot(state, physics, credit, kind, pos);
}

fn roll_loot(
    state: &mut GameState,
    physics: &mut dyn SpatialBackend,
    credit: Option<usize>,
    kind: EntityKind,
    pos: Vec2,
) {
    if let Some(index) = credit {
        let roll: f64 = state.rng.random();
        let bonus = LOOT_TABLE.iter().find(|(chance, _, _)| roll < *chance);
        if let (Some(&(_, weapon, amount)), Some(player)) = (bonus, state.players.get_mut(index)) {
            player.add_ammo(weapon, amount);
        }
    }
    if kind == EntityKind::Devil && state.rng.random_bool(DEVIL_HEALTH_DROP) {
        state.spawn_pickup(physics, PickupKind::HealthPack, pos);
    }
}

fn projectile_hits_obstacle(state: &mut GameState, physics: &mut dyn SpatialBackend, pid: EntityId, oid: EntityId) {
    let Some(pi) = live_projectile(state, pid) else {
        return;
    };
    let Some(oi) = state.obstacle_index(oid).filter(|&oi| !state.obstacles[oi].entity.dead) else {
        return;
    };

    let projectile = &state.projectiles[pi];
    let damage = projectile.damage;
    let credit = projectile.credited_player();
    let enemy_origin = projectile.is_enemy_origin();
    let blast = projectile.blast;
    let pos = projectile.entity.pos;
    // Every obstacle absorbs the shot
    deactivate_projectile(state, physics, pi);

    if let Some(blast) = blast {
        detonate(state, physics, pos, blast, credit);
        return;
    }
    // Bullets only hurt explosive obstacles
    if enemy_origin || !state.obstacles[oi].entity.explosive {
        return;
    }
    state.obstacles[oi].entity.hp -= damage;
    if state.obstacles[oi].entity.hp <= 0.0 {
        if let Some((at, spec)) = destroy_obstacle(state, physics, oi, credit, false) {
            detonate(state, physics, at, spec, credit);
        }
    }
}

fn projectile_hits_wall(state: &mut GameState, physics: &mut dyn SpatialBackend, pid: EntityId) {
    let Some(pi) = live_projectile(state, pid) else {
        return;
    };
    let projectile = &state.projectiles[pi];
    let blast = projectile.blast;
    let pos = projectile.entity.pos;
    let credit = projectile.credited_player();
    deactivate_projectile(state, physics, pi);
    if let Some(blast) = blast {
        detonate(state, physics, pos, blast, credit);
    }
}

fn projectile_hits_player(state: &mut GameState, physics: &mut dyn SpatialBackend, pid: EntityId, player_id: EntityId) {
    let (Some(pi), Some(index)) = (live_projectile(state, pid), live_player(state, player_id)) else {
        return;
    };
    if !state.projectiles[pi].is_enemy_origin() {
        return;
    }
    let damage = state.projectiles[pi].damage;
    deactivate_projectile(state, physics, pi);
    damage_player(state, index, damage);
}

/// Hurt a player; lethal damage marks them dead for the lives logic
pub fn damage_player(state: &mut GameState, index: usize, amount: f32) {
    let now = state.now();
    let Some(player) = state.players.get_mut(index) else {
        return;
    };
    if !player.is_targetable() || amount <= 0.0 {
        return;
    }
    player.entity.hp -= amount;
    player.entity.last_hit_ms = now;
    if player.entity.hp <= 0.0 {
        player.entity.hp = 0.0;
        player.entity.dead = true;
        log::info!("Player {} down", index + 1);
    }
    let hp = player.entity.hp;
    state.emit(GameEvent::PlayerDamaged {
        player: index,
        amount,
        hp,
    });
}

/// Melee touch, rate-limited per player rather than per contact
fn enemy_touches_player(state: &mut GameState, eid: EntityId, player_id: EntityId) {
    let (Some(ei), Some(index)) = (active_enemy(state, eid), live_player(state, player_id)) else {
        return;
    };
    let now = state.now();
    if now - state.players[index].last_contact_ms < ENEMY_CONTACT_COOLDOWN_MS {
        return;
    }
    state.players[index].last_contact_ms = now;
    state.enemies[ei].entity.last_attack_ms = now;
    damage_player(state, index, ENEMY_CONTACT_DAMAGE);
}

/// A fast enemy shoves a slower one, passing on part of its velocity
fn transfer_momentum(state: &mut GameState, physics: &mut dyn SpatialBackend, a: EntityId, b: EntityId) {
    let (Some(ai), Some(bi)) = (active_enemy(state, a), active_enemy(state, b)) else {
        return;
    };
    let speed_a = state.enemies[ai].entity.vel.length();
    let speed_b = state.enemies[bi].entity.vel.length();
    let (fast, slow) = if speed_a >= speed_b { (ai, bi) } else { (bi, ai) };
    let fast_vel = state.enemies[fast].entity.vel;
    if fast_vel.length() <= MOMENTUM_SPEED_THRESHOLD {
        return;
    }

    let now = state.now();
    let slow_entity = &mut state.enemies[slow].entity;
    slow_entity.vel = fast_vel * MOMENTUM_TRANSFER;
    slow_entity.stun(now, MOMENTUM_STUN_MS);
    physics.set_velocity(slow_entity.body, slow_entity.vel);
}

/// Enemies chew through non-explosive obstacles on a fixed cadence
fn besiege(state: &mut GameState, physics: &mut dyn SpatialBackend, eid: EntityId, oid: EntityId) {
    let Some(ei) = active_enemy(state, eid) else {
        return;
    };
    let Some(oi) = state.obstacle_index(oid).filter(|&oi| {
        let o = &state.obstacles[oi].entity;
        !o.dead && !o.explosive
    }) else {
        return;
    };
    let now = state.now();
    if now - state.enemies[ei].last_siege_ms < SIEGE_COOLDOWN_MS {
        return;
    }
    state.enemies[ei].last_siege_ms = now;
    state.obstacles[oi].entity.hp -= SIEGE_DAMAGE;
    if state.obstacles[oi].entity.hp <= 0.0 {
        destroy_obstacle(state, physics, oi, None, false);
    }
}

fn collect_pickup(state: &mut GameState, player_id: EntityId, pickup_id: EntityId) {
    let Some(index) = live_player(state, player_id) else {
        return;
    };
    let Some(ki) = state.pickup_index(pickup_id) else {
        return;
    };
    let pickup = &mut state.pickups[ki];
    if pickup.consumed {
        return;
    }
    pickup.consumed = true;
    pickup.entity.dead = true;
    let kind = pickup.kind;

    match kind {
        PickupKind::HealthPack => {
            let entity = &mut state.players[index].entity;
            entity.hp = (entity.hp + HEALTH_PACK_VALUE).min(entity.max_hp);
        }
    }
    state.emit(GameEvent::ItemPickedUp { player: index, kind });
}

/// Grenades that reached their aim point go off
pub fn detonate_arrivals(state: &mut GameState, physics: &mut dyn SpatialBackend) {
    for pi in 0..state.projectiles.len() {
        let projectile = &state.projectiles[pi];
        if !projectile.active {
            continue;
        }
        let (Some(target), Some(blast)) = (projectile.detonate_at, projectile.blast) else {
            continue;
        };
        let to_target = target - projectile.entity.pos;
        let arrived = to_target.length() <= projectile.entity.radius
            || to_target.dot(projectile.entity.vel) <= 0.0;
        if !arrived {
            continue;
        }
        let credit = projectile.credited_player();
        deactivate_projectile(state, physics, pi);
        detonate(state, physics, target, blast, credit);
    }
}

#[derive(Debug, Clone, Copy)]
struct PendingBlast {
    pos: Vec2,
    spec: BlastSpec,
    depth: u32,
}

/// Radial damage and knockback around `origin`, scaled by `(r - d) / r`.
///
/// Explosive obstacles caught in a `Propagate` blast queue their own blast
/// one level deeper, up to [`MAX_CHAIN_DEPTH`]; under `Contain` they are
/// destroyed silently so propagation depth stays at 1.
pub fn detonate(
    state: &mut GameState,
    physics: &mut dyn SpatialBackend,
    origin: Vec2,
    blast: BlastSpec,
    credit: Option<usize>,
) {
    let mut queue = VecDeque::from([PendingBlast {
        pos: origin,
        spec: blast,
        depth: 0,
    }]);

    while let Some(PendingBlast { pos, spec, depth }) = queue.pop_front() {
        log::debug!(
            "Blast at ({:.0}, {:.0}) r={} depth={}",
            pos.x,
            pos.y,
            spec.radius,
            depth
        );
        state.emit(GameEvent::Explosion {
            pos,
            radius: spec.radius,
            depth,
        });
        let now = state.now();

        for ei in 0..state.enemies.len() {
            let entity = &mut state.enemies[ei].entity;
            if !entity.is_active() {
                continue;
            }
            let Some((scale, dir)) = falloff(pos, entity.pos, spec.radius) else {
                continue;
            };
            entity.hp -= spec.damage * scale;
            entity.stun(now, STUN_MS);
            entity.vel = dir * BLAST_KNOCKBACK * scale;
            physics.set_velocity(entity.body, entity.vel);
            if entity.hp <= 0.0 {
                kill_enemy(state, physics, ei, credit, dir);
            }
        }

        for index in 0..state.players.len() {
            let player = &mut state.players[index];
            if !player.is_targetable() {
                continue;
            }
            let Some((scale, dir)) = falloff(pos, player.entity.pos, spec.radius) else {
                continue;
            };
            player.entity.vel = dir * BLAST_KNOCKBACK * scale;
            physics.set_velocity(player.entity.body, player.entity.vel);
            damage_player(state, index, spec.damage * PLAYER_BLAST_DAMAGE_SCALE * scale);
        }

        for oi in 0..state.obstacles.len() {
            let obstacle = &mut state.obstacles[oi].entity;
            if obstacle.dead {
                continue;
            }
            // Reach the obstacle's edge, not just its center
            let reach = spec.radius + OBSTACLE_HALF_SIZE;
            let Some((scale, _)) = falloff(pos, obstacle.pos, reach) else {
                continue;
            };
            if obstacle.explosive {
                let chain = spec.policy == ChainPolicy::Propagate && depth + 1 < MAX_CHAIN_DEPTH;
                if let Some((at, next)) = destroy_obstacle(state, physics, oi, credit, !chain) {
                    queue.push_back(PendingBlast {
                        pos: at,
                        spec: next,
                        depth: depth + 1,
                    });
                }
            } else {
                obstacle.hp -= spec.damage * scale;
                if obstacle.hp <= 0.0 {
                    destroy_obstacle(state, physics, oi, credit, false);
                }
            }
        }
    }
}

/// Linear falloff and push direction, or `None` outside the radius
fn falloff(center: Vec2, target: Vec2, radius: f32) -> Option<(f32, Vec2)> {
    let offset = target - center;
    let dist = offset.length();
    if dist >= radius || radius <= 0.0 {
        return None;
    }
    let dir = if dist > 1e-3 { offset / dist } else { Vec2::X };
    Some(((radius - dist) / radius, dir))
}
