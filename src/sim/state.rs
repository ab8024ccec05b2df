//! Game state and core simulation types
//!
//! Entity collections are kept sorted by id so every pass over them is
//! deterministic, and lookups by id are binary searches.

use glam::Vec2;
use rand::SeedableRng;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::director::WaveState;
use super::events::GameEvent;
use super::pathfinding::OccupancyGrid;
use super::physics::{Body, BodyHandle, BodyOwner, SpatialBackend, category, mask};
use super::weapons::{BlastSpec, ChainPolicy, WeaponKind};
use crate::consts::*;
use crate::settings::{Difficulty, DifficultyProfile, SessionConfig};

pub type EntityId = u32;

/// Timestamp meaning "long ago"; cooldowns measured from it are always ready
pub const NEVER_MS: f64 = -1.0e12;

/// Current phase of the session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GamePhase {
    Playing,
    /// Every player is out of lives
    GameOver,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    Player,
    Zombie,
    /// Special enemy with a ranged attack
    Devil,
    Obstacle,
    Projectile,
    Pickup,
}

impl EntityKind {
    pub fn is_enemy(self) -> bool {
        matches!(self, EntityKind::Zombie | EntityKind::Devil)
    }

    pub fn enemy_base_hp(self) -> f32 {
        match self {
            EntityKind::Devil => DEVIL_HP,
            _ => ZOMBIE_HP,
        }
    }

    pub fn enemy_base_speed(self) -> f32 {
        match self {
            EntityKind::Devil => DEVIL_SPEED,
            _ => ZOMBIE_SPEED,
        }
    }

    pub fn kill_score(self) -> u64 {
        match self {
            EntityKind::Devil => DEVIL_SCORE,
            _ => ZOMBIE_SCORE,
        }
    }
}

/// State shared by every simulated thing
#[derive(Debug, Clone)]
pub struct Entity {
    pub id: EntityId,
    pub kind: EntityKind,
    pub body: BodyHandle,
    pub pos: Vec2,
    pub vel: Vec2,
    /// Facing angle (radians)
    pub facing: f32,
    pub radius: f32,
    pub hp: f32,
    pub max_hp: f32,
    pub dead: bool,
    /// Death-slide ticks left; `Some` means the entity is dying
    pub dying: Option<u32>,
    pub last_hit_ms: f64,
    pub stunned_until_ms: f64,
    pub last_attack_ms: f64,
    pub explosive: bool,
}

impl Entity {
    pub fn new(id: EntityId, kind: EntityKind, body: BodyHandle, pos: Vec2, radius: f32, hp: f32) -> Self {
        Self {
            id,
            kind,
            body,
            pos,
            vel: Vec2::ZERO,
            facing: 0.0,
            radius,
            hp,
            max_hp: hp,
            dead: false,
            dying: None,
            last_hit_ms: NEVER_MS,
            stunned_until_ms: NEVER_MS,
            last_attack_ms: NEVER_MS,
            explosive: false,
        }
    }

    /// Alive and not in a death animation
    pub fn is_active(&self) -> bool {
        !self.dead && self.dying.is_none() && self.hp > 0.0
    }

    pub fn is_dying(&self) -> bool {
        self.dying.is_some()
    }

    pub fn is_stunned(&self, now_ms: f64) -> bool {
        now_ms < self.stunned_until_ms
    }

    /// Start or extend a stun window
    pub fn stun(&mut self, now_ms: f64, duration_ms: f64) {
        self.last_hit_ms = now_ms;
        self.stunned_until_ms = self.stunned_until_ms.max(now_ms + duration_ms);
    }
}

#[derive(Debug, Clone)]
pub struct Player {
    pub entity: Entity,
    pub index: usize,
    pub weapon: WeaponKind,
    /// Indexed by [`WeaponKind::index`]; -1 means infinite
    pub ammo: [i32; WeaponKind::COUNT],
    pub lives: u8,
    pub score: u64,
    pub kills: u32,
    /// Last time an enemy's touch hurt this player
    pub last_contact_ms: f64,
    /// Out of lives; stays dead for the rest of the session
    pub eliminated: bool,
}

impl Player {
    pub fn ammo_for(&self, weapon: WeaponKind) -> i32 {
        self.ammo[weapon.index()]
    }

    pub fn has_ammo(&self, weapon: WeaponKind) -> bool {
        self.ammo_for(weapon) != 0
    }

    pub fn spend_ammo(&mut self, weapon: WeaponKind) {
        let slot = &mut self.ammo[weapon.index()];
        if *slot > 0 {
            *slot -= 1;
        }
    }

    pub fn add_ammo(&mut self, weapon: WeaponKind, amount: i32) {
        let slot = &mut self.ammo[weapon.index()];
        if *slot >= 0 {
            *slot = slot.saturating_add(amount);
        }
    }

    /// Enemies may chase this player (safe zone aside)
    pub fn is_targetable(&self) -> bool {
        !self.eliminated && !self.entity.dead && self.entity.hp > 0.0
    }
}

#[derive(Debug, Clone)]
pub struct Enemy {
    pub entity: Entity,
    pub target: Option<EntityId>,
    /// Remaining waypoints when pursuing around geometry
    pub path: Vec<Vec2>,
    pub path_tick: Option<u64>,
    pub last_siege_ms: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ObstacleKind {
    Wall,
    /// Explodes when destroyed
    Barrel,
}

impl ObstacleKind {
    pub fn max_hp(self) -> f32 {
        match self {
            ObstacleKind::Wall => OBSTACLE_WALL_HP,
            ObstacleKind::Barrel => BARREL_HP,
        }
    }

    pub fn is_explosive(self) -> bool {
        matches!(self, ObstacleKind::Barrel)
    }

    pub fn blast(self) -> Option<BlastSpec> {
        self.is_explosive().then_some(BlastSpec {
            radius: BARREL_BLAST_RADIUS,
            damage: BARREL_BLAST_DAMAGE,
            policy: ChainPolicy::Propagate,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ObstacleOrigin {
    Scattered,
    Placed { player: usize },
}

#[derive(Debug, Clone)]
pub struct Obstacle {
    pub entity: Entity,
    pub kind: ObstacleKind,
    /// Placement-grid cell
    pub cell: (i32, i32),
    pub origin: ObstacleOrigin,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProjectileSource {
    Player(usize),
    Enemy(EntityId),
}

#[derive(Debug, Clone)]
pub struct Projectile {
    pub entity: Entity,
    pub source: ProjectileSource,
    pub weapon: Option<WeaponKind>,
    pub damage: f32,
    /// Cleared on the first valid contact
    pub active: bool,
    pub blast: Option<BlastSpec>,
    /// Stationary detonator: explode on reaching this point
    pub detonate_at: Option<Vec2>,
    /// Steer toward this player each tick
    pub homing: Option<EntityId>,
    pub expires_ms: Option<f64>,
}

impl Projectile {
    pub fn is_enemy_origin(&self) -> bool {
        matches!(self.source, ProjectileSource::Enemy(_))
    }

    /// Player credited for kills this projectile causes
    pub fn credited_player(&self) -> Option<usize> {
        match self.source {
            ProjectileSource::Player(index) => Some(index),
            ProjectileSource::Enemy(_) => None,
        }
    }
}

/// Parameters for a new projectile
#[derive(Debug, Clone)]
pub struct Shot {
    pub pos: Vec2,
    pub vel: Vec2,
    pub radius: f32,
    pub damage: f32,
    pub source: ProjectileSource,
    pub weapon: Option<WeaponKind>,
    pub blast: Option<BlastSpec>,
    pub detonate_at: Option<Vec2>,
    pub homing: Option<EntityId>,
    pub ttl_ms: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum PickupKind {
    HealthPack,
}

#[derive(Debug, Clone)]
pub struct Pickup {
    pub entity: Entity,
    pub kind: PickupKind,
    pub consumed: bool,
}

/// Global score with the rolling kill multiplier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreBoard {
    pub score: u64,
    /// Always within 1..=MAX_MULTIPLIER
    pub multiplier: u8,
    pub last_kill_ms: Option<f64>,
}

impl Default for ScoreBoard {
    fn default() -> Self {
        Self {
            score: 0,
            multiplier: 1,
            last_kill_ms: None,
        }
    }
}

impl ScoreBoard {
    /// Count a kill worth `base` points; returns the points awarded
    pub fn register_kill(&mut self, now_ms: f64, base: u64) -> u64 {
        self.multiplier = match self.last_kill_ms {
            Some(last) if now_ms - last <= MULTIPLIER_WINDOW_MS => {
                self.multiplier.saturating_add(1).min(MAX_MULTIPLIER)
            }
            _ => 1,
        };
        self.last_kill_ms = Some(now_ms);
        let points = base.saturating_mul(self.multiplier as u64);
        self.add(points);
        points
    }

    /// Reset the multiplier once the window lapses without a kill
    pub fn expire(&mut self, now_ms: f64) {
        if let Some(last) = self.last_kill_ms {
            if now_ms - last > MULTIPLIER_WINDOW_MS {
                self.multiplier = 1;
            }
        }
    }

    pub fn add(&mut self, points: u64) {
        self.score = self.score.saturating_add(points);
    }
}

/// Placement-grid cell containing a point
pub fn grid_cell(pos: Vec2) -> (i32, i32) {
    (
        (pos.x / PLACEMENT_GRID).floor() as i32,
        (pos.y / PLACEMENT_GRID).floor() as i32,
    )
}

/// World-space center of a placement-grid cell
pub fn cell_center(cell: (i32, i32)) -> Vec2 {
    Vec2::new(
        (cell.0 as f32 + 0.5) * PLACEMENT_GRID,
        (cell.1 as f32 + 0.5) * PLACEMENT_GRID,
    )
}

/// Complete simulation state
#[derive(Debug, Clone)]
pub struct GameState {
    /// Run seed for reproducibility
    pub seed: u64,
    pub rng: Pcg32,
    pub difficulty: Difficulty,
    pub player_count: usize,
    pub starting_lives: u8,
    pub phase: GamePhase,
    /// Simulation tick counter
    pub time_ticks: u64,
    /// Simulated milliseconds since session start
    pub time_ms: f64,
    pub wave: WaveState,
    pub scores: ScoreBoard,
    pub surge_level: u32,
    /// Indexed by player index
    pub players: Vec<Player>,
    /// Sorted by id
    pub enemies: Vec<Enemy>,
    /// Sorted by id
    pub obstacles: Vec<Obstacle>,
    /// Sorted by id
    pub projectiles: Vec<Projectile>,
    /// Sorted by id
    pub pickups: Vec<Pickup>,
    pub walls: Vec<BodyHandle>,
    /// Navigation grid, rebuilt periodically from static bodies
    pub nav: OccupancyGrid,
    /// Output queue drained by the host
    pub events: Vec<GameEvent>,
    pub game_over_fired: bool,
    next_id: EntityId,
}

impl GameState {
    /// Empty state for a session; the arena is populated separately
    pub fn new(config: &SessionConfig) -> Self {
        let config = config.clone().sanitized();
        Self {
            seed: config.seed,
            rng: Pcg32::seed_from_u64(config.seed),
            difficulty: config.difficulty,
            player_count: config.player_count(),
            starting_lives: config.lives(),
            phase: GamePhase::Playing,
            time_ticks: 0,
            time_ms: 0.0,
            wave: WaveState::default(),
            scores: ScoreBoard::default(),
            surge_level: 0,
            players: Vec::new(),
            enemies: Vec::new(),
            obstacles: Vec::new(),
            projectiles: Vec::new(),
            pickups: Vec::new(),
            walls: Vec::new(),
            nav: OccupancyGrid::empty(),
            events: Vec::new(),
            game_over_fired: false,
            next_id: 1,
        }
    }

    /// Allocate a new entity ID
    pub fn next_entity_id(&mut self) -> EntityId {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    pub fn now(&self) -> f64 {
        self.time_ms
    }

    pub fn profile(&self) -> DifficultyProfile {
        self.difficulty.profile()
    }

    /// Score-driven escalation factor, compounded with the difficulty profile
    pub fn surge(&self) -> f32 {
        (1.0 + SURGE_PER_LEVEL * self.surge_level as f32).min(MAX_SURGE)
    }

    pub fn emit(&mut self, event: GameEvent) {
        self.events.push(event);
    }

    /// Add points outside of kills and re-check the surge threshold
    pub fn add_score(&mut self, points: u64) {
        self.scores.add(points);
        self.update_surge();
    }

    /// Register a kill on the global board and the credited player
    pub fn register_kill(&mut self, base: u64, credit: Option<usize>) -> u64 {
        let now = self.now();
        let points = self.scores.register_kill(now, base);
        if let Some(player) = credit.and_then(|i| self.players.get_mut(i)) {
            player.score = player.score.saturating_add(points);
            player.kills += 1;
        }
        self.update_surge();
        points
    }

    fn update_surge(&mut self) {
        let level = (self.scores.score / SURGE_SCORE_STEP) as u32;
        if level > self.surge_level {
            self.surge_level = level;
            let multiplier = self.surge();
            log::info!("Surge level {} (x{:.1})", level, multiplier);
            self.emit(GameEvent::SurgeRaised { level, multiplier });
        }
    }

    pub fn player_spawn_point(&self, index: usize) -> Vec2 {
        let offset = index as f32 - (self.player_count.max(1) as f32 - 1.0) / 2.0;
        Vec2::new(
            WORLD_WIDTH / 2.0 + offset * PLAYER_SPAWN_SPACING,
            PLAYER_SPAWN_Y,
        )
    }

    pub fn player_index_by_id(&self, id: EntityId) -> Option<usize> {
        self.players.iter().position(|p| p.entity.id == id)
    }

    pub fn enemy_index(&self, id: EntityId) -> Option<usize> {
        self.enemies.binary_search_by_key(&id, |e| e.entity.id).ok()
    }

    pub fn obstacle_index(&self, id: EntityId) -> Option<usize> {
        self.obstacles.binary_search_by_key(&id, |o| o.entity.id).ok()
    }

    pub fn projectile_index(&self, id: EntityId) -> Option<usize> {
        self.projectiles
            .binary_search_by_key(&id, |p| p.entity.id)
            .ok()
    }

    pub fn pickup_index(&self, id: EntityId) -> Option<usize> {
        self.pickups.binary_search_by_key(&id, |p| p.entity.id).ok()
    }

    /// Enemies still fighting (excludes the dying)
    pub fn live_enemy_count(&self) -> usize {
        self.enemies.iter().filter(|e| e.entity.is_active()).count()
    }

    pub fn spawn_player(&mut self, physics: &mut dyn SpatialBackend, index: usize) -> EntityId {
        let id = self.next_entity_id();
        let pos = self.player_spawn_point(index);
        let body = physics.create_body(Body::dynamic_circle(
            BodyOwner::Player(id),
            pos,
            PLAYER_RADIUS,
            category::PLAYER,
            mask::PLAYER,
        ));
        let mut ammo = [0; WeaponKind::COUNT];
        for weapon in WeaponKind::ALL {
            ammo[weapon.index()] = weapon.starting_ammo();
        }
        self.players.push(Player {
            entity: Entity::new(id, EntityKind::Player, body, pos, PLAYER_RADIUS, PLAYER_HP),
            index,
            weapon: WeaponKind::Pistol,
            ammo,
            lives: self.starting_lives,
            score: 0,
            kills: 0,
            last_contact_ms: NEVER_MS,
            eliminated: false,
        });
        id
    }

    /// Spawn an enemy with HP scaled by difficulty and surge
    pub fn spawn_enemy(&mut self, physics: &mut dyn SpatialBackend, kind: EntityKind, pos: Vec2) -> EntityId {
        let id = self.next_entity_id();
        let hp = kind.enemy_base_hp() * self.profile().hp * self.surge();
        let body = physics.create_body(
            Body::dynamic_circle(BodyOwner::Enemy(id), pos, ENEMY_RADIUS, category::ENEMY, mask::ENEMY)
                .with_damping(ENEMY_DAMPING),
        );
        self.enemies.push(Enemy {
            entity: Entity::new(id, kind, body, pos, ENEMY_RADIUS, hp),
            target: None,
            path: Vec::new(),
            path_tick: None,
            last_siege_ms: NEVER_MS,
        });
        id
    }

    pub fn spawn_obstacle(
        &mut self,
        physics: &mut dyn SpatialBackend,
        kind: ObstacleKind,
        cell: (i32, i32),
        origin: ObstacleOrigin,
    ) -> EntityId {
        let id = self.next_entity_id();
        let pos = cell_center(cell);
        let body = physics.create_body(Body::static_rect(
            BodyOwner::Obstacle(id),
            pos,
            Vec2::splat(OBSTACLE_HALF_SIZE),
            category::OBSTACLE,
            mask::OBSTACLE,
        ));
        let mut entity = Entity::new(id, EntityKind::Obstacle, body, pos, OBSTACLE_HALF_SIZE, kind.max_hp());
        entity.explosive = kind.is_explosive();
        self.obstacles.push(Obstacle {
            entity,
            kind,
            cell,
            origin,
        });
        id
    }

    pub fn spawn_projectile(&mut self, physics: &mut dyn SpatialBackend, shot: Shot) -> EntityId {
        let id = self.next_entity_id();
        let (cat, msk) = match shot.source {
            ProjectileSource::Player(_) => (category::BULLET, mask::BULLET),
            ProjectileSource::Enemy(_) => (category::ENEMY_BULLET, mask::ENEMY_BULLET),
        };
        let body = physics.create_body(
            Body::dynamic_circle(BodyOwner::Projectile(id), shot.pos, shot.radius, cat, msk)
                .sensor()
                .with_velocity(shot.vel),
        );
        let mut entity = Entity::new(id, EntityKind::Projectile, body, shot.pos, shot.radius, 1.0);
        entity.vel = shot.vel;
        entity.facing = shot.vel.y.atan2(shot.vel.x);
        entity.explosive = shot.blast.is_some();
        let now = self.now();
        self.projectiles.push(Projectile {
            entity,
            source: shot.source,
            weapon: shot.weapon,
            damage: shot.damage,
            active: true,
            blast: shot.blast,
            detonate_at: shot.detonate_at,
            homing: shot.homing,
            expires_ms: shot.ttl_ms.map(|ttl| now + ttl),
        });
        id
    }

    pub fn spawn_pickup(&mut self, physics: &mut dyn SpatialBackend, kind: PickupKind, pos: Vec2) -> EntityId {
        let id = self.next_entity_id();
        let body = physics.create_body(
            Body::static_circle(BodyOwner::Pickup(id), pos, PICKUP_RADIUS, category::ITEM, mask::ITEM)
                .sensor(),
        );
        self.pickups.push(Pickup {
            entity: Entity::new(id, EntityKind::Pickup, body, pos, PICKUP_RADIUS, 1.0),
            kind,
            consumed: false,
        });
        id
    }

    /// Ensure collections are sorted by ID for deterministic iteration
    pub fn normalize_order(&mut self) {
        self.players.sort_by_key(|p| p.index);
        self.enemies.sort_by_key(|e| e.entity.id);
        self.obstacles.sort_by_key(|o| o.entity.id);
        self.projectiles.sort_by_key(|p| p.entity.id);
        self.pickups.sort_by_key(|p| p.entity.id);
    }
}
