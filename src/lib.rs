//! Horde Arena - a top-down wave survival arena
//!
//! Core modules:
//! - `sim`: Deterministic simulation (physics, combat, AI, spawning, lifecycle)
//! - `settings`: Session configuration and difficulty profiles
//!
//! Rendering, audio, menus and input devices live outside this crate. They feed
//! per-tick [`sim::PlayerCommand`]s in and read snapshots and events out.

pub mod settings;
pub mod sim;

pub use settings::{Difficulty, DifficultyProfile, SessionConfig};
pub use sim::Session;

use glam::Vec2;

/// Game configuration constants
pub mod consts {
    /// Fixed simulation rate
    pub const SIM_HZ: u32 = 60;
    /// Fixed simulation timestep in milliseconds
    pub const SIM_DT_MS: f32 = 1000.0 / SIM_HZ as f32;
    /// Largest delta a single tick may integrate (stalled/backgrounded frames)
    pub const MAX_TICK_MS: f32 = 100.0;
    /// Maximum fixed steps per host frame to prevent spiral of death
    pub const MAX_SUBSTEPS: u32 = 8;
    /// Ticks between HUD snapshot events
    pub const HUD_INTERVAL_TICKS: u64 = 10;

    /// Arena dimensions
    pub const WORLD_WIDTH: f32 = 1600.0;
    pub const WORLD_HEIGHT: f32 = 1200.0;
    pub const WALL_THICKNESS: f32 = 40.0;
    /// Opening left in each internal wall row
    pub const WALL_GAP: f32 = 240.0;
    /// Grid used for obstacle placement and scatter (one obstacle per cell)
    pub const PLACEMENT_GRID: f32 = 16.0;

    /// Player defaults
    pub const PLAYER_RADIUS: f32 = 8.0;
    pub const PLAYER_SPEED: f32 = 210.0; // px/s
    pub const PLAYER_HP: f32 = 100.0;
    pub const PLAYER_SPAWN_Y: f32 = 150.0;
    pub const PLAYER_SPAWN_SPACING: f32 = 32.0;
    /// Nearest-enemy snap radius for hitscan-style weapons
    pub const AUTO_AIM_RANGE: f32 = 600.0;

    /// Sheltered area enemies cannot perceive players in
    pub const SAFE_ZONE_CENTER: (f32, f32) = (120.0, 960.0);
    pub const SAFE_ZONE_RADIUS: f32 = 64.0;

    /// Enemy defaults
    pub const ENEMY_RADIUS: f32 = 9.0;
    pub const ZOMBIE_SPEED: f32 = 72.0;
    pub const DEVIL_SPEED: f32 = 84.0;
    pub const ZOMBIE_HP: f32 = 60.0;
    pub const DEVIL_HP: f32 = 120.0;
    pub const ZOMBIE_SCORE: u64 = 100;
    pub const DEVIL_SCORE: u64 = 500;
    /// Air friction per 60 Hz frame
    pub const ENEMY_DAMPING: f32 = 0.05;
    /// Window after a hit during which AI leaves velocity alone
    pub const STUN_MS: f64 = 300.0;
    /// Knockback speed (px/s) per point of projectile damage
    pub const KNOCKBACK_PER_DAMAGE: f32 = 8.0;
    /// Extra impulse when an enemy starts its death slide
    pub const DEATH_KNOCKBACK: f32 = 240.0;
    /// Length of the death slide before removal
    pub const DEATH_SLIDE_TICKS: u32 = 15;

    /// Enemy-vs-enemy momentum propagation
    pub const MOMENTUM_SPEED_THRESHOLD: f32 = 150.0;
    pub const MOMENTUM_TRANSFER: f32 = 0.6;
    pub const MOMENTUM_STUN_MS: f64 = 150.0;

    /// Melee contact damage, applied per player on a fixed cooldown
    pub const ENEMY_CONTACT_DAMAGE: f32 = 10.0;
    pub const ENEMY_CONTACT_COOLDOWN_MS: f64 = 500.0;
    /// Enemies gnawing on obstacles
    pub const SIEGE_DAMAGE: f32 = 20.0;
    pub const SIEGE_COOLDOWN_MS: f64 = 1000.0;

    /// Devil ranged attack ("virus")
    pub const VIRUS_SPEED: f32 = 180.0;
    pub const VIRUS_DAMAGE: f32 = 25.0;
    pub const VIRUS_RADIUS: f32 = 6.0;
    pub const VIRUS_TURN_RATE: f32 = 1.5; // rad/s
    pub const VIRUS_TTL_MS: f64 = 6000.0;
    pub const DEVIL_FIRE_RATE_MS: f64 = 2000.0;
    pub const DEVIL_ATTACK_RANGE: f32 = 600.0;

    /// Explosions
    pub const BLAST_KNOCKBACK: f32 = 600.0;
    /// Players take a tenth of blast damage
    pub const PLAYER_BLAST_DAMAGE_SCALE: f32 = 0.1;
    pub const BARREL_BLAST_RADIUS: f32 = 180.0;
    pub const BARREL_BLAST_DAMAGE: f32 = 800.0;
    pub const MAX_CHAIN_DEPTH: u32 = 8;

    /// Obstacles
    pub const OBSTACLE_HALF_SIZE: f32 = 8.0;
    pub const OBSTACLE_WALL_HP: f32 = 500.0;
    pub const BARREL_HP: f32 = 1.0;

    /// Scoring
    pub const MULTIPLIER_WINDOW_MS: f64 = 1500.0;
    pub const MAX_MULTIPLIER: u8 = 99;
    pub const OBSTACLE_SCORE: u64 = 10;
    pub const SURGE_SCORE_STEP: u64 = 5000;
    pub const SURGE_PER_LEVEL: f32 = 0.1;
    pub const MAX_SURGE: f32 = 2.0;

    /// Pickups
    pub const PICKUP_RADIUS: f32 = 8.0;
    pub const HEALTH_PACK_VALUE: f32 = 25.0;
    /// Drop chances for health packs
    pub const DEVIL_HEALTH_DROP: f64 = 0.25;
    pub const WALL_HEALTH_DROP: f64 = 0.1;
    /// Deployables land at the aim point, at most this far away
    pub const PLACE_RANGE: f32 = 96.0;

    /// Spawn director
    pub const SPAWN_DISTANCE: f32 = 800.0;
    pub const SPAWN_MARGIN: f32 = 60.0;
    /// Share of the wave total allowed alive at once
    pub const WAVE_CONCURRENCY: f32 = 0.6;
    pub const SPAWN_INTERVAL_MS: f64 = 900.0;
    pub const MIN_SPAWN_INTERVAL_MS: f64 = 120.0;
    /// Intermission between waves (5 seconds)
    pub const COUNTDOWN_TICKS: u32 = 5 * SIM_HZ;
    /// Obstacle scatter keeps this clear around the player spawn
    pub const SCATTER_SPAWN_CLEARANCE: f32 = 300.0;
    pub const SCATTER_SESSION_ATTEMPTS: u32 = 60;
    pub const SCATTER_WAVE_ATTEMPTS: u32 = 12;

    /// Pathfinding
    pub const PATH_CELL: f32 = 32.0;
    pub const GRID_REBUILD_TICKS: u64 = 20;
    pub const PATH_MAX_ITERATIONS: usize = 1000;
    pub const PATH_REFRESH_TICKS: u64 = 30;
    pub const LOS_MAX_DISTANCE: f32 = 500.0;
    pub const WAYPOINT_REACHED: f32 = 12.0;
}

/// Normalized angle to [-π, π)
#[inline]
pub fn normalize_angle(mut angle: f32) -> f32 {
    use std::f32::consts::PI;
    while angle >= PI {
        angle -= 2.0 * PI;
    }
    while angle < -PI {
        angle += 2.0 * PI;
    }
    angle
}

/// Heading (radians) from one point toward another
#[inline]
pub fn angle_to(from: Vec2, to: Vec2) -> f32 {
    let d = to - from;
    d.y.atan2(d.x)
}

/// Unit vector for a heading
#[inline]
pub fn direction(angle: f32) -> Vec2 {
    Vec2::new(angle.cos(), angle.sin())
}
