//! Spawn director
//!
//! Waves cycle through three phases:
//! - `Spawning`: enemies are released on an interval, never more than the
//!   concurrency cap alive at once
//! - `Active`: everything is released, waiting for the field to clear
//! - `Countdown`: intermission before the next, larger wave

use std::f32::consts::TAU;

use glam::Vec2;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::events::GameEvent;
use super::map::scatter_obstacles;
use super::physics::{BodyOwner, SpatialBackend};
use super::state::{EntityKind, GameState};
use crate::consts::*;
use crate::direction;
use crate::settings::DifficultyProfile;

/// Placement tries per spawn before giving up until the next tick
const SPAWN_ATTEMPTS: u32 = 8;
/// Devil odds grow per wave up to this base cap
const DEVIL_CHANCE_PER_WAVE: f32 = 0.05;
const DEVIL_CHANCE_CAP: f32 = 0.3;
const DEVIL_CHANCE_MAX: f32 = 0.6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WavePhase {
    Spawning,
    Active,
    Countdown { ticks: u32 },
}

/// Progress of the current wave
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaveState {
    pub wave: u32,
    pub total: u32,
    /// Enemies still to be released; never exceeds `total`
    pub remaining: u32,
    pub phase: WavePhase,
    pub spawn_cooldown_ms: f64,
}

impl Default for WaveState {
    fn default() -> Self {
        Self {
            wave: 0,
            total: 0,
            remaining: 0,
            phase: WavePhase::Active,
            spawn_cooldown_ms: 0.0,
        }
    }
}

impl WaveState {
    pub fn is_spawning(&self) -> bool {
        self.phase == WavePhase::Spawning
    }

    pub fn released(&self) -> u32 {
        self.total - self.remaining
    }
}

pub fn base_count(wave: u32) -> u32 {
    8 + 4 * wave
}

/// `base_count(wave)` scaled by player count and the difficulty's wave size
pub fn wave_total(wave: u32, players: usize, profile: &DifficultyProfile) -> u32 {
    let player_factor = 1.0 + 0.5 * (players.max(1) as f32 - 1.0);
    let total = (base_count(wave) as f32 * player_factor * profile.wave_size).round();
    (total as u32).max(1)
}

/// Most enemies of this wave allowed alive at once
pub fn concurrency_cap(total: u32, profile: &DifficultyProfile) -> u32 {
    let cap = (total as f32 * WAVE_CONCURRENCY * profile.max_concurrent).ceil() as u32;
    cap.clamp(1, total.max(1))
}

/// Shorter while much of the wave is still to come
pub fn spawn_interval_ms(wave: &WaveState, profile: &DifficultyProfile) -> f64 {
    let backlog = if wave.total == 0 {
        0.0
    } else {
        wave.remaining as f64 / wave.total as f64
    };
    let rate = profile.spawn_rate.max(0.01) as f64 * (1.0 + backlog);
    (SPAWN_INTERVAL_MS / rate).max(MIN_SPAWN_INTERVAL_MS)
}

pub fn devil_chance(state: &GameState) -> f64 {
    let base = (DEVIL_CHANCE_PER_WAVE * state.wave.wave as f32).min(DEVIL_CHANCE_CAP);
    let chance = base * state.profile().special_chance * state.surge();
    chance.clamp(0.0, DEVIL_CHANCE_MAX) as f64
}

/// Size and open a wave
pub fn start_wave(state: &mut GameState, wave: u32) {
    let total = wave_total(wave, state.player_count, &state.profile());
    state.wave = WaveState {
        wave,
        total,
        remaining: total,
        phase: WavePhase::Spawning,
        spawn_cooldown_ms: 0.0,
    };
    log::info!("Wave {} started: {} enemies", wave, total);
    state.emit(GameEvent::WaveStarted { wave, total });
}

/// Advance the wave state machine by one tick
pub fn update(state: &mut GameState, physics: &mut dyn SpatialBackend, dt_ms: f64) {
    match state.wave.phase {
        WavePhase::Spawning => {
            release(state, physics, dt_ms);
            if state.wave.remaining == 0 {
                state.wave.phase = WavePhase::Active;
            }
        }
        WavePhase::Active => {
            if state.wave.remaining == 0 && state.live_enemy_count() == 0 {
                let wave = state.wave.wave;
                state.wave.phase = WavePhase::Countdown {
                    ticks: COUNTDOWN_TICKS,
                };
                log::info!("Wave {} cleared", wave);
                state.emit(GameEvent::WaveCleared { wave });
            }
        }
        WavePhase::Countdown { ticks } => {
            if ticks <= 1 {
                let next = state.wave.wave + 1;
                scatter_obstacles(state, physics, SCATTER_WAVE_ATTEMPTS);
                start_wave(state, next);
            } else {
                state.wave.phase = WavePhase::Countdown { ticks: ticks - 1 };
            }
        }
    }
}

fn release(state: &mut GameState, physics: &mut dyn SpatialBackend, dt_ms: f64) {
    let profile = state.profile();
    state.wave.spawn_cooldown_ms -= dt_ms;
    if state.wave.remaining == 0 || state.wave.spawn_cooldown_ms > 0.0 {
        return;
    }
    let cap = concurrency_cap(state.wave.total, &profile);
    if state.live_enemy_count() as u32 >= cap {
        return;
    }
    // A failed placement retries next tick
    if try_spawn(state, physics) {
        state.wave.remaining -= 1;
        state.wave.spawn_cooldown_ms = spawn_interval_ms(&state.wave, &profile);
    }
}

/// Place one enemy at spawn distance from a random player
fn try_spawn(state: &mut GameState, physics: &mut dyn SpatialBackend) -> bool {
    let anchors: Vec<Vec2> = state
        .players
        .iter()
        .filter(|p| p.is_targetable())
        .map(|p| p.entity.pos)
        .collect();
    let anchor = if anchors.is_empty() {
        Vec2::new(WORLD_WIDTH / 2.0, WORLD_HEIGHT / 2.0)
    } else {
        anchors[state.rng.random_range(0..anchors.len())]
    };
    let lo = Vec2::splat(SPAWN_MARGIN);
    let hi = Vec2::new(WORLD_WIDTH - SPAWN_MARGIN, WORLD_HEIGHT - SPAWN_MARGIN);

    for _ in 0..SPAWN_ATTEMPTS {
        let angle = state.rng.random_range(0.0..TAU);
        let pos = (anchor + direction(angle) * SPAWN_DISTANCE).clamp(lo, hi);
        if spawn_blocked(physics, pos) {
            continue;
        }
        let chance = devil_chance(state);
        let kind = if state.rng.random_bool(chance) {
            EntityKind::Devil
        } else {
            EntityKind::Zombie
        };
        let id = state.spawn_enemy(physics, kind, pos);
        log::debug!("Spawned {:?} #{} at ({:.0}, {:.0})", kind, id, pos.x, pos.y);
        return true;
    }
    false
}

fn spawn_blocked(physics: &dyn SpatialBackend, pos: Vec2) -> bool {
    physics
        .query_radius(pos, ENEMY_RADIUS * 2.0)
        .into_iter()
        .any(|h| matches!(physics.owner(h), Some(BodyOwner::Wall | BodyOwner::Obstacle(_))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::{Difficulty, SessionConfig};
    use crate::sim::combat::kill_enemy;
    use crate::sim::lifecycle;
    use crate::sim::map::build_walls;
    use crate::sim::physics::GridPhysics;
    use proptest::prelude::*;

    const DT: f64 = SIM_DT_MS as f64;

    fn arena(config: &SessionConfig) -> (GameState, GridPhysics) {
        let mut state = GameState::new(config);
        let mut physics = GridPhysics::new();
        build_walls(&mut state, &mut physics);
        for index in 0..state.player_count {
            state.spawn_player(&mut physics, index);
        }
        (state, physics)
    }

    fn kill_everything(state: &mut GameState, physics: &mut GridPhysics) {
        for ei in 0..state.enemies.len() {
            if state.enemies[ei].entity.is_active() {
                kill_enemy(state, physics, ei, Some(0), Vec2::ZERO);
            }
        }
    }

    #[test]
    fn test_wave_sizing() {
        let medium = Difficulty::Medium.profile();
        assert_eq!(base_count(1), 12);
        assert!(base_count(2) > base_count(1));
        assert_eq!(wave_total(1, 1, &medium), 12);
        assert_eq!(wave_total(1, 2, &medium), 18);
        assert_eq!(wave_total(1, 1, &Difficulty::Hard.profile()), 15);
        assert_eq!(wave_total(1, 1, &Difficulty::Easy.profile()), 9);
    }

    #[test]
    fn test_concurrency_cap_bounds() {
        let medium = Difficulty::Medium.profile();
        assert_eq!(concurrency_cap(12, &medium), 8);
        assert_eq!(concurrency_cap(1, &medium), 1);
        assert!(concurrency_cap(12, &Difficulty::Nightmare.profile()) <= 12);
    }

    #[test]
    fn test_interval_shrinks_with_backlog() {
        let medium = Difficulty::Medium.profile();
        let mut wave = WaveState {
            wave: 1,
            total: 12,
            remaining: 12,
            phase: WavePhase::Spawning,
            spawn_cooldown_ms: 0.0,
        };
        let busy = spawn_interval_ms(&wave, &medium);
        wave.remaining = 1;
        let quiet = spawn_interval_ms(&wave, &medium);
        assert!(busy < quiet);
        assert!(busy >= MIN_SPAWN_INTERVAL_MS);
    }

    #[test]
    fn test_population_respects_cap() {
        let (mut state, mut physics) = arena(&SessionConfig::default());
        start_wave(&mut state, 1);
        let cap = concurrency_cap(state.wave.total, &state.profile()) as usize;
        for _ in 0..2000 {
            update(&mut state, &mut physics, DT);
            assert!(state.live_enemy_count() <= cap);
            assert_eq!(state.wave.released() as usize, state.enemies.len());
        }
        assert_eq!(state.live_enemy_count(), cap);
        assert!(state.wave.is_spawning());
    }

    #[test]
    fn test_spawns_stay_inside_the_arena() {
        let (mut state, mut physics) = arena(&SessionConfig::default());
        start_wave(&mut state, 3);
        for _ in 0..2000 {
            update(&mut state, &mut physics, DT);
        }
        assert!(!state.enemies.is_empty());
        for e in &state.enemies {
            let p = e.entity.pos;
            assert!(p.x >= SPAWN_MARGIN && p.x <= WORLD_WIDTH - SPAWN_MARGIN);
            assert!(p.y >= SPAWN_MARGIN && p.y <= WORLD_HEIGHT - SPAWN_MARGIN);
        }
    }

    #[test]
    fn test_wave_cycle_into_countdown_and_next_wave() {
        let (mut state, mut physics) = arena(&SessionConfig::default());
        start_wave(&mut state, 1);
        assert_eq!(state.wave.total, 12);

        let mut ticks = 0;
        while !matches!(state.wave.phase, WavePhase::Countdown { .. }) {
            update(&mut state, &mut physics, DT);
            kill_everything(&mut state, &mut physics);
            lifecycle::update(&mut state, &mut physics);
            ticks += 1;
            assert!(ticks < 20_000, "wave never cleared");
        }
        assert_eq!(state.wave.remaining, 0);
        assert_eq!(state.live_enemy_count(), 0);
        assert!(state.events.iter().any(|e| matches!(e, GameEvent::WaveCleared { wave: 1 })));

        for _ in 0..COUNTDOWN_TICKS - 1 {
            update(&mut state, &mut physics, DT);
            assert_eq!(state.wave.wave, 1);
        }
        update(&mut state, &mut physics, DT);
        assert_eq!(state.wave.wave, 2);
        assert_eq!(state.wave.total, 16);
        assert!(state.wave.is_spawning());
    }

    #[test]
    fn test_stragglers_hold_the_wave_open() {
        let (mut state, mut physics) = arena(&SessionConfig::default());
        start_wave(&mut state, 1);
        state.wave.remaining = 0;
        state.wave.phase = WavePhase::Active;
        state.spawn_enemy(&mut physics, EntityKind::Zombie, Vec2::new(600.0, 600.0));
        for _ in 0..100 {
            update(&mut state, &mut physics, DT);
        }
        assert_eq!(state.wave.phase, WavePhase::Active);

        // A dying enemy no longer counts
        kill_enemy(&mut state, &mut physics, 0, None, Vec2::ZERO);
        update(&mut state, &mut physics, DT);
        assert!(matches!(state.wave.phase, WavePhase::Countdown { .. }));
    }

    #[test]
    fn test_devil_chance_grows_and_caps() {
        let (mut state, _physics) = arena(&SessionConfig::default());
        state.wave.wave = 1;
        let early = devil_chance(&state);
        state.wave.wave = 50;
        let late = devil_chance(&state);
        assert!(early < late);
        assert!(late <= DEVIL_CHANCE_MAX as f64);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(16))]

        #[test]
        fn prop_remaining_never_exceeds_total(
            seed in any::<u64>(),
            kills in proptest::collection::vec(any::<bool>(), 200..600),
        ) {
            let config = SessionConfig { seed, ..Default::default() };
            let (mut state, mut physics) = arena(&config);
            start_wave(&mut state, 1);
            for kill in kills {
                update(&mut state, &mut physics, DT * 4.0);
                if kill {
                    kill_everything(&mut state, &mut physics);
                }
                lifecycle::update(&mut state, &mut physics);
                prop_assert!(state.wave.remaining <= state.wave.total);
                if let WavePhase::Countdown { .. } = state.wave.phase {
                    prop_assert_eq!(state.wave.remaining, 0);
                }
            }
        }
    }
}
