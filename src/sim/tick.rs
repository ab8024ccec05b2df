//! Fixed timestep simulation tick
//!
//! One call advances the arena deterministically:
//! 1. player commands become velocities, shots and placements
//! 2. physics integrates and reports contacts
//! 3. contacts resolve into damage, deaths and explosions; dead players
//!    revive or drop out
//! 4. AI, the spawn director and lifecycle bookkeeping run on the result

use super::events::GameEvent;
use super::input::TickInput;
use super::map::rebuild_nav;
use super::physics::SpatialBackend;
use super::snapshot::HudSnapshot;
use super::state::{GamePhase, GameState};
use super::{ai, combat, director, input, lifecycle};
use crate::consts::*;

/// Advance the game state by one timestep of `dt_ms` milliseconds
pub fn tick(state: &mut GameState, physics: &mut dyn SpatialBackend, input: &TickInput, dt_ms: f32) {
    if state.phase == GamePhase::GameOver {
        return;
    }
    let dt_ms = dt_ms.clamp(0.0, MAX_TICK_MS);
    state.time_ticks += 1;
    state.time_ms += dt_ms as f64;

    // Occupancy only changes when obstacles come and go, so refresh lazily
    if state.nav.is_empty() || state.time_ticks % GRID_REBUILD_TICKS == 0 {
        rebuild_nav(state, physics);
    }
    state.scores.expire(state.time_ms);

    input::apply(state, physics, input);
    ai::steer_homing(state, physics, dt_ms);

    physics.step(dt_ms);
    sync_from_physics(state, physics);

    let contacts = physics.drain_contacts();
    combat::resolve_contacts(state, physics, &contacts);
    combat::detonate_arrivals(state, physics);
    // Revive before AI so a respawned player is never dropped as a target
    lifecycle::resolve_player_deaths(state, physics);

    ai::update(state, physics);
    director::update(state, physics, dt_ms as f64);
    lifecycle::update(state, physics);

    state.normalize_order();

    if state.time_ticks % HUD_INTERVAL_TICKS == 0 {
        let hud = HudSnapshot::capture(state);
        state.emit(GameEvent::Hud(hud));
    }
}

/// Copy integrated positions and velocities back onto dynamic entities
fn sync_from_physics(state: &mut GameState, physics: &dyn SpatialBackend) {
    let players = state.players.iter_mut().filter(|p| !p.eliminated).map(|p| &mut p.entity);
    let enemies = state.enemies.iter_mut().map(|e| &mut e.entity);
    let projectiles = state
        .projectiles
        .iter_mut()
        .filter(|p| p.active)
        .map(|p| &mut p.entity);

    for entity in players.chain(enemies).chain(projectiles) {
        if let Some(pos) = physics.position(entity.body) {
            entity.pos = pos;
        }
        if let Some(vel) = physics.velocity(entity.body) {
            entity.vel = vel;
        }
    }
}

/// Splits host frame time into fixed simulation steps
#[derive(Debug, Clone, Default)]
pub struct FrameClock {
    accumulator: f32,
}

impl FrameClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bank `elapsed_ms` of frame time and return how many ticks to run
    pub fn advance(&mut self, elapsed_ms: f32) -> u32 {
        // Stalled or backgrounded frames are clamped, not replayed
        self.accumulator += elapsed_ms.clamp(0.0, MAX_TICK_MS);

        let mut steps = 0;
        while self.accumulator >= SIM_DT_MS && steps < MAX_SUBSTEPS {
            self.accumulator -= SIM_DT_MS;
            steps += 1;
        }
        if steps == MAX_SUBSTEPS {
            self.accumulator = self.accumulator.min(SIM_DT_MS);
        }
        steps
    }

    /// Fraction of a step left over, for render interpolation
    pub fn alpha(&self) -> f32 {
        self.accumulator / SIM_DT_MS
    }

    pub fn reset(&mut self) {
        self.accumulator = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::SessionConfig;
    use crate::sim::input::PlayerCommand;
    use crate::sim::physics::GridPhysics;
    use crate::sim::state::EntityKind;
    use glam::Vec2;

    fn arena() -> (GameState, GridPhysics) {
        let mut state = GameState::new(&SessionConfig::default());
        let mut physics = GridPhysics::new();
        state.spawn_player(&mut physics, 0);
        (state, physics)
    }

    #[test]
    fn test_tick_advances_time() {
        let (mut state, mut physics) = arena();
        tick(&mut state, &mut physics, &TickInput::default(), SIM_DT_MS);
        assert_eq!(state.time_ticks, 1);
        assert!((state.time_ms - SIM_DT_MS as f64).abs() < 1e-6);
        assert!(!state.nav.is_empty());
    }

    #[test]
    fn test_stalled_frame_is_clamped() {
        let (mut state, mut physics) = arena();
        tick(&mut state, &mut physics, &TickInput::default(), 5000.0);
        assert!((state.time_ms - MAX_TICK_MS as f64).abs() < 1e-6);
    }

    #[test]
    fn test_movement_goes_through_physics() {
        let (mut state, mut physics) = arena();
        let input = TickInput::single(PlayerCommand {
            move_x: 1.0,
            ..Default::default()
        });
        let start = state.players[0].entity.pos;
        tick(&mut state, &mut physics, &input, SIM_DT_MS);
        let moved = state.players[0].entity.pos.x - start.x;
        assert!((moved - PLAYER_SPEED * SIM_DT_MS / 1000.0).abs() < 1e-3);
    }

    #[test]
    fn test_hud_every_tenth_tick() {
        let (mut state, mut physics) = arena();
        for _ in 0..25 {
            tick(&mut state, &mut physics, &TickInput::default(), SIM_DT_MS);
        }
        let huds = state
            .events
            .iter()
            .filter(|e| matches!(e, GameEvent::Hud(_)))
            .count();
        assert_eq!(huds, 2);
    }

    #[test]
    fn test_game_over_freezes_the_arena() {
        let (mut state, mut physics) = arena();
        state.phase = GamePhase::GameOver;
        tick(&mut state, &mut physics, &TickInput::default(), SIM_DT_MS);
        assert_eq!(state.time_ticks, 0);
    }

    #[test]
    fn test_pistol_kills_zombie_then_corpse_is_removed() {
        let (mut state, mut physics) = arena();
        let player_pos = state.players[0].entity.pos;
        state.spawn_enemy(&mut physics, EntityKind::Zombie, player_pos + Vec2::new(0.0, 50.0));
        state.enemies[0].entity.hp = 100.0;
        state.enemies[0].entity.max_hp = 100.0;
        let input = TickInput::single(PlayerCommand {
            firing: true,
            ..Default::default()
        });

        let mut fired_at = Vec::new();
        let mut ticks = 0;
        while !state.enemies[0].entity.is_dying() {
            let before = state.events.len();
            tick(&mut state, &mut physics, &input, SIM_DT_MS);
            let shots = state.events[before..]
                .iter()
                .filter(|e| matches!(e, GameEvent::ProjectileFired { .. }))
                .count();
            fired_at.extend(std::iter::repeat_n(state.time_ms, shots));
            ticks += 1;
            assert!(ticks < 240, "zombie survived");
        }

        // 100 hp takes three 35 damage shots, each held back by the 250 ms fire rate
        assert!(fired_at.len() >= 3, "only {} shots fired", fired_at.len());
        for pair in fired_at[..3].windows(2) {
            let gap = pair[1] - pair[0];
            assert!(gap >= 250.0 - 1e-6, "shots {} ms apart", gap);
            assert!(gap <= 250.0 + 2.0 * SIM_DT_MS as f64, "shots {} ms apart", gap);
        }
        assert!(state.time_ms >= fired_at[2]);
        assert!(state.time_ms - fired_at[0] >= 500.0 - 1e-6);
        assert!(state.enemies[0].entity.hp <= 0.0);
        let kills = state
            .events
            .iter()
            .filter(|e| matches!(e, GameEvent::EnemyKilled { .. }))
            .count();
        assert_eq!(kills, 1);

        for _ in 0..DEATH_SLIDE_TICKS - 2 {
            tick(&mut state, &mut physics, &TickInput::default(), SIM_DT_MS);
            assert_eq!(state.enemies.len(), 1);
        }
        tick(&mut state, &mut physics, &TickInput::default(), SIM_DT_MS);
        assert!(state.enemies.is_empty());
    }

    #[test]
    fn test_revived_player_is_targeted_on_the_death_tick() {
        let mut state = GameState::new(&SessionConfig {
            lives: 3,
            ..Default::default()
        });
        let mut physics = GridPhysics::new();
        state.spawn_player(&mut physics, 0);
        let player_id = state.players[0].entity.id;
        let player_pos = state.players[0].entity.pos;
        state.players[0].entity.hp = 1.0;
        state.spawn_enemy(&mut physics, EntityKind::Zombie, player_pos + Vec2::new(14.0, 0.0));

        tick(&mut state, &mut physics, &TickInput::default(), SIM_DT_MS);

        let player = &state.players[0];
        assert_eq!(player.lives, 2);
        assert!(!player.entity.dead);
        assert_eq!(player.entity.hp, PLAYER_HP);
        let zombie = &state.enemies[0];
        assert_eq!(zombie.target, Some(player_id));
        assert!(zombie.entity.vel.length() > 0.0);
    }

    #[test]
    fn test_frame_clock_caps_substeps() {
        let mut clock = FrameClock::new();
        assert_eq!(clock.advance(SIM_DT_MS * 0.6), 0);
        assert_eq!(clock.advance(SIM_DT_MS * 0.6), 1);
        // A long stall only yields the clamped amount of work
        let steps = clock.advance(10_000.0);
        assert!(steps >= 5 && steps <= MAX_SUBSTEPS);
        assert!(steps as f32 * SIM_DT_MS <= MAX_TICK_MS + 1e-3);
        assert!(clock.alpha() < 1.0);
    }
}
