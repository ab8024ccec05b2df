//! A game session: state, physics backend and frame clock in one place
//!
//! The host owns a [`Session`], feeds it frame time and per-player commands,
//! and reads events and snapshots back out. Everything else is internal.

use glam::Vec2;

use super::director;
use super::events::GameEvent;
use super::input::TickInput;
use super::map::{build_walls, rebuild_nav, scatter_obstacles};
use super::physics::{GridPhysics, SpatialBackend};
use super::snapshot::{HudSnapshot, WorldSnapshot, camera_focus};
use super::state::{GamePhase, GameState};
use super::tick::{FrameClock, tick};
use crate::consts::*;
use crate::settings::{Difficulty, SessionConfig};

pub struct Session<B: SpatialBackend = GridPhysics> {
    config: SessionConfig,
    state: GameState,
    physics: B,
    clock: FrameClock,
}

impl Session<GridPhysics> {
    /// Start a session on the built-in grid physics
    pub fn new(config: SessionConfig) -> Self {
        Self::with_backend(config, GridPhysics::new())
    }
}

impl<B: SpatialBackend> Session<B> {
    pub fn with_backend(config: SessionConfig, physics: B) -> Self {
        let config = config.sanitized();
        let state = GameState::new(&config);
        let mut session = Self {
            config,
            state,
            physics,
            clock: FrameClock::new(),
        };
        session.reset();
        session
    }

    /// Tear everything down and rebuild the arena from the config
    pub fn reset(&mut self) {
        self.physics.clear();
        self.clock.reset();
        self.state = GameState::new(&self.config);
        populate(&mut self.state, &mut self.physics);
        log::info!(
            "Session started: seed={:#x} players={} lives={} difficulty={}",
            self.config.seed,
            self.state.player_count,
            self.state.starting_lives,
            self.state.difficulty.as_str()
        );
    }

    /// Bank host frame time and run as many fixed ticks as it covers.
    ///
    /// Weapon switches apply on the first tick only so one key press never
    /// cycles twice. Returns the number of ticks run.
    pub fn advance(&mut self, elapsed_ms: f32, input: &TickInput) -> u32 {
        let steps = self.clock.advance(elapsed_ms);
        let mut input = input.clone();
        for _ in 0..steps {
            tick(&mut self.state, &mut self.physics, &input, SIM_DT_MS);
            for command in &mut input.players {
                command.weapon_select = None;
                command.cycle_weapon = false;
            }
        }
        steps
    }

    /// Run exactly one fixed tick
    pub fn step(&mut self, input: &TickInput) {
        tick(&mut self.state, &mut self.physics, input, SIM_DT_MS);
    }

    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.state.events)
    }

    pub fn hud(&self) -> HudSnapshot {
        HudSnapshot::capture(&self.state)
    }

    pub fn snapshot(&self) -> WorldSnapshot {
        WorldSnapshot::capture(&self.state)
    }

    pub fn camera_focus(&self) -> Option<Vec2> {
        camera_focus(&self.state)
    }

    /// Switch tier mid-session; affects later spawns and wave sizing
    pub fn set_difficulty(&mut self, difficulty: Difficulty) {
        if self.state.difficulty != difficulty {
            log::info!("Difficulty changed to {}", difficulty.as_str());
        }
        self.config.difficulty = difficulty;
        self.state.difficulty = difficulty;
    }

    pub fn is_over(&self) -> bool {
        self.state.phase == GamePhase::GameOver
    }

    /// Render interpolation factor between the last two ticks
    pub fn alpha(&self) -> f32 {
        self.clock.alpha()
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }
}

/// Arena, players, initial scatter and wave 1
fn populate(state: &mut GameState, physics: &mut dyn SpatialBackend) {
    build_walls(state, physics);
    for index in 0..state.player_count {
        state.spawn_player(physics, index);
    }
    scatter_obstacles(state, physics, SCATTER_SESSION_ATTEMPTS);
    director::start_wave(state, 1);
    rebuild_nav(state, physics);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::combat::damage_player;
    use crate::sim::director::WavePhase;
    use crate::sim::input::PlayerCommand;
    use proptest::prelude::*;

    fn scripted_input(tick: u32) -> TickInput {
        let angle = tick as f32 * 0.05;
        TickInput::single(PlayerCommand {
            move_x: angle.cos(),
            move_y: angle.sin(),
            aim: Some(Vec2::new(800.0, 600.0)),
            firing: tick % 3 != 0,
            placing: tick % 97 == 0,
            cycle_weapon: tick % 200 == 0,
            ..Default::default()
        })
    }

    #[test]
    fn test_new_session_builds_the_arena() {
        let mut session = Session::new(SessionConfig::default());
        let state = session.state();
        assert!(!state.walls.is_empty());
        assert!(!state.obstacles.is_empty());
        assert_eq!(state.players.len(), 1);
        assert_eq!(state.wave.wave, 1);
        assert_eq!(state.wave.phase, WavePhase::Spawning);
        assert!(!state.nav.is_empty());

        let events = session.drain_events();
        assert!(events.iter().any(|e| matches!(e, GameEvent::WaveStarted { wave: 1, .. })));
        assert!(session.drain_events().is_empty());
    }

    #[test]
    fn test_advance_runs_fixed_ticks() {
        let mut session = Session::new(SessionConfig::default());
        assert_eq!(session.advance(SIM_DT_MS * 3.5, &TickInput::default()), 3);
        assert_eq!(session.state().time_ticks, 3);
        assert!(session.alpha() > 0.4 && session.alpha() < 0.6);
    }

    #[test]
    fn test_weapon_cycle_applies_once_per_frame() {
        let mut session = Session::new(SessionConfig::default());
        let input = TickInput::single(PlayerCommand {
            cycle_weapon: true,
            ..Default::default()
        });
        assert_eq!(session.advance(SIM_DT_MS * 4.0 + 0.01, &input), 4);
        assert_eq!(session.state().players[0].weapon, crate::sim::WeaponKind::Uzi);
    }

    #[test]
    fn test_reset_rebuilds_from_scratch() {
        let mut session = Session::new(SessionConfig::default());
        let fresh_bodies = session.physics.body_count();
        let fresh = session.snapshot();
        for i in 0..300 {
            session.step(&scripted_input(i));
        }
        assert!(session.state().time_ticks > 0);

        session.reset();
        assert_eq!(session.state().time_ticks, 0);
        assert_eq!(session.physics.body_count(), fresh_bodies);
        assert_eq!(session.snapshot(), fresh);
    }

    #[test]
    fn test_same_seed_same_game() {
        let config = SessionConfig {
            seed: 42,
            player_count: 2,
            ..Default::default()
        };
        let mut a = Session::new(config.clone());
        let mut b = Session::new(config);
        for i in 0..900 {
            let input = scripted_input(i);
            a.step(&input);
            b.step(&input);
        }
        let snap_a = serde_json::to_string(&a.snapshot()).unwrap();
        let snap_b = serde_json::to_string(&b.snapshot()).unwrap();
        assert_eq!(snap_a, snap_b);
        assert_eq!(a.drain_events(), b.drain_events());
    }

    #[test]
    fn test_different_seeds_differ() {
        let a = Session::new(SessionConfig {
            seed: 1,
            ..Default::default()
        });
        let b = Session::new(SessionConfig {
            seed: 2,
            ..Default::default()
        });
        assert_ne!(a.snapshot().obstacles, b.snapshot().obstacles);
    }

    #[test]
    fn test_game_over_is_reported_once() {
        let mut session = Session::new(SessionConfig {
            lives: 1,
            ..Default::default()
        });
        damage_player(&mut session.state, 0, 1000.0);
        session.step(&TickInput::default());
        assert!(session.is_over());
        assert_eq!(session.camera_focus(), None);

        let ticks = session.state().time_ticks;
        session.step(&TickInput::default());
        session.advance(100.0, &TickInput::default());
        assert_eq!(session.state().time_ticks, ticks);

        let overs = session
            .drain_events()
            .into_iter()
            .filter(|e| matches!(e, GameEvent::GameOver { .. }))
            .count();
        assert_eq!(overs, 1);
    }

    #[test]
    fn test_difficulty_change_applies_to_new_spawns() {
        let mut session = Session::new(SessionConfig::default());
        session.set_difficulty(Difficulty::Nightmare);
        assert_eq!(session.config().difficulty, Difficulty::Nightmare);

        for _ in 0..120 {
            session.step(&TickInput::default());
        }
        let zombie = session
            .state()
            .enemies
            .iter()
            .find(|e| e.entity.kind == crate::sim::EntityKind::Zombie)
            .map(|e| e.entity.max_hp);
        if let Some(hp) = zombie {
            assert!((hp - ZOMBIE_HP * Difficulty::Nightmare.profile().hp).abs() < 1e-3);
        }
        assert!(!session.state().enemies.is_empty());
    }

    #[test]
    fn test_config_is_sanitized() {
        let session = Session::new(SessionConfig {
            player_count: 9,
            lives: -4,
            ..Default::default()
        });
        assert_eq!(session.state().players.len(), 4);
        assert!(session.state().players.iter().all(|p| p.lives == 1));
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(8))]

        #[test]
        fn prop_enemy_and_wave_invariants_hold_every_tick(seed in any::<u64>(), players in 1i32..=4) {
            let mut session = Session::new(SessionConfig {
                seed,
                player_count: players,
                ..Default::default()
            });
            for i in 0..900 {
                session.step(&scripted_input(i));
                let state = session.state();
                for enemy in &state.enemies {
                    let e = &enemy.entity;
                    prop_assert!(
                        (e.hp > 0.0) != (e.dead || e.is_dying()),
                        "tick {}: enemy {} hp={} dead={} dying={:?}",
                        i, e.id, e.hp, e.dead, e.dying
                    );
                }
                prop_assert!(
                    state.wave.remaining <= state.wave.total,
                    "tick {}: remaining {} > total {}",
                    i, state.wave.remaining, state.wave.total
                );
            }
        }
    }
}
