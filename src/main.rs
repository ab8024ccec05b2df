//! Horde Arena headless driver
//!
//! Runs a session on autopilot and prints the final HUD as JSON.
//!
//! Usage: `horde-arena [config.json] [frames]`

#[cfg(not(target_arch = "wasm32"))]
mod headless {
    use glam::Vec2;

    use horde_arena::SessionConfig;
    use horde_arena::consts::*;
    use horde_arena::sim::{GameEvent, PlayerCommand, Session, TickInput, WorldSnapshot};

    /// Three simulated minutes at 60 fps
    const DEFAULT_FRAMES: u32 = 60 * 180;

    fn load_config(path: Option<String>) -> SessionConfig {
        let Some(path) = path else {
            return SessionConfig::default();
        };
        match std::fs::read_to_string(&path) {
            Ok(text) => match SessionConfig::from_json(&text) {
                Ok(config) => {
                    log::info!("Loaded config from {}", path);
                    config
                }
                Err(e) => {
                    log::warn!("Invalid config {}: {}, using defaults", path, e);
                    SessionConfig::default()
                }
            },
            Err(e) => {
                log::warn!("Could not read {}: {}, using defaults", path, e);
                SessionConfig::default()
            }
        }
    }

    /// Circle-strafe around the arena center, shooting at the closest enemy
    fn autopilot(snapshot: &WorldSnapshot, frame: u32) -> TickInput {
        let center = Vec2::new(WORLD_WIDTH / 2.0, WORLD_HEIGHT / 2.0);
        let players = snapshot
            .players
            .iter()
            .map(|p| {
                let pos = p.entity.pos;
                let radial = (pos - center).normalize_or_zero();
                let orbit = Vec2::new(-radial.y, radial.x);
                // Drift back toward the orbit radius
                let pull = (center.distance(pos) - 300.0) / 300.0;
                let heading = (orbit - radial * pull).normalize_or_zero();
                let aim = snapshot
                    .enemies
                    .iter()
                    .filter(|e| !e.dying)
                    .map(|e| e.pos)
                    .min_by(|a, b| a.distance_squared(pos).total_cmp(&b.distance_squared(pos)));

                PlayerCommand {
                    move_x: heading.x,
                    move_y: heading.y,
                    aim,
                    firing: aim.is_some(),
                    placing: frame % 240 == 120,
                    cycle_weapon: frame % 900 == 0 && frame > 0,
                    ..Default::default()
                }
            })
            .collect();
        TickInput { players }
    }

    pub fn run() {
        let mut args = std::env::args().skip(1);
        let config = load_config(args.next());
        let frames = args
            .next()
            .and_then(|s| s.parse::<u32>().ok())
            .unwrap_or(DEFAULT_FRAMES);

        let mut session = Session::new(config);
        let mut kills = 0u32;
        let mut explosions = 0u32;

        for frame in 0..frames {
            let input = autopilot(&session.snapshot(), frame);
            session.advance(SIM_DT_MS, &input);

            for event in session.drain_events() {
                match event {
                    GameEvent::EnemyKilled { .. } => kills += 1,
                    GameEvent::Explosion { .. } => explosions += 1,
                    GameEvent::WaveCleared { wave } => {
                        log::info!("Frame {}: wave {} cleared ({} kills so far)", frame, wave, kills);
                    }
                    GameEvent::PlayerEliminated { player } => {
                        log::info!("Frame {}: player {} is out", frame, player + 1);
                    }
                    GameEvent::GameOver { final_score } => {
                        log::info!("Frame {}: game over, final score {}", frame, final_score);
                    }
                    _ => {}
                }
            }
            if session.is_over() {
                break;
            }
        }

        log::info!(
            "Simulated {} ticks: {} kills, {} explosions",
            session.state().time_ticks,
            kills,
            explosions
        );
        match serde_json::to_string_pretty(&session.hud()) {
            Ok(json) => println!("{}", json),
            Err(e) => log::error!("Failed to serialize HUD: {}", e),
        }
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    env_logger::init();
    log::info!("Horde Arena (headless) starting...");
    headless::run();
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // The library is embedded by a host page; there is no standalone entry point
}
