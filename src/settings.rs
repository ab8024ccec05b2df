//! Session configuration and difficulty profiles
//!
//! Read at session start and whenever the difficulty tier changes. Out-of-range
//! values are clamped into the supported set rather than rejected.

use serde::{Deserialize, Serialize};

/// Difficulty tiers, each a fixed multiplier set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(from = "DifficultyRepr")]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
    Nightmare,
}

impl Difficulty {
    pub const ALL: [Difficulty; 4] = [
        Difficulty::Easy,
        Difficulty::Medium,
        Difficulty::Hard,
        Difficulty::Nightmare,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "Easy",
            Difficulty::Medium => "Medium",
            Difficulty::Hard => "Hard",
            Difficulty::Nightmare => "Nightmare",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "easy" => Some(Difficulty::Easy),
            "medium" | "med" | "normal" => Some(Difficulty::Medium),
            "hard" => Some(Difficulty::Hard),
            "nightmare" | "insane" => Some(Difficulty::Nightmare),
            _ => None,
        }
    }

    /// Tier for an index, clamped into the enumerated set
    pub fn from_index(index: i64) -> Self {
        let clamped = index.clamp(0, Self::ALL.len() as i64 - 1);
        if clamped != index {
            log::warn!("Difficulty index {} out of range, using {}", index, clamped);
        }
        Self::ALL[clamped as usize]
    }

    pub fn index(&self) -> usize {
        match self {
            Difficulty::Easy => 0,
            Difficulty::Medium => 1,
            Difficulty::Hard => 2,
            Difficulty::Nightmare => 3,
        }
    }

    /// Enemy stat multipliers for this tier
    pub fn profile(&self) -> DifficultyProfile {
        match self {
            Difficulty::Easy => DifficultyProfile {
                hp: 0.75,
                speed: 0.85,
                spawn_rate: 0.75,
                max_concurrent: 0.8,
                wave_size: 0.75,
                special_chance: 0.5,
            },
            Difficulty::Medium => DifficultyProfile::default(),
            Difficulty::Hard => DifficultyProfile {
                hp: 1.3,
                speed: 1.15,
                spawn_rate: 1.25,
                max_concurrent: 1.2,
                wave_size: 1.25,
                special_chance: 1.5,
            },
            Difficulty::Nightmare => DifficultyProfile {
                hp: 1.7,
                speed: 1.3,
                spawn_rate: 1.5,
                max_concurrent: 1.4,
                wave_size: 1.5,
                special_chance: 2.0,
            },
        }
    }
}

/// Accepts either a tier name or a numeric index in config files
#[derive(Deserialize)]
#[serde(untagged)]
enum DifficultyRepr {
    Index(i64),
    Name(String),
}

impl From<DifficultyRepr> for Difficulty {
    fn from(repr: DifficultyRepr) -> Self {
        match repr {
            DifficultyRepr::Index(i) => Difficulty::from_index(i),
            DifficultyRepr::Name(name) => Difficulty::parse(&name).unwrap_or_else(|| {
                log::warn!("Unknown difficulty {:?}, using Medium", name);
                Difficulty::Medium
            }),
        }
    }
}

/// Multipliers applied to enemy stats and wave sizing
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DifficultyProfile {
    pub hp: f32,
    pub speed: f32,
    /// Scales how quickly the director releases enemies
    pub spawn_rate: f32,
    /// Scales the concurrent-alive cap
    pub max_concurrent: f32,
    /// Scales the per-wave enemy total
    pub wave_size: f32,
    /// Scales the special-enemy spawn probability
    pub special_chance: f32,
}

impl Default for DifficultyProfile {
    fn default() -> Self {
        Self {
            hp: 1.0,
            speed: 1.0,
            spawn_rate: 1.0,
            max_concurrent: 1.0,
            wave_size: 1.0,
            special_chance: 1.0,
        }
    }
}

pub const MIN_PLAYERS: i32 = 1;
pub const MAX_PLAYERS: i32 = 4;
pub const MIN_LIVES: i32 = 1;
pub const MAX_LIVES: i32 = 9;

/// Everything the simulation needs to start a session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Run seed for reproducibility
    pub seed: u64,
    /// Local co-op players (1-4)
    pub player_count: i32,
    /// Revives granted to each player
    pub lives: i32,
    pub difficulty: Difficulty,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            seed: 0x5EED,
            player_count: 1,
            lives: 3,
            difficulty: Difficulty::Medium,
        }
    }
}

impl SessionConfig {
    /// Parse from JSON; missing fields take defaults, values are clamped
    pub fn from_json(text: &str) -> serde_json::Result<Self> {
        let config: SessionConfig = serde_json::from_str(text)?;
        Ok(config.sanitized())
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Clamp every field into its supported range
    pub fn sanitized(mut self) -> Self {
        let players = self.player_count.clamp(MIN_PLAYERS, MAX_PLAYERS);
        if players != self.player_count {
            log::warn!("player_count {} clamped to {}", self.player_count, players);
            self.player_count = players;
        }
        let lives = self.lives.clamp(MIN_LIVES, MAX_LIVES);
        if lives != self.lives {
            log::warn!("lives {} clamped to {}", self.lives, lives);
            self.lives = lives;
        }
        self
    }

    pub fn player_count(&self) -> usize {
        self.player_count.clamp(MIN_PLAYERS, MAX_PLAYERS) as usize
    }

    pub fn lives(&self) -> u8 {
        self.lives.clamp(MIN_LIVES, MAX_LIVES) as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_difficulty_parse() {
        assert_eq!(Difficulty::parse("HARD"), Some(Difficulty::Hard));
        assert_eq!(Difficulty::parse(" med "), Some(Difficulty::Medium));
        assert_eq!(Difficulty::parse("impossible"), None);
    }

    #[test]
    fn test_difficulty_index_clamps() {
        assert_eq!(Difficulty::from_index(-4), Difficulty::Easy);
        assert_eq!(Difficulty::from_index(2), Difficulty::Hard);
        assert_eq!(Difficulty::from_index(42), Difficulty::Nightmare);
    }

    #[test]
    fn test_medium_profile_is_neutral() {
        assert_eq!(Difficulty::Medium.profile(), DifficultyProfile::default());
        assert!(Difficulty::Hard.profile().hp > Difficulty::Easy.profile().hp);
    }

    #[test]
    fn test_config_from_json_clamps() {
        let config =
            SessionConfig::from_json(r#"{"lives": -3, "player_count": 7, "difficulty": 9}"#)
                .unwrap();
        assert_eq!(config.lives(), 1);
        assert_eq!(config.player_count(), 4);
        assert_eq!(config.difficulty, Difficulty::Nightmare);
    }

    #[test]
    fn test_config_from_json_defaults_and_names() {
        let config = SessionConfig::from_json(r#"{"difficulty": "easy"}"#).unwrap();
        assert_eq!(config.difficulty, Difficulty::Easy);
        assert_eq!(config.lives(), 3);
        assert_eq!(config.player_count(), 1);
    }

    #[test]
    fn test_config_round_trips_through_json() {
        let config = SessionConfig {
            seed: 7,
            player_count: 2,
            lives: 5,
            difficulty: Difficulty::Hard,
        };
        let text = config.to_json().unwrap();
        assert_eq!(SessionConfig::from_json(&text).unwrap(), config);
    }

    #[test]
    fn test_config_rejects_malformed_json() {
        assert!(SessionConfig::from_json("{ lives: ").is_err());
    }
}
