//! Weapon table
//!
//! Every weapon is data: a fire-rate gate plus either a projectile volley or
//! an obstacle deployment.

use serde::{Deserialize, Serialize};

use super::state::ObstacleKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WeaponKind {
    Pistol,
    Uzi,
    Shotgun,
    FakeWall,
    Barrel,
    Grenade,
    Cannon,
}

/// What happens to explosive obstacles caught in a blast
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChainPolicy {
    /// Explosive obstacles detonate in turn, up to the chain depth limit
    Propagate,
    /// Explosive obstacles are destroyed silently; the blast never spreads
    Contain,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BlastSpec {
    pub radius: f32,
    pub damage: f32,
    pub policy: ChainPolicy,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WeaponAction {
    Shoot {
        damage: f32,
        /// Muzzle speed (px/s)
        speed: f32,
        /// Max random deviation per pellet (radians)
        spread: f32,
        pellets: u32,
        radius: f32,
        blast: Option<BlastSpec>,
        /// Projectile stops and detonates at the aim point
        detonates_at_aim: bool,
    },
    Deploy(ObstacleKind),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeaponSpec {
    pub fire_rate_ms: f64,
    /// Facing snaps to the nearest enemy in range
    pub auto_aim: bool,
    pub action: WeaponAction,
}

impl WeaponKind {
    pub const COUNT: usize = 7;

    pub const ALL: [WeaponKind; Self::COUNT] = [
        WeaponKind::Pistol,
        WeaponKind::Uzi,
        WeaponKind::Shotgun,
        WeaponKind::FakeWall,
        WeaponKind::Barrel,
        WeaponKind::Grenade,
        WeaponKind::Cannon,
    ];

    pub fn index(self) -> usize {
        match self {
            WeaponKind::Pistol => 0,
            WeaponKind::Uzi => 1,
            WeaponKind::Shotgun => 2,
            WeaponKind::FakeWall => 3,
            WeaponKind::Barrel => 4,
            WeaponKind::Grenade => 5,
            WeaponKind::Cannon => 6,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            WeaponKind::Pistol => "Pistol",
            WeaponKind::Uzi => "Uzi",
            WeaponKind::Shotgun => "Shotgun",
            WeaponKind::FakeWall => "Fake Wall",
            WeaponKind::Barrel => "Barrel",
            WeaponKind::Grenade => "Grenade",
            WeaponKind::Cannon => "Cannon",
        }
    }

    /// Next weapon in cycle order (wraps)
    pub fn next(self) -> Self {
        Self::ALL[(self.index() + 1) % Self::COUNT]
    }

    /// Ammo a fresh player carries (-1 = infinite)
    pub fn starting_ammo(self) -> i32 {
        match self {
            WeaponKind::Pistol => -1,
            WeaponKind::Uzi => 200,
            WeaponKind::Shotgun => 40,
            WeaponKind::FakeWall => 20,
            WeaponKind::Barrel => 10,
            WeaponKind::Grenade => 5,
            WeaponKind::Cannon => 10,
        }
    }

    pub fn is_deployable(self) -> bool {
        matches!(self.spec().action, WeaponAction::Deploy(_))
    }

    pub fn spec(self) -> WeaponSpec {
        match self {
            WeaponKind::Pistol => WeaponSpec {
                fire_rate_ms: 250.0,
                auto_aim: true,
                action: bullet(35.0, 1440.0, 0.05, 1),
            },
            WeaponKind::Uzi => WeaponSpec {
                fire_rate_ms: 80.0,
                auto_aim: true,
                action: bullet(15.0, 1680.0, 0.2, 1),
            },
            WeaponKind::Shotgun => WeaponSpec {
                fire_rate_ms: 800.0,
                auto_aim: true,
                action: bullet(25.0, 1320.0, 0.3, 6),
            },
            WeaponKind::FakeWall => WeaponSpec {
                fire_rate_ms: 300.0,
                auto_aim: false,
                action: WeaponAction::Deploy(ObstacleKind::Wall),
            },
            WeaponKind::Barrel => WeaponSpec {
                fire_rate_ms: 300.0,
                auto_aim: false,
                action: WeaponAction::Deploy(ObstacleKind::Barrel),
            },
            WeaponKind::Grenade => WeaponSpec {
                fire_rate_ms: 2000.0,
                auto_aim: false,
                action: WeaponAction::Shoot {
                    damage: 0.0,
                    speed: 480.0,
                    spread: 0.0,
                    pellets: 1,
                    radius: 5.0,
                    blast: Some(BlastSpec {
                        radius: 250.0,
                        damage: 1200.0,
                        policy: ChainPolicy::Propagate,
                    }),
                    detonates_at_aim: true,
                },
            },
            WeaponKind::Cannon => WeaponSpec {
                fire_rate_ms: 1500.0,
                auto_aim: false,
                action: WeaponAction::Shoot {
                    damage: 150.0,
                    speed: 1080.0,
                    spread: 0.02,
                    pellets: 1,
                    radius: 10.0,
                    blast: Some(BlastSpec {
                        radius: 120.0,
                        damage: 150.0,
                        policy: ChainPolicy::Contain,
                    }),
                    detonates_at_aim: false,
                },
            },
        }
    }
}

fn bullet(damage: f32, speed: f32, spread: f32, pellets: u32) -> WeaponAction {
    WeaponAction::Shoot {
        damage,
        speed,
        spread,
        pellets,
        radius: 3.0,
        blast: None,
        detonates_at_aim: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_indices_match_table_order() {
        for (i, weapon) in WeaponKind::ALL.iter().enumerate() {
            assert_eq!(weapon.index(), i);
        }
    }

    #[test]
    fn test_cycle_wraps() {
        assert_eq!(WeaponKind::Pistol.next(), WeaponKind::Uzi);
        assert_eq!(WeaponKind::Cannon.next(), WeaponKind::Pistol);
    }

    #[test]
    fn test_only_cannon_contains_its_blast() {
        for weapon in WeaponKind::ALL {
            if let WeaponAction::Shoot { blast: Some(blast), .. } = weapon.spec().action {
                assert_eq!(
                    blast.policy == ChainPolicy::Contain,
                    weapon == WeaponKind::Cannon
                );
            }
        }
    }

    #[test]
    fn test_deployables() {
        assert!(WeaponKind::FakeWall.is_deployable());
        assert!(WeaponKind::Barrel.is_deployable());
        assert!(!WeaponKind::Shotgun.is_deployable());
        assert_eq!(WeaponKind::Pistol.starting_ammo(), -1);
    }
}
