//! Arena layout: boundary walls, internal wall rows, the safe zone and
//! obstacle scatter

use glam::Vec2;
use rand::Rng;

use super::collision::Aabb;
use super::pathfinding::OccupancyGrid;
use super::physics::{Body, BodyOwner, SpatialBackend, category, mask};
use super::state::{GameState, ObstacleKind, ObstacleOrigin, cell_center, grid_cell};
use crate::consts::*;

/// Share of scattered obstacles that are barrels
const BARREL_SHARE: f64 = 0.4;
/// Scatter keeps this far from the arena edge
const SCATTER_EDGE_MARGIN: f32 = 100.0;

/// Internal wall rows as (y, gap center x)
const WALL_ROWS: [(f32, f32); 3] = [
    (400.0, 400.0),
    (800.0, WORLD_WIDTH / 2.0),
    (1100.0, WORLD_WIDTH - 400.0),
];

/// Boxes making up the fixed arena geometry
pub fn wall_layout() -> Vec<Aabb> {
    let t = WALL_THICKNESS;
    let mut walls = vec![
        Aabb {
            min: Vec2::ZERO,
            max: Vec2::new(WORLD_WIDTH, t),
        },
        Aabb {
            min: Vec2::new(0.0, WORLD_HEIGHT - t),
            max: Vec2::new(WORLD_WIDTH, WORLD_HEIGHT),
        },
        Aabb {
            min: Vec2::ZERO,
            max: Vec2::new(t, WORLD_HEIGHT),
        },
        Aabb {
            min: Vec2::new(WORLD_WIDTH - t, 0.0),
            max: Vec2::new(WORLD_WIDTH, WORLD_HEIGHT),
        },
    ];

    for (y, gap_x) in WALL_ROWS {
        let left_end = gap_x - WALL_GAP / 2.0;
        let right_start = gap_x + WALL_GAP / 2.0;
        walls.push(Aabb {
            min: Vec2::new(0.0, y - t / 2.0),
            max: Vec2::new(left_end, y + t / 2.0),
        });
        walls.push(Aabb {
            min: Vec2::new(right_start, y - t / 2.0),
            max: Vec2::new(WORLD_WIDTH, y + t / 2.0),
        });
    }
    walls
}

/// Create static bodies for the arena walls
pub fn build_walls(state: &mut GameState, physics: &mut dyn SpatialBackend) {
    for aabb in wall_layout() {
        let handle = physics.create_body(Body::static_rect(
            BodyOwner::Wall,
            aabb.center(),
            aabb.half_extents(),
            category::WALL,
            mask::WALL,
        ));
        state.walls.push(handle);
    }
}

pub fn safe_zone_center() -> Vec2 {
    Vec2::new(SAFE_ZONE_CENTER.0, SAFE_ZONE_CENTER.1)
}

/// Sheltered players are invisible to enemies
pub fn in_safe_zone(pos: Vec2) -> bool {
    pos.distance_squared(safe_zone_center()) <= SAFE_ZONE_RADIUS * SAFE_ZONE_RADIUS
}

pub fn in_world(pos: Vec2) -> bool {
    pos.x >= 0.0 && pos.y >= 0.0 && pos.x <= WORLD_WIDTH && pos.y <= WORLD_HEIGHT
}

/// A wall or obstacle overlaps the placement cell centered on `center`
pub fn cell_occupied(physics: &dyn SpatialBackend, center: Vec2) -> bool {
    let cell = Aabb::from_center(center, Vec2::splat(PLACEMENT_GRID / 2.0));
    physics.query_aabb(&cell).into_iter().any(|h| {
        matches!(
            physics.owner(h),
            Some(BodyOwner::Wall) | Some(BodyOwner::Obstacle(_))
        )
    })
}

/// Scatter obstacles on free grid cells; returns how many were placed
pub fn scatter_obstacles(state: &mut GameState, physics: &mut dyn SpatialBackend, attempts: u32) -> u32 {
    let spawn = Vec2::new(WORLD_WIDTH / 2.0, PLAYER_SPAWN_Y);
    let mut placed = 0;

    for _ in 0..attempts {
        let x = state
            .rng
            .random_range(SCATTER_EDGE_MARGIN..WORLD_WIDTH - SCATTER_EDGE_MARGIN);
        let y = state
            .rng
            .random_range(SCATTER_EDGE_MARGIN..WORLD_HEIGHT - SCATTER_EDGE_MARGIN);
        let barrel = state.rng.random_bool(BARREL_SHARE);

        let cell = grid_cell(Vec2::new(x, y));
        let center = cell_center(cell);
        if center.distance(spawn) < SCATTER_SPAWN_CLEARANCE {
            continue;
        }
        if center.distance(safe_zone_center()) < SAFE_ZONE_RADIUS + PLACEMENT_GRID * 2.0 {
            continue;
        }
        // Never bury a live player
        if state
            .players
            .iter()
            .any(|p| !p.eliminated && p.entity.pos.distance(center) < PLAYER_RADIUS * 4.0)
        {
            continue;
        }
        if cell_occupied(physics, center) {
            continue;
        }

        let kind = if barrel {
            ObstacleKind::Barrel
        } else {
            ObstacleKind::Wall
        };
        state.spawn_obstacle(physics, kind, cell, ObstacleOrigin::Scattered);
        placed += 1;
    }

    log::debug!("Scattered {} of {} obstacles", placed, attempts);
    placed
}

/// Rebuild the navigation grid from current static geometry
pub fn rebuild_nav(state: &mut GameState, physics: &dyn SpatialBackend) {
    state.nav = OccupancyGrid::from_aabbs(WORLD_WIDTH, WORLD_HEIGHT, PATH_CELL, &physics.static_aabbs());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::SessionConfig;
    use crate::sim::physics::GridPhysics;

    #[test]
    fn test_wall_rows_leave_gaps() {
        let walls = wall_layout();
        assert_eq!(walls.len(), 10);
        for (y, gap_x) in WALL_ROWS {
            let p = Vec2::new(gap_x, y);
            assert!(!walls.iter().any(|w| w.contains(p)), "gap at {p} is blocked");
            assert!(walls.iter().any(|w| w.contains(Vec2::new(gap_x + WALL_GAP, y))));
        }
    }

    #[test]
    fn test_spawn_and_safe_zone_are_open() {
        let walls = wall_layout();
        let spawn = Vec2::new(WORLD_WIDTH / 2.0, PLAYER_SPAWN_Y);
        let zone = Aabb::from_center(safe_zone_center(), Vec2::splat(SAFE_ZONE_RADIUS));
        assert!(!walls.iter().any(|w| w.contains(spawn)));
        assert!(!walls.iter().any(|w| w.overlaps(&zone)));
        assert!(in_safe_zone(safe_zone_center()));
        assert!(!in_safe_zone(spawn));
    }

    #[test]
    fn test_scatter_respects_clearances() {
        let mut state = GameState::new(&SessionConfig::default());
        let mut physics = GridPhysics::new();
        build_walls(&mut state, &mut physics);
        let placed = scatter_obstacles(&mut state, &mut physics, SCATTER_SESSION_ATTEMPTS);

        assert_eq!(placed as usize, state.obstacles.len());
        assert!(placed > 0);
        let spawn = Vec2::new(WORLD_WIDTH / 2.0, PLAYER_SPAWN_Y);
        let mut cells: Vec<_> = state.obstacles.iter().map(|o| o.cell).collect();
        for o in &state.obstacles {
            assert!(o.entity.pos.distance(spawn) >= SCATTER_SPAWN_CLEARANCE);
            assert!(!in_safe_zone(o.entity.pos));
        }
        cells.sort_unstable();
        cells.dedup();
        assert_eq!(cells.len(), state.obstacles.len(), "two obstacles share a cell");
    }

    #[test]
    fn test_cell_occupied_sees_walls_and_obstacles() {
        let mut state = GameState::new(&SessionConfig::default());
        let mut physics = GridPhysics::new();
        build_walls(&mut state, &mut physics);
        assert!(cell_occupied(&physics, Vec2::new(10.0, 10.0)));
        assert!(!cell_occupied(&physics, Vec2::new(600.0, 600.0)));

        let cell = grid_cell(Vec2::new(600.0, 600.0));
        state.spawn_obstacle(&mut physics, ObstacleKind::Wall, cell, ObstacleOrigin::Scattered);
        assert!(cell_occupied(&physics, cell_center(cell)));
        // Neighbouring cells only share an edge with it
        assert!(!cell_occupied(&physics, cell_center((cell.0 + 1, cell.1))));
    }

    #[test]
    fn test_cell_straddling_a_wall_edge_is_occupied() {
        let mut state = GameState::new(&SessionConfig::default());
        let mut physics = GridPhysics::new();
        build_walls(&mut state, &mut physics);
        // The first internal row spans y 380..420; this cell covers 416..432
        let straddling = cell_center(grid_cell(Vec2::new(600.0, 424.0)));
        assert!(!wall_layout().iter().any(|w| w.contains(straddling)));
        assert!(cell_occupied(&physics, straddling));

        let clear = cell_center(grid_cell(Vec2::new(600.0, 440.0)));
        assert!(!cell_occupied(&physics, clear));
    }

    #[test]
    fn test_nav_grid_blocks_walls() {
        let mut state = GameState::new(&SessionConfig::default());
        let mut physics = GridPhysics::new();
        build_walls(&mut state, &mut physics);
        rebuild_nav(&mut state, &physics);
        let (x, y) = state.nav.cell_of(Vec2::new(100.0, 400.0));
        assert!(state.nav.is_blocked(x, y));
        let (x, y) = state.nav.cell_of(Vec2::new(400.0, 400.0));
        assert!(!state.nav.is_blocked(x, y));
    }
}
