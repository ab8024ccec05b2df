//! Grid navigation around static geometry
//!
//! A coarse occupancy grid is rebuilt from static bodies every few ticks.
//! Enemies use line-of-sight checks to decide between straight pursuit and an
//! A* route (8-connected, no corner cutting, iteration-capped).

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use glam::Vec2;

use super::collision::Aabb;

const DIAGONAL_COST: f32 = std::f32::consts::SQRT_2;
/// Weight on the Manhattan heuristic
const HEURISTIC_WEIGHT: f32 = 0.8;

const NEIGHBORS: [(i32, i32); 8] = [
    (1, 0),
    (-1, 0),
    (0, 1),
    (0, -1),
    (1, 1),
    (1, -1),
    (-1, 1),
    (-1, -1),
];

#[derive(Debug, Clone, Default)]
pub struct OccupancyGrid {
    pub cell_size: f32,
    pub cols: i32,
    pub rows: i32,
    blocked: Vec<bool>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct OpenNode {
    f: f32,
    g: f32,
    index: usize,
}

impl Eq for OpenNode {}

impl Ord for OpenNode {
    fn cmp(&self, other: &Self) -> Ordering {
        // Min-heap on f; ties broken by index so expansion order is stable
        other
            .f
            .partial_cmp(&self.f)
            .unwrap_or(Ordering::Equal)
            .then_with(|| other.index.cmp(&self.index))
    }
}

impl PartialOrd for OpenNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl OccupancyGrid {
    /// Grid with no cells; every query falls back to direct pursuit
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.blocked.is_empty()
    }

    pub fn new(width: f32, height: f32, cell_size: f32) -> Self {
        let cols = (width / cell_size).ceil().max(1.0) as i32;
        let rows = (height / cell_size).ceil().max(1.0) as i32;
        Self {
            cell_size,
            cols,
            rows,
            blocked: vec![false; (cols * rows) as usize],
        }
    }

    /// Mark every cell overlapped by a box
    pub fn block_aabb(&mut self, aabb: &Aabb) {
        let (x0, y0) = self.cell_of(aabb.min);
        let (x1, y1) = self.cell_of(aabb.max);
        for x in x0.max(0)..=x1.min(self.cols - 1) {
            for y in y0.max(0)..=y1.min(self.rows - 1) {
                let cell = Aabb {
                    min: Vec2::new(x as f32, y as f32) * self.cell_size,
                    max: Vec2::new(x as f32 + 1.0, y as f32 + 1.0) * self.cell_size,
                };
                if cell.overlaps(aabb) {
                    let i = self.index(x, y);
                    self.blocked[i] = true;
                }
            }
        }
    }

    pub fn from_aabbs(width: f32, height: f32, cell_size: f32, aabbs: &[Aabb]) -> Self {
        let mut grid = Self::new(width, height, cell_size);
        for aabb in aabbs {
            grid.block_aabb(aabb);
        }
        grid
    }

    pub fn cell_of(&self, pos: Vec2) -> (i32, i32) {
        (
            (pos.x / self.cell_size).floor() as i32,
            (pos.y / self.cell_size).floor() as i32,
        )
    }

    pub fn cell_center(&self, x: i32, y: i32) -> Vec2 {
        Vec2::new(x as f32 + 0.5, y as f32 + 0.5) * self.cell_size
    }

    fn in_bounds(&self, x: i32, y: i32) -> bool {
        x >= 0 && y >= 0 && x < self.cols && y < self.rows
    }

    fn index(&self, x: i32, y: i32) -> usize {
        (y * self.cols + x) as usize
    }

    /// Out-of-bounds cells count as blocked
    pub fn is_blocked(&self, x: i32, y: i32) -> bool {
        !self.in_bounds(x, y) || self.blocked[self.index(x, y)]
    }

    /// Cells on the line between two points are all open (Bresenham walk).
    /// Points further apart than `max_distance` are never in sight.
    pub fn has_line_of_sight(&self, from: Vec2, to: Vec2, max_distance: f32) -> bool {
        if self.is_empty() {
            return true;
        }
        if from.distance(to) > max_distance {
            return false;
        }

        let (mut x0, mut y0) = self.cell_of(from);
        let (x1, y1) = self.cell_of(to);
        let dx = (x1 - x0).abs();
        let dy = -(y1 - y0).abs();
        let sx = if x0 < x1 { 1 } else { -1 };
        let sy = if y0 < y1 { 1 } else { -1 };
        let mut err = dx + dy;

        loop {
            if self.is_blocked(x0, y0) {
                return false;
            }
            if x0 == x1 && y0 == y1 {
                return true;
            }
            let e2 = 2 * err;
            if e2 >= dy {
                err += dy;
                x0 += sx;
            }
            if e2 <= dx {
                err += dx;
                y0 += sy;
            }
        }
    }

    /// A* route from `start` to `goal` as cell-center waypoints (start excluded).
    ///
    /// Returns `None` when the goal cell is blocked, the search space is
    /// exhausted, or `max_iterations` expansions pass without reaching it.
    pub fn find_path(&self, start: Vec2, goal: Vec2, max_iterations: usize) -> Option<Vec<Vec2>> {
        if self.is_empty() {
            return None;
        }
        let (sx, sy) = self.cell_of(start);
        let (gx, gy) = self.cell_of(goal);
        if !self.in_bounds(sx, sy) || self.is_blocked(gx, gy) {
            return None;
        }
        if (sx, sy) == (gx, gy) {
            return Some(vec![goal]);
        }

        let cell_count = (self.cols * self.rows) as usize;
        let mut g_score = vec![f32::INFINITY; cell_count];
        let mut parent: Vec<Option<usize>> = vec![None; cell_count];
        let mut closed = vec![false; cell_count];
        let mut open = BinaryHeap::new();

        let start_index = self.index(sx, sy);
        let goal_index = self.index(gx, gy);
        g_score[start_index] = 0.0;
        open.push(OpenNode {
            f: self.heuristic(sx, sy, gx, gy),
            g: 0.0,
            index: start_index,
        });

        let mut iterations = 0;
        while let Some(node) = open.pop() {
            if closed[node.index] {
                continue;
            }
            if node.index == goal_index {
                return Some(self.reconstruct(&parent, goal_index));
            }
            iterations += 1;
            if iterations > max_iterations {
                return None;
            }
            closed[node.index] = true;

            let x = node.index as i32 % self.cols;
            let y = node.index as i32 / self.cols;
            for (dx, dy) in NEIGHBORS {
                let nx = x + dx;
                let ny = y + dy;
                if self.is_blocked(nx, ny) {
                    continue;
                }
                let diagonal = dx != 0 && dy != 0;
                // No squeezing between two blocked orthogonal neighbors
                if diagonal && (self.is_blocked(x + dx, y) || self.is_blocked(x, y + dy)) {
                    continue;
                }
                let n = self.index(nx, ny);
                if closed[n] {
                    continue;
                }
                let step = if diagonal { DIAGONAL_COST } else { 1.0 };
                let g = node.g + step;
                if g < g_score[n] {
                    g_score[n] = g;
                    parent[n] = Some(node.index);
                    open.push(OpenNode {
                        f: g + self.heuristic(nx, ny, gx, gy),
                        g,
                        index: n,
                    });
                }
            }
        }
        None
    }

    fn heuristic(&self, x: i32, y: i32, gx: i32, gy: i32) -> f32 {
        ((gx - x).abs() + (gy - y).abs()) as f32 * HEURISTIC_WEIGHT
    }

    fn reconstruct(&self, parent: &[Option<usize>], goal: usize) -> Vec<Vec2> {
        let mut cells = vec![goal];
        let mut current = goal;
        while let Some(p) = parent[current] {
            cells.push(p);
            current = p;
        }
        cells.pop(); // start cell
        cells
            .iter()
            .rev()
            .map(|&i| self.cell_center(i as i32 % self.cols, i as i32 / self.cols))
            .collect()
    }
}
