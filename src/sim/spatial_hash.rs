//! Uniform-grid spatial hash used as the physics broad phase

use glam::Vec2;
use rustc_hash::FxHashMap;

#[derive(Debug, Clone)]
pub struct SpatialHash {
    cell_size: f32,
    cells: FxHashMap<(i32, i32), Vec<usize>>,
}

impl SpatialHash {
    pub fn new(cell_size: f32) -> Self {
        Self {
            cell_size,
            cells: FxHashMap::default(),
        }
    }

    pub fn clear(&mut self) {
        self.cells.clear();
    }

    /// Insert an id into every cell its bounding box touches
    pub fn insert_aabb(&mut self, id: usize, min: Vec2, max: Vec2) {
        let (x0, y0) = self.cell_key(min.x, min.y);
        let (x1, y1) = self.cell_key(max.x, max.y);
        for ix in x0..=x1 {
            for iy in y0..=y1 {
                self.cells.entry((ix, iy)).or_default().push(id);
            }
        }
    }

    fn cell_key(&self, x: f32, y: f32) -> (i32, i32) {
        (
            (x / self.cell_size).floor() as i32,
            (y / self.cell_size).floor() as i32,
        )
    }

    /// Write ids in cells overlapping a box into `buf`, ascending and
    /// deduplicated. `buf` is cleared first.
    pub fn query_rect_into(&self, min: Vec2, max: Vec2, buf: &mut Vec<usize>) {
        buf.clear();
        let (x0, y0) = self.cell_key(min.x, min.y);
        let (x1, y1) = self.cell_key(max.x, max.y);
        for ix in x0..=x1 {
            for iy in y0..=y1 {
                if let Some(ids) = self.cells.get(&(ix, iy)) {
                    buf.extend_from_slice(ids);
                }
            }
        }
        // Boxes spanning several cells show up more than once
        buf.sort_unstable();
        buf.dedup();
    }
}
