//! Narrow-phase overlap tests
//!
//! Dynamic bodies are circles, static geometry is circles or axis-aligned
//! boxes. Every test reports a normal pointing from the second shape toward
//! the first, so pushing the first shape along it separates the pair.

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Result of a collision check
#[derive(Debug, Clone, Copy)]
pub struct CollisionResult {
    /// Whether a collision occurred
    pub hit: bool,
    /// Contact point on the second shape's surface (if hit)
    pub point: Vec2,
    /// Separation direction for the first shape
    pub normal: Vec2,
    /// Penetration depth (for position correction)
    pub penetration: f32,
}

impl CollisionResult {
    pub fn miss() -> Self {
        Self {
            hit: false,
            point: Vec2::ZERO,
            normal: Vec2::ZERO,
            penetration: 0.0,
        }
    }

    /// Same contact seen from the other shape
    pub fn flipped(self) -> Self {
        Self {
            normal: -self.normal,
            ..self
        }
    }
}

/// Axis-aligned box
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    pub min: Vec2,
    pub max: Vec2,
}

impl Aabb {
    pub fn from_center(center: Vec2, half: Vec2) -> Self {
        Self {
            min: center - half,
            max: center + half,
        }
    }

    pub fn center(&self) -> Vec2 {
        (self.min + self.max) * 0.5
    }

    pub fn half_extents(&self) -> Vec2 {
        (self.max - self.min) * 0.5
    }

    pub fn contains(&self, p: Vec2) -> bool {
        p.x >= self.min.x && p.x <= self.max.x && p.y >= self.min.y && p.y <= self.max.y
    }

    pub fn overlaps(&self, other: &Aabb) -> bool {
        self.min.x < other.max.x
            && self.max.x > other.min.x
            && self.min.y < other.max.y
            && self.max.y > other.min.y
    }
}

/// Circle vs circle
pub fn circle_circle(a_pos: Vec2, a_radius: f32, b_pos: Vec2, b_radius: f32) -> CollisionResult {
    let delta = a_pos - b_pos;
    let reach = a_radius + b_radius;
    let dist_sq = delta.length_squared();
    if dist_sq >= reach * reach {
        return CollisionResult::miss();
    }

    let dist = dist_sq.sqrt();
    // Coincident centers: pick a fixed axis so resolution stays deterministic
    let normal = if dist > 1e-6 { delta / dist } else { Vec2::X };
    CollisionResult {
        hit: true,
        point: b_pos + normal * b_radius,
        normal,
        penetration: reach - dist,
    }
}

/// Circle vs axis-aligned box
pub fn circle_aabb(pos: Vec2, radius: f32, aabb: &Aabb) -> CollisionResult {
    let closest = pos.clamp(aabb.min, aabb.max);
    let delta = pos - closest;
    let dist_sq = delta.length_squared();

    if dist_sq > 1e-12 {
        if dist_sq >= radius * radius {
            return CollisionResult::miss();
        }
        let dist = dist_sq.sqrt();
        let normal = delta / dist;
        return CollisionResult {
            hit: true,
            point: closest,
            normal,
            penetration: radius - dist,
        };
    }

    // Center is inside the box: exit through the nearest face
    let center = aabb.center();
    let half = aabb.half_extents();
    let offset = pos - center;
    let depth_x = half.x - offset.x.abs();
    let depth_y = half.y - offset.y.abs();

    if depth_x < depth_y {
        let sign = if offset.x < 0.0 { -1.0 } else { 1.0 };
        CollisionResult {
            hit: true,
            point: Vec2::new(center.x + sign * half.x, pos.y),
            normal: Vec2::new(sign, 0.0),
            penetration: depth_x + radius,
        }
    } else {
        let sign = if offset.y < 0.0 { -1.0 } else { 1.0 };
        CollisionResult {
            hit: true,
            point: Vec2::new(pos.x, center.y + sign * half.y),
            normal: Vec2::new(0.0, sign),
            penetration: depth_y + radius,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_circle_circle_overlap() {
        let result = circle_circle(Vec2::new(10.0, 0.0), 6.0, Vec2::ZERO, 6.0);
        assert!(result.hit);
        assert!((result.penetration - 2.0).abs() < 1e-5);
        assert!((result.normal - Vec2::X).length() < 1e-5);
    }

    #[test]
    fn test_circle_circle_touching_is_miss() {
        assert!(!circle_circle(Vec2::new(12.0, 0.0), 6.0, Vec2::ZERO, 6.0).hit);
    }

    #[test]
    fn test_circle_aabb_face_contact() {
        let wall = Aabb::from_center(Vec2::ZERO, Vec2::new(20.0, 20.0));
        let result = circle_aabb(Vec2::new(0.0, 25.0), 8.0, &wall);
        assert!(result.hit);
        assert!((result.normal - Vec2::Y).length() < 1e-5);
        assert!((result.penetration - 3.0).abs() < 1e-5);
    }

    #[test]
    fn test_circle_aabb_center_inside_exits_nearest_face() {
        let wall = Aabb::from_center(Vec2::ZERO, Vec2::new(100.0, 20.0));
        let result = circle_aabb(Vec2::new(30.0, -15.0), 4.0, &wall);
        assert!(result.hit);
        assert_eq!(result.normal, Vec2::new(0.0, -1.0));
        assert!((result.penetration - 9.0).abs() < 1e-5);
    }

    #[test]
    fn test_aabb_contains_and_overlaps() {
        let a = Aabb::from_center(Vec2::ZERO, Vec2::splat(8.0));
        let b = Aabb::from_center(Vec2::new(15.0, 0.0), Vec2::splat(8.0));
        let c = Aabb::from_center(Vec2::new(16.0, 0.0), Vec2::splat(8.0));
        assert!(a.contains(Vec2::new(8.0, -8.0)));
        assert!(a.overlaps(&b));
        assert!(!a.overlaps(&c));
    }
}
