//! Axis-aligned rectangle geometry for bricks, paddle and projectiles
//!
//! The playfield uses screen coordinates: origin at the top-left corner,
//! y growing downward. A rect is defined by its top-left corner and size.

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// An axis-aligned rectangle in screen space
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self { x, y, w, h }
    }

    /// Build a rect from its center point and size
    pub fn from_center(center: Vec2, w: f32, h: f32) -> Self {
        Self::new(center.x - w / 2.0, center.y - h / 2.0, w, h)
    }

    #[inline]
    pub fn left(&self) -> f32 {
        self.x
    }

    #[inline]
    pub fn right(&self) -> f32 {
        self.x + self.w
    }

    #[inline]
    pub fn top(&self) -> f32 {
        self.y
    }

    #[inline]
    pub fn bottom(&self) -> f32 {
        self.y + self.h
    }

    pub fn center(&self) -> Vec2 {
        Vec2::new(self.x + self.w / 2.0, self.y + self.h / 2.0)
    }

    /// AABB overlap test; touching edges count as overlap
    pub fn overlaps(&self, other: &Rect) -> bool {
        self.left() <= other.right()
            && self.right() >= other.left()
            && self.top() <= other.bottom()
            && self.bottom() >= other.top()
    }

    pub fn contains_point(&self, p: Vec2) -> bool {
        p.x >= self.left() && p.x <= self.right() && p.y >= self.top() && p.y <= self.bottom()
    }
}

/// Clamp a point to the bounds of a rect (closest point on/inside the rect)
#[inline]
pub fn clamp_point_to_rect(p: Vec2, rect: &Rect) -> Vec2 {
    Vec2::new(
        p.x.clamp(rect.left(), rect.right()),
        p.y.clamp(rect.top(), rect.bottom()),
    )
}

/// Check overlap between a circle and a rect; touching counts as overlap
pub fn circle_rect_overlap(center: Vec2, radius: f32, rect: &Rect) -> bool {
    let closest = clamp_point_to_rect(center, rect);
    center.distance_squared(closest) <= radius * radius
}

/// Surface normal for a circle hitting a rect, pointing toward the circle center.
///
/// When the center sits inside the rect the clamped point degenerates, so the
/// normal falls back to the axis of smaller penetration.
pub fn collision_normal(center: Vec2, rect: &Rect) -> Vec2 {
    let closest = clamp_point_to_rect(center, rect);
    let delta = center - closest;

    if delta.length_squared() > 1e-6 {
        return delta.normalize();
    }

    // Center is inside the rect: pick the face with the smallest penetration
    let rc = rect.center();
    let pen_x = rect.w / 2.0 - (center.x - rc.x).abs();
    let pen_y = rect.h / 2.0 - (center.y - rc.y).abs();

    if pen_x < pen_y {
        Vec2::new(if center.x > rc.x { 1.0 } else { -1.0 }, 0.0)
    } else {
        Vec2::new(0.0, if center.y > rc.y { 1.0 } else { -1.0 })
    }
}

/// Reflect velocity off a surface
///
/// Standard reflection: v' = v - 2(v·n)n
#[inline]
pub fn reflect(vel: Vec2, normal: Vec2) -> Vec2 {
    vel - 2.0 * vel.dot(normal) * normal
}
