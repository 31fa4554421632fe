//! Collision detection and response
//!
//! Checks between the ball circle and the rectangular world: bricks, the
//! paddle and the playfield walls. Response math (reflection, paddle
//! deflection) lives here too so the tick stays a thin orchestrator.

use glam::Vec2;

use super::geom::{Rect, circle_rect_overlap, collision_normal};
use crate::consts::{MAX_BOUNCE_ANGLE, PADDLE_BOUNCE_SPEEDUP};

/// Result of a circle-vs-rect collision check
#[derive(Debug, Clone)]
pub struct CollisionResult {
    /// Whether a collision occurred
    pub hit: bool,
    /// Surface normal at the struck face (pointing toward the ball center)
    pub normal: Vec2,
    /// Penetration depth (for position correction)
    pub penetration: f32,
}

impl CollisionResult {
    pub fn miss() -> Self {
        Self {
            hit: false,
            normal: Vec2::ZERO,
            penetration: 0.0,
        }
    }
}

/// Check collision between a ball and a rect (brick, paddle)
///
/// Returns the struck-face normal for reflection. The face is chosen from
/// the closest point on the rect; a ball center inside the rect falls back
/// to the axis of smaller penetration.
pub fn ball_rect_collision(ball_pos: Vec2, ball_radius: f32, rect: &Rect) -> CollisionResult {
    if !circle_rect_overlap(ball_pos, ball_radius, rect) {
        return CollisionResult::miss();
    }

    let normal = collision_normal(ball_pos, rect);
    let closest = super::geom::clamp_point_to_rect(ball_pos, rect);
    let penetration = (ball_radius - ball_pos.distance(closest)).max(0.0);

    CollisionResult {
        hit: true,
        normal,
        penetration,
    }
}

/// Outgoing velocity for a ball bouncing off the paddle.
///
/// The bounce angle is proportional to where the ball struck:
/// `hit_offset` in [-1, 1] maps linearly onto the maximum bounce angle
/// measured from vertical, so the ball never leaves horizontally. Speed is
/// preserved, then nudged up slightly to keep rallies escalating.
pub fn paddle_bounce_velocity(speed: f32, hit_offset: f32) -> Vec2 {
    let angle = hit_offset.clamp(-1.0, 1.0) * MAX_BOUNCE_ANGLE;
    let out = Vec2::new(angle.sin() * speed, -(angle.cos() * speed).abs());
    out * PADDLE_BOUNCE_SPEEDUP
}

/// Reflect velocity off a surface (energy-preserving)
#[inline]
pub fn reflect_velocity(vel: Vec2, normal: Vec2) -> Vec2 {
    super::geom::reflect(vel, normal)
}
