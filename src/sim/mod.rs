//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Fixed timestep only
//! - Seeded RNG only
//! - Stable iteration order (by entity ID)
//! - No rendering or platform dependencies

pub mod collision;
pub mod config;
pub mod geom;
pub mod state;
pub mod tick;

pub use collision::{CollisionResult, ball_rect_collision, paddle_bounce_velocity};
pub use config::{Config, ConfigError, LevelLayout, RowSpec};
pub use geom::{Rect, circle_rect_overlap, reflect};
pub use state::{
    ActiveEffects, Ball, BallState, Brick, BrickKind, GameEvent, GamePhase, GameState, Laser,
    Paddle, PowerUp, PowerUpKind,
};
pub use tick::{TickInput, tick};
