//! Breakout Retro - a classic brick-breaking arcade game
//!
//! Core modules:
//! - `sim`: Deterministic simulation (physics, collisions, game state)
//! - `renderer`: WebGPU rendering pipeline

pub mod renderer;
pub mod sim;

/// Game configuration constants
pub mod consts {
    /// Fixed simulation timestep (120 Hz for smooth physics)
    pub const SIM_DT: f32 = 1.0 / 120.0;
    /// Maximum substeps per frame to prevent spiral of death
    pub const MAX_SUBSTEPS: u32 = 8;

    /// Playfield dimensions (world units, not canvas pixels)
    pub const SCREEN_WIDTH: f32 = 800.0;
    pub const SCREEN_HEIGHT: f32 = 600.0;

    /// Paddle defaults
    pub const PADDLE_WIDTH: f32 = 100.0;
    pub const PADDLE_HEIGHT: f32 = 15.0;
    /// Paddle horizontal speed (world units per second)
    pub const PADDLE_SPEED: f32 = 720.0;
    /// Distance of the paddle from the bottom of the playfield
    pub const PADDLE_Y_OFFSET: f32 = 50.0;
    /// Paddle width scale while LargePaddle is active
    pub const LARGE_PADDLE_SCALE: f32 = 1.5;
    /// Paddle width scale while SmallPaddle is active
    pub const SMALL_PADDLE_SCALE: f32 = 0.7;

    /// Ball defaults
    pub const BALL_RADIUS: f32 = 8.0;
    pub const BALL_START_SPEED: f32 = 360.0;
    /// Maximum ball speed on the first level
    pub const BALL_MAX_SPEED: f32 = 840.0;
    /// Ball-speed-cap increase per cleared level
    pub const BALL_MAX_SPEED_STEP: f32 = 60.0;
    /// Speed multiplier applied on each paddle bounce
    pub const PADDLE_BOUNCE_SPEEDUP: f32 = 1.02;
    /// Maximum bounce angle off the paddle, measured from vertical (radians)
    pub const MAX_BOUNCE_ANGLE: f32 = 1.308_997; // 75 degrees
    /// Speed factor while SlowBall is active
    pub const SLOW_BALL_SCALE: f32 = 0.7;
    /// Ticks before a ball can hit the paddle again (prevents sticking)
    pub const PADDLE_COOLDOWN_TICKS: u32 = 8;

    /// Brick grid defaults
    pub const BRICK_WIDTH: f32 = 75.0;
    pub const BRICK_HEIGHT: f32 = 20.0;
    pub const BRICK_PADDING: f32 = 2.0;
    pub const BRICK_ROWS: u32 = 8;
    pub const BRICK_COLS: u32 = 10;
    pub const BRICK_Y_OFFSET: f32 = 60.0;
    pub const POINTS_PER_BRICK: u64 = 10;

    /// Session defaults
    pub const INITIAL_LIVES: u32 = 3;

    /// Power-up defaults
    pub const POWERUP_DROP_CHANCE: f32 = 0.25;
    pub const POWERUP_FALL_SPEED: f32 = 180.0;
    pub const POWERUP_SIZE: f32 = 20.0;
    /// Duration of timed power-up effects in seconds
    pub const POWERUP_DURATION: f32 = 10.0;

    /// Laser paddle
    pub const LASER_AMMO: u32 = 20;
    pub const LASER_COOLDOWN: f32 = 0.5;
    pub const LASER_SPEED: f32 = 480.0;
    pub const LASER_WIDTH: f32 = 3.0;
    pub const LASER_HEIGHT: f32 = 10.0;

    /// Seconds a sticky-caught ball is held before auto-release
    pub const STICKY_HOLD: f32 = 1.0;
}
