//! Game state and core simulation types
//!
//! All state that must advance deterministically lives here.

use glam::Vec2;
use rand::SeedableRng;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::config::{Config, ConfigError};
use super::geom::Rect;
use crate::consts::*;

/// Current phase of gameplay
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GamePhase {
    /// Title screen, waiting for start input
    Menu,
    /// Active gameplay (including serving with a ball attached to the paddle)
    Playing,
    /// Game is paused
    Paused,
    /// Run ended with no lives left
    GameOver,
    /// All levels cleared
    Victory,
}

/// Ball state - attached to paddle or free-moving
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum BallState {
    /// Ball rides the paddle at the given horizontal offset from its center
    Attached { offset: f32 },
    /// Ball is free-moving
    Free,
}

/// A ball entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ball {
    pub id: u32,
    pub pos: Vec2,
    pub vel: Vec2,
    pub radius: f32,
    pub state: BallState,
    /// Cleared when the ball leaves the bottom boundary
    pub alive: bool,
    /// Cooldown ticks before the paddle can be hit again (prevents sticking)
    #[serde(default)]
    pub paddle_cooldown: u32,
    /// Auto-release countdown for sticky-caught balls; None while serving
    #[serde(default)]
    pub release_in: Option<f32>,
}

impl Ball {
    pub fn new(id: u32, radius: f32) -> Self {
        Self {
            id,
            pos: Vec2::ZERO,
            vel: Vec2::ZERO,
            radius,
            state: BallState::Attached { offset: 0.0 },
            alive: true,
            paddle_cooldown: 0,
            release_in: None,
        }
    }

    /// Update attached ball position to follow the paddle
    pub fn update_attached(&mut self, paddle: &Paddle) {
        if let BallState::Attached { offset } = self.state {
            self.pos = Vec2::new(
                paddle.center_x() + offset,
                paddle.y - self.radius - 2.0,
            );
        }
    }

    /// Release the ball from the paddle with the given velocity
    pub fn launch(&mut self, vel: Vec2) {
        if matches!(self.state, BallState::Attached { .. }) {
            self.vel = vel;
            self.state = BallState::Free;
            self.release_in = None;
        }
    }

    /// True once the ball has fallen past the bottom boundary
    pub fn is_below(&self, screen_height: f32) -> bool {
        self.pos.y - self.radius > screen_height
    }
}

/// The player's paddle
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Paddle {
    /// Left edge; clamped to [0, screen_width - width]
    pub x: f32,
    /// Top edge, fixed for the whole session
    pub y: f32,
    pub width: f32,
    pub height: f32,
    /// Width to revert to when a size effect expires
    pub base_width: f32,
    pub speed: f32,
    /// Remaining laser shots (only meaningful while LaserPaddle is active)
    #[serde(default)]
    pub laser_ammo: u32,
    /// Seconds until the next laser shot may fire
    #[serde(default)]
    pub laser_cooldown: f32,
}

impl Paddle {
    pub fn new(config: &Config) -> Self {
        Self {
            x: (config.screen_width - config.paddle_width) / 2.0,
            y: config.screen_height - config.paddle_y_offset,
            width: config.paddle_width,
            height: config.paddle_height,
            base_width: config.paddle_width,
            speed: config.paddle_speed,
            laser_ammo: 0,
            laser_cooldown: 0.0,
        }
    }

    pub fn rect(&self) -> Rect {
        Rect::new(self.x, self.y, self.width, self.height)
    }

    #[inline]
    pub fn center_x(&self) -> f32 {
        self.x + self.width / 2.0
    }

    /// Where the ball struck, relative to the paddle center:
    /// -1.0 = far left edge, 0.0 = center, 1.0 = far right edge
    pub fn hit_offset(&self, ball_x: f32) -> f32 {
        ((ball_x - self.center_x()) / (self.width / 2.0)).clamp(-1.0, 1.0)
    }

    /// Clamp the paddle inside the playfield
    pub fn clamp_to(&mut self, screen_width: f32) {
        self.x = self.x.clamp(0.0, (screen_width - self.width).max(0.0));
    }

    /// Scale the width around the paddle center, keeping it in bounds
    pub fn set_width_scale(&mut self, scale: f32, screen_width: f32) {
        let center = self.center_x();
        self.width = self.base_width * scale;
        self.x = center - self.width / 2.0;
        self.clamp_to(screen_width);
    }

    /// Revert to the base width after a size effect expires
    pub fn reset_width(&mut self, screen_width: f32) {
        self.set_width_scale(1.0, screen_width);
    }
}

/// Brick types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BrickKind {
    #[default]
    Normal,
    MultiHit,
    /// Absorbs hits without damage; does not count toward level clear
    Unbreakable,
}

/// A brick in the level grid
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Brick {
    pub id: u32,
    pub row: u32,
    pub col: u32,
    pub rect: Rect,
    pub kind: BrickKind,
    pub hp: u32,
    pub points: u64,
}

impl Brick {
    /// Returns true if this brick must be destroyed to clear the level
    pub fn is_destructible(&self) -> bool {
        self.kind != BrickKind::Unbreakable
    }
}

/// Power-up types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PowerUpKind {
    Multiball,
    LargePaddle,
    SmallPaddle,
    LaserPaddle,
    StickyPaddle,
    ExtraLife,
    SlowBall,
}

impl PowerUpKind {
    pub const ALL: [PowerUpKind; 7] = [
        PowerUpKind::Multiball,
        PowerUpKind::LargePaddle,
        PowerUpKind::SmallPaddle,
        PowerUpKind::LaserPaddle,
        PowerUpKind::StickyPaddle,
        PowerUpKind::ExtraLife,
        PowerUpKind::SlowBall,
    ];

    /// Whether collecting this kind creates a timed effect
    pub fn is_timed(&self) -> bool {
        !matches!(self, PowerUpKind::Multiball | PowerUpKind::ExtraLife)
    }
}

/// A falling power-up drop
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PowerUp {
    pub id: u32,
    pub kind: PowerUpKind,
    pub pos: Vec2,
    pub vel: Vec2,
    pub size: f32,
}

impl PowerUp {
    pub fn rect(&self) -> Rect {
        Rect::from_center(self.pos, self.size, self.size)
    }

    /// True once the drop has fallen past the bottom boundary (missed)
    pub fn is_below(&self, screen_height: f32) -> bool {
        self.pos.y - self.size / 2.0 > screen_height
    }
}

/// A laser shot fired from the paddle
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Laser {
    pub id: u32,
    pub pos: Vec2,
    pub vel: Vec2,
    pub alive: bool,
}

impl Laser {
    pub fn rect(&self) -> Rect {
        Rect::from_center(self.pos, LASER_WIDTH, LASER_HEIGHT)
    }

    /// True once the shot has left through the top boundary
    pub fn is_above_screen(&self) -> bool {
        self.pos.y + LASER_HEIGHT / 2.0 < 0.0
    }
}

/// Remaining duration in seconds for each timed effect (0 = inactive).
///
/// Collecting a duplicate resets the timer rather than stacking; there is
/// never more than one active instance per kind.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ActiveEffects {
    pub large_paddle: f32,
    pub small_paddle: f32,
    pub laser: f32,
    pub sticky: f32,
    pub slow_ball: f32,
}

impl ActiveEffects {
    pub fn timer_mut(&mut self, kind: PowerUpKind) -> Option<&mut f32> {
        match kind {
            PowerUpKind::LargePaddle => Some(&mut self.large_paddle),
            PowerUpKind::SmallPaddle => Some(&mut self.small_paddle),
            PowerUpKind::LaserPaddle => Some(&mut self.laser),
            PowerUpKind::StickyPaddle => Some(&mut self.sticky),
            PowerUpKind::SlowBall => Some(&mut self.slow_ball),
            PowerUpKind::Multiball | PowerUpKind::ExtraLife => None,
        }
    }

    pub fn sticky_active(&self) -> bool {
        self.sticky > 0.0
    }

    pub fn laser_active(&self) -> bool {
        self.laser > 0.0
    }

    pub fn slow_active(&self) -> bool {
        self.slow_ball > 0.0
    }

    pub fn any_active(&self) -> bool {
        self.large_paddle > 0.0
            || self.small_paddle > 0.0
            || self.laser > 0.0
            || self.sticky > 0.0
            || self.slow_ball > 0.0
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

/// Events emitted by a tick, for downstream audio/score-UI consumers
#[derive(Debug, Clone, PartialEq)]
pub enum GameEvent {
    BrickDestroyed { pos: Vec2, points: u64 },
    PowerupCollected { kind: PowerUpKind },
    LifeLost,
    GameOver,
    Victory,
}

/// Complete game session state (deterministic, serializable)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameState {
    pub config: Config,
    /// Seeded RNG; all in-game randomness draws from here
    pub rng: Pcg32,
    pub phase: GamePhase,
    pub score: u64,
    pub lives: u32,
    /// Scoring multiplier; grows per destroyed brick, resets to 1 on life loss
    pub combo: u32,
    /// Current level index into `config.levels`
    pub level: u32,
    /// Simulation tick counter
    pub time_ticks: u64,
    pub paddle: Paddle,
    /// Active balls (sorted by id for determinism)
    pub balls: Vec<Ball>,
    /// Live bricks (destroyed ones are removed, never resurrected)
    pub bricks: Vec<Brick>,
    /// Falling power-up drops
    pub powerups: Vec<PowerUp>,
    /// In-flight laser shots
    pub lasers: Vec<Laser>,
    pub effects: ActiveEffects,
    next_id: u32,
}

impl GameState {
    /// Create a new session, validating the configuration first
    pub fn new(config: Config) -> Result<Self, ConfigError> {
        config.validate()?;

        let paddle = Paddle::new(&config);
        let rng = Pcg32::seed_from_u64(config.seed);
        let mut state = Self {
            rng,
            phase: GamePhase::Menu,
            score: 0,
            lives: config.initial_lives,
            combo: 1,
            level: 0,
            time_ticks: 0,
            paddle,
            balls: Vec::new(),
            bricks: Vec::new(),
            powerups: Vec::new(),
            lasers: Vec::new(),
            effects: ActiveEffects::default(),
            next_id: 1,
            config,
        };

        state.load_level(0);
        state.spawn_ball_attached();
        Ok(state)
    }

    /// Allocate a new entity ID
    pub fn next_entity_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Spawn a ball attached to the paddle center
    pub fn spawn_ball_attached(&mut self) {
        let id = self.next_entity_id();
        let mut ball = Ball::new(id, self.config.ball_radius);
        ball.update_attached(&self.paddle);
        self.balls.push(ball);
    }

    /// Build the brick grid for the given level index
    pub fn load_level(&mut self, level: u32) {
        self.level = level;
        self.bricks.clear();

        let layout = self.config.levels[level as usize].clone();
        let start_x = layout.start_x(self.config.screen_width);

        for row in 0..layout.rows {
            let spec = layout.row_spec(row).clone();
            for col in 0..layout.cols {
                let x = start_x + col as f32 * (layout.brick_width + layout.padding);
                let y = layout.y_offset + row as f32 * (layout.brick_height + layout.padding);
                let id = self.next_entity_id();
                self.bricks.push(Brick {
                    id,
                    row,
                    col,
                    rect: Rect::new(x, y, layout.brick_width, layout.brick_height),
                    kind: spec.kind,
                    hp: spec.hit_points,
                    points: spec.points,
                });
            }
        }
    }

    /// Reset the session to its initial values (restart). The RNG keeps
    /// advancing so consecutive runs differ while staying seed-reproducible.
    pub fn reset_session(&mut self) {
        self.phase = GamePhase::Menu;
        self.score = 0;
        self.lives = self.config.initial_lives;
        self.combo = 1;
        self.time_ticks = 0;
        self.paddle = Paddle::new(&self.config);
        self.balls.clear();
        self.powerups.clear();
        self.lasers.clear();
        self.effects.clear();
        self.load_level(0);
        self.spawn_ball_attached();
    }

    /// Current ball speed cap (grows with level progress)
    pub fn ball_speed_cap(&self) -> f32 {
        let cap = self.config.ball_speed_cap(self.level);
        if self.effects.slow_active() {
            cap * SLOW_BALL_SCALE
        } else {
            cap
        }
    }

    /// Number of bricks still required for a level clear
    pub fn destructible_remaining(&self) -> usize {
        self.bricks.iter().filter(|b| b.is_destructible()).count()
    }

    /// Ensure collections are sorted by ID for deterministic iteration
    pub fn normalize_order(&mut self) {
        self.balls.sort_by_key(|b| b.id);
        self.bricks.sort_by_key(|b| b.id);
        self.powerups.sort_by_key(|p| p.id);
        self.lasers.sort_by_key(|l| l.id);
    }
}
