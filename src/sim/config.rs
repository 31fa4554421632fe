//! Session configuration
//!
//! Everything tunable is supplied once at session start and validated before
//! the first tick runs. A malformed brick layout is a fatal configuration
//! error, never a mid-game recovery case.

use serde::{Deserialize, Serialize};

use super::state::{BrickKind, PowerUpKind};
use crate::consts::*;

/// Configuration validation error, surfaced before any tick runs
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("configuration must define at least one level")]
    NoLevels,
    #[error("level {level}: brick grid is empty")]
    EmptyGrid { level: usize },
    #[error("level {level}: brick grid does not fit the playfield")]
    GridOutOfBounds { level: usize },
    #[error("level {level}: layout has no destructible bricks")]
    NoDestructibleBricks { level: usize },
    #[error("level {level}, row {row}: bricks need at least 1 hit point")]
    ZeroHitPoints { level: usize, row: u32 },
    #[error("power-up drop chance {0} is outside [0, 1]")]
    InvalidDropChance(f32),
    #[error("{0} must be positive")]
    NonPositive(&'static str),
}

/// Brick properties for one grid row
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RowSpec {
    pub kind: BrickKind,
    pub hit_points: u32,
    pub points: u64,
}

/// Brick grid layout for a single level
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LevelLayout {
    pub rows: u32,
    pub cols: u32,
    pub brick_width: f32,
    pub brick_height: f32,
    pub padding: f32,
    pub y_offset: f32,
    /// Per-row brick properties, top to bottom; the last entry repeats for
    /// any remaining rows
    pub row_specs: Vec<RowSpec>,
}

impl LevelLayout {
    /// The classic 8x10 layout: two armored top rows worth double points,
    /// two more armored rows at 1.5x, plain bricks below.
    pub fn classic() -> Self {
        Self {
            rows: BRICK_ROWS,
            cols: BRICK_COLS,
            brick_width: BRICK_WIDTH,
            brick_height: BRICK_HEIGHT,
            padding: BRICK_PADDING,
            y_offset: BRICK_Y_OFFSET,
            row_specs: vec![
                RowSpec { kind: BrickKind::MultiHit, hit_points: 2, points: POINTS_PER_BRICK * 2 },
                RowSpec { kind: BrickKind::MultiHit, hit_points: 2, points: POINTS_PER_BRICK * 2 },
                RowSpec { kind: BrickKind::MultiHit, hit_points: 2, points: 15 },
                RowSpec { kind: BrickKind::MultiHit, hit_points: 2, points: 15 },
                RowSpec { kind: BrickKind::Normal, hit_points: 1, points: POINTS_PER_BRICK },
            ],
        }
    }

    /// Total grid width including inter-brick padding
    pub fn grid_width(&self) -> f32 {
        self.cols as f32 * (self.brick_width + self.padding) - self.padding
    }

    /// Left edge of the grid, centered in the playfield
    pub fn start_x(&self, screen_width: f32) -> f32 {
        (screen_width - self.grid_width()) / 2.0
    }

    /// Bottom edge of the lowest brick row
    pub fn grid_bottom(&self) -> f32 {
        self.y_offset + self.rows as f32 * (self.brick_height + self.padding) - self.padding
    }

    /// Brick properties for a given row (last spec repeats)
    pub fn row_spec(&self, row: u32) -> &RowSpec {
        let idx = (row as usize).min(self.row_specs.len().saturating_sub(1));
        &self.row_specs[idx]
    }
}

/// Complete session configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub screen_width: f32,
    pub screen_height: f32,

    pub paddle_width: f32,
    pub paddle_height: f32,
    pub paddle_speed: f32,
    pub paddle_y_offset: f32,

    pub ball_radius: f32,
    pub ball_speed: f32,
    pub ball_max_speed: f32,
    /// How much the ball-speed cap grows per cleared level
    pub ball_max_speed_step: f32,

    pub powerup_drop_chance: f32,
    pub powerup_fall_speed: f32,
    pub powerup_size: f32,
    /// Duration of timed effects in seconds
    pub effect_duration: f32,
    /// Power-up kinds eligible to drop; empty disables drops entirely
    pub enabled_powerups: Vec<PowerUpKind>,

    pub laser_ammo: u32,
    pub laser_cooldown: f32,
    pub laser_speed: f32,
    pub sticky_hold: f32,

    pub initial_lives: u32,
    pub levels: Vec<LevelLayout>,
    /// RNG seed for reproducible runs
    pub seed: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            screen_width: SCREEN_WIDTH,
            screen_height: SCREEN_HEIGHT,
            paddle_width: PADDLE_WIDTH,
            paddle_height: PADDLE_HEIGHT,
            paddle_speed: PADDLE_SPEED,
            paddle_y_offset: PADDLE_Y_OFFSET,
            ball_radius: BALL_RADIUS,
            ball_speed: BALL_START_SPEED,
            ball_max_speed: BALL_MAX_SPEED,
            ball_max_speed_step: BALL_MAX_SPEED_STEP,
            powerup_drop_chance: POWERUP_DROP_CHANCE,
            powerup_fall_speed: POWERUP_FALL_SPEED,
            powerup_size: POWERUP_SIZE,
            effect_duration: POWERUP_DURATION,
            enabled_powerups: PowerUpKind::ALL.to_vec(),
            laser_ammo: LASER_AMMO,
            laser_cooldown: LASER_COOLDOWN,
            laser_speed: LASER_SPEED,
            sticky_hold: STICKY_HOLD,
            initial_lives: INITIAL_LIVES,
            levels: vec![LevelLayout::classic()],
            seed: 0,
        }
    }
}

impl Config {
    /// Validate the configuration, rejecting anything that would break an
    /// invariant mid-game.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [
            ("screen_width", self.screen_width),
            ("screen_height", self.screen_height),
            ("paddle_width", self.paddle_width),
            ("paddle_height", self.paddle_height),
            ("paddle_speed", self.paddle_speed),
            ("ball_radius", self.ball_radius),
            ("ball_speed", self.ball_speed),
            ("ball_max_speed", self.ball_max_speed),
            ("effect_duration", self.effect_duration),
        ] {
            if !(value > 0.0) {
                return Err(ConfigError::NonPositive(name));
            }
        }
        if self.initial_lives == 0 {
            return Err(ConfigError::NonPositive("initial_lives"));
        }
        if !(0.0..=1.0).contains(&self.powerup_drop_chance) {
            return Err(ConfigError::InvalidDropChance(self.powerup_drop_chance));
        }
        if self.levels.is_empty() {
            return Err(ConfigError::NoLevels);
        }

        let paddle_top = self.screen_height - self.paddle_y_offset;
        for (level, layout) in self.levels.iter().enumerate() {
            if layout.rows == 0 || layout.cols == 0 || layout.row_specs.is_empty() {
                return Err(ConfigError::EmptyGrid { level });
            }
            if layout.brick_width <= 0.0 || layout.brick_height <= 0.0 || layout.padding < 0.0 {
                return Err(ConfigError::GridOutOfBounds { level });
            }
            if layout.start_x(self.screen_width) < 0.0
                || layout.y_offset < 0.0
                || layout.grid_bottom() >= paddle_top
            {
                return Err(ConfigError::GridOutOfBounds { level });
            }

            let mut destructible = 0u32;
            for row in 0..layout.rows {
                let spec = layout.row_spec(row);
                if spec.hit_points == 0 {
                    return Err(ConfigError::ZeroHitPoints { level, row });
                }
                if spec.kind != BrickKind::Unbreakable {
                    destructible += layout.cols;
                }
            }
            if destructible == 0 {
                return Err(ConfigError::NoDestructibleBricks { level });
            }
        }

        Ok(())
    }

    /// Ball speed cap for a given level index (grows monotonically)
    pub fn ball_speed_cap(&self, level: u32) -> f32 {
        self.ball_max_speed + level as f32 * self.ball_max_speed_step
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_rejects_empty_levels() {
        let config = Config { levels: Vec::new(), ..Config::default() };
        assert!(matches!(config.validate(), Err(ConfigError::NoLevels)));
    }

    #[test]
    fn test_rejects_out_of_bounds_grid() {
        let mut config = Config::default();
        config.levels[0].cols = 100; // far wider than the playfield
        assert!(matches!(
            config.validate(),
            Err(ConfigError::GridOutOfBounds { level: 0 })
        ));
    }

    #[test]
    fn test_rejects_grid_reaching_paddle() {
        let mut config = Config::default();
        config.levels[0].rows = 40;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::GridOutOfBounds { level: 0 })
        ));
    }

    #[test]
    fn test_rejects_all_unbreakable_layout() {
        let mut config = Config::default();
        config.levels[0].row_specs = vec![RowSpec {
            kind: BrickKind::Unbreakable,
            hit_points: 1,
            points: 0,
        }];
        assert!(matches!(
            config.validate(),
            Err(ConfigError::NoDestructibleBricks { level: 0 })
        ));
    }

    #[test]
    fn test_rejects_bad_drop_chance() {
        let config = Config { powerup_drop_chance: 1.5, ..Config::default() };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidDropChance(_))
        ));
    }

    #[test]
    fn test_speed_cap_monotonic() {
        let config = Config::default();
        assert!(config.ball_speed_cap(1) > config.ball_speed_cap(0));
        assert!(config.ball_speed_cap(5) > config.ball_speed_cap(4));
    }

    #[test]
    fn test_row_spec_repeats_last() {
        let layout = LevelLayout::classic();
        assert_eq!(layout.row_spec(4).points, POINTS_PER_BRICK);
        assert_eq!(layout.row_spec(7).points, POINTS_PER_BRICK);
        assert_eq!(layout.row_spec(99).points, POINTS_PER_BRICK);
    }
}
