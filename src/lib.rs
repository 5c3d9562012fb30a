//! Fruit Merge - a physics fruit-dropping merge game
//!
//! Core modules:
//! - `sim`: Deterministic game core (catalog, body factory, merge resolver, state machine)
//! - `platform`: Physics/UI/audio/storage collaborator traits and their headless versions
//! - `persistence`: Key-value storage backends (LocalStorage on web)
//! - `highscores`: Score calculation and the persisted high score record
//! - `settings`: Player preferences (volumes, device tier)

pub mod audio;
pub mod error;
pub mod highscores;
pub mod persistence;
pub mod platform;
pub mod settings;
pub mod sim;

pub use error::{GameError, Result};
pub use highscores::{HighscoreStore, calculate_score};
pub use settings::{DeviceTier, Settings};

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Game configuration constants
pub mod consts {
    /// Fixed simulation timestep (60 Hz, matches the physics engine tick)
    pub const SIM_DT: f32 = 1.0 / 60.0;
    /// Maximum substeps per frame to prevent spiral of death
    pub const MAX_SUBSTEPS: u32 = 4;

    /// Container dimensions (canvas pixels, y grows downward)
    pub const CONTAINER_WIDTH: f32 = 640.0;
    pub const CONTAINER_HEIGHT: f32 = 960.0;
    pub const WALL_PAD: f32 = 64.0;
    /// A fruit whose top edge rises above this line ends the run
    pub const LOSE_HEIGHT: f32 = 84.0;
    /// Height at which the aiming fruit hangs and new fruit are dropped
    pub const DROP_HEIGHT: f32 = 48.0;
    /// Gap kept between a dropped fruit and the side walls
    pub const DROP_MARGIN: f32 = 2.0;

    /// Delay before accepting input after start/restart (0.25 s)
    pub const SETTLE_TICKS: u64 = 15;
    /// Cooldown between drops (0.5 s)
    pub const DROP_COOLDOWN_TICKS: u64 = 30;
    /// Lifetime of a merge "pop" effect (0.2 s)
    pub const POP_EFFECT_TICKS: u64 = 12;

    /// Only the smallest tiers are handed to the player
    pub const SPAWNABLE_TIERS: usize = 5;
    /// Absolute tolerance when matching a physics radius to a tier
    pub const RADIUS_TOLERANCE: f32 = 0.5;

    /// Polygon sides for circular bodies
    pub const DEFAULT_SIDES: u32 = 20;
    pub const CONSTRAINED_SIDES: u32 = 12;

    /// Body material defaults
    pub const FRUIT_FRICTION: f32 = 0.006;
    pub const FRUIT_RESTITUTION: f32 = 0.2;

    /// Gravity (pixels/s²) used by the headless world
    pub const GRAVITY: f32 = 980.0;
}

/// Runtime-tunable game configuration
///
/// Every field defaults to the matching constant in [`consts`]; a JSON
/// document only needs to name the values it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    pub container_width: f32,
    pub container_height: f32,
    pub wall_pad: f32,
    pub lose_height: f32,
    pub drop_height: f32,
    pub settle_ticks: u64,
    pub drop_cooldown_ticks: u64,
    pub pop_effect_ticks: u64,
    pub spawnable_tiers: usize,
    pub friction: f32,
    pub restitution: f32,
    /// RNG seed for the fruit queue
    pub seed: u64,
}

impl Default for GameConfig {
    fn default() -> Self {
        use consts::*;
        Self {
            container_width: CONTAINER_WIDTH,
            container_height: CONTAINER_HEIGHT,
            wall_pad: WALL_PAD,
            lose_height: LOSE_HEIGHT,
            drop_height: DROP_HEIGHT,
            settle_ticks: SETTLE_TICKS,
            drop_cooldown_ticks: DROP_COOLDOWN_TICKS,
            pop_effect_ticks: POP_EFFECT_TICKS,
            spawnable_tiers: SPAWNABLE_TIERS,
            friction: FRUIT_FRICTION,
            restitution: FRUIT_RESTITUTION,
            seed: 0,
        }
    }
}

impl GameConfig {
    /// Parse a (partial) JSON configuration
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Horizontal range a fruit of `radius` may be dropped in without touching a wall
    pub fn drop_range(&self, radius: f32) -> (f32, f32) {
        let min = self.wall_pad + radius + consts::DROP_MARGIN;
        let max = self.container_width - self.wall_pad - radius - consts::DROP_MARGIN;
        if min > max {
            let mid = self.container_width / 2.0;
            (mid, mid)
        } else {
            (min, max)
        }
    }
}

/// Convert polar (r, theta) to cartesian (x, y)
#[inline]
pub fn polar_to_cartesian(r: f32, theta: f32) -> Vec2 {
    Vec2::new(r * theta.cos(), r * theta.sin())
}

/// Arithmetic midpoint of two positions
#[inline]
pub fn midpoint(a: Vec2, b: Vec2) -> Vec2 {
    (a + b) * 0.5
}
