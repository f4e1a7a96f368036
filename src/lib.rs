//! Vertical Odyssey - an endless vertical climbing game
//!
//! Core modules:
//! - `sim`: Deterministic simulation (grips, climber, rope, route generation)
//! - `tuning`: Data-driven game balance
//! - `render`: Snapshot handed to the drawing frontend each frame
//! - `audio`: Sound effect vocabulary and the Web Audio backend
//! - `highscores` / `settings`: Small persisted values (via `persistence`)

pub mod audio;
pub mod highscores;
pub mod persistence;
pub mod render;
pub mod settings;
pub mod sim;
pub mod tuning;

pub use highscores::HighScore;
pub use settings::Settings;
pub use tuning::Tuning;

use rand::Rng;
use serde::{Deserialize, Serialize};

/// World geometry and frame timing
pub mod consts {
    use glam::Vec2;

    /// Playable world width (pixels)
    pub const WORLD_WIDTH: f32 = 800.0;
    /// Height of one camera view (pixels)
    pub const WORLD_HEIGHT: f32 = 1200.0;

    /// Base of the route: the permanent rope anchor and the ground line
    pub const ROUTE_START: Vec2 = Vec2::new(WORLD_WIDTH / 2.0, WORLD_HEIGHT - 30.0);
    /// Where the climber hangs when a session begins
    pub const CLIMBER_START: Vec2 = Vec2::new(WORLD_WIDTH / 2.0, WORLD_HEIGHT - 150.0);

    /// Largest delta accepted for a single frame (seconds)
    pub const MAX_FRAME_DT: f32 = 0.1;

    /// World pixels climbed per score point
    pub const SCORE_UNIT: f32 = 10.0;

    /// Camera scrolls once the climber is this close (fraction of view) to the top
    pub const CAMERA_FOLLOW_FACTOR: f32 = 0.4;
}

/// An opaque 8-bit RGB colour
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// CSS colour string for canvas fill styles
    pub fn to_css(self) -> String {
        format!("rgb({}, {}, {})", self.r, self.g, self.b)
    }
}

/// Uniform float in [min, max). Returns `min` for an empty range.
#[inline]
pub fn random_float(rng: &mut impl Rng, min: f32, max: f32) -> f32 {
    if max <= min {
        return min;
    }
    rng.random_range(min..max)
}

/// Uniform integer in [min, max] (both inclusive)
#[inline]
pub fn random_int(rng: &mut impl Rng, min: i32, max: i32) -> i32 {
    if max <= min {
        return min;
    }
    rng.random_range(min..=max)
}

/// True with the given probability (clamped to [0, 1])
#[inline]
pub fn random_chance(rng: &mut impl Rng, probability: f32) -> bool {
    rng.random::<f32>() < probability.clamp(0.0, 1.0)
}

/// Uniform angle in [0, 2π)
#[inline]
pub fn random_angle(rng: &mut impl Rng) -> f32 {
    rng.random::<f32>() * std::f32::consts::TAU
}

/// Linear RGB interpolation; `factor` is clamped to [0, 1]
pub fn lerp_color(from: Rgb, to: Rgb, factor: f32) -> Rgb {
    let t = factor.clamp(0.0, 1.0);
    let channel = |a: u8, b: u8| (a as f32 + (b as f32 - a as f32) * t).round() as u8;
    Rgb::new(
        channel(from.r, to.r),
        channel(from.g, to.g),
        channel(from.b, to.b),
    )
}
