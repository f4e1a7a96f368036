//! Per-tick player input and its preprocessing
//!
//! The frontend turns device events into a `TickInput`; no raw events reach
//! the simulation.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::consts::MAX_FRAME_DT;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MoveDirection {
    Up,
    Down,
    Left,
    Right,
}

impl MoveDirection {
    pub const ALL: [MoveDirection; 4] = [
        MoveDirection::Up,
        MoveDirection::Left,
        MoveDirection::Right,
        MoveDirection::Down,
    ];

    fn index(self) -> usize {
        match self {
            MoveDirection::Up => 0,
            MoveDirection::Left => 1,
            MoveDirection::Right => 2,
            MoveDirection::Down => 3,
        }
    }
}

/// Which direction keys are currently down
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeldDirections {
    pub up: bool,
    pub down: bool,
    pub left: bool,
    pub right: bool,
}

impl HeldDirections {
    pub fn is_held(&self, dir: MoveDirection) -> bool {
        match dir {
            MoveDirection::Up => self.up,
            MoveDirection::Down => self.down,
            MoveDirection::Left => self.left,
            MoveDirection::Right => self.right,
        }
    }

    pub fn set(&mut self, dir: MoveDirection, down: bool) {
        match dir {
            MoveDirection::Up => self.up = down,
            MoveDirection::Down => self.down = down,
            MoveDirection::Left => self.left = down,
            MoveDirection::Right => self.right = down,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BelayCommand {
    Start,
    Stop,
}

/// Input for a single simulation tick
#[derive(Debug, Clone, Default)]
pub struct TickInput {
    pub held: HeldDirections,
    pub place_protection: bool,
    pub belay: Option<BelayCommand>,
    /// World-space click/tap
    pub grab_at: Option<Vec2>,
    pub pause: bool,
    pub restart: bool,
    /// Let the simulation pick moves itself
    pub autopilot: bool,
}

/// Turns held direction keys into discrete move intents.
///
/// A move fires on the press edge, then again every `interval` seconds while
/// the key stays down.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MoveDebouncer {
    timers: [f32; 4],
    was_held: [bool; 4],
}

impl MoveDebouncer {
    pub fn poll(&mut self, dt: f32, held: HeldDirections, interval: f32) -> Option<MoveDirection> {
        let mut fired = None;
        for dir in MoveDirection::ALL {
            let i = dir.index();
            self.timers[i] = (self.timers[i] - dt).max(0.0);
            if !held.is_held(dir) {
                self.was_held[i] = false;
                self.timers[i] = 0.0;
                continue;
            }
            let edge = !self.was_held[i];
            self.was_held[i] = true;
            if fired.is_none() && (edge || self.timers[i] <= 0.0) {
                self.timers[i] = interval;
                fired = Some(dir);
            }
        }
        fired
    }
}

/// Converts host animation timestamps into clamped frame deltas
#[derive(Debug, Clone, Copy, Default)]
pub struct FrameClock {
    last_ms: Option<f64>,
}

impl FrameClock {
    /// Seconds since the previous call; 0 on the first frame
    pub fn advance(&mut self, timestamp_ms: f64) -> f32 {
        let dt = match self.last_ms {
            Some(last) => ((timestamp_ms - last) / 1000.0) as f32,
            None => 0.0,
        };
        self.last_ms = Some(timestamp_ms);
        dt.clamp(0.0, MAX_FRAME_DT)
    }

    /// Forget the last timestamp (after a pause or tab switch)
    pub fn reset(&mut self) {
        self.last_ms = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debounce_edge_then_repeat() {
        let mut deb = MoveDebouncer::default();
        let up = HeldDirections {
            up: true,
            ..Default::default()
        };
        assert_eq!(deb.poll(0.016, up, 0.2), Some(MoveDirection::Up));
        // Held: nothing until the interval passes
        assert_eq!(deb.poll(0.1, up, 0.2), None);
        assert_eq!(deb.poll(0.05, up, 0.2), None);
        assert_eq!(deb.poll(0.06, up, 0.2), Some(MoveDirection::Up));
        // Release and press again fires immediately
        assert_eq!(deb.poll(0.016, HeldDirections::default(), 0.2), None);
        assert_eq!(deb.poll(0.016, up, 0.2), Some(MoveDirection::Up));
    }

    #[test]
    fn test_frame_clock_clamps() {
        let mut clock = FrameClock::default();
        assert_eq!(clock.advance(1000.0), 0.0);
        assert!((clock.advance(1016.0) - 0.016).abs() < 1e-6);
        // Tab switch
        assert_eq!(clock.advance(5000.0), MAX_FRAME_DT);
        // Clock going backwards
        assert_eq!(clock.advance(4000.0), 0.0);
        clock.reset();
        assert_eq!(clock.advance(9000.0), 0.0);
    }
}
