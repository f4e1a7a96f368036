//! Vertical camera
//!
//! The view only ever scrolls up: `top_y` is monotonic non-increasing.

use serde::{Deserialize, Serialize};

use crate::consts::CAMERA_FOLLOW_FACTOR;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Camera {
    /// World Y of the top edge of the view
    pub top_y: f32,
    pub view_height: f32,
}

impl Camera {
    pub fn new(view_height: f32) -> Self {
        Self {
            top_y: 0.0,
            view_height,
        }
    }

    pub fn bottom_y(&self) -> f32 {
        self.top_y + self.view_height
    }

    /// Scroll up when the climber gets within the follow band of the top edge
    pub fn follow(&mut self, climber_y: f32) {
        let band = self.view_height * CAMERA_FOLLOW_FACTOR;
        self.top_y = self.top_y.min(climber_y - band);
    }

    /// Screen Y (pixels from the top of the view) to world Y
    pub fn to_world(&self, screen_y: f32) -> f32 {
        screen_y + self.top_y
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_follow_is_monotonic() {
        let mut cam = Camera::new(1200.0);
        cam.follow(1050.0);
        assert_eq!(cam.top_y, 0.0);

        cam.follow(400.0);
        assert!((cam.top_y - (400.0 - 480.0)).abs() < 1e-4);
        let high = cam.top_y;

        // Falling back down never scrolls the view down
        cam.follow(1000.0);
        assert_eq!(cam.top_y, high);
        assert!((cam.bottom_y() - (high + 1200.0)).abs() < 1e-4);
    }

    #[test]
    fn test_to_world_offsets_by_view_top() {
        let mut cam = Camera::new(1200.0);
        assert_eq!(cam.to_world(300.0), 300.0);
        cam.follow(-500.0);
        assert!((cam.to_world(0.0) - cam.top_y).abs() < 1e-4);
        assert!((cam.to_world(cam.view_height) - cam.bottom_y()).abs() < 1e-3);
    }
}
