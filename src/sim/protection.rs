//! Placed protection pieces

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// A piece of protection clipped into a crack.
///
/// Position is fixed at placement; the only mutation is being marked used
/// once it has caught a fall.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Protection {
    pub id: u32,
    pub pos: Vec2,
    /// Crack grip it was placed on
    pub grip_id: u32,
    used: bool,
}

impl Protection {
    pub fn new(id: u32, pos: Vec2, grip_id: u32) -> Self {
        Self {
            id,
            pos,
            grip_id,
            used: false,
        }
    }

    pub fn used(&self) -> bool {
        self.used
    }

    /// Record that this piece held a fall. Returns false if already used.
    pub fn mark_used(&mut self) -> bool {
        !std::mem::replace(&mut self.used, true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mark_used_once() {
        let mut p = Protection::new(4, Vec2::new(10.0, 20.0), 9);
        assert!(!p.used());
        assert!(p.mark_used());
        assert!(!p.mark_used());
        assert!(p.used());
        assert_eq!(p.pos, Vec2::new(10.0, 20.0));
    }
}
