//! Rope anchor chain and fall/catch geometry
//!
//! The chain is the permanent start anchor at the base of the route followed
//! by every placed protection, in placement order. Falls are caught by the
//! highest anchor still below the point the climber fell from.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::protection::Protection;
use crate::tuning::Tuning;

/// What a chain node is anchored to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RopeNodeKind {
    /// Belay at the foot of the route
    Start,
    Protection { protection_id: u32, grip_id: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RopeNode {
    pub pos: Vec2,
    pub kind: RopeNodeKind,
}

impl RopeNode {
    pub fn is_start(&self) -> bool {
        self.kind == RopeNodeKind::Start
    }

    pub fn grip_id(&self) -> Option<u32> {
        match self.kind {
            RopeNodeKind::Start => None,
            RopeNodeKind::Protection { grip_id, .. } => Some(grip_id),
        }
    }

    pub fn protection_id(&self) -> Option<u32> {
        match self.kind {
            RopeNodeKind::Start => None,
            RopeNodeKind::Protection { protection_id, .. } => Some(protection_id),
        }
    }
}

/// Why a fall cannot be held
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TerminalReason {
    /// More rope out than a catch can absorb
    TooLong,
    /// Only the ground anchor is below; the climber decks
    ReachesGround,
}

/// Outcome of a fall, decided when it starts
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum FallCatch {
    Caught {
        /// Index into the chain
        anchor: usize,
        anchor_pos: Vec2,
        /// Vertical distance from fall start down to the anchor
        distance: f32,
        /// Lowest point of the arrested fall
        target_y: f32,
        /// Where the swing settles horizontally
        swing_x: f32,
    },
    Terminal {
        anchor: usize,
        distance: f32,
        reason: TerminalReason,
    },
}

impl FallCatch {
    pub fn anchor(&self) -> usize {
        match *self {
            FallCatch::Caught { anchor, .. } | FallCatch::Terminal { anchor, .. } => anchor,
        }
    }

    pub fn distance(&self) -> f32 {
        match *self {
            FallCatch::Caught { distance, .. } | FallCatch::Terminal { distance, .. } => distance,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, FallCatch::Terminal { .. })
    }

    /// How far the climber will actually drop (for sound selection)
    pub fn drop_length(&self, fall_start_y: f32) -> f32 {
        match *self {
            FallCatch::Caught { target_y, .. } => target_y - fall_start_y,
            FallCatch::Terminal { distance, .. } => distance,
        }
    }
}

/// Result of trying to move up the rope
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BelayStep {
    Allowed,
    /// Would pass within a head of the last protection
    AtAnchor,
    /// Climber is already above the last protection; the rope gives no support
    Unanchored,
}

/// Owner of the anchor chain
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RopeManager {
    nodes: Vec<RopeNode>,
    /// Node indices drawn as the rope, in order
    path: Vec<usize>,
    ground_y: f32,
}

impl RopeManager {
    /// Chain holding only the start anchor; its Y is also the ground line
    pub fn new(start: Vec2) -> Self {
        Self {
            nodes: vec![RopeNode {
                pos: start,
                kind: RopeNodeKind::Start,
            }],
            path: vec![0],
            ground_y: start.y,
        }
    }

    /// Back to just the start anchor
    pub fn reset(&mut self) {
        self.nodes.truncate(1);
        self.path = vec![0];
    }

    pub fn nodes(&self) -> &[RopeNode] {
        &self.nodes
    }

    pub fn node(&self, index: usize) -> Option<&RopeNode> {
        self.nodes.get(index)
    }

    pub fn start(&self) -> &RopeNode {
        &self.nodes[0]
    }

    pub fn ground_y(&self) -> f32 {
        self.ground_y
    }

    /// Most recently placed anchor (the start anchor if none)
    pub fn last_anchor(&self) -> &RopeNode {
        self.nodes.last().unwrap_or(&self.nodes[0])
    }

    pub fn protection_count(&self) -> usize {
        self.nodes.len() - 1
    }

    /// Clip a newly placed protection into the chain
    pub fn add_protection(&mut self, protection: &Protection) {
        self.nodes.push(RopeNode {
            pos: protection.pos,
            kind: RopeNodeKind::Protection {
                protection_id: protection.id,
                grip_id: protection.grip_id,
            },
        });
        self.path.push(self.nodes.len() - 1);
    }

    /// Highest node strictly below `fall_start_y`, or the start anchor
    pub fn effective_anchor(&self, fall_start_y: f32) -> usize {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(_, n)| n.pos.y > fall_start_y)
            .min_by(|(_, a), (_, b)| a.pos.y.total_cmp(&b.pos.y))
            .map(|(i, _)| i)
            .unwrap_or(0)
    }

    /// Decide how a fall starting at `fall_start` ends. Pure: no chain mutation.
    pub fn compute_catch(&self, fall_start: Vec2, tuning: &Tuning) -> FallCatch {
        let anchor = self.effective_anchor(fall_start.y);
        let node = self.nodes[anchor];
        let distance = (node.pos.y - fall_start.y).max(0.0);

        if distance > tuning.max_catchable_fall_distance {
            return FallCatch::Terminal {
                anchor,
                distance,
                reason: TerminalReason::TooLong,
            };
        }

        let target_y = node.pos.y + distance * tuning.rope_slack_factor;
        if node.is_start() && target_y >= self.ground_y {
            return FallCatch::Terminal {
                anchor,
                distance,
                reason: TerminalReason::ReachesGround,
            };
        }

        let swing_x = node.pos.x + (fall_start.x - node.pos.x) / tuning.rope_slack_factor;
        FallCatch::Caught {
            anchor,
            anchor_pos: node.pos,
            distance,
            // Anchors low on the route can't drop the climber through the ground
            target_y: target_y.min(self.ground_y),
            swing_x,
        }
    }

    /// Check a belay move from `current_y` up to `new_y`
    pub fn belay_step(&self, current_y: f32, new_y: f32, head_radius: f32) -> BelayStep {
        let last = self.last_anchor();
        if last.is_start() {
            return BelayStep::Allowed;
        }
        if current_y < last.pos.y {
            BelayStep::Unanchored
        } else if new_y < last.pos.y + head_radius {
            BelayStep::AtAnchor
        } else {
            BelayStep::Allowed
        }
    }

    /// After a catch, draw the rope straight from the catching anchor to the
    /// climber. Visual only; the chain keeps every node.
    pub fn simplify_after_catch(&mut self, anchor: usize) {
        if let Some(cut) = self.path.iter().position(|&i| i == anchor) {
            self.path.truncate(cut + 1);
        }
    }

    /// Rope polyline from the start anchor to the climber
    pub fn path(&self, climber: Vec2) -> Vec<Vec2> {
        self.path
            .iter()
            .filter_map(|&i| self.nodes.get(i).map(|n| n.pos))
            .chain(std::iter::once(climber))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::ROUTE_START;
    use proptest::prelude::*;

    fn rope_with(protections: &[(f32, f32)]) -> RopeManager {
        let mut rope = RopeManager::new(ROUTE_START);
        for (i, &(x, y)) in protections.iter().enumerate() {
            rope.add_protection(&Protection::new(i as u32 + 1, Vec2::new(x, y), 100 + i as u32));
        }
        rope
    }

    #[test]
    fn test_catch_by_protection_200_below() {
        let tuning = Tuning::default();
        let rope = rope_with(&[(420.0, 800.0)]);
        let catch = rope.compute_catch(Vec2::new(400.0, 600.0), &tuning);
        match catch {
            FallCatch::Caught {
                anchor,
                distance,
                target_y,
                swing_x,
                ..
            } => {
                assert_eq!(anchor, 1);
                assert!((distance - 200.0).abs() < 1e-4);
                assert!((target_y - (800.0 + 200.0 * tuning.rope_slack_factor)).abs() < 1e-3);
                assert!((swing_x - (420.0 - 20.0 / tuning.rope_slack_factor)).abs() < 1e-3);
            }
            other => panic!("expected catch, got {other:?}"),
        }
    }

    #[test]
    fn test_no_protection_is_terminal() {
        let tuning = Tuning::default();
        let rope = RopeManager::new(ROUTE_START);
        let catch = rope.compute_catch(Vec2::new(400.0, 1050.0), &tuning);
        assert_eq!(
            catch,
            FallCatch::Terminal {
                anchor: 0,
                distance: ROUTE_START.y - 1050.0,
                reason: TerminalReason::ReachesGround
            }
        );

        let far = rope.compute_catch(Vec2::new(400.0, 200.0), &tuning);
        assert!(matches!(
            far,
            FallCatch::Terminal {
                reason: TerminalReason::TooLong,
                ..
            }
        ));
    }

    #[test]
    fn test_too_long_above_protection() {
        let tuning = Tuning::default();
        let rope = rope_with(&[(400.0, 900.0)]);
        let catch = rope.compute_catch(Vec2::new(400.0, 500.0), &tuning);
        assert!(matches!(
            catch,
            FallCatch::Terminal {
                anchor: 1,
                reason: TerminalReason::TooLong,
                ..
            }
        ));
    }

    #[test]
    fn test_effective_anchor_is_highest_below() {
        // Placement order is not height order
        let rope = rope_with(&[(400.0, 700.0), (400.0, 900.0), (400.0, 500.0)]);
        assert_eq!(rope.effective_anchor(600.0), 1);
        assert_eq!(rope.effective_anchor(450.0), 3);
        assert_eq!(rope.effective_anchor(800.0), 2);
        // Nothing below but the ground
        assert_eq!(rope.effective_anchor(1000.0), 0);
    }

    #[test]
    fn test_belay_limits() {
        let tuning = Tuning::default();
        let start_only = RopeManager::new(ROUTE_START);
        assert_eq!(start_only.belay_step(900.0, 100.0, tuning.head_radius), BelayStep::Allowed);

        let rope = rope_with(&[(400.0, 700.0)]);
        assert_eq!(rope.belay_step(800.0, 790.0, 10.0), BelayStep::Allowed);
        assert_eq!(rope.belay_step(712.0, 709.0, 10.0), BelayStep::AtAnchor);
        assert_eq!(rope.belay_step(650.0, 640.0, 10.0), BelayStep::Unanchored);
    }

    #[test]
    fn test_path_simplification_keeps_chain() {
        let mut rope = rope_with(&[(400.0, 900.0), (380.0, 800.0), (420.0, 700.0)]);
        let climber = Vec2::new(410.0, 950.0);
        assert_eq!(rope.path(climber).len(), 5);
        rope.simplify_after_catch(1);
        let path = rope.path(climber);
        assert_eq!(path, vec![ROUTE_START, Vec2::new(400.0, 900.0), climber]);
        assert_eq!(rope.nodes().len(), 4);

        rope.add_protection(&Protection::new(9, Vec2::new(400.0, 880.0), 50));
        assert_eq!(rope.path(climber).len(), 4);

        rope.reset();
        assert_eq!(rope.nodes().len(), 1);
        assert_eq!(rope.path(climber).len(), 2);
    }

    proptest! {
        #[test]
        fn test_catch_is_pure(
            ys in prop::collection::vec(100.0f32..1150.0, 0..6),
            fall_y in 0.0f32..1100.0,
            fall_x in 0.0f32..800.0,
        ) {
            let tuning = Tuning::default();
            let protections: Vec<(f32, f32)> = ys.iter().map(|&y| (400.0, y)).collect();
            let rope = rope_with(&protections);
            let start = Vec2::new(fall_x, fall_y);
            let a = rope.compute_catch(start, &tuning);
            let b = rope.compute_catch(start, &tuning);
            prop_assert_eq!(a, b);

            if let FallCatch::Caught { anchor, target_y, .. } = a {
                let node = rope.nodes()[anchor];
                prop_assert!(node.pos.y > fall_y);
                prop_assert!(target_y >= node.pos.y);
                prop_assert!(a.distance() <= tuning.max_catchable_fall_distance);
            }
        }
    }
}
