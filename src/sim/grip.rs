//! Handholds and their timed lifecycle
//!
//! A grip is revealed as the climber approaches, wears out while held, fails,
//! and (for cracks) slowly comes back. Every state change goes through
//! `GripLifecycle::transition`, which only accepts edges of the lifecycle graph.

use glam::Vec2;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::tuning::Tuning;
use crate::{Rgb, lerp_color, random_angle, random_float};

// Display colours
pub const GRIP_COLOR_HIDDEN: Rgb = Rgb::new(100, 100, 100);
pub const GRIP_COLOR_VISIBLE: Rgb = Rgb::new(174, 173, 170);
pub const GRIP_COLOR_ACTIVE: Rgb = Rgb::new(192, 184, 124);
pub const GRIP_COLOR_DEGRADING_START: Rgb = Rgb::new(210, 200, 140);
pub const GRIP_COLOR_DEGRADING_END: Rgb = Rgb::new(113, 62, 62);
pub const GRIP_COLOR_FAILED: Rgb = Rgb::new(64, 64, 64);
pub const GRIP_COLOR_WIN: Rgb = Rgb::new(255, 215, 0);

/// Alpha used for hidden grips (a faint hint in the rock)
pub const HIDDEN_ALPHA: f32 = 0.1;

/// Grip shape family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum GripKind {
    #[default]
    Normal,
    /// Jammable fissure: a rest, and the only place protection can go
    Crack,
}

impl GripKind {
    /// Size range for this kind
    pub fn size_range(self, tuning: &Tuning) -> (f32, f32) {
        match self {
            GripKind::Normal => (tuning.normal_size_min, tuning.normal_size_max),
            GripKind::Crack => (tuning.crack_size_min, tuning.crack_size_max),
        }
    }
}

/// Lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum GripState {
    #[default]
    Hidden,
    Revealing,
    Visible,
    Active,
    Degrading,
    Failed,
    Revivable,
    Reviving,
}

impl GripState {
    /// Whether `self -> next` is an edge of the lifecycle graph
    pub fn can_transition_to(self, next: GripState) -> bool {
        use GripState::*;
        matches!(
            (self, next),
            (Hidden, Revealing)
                | (Revealing, Visible)
                | (Revealing, Hidden)
                | (Visible, Hidden)
                | (Revealing | Visible | Active | Revivable | Reviving, Active)
                | (Active, Visible)
                | (Active, Degrading)
                | (Degrading, Failed)
                | (Failed, Revivable)
                | (Revivable, Reviving)
                | (Reviving, Visible)
        )
    }

    /// States a grab is refused in
    pub fn rejects_grab(self) -> bool {
        matches!(
            self,
            GripState::Hidden | GripState::Degrading | GripState::Failed
        )
    }

    /// States where the reachable flag is recomputed from distance
    fn tracks_reach(self) -> bool {
        matches!(
            self,
            GripState::Visible | GripState::Degrading | GripState::Failed | GripState::Revivable
        )
    }
}

/// State plus timing; the only place grip state is mutated
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GripLifecycle {
    state: GripState,
    time_in_state: f32,
    /// Simulation time the current state was entered
    entered_at: f32,
}

impl GripLifecycle {
    pub fn new(initial: GripState, now: f32) -> Self {
        Self {
            state: initial,
            time_in_state: 0.0,
            entered_at: now,
        }
    }

    pub fn state(&self) -> GripState {
        self.state
    }

    pub fn time_in_state(&self) -> f32 {
        self.time_in_state
    }

    pub fn entered_at(&self) -> f32 {
        self.entered_at
    }

    fn advance(&mut self, dt: f32) {
        self.time_in_state += dt;
    }

    /// Move to `next`; false (and no change) if the edge does not exist
    pub fn transition(&mut self, next: GripState, now: f32) -> bool {
        if !self.state.can_transition_to(next) {
            log::debug!("Refused grip transition {:?} -> {:?}", self.state, next);
            return false;
        }
        self.state = next;
        self.time_in_state = 0.0;
        self.entered_at = now;
        true
    }
}

/// Timed transitions reported by `Grip::update`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GripEvent {
    StartedDegrading,
    Failed,
    BecameRevivable,
    Revived,
}

/// A single handhold
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Grip {
    pub id: u32,
    pub pos: Vec2,
    /// Diameter for normal grips, length for cracks
    pub size: f32,
    pub kind: GripKind,
    /// Visual orientation (radians)
    pub angle: f32,
    lifecycle: GripLifecycle,
    /// How long this grip can be held before it starts to degrade
    pub active_duration: f32,
    pub reachable: bool,
    /// Held by the climber
    pub held: bool,
    /// Created by the initial seeding pass; never hidden again by proximity
    pub seeded: bool,
    /// Protection already placed here
    pub protected: bool,
    pub is_win: bool,
    pub is_pre_last: bool,
}

impl Grip {
    /// New hidden grip with explicit geometry
    pub fn new(id: u32, pos: Vec2, kind: GripKind, size: f32, active_duration: f32) -> Self {
        Self {
            id,
            pos,
            size,
            kind,
            angle: 0.0,
            lifecycle: GripLifecycle::new(GripState::Hidden, 0.0),
            active_duration,
            reachable: false,
            held: false,
            seeded: false,
            protected: false,
            is_win: false,
            is_pre_last: false,
        }
    }

    /// New hidden grip with randomized size, orientation and active duration
    pub fn random(id: u32, pos: Vec2, kind: GripKind, rng: &mut impl Rng, tuning: &Tuning) -> Self {
        let (min, max) = kind.size_range(tuning);
        let size = random_float(rng, min, max);
        Self::random_sized(id, pos, kind, size, rng, tuning)
    }

    /// Like `random` but with a caller-chosen size
    pub fn random_sized(
        id: u32,
        pos: Vec2,
        kind: GripKind,
        size: f32,
        rng: &mut impl Rng,
        tuning: &Tuning,
    ) -> Self {
        let jitter = random_float(rng, -tuning.grip_active_jitter, tuning.grip_active_jitter);
        let mut grip = Self::new(id, pos, kind, size, tuning.grip_active_duration + jitter);
        grip.angle = random_angle(rng);
        grip
    }

    /// Start in a given state instead of hidden (route seeding)
    pub fn with_initial_state(mut self, state: GripState, now: f32) -> Self {
        self.lifecycle = GripLifecycle::new(state, now);
        self
    }

    pub fn state(&self) -> GripState {
        self.lifecycle.state()
    }

    pub fn lifecycle(&self) -> &GripLifecycle {
        &self.lifecycle
    }

    pub fn time_in_state(&self) -> f32 {
        self.lifecycle.time_in_state()
    }

    pub fn is_crack(&self) -> bool {
        self.kind == GripKind::Crack
    }

    pub fn can_grab(&self) -> bool {
        !self.state().rejects_grab()
    }

    /// Resting spot: any crack, or a normal grip of generous size
    pub fn is_rest(&self, tuning: &Tuning) -> bool {
        self.is_crack() || self.size >= tuning.rest_grip_min_size
    }

    /// 0 at the rest threshold, 1 at the smallest normal size
    pub fn smallness(&self, tuning: &Tuning) -> f32 {
        let span = tuning.rest_grip_min_size - tuning.normal_size_min;
        if span <= 0.0 {
            return 0.0;
        }
        ((tuning.rest_grip_min_size - self.size) / span).clamp(0.0, 1.0)
    }

    /// Grips that can take a new piece of protection
    pub fn offers_protection(&self) -> bool {
        self.is_crack() && !self.protected
    }

    /// Take hold. Returns false (no change) for hidden, degrading or failed grips.
    pub fn grab(&mut self, now: f32) -> bool {
        if !self.can_grab() {
            return false;
        }
        if self.state() == GripState::Active {
            // Re-grab restarts the wear timer
            self.lifecycle = GripLifecycle::new(GripState::Active, now);
        } else if !self.lifecycle.transition(GripState::Active, now) {
            return false;
        }
        self.held = true;
        self.reachable = true;
        true
    }

    /// Let go. Only an active grip changes: normal grips settle back to
    /// visible, cracks stay active and keep wearing.
    pub fn release(&mut self, now: f32) {
        self.held = false;
        if self.state() == GripState::Active && self.kind == GripKind::Normal {
            self.lifecycle.transition(GripState::Visible, now);
        }
    }

    /// Start the fade-in (hidden only)
    pub fn reveal(&mut self, now: f32) -> bool {
        self.state() == GripState::Hidden && self.lifecycle.transition(GripState::Revealing, now)
    }

    /// Fade back out of view (revealing or visible only)
    pub fn hide(&mut self, now: f32) -> bool {
        matches!(self.state(), GripState::Revealing | GripState::Visible)
            && self.lifecycle.transition(GripState::Hidden, now)
    }

    /// Advance timers and apply due transitions.
    ///
    /// `climber` is `None` when no climber position is known; the grip is then
    /// treated as out of reach.
    pub fn update(
        &mut self,
        dt: f32,
        now: f32,
        climber: Option<Vec2>,
        tuning: &Tuning,
    ) -> Option<GripEvent> {
        let state = self.state();
        self.reachable = if state == GripState::Active {
            true
        } else if state.tracks_reach() {
            climber.is_some_and(|c| c.distance(self.pos) <= tuning.reach)
        } else {
            false
        };

        self.lifecycle.advance(dt);
        let t = self.time_in_state();

        match state {
            GripState::Revealing if t >= tuning.grip_reveal_duration => {
                self.lifecycle.transition(GripState::Visible, now);
                None
            }
            GripState::Active if t >= self.active_duration => {
                self.lifecycle.transition(GripState::Degrading, now);
                Some(GripEvent::StartedDegrading)
            }
            GripState::Degrading if t >= tuning.grip_degrade_duration => {
                self.lifecycle.transition(GripState::Failed, now);
                self.held = false;
                Some(GripEvent::Failed)
            }
            GripState::Failed if self.is_crack() && tuning.revive_failed_cracks => {
                self.lifecycle.transition(GripState::Revivable, now);
                Some(GripEvent::BecameRevivable)
            }
            GripState::Revivable if t >= tuning.grip_revivable_blink_duration => {
                self.lifecycle.transition(GripState::Reviving, now);
                None
            }
            GripState::Reviving if t >= tuning.grip_revival_duration => {
                self.lifecycle.transition(GripState::Visible, now);
                // A revived crack can take protection again
                self.protected = false;
                Some(GripEvent::Revived)
            }
            _ => None,
        }
    }

    /// Blink phase derived from time in state
    pub fn blink_on(&self, interval: f32) -> bool {
        if interval <= 0.0 {
            return true;
        }
        ((self.time_in_state() / interval) as u32) % 2 == 0
    }

    /// Colour and alpha for drawing
    pub fn display_color(&self, tuning: &Tuning, blink: bool) -> (Rgb, f32) {
        let blink_on = !blink || self.blink_on(tuning.grip_blink_interval);
        if self.is_win && self.state() != GripState::Hidden {
            return (GRIP_COLOR_WIN, self.reveal_alpha(tuning));
        }
        match self.state() {
            GripState::Hidden => (GRIP_COLOR_HIDDEN, HIDDEN_ALPHA),
            GripState::Revealing => (GRIP_COLOR_VISIBLE, self.reveal_alpha(tuning)),
            GripState::Visible => (GRIP_COLOR_VISIBLE, 1.0),
            GripState::Active => (GRIP_COLOR_ACTIVE, 1.0),
            GripState::Degrading => {
                let factor = self.time_in_state() / tuning.grip_degrade_duration.max(f32::EPSILON);
                (
                    lerp_color(GRIP_COLOR_DEGRADING_START, GRIP_COLOR_DEGRADING_END, factor),
                    1.0,
                )
            }
            GripState::Failed => (GRIP_COLOR_FAILED, 1.0),
            GripState::Revivable => {
                let color = if blink_on {
                    GRIP_COLOR_ACTIVE
                } else {
                    GRIP_COLOR_VISIBLE
                };
                (color, 1.0)
            }
            GripState::Reviving => {
                if blink_on {
                    (GRIP_COLOR_VISIBLE, 1.0)
                } else {
                    (GRIP_COLOR_HIDDEN, HIDDEN_ALPHA)
                }
            }
        }
    }

    fn reveal_alpha(&self, tuning: &Tuning) -> f32 {
        if self.state() == GripState::Revealing {
            (self.time_in_state() / tuning.grip_reveal_duration.max(f32::EPSILON)).clamp(0.0, 1.0)
        } else {
            1.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn grip(kind: GripKind) -> Grip {
        Grip::new(1, Vec2::new(100.0, 100.0), kind, 12.0, 10.0)
    }

    /// Run updates until the state changes or `max` seconds pass
    fn run_until_change(g: &mut Grip, tuning: &Tuning, max: f32) -> Option<GripEvent> {
        let dt = 1.0 / 60.0;
        let start = g.state();
        let mut now = 0.0;
        let mut last = None;
        while now < max && g.state() == start {
            now += dt;
            last = g.update(dt, now, Some(g.pos), tuning);
        }
        last
    }

    #[test]
    fn test_grab_rejected_states() {
        let tuning = Tuning::default();
        let mut g = grip(GripKind::Normal);
        assert!(!g.grab(0.0), "hidden grips cannot be grabbed");
        assert_eq!(g.state(), GripState::Hidden);

        let mut g = grip(GripKind::Normal).with_initial_state(GripState::Visible, 0.0);
        assert!(g.grab(0.0));
        run_until_change(&mut g, &tuning, 20.0);
        assert_eq!(g.state(), GripState::Degrading);
        g.release(1.0);
        assert!(!g.grab(1.0), "degrading grips cannot be grabbed");
    }

    #[test]
    fn test_reveal_then_visible() {
        let tuning = Tuning::default();
        let mut g = grip(GripKind::Normal);
        assert!(g.reveal(0.0));
        assert_eq!(g.state(), GripState::Revealing);
        run_until_change(&mut g, &tuning, 2.0);
        assert_eq!(g.state(), GripState::Visible);
    }

    #[test]
    fn test_active_degrades_then_fails() {
        let tuning = Tuning::default();
        let mut g = grip(GripKind::Normal).with_initial_state(GripState::Visible, 0.0);
        g.grab(0.0);
        assert_eq!(
            run_until_change(&mut g, &tuning, 20.0),
            Some(GripEvent::StartedDegrading)
        );
        assert!(g.held);
        assert_eq!(
            run_until_change(&mut g, &tuning, 20.0),
            Some(GripEvent::Failed)
        );
        assert_eq!(g.state(), GripState::Failed);
        assert!(!g.held);

        // Normal grips stay failed
        run_until_change(&mut g, &tuning, 10.0);
        assert_eq!(g.state(), GripState::Failed);
    }

    #[test]
    fn test_failed_crack_revives() {
        let tuning = Tuning::default();
        let mut g = grip(GripKind::Crack).with_initial_state(GripState::Visible, 0.0);
        g.grab(0.0);
        g.protected = true;
        run_until_change(&mut g, &tuning, 20.0);
        run_until_change(&mut g, &tuning, 20.0);
        assert_eq!(g.state(), GripState::Failed);
        assert_eq!(
            run_until_change(&mut g, &tuning, 1.0),
            Some(GripEvent::BecameRevivable)
        );
        run_until_change(&mut g, &tuning, 5.0);
        assert_eq!(g.state(), GripState::Reviving);
        assert_eq!(
            run_until_change(&mut g, &tuning, 5.0),
            Some(GripEvent::Revived)
        );
        assert_eq!(g.state(), GripState::Visible);
        assert!(!g.protected);
    }

    #[test]
    fn test_release_normal_vs_crack() {
        let mut normal = grip(GripKind::Normal).with_initial_state(GripState::Visible, 0.0);
        normal.grab(0.0);
        normal.release(1.0);
        assert_eq!(normal.state(), GripState::Visible);
        assert!(!normal.held);

        let mut crack = grip(GripKind::Crack).with_initial_state(GripState::Visible, 0.0);
        crack.grab(0.0);
        crack.release(1.0);
        assert_eq!(crack.state(), GripState::Active);
        assert!(!crack.held);
    }

    #[test]
    fn test_release_inactive_is_noop() {
        let tuning = Tuning::default();
        let mut g = grip(GripKind::Normal).with_initial_state(GripState::Visible, 0.0);
        g.update(0.3, 0.3, None, &tuning);
        let before = *g.lifecycle();
        g.release(0.5);
        assert_eq!(*g.lifecycle(), before);
    }

    #[test]
    fn test_reachability_tracking() {
        let tuning = Tuning::default();
        let mut g = grip(GripKind::Normal).with_initial_state(GripState::Visible, 0.0);
        g.update(0.01, 0.01, Some(g.pos + Vec2::new(tuning.reach, 0.0)), &tuning);
        assert!(g.reachable);
        g.update(0.01, 0.02, Some(g.pos + Vec2::new(tuning.reach + 1.0, 0.0)), &tuning);
        assert!(!g.reachable);
        g.update(0.01, 0.03, None, &tuning);
        assert!(!g.reachable);
    }

    #[test]
    fn test_rest_and_smallness() {
        let tuning = Tuning::default();
        let mut g = grip(GripKind::Normal);
        g.size = 17.0;
        assert!(g.is_rest(&tuning));
        assert_eq!(g.smallness(&tuning), 0.0);
        g.size = tuning.normal_size_min;
        assert!(!g.is_rest(&tuning));
        assert!((g.smallness(&tuning) - 1.0).abs() < 1e-6);
        assert!(grip(GripKind::Crack).is_rest(&tuning));
    }

    #[test]
    fn test_degrading_color_moves_toward_end() {
        let tuning = Tuning::default();
        let mut g = grip(GripKind::Normal).with_initial_state(GripState::Visible, 0.0);
        g.grab(0.0);
        run_until_change(&mut g, &tuning, 20.0);
        let (start, _) = g.display_color(&tuning, true);
        assert_eq!(start, GRIP_COLOR_DEGRADING_START);
        g.update(2.0, 2.0, None, &tuning);
        let (mid, _) = g.display_color(&tuning, true);
        assert_ne!(mid, GRIP_COLOR_DEGRADING_START);
        assert_ne!(mid, GRIP_COLOR_DEGRADING_END);
    }

    fn any_action() -> impl Strategy<Value = (u8, f32)> {
        (0u8..5, 0.0f32..3.0)
    }

    proptest! {
        #[test]
        fn test_only_lifecycle_edges_observed(
            kind in prop_oneof![Just(GripKind::Normal), Just(GripKind::Crack)],
            actions in prop::collection::vec(any_action(), 1..200),
        ) {
            let tuning = Tuning::default();
            let mut g = grip(kind);
            let mut now = 0.0;
            for (action, dt) in actions {
                let before = g.state();
                match action {
                    0 => { g.grab(now); }
                    1 => g.release(now),
                    2 => { g.reveal(now); }
                    3 => { g.hide(now); }
                    _ => {
                        now += dt;
                        g.update(dt, now, Some(g.pos), &tuning);
                    }
                }
                let after = g.state();
                prop_assert!(
                    before == after || before.can_transition_to(after),
                    "illegal edge {:?} -> {:?}", before, after
                );
                prop_assert!(!(before == GripState::Active && after == GripState::Hidden));
                prop_assert!(!(before == GripState::Failed && after == GripState::Active));
            }
        }
    }
}
