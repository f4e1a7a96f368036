//! Presentation-only climber animation state
//!
//! Head turns and the idle look-around. Nothing here feeds back into the
//! simulation; it is advanced alongside the climber and read by the renderer.

use serde::{Deserialize, Serialize};

use crate::tuning::Tuning;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FaceState {
    #[default]
    Forward,
    Turning,
    Turned,
}

/// Steps of the idle look-around
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum IdleLook {
    #[default]
    None,
    TurningLeft,
    LookingLeft,
    ReturningFromLeft,
    TurningRight,
    LookingRight,
    ReturningFromRight,
}

/// What the climber is doing this frame
#[derive(Debug, Clone, Copy, Default)]
pub struct AnimationStatus {
    pub falling: bool,
    pub on_grip: bool,
    pub belaying: bool,
}

impl AnimationStatus {
    fn busy(self) -> bool {
        self.falling || self.on_grip || self.belaying
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClimberAnimation {
    pub face: FaceState,
    /// 0..1 progress of the current turn step
    pub turn_progress: f32,
    pub idle_look: IdleLook,
    idle_timer: f32,
    pause_timer: f32,
    /// Drives the hand-over-hand motion while belaying
    pub belay_phase: f32,
}

impl ClimberAnimation {
    pub fn update(&mut self, dt: f32, status: AnimationStatus, tuning: &Tuning) {
        if status.busy() {
            self.reset_idle();
        } else if self.idle_look == IdleLook::None {
            self.idle_timer += dt;
            if self.idle_timer >= tuning.idle_timeout {
                self.idle_timer = 0.0;
                self.idle_look = IdleLook::TurningLeft;
                self.turn_progress = 0.0;
            }
        }

        if self.idle_look != IdleLook::None {
            self.update_idle_look(dt, tuning);
        } else if self.face == FaceState::Turning {
            self.turn_progress += dt / tuning.turn_duration.max(f32::EPSILON);
            if self.turn_progress >= 1.0 {
                self.turn_progress = 1.0;
                self.face = FaceState::Turned;
            }
        }

        if status.belaying {
            self.belay_phase = (self.belay_phase + dt / 0.4).fract();
        } else {
            self.belay_phase = 0.0;
        }
    }

    fn update_idle_look(&mut self, dt: f32, tuning: &Tuning) {
        // Each side turn takes half a full turn
        let step = (tuning.turn_duration / 2.0).max(f32::EPSILON);
        match self.idle_look {
            IdleLook::TurningLeft
            | IdleLook::ReturningFromLeft
            | IdleLook::TurningRight
            | IdleLook::ReturningFromRight => {
                self.turn_progress += dt / step;
                if self.turn_progress >= 1.0 {
                    self.turn_progress = 0.0;
                    self.pause_timer = 0.0;
                    self.idle_look = match self.idle_look {
                        IdleLook::TurningLeft => IdleLook::LookingLeft,
                        IdleLook::ReturningFromLeft => IdleLook::TurningRight,
                        IdleLook::TurningRight => IdleLook::LookingRight,
                        _ => IdleLook::None,
                    };
                }
            }
            IdleLook::LookingLeft | IdleLook::LookingRight => {
                self.pause_timer += dt;
                if self.pause_timer >= tuning.idle_look_pause {
                    self.turn_progress = 0.0;
                    self.idle_look = if self.idle_look == IdleLook::LookingLeft {
                        IdleLook::ReturningFromLeft
                    } else {
                        IdleLook::ReturningFromRight
                    };
                }
            }
            IdleLook::None => {}
        }
    }

    /// Head yaw for drawing: -1 fully left, 0 forward, 1 fully right
    pub fn head_turn(&self) -> f32 {
        let p = self.turn_progress.clamp(0.0, 1.0);
        match self.idle_look {
            IdleLook::TurningLeft => -p,
            IdleLook::LookingLeft => -1.0,
            IdleLook::ReturningFromLeft => -(1.0 - p),
            IdleLook::TurningRight => p,
            IdleLook::LookingRight => 1.0,
            IdleLook::ReturningFromRight => 1.0 - p,
            IdleLook::None => 0.0,
        }
    }

    /// Sideways move: turn the face unless an idle look is playing
    pub fn start_face_turn(&mut self) {
        if self.idle_look == IdleLook::None {
            self.face = FaceState::Turning;
            self.turn_progress = 0.0;
        }
    }

    pub fn reset_face_turn(&mut self) {
        self.face = FaceState::Forward;
        self.turn_progress = 0.0;
    }

    /// Any player action restarts the idle countdown
    pub fn notify_activity(&mut self) {
        self.reset_idle();
    }

    fn reset_idle(&mut self) {
        self.idle_look = IdleLook::None;
        self.idle_timer = 0.0;
        self.pause_timer = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DANGLING: AnimationStatus = AnimationStatus {
        falling: false,
        on_grip: false,
        belaying: false,
    };

    #[test]
    fn test_idle_look_full_cycle() {
        let tuning = Tuning::default();
        let mut anim = ClimberAnimation::default();
        let dt = 0.01;
        let mut t = 0.0;
        let mut seen = Vec::new();
        while t < 20.0 {
            anim.update(dt, DANGLING, &tuning);
            if seen.last() != Some(&anim.idle_look) {
                seen.push(anim.idle_look);
            }
            t += dt;
            if seen.len() > 1 && anim.idle_look == IdleLook::None {
                break;
            }
        }
        assert_eq!(
            seen,
            vec![
                IdleLook::None,
                IdleLook::TurningLeft,
                IdleLook::LookingLeft,
                IdleLook::ReturningFromLeft,
                IdleLook::TurningRight,
                IdleLook::LookingRight,
                IdleLook::ReturningFromRight,
                IdleLook::None,
            ]
        );
    }

    #[test]
    fn test_on_grip_never_looks_around() {
        let tuning = Tuning::default();
        let mut anim = ClimberAnimation::default();
        let status = AnimationStatus {
            on_grip: true,
            ..Default::default()
        };
        for _ in 0..1000 {
            anim.update(0.016, status, &tuning);
        }
        assert_eq!(anim.idle_look, IdleLook::None);
        assert_eq!(anim.head_turn(), 0.0);
    }

    #[test]
    fn test_face_turn_completes() {
        let tuning = Tuning::default();
        let mut anim = ClimberAnimation::default();
        anim.start_face_turn();
        anim.update(tuning.turn_duration + 0.01, AnimationStatus { on_grip: true, ..Default::default() }, &tuning);
        assert_eq!(anim.face, FaceState::Turned);
        anim.reset_face_turn();
        assert_eq!(anim.face, FaceState::Forward);
    }
}
