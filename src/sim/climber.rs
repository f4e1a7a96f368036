//! The climber and its state machine
//!
//! Idle (on a grip or dangling on the rope), belaying up the rope, falling,
//! and recovering after the rope has caught a fall. Grips are never owned by
//! the climber: it refers to its current grip by id and works on the shared
//! grip list through the grip's own grab/release contract.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::animation::{AnimationStatus, ClimberAnimation};
use super::grip::{Grip, GripState};
use super::input::MoveDirection;
use super::protection::Protection;
use super::rope::{BelayStep, FallCatch, RopeManager};
use crate::audio::{AudioSink, SoundEffect};
use crate::tuning::Tuning;

/// Sideways moves wider than this turn the climber's face
pub const BODY_HALF_WIDTH: f32 = 10.0;

/// Why a fall started
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FallCause {
    /// Pump hit the maximum
    Pumped,
    /// Held grip gave way
    GripFailed,
    /// Tried to belay with no anchor above
    BelayBlocked,
    /// Requested directly
    LetGo,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameOverReason {
    FellToGround,
    FallTooLong,
}

/// Bookkeeping for one fall; lives only while falling or recovering
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Fall {
    pub cause: FallCause,
    pub start: Vec2,
    pub catch: FallCatch,
}

impl Fall {
    /// Distance dropped so far
    pub fn distance_from_start(&self, y: f32) -> f32 {
        y - self.start.y
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub enum ClimberState {
    /// On a grip, or dangling on the rope when no grip is held
    #[default]
    Idle,
    Belaying,
    Falling {
        fall: Fall,
        elapsed: f32,
    },
    Recovering {
        fall: Fall,
        elapsed: f32,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveOutcome {
    Moved,
    OutOfReach,
    /// Target refused the grab (hidden, degrading or failed)
    GripRejected,
    /// Falling, recovering or belaying
    Busy,
    /// Nothing to move to
    NoTarget,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlacementOutcome {
    Placed { protection_id: u32 },
    NoInventory,
    NotOnQualifyingGrip,
}

/// Things the session reacts to
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ClimberEvent {
    Fell(FallCause),
    Caught { protection_id: Option<u32> },
    Recovered { regrabbed: bool },
    BelayStopped,
    GameOver(GameOverReason),
}

fn grip_index(grips: &[Grip], id: u32) -> Option<usize> {
    grips.iter().position(|g| g.id == id)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Climber {
    pub pos: Vec2,
    pub pump: f32,
    pub protection_count: u32,
    pub current_grip: Option<u32>,
    pub state: ClimberState,
    pub velocity_y: f32,
    pub rope: RopeManager,
    pub animation: ClimberAnimation,
    /// Severity sound already played for the current fall
    played_fall_sound: bool,
}

impl Climber {
    pub fn new(pos: Vec2, rope_start: Vec2, tuning: &Tuning) -> Self {
        Self {
            pos,
            pump: 0.0,
            protection_count: tuning.initial_protection_count,
            current_grip: None,
            state: ClimberState::Idle,
            velocity_y: 0.0,
            rope: RopeManager::new(rope_start),
            animation: ClimberAnimation::default(),
            played_fall_sound: false,
        }
    }

    pub fn is_idle(&self) -> bool {
        self.state == ClimberState::Idle
    }

    pub fn is_dangling(&self) -> bool {
        self.is_idle() && self.current_grip.is_none()
    }

    pub fn is_falling(&self) -> bool {
        matches!(self.state, ClimberState::Falling { .. })
    }

    pub fn is_recovering(&self) -> bool {
        matches!(self.state, ClimberState::Recovering { .. })
    }

    pub fn is_belaying(&self) -> bool {
        self.state == ClimberState::Belaying
    }

    /// Fall in progress or being recovered from
    pub fn fall(&self) -> Option<&Fall> {
        match &self.state {
            ClimberState::Falling { fall, .. } | ClimberState::Recovering { fall, .. } => Some(fall),
            _ => None,
        }
    }

    pub fn can_reach(&self, grip: &Grip, tuning: &Tuning) -> bool {
        self.pos.distance(grip.pos) <= tuning.reach
    }

    /// Add (or remove) pump, clamped. Returns true when it is now maxed.
    pub fn add_pump(&mut self, delta: f32, tuning: &Tuning) -> bool {
        self.pump = (self.pump + delta).clamp(0.0, tuning.max_pump);
        self.pump >= tuning.max_pump
    }

    /// Move to another grip within reach
    pub fn move_to_grip(
        &mut self,
        grip_id: u32,
        grips: &mut [Grip],
        now: f32,
        tuning: &Tuning,
        audio: &mut dyn AudioSink,
    ) -> MoveOutcome {
        if !self.is_idle() {
            return MoveOutcome::Busy;
        }
        self.attach(grip_id, grips, now, tuning, audio)
    }

    /// Shared move path for keyboard moves and clicks
    fn attach(
        &mut self,
        grip_id: u32,
        grips: &mut [Grip],
        now: f32,
        tuning: &Tuning,
        audio: &mut dyn AudioSink,
    ) -> MoveOutcome {
        let Some(target) = grip_index(grips, grip_id) else {
            return MoveOutcome::OutOfReach;
        };
        if !self.can_reach(&grips[target], tuning) {
            return MoveOutcome::OutOfReach;
        }
        if self.current_grip == Some(grip_id) {
            return MoveOutcome::NoTarget;
        }
        if !grips[target].can_grab() {
            log::debug!("Grip {} refused grab in {:?}", grip_id, grips[target].state());
            return MoveOutcome::GripRejected;
        }

        if let Some(prev) = self.current_grip.and_then(|id| grip_index(grips, id)) {
            grips[prev].release(now);
        }
        grips[target].grab(now);

        let to = grips[target].pos;
        if (to.x - self.pos.x).abs() > BODY_HALF_WIDTH {
            self.animation.start_face_turn();
        } else {
            self.animation.reset_face_turn();
        }
        self.pos = to;
        self.current_grip = Some(grip_id);
        self.state = ClimberState::Idle;
        self.velocity_y = 0.0;
        self.add_pump(tuning.pump_increase_move, tuning);
        self.played_fall_sound = false;
        self.animation.notify_activity();
        audio.play(SoundEffect::Grab);
        MoveOutcome::Moved
    }

    /// Best grip for a directional move: reachable, grabbable and strictly
    /// on that side, weighted to favour the intended axis.
    pub fn choose_directional(
        &self,
        dir: MoveDirection,
        grips: &[Grip],
        tuning: &Tuning,
    ) -> Option<u32> {
        grips
            .iter()
            .filter(|g| Some(g.id) != self.current_grip)
            .filter(|g| g.state() != GripState::Hidden && g.can_grab())
            .filter(|g| self.can_reach(g, tuning))
            .filter_map(|g| {
                let d = g.pos - self.pos;
                let score = match dir {
                    MoveDirection::Up if d.y < 0.0 => d.y * d.y + 10.0 * d.x * d.x,
                    MoveDirection::Down if d.y > 0.0 => d.y * d.y + 10.0 * d.x * d.x,
                    MoveDirection::Left if d.x < 0.0 => d.x * d.x + 5.0 * d.y * d.y,
                    MoveDirection::Right if d.x > 0.0 => d.x * d.x + 5.0 * d.y * d.y,
                    _ => return None,
                };
                Some((g.id, score))
            })
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(id, _)| id)
    }

    pub fn move_in_direction(
        &mut self,
        dir: MoveDirection,
        grips: &mut [Grip],
        now: f32,
        tuning: &Tuning,
        audio: &mut dyn AudioSink,
    ) -> MoveOutcome {
        if !self.is_idle() {
            return MoveOutcome::Busy;
        }
        match self.choose_directional(dir, grips, tuning) {
            Some(id) => self.move_to_grip(id, grips, now, tuning, audio),
            None => MoveOutcome::NoTarget,
        }
    }

    /// Click/tap grab. Also allowed while recovering, which ends the recovery.
    pub fn grab_at(
        &mut self,
        point: Vec2,
        grips: &mut [Grip],
        now: f32,
        tuning: &Tuning,
        audio: &mut dyn AudioSink,
    ) -> MoveOutcome {
        if !(self.is_idle() || self.is_recovering()) {
            return MoveOutcome::Busy;
        }
        let target = grips
            .iter()
            .filter(|g| {
                matches!(
                    g.state(),
                    GripState::Visible
                        | GripState::Active
                        | GripState::Revealing
                        | GripState::Revivable
                )
            })
            .filter(|g| Some(g.id) != self.current_grip)
            .filter(|g| g.pos.distance(point) <= g.size / 2.0 + tuning.grab_click_padding)
            .filter(|g| self.can_reach(g, tuning))
            .min_by(|a, b| {
                a.pos
                    .distance_squared(self.pos)
                    .total_cmp(&b.pos.distance_squared(self.pos))
            })
            .map(|g| g.id);

        let Some(id) = target else {
            return MoveOutcome::NoTarget;
        };
        let outcome = self.attach(id, grips, now, tuning, audio);
        if outcome == MoveOutcome::Moved {
            log::debug!("Grabbed grip {id} by click");
        }
        outcome
    }

    /// Clip protection into the held crack
    pub fn place_protection(
        &mut self,
        grips: &mut [Grip],
        protections: &mut Vec<Protection>,
        next_id: impl FnOnce() -> u32,
        audio: &mut dyn AudioSink,
    ) -> PlacementOutcome {
        if self.protection_count == 0 {
            audio.play(SoundEffect::NoProtectionLeft);
            return PlacementOutcome::NoInventory;
        }
        let held = if self.is_idle() {
            self.current_grip.and_then(|id| grip_index(grips, id))
        } else {
            None
        };
        let Some(index) = held.filter(|&i| grips[i].offers_protection()) else {
            audio.play(SoundEffect::CannotPlaceProtection);
            return PlacementOutcome::NotOnQualifyingGrip;
        };

        let grip = &mut grips[index];
        let protection = Protection::new(next_id(), grip.pos, grip.id);
        grip.protected = true;
        self.rope.add_protection(&protection);
        self.protection_count -= 1;
        self.animation.notify_activity();
        audio.play(SoundEffect::PlaceProtection);
        log::debug!(
            "Protection {} placed on grip {} ({} left)",
            protection.id,
            protection.grip_id,
            self.protection_count
        );

        let protection_id = protection.id;
        protections.push(protection);
        PlacementOutcome::Placed { protection_id }
    }

    /// Begin climbing the rope. Only from dangling.
    pub fn start_belay(&mut self, audio: &mut dyn AudioSink) -> bool {
        if !self.is_dangling() {
            return false;
        }
        self.state = ClimberState::Belaying;
        self.animation.notify_activity();
        audio.play(SoundEffect::BelayClick);
        true
    }

    pub fn stop_belay(&mut self) -> bool {
        if !self.is_belaying() {
            return false;
        }
        self.state = ClimberState::Idle;
        true
    }

    /// Come off the wall. Ignored while already falling or recovering.
    pub fn start_fall(
        &mut self,
        cause: FallCause,
        grips: &mut [Grip],
        now: f32,
        tuning: &Tuning,
        audio: &mut dyn AudioSink,
    ) -> bool {
        if self.is_falling() || self.is_recovering() {
            return false;
        }
        if let Some(prev) = self.current_grip.take().and_then(|id| grip_index(grips, id)) {
            grips[prev].release(now);
        }

        let catch = self.rope.compute_catch(self.pos, tuning);
        let fall = Fall {
            cause,
            start: self.pos,
            catch,
        };
        self.velocity_y = 0.0;
        self.state = ClimberState::Falling { fall, elapsed: 0.0 };
        self.animation.notify_activity();
        self.animation.reset_face_turn();

        if catch.is_terminal() {
            audio.play(SoundEffect::TerminalFall);
            self.played_fall_sound = true;
            log::info!("Uncatchable fall ({cause:?}) from y={:.0}: {catch:?}", self.pos.y);
        } else {
            audio.play(SoundEffect::RopeSlackOut);
            if !self.played_fall_sound {
                if let Some(effect) = fall_sound(catch.drop_length(self.pos.y), tuning) {
                    audio.play(effect);
                }
                self.played_fall_sound = true;
            }
            log::info!(
                "Fall ({cause:?}) from y={:.0}, anchor {} at {:.0} px",
                self.pos.y,
                catch.anchor(),
                catch.distance()
            );
        }
        true
    }

    /// One simulation step
    pub fn update(
        &mut self,
        dt: f32,
        now: f32,
        grips: &mut [Grip],
        tuning: &Tuning,
        audio: &mut dyn AudioSink,
    ) -> Option<ClimberEvent> {
        self.animation.update(
            dt,
            AnimationStatus {
                falling: self.is_falling(),
                on_grip: self.current_grip.is_some(),
                belaying: self.is_belaying(),
            },
            tuning,
        );

        match self.state {
            ClimberState::Falling { fall, elapsed } => {
                self.update_falling(fall, elapsed + dt, dt, tuning, audio)
            }
            ClimberState::Recovering { fall, elapsed } => {
                self.update_recovering(fall, elapsed + dt, grips, now, tuning)
            }
            ClimberState::Belaying => self.update_belaying(dt, grips, now, tuning, audio),
            ClimberState::Idle => self.update_idle(dt, grips, now, tuning, audio),
        }
    }

    fn update_falling(
        &mut self,
        fall: Fall,
        elapsed: f32,
        dt: f32,
        tuning: &Tuning,
        audio: &mut dyn AudioSink,
    ) -> Option<ClimberEvent> {
        let terminal = fall.catch.is_terminal();
        let (gravity, max_speed) = if terminal {
            (
                tuning.gravity * tuning.terminal_gravity_multiplier,
                tuning.max_fall_speed * tuning.terminal_gravity_multiplier,
            )
        } else {
            (tuning.gravity, tuning.max_fall_speed)
        };
        self.velocity_y = (self.velocity_y + gravity * dt).min(max_speed);
        self.pos.y += self.velocity_y * dt;
        self.state = ClimberState::Falling { fall, elapsed };

        match fall.catch {
            FallCatch::Caught {
                anchor,
                target_y,
                swing_x,
                ..
            } if self.pos.y >= target_y => {
                self.pos = Vec2::new(swing_x, target_y);
                self.velocity_y = 0.0;
                self.add_pump(tuning.pump_increase_fall_caught, tuning);
                self.rope.simplify_after_catch(anchor);
                self.state = ClimberState::Recovering { fall, elapsed: 0.0 };
                self.animation.notify_activity();
                audio.play(SoundEffect::FallCaught);
                log::info!(
                    "Caught by anchor {anchor} after {:.0} px",
                    fall.distance_from_start(target_y)
                );
                let protection_id = self.rope.node(anchor).and_then(|n| n.protection_id());
                Some(ClimberEvent::Caught { protection_id })
            }
            FallCatch::Terminal { reason, .. } => {
                let ground = self.rope.ground_y();
                if self.pos.y >= ground {
                    self.pos.y = ground;
                    self.velocity_y = 0.0;
                    log::info!("Hit the ground ({reason:?})");
                    Some(ClimberEvent::GameOver(GameOverReason::FellToGround))
                } else if elapsed >= tuning.terminal_fall_duration {
                    log::info!("Fall too long ({reason:?})");
                    Some(ClimberEvent::GameOver(GameOverReason::FallTooLong))
                } else {
                    None
                }
            }
            FallCatch::Caught { .. } => None,
        }
    }

    fn update_recovering(
        &mut self,
        fall: Fall,
        elapsed: f32,
        grips: &mut [Grip],
        now: f32,
        tuning: &Tuning,
    ) -> Option<ClimberEvent> {
        let FallCatch::Caught {
            anchor,
            anchor_pos,
            swing_x,
            ..
        } = fall.catch
        else {
            // Terminal falls never reach recovery
            self.state = ClimberState::Idle;
            return None;
        };

        if elapsed < tuning.recovery_duration {
            self.pos.x = swing_position(anchor_pos.x, swing_x, elapsed, tuning);
            self.state = ClimberState::Recovering { fall, elapsed };
            return None;
        }

        self.pos.x = swing_position(anchor_pos.x, swing_x, tuning.recovery_duration, tuning);
        self.state = ClimberState::Idle;

        // Climb back onto the catching piece's crack when it still holds
        let regrab = self
            .rope
            .node(anchor)
            .and_then(|n| n.grip_id())
            .and_then(|id| grip_index(grips, id))
            .filter(|&i| grips[i].can_grab());
        let regrabbed = match regrab {
            Some(i) if grips[i].grab(now) => {
                self.pos = grips[i].pos;
                self.current_grip = Some(grips[i].id);
                true
            }
            _ => false,
        };
        log::debug!("Recovered from fall (regrabbed: {regrabbed})");
        Some(ClimberEvent::Recovered { regrabbed })
    }

    fn update_belaying(
        &mut self,
        dt: f32,
        grips: &mut [Grip],
        now: f32,
        tuning: &Tuning,
        audio: &mut dyn AudioSink,
    ) -> Option<ClimberEvent> {
        let new_y = self.pos.y - tuning.belay_speed * dt;
        match self.rope.belay_step(self.pos.y, new_y, tuning.head_radius) {
            BelayStep::Allowed => {
                self.pos.y = new_y;
                None
            }
            BelayStep::AtAnchor => {
                self.state = ClimberState::Idle;
                audio.play(SoundEffect::RopeSlackIn);
                Some(ClimberEvent::BelayStopped)
            }
            BelayStep::Unanchored => {
                self.state = ClimberState::Idle;
                self.start_fall(FallCause::BelayBlocked, grips, now, tuning, audio);
                Some(ClimberEvent::Fell(FallCause::BelayBlocked))
            }
        }
    }

    fn update_idle(
        &mut self,
        dt: f32,
        grips: &mut [Grip],
        now: f32,
        tuning: &Tuning,
        audio: &mut dyn AudioSink,
    ) -> Option<ClimberEvent> {
        let held = self.current_grip.and_then(|id| grip_index(grips, id));
        if self.current_grip.is_some() && held.is_none() {
            // Grip vanished from the live set
            self.current_grip = None;
        }

        let rate = match held {
            Some(i) => {
                let grip = &grips[i];
                if !matches!(grip.state(), GripState::Active | GripState::Degrading) {
                    audio.play(SoundEffect::GripFail);
                    self.start_fall(FallCause::GripFailed, grips, now, tuning, audio);
                    return Some(ClimberEvent::Fell(FallCause::GripFailed));
                }
                self.pos = grip.pos;
                pump_rate(grip, tuning)
            }
            None => tuning.pump_hanging_per_second,
        };

        // Maxed by a move or a catch penalty counts before any rest recovery
        if self.pump >= tuning.max_pump || self.add_pump(rate * dt, tuning) {
            self.start_fall(FallCause::Pumped, grips, now, tuning, audio);
            return Some(ClimberEvent::Fell(FallCause::Pumped));
        }
        None
    }
}

/// Pump change per second while holding `grip`
pub fn pump_rate(grip: &Grip, tuning: &Tuning) -> f32 {
    if grip.is_rest(tuning) {
        let bonus = if grip.is_crack() {
            tuning.pump_decrease_crack_bonus
        } else {
            0.0
        };
        -(tuning.pump_decrease_per_second + bonus)
    } else {
        tuning.pump_hanging_per_second
            * (1.0 + tuning.pump_size_penalty_factor * grip.smallness(tuning))
    }
}

/// Damped pendulum settling under the anchor
pub fn swing_position(anchor_x: f32, swing_x: f32, t: f32, tuning: &Tuning) -> f32 {
    let decay = (-tuning.swing_damping * t).exp();
    anchor_x + (swing_x - anchor_x) * decay * (tuning.swing_frequency * t).cos()
}

/// Severity sound for a fall of `length` pixels
pub fn fall_sound(length: f32, tuning: &Tuning) -> Option<SoundEffect> {
    if length < tuning.min_fall_distance_for_sound {
        return None;
    }
    let ratio = length / tuning.max_fall_distance_for_sound.max(f32::EPSILON);
    Some(if ratio < 0.3 {
        SoundEffect::FallShort
    } else if ratio < 0.7 {
        SoundEffect::FallMedium
    } else {
        SoundEffect::FallLong
    })
}
