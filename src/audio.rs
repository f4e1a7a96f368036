//! Sound effects
//!
//! The simulation only names effects; playback is up to the sink. In the
//! browser `AudioManager` synthesizes every effect with Web Audio oscillators,
//! so no sample files are shipped.

use serde::{Deserialize, Serialize};

/// Sound effect types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SoundEffect {
    /// Climber takes hold of a grip
    Grab,
    /// Protection clipped into a crack
    PlaceProtection,
    /// Placement refused: not on an unprotected crack
    CannotPlaceProtection,
    /// Placement refused: inventory empty
    NoProtectionLeft,
    /// Held grip gave way
    GripFail,
    /// Belay started from dangling on the rope
    BelayClick,
    /// Held grip started to crumble
    DegradeTick,
    /// Rope arrested a fall
    FallCaught,
    FallShort,
    FallMedium,
    FallLong,
    /// Fall that no anchor can hold
    TerminalFall,
    /// Rope paying out as a catchable fall starts
    RopeSlackOut,
    /// Rope drawn tight at the anchor while belaying
    RopeSlackIn,
    /// Final grip of the route appeared
    WinGripRevealed,
    /// Summit reached
    Win,
    GameOver,
    /// New high score
    HighScore,
}

/// Anything that can play a sound effect.
///
/// Sinks may drop effects silently (no audio device, muted, headless).
pub trait AudioSink {
    fn play(&mut self, effect: SoundEffect);
}

/// Collecting sink: the simulation buffers the frame's effects here
impl AudioSink for Vec<SoundEffect> {
    fn play(&mut self, effect: SoundEffect) {
        self.push(effect);
    }
}

/// Sink that discards everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NullAudio;

impl AudioSink for NullAudio {
    fn play(&mut self, _effect: SoundEffect) {}
}

#[cfg(target_arch = "wasm32")]
pub use web::AudioManager;

#[cfg(target_arch = "wasm32")]
mod web {
    use super::{AudioSink, SoundEffect};
    use web_sys::{AudioContext, GainNode, OscillatorNode, OscillatorType};

    /// Web Audio playback for the game
    pub struct AudioManager {
        ctx: Option<AudioContext>,
        master_volume: f32,
        sfx_volume: f32,
        muted: bool,
    }

    impl Default for AudioManager {
        fn default() -> Self {
            Self::new()
        }
    }

    impl AudioManager {
        pub fn new() -> Self {
            // Try to create audio context (may fail if not in secure context)
            let ctx = AudioContext::new().ok();
            if ctx.is_none() {
                log::warn!("Failed to create AudioContext - audio disabled");
            }
            Self {
                ctx,
                master_volume: 0.8,
                sfx_volume: 1.0,
                muted: false,
            }
        }

        /// Resume audio context (required after user gesture)
        pub fn resume(&self) {
            if let Some(ctx) = &self.ctx {
                let _ = ctx.resume();
            }
        }

        pub fn set_master_volume(&mut self, vol: f32) {
            self.master_volume = vol.clamp(0.0, 1.0);
        }

        pub fn set_sfx_volume(&mut self, vol: f32) {
            self.sfx_volume = vol.clamp(0.0, 1.0);
        }

        pub fn set_muted(&mut self, muted: bool) {
            self.muted = muted;
        }

        fn effective_volume(&self) -> f32 {
            if self.muted {
                0.0
            } else {
                self.master_volume * self.sfx_volume
            }
        }

        /// Play a sound effect
        pub fn play_effect(&self, effect: SoundEffect) {
            let vol = self.effective_volume();
            if vol <= 0.0 {
                return;
            }

            let Some(ctx) = &self.ctx else { return };

            // Resume context if suspended (browsers require user gesture)
            if ctx.state() == web_sys::AudioContextState::Suspended {
                let _ = ctx.resume();
            }

            use OscillatorType::{Sawtooth, Sine, Square, Triangle};
            match effect {
                SoundEffect::Grab => self.tone(ctx, vol * 0.1, Triangle, &[(540.0, 0.0)], 0.1),
                SoundEffect::PlaceProtection => {
                    self.tone(ctx, vol * 0.05, Sawtooth, &[(440.0, 0.0)], 0.1)
                }
                SoundEffect::CannotPlaceProtection => {
                    self.tone(ctx, vol * 0.08, Square, &[(150.0, 0.0)], 0.1)
                }
                SoundEffect::NoProtectionLeft => self.tone(
                    ctx,
                    vol * 0.07,
                    Triangle,
                    &[(220.0, 0.0), (180.0, 0.05)],
                    0.15,
                ),
                SoundEffect::GripFail => self.play_grip_fail(ctx, vol),
                SoundEffect::BelayClick => self.tone(
                    ctx,
                    vol * 0.06,
                    Square,
                    &[(700.0, 0.0), (880.0, 0.03)],
                    0.06,
                ),
                SoundEffect::DegradeTick => self.tone(ctx, vol * 0.02, Sine, &[(50.0, 0.0)], 0.08),
                SoundEffect::FallCaught => self.sweep(ctx, vol * 0.1, Sawtooth, 300.0, 100.0, 0.5),
                SoundEffect::FallShort => self.sweep(ctx, vol * 0.1, Sine, 300.0, 150.0, 0.25),
                SoundEffect::FallMedium => self.sweep(ctx, vol * 0.15, Sawtooth, 200.0, 50.0, 0.5),
                SoundEffect::FallLong => self.play_fall_long(ctx, vol),
                SoundEffect::TerminalFall => {
                    self.sweep(ctx, vol * 0.2, Sawtooth, 150.0, 30.0, 0.8)
                }
                SoundEffect::RopeSlackOut => self.sweep(ctx, vol * 0.04, Sine, 100.0, 50.0, 0.3),
                SoundEffect::RopeSlackIn => self.sweep(ctx, vol * 0.03, Sine, 120.0, 70.0, 0.2),
                SoundEffect::WinGripRevealed => {
                    self.arpeggio(ctx, vol * 0.2, Sine, &[800.0, 1200.0], 0.08, 0.3)
                }
                SoundEffect::Win => self.arpeggio(
                    ctx,
                    vol * 0.3,
                    Triangle,
                    &[400.0, 500.0, 600.0, 800.0],
                    0.1,
                    0.4,
                ),
                SoundEffect::GameOver => {
                    self.arpeggio(ctx, vol * 0.3, Sine, &[400.0, 350.0, 300.0, 200.0], 0.2, 0.3)
                }
                SoundEffect::HighScore => self.arpeggio(
                    ctx,
                    vol * 0.25,
                    Triangle,
                    &[500.0, 600.0, 700.0, 800.0, 1000.0],
                    0.08,
                    0.25,
                ),
            }
        }

        // === Sound generators ===

        /// Create an oscillator with gain envelope
        fn create_osc(
            &self,
            ctx: &AudioContext,
            freq: f32,
            osc_type: OscillatorType,
        ) -> Option<(OscillatorNode, GainNode)> {
            let osc = ctx.create_oscillator().ok()?;
            let gain = ctx.create_gain().ok()?;

            osc.set_type(osc_type);
            osc.frequency().set_value(freq);
            osc.connect_with_audio_node(&gain).ok()?;
            gain.connect_with_audio_node(&ctx.destination()).ok()?;

            Some((osc, gain))
        }

        /// Stepped-frequency blip: each `(freq, offset)` is set at `t + offset`
        fn tone(
            &self,
            ctx: &AudioContext,
            peak: f32,
            osc_type: OscillatorType,
            steps: &[(f32, f64)],
            duration: f64,
        ) {
            let Some(&(first, _)) = steps.first() else {
                return;
            };
            let Some((osc, gain)) = self.create_osc(ctx, first, osc_type) else {
                return;
            };
            let t = ctx.current_time();

            for &(freq, offset) in steps {
                osc.frequency().set_value_at_time(freq, t + offset).ok();
            }
            gain.gain().set_value_at_time(peak, t).ok();
            gain.gain()
                .exponential_ramp_to_value_at_time(0.0001, t + duration)
                .ok();

            osc.start().ok();
            osc.stop_with_when(t + duration).ok();
        }

        /// Exponential pitch slide from `from` to `to`
        fn sweep(
            &self,
            ctx: &AudioContext,
            peak: f32,
            osc_type: OscillatorType,
            from: f32,
            to: f32,
            duration: f64,
        ) {
            let Some((osc, gain)) = self.create_osc(ctx, from, osc_type) else {
                return;
            };
            let t = ctx.current_time();

            gain.gain().set_value_at_time(peak, t).ok();
            gain.gain()
                .exponential_ramp_to_value_at_time(0.0001, t + duration)
                .ok();
            osc.frequency().set_value_at_time(from, t).ok();
            osc.frequency()
                .exponential_ramp_to_value_at_time(to, t + duration)
                .ok();

            osc.start().ok();
            osc.stop_with_when(t + duration).ok();
        }

        /// Notes played one after another
        fn arpeggio(
            &self,
            ctx: &AudioContext,
            peak: f32,
            osc_type: OscillatorType,
            notes: &[f32],
            spacing: f64,
            note_len: f64,
        ) {
            for (i, freq) in notes.iter().enumerate() {
                let delay = i as f64 * spacing;
                if let Some((osc, gain)) = self.create_osc(ctx, *freq, osc_type) {
                    let t = ctx.current_time() + delay;
                    gain.gain().set_value_at_time(peak, t).ok();
                    gain.gain()
                        .exponential_ramp_to_value_at_time(0.01, t + note_len)
                        .ok();
                    osc.start_with_when(t).ok();
                    osc.stop_with_when(t + note_len + 0.05).ok();
                }
            }
        }

        /// Grip fail - gritty crunch
        fn play_grip_fail(&self, ctx: &AudioContext, vol: f32) {
            let t = ctx.current_time();

            if let Some((osc, gain)) = self.create_osc(ctx, 1000.0, OscillatorType::Sawtooth) {
                gain.gain().set_value_at_time(vol * 0.12, t).ok();
                gain.gain()
                    .exponential_ramp_to_value_at_time(0.0001, t + 0.2)
                    .ok();
                osc.frequency().set_value_at_time(1000.0, t).ok();
                osc.frequency().set_value_at_time(600.0, t + 0.03).ok();
                osc.frequency().set_value_at_time(900.0, t + 0.06).ok();
                osc.frequency().set_value_at_time(400.0, t + 0.1).ok();
                osc.start().ok();
                osc.stop_with_when(t + 0.2).ok();
            }

            // Crumble thud
            if let Some((osc, gain)) = self.create_osc(ctx, 80.0, OscillatorType::Sine) {
                gain.gain().set_value_at_time(vol * 0.1, t).ok();
                gain.gain()
                    .exponential_ramp_to_value_at_time(0.01, t + 0.15)
                    .ok();
                osc.start().ok();
                osc.stop_with_when(t + 0.18).ok();
            }
        }

        /// Long fall - heavy rumbling drop
        fn play_fall_long(&self, ctx: &AudioContext, vol: f32) {
            let t = ctx.current_time();

            if let Some((osc, gain)) = self.create_osc(ctx, 400.0, OscillatorType::Sawtooth) {
                gain.gain().set_value_at_time(vol * 0.2, t).ok();
                gain.gain()
                    .exponential_ramp_to_value_at_time(0.05, t + 0.7)
                    .ok();
                osc.frequency().set_value_at_time(400.0, t).ok();
                osc.frequency()
                    .exponential_ramp_to_value_at_time(60.0, t + 0.7)
                    .ok();
                osc.start().ok();
                osc.stop_with_when(t + 0.7).ok();
            }

            if let Some((osc, gain)) = self.create_osc(ctx, 55.0, OscillatorType::Square) {
                gain.gain().set_value_at_time(vol * 0.08, t).ok();
                gain.gain()
                    .exponential_ramp_to_value_at_time(0.01, t + 0.6)
                    .ok();
                osc.frequency().set_value_at_time(55.0, t).ok();
                osc.frequency().set_value_at_time(48.0, t + 0.2).ok();
                osc.frequency().set_value_at_time(42.0, t + 0.4).ok();
                osc.start().ok();
                osc.stop_with_when(t + 0.65).ok();
            }
        }
    }

    impl AudioSink for AudioManager {
        fn play(&mut self, effect: SoundEffect) {
            self.play_effect(effect);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vec_sink_records_in_order() {
        let mut sink: Vec<SoundEffect> = Vec::new();
        sink.play(SoundEffect::Grab);
        sink.play(SoundEffect::FallCaught);
        assert_eq!(sink, vec![SoundEffect::Grab, SoundEffect::FallCaught]);
    }

    #[test]
    fn test_null_sink_accepts_everything() {
        let mut sink = NullAudio;
        let dyn_sink: &mut dyn AudioSink = &mut sink;
        dyn_sink.play(SoundEffect::TerminalFall);
    }
}
