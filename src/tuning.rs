//! Data-driven game balance
//!
//! Every gameplay number lives here so a session can be re-tuned from JSON
//! without touching simulation code. `Tuning::default()` is the shipped set.

use serde::{Deserialize, Serialize};

use crate::consts::WORLD_HEIGHT;

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum TuningError {
    #[error("Failed to parse tuning JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid tuning: {0}")]
    Invalid(&'static str),
}

/// Gameplay constants. Times are seconds, distances are world pixels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tuning {
    // === Climber ===
    /// Maximum distance at which a grip can be grabbed
    pub reach: f32,
    /// Grips closer than this start their reveal animation
    pub grip_reveal_radius: f32,
    /// Head radius, used as the belay margin below an anchor
    pub head_radius: f32,
    /// Protection pieces carried at the start of a session
    pub initial_protection_count: u32,
    /// Ascent speed while belaying (pixels/s)
    pub belay_speed: f32,
    /// Extra pick radius around a grip for click/tap grabs
    pub grab_click_padding: f32,
    /// Minimum time between repeated moves while a direction is held
    pub move_debounce_interval: f32,

    // === Pump ===
    pub max_pump: f32,
    /// Pump added by each grip-to-grip move
    pub pump_increase_move: f32,
    /// Pump added when a fall is arrested by the rope
    pub pump_increase_fall_caught: f32,
    /// Pump recovered per second on a rest grip
    pub pump_decrease_per_second: f32,
    /// Extra recovery per second when the rest is a crack
    pub pump_decrease_crack_bonus: f32,
    /// Pump gained per second while hanging on a non-rest grip or dangling
    pub pump_hanging_per_second: f32,
    /// How much smaller grips raise the hanging cost (1.0 doubles it at minimum size)
    pub pump_size_penalty_factor: f32,
    /// Normal grips at least this large count as rests
    pub rest_grip_min_size: f32,

    // === Falling & rope ===
    pub gravity: f32,
    /// Gravity multiplier once a fall is known to be uncatchable
    pub terminal_gravity_multiplier: f32,
    pub max_fall_speed: f32,
    /// Longer falls than this cannot be held by the rope
    pub max_catchable_fall_distance: f32,
    /// Rope stretch applied to the arrested fall length and swing damping
    pub rope_slack_factor: f32,
    /// How long an uncatchable fall plays out before the game ends
    pub terminal_fall_duration: f32,
    /// Time spent swinging on the rope after a catch
    pub recovery_duration: f32,
    /// Angular frequency of the post-catch swing (rad/s)
    pub swing_frequency: f32,
    /// Exponential decay rate of the post-catch swing (1/s)
    pub swing_damping: f32,
    /// Falls shorter than this make no sound
    pub min_fall_distance_for_sound: f32,
    /// Fall length that maps to the longest fall sound
    pub max_fall_distance_for_sound: f32,

    // === Grip lifecycle ===
    pub grip_active_duration: f32,
    /// Random +/- jitter applied per grip to `grip_active_duration`
    pub grip_active_jitter: f32,
    pub grip_degrade_duration: f32,
    pub grip_reveal_duration: f32,
    pub grip_revival_duration: f32,
    pub grip_revivable_blink_duration: f32,
    pub grip_blink_interval: f32,
    /// Failed crack grips come back through revivable/reviving
    pub revive_failed_cracks: bool,

    // === Grip shapes ===
    pub normal_size_min: f32,
    pub normal_size_max: f32,
    pub crack_size_min: f32,
    pub crack_size_max: f32,
    /// Chance that a dynamically generated grip is a crack
    pub crack_chance: f32,

    // === Route generation ===
    /// Initial reachable grips sit at `climber_y - factor * reach`
    pub reachable_y_factors: Vec<f32>,
    pub reference_grip_count: usize,
    /// Grips created by the initial seeding pass (reachable + reference + filler)
    pub initial_batch_size: usize,
    pub filler_vertical_separation: f32,
    /// Base vertical spacing used when stacking reference grips
    pub min_grip_separation: f32,
    /// Too-close distance is `average grip size * this`
    pub too_close_multiplier: f32,
    pub initial_check_window: usize,
    pub dynamic_check_window: usize,
    pub dynamic_batch_size: usize,
    /// Generate when the highest grip is within `factor * view height` of the camera top
    pub dynamic_threshold_factor: f32,
    pub dynamic_offset_min: f32,
    pub dynamic_offset_max: f32,
    pub max_grips: usize,
    pub max_grips_on_screen: usize,
    /// No grips are generated above this world Y (the summit)
    pub generation_floor_y: f32,
    /// Grips below the win grip that must be used before it appears
    pub pre_last_grip_count: usize,

    // === Idle animation ===
    pub idle_timeout: f32,
    pub idle_look_pause: f32,
    pub turn_duration: f32,
}

impl Default for Tuning {
    fn default() -> Self {
        let min_grip_separation = 72.0;
        Self {
            reach: 75.0,
            grip_reveal_radius: 175.0,
            head_radius: 10.0,
            initial_protection_count: 3,
            belay_speed: 40.0,
            grab_click_padding: 6.0,
            move_debounce_interval: 0.2,

            max_pump: 100.0,
            pump_increase_move: 15.0,
            pump_increase_fall_caught: 40.0,
            pump_decrease_per_second: 5.0,
            pump_decrease_crack_bonus: 2.5,
            pump_hanging_per_second: 0.5,
            pump_size_penalty_factor: 1.0,
            rest_grip_min_size: 16.0,

            gravity: 1500.0,
            terminal_gravity_multiplier: 1.8,
            max_fall_speed: 900.0,
            max_catchable_fall_distance: 360.0,
            rope_slack_factor: 1.2,
            terminal_fall_duration: 2.5,
            recovery_duration: 2.0,
            swing_frequency: 6.0,
            swing_damping: 2.5,
            min_fall_distance_for_sound: 5.0,
            max_fall_distance_for_sound: WORLD_HEIGHT * 0.2,

            grip_active_duration: 10.0,
            grip_active_jitter: 0.5,
            grip_degrade_duration: 4.0,
            grip_reveal_duration: 0.5,
            grip_revival_duration: 3.0,
            grip_revivable_blink_duration: 1.0,
            grip_blink_interval: 0.25,
            revive_failed_cracks: true,

            normal_size_min: 10.0,
            normal_size_max: 18.0,
            crack_size_min: 8.0,
            crack_size_max: 18.0,
            crack_chance: 0.2,

            reachable_y_factors: vec![0.45, 0.65, 0.85],
            reference_grip_count: 6,
            initial_batch_size: 15,
            filler_vertical_separation: 50.0,
            min_grip_separation,
            too_close_multiplier: 2.0,
            initial_check_window: 3,
            dynamic_check_window: 5,
            dynamic_batch_size: 3,
            dynamic_threshold_factor: 0.75,
            dynamic_offset_min: min_grip_separation * 0.8,
            dynamic_offset_max: WORLD_HEIGHT * 0.25,
            max_grips: 200,
            max_grips_on_screen: 50,
            generation_floor_y: -20_000.0,
            pre_last_grip_count: 3,

            idle_timeout: 5.0,
            idle_look_pause: 1.0,
            turn_duration: 0.3,
        }
    }
}

impl Tuning {
    /// Parse a (possibly partial) JSON override; missing fields keep defaults
    pub fn from_json(json: &str) -> Result<Self, TuningError> {
        let tuning: Tuning = serde_json::from_str(json)?;
        tuning.validate()?;
        Ok(tuning)
    }

    /// Reject combinations the simulation cannot run with
    pub fn validate(&self) -> Result<(), TuningError> {
        if self.reach <= 0.0 {
            return Err(TuningError::Invalid("reach must be positive"));
        }
        if self.grip_reveal_radius < self.reach {
            return Err(TuningError::Invalid("reveal radius must be at least reach"));
        }
        if self.max_pump <= 0.0 {
            return Err(TuningError::Invalid("max_pump must be positive"));
        }
        if self.rope_slack_factor < 1.0 {
            return Err(TuningError::Invalid("rope slack factor must be >= 1"));
        }
        if self.reachable_y_factors.is_empty() {
            return Err(TuningError::Invalid("need at least one reachable grip factor"));
        }
        if self.normal_size_min > self.normal_size_max || self.crack_size_min > self.crack_size_max
        {
            return Err(TuningError::Invalid("grip size range is inverted"));
        }
        if self.dynamic_offset_min > self.dynamic_offset_max {
            return Err(TuningError::Invalid("dynamic offset band is inverted"));
        }
        if self.max_grips == 0 || self.max_grips_on_screen == 0 || self.dynamic_batch_size == 0 {
            return Err(TuningError::Invalid("grip caps must be non-zero"));
        }
        if self.grip_blink_interval <= 0.0 {
            return Err(TuningError::Invalid("blink interval must be positive"));
        }
        Ok(())
    }

    /// Average normal grip size, the basis of the too-close check
    pub fn average_grip_size(&self) -> f32 {
        (self.normal_size_min + self.normal_size_max) / 2.0
    }

    /// Minimum distance between a new grip and its trailing neighbours
    pub fn too_close_distance(&self) -> f32 {
        self.average_grip_size() * self.too_close_multiplier
    }

    /// Number of initial reachable grips
    pub fn reachable_grip_count(&self) -> usize {
        self.reachable_y_factors.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(Tuning::default().validate().is_ok());
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let tuning = Tuning::from_json(r#"{ "reach": 90.0, "belay_speed": 55.0 }"#).unwrap();
        assert_eq!(tuning.reach, 90.0);
        assert_eq!(tuning.belay_speed, 55.0);
        assert_eq!(tuning.max_pump, Tuning::default().max_pump);
    }

    #[test]
    fn test_invalid_json_is_parse_error() {
        let err = Tuning::from_json("{ reach: ").unwrap_err();
        assert!(matches!(err, TuningError::Parse(_)));
    }

    #[test]
    fn test_validation_rejects_small_reveal_radius() {
        let err = Tuning::from_json(r#"{ "reach": 200.0 }"#).unwrap_err();
        assert!(matches!(err, TuningError::Invalid(_)));
    }

    #[test]
    fn test_validation_rejects_slack_below_one() {
        let tuning = Tuning {
            rope_slack_factor: 0.5,
            ..Default::default()
        };
        assert!(tuning.validate().is_err());
    }

    #[test]
    fn test_too_close_distance() {
        let tuning = Tuning::default();
        assert!((tuning.average_grip_size() - 14.0).abs() < 1e-5);
        assert!((tuning.too_close_distance() - 28.0).abs() < 1e-5);
    }
}
