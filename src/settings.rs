//! Player preferences
//!
//! Persisted separately from the high score.

use serde::{Deserialize, Serialize};

use crate::persistence::{PersistError, Store};

/// Game settings/preferences
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    // === Audio ===
    /// Master volume (0.0 - 1.0)
    pub master_volume: f32,
    /// Sound effects volume (0.0 - 1.0)
    pub sfx_volume: f32,
    pub muted: bool,
    /// Mute when window loses focus
    pub mute_on_blur: bool,

    // === HUD ===
    pub show_fps: bool,

    // === Accessibility ===
    /// Reduced motion (no blinking grips, no idle head turns)
    pub reduced_motion: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            master_volume: 0.8,
            sfx_volume: 1.0,
            muted: false,
            mute_on_blur: true,
            show_fps: false,
            reduced_motion: false,
        }
    }
}

impl Settings {
    /// Storage key
    const STORAGE_KEY: &'static str = "vertical_odyssey_settings";

    /// Volume actually applied to effects
    pub fn effective_volume(&self) -> f32 {
        if self.muted {
            0.0
        } else {
            self.master_volume.clamp(0.0, 1.0) * self.sfx_volume.clamp(0.0, 1.0)
        }
    }

    /// Whether blink/flash effects should play
    pub fn effective_blink(&self) -> bool {
        !self.reduced_motion
    }

    pub fn load_from(store: &Store) -> Result<Self, PersistError> {
        Ok(store.load(Self::STORAGE_KEY)?.unwrap_or_default())
    }

    pub fn save_to(&self, store: &Store) -> Result<(), PersistError> {
        store.save(Self::STORAGE_KEY, self)
    }

    /// Load from default storage, falling back to defaults
    pub fn load() -> Self {
        match Self::load_from(&Store::open_default()) {
            Ok(settings) => settings,
            Err(e) => {
                log::warn!("Using default settings: {e}");
                Self::default()
            }
        }
    }

    pub fn save(&self) {
        match self.save_to(&Store::open_default()) {
            Ok(()) => log::info!("Settings saved"),
            Err(e) => log::warn!("Could not save settings: {e}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::tests::scratch_store;

    #[test]
    fn test_mute_silences() {
        let settings = Settings {
            muted: true,
            ..Default::default()
        };
        assert_eq!(settings.effective_volume(), 0.0);
        assert!((Settings::default().effective_volume() - 0.8).abs() < 1e-6);
    }

    #[test]
    fn test_partial_record_fills_defaults() {
        let settings: Settings = serde_json::from_str(r#"{ "reduced_motion": true }"#).unwrap();
        assert!(settings.reduced_motion);
        assert!(!settings.effective_blink());
        assert_eq!(settings.sfx_volume, 1.0);
    }

    #[test]
    fn test_round_trip_through_store() {
        let (_dir, store) = scratch_store();
        let settings = Settings {
            master_volume: 0.3,
            show_fps: true,
            ..Default::default()
        };
        settings.save_to(&store).unwrap();
        assert_eq!(Settings::load_from(&store).unwrap(), settings);
    }
}
