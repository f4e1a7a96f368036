//! Best-score record
//!
//! A single integer, read when a session starts and written back at game over
//! or summit when beaten.

use serde::{Deserialize, Serialize};

use crate::persistence::{PersistError, Store};

/// Highest score ever reached on this device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HighScore {
    pub best: u64,
}

impl HighScore {
    /// Storage key
    const STORAGE_KEY: &'static str = "vertical_odyssey_high_score";

    pub fn new(best: u64) -> Self {
        Self { best }
    }

    /// Record a finished session's score. Returns true when it is a new best.
    pub fn submit(&mut self, score: u64) -> bool {
        if score > self.best {
            self.best = score;
            true
        } else {
            false
        }
    }

    pub fn load_from(store: &Store) -> Result<Self, PersistError> {
        Ok(store.load(Self::STORAGE_KEY)?.unwrap_or_default())
    }

    pub fn save_to(&self, store: &Store) -> Result<(), PersistError> {
        store.save(Self::STORAGE_KEY, self)
    }

    /// Load from default storage, falling back to zero on any failure
    pub fn load() -> Self {
        match Self::load_from(&Store::open_default()) {
            Ok(score) => {
                log::info!("Loaded high score {}", score.best);
                score
            }
            Err(e) => {
                log::warn!("Could not load high score, starting fresh: {e}");
                Self::default()
            }
        }
    }

    /// Save to default storage; failures are logged only
    pub fn save(&self) {
        match self.save_to(&Store::open_default()) {
            Ok(()) => log::info!("High score saved ({})", self.best),
            Err(e) => log::warn!("Could not save high score: {e}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::tests::scratch_store;

    #[test]
    fn test_submit_only_improves() {
        let mut hs = HighScore::new(50);
        assert!(!hs.submit(30));
        assert!(!hs.submit(50));
        assert_eq!(hs.best, 50);
        assert!(hs.submit(51));
        assert_eq!(hs.best, 51);
    }

    #[test]
    fn test_stored_as_plain_integer() {
        assert_eq!(serde_json::to_string(&HighScore::new(123)).unwrap(), "123");
    }

    #[test]
    fn test_round_trip_through_store() {
        let (_dir, store) = scratch_store();
        assert_eq!(HighScore::load_from(&store).unwrap(), HighScore::default());
        HighScore::new(77).save_to(&store).unwrap();
        assert_eq!(HighScore::load_from(&store).unwrap().best, 77);
    }
}
