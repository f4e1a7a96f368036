//! Game session state
//!
//! Everything one run needs lives here and is passed explicitly into each
//! component's update; there are no globals.

use rand::SeedableRng;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::camera::Camera;
use super::climber::{Climber, GameOverReason};
use super::generation::RouteGenerator;
use super::grip::Grip;
use super::input::MoveDebouncer;
use super::protection::Protection;
use crate::audio::SoundEffect;
use crate::consts::*;
use crate::highscores::HighScore;
use crate::tuning::Tuning;

/// Current phase of gameplay
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GamePhase {
    /// Active gameplay
    Playing,
    /// Game is paused
    Paused,
    /// Run ended by a fall
    GameOver,
    /// Win grip reached
    Won,
}

impl GamePhase {
    pub fn is_finished(self) -> bool {
        matches!(self, GamePhase::GameOver | GamePhase::Won)
    }
}

/// Monotonic id source shared by grips and protections
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityIds {
    next: u32,
}

impl Default for EntityIds {
    fn default() -> Self {
        Self { next: 1 }
    }
}

impl EntityIds {
    pub fn allocate(&mut self) -> u32 {
        let id = self.next;
        self.next += 1;
        id
    }
}

/// Complete session state (deterministic for a given seed and input stream)
#[derive(Debug, Clone)]
pub struct GameState {
    /// Run seed for reproducibility
    pub seed: u64,
    pub rng: Pcg32,
    pub tuning: Tuning,
    pub phase: GamePhase,
    /// Live grips (sorted by id)
    pub grips: Vec<Grip>,
    pub protections: Vec<Protection>,
    pub climber: Climber,
    pub camera: Camera,
    pub generator: RouteGenerator,
    pub score: u64,
    /// Highest (smallest) climber Y reached
    pub best_y: f32,
    pub high_score: HighScore,
    /// Set when this run beat the stored high score
    pub new_high_score: bool,
    pub game_over_reason: Option<GameOverReason>,
    /// Win grip has been revealed
    pub win_revealed: bool,
    /// Simulation time in seconds
    pub time: f32,
    pub time_ticks: u64,
    pub debouncer: MoveDebouncer,
    /// Effects raised since the frontend last drained them
    pub sounds: Vec<SoundEffect>,
    pub(crate) ids: EntityIds,
}

impl GameState {
    /// Create a new game state with the given seed
    pub fn new(seed: u64) -> Self {
        Self::with_tuning(seed, Tuning::default())
    }

    pub fn with_tuning(seed: u64, tuning: Tuning) -> Self {
        let mut state = Self {
            seed,
            rng: Pcg32::seed_from_u64(seed),
            phase: GamePhase::Playing,
            grips: Vec::new(),
            protections: Vec::new(),
            climber: Climber::new(CLIMBER_START, ROUTE_START, &tuning),
            camera: Camera::new(WORLD_HEIGHT),
            generator: RouteGenerator::new(),
            score: 0,
            best_y: CLIMBER_START.y,
            high_score: HighScore::default(),
            new_high_score: false,
            game_over_reason: None,
            win_revealed: false,
            time: 0.0,
            time_ticks: 0,
            debouncer: MoveDebouncer::default(),
            sounds: Vec::new(),
            ids: EntityIds::default(),
            tuning,
        };
        state.generator.generate_initial(
            &mut state.grips,
            &mut state.ids,
            &mut state.rng,
            &state.tuning,
            0.0,
        );
        log::info!("New session, seed {seed}, {} grips seeded", state.grips.len());
        state
    }

    /// Carry the stored best score into this session
    pub fn with_high_score(mut self, high_score: HighScore) -> Self {
        self.high_score = high_score;
        self
    }

    /// Allocate a new entity ID
    pub fn next_entity_id(&mut self) -> u32 {
        self.ids.allocate()
    }

    pub fn grip(&self, id: u32) -> Option<&Grip> {
        self.grips.iter().find(|g| g.id == id)
    }

    pub fn held_grip(&self) -> Option<&Grip> {
        self.climber.current_grip.and_then(|id| self.grip(id))
    }

    pub fn protection_mut(&mut self, id: u32) -> Option<&mut Protection> {
        self.protections.iter_mut().find(|p| p.id == id)
    }

    /// Height score for a best Y
    pub fn score_for(best_y: f32) -> u64 {
        ((CLIMBER_START.y - best_y) / SCORE_UNIT).floor().max(0.0) as u64
    }

    /// Track the best height and refresh the score
    pub fn update_score(&mut self) {
        if self.climber.pos.y < self.best_y {
            self.best_y = self.climber.pos.y;
            self.score = Self::score_for(self.best_y);
        }
    }

    /// End the run; submits the score to the high score
    pub fn finish(&mut self, phase: GamePhase, reason: Option<GameOverReason>) {
        if self.phase.is_finished() {
            return;
        }
        self.phase = phase;
        self.game_over_reason = reason;
        self.sounds.push(match phase {
            GamePhase::Won => SoundEffect::Win,
            _ => SoundEffect::GameOver,
        });
        self.new_high_score = self.high_score.submit(self.score);
        if self.new_high_score {
            self.sounds.push(SoundEffect::HighScore);
        }
        log::info!(
            "Run over ({phase:?}, {reason:?}): score {}, best {}{}",
            self.score,
            self.high_score.best,
            if self.new_high_score { " (new record)" } else { "" }
        );
    }

    /// Take the effects raised since the last call
    pub fn drain_sounds(&mut self) -> Vec<SoundEffect> {
        std::mem::take(&mut self.sounds)
    }

    /// Fresh session with a new seed, keeping tuning and high score
    pub fn restart(&self, seed: u64) -> Self {
        Self::with_tuning(seed, self.tuning.clone()).with_high_score(self.high_score)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_session() {
        let state = GameState::new(42);
        assert_eq!(state.phase, GamePhase::Playing);
        assert_eq!(state.grips.len(), state.tuning.initial_batch_size);
        assert_eq!(state.climber.pos, CLIMBER_START);
        assert_eq!(state.climber.protection_count, 3);
        assert_eq!(state.score, 0);
        assert!(state.grips.windows(2).all(|w| w[0].id < w[1].id));
    }

    #[test]
    fn test_ids_are_unique() {
        let mut state = GameState::new(1);
        let last = state.grips.last().map_or(0, |g| g.id);
        let a = state.next_entity_id();
        let b = state.next_entity_id();
        assert!(a > last);
        assert_eq!(b, a + 1);
    }

    #[test]
    fn test_score_tracks_best_height() {
        let mut state = GameState::new(1);
        state.climber.pos.y = CLIMBER_START.y - 125.0;
        state.update_score();
        assert_eq!(state.score, 12);
        // Falling back does not lose score
        state.climber.pos.y = CLIMBER_START.y;
        state.update_score();
        assert_eq!(state.score, 12);
    }

    #[test]
    fn test_finish_submits_high_score_once() {
        let mut state = GameState::new(1).with_high_score(HighScore::new(5));
        state.score = 9;
        state.finish(GamePhase::GameOver, Some(GameOverReason::FellToGround));
        assert!(state.new_high_score);
        assert_eq!(state.high_score.best, 9);
        let sounds = state.drain_sounds();
        assert_eq!(sounds, vec![SoundEffect::GameOver, SoundEffect::HighScore]);

        state.finish(GamePhase::Won, None);
        assert_eq!(state.phase, GamePhase::GameOver);
        assert!(state.drain_sounds().is_empty());
    }

    #[test]
    fn test_restart_keeps_high_score() {
        let state = GameState::new(1).with_high_score(HighScore::new(77));
        let next = state.restart(2);
        assert_eq!(next.seed, 2);
        assert_eq!(next.high_score.best, 77);
        assert_eq!(next.phase, GamePhase::Playing);
    }
}
