//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Seeded RNG only
//! - Stable iteration order (by entity ID)
//! - No rendering or platform dependencies

pub mod animation;
pub mod camera;
pub mod climber;
pub mod generation;
pub mod grip;
pub mod input;
pub mod protection;
pub mod rope;
pub mod state;
pub mod tick;

pub use camera::Camera;
pub use climber::{
    Climber, ClimberEvent, ClimberState, FallCause, GameOverReason, MoveOutcome, PlacementOutcome,
};
pub use generation::RouteGenerator;
pub use grip::{Grip, GripEvent, GripKind, GripState};
pub use input::{BelayCommand, FrameClock, HeldDirections, MoveDebouncer, MoveDirection, TickInput};
pub use protection::Protection;
pub use rope::{BelayStep, FallCatch, RopeManager, RopeNode};
pub use state::{GamePhase, GameState};
pub use tick::tick;
