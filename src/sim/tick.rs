//! Frame simulation tick
//!
//! Advances one frame in a fixed order: camera, grips, climber, route
//! generation, score.

use rand::Rng;

use super::climber::{ClimberEvent, MoveOutcome};
use super::grip::{GripEvent, GripState};
use super::input::{BelayCommand, HeldDirections, MoveDirection, TickInput};
use super::state::{GamePhase, GameState};
use crate::audio::SoundEffect;
use crate::consts::MAX_FRAME_DT;

/// Advance the game state by one frame of `dt` seconds
pub fn tick(state: &mut GameState, input: &TickInput, dt: f32) {
    if input.restart {
        let seed = state.rng.random::<u64>();
        *state = state.restart(seed);
        return;
    }

    // Handle pause toggle
    if input.pause {
        match state.phase {
            GamePhase::Playing => {
                state.phase = GamePhase::Paused;
                return;
            }
            GamePhase::Paused => state.phase = GamePhase::Playing,
            _ => {}
        }
    }

    // Don't tick if paused or finished
    if state.phase != GamePhase::Playing {
        return;
    }

    let dt = dt.clamp(0.0, MAX_FRAME_DT);
    state.time += dt;
    state.time_ticks += 1;
    let now = state.time;

    state.camera.follow(state.climber.pos.y);

    update_grips(state, dt, now);

    let mut input = input.clone();
    if input.autopilot {
        autopilot(state, &mut input);
    }
    apply_input(state, &input, dt, now);
    if state.phase.is_finished() {
        return;
    }

    let event = state.climber.update(
        dt,
        now,
        &mut state.grips,
        &state.tuning,
        &mut state.sounds,
    );
    match event {
        Some(ClimberEvent::Caught {
            protection_id: Some(id),
        }) => {
            if let Some(p) = state.protection_mut(id) {
                p.mark_used();
            }
        }
        Some(ClimberEvent::GameOver(reason)) => {
            state.update_score();
            state.finish(GamePhase::GameOver, Some(reason));
            return;
        }
        _ => {}
    }
    check_win(state);

    state.generator.generate_dynamic(
        &mut state.grips,
        &state.camera,
        &mut state.ids,
        &mut state.rng,
        &state.tuning,
        now,
    );
    let culled = state.generator.cull(&mut state.grips, &state.camera);
    if culled > 0 {
        log::debug!("Culled {culled} grips below the view");
    }

    state.update_score();
}

/// Proximity reveal/hide, timed lifecycle, win grip reveal
fn update_grips(state: &mut GameState, dt: f32, now: f32) {
    let climber = state.climber.pos;
    let held = state.climber.current_grip;
    let radius = state.tuning.grip_reveal_radius;

    for grip in &mut state.grips {
        if !grip.is_win {
            let near = grip.pos.distance(climber) <= radius;
            if near {
                grip.reveal(now);
            } else if !grip.seeded {
                grip.hide(now);
            }
        }

        let event = grip.update(dt, now, Some(climber), &state.tuning);
        if event == Some(GripEvent::StartedDegrading) && held == Some(grip.id) {
            state.sounds.push(SoundEffect::DegradeTick);
        }
    }

    if !state.win_revealed && state.generator.floor_reached() {
        let pre_last_used = state.grips.iter().filter(|g| g.is_pre_last).all(|g| {
            !matches!(
                g.state(),
                GripState::Hidden | GripState::Revealing | GripState::Visible
            )
        });
        if pre_last_used {
            if let Some(win) = state.grips.iter_mut().find(|g| g.is_win) {
                win.reveal(now);
                state.win_revealed = true;
                state.sounds.push(SoundEffect::WinGripRevealed);
                log::info!("Win grip {} revealed", win.id);
            }
        }
    }
}

fn apply_input(state: &mut GameState, input: &TickInput, dt: f32, now: f32) {
    let climber = &mut state.climber;
    let tuning = &state.tuning;

    if let Some(point) = input.grab_at {
        climber.grab_at(point, &mut state.grips, now, tuning, &mut state.sounds);
    }

    match input.belay {
        Some(BelayCommand::Start) => {
            if !climber.start_belay(&mut state.sounds) {
                log::debug!("Belay refused in {:?}", climber.state);
            }
        }
        Some(BelayCommand::Stop) => {
            climber.stop_belay();
        }
        None => {}
    }

    if input.place_protection {
        let ids = &mut state.ids;
        climber.place_protection(
            &mut state.grips,
            &mut state.protections,
            || ids.allocate(),
            &mut state.sounds,
        );
    }

    let interval = tuning.move_debounce_interval;
    if let Some(dir) = state.debouncer.poll(dt, input.held, interval) {
        let outcome =
            climber.move_in_direction(dir, &mut state.grips, now, tuning, &mut state.sounds);
        if outcome != MoveOutcome::Moved {
            log::debug!("Move {dir:?} refused: {outcome:?}");
        }
    }

    check_win(state);
}

fn check_win(state: &mut GameState) {
    if state.held_grip().is_some_and(|g| g.is_win) {
        state.update_score();
        state.finish(GamePhase::Won, None);
    }
}

/// Demo player: protects on cracks well above the last anchor, rests when
/// pumped, otherwise heads up (sideways when nothing is above).
pub fn autopilot(state: &GameState, input: &mut TickInput) {
    let climber = &state.climber;
    let tuning = &state.tuning;
    if !climber.is_idle() {
        return;
    }

    match state.held_grip() {
        Some(grip) => {
            let last_anchor_y = climber.rope.last_anchor().pos.y;
            if grip.offers_protection()
                && climber.protection_count > 0
                && grip.pos.y < last_anchor_y - tuning.reach * 1.5
            {
                input.place_protection = true;
                return;
            }
            let pumped = climber.pump > tuning.max_pump * 0.6;
            if pumped && grip.is_rest(tuning) && grip.state() == GripState::Active {
                return;
            }
        }
        None => {
            let last = climber.rope.last_anchor();
            if !last.is_start() && last.pos.y < climber.pos.y - tuning.head_radius * 2.0 {
                input.belay = Some(BelayCommand::Start);
                return;
            }
        }
    }

    let dir = [MoveDirection::Up, MoveDirection::Left, MoveDirection::Right]
        .into_iter()
        .find(|&d| climber.choose_directional(d, &state.grips, tuning).is_some());
    if let Some(dir) = dir {
        let mut held = HeldDirections::default();
        held.set(dir, true);
        input.held = held;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::CLIMBER_START;
    use crate::highscores::HighScore;
    use crate::sim::climber::{ClimberState, FallCause};
    use crate::sim::grip::{Grip, GripKind};
    use glam::Vec2;

    const DT: f32 = 1.0 / 60.0;

    fn up() -> TickInput {
        TickInput {
            held: HeldDirections {
                up: true,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[test]
    fn test_tick_pause() {
        let mut state = GameState::new(12345);
        let pause = TickInput {
            pause: true,
            ..Default::default()
        };
        tick(&mut state, &pause, DT);
        assert_eq!(state.phase, GamePhase::Paused);
        let time = state.time;

        // Frames while paused do nothing
        tick(&mut state, &up(), DT);
        assert_eq!(state.time, time);
        assert_eq!(state.climber.pos, CLIMBER_START);

        tick(&mut state, &pause, DT);
        assert_eq!(state.phase, GamePhase::Playing);
    }

    #[test]
    fn test_move_up_onto_seeded_grip() {
        let mut state = GameState::new(7);
        tick(&mut state, &up(), DT);
        assert!(state.climber.current_grip.is_some());
        assert!(state.climber.pos.y < CLIMBER_START.y);
        // One frame of hanging on top of the move cost
        assert!((state.climber.pump - state.tuning.pump_increase_move).abs() < 0.2);
        assert!(state.drain_sounds().contains(&SoundEffect::Grab));
    }

    #[test]
    fn test_held_key_is_debounced() {
        let mut state = GameState::new(7);
        tick(&mut state, &up(), DT);
        let first = state.climber.current_grip;
        // Still inside the debounce interval: no second move
        tick(&mut state, &up(), DT);
        assert_eq!(state.climber.current_grip, first);
    }

    #[test]
    fn test_dt_is_clamped() {
        let mut state = GameState::new(3);
        tick(&mut state, &TickInput::default(), 5.0);
        assert!((state.time - MAX_FRAME_DT).abs() < 1e-6);
    }

    #[test]
    fn test_nearby_hidden_grip_is_revealed() {
        let mut state = GameState::new(3);
        let id = state.next_entity_id();
        state.grips.push(Grip::new(
            id,
            CLIMBER_START + Vec2::new(100.0, -100.0),
            GripKind::Normal,
            12.0,
            10.0,
        ));
        tick(&mut state, &TickInput::default(), DT);
        assert_eq!(state.grip(id).map(|g| g.state()), Some(GripState::Revealing));
    }

    #[test]
    fn test_unprotected_fall_ends_run() {
        let mut state = GameState::new(5).with_high_score(HighScore::new(0));
        state.climber.pos = Vec2::new(400.0, 300.0);
        state.update_score();
        state.climber.start_fall(
            FallCause::LetGo,
            &mut state.grips,
            0.0,
            &state.tuning,
            &mut state.sounds,
        );
        for _ in 0..600 {
            tick(&mut state, &TickInput::default(), DT);
            if state.phase.is_finished() {
                break;
            }
        }
        assert_eq!(state.phase, GamePhase::GameOver);
        assert!(state.game_over_reason.is_some());
        assert!(state.new_high_score);
        assert_eq!(state.high_score.best, state.score);
    }

    #[test]
    fn test_catch_marks_protection_used() {
        let mut state = GameState::new(9);
        let crack_id = state.next_entity_id();
        let crack = Grip::new(crack_id, Vec2::new(400.0, 800.0), GripKind::Crack, 14.0, 10.0)
            .with_initial_state(GripState::Visible, 0.0);
        state.grips.push(crack);
        state.climber.pos = Vec2::new(400.0, 800.0);
        state.climber.move_to_grip(crack_id, &mut state.grips, 0.0, &state.tuning, &mut state.sounds);
        tick(
            &mut state,
            &TickInput {
                place_protection: true,
                ..Default::default()
            },
            DT,
        );
        assert_eq!(state.protections.len(), 1);

        state.climber.pos = Vec2::new(400.0, 700.0);
        state.climber.start_fall(
            FallCause::LetGo,
            &mut state.grips,
            state.time,
            &state.tuning,
            &mut state.sounds,
        );
        for _ in 0..120 {
            tick(&mut state, &TickInput::default(), DT);
            if matches!(state.climber.state, ClimberState::Recovering { .. }) {
                break;
            }
        }
        assert!(state.climber.is_recovering());
        assert!(state.protections[0].used());
    }

    #[test]
    fn test_reaching_win_grip_wins() {
        let mut state = GameState::new(4);
        let id = state.next_entity_id();
        let mut win = Grip::new(id, CLIMBER_START + Vec2::new(0.0, -20.0), GripKind::Normal, 14.0, 10.0)
            .with_initial_state(GripState::Visible, 0.0);
        win.is_win = true;
        state.grips.push(win);
        tick(&mut state, &up(), DT);
        assert_eq!(state.phase, GamePhase::Won);
        assert!(state.drain_sounds().contains(&SoundEffect::Win));
    }

    #[test]
    fn test_restart_builds_new_session() {
        let mut state = GameState::new(1).with_high_score(HighScore::new(40));
        tick(&mut state, &up(), DT);
        tick(
            &mut state,
            &TickInput {
                restart: true,
                ..Default::default()
            },
            DT,
        );
        assert_eq!(state.phase, GamePhase::Playing);
        assert_eq!(state.climber.pos, CLIMBER_START);
        assert_eq!(state.high_score.best, 40);
        assert_eq!(state.time, 0.0);
    }

    #[test]
    fn test_autopilot_climbs() {
        let mut state = GameState::new(2024);
        let input = TickInput {
            autopilot: true,
            ..Default::default()
        };
        for _ in 0..120 {
            tick(&mut state, &input, DT);
        }
        assert!(state.score > 0);
    }

    #[test]
    fn test_determinism() {
        // Two states with same seed should produce identical results
        let mut state1 = GameState::new(99999);
        let mut state2 = GameState::new(99999);
        let input = TickInput {
            autopilot: true,
            ..Default::default()
        };

        for _ in 0..1200 {
            tick(&mut state1, &input, DT);
            tick(&mut state2, &input, DT);
        }

        assert_eq!(state1.time_ticks, state2.time_ticks);
        assert_eq!(state1.grips.len(), state2.grips.len());
        assert_eq!(state1.climber.pos, state2.climber.pos);
        assert_eq!(state1.score, state2.score);
        assert_eq!(state1.phase, state2.phase);
    }
}
