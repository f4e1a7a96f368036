//! Vertical Odyssey entry point
//!
//! Handles platform-specific initialization and runs the game loop.

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

#[cfg(target_arch = "wasm32")]
mod wasm_game {
    use std::cell::RefCell;
    use std::rc::Rc;
    use wasm_bindgen::prelude::*;
    use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement, KeyboardEvent, MouseEvent};

    use glam::Vec2;
    use vertical_odyssey::audio::{AudioManager, AudioSink};
    use vertical_odyssey::consts::*;
    use vertical_odyssey::render::{CanvasRenderer, RenderSink, RenderSnapshot};
    use vertical_odyssey::sim::{
        BelayCommand, FrameClock, GamePhase, GameState, HeldDirections, MoveDirection, TickInput,
        tick,
    };
    use vertical_odyssey::{HighScore, Settings};

    /// Game instance holding all state
    struct Game {
        state: GameState,
        renderer: CanvasRenderer,
        /// Second handle on the canvas for the FPS overlay
        overlay: CanvasRenderingContext2d,
        audio: AudioManager,
        settings: Settings,
        clock: FrameClock,
        input: TickInput,
        held: HeldDirections,
        autopilot: bool,
        // Track phase to save the high score once per run
        last_phase: GamePhase,
        // FPS tracking
        frame_times: [f64; 60],
        frame_index: usize,
        fps: u32,
    }

    impl Game {
        fn new(seed: u64, ctx: CanvasRenderingContext2d) -> Self {
            let settings = Settings::load();
            let mut audio = AudioManager::new();
            audio.set_master_volume(settings.master_volume);
            audio.set_sfx_volume(settings.sfx_volume);
            audio.set_muted(settings.muted);
            let state = GameState::new(seed).with_high_score(HighScore::load());
            Self {
                last_phase: state.phase,
                state,
                renderer: CanvasRenderer::new(ctx.clone()),
                overlay: ctx,
                audio,
                settings,
                clock: FrameClock::default(),
                input: TickInput::default(),
                held: HeldDirections::default(),
                autopilot: false,
                frame_times: [0.0; 60],
                frame_index: 0,
                fps: 0,
            }
        }

        /// Run one simulation tick and draw it
        fn frame(&mut self, time: f64) {
            let dt = self.clock.advance(time);
            self.input.held = self.held;
            self.input.autopilot = self.autopilot;
            let input = self.input.clone();
            tick(&mut self.state, &input, dt);

            // Clear one-shot inputs after processing
            self.input.place_protection = false;
            self.input.belay = None;
            self.input.grab_at = None;
            self.input.pause = false;
            self.input.restart = false;

            for effect in self.state.drain_sounds() {
                self.audio.play(effect);
            }

            if self.state.phase.is_finished()
                && !self.last_phase.is_finished()
                && self.state.new_high_score
            {
                self.state.high_score.save();
            }
            self.last_phase = self.state.phase;

            let snapshot = RenderSnapshot::capture(&self.state, &self.settings);
            self.renderer.draw(&snapshot);

            self.track_fps(time);
            if self.settings.show_fps {
                self.overlay.set_fill_style_str("#9f9");
                self.overlay.set_font("14px monospace");
                let _ = self.overlay.fill_text(
                    &format!("{} fps", self.fps),
                    (WORLD_WIDTH - 70.0) as f64,
                    (WORLD_HEIGHT - 12.0) as f64,
                );
            }
        }

        fn track_fps(&mut self, time: f64) {
            self.frame_times[self.frame_index] = time;
            self.frame_index = (self.frame_index + 1) % 60;
            // Oldest sample is the one about to be overwritten
            let oldest = self.frame_times[self.frame_index];
            if oldest > 0.0 && time > oldest {
                self.fps = (59.0 * 1000.0 / (time - oldest)).round() as u32;
            }
        }

        fn toggle_belay(&mut self) {
            self.input.belay = Some(if self.state.climber.is_belaying() {
                BelayCommand::Stop
            } else {
                BelayCommand::Start
            });
        }

        fn toggle_mute(&mut self) {
            self.settings.muted = !self.settings.muted;
            self.audio.set_muted(self.settings.muted);
            self.settings.save();
            log::info!("Muted: {}", self.settings.muted);
        }

        /// Convert a client-space click to world space
        fn click_to_world(&self, canvas: &HtmlCanvasElement, x: f64, y: f64) -> Option<Vec2> {
            let rect = canvas.get_bounding_client_rect();
            if rect.width() <= 0.0 || rect.height() <= 0.0 {
                return None;
            }
            let sx = WORLD_WIDTH as f64 / rect.width();
            let sy = WORLD_HEIGHT as f64 / rect.height();
            let screen_x = ((x - rect.left()) * sx) as f32;
            let screen_y = ((y - rect.top()) * sy) as f32;
            Some(Vec2::new(screen_x, self.state.camera.to_world(screen_y)))
        }
    }

    fn direction_for_key(key: &str) -> Option<MoveDirection> {
        match key {
            "ArrowUp" | "w" | "W" => Some(MoveDirection::Up),
            "ArrowDown" | "s" | "S" => Some(MoveDirection::Down),
            "ArrowLeft" | "a" | "A" => Some(MoveDirection::Left),
            "ArrowRight" | "d" | "D" => Some(MoveDirection::Right),
            _ => None,
        }
    }

    pub fn run() {
        console_error_panic_hook::set_once();
        if let Err(e) = console_log::init_with_level(log::Level::Info) {
            web_sys::console::error_1(&format!("Failed to init logger: {e}").into());
        }

        log::info!("Vertical Odyssey starting...");

        let Some(window) = web_sys::window() else {
            log::error!("No window");
            return;
        };
        let Some(document) = window.document() else {
            log::error!("No document");
            return;
        };

        // Hide loading indicator
        if let Some(loading) = document.get_element_by_id("loading") {
            let _ = loading.set_attribute("class", "hidden");
        }

        let Some(canvas) = document
            .get_element_by_id("canvas")
            .and_then(|el| el.dyn_into::<HtmlCanvasElement>().ok())
        else {
            log::error!("No canvas element");
            return;
        };

        // Draw in world units; CSS scales the element
        canvas.set_width(WORLD_WIDTH as u32);
        canvas.set_height(WORLD_HEIGHT as u32);

        let Some(ctx) = canvas
            .get_context("2d")
            .ok()
            .flatten()
            .and_then(|ctx| ctx.dyn_into::<CanvasRenderingContext2d>().ok())
        else {
            log::error!("Canvas 2D context unavailable");
            return;
        };

        // Initialize game
        let seed = js_sys::Date::now() as u64;
        let game = Rc::new(RefCell::new(Game::new(seed, ctx)));

        log::info!("Game initialized with seed: {}", seed);

        // Set up input handlers
        setup_input_handlers(&window, &canvas, game.clone());

        // Set up restart button
        setup_restart_button(&document, game.clone());

        // Set up auto-pause on visibility change
        setup_auto_pause(&window, &document, game.clone());

        // Start game loop
        request_animation_frame(game);

        log::info!("Vertical Odyssey running!");
    }

    fn setup_input_handlers(
        window: &web_sys::Window,
        canvas: &HtmlCanvasElement,
        game: Rc<RefCell<Game>>,
    ) {
        // Mouse click - grab the grip under the cursor
        {
            let game = game.clone();
            let canvas_clone = canvas.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |event: MouseEvent| {
                let mut g = game.borrow_mut();
                // Browsers only allow audio after a user gesture
                g.audio.resume();
                g.input.grab_at = g.click_to_world(
                    &canvas_clone,
                    event.client_x() as f64,
                    event.client_y() as f64,
                );
            });
            let _ = canvas
                .add_event_listener_with_callback("mousedown", closure.as_ref().unchecked_ref());
            closure.forget();
        }

        // Key down
        {
            let game = game.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |event: KeyboardEvent| {
                let key = event.key();
                let mut g = game.borrow_mut();
                g.audio.resume();
                if let Some(dir) = direction_for_key(&key) {
                    event.prevent_default();
                    g.held.set(dir, true);
                    return;
                }
                if event.repeat() {
                    return;
                }
                match key.as_str() {
                    "p" | "P" => g.input.place_protection = true,
                    "b" | "B" => g.toggle_belay(),
                    "Escape" => g.input.pause = true,
                    "r" | "R" => g.input.restart = true,
                    "m" | "M" => g.toggle_mute(),
                    "i" | "I" => {
                        g.autopilot = !g.autopilot;
                        log::info!("Autopilot: {}", g.autopilot);
                    }
                    _ => {}
                }
            });
            let _ = window
                .add_event_listener_with_callback("keydown", closure.as_ref().unchecked_ref());
            closure.forget();
        }

        // Key up
        {
            let closure = Closure::<dyn FnMut(_)>::new(move |event: KeyboardEvent| {
                if let Some(dir) = direction_for_key(&event.key()) {
                    game.borrow_mut().held.set(dir, false);
                }
            });
            let _ = window
                .add_event_listener_with_callback("keyup", closure.as_ref().unchecked_ref());
            closure.forget();
        }
    }

    fn request_animation_frame(game: Rc<RefCell<Game>>) {
        let Some(window) = web_sys::window() else {
            return;
        };
        let closure = Closure::once(move |time: f64| {
            game_loop(game, time);
        });
        let _ = window.request_animation_frame(closure.as_ref().unchecked_ref());
        closure.forget();
    }

    fn game_loop(game: Rc<RefCell<Game>>, time: f64) {
        game.borrow_mut().frame(time);
        request_animation_frame(game);
    }

    fn setup_restart_button(document: &web_sys::Document, game: Rc<RefCell<Game>>) {
        if let Some(btn) = document.get_element_by_id("restart-btn") {
            let closure = Closure::<dyn FnMut(_)>::new(move |_event: MouseEvent| {
                let mut g = game.borrow_mut();
                g.input.restart = true;
                g.held = HeldDirections::default();
                log::info!("Restart requested");
            });
            let _ = btn.add_event_listener_with_callback("click", closure.as_ref().unchecked_ref());
            closure.forget();
        }
    }

    fn setup_auto_pause(
        window: &web_sys::Window,
        document: &web_sys::Document,
        game: Rc<RefCell<Game>>,
    ) {
        // Visibility change (tab switch, minimize)
        {
            let game = game.clone();
            let document_clone = document.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |_event: web_sys::Event| {
                let mut g = game.borrow_mut();
                g.clock.reset();
                if document_clone.visibility_state() == web_sys::VisibilityState::Hidden
                    && g.state.phase == GamePhase::Playing
                {
                    g.input.pause = true;
                    log::info!("Auto-paused (tab hidden)");
                }
            });
            let _ = document.add_event_listener_with_callback(
                "visibilitychange",
                closure.as_ref().unchecked_ref(),
            );
            closure.forget();
        }

        // Window blur (click outside)
        {
            let game = game.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |_event: web_sys::FocusEvent| {
                let mut g = game.borrow_mut();
                g.held = HeldDirections::default();
                if g.settings.mute_on_blur {
                    g.audio.set_muted(true);
                }
                if g.state.phase == GamePhase::Playing {
                    g.input.pause = true;
                    log::info!("Auto-paused (window blur)");
                }
            });
            let _ = window.add_event_listener_with_callback("blur", closure.as_ref().unchecked_ref());
            closure.forget();
        }

        // Focus restores the stored mute preference
        {
            let closure = Closure::<dyn FnMut(_)>::new(move |_event: web_sys::FocusEvent| {
                let mut g = game.borrow_mut();
                let muted = g.settings.muted;
                g.audio.set_muted(muted);
            });
            let _ =
                window.add_event_listener_with_callback("focus", closure.as_ref().unchecked_ref());
            closure.forget();
        }
    }
}

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub fn wasm_main() {
    wasm_game::run();
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    use std::time::{SystemTime, UNIX_EPOCH};

    use vertical_odyssey::audio::{AudioSink, NullAudio};
    use vertical_odyssey::render::{LogRenderer, RenderSink, RenderSnapshot};
    use vertical_odyssey::sim::{GameState, TickInput, tick};
    use vertical_odyssey::{HighScore, Settings};

    const DT: f32 = 1.0 / 60.0;
    const MAX_FRAMES: u64 = 60 * 180;

    env_logger::init();
    log::info!("Vertical Odyssey (native) starting...");
    log::info!("Running a headless autopilot session - build for wasm32 to play");

    let seed = std::env::var("VERTICAL_ODYSSEY_SEED")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .unwrap_or_else(|| {
            SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_millis() as u64)
                .unwrap_or_default()
        });

    let settings = Settings::load();
    let mut state = GameState::new(seed).with_high_score(HighScore::load());
    let mut renderer = LogRenderer::new(60);
    let mut audio = NullAudio;
    let input = TickInput {
        autopilot: true,
        ..Default::default()
    };

    for _ in 0..MAX_FRAMES {
        tick(&mut state, &input, DT);
        for effect in state.drain_sounds() {
            log::debug!("sound: {effect:?}");
            audio.play(effect);
        }
        renderer.draw(&RenderSnapshot::capture(&state, &settings));
        if state.phase.is_finished() {
            break;
        }
    }

    log::info!(
        "Session over after {} frames: {:?}, score {}, best {}",
        renderer.frames(),
        state.phase,
        state.score,
        state.high_score.best
    );
    if state.new_high_score {
        state.high_score.save();
    }
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // WASM entry point is wasm_main, this is just to satisfy the compiler
}
