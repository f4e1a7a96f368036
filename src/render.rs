//! Render payload
//!
//! The simulation never draws. Each frame the frontend takes a
//! `RenderSnapshot` of the session and hands it to a `RenderSink`: the canvas
//! renderer in the browser, a log line natively.

use glam::Vec2;
use serde::Serialize;

use crate::Rgb;
use crate::settings::Settings;
use crate::sim::animation::FaceState;
use crate::sim::grip::{GripKind, GripState};
use crate::sim::state::{GamePhase, GameState};

/// Coarse climber pose for drawing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Pose {
    OnGrip,
    Dangling,
    Belaying,
    Falling,
    Recovering,
}

#[derive(Debug, Clone, Serialize)]
pub struct ClimberView {
    pub pos: Vec2,
    pub pose: Pose,
    /// -1 (left) .. 1 (right)
    pub head_turn: f32,
    pub face: FaceState,
    /// 0..1 hand-over-hand phase while belaying
    pub belay_phase: f32,
    pub pump_ratio: f32,
}

#[derive(Debug, Clone, Serialize)]
pub struct GripView {
    pub id: u32,
    pub pos: Vec2,
    pub size: f32,
    pub kind: GripKind,
    pub angle: f32,
    pub state: GripState,
    pub reachable: bool,
    pub color: Rgb,
    pub alpha: f32,
    pub is_win: bool,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct ProtectionView {
    pub pos: Vec2,
    pub used: bool,
}

/// Heads-up display values
#[derive(Debug, Clone, Serialize)]
pub struct Hud {
    pub score: u64,
    pub high_score: u64,
    pub pump: f32,
    pub max_pump: f32,
    pub protections_left: u32,
    pub phase: GamePhase,
    pub new_high_score: bool,
}

/// Everything a frame needs, in world coordinates
#[derive(Debug, Clone, Serialize)]
pub struct RenderSnapshot {
    pub camera_top: f32,
    pub view_height: f32,
    pub climber: ClimberView,
    pub grips: Vec<GripView>,
    pub protections: Vec<ProtectionView>,
    /// Polyline from the ground anchor to the climber
    pub rope: Vec<Vec2>,
    pub hud: Hud,
}

impl RenderSnapshot {
    pub fn capture(state: &GameState, settings: &Settings) -> Self {
        let blink = settings.effective_blink();
        let climber = &state.climber;
        let pose = if climber.is_falling() {
            Pose::Falling
        } else if climber.is_recovering() {
            Pose::Recovering
        } else if climber.is_belaying() {
            Pose::Belaying
        } else if climber.current_grip.is_some() {
            Pose::OnGrip
        } else {
            Pose::Dangling
        };
        let head_turn = if settings.reduced_motion {
            0.0
        } else {
            climber.animation.head_turn()
        };

        let top = state.camera.top_y - state.camera.view_height * 0.25;
        let bottom = state.camera.bottom_y() + state.camera.view_height * 0.25;
        let grips = state
            .grips
            .iter()
            .filter(|g| g.pos.y >= top && g.pos.y <= bottom)
            .map(|g| {
                let (color, alpha) = g.display_color(&state.tuning, blink);
                GripView {
                    id: g.id,
                    pos: g.pos,
                    size: g.size,
                    kind: g.kind,
                    angle: g.angle,
                    state: g.state(),
                    reachable: g.reachable,
                    color,
                    alpha,
                    is_win: g.is_win,
                }
            })
            .collect();

        Self {
            camera_top: state.camera.top_y,
            view_height: state.camera.view_height,
            climber: ClimberView {
                pos: climber.pos,
                pose,
                head_turn,
                face: climber.animation.face,
                belay_phase: climber.animation.belay_phase,
                pump_ratio: climber.pump / state.tuning.max_pump.max(f32::EPSILON),
            },
            grips,
            protections: state
                .protections
                .iter()
                .map(|p| ProtectionView {
                    pos: p.pos,
                    used: p.used(),
                })
                .collect(),
            rope: climber.rope.path(climber.pos),
            hud: Hud {
                score: state.score,
                high_score: state.high_score.best.max(state.score),
                pump: climber.pump,
                max_pump: state.tuning.max_pump,
                protections_left: climber.protection_count,
                phase: state.phase,
                new_high_score: state.new_high_score,
            },
        }
    }

    /// World Y to screen Y
    pub fn to_screen(&self, world: Vec2) -> Vec2 {
        Vec2::new(world.x, world.y - self.camera_top)
    }
}

/// Something that can draw a frame
pub trait RenderSink {
    fn draw(&mut self, snapshot: &RenderSnapshot);
}

/// Headless sink: logs a HUD line every `every` frames
#[derive(Debug, Clone)]
pub struct LogRenderer {
    every: u64,
    frames: u64,
}

impl LogRenderer {
    pub fn new(every: u64) -> Self {
        Self {
            every: every.max(1),
            frames: 0,
        }
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }
}

impl RenderSink for LogRenderer {
    fn draw(&mut self, snapshot: &RenderSnapshot) {
        if self.frames % self.every == 0 {
            let hud = &snapshot.hud;
            log::info!(
                "{:?} at ({:.0}, {:.0}) score {} pump {:.0}/{:.0} protection {} grips {}",
                snapshot.climber.pose,
                snapshot.climber.pos.x,
                snapshot.climber.pos.y,
                hud.score,
                hud.pump,
                hud.max_pump,
                hud.protections_left,
                snapshot.grips.len()
            );
        }
        self.frames += 1;
    }
}

#[cfg(target_arch = "wasm32")]
pub use canvas::CanvasRenderer;

#[cfg(target_arch = "wasm32")]
mod canvas {
    use std::f64::consts::{PI, TAU};

    use super::{Pose, RenderSink, RenderSnapshot};
    use crate::consts::{WORLD_HEIGHT, WORLD_WIDTH};
    use crate::sim::grip::GripKind;
    use crate::sim::state::GamePhase;
    use web_sys::CanvasRenderingContext2d;

    const ROCK: &str = "#3b3733";
    const ROPE: &str = "#d9534f";
    const PROTECTION: &str = "#5bc0de";
    const PROTECTION_USED: &str = "#777";
    const CLIMBER: &str = "#f0ad4e";
    const HUD_TEXT: &str = "#eee";

    /// Canvas 2D renderer
    pub struct CanvasRenderer {
        ctx: CanvasRenderingContext2d,
    }

    impl CanvasRenderer {
        pub fn new(ctx: CanvasRenderingContext2d) -> Self {
            Self { ctx }
        }

        fn background(&self, snap: &RenderSnapshot) {
            let ctx = &self.ctx;
            ctx.set_fill_style_str(ROCK);
            ctx.fill_rect(0.0, 0.0, WORLD_WIDTH as f64, WORLD_HEIGHT as f64);
            // Strata lines scroll with the wall
            ctx.set_stroke_style_str("rgba(255,255,255,0.04)");
            ctx.set_line_width(2.0);
            let offset = (snap.camera_top as f64).rem_euclid(80.0);
            let mut y = -offset;
            while y < WORLD_HEIGHT as f64 {
                ctx.begin_path();
                ctx.move_to(0.0, y);
                ctx.line_to(WORLD_WIDTH as f64, y + 12.0);
                ctx.stroke();
                y += 80.0;
            }
        }

        fn grips(&self, snap: &RenderSnapshot) {
            let ctx = &self.ctx;
            for grip in &snap.grips {
                let p = snap.to_screen(grip.pos);
                ctx.set_global_alpha(grip.alpha as f64);
                ctx.set_fill_style_str(&grip.color.to_css());
                ctx.save();
                ctx.translate(p.x as f64, p.y as f64).ok();
                ctx.rotate(grip.angle as f64).ok();
                ctx.begin_path();
                match grip.kind {
                    GripKind::Normal => {
                        ctx.arc(0.0, 0.0, grip.size as f64 / 2.0, 0.0, TAU).ok();
                        ctx.fill();
                    }
                    GripKind::Crack => {
                        ctx.set_stroke_style_str(&grip.color.to_css());
                        ctx.set_line_width(4.0);
                        ctx.move_to(-grip.size as f64 / 2.0, 0.0);
                        ctx.line_to(0.0, 2.0);
                        ctx.line_to(grip.size as f64 / 2.0, -1.0);
                        ctx.stroke();
                    }
                }
                if grip.reachable && !grip.is_win {
                    ctx.set_stroke_style_str("rgba(255,255,255,0.5)");
                    ctx.set_line_width(1.0);
                    ctx.begin_path();
                    ctx.arc(0.0, 0.0, grip.size as f64 / 2.0 + 3.0, 0.0, TAU).ok();
                    ctx.stroke();
                }
                ctx.restore();
            }
            ctx.set_global_alpha(1.0);
        }

        fn rope(&self, snap: &RenderSnapshot) {
            let ctx = &self.ctx;
            ctx.set_stroke_style_str(ROPE);
            ctx.set_line_width(2.0);
            ctx.begin_path();
            for (i, point) in snap.rope.iter().enumerate() {
                let p = snap.to_screen(*point);
                if i == 0 {
                    ctx.move_to(p.x as f64, p.y as f64);
                } else {
                    ctx.line_to(p.x as f64, p.y as f64);
                }
            }
            ctx.stroke();

            for protection in &snap.protections {
                let p = snap.to_screen(protection.pos);
                ctx.set_fill_style_str(if protection.used {
                    PROTECTION_USED
                } else {
                    PROTECTION
                });
                ctx.fill_rect(p.x as f64 - 4.0, p.y as f64 - 4.0, 8.0, 8.0);
            }
        }

        fn climber(&self, snap: &RenderSnapshot) {
            let ctx = &self.ctx;
            let c = &snap.climber;
            let p = snap.to_screen(c.pos);
            let (x, y) = (p.x as f64, p.y as f64);

            // Body hangs below the hands
            ctx.set_stroke_style_str(CLIMBER);
            ctx.set_line_width(3.0);
            ctx.begin_path();
            ctx.move_to(x, y);
            ctx.line_to(x, y + 28.0);
            ctx.stroke();

            let arms = match c.pose {
                Pose::Belaying => (c.belay_phase as f64 * TAU).sin() * 6.0,
                Pose::Falling => -8.0,
                _ => 0.0,
            };
            ctx.begin_path();
            ctx.move_to(x - 8.0, y - 4.0 + arms);
            ctx.line_to(x, y + 8.0);
            ctx.line_to(x + 8.0, y - 4.0 - arms);
            ctx.stroke();

            // Head with a pump tint
            let head_y = y - 2.0;
            let red = 240.0;
            let green = 200.0 * (1.0 - c.pump_ratio.clamp(0.0, 1.0) as f64 * 0.7);
            ctx.set_fill_style_str(&format!("rgb({red:.0}, {green:.0}, 120)"));
            ctx.begin_path();
            ctx.arc(x + c.head_turn as f64 * 3.0, head_y, 8.0, 0.0, TAU).ok();
            ctx.fill();
            if c.pose == Pose::Falling {
                ctx.set_stroke_style_str(HUD_TEXT);
                ctx.begin_path();
                ctx.arc(x, head_y, 11.0, PI, TAU).ok();
                ctx.stroke();
            }
        }

        fn hud(&self, snap: &RenderSnapshot) {
            let ctx = &self.ctx;
            let hud = &snap.hud;
            ctx.set_fill_style_str(HUD_TEXT);
            ctx.set_font("20px monospace");
            ctx.fill_text(&format!("Height {}", hud.score), 16.0, 32.0).ok();
            ctx.fill_text(&format!("Best {}", hud.high_score), 16.0, 58.0).ok();
            ctx.fill_text(&format!("Pro x{}", hud.protections_left), 16.0, 84.0).ok();

            // Pump bar
            let ratio = (hud.pump / hud.max_pump.max(f32::EPSILON)).clamp(0.0, 1.0) as f64;
            let w = 200.0;
            ctx.set_fill_style_str("rgba(255,255,255,0.2)");
            ctx.fill_rect(WORLD_WIDTH as f64 - w - 16.0, 16.0, w, 14.0);
            ctx.set_fill_style_str(if ratio > 0.75 { "#d9534f" } else { "#5cb85c" });
            ctx.fill_rect(WORLD_WIDTH as f64 - w - 16.0, 16.0, w * ratio, 14.0);

            let banner = match hud.phase {
                GamePhase::Playing => None,
                GamePhase::Paused => Some("PAUSED"),
                GamePhase::GameOver => Some("GAME OVER - press R"),
                GamePhase::Won => Some("SUMMIT! - press R"),
            };
            if let Some(text) = banner {
                ctx.set_font("40px monospace");
                ctx.set_text_align("center");
                ctx.fill_text(text, WORLD_WIDTH as f64 / 2.0, WORLD_HEIGHT as f64 / 2.0).ok();
                if hud.new_high_score {
                    ctx.set_font("24px monospace");
                    ctx.fill_text(
                        "New high score!",
                        WORLD_WIDTH as f64 / 2.0,
                        WORLD_HEIGHT as f64 / 2.0 + 40.0,
                    )
                    .ok();
                }
                ctx.set_text_align("start");
            }
        }
    }

    impl RenderSink for CanvasRenderer {
        fn draw(&mut self, snap: &RenderSnapshot) {
            self.background(snap);
            self.grips(snap);
            self.rope(snap);
            self.climber(snap);
            self.hud(snap);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::grip::{GRIP_COLOR_HIDDEN, HIDDEN_ALPHA};
    use crate::sim::{TickInput, tick};

    #[test]
    fn test_snapshot_reflects_session() {
        let mut state = GameState::new(8);
        tick(&mut state, &TickInput::default(), 1.0 / 60.0);
        let snap = RenderSnapshot::capture(&state, &Settings::default());
        assert_eq!(snap.climber.pose, Pose::Dangling);
        assert_eq!(snap.grips.len(), state.grips.iter().filter(|g| g.pos.y >= -300.0).count());
        assert_eq!(snap.rope.len(), 2);
        assert_eq!(snap.rope[1], state.climber.pos);
        assert_eq!(snap.hud.protections_left, 3);
        assert_eq!(snap.to_screen(state.climber.pos).y, state.climber.pos.y - snap.camera_top);
    }

    #[test]
    fn test_hidden_grips_are_faint() {
        let mut state = GameState::new(8);
        for _ in 0..30 {
            tick(&mut state, &TickInput::default(), 1.0 / 60.0);
        }
        let snap = RenderSnapshot::capture(&state, &Settings::default());
        for view in snap.grips.iter().filter(|g| g.state == GripState::Hidden) {
            assert_eq!(view.color, GRIP_COLOR_HIDDEN);
            assert_eq!(view.alpha, HIDDEN_ALPHA);
        }
    }

    #[test]
    fn test_log_renderer_counts_frames() {
        let state = GameState::new(8);
        let snap = RenderSnapshot::capture(&state, &Settings::default());
        let mut sink = LogRenderer::new(10);
        for _ in 0..25 {
            sink.draw(&snap);
        }
        assert_eq!(sink.frames(), 25);
    }
}
