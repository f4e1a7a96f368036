//! Procedural route generation
//!
//! An initial seeding pass lays out a reachable start, a column of reference
//! grips and a dense filler column. After that, small batches are added above
//! the highest grip whenever the camera gets close to it, until the generation
//! floor is reached and the win grip is chosen.

use glam::Vec2;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::camera::Camera;
use super::grip::{Grip, GripKind, GripState};
use super::state::EntityIds;
use crate::consts::{CLIMBER_START, WORLD_WIDTH};
use crate::{random_chance, random_float};
use crate::tuning::Tuning;

/// Whether `candidate` sits too close to any of the last `window` grips
pub fn too_close(grips: &[Grip], candidate: Vec2, window: usize, tuning: &Tuning) -> bool {
    let min = tuning.too_close_distance();
    grips
        .iter()
        .rev()
        .take(window)
        .any(|g| g.pos.distance(candidate) < min)
}

/// Keep an x inside the playable width
fn clamp_x(x: f32, tuning: &Tuning) -> f32 {
    let margin = tuning.average_grip_size();
    x.clamp(margin, WORLD_WIDTH - margin)
}

/// X within `bounds` nearest to `want` that clears the initial check window.
/// Falls back to `want` (clamped) when the whole band is crowded.
fn clear_x(grips: &[Grip], want: f32, y: f32, bounds: (f32, f32), tuning: &Tuning) -> f32 {
    let (lo, hi) = bounds;
    let want = want.clamp(lo, hi);
    let window = tuning.initial_check_window;
    let steps = (hi - lo).ceil() as usize;
    for step in 0..=steps {
        for x in [want - step as f32, want + step as f32] {
            if (lo..=hi).contains(&x) && !too_close(grips, Vec2::new(x, y), window, tuning) {
                return x;
            }
        }
    }
    log::debug!("No clear spot at y={y:.0} in [{lo:.0}, {hi:.0}]");
    want
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RouteGenerator {
    /// Smallest Y generated so far
    highest_y: Option<f32>,
    total_generated: usize,
    floor_reached: bool,
    win_grip: Option<u32>,
}

impl RouteGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn highest_y(&self) -> Option<f32> {
        self.highest_y
    }

    pub fn total_generated(&self) -> usize {
        self.total_generated
    }

    pub fn floor_reached(&self) -> bool {
        self.floor_reached
    }

    pub fn win_grip(&self) -> Option<u32> {
        self.win_grip
    }

    fn record(&mut self, y: f32) {
        self.total_generated += 1;
        self.highest_y = Some(self.highest_y.map_or(y, |h| h.min(y)));
    }

    /// Seed the route: reachable start grips, reference column, filler column.
    /// All seeded grips start visible. Returns the number of grips added.
    pub fn generate_initial(
        &mut self,
        grips: &mut Vec<Grip>,
        ids: &mut EntityIds,
        rng: &mut impl Rng,
        tuning: &Tuning,
        now: f32,
    ) -> usize {
        let before = grips.len();
        let center_x = CLIMBER_START.x;
        let start_y = CLIMBER_START.y;
        let reach = tuning.reach;
        let (size_min, size_max) = GripKind::Normal.size_range(tuning);

        // Reachable from the start position, nearest first
        let mut top_y = start_y;
        for (i, factor) in tuning.reachable_y_factors.iter().enumerate() {
            let y = start_y - factor * reach;
            let offset = match i {
                0 => random_float(rng, -reach * 0.2, reach * 0.2),
                i if i % 2 == 1 => -random_float(rng, reach * 0.3, reach * 0.7),
                _ => random_float(rng, reach * 0.3, reach * 0.7),
            };
            // Must stay in reach of the start position
            let dy = start_y - y;
            let max_dx = ((reach * 0.95).powi(2) - dy * dy).max(0.0).sqrt();
            let (lo, hi) = (
                clamp_x(center_x - max_dx, tuning),
                clamp_x(center_x + max_dx, tuning),
            );
            let x = clear_x(grips, center_x + offset, y, (lo, hi), tuning);

            let size = random_float(rng, size_min * 1.1, size_max * 1.1);
            self.push_seeded(grips, ids, Vec2::new(x, y), size, rng, tuning, now);
            top_y = top_y.min(y);
        }

        // Reference column, spreading out as it climbs
        let mut last_y = top_y;
        for i in 0..tuning.reference_grip_count {
            let offset = tuning.min_grip_separation * (0.8 + i as f32 * 0.6)
                + random_float(rng, -10.0, 10.0);
            let y = last_y - offset;
            let band = WORLD_WIDTH * 0.35;
            let want = center_x + random_float(rng, -band, band);
            let bounds = (clamp_x(center_x - band, tuning), clamp_x(center_x + band, tuning));
            let x = clear_x(grips, want, y, bounds, tuning);
            let size = random_float(rng, size_min, size_max);
            self.push_seeded(grips, ids, Vec2::new(x, y), size, rng, tuning, now);
            last_y = y;
        }

        // Filler column; overlap is fine here
        let seeded = grips.len() - before;
        let fillers = tuning.initial_batch_size.saturating_sub(seeded);
        let avg = tuning.average_grip_size();
        for _ in 0..fillers {
            last_y -= tuning.filler_vertical_separation + random_float(rng, -5.0, 5.0);
            let x = center_x + random_float(rng, -avg * 0.3, avg * 0.3);
            let size = random_float(rng, size_min, size_max);
            self.push_seeded(grips, ids, Vec2::new(x, last_y), size, rng, tuning, now);
        }

        let added = grips.len() - before;
        log::debug!(
            "Initial route: {} grips, highest y={:.0}",
            added,
            self.highest_y.unwrap_or(start_y)
        );
        added
    }

    #[allow(clippy::too_many_arguments)]
    fn push_seeded(
        &mut self,
        grips: &mut Vec<Grip>,
        ids: &mut EntityIds,
        pos: Vec2,
        size: f32,
        rng: &mut impl Rng,
        tuning: &Tuning,
        now: f32,
    ) {
        let mut grip = Grip::random_sized(ids.allocate(), pos, GripKind::Normal, size, rng, tuning)
            .with_initial_state(GripState::Visible, now);
        grip.seeded = true;
        grips.push(grip);
        self.record(pos.y);
    }

    /// Whether the camera is close enough to the top of the route to need more
    pub fn needs_more(&self, camera: &Camera, tuning: &Tuning) -> bool {
        if self.floor_reached {
            return false;
        }
        match self.highest_y {
            None => true,
            Some(highest) => {
                highest > camera.top_y - camera.view_height * tuning.dynamic_threshold_factor
            }
        }
    }

    /// Add one batch of hidden grips above the route if the camera calls for
    /// it. Returns the number added (0 when not needed or capped).
    pub fn generate_dynamic(
        &mut self,
        grips: &mut Vec<Grip>,
        camera: &Camera,
        ids: &mut EntityIds,
        rng: &mut impl Rng,
        tuning: &Tuning,
        now: f32,
    ) -> usize {
        if !self.needs_more(camera, tuning) {
            return 0;
        }

        let base_y = match self.highest_y {
            None => CLIMBER_START.y - tuning.min_grip_separation,
            Some(highest) => (highest - tuning.min_grip_separation)
                .min(camera.top_y - tuning.min_grip_separation * 2.0),
        };
        let margin = tuning.crack_size_max.max(tuning.normal_size_max);

        let mut added = 0;
        let mut batch_top = None::<f32>;
        for _ in 0..tuning.dynamic_batch_size {
            if grips.len() >= tuning.max_grips {
                log::debug!("Grip cap of {} reached", tuning.max_grips);
                break;
            }
            if on_screen_count(grips, camera) >= tuning.max_grips_on_screen {
                log::debug!("On-screen grip cap of {} reached", tuning.max_grips_on_screen);
                break;
            }

            let y = base_y - random_float(rng, tuning.dynamic_offset_min, tuning.dynamic_offset_max);
            if y < tuning.generation_floor_y {
                self.reach_floor(grips, tuning.pre_last_grip_count);
                break;
            }
            let x = random_float(rng, margin, WORLD_WIDTH - margin);
            let kind = if random_chance(rng, tuning.crack_chance) {
                GripKind::Crack
            } else {
                GripKind::Normal
            };
            let pos = Vec2::new(x, y);
            if too_close(grips, pos, tuning.dynamic_check_window, tuning) {
                continue;
            }

            let grip = Grip::random(ids.allocate(), pos, kind, rng, tuning)
                .with_initial_state(GripState::Hidden, now);
            grips.push(grip);
            added += 1;
            batch_top = Some(batch_top.map_or(y, |t: f32| t.min(y)));
        }

        if let Some(top) = batch_top {
            self.total_generated += added;
            self.highest_y = Some(self.highest_y.map_or(top, |h| h.min(top)));
            log::debug!(
                "Generated {} grips (total {}), highest y={:.0}",
                added,
                self.total_generated,
                top
            );
        }
        added
    }

    /// Mark the topmost grip as the win grip and the next few below it as
    /// pre-last. Happens once.
    fn reach_floor(&mut self, grips: &mut [Grip], pre_last_count: usize) {
        if self.floor_reached {
            return;
        }
        self.floor_reached = true;

        let mut order: Vec<usize> = (0..grips.len()).collect();
        order.sort_by(|&a, &b| grips[a].pos.y.total_cmp(&grips[b].pos.y));
        let Some((&win, rest)) = order.split_first() else {
            return;
        };
        grips[win].is_win = true;
        self.win_grip = Some(grips[win].id);
        let pre_last = rest.len().min(pre_last_count);
        for &i in &rest[..pre_last] {
            grips[i].is_pre_last = true;
        }
        log::info!(
            "Generation floor reached; win grip {} at y={:.0}",
            grips[win].id,
            grips[win].pos.y
        );
    }

    /// Drop grips far below the view that are not in use
    pub fn cull(&self, grips: &mut Vec<Grip>, camera: &Camera) -> usize {
        let limit = camera.bottom_y() + camera.view_height;
        let before = grips.len();
        grips.retain(|g| g.pos.y <= limit || g.state() == GripState::Active || g.is_win);
        before - grips.len()
    }
}

/// Grips within one view height above the view, or inside it
pub fn on_screen_count(grips: &[Grip], camera: &Camera) -> usize {
    let top = camera.top_y - camera.view_height;
    let bottom = camera.bottom_y();
    grips
        .iter()
        .filter(|g| g.pos.y >= top && g.pos.y <= bottom)
        .count()
}
