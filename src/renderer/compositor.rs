//! Dirty-rect tile compositor
//!
//! Each frame repaints only the union of what changed: the ball and its
//! shadow now and last frame, the trail (including the point that just fell
//! off it) and the HUD. In `TileBlit` mode that region is composed into one
//! RAM tile and written in a single blit. When it does not fit the tile, the
//! tile is placed over the ball and every changed area left outside it is
//! recomposed in a small cleanup blit, so nothing stale survives on the LCD.

use log::trace;

use super::background::DuneBackground;
use super::color::{Rgb565, colors};
use super::hud::{HudStatus, draw_hud, hud_rect};
use super::postfx::{self, Vignette};
use super::shader::{
    BallLook, ShaderConfig, ball_bounds, draw_ball, draw_shadow, fill_circle, shadow_alpha,
    shadow_bounds,
};
use super::tile::{Rect, Tile};
use crate::ball_radius;
use crate::consts::{TILE_MAX_H, TILE_MAX_W, TRAIL_LEN};
use crate::error::DisplayError;
use crate::fixed::{Q16, isqrt_u32};
use crate::platform::{DisplayTransport, wait_write_done};
use crate::settings::{DemoConfig, RenderMode};
use crate::sim::BallState;

/// Trail dots grow from 1 to this radius, oldest to newest
pub const TRAIL_DOT_R_MAX: i32 = 1 + (TRAIL_LEN as i32 - 1) / 6;
/// Half-extent of the area repainted around a trail dot
const DOT_PAD: i32 = TRAIL_DOT_R_MAX + 1;
/// Half-extent of a cleanup blit around a trail point
const ERASE_PAD: i32 = 6;

#[inline]
fn trail_dot(i: usize) -> (i32, Rgb565) {
    let r = 1 + i as i32 / 6;
    let c = if i < TRAIL_LEN / 2 {
        colors::TRAIL_OLD
    } else {
        colors::TRAIL_NEW
    };
    (r, c)
}

/// Render-side state that persists between frames
#[derive(Debug, Clone)]
pub struct RenderState {
    trail: [(i16, i16); TRAIL_LEN],
    /// Slot holding the oldest point (next to be overwritten)
    head: usize,
    /// Ball + shadow area painted last frame
    prev_bounds: Option<Rect>,
    phase: u32,
}

impl RenderState {
    /// Trail starts collapsed onto the ball's start position
    pub fn new(cx: i32, cy: i32) -> Self {
        Self {
            trail: [(cx as i16, cy as i16); TRAIL_LEN],
            head: 0,
            prev_bounds: None,
            phase: 0,
        }
    }

    /// Record the newest ball center and return the point it replaced
    pub fn push_trail(&mut self, cx: i32, cy: i32) -> (i32, i32) {
        let (ox, oy) = self.trail[self.head];
        self.trail[self.head] = (cx as i16, cy as i16);
        self.head = (self.head + 1) % TRAIL_LEN;
        (ox as i32, oy as i32)
    }

    /// `(age index, point)`, oldest first
    pub fn trail(&self) -> impl Iterator<Item = (usize, (i32, i32))> + '_ {
        (0..TRAIL_LEN).map(move |i| {
            let (x, y) = self.trail[(self.head + i) % TRAIL_LEN];
            (i, (x as i32, y as i32))
        })
    }

    /// Roll the spin phase by the distance covered relative to the radius
    pub fn advance_spin(&mut self, speed_l1: i32, r: i32) -> u32 {
        if speed_l1 > 0 {
            self.phase = self
                .phase
                .wrapping_add(1 + (speed_l1 / r.max(8)) as u32);
        }
        self.phase
    }

    pub fn phase(&self) -> u32 {
        self.phase
    }

    pub fn prev_bounds(&self) -> Option<Rect> {
        self.prev_bounds
    }

    /// Work out what to repaint this frame. Call after `push_trail`.
    pub fn plan(&self, shapes: &FrameShapes, screen_w: i32, screen_h: i32, out: &mut FramePlan) {
        out.cleanup.clear();
        out.clamped = false;

        let mut changed = shapes.changed_areas(self);
        let screen = Rect::new(0, 0, screen_w - 1, screen_h - 1);
        changed.retain_mut(|r| match r.intersect(&screen) {
            Some(c) => {
                *r = c;
                true
            }
            None => false,
        });

        let Some(union) = changed.iter().copied().reduce(|a, b| a.union(&b)) else {
            out.tile = None;
            return;
        };

        if union.width() <= out.max_w && union.height() <= out.max_h {
            out.tile = Some(union);
            return;
        }

        out.clamped = true;
        let ball = shapes.ball.intersect(&screen).unwrap_or(union);
        let (ux, uy) = union.center();
        let (x0, x1) = clamp_axis(union.x0, union.x1, ux, ball.x0, ball.x1, out.max_w);
        let (y0, y1) = clamp_axis(union.y0, union.y1, uy, ball.y0, ball.y1, out.max_h);
        let tile = Rect::new(x0, y0, x1, y1);
        out.tile = Some(tile);

        for r in changed {
            if tile.contains_rect(&r) || out.cleanup.iter().any(|c| c.contains_rect(&r)) {
                continue;
            }
            out.cleanup.push(r);
        }
    }
}

/// Fit a `max`-wide window inside `[u0, u1]`, near `c`, covering `[b0, b1]`
fn clamp_axis(u0: i32, u1: i32, c: i32, b0: i32, b1: i32, max: i32) -> (i32, i32) {
    if u1 - u0 + 1 <= max {
        return (u0, u1);
    }
    let mut a = (c - max / 2).clamp(u0, u1 - max + 1);
    if b0 < a {
        a = b0;
    }
    if b1 > a + max - 1 {
        a = b1 - max + 1;
    }
    (a, a + max - 1)
}

/// Screen areas occupied this frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameShapes {
    pub ball: Rect,
    pub shadow: Rect,
    /// Trail point that fell off the ring this frame
    pub evicted: (i32, i32),
    pub hud: Rect,
}

impl FrameShapes {
    /// Every area whose pixels may differ from last frame. The two trail
    /// boxes are padded differently: the evicted dot needs a wider erase.
    fn changed_areas(&self, rs: &RenderState) -> Vec<Rect> {
        let mut v = Vec::with_capacity(TRAIL_LEN + 5);
        v.push(self.ball);
        v.push(self.shadow);
        if let Some(prev) = rs.prev_bounds {
            v.push(prev);
        }
        v.push(Rect::around(self.evicted.0, self.evicted.1, ERASE_PAD, ERASE_PAD));
        v.extend(rs.trail().map(|(_, (x, y))| Rect::around(x, y, DOT_PAD, DOT_PAD)));
        v.push(self.hud);
        v
    }
}

/// Output of dirty-rect planning
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FramePlan {
    pub tile: Option<Rect>,
    pub clamped: bool,
    pub cleanup: Vec<Rect>,
    max_w: i32,
    max_h: i32,
}

impl FramePlan {
    pub fn new(max_w: i32, max_h: i32) -> Self {
        Self {
            tile: None,
            clamped: false,
            cleanup: Vec::new(),
            max_w: max_w.max(1),
            max_h: max_h.max(1),
        }
    }
}

/// What one `render` call sent to the display
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameReport {
    pub tile: Option<Rect>,
    pub clamped: bool,
    pub blits: u32,
    pub cleanup_blits: u32,
    pub pixels: u64,
    pub watchdog_expired: u32,
}

/// Resolved per-frame drawing parameters
#[derive(Debug, Clone, Copy)]
struct Scene {
    cx: i32,
    cy: i32,
    r_draw: i32,
    r_ground: i32,
    alpha: u32,
    look: BallLook,
}

/// Split `rect` into pieces no larger than `max_w` x `max_h`
fn chunks(rect: Rect, max_w: i32, max_h: i32) -> impl Iterator<Item = Rect> {
    let ys = (rect.y0..=rect.y1).step_by(max_h.max(1) as usize);
    ys.flat_map(move |y| {
        (rect.x0..=rect.x1)
            .step_by(max_w.max(1) as usize)
            .map(move |x| Rect::new(x, y, (x + max_w - 1).min(rect.x1), (y + max_h - 1).min(rect.y1)))
    })
}

pub struct TileCompositor {
    tile: Tile,
    background: DuneBackground,
    shader: ShaderConfig,
    mode: RenderMode,
    post_fx: bool,
    vignette: Vignette,
    screen_w: i32,
    screen_h: i32,
    z_max: Q16,
    watchdog_spins: u32,
    plan: FramePlan,
}

impl TileCompositor {
    pub fn new(cfg: &DemoConfig) -> Self {
        Self {
            tile: Tile::new(TILE_MAX_W, TILE_MAX_H),
            background: DuneBackground::generate(),
            shader: cfg.shader_config(),
            mode: cfg.render_mode,
            post_fx: cfg.post_fx,
            vignette: cfg.vignette,
            screen_w: cfg.screen_w,
            screen_h: cfg.screen_h,
            z_max: cfg.depth_params().z_max,
            watchdog_spins: cfg.display_watchdog_spins,
            plan: FramePlan::new(TILE_MAX_W, TILE_MAX_H),
        }
    }

    pub fn mode(&self) -> RenderMode {
        self.mode
    }

    pub fn background(&self) -> &DuneBackground {
        &self.background
    }

    fn screen(&self) -> Rect {
        Rect::new(0, 0, self.screen_w - 1, self.screen_h - 1)
    }

    /// Write the current tile and wait for the transfer to finish
    fn blit<D: DisplayTransport + ?Sized>(
        &mut self,
        lcd: &mut D,
        fx: bool,
        report: &mut FrameReport,
    ) -> Result<(), DisplayError> {
        if fx && self.post_fx {
            postfx::apply_tile(&mut self.tile, self.screen_w, self.screen_h, self.vignette);
        }
        lcd.start_blit(self.tile.rect(), self.tile.pixels())?;
        report.blits += 1;
        report.pixels += self.tile.rect().area() as u64;
        if !wait_write_done(lcd, self.watchdog_spins) {
            report.watchdog_expired += 1;
        }
        Ok(())
    }

    /// Paint the whole screen once (backdrop in tile mode, black in raster mode)
    pub fn draw_full_background<D: DisplayTransport + ?Sized>(
        &mut self,
        lcd: &mut D,
    ) -> Result<FrameReport, DisplayError> {
        let mut report = FrameReport::default();
        let (max_w, max_h) = self.tile.max_size();
        for rect in chunks(self.screen(), max_w, max_h) {
            self.target(rect)?;
            match self.mode {
                RenderMode::TileBlit => self.background.fill_tile(&mut self.tile),
                RenderMode::Raster => self.tile.fill(Rgb565::BLACK),
            }
            self.blit(lcd, true, &mut report)?;
        }
        Ok(report)
    }

    /// Draw one frame of the ball and overlays
    pub fn render<D: DisplayTransport + ?Sized>(
        &mut self,
        rs: &mut RenderState,
        ball: &BallState,
        hud: &HudStatus,
        lcd: &mut D,
    ) -> Result<FrameReport, DisplayError> {
        let (cx, cy) = ball.center();
        let r_draw = ball_radius(cy, ball.depth.z);
        let r_ground = ball_radius(cy, Q16::ONE);
        let phase = rs.advance_spin(ball.speed_l1(), r_draw);
        let scene = Scene {
            cx,
            cy,
            r_draw,
            r_ground,
            alpha: shadow_alpha(ball.depth.z, self.z_max),
            look: BallLook::new(phase, ball.glint),
        };

        let evicted = rs.push_trail(cx, cy);
        let shapes = FrameShapes {
            ball: ball_bounds(cx, cy, r_draw),
            shadow: shadow_bounds(cx, cy, r_ground),
            evicted,
            hud: hud_rect(self.screen_w),
        };

        let report = match self.mode {
            RenderMode::TileBlit => self.render_tiled(rs, &shapes, &scene, hud, lcd)?,
            RenderMode::Raster => self.render_raster(rs, &shapes, &scene, hud, lcd)?,
        };

        rs.prev_bounds = shapes.ball.union(&shapes.shadow).intersect(&self.screen());
        Ok(report)
    }

    /// Point the tile at `rect`, which must fit its capacity
    fn target(&mut self, rect: Rect) -> Result<(), DisplayError> {
        if self.tile.retarget(rect) {
            return Ok(());
        }
        let (max_w, max_h) = self.tile.max_size();
        Err(DisplayError::TileOverflow {
            w: rect.width(),
            h: rect.height(),
            max_w,
            max_h,
        })
    }

    /// Background, trail oldest to newest, shadow, ball, HUD
    fn compose(&mut self, rect: Rect, rs: &RenderState, scene: &Scene, hud: &HudStatus) -> bool {
        if !self.tile.retarget(rect) {
            return false;
        }
        self.background.fill_tile(&mut self.tile);
        for (i, (x, y)) in rs.trail() {
            let (r, c) = trail_dot(i);
            fill_circle(&mut self.tile, x, y, r, c);
        }
        draw_shadow(&mut self.tile, scene.cx, scene.cy, scene.r_ground, scene.alpha);
        draw_ball(&mut self.tile, scene.cx, scene.cy, scene.r_draw, &scene.look, &self.shader);
        draw_hud(&mut self.tile, hud, self.screen_w);
        true
    }

    fn render_tiled<D: DisplayTransport + ?Sized>(
        &mut self,
        rs: &RenderState,
        shapes: &FrameShapes,
        scene: &Scene,
        hud: &HudStatus,
        lcd: &mut D,
    ) -> Result<FrameReport, DisplayError> {
        let mut plan = std::mem::replace(&mut self.plan, FramePlan::new(0, 0));
        rs.plan(shapes, self.screen_w, self.screen_h, &mut plan);

        let mut report = FrameReport {
            tile: plan.tile,
            clamped: plan.clamped,
            ..Default::default()
        };
        let result = self.blit_plan(&plan, rs, scene, hud, lcd, &mut report);
        self.plan = plan;
        result?;

        if report.clamped {
            trace!("Dirty rect clamped, {} cleanup blit(s)", report.cleanup_blits);
        }
        Ok(report)
    }

    fn blit_plan<D: DisplayTransport + ?Sized>(
        &mut self,
        plan: &FramePlan,
        rs: &RenderState,
        scene: &Scene,
        hud: &HudStatus,
        lcd: &mut D,
        report: &mut FrameReport,
    ) -> Result<(), DisplayError> {
        if let Some(tile) = plan.tile
            && self.compose(tile, rs, scene, hud)
        {
            self.blit(lcd, true, report)?;
        }
        let (max_w, max_h) = self.tile.max_size();
        for &area in &plan.cleanup {
            for rect in chunks(area, max_w, max_h) {
                if self.compose(rect, rs, scene, hud) {
                    self.blit(lcd, true, report)?;
                    report.cleanup_blits += 1;
                }
            }
        }
        Ok(())
    }

    /// Stream each primitive to the display as it is drawn
    fn render_raster<D: DisplayTransport + ?Sized>(
        &mut self,
        rs: &RenderState,
        shapes: &FrameShapes,
        scene: &Scene,
        hud: &HudStatus,
        lcd: &mut D,
    ) -> Result<FrameReport, DisplayError> {
        let screen = self.screen();
        let (max_w, max_h) = self.tile.max_size();
        let bg = if hud.accel_fail {
            colors::SENSOR_FAULT
        } else {
            Rgb565::BLACK
        };

        let dirty = shapes
            .changed_areas(rs)
            .into_iter()
            .reduce(|a, b| a.union(&b))
            .and_then(|u| u.intersect(&screen));
        let mut report = FrameReport {
            tile: dirty,
            ..Default::default()
        };

        if let Some(dirty) = dirty {
            for rect in chunks(dirty, max_w, max_h) {
                self.target(rect)?;
                self.tile.fill(bg);
                self.blit(lcd, false, &mut report)?;
            }
        }

        for (i, (x, y)) in rs.trail() {
            let (r, c) = trail_dot(i);
            for row in circle_rows(x, y, r, &screen) {
                self.target(row)?;
                self.tile.fill(c);
                self.blit(lcd, false, &mut report)?;
            }
        }

        if let Some(area) = shapes.shadow.intersect(&screen) {
            for rect in chunks(area, max_w, max_h) {
                self.target(rect)?;
                self.tile.fill(bg);
                for (i, (x, y)) in rs.trail() {
                    let (r, c) = trail_dot(i);
                    fill_circle(&mut self.tile, x, y, r, c);
                }
                draw_shadow(&mut self.tile, scene.cx, scene.cy, scene.r_ground, scene.alpha);
                self.blit(lcd, false, &mut report)?;
            }
        }

        for row in circle_rows(scene.cx, scene.cy, scene.r_draw, &screen) {
            self.target(row)?;
            self.tile.fill(bg);
            draw_ball(&mut self.tile, scene.cx, scene.cy, scene.r_draw, &scene.look, &self.shader);
            self.blit(lcd, false, &mut report)?;
        }

        if let Some(area) = shapes.hud.intersect(&screen) {
            self.target(area)?;
            self.tile.fill(Rgb565::BLACK);
            draw_hud(&mut self.tile, hud, self.screen_w);
            self.blit(lcd, false, &mut report)?;
        }
        Ok(report)
    }
}

/// One on-screen row span per line of a disc
fn circle_rows(cx: i32, cy: i32, r: i32, screen: &Rect) -> impl Iterator<Item = Rect> + '_ {
    let r = r.max(0);
    (cy - r..=cy + r).filter_map(move |y| {
        let dy = y - cy;
        let span = isqrt_u32((r * r - dy * dy) as u32) as i32;
        Rect::new(cx - span, y, cx + span, y).intersect(screen)
    })
}
