//! Demo configuration
//!
//! Built once at startup and resolved into the per-module parameter structs
//! before the main loop starts; nothing here is consulted per pixel or per step.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::consts::*;
use crate::fixed::{Q14, Q15, Q16};
use crate::renderer::{ShaderConfig, Vignette};
use crate::sim::{AccelConfig, AxisMap, DepthParams, ImpactConfig, SchedulerConfig, SimParams};

pub use crate::sim::DepthModel;

/// How a frame reaches the LCD
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum RenderMode {
    /// Render into a RAM tile and blit once per frame (stable image)
    #[default]
    TileBlit,
    /// Stream every primitive straight to the LCD (many small writes, may tear)
    Raster,
}

impl RenderMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            RenderMode::TileBlit => "blit",
            RenderMode::Raster => "raster",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "blit" | "tile" | "tileblit" => Some(RenderMode::TileBlit),
            "raster" => Some(RenderMode::Raster),
            _ => None,
        }
    }
}

/// Full demo configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DemoConfig {
    // === Display ===
    pub screen_w: i32,
    pub screen_h: i32,
    pub render_mode: RenderMode,
    /// Scanline + vignette pass over each tile
    pub post_fx: bool,
    pub vignette: Vignette,
    /// Light direction override (x right, y down, z toward viewer), normalized on
    /// resolve; `None` keeps the stock Q14 light
    pub light_dir: Option<[f32; 3]>,

    // === Accelerometer ===
    pub axis: AxisMap,
    /// Raw counts per 1 g in the configured full-scale range
    pub counts_per_g: i32,
    /// Low-pass strength: time constant of roughly 2^shift samples
    pub lp_shift: u32,
    /// Tilt deadzone (raw counts)
    pub deadzone: i32,
    /// Share of the linear term in the soft response (rest is cubic)
    pub soft_linear: f32,
    /// Accelerometer discovery attempts and delay between them
    pub accel_probe_attempts: u32,
    pub accel_probe_retry_us: u32,

    // === Impacts ===
    pub impacts: bool,
    /// High-pass score above which an impact fires (raw counts)
    pub bang_threshold: i32,
    /// Impulse for a 1 g overshoot (px/s)
    pub bang_gain_px_s: i32,
    /// Minimum lateral high-pass L1 to use it as impulse direction
    pub bang_dir_l1_min: i32,

    // === Physics ===
    pub sim_hz: u32,
    /// Acceleration at full (1 g) tilt, px/s^2
    pub accel_px_s2: i32,
    /// Per-step velocity multiplier (Q16.16)
    pub damping: Q16,
    pub restitution_num: i32,
    pub restitution_den: i32,
    /// Gap between the largest ball and the screen edge
    pub bound_margin: i32,

    // === Depth ===
    pub depth_model: DepthModel,
    pub z_min: f32,
    pub z_max: f32,
    pub z_smooth_shift: u32,
    pub z_baseline_shift: u32,
    pub z_deadzone: i32,
    pub z_range: i32,
    pub z_trigger: i32,
    pub z_latch_ms: u32,
    pub z_lockout_ms: u32,
    pub z_settle_ms: u32,

    // === Scheduling ===
    pub render_hz: u32,
    pub max_steps_per_pass: u32,
    pub aux_period_ms: u32,
    pub stats_period_ms: u32,
    /// Spin budget while waiting for a display write to complete
    pub display_watchdog_spins: u32,

    // === Co-processor ===
    /// Run the glint model on aux ticks (the HUD `I:` flag)
    pub inference: bool,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            screen_w: LCD_W,
            screen_h: LCD_H,
            render_mode: RenderMode::TileBlit,
            post_fx: false,
            vignette: Vignette::Columns,
            light_dir: None,

            axis: AxisMap {
                swap_xy: true,
                invert_x: false,
                invert_y: false,
            },
            counts_per_g: 512,
            lp_shift: 2,
            deadzone: 10,
            soft_linear: 0.35,
            accel_probe_attempts: 200,
            accel_probe_retry_us: 10_000,

            impacts: true,
            bang_threshold: 220,
            bang_gain_px_s: 250,
            bang_dir_l1_min: 20,

            sim_hz: 120,
            accel_px_s2: 4200,
            damping: Q16(65000),
            restitution_num: 3,
            restitution_den: 4,
            bound_margin: 2,

            depth_model: DepthModel::ZScale,
            z_min: 0.8,
            z_max: 1.25,
            z_smooth_shift: 3,
            z_baseline_shift: 6,
            z_deadzone: 6,
            z_range: 80,
            z_trigger: 24,
            z_latch_ms: 400,
            z_lockout_ms: 600,
            z_settle_ms: 2000,

            render_hz: 60,
            max_steps_per_pass: 6,
            aux_period_ms: 200,
            stats_period_ms: 1000,
            display_watchdog_spins: 60_000_000,

            inference: true,
        }
    }
}

impl DemoConfig {
    /// Convert a duration to a whole number of physics steps
    fn ms_to_steps(&self, ms: u32) -> u32 {
        (ms as u64 * self.sim_hz as u64 / 1000) as u32
    }

    pub fn accel_config(&self) -> AccelConfig {
        AccelConfig {
            axis: self.axis,
            counts_per_g: self.counts_per_g.max(1),
            lp_shift: self.lp_shift.min(15),
            deadzone: self.deadzone.max(0),
            soft_linear: Q15::from_f32(self.soft_linear.clamp(0.0, 1.0)),
            bang_threshold: self.bang_threshold,
        }
    }

    pub fn impact_config(&self) -> ImpactConfig {
        ImpactConfig {
            enabled: self.impacts,
            counts_per_g: self.counts_per_g.max(1),
            threshold: self.bang_threshold,
            gain: Q16::from_int(self.bang_gain_px_s),
            dir_l1_min: self.bang_dir_l1_min,
            tilt_l1_min: 10,
        }
    }

    pub fn depth_params(&self) -> DepthParams {
        let z_min = Q16::from_f32(self.z_min.min(1.0));
        let z_max = Q16::from_f32(self.z_max.max(1.0));
        DepthParams {
            model: self.depth_model,
            z_min,
            z_max,
            smooth_shift: self.z_smooth_shift.min(15),
            baseline_shift: self.z_baseline_shift.min(15),
            deadzone: self.z_deadzone.max(0),
            range: self.z_range.max(1),
            trigger: self.z_trigger,
            latch_steps: self.ms_to_steps(self.z_latch_ms),
            lockout_steps: self.ms_to_steps(self.z_lockout_ms),
            settle_steps: self.ms_to_steps(self.z_settle_ms),
        }
    }

    pub fn sim_params(&self) -> SimParams {
        let edge = BALL_R_MAX + self.bound_margin;
        SimParams {
            step: Q16::from_ratio(1, self.sim_hz.max(1) as i32),
            accel_px_s2: self.accel_px_s2,
            damping: self.damping.clamp(Q16::ZERO, Q16(Q16::ONE.0 - 1)),
            restitution_num: self.restitution_num,
            restitution_den: self.restitution_den.max(1),
            minx: edge,
            miny: edge,
            maxx: (self.screen_w - 1) - edge,
            maxy: (self.screen_h - 1) - edge,
            depth: self.depth_params(),
        }
    }

    pub fn scheduler_config(&self) -> SchedulerConfig {
        let render_hz = self.render_hz.max(1);
        let frame = Q16::from_ratio(1, render_hz as i32);
        let frame_us = (1_000_000 + render_hz / 2) / render_hz;
        SchedulerConfig {
            step: Q16::from_ratio(1, self.sim_hz.max(1) as i32),
            max_steps: self.max_steps_per_pass,
            max_delta: frame,
            fallback_dt: frame,
            fallback_us: frame_us,
            render_period_us: frame_us,
            aux_period_us: self.aux_period_ms * 1000,
            stats_period_us: self.stats_period_ms * 1000,
        }
    }

    /// Stock light unless overridden; an override is normalized into Q14
    pub fn shader_config(&self) -> ShaderConfig {
        let Some(dir) = self.light_dir else {
            return ShaderConfig::default();
        };
        let l = Vec3::from_array(dir).normalize_or_zero();
        let l = if l == Vec3::ZERO { Vec3::Z } else { l };
        ShaderConfig {
            light: [
                Q14::from_f32(l.x),
                Q14::from_f32(l.y),
                Q14::from_f32(l.z),
            ],
        }
    }
}
