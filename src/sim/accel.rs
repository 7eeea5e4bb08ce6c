//! Accelerometer signal processing
//!
//! One raw sample stream feeds two independent mechanics:
//! - the low-pass path estimates gravity (tilt) and becomes a smooth,
//!   deadzoned, soft-response steering vector
//! - the high-pass path (raw minus low-pass) captures fast transients and
//!   fires one-shot impact pulses
//!
//! Tuning symptoms:
//! - Jitter at rest: raise the deadzone or the low-pass shift
//! - Sluggish tilt: lower the low-pass shift or the deadzone
//! - Impacts not registering: adjust the bang threshold, not the low-pass

use serde::{Deserialize, Serialize};

use crate::fixed::{Q15, clamp_sym};

/// Raw 3-axis sample: signed 12-bit counts, sign-extended into `i16`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AccelSample {
    pub x: i16,
    pub y: i16,
    pub z: i16,
}

impl AccelSample {
    /// Substituted whenever a poll fails
    pub const NEUTRAL: Self = Self { x: 0, y: 0, z: 0 };

    pub const fn new(x: i16, y: i16, z: i16) -> Self {
        Self { x, y, z }
    }
}

/// Mounting-orientation correction: swap first, then invert
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AxisMap {
    pub swap_xy: bool,
    pub invert_x: bool,
    pub invert_y: bool,
}

impl AxisMap {
    /// No remapping at all
    pub const IDENTITY: Self = Self {
        swap_xy: false,
        invert_x: false,
        invert_y: false,
    };

    #[inline]
    pub fn apply(&self, x: i32, y: i32) -> (i32, i32) {
        let (mut x, mut y) = if self.swap_xy { (y, x) } else { (x, y) };
        if self.invert_x {
            x = -x;
        }
        if self.invert_y {
            y = -y;
        }
        (x, y)
    }
}

/// Resolved signal-processing parameters
#[derive(Debug, Clone, Copy)]
pub struct AccelConfig {
    pub axis: AxisMap,
    /// Raw counts per 1 g
    pub counts_per_g: i32,
    pub lp_shift: u32,
    pub deadzone: i32,
    /// Linear share of the soft response; the cubic share is `1 - soft_linear`
    pub soft_linear: Q15,
    pub bang_threshold: i32,
}

impl Default for AccelConfig {
    fn default() -> Self {
        Self {
            axis: AxisMap::IDENTITY,
            counts_per_g: 512,
            lp_shift: 2,
            deadzone: 10,
            soft_linear: Q15(11469),
            bang_threshold: 220,
        }
    }
}

/// Output of one filter update
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AccelOutput {
    /// Low-pass (gravity estimate), raw counts
    pub lp: [i32; 3],
    /// High-pass (transients), raw counts
    pub hp: [i32; 3],
    /// `|hp_z| + |hp_x|/2 + |hp_y|/2`
    pub bang_score: i32,
    /// Soft-response tilt, Q15 (~[-1, 1] at 1 g)
    pub soft_x: Q15,
    pub soft_y: Q15,
    /// True only on the update where the score first exceeds the threshold
    pub bang_pulse: bool,
}

/// Persistent filter state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AccelFilter {
    pub ax_lp: i32,
    pub ay_lp: i32,
    pub az_lp: i32,
    pub bang_prev: bool,
}

impl AccelFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Zero all accumulators
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Run one sample through the pipeline
    pub fn update(&mut self, sample: AccelSample, cfg: &AccelConfig) -> AccelOutput {
        let (ax, ay) = cfg.axis.apply(sample.x as i32, sample.y as i32);
        let az = sample.z as i32;

        self.ax_lp += (ax - self.ax_lp) >> cfg.lp_shift;
        self.ay_lp += (ay - self.ay_lp) >> cfg.lp_shift;
        self.az_lp += (az - self.az_lp) >> cfg.lp_shift;

        // Bound the state so a bus glitch cannot wind it up
        let lim = cfg.counts_per_g * 2;
        self.ax_lp = clamp_sym(self.ax_lp, lim);
        self.ay_lp = clamp_sym(self.ay_lp, lim);
        self.az_lp = clamp_sym(self.az_lp, lim);

        let hp = [ax - self.ax_lp, ay - self.ay_lp, az - self.az_lp];
        let bang_score = impact_score(hp);
        let bang_pulse = self.impact_edge(bang_score, cfg.bang_threshold);

        let nx = normalize_q15(deadzone(self.ax_lp, cfg.deadzone), cfg.counts_per_g);
        let ny = normalize_q15(deadzone(self.ay_lp, cfg.deadzone), cfg.counts_per_g);

        AccelOutput {
            lp: [self.ax_lp, self.ay_lp, self.az_lp],
            hp,
            bang_score,
            soft_x: soft_response(nx, cfg.soft_linear),
            soft_y: soft_response(ny, cfg.soft_linear),
            bang_pulse,
        }
    }

    /// Rising-edge detector on the impact score
    pub fn impact_edge(&mut self, score: i32, threshold: i32) -> bool {
        let now = score > threshold;
        let pulse = now && !self.bang_prev;
        self.bang_prev = now;
        pulse
    }
}

/// Impact intensity: vertical transients count fully, lateral ones half
#[inline]
pub fn impact_score(hp: [i32; 3]) -> i32 {
    hp[2].abs() + (hp[0].abs() >> 1) + (hp[1].abs() >> 1)
}

/// Shrink toward zero by `dz`, zeroing anything within it
#[inline]
pub fn deadzone(v: i32, dz: i32) -> i32 {
    if v.abs() <= dz {
        0
    } else if v > 0 {
        v - dz
    } else {
        v + dz
    }
}

/// Raw counts to Q15 where 1 g maps to 1.0, saturated just below ±1.0
#[inline]
pub fn normalize_q15(v: i32, counts_per_g: i32) -> Q15 {
    let n = ((v as i64) << 15) / counts_per_g as i64;
    Q15(n.clamp(-(Q15::MAX.0 as i64), Q15::MAX.0 as i64) as i32)
}

/// Blend of linear and cubic response: flat near center, full authority at the ends
#[inline]
pub fn soft_response(x: Q15, linear: Q15) -> Q15 {
    let cube = x.mul(x).mul(x);
    let cubic = Q15::ONE.0 - linear.0;
    Q15(((x.0 as i64 * linear.0 as i64 + cube.0 as i64 * cubic as i64) >> 15) as i32)
}
