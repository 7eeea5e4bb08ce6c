//! World state and simulation parameters
//!
//! Everything the fixed-step integrator reads or mutates lives here. Positions
//! and velocities are Q16.16 pixels and pixels per second.

use serde::{Deserialize, Serialize};

use super::impact::Impulse;
use crate::fixed::{Q15, Q16};

/// Depth cue applied to the ball
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum DepthModel {
    /// Z-scale stays at 1.0
    Flat,
    /// Vertical gestures scale the ball (and its collision radius) toward the viewer
    #[default]
    ZScale,
}

impl DepthModel {
    pub fn as_str(&self) -> &'static str {
        match self {
            DepthModel::Flat => "flat",
            DepthModel::ZScale => "zscale",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "flat" | "none" => Some(DepthModel::Flat),
            "zscale" | "z" => Some(DepthModel::ZScale),
            _ => None,
        }
    }
}

/// Resolved depth-model tuning (timings already converted to steps)
#[derive(Debug, Clone, Copy)]
pub struct DepthParams {
    pub model: DepthModel,
    pub z_min: Q16,
    pub z_max: Q16,
    /// z follows its target with a time constant of 2^shift steps
    pub smooth_shift: u32,
    /// Gravity baseline follows `az_lp` with a time constant of 2^shift steps
    pub baseline_shift: u32,
    /// Deviation ignored around the baseline (raw counts)
    pub deadzone: i32,
    /// Deviation that maps to full `z_max` / `z_min`
    pub range: i32,
    /// Deviation that starts a gesture
    pub trigger: i32,
    pub latch_steps: u32,
    pub lockout_steps: u32,
    /// Gestures ignored this long after the baseline is first captured
    pub settle_steps: u32,
}

impl Default for DepthParams {
    fn default() -> Self {
        Self {
            model: DepthModel::ZScale,
            z_min: Q16::from_f32(0.8),
            z_max: Q16::from_f32(1.25),
            smooth_shift: 3,
            baseline_shift: 6,
            deadzone: 6,
            range: 80,
            trigger: 24,
            latch_steps: 48,
            lockout_steps: 72,
            settle_steps: 240,
        }
    }
}

/// Immutable per-session physics parameters
#[derive(Debug, Clone, Copy)]
pub struct SimParams {
    /// Step length, seconds
    pub step: Q16,
    /// Acceleration at a full 1 g tilt, px/s^2
    pub accel_px_s2: i32,
    /// Per-step velocity multiplier, below 1.0
    pub damping: Q16,
    pub restitution_num: i32,
    pub restitution_den: i32,
    /// Center bounds for the largest (nearest) ball at z = 1.0
    pub minx: i32,
    pub miny: i32,
    pub maxx: i32,
    pub maxy: i32,
    pub depth: DepthParams,
}

/// Per-step input, rebuilt from the latest processed sample
#[derive(Debug, Clone, Copy, Default)]
pub struct SimInput {
    pub soft_x: Q15,
    pub soft_y: Q15,
    /// One-shot kick, zero on every step but the one that consumes it
    pub impulse: Impulse,
    /// Vertical low-pass (raw counts) driving the depth model
    pub az_lp: i32,
}

/// Depth proxy and the gesture machine behind it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepthState {
    /// Current z-scale, clamped to `[z_min, z_max]`
    pub z: Q16,
    pub target: Q16,
    /// Slow estimate of gravity along z (raw counts)
    pub baseline: i32,
    pub baseline_ready: bool,
    /// Steps left holding `target`
    pub latch: u32,
    /// Steps left ignoring gestures
    pub lockout: u32,
}

impl Default for DepthState {
    fn default() -> Self {
        Self {
            z: Q16::ONE,
            target: Q16::ONE,
            baseline: 0,
            baseline_ready: false,
            latch: 0,
            lockout: 0,
        }
    }
}

impl DepthState {
    /// Advance the gesture machine by one step and smooth z toward its target
    pub fn update(&mut self, az_lp: i32, p: &DepthParams) {
        if p.model == DepthModel::Flat {
            *self = Self {
                baseline: self.baseline,
                baseline_ready: self.baseline_ready,
                ..Self::default()
            };
            return;
        }

        if !self.baseline_ready {
            self.baseline = az_lp;
            self.baseline_ready = true;
            self.lockout = p.settle_steps;
        }
        self.baseline += (az_lp - self.baseline) >> p.baseline_shift;
        let dev = super::accel::deadzone(az_lp - self.baseline, p.deadzone);

        if self.lockout > 0 {
            self.lockout -= 1;
            self.target = Q16::ONE;
        } else if self.latch > 0 {
            self.latch -= 1;
            if self.latch == 0 {
                self.lockout = p.lockout_steps;
            }
        } else if dev.abs() >= p.trigger && dev != 0 {
            self.target = gesture_target(dev, p);
            self.latch = p.latch_steps;
        } else {
            self.target = Q16::ONE;
        }

        self.z += Q16((self.target - self.z).0 >> p.smooth_shift);
        self.z = self.z.clamp(p.z_min, p.z_max);
    }
}

/// Map a baseline deviation onto `[z_min, z_max]`; positive moves toward the viewer
fn gesture_target(dev: i32, p: &DepthParams) -> Q16 {
    let frac = Q16::from_ratio(dev.abs().min(p.range), p.range.max(1));
    let z = if dev > 0 {
        Q16::ONE + (p.z_max - Q16::ONE).mul(frac)
    } else {
        Q16::ONE - (Q16::ONE - p.z_min).mul(frac)
    };
    z.clamp(p.z_min, p.z_max)
}

/// The ball
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BallState {
    pub x: Q16,
    pub y: Q16,
    pub vx: Q16,
    pub vy: Q16,
    /// Co-processor highlight intensity
    pub glint: u8,
    pub depth: DepthState,
}

impl BallState {
    /// Integer pixel center
    pub fn center(&self) -> (i32, i32) {
        (self.x.to_int(), self.y.to_int())
    }

    /// Speed in whole px/s, L1
    pub fn speed_l1(&self) -> i32 {
        self.vx.to_int().abs() + self.vy.to_int().abs()
    }
}

/// Complete physics world
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct World {
    pub ball: BallState,
    pub screen_w: i32,
    pub screen_h: i32,
    /// Physics steps taken since boot
    pub steps: u64,
}

impl World {
    /// Ball at rest in the middle of the screen with neutral depth
    pub fn new(screen_w: i32, screen_h: i32) -> Self {
        Self {
            ball: BallState {
                x: Q16::from_int(screen_w / 2),
                y: Q16::from_int(screen_h / 2),
                vx: Q16::ZERO,
                vy: Q16::ZERO,
                glint: 0,
                depth: DepthState::default(),
            },
            screen_w,
            screen_h,
            steps: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_depth_model_names() {
        for model in [DepthModel::Flat, DepthModel::ZScale] {
            assert_eq!(DepthModel::from_str(model.as_str()), Some(model));
        }
        assert_eq!(DepthModel::from_str("NONE"), Some(DepthModel::Flat));
        assert_eq!(DepthModel::from_str("lift"), None);
        assert_eq!(DepthParams::default().model, DepthModel::ZScale);
    }

    fn run(depth: &mut DepthState, az: i32, steps: u32, p: &DepthParams) {
        for _ in 0..steps {
            depth.update(az, p);
        }
    }

    #[test]
    fn test_world_new_centered() {
        let w = World::new(480, 320);
        assert_eq!(w.ball.center(), (240, 160));
        assert_eq!(w.ball.vx, Q16::ZERO);
        assert_eq!(w.ball.depth.z, Q16::ONE);
    }

    #[test]
    fn test_flat_model_holds_unity() {
        let p = DepthParams {
            model: DepthModel::Flat,
            ..Default::default()
        };
        let mut d = DepthState::default();
        run(&mut d, 900, 100, &p);
        assert_eq!(d.z, Q16::ONE);
    }

    #[test]
    fn test_settle_lockout_ignores_early_gestures() {
        let p = DepthParams::default();
        let mut d = DepthState::default();
        d.update(512, &p);
        run(&mut d, 640, p.settle_steps - 2, &p);
        assert_eq!(d.target, Q16::ONE);
        assert_eq!(d.latch, 0);
    }

    #[test]
    fn test_upward_gesture_grows_then_locks_out() {
        let p = DepthParams::default();
        let mut d = DepthState::default();
        run(&mut d, 512, p.settle_steps + 1, &p);
        assert_eq!(d.lockout, 0);

        // Sudden +80 counts is a full-range gesture
        d.update(592, &p);
        assert!(d.target > Q16::ONE);
        assert_eq!(d.latch, p.latch_steps);
        let peak_target = d.target;

        run(&mut d, 512, p.latch_steps, &p);
        assert_eq!(d.target, peak_target);
        assert!(d.z > Q16::ONE);
        assert!(d.z <= p.z_max);
        assert_eq!(d.latch, 0);
        assert_eq!(d.lockout, p.lockout_steps);

        // Lockout drops the target and a new gesture is ignored
        run(&mut d, 700, 10, &p);
        assert_eq!(d.target, Q16::ONE);
    }

    #[test]
    fn test_downward_gesture_shrinks() {
        let p = DepthParams::default();
        let mut d = DepthState::default();
        run(&mut d, 512, p.settle_steps + 1, &p);
        run(&mut d, 400, 20, &p);
        assert!(d.z < Q16::ONE);
        assert!(d.z >= p.z_min);
    }

    #[test]
    fn test_gesture_target_endpoints() {
        let p = DepthParams::default();
        assert_eq!(gesture_target(p.range, &p), p.z_max);
        assert_eq!(gesture_target(-p.range * 3, &p), p.z_min);
        let half = gesture_target(p.range / 2, &p);
        assert!(half > Q16::ONE && half < p.z_max);
    }
}
