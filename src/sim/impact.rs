//! Impact impulses
//!
//! A rising-edge impact pulse turns into a velocity kick. The kick is held
//! until the next physics step so a render-only loop pass never loses it and
//! several steps in one pass never apply it twice.

use super::accel::AccelOutput;
use crate::fixed::{Q15, Q16};

/// Resolved impulse parameters
#[derive(Debug, Clone, Copy)]
pub struct ImpactConfig {
    pub enabled: bool,
    pub counts_per_g: i32,
    /// Score threshold the overshoot is measured from
    pub threshold: i32,
    /// Kick for a full 1 g overshoot, px/s
    pub gain: Q16,
    /// Minimum lateral high-pass L1 (raw counts) to use it as the direction
    pub dir_l1_min: i32,
    /// Minimum tilt L1 (Q15) to fall back to the tilt direction
    pub tilt_l1_min: i32,
}

impl Default for ImpactConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            counts_per_g: 512,
            threshold: 220,
            gain: Q16::from_int(250),
            dir_l1_min: 20,
            tilt_l1_min: 10,
        }
    }
}

/// Velocity change in Q16 px/s
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Impulse {
    pub dvx: Q16,
    pub dvy: Q16,
}

impl Impulse {
    pub const ZERO: Self = Self {
        dvx: Q16::ZERO,
        dvy: Q16::ZERO,
    };

    pub fn is_zero(&self) -> bool {
        self.dvx == Q16::ZERO && self.dvy == Q16::ZERO
    }
}

/// L1-normalized direction in Q15
fn unit_l1(x: i32, y: i32, l1: i32) -> (i32, i32) {
    (
        ((x as i64) << 15).checked_div(l1 as i64).unwrap_or(0) as i32,
        ((y as i64) << 15).checked_div(l1 as i64).unwrap_or(0) as i32,
    )
}

/// Compute the kick for one processed sample. Zero unless the sample carries
/// a pulse with a positive overshoot.
pub fn bang_impulse(out: &AccelOutput, cfg: &ImpactConfig) -> Impulse {
    if !cfg.enabled || !out.bang_pulse {
        return Impulse::ZERO;
    }
    let over = out.bang_score - cfg.threshold;
    if over <= 0 {
        return Impulse::ZERO;
    }

    let over_q15 = (((over as i64) << 15) / cfg.counts_per_g.max(1) as i64).min(Q15::MAX.0 as i64);
    let mag = (over_q15 * cfg.gain.0 as i64) >> 15;

    // Prefer the lateral transient; a mostly vertical tap follows the tilt
    let (hx, hy) = (out.hp[0], out.hp[1]);
    let l1 = hx.abs() + hy.abs();
    let (ux, uy) = if l1 >= cfg.dir_l1_min && l1 > 0 {
        unit_l1(hx, hy, l1)
    } else {
        let (tx, ty) = (out.soft_x.0, out.soft_y.0);
        let tl1 = tx.abs() + ty.abs();
        if tl1 >= cfg.tilt_l1_min && tl1 > 0 {
            unit_l1(tx, ty, tl1)
        } else {
            (Q15::MAX.0, 0)
        }
    };

    Impulse {
        dvx: Q16(((ux as i64 * mag) >> 15) as i32),
        dvy: Q16(((uy as i64 * mag) >> 15) as i32),
    }
}

/// One-slot mailbox between sample processing and the physics step
#[derive(Debug, Clone, Copy, Default)]
pub struct PendingImpulse {
    slot: Option<Impulse>,
}

impl PendingImpulse {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a kick, replacing any unconsumed one
    pub fn arm(&mut self, impulse: Impulse) {
        if !impulse.is_zero() {
            self.slot = Some(impulse);
        }
    }

    /// Consume the kick; subsequent calls return zero until re-armed
    pub fn take(&mut self) -> Impulse {
        self.slot.take().unwrap_or(Impulse::ZERO)
    }

    pub fn is_armed(&self) -> bool {
        self.slot.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pulse(score: i32, hp: [i32; 3], soft: (i32, i32)) -> AccelOutput {
        AccelOutput {
            hp,
            bang_score: score,
            soft_x: Q15(soft.0),
            soft_y: Q15(soft.1),
            bang_pulse: true,
            ..Default::default()
        }
    }

    #[test]
    fn test_no_pulse_no_kick() {
        let mut out = pulse(900, [100, 0, 0], (0, 0));
        out.bang_pulse = false;
        assert!(bang_impulse(&out, &ImpactConfig::default()).is_zero());
    }

    #[test]
    fn test_disabled_no_kick() {
        let cfg = ImpactConfig {
            enabled: false,
            ..Default::default()
        };
        assert!(bang_impulse(&pulse(900, [100, 0, 0], (0, 0)), &cfg).is_zero());
    }

    #[test]
    fn test_lateral_direction_preferred() {
        let cfg = ImpactConfig::default();
        // over = 256 counts = 0.5 g, so the kick is 125 px/s
        let imp = bang_impulse(&pulse(476, [-40, 0, 300], (20000, 0)), &cfg);
        assert!(imp.dvx.0 < 0);
        assert_eq!(imp.dvy, Q16::ZERO);
        assert!((imp.dvx.to_f32() + 125.0).abs() < 0.5);
    }

    #[test]
    fn test_vertical_tap_follows_tilt() {
        let cfg = ImpactConfig::default();
        let imp = bang_impulse(&pulse(476, [5, 5, 400], (0, -9000)), &cfg);
        assert_eq!(imp.dvx, Q16::ZERO);
        assert!(imp.dvy.0 < 0);
    }

    #[test]
    fn test_flat_vertical_tap_defaults_to_plus_x() {
        let cfg = ImpactConfig::default();
        let imp = bang_impulse(&pulse(476, [1, 1, 400], (2, 2)), &cfg);
        assert!(imp.dvx.0 > 0);
        assert_eq!(imp.dvy, Q16::ZERO);
    }

    #[test]
    fn test_overshoot_saturates_at_gain() {
        let cfg = ImpactConfig::default();
        let imp = bang_impulse(&pulse(10_000, [50, 0, 0], (0, 0)), &cfg);
        assert!(imp.dvx <= cfg.gain);
        assert!(imp.dvx.to_f32() > 249.0);
    }

    #[test]
    fn test_pending_consumed_once() {
        let mut p = PendingImpulse::new();
        assert!(p.take().is_zero());
        p.arm(Impulse {
            dvx: Q16::from_int(5),
            dvy: Q16::ZERO,
        });
        assert!(p.is_armed());
        assert_eq!(p.take().dvx, Q16::from_int(5));
        assert!(p.take().is_zero());
        assert!(!p.is_armed());
    }
}
