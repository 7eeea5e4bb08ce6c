//! Fixed timestep physics step
//!
//! Advances the ball deterministically by one `SimParams::step`.

use super::state::{SimInput, SimParams, World};
use crate::ball_radius;
use crate::consts::BALL_R_MAX;
use crate::fixed::Q16;

/// Advance the world by one fixed step
pub fn step(world: &mut World, input: &SimInput, p: &SimParams) {
    let ball = &mut world.ball;

    ball.vx += input.impulse.dvx;
    ball.vy += input.impulse.dvy;

    ball.depth.update(input.az_lp, &p.depth);

    // soft (Q15) * px/s^2 is Q15 px/s^2; one more bit makes it Q16
    let ax = Q16((((input.soft_x.0 as i64) * p.accel_px_s2 as i64) << 1) as i32);
    let ay = Q16((((input.soft_y.0 as i64) * p.accel_px_s2 as i64) << 1) as i32);

    ball.vx += ax.mul(p.step);
    ball.vy += ay.mul(p.step);

    ball.vx = ball.vx.mul(p.damping);
    ball.vy = ball.vy.mul(p.damping);

    ball.x += ball.vx.mul(p.step);
    ball.y += ball.vy.mul(p.step);

    // Bounds are set for the largest ball; a smaller (farther) ball may go closer to the edge
    let (mut cx, mut cy) = ball.center();
    let shrink = BALL_R_MAX - ball_radius(cy, ball.depth.z);
    let (minx, maxx) = (p.minx - shrink, p.maxx + shrink);
    let (miny, maxy) = (p.miny - shrink, p.maxy + shrink);

    let bounce = |v: Q16| Q16(-(v.0.saturating_mul(p.restitution_num)) / p.restitution_den);

    if cx < minx {
        cx = minx;
        ball.x = Q16::from_int(cx);
        ball.vx = bounce(ball.vx);
    }
    if cx > maxx {
        cx = maxx;
        ball.x = Q16::from_int(cx);
        ball.vx = bounce(ball.vx);
    }
    if cy < miny {
        cy = miny;
        ball.y = Q16::from_int(cy);
        ball.vy = bounce(ball.vy);
    }
    if cy > maxy {
        cy = maxy;
        ball.y = Q16::from_int(cy);
        ball.vy = bounce(ball.vy);
    }

    world.steps += 1;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::*;
    use crate::fixed::Q15;
    use crate::settings::DemoConfig;
    use crate::sim::Impulse;
    use proptest::prelude::*;

    fn params() -> SimParams {
        DemoConfig::default().sim_params()
    }

    #[test]
    fn test_zero_input_stays_put() {
        let p = params();
        let mut w = World::new(LCD_W, LCD_H);
        let start = w.ball;
        for _ in 0..600 {
            step(&mut w, &SimInput::default(), &p);
        }
        assert_eq!(w.ball.x, start.x);
        assert_eq!(w.ball.y, start.y);
        assert_eq!(w.ball.vx, Q16::ZERO);
        assert_eq!(w.steps, 600);
    }

    #[test]
    fn test_tilt_accelerates_in_its_direction() {
        let p = params();
        let mut w = World::new(LCD_W, LCD_H);
        let input = SimInput {
            soft_x: Q15(8192),
            soft_y: Q15(-8192),
            ..Default::default()
        };
        for _ in 0..10 {
            step(&mut w, &input, &p);
        }
        assert!(w.ball.vx.0 > 0);
        assert!(w.ball.vy.0 < 0);
        assert!(w.ball.x > Q16::from_int(LCD_W / 2));
    }

    #[test]
    fn test_damping_decays_velocity() {
        let p = params();
        let mut w = World::new(LCD_W, LCD_H);
        w.ball.vx = Q16::from_int(200);
        w.ball.vy = Q16::from_int(-200);
        for _ in 0..1200 {
            step(&mut w, &SimInput::default(), &p);
        }
        assert!(w.ball.vx.abs() < Q16::ONE, "vx = {}", w.ball.vx.to_f32());
        assert!(w.ball.vy.abs() < Q16::ONE, "vy = {}", w.ball.vy.to_f32());
    }

    #[test]
    fn test_wall_bounce_reverses_and_loses_energy() {
        let p = params();
        let mut w = World::new(LCD_W, LCD_H);
        w.ball.x = Q16::from_int(p.maxx + 40);
        w.ball.vx = Q16::from_int(400);
        step(&mut w, &SimInput::default(), &p);
        assert!(w.ball.vx.0 < 0);
        assert!(w.ball.vx.abs() < Q16::from_int(400));
        assert!(w.ball.x.to_int() <= p.maxx + BALL_R_MAX);
    }

    #[test]
    fn test_impulse_applied_before_integration() {
        let p = params();
        let mut w = World::new(LCD_W, LCD_H);
        let input = SimInput {
            impulse: Impulse {
                dvx: Q16::from_int(100),
                dvy: Q16::ZERO,
            },
            ..Default::default()
        };
        step(&mut w, &input, &p);
        assert!(w.ball.vx > Q16::from_int(99));
        assert!(w.ball.x > Q16::from_int(LCD_W / 2));
    }

    /// Same parameters with walls far off screen, for the unclamped motion
    fn open_params(p: &SimParams) -> SimParams {
        SimParams {
            minx: -1_000_000,
            miny: -1_000_000,
            maxx: 1_000_000,
            maxy: 1_000_000,
            ..*p
        }
    }

    /// A reflected component turns around and keeps at most 3/4 of its speed
    fn check_reflection(before: Q16, after: Q16) -> Result<(), TestCaseError> {
        let (b, a) = (before.0 as i64, after.0 as i64);
        prop_assert!(a.abs() <= b.abs() * 3 / 4 + 1, "{} -> {}", b, a);
        prop_assert!(a == 0 || a.signum() == -b.signum(), "{} -> {}", b, a);
        Ok(())
    }

    proptest! {
        #[test]
        fn prop_damping_never_grows_velocity(
            vx in (-150i32..=150).prop_filter("nonzero", |v| *v != 0),
            vy in (-150i32..=150).prop_filter("nonzero", |v| *v != 0),
            frac in 0i32..65536,
        ) {
            let p = params();
            let mut w = World::new(LCD_W, LCD_H);
            w.ball.vx = Q16(vx * 65536 + frac);
            w.ball.vy = Q16(vy * 65536 - frac);
            // Half a second: at most 75 px from the center, well clear of the walls
            for _ in 0..60 {
                let (ovx, ovy) = (w.ball.vx, w.ball.vy);
                step(&mut w, &SimInput::default(), &p);
                prop_assert!(w.ball.vx.abs() <= ovx.abs(), "vx {} -> {}", ovx.0, w.ball.vx.0);
                prop_assert!(w.ball.vy.abs() <= ovy.abs(), "vy {} -> {}", ovy.0, w.ball.vy.0);
                prop_assert!(w.ball.vx.0.signum() * ovx.0.signum() >= 0);
                prop_assert!(w.ball.vy.0.signum() * ovy.0.signum() >= 0);
            }
        }

        #[test]
        fn prop_ball_stays_on_screen(
            tilts in prop::collection::vec((-32767i32..=32767, -32767i32..=32767, -300i32..=300), 1..300),
            az in 300i32..700,
        ) {
            let p = params();
            let open = open_params(&p);
            let mut w = World::new(LCD_W, LCD_H);
            for (sx, sy, kick) in tilts {
                let input = SimInput {
                    soft_x: Q15(sx),
                    soft_y: Q15(sy),
                    impulse: Impulse { dvx: Q16::from_int(kick), dvy: Q16::from_int(-kick) },
                    az_lp: az,
                };
                let mut free = w.clone();
                step(&mut free, &input, &open);
                step(&mut w, &input, &p);

                // Walls are widened by the depth shrink at the pre-clamp row
                let (fx, fy) = free.ball.center();
                let shrink = BALL_R_MAX - ball_radius(fy, w.ball.depth.z);
                let (minx, maxx) = (p.minx - shrink, p.maxx + shrink);
                let (miny, maxy) = (p.miny - shrink, p.maxy + shrink);

                let (cx, cy) = w.ball.center();
                prop_assert!(cx >= minx && cx <= maxx, "cx = {} in [{}, {}]", cx, minx, maxx);
                prop_assert!(cy >= miny && cy <= maxy, "cy = {} in [{}, {}]", cy, miny, maxy);
                prop_assert!(w.ball.depth.z >= p.depth.z_min && w.ball.depth.z <= p.depth.z_max);

                if fx < minx || fx > maxx {
                    check_reflection(free.ball.vx, w.ball.vx)?;
                } else {
                    prop_assert_eq!(w.ball.vx, free.ball.vx);
                }
                if fy < miny || fy > maxy {
                    check_reflection(free.ball.vy, w.ball.vy)?;
                } else {
                    prop_assert_eq!(w.ball.vy, free.ball.vy);
                }
            }
        }
    }
}
