//! Dune Ball - a tilt-controlled shaded ball rolling over a sand dune
//!
//! Core modules:
//! - `fixed`: Fixed-point radix newtypes and integer math helpers
//! - `sim`: Accelerometer filtering, fixed-step physics, frame scheduling
//! - `renderer`: Fixed-point sphere shader and dirty-rect tile compositor
//! - `platform`: Sensor/display/clock/co-processor interfaces and host stand-ins
//! - `demo`: The cooperative main loop tying everything together
//! - `settings`: Startup configuration resolved before the loop runs

pub mod demo;
pub mod error;
pub mod fixed;
pub mod platform;
pub mod renderer;
pub mod settings;
pub mod sim;
pub mod telemetry;

pub use demo::Demo;
pub use error::{DemoError, DisplayError, SensorError};
pub use settings::{DemoConfig, DepthModel, RenderMode};

use fixed::{Q8, Q16};

/// Display and sizing constants
pub mod consts {
    /// LCD geometry (landscape)
    pub const LCD_W: i32 = 480;
    pub const LCD_H: i32 = 320;

    /// Perspective radius range at z-scale 1.0: small toward the top ("far"),
    /// large toward the bottom ("near")
    pub const BALL_R_MIN: i32 = 12;
    pub const BALL_R_MAX: i32 = 34;
    /// Largest radius the z-scale may produce
    pub const BALL_R_DRAW_MAX: i32 = 44;

    /// Rows at which the perspective ramp starts and ends
    pub const PERSPECTIVE_Y_FAR: i32 = 26;
    pub const PERSPECTIVE_Y_NEAR: i32 = LCD_H - 26;

    /// Scratch tile limits for the single-blit path
    pub const TILE_MAX_W: i32 = 200;
    pub const TILE_MAX_H: i32 = 200;

    /// Trail ring buffer length
    pub const TRAIL_LEN: usize = 12;
}

/// Radius of the ball whose center sits on row `cy`, scaled by depth `z`.
///
/// Both the collision envelope and the renderer use this, so what is drawn
/// and what bounces always agree.
pub fn ball_radius(cy: i32, z: Q16) -> i32 {
    use consts::*;

    let denom = PERSPECTIVE_Y_NEAR - PERSPECTIVE_Y_FAR;
    let t = if denom > 0 {
        Q8::from_ratio((cy - PERSPECTIVE_Y_FAR).clamp(0, denom), denom)
    } else {
        Q8::ONE
    };
    let r = BALL_R_MIN + Q8(t.0 * (BALL_R_MAX - BALL_R_MIN)).to_int();
    let r = r.clamp(BALL_R_MIN, BALL_R_MAX);
    Q16::from_int(r).mul(z).to_int().clamp(BALL_R_MIN, BALL_R_DRAW_MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use consts::*;

    #[test]
    fn test_ball_radius_perspective_range() {
        assert_eq!(ball_radius(0, Q16::ONE), BALL_R_MIN);
        assert_eq!(ball_radius(PERSPECTIVE_Y_FAR, Q16::ONE), BALL_R_MIN);
        assert_eq!(ball_radius(PERSPECTIVE_Y_NEAR, Q16::ONE), BALL_R_MAX);
        assert_eq!(ball_radius(LCD_H + 100, Q16::ONE), BALL_R_MAX);
    }

    #[test]
    fn test_ball_radius_monotonic_in_y() {
        let mut last = 0;
        for y in 0..LCD_H {
            let r = ball_radius(y, Q16::ONE);
            assert!(r >= last);
            last = r;
        }
    }

    #[test]
    fn test_ball_radius_z_scale() {
        let mid = LCD_H / 2;
        let base = ball_radius(mid, Q16::ONE);
        assert!(ball_radius(mid, Q16::from_f32(1.25)) > base);
        assert!(ball_radius(mid, Q16::from_f32(0.8)) < base);
        assert_eq!(ball_radius(LCD_H, Q16::from_int(4)), BALL_R_DRAW_MAX);
    }
}
