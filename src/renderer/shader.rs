//! Fixed-point sphere shader
//!
//! Every pixel inside the ball's circle is lit analytically from its sphere
//! normal. Terms, all in Q14:
//! - ambient + Lambert diffuse over a silver base
//! - Blinn-like specular (`rz^16` by repeated squaring), boosted by glint
//! - Fresnel rim (`(1 - nz)^5`)
//! - environment reflection: ground/sky gradient plus a sun hotspot, rotated
//!   by the spin phase so the ball appears to roll
//! - hashed sparkles inside the highlight while glint is high
//!
//! The soft shadow is an ellipse below and right of the ball, max-blended so
//! it never darkens what is already drawn.

use super::color::Rgb565;
use super::tile::{Rect, Tile};
use crate::fixed::{Q14, Q16, isqrt_u32, sincos_q14};

const ONE: i32 = 1 << 14;

/// Resolved shading parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShaderConfig {
    /// Light direction (x right, y down, z toward viewer), about unit length in Q14
    pub light: [Q14; 3],
}

impl Default for ShaderConfig {
    fn default() -> Self {
        Self {
            light: [Q14(-6553), Q14(-9830), Q14(11469)],
        }
    }
}

/// Per-frame ball appearance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BallLook {
    pub phase: u32,
    pub glint: u8,
    pub spin_sin: Q14,
    pub spin_cos: Q14,
}

impl BallLook {
    /// Spin angle is the low byte of the phase counter
    pub fn new(phase: u32, glint: u8) -> Self {
        let (s, c) = sincos_q14(phase as u8);
        Self {
            phase,
            glint,
            spin_sin: s,
            spin_cos: c,
        }
    }
}

#[inline]
fn pow16(x: i32) -> i32 {
    let x2 = (x * x) >> 14;
    let x4 = (x2 * x2) >> 14;
    let x8 = (x4 * x4) >> 14;
    (x8 * x8) >> 14
}

#[inline]
fn xorshift32(mut x: u32) -> u32 {
    x ^= x << 13;
    x ^= x >> 17;
    x ^= x << 5;
    x
}

/// Cheap 2D hash to 8-bit noise
#[inline]
fn noise_u8(x: u32, y: u32, seed: u32) -> u8 {
    let n = x.wrapping_mul(0x9E37_79B1) ^ y.wrapping_mul(0x85EB_CA77) ^ seed;
    (xorshift32(n) >> 24) as u8
}

/// Precomputed per-frame terms shared by every pixel of the ball
struct Frame {
    l: [i32; 3],
    spin_sin: i32,
    spin_cos: i32,
    glint: u8,
    spec_k: i32,
    seed: u32,
    off_u: u32,
    off_v: u32,
}

impl Frame {
    fn new(look: &BallLook, cfg: &ShaderConfig) -> Self {
        Self {
            l: [cfg.light[0].0, cfg.light[1].0, cfg.light[2].0],
            spin_sin: look.spin_sin.0,
            spin_cos: look.spin_cos.0,
            glint: look.glint,
            spec_k: ONE + (look.glint as u32 * 8192 / 255) as i32,
            seed: look.phase.wrapping_mul(0xA511_E9B3) ^ (look.glint as u32).wrapping_mul(0x63D8_3595),
            off_u: (look.phase >> 3) & 255,
            off_v: (look.phase >> 4) & 255,
        }
    }

    #[inline]
    fn dot_l(&self, x: i32, y: i32, z: i32) -> i32 {
        ((x as i64 * self.l[0] as i64 + y as i64 * self.l[1] as i64 + z as i64 * self.l[2] as i64)
            >> 14) as i32
    }

    #[inline]
    fn rotate(&self, x: i32, y: i32) -> (i32, i32) {
        (
            ((x as i64 * self.spin_cos as i64 - y as i64 * self.spin_sin as i64) >> 14) as i32,
            ((x as i64 * self.spin_sin as i64 + y as i64 * self.spin_cos as i64) >> 14) as i32,
        )
    }

    /// Color for unit normal `(nx, ny, nz)` in Q14
    fn shade(&self, nx: i32, ny: i32, nz: i32) -> Rgb565 {
        let lz = self.l[2];

        let ndl = self.dot_l(nx, ny, nz).max(0);
        let rz = (((2 * ndl * nz) >> 14) - lz).clamp(0, ONE);
        let s16 = pow16(rz);

        let inv = (ONE - nz).max(0);
        let f2 = (inv * inv) >> 14;
        let f4 = (f2 * f2) >> 14;
        let f5 = (f4 * inv) >> 14;

        const AMBIENT: i32 = 1966;
        const DIFFUSE: i32 = 9011;
        const FRESNEL: i32 = 4096;
        let (base_r, base_g, base_b) = (150u32, 155u32, 165u32);

        let diff = (ndl * DIFFUSE) >> 14;
        let mut spec = (s16 * self.spec_k) >> 14;
        let fre = (f5 * FRESNEL) >> 14;
        let lum = (AMBIENT + diff).min(2 * ONE) as u32;

        let mut r8 = (base_r * lum) >> 14;
        let mut g8 = (base_g * lum) >> 14;
        let mut b8 = (base_b * lum) >> 14;

        // Reflected view ray, rolled by spin
        let rx = 2 * ((nz * nx) >> 14);
        let ry = 2 * ((nz * ny) >> 14);
        let rzr = 2 * ((nz * nz) >> 14) - ONE;
        let (rxr, ryr) = self.rotate(rx, ry);

        let t = ((rzr + ONE) >> 1).clamp(0, ONE) as u32;
        let ti = ONE as u32 - t;
        let (sky_r, sky_g, sky_b) = (90u32, 135u32, 180u32);
        let (grd_r, grd_g, grd_b) = (160u32, 120u32, 80u32);
        let mut env_r = (grd_r * ti + sky_r * t) >> 14;
        let mut env_g = (grd_g * ti + sky_g * t) >> 14;
        let mut env_b = (grd_b * ti + sky_b * t) >> 14;

        let sun = pow16(self.dot_l(rxr, ryr, rzr).clamp(0, ONE));
        let sun_k = ((sun * 220) >> 14) as u32;
        env_r += sun_k;
        env_g += sun_k * 210 / 220;
        env_b += sun_k * 170 / 220;

        let refl = (8192 + ((f5 * 8192) >> 14)) as u32;
        r8 += (env_r * refl) >> 14;
        g8 += (env_g * refl) >> 14;
        b8 += (env_b * refl) >> 14;

        if self.glint > 12 && s16 > 2500 {
            let (ux, uy) = self.rotate(nx, ny);
            let iu = ((ux + ONE) as u32 >> 7).wrapping_add(self.off_u);
            let iv = ((uy + ONE) as u32 >> 7).wrapping_add(self.off_v);
            let n = noise_u8(iu & 255, iv & 255, self.seed) as i32;
            let thresh = 252 - (self.glint as i32 >> 4);
            if n > thresh {
                let sparkle = ((n - thresh) << 10).min(ONE);
                spec += (sparkle * s16) >> 14;
            }
        }

        let spec_px = (255 * spec as u32) >> 14;
        r8 += spec_px;
        g8 += spec_px;
        b8 += spec_px;

        r8 += (40 * fre as u32) >> 14;
        g8 += (60 * fre as u32) >> 14;
        b8 += (90 * fre as u32) >> 14;

        Rgb565::pack(r8, g8, b8)
    }
}

/// Bounding box of a ball of radius `r`
pub fn ball_bounds(cx: i32, cy: i32, r: i32) -> Rect {
    Rect::around(cx, cy, r, r)
}

/// Shade the ball into whatever part of it the tile covers
pub fn draw_ball(tile: &mut Tile, cx: i32, cy: i32, r: i32, look: &BallLook, cfg: &ShaderConfig) {
    if r <= 0 {
        return;
    }
    let clip = tile.rect();
    let frame = Frame::new(look, cfg);
    let r2 = (r * r) as u32;

    for y in (cy - r).max(clip.y0)..=(cy + r).min(clip.y1) {
        let dy = y - cy;
        let dy2 = (dy * dy) as u32;
        if dy2 > r2 {
            continue;
        }
        let span = isqrt_u32(r2 - dy2) as i32;
        for x in (cx - span).max(clip.x0)..=(cx + span).min(clip.x1) {
            let dx = x - cx;
            let d2 = (dx * dx) as u32 + dy2;
            if d2 > r2 {
                continue;
            }
            let z = isqrt_u32(r2 - d2) as i32;
            let nx = (dx << 14) / r;
            let ny = (dy << 14) / r;
            let nz = (z << 14) / r;
            tile.put(x, y, frame.shade(nx, ny, nz));
        }
    }
}

/// Shadow ellipse center and radii for a ball of radius `r`
fn shadow_geometry(cx: i32, cy: i32, r: i32) -> (i32, i32, i32, i32) {
    (cx + r / 4, cy + r + r / 2 + 8, r + 18, r / 2 + 10)
}

/// Bounding box of the shadow ellipse
pub fn shadow_bounds(cx: i32, cy: i32, r: i32) -> Rect {
    let (sx, sy, rx, ry) = shadow_geometry(cx, cy, r);
    Rect::around(sx, sy, rx, ry)
}

/// Shadow strength from depth: a nearer (larger) ball casts a fainter shadow
pub fn shadow_alpha(z: Q16, z_max: Q16) -> u32 {
    let span = z_max.0 - Q16::ONE.0;
    if span <= 0 {
        return 60;
    }
    let dz = (z.0 - Q16::ONE.0) as i64;
    (60 - dz * 24 / span as i64).clamp(24, 96) as u32
}

/// Soft ambient-occlusion spot under the ball
pub fn draw_shadow(tile: &mut Tile, cx: i32, cy: i32, r: i32, alpha: u32) {
    if r <= 0 {
        return;
    }
    let alpha = alpha.min(255);
    let (sx, sy, rx, ry) = shadow_geometry(cx, cy, r);
    let (rx2, ry2) = ((rx * rx) as u32, (ry * ry) as u32);
    let clip = tile.rect();

    for y in (sy - ry).max(clip.y0)..=(sy + ry).min(clip.y1) {
        let dy = y - sy;
        let dy2 = (dy * dy) as u32;
        for x in (sx - rx).max(clip.x0)..=(sx + rx).min(clip.x1) {
            let dx = x - sx;
            let dx2 = (dx * dx) as u32;
            let d = dx2 * 256 / rx2 + dy2 * 256 / ry2;
            if d >= 256 {
                continue;
            }
            let a = (256 - d) * alpha / 255;
            tile.put_max(x, y, Rgb565::pack(a, a, a + a / 3));
        }
    }
}

/// Solid disc, used for trail dots
pub fn fill_circle(tile: &mut Tile, cx: i32, cy: i32, r: i32, c: Rgb565) {
    if r <= 0 {
        return;
    }
    let r2 = (r * r) as u32;
    let clip = tile.rect();
    for y in (cy - r).max(clip.y0)..=(cy + r).min(clip.y1) {
        let dy = y - cy;
        let span = isqrt_u32(r2 - (dy * dy) as u32) as i32;
        tile.hspan(y, cx - span, cx + span, c);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tile_at(rect: Rect) -> Tile {
        let mut t = Tile::new(200, 200);
        assert!(t.retarget(rect));
        t.fill(Rgb565::BLACK);
        t
    }

    #[test]
    fn test_ball_stays_inside_circle() {
        let mut t = tile_at(Rect::sized(0, 0, 100, 100));
        draw_ball(&mut t, 50, 50, 20, &BallLook::new(0, 0), &ShaderConfig::default());
        for y in 0..100 {
            for x in 0..100 {
                let d2 = (x - 50) * (x - 50) + (y - 50) * (y - 50);
                if d2 > 400 {
                    assert_eq!(t.get(x, y), Some(Rgb565::BLACK), "({x},{y}) painted");
                }
            }
        }
        assert_ne!(t.get(50, 50), Some(Rgb565::BLACK));
    }

    #[test]
    fn test_highlight_faces_light() {
        let mut t = tile_at(Rect::sized(0, 0, 100, 100));
        draw_ball(&mut t, 50, 50, 30, &BallLook::new(0, 0), &ShaderConfig::default());
        let lum = |c: Rgb565| {
            let (r, g, b) = c.channels();
            r + g / 2 + b
        };
        // Light comes from upper left
        let lit = t.get(40, 36).map(lum).unwrap_or(0);
        let dark = t.get(66, 66).map(lum).unwrap_or(0);
        assert!(lit > dark, "lit {lit} <= dark {dark}");
    }

    #[test]
    fn test_zero_radius_is_noop() {
        let mut t = tile_at(Rect::sized(0, 0, 10, 10));
        draw_ball(&mut t, 5, 5, 0, &BallLook::new(3, 200), &ShaderConfig::default());
        draw_shadow(&mut t, 5, 5, -2, 60);
        fill_circle(&mut t, 5, 5, 0, Rgb565(0xFFFF));
        assert!(t.pixels().iter().all(|&p| p == Rgb565::BLACK));
    }

    #[test]
    fn test_ball_clipped_by_tile() {
        let mut t = tile_at(Rect::sized(0, 0, 20, 20));
        draw_ball(&mut t, 0, 0, 15, &BallLook::new(77, 40), &ShaderConfig::default());
        assert_ne!(t.get(3, 3), Some(Rgb565::BLACK));
    }

    #[test]
    fn test_shadow_max_blend_never_darkens() {
        let mut t = tile_at(Rect::sized(0, 0, 200, 200));
        t.fill(Rgb565(0xFFFF));
        draw_shadow(&mut t, 100, 60, 20, 96);
        assert!(t.pixels().iter().all(|&p| p == Rgb565(0xFFFF)));

        t.fill(Rgb565::BLACK);
        draw_shadow(&mut t, 100, 60, 20, 96);
        let (sx, sy, _, _) = shadow_geometry(100, 60, 20);
        assert_ne!(t.get(sx, sy), Some(Rgb565::BLACK));
        assert!(shadow_bounds(100, 60, 20).contains(sx, sy));
    }

    #[test]
    fn test_shadow_alpha_range() {
        let z_max = Q16::from_f32(1.25);
        assert_eq!(shadow_alpha(Q16::ONE, z_max), 60);
        assert_eq!(shadow_alpha(z_max, z_max), 36);
        assert!(shadow_alpha(Q16::from_f32(0.8), z_max) > 60);
        assert_eq!(shadow_alpha(Q16::from_int(9), z_max), 24);
        assert_eq!(shadow_alpha(Q16::from_f32(1.1), Q16::ONE), 60);
    }

    #[test]
    fn test_fill_circle_pixel_count() {
        let mut t = tile_at(Rect::sized(0, 0, 20, 20));
        fill_circle(&mut t, 10, 10, 2, Rgb565(1));
        let n = t.pixels().iter().filter(|&&p| p == Rgb565(1)).count();
        // rows: dy=-2..2 spans 1,3,5,3,1
        assert_eq!(n, 13);
    }

    #[test]
    fn test_glint_changes_highlight() {
        let cfg = ShaderConfig::default();
        let mut a = tile_at(Rect::sized(0, 0, 80, 80));
        let mut b = tile_at(Rect::sized(0, 0, 80, 80));
        draw_ball(&mut a, 40, 40, 30, &BallLook::new(9, 0), &cfg);
        draw_ball(&mut b, 40, 40, 30, &BallLook::new(9, 255), &cfg);
        assert_ne!(a.pixels(), b.pixels());
    }
}
