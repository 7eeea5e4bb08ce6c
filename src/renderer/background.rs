//! Procedural sand-dune backdrop
//!
//! Generated once at boot into a half-resolution RGB565 texture; filling a
//! tile is then just `(x >> 1, y >> 1)` sampling.

use super::color::Rgb565;
use super::tile::Tile;
use crate::fixed::sincos_q14;

/// Texture size (half the LCD in each direction)
pub const DUNE_TEX_W: usize = 240;
pub const DUNE_TEX_H: usize = 160;

/// Bump-shading light, unnormalized (top-left, mostly toward the viewer)
const LIGHT: [i32; 3] = [-24, -40, 96];
/// Rows at the top of the texture that fade into haze
const HAZE_ROWS: i32 = 80;

#[derive(Debug, Clone)]
pub struct DuneBackground {
    height: Vec<u8>,
    tex: Vec<Rgb565>,
}

impl Default for DuneBackground {
    fn default() -> Self {
        Self::generate()
    }
}

#[inline]
fn sin_q14(angle: i32) -> i32 {
    sincos_q14((angle & 255) as u8).0.0
}

/// Rolling dunes: one warped primary ridge, a cross ridge and fine ripples
fn dune_height(x: i32, y: i32) -> u8 {
    let warp = sin_q14(y * 3) >> 9;
    let ridge = sin_q14(x * 2 + y * 3 + warp);
    let cross = sin_q14(x * 5 - y * 2);
    let ripple = sin_q14(x * 11 + y * 7);
    let h = 128 + ((ridge * 70) >> 14) + ((cross * 30) >> 14) + ((ripple * 10) >> 14);
    h.clamp(0, 255) as u8
}

impl DuneBackground {
    pub fn generate() -> Self {
        let (w, h) = (DUNE_TEX_W, DUNE_TEX_H);
        let mut height = Vec::with_capacity(w * h);
        for y in 0..h as i32 {
            for x in 0..w as i32 {
                height.push(dune_height(x, y));
            }
        }
        let tex = shade(&height, w, h);
        Self { height, tex }
    }

    pub fn height_at(&self, tx: usize, ty: usize) -> u8 {
        self.height[ty.min(DUNE_TEX_H - 1) * DUNE_TEX_W + tx.min(DUNE_TEX_W - 1)]
    }

    /// Backdrop color at screen pixel `(x, y)`, edge-clamped
    #[inline]
    pub fn sample(&self, x: i32, y: i32) -> Rgb565 {
        let tx = ((x.max(0) >> 1) as usize).min(DUNE_TEX_W - 1);
        let ty = ((y.max(0) >> 1) as usize).min(DUNE_TEX_H - 1);
        self.tex[ty * DUNE_TEX_W + tx]
    }

    /// Paint the backdrop under the tile's whole rectangle
    pub fn fill_tile(&self, tile: &mut Tile) {
        let rect = tile.rect();
        for y in rect.y0..=rect.y1 {
            let ty = ((y.max(0) >> 1) as usize).min(DUNE_TEX_H - 1);
            let src = &self.tex[ty * DUNE_TEX_W..(ty + 1) * DUNE_TEX_W];
            if let Some(row) = tile.row_mut(y) {
                for (i, px) in row.iter_mut().enumerate() {
                    let tx = (((rect.x0 + i as i32).max(0) >> 1) as usize).min(DUNE_TEX_W - 1);
                    *px = src[tx];
                }
            }
        }
    }
}

/// Bump-shade the heightmap with a warm sand palette and horizon haze
fn shade(height: &[u8], w: usize, h: usize) -> Vec<Rgb565> {
    let mut out = Vec::with_capacity(w * h);
    for y in 0..h {
        let (ya, yb) = (y.saturating_sub(1), (y + 1).min(h - 1));
        for x in 0..w {
            let (xa, xb) = (x.saturating_sub(1), (x + 1).min(w - 1));
            let c = height[y * w + x] as i32;
            let hx = height[y * w + xb] as i32 - height[y * w + xa] as i32;
            let hy = height[yb * w + x] as i32 - height[ya * w + x] as i32;

            let dot = (-hx * LIGHT[0] - hy * LIGHT[1] + 96 * LIGHT[2]).max(0);
            let lum = (dot / 64).min(255);

            let base_r = 210 + (c - 128) / 10;
            let base_g = 190 + (c - 128) / 14;
            let base_b = 150 + (c - 128) / 18;

            let mut r = base_r * (60 + lum) / 255;
            let mut g = base_g * (60 + lum) / 255;
            let mut b = base_b * (60 + lum) / 255;

            let haze = (HAZE_ROWS - y as i32).max(0);
            r += haze * 2 / 3;
            g += haze * 2 / 3;
            b += haze;

            out.push(Rgb565::pack(r.max(0) as u32, g.max(0) as u32, b.max(0) as u32));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::tile::Rect;

    #[test]
    fn test_texture_dimensions_and_variety() {
        let bg = DuneBackground::generate();
        assert_eq!(bg.tex.len(), DUNE_TEX_W * DUNE_TEX_H);
        let first = bg.tex[DUNE_TEX_W * 120];
        assert!(bg.tex[DUNE_TEX_W * 120..].iter().any(|&p| p != first));
        assert_eq!(bg.height_at(7, 9), dune_height(7, 9));
        assert_eq!(bg.height_at(9999, 0), dune_height(DUNE_TEX_W as i32 - 1, 0));
    }

    #[test]
    fn test_sample_is_half_resolution_and_clamped() {
        let bg = DuneBackground::generate();
        assert_eq!(bg.sample(10, 20), bg.sample(11, 21));
        assert_eq!(bg.sample(-50, -50), bg.sample(0, 0));
        assert_eq!(bg.sample(5000, 5000), bg.sample(479, 319));
    }

    #[test]
    fn test_fill_tile_matches_sample() {
        let bg = DuneBackground::generate();
        let mut t = Tile::new(40, 40);
        t.retarget(Rect::sized(300, 100, 33, 17));
        bg.fill_tile(&mut t);
        for (x, y) in [(300, 100), (332, 116), (317, 108)] {
            assert_eq!(t.get(x, y), Some(bg.sample(x, y)));
        }
    }

    #[test]
    fn test_haze_brightens_top() {
        let bg = DuneBackground::generate();
        let blue = |p: Rgb565| p.channels().2;
        let top: i32 = (0..DUNE_TEX_W).map(|x| blue(bg.tex[x])).sum();
        let low: i32 = (0..DUNE_TEX_W).map(|x| blue(bg.tex[(DUNE_TEX_H - 1) * DUNE_TEX_W + x])).sum();
        assert!(top > low);
    }
}
