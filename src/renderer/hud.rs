//! Status line overlay
//!
//! A single row of 5x7 glyphs in the top-right corner:
//! `C:FFF B:K N:n I:n A:n` (frames per second, co-processor backend,
//! co-processor up, inference enabled, accelerometer failing).

use super::color::{Rgb565, colors};
use super::tile::{Rect, Tile};

pub const GLYPH_W: i32 = 5;
pub const GLYPH_H: i32 = 7;
/// Horizontal advance per character
pub const GLYPH_ADVANCE: i32 = GLYPH_W + 1;

const STATUS_LEN: usize = 21;
pub const HUD_W: i32 = STATUS_LEN as i32 * GLYPH_ADVANCE + 2;
pub const HUD_H: i32 = 9;
pub const HUD_MARGIN: i32 = 2;

/// Glyph rows, bit 4 is the leftmost column
fn glyph(c: u8) -> [u8; 7] {
    match c {
        b'0' => [0x0E, 0x11, 0x13, 0x15, 0x19, 0x11, 0x0E],
        b'1' => [0x04, 0x0C, 0x04, 0x04, 0x04, 0x04, 0x0E],
        b'2' => [0x0E, 0x11, 0x01, 0x02, 0x04, 0x08, 0x1F],
        b'3' => [0x1F, 0x02, 0x04, 0x02, 0x01, 0x11, 0x0E],
        b'4' => [0x02, 0x06, 0x0A, 0x12, 0x1F, 0x02, 0x02],
        b'5' => [0x1F, 0x10, 0x1E, 0x01, 0x01, 0x11, 0x0E],
        b'6' => [0x06, 0x08, 0x10, 0x1E, 0x11, 0x11, 0x0E],
        b'7' => [0x1F, 0x01, 0x02, 0x04, 0x08, 0x08, 0x08],
        b'8' => [0x0E, 0x11, 0x11, 0x0E, 0x11, 0x11, 0x0E],
        b'9' => [0x0E, 0x11, 0x11, 0x0F, 0x01, 0x02, 0x0C],
        b'A' => [0x0E, 0x11, 0x11, 0x1F, 0x11, 0x11, 0x11],
        b'B' => [0x1E, 0x11, 0x11, 0x1E, 0x11, 0x11, 0x1E],
        b'C' | b'c' => [0x0E, 0x11, 0x10, 0x10, 0x10, 0x11, 0x0E],
        b'D' => [0x1E, 0x11, 0x11, 0x11, 0x11, 0x11, 0x1E],
        b'E' => [0x1F, 0x10, 0x10, 0x1E, 0x10, 0x10, 0x1F],
        b'H' => [0x11, 0x11, 0x11, 0x1F, 0x11, 0x11, 0x11],
        b'I' => [0x0E, 0x04, 0x04, 0x04, 0x04, 0x04, 0x0E],
        b'K' => [0x11, 0x12, 0x14, 0x18, 0x14, 0x12, 0x11],
        b'N' => [0x11, 0x19, 0x15, 0x13, 0x11, 0x11, 0x11],
        b'R' => [0x1E, 0x11, 0x11, 0x1E, 0x14, 0x12, 0x11],
        b'S' => [0x0F, 0x10, 0x10, 0x0E, 0x01, 0x01, 0x1E],
        b'U' => [0x11, 0x11, 0x11, 0x11, 0x11, 0x11, 0x0E],
        b'(' => [0x02, 0x04, 0x08, 0x08, 0x08, 0x04, 0x02],
        b')' => [0x08, 0x04, 0x02, 0x02, 0x02, 0x04, 0x08],
        b':' => [0x00, 0x04, 0x04, 0x00, 0x04, 0x04, 0x00],
        _ => [0; 7],
    }
}

/// Pixel width of `text`
pub fn text_width(text: &[u8]) -> i32 {
    text.len() as i32 * GLYPH_ADVANCE
}

/// Draw `text` with its top-left at `(x, y)`; only set bits are written
pub fn draw_text(tile: &mut Tile, x: i32, y: i32, text: &[u8], color: Rgb565) {
    let clip = tile.rect();
    if y > clip.y1 || y + GLYPH_H <= clip.y0 {
        return;
    }
    for (i, &c) in text.iter().enumerate() {
        let gx = x + i as i32 * GLYPH_ADVANCE;
        if gx > clip.x1 || gx + GLYPH_W <= clip.x0 {
            continue;
        }
        for (row, bits) in glyph(c).iter().enumerate() {
            for col in 0..GLYPH_W {
                if bits & (1 << (4 - col)) != 0 {
                    tile.put(gx + col, y + row as i32, color);
                }
            }
        }
    }
}

/// What the status line reports
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HudStatus {
    pub fps: u32,
    pub backend: char,
    pub coproc_ok: bool,
    pub inference: bool,
    pub accel_fail: bool,
}

impl Default for HudStatus {
    fn default() -> Self {
        Self {
            fps: 0,
            backend: '-',
            coproc_ok: false,
            inference: false,
            accel_fail: false,
        }
    }
}

impl HudStatus {
    /// Render the status text; FPS is three digits, clamped to 999
    pub fn text(&self) -> [u8; STATUS_LEN] {
        let fps = self.fps.min(999);
        let digit = |d: u32| b'0' + d as u8;
        let flag = |b: bool| if b { b'1' } else { b'0' };
        let backend = if self.backend.is_ascii() {
            self.backend as u8
        } else {
            b'?'
        };
        [
            b'C',
            b':',
            digit(fps / 100),
            digit(fps / 10 % 10),
            digit(fps % 10),
            b' ',
            b'B',
            b':',
            backend,
            b' ',
            b'N',
            b':',
            flag(self.coproc_ok),
            b' ',
            b'I',
            b':',
            flag(self.inference),
            b' ',
            b'A',
            b':',
            flag(self.accel_fail),
        ]
    }
}

/// Screen area the HUD occupies
pub fn hud_rect(screen_w: i32) -> Rect {
    let x0 = screen_w - HUD_W - HUD_MARGIN;
    Rect::sized(x0, HUD_MARGIN, HUD_W, HUD_H)
}

/// Draw the status line into whatever part of the HUD the tile covers
pub fn draw_hud(tile: &mut Tile, status: &HudStatus, screen_w: i32) {
    let r = hud_rect(screen_w);
    draw_text(tile, r.x0 + 1, r.y0 + 1, &status.text(), colors::HUD_TEXT);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_text_format() {
        let s = HudStatus {
            fps: 58,
            backend: 'K',
            coproc_ok: true,
            inference: false,
            accel_fail: true,
        };
        assert_eq!(&s.text(), b"C:058 B:K N:1 I:0 A:1");
    }

    #[test]
    fn test_fps_clamped() {
        let s = HudStatus {
            fps: 12345,
            ..Default::default()
        };
        assert_eq!(&s.text()[..5], b"C:999");
    }

    #[test]
    fn test_hud_fits_on_screen() {
        let r = hud_rect(480);
        assert!(r.x0 >= 0);
        assert_eq!(r.x1, 480 - 1 - HUD_MARGIN);
        assert!(text_width(&HudStatus::default().text()) < r.width());
    }

    #[test]
    fn test_draw_text_sets_only_glyph_bits() {
        let mut t = Tile::new(16, 16);
        t.retarget(Rect::sized(0, 0, 16, 16));
        t.fill(Rgb565::BLACK);
        draw_text(&mut t, 0, 0, b"1", Rgb565(0xFFFF));
        let lit = t.pixels().iter().filter(|&&p| p == Rgb565(0xFFFF)).count();
        // '1': 1 + 2 + 1 + 1 + 1 + 1 + 3
        assert_eq!(lit, 10);
        assert_eq!(t.get(2, 0), Some(Rgb565(0xFFFF)));
        assert_eq!(t.get(0, 0), Some(Rgb565::BLACK));
    }

    #[test]
    fn test_draw_hud_outside_tile_is_noop() {
        let mut t = Tile::new(20, 20);
        t.retarget(Rect::sized(0, 200, 20, 20));
        t.fill(Rgb565::BLACK);
        draw_hud(&mut t, &HudStatus::default(), 480);
        assert!(t.pixels().iter().all(|&p| p == Rgb565::BLACK));
    }
}
