//! Optional scanline + vignette pass applied to a tile before it is blitted

use serde::{Deserialize, Serialize};

use super::color::Rgb565;
use super::tile::Tile;

/// Which screen edges the vignette darkens
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Vignette {
    /// Left and right edges only
    #[default]
    Columns,
    /// Enhancement: top and bottom edges as well
    Frame,
}

/// Distance from the screen edge inside which the vignette darkens by 2 / 1 LSB
const VIGNETTE_INNER: i32 = 12;
const VIGNETTE_OUTER: i32 = 24;

/// Darken one pixel at screen position `(x, y)`
#[inline]
pub fn apply_pixel(
    c: Rgb565,
    x: i32,
    y: i32,
    screen_w: i32,
    screen_h: i32,
    vignette: Vignette,
) -> Rgb565 {
    let scan = if y & 1 == 1 { -1 } else { 0 };
    let edge = x.min(screen_w - 1 - x);
    let edge = match vignette {
        Vignette::Columns => edge,
        Vignette::Frame => edge.min(y).min(screen_h - 1 - y),
    };
    let vig = if edge < VIGNETTE_INNER {
        -2
    } else if edge < VIGNETTE_OUTER {
        -1
    } else {
        0
    };
    if scan == 0 && vig == 0 {
        return c;
    }
    let (r, g, b) = c.channels();
    Rgb565::from_channels(r + scan + vig, g + 2 * (scan + vig), b + scan + vig)
}

/// Run the pass over the tile's current rectangle
pub fn apply_tile(tile: &mut Tile, screen_w: i32, screen_h: i32, vignette: Vignette) {
    let rect = tile.rect();
    for y in rect.y0..=rect.y1 {
        if let Some(row) = tile.row_mut(y) {
            for (i, px) in row.iter_mut().enumerate() {
                *px = apply_pixel(*px, rect.x0 + i as i32, y, screen_w, screen_h, vignette);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::tile::Rect;

    #[test]
    fn test_even_interior_rows_untouched() {
        let c = Rgb565::pack(128, 128, 128);
        assert_eq!(apply_pixel(c, 240, 160, 480, 320, Vignette::Columns), c);
        assert_eq!(apply_pixel(c, 240, 160, 480, 320, Vignette::Frame), c);
    }

    #[test]
    fn test_odd_rows_and_edges_darken() {
        let c = Rgb565::pack(128, 128, 128);
        let (r, g, b) = c.channels();
        let cols = Vignette::Columns;
        assert_eq!(apply_pixel(c, 240, 161, 480, 320, cols), Rgb565::from_channels(r - 1, g - 2, b - 1));
        assert_eq!(apply_pixel(c, 3, 160, 480, 320, cols), Rgb565::from_channels(r - 2, g - 4, b - 2));
        assert_eq!(apply_pixel(c, 470, 160, 480, 320, cols), Rgb565::from_channels(r - 2, g - 4, b - 2));
    }

    #[test]
    fn test_row_falloff_only_with_frame_vignette() {
        let c = Rgb565::pack(128, 128, 128);
        let (r, g, b) = c.channels();
        assert_eq!(apply_pixel(c, 240, 300, 480, 320, Vignette::Columns), c);
        assert_eq!(apply_pixel(c, 240, 4, 480, 320, Vignette::Columns), c);
        assert_eq!(
            apply_pixel(c, 240, 300, 480, 320, Vignette::Frame),
            Rgb565::from_channels(r - 1, g - 2, b - 1)
        );
        assert_eq!(
            apply_pixel(c, 240, 4, 480, 320, Vignette::Frame),
            Rgb565::from_channels(r - 2, g - 4, b - 2)
        );
    }

    #[test]
    fn test_black_stays_black() {
        assert_eq!(apply_pixel(Rgb565::BLACK, 0, 1, 480, 320, Vignette::Frame), Rgb565::BLACK);
    }

    #[test]
    fn test_apply_tile_uses_screen_coordinates() {
        let mut t = Tile::new(4, 4);
        t.retarget(Rect::sized(100, 101, 2, 2));
        let c = Rgb565::pack(200, 200, 200);
        t.fill(c);
        apply_tile(&mut t, 480, 320, Vignette::Columns);
        assert_eq!(t.get(100, 101), Some(apply_pixel(c, 100, 101, 480, 320, Vignette::Columns)));
        assert_eq!(t.get(100, 102), Some(c));
    }
}
