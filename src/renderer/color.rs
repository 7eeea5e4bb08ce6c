//! RGB565 pixel type

use bytemuck::{Pod, Zeroable};

/// One LCD pixel: 5 bits red, 6 bits green, 5 bits blue
#[repr(transparent)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Pod, Zeroable)]
pub struct Rgb565(pub u16);

impl Rgb565 {
    pub const BLACK: Self = Self(0x0000);

    /// Pack 8-bit channels, saturating each at 255
    #[inline]
    pub const fn pack(r8: u32, g8: u32, b8: u32) -> Self {
        let r = if r8 > 255 { 255 } else { r8 };
        let g = if g8 > 255 { 255 } else { g8 };
        let b = if b8 > 255 { 255 } else { b8 };
        Self((((r >> 3) << 11) | ((g >> 2) << 5) | (b >> 3)) as u16)
    }

    /// Raw channel fields (r 0..31, g 0..63, b 0..31)
    #[inline]
    pub const fn channels(self) -> (i32, i32, i32) {
        (
            ((self.0 >> 11) & 0x1F) as i32,
            ((self.0 >> 5) & 0x3F) as i32,
            (self.0 & 0x1F) as i32,
        )
    }

    /// Rebuild from raw channel fields, clamping each to its width
    #[inline]
    pub fn from_channels(r: i32, g: i32, b: i32) -> Self {
        let r = r.clamp(0, 31) as u16;
        let g = g.clamp(0, 63) as u16;
        let b = b.clamp(0, 31) as u16;
        Self((r << 11) | (g << 5) | b)
    }
}

/// Colors for demo elements
pub mod colors {
    use super::Rgb565;

    /// Trail dots: older half lighter, newer half darker
    pub const TRAIL_OLD: Rgb565 = Rgb565(0x39E7);
    pub const TRAIL_NEW: Rgb565 = Rgb565(0x18C3);
    pub const HUD_TEXT: Rgb565 = Rgb565(0x001F);
    /// Raster-mode background while the accelerometer is failing
    pub const SENSOR_FAULT: Rgb565 = Rgb565(0x1800);
}
