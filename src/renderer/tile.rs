//! Screen rectangles and the scratch tile
//!
//! All rectangles are inclusive on both ends, matching the LCD window
//! commands they end up as.

use super::color::Rgb565;

/// Inclusive screen rectangle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    pub x0: i32,
    pub y0: i32,
    pub x1: i32,
    pub y1: i32,
}

impl Rect {
    pub const fn new(x0: i32, y0: i32, x1: i32, y1: i32) -> Self {
        Self { x0, y0, x1, y1 }
    }

    /// Box of half-extents `rx`, `ry` around a point
    pub const fn around(cx: i32, cy: i32, rx: i32, ry: i32) -> Self {
        Self::new(cx - rx, cy - ry, cx + rx, cy + ry)
    }

    /// Anchored at `(x0, y0)` with the given size
    pub const fn sized(x0: i32, y0: i32, w: i32, h: i32) -> Self {
        Self::new(x0, y0, x0 + w - 1, y0 + h - 1)
    }

    pub const fn width(&self) -> i32 {
        self.x1 - self.x0 + 1
    }

    pub const fn height(&self) -> i32 {
        self.y1 - self.y0 + 1
    }

    pub const fn is_empty(&self) -> bool {
        self.x1 < self.x0 || self.y1 < self.y0
    }

    pub fn area(&self) -> usize {
        if self.is_empty() {
            0
        } else {
            self.width() as usize * self.height() as usize
        }
    }

    pub fn union(&self, other: &Rect) -> Rect {
        Rect::new(
            self.x0.min(other.x0),
            self.y0.min(other.y0),
            self.x1.max(other.x1),
            self.y1.max(other.y1),
        )
    }

    pub fn intersect(&self, other: &Rect) -> Option<Rect> {
        let r = Rect::new(
            self.x0.max(other.x0),
            self.y0.max(other.y0),
            self.x1.min(other.x1),
            self.y1.min(other.y1),
        );
        (!r.is_empty()).then_some(r)
    }

    /// Clip to a `w` x `h` screen
    pub fn clip(&self, w: i32, h: i32) -> Option<Rect> {
        self.intersect(&Rect::new(0, 0, w - 1, h - 1))
    }

    pub fn contains(&self, x: i32, y: i32) -> bool {
        x >= self.x0 && x <= self.x1 && y >= self.y0 && y <= self.y1
    }

    pub fn contains_rect(&self, other: &Rect) -> bool {
        other.x0 >= self.x0 && other.x1 <= self.x1 && other.y0 >= self.y0 && other.y1 <= self.y1
    }

    /// Midpoint, rounded toward negative infinity
    pub fn center(&self) -> (i32, i32) {
        ((self.x0 + self.x1).div_euclid(2), (self.y0 + self.y1).div_euclid(2))
    }
}

/// Scratch canvas covering one screen rectangle
///
/// The buffer is allocated once at its maximum size; each frame only
/// re-targets the rectangle and overwrites the pixels it covers.
#[derive(Debug, Clone)]
pub struct Tile {
    buf: Vec<Rgb565>,
    max_w: i32,
    max_h: i32,
    rect: Rect,
}

impl Tile {
    pub fn new(max_w: i32, max_h: i32) -> Self {
        let max_w = max_w.max(1);
        let max_h = max_h.max(1);
        Self {
            buf: vec![Rgb565::BLACK; max_w as usize * max_h as usize],
            max_w,
            max_h,
            rect: Rect::sized(0, 0, max_w, max_h),
        }
    }

    pub fn max_size(&self) -> (i32, i32) {
        (self.max_w, self.max_h)
    }

    /// Point the tile at `rect`. Returns false (and leaves the tile unchanged)
    /// if the rectangle is empty or exceeds capacity.
    pub fn retarget(&mut self, rect: Rect) -> bool {
        if rect.is_empty() || rect.width() > self.max_w || rect.height() > self.max_h {
            return false;
        }
        self.rect = rect;
        true
    }

    pub fn rect(&self) -> Rect {
        self.rect
    }

    pub fn width(&self) -> i32 {
        self.rect.width()
    }

    pub fn height(&self) -> i32 {
        self.rect.height()
    }

    /// Pixels of the current rectangle, row-major
    pub fn pixels(&self) -> &[Rgb565] {
        &self.buf[..self.rect.area()]
    }

    pub fn pixels_mut(&mut self) -> &mut [Rgb565] {
        let n = self.rect.area();
        &mut self.buf[..n]
    }

    pub fn fill(&mut self, c: Rgb565) {
        self.pixels_mut().fill(c);
    }

    #[inline]
    fn index(&self, x: i32, y: i32) -> Option<usize> {
        let lx = x - self.rect.x0;
        let ly = y - self.rect.y0;
        if lx < 0 || ly < 0 || lx >= self.width() || ly >= self.height() {
            return None;
        }
        Some(ly as usize * self.width() as usize + lx as usize)
    }

    /// Write one pixel in screen coordinates; out-of-tile writes are dropped
    #[inline]
    pub fn put(&mut self, x: i32, y: i32, c: Rgb565) {
        if let Some(i) = self.index(x, y) {
            self.buf[i] = c;
        }
    }

    /// Write only if `c` packs larger than what is there
    #[inline]
    pub fn put_max(&mut self, x: i32, y: i32, c: Rgb565) {
        if let Some(i) = self.index(x, y)
            && c > self.buf[i]
        {
            self.buf[i] = c;
        }
    }

    pub fn get(&self, x: i32, y: i32) -> Option<Rgb565> {
        self.index(x, y).map(|i| self.buf[i])
    }

    /// Mutable row `y` (screen coordinates) of the current rectangle
    pub fn row_mut(&mut self, y: i32) -> Option<&mut [Rgb565]> {
        let ly = y - self.rect.y0;
        if ly < 0 || ly >= self.height() {
            return None;
        }
        let w = self.width() as usize;
        let start = ly as usize * w;
        Some(&mut self.buf[start..start + w])
    }

    /// Fill the horizontal span `[xa, xb]` of row `y`, clipped to the tile
    pub fn hspan(&mut self, y: i32, xa: i32, xb: i32, c: Rgb565) {
        let x0 = self.rect.x0;
        let x1 = self.rect.x1;
        let (a, b) = (xa.max(x0), xb.min(x1));
        if a > b {
            return;
        }
        if let Some(row) = self.row_mut(y) {
            row[(a - x0) as usize..=(b - x0) as usize].fill(c);
        }
    }
}
