//! Host-side stand-ins for the board peripherals
//!
//! Deterministic (seeded) so runs are reproducible.

use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

use super::{AccelSensor, DisplayTransport, GlintSource, Timebase};
use crate::error::{DisplayError, SensorError};
use crate::fixed::Q16;
use crate::renderer::{Rect, Rgb565};
use crate::sim::AccelSample;

/// Counts per 1 g at the configured full-scale range
const ONE_G: i16 = 512;

/// Accelerometer replaying a tilt timeline with seeded noise and taps
#[derive(Debug, Clone)]
pub struct ScriptedAccel {
    present: bool,
    wrong_id: Option<u8>,
    rng: Pcg32,
    noise: i16,
    /// (first sample index, tilt) sorted by index
    script: Vec<(u64, [i16; 3])>,
    taps: Vec<(u64, [i16; 3])>,
    fail_every: Option<u64>,
    reads: u64,
}

impl ScriptedAccel {
    /// Board lying flat, light noise
    pub fn new(seed: u64) -> Self {
        Self {
            present: true,
            wrong_id: None,
            rng: Pcg32::seed_from_u64(seed),
            noise: 3,
            script: vec![(0, [0, 0, ONE_G])],
            taps: Vec::new(),
            fail_every: None,
            reads: 0,
        }
    }

    /// Nothing on the bus
    pub fn absent() -> Self {
        Self {
            present: false,
            ..Self::new(0)
        }
    }

    /// A different part answering at the expected address
    pub fn with_wrong_id(mut self, id: u8) -> Self {
        self.wrong_id = Some(id);
        self
    }

    pub fn with_noise(mut self, amplitude: i16) -> Self {
        self.noise = amplitude.max(0);
        self
    }

    /// From sample `at` onward, report this steady reading
    pub fn with_tilt_at(mut self, at: u64, tilt: [i16; 3]) -> Self {
        self.script.push((at, tilt));
        self.script.sort_by_key(|&(i, _)| i);
        self
    }

    /// Add a one-sample spike on top of the tilt at sample `at`
    pub fn with_tap_at(mut self, at: u64, spike: [i16; 3]) -> Self {
        self.taps.push((at, spike));
        self
    }

    /// Every `n`th read fails with a bus error
    pub fn with_failures(mut self, every: u64) -> Self {
        self.fail_every = (every > 0).then_some(every);
        self
    }

    pub fn reads(&self) -> u64 {
        self.reads
    }

    fn tilt_at(&self, n: u64) -> [i16; 3] {
        self.script
            .iter()
            .rev()
            .find(|&&(i, _)| i <= n)
            .map(|&(_, t)| t)
            .unwrap_or([0, 0, ONE_G])
    }
}

impl AccelSensor for ScriptedAccel {
    fn probe(&mut self) -> Result<(), SensorError> {
        if !self.present {
            return Err(SensorError::Absent);
        }
        match self.wrong_id {
            Some(id) => Err(SensorError::WrongId(id)),
            None => Ok(()),
        }
    }

    fn read_sample(&mut self) -> Result<AccelSample, SensorError> {
        if !self.present {
            return Err(SensorError::Absent);
        }
        let n = self.reads;
        self.reads += 1;
        if let Some(k) = self.fail_every
            && (n + 1) % k == 0
        {
            return Err(SensorError::Bus);
        }

        let mut v = self.tilt_at(n).map(|c| c as i32);
        for &(at, spike) in &self.taps {
            if at == n {
                for (c, s) in v.iter_mut().zip(spike) {
                    *c += s as i32;
                }
            }
        }
        if self.noise > 0 {
            let a = self.noise as i32;
            for c in v.iter_mut() {
                *c += self.rng.random_range(-a..=a);
            }
        }
        // 12-bit part
        let [x, y, z] = v.map(|c| c.clamp(-2048, 2047) as i16);
        Ok(AccelSample::new(x, y, z))
    }
}

/// RGB565 framebuffer recording every write
#[derive(Debug, Clone)]
pub struct MemoryLcd {
    width: i32,
    height: i32,
    fb: Vec<Rgb565>,
    init_error: Option<String>,
    /// `write_done` reports busy this many times after each blit
    busy_polls: u32,
    busy_left: u32,
    blits: u64,
    bytes: u64,
    last_rect: Option<Rect>,
}

impl MemoryLcd {
    pub fn new(width: i32, height: i32) -> Self {
        Self {
            width,
            height,
            fb: vec![Rgb565::BLACK; (width.max(0) * height.max(0)) as usize],
            init_error: None,
            busy_polls: 0,
            busy_left: 0,
            blits: 0,
            bytes: 0,
            last_rect: None,
        }
    }

    /// Controller that never comes up
    pub fn failing(width: i32, height: i32, reason: &str) -> Self {
        Self {
            init_error: Some(reason.to_string()),
            ..Self::new(width, height)
        }
    }

    pub fn with_busy_polls(mut self, polls: u32) -> Self {
        self.busy_polls = polls;
        self
    }

    pub fn pixel(&self, x: i32, y: i32) -> Option<Rgb565> {
        if x < 0 || y < 0 || x >= self.width || y >= self.height {
            return None;
        }
        Some(self.fb[(y * self.width + x) as usize])
    }

    pub fn framebuffer(&self) -> &[Rgb565] {
        &self.fb
    }

    pub fn blits(&self) -> u64 {
        self.blits
    }

    pub fn bytes_written(&self) -> u64 {
        self.bytes
    }

    pub fn last_rect(&self) -> Option<Rect> {
        self.last_rect
    }
}

impl DisplayTransport for MemoryLcd {
    fn init(&mut self) -> Result<(), DisplayError> {
        match &self.init_error {
            Some(reason) => Err(DisplayError::InitFailed(reason.clone())),
            None => Ok(()),
        }
    }

    fn start_blit(&mut self, rect: Rect, pixels: &[Rgb565]) -> Result<(), DisplayError> {
        let on_screen = rect.clip(self.width, self.height) == Some(rect);
        if !on_screen || pixels.len() < rect.area() {
            return Err(DisplayError::Bus);
        }
        let w = rect.width() as usize;
        for (row, src) in pixels[..rect.area()].chunks_exact(w).enumerate() {
            let start = ((rect.y0 + row as i32) * self.width + rect.x0) as usize;
            self.fb[start..start + w].copy_from_slice(src);
        }
        let bytes: &[u8] = bytemuck::cast_slice(&pixels[..rect.area()]);
        self.bytes += bytes.len() as u64;
        self.blits += 1;
        self.last_rect = Some(rect);
        self.busy_left = self.busy_polls;
        Ok(())
    }

    fn write_done(&mut self) -> bool {
        if self.busy_left > 0 {
            self.busy_left -= 1;
            return false;
        }
        true
    }
}

/// Cycle counter driven by the caller (or by reads, when auto-stepping)
#[derive(Debug, Clone)]
pub struct VirtualClock {
    cycles: u32,
    cycles_per_sec: u32,
    auto_step: u32,
    frozen: bool,
}

impl VirtualClock {
    pub fn new(cycles_per_sec: u32) -> Self {
        Self {
            cycles: 0,
            cycles_per_sec,
            auto_step: 0,
            frozen: false,
        }
    }

    /// Every `cycles()` read first advances by `us`
    pub fn with_auto_step_us(mut self, us: u32) -> Self {
        self.auto_step = self.us_to_cycles(us);
        self
    }

    fn us_to_cycles(&self, us: u32) -> u32 {
        (us as u64 * self.cycles_per_sec as u64 / 1_000_000) as u32
    }

    pub fn advance_us(&mut self, us: u32) {
        let c = self.us_to_cycles(us);
        self.advance_cycles(c);
    }

    pub fn advance_cycles(&mut self, c: u32) {
        if !self.frozen {
            self.cycles = self.cycles.wrapping_add(c);
        }
    }

    /// A frozen counter stops advancing (stuck timer)
    pub fn set_frozen(&mut self, frozen: bool) {
        self.frozen = frozen;
    }
}

impl Timebase for VirtualClock {
    fn cycles(&mut self) -> u32 {
        let step = self.auto_step;
        self.advance_cycles(step);
        self.cycles
    }

    fn cycles_per_sec(&self) -> u32 {
        self.cycles_per_sec
    }

    fn delay_us(&mut self, us: u32) {
        self.advance_us(us);
    }
}

/// CPU stand-in for the glint co-processor: faster ball, brighter glint
#[derive(Debug, Clone, Default)]
pub struct SpeedGlint {
    ready: bool,
    last: u8,
}

impl SpeedGlint {
    pub fn new() -> Self {
        Self::default()
    }
}

impl GlintSource for SpeedGlint {
    fn backend(&self) -> char {
        'C'
    }

    fn init(&mut self) -> bool {
        self.ready = true;
        true
    }

    fn step(&mut self, vx: Q16, vy: Q16) -> Option<u8> {
        if !self.ready {
            return None;
        }
        let speed = vx.to_int().abs() + vy.to_int().abs();
        let target = (speed / 3).min(255);
        // Rise fast, decay slowly
        let last = self.last as i32;
        let next = if target > last {
            target
        } else {
            last - ((last - target) >> 2).max(1).min(last - target)
        };
        self.last = next as u8;
        Some(self.last)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scripted_accel_timeline() {
        let mut a = ScriptedAccel::new(1)
            .with_noise(0)
            .with_tilt_at(3, [256, 0, 440])
            .with_tap_at(4, [0, 0, 600]);
        assert!(a.probe().is_ok());
        assert_eq!(a.read_sample(), Ok(AccelSample::new(0, 0, 512)));
        a.read_sample().ok();
        a.read_sample().ok();
        assert_eq!(a.read_sample(), Ok(AccelSample::new(256, 0, 440)));
        assert_eq!(a.read_sample(), Ok(AccelSample::new(256, 0, 1040)));
        assert_eq!(a.reads(), 5);
    }

    #[test]
    fn test_scripted_accel_faults() {
        assert_eq!(ScriptedAccel::absent().probe(), Err(SensorError::Absent));
        let mut wrong = ScriptedAccel::new(0).with_wrong_id(0x2A);
        assert_eq!(wrong.probe(), Err(SensorError::WrongId(0x2A)));

        let mut flaky = ScriptedAccel::new(0).with_failures(3);
        let results: Vec<bool> = (0..6).map(|_| flaky.read_sample().is_ok()).collect();
        assert_eq!(results, vec![true, true, false, true, true, false]);
    }

    #[test]
    fn test_noise_is_seeded() {
        let mut a = ScriptedAccel::new(42).with_noise(20);
        let mut b = ScriptedAccel::new(42).with_noise(20);
        for _ in 0..10 {
            assert_eq!(a.read_sample(), b.read_sample());
        }
    }

    #[test]
    fn test_memory_lcd_blit() {
        let mut lcd = MemoryLcd::new(8, 8).with_busy_polls(2);
        assert!(lcd.init().is_ok());
        let px = vec![Rgb565(7); 4];
        lcd.start_blit(Rect::sized(2, 3, 2, 2), &px).unwrap();
        assert_eq!(lcd.pixel(3, 4), Some(Rgb565(7)));
        assert_eq!(lcd.pixel(1, 3), Some(Rgb565::BLACK));
        assert_eq!(lcd.bytes_written(), 8);
        assert!(!lcd.write_done());
        assert!(!lcd.write_done());
        assert!(lcd.write_done());

        assert_eq!(lcd.start_blit(Rect::sized(7, 7, 2, 2), &px), Err(DisplayError::Bus));
        assert_eq!(lcd.blits(), 1);
    }

    #[test]
    fn test_failing_lcd() {
        let mut lcd = MemoryLcd::failing(8, 8, "no TE signal");
        assert!(matches!(lcd.init(), Err(DisplayError::InitFailed(_))));
    }

    #[test]
    fn test_virtual_clock() {
        let mut c = VirtualClock::new(150_000_000).with_auto_step_us(1000);
        assert_eq!(c.cycles(), 150_000);
        c.set_frozen(true);
        assert_eq!(c.cycles(), 150_000);
        c.delay_us(10);
        assert_eq!(c.cycles(), 150_000);
        c.set_frozen(false);
        c.delay_us(10);
        assert_eq!(c.cycles(), 150_000 + 1500 + 150_000);
    }

    #[test]
    fn test_speed_glint() {
        let mut g = SpeedGlint::new();
        assert_eq!(g.step(Q16::from_int(300), Q16::ZERO), None);
        assert!(g.init());
        assert_eq!(g.step(Q16::from_int(300), Q16::ZERO), Some(100));
        let decayed = g.step(Q16::ZERO, Q16::ZERO).unwrap_or(0);
        assert!(decayed < 100 && decayed > 50);
        assert_eq!(g.backend(), 'C');
    }
}
