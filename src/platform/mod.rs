//! Platform abstraction layer
//!
//! The demo core only talks to hardware through these traits:
//! - `AccelSensor`: 3-axis accelerometer
//! - `DisplayTransport`: windowed RGB565 LCD writes
//! - `Timebase`: free-running cycle counter and busy-wait delay
//! - `GlintSource`: optional co-processor producing the ball highlight
//!
//! `host` provides simulated implementations so the loop runs off-target.

pub mod host;

use log::{debug, info, warn};

use crate::error::{DisplayError, SensorError};
use crate::fixed::Q16;
use crate::renderer::{Rect, Rgb565};
use crate::sim::AccelSample;

pub trait AccelSensor {
    /// Check the device is present and configure it for streaming
    fn probe(&mut self) -> Result<(), SensorError>;
    fn read_sample(&mut self) -> Result<AccelSample, SensorError>;
}

pub trait DisplayTransport {
    fn init(&mut self) -> Result<(), DisplayError>;
    /// Start writing `pixels` (row-major, `rect.area()` of them) into `rect`
    fn start_blit(&mut self, rect: Rect, pixels: &[Rgb565]) -> Result<(), DisplayError>;
    /// True once the last started write has finished
    fn write_done(&mut self) -> bool;
}

pub trait Timebase {
    /// Free-running counter; wraps
    fn cycles(&mut self) -> u32;
    fn cycles_per_sec(&self) -> u32;
    fn delay_us(&mut self, us: u32);
}

pub trait GlintSource {
    /// Single character identifying the backend on the HUD
    fn backend(&self) -> char;
    fn init(&mut self) -> bool;
    /// New glint for the current ball velocity, or `None` to keep the old one
    fn step(&mut self, vx: Q16, vy: Q16) -> Option<u8>;
}

/// Probe the accelerometer until it answers. Returns false after
/// `attempts` failures; the caller then runs without tilt input.
pub fn discover_accel<S: AccelSensor, T: Timebase>(
    sensor: &mut S,
    clock: &mut T,
    attempts: u32,
    retry_us: u32,
) -> bool {
    for attempt in 1..=attempts.max(1) {
        match sensor.probe() {
            Ok(()) => {
                info!("Accelerometer found after {} attempt(s)", attempt);
                return true;
            }
            Err(e) => {
                debug!("Accelerometer probe {}/{} failed: {}", attempt, attempts, e);
                clock.delay_us(retry_us);
            }
        }
    }
    warn!("Accelerometer not found; continuing with neutral tilt");
    false
}

/// Poll for write completion at most `spins` times. On expiry the write is
/// treated as finished so the loop keeps running.
pub fn wait_write_done<D: DisplayTransport + ?Sized>(lcd: &mut D, spins: u32) -> bool {
    for _ in 0..spins {
        if lcd.write_done() {
            return true;
        }
        std::hint::spin_loop();
    }
    warn!("Display write watchdog expired after {} polls", spins);
    false
}
