//! Once-per-second status record
//!
//! Counters accumulate between stats ticks; each tick produces a
//! `TelemetryRecord` that is logged as one line of JSON.

use log::{info, warn};
use serde::Serialize;

use crate::renderer::FrameReport;
use crate::sim::{AccelOutput, AccelSample, BallState};

/// Counters since the previous record
#[derive(Debug, Clone, Default)]
pub struct Telemetry {
    frames: u32,
    steps: u32,
    blits: u32,
    pixels: u64,
    clamped: u32,
    watchdog: u32,
    accel_errors: u32,
    impacts: u32,
    records: u64,
}

/// Snapshot emitted on each stats tick
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TelemetryRecord {
    pub seq: u64,
    pub fps: u32,
    pub steps: u32,
    pub blits: u32,
    pub pixels: u64,
    pub clamped_frames: u32,
    pub watchdog_expired: u32,
    pub accel_errors: u32,
    pub impacts: u32,
    pub raw: [i16; 3],
    pub lp: [i32; 3],
    pub hp: [i32; 3],
    pub bang: i32,
    pub pos: [i32; 2],
    pub vel: [i32; 2],
    /// Depth scale, thousandths
    pub z_milli: i32,
    pub glint: u8,
    pub coproc: bool,
}

impl Telemetry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_steps(&mut self, n: u32) {
        self.steps += n;
    }

    pub fn record_frame(&mut self, report: &FrameReport) {
        self.frames += 1;
        self.blits += report.blits;
        self.pixels += report.pixels;
        self.clamped += report.clamped as u32;
        self.watchdog += report.watchdog_expired;
    }

    pub fn record_accel_error(&mut self) {
        self.accel_errors += 1;
    }

    pub fn record_impact(&mut self) {
        self.impacts += 1;
    }

    /// Frames drawn since the last record
    pub fn frames(&self) -> u32 {
        self.frames
    }

    /// Close the current window: build the record and reset the counters
    pub fn flush(
        &mut self,
        raw: AccelSample,
        accel: &AccelOutput,
        ball: &BallState,
        coproc: bool,
    ) -> TelemetryRecord {
        let record = TelemetryRecord {
            seq: self.records,
            fps: self.frames,
            steps: self.steps,
            blits: self.blits,
            pixels: self.pixels,
            clamped_frames: self.clamped,
            watchdog_expired: self.watchdog,
            accel_errors: self.accel_errors,
            impacts: self.impacts,
            raw: [raw.x, raw.y, raw.z],
            lp: accel.lp,
            hp: accel.hp,
            bang: accel.bang_score,
            pos: [ball.x.to_int(), ball.y.to_int()],
            vel: [ball.vx.to_int(), ball.vy.to_int()],
            z_milli: ((ball.depth.z.0 as i64 * 1000) >> 16) as i32,
            glint: ball.glint,
            coproc,
        };
        *self = Self {
            records: self.records + 1,
            ..Self::default()
        };
        record
    }
}

impl TelemetryRecord {
    /// Write the record to the log as JSON
    pub fn log(&self) {
        match serde_json::to_string(self) {
            Ok(json) => info!("telemetry {}", json),
            Err(e) => warn!("Failed to serialize telemetry: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::World;

    #[test]
    fn test_flush_resets_window() {
        let mut t = Telemetry::new();
        t.record_steps(120);
        for _ in 0..3 {
            t.record_frame(&FrameReport {
                blits: 2,
                pixels: 100,
                clamped: true,
                ..Default::default()
            });
        }
        t.record_accel_error();
        let ball = World::new(480, 320).ball;
        let rec = t.flush(AccelSample::NEUTRAL, &AccelOutput::default(), &ball, true);
        assert_eq!(rec.seq, 0);
        assert_eq!(rec.fps, 3);
        assert_eq!(rec.steps, 120);
        assert_eq!(rec.blits, 6);
        assert_eq!(rec.pixels, 300);
        assert_eq!(rec.clamped_frames, 3);
        assert_eq!(rec.accel_errors, 1);
        assert_eq!(rec.pos, [240, 160]);
        assert_eq!(rec.z_milli, 1000);

        let next = t.flush(AccelSample::NEUTRAL, &AccelOutput::default(), &ball, true);
        assert_eq!(next.seq, 1);
        assert_eq!(next.fps, 0);
        assert_eq!(t.frames(), 0);
    }

    #[test]
    fn test_record_serializes_to_json() {
        let ball = World::new(480, 320).ball;
        let rec = Telemetry::new().flush(AccelSample::new(1, -2, 512), &AccelOutput::default(), &ball, false);
        let json = serde_json::to_string(&rec).unwrap();
        assert!(json.contains("\"raw\":[1,-2,512]"));
        assert!(json.contains("\"coproc\":false"));
    }
}
