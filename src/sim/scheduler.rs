//! Frame scheduling
//!
//! Turns a free-running cycle counter into:
//! - a whole number of fixed physics steps (bounded per pass, leftover kept)
//! - throttled render ticks
//! - co-processor (aux) and telemetry (stats) ticks
//!
//! The loop itself is never blocked; everything here is accumulate-and-drain.

use crate::fixed::Q16;

/// Resolved scheduling parameters
#[derive(Debug, Clone, Copy)]
pub struct SchedulerConfig {
    /// Physics step, seconds
    pub step: Q16,
    /// Most physics steps drained in one pass
    pub max_steps: u32,
    /// Largest delta fed to the physics accumulator, seconds
    pub max_delta: Q16,
    /// Substituted when the counter cannot produce a usable delta
    pub fallback_dt: Q16,
    pub fallback_us: u32,
    pub render_period_us: u32,
    pub aux_period_us: u32,
    pub stats_period_us: u32,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            step: Q16::from_ratio(1, 120),
            max_steps: 6,
            max_delta: Q16::from_ratio(1, 60),
            fallback_dt: Q16::from_ratio(1, 60),
            fallback_us: 16_667,
            render_period_us: 16_667,
            aux_period_us: 200_000,
            stats_period_us: 1_000_000,
        }
    }
}

/// Elapsed time for one loop pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameDelta {
    pub dt: Q16,
    pub us: u32,
}

/// What the current pass should do
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Ticks {
    pub physics_steps: u32,
    pub render: bool,
    pub aux: bool,
    pub stats: bool,
}

/// Accumulators for every periodic activity of the loop
#[derive(Debug, Clone)]
pub struct FrameScheduler {
    cfg: SchedulerConfig,
    last_cycles: u32,
    physics_accum: Q16,
    render_accum_us: u32,
    aux_accum_us: u32,
    stats_accum_us: u32,
}

impl FrameScheduler {
    /// `start_cycles` is the counter value the first delta is measured from
    pub fn new(cfg: SchedulerConfig, start_cycles: u32) -> Self {
        Self {
            cfg,
            last_cycles: start_cycles,
            physics_accum: Q16::ZERO,
            render_accum_us: 0,
            aux_accum_us: 0,
            stats_accum_us: 0,
        }
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.cfg
    }

    /// Time since the previous call. Counter wrap is handled by wrapping subtraction.
    pub fn measure(&mut self, now_cycles: u32, cycles_per_sec: u32) -> FrameDelta {
        let dc = now_cycles.wrapping_sub(self.last_cycles);
        self.last_cycles = now_cycles;

        let mut dt = self.cfg.fallback_dt;
        let mut us = self.cfg.fallback_us;
        if dc != 0 && cycles_per_sec != 0 {
            let q = ((dc as u64) << 16) / cycles_per_sec as u64;
            let u = (dc as u64 * 1_000_000) / cycles_per_sec as u64;
            if q > 0 && q <= i32::MAX as u64 {
                dt = Q16(q as i32);
            }
            if u > 0 {
                us = u.min(u32::MAX as u64) as u32;
            }
        }

        FrameDelta {
            dt: dt.clamp(Q16::ZERO, self.cfg.max_delta),
            us,
        }
    }

    /// Feed one delta and drain whatever became due
    pub fn advance(&mut self, delta: FrameDelta) -> Ticks {
        self.physics_accum += delta.dt;
        self.render_accum_us = self.render_accum_us.saturating_add(delta.us);
        self.aux_accum_us = self.aux_accum_us.saturating_add(delta.us);
        self.stats_accum_us = self.stats_accum_us.saturating_add(delta.us);

        let mut ticks = Ticks::default();
        while self.physics_accum >= self.cfg.step && ticks.physics_steps < self.cfg.max_steps {
            self.physics_accum -= self.cfg.step;
            ticks.physics_steps += 1;
        }

        if self.render_accum_us >= self.cfg.render_period_us {
            self.render_accum_us = 0;
            ticks.render = true;
        }
        if self.aux_accum_us >= self.cfg.aux_period_us {
            self.aux_accum_us = 0;
            ticks.aux = true;
        }
        if self.stats_accum_us >= self.cfg.stats_period_us {
            self.stats_accum_us = 0;
            ticks.stats = true;
        }
        ticks
    }

    /// Time banked for physics but not yet stepped
    pub fn pending_physics(&self) -> Q16 {
        self.physics_accum
    }
}
