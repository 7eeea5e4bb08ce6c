//! The cooperative main loop
//!
//! `Demo` owns every piece of state and the four collaborators. Each
//! `iterate` call runs one pass in a fixed order:
//! sample -> filter -> measure time -> physics steps -> render -> glint -> stats.

use log::{debug, info, warn};

use crate::error::{DemoError, DisplayError};
use crate::platform::{AccelSensor, DisplayTransport, GlintSource, Timebase, discover_accel};
use crate::renderer::{FrameReport, HudStatus, RenderState, TileCompositor};
use crate::settings::DemoConfig;
use crate::sim::{
    AccelConfig, AccelFilter, AccelOutput, AccelSample, FrameScheduler, ImpactConfig,
    PendingImpulse, SimInput, SimParams, Ticks, World, bang_impulse, step,
};
use crate::telemetry::{Telemetry, TelemetryRecord};

pub struct Demo<A, D, T, G>
where
    A: AccelSensor,
    D: DisplayTransport,
    T: Timebase,
    G: GlintSource,
{
    cfg: DemoConfig,
    accel: A,
    lcd: D,
    clock: T,
    glint: G,

    accel_cfg: AccelConfig,
    impact_cfg: ImpactConfig,
    sim_params: SimParams,
    cycles_per_sec: u32,

    accel_present: bool,
    glint_ok: bool,
    /// Consecutive passes without a good sample
    accel_fail: u32,
    last_sample: AccelSample,
    last_output: AccelOutput,

    filter: AccelFilter,
    pending: PendingImpulse,
    world: World,
    scheduler: FrameScheduler,
    compositor: TileCompositor,
    render_state: RenderState,
    telemetry: Telemetry,
    last_record: Option<TelemetryRecord>,
    fps_last: u32,
    iterations: u64,
}

impl<A, D, T, G> Demo<A, D, T, G>
where
    A: AccelSensor,
    D: DisplayTransport,
    T: Timebase,
    G: GlintSource,
{
    /// Bring up the display, clock, accelerometer and co-processor.
    ///
    /// Only a dead display or clock is fatal; a missing accelerometer or
    /// co-processor leaves the demo running in degraded mode.
    pub fn boot(
        cfg: DemoConfig,
        mut accel: A,
        mut lcd: D,
        mut clock: T,
        mut glint: G,
    ) -> Result<Self, DemoError> {
        info!(
            "Dune Ball starting ({}x{}, render={}, depth={})",
            cfg.screen_w,
            cfg.screen_h,
            cfg.render_mode.as_str(),
            cfg.depth_model.as_str()
        );
        match serde_json::to_string(&cfg) {
            Ok(json) => debug!("config {}", json),
            Err(e) => warn!("Failed to serialize config: {}", e),
        }

        lcd.init()?;
        let cycles_per_sec = clock.cycles_per_sec();
        if cycles_per_sec == 0 {
            return Err(DemoError::Clock);
        }

        let mut compositor = TileCompositor::new(&cfg);
        compositor.draw_full_background(&mut lcd)?;

        let accel_present = discover_accel(
            &mut accel,
            &mut clock,
            cfg.accel_probe_attempts,
            cfg.accel_probe_retry_us,
        );

        let glint_ok = glint.init();
        if !glint_ok {
            warn!("Glint co-processor '{}' failed to start", glint.backend());
        }

        let world = World::new(cfg.screen_w, cfg.screen_h);
        let (cx, cy) = world.ball.center();
        let scheduler = FrameScheduler::new(cfg.scheduler_config(), clock.cycles());

        info!(
            "Ready: accel={} coproc={}({}) inference={}",
            accel_present,
            glint.backend(),
            glint_ok,
            cfg.inference
        );

        Ok(Self {
            accel_cfg: cfg.accel_config(),
            impact_cfg: cfg.impact_config(),
            sim_params: cfg.sim_params(),
            cycles_per_sec,
            accel_present,
            glint_ok,
            accel_fail: 0,
            last_sample: AccelSample::NEUTRAL,
            last_output: AccelOutput::default(),
            filter: AccelFilter::new(),
            pending: PendingImpulse::new(),
            world,
            scheduler,
            compositor,
            render_state: RenderState::new(cx, cy),
            telemetry: Telemetry::new(),
            last_record: None,
            fps_last: 0,
            iterations: 0,
            cfg,
            accel,
            lcd,
            clock,
            glint,
        })
    }

    /// One pass of the main loop
    pub fn iterate(&mut self) -> Ticks {
        self.iterations += 1;

        let sample = self.poll_accel();
        let out = self.filter.update(sample, &self.accel_cfg);
        if out.bang_pulse {
            let kick = bang_impulse(&out, &self.impact_cfg);
            if !kick.is_zero() {
                debug!(
                    "Impact: score={} kick=({:.1}, {:.1}) px/s",
                    out.bang_score,
                    kick.dvx.to_f32(),
                    kick.dvy.to_f32()
                );
                self.pending.arm(kick);
                self.telemetry.record_impact();
            }
        }
        self.last_sample = sample;
        self.last_output = out;

        let delta = self
            .scheduler
            .measure(self.clock.cycles(), self.cycles_per_sec);
        let ticks = self.scheduler.advance(delta);

        for _ in 0..ticks.physics_steps {
            let input = SimInput {
                soft_x: out.soft_x,
                soft_y: out.soft_y,
                impulse: self.pending.take(),
                az_lp: out.lp[2],
            };
            step(&mut self.world, &input, &self.sim_params);
        }
        self.telemetry.record_steps(ticks.physics_steps);

        if ticks.render {
            match self.render_frame() {
                Ok(report) => self.telemetry.record_frame(&report),
                Err(e) => warn!("Frame dropped: {}", e),
            }
        }

        if ticks.aux && self.glint_ok && self.cfg.inference {
            let ball = &self.world.ball;
            if let Some(g) = self.glint.step(ball.vx, ball.vy) {
                self.world.ball.glint = g;
            }
        }

        if ticks.stats {
            self.fps_last = self.telemetry.frames();
            let record =
                self.telemetry
                    .flush(self.last_sample, &self.last_output, &self.world.ball, self.glint_ok);
            record.log();
            self.last_record = Some(record);
        }

        ticks
    }

    /// Read one sample; any failure substitutes a zero reading
    fn poll_accel(&mut self) -> AccelSample {
        if !self.accel_present {
            self.accel_fail = self.accel_fail.saturating_add(1);
            return AccelSample::NEUTRAL;
        }
        match self.accel.read_sample() {
            Ok(s) => {
                self.accel_fail = 0;
                s
            }
            Err(e) => {
                debug!("Accelerometer read failed: {}", e);
                self.accel_fail = self.accel_fail.saturating_add(1);
                self.telemetry.record_accel_error();
                AccelSample::NEUTRAL
            }
        }
    }

    fn render_frame(&mut self) -> Result<FrameReport, DisplayError> {
        let hud = self.hud_status();
        self.compositor
            .render(&mut self.render_state, &self.world.ball, &hud, &mut self.lcd)
    }

    pub fn hud_status(&self) -> HudStatus {
        HudStatus {
            fps: self.fps_last,
            backend: self.glint.backend(),
            coproc_ok: self.glint_ok,
            inference: self.cfg.inference,
            accel_fail: self.accel_fail > 0,
        }
    }

    pub fn config(&self) -> &DemoConfig {
        &self.cfg
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    pub fn render_state(&self) -> &RenderState {
        &self.render_state
    }

    pub fn accel_present(&self) -> bool {
        self.accel_present
    }

    pub fn last_output(&self) -> &AccelOutput {
        &self.last_output
    }

    pub fn last_record(&self) -> Option<&TelemetryRecord> {
        self.last_record.as_ref()
    }

    pub fn fps(&self) -> u32 {
        self.fps_last
    }

    pub fn iterations(&self) -> u64 {
        self.iterations
    }

    pub fn lcd(&self) -> &D {
        &self.lcd
    }

    pub fn clock_mut(&mut self) -> &mut T {
        &mut self.clock
    }

    pub fn accel_mut(&mut self) -> &mut A {
        &mut self.accel
    }
}
