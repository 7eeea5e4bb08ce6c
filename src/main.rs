//! Dune Ball host runner
//!
//! Drives the demo loop against the simulated board: a scripted accelerometer
//! that tilts the board around and taps it a few times, an in-memory LCD and a
//! virtual cycle counter advancing 1 ms per loop pass.
//!
//! Usage: `dune-ball [seconds] [blit|raster] [flat|zscale]`

use dune_ball::platform::host::{MemoryLcd, ScriptedAccel, SpeedGlint, VirtualClock};
use dune_ball::{Demo, DemoConfig, DemoError, DepthModel, RenderMode};

/// Core clock of the target board
const CYCLES_PER_SEC: u32 = 150_000_000;
/// Virtual time per loop pass
const PASS_US: u32 = 1000;
/// Host accelerometer samples at 1 kHz, one per pass
const SAMPLES_PER_SEC: u64 = 1_000_000 / PASS_US as u64;

fn scripted_board(seed: u64) -> ScriptedAccel {
    let s = SAMPLES_PER_SEC;
    ScriptedAccel::new(seed)
        .with_noise(4)
        .with_tilt_at(s, [0, 220, 460])
        .with_tilt_at(3 * s, [-180, -120, 470])
        .with_tilt_at(5 * s, [200, -200, 430])
        .with_tilt_at(7 * s, [0, 0, 512])
        .with_tap_at(2 * s + s / 2, [250, 0, 700])
        .with_tap_at(6 * s, [0, -300, 650])
        .with_tap_at(8 * s, [0, 0, 900])
}

fn run() -> Result<(), DemoError> {
    let mut args = std::env::args().skip(1);
    let seconds: u64 = args.next().and_then(|s| s.parse().ok()).unwrap_or(10);
    let mut cfg = DemoConfig::default();
    if let Some(mode) = args.next() {
        match RenderMode::from_str(&mode) {
            Some(m) => cfg.render_mode = m,
            None => log::warn!("Unknown render mode '{}', using {}", mode, cfg.render_mode.as_str()),
        }
    }
    if let Some(depth) = args.next() {
        match DepthModel::from_str(&depth) {
            Some(d) => cfg.depth_model = d,
            None => log::warn!("Unknown depth model '{}', using {}", depth, cfg.depth_model.as_str()),
        }
    }

    let (w, h) = (cfg.screen_w, cfg.screen_h);
    let mut demo = Demo::boot(
        cfg,
        scripted_board(0x5EED),
        MemoryLcd::new(w, h),
        VirtualClock::new(CYCLES_PER_SEC).with_auto_step_us(PASS_US),
        SpeedGlint::new(),
    )?;

    for _ in 0..seconds * SAMPLES_PER_SEC {
        demo.iterate();
    }

    let ball = demo.world().ball;
    let lcd = demo.lcd();
    log::info!(
        "Done: {} passes, {} physics steps, last fps {}, ball at {:?}, {} blits / {} KiB to LCD",
        demo.iterations(),
        demo.world().steps,
        demo.fps(),
        ball.center(),
        lcd.blits(),
        lcd.bytes_written() / 1024
    );
    Ok(())
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(e) = run() {
        log::error!("Fatal: {}", e);
        std::process::exit(1);
    }
}
