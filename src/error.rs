//! Error types for the demo's external collaborators
//!
//! Only two conditions are fatal (display and clock bring-up). Everything the
//! sensor or co-processor reports is recovered by substituting safe defaults.

use thiserror::Error;

/// Accelerometer transport failures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SensorError {
    #[error("sensor bus transfer failed")]
    Bus,
    #[error("unexpected WHO_AM_I value {0:#04x}")]
    WrongId(u8),
    #[error("accelerometer not present")]
    Absent,
}

/// Display transport failures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DisplayError {
    #[error("display controller did not initialize: {0}")]
    InitFailed(String),
    #[error("display bus transfer failed")]
    Bus,
    #[error("{w}x{h} region does not fit the {max_w}x{max_h} tile")]
    TileOverflow { w: i32, h: i32, max_w: i32, max_h: i32 },
}

/// Fatal bring-up failures
#[derive(Debug, Error)]
pub enum DemoError {
    #[error("display unavailable: {0}")]
    Display(#[from] DisplayError),
    #[error("timebase reports a zero tick frequency")]
    Clock,
}
