//! Deterministic simulation module
//!
//! Everything between the raw sensor sample and the ball position lives here.
//! This module must stay pure and deterministic:
//! - Fixed timestep only
//! - Integer (fixed-point) math only
//! - No rendering or platform dependencies

pub mod accel;
pub mod impact;
pub mod scheduler;
pub mod state;
pub mod tick;

pub use accel::{AccelConfig, AccelFilter, AccelOutput, AccelSample, AxisMap};
pub use impact::{ImpactConfig, Impulse, PendingImpulse, bang_impulse};
pub use scheduler::{FrameDelta, FrameScheduler, SchedulerConfig, Ticks};
pub use state::{BallState, DepthModel, DepthParams, DepthState, SimInput, SimParams, World};
pub use tick::step;
