//! Software rendering module
//!
//! Everything is drawn on the CPU into RGB565 tiles with integer math and
//! pushed to the display through `platform::DisplayTransport`.

pub mod background;
pub mod color;
pub mod compositor;
pub mod hud;
pub mod postfx;
pub mod shader;
pub mod tile;

pub use background::DuneBackground;
pub use color::Rgb565;
pub use compositor::{FramePlan, FrameReport, FrameShapes, RenderState, TileCompositor};
pub use hud::HudStatus;
pub use postfx::Vignette;
pub use shader::{BallLook, ShaderConfig};
pub use tile::{Rect, Tile};
