//! Input and navigation core of a handheld kiosk.
//!
//! Three physical sources (rotary shuttle, remapped 5-way stick, pointer)
//! are turned into abstract actions by the gesture engine and dispatched
//! to one navigation state machine, one frame tick at a time.

pub mod config;
pub mod features;
pub mod gesture;
pub mod input;
pub mod kiosk;
pub mod menu;
pub mod navigation;
pub mod runtime;
pub mod worker;

pub use config::{ConfigError, KioskConfig};
pub use kiosk::{Kiosk, TickReport};
pub use navigation::{KioskCommand, ScreenId};
pub use runtime::{FrameLoop, FrameLoopHandle, FrameSettings, RuntimeError};

#[derive(Debug, thiserror::Error)]
pub enum KioskError {
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Input error: {0}")]
    Adapter(#[from] input::AdapterError),

    #[error("Feature error: {0}")]
    Feature(#[from] navigation::FeatureError),

    #[error("Runtime error: {0}")]
    Runtime(#[from] RuntimeError),
}
