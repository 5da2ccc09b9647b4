//! Navigation state machine
//!
//! ```text
//!                    ┌── List      → MenuModel (wrap, select, push/pop)
//! AbstractAction ──► ├── View      → freeze / auto-cycle toggles
//!  (Back first)      ├── Viewer    → rotation + pause overlay
//!                    ├── Game      → pause overlay, rest delegated
//!                    ├── Confirm   → Yes/No sub-machine
//!                    └── Delegated → FeatureHandler → HandlerResult
//! ```
//!
//! Every path ends in an [`Effect`]; nothing here returns an error to the
//! host loop.

pub mod handler;
pub mod navigator;
pub mod screen;
pub mod state;

pub use handler::{FeatureError, FeatureHandler, HandlerRegistry, HandlerResult};
pub use navigator::{Effect, KioskCommand, Navigator};
pub use screen::{BackTarget, GameKind, ScreenId, ScreenKind};
pub use state::{
    ApplicationState, ConfirmDialog, DeviceAction, PauseChoice, PauseOverlay, RotationMode,
    Scratch,
};
