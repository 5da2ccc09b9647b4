//! Gesture/timing engine
//!
//! Press timers and the held set per logical control, short/long
//! classification on release, the two-control reveal combo and one-shot
//! release suppression.

pub mod bindings;
pub mod combo;
pub mod engine;

pub use bindings::{Alternate, BindingTable, ControlBinding, Gesture};
pub use combo::{ComboSettings, ComboStep, ComboTracker, RevealContext};
pub use engine::{GestureEngine, GestureSettings};
