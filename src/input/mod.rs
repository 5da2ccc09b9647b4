//! Input adapters: physical sources to logical events
//!
//! ```text
//! Shuttle (GPIO) ──┐
//! Stick (remapped) ├──► InputAdapters ──► Vec<InputEvent> ──► GestureEngine
//! Pointer ─────────┘    (fixed order)
//! ```

pub mod adapters;
pub mod device;
pub mod event;
pub mod hardware;

pub use adapters::{
    InputAdapter, InputAdapters, PointerAdapter, RemapError, ShuttleAdapter, ShuttleLines,
    StickAdapter, StickRemap,
};
pub use device::{AdapterError, ChannelDevice, ChannelFeed, RawDevice};
pub use event::{
    AbstractAction, InputEvent, InputSource, LogicalControl, Phase, PointerSignal, ShuttleSignal,
    StickAction, StickDirection, StickSignal,
};
