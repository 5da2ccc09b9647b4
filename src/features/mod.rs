//! Leaf feature handlers plugged into the navigator.

pub mod wifi;

pub use wifi::{NetworkService, Nmcli, WifiSettings};
