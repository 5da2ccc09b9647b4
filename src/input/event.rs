use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

// Physical source an event came from, in polling order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum InputSource {
    Shuttle,
    Stick,
    Pointer,
}

// Logical control after mounting correction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogicalControl {
    ShuttlePrev,
    ShuttleNext,
    StickUp,
    StickDown,
    StickLeft,
    StickRight,
    StickPress,
    PointerLeft,
    PointerMiddle,
    PointerRight,
}

impl LogicalControl {
    pub fn source(self) -> InputSource {
        match self {
            LogicalControl::ShuttlePrev | LogicalControl::ShuttleNext => InputSource::Shuttle,
            LogicalControl::StickUp
            | LogicalControl::StickDown
            | LogicalControl::StickLeft
            | LogicalControl::StickRight
            | LogicalControl::StickPress => InputSource::Stick,
            LogicalControl::PointerLeft
            | LogicalControl::PointerMiddle
            | LogicalControl::PointerRight => InputSource::Pointer,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Down,
    Up,
    Held,
}

/// One physical transition, already expressed in logical terms.
#[derive(Debug, Clone, PartialEq)]
pub struct InputEvent {
    pub source: InputSource,
    pub control: LogicalControl,
    pub phase: Phase,
    pub timestamp: DateTime<Local>,
}

impl InputEvent {
    pub fn new(control: LogicalControl, phase: Phase, timestamp: DateTime<Local>) -> Self {
        Self {
            source: control.source(),
            control,
            phase,
            timestamp,
        }
    }

    pub fn down(control: LogicalControl, timestamp: DateTime<Local>) -> Self {
        Self::new(control, Phase::Down, timestamp)
    }

    pub fn up(control: LogicalControl, timestamp: DateTime<Local>) -> Self {
        Self::new(control, Phase::Up, timestamp)
    }

    pub fn held(control: LogicalControl, timestamp: DateTime<Local>) -> Self {
        Self::new(control, Phase::Held, timestamp)
    }
}

// Normalized user intent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AbstractAction {
    Prev,
    Next,
    Select,
    Back,
    Quit,
}

// Raw shuttle signal: a GPIO line changed level
#[derive(Debug, Clone)]
pub struct ShuttleSignal {
    pub line: u8,
    pub pressed: bool,
    pub timestamp: DateTime<Local>,
}

// Stick direction as seen by the hardware, before or after remapping
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StickDirection {
    Up,
    Down,
    Left,
    Right,
    Middle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StickAction {
    Pressed,
    Released,
    Held,
}

#[derive(Debug, Clone)]
pub struct StickSignal {
    pub direction: StickDirection,
    pub action: StickAction,
    pub timestamp: DateTime<Local>,
}

// Raw pointer button signal (1 left, 2 middle, 3 right, 4/5 wheel)
#[derive(Debug, Clone)]
pub struct PointerSignal {
    pub button: u8,
    pub pressed: bool,
    pub timestamp: DateTime<Local>,
}
