//! Real hardware behind the input adapters.
//!
//! Both devices are optional: the `gpio` feature wires the shuttle to two
//! Raspberry Pi GPIO lines, the `gamepad` feature reads the stick from a
//! gamepad's D-pad. Without them the host feeds signals through
//! [`ChannelDevice`](super::device::ChannelDevice).

#[cfg(feature = "gpio")]
pub use self::gpio::GpioShuttle;

#[cfg(feature = "gamepad")]
pub use self::gamepad::GamepadStick;

#[cfg(feature = "gpio")]
mod gpio {
    use chrono::Local;
    use rppal::gpio::{Gpio, InputPin, Level};
    use tracing::{debug, info};

    use crate::input::adapters::ShuttleLines;
    use crate::input::device::{AdapterError, RawDevice};
    use crate::input::event::ShuttleSignal;

    struct WatchedLine {
        line: u8,
        pin: InputPin,
        last_level: Level,
    }

    // Polled shuttle buttons, active low with internal pull-ups
    pub struct GpioShuttle {
        lines: Vec<WatchedLine>,
    }

    impl GpioShuttle {
        pub fn open(lines: &ShuttleLines) -> Result<Self, AdapterError> {
            let gpio = Gpio::new().map_err(|e| AdapterError::DeviceUnavailable(e.to_string()))?;

            let mut watched = Vec::new();
            for line in [lines.prev_line, lines.next_line] {
                let pin = gpio
                    .get(line)
                    .map_err(|e| AdapterError::DeviceUnavailable(format!("line {}: {}", line, e)))?
                    .into_input_pullup();
                let last_level = pin.read();
                debug!("GPIO line {} starts at {:?}", line, last_level);
                watched.push(WatchedLine {
                    line,
                    pin,
                    last_level,
                });
            }

            info!("GPIO shuttle opened on lines {:?}", [lines.prev_line, lines.next_line]);
            Ok(Self { lines: watched })
        }
    }

    impl RawDevice for GpioShuttle {
        type Signal = ShuttleSignal;

        fn name(&self) -> &str {
            "gpio-shuttle"
        }

        fn drain(&mut self) -> Result<Vec<ShuttleSignal>, AdapterError> {
            let now = Local::now();
            let mut signals = Vec::new();
            for watched in &mut self.lines {
                let level = watched.pin.read();
                if level != watched.last_level {
                    watched.last_level = level;
                    signals.push(ShuttleSignal {
                        line: watched.line,
                        pressed: level == Level::Low,
                        timestamp: now,
                    });
                }
            }
            Ok(signals)
        }
    }
}

#[cfg(feature = "gamepad")]
mod gamepad {
    use chrono::Local;
    use gilrs::{Button, Event, EventType, Gilrs};
    use tracing::{debug, info, warn};

    use crate::input::device::{AdapterError, RawDevice};
    use crate::input::event::{StickAction, StickDirection, StickSignal};

    // Stick emulated by a gamepad's D-pad and south button
    pub struct GamepadStick {
        gilrs: Gilrs,
    }

    impl GamepadStick {
        pub fn open() -> Result<Self, AdapterError> {
            let gilrs = Gilrs::new().map_err(|e| AdapterError::DeviceUnavailable(e.to_string()))?;
            let count = gilrs.gamepads().count();
            if count == 0 {
                warn!("No gamepad connected, stick stays idle until one appears");
            } else {
                info!("Gamepad stick opened with {} gamepad(s)", count);
            }
            Ok(Self { gilrs })
        }
    }

    fn map_button(button: Button) -> Option<StickDirection> {
        match button {
            Button::DPadUp => Some(StickDirection::Up),
            Button::DPadDown => Some(StickDirection::Down),
            Button::DPadLeft => Some(StickDirection::Left),
            Button::DPadRight => Some(StickDirection::Right),
            Button::South => Some(StickDirection::Middle),
            _ => None,
        }
    }

    impl RawDevice for GamepadStick {
        type Signal = StickSignal;

        fn name(&self) -> &str {
            "gamepad-stick"
        }

        fn drain(&mut self) -> Result<Vec<StickSignal>, AdapterError> {
            let mut signals = Vec::new();
            while let Some(Event { event, .. }) = self.gilrs.next_event() {
                let now = Local::now();
                let (button, action) = match event {
                    EventType::ButtonPressed(button, _) => (button, StickAction::Pressed),
                    EventType::ButtonRepeated(button, _) => (button, StickAction::Held),
                    EventType::ButtonReleased(button, _) => (button, StickAction::Released),
                    EventType::Disconnected => {
                        warn!("Gamepad disconnected");
                        continue;
                    }
                    _ => continue,
                };
                match map_button(button) {
                    Some(direction) => signals.push(StickSignal {
                        direction,
                        action,
                        timestamp: now,
                    }),
                    None => debug!("Gamepad button {:?} ignored", button),
                }
            }
            Ok(signals)
        }
    }
}
