use chrono::{DateTime, Duration, Local};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

use super::device::{AdapterError, RawDevice};
use super::event::{
    InputEvent, InputSource, LogicalControl, Phase, PointerSignal, ShuttleSignal, StickAction,
    StickDirection, StickSignal,
};

/// Converts one physical source into logical [`InputEvent`]s.
pub trait InputAdapter: Send {
    fn source(&self) -> InputSource;

    fn poll(&mut self) -> Result<Vec<InputEvent>, AdapterError>;
}

// GPIO lines wired to the shuttle buttons
#[derive(Clone, Debug, PartialEq)]
pub struct ShuttleLines {
    pub prev_line: u8,
    pub next_line: u8,
}

impl Default for ShuttleLines {
    fn default() -> Self {
        Self {
            prev_line: 5,
            next_line: 6,
        }
    }
}

pub struct ShuttleAdapter<D> {
    device: D,
    lines: ShuttleLines,
}

impl<D: RawDevice<Signal = ShuttleSignal>> ShuttleAdapter<D> {
    pub fn new(device: D, lines: ShuttleLines) -> Self {
        info!(
            "Shuttle adapter on '{}' (prev line {}, next line {})",
            device.name(),
            lines.prev_line,
            lines.next_line
        );
        Self { device, lines }
    }

    fn map_line(&self, line: u8) -> Option<LogicalControl> {
        if line == self.lines.prev_line {
            Some(LogicalControl::ShuttlePrev)
        } else if line == self.lines.next_line {
            Some(LogicalControl::ShuttleNext)
        } else {
            None
        }
    }
}

impl<D: RawDevice<Signal = ShuttleSignal>> InputAdapter for ShuttleAdapter<D> {
    fn source(&self) -> InputSource {
        InputSource::Shuttle
    }

    fn poll(&mut self) -> Result<Vec<InputEvent>, AdapterError> {
        let signals = self.device.drain()?;
        let events = signals
            .into_iter()
            .filter_map(|signal| match self.map_line(signal.line) {
                Some(control) => {
                    let phase = if signal.pressed { Phase::Down } else { Phase::Up };
                    Some(InputEvent::new(control, phase, signal.timestamp))
                }
                None => {
                    debug!("Unmapped shuttle line {} dropped", signal.line);
                    None
                }
            })
            .collect();
        Ok(events)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RemapError {
    #[error("Physical {first:?} and {second:?} both map to logical {logical:?}")]
    DuplicateTarget {
        first: StickDirection,
        second: StickDirection,
        logical: StickDirection,
    },
}

/// Physical -> logical stick directions.
///
/// The stick is mounted rotated by 90 degrees, so the default table turns
/// physical up into logical left and so on around the dial.
#[derive(Clone, Debug, PartialEq)]
pub struct StickRemap {
    table: BTreeMap<StickDirection, StickDirection>,
}

impl Default for StickRemap {
    fn default() -> Self {
        let table = BTreeMap::from([
            (StickDirection::Up, StickDirection::Left),
            (StickDirection::Left, StickDirection::Down),
            (StickDirection::Down, StickDirection::Right),
            (StickDirection::Right, StickDirection::Up),
            (StickDirection::Middle, StickDirection::Middle),
        ]);
        Self { table }
    }
}

impl StickRemap {
    // Directions missing from the table are unmapped
    pub fn from_table(
        table: BTreeMap<StickDirection, StickDirection>,
    ) -> Result<Self, RemapError> {
        let mut seen = BTreeMap::new();
        for (physical, logical) in &table {
            if let Some(first) = seen.insert(*logical, *physical) {
                return Err(RemapError::DuplicateTarget {
                    first,
                    second: *physical,
                    logical: *logical,
                });
            }
        }
        Ok(Self { table })
    }

    pub fn logical(&self, physical: StickDirection) -> Option<StickDirection> {
        self.table.get(&physical).copied()
    }
}

fn stick_control(direction: StickDirection) -> LogicalControl {
    match direction {
        StickDirection::Up => LogicalControl::StickUp,
        StickDirection::Down => LogicalControl::StickDown,
        StickDirection::Left => LogicalControl::StickLeft,
        StickDirection::Right => LogicalControl::StickRight,
        StickDirection::Middle => LogicalControl::StickPress,
    }
}

pub struct StickAdapter<D> {
    device: D,
    remap: StickRemap,
}

impl<D: RawDevice<Signal = StickSignal>> StickAdapter<D> {
    pub fn new(device: D, remap: StickRemap) -> Self {
        info!("Stick adapter on '{}' with remap {:?}", device.name(), remap.table);
        Self { device, remap }
    }
}

impl<D: RawDevice<Signal = StickSignal>> InputAdapter for StickAdapter<D> {
    fn source(&self) -> InputSource {
        InputSource::Stick
    }

    fn poll(&mut self) -> Result<Vec<InputEvent>, AdapterError> {
        let signals = self.device.drain()?;
        let events = signals
            .into_iter()
            .filter_map(|signal| {
                let Some(logical) = self.remap.logical(signal.direction) else {
                    debug!("Unmapped stick direction {:?} dropped", signal.direction);
                    return None;
                };
                let phase = match signal.action {
                    StickAction::Pressed => Phase::Down,
                    StickAction::Released => Phase::Up,
                    StickAction::Held => Phase::Held,
                };
                Some(InputEvent::new(
                    stick_control(logical),
                    phase,
                    signal.timestamp,
                ))
            })
            .collect();
        Ok(events)
    }
}

pub struct PointerAdapter<D> {
    device: D,
}

impl<D: RawDevice<Signal = PointerSignal>> PointerAdapter<D> {
    pub fn new(device: D) -> Self {
        info!("Pointer adapter on '{}'", device.name());
        Self { device }
    }

    fn map_button(button: u8) -> Option<LogicalControl> {
        match button {
            1 => Some(LogicalControl::PointerLeft),
            2 => Some(LogicalControl::PointerMiddle),
            3 => Some(LogicalControl::PointerRight),
            _ => None,
        }
    }
}

impl<D: RawDevice<Signal = PointerSignal>> InputAdapter for PointerAdapter<D> {
    fn source(&self) -> InputSource {
        InputSource::Pointer
    }

    fn poll(&mut self) -> Result<Vec<InputEvent>, AdapterError> {
        let signals = self.device.drain()?;
        let events = signals
            .into_iter()
            .filter_map(|signal| match Self::map_button(signal.button) {
                Some(control) => {
                    let phase = if signal.pressed { Phase::Down } else { Phase::Up };
                    Some(InputEvent::new(control, phase, signal.timestamp))
                }
                None => {
                    debug!("Unmapped pointer button {} dropped", signal.button);
                    None
                }
            })
            .collect();
        Ok(events)
    }
}

struct AdapterSlot {
    adapter: Box<dyn InputAdapter>,
    retry_at: Option<DateTime<Local>>,
    failures: u32,
}

/// All adapters of the device, polled in registration order every tick.
pub struct InputAdapters {
    slots: Vec<AdapterSlot>,
    retry_after: Duration,
}

impl InputAdapters {
    pub fn new(retry_after: Duration) -> Self {
        Self {
            slots: Vec::new(),
            retry_after,
        }
    }

    pub fn register(&mut self, adapter: Box<dyn InputAdapter>) {
        info!(
            "Registered {:?} adapter at position {}",
            adapter.source(),
            self.slots.len()
        );
        self.slots.push(AdapterSlot {
            adapter,
            retry_at: None,
            failures: 0,
        });
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Poll every adapter once. A failing adapter contributes nothing and is
    /// left alone until its retry time has passed.
    pub fn collect(&mut self, now: DateTime<Local>) -> Vec<InputEvent> {
        let mut events = Vec::new();
        for slot in &mut self.slots {
            if let Some(retry_at) = slot.retry_at {
                if now < retry_at {
                    continue;
                }
                debug!("Retrying {:?} adapter", slot.adapter.source());
            }

            match slot.adapter.poll() {
                Ok(mut batch) => {
                    if slot.failures > 0 {
                        info!(
                            "{:?} adapter recovered after {} failures",
                            slot.adapter.source(),
                            slot.failures
                        );
                    }
                    slot.failures = 0;
                    slot.retry_at = None;
                    events.append(&mut batch);
                }
                Err(e) => {
                    slot.failures += 1;
                    slot.retry_at = Some(now + self.retry_after);
                    // Only the first failure of a streak is worth a warning
                    if slot.failures == 1 {
                        warn!("{:?} adapter failed: {}", slot.adapter.source(), e);
                    } else {
                        debug!(
                            "{:?} adapter still failing ({}): {}",
                            slot.adapter.source(),
                            slot.failures,
                            e
                        );
                    }
                }
            }
        }
        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::device::ChannelDevice;

    struct FlakyDevice {
        fail: bool,
        polls: usize,
    }

    impl RawDevice for FlakyDevice {
        type Signal = PointerSignal;

        fn name(&self) -> &str {
            "flaky"
        }

        fn drain(&mut self) -> Result<Vec<PointerSignal>, AdapterError> {
            self.polls += 1;
            if self.fail {
                Err(AdapterError::DeviceUnavailable("absent".to_string()))
            } else {
                Ok(Vec::new())
            }
        }
    }

    #[test]
    fn stick_directions_are_rotated() {
        let (device, feed) = ChannelDevice::new("stick");
        let mut adapter = StickAdapter::new(device, StickRemap::default());
        let now = Local::now();
        feed.send(StickSignal {
            direction: StickDirection::Up,
            action: StickAction::Pressed,
            timestamp: now,
        });
        feed.send(StickSignal {
            direction: StickDirection::Middle,
            action: StickAction::Held,
            timestamp: now,
        });

        let events = adapter.poll().unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].control, LogicalControl::StickLeft);
        assert_eq!(events[0].phase, Phase::Down);
        assert_eq!(events[1].control, LogicalControl::StickPress);
        assert_eq!(events[1].phase, Phase::Held);
    }

    #[test]
    fn remap_rejects_duplicate_targets() {
        let table = BTreeMap::from([
            (StickDirection::Up, StickDirection::Left),
            (StickDirection::Down, StickDirection::Left),
        ]);
        assert_eq!(
            StickRemap::from_table(table),
            Err(RemapError::DuplicateTarget {
                first: StickDirection::Up,
                second: StickDirection::Down,
                logical: StickDirection::Left,
            })
        );
    }

    #[test]
    fn unmapped_pointer_buttons_are_dropped() {
        let (device, feed) = ChannelDevice::new("pointer");
        let mut adapter = PointerAdapter::new(device);
        let now = Local::now();
        for button in [4, 1, 5] {
            feed.send(PointerSignal {
                button,
                pressed: true,
                timestamp: now,
            });
        }
        let events = adapter.poll().unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].control, LogicalControl::PointerLeft);
    }

    #[test]
    fn unknown_shuttle_lines_are_dropped() {
        let (device, feed) = ChannelDevice::new("shuttle");
        let mut adapter = ShuttleAdapter::new(device, ShuttleLines::default());
        let now = Local::now();
        feed.send(ShuttleSignal {
            line: 6,
            pressed: false,
            timestamp: now,
        });
        feed.send(ShuttleSignal {
            line: 17,
            pressed: true,
            timestamp: now,
        });
        let events = adapter.poll().unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].control, LogicalControl::ShuttleNext);
        assert_eq!(events[0].phase, Phase::Up);
    }

    #[test]
    fn failing_adapter_is_skipped_until_retry() {
        let mut adapters = InputAdapters::new(Duration::milliseconds(1000));
        adapters.register(Box::new(PointerAdapter::new(FlakyDevice {
            fail: true,
            polls: 0,
        })));
        let t0 = Local::now();
        assert!(adapters.collect(t0).is_empty());
        assert_eq!(adapters.slots[0].failures, 1);

        // Within the retry window the adapter is not touched
        assert!(adapters.collect(t0 + Duration::milliseconds(500)).is_empty());
        assert_eq!(adapters.slots[0].failures, 1);

        assert!(adapters.collect(t0 + Duration::milliseconds(1000)).is_empty());
        assert_eq!(adapters.slots[0].failures, 2);
    }

    #[test]
    fn events_keep_adapter_order() {
        let (shuttle, shuttle_feed) = ChannelDevice::new("shuttle");
        let (pointer, pointer_feed) = ChannelDevice::new("pointer");
        let mut adapters = InputAdapters::new(Duration::seconds(1));
        adapters.register(Box::new(ShuttleAdapter::new(shuttle, ShuttleLines::default())));
        adapters.register(Box::new(PointerAdapter::new(pointer)));

        let now = Local::now();
        pointer_feed.send(PointerSignal {
            button: 3,
            pressed: true,
            timestamp: now,
        });
        shuttle_feed.send(ShuttleSignal {
            line: 5,
            pressed: true,
            timestamp: now,
        });

        let events = adapters.collect(now);
        let sources: Vec<_> = events.iter().map(|e| e.source).collect();
        assert_eq!(sources, vec![InputSource::Shuttle, InputSource::Pointer]);
    }
}
