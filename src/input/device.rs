use tokio::sync::mpsc;
use tracing::{debug, warn};

// Adapter errors
#[derive(Debug, thiserror::Error)]
pub enum AdapterError {
    #[error("Input device unavailable: {0}")]
    DeviceUnavailable(String),

    #[error("Failed to read input device: {0}")]
    ReadError(String),

    #[error("Input device disconnected: {0}")]
    Disconnected(String),
}

/// A source of source-native signals, drained once per tick.
///
/// Implementations must not block; return whatever arrived since the last
/// call, possibly nothing.
pub trait RawDevice: Send {
    type Signal;

    fn name(&self) -> &str;

    fn drain(&mut self) -> Result<Vec<Self::Signal>, AdapterError>;
}

/// Device fed by the host over a channel.
///
/// Used when the host owns the actual event source (a windowing loop, a
/// replay file, a test) and forwards raw signals as they arrive.
#[derive(Debug)]
pub struct ChannelDevice<S> {
    name: String,
    receiver: mpsc::UnboundedReceiver<S>,
}

// Sending half handed to whoever produces the signals
#[derive(Debug, Clone)]
pub struct ChannelFeed<S> {
    sender: mpsc::UnboundedSender<S>,
}

impl<S> ChannelDevice<S> {
    pub fn new(name: impl Into<String>) -> (Self, ChannelFeed<S>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let name = name.into();
        debug!("Created channel device '{}'", name);
        (Self { name, receiver }, ChannelFeed { sender })
    }
}

impl<S> ChannelFeed<S> {
    // Returns false once the device side is gone
    pub fn send(&self, signal: S) -> bool {
        match self.sender.send(signal) {
            Ok(_) => true,
            Err(_) => {
                warn!("Channel device dropped, signal discarded");
                false
            }
        }
    }
}

impl<S: Send> RawDevice for ChannelDevice<S> {
    type Signal = S;

    fn name(&self) -> &str {
        &self.name
    }

    fn drain(&mut self) -> Result<Vec<S>, AdapterError> {
        let mut signals = Vec::new();
        loop {
            match self.receiver.try_recv() {
                Ok(signal) => signals.push(signal),
                Err(mpsc::error::TryRecvError::Empty) => break,
                Err(mpsc::error::TryRecvError::Disconnected) => {
                    if signals.is_empty() {
                        return Err(AdapterError::Disconnected(self.name.clone()));
                    }
                    break;
                }
            }
        }
        Ok(signals)
    }
}
