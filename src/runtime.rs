use chrono::{DateTime, Duration, Local};
use statum::{machine, state};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::KioskConfig;
use crate::gesture::Gesture;
use crate::input::{InputAdapters, InputEvent};
use crate::kiosk::{Kiosk, TickReport};
use crate::navigation::KioskCommand;

// Events collected by one tick
#[derive(Debug, Clone)]
pub struct InputBatch {
    pub events: Vec<InputEvent>,
    pub collected_at: DateTime<Local>,
}

// Gestures recognised in one tick
#[derive(Debug, Clone, Default)]
pub struct GestureBatch {
    pub gestures: Vec<Gesture>,
}

#[derive(Clone, Debug)]
pub struct FrameSettings {
    pub frame_interval_ms: u64,
    pub stats_interval: Duration,
}

impl Default for FrameSettings {
    fn default() -> Self {
        Self {
            frame_interval_ms: 33,
            stats_interval: Duration::seconds(30),
        }
    }
}

impl FrameSettings {
    pub fn from_config(config: &KioskConfig) -> Self {
        Self {
            frame_interval_ms: config.runtime.frame_interval_ms,
            stats_interval: config.stats_interval(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    #[error("Failed to initialize frame loop: {0}")]
    InitializationError(String),

    #[error("Failed to forward host command: {0}")]
    CommandChannelClosed(String),

    #[error("Frame loop task failed: {0}")]
    TaskFailed(String),
}

#[state]
#[derive(Debug, Clone)]
pub enum FrameState {
    Collecting,
    Interpreting(InputBatch),
    Dispatching(GestureBatch),
}

#[machine]
pub struct FrameLoop<S: FrameState> {
    kiosk: Kiosk,
    adapters: InputAdapters,
    settings: FrameSettings,
}

impl<S: FrameState> FrameLoop<S> {
    pub fn kiosk(&self) -> &Kiosk {
        &self.kiosk
    }

    pub fn settings(&self) -> &FrameSettings {
        &self.settings
    }
}

impl FrameLoop<Collecting> {
    pub fn create(
        kiosk: Kiosk,
        adapters: InputAdapters,
        settings: Option<FrameSettings>,
    ) -> Result<Self, RuntimeError> {
        let settings = settings.unwrap_or_default();
        info!("Creating frame loop with settings: {:?}", settings);
        if settings.frame_interval_ms == 0 {
            return Err(RuntimeError::InitializationError(
                "frame interval must be positive".to_string(),
            ));
        }
        if adapters.is_empty() {
            warn!("No input adapters registered, the kiosk will only run handlers");
        }
        Ok(Self::new(kiosk, adapters, settings))
    }

    // Poll every adapter once
    pub fn collect(mut self, now: DateTime<Local>) -> FrameLoop<Interpreting> {
        let events = self.adapters.collect(now);
        if !events.is_empty() {
            debug!(
                "Collected {} input events at {}",
                events.len(),
                now.format("%H:%M:%S.%3f")
            );
        }
        self.transition_with(InputBatch {
            events,
            collected_at: now,
        })
    }
}

impl FrameLoop<Interpreting> {
    pub fn interpret(mut self) -> FrameLoop<Dispatching> {
        let (events, now) = if let Some(batch) = self.get_state_data() {
            (batch.events.clone(), batch.collected_at)
        } else {
            warn!("No input batch found in state data, this should not happen");
            (Vec::new(), Local::now())
        };

        let gestures = self.kiosk.process_input_batch(&events, now);
        for gesture in &gestures {
            debug!("Gesture: {:?}", gesture);
        }
        self.transition_with(GestureBatch { gestures })
    }
}

impl FrameLoop<Dispatching> {
    pub fn dispatch(mut self) -> (FrameLoop<Collecting>, TickReport) {
        let gestures = self
            .get_state_data()
            .map(|batch| batch.gestures.clone())
            .unwrap_or_default();
        let report = self.kiosk.dispatch(&gestures);
        for (from, to) in &report.transitions {
            debug!("Tick moved {} -> {}", from, to);
        }
        (self.transition(), report)
    }
}

/// Drive the frame machine until cancelled or a Quit command went out.
pub async fn run_frame_loop(
    mut frame: FrameLoop<Collecting>,
    cancel: CancellationToken,
    commands: mpsc::Sender<KioskCommand>,
) -> Result<(), RuntimeError> {
    let settings = frame.settings().clone();
    info!(
        "Starting frame loop with {}ms interval",
        settings.frame_interval_ms
    );
    let mut interval_timer = tokio::time::interval(tokio::time::Duration::from_millis(
        settings.frame_interval_ms,
    ));
    interval_timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    let mut cycles: u64 = 0;
    let mut total_events: u64 = 0;
    let mut total_transitions: u64 = 0;
    let mut last_stats_time = Local::now();

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                info!("Frame loop cancelled on {}", frame.kiosk().current());
                return Ok(());
            }
            _ = interval_timer.tick() => {}
        }

        let now = Local::now();
        let interpreting = frame.collect(now);
        total_events += interpreting
            .get_state_data()
            .map(|batch| batch.events.len() as u64)
            .unwrap_or(0);
        let (next, report) = interpreting.interpret().dispatch();
        frame = next;
        cycles += 1;
        total_transitions += report.transitions.len() as u64;

        for command in report.commands {
            info!("Forwarding host command {:?}", command);
            commands
                .send(command)
                .await
                .map_err(|e| RuntimeError::CommandChannelClosed(e.to_string()))?;
            if command == KioskCommand::Quit {
                info!("Quit forwarded, leaving frame loop");
                return Ok(());
            }
        }

        let now = Local::now();
        if now - last_stats_time > settings.stats_interval {
            let elapsed_seconds = (now - last_stats_time).num_seconds().max(1);
            info!(
                "Frame stats: {} ticks, {} events, {} transitions in {} seconds",
                cycles, total_events, total_transitions, elapsed_seconds
            );
            info!(
                "Average: {:.2} ticks/sec, now on {}",
                cycles as f64 / elapsed_seconds as f64,
                frame.kiosk().current()
            );
            cycles = 0;
            total_events = 0;
            total_transitions = 0;
            last_stats_time = now;
        }
    }
}

/// Frame loop running as a tokio task.
pub struct FrameLoopHandle {
    cancel: CancellationToken,
    task: JoinHandle<Result<(), RuntimeError>>,
}

impl FrameLoopHandle {
    pub fn spawn(
        kiosk: Kiosk,
        adapters: InputAdapters,
        settings: Option<FrameSettings>,
        cancel: CancellationToken,
    ) -> Result<(Self, mpsc::Receiver<KioskCommand>), RuntimeError> {
        let frame = FrameLoop::create(kiosk, adapters, settings)?;
        let (command_sender, command_receiver) = mpsc::channel(16);

        let loop_cancel = cancel.clone();
        let task = tokio::spawn(async move {
            info!("Frame loop task started");
            let result = run_frame_loop(frame, loop_cancel, command_sender).await;
            if let Err(e) = &result {
                error!("Frame loop terminated with error: {}", e);
            }
            result
        });
        info!("Frame loop successfully started");

        Ok((Self { cancel, task }, command_receiver))
    }

    pub fn shutdown(&self) {
        info!("Frame loop shutdown requested");
        self.cancel.cancel();
    }

    pub async fn join(self) -> Result<(), RuntimeError> {
        self.task
            .await
            .map_err(|e| RuntimeError::TaskFailed(e.to_string()))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gesture::{BindingTable, ControlBinding, GestureSettings};
    use crate::input::{AbstractAction, ChannelDevice, LogicalControl, PointerAdapter, PointerSignal};
    use crate::menu::{CatalogContext, MenuCatalog};
    use crate::navigation::ScreenId;

    fn pointer_adapters() -> (InputAdapters, crate::input::ChannelFeed<PointerSignal>) {
        let (device, feed) = ChannelDevice::new("test-pointer");
        let mut adapters = InputAdapters::new(Duration::seconds(1));
        adapters.register(Box::new(PointerAdapter::new(device)));
        (adapters, feed)
    }

    fn click(feed: &crate::input::ChannelFeed<PointerSignal>, button: u8) {
        let now = Local::now();
        feed.send(PointerSignal {
            button,
            pressed: true,
            timestamp: now,
        });
        feed.send(PointerSignal {
            button,
            pressed: false,
            timestamp: now + Duration::milliseconds(40),
        });
    }

    #[test]
    fn one_frame_walks_the_typestates() {
        let (adapters, feed) = pointer_adapters();
        let kiosk = Kiosk::new(&KioskConfig::default());
        let frame = FrameLoop::create(kiosk, adapters, None).unwrap();

        click(&feed, 2);
        let interpreting = frame.collect(Local::now() + Duration::milliseconds(50));
        assert_eq!(interpreting.get_state_data().map(|b| b.events.len()), Some(2));

        let (frame, report) = interpreting.interpret().dispatch();
        assert_eq!(
            report.transitions,
            vec![(ScreenId::MainMenu, ScreenId::SystemInfo)]
        );
        assert_eq!(frame.kiosk().current(), ScreenId::SystemInfo);
    }

    #[test]
    fn zero_interval_is_rejected() {
        let (adapters, _feed) = pointer_adapters();
        let settings = FrameSettings {
            frame_interval_ms: 0,
            ..FrameSettings::default()
        };
        let result = FrameLoop::create(
            Kiosk::new(&KioskConfig::default()),
            adapters,
            Some(settings),
        );
        assert!(matches!(result, Err(RuntimeError::InitializationError(_))));
    }

    #[tokio::test]
    async fn quit_is_forwarded_and_stops_the_loop() {
        let (adapters, feed) = pointer_adapters();
        let mut bindings = BindingTable::default();
        bindings.bind(
            LogicalControl::PointerLeft,
            ControlBinding::simple(AbstractAction::Quit),
        );
        let kiosk = Kiosk::from_parts(
            GestureSettings::default(),
            bindings,
            MenuCatalog::default(),
            CatalogContext::default(),
        );
        let settings = FrameSettings {
            frame_interval_ms: 5,
            ..FrameSettings::default()
        };
        let (handle, mut commands) =
            FrameLoopHandle::spawn(kiosk, adapters, Some(settings), CancellationToken::new())
                .unwrap();

        click(&feed, 1);
        assert_eq!(commands.recv().await, Some(KioskCommand::Quit));
        assert!(handle.join().await.is_ok());
    }

    #[tokio::test]
    async fn cancellation_stops_the_loop() {
        let (adapters, _feed) = pointer_adapters();
        let cancel = CancellationToken::new();
        let (handle, _commands) = FrameLoopHandle::spawn(
            Kiosk::new(&KioskConfig::default()),
            adapters,
            None,
            cancel.clone(),
        )
        .unwrap();
        handle.shutdown();
        assert!(cancel.is_cancelled());
        assert!(handle.join().await.is_ok());
    }
}
