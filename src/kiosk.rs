use chrono::{DateTime, Duration, Local};
use tracing::{debug, info};

use crate::config::KioskConfig;
use crate::gesture::{BindingTable, Gesture, GestureEngine, GestureSettings};
use crate::input::{AbstractAction, InputEvent};
use crate::menu::{CatalogContext, MenuCatalog};
use crate::navigation::{Effect, FeatureHandler, KioskCommand, Navigator, ScreenId};

// What one frame tick did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    pub transitions: Vec<(ScreenId, ScreenId)>,
    pub commands: Vec<KioskCommand>,
    pub dropped_backs: usize,
}

impl TickReport {
    pub fn is_idle(&self) -> bool {
        self.transitions.is_empty() && self.commands.is_empty()
    }
}

/// Gesture engine and navigator wired together for one display.
pub struct Kiosk {
    engine: GestureEngine,
    navigator: Navigator,
}

impl Kiosk {
    pub fn new(config: &KioskConfig) -> Self {
        let catalog = config.catalog();
        let settings = config.gesture_settings(&catalog);
        Self::from_parts(
            settings,
            BindingTable::default(),
            catalog,
            config.catalog_context(),
        )
    }

    pub fn from_parts(
        settings: GestureSettings,
        bindings: BindingTable,
        catalog: MenuCatalog,
        context: CatalogContext,
    ) -> Self {
        Self {
            engine: GestureEngine::new(settings, bindings),
            navigator: Navigator::new(catalog, context),
        }
    }

    pub fn register_handler(&mut self, handler: Box<dyn FeatureHandler>) {
        self.navigator.register_handler(handler);
    }

    pub fn navigator(&self) -> &Navigator {
        &self.navigator
    }

    // Deep links jump straight to a screen through here
    pub fn navigator_mut(&mut self) -> &mut Navigator {
        &mut self.navigator
    }

    pub fn engine(&self) -> &GestureEngine {
        &self.engine
    }

    pub fn current(&self) -> ScreenId {
        self.navigator.current()
    }

    /// Run the tick's events through the gesture engine, in adapter order,
    /// then let pending long presses and the combo fire.
    pub fn process_input_batch(
        &mut self,
        events: &[InputEvent],
        now: DateTime<Local>,
    ) -> Vec<Gesture> {
        let mut gestures = Vec::new();
        for event in events {
            let context = self.navigator.reveal_context();
            if let Some(gesture) = self.engine.process(event, context) {
                gestures.push(gesture);
            }
        }
        gestures.extend(self.engine.poll(now, self.navigator.reveal_context()));
        gestures
    }

    /// Apply one tick's gestures. Back is honoured at most once per tick.
    pub fn dispatch(&mut self, gestures: &[Gesture]) -> TickReport {
        let mut report = TickReport::default();
        let mut back_taken = false;

        for gesture in gestures {
            let is_back = matches!(
                gesture,
                Gesture::Action(AbstractAction::Back)
                    | Gesture::Pause {
                        fallback: AbstractAction::Back
                    }
            );
            if is_back && back_taken {
                debug!("Second Back in one tick dropped");
                report.dropped_backs += 1;
                continue;
            }
            back_taken |= is_back;

            let effect = match *gesture {
                Gesture::Action(action) => self.navigator.dispatch(action),
                Gesture::Pause { fallback } => self.navigator.pause(fallback),
                Gesture::Reveal => self.navigator.reveal(),
            };
            self.record(effect, &mut report);
        }

        let effect = self.navigator.poll_handlers();
        self.record(effect, &mut report);

        for command in self.navigator.drain_commands() {
            if let KioskCommand::ComboDurationChanged(seconds) = command {
                info!("Reveal combo now needs {}s", seconds);
                self.engine
                    .set_combo_duration(Duration::seconds(seconds as i64));
            }
            report.commands.push(command);
        }
        report
    }

    pub fn tick(&mut self, events: &[InputEvent], now: DateTime<Local>) -> TickReport {
        let gestures = self.process_input_batch(events, now);
        self.dispatch(&gestures)
    }

    fn record(&mut self, effect: Effect, report: &mut TickReport) {
        if let Effect::Transition { from, to } = effect {
            // Presses that started on the old screen must not fire on the new one
            self.engine.cancel_pending();
            report.transitions.push((from, to));
        }
    }
}
