use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use tracing::{debug, error, info, warn};

use super::screen::ScreenId;
use crate::input::AbstractAction;

/// What a feature handler made of an action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandlerResult {
    NotHandled,
    Handled,
    // Token of the screen to go to, e.g. "SETTINGS_WIFI"
    TransitionRequest(String),
}

impl HandlerResult {
    pub fn transition(screen: ScreenId) -> Self {
        HandlerResult::TransitionRequest(screen.token().to_string())
    }
}

// Feature handler errors
#[derive(Debug, thiserror::Error)]
pub enum FeatureError {
    #[error("Feature unavailable: {0}")]
    Unavailable(String),

    #[error("Feature operation failed: {0}")]
    OperationFailed(String),

    #[error("Background worker lost: {0}")]
    WorkerLost(String),
}

/// Input logic of a self-contained screen (WiFi, a game, ...).
///
/// Every call must return within the tick. Long work belongs on a
/// background worker whose result is picked up in [`FeatureHandler::poll`].
pub trait FeatureHandler: Send {
    fn name(&self) -> &str;

    // Screens this handler serves
    fn screens(&self) -> &'static [ScreenId];

    fn handle_input(
        &mut self,
        screen: ScreenId,
        action: AbstractAction,
    ) -> Result<HandlerResult, FeatureError>;

    fn on_enter(&mut self, _screen: ScreenId, _payload: Option<&str>) -> Result<(), FeatureError> {
        Ok(())
    }

    // Called once per tick while one of the handler's screens is current
    fn poll(&mut self, _screen: ScreenId) -> Result<HandlerResult, FeatureError> {
        Ok(HandlerResult::NotHandled)
    }
}

/// Routes screens to their feature handler and contains handler failures.
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: Vec<Box<dyn FeatureHandler>>,
    routes: HashMap<ScreenId, usize>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, handler: Box<dyn FeatureHandler>) {
        let index = self.handlers.len();
        for screen in handler.screens() {
            if let Some(previous) = self.routes.insert(*screen, index) {
                warn!(
                    "{} replaces {} as handler of {}",
                    handler.name(),
                    self.handlers[previous].name(),
                    screen
                );
            }
        }
        info!(
            "Registered feature handler '{}' for {} screen(s)",
            handler.name(),
            handler.screens().len()
        );
        self.handlers.push(handler);
    }

    pub fn has_handler(&self, screen: ScreenId) -> bool {
        self.routes.contains_key(&screen)
    }

    /// None when no handler serves `screen`. A failing or panicking handler
    /// counts as handled.
    pub fn handle_input(&mut self, screen: ScreenId, action: AbstractAction) -> Option<HandlerResult> {
        let handler = self.handler_mut(screen)?;
        debug!("Delegating {:?} on {} to '{}'", action, screen, handler.name());
        let result = guarded(handler.name().to_string(), "handle_input", || {
            handler.handle_input(screen, action)
        });
        Some(result.unwrap_or(HandlerResult::Handled))
    }

    pub fn on_enter(&mut self, screen: ScreenId, payload: Option<&str>) {
        if let Some(handler) = self.handler_mut(screen) {
            let name = handler.name().to_string();
            guarded(name, "on_enter", || handler.on_enter(screen, payload));
        }
    }

    pub fn poll(&mut self, screen: ScreenId) -> HandlerResult {
        match self.handler_mut(screen) {
            Some(handler) => {
                let name = handler.name().to_string();
                guarded(name, "poll", || handler.poll(screen)).unwrap_or(HandlerResult::Handled)
            }
            None => HandlerResult::NotHandled,
        }
    }

    fn handler_mut(&mut self, screen: ScreenId) -> Option<&mut Box<dyn FeatureHandler>> {
        let index = *self.routes.get(&screen)?;
        self.handlers.get_mut(index)
    }
}

// Runs one handler call, turning errors and panics into None
fn guarded<T>(
    name: String,
    operation: &str,
    call: impl FnOnce() -> Result<T, FeatureError>,
) -> Option<T> {
    match panic::catch_unwind(AssertUnwindSafe(call)) {
        Ok(Ok(value)) => Some(value),
        Ok(Err(e)) => {
            error!("Feature handler '{}' failed in {}: {}", name, operation, e);
            None
        }
        Err(panic) => {
            let message = panic
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| panic.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            error!(
                "Feature handler '{}' panicked in {}: {}",
                name, operation, message
            );
            None
        }
    }
}
