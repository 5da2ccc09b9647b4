use tracing::{debug, info, warn};

use super::handler::{FeatureHandler, HandlerRegistry, HandlerResult};
use super::screen::{BackTarget, ScreenId, ScreenKind};
use super::state::{
    ApplicationState, DeviceAction, PauseChoice, PauseOverlay, RotationMode, Scratch,
};
use crate::gesture::RevealContext;
use crate::input::AbstractAction;
use crate::menu::{CatalogContext, MenuAction, MenuCatalog, MenuModel};

// Requests for the host, collected during dispatch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KioskCommand {
    Quit,
    Device(DeviceAction),
    ComboDurationChanged(u32),
    AutoCycleIntervalChanged(u32),
}

// Outcome of one dispatch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    Ignored,
    Handled,
    Transition { from: ScreenId, to: ScreenId },
}

impl Effect {
    pub fn is_transition(&self) -> bool {
        matches!(self, Effect::Transition { .. })
    }
}

/// The navigation state machine.
///
/// Sole owner of the application state and the menu model. The navigation
/// stack always holds one frame per ancestor of the current screen.
pub struct Navigator {
    state: ApplicationState,
    menus: MenuModel,
    catalog: MenuCatalog,
    handlers: HandlerRegistry,
    context: CatalogContext,
    commands: Vec<KioskCommand>,
}

impl Navigator {
    pub fn new(catalog: MenuCatalog, context: CatalogContext) -> Self {
        let menus = MenuModel::new(catalog.root());
        info!(
            "Navigator starting on {} with {} root items",
            ScreenId::ROOT,
            menus.current().len()
        );
        Self {
            state: ApplicationState::default(),
            menus,
            catalog,
            handlers: HandlerRegistry::new(),
            context,
            commands: Vec::new(),
        }
    }

    pub fn register_handler(&mut self, handler: Box<dyn FeatureHandler>) {
        self.handlers.register(handler);
    }

    pub fn current(&self) -> ScreenId {
        self.state.current()
    }

    pub fn state(&self) -> &ApplicationState {
        &self.state
    }

    pub fn menus(&self) -> &MenuModel {
        &self.menus
    }

    pub fn context(&self) -> CatalogContext {
        self.context
    }

    pub fn set_combo_duration_s(&mut self, seconds: u32) {
        self.context.combo_duration_s = seconds;
    }

    pub fn reveal_context(&self) -> RevealContext {
        let at_root = self.state.current().is_root();
        RevealContext {
            at_root,
            selected: if at_root {
                self.menus.current().selected_index()
            } else {
                None
            },
        }
    }

    pub fn drain_commands(&mut self) -> Vec<KioskCommand> {
        std::mem::take(&mut self.commands)
    }

    /// Dispatch one action against the current screen.
    pub fn dispatch(&mut self, action: AbstractAction) -> Effect {
        let screen = self.state.current();
        debug!("Dispatching {:?} on {}", action, screen);
        // Back and Quit mean the same thing on every screen
        match action {
            AbstractAction::Back => self.back(),
            AbstractAction::Quit => {
                info!("Quit requested on {}", screen);
                self.commands.push(KioskCommand::Quit);
                Effect::Handled
            }
            _ => match screen.kind() {
                ScreenKind::List => self.dispatch_list(action),
                ScreenKind::View => self.dispatch_view(action),
                ScreenKind::Viewer => self.dispatch_viewer(action),
                ScreenKind::Game => self.dispatch_game(action),
                ScreenKind::Confirm => self.dispatch_confirm(action),
                ScreenKind::Delegated => self.delegate(action),
            },
        }
    }

    /// The hidden menu combo completed.
    pub fn reveal(&mut self) -> Effect {
        let screen = self.state.current();
        if !screen.is_root() {
            debug!("Reveal on {} ignored", screen);
            return Effect::Ignored;
        }
        info!("Hidden menu revealed");
        self.go(ScreenId::SecretGames, None)
    }

    /// Long-press pause request: opens a modal's overlay, otherwise the
    /// fallback action is dispatched as usual.
    pub fn pause(&mut self, fallback: AbstractAction) -> Effect {
        let screen = self.state.current();
        // Outside a viewer or game a long press is just its fallback
        if !screen.is_modal() {
            return self.dispatch(fallback);
        }
        if self.open_overlay() {
            Effect::Handled
        } else {
            debug!("Pause overlay already open on {}", screen);
            Effect::Ignored
        }
    }

    /// Give the current screen's feature handler its per-tick turn.
    pub fn poll_handlers(&mut self) -> Effect {
        let screen = self.state.current();
        if !self.handlers.has_handler(screen) {
            return Effect::Ignored;
        }
        match self.handlers.poll(screen) {
            HandlerResult::NotHandled => Effect::Ignored,
            result => self.apply_handler_result(result),
        }
    }

    /// Move to `target`, keeping the navigation stack equal to its ancestors.
    pub fn go(&mut self, target: ScreenId, payload: Option<String>) -> Effect {
        let from = self.state.current();
        if target == from {
            debug!("Already on {}", target);
            return Effect::Ignored;
        }

        // Climb until the cursor is the target or one of its ancestors
        let mut cursor = from;
        while cursor != target && !cursor.is_ancestor_of(target) {
            match self.menus.exit_submenu() {
                Some(owner) => cursor = owner,
                None => {
                    warn!("Navigation stack lost track of {}, resetting to root", cursor);
                    self.menus.reset(self.catalog.root());
                    cursor = ScreenId::ROOT;
                    break;
                }
            }
        }

        // Then descend, pushing a frame per level
        let lineage = target.lineage();
        let start = lineage
            .iter()
            .position(|screen| *screen == cursor)
            .map(|index| index + 1)
            .unwrap_or(lineage.len());
        for next in &lineage[start..] {
            let menu = self.catalog.menu_for(*next, &self.context);
            self.menus.push_menu(cursor, menu);
            cursor = *next;
        }

        // Fresh scratch for the target; the handler sees the same payload
        let entered_with = payload.clone();
        self.state.transition_to(target, payload);
        info!(
            "Screen {} -> {} (stack depth {})",
            from,
            target,
            self.menus.stack().depth()
        );
        self.handlers.on_enter(target, entered_with.as_deref());
        Effect::Transition { from, to: target }
    }

    fn back(&mut self) -> Effect {
        let screen = self.state.current();

        // Modal screens: the first Back only opens their overlay
        if screen.is_modal() && self.open_overlay() {
            return Effect::Handled;
        }

        if let Scratch::Confirm(dialog) = self.state.scratch() {
            info!("{:?} cancelled", dialog.action);
        }

        // Explicit targets are always the parent, so the stack pops one frame either way
        let target = match screen.back_target() {
            BackTarget::Nowhere => {
                debug!("Back on {} ignored, nowhere to go", screen);
                return Effect::Ignored;
            }
            BackTarget::Explicit(target) => target,
            BackTarget::PopFrame => self
                .menus
                .stack()
                .top()
                .map(|frame| frame.owner)
                .unwrap_or(ScreenId::ROOT),
        };
        self.go(target, None)
    }

    // Returns false when there is no overlay to open
    fn open_overlay(&mut self) -> bool {
        let screen = self.state.current();
        let opened = match self.state.scratch_mut() {
            Scratch::Viewer(viewer) if viewer.overlay.is_none() => {
                viewer.overlay = Some(PauseOverlay::for_viewer());
                true
            }
            Scratch::Game(game) if game.overlay.is_none() => {
                game.overlay = Some(PauseOverlay::for_game());
                true
            }
            _ => false,
        };
        if opened {
            info!("Pause overlay opened on {}", screen);
        }
        opened
    }

    fn dispatch_list(&mut self, action: AbstractAction) -> Effect {
        let moved = match action {
            AbstractAction::Prev => self.menus.navigate_prev(),
            AbstractAction::Next => self.menus.navigate_next(),
            AbstractAction::Select => return self.select_item(),
            _ => false,
        };
        if moved {
            debug!(
                "{} cursor at {:?}",
                self.state.current(),
                self.menus.current().selected_index()
            );
            Effect::Handled
        } else {
            debug!("{:?} on empty list {} ignored", action, self.state.current());
            Effect::Ignored
        }
    }

    fn select_item(&mut self) -> Effect {
        let screen = self.state.current();
        let Some(item) = self.menus.get_selected_item().cloned() else {
            debug!("Select on empty list {} ignored", screen);
            return Effect::Ignored;
        };
        info!("Selected '{}' on {}", item.label, screen);

        if let Some(action) = item.action {
            match action {
                MenuAction::ReturnToMenu => return self.go(ScreenId::ROOT, None),
                MenuAction::SetComboDuration(seconds) => {
                    self.context.combo_duration_s = seconds;
                    self.commands.push(KioskCommand::ComboDurationChanged(seconds));
                    return match screen.parent() {
                        Some(parent) => self.go(parent, None),
                        None => Effect::Handled,
                    };
                }
                MenuAction::SetAutoCycleInterval(seconds) => {
                    self.context.auto_cycle_s = seconds;
                    self.commands
                        .push(KioskCommand::AutoCycleIntervalChanged(seconds));
                    return Effect::Handled;
                }
                MenuAction::LaunchGame(game) => info!("Launching {:?}", game),
                // The item's target is the confirm screen; nothing runs yet
                MenuAction::Reboot | MenuAction::Shutdown | MenuAction::RestartApp => {
                    debug!("{:?} needs confirmation", action)
                }
            }
        }

        match item.target {
            Some(target) => self.go(target, item.payload),
            None => {
                debug!("'{}' has nothing to do", item.label);
                Effect::Ignored
            }
        }
    }

    fn dispatch_view(&mut self, action: AbstractAction) -> Effect {
        let screen = self.state.current();
        // Select freezes the view; scrolling belongs to the feature
        if action != AbstractAction::Select {
            return self.delegate(action);
        }
        match self.state.scratch_mut() {
            Scratch::View(view) => {
                view.frozen = !view.frozen;
                if screen == ScreenId::Dashboard {
                    view.auto_cycle = !view.auto_cycle;
                }
                info!(
                    "{} frozen: {}, auto-cycle: {}",
                    screen, view.frozen, view.auto_cycle
                );
                Effect::Handled
            }
            other => {
                warn!("{} has unexpected scratch {:?}", screen, other);
                Effect::Ignored
            }
        }
    }

    fn dispatch_viewer(&mut self, action: AbstractAction) -> Effect {
        let screen = self.state.current();
        let Scratch::Viewer(viewer) = self.state.scratch_mut() else {
            warn!("{} has no viewer scratch", screen);
            return Effect::Ignored;
        };

        // Without the overlay, Prev/Next turn the model in manual rotation only
        if viewer.overlay.is_none() {
            return match (action, viewer.rotation) {
                (AbstractAction::Select, _) => {
                    viewer.overlay = Some(PauseOverlay::for_viewer());
                    info!("Pause overlay opened on {}", screen);
                    Effect::Handled
                }
                (AbstractAction::Prev, RotationMode::Manual) => {
                    viewer.yaw_step -= 1;
                    Effect::Handled
                }
                (AbstractAction::Next, RotationMode::Manual) => {
                    viewer.yaw_step += 1;
                    Effect::Handled
                }
                _ => {
                    debug!("{:?} ignored in auto rotation", action);
                    Effect::Ignored
                }
            };
        }
        // The open overlay captures every action until it closes
        let Some(overlay) = viewer.overlay.as_mut() else {
            return Effect::Ignored;
        };

        match action {
            AbstractAction::Prev => overlay.prev(),
            AbstractAction::Next => overlay.next(),
            AbstractAction::Select => match overlay.selected() {
                PauseChoice::ToggleRotation => {
                    viewer.rotation = match viewer.rotation {
                        RotationMode::Auto => RotationMode::Manual,
                        RotationMode::Manual => RotationMode::Auto,
                    };
                    viewer.overlay = None;
                    info!("Viewer rotation now {:?}", viewer.rotation);
                }
                PauseChoice::Resume => viewer.overlay = None,
                PauseChoice::ExitViewer | PauseChoice::Quit => {
                    return self.leave_modal(screen);
                }
            },
            _ => return Effect::Ignored,
        }
        Effect::Handled
    }

    fn dispatch_game(&mut self, action: AbstractAction) -> Effect {
        let screen = self.state.current();
        let Scratch::Game(game) = self.state.scratch_mut() else {
            warn!("{} has no game scratch", screen);
            return Effect::Ignored;
        };

        if game.overlay.is_none() {
            if action == AbstractAction::Select {
                game.overlay = Some(PauseOverlay::for_game());
                info!("{:?} paused", game.game);
                return Effect::Handled;
            }
            // Game controls are the game handler's business
            return self.delegate(action);
        }
        let Some(overlay) = game.overlay.as_mut() else {
            return Effect::Ignored;
        };

        match action {
            AbstractAction::Prev => overlay.prev(),
            AbstractAction::Next => overlay.next(),
            AbstractAction::Select => match overlay.selected() {
                PauseChoice::Quit | PauseChoice::ExitViewer => return self.leave_modal(screen),
                _ => {
                    game.overlay = None;
                    info!("{:?} resumed", game.game);
                }
            },
            _ => return Effect::Ignored,
        }
        Effect::Handled
    }

    fn leave_modal(&mut self, screen: ScreenId) -> Effect {
        match screen.parent() {
            Some(parent) => self.go(parent, None),
            None => Effect::Ignored,
        }
    }

    fn dispatch_confirm(&mut self, action: AbstractAction) -> Effect {
        let screen = self.state.current();
        let Scratch::Confirm(dialog) = self.state.scratch_mut() else {
            warn!("{} has no pending confirmation", screen);
            return Effect::Ignored;
        };
        match action {
            AbstractAction::Prev | AbstractAction::Next => {
                dialog.toggle();
                debug!(
                    "{:?} confirmation, yes highlighted: {}",
                    dialog.action,
                    dialog.yes_selected()
                );
                Effect::Handled
            }
            // Yes and No both leave; only Yes tells the host
            AbstractAction::Select => {
                let dialog = *dialog;
                if dialog.yes_selected() {
                    warn!("Executing {:?}", dialog.action);
                    self.commands.push(KioskCommand::Device(dialog.action));
                } else {
                    info!("{:?} cancelled", dialog.action);
                }
                self.leave_modal(screen)
            }
            _ => Effect::Ignored,
        }
    }

    fn delegate(&mut self, action: AbstractAction) -> Effect {
        let screen = self.state.current();
        match self.handlers.handle_input(screen, action) {
            Some(result) => self.apply_handler_result(result),
            None => {
                debug!("No handler for {:?} on {}, ignored", action, screen);
                Effect::Ignored
            }
        }
    }

    fn apply_handler_result(&mut self, result: HandlerResult) -> Effect {
        match result {
            HandlerResult::NotHandled => {
                debug!("Handler did not use the action on {}", self.state.current());
                Effect::Ignored
            }
            HandlerResult::Handled => Effect::Handled,
            // Unknown tokens leave the user where they are
            HandlerResult::TransitionRequest(token) => match ScreenId::from_token(&token) {
                Some(target) => self.go(target, None),
                None => {
                    warn!("Unknown screen token '{}' requested, staying put", token);
                    Effect::Handled
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::navigation::FeatureError;
    use pretty_assertions::assert_eq;

    fn navigator() -> Navigator {
        Navigator::new(MenuCatalog::default(), CatalogContext::default())
    }

    fn game_overlay(navigator: &Navigator) -> Option<PauseChoice> {
        match navigator.state().scratch() {
            Scratch::Game(game) => game.overlay.as_ref().map(|overlay| overlay.selected()),
            _ => None,
        }
    }

    // Select asks for a screen that does not exist, Prev fails, Next panics
    struct Scripted;

    impl FeatureHandler for Scripted {
        fn name(&self) -> &str {
            "scripted"
        }

        fn screens(&self) -> &'static [ScreenId] {
            &[ScreenId::SettingsStapi]
        }

        fn handle_input(
            &mut self,
            _screen: ScreenId,
            action: AbstractAction,
        ) -> Result<HandlerResult, FeatureError> {
            match action {
                AbstractAction::Select => Ok(HandlerResult::TransitionRequest("NOPE".to_string())),
                AbstractAction::Prev => Err(FeatureError::Unavailable("stapi offline".to_string())),
                _ => panic!("scripted handler gave up"),
            }
        }
    }

    #[test]
    fn confirm_no_returns_without_command() {
        let mut navigator = navigator();
        navigator.go(ScreenId::ConfirmShutdown, None);
        assert_eq!(navigator.dispatch(AbstractAction::Next), Effect::Handled);
        assert_eq!(
            navigator.dispatch(AbstractAction::Select),
            Effect::Transition {
                from: ScreenId::ConfirmShutdown,
                to: ScreenId::SettingsDevice
            }
        );
        assert!(navigator.drain_commands().is_empty());
    }

    #[test]
    fn confirm_yes_tells_the_host() {
        let mut navigator = navigator();
        navigator.go(ScreenId::ConfirmReboot, None);
        assert_eq!(
            navigator.dispatch(AbstractAction::Select),
            Effect::Transition {
                from: ScreenId::ConfirmReboot,
                to: ScreenId::SettingsDevice
            }
        );
        assert_eq!(
            navigator.drain_commands(),
            vec![KioskCommand::Device(DeviceAction::Reboot)]
        );
    }

    #[test]
    fn confirm_back_cancels() {
        let mut navigator = navigator();
        navigator.go(ScreenId::ConfirmRestartApp, None);
        assert_eq!(
            navigator.dispatch(AbstractAction::Back),
            Effect::Transition {
                from: ScreenId::ConfirmRestartApp,
                to: ScreenId::SettingsDevice
            }
        );
        assert!(navigator.drain_commands().is_empty());
    }

    #[test]
    fn unknown_transition_token_stays_put() {
        let mut navigator = navigator();
        navigator.register_handler(Box::new(Scripted));
        navigator.go(ScreenId::SettingsStapi, None);
        assert_eq!(navigator.dispatch(AbstractAction::Select), Effect::Handled);
        assert_eq!(navigator.current(), ScreenId::SettingsStapi);
    }

    #[test]
    fn failing_handler_counts_as_handled() {
        let mut navigator = navigator();
        navigator.register_handler(Box::new(Scripted));
        navigator.go(ScreenId::SettingsStapi, None);
        assert_eq!(navigator.dispatch(AbstractAction::Prev), Effect::Handled);
        assert_eq!(navigator.dispatch(AbstractAction::Next), Effect::Handled);
        assert_eq!(navigator.current(), ScreenId::SettingsStapi);

        // Back never reaches the handler
        assert_eq!(
            navigator.dispatch(AbstractAction::Back),
            Effect::Transition {
                from: ScreenId::SettingsStapi,
                to: ScreenId::Settings
            }
        );
    }

    #[test]
    fn game_overlay_resume_and_quit() {
        let mut navigator = navigator();
        navigator.go(ScreenId::PongActive, None);
        assert_eq!(game_overlay(&navigator), None);

        assert_eq!(navigator.dispatch(AbstractAction::Select), Effect::Handled);
        assert_eq!(game_overlay(&navigator), Some(PauseChoice::Resume));
        assert_eq!(navigator.dispatch(AbstractAction::Select), Effect::Handled);
        assert_eq!(game_overlay(&navigator), None);
        assert_eq!(navigator.current(), ScreenId::PongActive);

        navigator.dispatch(AbstractAction::Select);
        assert_eq!(navigator.dispatch(AbstractAction::Next), Effect::Handled);
        assert_eq!(game_overlay(&navigator), Some(PauseChoice::Quit));
        assert_eq!(
            navigator.dispatch(AbstractAction::Select),
            Effect::Transition {
                from: ScreenId::PongActive,
                to: ScreenId::SecretGames
            }
        );
    }

    #[test]
    fn game_back_opens_overlay_before_leaving() {
        let mut navigator = navigator();
        navigator.go(ScreenId::SnakeActive, None);
        assert_eq!(navigator.dispatch(AbstractAction::Back), Effect::Handled);
        assert_eq!(game_overlay(&navigator), Some(PauseChoice::Resume));
        assert_eq!(navigator.pause(AbstractAction::Back), Effect::Ignored);
        assert_eq!(
            navigator.dispatch(AbstractAction::Back),
            Effect::Transition {
                from: ScreenId::SnakeActive,
                to: ScreenId::SecretGames
            }
        );
    }

    #[test]
    fn reveal_only_from_the_main_menu() {
        let mut navigator = navigator();
        navigator.go(ScreenId::Settings, None);
        assert_eq!(navigator.reveal(), Effect::Ignored);

        navigator.dispatch(AbstractAction::Back);
        assert_eq!(
            navigator.reveal(),
            Effect::Transition {
                from: ScreenId::MainMenu,
                to: ScreenId::SecretGames
            }
        );
    }
}
