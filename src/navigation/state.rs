use tracing::debug;

use super::screen::{GameKind, ScreenId, ScreenKind};

// Device-level actions behind the confirmation dialogs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceAction {
    Reboot,
    Shutdown,
    RestartApp,
}

impl DeviceAction {
    pub fn for_screen(screen: ScreenId) -> Option<Self> {
        match screen {
            ScreenId::ConfirmReboot => Some(DeviceAction::Reboot),
            ScreenId::ConfirmShutdown => Some(DeviceAction::Shutdown),
            ScreenId::ConfirmRestartApp => Some(DeviceAction::RestartApp),
            _ => None,
        }
    }
}

/// Yes/No dialog guarding a device action. Index 0 is Yes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfirmDialog {
    pub action: DeviceAction,
    choice: usize,
}

impl ConfirmDialog {
    pub fn new(action: DeviceAction) -> Self {
        Self { action, choice: 0 }
    }

    // Prev and Next both flip
    pub fn toggle(&mut self) {
        self.choice = 1 - self.choice;
    }

    pub fn yes_selected(&self) -> bool {
        self.choice == 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PauseChoice {
    ToggleRotation,
    ExitViewer,
    Resume,
    Quit,
}

const VIEWER_PAUSE: &[PauseChoice] = &[
    PauseChoice::ToggleRotation,
    PauseChoice::ExitViewer,
    PauseChoice::Resume,
];

const GAME_PAUSE: &[PauseChoice] = &[PauseChoice::Resume, PauseChoice::Quit];

// Overlay of a modal screen, with its own cursor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PauseOverlay {
    choices: &'static [PauseChoice],
    selected: usize,
}

impl PauseOverlay {
    pub fn for_viewer() -> Self {
        Self {
            choices: VIEWER_PAUSE,
            selected: 0,
        }
    }

    pub fn for_game() -> Self {
        Self {
            choices: GAME_PAUSE,
            selected: 0,
        }
    }

    pub fn next(&mut self) {
        self.selected = (self.selected + 1) % self.choices.len();
    }

    pub fn prev(&mut self) {
        self.selected = (self.selected + self.choices.len() - 1) % self.choices.len();
    }

    pub fn selected(&self) -> PauseChoice {
        self.choices[self.selected]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RotationMode {
    Auto,
    Manual,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewScratch {
    pub subject: Option<String>,
    pub frozen: bool,
    pub auto_cycle: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewerScratch {
    pub model: Option<String>,
    pub rotation: RotationMode,
    pub yaw_step: i32,
    pub overlay: Option<PauseOverlay>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameScratch {
    pub game: GameKind,
    pub overlay: Option<PauseOverlay>,
}

/// Ephemeral data owned by the current screen. Rebuilt on every
/// transition, so nothing carries over from the screen before.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scratch {
    None,
    View(ViewScratch),
    Viewer(ViewerScratch),
    Game(GameScratch),
    Confirm(ConfirmDialog),
    Subject(String),
}

impl Scratch {
    pub fn for_screen(screen: ScreenId, payload: Option<String>) -> Self {
        match screen.kind() {
            ScreenKind::View => Scratch::View(ViewScratch {
                subject: payload,
                frozen: false,
                auto_cycle: screen == ScreenId::Dashboard,
            }),
            ScreenKind::Viewer => Scratch::Viewer(ViewerScratch {
                model: payload,
                rotation: RotationMode::Auto,
                yaw_step: 0,
                overlay: None,
            }),
            ScreenKind::Game => match screen.game() {
                Some(game) => Scratch::Game(GameScratch {
                    game,
                    overlay: None,
                }),
                None => Scratch::None,
            },
            ScreenKind::Confirm => match DeviceAction::for_screen(screen) {
                Some(action) => Scratch::Confirm(ConfirmDialog::new(action)),
                None => Scratch::None,
            },
            ScreenKind::List | ScreenKind::Delegated => match payload {
                Some(subject) => Scratch::Subject(subject),
                None => Scratch::None,
            },
        }
    }
}

/// Current screen, the one before it, and the current screen's scratch.
#[derive(Debug, Clone)]
pub struct ApplicationState {
    current: ScreenId,
    previous: Option<ScreenId>,
    scratch: Scratch,
}

impl Default for ApplicationState {
    fn default() -> Self {
        Self {
            current: ScreenId::ROOT,
            previous: None,
            scratch: Scratch::None,
        }
    }
}

impl ApplicationState {
    pub fn current(&self) -> ScreenId {
        self.current
    }

    pub fn previous(&self) -> Option<ScreenId> {
        self.previous
    }

    pub fn scratch(&self) -> &Scratch {
        &self.scratch
    }

    pub(crate) fn scratch_mut(&mut self) -> &mut Scratch {
        &mut self.scratch
    }

    // Same-screen transitions are ignored
    pub(crate) fn transition_to(&mut self, target: ScreenId, payload: Option<String>) -> bool {
        if target == self.current {
            debug!("Already on {}, transition ignored", target);
            return false;
        }
        self.previous = Some(self.current);
        self.current = target;
        self.scratch = Scratch::for_screen(target, payload);
        true
    }
}
