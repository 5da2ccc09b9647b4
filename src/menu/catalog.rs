use tracing::debug;

use super::{Menu, MenuAction, MenuItem};
use crate::navigation::screen::{GameKind, ScreenId};

// Live values some menus open on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CatalogContext {
    pub combo_duration_s: u32,
    pub auto_cycle_s: u32,
}

impl Default for CatalogContext {
    fn default() -> Self {
        Self {
            combo_duration_s: 3,
            auto_cycle_s: 5,
        }
    }
}

/// Items of every built-in list screen.
#[derive(Debug, Clone)]
pub struct MenuCatalog {
    root: Vec<MenuItem>,
    combo_options_s: Vec<u32>,
    auto_cycle_options_s: Vec<u32>,
}

impl Default for MenuCatalog {
    fn default() -> Self {
        Self {
            root: vec![
                MenuItem::new("Systems").target(ScreenId::SystemInfo).tag("blue"),
                MenuItem::new("Sensors").target(ScreenId::SensorsMenu).tag("orange"),
                MenuItem::new("Sweep").target(ScreenId::Dashboard).tag("orange"),
                MenuItem::new("Schematics")
                    .target(ScreenId::SchematicsCategory)
                    .tag("blue"),
                MenuItem::new("Settings").target(ScreenId::Settings).tag("red"),
            ],
            combo_options_s: vec![1, 2, 3, 5, 8],
            auto_cycle_options_s: vec![3, 5, 10, 15, 30],
        }
    }
}

fn back_item(label: &str, target: ScreenId) -> MenuItem {
    MenuItem::new(label).target(target).tag("grey")
}

impl MenuCatalog {
    pub fn with_root(mut self, root: Vec<MenuItem>) -> Self {
        self.root = root;
        self
    }

    pub fn with_combo_options(mut self, options_s: Vec<u32>) -> Self {
        self.combo_options_s = options_s;
        self
    }

    pub fn with_auto_cycle_options(mut self, options_s: Vec<u32>) -> Self {
        self.auto_cycle_options_s = options_s;
        self
    }

    pub fn root(&self) -> Menu {
        Menu::new(self.root.clone())
    }

    // Position of the Settings entry, where the hidden menu is unlocked
    pub fn default_reveal_index(&self) -> Option<usize> {
        self.root
            .iter()
            .position(|item| item.target == Some(ScreenId::Settings))
    }

    /// Fresh menu for `screen`; empty for screens without a list.
    pub fn menu_for(&self, screen: ScreenId, context: &CatalogContext) -> Menu {
        let items = match screen {
            ScreenId::MainMenu => return self.root(),
            ScreenId::SensorsMenu => ["temperature", "humidity", "pressure", "orientation", "acceleration"]
                .iter()
                .map(|sensor| {
                    let mut label = sensor.to_string();
                    label[..1].make_ascii_uppercase();
                    MenuItem::new(label)
                        .target(ScreenId::SensorView)
                        .payload(*sensor)
                })
                .collect(),
            ScreenId::SchematicsCategory => vec![
                MenuItem::new("Ships").target(ScreenId::SchematicsMenu),
                MenuItem::new("Crew").target(ScreenId::CrewMenu),
                MenuItem::new("Media").target(ScreenId::MediaPlayer),
                MenuItem::new("Database").target(ScreenId::Wiki),
                back_item("<- Back", ScreenId::MainMenu),
            ],
            ScreenId::SchematicsMenu => vec![
                MenuItem::new("Enterprise D")
                    .target(ScreenId::SchematicsViewer)
                    .payload("enterprise_d"),
                MenuItem::new("Voyager")
                    .target(ScreenId::SchematicsViewer)
                    .payload("voyager"),
                MenuItem::new("Defiant")
                    .target(ScreenId::SchematicsViewer)
                    .payload("defiant"),
                back_item("<- Back", ScreenId::SchematicsCategory),
            ],
            ScreenId::CrewMenu => ["picard", "riker", "data", "la_forge", "crusher"]
                .iter()
                .map(|crew| {
                    MenuItem::new(crew.replace('_', " "))
                        .target(ScreenId::CrewDetail)
                        .payload(*crew)
                })
                .chain(std::iter::once(back_item(
                    "<- Back",
                    ScreenId::SchematicsCategory,
                )))
                .collect(),
            ScreenId::Settings => vec![
                MenuItem::new("WiFi").target(ScreenId::SettingsWifi),
                MenuItem::new("Bluetooth").target(ScreenId::SettingsBluetooth),
                MenuItem::new("Device").target(ScreenId::SettingsDevice),
                MenuItem::new("Display").target(ScreenId::SettingsDisplay),
                MenuItem::new("Controls").target(ScreenId::SettingsControls),
                MenuItem::new("Sound").target(ScreenId::SettingsVolume),
                MenuItem::new("Updates").target(ScreenId::SettingsUpdate),
                MenuItem::new("Debug").target(ScreenId::SettingsDebug),
                MenuItem::new("Database API").target(ScreenId::SettingsStapi),
                back_item("<- Back", ScreenId::MainMenu),
            ],
            ScreenId::SettingsDevice => vec![
                MenuItem::new("Secret Combo Timer").target(ScreenId::SelectComboDuration),
                MenuItem::new("Reboot Device")
                    .target(ScreenId::ConfirmReboot)
                    .action(MenuAction::Reboot)
                    .tag("red"),
                MenuItem::new("Shutdown Device")
                    .target(ScreenId::ConfirmShutdown)
                    .action(MenuAction::Shutdown)
                    .tag("red"),
                MenuItem::new("Restart App")
                    .target(ScreenId::ConfirmRestartApp)
                    .action(MenuAction::RestartApp)
                    .tag("red"),
                back_item("<- Back to Main Menu", ScreenId::MainMenu),
            ],
            ScreenId::SelectComboDuration => {
                let mut menu = Menu::new(
                    self.combo_options_s
                        .iter()
                        .map(|s| {
                            MenuItem::new(format!("{} s", s))
                                .action(MenuAction::SetComboDuration(*s))
                        })
                        .collect(),
                );
                if let Some(index) = self
                    .combo_options_s
                    .iter()
                    .position(|s| *s == context.combo_duration_s)
                {
                    menu.select(index);
                }
                return menu;
            }
            ScreenId::SettingsDisplay => {
                let mut items: Vec<MenuItem> = self
                    .auto_cycle_options_s
                    .iter()
                    .map(|s| {
                        MenuItem::new(format!("Auto-cycle {} s", s))
                            .action(MenuAction::SetAutoCycleInterval(*s))
                    })
                    .collect();
                items.push(back_item("<- Back to Main Menu", ScreenId::MainMenu));
                let mut menu = Menu::new(items);
                if let Some(index) = self
                    .auto_cycle_options_s
                    .iter()
                    .position(|s| *s == context.auto_cycle_s)
                {
                    menu.select(index);
                }
                return menu;
            }
            ScreenId::SettingsControls => vec![
                MenuItem::new("Shuttle left: previous / hold: back"),
                MenuItem::new("Shuttle right: next / hold: pause"),
                MenuItem::new("Stick press: select"),
                MenuItem::new("Stick left: back"),
                back_item("<- Back", ScreenId::Settings),
            ],
            ScreenId::SettingsVolume => vec![
                MenuItem::new("Sound Test").target(ScreenId::SettingsSoundTest),
                MenuItem::new("Audio Test").target(ScreenId::SettingsAudioTest),
                MenuItem::new("Audio Diagnostics").target(ScreenId::SettingsAudioDiagnostics),
                back_item("<- Back", ScreenId::Settings),
            ],
            ScreenId::SettingsDebug => vec![
                MenuItem::new("Debug Overlay").target(ScreenId::SettingsDebugOverlay),
                MenuItem::new("Log Viewer").target(ScreenId::SettingsLogViewer),
                back_item("<- Back", ScreenId::Settings),
            ],
            ScreenId::SecretGames => vec![
                MenuItem::new("Pong")
                    .target(ScreenId::PongActive)
                    .action(MenuAction::LaunchGame(GameKind::Pong)),
                MenuItem::new("Tetris")
                    .target(ScreenId::TetrisActive)
                    .action(MenuAction::LaunchGame(GameKind::Tetris)),
                MenuItem::new("Snake")
                    .target(ScreenId::SnakeActive)
                    .action(MenuAction::LaunchGame(GameKind::Snake)),
                MenuItem::new("Breakout")
                    .target(ScreenId::BreakoutActive)
                    .action(MenuAction::LaunchGame(GameKind::Breakout)),
                MenuItem::new("Quit").action(MenuAction::ReturnToMenu).tag("grey"),
            ],
            other => {
                debug!("{:?} has no list, using an empty menu", other);
                Vec::new()
            }
        };
        Menu::new(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONTEXT: CatalogContext = CatalogContext {
        combo_duration_s: 5,
        auto_cycle_s: 10,
    };

    #[test]
    fn reveal_index_points_at_settings() {
        assert_eq!(MenuCatalog::default().default_reveal_index(), Some(4));
    }

    #[test]
    fn combo_menu_opens_on_active_duration() {
        let menu = MenuCatalog::default().menu_for(ScreenId::SelectComboDuration, &CONTEXT);
        assert_eq!(menu.len(), 5);
        assert_eq!(menu.selected_index(), Some(3));
        assert_eq!(
            menu.selected_item().and_then(|item| item.action),
            Some(MenuAction::SetComboDuration(5))
        );
    }

    #[test]
    fn every_list_screen_has_items() {
        let catalog = MenuCatalog::default();
        for screen in ScreenId::ALL {
            let menu = catalog.menu_for(*screen, &CONTEXT);
            assert_eq!(
                !menu.is_empty(),
                screen.kind() == crate::navigation::screen::ScreenKind::List,
                "{:?}",
                screen
            );
        }
    }
}
