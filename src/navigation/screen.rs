//! The closed set of screens.
//!
//! Each screen carries a stable token (used by feature handlers to request
//! transitions), its structural parent and where Back leads.

// Where Back leads from a screen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackTarget {
    // The root has nowhere to go
    Nowhere,
    Explicit(ScreenId),
    // Pop one navigation frame, or the root if the stack is empty
    PopFrame,
}

// How the navigator treats input on a screen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScreenKind {
    List,
    View,
    Viewer,
    Game,
    Confirm,
    Delegated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GameKind {
    Pong,
    Tetris,
    Snake,
    Breakout,
}

macro_rules! screens {
    (@parent none) => { None };
    (@parent $parent:ident) => { Some(ScreenId::$parent) };
    (@back none, $parent:ident) => { BackTarget::Nowhere };
    (@back pop, $parent:ident) => { BackTarget::PopFrame };
    (@back explicit, $parent:ident) => { BackTarget::Explicit(ScreenId::$parent) };
    ($($variant:ident => $token:literal, $parent:ident, $back:ident;)*) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum ScreenId {
            $($variant,)*
        }

        impl ScreenId {
            pub const ALL: &'static [ScreenId] = &[$(ScreenId::$variant,)*];

            pub fn token(self) -> &'static str {
                match self {
                    $(ScreenId::$variant => $token,)*
                }
            }

            pub fn from_token(token: &str) -> Option<Self> {
                match token {
                    $($token => Some(ScreenId::$variant),)*
                    _ => None,
                }
            }

            pub fn parent(self) -> Option<ScreenId> {
                match self {
                    $(ScreenId::$variant => screens!(@parent $parent),)*
                }
            }

            pub fn back_target(self) -> BackTarget {
                match self {
                    $(ScreenId::$variant => screens!(@back $back, $parent),)*
                }
            }
        }
    };
}

screens! {
    MainMenu => "MENU", none, none;
    SensorsMenu => "SENSORS_MENU", MainMenu, pop;
    SensorView => "SENSOR", SensorsMenu, pop;
    Dashboard => "DASHBOARD", MainMenu, pop;
    SystemInfo => "SYSTEM", MainMenu, pop;
    SchematicsCategory => "SCHEMATICS_CATEGORY", MainMenu, pop;
    SchematicsMenu => "SCHEMATICS_MENU", SchematicsCategory, explicit;
    SchematicsViewer => "SCHEMATICS", SchematicsMenu, explicit;
    MediaPlayer => "MEDIA_PLAYER", SchematicsCategory, explicit;
    Wiki => "STAR_TREK_WIKI", SchematicsCategory, explicit;
    CrewMenu => "CREW_MENU", SchematicsCategory, explicit;
    CrewDetail => "CREW_DETAIL", CrewMenu, explicit;
    Settings => "SETTINGS", MainMenu, pop;
    SettingsWifi => "SETTINGS_WIFI", Settings, explicit;
    SettingsWifiNetworks => "SETTINGS_WIFI_NETWORKS", SettingsWifi, explicit;
    WifiPasswordEntry => "WIFI_PASSWORD_ENTRY", SettingsWifiNetworks, explicit;
    SettingsBluetooth => "SETTINGS_BLUETOOTH", Settings, explicit;
    SettingsBluetoothDevices => "SETTINGS_BLUETOOTH_DEVICES", SettingsBluetooth, explicit;
    SettingsDevice => "SETTINGS_DEVICE", Settings, explicit;
    SettingsDisplay => "SETTINGS_DISPLAY", Settings, explicit;
    SelectComboDuration => "SELECT_COMBO_DURATION", SettingsDevice, explicit;
    SettingsControls => "SETTINGS_CONTROLS", Settings, explicit;
    SettingsUpdate => "SETTINGS_UPDATE", Settings, explicit;
    SettingsVolume => "SETTINGS_VOLUME", Settings, explicit;
    SettingsSoundTest => "SETTINGS_SOUND_TEST", SettingsVolume, explicit;
    SettingsAudioTest => "SETTINGS_AUDIO_TEST", SettingsVolume, explicit;
    SettingsAudioDiagnostics => "SETTINGS_AUDIO_DIAGNOSTICS", SettingsVolume, explicit;
    SettingsDebug => "SETTINGS_DEBUG", Settings, explicit;
    SettingsDebugOverlay => "SETTINGS_DEBUG_OVERLAY", SettingsDebug, explicit;
    SettingsLogViewer => "SETTINGS_LOG_VIEWER", SettingsDebug, explicit;
    SettingsStapi => "SETTINGS_STAPI", Settings, explicit;
    ConfirmReboot => "CONFIRM_REBOOT", SettingsDevice, explicit;
    ConfirmShutdown => "CONFIRM_SHUTDOWN", SettingsDevice, explicit;
    ConfirmRestartApp => "CONFIRM_RESTART_APP", SettingsDevice, explicit;
    SecretGames => "SECRET_GAMES", MainMenu, pop;
    PongActive => "PONG_ACTIVE", SecretGames, explicit;
    TetrisActive => "TETRIS_ACTIVE", SecretGames, explicit;
    SnakeActive => "SNAKE_ACTIVE", SecretGames, explicit;
    BreakoutActive => "BREAKOUT_ACTIVE", SecretGames, explicit;
}

impl ScreenId {
    pub const ROOT: ScreenId = ScreenId::MainMenu;

    pub fn is_root(self) -> bool {
        self == Self::ROOT
    }

    pub fn kind(self) -> ScreenKind {
        use ScreenId::*;
        match self {
            MainMenu | SensorsMenu | SchematicsCategory | SchematicsMenu | CrewMenu | Settings
            | SettingsDevice | SettingsDisplay | SelectComboDuration | SettingsControls
            | SettingsVolume | SettingsDebug | SecretGames => ScreenKind::List,
            SensorView | Dashboard | SystemInfo => ScreenKind::View,
            SchematicsViewer => ScreenKind::Viewer,
            PongActive | TetrisActive | SnakeActive | BreakoutActive => ScreenKind::Game,
            ConfirmReboot | ConfirmShutdown | ConfirmRestartApp => ScreenKind::Confirm,
            MediaPlayer | Wiki | CrewDetail | SettingsWifi | SettingsWifiNetworks
            | WifiPasswordEntry | SettingsBluetooth | SettingsBluetoothDevices | SettingsUpdate
            | SettingsSoundTest | SettingsAudioTest | SettingsAudioDiagnostics
            | SettingsDebugOverlay | SettingsLogViewer | SettingsStapi => ScreenKind::Delegated,
        }
    }

    // Modal screens intercept Back themselves
    pub fn is_modal(self) -> bool {
        matches!(self.kind(), ScreenKind::Viewer | ScreenKind::Game)
    }

    pub fn game(self) -> Option<GameKind> {
        match self {
            ScreenId::PongActive => Some(GameKind::Pong),
            ScreenId::TetrisActive => Some(GameKind::Tetris),
            ScreenId::SnakeActive => Some(GameKind::Snake),
            ScreenId::BreakoutActive => Some(GameKind::Breakout),
            _ => None,
        }
    }

    /// Root-first chain of screens ending with `self`.
    pub fn lineage(self) -> Vec<ScreenId> {
        let mut chain = vec![self];
        let mut cursor = self;
        while let Some(parent) = cursor.parent() {
            chain.push(parent);
            cursor = parent;
        }
        chain.reverse();
        chain
    }

    pub fn is_ancestor_of(self, other: ScreenId) -> bool {
        let mut cursor = other.parent();
        while let Some(screen) = cursor {
            if screen == self {
                return true;
            }
            cursor = screen.parent();
        }
        false
    }
}

impl std::fmt::Display for ScreenId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.token())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_round_trip_and_are_unique() {
        let mut seen = std::collections::HashSet::new();
        for screen in ScreenId::ALL {
            assert!(seen.insert(screen.token()), "duplicate token {}", screen);
            assert_eq!(ScreenId::from_token(screen.token()), Some(*screen));
        }
        assert_eq!(ScreenId::ALL.len(), 39);
        assert_eq!(ScreenId::from_token("NOT_A_SCREEN"), None);
    }

    #[test]
    fn every_screen_reaches_the_root() {
        for screen in ScreenId::ALL {
            let lineage = screen.lineage();
            assert_eq!(lineage.first(), Some(&ScreenId::ROOT), "{:?}", screen);
            assert!(lineage.len() <= 5, "{:?} is too deep", screen);
        }
    }

    #[test]
    fn explicit_back_targets_are_parents() {
        for screen in ScreenId::ALL {
            match screen.back_target() {
                BackTarget::Explicit(target) => assert_eq!(Some(target), screen.parent()),
                BackTarget::Nowhere => assert!(screen.is_root()),
                BackTarget::PopFrame => assert!(screen.parent().is_some()),
            }
        }
    }

    #[test]
    fn wifi_password_lineage() {
        assert_eq!(
            ScreenId::WifiPasswordEntry.lineage(),
            vec![
                ScreenId::MainMenu,
                ScreenId::Settings,
                ScreenId::SettingsWifi,
                ScreenId::SettingsWifiNetworks,
                ScreenId::WifiPasswordEntry,
            ]
        );
        assert!(ScreenId::Settings.is_ancestor_of(ScreenId::WifiPasswordEntry));
        assert!(!ScreenId::WifiPasswordEntry.is_ancestor_of(ScreenId::Settings));
    }
}
