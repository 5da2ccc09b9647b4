use std::process::Command;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::input::AbstractAction;
use crate::navigation::{FeatureError, FeatureHandler, HandlerResult, ScreenId};
use crate::worker::{BackgroundJob, JobStatus};

/// Radio control behind the WiFi screens. Calls may block; they only ever
/// run on background jobs.
pub trait NetworkService: Send + Sync + 'static {
    fn set_radio(&self, enabled: bool) -> Result<bool, FeatureError>;

    fn scan(&self) -> Result<Vec<String>, FeatureError>;

    fn connect(&self, ssid: &str, password: &str) -> Result<(), FeatureError>;
}

/// NetworkManager through its `nmcli` command line client.
#[derive(Debug, Clone, Default)]
pub struct Nmcli;

impl Nmcli {
    fn run(args: &[&str]) -> Result<String, FeatureError> {
        debug!("Running nmcli {:?}", args);
        let output = Command::new("nmcli")
            .args(args)
            .output()
            .map_err(|e| FeatureError::Unavailable(format!("nmcli: {}", e)))?;
        if !output.status.success() {
            return Err(FeatureError::OperationFailed(
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    pub fn radio_enabled(&self) -> Result<bool, FeatureError> {
        Ok(Self::run(&["radio", "wifi"])?.trim() == "enabled")
    }
}

impl NetworkService for Nmcli {
    fn set_radio(&self, enabled: bool) -> Result<bool, FeatureError> {
        Self::run(&["radio", "wifi", if enabled { "on" } else { "off" }])?;
        self.radio_enabled()
    }

    fn scan(&self) -> Result<Vec<String>, FeatureError> {
        let listing = Self::run(&["-t", "-f", "SSID", "device", "wifi", "list", "--rescan", "yes"])?;
        Ok(parse_ssids(&listing))
    }

    fn connect(&self, ssid: &str, password: &str) -> Result<(), FeatureError> {
        Self::run(&["device", "wifi", "connect", ssid, "password", password])?;
        info!("Connected to '{}'", ssid);
        Ok(())
    }
}

// One SSID per line, hidden networks are empty; first occurrence wins
fn parse_ssids(listing: &str) -> Vec<String> {
    let mut ssids: Vec<String> = Vec::new();
    for line in listing.lines().map(str::trim).filter(|line| !line.is_empty()) {
        // terse mode escapes colons
        let ssid = line.replace("\\:", ":");
        if !ssids.contains(&ssid) {
            ssids.push(ssid);
        }
    }
    ssids
}

const WIFI_OPTIONS: [&str; 3] = ["Toggle WiFi", "Browse Networks", "<- Back"];

const CHARSET: &str = "abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789!@#$%&*-_.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKey {
    Char(char),
    Delete,
    Confirm,
    Cancel,
}

// Password typed one character at a time with Prev/Next/Select
#[derive(Debug, Clone, Default)]
pub struct PasswordEntry {
    buffer: String,
    cursor: usize,
}

impl PasswordEntry {
    fn key_count() -> usize {
        CHARSET.chars().count() + 3
    }

    pub fn key(&self) -> EntryKey {
        let chars = CHARSET.chars().count();
        match self.cursor {
            i if i < chars => CHARSET.chars().nth(i).map(EntryKey::Char).unwrap_or(EntryKey::Cancel),
            i if i == chars => EntryKey::Delete,
            i if i == chars + 1 => EntryKey::Confirm,
            _ => EntryKey::Cancel,
        }
    }

    pub fn text(&self) -> &str {
        &self.buffer
    }

    fn next(&mut self) {
        self.cursor = (self.cursor + 1) % Self::key_count();
    }

    fn prev(&mut self) {
        self.cursor = (self.cursor + Self::key_count() - 1) % Self::key_count();
    }
}

/// Handler for the WiFi settings, network list and password entry.
pub struct WifiSettings {
    service: Arc<dyn NetworkService>,
    radio_on: bool,
    option: usize,
    networks: Vec<String>,
    network_cursor: usize,
    chosen: Option<String>,
    password: PasswordEntry,
    toggle_job: Option<BackgroundJob<Result<bool, FeatureError>>>,
    scan_job: Option<BackgroundJob<Result<Vec<String>, FeatureError>>>,
    connect_job: Option<BackgroundJob<Result<(), FeatureError>>>,
    status: String,
}

impl WifiSettings {
    pub fn new(service: Arc<dyn NetworkService>, radio_on: bool) -> Self {
        Self {
            service,
            radio_on,
            option: 0,
            networks: Vec::new(),
            network_cursor: 0,
            chosen: None,
            password: PasswordEntry::default(),
            toggle_job: None,
            scan_job: None,
            connect_job: None,
            status: String::new(),
        }
    }

    pub fn radio_on(&self) -> bool {
        self.radio_on
    }

    pub fn networks(&self) -> &[String] {
        &self.networks
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn password(&self) -> &PasswordEntry {
        &self.password
    }

    pub fn is_scanning(&self) -> bool {
        self.scan_job.is_some()
    }

    fn start_scan(&mut self) -> Result<(), FeatureError> {
        if self.scan_job.is_some() {
            debug!("WiFi scan already running");
            return Ok(());
        }
        let service = Arc::clone(&self.service);
        self.scan_job = Some(BackgroundJob::spawn("wifi-scan", move || service.scan())?);
        self.status = "Scanning...".to_string();
        Ok(())
    }

    fn settings_input(&mut self, action: AbstractAction) -> Result<HandlerResult, FeatureError> {
        match action {
            AbstractAction::Next => self.option = (self.option + 1) % WIFI_OPTIONS.len(),
            AbstractAction::Prev => {
                self.option = (self.option + WIFI_OPTIONS.len() - 1) % WIFI_OPTIONS.len()
            }
            AbstractAction::Select => match self.option {
                0 => {
                    if self.toggle_job.is_some() {
                        debug!("Radio toggle already in flight");
                    } else {
                        let service = Arc::clone(&self.service);
                        let wanted = !self.radio_on;
                        self.toggle_job = Some(BackgroundJob::spawn("wifi-toggle", move || {
                            service.set_radio(wanted)
                        })?);
                    }
                }
                1 => return Ok(HandlerResult::transition(ScreenId::SettingsWifiNetworks)),
                _ => return Ok(HandlerResult::transition(ScreenId::Settings)),
            },
            _ => return Ok(HandlerResult::NotHandled),
        }
        Ok(HandlerResult::Handled)
    }

    fn networks_input(&mut self, action: AbstractAction) -> Result<HandlerResult, FeatureError> {
        // Networks followed by a back entry
        let entries = self.networks.len() + 1;
        match action {
            AbstractAction::Next => self.network_cursor = (self.network_cursor + 1) % entries,
            AbstractAction::Prev => {
                self.network_cursor = (self.network_cursor + entries - 1) % entries
            }
            AbstractAction::Select => match self.networks.get(self.network_cursor) {
                Some(ssid) => {
                    info!("Network '{}' chosen", ssid);
                    self.chosen = Some(ssid.clone());
                    self.password = PasswordEntry::default();
                    return Ok(HandlerResult::transition(ScreenId::WifiPasswordEntry));
                }
                None => return Ok(HandlerResult::transition(ScreenId::SettingsWifi)),
            },
            _ => return Ok(HandlerResult::NotHandled),
        }
        Ok(HandlerResult::Handled)
    }

    fn password_input(&mut self, action: AbstractAction) -> Result<HandlerResult, FeatureError> {
        match action {
            AbstractAction::Next => self.password.next(),
            AbstractAction::Prev => self.password.prev(),
            AbstractAction::Select => match self.password.key() {
                EntryKey::Char(c) => self.password.buffer.push(c),
                EntryKey::Delete => {
                    self.password.buffer.pop();
                }
                EntryKey::Confirm => {
                    if self.connect_job.is_some() {
                        debug!("Connection attempt already running");
                        return Ok(HandlerResult::Handled);
                    }
                    let Some(ssid) = self.chosen.clone() else {
                        warn!("Password confirmed without a chosen network");
                        return Ok(HandlerResult::transition(ScreenId::SettingsWifiNetworks));
                    };
                    let service = Arc::clone(&self.service);
                    let password = self.password.buffer.clone();
                    self.connect_job = Some(BackgroundJob::spawn("wifi-connect", move || {
                        service.connect(&ssid, &password)
                    })?);
                    self.status = "Connecting...".to_string();
                }
                EntryKey::Cancel => {
                    self.password = PasswordEntry::default();
                    return Ok(HandlerResult::transition(ScreenId::SettingsWifiNetworks));
                }
            },
            _ => return Ok(HandlerResult::NotHandled),
        }
        Ok(HandlerResult::Handled)
    }
}

impl FeatureHandler for WifiSettings {
    fn name(&self) -> &str {
        "wifi"
    }

    fn screens(&self) -> &'static [ScreenId] {
        &[
            ScreenId::SettingsWifi,
            ScreenId::SettingsWifiNetworks,
            ScreenId::WifiPasswordEntry,
        ]
    }

    fn handle_input(
        &mut self,
        screen: ScreenId,
        action: AbstractAction,
    ) -> Result<HandlerResult, FeatureError> {
        match screen {
            ScreenId::SettingsWifi => self.settings_input(action),
            ScreenId::SettingsWifiNetworks => self.networks_input(action),
            ScreenId::WifiPasswordEntry => self.password_input(action),
            _ => Ok(HandlerResult::NotHandled),
        }
    }

    fn on_enter(&mut self, screen: ScreenId, _payload: Option<&str>) -> Result<(), FeatureError> {
        match screen {
            ScreenId::SettingsWifi => self.option = 0,
            ScreenId::SettingsWifiNetworks => {
                self.network_cursor = 0;
                self.start_scan()?;
            }
            _ => {}
        }
        Ok(())
    }

    fn poll(&mut self, _screen: ScreenId) -> Result<HandlerResult, FeatureError> {
        let mut result = HandlerResult::NotHandled;

        if let Some(job) = self.toggle_job.as_mut() {
            match job.poll() {
                JobStatus::Pending => {}
                JobStatus::Finished(outcome) => {
                    self.toggle_job = None;
                    self.radio_on = outcome?;
                    info!("WiFi radio now {}", if self.radio_on { "on" } else { "off" });
                    result = HandlerResult::Handled;
                }
                JobStatus::Lost => {
                    self.toggle_job = None;
                    return Err(FeatureError::WorkerLost("wifi-toggle".to_string()));
                }
            }
        }

        if let Some(job) = self.scan_job.as_mut() {
            match job.poll() {
                JobStatus::Pending => {}
                JobStatus::Finished(outcome) => {
                    self.scan_job = None;
                    let networks = outcome?;
                    self.status = format!("{} networks", networks.len());
                    info!("WiFi scan found {} networks", networks.len());
                    self.networks = networks;
                    self.network_cursor = 0;
                    result = HandlerResult::Handled;
                }
                JobStatus::Lost => {
                    self.scan_job = None;
                    return Err(FeatureError::WorkerLost("wifi-scan".to_string()));
                }
            }
        }

        if let Some(job) = self.connect_job.as_mut() {
            match job.poll() {
                JobStatus::Pending => {}
                JobStatus::Finished(Ok(())) => {
                    self.connect_job = None;
                    self.status = "Connected".to_string();
                    self.password = PasswordEntry::default();
                    return Ok(HandlerResult::transition(ScreenId::SettingsWifi));
                }
                JobStatus::Finished(Err(e)) => {
                    self.connect_job = None;
                    warn!("WiFi connection failed: {}", e);
                    self.status = format!("Failed: {}", e);
                    result = HandlerResult::Handled;
                }
                JobStatus::Lost => {
                    self.connect_job = None;
                    return Err(FeatureError::WorkerLost("wifi-connect".to_string()));
                }
            }
        }

        Ok(result)
    }
}
