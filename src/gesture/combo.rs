use chrono::{DateTime, Duration, Local};
use std::collections::BTreeSet;
use tracing::{debug, info};

use crate::input::LogicalControl;

/// Where the navigator currently is, as far as the reveal combo cares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RevealContext {
    pub at_root: bool,
    pub selected: Option<usize>,
}

#[derive(Clone, Debug)]
pub struct ComboSettings {
    pub controls: [LogicalControl; 2],
    pub duration: Duration,
    pub cooldown: Duration,
    pub reveal_index: usize,
}

impl Default for ComboSettings {
    fn default() -> Self {
        Self {
            controls: [LogicalControl::ShuttlePrev, LogicalControl::ShuttleNext],
            duration: Duration::milliseconds(3000),
            cooldown: Duration::milliseconds(300),
            reveal_index: 4,
        }
    }
}

/// Outcome of one combo update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComboStep {
    Idle,
    Armed,
    // Was armed, conditions went away before the duration
    Aborted,
    Completed,
}

// Two-control hold-to-reveal tracker
#[derive(Debug)]
pub struct ComboTracker {
    settings: ComboSettings,
    armed_since: Option<DateTime<Local>>,
    cooldown_until: Option<DateTime<Local>>,
}

impl ComboTracker {
    pub fn new(settings: ComboSettings) -> Self {
        Self {
            settings,
            armed_since: None,
            cooldown_until: None,
        }
    }

    pub fn settings(&self) -> &ComboSettings {
        &self.settings
    }

    pub fn set_duration(&mut self, duration: Duration) {
        info!("Combo duration set to {} ms", duration.num_milliseconds());
        self.settings.duration = duration;
    }

    pub fn involves(&self, control: LogicalControl) -> bool {
        self.settings.controls.contains(&control)
    }

    pub fn is_armed(&self) -> bool {
        self.armed_since.is_some()
    }

    fn ready(&self, held: &BTreeSet<LogicalControl>, context: RevealContext) -> bool {
        self.settings.controls.iter().all(|c| held.contains(c))
            && context.at_root
            && context.selected == Some(self.settings.reveal_index)
    }

    /// Arms, disarms or fires. `Completed` is returned once per hold.
    pub fn update(
        &mut self,
        held: &BTreeSet<LogicalControl>,
        context: RevealContext,
        now: DateTime<Local>,
    ) -> ComboStep {
        let ready = self.ready(held, context);
        match self.armed_since {
            Some(_) if !ready => {
                debug!("Combo conditions lost, disarming");
                self.armed_since = None;
                ComboStep::Aborted
            }
            Some(since) if now - since >= self.settings.duration => {
                self.armed_since = None;
                self.cooldown_until = Some(now + self.settings.cooldown);
                info!(
                    "Reveal combo completed after {} ms",
                    (now - since).num_milliseconds()
                );
                ComboStep::Completed
            }
            Some(_) => ComboStep::Armed,
            None if !ready => ComboStep::Idle,
            None => match self.cooldown_until {
                Some(until) if now < until => {
                    debug!("Combo in cooldown until {}", until.format("%H:%M:%S.%3f"));
                    ComboStep::Idle
                }
                _ => {
                    debug!("Combo armed at {}", now.format("%H:%M:%S.%3f"));
                    self.armed_since = Some(now);
                    ComboStep::Armed
                }
            },
        }
    }

    /// Release of either control before the duration resets the combo.
    /// Returns true when that release aborted an armed combo.
    pub fn release(&mut self, control: LogicalControl) -> bool {
        if self.involves(control) && self.armed_since.take().is_some() {
            debug!("Combo released early by {:?}", control);
            return true;
        }
        false
    }

    pub fn cancel(&mut self) {
        if self.armed_since.take().is_some() {
            debug!("Combo cancelled");
        }
    }
}
