use chrono::{DateTime, Duration, Local};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info, warn};

use super::bindings::{Alternate, BindingTable, ControlBinding, Gesture};
use super::combo::{ComboSettings, ComboStep, ComboTracker, RevealContext};
use crate::input::{InputEvent, LogicalControl, Phase};

// Engine settings
#[derive(Clone, Debug)]
pub struct GestureSettings {
    pub long_press_threshold: Duration,
    pub combo: ComboSettings,
    /// Single control that reveals when held at the root for the combo duration.
    pub hold_reveal: Option<LogicalControl>,
}

impl Default for GestureSettings {
    fn default() -> Self {
        Self {
            long_press_threshold: Duration::milliseconds(600),
            combo: ComboSettings::default(),
            hold_reveal: Some(LogicalControl::StickPress),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PressTimer {
    Open { since: DateTime<Local> },
    // A gesture already used this press
    Consumed,
    // State changed under the press
    Cancelled,
}

/// Turns logical input events into gestures.
///
/// Keeps one press timer per control, the set of held controls and the
/// one-shot release suppression flags.
#[derive(Debug)]
pub struct GestureEngine {
    long_press_threshold: Duration,
    bindings: BindingTable,
    combo: ComboTracker,
    hold_reveal: Option<LogicalControl>,
    timers: BTreeMap<LogicalControl, PressTimer>,
    held: BTreeSet<LogicalControl>,
    suppressed: BTreeSet<LogicalControl>,
}

impl GestureEngine {
    pub fn new(settings: GestureSettings, bindings: BindingTable) -> Self {
        info!(
            "Creating gesture engine: long press {} ms, combo {} ms, reveal index {}, hold reveal {:?}",
            settings.long_press_threshold.num_milliseconds(),
            settings.combo.duration.num_milliseconds(),
            settings.combo.reveal_index,
            settings.hold_reveal
        );
        Self {
            long_press_threshold: settings.long_press_threshold,
            bindings,
            combo: ComboTracker::new(settings.combo),
            hold_reveal: settings.hold_reveal,
            timers: BTreeMap::new(),
            held: BTreeSet::new(),
            suppressed: BTreeSet::new(),
        }
    }

    pub fn combo_duration(&self) -> Duration {
        self.combo.settings().duration
    }

    // Also the hold time of the single-control reveal
    pub fn set_combo_duration(&mut self, duration: Duration) {
        self.combo.set_duration(duration);
    }

    pub fn is_held(&self, control: LogicalControl) -> bool {
        self.held.contains(&control)
    }

    pub fn is_suppressed(&self, control: LogicalControl) -> bool {
        self.suppressed.contains(&control)
    }

    pub fn combo_armed(&self) -> bool {
        self.combo.is_armed()
    }

    /// Feed one event. Only releases and a completing combo produce output.
    pub fn process(&mut self, event: &InputEvent, context: RevealContext) -> Option<Gesture> {
        let Some(binding) = self.bindings.get(event.control) else {
            debug!("No binding for {:?}, event dropped", event.control);
            return None;
        };

        match event.phase {
            Phase::Down => {
                self.held.insert(event.control);
                // Key repeat from some devices shows up as a second Down
                match self.timers.get(&event.control) {
                    Some(PressTimer::Open { .. }) => {
                        debug!("{:?} down while already open, keeping timer", event.control)
                    }
                    _ => {
                        self.timers
                            .insert(event.control, PressTimer::Open { since: event.timestamp });
                    }
                }
                self.check_combo(context, event.timestamp)
            }
            Phase::Held => {
                self.held.insert(event.control);
                // The Down was lost, so the hold counts from now
                if !self.timers.contains_key(&event.control) {
                    warn!(
                        "{:?} held without a recorded press, opening timer",
                        event.control
                    );
                    self.timers
                        .insert(event.control, PressTimer::Open { since: event.timestamp });
                }
                self.check_combo(context, event.timestamp)
            }
            Phase::Up => self.release(event.control, binding, event.timestamp, context),
        }
    }

    /// Once per tick: fire combos and long presses whose threshold passed.
    pub fn poll(&mut self, now: DateTime<Local>, context: RevealContext) -> Vec<Gesture> {
        let mut gestures = Vec::new();
        if let Some(reveal) = self.check_combo(context, now) {
            gestures.push(reveal);
        } else if let Some(reveal) = self.check_hold_reveal(context, now) {
            gestures.push(reveal);
        }

        let due: Vec<LogicalControl> = self
            .timers
            .iter()
            .filter_map(|(control, timer)| match timer {
                PressTimer::Open { since } if now - *since >= self.long_press_threshold => {
                    Some(*control)
                }
                _ => None,
            })
            .collect();

        for control in due {
            let Some(binding) = self.bindings.get(control) else {
                continue;
            };
            // Plain-only controls wait for their release
            if binding.alternate == Alternate::None {
                continue;
            }
            // An armed combo owns both of its controls until it completes or aborts
            if self.combo.is_armed() && self.combo.involves(control) {
                continue;
            }
            let gesture = BindingTable::long_press(binding);
            info!("Long press of {:?} fired mid-hold: {:?}", control, gesture);
            self.timers.insert(control, PressTimer::Consumed);
            self.suppressed.insert(control);
            gestures.push(gesture);
        }

        gestures
    }

    /// Drop every open timer without firing, e.g. after a state change.
    pub fn cancel_pending(&mut self) {
        let mut cancelled = 0;
        for timer in self.timers.values_mut() {
            if matches!(timer, PressTimer::Open { .. }) {
                *timer = PressTimer::Cancelled;
                cancelled += 1;
            }
        }
        if cancelled > 0 {
            debug!("Cancelled {} pending press timers", cancelled);
        }
        self.combo.cancel();
    }

    fn check_combo(&mut self, context: RevealContext, now: DateTime<Local>) -> Option<Gesture> {
        match self.combo.update(&self.held, context, now) {
            ComboStep::Completed => {
                // Both buttons count as released; their real releases are swallowed
                let controls = self.combo.settings().controls;
                for control in controls {
                    self.held.remove(&control);
                    self.suppressed.insert(control);
                    self.timers.insert(control, PressTimer::Consumed);
                }
                Some(Gesture::Reveal)
            }
            ComboStep::Aborted => {
                self.swallow_combo_presses();
                None
            }
            ComboStep::Idle | ComboStep::Armed => None,
        }
    }

    fn check_hold_reveal(&mut self, context: RevealContext, now: DateTime<Local>) -> Option<Gesture> {
        let control = self.hold_reveal?;
        if !context.at_root {
            return None;
        }
        let Some(PressTimer::Open { since }) = self.timers.get(&control) else {
            return None;
        };
        let held_for = now - *since;
        if held_for < self.combo.settings().duration {
            return None;
        }
        info!(
            "{:?} held {} ms at the root, revealing",
            control,
            held_for.num_milliseconds()
        );
        self.timers.insert(control, PressTimer::Consumed);
        self.suppressed.insert(control);
        Some(Gesture::Reveal)
    }

    // Still-held combo controls stay silent until released
    fn swallow_combo_presses(&mut self) {
        let controls = self.combo.settings().controls;
        for control in controls {
            if self.held.contains(&control) {
                debug!("Press of {:?} swallowed by aborted combo", control);
                self.suppressed.insert(control);
                self.timers.insert(control, PressTimer::Consumed);
            }
        }
    }

    fn release(
        &mut self,
        control: LogicalControl,
        binding: ControlBinding,
        timestamp: DateTime<Local>,
        context: RevealContext,
    ) -> Option<Gesture> {
        self.held.remove(&control);
        let timer = self.timers.remove(&control);

        // Letting go of an armed combo only resets it, for both buttons
        if self.combo.release(control) {
            self.swallow_combo_presses();
            self.suppressed.remove(&control);
            return None;
        }

        if self.suppressed.remove(&control) {
            debug!("Release of {:?} suppressed", control);
            return None;
        }

        match timer {
            Some(PressTimer::Open { since }) => {
                let duration = (timestamp - since).max(Duration::zero());
                // No tick landed past the hold time, so the reveal happens here
                if self.hold_reveal == Some(control)
                    && context.at_root
                    && duration >= self.combo.settings().duration
                {
                    info!("{:?} released after a reveal hold", control);
                    return Some(Gesture::Reveal);
                }
                let gesture = if duration >= self.long_press_threshold {
                    BindingTable::long_press(binding)
                } else {
                    Gesture::Action(binding.plain)
                };
                debug!(
                    "{:?} released after {} ms: {:?}",
                    control,
                    duration.num_milliseconds(),
                    gesture
                );
                Some(gesture)
            }
            Some(PressTimer::Cancelled) | Some(PressTimer::Consumed) => {
                debug!("Release of {:?} ends a cancelled press", control);
                None
            }
            None => {
                warn!(
                    "Release of {:?} without a recorded press, treating as short",
                    control
                );
                Some(Gesture::Action(binding.plain))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::AbstractAction;
    use LogicalControl::*;

    fn engine() -> GestureEngine {
        GestureEngine::new(GestureSettings::default(), BindingTable::default())
    }

    fn at(ms: i64, base: DateTime<Local>) -> DateTime<Local> {
        base + Duration::milliseconds(ms)
    }

    const ROOT_AT_SETTINGS: RevealContext = RevealContext {
        at_root: true,
        selected: Some(4),
    };

    #[test]
    fn short_press_gives_plain_action() {
        let mut engine = engine();
        let t0 = Local::now();
        let ctx = RevealContext::default();
        assert_eq!(engine.process(&InputEvent::down(ShuttleNext, t0), ctx), None);
        assert_eq!(
            engine.process(&InputEvent::up(ShuttleNext, at(200, t0)), ctx),
            Some(Gesture::Action(AbstractAction::Next))
        );
    }

    #[test]
    fn long_release_gives_alternate() {
        let mut engine = engine();
        let t0 = Local::now();
        let ctx = RevealContext::default();
        engine.process(&InputEvent::down(ShuttlePrev, t0), ctx);
        assert_eq!(
            engine.process(&InputEvent::up(ShuttlePrev, at(650, t0)), ctx),
            Some(Gesture::Action(AbstractAction::Back))
        );

        engine.process(&InputEvent::down(PointerRight, t0), ctx);
        assert_eq!(
            engine.process(&InputEvent::up(PointerRight, at(900, t0)), ctx),
            Some(Gesture::Pause {
                fallback: AbstractAction::Next
            })
        );
    }

    #[test]
    fn long_press_fires_mid_hold_and_release_is_silent() {
        let mut engine = engine();
        let t0 = Local::now();
        let ctx = RevealContext::default();
        engine.process(&InputEvent::down(ShuttlePrev, t0), ctx);
        assert!(engine.poll(at(300, t0), ctx).is_empty());
        assert_eq!(
            engine.poll(at(700, t0), ctx),
            vec![Gesture::Action(AbstractAction::Back)]
        );
        // Fires once
        assert!(engine.poll(at(900, t0), ctx).is_empty());
        assert_eq!(engine.process(&InputEvent::up(ShuttlePrev, at(1000, t0)), ctx), None);
        assert!(!engine.is_suppressed(ShuttlePrev));
    }

    #[test]
    fn controls_without_alternate_ignore_duration() {
        let mut engine = engine();
        let t0 = Local::now();
        let ctx = RevealContext::default();
        engine.process(&InputEvent::down(StickPress, t0), ctx);
        assert!(engine.poll(at(2000, t0), ctx).is_empty());
        assert_eq!(
            engine.process(&InputEvent::up(StickPress, at(2100, t0)), ctx),
            Some(Gesture::Action(AbstractAction::Select))
        );
    }

    #[test]
    fn release_without_press_is_short() {
        let mut engine = engine();
        let t0 = Local::now();
        assert_eq!(
            engine.process(&InputEvent::up(StickLeft, t0), RevealContext::default()),
            Some(Gesture::Action(AbstractAction::Back))
        );
    }

    #[test]
    fn combo_reveals_once_and_swallows_releases() {
        let mut engine = engine();
        let t0 = Local::now();
        engine.process(&InputEvent::down(ShuttlePrev, t0), ROOT_AT_SETTINGS);
        engine.process(&InputEvent::down(ShuttleNext, t0), ROOT_AT_SETTINGS);
        assert!(engine.combo_armed());

        // Long press is held back while the combo is armed
        assert!(engine.poll(at(1500, t0), ROOT_AT_SETTINGS).is_empty());
        assert_eq!(engine.poll(at(3100, t0), ROOT_AT_SETTINGS), vec![Gesture::Reveal]);
        assert!(!engine.is_held(ShuttlePrev));
        assert!(!engine.is_held(ShuttleNext));
        assert!(engine.poll(at(3200, t0), ROOT_AT_SETTINGS).is_empty());

        assert_eq!(
            engine.process(&InputEvent::up(ShuttlePrev, at(3300, t0)), ROOT_AT_SETTINGS),
            None
        );
        assert_eq!(
            engine.process(&InputEvent::up(ShuttleNext, at(3400, t0)), ROOT_AT_SETTINGS),
            None
        );
    }

    #[test]
    fn cancelled_press_produces_nothing_and_no_suppression() {
        let mut engine = engine();
        let t0 = Local::now();
        let ctx = RevealContext::default();
        engine.process(&InputEvent::down(ShuttleNext, t0), ctx);
        engine.cancel_pending();
        assert!(engine.poll(at(1000, t0), ctx).is_empty());
        assert!(!engine.is_suppressed(ShuttleNext));
        assert_eq!(engine.process(&InputEvent::up(ShuttleNext, at(1100, t0)), ctx), None);

        // Next press behaves normally again
        engine.process(&InputEvent::down(ShuttleNext, at(1200, t0)), ctx);
        assert_eq!(
            engine.process(&InputEvent::up(ShuttleNext, at(1300, t0)), ctx),
            Some(Gesture::Action(AbstractAction::Next))
        );
    }

    #[test]
    fn unbound_controls_are_dropped() {
        let mut bindings = BindingTable::default();
        bindings.unbind(PointerMiddle);
        let mut engine = GestureEngine::new(GestureSettings::default(), bindings);
        let t0 = Local::now();
        let ctx = RevealContext::default();
        assert_eq!(engine.process(&InputEvent::down(PointerMiddle, t0), ctx), None);
        assert_eq!(engine.process(&InputEvent::up(PointerMiddle, t0), ctx), None);
    }

    #[test]
    fn aborted_combo_is_silent_for_both_controls() {
        let mut engine = engine();
        let t0 = Local::now();
        engine.process(&InputEvent::down(ShuttlePrev, t0), ROOT_AT_SETTINGS);
        engine.process(&InputEvent::down(ShuttleNext, t0), ROOT_AT_SETTINGS);
        assert!(engine.poll(at(1000, t0), ROOT_AT_SETTINGS).is_empty());

        // Past the long-press threshold, but the combo was only reset
        assert_eq!(
            engine.process(&InputEvent::up(ShuttleNext, at(1500, t0)), ROOT_AT_SETTINGS),
            None
        );
        assert!(!engine.combo_armed());
        assert!(engine.poll(at(1530, t0), ROOT_AT_SETTINGS).is_empty());
        assert!(engine.poll(at(4000, t0), ROOT_AT_SETTINGS).is_empty());
        assert_eq!(
            engine.process(&InputEvent::up(ShuttlePrev, at(4100, t0)), ROOT_AT_SETTINGS),
            None
        );
        assert!(!engine.is_suppressed(ShuttlePrev));
        assert!(!engine.is_suppressed(ShuttleNext));

        // The next press is an ordinary one
        engine.process(&InputEvent::down(ShuttlePrev, at(5000, t0)), ROOT_AT_SETTINGS);
        assert_eq!(
            engine.process(&InputEvent::up(ShuttlePrev, at(5100, t0)), ROOT_AT_SETTINGS),
            Some(Gesture::Action(AbstractAction::Prev))
        );
    }

    #[test]
    fn combo_lost_to_cursor_move_fires_no_long_press() {
        let mut engine = engine();
        let t0 = Local::now();
        let moved = RevealContext {
            at_root: true,
            selected: Some(3),
        };
        engine.process(&InputEvent::down(ShuttlePrev, t0), ROOT_AT_SETTINGS);
        engine.process(&InputEvent::down(ShuttleNext, t0), ROOT_AT_SETTINGS);
        assert!(engine.poll(at(400, t0), ROOT_AT_SETTINGS).is_empty());
        assert!(engine.poll(at(800, t0), moved).is_empty());
        assert!(!engine.combo_armed());
        assert!(engine.poll(at(2000, t0), moved).is_empty());
        assert_eq!(engine.process(&InputEvent::up(ShuttlePrev, at(2100, t0)), moved), None);
        assert_eq!(engine.process(&InputEvent::up(ShuttleNext, at(2200, t0)), moved), None);
    }

    #[test]
    fn stick_hold_at_root_reveals_once() {
        let mut engine = engine();
        let t0 = Local::now();
        let root = RevealContext {
            at_root: true,
            selected: Some(0),
        };
        engine.process(&InputEvent::down(StickPress, t0), root);
        assert!(engine.poll(at(2900, t0), root).is_empty());
        assert_eq!(engine.poll(at(3000, t0), root), vec![Gesture::Reveal]);
        assert!(engine.poll(at(3100, t0), root).is_empty());
        assert_eq!(engine.process(&InputEvent::up(StickPress, at(3200, t0)), root), None);
    }

    #[test]
    fn stick_hold_released_past_duration_reveals() {
        let mut engine = engine();
        let t0 = Local::now();
        let root = RevealContext {
            at_root: true,
            selected: Some(2),
        };
        engine.process(&InputEvent::down(StickPress, t0), root);
        assert_eq!(
            engine.process(&InputEvent::up(StickPress, at(3500, t0)), root),
            Some(Gesture::Reveal)
        );
    }

    #[test]
    fn stick_hold_follows_combo_duration() {
        let mut engine = engine();
        engine.set_combo_duration(Duration::seconds(5));
        let t0 = Local::now();
        let root = RevealContext {
            at_root: true,
            selected: Some(0),
        };
        engine.process(&InputEvent::down(StickPress, t0), root);
        assert!(engine.poll(at(4000, t0), root).is_empty());
        assert_eq!(engine.poll(at(5000, t0), root), vec![Gesture::Reveal]);
    }
}
