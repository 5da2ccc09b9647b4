use std::collections::BTreeMap;

use crate::input::{AbstractAction, LogicalControl};

// What a long press turns into
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Alternate {
    // Duration does not matter for this control
    None,
    Action(AbstractAction),
    // Pause/menu request of a modal screen, plain action elsewhere
    Pause,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlBinding {
    pub plain: AbstractAction,
    pub alternate: Alternate,
}

impl ControlBinding {
    pub const fn new(plain: AbstractAction, alternate: Alternate) -> Self {
        Self { plain, alternate }
    }

    pub const fn simple(plain: AbstractAction) -> Self {
        Self::new(plain, Alternate::None)
    }
}

// Output of the gesture engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gesture {
    Action(AbstractAction),
    Pause { fallback: AbstractAction },
    Reveal,
}

#[derive(Debug, Clone)]
pub struct BindingTable {
    bindings: BTreeMap<LogicalControl, ControlBinding>,
}

impl Default for BindingTable {
    fn default() -> Self {
        use AbstractAction::*;
        use LogicalControl::*;

        let bindings = BTreeMap::from([
            (ShuttlePrev, ControlBinding::new(Prev, Alternate::Action(Back))),
            (ShuttleNext, ControlBinding::new(Next, Alternate::Pause)),
            (StickUp, ControlBinding::simple(Prev)),
            (StickDown, ControlBinding::simple(Next)),
            (StickLeft, ControlBinding::simple(Back)),
            (StickRight, ControlBinding::new(Next, Alternate::Pause)),
            (StickPress, ControlBinding::simple(Select)),
            (PointerLeft, ControlBinding::new(Prev, Alternate::Action(Back))),
            (PointerMiddle, ControlBinding::simple(Select)),
            (PointerRight, ControlBinding::new(Next, Alternate::Pause)),
        ]);
        Self { bindings }
    }
}

impl BindingTable {
    pub fn get(&self, control: LogicalControl) -> Option<ControlBinding> {
        self.bindings.get(&control).copied()
    }

    pub fn bind(&mut self, control: LogicalControl, binding: ControlBinding) {
        self.bindings.insert(control, binding);
    }

    pub fn unbind(&mut self, control: LogicalControl) {
        self.bindings.remove(&control);
    }

    pub(crate) fn long_press(binding: ControlBinding) -> Gesture {
        match binding.alternate {
            Alternate::None => Gesture::Action(binding.plain),
            Alternate::Action(action) => Gesture::Action(action),
            Alternate::Pause => Gesture::Pause {
                fallback: binding.plain,
            },
        }
    }
}
