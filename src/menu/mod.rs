//! Menu model
//!
//! Every list screen owns its own [`Menu`] (items plus cursor). Entering a
//! child pushes the parent's menu as a [`NavigationFrame`]; leaving restores
//! it verbatim.

pub mod catalog;

use tracing::{debug, warn};

use crate::navigation::screen::{GameKind, ScreenId};

pub use catalog::{CatalogContext, MenuCatalog};

// What selecting an item does besides (or instead of) changing screen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuAction {
    LaunchGame(GameKind),
    ReturnToMenu,
    SetComboDuration(u32),
    SetAutoCycleInterval(u32),
    Reboot,
    Shutdown,
    RestartApp,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MenuItem {
    pub label: String,
    pub target: Option<ScreenId>,
    pub action: Option<MenuAction>,
    pub payload: Option<String>,
    pub tag: Option<String>,
}

impl MenuItem {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            target: None,
            action: None,
            payload: None,
            tag: None,
        }
    }

    pub fn target(mut self, target: ScreenId) -> Self {
        self.target = Some(target);
        self
    }

    pub fn action(mut self, action: MenuAction) -> Self {
        self.action = Some(action);
        self
    }

    pub fn payload(mut self, payload: impl Into<String>) -> Self {
        self.payload = Some(payload.into());
        self
    }

    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }
}

/// Ordered items with a wrapping cursor.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Menu {
    items: Vec<MenuItem>,
    selected: usize,
}

impl Menu {
    pub fn new(items: Vec<MenuItem>) -> Self {
        Self { items, selected: 0 }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn items(&self) -> &[MenuItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    // None while there is nothing to select
    pub fn selected_index(&self) -> Option<usize> {
        if self.items.is_empty() {
            None
        } else {
            Some(self.selected)
        }
    }

    pub fn selected_item(&self) -> Option<&MenuItem> {
        self.items.get(self.selected)
    }

    pub fn select(&mut self, index: usize) {
        if self.items.is_empty() {
            self.selected = 0;
        } else {
            self.selected = index.min(self.items.len() - 1);
        }
    }

    pub fn navigate_next(&mut self) -> bool {
        if self.items.is_empty() {
            return false;
        }
        self.selected = (self.selected + 1) % self.items.len();
        true
    }

    pub fn navigate_prev(&mut self) -> bool {
        if self.items.is_empty() {
            return false;
        }
        self.selected = (self.selected + self.items.len() - 1) % self.items.len();
        true
    }
}

// Saved parent context
#[derive(Debug, Clone, PartialEq)]
pub struct NavigationFrame {
    pub owner: ScreenId,
    pub menu: Menu,
}

#[derive(Debug, Clone)]
pub struct NavigationStack {
    frames: Vec<NavigationFrame>,
    max_depth: usize,
}

impl NavigationStack {
    pub const DEFAULT_MAX_DEPTH: usize = 8;

    pub fn new(max_depth: usize) -> Self {
        Self {
            frames: Vec::new(),
            max_depth: max_depth.max(1),
        }
    }

    pub fn push(&mut self, frame: NavigationFrame) {
        if self.frames.len() >= self.max_depth {
            let evicted = self.frames.remove(0);
            warn!(
                "Navigation stack full ({}), evicting frame of {:?}",
                self.max_depth, evicted.owner
            );
        }
        self.frames.push(frame);
    }

    pub fn pop(&mut self) -> Option<NavigationFrame> {
        self.frames.pop()
    }

    pub fn top(&self) -> Option<&NavigationFrame> {
        self.frames.last()
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn owners(&self) -> impl Iterator<Item = ScreenId> + '_ {
        self.frames.iter().map(|frame| frame.owner)
    }

    pub fn clear(&mut self) {
        self.frames.clear();
    }
}

impl Default for NavigationStack {
    fn default() -> Self {
        Self::new(Self::DEFAULT_MAX_DEPTH)
    }
}

/// Active menu plus the stack of parent menus.
#[derive(Debug, Clone, Default)]
pub struct MenuModel {
    current: Menu,
    stack: NavigationStack,
}

impl MenuModel {
    pub fn new(root: Menu) -> Self {
        Self {
            current: root,
            stack: NavigationStack::default(),
        }
    }

    pub fn current(&self) -> &Menu {
        &self.current
    }

    pub fn current_mut(&mut self) -> &mut Menu {
        &mut self.current
    }

    pub fn stack(&self) -> &NavigationStack {
        &self.stack
    }

    pub fn navigate_next(&mut self) -> bool {
        self.current.navigate_next()
    }

    pub fn navigate_prev(&mut self) -> bool {
        self.current.navigate_prev()
    }

    pub fn get_selected_item(&self) -> Option<&MenuItem> {
        self.current.selected_item()
    }

    // `owner` is the screen the current menu belongs to
    pub fn enter_submenu(&mut self, owner: ScreenId, items: Vec<MenuItem>) {
        self.push_menu(owner, Menu::new(items));
    }

    // Like enter_submenu, but keeps the cursor the new menu comes with
    pub fn push_menu(&mut self, owner: ScreenId, menu: Menu) {
        let parent = std::mem::replace(&mut self.current, menu);
        debug!(
            "Entering submenu from {:?} (index {:?}), depth {}",
            owner,
            parent.selected_index(),
            self.stack.depth() + 1
        );
        self.stack.push(NavigationFrame {
            owner,
            menu: parent,
        });
    }

    /// Restore the parent menu. Returns the screen that owned it, or None
    /// when there was nothing to pop and the caller should go to the root.
    pub fn exit_submenu(&mut self) -> Option<ScreenId> {
        match self.stack.pop() {
            Some(frame) => {
                debug!(
                    "Restoring menu of {:?} at index {:?}",
                    frame.owner,
                    frame.menu.selected_index()
                );
                self.current = frame.menu;
                Some(frame.owner)
            }
            None => {
                debug!("Navigation stack empty, nothing to restore");
                None
            }
        }
    }

    pub fn reset(&mut self, root: Menu) {
        self.stack.clear();
        self.current = root;
    }
}
