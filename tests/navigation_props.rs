use pretty_assertions::assert_eq;
use proptest::prelude::*;

use tricorder::gesture::Gesture;
use tricorder::input::AbstractAction;
use tricorder::menu::{CatalogContext, Menu, MenuCatalog, MenuItem, MenuModel};
use tricorder::navigation::Navigator;
use tricorder::{Kiosk, KioskConfig, ScreenId};

fn items(labels: &[String]) -> Vec<MenuItem> {
    labels.iter().map(MenuItem::new).collect()
}

fn any_screen() -> impl Strategy<Value = ScreenId> {
    (0..ScreenId::ALL.len()).prop_map(|index| ScreenId::ALL[index])
}

// Everything but Back and Quit
fn wandering_action() -> impl Strategy<Value = AbstractAction> {
    prop_oneof![
        Just(AbstractAction::Prev),
        Just(AbstractAction::Next),
        Just(AbstractAction::Select),
    ]
}

proptest! {
    #[test]
    fn next_and_prev_wrap_around(
        labels in prop::collection::vec("[a-z]{1,8}", 1..20),
        start in 0usize..20,
    ) {
        let mut menu = Menu::new(items(&labels));
        menu.select(start);
        let before = menu.selected_index();

        for _ in 0..labels.len() {
            menu.navigate_next();
        }
        prop_assert_eq!(menu.selected_index(), before);

        for _ in 0..labels.len() {
            menu.navigate_prev();
        }
        prop_assert_eq!(menu.selected_index(), before);
    }

    #[test]
    fn back_reaches_root_within_depth_plus_one(
        screen in any_screen(),
        wander in prop::collection::vec(wandering_action(), 0..12),
    ) {
        let mut navigator = Navigator::new(MenuCatalog::default(), CatalogContext::default());
        navigator.go(screen, None);
        for action in wander {
            navigator.dispatch(action);
        }

        let budget = navigator.menus().stack().depth() + 1;
        let mut steps = 0;
        while navigator.current() != ScreenId::MainMenu && steps < budget {
            navigator.dispatch(AbstractAction::Back);
            steps += 1;
        }
        prop_assert_eq!(navigator.current(), ScreenId::MainMenu);
        prop_assert!(navigator.menus().stack().is_empty());
    }

    #[test]
    fn at_most_one_back_per_tick(
        screen in any_screen(),
        backs in prop::collection::vec(any::<bool>(), 1..6),
    ) {
        let mut kiosk = Kiosk::new(&KioskConfig::default());
        kiosk.navigator_mut().go(screen, None);
        let depth_before = kiosk.navigator().menus().stack().depth();

        // true: plain Back, false: long-press Back routed through pause
        let gestures: Vec<Gesture> = backs
            .iter()
            .map(|plain| {
                if *plain {
                    Gesture::Action(AbstractAction::Back)
                } else {
                    Gesture::Pause { fallback: AbstractAction::Back }
                }
            })
            .collect();
        let report = kiosk.dispatch(&gestures);

        prop_assert_eq!(report.dropped_backs, backs.len() - 1);
        prop_assert!(report.transitions.len() <= 1);
        prop_assert!(kiosk.navigator().menus().stack().depth() + 1 >= depth_before);
    }

    #[test]
    fn submenu_enter_then_exit_restores_parent(
        parent in prop::collection::vec("[a-z]{1,8}", 0..10),
        child in prop::collection::vec("[a-z]{1,8}", 0..10),
        index in 0usize..10,
    ) {
        let mut root = Menu::new(items(&parent));
        root.select(index);
        let mut model = MenuModel::new(root);
        let before = model.current().clone();
        let depth = model.stack().depth();

        model.enter_submenu(ScreenId::Settings, items(&child));
        prop_assert_eq!(model.stack().depth(), depth + 1);
        prop_assert_eq!(model.exit_submenu(), Some(ScreenId::Settings));

        assert_eq!(model.current(), &before);
        prop_assert_eq!(model.stack().depth(), depth);
    }
}

#[test]
fn every_screen_keeps_its_ancestors_on_the_stack() {
    for screen in ScreenId::ALL {
        let mut navigator = Navigator::new(MenuCatalog::default(), CatalogContext::default());
        navigator.go(*screen, None);
        assert_eq!(navigator.current(), *screen);
        assert_eq!(
            navigator.menus().stack().owners().collect::<Vec<_>>(),
            screen.lineage()[..screen.lineage().len() - 1].to_vec()
        );
    }
}
