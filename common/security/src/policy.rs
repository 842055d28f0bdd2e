//! Screen reachability per role.
//!
//! This only decides what the console renders. Data-level scoping (which
//! cities a courier may see) and every write stay with the server.

use common_auth::Role;
use serde::{Deserialize, Serialize};
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Screen {
    Categories,
    Subcategories,
    Products,
    Couriers,
    Cities,
}

impl Screen {
    pub const ALL: [Screen; 5] = [
        Screen::Categories,
        Screen::Subcategories,
        Screen::Products,
        Screen::Couriers,
        Screen::Cities,
    ];

    pub fn as_tab(&self) -> &'static str {
        match self {
            Screen::Categories => "categories",
            Screen::Subcategories => "subcategories",
            Screen::Products => "products",
            Screen::Couriers => "couriers",
            Screen::Cities => "cities",
        }
    }

    pub fn from_tab(tab: &str) -> Option<Self> {
        Screen::ALL
            .into_iter()
            .find(|screen| screen.as_tab().eq_ignore_ascii_case(tab.trim()))
    }
}

/// Which variant of the products screen a role gets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProductScope {
    All,
    Own,
}

pub fn allowed_screens(role: Role) -> &'static [Screen] {
    use Screen::*;
    match role {
        Role::Manager => &[Categories, Subcategories, Products, Couriers],
        Role::Courier => &[Products, Cities],
    }
}

pub fn fallback_screen(role: Role) -> Screen {
    match role {
        Role::Manager => Screen::Categories,
        Role::Courier => Screen::Products,
    }
}

pub fn is_allowed(role: Role, screen: Screen) -> bool {
    allowed_screens(role).contains(&screen)
}

pub fn product_scope(role: Role) -> ProductScope {
    match role {
        Role::Manager => ProductScope::All,
        Role::Courier => ProductScope::Own,
    }
}

/// Resolves a requested screen to one the role may reach.
pub fn select_screen(role: Role, requested: Screen) -> Screen {
    if is_allowed(role, requested) {
        return requested;
    }
    let fallback = fallback_screen(role);
    warn!(%role, requested = requested.as_tab(), fallback = fallback.as_tab(), "screen_denied");
    fallback
}

/// Like [`select_screen`], for raw tab identifiers. Unknown tabs fall back.
pub fn select_tab(role: Role, tab: &str) -> Screen {
    match Screen::from_tab(tab) {
        Some(requested) => select_screen(role, requested),
        None => fallback_screen(role),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn courier_cannot_reach_manager_screens() {
        for screen in [Screen::Categories, Screen::Subcategories, Screen::Couriers] {
            assert_eq!(select_screen(Role::Courier, screen), Screen::Products, "{screen:?}");
        }
        assert_eq!(select_screen(Role::Courier, Screen::Cities), Screen::Cities);
    }

    #[test]
    fn manager_keeps_allowed_screens() {
        for screen in allowed_screens(Role::Manager) {
            assert_eq!(select_screen(Role::Manager, *screen), *screen);
        }
        assert_eq!(select_screen(Role::Manager, Screen::Cities), Screen::Categories);
    }

    #[test]
    fn selection_never_leaves_the_allowed_set() {
        for role in [Role::Manager, Role::Courier] {
            for screen in Screen::ALL {
                assert!(is_allowed(role, select_screen(role, screen)));
            }
        }
    }

    #[test]
    fn tabs_parse_and_unknown_tabs_fall_back() {
        assert_eq!(Screen::from_tab("Couriers"), Some(Screen::Couriers));
        assert_eq!(select_tab(Role::Courier, "categories"), Screen::Products);
        assert_eq!(select_tab(Role::Manager, "settings"), Screen::Categories);
    }

    #[test]
    fn product_scope_follows_role() {
        assert_eq!(product_scope(Role::Manager), ProductScope::All);
        assert_eq!(product_scope(Role::Courier), ProductScope::Own);
    }
}
