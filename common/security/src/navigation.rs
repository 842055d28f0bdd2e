use common_auth::{Principal, Role, SessionState};
use serde::Serialize;
use tracing::debug;

use crate::policy::{allowed_screens, fallback_screen, product_scope, select_screen, select_tab, ProductScope, Screen};

/// Top-level destination derived from the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Route {
    /// Resolution still pending; nothing role-gated may render.
    Loading,
    Login,
    Panel(Screen),
}

pub fn initial_route(state: &SessionState) -> Route {
    match state {
        SessionState::Unknown => Route::Loading,
        SessionState::Anonymous => Route::Login,
        SessionState::Authenticated(principal) => Route::Panel(fallback_screen(principal.role)),
    }
}

/// Active tab of the panel. Every switch goes back through the role gate.
#[derive(Debug, Clone)]
pub struct TabNavigator {
    role: Role,
    active: Screen,
}

impl TabNavigator {
    pub fn new(role: Role) -> Self {
        Self {
            role,
            active: fallback_screen(role),
        }
    }

    pub fn for_principal(principal: &Principal) -> Self {
        Self::new(principal.role)
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn active(&self) -> Screen {
        self.active
    }

    pub fn tabs(&self) -> &'static [Screen] {
        allowed_screens(self.role)
    }

    pub fn product_scope(&self) -> ProductScope {
        product_scope(self.role)
    }

    pub fn switch_to(&mut self, requested: Screen) -> Screen {
        self.active = select_screen(self.role, requested);
        debug!(role = %self.role, active = self.active.as_tab(), "tab switched");
        self.active
    }

    pub fn switch_to_tab(&mut self, tab: &str) -> Screen {
        self.active = select_tab(self.role, tab);
        self.active
    }
}
