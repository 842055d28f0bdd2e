use std::sync::atomic::{AtomicUsize, Ordering};

use common_security::Route;
use tokio::sync::watch;
use tracing::info;

/// Called by the pipeline after it has torn the session down on a 401.
///
/// The teardown itself is not overridable; the hook decides what the front end
/// does next (the default sends it back to the login entry point).
pub trait UnauthorizedHook: Send + Sync {
    fn on_unauthorized(&self, endpoint: &str);
}

/// Publishes [`Route::Login`] for whatever renders the console.
pub struct LoginRedirect {
    route: watch::Sender<Route>,
    redirects: AtomicUsize,
}

impl LoginRedirect {
    pub fn new() -> Self {
        let (route, _) = watch::channel(Route::Loading);
        Self {
            route,
            redirects: AtomicUsize::new(0),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<Route> {
        self.route.subscribe()
    }

    pub fn current(&self) -> Route {
        *self.route.borrow()
    }

    /// Lets the front end record the route it navigated to on its own.
    pub fn navigate(&self, route: Route) {
        self.route.send_replace(route);
    }

    pub fn redirects(&self) -> usize {
        self.redirects.load(Ordering::SeqCst)
    }
}

impl Default for LoginRedirect {
    fn default() -> Self {
        Self::new()
    }
}

impl UnauthorizedHook for LoginRedirect {
    fn on_unauthorized(&self, endpoint: &str) {
        self.redirects.fetch_add(1, Ordering::SeqCst);
        info!(endpoint, "redirecting to login after rejected credential");
        self.route.send_replace(Route::Login);
    }
}
