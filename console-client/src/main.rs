use std::env;

use anyhow::{Context, Result};
use common_security::Route;
use console_client::{ConsoleConfig, ConsoleState};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = ConsoleConfig::from_env().context("failed to load console configuration")?;
    let console = ConsoleState::from_config(config)?;

    let mut route = console.start();
    info!(?route, "session resolved");

    if route == Route::Login {
        if let (Ok(login), Ok(password)) = (env::var("CONSOLE_LOGIN"), env::var("CONSOLE_PASSWORD")) {
            match console.data.login(&login, &password).await {
                Ok(principal) => info!(user_id = %principal.id, role = %principal.role, "signed in"),
                Err(err) => warn!(%err, "sign-in failed"),
            }
            route = console.start();
        }
    }

    match console.navigator() {
        Some(navigator) => {
            let tabs: Vec<&str> = navigator.tabs().iter().map(|screen| screen.as_tab()).collect();
            info!(
                role = %navigator.role(),
                active = navigator.active().as_tab(),
                tabs = ?tabs,
                ?route,
                "console ready"
            );
        }
        None => info!(?route, "no active session"),
    }

    Ok(())
}
