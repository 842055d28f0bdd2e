use std::sync::Arc;

use anyhow::{Context, Result};
use common_auth::SessionResolver;
use common_observability::ConsoleMetrics;
use common_security::{initial_route, Route, TabNavigator};
use tracing::info;

use crate::config::ConsoleConfig;
use crate::data::{DataService, DataSource, RemoteSource, SubstituteSource};
use crate::hooks::LoginRedirect;
use crate::pipeline::ApiClient;

/// Everything a console front end needs, wired from one configuration.
#[derive(Clone)]
pub struct ConsoleState {
    pub config: Arc<ConsoleConfig>,
    pub session: Arc<SessionResolver>,
    pub client: Arc<ApiClient>,
    pub data: DataService,
    pub redirect: Arc<LoginRedirect>,
    pub metrics: Arc<ConsoleMetrics>,
}

impl ConsoleState {
    pub fn from_config(config: ConsoleConfig) -> Result<Self> {
        let metrics = Arc::new(ConsoleMetrics::new().context("failed to register console metrics")?);
        let session = Arc::new(SessionResolver::new(
            config.credential_store(),
            &config.session,
        ));
        let redirect = Arc::new(LoginRedirect::new());

        let client = ApiClient::new(&config, session.clone())
            .context("failed to build HTTP client")?
            .with_unauthorized_hook(redirect.clone())
            .with_metrics(metrics.clone());
        let client = Arc::new(client);

        let source: Arc<dyn DataSource> = if config.use_backend {
            info!(api_url = %config.api_url, "using live backend");
            Arc::new(RemoteSource::new(client.clone()))
        } else {
            info!("using in-process substitute data");
            Arc::new(SubstituteSource::new(session.clone(), config.session.ttl_hours))
        };

        Ok(Self {
            config: Arc::new(config),
            session,
            client,
            data: DataService::new(source),
            redirect,
            metrics,
        })
    }

    /// Runs the startup resolution pass and returns where the console should land.
    pub fn start(&self) -> Route {
        let route = initial_route(&self.session.resolve());
        self.redirect.navigate(route);
        route
    }

    /// Tab state for the signed-in principal, if any.
    pub fn navigator(&self) -> Option<TabNavigator> {
        self.session
            .current_user()
            .map(|principal| TabNavigator::for_principal(&principal))
    }
}
