use std::env;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use common_auth::{CookieFile, CookieJar, CredentialStore, SessionConfig, MAX_TTL_HOURS};
use tracing::debug;

/// Backend paths, relative to the API origin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub login: String,
    pub logout: String,
    pub categories: String,
    pub subcategories: String,
    pub products: String,
    pub couriers: String,
    pub images_upload: String,
    pub images_get: String,
    pub cities: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            login: "/auth/login".to_string(),
            logout: "/auth/logout".to_string(),
            categories: "/categories".to_string(),
            subcategories: "/subcategories".to_string(),
            products: "/products".to_string(),
            couriers: "/couriers".to_string(),
            images_upload: "/images/upload".to_string(),
            images_get: "/images".to_string(),
            cities: "/references/cities".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ConsoleConfig {
    /// `false` routes every data call to the in-process substitute.
    pub use_backend: bool,
    pub api_url: String,
    pub endpoints: Endpoints,
    pub session: SessionConfig,
    /// Persist the session cookie here instead of keeping it in memory.
    pub cookie_file: Option<PathBuf>,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            use_backend: false,
            api_url: "http://localhost:3001/api".to_string(),
            endpoints: Endpoints::default(),
            session: SessionConfig::default(),
            cookie_file: None,
        }
    }
}

impl ConsoleConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = ConsoleConfig::default();
        let read = |key: &str| lookup(key).and_then(|value| normalize_optional(&value));

        let use_backend = read("CONSOLE_USE_BACKEND")
            .map(|value| parse_bool(&value))
            .unwrap_or(defaults.use_backend);

        let api_url = read("CONSOLE_API_URL").unwrap_or(defaults.api_url);
        if !(api_url.starts_with("http://") || api_url.starts_with("https://")) {
            return Err(anyhow!(
                "CONSOLE_API_URL must be an http(s) origin, got '{api_url}'"
            ));
        }

        let base = defaults.endpoints;
        let endpoints = Endpoints {
            login: read("CONSOLE_ENDPOINT_LOGIN").unwrap_or(base.login),
            logout: read("CONSOLE_ENDPOINT_LOGOUT").unwrap_or(base.logout),
            categories: read("CONSOLE_ENDPOINT_CATEGORIES").unwrap_or(base.categories),
            subcategories: read("CONSOLE_ENDPOINT_SUBCATEGORIES").unwrap_or(base.subcategories),
            products: read("CONSOLE_ENDPOINT_PRODUCTS").unwrap_or(base.products),
            couriers: read("CONSOLE_ENDPOINT_COURIERS").unwrap_or(base.couriers),
            images_upload: read("CONSOLE_ENDPOINT_IMAGES_UPLOAD").unwrap_or(base.images_upload),
            images_get: read("CONSOLE_ENDPOINT_IMAGES_GET").unwrap_or(base.images_get),
            cities: read("CONSOLE_ENDPOINT_CITIES").unwrap_or(base.cities),
        };

        let cookie_name =
            read("CONSOLE_TOKEN_COOKIE_NAME").unwrap_or(defaults.session.cookie_name);
        let ttl_hours = read("CONSOLE_TOKEN_TTL_HOURS")
            .map(|value| {
                value
                    .parse::<u32>()
                    .with_context(|| format!("Failed to parse CONSOLE_TOKEN_TTL_HOURS '{value}'"))
            })
            .transpose()?
            .unwrap_or(defaults.session.ttl_hours);
        if !(1..=MAX_TTL_HOURS).contains(&ttl_hours) {
            return Err(anyhow!(
                "CONSOLE_TOKEN_TTL_HOURS must be between 1 and {MAX_TTL_HOURS}, got {ttl_hours}"
            ));
        }
        let secure = read("CONSOLE_COOKIE_SECURE")
            .map(|value| parse_bool(&value))
            .unwrap_or(defaults.session.secure);

        Ok(Self {
            use_backend,
            api_url: api_url.trim_end_matches('/').to_string(),
            endpoints,
            session: SessionConfig::new(cookie_name)
                .with_ttl_hours(ttl_hours)
                .with_secure(secure),
            cookie_file: read("CONSOLE_COOKIE_FILE").map(PathBuf::from),
        })
    }

    pub fn url(&self, endpoint: &str) -> String {
        format!("{}{}", self.api_url.trim_end_matches('/'), endpoint)
    }

    /// The persistence medium for the session cookie.
    pub fn credential_store(&self) -> Arc<dyn CredentialStore> {
        match &self.cookie_file {
            Some(path) => {
                let file = CookieFile::new(path, &self.session);
                debug!(path = %file.path().display(), "session cookie persisted to file");
                Arc::new(file)
            }
            None => Arc::new(CookieJar::new(&self.session)),
        }
    }
}

fn parse_bool(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

fn normalize_optional(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
