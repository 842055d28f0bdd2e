use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::SessionConfig;
use crate::error::{AuthError, AuthResult};

const COOKIE_PATH: &str = "/";
const EPOCH_EXPIRES: &str = "Thu, 01 Jan 1970 00:00:00 GMT";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CookieSameSite {
    Lax,
    Strict,
    None,
}

impl CookieSameSite {
    pub fn as_str(&self) -> &'static str {
        match self {
            CookieSameSite::Lax => "Lax",
            CookieSameSite::Strict => "Strict",
            CookieSameSite::None => "None",
        }
    }
}

/// The persisted session slot: one cookie, scoped to the whole application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionCookie {
    pub name: String,
    pub value: String,
    pub expires_at: DateTime<Utc>,
    pub path: String,
    pub secure: bool,
    pub same_site: CookieSameSite,
}

impl SessionCookie {
    pub fn issue(
        config: &SessionConfig,
        value: impl Into<String>,
        ttl_hours: u32,
        now: DateTime<Utc>,
    ) -> AuthResult<Self> {
        let expires_at = now
            .checked_add_signed(Duration::hours(i64::from(ttl_hours)))
            .ok_or(AuthError::InvalidLifetime(ttl_hours))?;
        Ok(Self {
            name: config.cookie_name.clone(),
            value: value.into(),
            expires_at,
            path: COOKIE_PATH.to_string(),
            secure: config.secure,
            same_site: CookieSameSite::Strict,
        })
    }

    pub fn is_live_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at > now
    }

    /// Renders the cookie as a `Set-Cookie` header value.
    pub fn set_cookie_header(&self) -> String {
        let mut header = format!(
            "{}={}; Path={}; Expires={}",
            self.name,
            self.value,
            self.path,
            self.expires_at.format("%a, %d %b %Y %H:%M:%S GMT")
        );
        if self.secure {
            header.push_str("; Secure");
        }
        header.push_str("; SameSite=");
        header.push_str(self.same_site.as_str());
        header
    }

    /// The `Set-Cookie` value that removes a cookie of the given name.
    pub fn clearing_header(name: &str) -> String {
        format!("{name}=; Path={COOKIE_PATH}; Expires={EPOCH_EXPIRES}")
    }
}

/// Persistence medium for the session token.
///
/// `read` never fails: an empty slot, an expired cookie, an unreadable medium or
/// a context without any medium all read as `None`. `clear` is idempotent.
pub trait CredentialStore: Send + Sync {
    fn save(&self, token: &str, ttl_hours: u32) -> AuthResult<()>;
    fn read(&self) -> Option<String>;
    fn clear(&self);
}

/// In-process cookie slot.
#[derive(Debug)]
pub struct CookieJar {
    config: SessionConfig,
    slot: RwLock<Option<SessionCookie>>,
}

impl CookieJar {
    pub fn new(config: &SessionConfig) -> Self {
        Self {
            config: config.clone(),
            slot: RwLock::new(None),
        }
    }

    /// The raw cookie, including an expired one that `read` would hide.
    pub fn cookie(&self) -> Option<SessionCookie> {
        self.slot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl CredentialStore for CookieJar {
    fn save(&self, token: &str, ttl_hours: u32) -> AuthResult<()> {
        let cookie = SessionCookie::issue(&self.config, token, ttl_hours, Utc::now())?;
        let mut guard = self.slot.write().unwrap_or_else(PoisonError::into_inner);
        *guard = Some(cookie);
        Ok(())
    }

    fn read(&self) -> Option<String> {
        let guard = self.slot.read().unwrap_or_else(PoisonError::into_inner);
        guard
            .as_ref()
            .filter(|cookie| cookie.is_live_at(Utc::now()))
            .map(|cookie| cookie.value.clone())
    }

    fn clear(&self) {
        let mut guard = self.slot.write().unwrap_or_else(PoisonError::into_inner);
        *guard = None;
    }
}

/// Cookie persisted on disk so a later process can pick the session back up.
#[derive(Debug, Clone)]
pub struct CookieFile {
    config: SessionConfig,
    path: PathBuf,
}

impl CookieFile {
    pub fn new(path: impl Into<PathBuf>, config: &SessionConfig) -> Self {
        Self {
            config: config.clone(),
            path: path.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, err: std::io::Error) -> AuthError {
        AuthError::StoreIo {
            path: self.path.display().to_string(),
            message: err.to_string(),
        }
    }

    fn load(&self) -> Option<SessionCookie> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == ErrorKind::NotFound => return None,
            Err(err) => {
                warn!(path = %self.path.display(), error = %err, "cookie file unreadable");
                return None;
            }
        };

        match serde_json::from_str::<SessionCookie>(&raw) {
            Ok(cookie) if cookie.name == self.config.cookie_name => Some(cookie),
            Ok(cookie) => {
                debug!(expected = %self.config.cookie_name, found = %cookie.name, "cookie file holds another cookie");
                None
            }
            Err(err) => {
                warn!(path = %self.path.display(), error = %err, "cookie file corrupt");
                None
            }
        }
    }
}

impl CredentialStore for CookieFile {
    fn save(&self, token: &str, ttl_hours: u32) -> AuthResult<()> {
        let cookie = SessionCookie::issue(&self.config, token, ttl_hours, Utc::now())?;
        let encoded = serde_json::to_string_pretty(&cookie)
            .map_err(|err| AuthError::StoreFormat(err.to_string()))?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|err| self.io_error(err))?;
            }
        }

        let staging = self.path.with_extension("tmp");
        fs::write(&staging, encoded).map_err(|err| self.io_error(err))?;
        fs::rename(&staging, &self.path).map_err(|err| self.io_error(err))?;
        Ok(())
    }

    fn read(&self) -> Option<String> {
        self.load()
            .filter(|cookie| cookie.is_live_at(Utc::now()))
            .map(|cookie| cookie.value)
    }

    fn clear(&self) {
        match fs::remove_file(&self.path) {
            Ok(()) => {}
            Err(err) if err.kind() == ErrorKind::NotFound => {}
            Err(err) => warn!(path = %self.path.display(), error = %err, "failed to remove cookie file"),
        }
    }
}

/// A context with no persistence medium at all.
#[derive(Debug, Clone, Copy, Default)]
pub struct DetachedStore;

impl CredentialStore for DetachedStore {
    fn save(&self, _token: &str, _ttl_hours: u32) -> AuthResult<()> {
        debug!("no persistence medium; session token not stored");
        Ok(())
    }

    fn read(&self) -> Option<String> {
        None
    }

    fn clear(&self) {}
}
