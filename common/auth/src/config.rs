/// Longest cookie lifetime accepted from configuration.
pub const MAX_TTL_HOURS: u32 = 24 * 365;

/// Runtime configuration for the persisted session slot.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Name of the cookie holding the bearer token.
    pub cookie_name: String,
    /// Lifetime of the persisted cookie, in hours.
    pub ttl_hours: u32,
    /// Whether the cookie is marked `Secure`.
    pub secure: bool,
}

impl SessionConfig {
    /// Construct config with the console defaults (24 hour lifetime, secure cookie).
    pub fn new(cookie_name: impl Into<String>) -> Self {
        Self {
            cookie_name: cookie_name.into(),
            ttl_hours: 24,
            secure: true,
        }
    }

    /// Adjust the cookie lifetime.
    pub fn with_ttl_hours(mut self, hours: u32) -> Self {
        self.ttl_hours = hours;
        self
    }

    pub fn with_secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self::new("auth_token")
    }
}
