pub mod claims;
pub mod config;
pub mod decoder;
pub mod error;
pub mod principal;
pub mod roles;
pub mod session;
pub mod store;

pub use claims::Claims;
pub use config::{SessionConfig, MAX_TTL_HOURS};
pub use decoder::{decode, is_expired, try_decode};
pub use error::{AuthError, AuthResult};
pub use principal::Principal;
pub use roles::{Role, ROLE_COURIER, ROLE_MANAGER};
pub use session::{InvalidationReason, SessionEpoch, SessionResolver, SessionState};
pub use store::{
    CookieFile, CookieJar, CookieSameSite, CredentialStore, DetachedStore, SessionCookie,
};
