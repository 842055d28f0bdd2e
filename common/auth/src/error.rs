use thiserror::Error;

pub type AuthResult<T> = Result<T, AuthError>;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("token is not a compact JWS (expected three segments)")]
    MalformedToken,
    #[error("failed to decode token payload: {0}")]
    InvalidEncoding(String),
    #[error("malformed claim payload: {0}")]
    InvalidJson(String),
    #[error("invalid claim '{0}' with value '{1}'")]
    InvalidClaim(&'static str, String),
    #[error("token carries neither a 'role' nor an 'isManager' claim")]
    MissingRole,
    #[error("token expired")]
    Expired,
    #[error("session changed while the token was in flight")]
    Superseded,
    #[error("credential store I/O failed for '{path}': {message}")]
    StoreIo { path: String, message: String },
    #[error("credential store entry could not be encoded: {0}")]
    StoreFormat(String),
    #[error("cookie lifetime of {0} hours is out of range")]
    InvalidLifetime(u32),
}
