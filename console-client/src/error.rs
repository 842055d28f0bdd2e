use thiserror::Error;

pub type ApiResult<T> = Result<T, ApiError>;

/// Uniform failure outcome of every pipeline and data-service call.
///
/// `Display` is the human-readable message for the UI; `status` is the HTTP
/// status when a response was obtained.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    /// No response reached the client.
    #[error("Network error")]
    Network { detail: String },
    /// The server rejected the credential; the session has been torn down.
    #[error("Not authorized")]
    Unauthorized,
    /// Non-success status with the server's message.
    #[error("{message}")]
    Status { status: u16, message: String },
    /// Success status, but the payload did not have the expected shape.
    #[error("Unexpected response from server")]
    InvalidPayload { status: Option<u16>, detail: String },
    /// The request body could not be encoded.
    #[error("Request could not be encoded")]
    InvalidRequest { detail: String },
    /// Login failed. Deliberately does not say why.
    #[error("Invalid login or password")]
    LoginRejected { status: Option<u16> },
}

impl ApiError {
    pub fn message(&self) -> String {
        self.to_string()
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Network { .. } | ApiError::InvalidRequest { .. } => None,
            ApiError::Unauthorized => Some(401),
            ApiError::Status { status, .. } => Some(*status),
            ApiError::InvalidPayload { status, .. } | ApiError::LoginRejected { status } => *status,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ApiError::Unauthorized)
    }

    pub fn not_found(what: &str) -> Self {
        ApiError::Status {
            status: 404,
            message: format!("{what} not found"),
        }
    }

    /// Metrics label.
    pub fn kind(&self) -> &'static str {
        match self {
            ApiError::Network { .. } => "network",
            ApiError::Unauthorized => "unauthorized",
            ApiError::Status { .. } => "status",
            ApiError::InvalidPayload { .. } => "invalid_payload",
            ApiError::InvalidRequest { .. } => "invalid_request",
            ApiError::LoginRejected { .. } => "login_rejected",
        }
    }
}
