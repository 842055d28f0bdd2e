//! Authenticated request pipeline.
//!
//! Every outbound call goes through [`ApiClient::send`]: the live bearer token
//! is attached, the response is folded into an [`ApiResult`], and a 401 from
//! any endpoint tears the session down exactly here rather than at call sites.

use std::sync::Arc;

use common_auth::{InvalidationReason, Principal, SessionResolver};
use common_observability::ConsoleMetrics;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use crate::config::{ConsoleConfig, Endpoints};
use crate::error::{ApiError, ApiResult};
use crate::hooks::{LoginRedirect, UnauthorizedHook};

/// A file handed to [`ApiClient::upload_file`].
#[derive(Debug, Clone)]
pub struct FileUpload {
    pub file_name: String,
    pub bytes: Vec<u8>,
    pub mime: Option<String>,
}

impl FileUpload {
    pub fn new(file_name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes: bytes.into(),
            mime: None,
        }
    }

    pub fn with_mime(mut self, mime: impl Into<String>) -> Self {
        self.mime = Some(mime.into());
        self
    }

    fn into_form(self) -> Form {
        let FileUpload {
            file_name,
            bytes,
            mime,
        } = self;
        let part = match mime {
            None => Part::bytes(bytes).file_name(file_name),
            Some(mime) => match Part::bytes(bytes.clone())
                .file_name(file_name.clone())
                .mime_str(&mime)
            {
                Ok(typed) => typed,
                Err(err) => {
                    warn!(%mime, error = %err, "ignoring unparseable upload mime type");
                    Part::bytes(bytes).file_name(file_name)
                }
            },
        };
        Form::new().part("file", part)
    }
}

/// Outbound body. JSON and multipart never mix on one request.
#[derive(Debug)]
pub enum RequestBody {
    Empty,
    Json(Value),
    File(FileUpload),
}

#[derive(Debug, Deserialize)]
struct LoginResponse {
    token: String,
}

#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

fn failure_message(status: StatusCode, body: &[u8]) -> String {
    let parsed: ErrorBody = serde_json::from_slice(body).unwrap_or_default();
    parsed
        .message
        .filter(|message| !message.trim().is_empty())
        .or(parsed.error.filter(|error| !error.trim().is_empty()))
        .unwrap_or_else(|| format!("HTTP {}", status.as_u16()))
}

pub struct ApiClient {
    http: Client,
    api_url: String,
    endpoints: Endpoints,
    session: Arc<SessionResolver>,
    on_unauthorized: Arc<dyn UnauthorizedHook>,
    metrics: Option<Arc<ConsoleMetrics>>,
}

impl ApiClient {
    /// Builds a client whose cookie store carries ambient cookies between calls.
    pub fn new(config: &ConsoleConfig, session: Arc<SessionResolver>) -> reqwest::Result<Self> {
        let http = Client::builder().cookie_store(true).build()?;
        Ok(Self::with_client(http, config, session))
    }

    pub fn with_client(http: Client, config: &ConsoleConfig, session: Arc<SessionResolver>) -> Self {
        Self {
            http,
            api_url: config.api_url.trim_end_matches('/').to_string(),
            endpoints: config.endpoints.clone(),
            session,
            on_unauthorized: Arc::new(LoginRedirect::new()),
            metrics: None,
        }
    }

    pub fn with_unauthorized_hook(mut self, hook: Arc<dyn UnauthorizedHook>) -> Self {
        self.on_unauthorized = hook;
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<ConsoleMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn session(&self) -> &Arc<SessionResolver> {
        &self.session
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    pub fn url(&self, endpoint: &str) -> String {
        format!("{}{}", self.api_url, endpoint)
    }

    pub async fn get<T: DeserializeOwned>(&self, endpoint: &str) -> ApiResult<T> {
        self.send(Method::GET, endpoint, RequestBody::Empty).await
    }

    pub async fn post<T, B>(&self, endpoint: &str, body: &B) -> ApiResult<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let body = encode(body)?;
        self.send(Method::POST, endpoint, RequestBody::Json(body)).await
    }

    pub async fn put<T, B>(&self, endpoint: &str, body: &B) -> ApiResult<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let body = encode(body)?;
        self.send(Method::PUT, endpoint, RequestBody::Json(body)).await
    }

    pub async fn delete<T: DeserializeOwned>(&self, endpoint: &str) -> ApiResult<T> {
        self.send(Method::DELETE, endpoint, RequestBody::Empty).await
    }

    pub async fn upload_file<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        file: FileUpload,
    ) -> ApiResult<T> {
        self.send(Method::POST, endpoint, RequestBody::File(file)).await
    }

    /// Exchanges credentials for a token and adopts it as the session in one step.
    ///
    /// Any failure leaves the session anonymous and reports the same generic
    /// rejection, whatever the cause.
    pub async fn login(&self, login: &str, password: &str) -> ApiResult<Principal> {
        // Settle any lapsed token first so the epoch below is not bumped by our own request.
        self.session.resolve();
        let seen = self.session.epoch();
        let body = json!({ "login": login, "password": password });
        let endpoint = self.endpoints.login.clone();

        let outcome: ApiResult<LoginResponse> =
            self.send(Method::POST, &endpoint, RequestBody::Json(body)).await;

        let response = match outcome {
            Ok(response) => response,
            Err(err) => {
                debug!(error = ?err, "login request failed");
                self.session
                    .invalidate_if_current(seen, InvalidationReason::LoginFailed);
                return Err(self.login_rejected(err.status()));
            }
        };

        match self.session.establish_if_current(seen, &response.token) {
            Ok(principal) => {
                info!(user_id = %principal.id, role = %principal.role, "login succeeded");
                self.record_login("success");
                self.record_transition("authenticated");
                Ok(principal)
            }
            Err(err) => {
                warn!(error = %err, "login token not adopted");
                self.session
                    .invalidate_if_current(seen, InvalidationReason::LoginFailed);
                Err(self.login_rejected(None))
            }
        }
    }

    /// Best-effort server notification, then an unconditional local teardown.
    pub async fn logout(&self) -> ApiResult<()> {
        let endpoint = self.endpoints.logout.clone();
        let outcome: ApiResult<Value> = self.send(Method::POST, &endpoint, RequestBody::Empty).await;
        if let Err(err) = &outcome {
            debug!(error = ?err, "server logout failed; clearing local session anyway");
        }

        self.session.invalidate(InvalidationReason::Logout);
        self.record_transition("anonymous");
        outcome.map(|_| ())
    }

    pub async fn send<T: DeserializeOwned>(
        &self,
        method: Method,
        endpoint: &str,
        body: RequestBody,
    ) -> ApiResult<T> {
        let label = method.as_str().to_string();
        let outcome = match self.build_request(method, endpoint, body).send().await {
            Ok(response) => self.normalize(endpoint, response).await,
            Err(err) => {
                warn!(endpoint, error = %err, "no response obtained");
                Err(ApiError::Network {
                    detail: err.to_string(),
                })
            }
        };

        if let Some(metrics) = &self.metrics {
            let kind = match &outcome {
                Ok(_) => "success",
                Err(err) => err.kind(),
            };
            metrics.request(&label, kind);
        }
        outcome
    }

    pub(crate) fn build_request(
        &self,
        method: Method,
        endpoint: &str,
        body: RequestBody,
    ) -> RequestBuilder {
        let mut builder = self.http.request(method, self.url(endpoint));
        if let Some(token) = self.session.token() {
            builder = builder.bearer_auth(token);
        }

        match body {
            RequestBody::Empty => builder,
            RequestBody::Json(value) => builder.json(&value),
            RequestBody::File(file) => builder.multipart(file.into_form()),
        }
    }

    async fn normalize<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        response: Response,
    ) -> ApiResult<T> {
        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            if endpoint == self.endpoints.logout {
                debug!(endpoint, "logout rejected by server; local teardown follows");
            } else {
                self.force_logout(endpoint);
            }
            return Err(ApiError::Unauthorized);
        }

        let body = response.bytes().await.map_err(|err| {
            warn!(endpoint, error = %err, "response body could not be read");
            ApiError::Network {
                detail: err.to_string(),
            }
        })?;

        if !status.is_success() {
            let message = failure_message(status, &body);
            debug!(endpoint, status = status.as_u16(), %message, "request failed");
            return Err(ApiError::Status {
                status: status.as_u16(),
                message,
            });
        }

        let payload: &[u8] = if body.is_empty() { b"null" } else { &body };
        serde_json::from_slice(payload).map_err(|err| ApiError::InvalidPayload {
            status: Some(status.as_u16()),
            detail: err.to_string(),
        })
    }

    fn force_logout(&self, endpoint: &str) {
        warn!(endpoint, "credential rejected by server; ending session");
        self.session.invalidate(InvalidationReason::Unauthorized);
        if let Some(metrics) = &self.metrics {
            metrics.forced_logout();
        }
        self.record_transition("anonymous");
        self.on_unauthorized.on_unauthorized(endpoint);
    }

    fn login_rejected(&self, status: Option<u16>) -> ApiError {
        self.record_login("rejected");
        ApiError::LoginRejected { status }
    }

    fn record_login(&self, outcome: &str) {
        if let Some(metrics) = &self.metrics {
            metrics.login_attempt(outcome);
        }
    }

    fn record_transition(&self, state: &str) {
        if let Some(metrics) = &self.metrics {
            metrics.session_transition(state);
        }
    }
}

fn encode<B: Serialize + ?Sized>(body: &B) -> ApiResult<Value> {
    serde_json::to_value(body).map_err(|err| ApiError::InvalidRequest {
        detail: err.to_string(),
    })
}
