#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use chrono::Utc;
use common_auth::{CookieJar, CredentialStore, SessionResolver};
use common_observability::ConsoleMetrics;
use console_client::{ApiClient, ConsoleConfig, UnauthorizedHook};
use jsonwebtoken::{encode, EncodingKey, Header};
use serde_json::{json, Value};

/// Hook that only records which endpoints triggered a forced logout.
#[derive(Default)]
pub struct RecordingHook {
    endpoints: Mutex<Vec<String>>,
}

impl RecordingHook {
    pub fn endpoints(&self) -> Vec<String> {
        self.endpoints.lock().expect("hook lock").clone()
    }
}

impl UnauthorizedHook for RecordingHook {
    fn on_unauthorized(&self, endpoint: &str) {
        self.endpoints.lock().expect("hook lock").push(endpoint.to_string());
    }
}

pub struct Harness {
    pub client: Arc<ApiClient>,
    pub session: Arc<SessionResolver>,
    pub jar: Arc<CookieJar>,
    pub hook: Arc<RecordingHook>,
    pub metrics: Arc<ConsoleMetrics>,
    pub config: ConsoleConfig,
}

impl Harness {
    pub fn new(api_url: String) -> Self {
        let config = ConsoleConfig {
            use_backend: true,
            api_url,
            ..ConsoleConfig::default()
        };
        let jar = Arc::new(CookieJar::new(&config.session));
        let session = Arc::new(SessionResolver::new(jar.clone(), &config.session));
        let hook = Arc::new(RecordingHook::default());
        let metrics = Arc::new(ConsoleMetrics::new().expect("metrics"));
        let client = ApiClient::new(&config, session.clone())
            .expect("http client")
            .with_unauthorized_hook(hook.clone())
            .with_metrics(metrics.clone());

        Self {
            client: Arc::new(client),
            session,
            jar,
            hook,
            metrics,
            config,
        }
    }

    pub fn stored_token(&self) -> Option<String> {
        self.jar.read()
    }
}

pub fn sign(payload: &Value) -> String {
    encode(
        &Header::default(),
        payload,
        &EncodingKey::from_secret(b"backend-only-secret"),
    )
    .expect("sign token")
}

pub fn manager_token() -> String {
    sign(&json!({
        "user_id": "1",
        "login": "manager",
        "role": "manager",
        "exp": Utc::now().timestamp() + 3_600,
        "iat": Utc::now().timestamp()
    }))
}

pub fn courier_token(cities: &[&str]) -> String {
    sign(&json!({
        "user_id": "2",
        "login": "courier1",
        "role": "courier",
        "cities": cities,
        "exp": Utc::now().timestamp() + 3_600,
        "iat": Utc::now().timestamp()
    }))
}
