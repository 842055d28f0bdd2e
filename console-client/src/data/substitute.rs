//! In-process stand-in for the backend.
//!
//! Behaves like the server where the console can observe it: login issues a
//! signed token that goes through the same session resolver, records get fresh
//! ids, partial updates merge, and couriers only see their own cities.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;
use chrono::{Duration, Utc};
use common_auth::{InvalidationReason, Principal, Role, SessionResolver};
use jsonwebtoken::{encode, EncodingKey, Header};
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::models::Resource;
use super::DataSource;
use crate::error::{ApiError, ApiResult};
use crate::pipeline::FileUpload;

const SIGNING_SECRET: &[u8] = b"console-substitute-signing-key";

#[derive(Debug, Clone)]
pub struct SubstituteUser {
    pub id: String,
    pub login: String,
    pub password: String,
    pub role: Role,
    pub cities: Vec<String>,
}

#[derive(Serialize)]
struct IssuedClaims<'a> {
    user_id: &'a str,
    login: &'a str,
    role: &'static str,
    cities: &'a [String],
    exp: i64,
    iat: i64,
}

pub struct SubstituteSource {
    session: Arc<SessionResolver>,
    users: Vec<SubstituteUser>,
    records: RwLock<HashMap<Resource, Vec<Value>>>,
    cities: Vec<String>,
    signing_key: EncodingKey,
    token_ttl_hours: u32,
}

impl SubstituteSource {
    /// Substitute seeded with the console's development dataset.
    pub fn new(session: Arc<SessionResolver>, token_ttl_hours: u32) -> Self {
        Self::with_data(session, token_ttl_hours, seed_users(), seed_records(), seed_cities())
    }

    pub fn with_data(
        session: Arc<SessionResolver>,
        token_ttl_hours: u32,
        users: Vec<SubstituteUser>,
        records: HashMap<Resource, Vec<Value>>,
        cities: Vec<String>,
    ) -> Self {
        Self {
            session,
            users,
            records: RwLock::new(records),
            cities,
            signing_key: EncodingKey::from_secret(SIGNING_SECRET),
            token_ttl_hours,
        }
    }

    fn issue_token(&self, user: &SubstituteUser) -> ApiResult<String> {
        let now = Utc::now();
        let expires_at = now
            .checked_add_signed(Duration::hours(i64::from(self.token_ttl_hours)))
            .ok_or_else(|| ApiError::InvalidRequest {
                detail: format!("token lifetime of {} hours is out of range", self.token_ttl_hours),
            })?;
        let claims = IssuedClaims {
            user_id: &user.id,
            login: &user.login,
            role: user.role.as_str(),
            cities: &user.cities,
            exp: expires_at.timestamp(),
            iat: now.timestamp(),
        };
        encode(&Header::default(), &claims, &self.signing_key).map_err(|err| {
            ApiError::InvalidRequest {
                detail: err.to_string(),
            }
        })
    }

    fn with_records<T>(&self, resource: Resource, f: impl FnOnce(&mut Vec<Value>) -> T) -> T {
        let mut guard = self.records.write().unwrap_or_else(PoisonError::into_inner);
        f(guard.entry(resource).or_default())
    }
}

fn record_id(record: &Value) -> Option<&str> {
    record.get("id").and_then(Value::as_str)
}

#[async_trait]
impl DataSource for SubstituteSource {
    async fn login(&self, login: &str, password: &str) -> ApiResult<Principal> {
        let seen = self.session.epoch();
        let Some(user) = self
            .users
            .iter()
            .find(|user| user.login == login && user.password == password)
        else {
            debug!(login, "substitute login rejected");
            self.session
                .invalidate_if_current(seen, InvalidationReason::LoginFailed);
            return Err(ApiError::LoginRejected { status: None });
        };

        let token = match self.issue_token(user) {
            Ok(token) => token,
            Err(err) => {
                warn!(error = ?err, "substitute could not issue a token");
                self.session
                    .invalidate_if_current(seen, InvalidationReason::LoginFailed);
                return Err(ApiError::LoginRejected { status: None });
            }
        };
        self.session.establish_if_current(seen, &token).map_err(|err| {
            warn!(error = %err, "substitute token not adopted");
            ApiError::LoginRejected { status: None }
        })
    }

    async fn logout(&self) -> ApiResult<()> {
        self.session.invalidate(InvalidationReason::Logout);
        Ok(())
    }

    async fn list(&self, resource: Resource) -> ApiResult<Vec<Value>> {
        Ok(self.with_records(resource, |records| records.clone()))
    }

    async fn create(&self, resource: Resource, draft: Value) -> ApiResult<Value> {
        let Value::Object(mut fields) = draft else {
            return Err(ApiError::Status {
                status: 400,
                message: format!("{} must be an object", resource.label()),
            });
        };
        fields.insert("id".to_string(), Value::String(Uuid::new_v4().to_string()));
        let record = Value::Object(fields);

        self.with_records(resource, |records| records.push(record.clone()));
        info!(resource = resource.label(), id = record_id(&record), "substitute record created");
        Ok(record)
    }

    async fn update(&self, resource: Resource, id: &str, patch: Value) -> ApiResult<Value> {
        let Value::Object(patch) = patch else {
            return Err(ApiError::Status {
                status: 400,
                message: format!("{} patch must be an object", resource.label()),
            });
        };

        self.with_records(resource, |records| {
            let record = records
                .iter_mut()
                .find(|record| record_id(record) == Some(id))
                .ok_or_else(|| ApiError::not_found(resource.label()))?;

            if let Value::Object(fields) = record {
                for (key, value) in patch {
                    if key != "id" {
                        fields.insert(key, value);
                    }
                }
            }
            Ok(record.clone())
        })
    }

    async fn delete(&self, resource: Resource, id: &str) -> ApiResult<()> {
        self.with_records(resource, |records| {
            let index = records
                .iter()
                .position(|record| record_id(record) == Some(id))
                .ok_or_else(|| ApiError::not_found(resource.label()))?;
            records.remove(index);
            Ok(())
        })
    }

    async fn cities(&self) -> ApiResult<Vec<String>> {
        let cities = match self.session.current_user() {
            Some(principal) if !principal.is_manager() => self
                .cities
                .iter()
                .filter(|city| principal.covers_city(city))
                .cloned()
                .collect(),
            _ => self.cities.clone(),
        };
        Ok(cities)
    }

    async fn upload_image(&self, file: FileUpload) -> ApiResult<String> {
        if file.bytes.is_empty() {
            return Err(ApiError::Status {
                status: 400,
                message: "empty file".to_string(),
            });
        }
        Ok(format!("{}-{}", Uuid::new_v4().simple(), file.file_name))
    }

    fn image_url(&self, filename: &str) -> String {
        filename.to_string()
    }
}

pub fn seed_users() -> Vec<SubstituteUser> {
    vec![
        SubstituteUser {
            id: "1".to_string(),
            login: "manager".to_string(),
            password: "manager123".to_string(),
            role: Role::Manager,
            cities: Vec::new(),
        },
        SubstituteUser {
            id: "2".to_string(),
            login: "courier1".to_string(),
            password: "courier123".to_string(),
            role: Role::Courier,
            cities: vec!["Bocholt".to_string(), "Köln".to_string()],
        },
    ]
}

pub fn seed_cities() -> Vec<String> {
    ["Bocholt", "Köln", "Düsseldorf", "Essen", "Münster"]
        .into_iter()
        .map(String::from)
        .collect()
}

pub fn seed_records() -> HashMap<Resource, Vec<Value>> {
    HashMap::from([
        (
            Resource::Categories,
            vec![
                json!({ "id": "1", "name": "Getränke", "image": null }),
                json!({ "id": "2", "name": "Snacks", "image": null }),
                json!({ "id": "3", "name": "Haushalt", "image": null }),
            ],
        ),
        (
            Resource::Subcategories,
            vec![
                json!({ "id": "1", "name": "Wasser", "categoryId": "1", "image": null }),
                json!({ "id": "2", "name": "Säfte", "categoryId": "1", "image": null }),
                json!({ "id": "3", "name": "Chips", "categoryId": "2", "image": null }),
            ],
        ),
        (
            Resource::Products,
            vec![
                json!({
                    "id": "1", "name": "Mineralwasser 1,5 l", "description": "Still",
                    "price": 0.89, "subcategoryId": "1", "image": null, "available": true
                }),
                json!({
                    "id": "2", "name": "Apfelsaft 1 l", "description": "Naturtrüb",
                    "price": 1.79, "subcategoryId": "2", "image": null, "available": true
                }),
                json!({
                    "id": "3", "name": "Paprika-Chips", "description": "",
                    "price": 1.49, "subcategoryId": "3", "image": null, "available": false
                }),
            ],
        ),
        (
            Resource::Couriers,
            vec![json!({
                "id": "2", "name": "Courier One", "login": "courier1",
                "phone": null, "cities": ["Bocholt", "Köln"]
            })],
        ),
    ])
}
