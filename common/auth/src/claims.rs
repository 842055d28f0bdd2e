use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{AuthError, AuthResult};
use crate::roles::Role;

/// Identity claims decoded from a bearer token's payload.
///
/// These are advisory: the payload is never signature-checked on this side, so
/// nothing here may stand in for a server-side authorization decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Claims {
    pub subject_id: String,
    pub login: String,
    pub role: Role,
    pub scoped_cities: Vec<String>,
    pub issued_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl Claims {
    /// A token without an expiry claim counts as expired.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        match self.expires_at {
            Some(expires_at) => expires_at <= now,
            None => true,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ClaimsRepr {
    user_id: SubjectRepr,
    login: String,
    #[serde(default)]
    role: Option<String>,
    #[serde(default, rename = "isManager")]
    is_manager: Option<bool>,
    #[serde(default)]
    cities: Option<Vec<String>>,
    #[serde(default)]
    exp: Option<i64>,
    #[serde(default)]
    iat: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SubjectRepr {
    Text(String),
    Number(i64),
}

fn timestamp(claim: &'static str, seconds: i64) -> AuthResult<DateTime<Utc>> {
    Utc.timestamp_opt(seconds, 0)
        .single()
        .ok_or_else(|| AuthError::InvalidClaim(claim, seconds.to_string()))
}

impl TryFrom<ClaimsRepr> for Claims {
    type Error = AuthError;

    fn try_from(value: ClaimsRepr) -> AuthResult<Self> {
        let subject_id = match value.user_id {
            SubjectRepr::Text(text) => text,
            SubjectRepr::Number(number) => number.to_string(),
        };
        if subject_id.trim().is_empty() {
            return Err(AuthError::InvalidClaim("user_id", subject_id));
        }

        // The legacy flag wins when present; it is folded away here and never re-derived.
        let role = match (value.is_manager, value.role) {
            (Some(flag), _) => Role::from_manager_flag(flag),
            (None, Some(raw)) => {
                Role::parse(&raw).ok_or_else(|| AuthError::InvalidClaim("role", raw.clone()))?
            }
            (None, None) => return Err(AuthError::MissingRole),
        };

        let expires_at = value.exp.map(|exp| timestamp("exp", exp)).transpose()?;
        let issued_at = value.iat.map(|iat| timestamp("iat", iat)).transpose()?;

        Ok(Self {
            subject_id,
            login: value.login,
            role,
            scoped_cities: value.cities.unwrap_or_default(),
            issued_at,
            expires_at,
        })
    }
}

impl TryFrom<serde_json::Value> for Claims {
    type Error = AuthError;

    fn try_from(value: serde_json::Value) -> AuthResult<Self> {
        let repr: ClaimsRepr =
            serde_json::from_value(value).map_err(|err| AuthError::InvalidJson(err.to_string()))?;
        Claims::try_from(repr)
    }
}
