//! Decode-only view of bearer tokens.
//!
//! The console never holds a verification key. It reads the payload segment of a
//! compact JWS to learn who is signed in and when the session lapses; whether the
//! token is authentic is for the issuing server to decide on every request.

use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig};
use base64::engine::DecodePaddingMode;
use base64::Engine;
use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::debug;

use crate::claims::Claims;
use crate::error::{AuthError, AuthResult};

const LENIENT: GeneralPurposeConfig =
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent);

// Issuers differ on padding and alphabet; accept both encodings of the payload.
const URL_SAFE_LENIENT: GeneralPurpose = GeneralPurpose::new(&alphabet::URL_SAFE, LENIENT);
const STANDARD_LENIENT: GeneralPurpose = GeneralPurpose::new(&alphabet::STANDARD, LENIENT);

/// Decodes the token payload, reporting why it could not be read.
pub fn try_decode(token: &str) -> AuthResult<Claims> {
    let mut segments = token.trim().split('.');
    let (Some(_header), Some(payload), Some(_signature), None) = (
        segments.next(),
        segments.next(),
        segments.next(),
        segments.next(),
    ) else {
        return Err(AuthError::MalformedToken);
    };

    if payload.is_empty() {
        return Err(AuthError::MalformedToken);
    }

    let bytes = URL_SAFE_LENIENT
        .decode(payload)
        .or_else(|_| STANDARD_LENIENT.decode(payload))
        .map_err(|err| AuthError::InvalidEncoding(err.to_string()))?;

    let value: Value =
        serde_json::from_slice(&bytes).map_err(|err| AuthError::InvalidJson(err.to_string()))?;
    Claims::try_from(value)
}

/// Decodes the token payload. Any malformation yields `None`.
pub fn decode(token: &str) -> Option<Claims> {
    match try_decode(token) {
        Ok(claims) => Some(claims),
        Err(err) => {
            debug!(error = %err, "discarding undecodable bearer token");
            None
        }
    }
}

/// Fails closed: undecodable tokens and tokens without `exp` are expired.
pub fn is_expired(token: &str, now: DateTime<Utc>) -> bool {
    decode(token).map_or(true, |claims| claims.is_expired_at(now))
}
