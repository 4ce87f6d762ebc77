//! Identity Context for HTTP requests.
//!
//! Token signatures are verified in front of this service. Here we only read
//! the subject the gateway established: first from the trusted identity
//! header, then from the `sub` claim of an unexpired bearer JWT.
//!
//! Object-store notifications carry no user identity; they authenticate with
//! a shared events token instead (see [`EventSource`]).

use crate::{errors::AppError, state::AppState};
use axum::{
    extract::FromRequestParts,
    http::{HeaderMap, header, request::Parts},
};
use jsonwebtoken::{DecodingKey, Validation, decode};
use serde::Deserialize;
use tracing::{debug, warn};

/// Header carrying the shared secret on `POST /events/object-created`.
pub const EVENTS_TOKEN_HEADER: &str = "x-events-token";

/// The owner subject of the current request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallerIdentity(pub String);

impl CallerIdentity {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Deserialize)]
struct Claims {
    sub: String,
}

/// Reads claims from bearer tokens whose signature was checked upstream.
///
/// Expiry is still enforced, and `exp` is required.
#[derive(Clone)]
pub struct BearerDecoder {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl BearerDecoder {
    pub fn new() -> Self {
        let mut validation = Validation::default();
        validation.insecure_disable_signature_validation();
        validation.validate_exp = true;
        // Audience is checked by the gateway that verified the signature.
        validation.validate_aud = false;

        Self {
            decoding_key: DecodingKey::from_secret(&[]),
            validation,
        }
    }

    /// The non-empty `sub` claim of `token`, if the token decodes and is unexpired.
    pub fn subject(&self, token: &str) -> Option<String> {
        match decode::<Claims>(token, &self.decoding_key, &self.validation) {
            Ok(data) => Some(data.claims.sub).filter(|sub| !sub.trim().is_empty()),
            Err(err) => {
                debug!(error = %err, "bearer token rejected");
                None
            }
        }
    }
}

impl Default for BearerDecoder {
    fn default() -> Self {
        Self::new()
    }
}

/// The credential of an `Authorization: Bearer <token>` header. The scheme
/// is matched case-insensitively.
fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.trim().split_once(' ')?;
    scheme
        .eq_ignore_ascii_case("bearer")
        .then(|| token.trim())
        .filter(|token| !token.is_empty())
}

/// Resolve the caller's subject from request headers.
pub fn resolve_subject(
    headers: &HeaderMap,
    identity_header: &str,
    bearer: &BearerDecoder,
) -> Option<String> {
    let trusted = headers
        .get(identity_header)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty());
    if let Some(subject) = trusted {
        return Some(subject.to_string());
    }

    bearer_token(headers).and_then(|token| bearer.subject(token))
}

impl FromRequestParts<AppState> for CallerIdentity {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        resolve_subject(&parts.headers, &state.identity_header, &state.bearer)
            .map(CallerIdentity)
            .ok_or_else(|| AppError::unauthorized("unable to resolve caller identity"))
    }
}

/// A request proven to come from the object store's notification path.
///
/// Without a configured events token every notification is refused.
#[derive(Debug, Clone, Copy)]
pub struct EventSource;

impl FromRequestParts<AppState> for EventSource {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let Some(expected) = state.events_token.as_deref() else {
            warn!("object-created event refused: no events token configured");
            return Err(AppError::unauthorized("event intake is not enabled"));
        };

        let presented = parts
            .headers
            .get(EVENTS_TOKEN_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim);
        match presented {
            Some(token) if token == expected => Ok(EventSource),
            _ => {
                warn!("object-created event refused: bad events token");
                Err(AppError::unauthorized("invalid events token"))
            }
        }
    }
}
