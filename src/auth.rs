use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts},
};
use chrono::Utc;
use serde_json::Value;
use std::{convert::Infallible, sync::Arc};

use crate::{
    error::AuthError,
    models::{Authorization, AuthorizedAction, ResourceKey, ResourceRef, TokenPayload},
    token::TokenSigner,
};

/// Validity window used when a caller has no preference.
pub const DEFAULT_VALID_SECONDS: i64 = 60;

/// Resource type audited (with `AuthorizedAction::Other`) before a session is re-issued.
pub const SESSION_REFRESH: &str = "auth/session:refresh";

/// Shared handle to the service, as stored in the application state.
pub type AuthState = Arc<AuthService>;

/// AuthService
///
/// Token codec and permission evaluator. Holds nothing but the signer, so
/// every operation is a pure function of its inputs, the key and the clock.
pub struct AuthService {
    signer: Arc<dyn TokenSigner>,
}

impl AuthService {
    pub fn new(signer: impl TokenSigner + 'static) -> Self {
        Self {
            signer: Arc::new(signer),
        }
    }

    /// Signs `authorization` into a token valid for `valid_seconds` from now.
    pub fn sign(&self, authorization: &Authorization, valid_seconds: i64) -> Result<String, AuthError> {
        self.sign_at(authorization, valid_seconds, now_millis())
    }

    pub fn sign_at(
        &self,
        authorization: &Authorization,
        valid_seconds: i64,
        now_ms: i64,
    ) -> Result<String, AuthError> {
        let payload = TokenPayload {
            authorization: authorization.clone(),
            valid_until: now_ms.saturating_add(valid_seconds.saturating_mul(1000)),
        };
        self.signer.sign(&payload).map_err(AuthError::Signing)
    }

    /// Verifies a token and returns the authorization it carries.
    ///
    /// Accepts the bare token or one prefixed with exactly `"Bearer "` or
    /// `"bearer "`. Any failure after the emptiness check (bad signature,
    /// unreadable payload, expiry) is reported as `InvalidToken`.
    pub fn verify(&self, token: Option<&str>) -> Result<Authorization, AuthError> {
        self.verify_at(token, now_millis())
    }

    pub fn verify_at(&self, token: Option<&str>, now_ms: i64) -> Result<Authorization, AuthError> {
        let token = match token {
            Some(token) if !token.is_empty() => strip_bearer(token),
            _ => return Err(AuthError::AuthenticationRequired),
        };

        self.decode(token, now_ms).map_err(|_| AuthError::InvalidToken)
    }

    /// Decodes a bare token, keeping the specific failure: `InvalidToken` for
    /// a bad signature, `TokenFormat` for an unexpected payload, `TokenExpired`
    /// once `now_ms` is past `validUntil`.
    pub fn decode(&self, token: &str, now_ms: i64) -> Result<Authorization, AuthError> {
        let claims = self
            .signer
            .verify(token)
            .map_err(|_| AuthError::InvalidToken)?;

        let payload: TokenPayload =
            serde_json::from_value(claims).map_err(|_| AuthError::TokenFormat {
                token: token.to_string(),
            })?;

        if now_ms > payload.valid_until {
            return Err(AuthError::TokenExpired);
        }

        Ok(payload.authorization)
    }

    /// Checks that the token permits `action` on the described resource.
    pub fn audit(
        &self,
        token: Option<&str>,
        action: AuthorizedAction,
        resource_owner_id: Option<i64>,
        resource_type: Option<&str>,
        resource_id: Option<i64>,
    ) -> Result<(), AuthError> {
        let authorization = self.verify(token)?;
        authorization.audit(
            action,
            &ResourceRef::new(resource_owner_id, resource_type, resource_id),
        )
    }

    /// Same as `audit`, for owner and id values that arrive untyped (request
    /// bodies, dynamic callers). `null` means "absent" and any JSON number is
    /// accepted; a number that is not an integer can only pass a wildcard.
    /// Strings, booleans, arrays and objects are a `Usage` fault.
    pub fn audit_value(
        &self,
        token: Option<&str>,
        action: AuthorizedAction,
        resource_owner_id: &Value,
        resource_type: Option<&str>,
        resource_id: &Value,
    ) -> Result<(), AuthError> {
        let authorization = self.verify(token)?;
        let resource = ResourceRef {
            owner_id: numeric_or_null(resource_owner_id, "resourceOwnerId")?,
            resource_type: resource_type.map(str::to_owned),
            resource_id: numeric_or_null(resource_id, "resourceId")?,
        };
        authorization.audit(action, &resource)
    }
}

fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Only these two exact prefixes are stripped.
fn strip_bearer(token: &str) -> &str {
    token
        .strip_prefix("Bearer ")
        .or_else(|| token.strip_prefix("bearer "))
        .unwrap_or(token)
}

fn numeric_or_null(value: &Value, field: &str) -> Result<Option<ResourceKey>, AuthError> {
    match value {
        Value::Null => Ok(None),
        Value::Number(number) => Ok(Some(ResourceKey::from_number(number))),
        _ => Err(AuthError::Usage(format!("{field} must be a number."))),
    }
}

/// BearerToken
///
/// The raw `Authorization` header, if any. Never rejects; deciding what a
/// missing or malformed token means is left to `AuthService`.
#[derive(Debug, Clone)]
pub struct BearerToken(pub Option<String>);

impl<S> FromRequestParts<S> for BearerToken
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(BearerToken(authorization_header(parts)))
    }
}

/// Session
///
/// The verified authorization of the current request: the identity it acts
/// as and everything that identity may do.
///
/// Rejection: the `AuthError` from `AuthService::verify` (401).
#[derive(Debug, Clone)]
pub struct Session(pub Authorization);

impl<S> FromRequestParts<S> for Session
where
    S: Send + Sync,
    AuthState: FromRef<S>,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let auth = AuthState::from_ref(state);
        let token = authorization_header(parts);
        auth.verify(token.as_deref()).map(Session)
    }
}

fn authorization_header(parts: &Parts) -> Option<String> {
    parts
        .headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .map(str::to_owned)
}
