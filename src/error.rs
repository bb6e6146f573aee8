use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::models::{AuthorizedAction, ErrorResponse, ResourceRef};

/// AuthError
///
/// Every failure the authorization core can raise. Each kind carries the HTTP
/// status the boundary should answer with.
///
/// `TokenFormat` and `TokenExpired` are only produced by `AuthService::decode`;
/// `AuthService::verify` reports both as `InvalidToken`.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Authentication required")]
    AuthenticationRequired,

    #[error("Invalid token")]
    InvalidToken,

    #[error("The token is valid, but AuthService could not understand its payload. Token: {token}")]
    TokenFormat { token: String },

    #[error("Token expired")]
    TokenExpired,

    #[error(
        "The attempt to perform action '{action}' on resource ({resource}) is not permitted by the given token."
    )]
    PermissionDenied {
        action: AuthorizedAction,
        resource: ResourceRef,
    },

    /// The caller handed the evaluator something it cannot audit, e.g. a
    /// non-numeric owner id. A programming fault, not a security decision.
    #[error("{0}")]
    Usage(String),

    #[error("Failed to sign token: {0}")]
    Signing(#[source] jsonwebtoken::errors::Error),
}

impl AuthError {
    pub fn status(&self) -> StatusCode {
        match self {
            AuthError::AuthenticationRequired
            | AuthError::InvalidToken
            | AuthError::TokenFormat { .. }
            | AuthError::TokenExpired => StatusCode::UNAUTHORIZED,
            AuthError::PermissionDenied { .. } => StatusCode::FORBIDDEN,
            AuthError::Usage(_) | AuthError::Signing(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            AuthError::AuthenticationRequired => "AuthenticationRequiredError",
            AuthError::InvalidToken => "InvalidTokenError",
            AuthError::TokenFormat { .. } => "TokenFormatError",
            AuthError::TokenExpired => "TokenExpiredError",
            AuthError::PermissionDenied { .. } => "PermissionDeniedError",
            AuthError::Usage(_) => "InternalError",
            AuthError::Signing(_) => "InternalError",
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status();

        if status.is_server_error() {
            tracing::error!(error = %self, kind = self.name(), "authorization core failed");
        } else {
            tracing::warn!(error = %self, kind = self.name(), "request rejected");
        }

        // Internal faults keep their details in the log only.
        let message = if status.is_server_error() {
            "Internal server error".to_string()
        } else {
            self.to_string()
        };

        let body = ErrorResponse {
            code: status.as_u16(),
            name: self.name().to_string(),
            message,
        };

        (status, Json(body)).into_response()
    }
}
