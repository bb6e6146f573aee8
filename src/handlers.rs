use axum::{Json, extract::State, http::StatusCode};

use crate::{
    AppConfig,
    auth::{AuthState, BearerToken, SESSION_REFRESH, Session},
    error::AuthError,
    models::{AuditRequest, Authorization, AuthorizedAction, ErrorResponse, RefreshResponse},
};

/// get_session
///
/// [Authenticated Route] Returns the authorization carried by the bearer token,
/// i.e. whose identity this request acts as and what it may do.
#[utoipa::path(
    get,
    path = "/auth/session",
    responses(
        (status = 200, description = "Decoded authorization", body = Authorization),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse)
    )
)]
pub async fn get_session(Session(authorization): Session) -> Json<Authorization> {
    Json(authorization)
}

/// audit
///
/// [Authenticated Route] Asks whether the bearer token permits an action on a
/// resource. Answers 204 when it does.
#[utoipa::path(
    post,
    path = "/auth/audit",
    request_body = AuditRequest,
    responses(
        (status = 204, description = "Permitted"),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse),
        (status = 403, description = "Not permitted", body = ErrorResponse),
        (status = 500, description = "Non-numeric owner or id", body = ErrorResponse)
    )
)]
pub async fn audit(
    State(auth): State<AuthState>,
    BearerToken(token): BearerToken,
    Json(request): Json<AuditRequest>,
) -> Result<StatusCode, AuthError> {
    auth.audit_value(
        token.as_deref(),
        request.action,
        &request.resource_owner_id,
        request.resource_type.as_deref(),
        &request.resource_id,
    )?;
    Ok(StatusCode::NO_CONTENT)
}

/// refresh_session
///
/// [Authenticated Route] Re-issues the presented authorization with a fresh
/// validity window. The token must grant `other` on its own
/// `auth/session:refresh` resource.
#[utoipa::path(
    post,
    path = "/auth/session/refresh",
    responses(
        (status = 200, description = "New token", body = RefreshResponse),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse),
        (status = 403, description = "Refresh not permitted", body = ErrorResponse)
    )
)]
pub async fn refresh_session(
    State(auth): State<AuthState>,
    State(config): State<AppConfig>,
    BearerToken(token): BearerToken,
) -> Result<Json<RefreshResponse>, AuthError> {
    let authorization = auth.verify(token.as_deref())?;
    auth.audit(
        token.as_deref(),
        AuthorizedAction::Other,
        Some(authorization.user_id),
        Some(SESSION_REFRESH),
        None,
    )?;

    let access_token = auth.sign(&authorization, config.token_valid_seconds)?;
    tracing::info!(user_id = authorization.user_id, "session refreshed");

    Ok(Json(RefreshResponse { access_token }))
}
