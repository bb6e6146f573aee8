use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Authenticated Router Module
///
/// Every route here sits behind the `Session` middleware, so a request only
/// reaches a handler with a verified, unexpired token. Handlers still audit the
/// specific action themselves.
pub fn authenticated_routes() -> Router<AppState> {
    Router::<AppState>::new()
        // GET /auth/session
        // The authorization the presented token carries.
        .route("/auth/session", get(handlers::get_session))
        // POST /auth/audit
        // Permission check of one (action, owner, type, id) tuple.
        .route("/auth/audit", post(handlers::audit))
        // POST /auth/session/refresh
        // Re-signs the current authorization with a fresh validity window.
        .route("/auth/session/refresh", post(handlers::refresh_session))
}
