use axum::{
    Router,
    extract::{FromRef, Request},
    http::HeaderName,
    middleware::{self, Next},
    response::Response,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

// Authorization core: token codec, permission evaluator and request extractors.
pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod models;
pub mod token;

pub mod routes;
use auth::Session;
use routes::{authenticated, public};

// --- Public Re-exports ---

pub use auth::{AuthService, AuthState};
pub use config::AppConfig;
pub use error::AuthError;
pub use token::{JwtSigner, TokenSigner};

/// ApiDoc
///
/// OpenAPI document for the authorization endpoints, served at
/// `/api-docs/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    paths(handlers::get_session, handlers::audit, handlers::refresh_session),
    components(
        schemas(
            models::Authorization, models::Permission, models::AuthorizedResource,
            models::AuditRequest, models::RefreshResponse, models::ErrorResponse,
        )
    ),
    tags(
        (name = "qa-auth", description = "Q&A platform authorization API")
    )
)]
struct ApiDoc;

/// AppState
///
/// Shared, immutable state handed to every request.
#[derive(Clone)]
pub struct AppState {
    /// Token codec and permission evaluator.
    pub auth: AuthState,
    /// The loaded configuration.
    pub config: AppConfig,
}

impl AppState {
    /// Builds the state from configuration, using the HMAC JWT signer.
    pub fn from_config(config: AppConfig) -> Self {
        let signer = JwtSigner::from_config(&config);
        Self {
            auth: AuthState::new(AuthService::new(signer)),
            config,
        }
    }
}

// --- Axum FromRef Extractor Implementations ---

// These let handlers and extractors pull only the component they need
// (`State<AuthState>`, `State<AppConfig>`) out of the shared AppState.

impl FromRef<AppState> for AuthState {
    fn from_ref(app_state: &AppState) -> AuthState {
        app_state.auth.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// auth_middleware
///
/// Guards `authenticated_routes`. Extracting `Session` verifies the bearer
/// token; on failure the extractor answers with the `AuthError` and the
/// handler never runs.
async fn auth_middleware(_session: Session, request: Request, next: Next) -> Response {
    next.run(request).await
}

/// create_router
///
/// Assembles the routes, the authentication layer and the observability layers.
pub fn create_router(state: AppState) -> Router {
    // 1. CORS Configuration
    // Open to all origins, methods and headers.
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    // Header name constant for Request Correlation.
    let x_request_id = HeaderName::from_static("x-request-id");

    // 2. Base Router Assembly
    let base_router = Router::new()
        // Documentation: Serve the auto-generated Swagger UI.
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        // Public Routes: No middleware applied.
        .merge(public::public_routes())
        // Authenticated Routes: Protected by the `auth_middleware`.
        // A request only reaches these handlers with a verified, unexpired token;
        // the handlers then audit the concrete action themselves.
        .merge(
            authenticated::authenticated_routes().route_layer(middleware::from_fn_with_state(
                state.clone(),
                auth_middleware,
            )),
        )
        // Apply the Unified State to all routes.
        .with_state(state);

    // 3. Observability and Correlation Layers (Applied outermost/first)
    base_router
        .layer(
            ServiceBuilder::new()
                // 3a. Request ID Generation: A UUID for every incoming request.
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                // 3b. Request Tracing: Wraps the request/response lifecycle in a span
                // carrying the request ID (see `trace_span_logger`).
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                // 3c. Request ID Propagation: Echoes x-request-id back to the client.
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        // 4. CORS Layer (Applied last)
        .layer(cors)
}

/// trace_span_logger
///
/// Span for one HTTP request, tagged with its `x-request-id` so every log line
/// of the request can be correlated.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    // The structured log format used by the tracing macros.
    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
