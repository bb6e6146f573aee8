use axum::{
    extract::FromRequestParts,
    http::{Method, Request, StatusCode, Uri, header, request::Parts},
    response::IntoResponse,
};
use qa_auth::{
    AppState, AuthError,
    auth::{BearerToken, Session},
    config::AppConfig,
    models::{Authorization, AuthorizedAction, AuthorizedResource, ResourceRef},
};

// --- Helper Functions ---

const TEST_JWT_SECRET: &str = "test-secret-value-1234567890";

fn create_app_state() -> AppState {
    let mut config = AppConfig::default();
    config.jwt_secret = TEST_JWT_SECRET.to_string();
    AppState::from_config(config)
}

fn get_request_parts(method: Method, uri: Uri) -> Parts {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .body(axum::body::Body::empty())
        .unwrap();
    let (parts, _) = request.into_parts();
    parts
}

fn with_authorization(mut parts: Parts, value: &str) -> Parts {
    parts.headers.insert(
        header::AUTHORIZATION,
        header::HeaderValue::from_str(value).unwrap(),
    );
    parts
}

fn sample_authorization() -> Authorization {
    Authorization::new(42).grant([AuthorizedAction::Query], AuthorizedResource::owned_by(42))
}

// --- Tests ---

#[tokio::test]
async fn test_session_with_valid_token() {
    let app_state = create_app_state();
    let token = app_state.auth.sign(&sample_authorization(), 60).unwrap();

    let mut parts = with_authorization(
        get_request_parts(Method::GET, "/".parse().unwrap()),
        &format!("Bearer {}", token),
    );

    let session = Session::from_request_parts(&mut parts, &app_state).await;

    assert!(session.is_ok());
    let Session(authorization) = session.unwrap();
    assert_eq!(authorization, sample_authorization());
}

#[tokio::test]
async fn test_session_failure_with_missing_header() {
    let app_state = create_app_state();
    let mut parts = get_request_parts(Method::GET, "/".parse().unwrap());

    let session = Session::from_request_parts(&mut parts, &app_state).await;

    let error = session.unwrap_err();
    assert!(matches!(error, AuthError::AuthenticationRequired));
    assert_eq!(error.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_session_failure_with_expired_token() {
    let app_state = create_app_state();
    let token = app_state.auth.sign(&sample_authorization(), -5).unwrap();

    let mut parts = with_authorization(
        get_request_parts(Method::GET, "/".parse().unwrap()),
        &format!("bearer {}", token),
    );

    let session = Session::from_request_parts(&mut parts, &app_state).await;

    assert!(matches!(session.unwrap_err(), AuthError::InvalidToken));
}

#[tokio::test]
async fn test_bearer_token_passes_header_through() {
    let app_state = create_app_state();

    let mut parts = with_authorization(
        get_request_parts(Method::POST, "/auth/audit".parse().unwrap()),
        "Bearer abc",
    );
    let BearerToken(token) = BearerToken::from_request_parts(&mut parts, &app_state)
        .await
        .unwrap();
    assert_eq!(token.as_deref(), Some("Bearer abc"));

    let mut parts = get_request_parts(Method::POST, "/auth/audit".parse().unwrap());
    let BearerToken(token) = BearerToken::from_request_parts(&mut parts, &app_state)
        .await
        .unwrap();
    assert_eq!(token, None);
}

#[test]
fn test_error_status_codes() {
    let denied = AuthError::PermissionDenied {
        action: AuthorizedAction::Create,
        resource: ResourceRef::default(),
    };

    assert_eq!(AuthError::AuthenticationRequired.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(AuthError::InvalidToken.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        AuthError::TokenFormat { token: "t".into() }.status(),
        StatusCode::UNAUTHORIZED
    );
    assert_eq!(denied.status(), StatusCode::FORBIDDEN);
    assert_eq!(
        AuthError::Usage("resourceId must be a number.".into()).status(),
        StatusCode::INTERNAL_SERVER_ERROR
    );
}

#[test]
fn test_error_messages() {
    assert_eq!(
        AuthError::AuthenticationRequired.to_string(),
        "Authentication required"
    );
    assert_eq!(AuthError::InvalidToken.to_string(), "Invalid token");
    assert_eq!(
        AuthError::TokenFormat { token: "abc".into() }.to_string(),
        "The token is valid, but AuthService could not understand its payload. Token: abc"
    );
}

#[test]
fn test_error_into_response_sets_status() {
    let response = AuthError::InvalidToken.into_response();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = AuthError::Usage("resourceOwnerId must be a number.".into()).into_response();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}
