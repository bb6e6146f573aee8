use jsonwebtoken::Algorithm;
use std::env;

use crate::auth::DEFAULT_VALID_SECONDS;

const LOCAL_JWT_SECRET: &str = "super-secure-test-secret-value-local";
const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";

/// AppConfig
///
/// Holds the application's configuration. Loaded once at startup and never
/// mutated afterwards; the signing secret in particular is process-wide.
#[derive(Clone)]
pub struct AppConfig {
    // Runtime environment marker. Selects log format and secret requirements.
    pub env: Env,
    // Secret key used to sign and verify tokens.
    pub jwt_secret: String,
    // HMAC family only (HS256 / HS384 / HS512).
    pub jwt_algorithm: Algorithm,
    // Validity window handed to newly signed tokens.
    pub token_valid_seconds: i64,
    pub bind_addr: String,
}

/// Env
///
/// The runtime context: local development or production.
#[derive(Clone, PartialEq, Debug)]
pub enum Env {
    Local,
    Production,
}

impl Default for AppConfig {
    /// Test-safe configuration that needs no environment variables.
    fn default() -> Self {
        Self {
            env: Env::Local,
            jwt_secret: LOCAL_JWT_SECRET.to_string(),
            jwt_algorithm: Algorithm::HS256,
            token_valid_seconds: DEFAULT_VALID_SECONDS,
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
        }
    }
}

impl AppConfig {
    /// load
    ///
    /// Reads the configuration from environment variables.
    ///
    /// # Panics
    /// Panics if `JWT_SECRET` is missing or empty in production, or if `JWT_ALGORITHM`
    /// or `TOKEN_VALID_SECONDS` hold a value that cannot be used. The server
    /// must not start with an insecure or half-parsed configuration.
    pub fn load() -> Self {
        // 1. Runtime Environment Resolution
        // Anything other than "production" is treated as local development.
        let env_str = env::var("APP_ENV").unwrap_or_else(|_| "local".to_string());
        let env = match env_str.as_str() {
            "production" => Env::Production,
            _ => Env::Local,
        };

        // 2. JWT Secret Resolution
        // An empty value counts as unset.
        let configured_secret = env::var("JWT_SECRET").ok().filter(|secret| !secret.is_empty());
        let jwt_secret = match env {
            // The production secret is mandatory and must be explicitly set.
            Env::Production => configured_secret
                .expect("FATAL: JWT_SECRET must be set to a non-empty value in production."),
            // In local, fall back to a well-known development secret.
            Env::Local => configured_secret.unwrap_or_else(|| LOCAL_JWT_SECRET.to_string()),
        };

        // 3. Signing Algorithm
        // HMAC family only.
        let jwt_algorithm = match env::var("JWT_ALGORITHM") {
            Ok(name) => parse_hmac_algorithm(&name)
                .expect("FATAL: JWT_ALGORITHM must be one of HS256, HS384, HS512."),
            Err(_) => Algorithm::HS256,
        };

        // 4. Token Lifetime
        // Seconds between signing and `validUntil` for newly issued tokens.
        let token_valid_seconds = match env::var("TOKEN_VALID_SECONDS") {
            Ok(value) => value
                .parse::<i64>()
                .expect("FATAL: TOKEN_VALID_SECONDS must be an integer."),
            Err(_) => DEFAULT_VALID_SECONDS,
        };

        // 5. Listener Address
        let bind_addr = env::var("BIND_ADDR").unwrap_or_else(|_| DEFAULT_BIND_ADDR.to_string());

        Self {
            env,
            jwt_secret,
            jwt_algorithm,
            token_valid_seconds,
            bind_addr,
        }
    }
}

fn parse_hmac_algorithm(name: &str) -> Option<Algorithm> {
    match name.parse::<Algorithm>().ok()? {
        algorithm @ (Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512) => Some(algorithm),
        _ => None,
    }
}
