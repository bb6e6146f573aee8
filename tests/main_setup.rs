use jsonwebtoken::Algorithm;
use qa_auth::{AppConfig, config::Env};
use serial_test::serial;
use std::{env, panic};

const CONFIG_VARS: [&str; 5] = [
    "APP_ENV",
    "JWT_SECRET",
    "JWT_ALGORITHM",
    "TOKEN_VALID_SECONDS",
    "BIND_ADDR",
];

// --- Setup/Teardown Utilities ---

/// Runs `test` with the given variables set (all other config variables
/// cleared), restoring the original environment afterwards.
fn run_with_env<T, R>(vars: &[(&str, &str)], test: T) -> R
where
    T: FnOnce() -> R + panic::UnwindSafe,
{
    let originals: Vec<(&str, Option<String>)> = CONFIG_VARS
        .iter()
        .map(|&var| (var, env::var(var).ok()))
        .collect();

    unsafe {
        for var in CONFIG_VARS {
            env::remove_var(var);
        }
        for (key, value) in vars {
            env::set_var(key, value);
        }
    }

    let result = panic::catch_unwind(test);

    for (key, original_value) in originals {
        unsafe {
            match original_value {
                Some(val) => env::set_var(key, val),
                None => env::remove_var(key),
            }
        }
    }

    match result {
        Ok(value) => value,
        Err(e) => panic::resume_unwind(e),
    }
}

// --- Tests ---

#[test]
#[serial]
fn test_app_config_production_fail_fast() {
    let result = run_with_env(&[("APP_ENV", "production")], || {
        panic::catch_unwind(AppConfig::load)
    });

    assert!(
        result.is_err(),
        "Production config loading should panic without JWT_SECRET"
    );
}

#[test]
#[serial]
fn test_app_config_production_with_secret() {
    let config = run_with_env(
        &[
            ("APP_ENV", "production"),
            ("JWT_SECRET", "prod-secret"),
            ("JWT_ALGORITHM", "HS512"),
            ("TOKEN_VALID_SECONDS", "300"),
        ],
        AppConfig::load,
    );

    assert_eq!(config.env, Env::Production);
    assert_eq!(config.jwt_secret, "prod-secret");
    assert_eq!(config.jwt_algorithm, Algorithm::HS512);
    assert_eq!(config.token_valid_seconds, 300);
}

#[test]
#[serial]
fn test_app_config_local_env_defaults() {
    let config = run_with_env(&[("APP_ENV", "local")], AppConfig::load);

    assert_eq!(config.env, Env::Local);
    assert_eq!(config.jwt_secret, "super-secure-test-secret-value-local");
    assert_eq!(config.jwt_algorithm, Algorithm::HS256);
    assert_eq!(config.token_valid_seconds, 60);
    assert_eq!(config.bind_addr, "0.0.0.0:3000");
}

#[test]
#[serial]
fn test_app_config_rejects_asymmetric_algorithm() {
    let result = run_with_env(&[("JWT_ALGORITHM", "RS256")], || {
        panic::catch_unwind(AppConfig::load)
    });

    assert!(result.is_err());
}

#[test]
#[serial]
fn test_app_config_rejects_non_integer_validity() {
    let result = run_with_env(&[("TOKEN_VALID_SECONDS", "a minute")], || {
        panic::catch_unwind(AppConfig::load)
    });

    assert!(result.is_err());
}

#[test]
#[serial]
fn test_app_config_production_rejects_empty_secret() {
    let result = run_with_env(&[("APP_ENV", "production"), ("JWT_SECRET", "")], || {
        panic::catch_unwind(AppConfig::load)
    });

    assert!(
        result.is_err(),
        "Production config loading should panic on an empty JWT_SECRET"
    );
}

#[test]
#[serial]
fn test_app_config_local_empty_secret_uses_fallback() {
    let config = run_with_env(&[("APP_ENV", "local"), ("JWT_SECRET", "")], AppConfig::load);

    assert_eq!(config.jwt_secret, "super-secure-test-secret-value-local");
}
