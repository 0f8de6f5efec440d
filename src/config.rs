use std::{env, time::Duration};

use crate::models::Role;

/// AppConfig
///
/// Holds the console's entire configuration. Loaded once at start and shared
/// read-only through the application state.
#[derive(Clone, Debug)]
pub struct AppConfig {
    // Postgres connection string. Optional in local runs, where profiles fall
    // back to the in-memory store.
    pub db_url: Option<String>,
    // Runtime environment marker. Controls the local identity bypass and log format.
    pub env: Env,
    // Secret used to validate identity tokens issued by the auth provider.
    pub jwt_secret: String,
    // Role granted to an identity the first time it signs in.
    pub default_role: Role,
    // Upper bound for each profile-store call made during role resolution.
    pub role_resolution_timeout: Duration,
    // Optional JSON route table; the built-in table is used when unset.
    pub route_table_path: Option<String>,
    pub bind_addr: String,
}

/// Env
///
/// Runtime context: `Local` enables the `x-user-id` bypass and pretty logs,
/// `Production` demands every secret and logs JSON.
#[derive(Clone, PartialEq, Debug)]
pub enum Env {
    Local,
    Production,
}

const LOCAL_JWT_SECRET: &str = "local-console-secret-not-for-production";
const DEFAULT_RESOLUTION_TIMEOUT_MS: u64 = 5_000;

impl Default for AppConfig {
    /// Non-panicking configuration for tests and scaffolding.
    fn default() -> Self {
        Self {
            db_url: None,
            env: Env::Local,
            jwt_secret: LOCAL_JWT_SECRET.to_string(),
            default_role: Role::Client,
            role_resolution_timeout: Duration::from_millis(DEFAULT_RESOLUTION_TIMEOUT_MS),
            route_table_path: None,
            bind_addr: "0.0.0.0:3000".to_string(),
        }
    }
}

impl AppConfig {
    /// load
    ///
    /// Reads the configuration from environment variables.
    ///
    /// # Panics
    /// Panics when a variable required for the current environment is missing or
    /// malformed, so the console never starts half-configured. In particular,
    /// `DEFAULT_ROLE=public` is refused: first-time identities must land on a
    /// signed-in role.
    pub fn load() -> Self {
        let env = match env::var("APP_ENV").as_deref() {
            Ok("production") => Env::Production,
            _ => Env::Local,
        };

        let jwt_secret = match env {
            Env::Production => env::var("AUTH_JWT_SECRET")
                .expect("FATAL: AUTH_JWT_SECRET must be set in production."),
            Env::Local => {
                env::var("AUTH_JWT_SECRET").unwrap_or_else(|_| LOCAL_JWT_SECRET.to_string())
            }
        };

        let db_url = match env {
            Env::Production => Some(
                env::var("DATABASE_URL").expect("FATAL: DATABASE_URL required in production"),
            ),
            Env::Local => env::var("DATABASE_URL").ok(),
        };

        let default_role = env::var("DEFAULT_ROLE")
            .ok()
            .map(|raw| {
                raw.parse::<Role>()
                    .unwrap_or_else(|e| panic!("FATAL: DEFAULT_ROLE is invalid: {e}"))
            })
            .unwrap_or(Role::Client);
        assert!(
            default_role.is_authenticated(),
            "FATAL: DEFAULT_ROLE must be a signed-in role, not public"
        );

        let timeout_ms = env::var("ROLE_RESOLUTION_TIMEOUT_MS")
            .ok()
            .map(|raw| {
                raw.parse::<u64>()
                    .expect("FATAL: ROLE_RESOLUTION_TIMEOUT_MS must be a number of milliseconds")
            })
            .unwrap_or(DEFAULT_RESOLUTION_TIMEOUT_MS);

        Self {
            db_url,
            env,
            jwt_secret,
            default_role,
            role_resolution_timeout: Duration::from_millis(timeout_ms),
            route_table_path: env::var("ROUTE_TABLE_PATH").ok(),
            bind_addr: env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string()),
        }
    }
}
