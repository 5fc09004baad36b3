// src/config.rs

use dotenvy::dotenv;
use std::env;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_access_secret: String,
    pub jwt_refresh_secret: String,
    /// Access token lifetime, minutes.
    pub access_token_ttl_min: i64,
    /// Refresh token lifetime, days.
    pub refresh_token_ttl_days: i64,
    /// Shared secret for the admin panel.
    pub admin_code: String,
    pub port: u16,
    pub rust_log: String,
}

/// Admin tokens live one hour between verifications.
pub const ADMIN_TOKEN_TTL_SECS: i64 = 3600;

/// The sweeper drops abandoned admin tokens every 10 minutes.
pub const ADMIN_SWEEP_INTERVAL_SECS: u64 = 600;

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();

        let database_url = env::var("DATABASE_URL").expect("DATABASE_URL must be set");

        let jwt_access_secret =
            env::var("JWT_ACCESS_SECRET").expect("JWT_ACCESS_SECRET must be set");

        let jwt_refresh_secret =
            env::var("JWT_REFRESH_SECRET").expect("JWT_REFRESH_SECRET must be set");

        let access_token_ttl_min = env::var("ACCESS_TOKEN_TTL_MIN")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(15);

        let refresh_token_ttl_days = env::var("REFRESH_TOKEN_TTL_DAYS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(7);

        let admin_code = env::var("ADMIN_CODE").expect("ADMIN_CODE must be set");

        let port = env::var("PORT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(3000);

        let rust_log = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        Self {
            database_url,
            jwt_access_secret,
            jwt_refresh_secret,
            access_token_ttl_min,
            refresh_token_ttl_days,
            admin_code,
            port,
            rust_log,
        }
    }
}
