// src/config.rs

use dotenvy::dotenv;
use std::env;

/// A question needs at least this many options to be answerable.
pub const MIN_OPTIONS_PER_QUESTION: usize = 2;

/// Upper bound on options per question.
pub const MAX_OPTIONS_PER_QUESTION: usize = 4;

/// Width of the stored option text, counted after HTML cleaning.
pub const MAX_OPTION_TEXT_LEN: usize = 255;

/// Attendance percentages are rounded to this many decimals.
pub const PERCENTAGE_DECIMALS: i32 = 2;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    /// Token lifetime in seconds.
    pub jwt_expiration: u64,
    pub rust_log: String,
    pub server_port: u16,
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();

        let database_url = env::var("DATABASE_URL").expect("DATABASE_URL must be set");

        let jwt_secret = env::var("JWT_SECRET").expect("JWT_SECRET must be set");

        let jwt_expiration = env::var("JWT_EXPIRATION")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(86400);

        let rust_log = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        let server_port = env::var("SERVER_PORT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(3000);

        Self {
            database_url,
            jwt_secret,
            jwt_expiration,
            rust_log,
            server_port,
        }
    }
}
