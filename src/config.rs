//! Runtime configuration loaded from environment variables.
//!
//! All settings have defaults suitable for local development except
//! `JWT_SECRET`, which is required unless `DEV_MODE=true`.

use std::path::PathBuf;

use anyhow::{bail, Context};

/// Secret used when `DEV_MODE=true` and no `JWT_SECRET` is set.
const DEV_SECRET: &str = "insecure-dev-secret";

/// Global server configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Port the HTTP server binds to.
    pub port: u16,
    /// Directory holding the JSON document stores.
    pub data_dir: PathBuf,
    /// Secret used to sign and verify session tokens.
    pub jwt_secret: String,
    /// Session token lifetime in hours.
    pub jwt_ttl_hours: i64,
    /// Development mode: relaxes the JWT secret requirement and log verbosity.
    pub dev_mode: bool,
}

impl Config {
    /// Load configuration from the environment.
    ///
    /// Recognized variables: `PORT`, `DATA_DIR`, `JWT_SECRET`,
    /// `JWT_TTL_HOURS`, `DEV_MODE`.
    pub fn from_env() -> anyhow::Result<Self> {
        let port = match std::env::var("PORT") {
            Ok(v) => v.parse::<u16>().context("PORT must be a valid port number")?,
            Err(_) => 5000,
        };

        let data_dir = std::env::var("DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./data"));

        let dev_mode = std::env::var("DEV_MODE")
            .map(|v| v == "true" || v == "1")
            .unwrap_or(false);

        let jwt_secret = match std::env::var("JWT_SECRET") {
            Ok(s) if !s.trim().is_empty() => s,
            _ if dev_mode => {
                tracing::warn!("JWT_SECRET not set, using insecure development secret");
                DEV_SECRET.to_string()
            }
            _ => bail!("JWT_SECRET must be set unless DEV_MODE=true"),
        };

        let jwt_ttl_hours = match std::env::var("JWT_TTL_HOURS") {
            Ok(v) => v
                .parse::<i64>()
                .context("JWT_TTL_HOURS must be an integer")?,
            Err(_) => 24,
        };

        Ok(Self {
            port,
            data_dir,
            jwt_secret,
            jwt_ttl_hours,
            dev_mode,
        })
    }
}
