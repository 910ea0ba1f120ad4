//! Server configuration, read from the environment (after `.env` is loaded).

use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{Context, Result, bail};
use chrono::Duration;

/// JWT secrets that must never reach a running server.
const PLACEHOLDER_SECRETS: &[&str] = &["", "change-me-to-a-random-string", "dev-secret-change-me"];

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub db_path: PathBuf,
    pub jwt_secret: String,
    /// Lifetime of the primary identity token.
    pub token_ttl: Duration,
    /// Fixed window granted by a successful unlock or setup.
    pub unlock_ttl: Duration,
    /// Lifetime of an emailed one-time code.
    pub code_ttl: Duration,
    pub sweep_interval_secs: u64,
    /// Minimum gap between two `last_active_at` writes for one user.
    pub activity_throttle: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3001,
            db_path: PathBuf::from("nook.db"),
            jwt_secret: String::new(),
            token_ttl: Duration::days(30),
            unlock_ttl: Duration::minutes(30),
            code_ttl: Duration::minutes(10),
            sweep_interval_secs: 300,
            activity_throttle: Duration::minutes(5),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let jwt_secret = std::env::var("NOOK_JWT_SECRET").unwrap_or_default();
        if PLACEHOLDER_SECRETS.contains(&jwt_secret.as_str()) {
            bail!("NOOK_JWT_SECRET is unset or still a placeholder; set it in .env and restart");
        }

        Ok(Self {
            host: std::env::var("NOOK_HOST").unwrap_or(defaults.host),
            port: env_or("NOOK_PORT", defaults.port)?,
            db_path: std::env::var("NOOK_DB_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.db_path),
            jwt_secret,
            token_ttl: Duration::days(env_or("NOOK_TOKEN_TTL_DAYS", 30)?),
            unlock_ttl: Duration::minutes(env_or("NOOK_UNLOCK_TTL_MINUTES", 30)?),
            code_ttl: Duration::minutes(env_or("NOOK_CODE_TTL_MINUTES", 10)?),
            sweep_interval_secs: env_or("NOOK_SWEEP_INTERVAL_SECS", defaults.sweep_interval_secs)?,
            activity_throttle: Duration::seconds(env_or("NOOK_ACTIVITY_THROTTLE_SECS", 300)?),
        })
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn env_or<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw.parse().with_context(|| format!("{key} has an invalid value: {raw:?}")),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_windows() {
        let config = Config::default();
        assert_eq!(config.unlock_ttl, Duration::minutes(30));
        assert_eq!(config.code_ttl, Duration::minutes(10));
        assert_eq!(config.token_ttl, Duration::days(30));
        assert_eq!(config.bind_addr(), "0.0.0.0:3001");
    }

    #[test]
    fn env_or_falls_back_when_unset() {
        let port: u16 = env_or("NOOK_TEST_DEFINITELY_UNSET_VAR", 4242).unwrap();
        assert_eq!(port, 4242);
    }
}
