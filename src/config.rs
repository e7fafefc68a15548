//! Runtime configuration loaded from the environment

use anyhow::Context;

use crate::keygen::DEFAULT_KEY_LENGTH;

/// Application configuration
///
/// Every field has a default so the app runs with no environment at all:
/// an in-memory database on `0.0.0.0:8080`.
#[derive(Debug, Clone)]
pub struct Config {
    /// Interface to bind (`HOST`)
    pub host: String,

    /// Port to listen on (`PORT`)
    pub port: u16,

    /// Path of a redb file (`DATABASE_URL`). `None` keeps everything in memory,
    /// so data is lost on restart.
    pub database_path: Option<String>,

    /// Length of generated short URL keys (`KEY_LENGTH`)
    pub key_length: usize,

    /// Name of the session cookie (`SESSION_COOKIE`)
    pub session_cookie: String,

    /// Mark the session cookie `Secure` (`SECURE_COOKIE`)
    pub secure_cookie: bool,

    /// Serve `/urls.json`, `/users.json` and `/templateVars.json` (`DEBUG_ENDPOINTS`)
    pub debug_endpoints: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            database_path: None,
            key_length: DEFAULT_KEY_LENGTH,
            session_cookie: "user_id".to_string(),
            secure_cookie: false,
            debug_endpoints: true,
        }
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let defaults = Self::default();

        let host = std::env::var("HOST").unwrap_or(defaults.host);
        let port = match std::env::var("PORT") {
            Ok(raw) => raw.parse::<u16>().context("PORT must be a valid port number")?,
            Err(_) => defaults.port,
        };

        let database_path = std::env::var("DATABASE_URL")
            .ok()
            .filter(|path| !path.trim().is_empty());

        let key_length = match std::env::var("KEY_LENGTH") {
            Ok(raw) => raw
                .parse::<usize>()
                .context("KEY_LENGTH must be a positive integer")?,
            Err(_) => defaults.key_length,
        };
        anyhow::ensure!(key_length > 0, "KEY_LENGTH must be at least 1");

        let session_cookie = std::env::var("SESSION_COOKIE").unwrap_or(defaults.session_cookie);

        Ok(Self {
            host,
            port,
            database_path,
            key_length,
            session_cookie,
            secure_cookie: env_flag("SECURE_COOKIE", defaults.secure_cookie),
            debug_endpoints: env_flag("DEBUG_ENDPOINTS", defaults.debug_endpoints),
        })
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn env_flag(name: &str, default: bool) -> bool {
    match std::env::var(name) {
        Ok(value) => matches!(value.to_lowercase().as_str(), "true" | "1" | "yes"),
        Err(_) => default,
    }
}
