//! Configuration for the birthday page server
//!
//! Passwords are not part of this struct. They are read from the environment
//! at the moment a login is checked, see [`crate::secrets`].

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Address to listen on
    #[serde(default = "default_listen_addr")]
    pub listen_addr: SocketAddr,

    /// Directory with template overrides (`login_public.html`, `login_admin.html`,
    /// `protected.html`, `error.html`). Missing files fall back to the builtin ones.
    #[serde(default)]
    pub template_dir: Option<PathBuf>,

    /// Session lifetime in minutes
    #[serde(default = "default_session_ttl_minutes")]
    pub session_ttl_minutes: i64,

    /// Add the `Secure` attribute to the session cookie (set when behind TLS).
    #[serde(default)]
    pub secure_cookie: bool,

    /// Log level filter string. Overridden by RUST_LOG.
    /// Default: "birthday_page=debug,tower_http=debug"
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

// Default value functions for serde
fn default_listen_addr() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 8000))
}

fn default_session_ttl_minutes() -> i64 {
    60
}

/// Longest accepted session lifetime: one year.
pub const MAX_SESSION_TTL_MINUTES: i64 = 365 * 24 * 60;

fn default_log_level() -> String {
    "birthday_page=debug,tower_http=debug".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            template_dir: None,
            session_ttl_minutes: default_session_ttl_minutes(),
            secure_cookie: false,
            log_level: default_log_level(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io(e.to_string()))?;
        let config: Config =
            toml::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from environment variables
    #[cfg(test)]
    pub(crate) fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env();
        config
    }

    /// Load configuration from file if it exists, then apply environment overrides.
    ///
    /// A file named by `BIRTHDAY_PAGE_CONFIG` must load and validate. Invalid
    /// files at the default locations are skipped with a warning.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::load_file()?.unwrap_or_default();
        config.apply_env();
        Ok(config)
    }

    fn load_file() -> Result<Option<Self>, ConfigError> {
        if let Ok(path) = std::env::var("BIRTHDAY_PAGE_CONFIG") {
            return Self::from_file(&path).map(Some);
        }

        for path in &["birthday_page.toml", "/etc/birthday_page/config.toml"] {
            if std::path::Path::new(path).exists() {
                match Self::from_file(path) {
                    Ok(config) => return Ok(Some(config)),
                    Err(e) => eprintln!("Warning: ignoring config file {}: {}", path, e),
                }
            }
        }

        Ok(None)
    }

    /// Overlay `BIRTHDAY_PAGE_*` environment variables onto this config.
    /// Unparseable values are ignored.
    pub fn apply_env(&mut self) {
        if let Ok(addr) = std::env::var("BIRTHDAY_PAGE_LISTEN_ADDR") {
            if let Ok(parsed) = addr.parse() {
                self.listen_addr = parsed;
            }
        }

        if let Ok(dir) = std::env::var("BIRTHDAY_PAGE_TEMPLATE_DIR") {
            self.template_dir = Some(PathBuf::from(dir));
        }

        if let Ok(ttl) = std::env::var("BIRTHDAY_PAGE_SESSION_TTL_MINUTES") {
            if let Ok(parsed) = ttl.parse::<i64>() {
                if (1..=MAX_SESSION_TTL_MINUTES).contains(&parsed) {
                    self.session_ttl_minutes = parsed;
                }
            }
        }

        if let Ok(secure) = std::env::var("BIRTHDAY_PAGE_SECURE_COOKIE") {
            self.secure_cookie = secure == "true" || secure == "1";
        }

        if let Ok(level) = std::env::var("BIRTHDAY_PAGE_LOG_LEVEL") {
            self.log_level = level;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.session_ttl_minutes <= 0 {
            return Err(ConfigError::Invalid(format!(
                "session_ttl_minutes must be positive, got {}",
                self.session_ttl_minutes
            )));
        }
        if self.session_ttl_minutes > MAX_SESSION_TTL_MINUTES {
            return Err(ConfigError::Invalid(format!(
                "session_ttl_minutes must be at most {}, got {}",
                MAX_SESSION_TTL_MINUTES, self.session_ttl_minutes
            )));
        }
        Ok(())
    }

    /// Session lifetime, clamped to the accepted range.
    pub fn session_ttl(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.session_ttl_minutes.clamp(1, MAX_SESSION_TTL_MINUTES))
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}
