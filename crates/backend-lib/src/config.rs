// ============================
// crates/backend-lib/src/config.rs
// ============================
//! Configuration management.
use anyhow::{bail, Result};
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Server bind address
    pub bind_addr: SocketAddr,
    /// Directory holding the flat-file credential store
    pub data_dir: PathBuf,
    /// Log level
    pub log_level: String,
    /// Token and cookie settings
    pub auth: AuthSettings,
    /// Login rate limiter settings
    pub login_limit: RateLimitSettings,
}

/// Token and cookie settings, injected into the token signer and the
/// cookie writer at construction. Nothing in the auth path reads the
/// environment directly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthSettings {
    /// Process-wide signing secret. Loaded once at startup and never
    /// rotated within the process lifetime. Empty is a fatal load error.
    pub jwt_secret: String,
    /// Token lifetime in seconds
    pub token_ttl_secs: u64,
    /// Whether the `accessToken` cookie carries the Secure flag.
    /// Disabled for local development over plain HTTP.
    pub cookie_secure: bool,
}

/// Fixed-window rate limit applied to the login route
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitSettings {
    /// Maximum login attempts per window per client IP
    pub max_requests: u32,
    /// Window length in seconds
    pub window_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:3000".parse().unwrap(),
            data_dir: PathBuf::from("data"),
            log_level: "info".to_string(),
            auth: AuthSettings::default(),
            login_limit: RateLimitSettings::default(),
        }
    }
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            jwt_secret: String::new(),
            token_ttl_secs: 60 * 60 * 24, // 24 hours
            cookie_secure: true,
        }
    }
}

impl Default for RateLimitSettings {
    fn default() -> Self {
        Self {
            max_requests: 10,
            window_secs: 60,
        }
    }
}

impl Settings {
    /// Load settings from `savour.toml` plus `SAVOUR_`-prefixed
    /// environment variables (e.g. `SAVOUR_AUTH__JWT_SECRET`).
    pub fn load() -> Result<Self> {
        Self::load_from("savour.toml")
    }

    /// Load settings from an explicit config file path.
    pub fn load_from(path: &str) -> Result<Self> {
        let settings: Settings = Figment::from(Serialized::defaults(Settings::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed("SAVOUR_").split("__"))
            .extract()?;
        settings.validate()?;
        Ok(settings)
    }

    /// The signing secret is the one setting the process cannot run
    /// without.
    fn validate(&self) -> Result<()> {
        if self.auth.jwt_secret.is_empty() {
            bail!("auth.jwt_secret must be set (SAVOUR_AUTH__JWT_SECRET)");
        }
        Ok(())
    }

    pub fn token_ttl(&self) -> Duration {
        Duration::from_secs(self.auth.token_ttl_secs)
    }
}
