//! Server configuration loaded from environment variables.
//!
//! All settings have sensible defaults so the mock backend can start with
//! zero configuration for local development.

use std::net::SocketAddr;
use std::path::PathBuf;

/// Credentials for an ADMIN account created on startup.
#[derive(Clone)]
pub struct SeedAdmin {
    pub email: String,
    pub password: String,
}

impl std::fmt::Debug for SeedAdmin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SeedAdmin")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Socket address for the HTTP (axum) API server.
    /// Env: `HTTP_ADDR`
    /// Default: `0.0.0.0:8080`
    pub http_addr: SocketAddr,

    /// SQLite file the tables are persisted to.
    /// Env: `DB_PATH`
    /// Default: unset (state lives only as long as the process).
    pub db_path: Option<PathBuf>,

    /// Env: `SEED_ADMIN_EMAIL` + `SEED_ADMIN_PASSWORD`, both required.
    pub seed_admin: Option<SeedAdmin>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_addr: ([0, 0, 0, 0], 8080).into(),
            db_path: None,
            seed_admin: None,
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(addr) = lookup("HTTP_ADDR") {
            if let Ok(parsed) = addr.parse::<SocketAddr>() {
                config.http_addr = parsed;
            } else {
                tracing::warn!(value = %addr, "Invalid HTTP_ADDR, using default");
            }
        }

        if let Some(path) = lookup("DB_PATH").filter(|p| !p.is_empty()) {
            config.db_path = Some(PathBuf::from(path));
        }

        match (lookup("SEED_ADMIN_EMAIL"), lookup("SEED_ADMIN_PASSWORD")) {
            (Some(email), Some(password)) if !email.is_empty() && !password.is_empty() => {
                config.seed_admin = Some(SeedAdmin { email, password });
            }
            (None, None) => {}
            _ => tracing::warn!("SEED_ADMIN_EMAIL and SEED_ADMIN_PASSWORD must both be set"),
        }

        // RUST_LOG is handled directly by tracing-subscriber's EnvFilter,
        // so we do not store it here.

        config
    }
}
