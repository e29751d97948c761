//! Client configuration loaded from environment variables.

use std::time::Duration;

#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL every request path is appended to.
    /// Env: `API_URL`
    /// Default: `http://localhost:8080`
    pub api_url: String,

    /// Transport timeout per request.
    /// Env: `API_TIMEOUT_SECS`
    /// Default: 30
    pub timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: "http://localhost:8080".to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

impl ClientConfig {
    pub fn new(api_url: impl Into<String>) -> Self {
        Self {
            api_url: api_url.into(),
            ..Self::default()
        }
    }

    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(url) = lookup("API_URL").filter(|u| !u.is_empty()) {
            config.api_url = url;
        }

        if let Some(val) = lookup("API_TIMEOUT_SECS") {
            match val.parse::<u64>() {
                Ok(secs) if secs > 0 => config.timeout = Duration::from_secs(secs),
                _ => tracing::warn!(value = %val, "Invalid API_TIMEOUT_SECS, using default"),
            }
        }

        config
    }

    /// Join `path` onto the base URL.
    pub fn url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.api_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}
