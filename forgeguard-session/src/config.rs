//! Session configuration.

use crate::error::{SessionError, SessionResult};
use forgeguard_core::CookieOptions;
use std::time::Duration;

/// Session configuration.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Name of the cookie carrying the session ID
    pub cookie_name: String,
    /// Attributes for the session cookie
    pub cookie: CookieOptions,
    /// Default session TTL
    pub default_ttl: Duration,
    /// Requests between sweeps of expired sessions; 0 disables sweeping
    pub cleanup_every: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cookie_name: "sid".to_string(),
            cookie: CookieOptions::new().with_path("/").with_http_only(true),
            default_ttl: Duration::from_secs(3600), // 1 hour
            cleanup_every: 1024,
        }
    }
}

impl SessionConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the session cookie name.
    pub fn with_cookie_name(mut self, name: impl Into<String>) -> Self {
        self.cookie_name = name.into();
        self
    }

    /// Set the session cookie attributes.
    pub fn with_cookie(mut self, cookie: CookieOptions) -> Self {
        self.cookie = cookie;
        self
    }

    /// Set the default session TTL.
    pub fn with_default_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = ttl;
        self
    }

    /// Sweep expired sessions every `requests` requests (0 disables).
    pub fn with_cleanup_every(mut self, requests: u64) -> Self {
        self.cleanup_every = requests;
        self
    }

    /// Reject configurations that cannot work.
    pub fn validate(&self) -> SessionResult<()> {
        if self.cookie_name.is_empty() {
            return Err(SessionError::Config(
                "session cookie name must not be empty".to_string(),
            ));
        }
        if self.default_ttl.is_zero() {
            return Err(SessionError::Config(
                "session TTL must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}
