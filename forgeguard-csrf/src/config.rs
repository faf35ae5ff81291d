use crate::error::{CsrfError, Result};
use forgeguard_core::CookieOptions;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Default number of random bytes per token (32 hex characters)
pub const DEFAULT_TOKEN_LENGTH: usize = 16;

/// Upper bound on random bytes per token
pub const MAX_TOKEN_LENGTH: usize = 1024;

/// Default body field, cookie name and session key
pub const DEFAULT_PARAM_NAME: &str = "_csrf";

/// Default name of the request-local variable set by `expose`
pub const DEFAULT_EXPOSED_VARIABLE: &str = "csrfToken";

/// Default header carrying a submitted token
pub const DEFAULT_HEADER_NAME: &str = "csrf-token";

/// Methods validated by the default policy.
///
/// PATCH is deliberately absent; add it with
/// [`CsrfConfig::with_protected_methods`] if your routes mutate on PATCH.
pub const DEFAULT_PROTECTED_METHODS: &[&str] = &["POST", "PUT", "DELETE"];

/// Environment variable prefix read by [`CsrfConfig::from_env`]
pub const ENV_PREFIX: &str = "FORGEGUARD_CSRF_";

/// Where the canonical token lives between requests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageKind {
    /// In the request's session, under `param_name`
    #[default]
    Session,
    /// In a cookie named `param_name`
    Cookie,
}

impl FromStr for StorageKind {
    type Err = CsrfError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "session" => Ok(StorageKind::Session),
            "cookie" => Ok(StorageKind::Cookie),
            other => Err(CsrfError::configuration(format!(
                "unknown storage kind '{other}', expected 'session' or 'cookie'"
            ))),
        }
    }
}

/// CSRF protection configuration
///
/// Captured once by [`CsrfProtection`](crate::CsrfProtection) and never
/// mutated afterwards, so independently configured instances can coexist
/// in one process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CsrfConfig {
    /// Random bytes per token
    pub token_length: usize,

    /// Backing store for the canonical token
    pub storage: StorageKind,

    /// Cookie attributes, used when `storage` is `Cookie`
    pub cookie: CookieOptions,

    /// Body field name, cookie name and session key
    pub param_name: String,

    /// Request-local variable the token is exposed under
    pub exposed_variable_name: String,

    /// Header consulted after the body field
    pub header_name: String,

    /// Methods the default policy validates
    pub protected_methods: Vec<String>,

    /// Path prefixes the default policy never validates
    pub exclude_paths: Vec<String>,
}

impl Default for CsrfConfig {
    fn default() -> Self {
        Self {
            token_length: DEFAULT_TOKEN_LENGTH,
            storage: StorageKind::Session,
            cookie: CookieOptions::default(),
            param_name: DEFAULT_PARAM_NAME.to_string(),
            exposed_variable_name: DEFAULT_EXPOSED_VARIABLE.to_string(),
            header_name: DEFAULT_HEADER_NAME.to_string(),
            protected_methods: DEFAULT_PROTECTED_METHODS
                .iter()
                .map(|m| m.to_string())
                .collect(),
            exclude_paths: Vec::new(),
        }
    }
}

impl CsrfConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Session-scoped storage with default settings
    pub fn session() -> Self {
        Self::default()
    }

    /// Cookie-scoped storage with the given cookie attributes
    pub fn cookie(options: CookieOptions) -> Self {
        Self {
            storage: StorageKind::Cookie,
            cookie: options,
            ..Self::default()
        }
    }

    /// Parse from JSON; missing fields take their defaults
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| CsrfError::configuration(format!("invalid CSRF config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Read overrides from `FORGEGUARD_CSRF_*` environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_vars(std::env::vars())
    }

    /// Apply `FORGEGUARD_CSRF_*` overrides from an arbitrary variable source.
    ///
    /// Recognized: `TOKEN_LENGTH`, `STORAGE`, `PARAM_NAME`,
    /// `EXPOSED_VARIABLE`, `HEADER_NAME`. Unknown keys are ignored.
    pub fn from_vars<I>(vars: I) -> Result<Self>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut config = Self::default();

        for (key, value) in vars {
            let Some(name) = key.strip_prefix(ENV_PREFIX) else {
                continue;
            };

            match name {
                "TOKEN_LENGTH" => {
                    config.token_length = value.parse().map_err(|_| {
                        CsrfError::configuration(format!(
                            "{ENV_PREFIX}TOKEN_LENGTH must be a positive integer, got '{value}'"
                        ))
                    })?;
                }
                "STORAGE" => config.storage = value.parse()?,
                "PARAM_NAME" => config.param_name = value,
                "EXPOSED_VARIABLE" => config.exposed_variable_name = value,
                "HEADER_NAME" => config.header_name = value,
                _ => {}
            }
        }

        config.validate()?;
        Ok(config)
    }

    /// Set token length in bytes
    pub fn with_token_length(mut self, bytes: usize) -> Self {
        self.token_length = bytes;
        self
    }

    pub fn with_storage(mut self, storage: StorageKind) -> Self {
        self.storage = storage;
        self
    }

    pub fn with_cookie_options(mut self, options: CookieOptions) -> Self {
        self.cookie = options;
        self
    }

    pub fn with_param_name(mut self, name: impl Into<String>) -> Self {
        self.param_name = name.into();
        self
    }

    pub fn with_exposed_variable_name(mut self, name: impl Into<String>) -> Self {
        self.exposed_variable_name = name.into();
        self
    }

    pub fn with_header_name(mut self, name: impl Into<String>) -> Self {
        self.header_name = name.into();
        self
    }

    pub fn with_protected_methods<I, S>(mut self, methods: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.protected_methods = methods.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_exclude_paths<I, S>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exclude_paths = paths.into_iter().map(Into::into).collect();
        self
    }

    /// Reject values no instance can work with
    pub fn validate(&self) -> Result<()> {
        if self.token_length == 0 || self.token_length > MAX_TOKEN_LENGTH {
            return Err(CsrfError::configuration(format!(
                "token length must be between 1 and {MAX_TOKEN_LENGTH} bytes, got {}",
                self.token_length
            )));
        }
        if self.param_name.is_empty() {
            return Err(CsrfError::configuration("param name must not be empty"));
        }
        if self.exposed_variable_name.is_empty() {
            return Err(CsrfError::configuration(
                "exposed variable name must not be empty",
            ));
        }
        if self.header_name.is_empty() {
            return Err(CsrfError::configuration("header name must not be empty"));
        }
        Ok(())
    }
}
