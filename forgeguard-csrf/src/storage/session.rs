use super::TokenStorage;
use crate::error::{CsrfError, Result};
use crate::token::CsrfToken;
use async_trait::async_trait;
use forgeguard_core::HttpRequest;
use forgeguard_session::SessionHandle;
use tracing::trace;

/// Keeps the canonical token in the request's session under `key`.
///
/// Requires [`SessionMiddleware`](forgeguard_session::SessionMiddleware)
/// upstream.
#[derive(Debug, Clone)]
pub struct SessionStorage {
    key: String,
}

impl SessionStorage {
    pub fn new(key: impl Into<String>) -> Self {
        Self { key: key.into() }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    fn handle<'a>(&self, request: &'a HttpRequest) -> Result<&'a SessionHandle> {
        request.extensions.get::<SessionHandle>().ok_or_else(|| {
            CsrfError::configuration("session middleware must run before CSRF protection")
        })
    }
}

#[async_trait]
impl TokenStorage for SessionStorage {
    fn kind(&self) -> &'static str {
        "session"
    }

    fn ensure_available(&self, request: &HttpRequest) -> Result<()> {
        self.handle(request).map(|_| ())
    }

    async fn read(&self, request: &HttpRequest) -> Result<Option<CsrfToken>> {
        let value: Option<String> = self.handle(request)?.get(&self.key);
        Ok(value.filter(|v| !v.is_empty()).map(CsrfToken::from))
    }

    async fn write(&self, request: &HttpRequest, token: &CsrfToken) -> Result<()> {
        let handle = self.handle(request)?;
        handle.set(&self.key, token.as_str())?;
        trace!(session_id = %handle.id(), key = %self.key, "Stored CSRF token in session");
        Ok(())
    }

    async fn clear(&self, request: &HttpRequest) -> Result<()> {
        let handle = self.handle(request)?;
        if handle.remove(&self.key) {
            trace!(session_id = %handle.id(), key = %self.key, "Cleared CSRF token from session");
        }
        Ok(())
    }
}
