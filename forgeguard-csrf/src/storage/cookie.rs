use super::TokenStorage;
use crate::error::{CsrfError, Result};
use crate::token::CsrfToken;
use async_trait::async_trait;
use forgeguard_core::{CookieOptions, Cookies, HttpRequest};
use tracing::trace;

/// Keeps the canonical token in a cookie named `name`.
///
/// Requires [`CookieParser`](forgeguard_core::CookieParser) upstream; the
/// parser flushes writes and removals as `Set-Cookie` headers.
///
/// Clearing only tells the client to expire the cookie. A client that
/// ignores that and replays the old cookie together with the old token
/// cannot be told apart from a fresh submission; use [`SessionStorage`]
/// when strict single use matters.
///
/// [`SessionStorage`]: super::SessionStorage
#[derive(Debug, Clone)]
pub struct CookieStorage {
    name: String,
    options: CookieOptions,
}

impl CookieStorage {
    pub fn new(name: impl Into<String>, options: CookieOptions) -> Self {
        Self {
            name: name.into(),
            options,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn options(&self) -> &CookieOptions {
        &self.options
    }

    fn jar<'a>(&self, request: &'a HttpRequest) -> Result<&'a Cookies> {
        request.extensions.get::<Cookies>().ok_or_else(|| {
            CsrfError::configuration("cookie parser must run before CSRF protection")
        })
    }
}

#[async_trait]
impl TokenStorage for CookieStorage {
    fn kind(&self) -> &'static str {
        "cookie"
    }

    fn ensure_available(&self, request: &HttpRequest) -> Result<()> {
        self.jar(request).map(|_| ())
    }

    async fn read(&self, request: &HttpRequest) -> Result<Option<CsrfToken>> {
        let value = self.jar(request)?.get(&self.name);
        Ok(value.filter(|v| !v.is_empty()).map(CsrfToken::from))
    }

    async fn write(&self, request: &HttpRequest, token: &CsrfToken) -> Result<()> {
        self.jar(request)?.set(self.options.build(&self.name, token.as_str()));
        trace!(cookie = %self.name, "Stored CSRF token in cookie");
        Ok(())
    }

    async fn clear(&self, request: &HttpRequest) -> Result<()> {
        self.jar(request)?.remove(self.options.removal(&self.name));
        trace!(cookie = %self.name, "Cleared CSRF cookie");
        Ok(())
    }
}
