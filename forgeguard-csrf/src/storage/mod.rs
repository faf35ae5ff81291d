//! Backing stores for the canonical token.
//!
//! A [`TokenStorage`] owns the canonical token between requests. Two
//! variants ship with the crate: [`SessionStorage`] keeps it in the request's
//! session and [`CookieStorage`] keeps it in a cookie on the client. Any
//! other backend (a detached token store, say) plugs in by implementing the
//! trait and passing it to
//! [`CsrfProtection::with_storage`](crate::CsrfProtection::with_storage).

mod cookie;
mod session;

pub use cookie::CookieStorage;
pub use session::SessionStorage;

use crate::config::{CsrfConfig, StorageKind};
use crate::error::Result;
use crate::token::CsrfToken;
use async_trait::async_trait;
use forgeguard_core::HttpRequest;
use std::sync::Arc;

/// Result of [`TokenStorage::consume`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsumeOutcome {
    /// The submitted token matched and the canonical token was cleared
    Consumed,
    /// A canonical token exists but differs; it is left in place
    Mismatch,
    /// No canonical token in this scope
    Absent,
}

/// Read, write and clear the canonical token for one request's scope
#[async_trait]
pub trait TokenStorage: Send + Sync {
    /// Short name used in logs
    fn kind(&self) -> &'static str;

    /// Fail with a configuration error if the backend this storage needs
    /// was not attached to the request upstream
    fn ensure_available(&self, request: &HttpRequest) -> Result<()>;

    async fn read(&self, request: &HttpRequest) -> Result<Option<CsrfToken>>;

    async fn write(&self, request: &HttpRequest, token: &CsrfToken) -> Result<()>;

    async fn clear(&self, request: &HttpRequest) -> Result<()>;

    /// Compare `submitted` against the canonical token and clear it on a
    /// match.
    ///
    /// The default is read, compare, clear, which is not atomic: two
    /// concurrent requests in the same scope can both read the same token
    /// before either clears it. Backends with transactional primitives
    /// should override this with a single compare-and-delete.
    async fn consume(
        &self,
        request: &HttpRequest,
        submitted: &CsrfToken,
    ) -> Result<ConsumeOutcome> {
        let Some(canonical) = self.read(request).await? else {
            return Ok(ConsumeOutcome::Absent);
        };

        if !canonical.matches(submitted.as_str()) {
            return Ok(ConsumeOutcome::Mismatch);
        }

        self.clear(request).await?;
        Ok(ConsumeOutcome::Consumed)
    }
}

/// Build the storage variant selected by `config`
pub fn for_config(config: &CsrfConfig) -> Arc<dyn TokenStorage> {
    match config.storage {
        StorageKind::Session => Arc::new(SessionStorage::new(config.param_name.clone())),
        StorageKind::Cookie => Arc::new(CookieStorage::new(
            config.param_name.clone(),
            config.cookie.clone(),
        )),
    }
}
