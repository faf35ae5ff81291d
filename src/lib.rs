// Forgeguard - cross-site request forgery protection for async request pipelines
//
// This crate bundles the pipeline primitives, the session layer and the
// CSRF token lifecycle behind a single dependency.

// Re-export core functionality
pub use forgeguard_core::*;

pub use forgeguard_csrf as csrf;
pub use forgeguard_session as session;

// Implementing `TokenStorage` or `SessionStore` needs this
pub use async_trait::async_trait;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{
        CookieOptions, CookieParser, Cookies, Error, HttpRequest, HttpResponse, Middleware,
        MiddlewareChain, Next, SameSite, async_trait, handler,
    };

    pub use forgeguard_core::logging::{LogConfig, LogFormat, LogLevel};

    pub use forgeguard_csrf::{
        CsrfConfig, CsrfError, CsrfProtection, CsrfToken, CustomPolicy, DefaultPolicy,
        ProtectionPolicy, Rejection, StorageKind, TokenSource, TokenStorage, Validation,
        csrf_token,
    };

    pub use forgeguard_session::{
        MemorySessionStore, SessionConfig, SessionHandle, SessionMiddleware, SessionStore,
    };
}
