//! # Forgeguard CSRF Protection
//!
//! Single-use anti-forgery tokens for the forgeguard request pipeline.
//!
//! ## Features
//!
//! - ✅ **Synchronizer Tokens** - Random hex tokens from the OS CSPRNG
//! - ✅ **Single Use** - A token is cleared as soon as it validates
//! - ✅ **Session or Cookie Storage** - Plus custom backends via [`TokenStorage`]
//! - ✅ **Constant-time Comparison** - Backed by `subtle`
//! - ✅ **Pluggable Policy** - Replace which requests are checked, where the
//!   token is read from, and the rejection response
//! - ✅ **Per-instance Configuration** - No global state
//!
//! ## Quick Start
//!
//! ```rust
//! use forgeguard_core::{CookieOptions, CookieParser, HttpRequest, HttpResponse, MiddlewareChain, handler};
//! use forgeguard_csrf::{CsrfConfig, CsrfProtection, csrf_token};
//! use std::sync::Arc;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let csrf = Arc::new(CsrfProtection::new(
//!     CsrfConfig::cookie(CookieOptions::new().with_http_only(true)),
//! )?);
//!
//! let chain = MiddlewareChain::new()
//!     .with(CookieParser)
//!     .with(csrf.issuer())
//!     .with(csrf.exposer())
//!     .with(csrf.validator());
//!
//! // A GET is not protected; the form handler reads the exposed token
//! let response = chain
//!     .apply(
//!         HttpRequest::new("GET", "/form"),
//!         handler(|req| async move {
//!             let token = csrf_token(&req).unwrap_or_default().to_string();
//!             Ok(HttpResponse::text(200, token))
//!         }),
//!     )
//!     .await?;
//!
//! assert_eq!(response.status, 200);
//! assert_eq!(response.body_text().len(), 32);
//! assert_eq!(response.cookies.len(), 1);
//! # Ok(())
//! # }
//! ```
//!
//! ## Token Generation
//!
//! ```rust
//! use forgeguard_csrf::CsrfToken;
//!
//! let token = CsrfToken::generate(16).unwrap();
//! assert_eq!(token.as_str().len(), 32);
//!
//! // Zero-length tokens are a configuration error
//! assert!(CsrfToken::generate(0).is_err());
//! ```
//!
//! ## Custom Policy
//!
//! ```rust
//! use forgeguard_core::HttpResponse;
//! use forgeguard_csrf::{CsrfConfig, CsrfProtection, CustomPolicy, DefaultPolicy, TokenSource};
//!
//! let config = CsrfConfig::session().with_exclude_paths(["/webhooks"]);
//!
//! let policy = CustomPolicy::new(
//!     DefaultPolicy::from_config(&config)
//!         .with_protected_methods(["POST", "PUT", "PATCH", "DELETE"])
//!         .with_source(TokenSource::Query("_csrf".into())),
//! )
//! .on_rejected(|_req, _reason| HttpResponse::text(403, "form expired, please reload"));
//!
//! let csrf = CsrfProtection::new(config).unwrap().with_policy(policy);
//! ```

pub mod config;
pub mod error;
pub mod middleware;
pub mod policy;
pub mod protection;
pub mod storage;
pub mod token;

pub use config::{CsrfConfig, MAX_TOKEN_LENGTH, StorageKind};
pub use error::{CsrfError, Result};
pub use middleware::{ExposeMiddleware, IssueMiddleware, ValidateMiddleware};
pub use policy::{CustomPolicy, DefaultPolicy, ProtectionPolicy, Rejection, TokenSource};
pub use protection::{CsrfProtection, IssuedToken, Validation, csrf_token};
pub use storage::{ConsumeOutcome, CookieStorage, SessionStorage, TokenStorage};
pub use token::{CsrfToken, RandomTokenGenerator, TokenGenerator, constant_time_eq};
