//! Session support for forgeguard pipelines.
//!
//! [`SessionMiddleware`] loads the session named by the session cookie from
//! a [`SessionStore`] and attaches a [`SessionHandle`] to the request.
//! Downstream middleware read and write keys on the handle; the middleware
//! persists the session after the response has been produced.
//!
//! Persistence is delegated to the store. [`MemorySessionStore`] is
//! provided for tests and single-process development.
//!
//! ```no_run
//! use forgeguard_core::MiddlewareChain;
//! use forgeguard_session::*;
//! use std::sync::Arc;
//!
//! # fn main() -> Result<(), SessionError> {
//! let store = Arc::new(MemorySessionStore::new());
//! let chain = MiddlewareChain::new()
//!     .with(SessionMiddleware::new(store, SessionConfig::default())?);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod memory;
pub mod middleware;
pub mod traits;

pub use config::SessionConfig;
pub use error::{SessionError, SessionResult};
pub use memory::MemorySessionStore;
pub use middleware::{SessionHandle, SessionMiddleware};
pub use traits::{Session, SessionStore, generate_session_id};
