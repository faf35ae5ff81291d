// Core pipeline primitives for forgeguard
// Request/response types, the middleware chain, cookies, and logging setup

pub mod cookies;
pub mod error;
pub mod extensions;
pub mod http;
pub mod logging;
pub mod middleware;

// Re-export commonly used types
pub use cookies::{CookieOptions, CookieParser, Cookies, SameSite};
pub use error::{Error, Result};
pub use extensions::Extensions;
pub use http::{HttpRequest, HttpResponse};
pub use middleware::{BoxFuture, HandlerFn, Middleware, MiddlewareChain, Next, handler};
