//! Request-scoped cookie jar and the middleware that parses it.
//!
//! [`CookieParser`] reads the `Cookie` header once per request, attaches a
//! [`Cookies`] jar to the request extensions and, once the downstream
//! pipeline has produced a response, appends one `Set-Cookie` line per
//! cookie that was added or removed while handling the request.

use crate::{Error, HttpRequest, HttpResponse, Middleware, Next};
use async_trait::async_trait;
use cookie::{Cookie, CookieJar};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, trace};

/// Cookie SameSite attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SameSite {
    Strict,
    Lax,
    None,
}

impl SameSite {
    pub fn as_str(&self) -> &'static str {
        match self {
            SameSite::Strict => "Strict",
            SameSite::Lax => "Lax",
            SameSite::None => "None",
        }
    }
}

impl From<SameSite> for cookie::SameSite {
    fn from(value: SameSite) -> Self {
        match value {
            SameSite::Strict => cookie::SameSite::Strict,
            SameSite::Lax => cookie::SameSite::Lax,
            SameSite::None => cookie::SameSite::None,
        }
    }
}

/// Attributes applied to a cookie when it is set.
///
/// Every attribute is opt-in: the default produces a bare `name=value`
/// cookie with no attributes at all.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CookieOptions {
    /// Cookie domain
    pub domain: Option<String>,

    /// Cookie path
    pub path: Option<String>,

    /// Max-Age in seconds
    pub max_age: Option<i64>,

    /// Secure flag (HTTPS only)
    pub secure: bool,

    /// HttpOnly flag
    pub http_only: bool,

    /// SameSite policy
    pub same_site: Option<SameSite>,
}

impl CookieOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn with_max_age(mut self, seconds: i64) -> Self {
        self.max_age = Some(seconds);
        self
    }

    pub fn with_secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    pub fn with_http_only(mut self, http_only: bool) -> Self {
        self.http_only = http_only;
        self
    }

    pub fn with_same_site(mut self, same_site: SameSite) -> Self {
        self.same_site = Some(same_site);
        self
    }

    /// Build a cookie carrying exactly these attributes
    pub fn build(&self, name: &str, value: &str) -> Cookie<'static> {
        let mut builder = Cookie::build((name.to_string(), value.to_string()));

        if let Some(ref domain) = self.domain {
            builder = builder.domain(domain.clone());
        }
        if let Some(ref path) = self.path {
            builder = builder.path(path.clone());
        }
        if let Some(seconds) = self.max_age {
            builder = builder.max_age(cookie::time::Duration::seconds(seconds));
        }
        if self.secure {
            builder = builder.secure(true);
        }
        if self.http_only {
            builder = builder.http_only(true);
        }
        if let Some(same_site) = self.same_site {
            builder = builder.same_site(same_site.into());
        }

        builder.build()
    }

    /// Cookie used to expire `name`; domain and path must match the original
    pub fn removal(&self, name: &str) -> Cookie<'static> {
        let mut builder = Cookie::build(name.to_string());

        if let Some(ref domain) = self.domain {
            builder = builder.domain(domain.clone());
        }
        if let Some(ref path) = self.path {
            builder = builder.path(path.clone());
        }

        builder.build()
    }
}

/// Cookie jar for a single request.
///
/// Clones share the same jar, so a write made by one middleware is visible
/// to every later reader and is flushed by [`CookieParser`].
#[derive(Clone, Default)]
pub struct Cookies {
    jar: Arc<Mutex<CookieJar>>,
}

impl Cookies {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a `Cookie` request header. Malformed pairs are skipped.
    pub fn from_header(header: Option<&str>) -> Self {
        let mut jar = CookieJar::new();

        if let Some(header) = header {
            for cookie in Cookie::split_parse_encoded(header) {
                match cookie {
                    Ok(cookie) => jar.add_original(cookie.into_owned()),
                    Err(error) => debug!(%error, "failed to decode cookie"),
                }
            }
        }

        Self {
            jar: Arc::new(Mutex::new(jar)),
        }
    }

    /// Current value of `name`, including changes made during this request
    pub fn get(&self, name: &str) -> Option<String> {
        self.jar.lock().get(name).map(|c| c.value().to_string())
    }

    pub fn set(&self, cookie: Cookie<'static>) {
        trace!(name = %cookie.name(), "Setting cookie");
        self.jar.lock().add(cookie);
    }

    /// Remove a cookie; the client is told to expire it if it sent one
    pub fn remove(&self, cookie: Cookie<'static>) {
        trace!(name = %cookie.name(), "Removing cookie");
        self.jar.lock().remove(cookie);
    }

    /// `Set-Cookie` values for every change made during this request
    pub fn set_cookie_headers(&self) -> Vec<String> {
        self.jar
            .lock()
            .delta()
            .map(|c| c.encoded().to_string())
            .collect()
    }
}

impl std::fmt::Debug for Cookies {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cookies")
            .field("count", &self.jar.lock().iter().count())
            .finish()
    }
}

/// Cookie-parsing middleware
///
/// Must run before anything that reads or writes cookies through
/// [`Cookies`].
#[derive(Debug, Clone, Copy, Default)]
pub struct CookieParser;

#[async_trait]
impl Middleware for CookieParser {
    async fn handle(&self, mut req: HttpRequest, next: Next) -> Result<HttpResponse, Error> {
        let cookies = Cookies::from_header(req.header("cookie"));
        req.extensions.insert(cookies.clone());

        let mut response = next(req).await?;
        response.cookies.extend(cookies.set_cookie_headers());

        Ok(response)
    }
}
