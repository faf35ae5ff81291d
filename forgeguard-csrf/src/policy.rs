//! Decision hooks: which requests are validated, where the submitted token
//! is read from, and what a rejected request gets back.

use crate::config::CsrfConfig;
use crate::token::CsrfToken;
use async_trait::async_trait;
use forgeguard_core::{Error, HttpRequest, HttpResponse};
use std::sync::Arc;

/// Body of the default 403 response
pub const DEFAULT_REJECTION_MESSAGE: &str = "invalid csrf token";

/// Why a protected request was turned away.
///
/// The default response is the same for every reason so a client cannot
/// probe which one applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// The request carried no token in any configured source
    MissingToken,
    /// A token was submitted but none is stored for this scope
    MissingCanonical,
    /// The submitted token differs from the stored one
    Mismatch,
}

impl Rejection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Rejection::MissingToken => "missing_token",
            Rejection::MissingCanonical => "missing_canonical",
            Rejection::Mismatch => "mismatch",
        }
    }
}

impl std::fmt::Display for Rejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A place a client may put its token
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenSource {
    /// Form or JSON body field
    BodyField(String),
    /// Request header, matched case-insensitively
    Header(String),
    /// Query-string parameter
    Query(String),
}

impl TokenSource {
    /// Value at this source; empty values count as absent
    pub fn extract(&self, request: &HttpRequest) -> Option<String> {
        let value = match self {
            TokenSource::BodyField(name) => request.body_field(name),
            TokenSource::Header(name) => request.header(name).map(str::to_string),
            TokenSource::Query(name) => request.query(name).map(str::to_string),
        };
        value.filter(|v| !v.is_empty())
    }
}

/// The three hooks consulted by [`CsrfProtection`](crate::CsrfProtection)
#[async_trait]
pub trait ProtectionPolicy: Send + Sync {
    /// Whether `request` must carry a valid token
    fn should_protect(&self, request: &HttpRequest) -> bool;

    /// The token the client submitted, if any
    fn extract_submitted_token(&self, request: &HttpRequest) -> Option<CsrfToken>;

    /// Response for a rejected request.
    ///
    /// This is terminal: the downstream handler never runs. Returning `Err`
    /// hands the failure to the host's error handling instead.
    async fn on_rejected(
        &self,
        request: &HttpRequest,
        rejection: Rejection,
    ) -> Result<HttpResponse, Error>;
}

/// Method and path based policy.
///
/// Protects POST, PUT and DELETE outside the excluded path prefixes, reads
/// the token from the sources in order (body field, then header, unless
/// configured otherwise) and answers rejections with a plain-text 403.
#[derive(Debug, Clone)]
pub struct DefaultPolicy {
    protected_methods: Vec<String>,
    exclude_paths: Vec<String>,
    sources: Vec<TokenSource>,
    rejection_message: String,
}

impl Default for DefaultPolicy {
    fn default() -> Self {
        Self::from_config(&CsrfConfig::default())
    }
}

impl DefaultPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &CsrfConfig) -> Self {
        Self {
            protected_methods: config.protected_methods.clone(),
            exclude_paths: config.exclude_paths.clone(),
            sources: vec![
                TokenSource::BodyField(config.param_name.clone()),
                TokenSource::Header(config.header_name.clone()),
            ],
            rejection_message: DEFAULT_REJECTION_MESSAGE.to_string(),
        }
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

    /// Replace the token sources; they are consulted in the given order
    pub fn with_sources(mut self, sources: Vec<TokenSource>) -> Self {
        self.sources = sources;
        self
    }

    /// Append a source after the existing ones
    pub fn with_source(mut self, source: TokenSource) -> Self {
        self.sources.push(source);
        self
    }

    pub fn with_rejection_message(mut self, message: impl Into<String>) -> Self {
        self.rejection_message = message.into();
        self
    }

    pub fn sources(&self) -> &[TokenSource] {
        &self.sources
    }

    fn is_excluded(&self, path: &str) -> bool {
        self.exclude_paths
            .iter()
            .any(|excluded| path.starts_with(excluded.as_str()))
    }
}

#[async_trait]
impl ProtectionPolicy for DefaultPolicy {
    fn should_protect(&self, request: &HttpRequest) -> bool {
        if !self.protected_methods.iter().any(|m| request.method_is(m)) {
            return false;
        }
        !self.is_excluded(&request.path)
    }

    fn extract_submitted_token(&self, request: &HttpRequest) -> Option<CsrfToken> {
        self.sources
            .iter()
            .find_map(|source| source.extract(request))
            .map(CsrfToken::from)
    }

    async fn on_rejected(
        &self,
        _request: &HttpRequest,
        _rejection: Rejection,
    ) -> Result<HttpResponse, Error> {
        Ok(HttpResponse::text(403, self.rejection_message.clone()))
    }
}

pub type ShouldProtectFn = Arc<dyn Fn(&HttpRequest) -> bool + Send + Sync>;
pub type ExtractTokenFn = Arc<dyn Fn(&HttpRequest) -> Option<String> + Send + Sync>;
pub type RejectFn = Arc<dyn Fn(&HttpRequest, Rejection) -> HttpResponse + Send + Sync>;

/// Policy built from closures; any hook left unset falls back to a
/// [`DefaultPolicy`].
///
/// ```
/// use forgeguard_csrf::{CustomPolicy, DefaultPolicy, ProtectionPolicy};
/// use forgeguard_core::HttpRequest;
///
/// let policy = CustomPolicy::new(DefaultPolicy::new())
///     .should_protect(|req| !req.path.starts_with("/hooks/"));
///
/// assert!(!ProtectionPolicy::should_protect(&policy, &HttpRequest::new("POST", "/hooks/stripe")));
/// ```
#[derive(Clone)]
pub struct CustomPolicy {
    fallback: DefaultPolicy,
    should_protect: Option<ShouldProtectFn>,
    extract_token: Option<ExtractTokenFn>,
    on_rejected: Option<RejectFn>,
}

impl CustomPolicy {
    pub fn new(fallback: DefaultPolicy) -> Self {
        Self {
            fallback,
            should_protect: None,
            extract_token: None,
            on_rejected: None,
        }
    }

    pub fn should_protect<F>(mut self, f: F) -> Self
    where
        F: Fn(&HttpRequest) -> bool + Send + Sync + 'static,
    {
        self.should_protect = Some(Arc::new(f));
        self
    }

    pub fn extract_token<F>(mut self, f: F) -> Self
    where
        F: Fn(&HttpRequest) -> Option<String> + Send + Sync + 'static,
    {
        self.extract_token = Some(Arc::new(f));
        self
    }

    pub fn on_rejected<F>(mut self, f: F) -> Self
    where
        F: Fn(&HttpRequest, Rejection) -> HttpResponse + Send + Sync + 'static,
    {
        self.on_rejected = Some(Arc::new(f));
        self
    }
}

impl Default for CustomPolicy {
    fn default() -> Self {
        Self::new(DefaultPolicy::default())
    }
}

impl std::fmt::Debug for CustomPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CustomPolicy")
            .field("fallback", &self.fallback)
            .field("should_protect", &self.should_protect.is_some())
            .field("extract_token", &self.extract_token.is_some())
            .field("on_rejected", &self.on_rejected.is_some())
            .finish()
    }
}

#[async_trait]
impl ProtectionPolicy for CustomPolicy {
    fn should_protect(&self, request: &HttpRequest) -> bool {
        match &self.should_protect {
            Some(f) => f(request),
            None => self.fallback.should_protect(request),
        }
    }

    fn extract_submitted_token(&self, request: &HttpRequest) -> Option<CsrfToken> {
        match &self.extract_token {
            Some(f) => f(request).filter(|v| !v.is_empty()).map(CsrfToken::from),
            None => self.fallback.extract_submitted_token(request),
        }
    }

    async fn on_rejected(
        &self,
        request: &HttpRequest,
        rejection: Rejection,
    ) -> Result<HttpResponse, Error> {
        match &self.on_rejected {
            Some(f) => Ok(f(request, rejection)),
            None => self.fallback.on_rejected(request, rejection).await,
        }
    }
}
