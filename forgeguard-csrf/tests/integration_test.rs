//! Full-pipeline tests: cookie parser, optional session middleware and the
//! three CSRF stages in front of a handler.

use async_trait::async_trait;
use forgeguard_core::{
    CookieOptions, CookieParser, Error, HandlerFn, HttpRequest, HttpResponse, MiddlewareChain,
    handler,
};
use forgeguard_csrf::{
    CookieStorage, CsrfConfig, CsrfError, CsrfProtection, CsrfToken, TokenGenerator,
    TokenStorage, Validation, csrf_token,
};
use forgeguard_session::{MemorySessionStore, SessionConfig, SessionMiddleware};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio_test::{assert_err, assert_ok};

/// Minimal client that keeps cookies between requests
#[derive(Default)]
struct Browser {
    cookies: BTreeMap<String, String>,
}

impl Browser {
    fn request(&self, method: &str, path: &str) -> HttpRequest {
        let req = HttpRequest::new(method, path);
        if self.cookies.is_empty() {
            return req;
        }
        let header = self
            .cookies
            .iter()
            .map(|(name, value)| format!("{name}={value}"))
            .collect::<Vec<_>>()
            .join("; ");
        req.with_header("Cookie", header)
    }

    fn absorb(&mut self, response: &HttpResponse) {
        for line in &response.cookies {
            let pair = line.split(';').next().unwrap_or_default();
            let (name, value) = pair.split_once('=').unwrap();
            let expired = line
                .split(';')
                .any(|attr| attr.trim().eq_ignore_ascii_case("Max-Age=0"));
            if expired || value.is_empty() {
                self.cookies.remove(name);
            } else {
                self.cookies.insert(name.to_string(), value.to_string());
            }
        }
    }

    fn cookie(&self, name: &str) -> Option<&str> {
        self.cookies.get(name).map(String::as_str)
    }
}

/// Echoes the exposed token so tests can read it like a rendered form
fn form_handler() -> HandlerFn {
    handler(|req: HttpRequest| async move {
        let token = csrf_token(&req).unwrap_or_default().to_string();
        Ok(HttpResponse::text(200, token))
    })
}

fn cookie_chain(protection: &Arc<CsrfProtection>) -> MiddlewareChain {
    MiddlewareChain::new()
        .with(CookieParser)
        .with(protection.issuer())
        .with(protection.exposer())
        .with(protection.validator())
}

fn session_chain(protection: &Arc<CsrfProtection>) -> MiddlewareChain {
    let sessions = SessionMiddleware::new(
        Arc::new(MemorySessionStore::new()),
        SessionConfig::default(),
    )
    .unwrap();

    MiddlewareChain::new()
        .with(CookieParser)
        .with(sessions)
        .with(protection.issuer())
        .with(protection.exposer())
        .with(protection.validator())
}

fn cookie_protection() -> Arc<CsrfProtection> {
    Arc::new(CsrfProtection::new(CsrfConfig::cookie(CookieOptions::default())).unwrap())
}

#[tokio::test]
async fn test_cookie_token_is_32_hex_chars_and_set_as_cookie() {
    let protection = cookie_protection();
    let chain = cookie_chain(&protection);

    let response = assert_ok!(
        chain
            .apply(HttpRequest::new("GET", "/form"), form_handler())
            .await
    );

    let token = response.body_text();
    assert_eq!(token.len(), 32);
    assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
    assert_eq!(response.cookies, vec![format!("_csrf={token}")]);
}

#[tokio::test]
async fn test_post_without_token_is_rejected_and_token_survives() {
    let protection = cookie_protection();
    let chain = cookie_chain(&protection);
    let mut browser = Browser::default();

    let form = chain
        .apply(browser.request("GET", "/form"), form_handler())
        .await
        .unwrap();
    browser.absorb(&form);
    let token = form.body_text();

    let response = chain
        .apply(browser.request("POST", "/submit"), form_handler())
        .await
        .unwrap();
    browser.absorb(&response);

    assert_eq!(response.status, 403);
    assert_eq!(response.body_text(), "invalid csrf token");
    assert!(response.cookies.is_empty());
    assert_eq!(browser.cookie("_csrf"), Some(token.as_str()));

    // Re-running issue keeps the same token available for the retry
    let retry = chain
        .apply(browser.request("GET", "/form"), form_handler())
        .await
        .unwrap();
    assert_eq!(retry.body_text(), token);
}

#[tokio::test]
async fn test_matching_token_reaches_handler_and_clears_cookie() {
    let protection = cookie_protection();
    let chain = cookie_chain(&protection);
    let mut browser = Browser::default();

    let form = chain
        .apply(browser.request("GET", "/form"), form_handler())
        .await
        .unwrap();
    browser.absorb(&form);
    let token = form.body_text();

    let submit = browser
        .request("POST", "/submit")
        .with_form(&[("_csrf", token.as_str())])
        .unwrap();
    let response = chain.apply(submit, form_handler()).await.unwrap();
    browser.absorb(&response);

    assert_eq!(response.status, 200);
    assert_eq!(response.cookies.len(), 1);
    assert!(response.cookies[0].contains("Max-Age=0"));
    assert_eq!(browser.cookie("_csrf"), None);

    // Same submission again from a client that honored the expiring
    // Set-Cookie: the token has been consumed. A client replaying the old
    // Cookie header verbatim would pass again, which cookie storage cannot
    // detect without server-side state.
    let replay = browser
        .request("POST", "/submit")
        .with_form(&[("_csrf", token.as_str())])
        .unwrap();
    let response = chain.apply(replay, form_handler()).await.unwrap();
    assert_eq!(response.status, 403);
}

#[tokio::test]
async fn test_get_without_any_token_proceeds() {
    let protection = cookie_protection();
    let chain = MiddlewareChain::new()
        .with(CookieParser)
        .with(protection.validator());

    let response = chain
        .apply(HttpRequest::new("GET", "/"), form_handler())
        .await
        .unwrap();
    assert_eq!(response.status, 200);
}

#[tokio::test]
async fn test_header_token_is_accepted() {
    let protection = cookie_protection();
    let chain = cookie_chain(&protection);
    let mut browser = Browser::default();

    let form = chain
        .apply(browser.request("GET", "/form"), form_handler())
        .await
        .unwrap();
    browser.absorb(&form);

    let submit = browser
        .request("DELETE", "/items/1")
        .with_header("CSRF-Token", form.body_text());
    let response = chain.apply(submit, form_handler()).await.unwrap();
    assert_eq!(response.status, 200);
}

#[tokio::test]
async fn test_session_storage_enforces_single_use() {
    let protection = Arc::new(CsrfProtection::new(CsrfConfig::session()).unwrap());
    let chain = session_chain(&protection);
    let mut browser = Browser::default();

    let form = chain
        .apply(browser.request("GET", "/form"), form_handler())
        .await
        .unwrap();
    browser.absorb(&form);
    let token = form.body_text();

    assert_eq!(token.len(), 32);
    assert!(browser.cookie("sid").is_some());
    assert!(browser.cookie("_csrf").is_none());

    let submit = browser
        .request("POST", "/submit")
        .with_header("csrf-token", token.clone());
    let response = chain.apply(submit.clone(), form_handler()).await.unwrap();
    assert_eq!(response.status, 200);

    // Identical replay: same session cookie, same token
    let response = chain.apply(submit, form_handler()).await.unwrap();
    assert_eq!(response.status, 403);
}

#[tokio::test]
async fn test_missing_session_middleware_is_configuration_error() {
    let protection = Arc::new(CsrfProtection::new(CsrfConfig::session()).unwrap());
    let chain = cookie_chain(&protection);

    let err = assert_err!(
        chain
            .apply(HttpRequest::new("POST", "/submit"), form_handler())
            .await
    );
    assert!(matches!(err, Error::Configuration(_)));
    assert_ne!(err.status_code(), 403);
}

#[tokio::test]
async fn test_missing_cookie_parser_is_configuration_error() {
    let protection = cookie_protection();
    let chain = MiddlewareChain::new().with(protection.validator());

    let err = assert_err!(
        chain
            .apply(HttpRequest::new("POST", "/submit"), form_handler())
            .await
    );
    assert!(matches!(err, Error::Configuration(_)));
}

#[tokio::test]
async fn test_generation_failure_is_internal_error() {
    struct Exhausted;

    impl TokenGenerator for Exhausted {
        fn generate(&self, _byte_length: usize) -> forgeguard_csrf::Result<CsrfToken> {
            Err(CsrfError::Generation("no entropy".into()))
        }
    }

    let protection = Arc::new(
        CsrfProtection::new(CsrfConfig::cookie(CookieOptions::default()))
            .unwrap()
            .with_generator(Exhausted),
    );
    let chain = cookie_chain(&protection);

    let err = assert_err!(
        chain
            .apply(HttpRequest::new("GET", "/form"), form_handler())
            .await
    );
    assert!(matches!(err, Error::Internal(_)));
}

/// Cookie storage that counts every access
struct CountingStorage {
    inner: CookieStorage,
    reads: AtomicUsize,
    writes: AtomicUsize,
    clears: AtomicUsize,
}

impl CountingStorage {
    fn new() -> Self {
        Self {
            inner: CookieStorage::new("_csrf", CookieOptions::default()),
            reads: AtomicUsize::new(0),
            writes: AtomicUsize::new(0),
            clears: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl TokenStorage for CountingStorage {
    fn kind(&self) -> &'static str {
        "counting"
    }

    fn ensure_available(&self, request: &HttpRequest) -> forgeguard_csrf::Result<()> {
        self.inner.ensure_available(request)
    }

    async fn read(&self, request: &HttpRequest) -> forgeguard_csrf::Result<Option<CsrfToken>> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.inner.read(request).await
    }

    async fn write(&self, request: &HttpRequest, token: &CsrfToken) -> forgeguard_csrf::Result<()> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.inner.write(request, token).await
    }

    async fn clear(&self, request: &HttpRequest) -> forgeguard_csrf::Result<()> {
        self.clears.fetch_add(1, Ordering::SeqCst);
        self.inner.clear(request).await
    }
}

#[tokio::test]
async fn test_unprotected_requests_never_touch_storage() {
    let storage = Arc::new(CountingStorage::new());
    let protection = Arc::new(
        CsrfProtection::new(CsrfConfig::cookie(CookieOptions::default()))
            .unwrap()
            .with_storage(storage.clone()),
    );
    let chain = MiddlewareChain::new()
        .with(CookieParser)
        .with(protection.validator());

    for method in ["GET", "HEAD", "OPTIONS", "PATCH"] {
        let req = HttpRequest::new(method, "/").with_header("Cookie", "_csrf=abc");
        let response = chain.apply(req, form_handler()).await.unwrap();
        assert_eq!(response.status, 200);
    }

    assert_eq!(storage.reads.load(Ordering::SeqCst), 0);
    assert_eq!(storage.writes.load(Ordering::SeqCst), 0);
    assert_eq!(storage.clears.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_issue_twice_writes_once() {
    let storage = Arc::new(CountingStorage::new());
    let protection = CsrfProtection::new(CsrfConfig::cookie(CookieOptions::default()))
        .unwrap()
        .with_storage(storage.clone());

    let mut req = HttpRequest::new("GET", "/");
    req.extensions.insert(forgeguard_core::Cookies::new());

    let first = protection.issue(&mut req).await.unwrap();
    let second = protection.issue(&mut req).await.unwrap();
    assert_eq!(first, second);
    assert_eq!(storage.writes.load(Ordering::SeqCst), 1);

    let exposed = protection.expose(&mut req).await.unwrap();
    assert_eq!(exposed, Some(first.clone()));

    let mut post = req.with_header("csrf-token", first.as_str());
    post.method = "POST".to_string();
    assert_eq!(protection.validate(&post).await.unwrap(), Validation::Passed);
    assert_eq!(storage.clears.load(Ordering::SeqCst), 1);
}

/// Storage whose backend is down
struct UnreachableStorage;

#[async_trait]
impl TokenStorage for UnreachableStorage {
    fn kind(&self) -> &'static str {
        "unreachable"
    }

    fn ensure_available(&self, _request: &HttpRequest) -> forgeguard_csrf::Result<()> {
        Ok(())
    }

    async fn read(&self, _request: &HttpRequest) -> forgeguard_csrf::Result<Option<CsrfToken>> {
        Err(CsrfError::Storage("token store unreachable".into()))
    }

    async fn write(
        &self,
        _request: &HttpRequest,
        _token: &CsrfToken,
    ) -> forgeguard_csrf::Result<()> {
        Err(CsrfError::Storage("token store unreachable".into()))
    }

    async fn clear(&self, _request: &HttpRequest) -> forgeguard_csrf::Result<()> {
        Err(CsrfError::Storage("token store unreachable".into()))
    }
}

fn counting_handler(calls: Arc<AtomicUsize>) -> HandlerFn {
    handler(move |_req: HttpRequest| {
        let calls = calls.clone();
        async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(HttpResponse::ok())
        }
    })
}

#[tokio::test]
async fn test_storage_failure_is_internal_error_not_403() {
    let protection = Arc::new(
        CsrfProtection::new(CsrfConfig::cookie(CookieOptions::default()))
            .unwrap()
            .with_storage(Arc::new(UnreachableStorage)),
    );
    let calls = Arc::new(AtomicUsize::new(0));

    let validate_only = MiddlewareChain::new()
        .with(CookieParser)
        .with(protection.validator());
    let submit = HttpRequest::new("POST", "/submit").with_header("csrf-token", "abcd");
    let err = assert_err!(
        validate_only
            .apply(submit, counting_handler(calls.clone()))
            .await
    );
    assert!(matches!(err, Error::Internal(_)));
    assert_ne!(err.status_code(), 403);

    let err = assert_err!(
        cookie_chain(&protection)
            .apply(
                HttpRequest::new("GET", "/form"),
                counting_handler(calls.clone()),
            )
            .await
    );
    assert!(matches!(err, Error::Internal(_)));

    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_independent_instances_coexist() {
    let admin = Arc::new(
        CsrfProtection::new(
            CsrfConfig::cookie(CookieOptions::default())
                .with_param_name("_admin_csrf")
                .with_exposed_variable_name("adminToken")
                .with_token_length(32),
        )
        .unwrap(),
    );
    let public = cookie_protection();

    let exposer = admin.clone();
    let admin_handler = handler(move |req: HttpRequest| {
        let exposer = exposer.clone();
        async move {
            let token = exposer.exposed_token(&req).unwrap_or_default().to_string();
            Ok(HttpResponse::text(200, token))
        }
    });

    let admin_form = cookie_chain(&admin)
        .apply(HttpRequest::new("GET", "/admin"), admin_handler)
        .await
        .unwrap();
    let public_form = cookie_chain(&public)
        .apply(HttpRequest::new("GET", "/"), form_handler())
        .await
        .unwrap();

    assert_eq!(admin_form.body_text().len(), 64);
    assert_eq!(public_form.body_text().len(), 32);
    assert!(admin_form.cookies[0].starts_with("_admin_csrf="));
    assert!(public_form.cookies[0].starts_with("_csrf="));
}
