use crate::protection::{CsrfProtection, Validation};
use async_trait::async_trait;
use forgeguard_core::{Error, HttpRequest, HttpResponse, Middleware, Next};
use std::sync::Arc;
use tracing::warn;

fn log_failure(stage: &'static str, err: crate::CsrfError) -> Error {
    if err.is_configuration() {
        warn!(stage, error = %err, "CSRF protection misconfigured");
    }
    err.into()
}

/// Mints a token for requests that have none, then continues
#[derive(Debug, Clone)]
pub struct IssueMiddleware {
    protection: Arc<CsrfProtection>,
}

impl IssueMiddleware {
    pub fn new(protection: Arc<CsrfProtection>) -> Self {
        Self { protection }
    }
}

#[async_trait]
impl Middleware for IssueMiddleware {
    async fn handle(&self, mut req: HttpRequest, next: Next) -> Result<HttpResponse, Error> {
        self.protection
            .issue(&mut req)
            .await
            .map_err(|e| log_failure("issue", e))?;
        next(req).await
    }
}

/// Copies the current token into the request locals, then continues
#[derive(Debug, Clone)]
pub struct ExposeMiddleware {
    protection: Arc<CsrfProtection>,
}

impl ExposeMiddleware {
    pub fn new(protection: Arc<CsrfProtection>) -> Self {
        Self { protection }
    }
}

#[async_trait]
impl Middleware for ExposeMiddleware {
    async fn handle(&self, mut req: HttpRequest, next: Next) -> Result<HttpResponse, Error> {
        self.protection
            .expose(&mut req)
            .await
            .map_err(|e| log_failure("expose", e))?;
        next(req).await
    }
}

/// Lets a request through only if it carries the stored token.
///
/// Rejected requests get the policy's response and never reach `next`.
#[derive(Debug, Clone)]
pub struct ValidateMiddleware {
    protection: Arc<CsrfProtection>,
}

impl ValidateMiddleware {
    pub fn new(protection: Arc<CsrfProtection>) -> Self {
        Self { protection }
    }
}

#[async_trait]
impl Middleware for ValidateMiddleware {
    async fn handle(&self, req: HttpRequest, next: Next) -> Result<HttpResponse, Error> {
        let validation = self
            .protection
            .validate(&req)
            .await
            .map_err(|e| log_failure("validate", e))?;

        match validation {
            Validation::Skipped | Validation::Passed => next(req).await,
            Validation::Rejected(rejection) => self.protection.reject(&req, rejection).await,
        }
    }
}
