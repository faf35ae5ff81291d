use crate::config::{CsrfConfig, DEFAULT_EXPOSED_VARIABLE};
use crate::error::Result;
use crate::middleware::{ExposeMiddleware, IssueMiddleware, ValidateMiddleware};
use crate::policy::{DefaultPolicy, ProtectionPolicy, Rejection};
use crate::storage::{self, ConsumeOutcome, TokenStorage};
use crate::token::{CsrfToken, RandomTokenGenerator, TokenGenerator};
use forgeguard_core::{Error, HttpRequest, HttpResponse};
use std::sync::Arc;
use tracing::{debug, info, trace};

/// Token minted or found by `issue` during the current request
#[derive(Debug, Clone)]
pub struct IssuedToken(pub CsrfToken);

/// Outcome of [`CsrfProtection::validate`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Validation {
    /// The policy does not protect this request; storage was not touched
    Skipped,
    /// The submitted token matched and has been consumed
    Passed,
    Rejected(Rejection),
}

impl Validation {
    pub fn is_allowed(&self) -> bool {
        !matches!(self, Validation::Rejected(_))
    }
}

/// Token lifecycle for one configuration.
///
/// Holds an immutable [`CsrfConfig`] plus the storage, policy and generator
/// built from it. Instances are independent of each other, so differently
/// configured protections can be mounted side by side.
///
/// The three operations map onto the canonical token's states:
///
/// - [`issue`](Self::issue) mints a token when none is stored
/// - [`expose`](Self::expose) copies the current token into request locals
/// - [`validate`](Self::validate) compares and consumes it
pub struct CsrfProtection {
    config: Arc<CsrfConfig>,
    storage: Arc<dyn TokenStorage>,
    policy: Arc<dyn ProtectionPolicy>,
    generator: Arc<dyn TokenGenerator>,
}

impl CsrfProtection {
    /// Validate `config` and build the default storage, policy and generator
    pub fn new(config: CsrfConfig) -> Result<Self> {
        config.validate()?;

        let storage = storage::for_config(&config);
        let policy = Arc::new(DefaultPolicy::from_config(&config));

        Ok(Self {
            config: Arc::new(config),
            storage,
            policy,
            generator: Arc::new(RandomTokenGenerator),
        })
    }

    pub fn with_policy<P: ProtectionPolicy + 'static>(mut self, policy: P) -> Self {
        self.policy = Arc::new(policy);
        self
    }

    /// Replace the storage backend selected by the config
    pub fn with_storage(mut self, storage: Arc<dyn TokenStorage>) -> Self {
        self.storage = storage;
        self
    }

    pub fn with_generator<G: TokenGenerator + 'static>(mut self, generator: G) -> Self {
        self.generator = Arc::new(generator);
        self
    }

    pub fn config(&self) -> &CsrfConfig {
        &self.config
    }

    pub fn policy(&self) -> &dyn ProtectionPolicy {
        self.policy.as_ref()
    }

    /// Return the stored token, minting and storing one if none exists.
    ///
    /// Fails with a configuration error if the storage backend is missing
    /// from the request.
    pub async fn issue(&self, request: &mut HttpRequest) -> Result<CsrfToken> {
        self.storage.ensure_available(request)?;

        let token = match self.storage.read(request).await? {
            Some(existing) => {
                trace!(storage = self.storage.kind(), "CSRF token already present");
                existing
            }
            None => {
                let token = self.generator.generate(self.config.token_length)?;
                self.storage.write(request, &token).await?;
                debug!(
                    storage = self.storage.kind(),
                    path = %request.path,
                    "Issued CSRF token"
                );
                token
            }
        };

        request.extensions.insert(IssuedToken(token.clone()));
        Ok(token)
    }

    /// Set the exposed local to the current token.
    ///
    /// Falls back to the token issued earlier in this request when the
    /// storage cannot see its own write yet.
    pub async fn expose(&self, request: &mut HttpRequest) -> Result<Option<CsrfToken>> {
        let token = match self.storage.read(request).await? {
            Some(token) => Some(token),
            None => request
                .extensions
                .get::<IssuedToken>()
                .map(|issued| issued.0.clone()),
        };

        if let Some(ref token) = token {
            request.locals.insert(
                self.config.exposed_variable_name.clone(),
                token.as_str().to_string(),
            );
        }

        Ok(token)
    }

    /// Decide whether `request` may proceed, consuming the token if so.
    ///
    /// A missing or wrong token is a [`Validation::Rejected`], not an error.
    /// Errors are reserved for configuration and storage failures.
    pub async fn validate(&self, request: &HttpRequest) -> Result<Validation> {
        if !self.policy.should_protect(request) {
            trace!(method = %request.method, path = %request.path, "CSRF check skipped");
            return Ok(Validation::Skipped);
        }

        self.storage.ensure_available(request)?;

        let Some(submitted) = self.policy.extract_submitted_token(request) else {
            return Ok(Validation::Rejected(Rejection::MissingToken));
        };

        let validation = match self.storage.consume(request, &submitted).await? {
            ConsumeOutcome::Consumed => Validation::Passed,
            ConsumeOutcome::Mismatch => Validation::Rejected(Rejection::Mismatch),
            ConsumeOutcome::Absent => Validation::Rejected(Rejection::MissingCanonical),
        };

        if validation == Validation::Passed {
            debug!(storage = self.storage.kind(), path = %request.path, "CSRF token consumed");
        }

        Ok(validation)
    }

    /// Produce the rejection response through the policy
    pub async fn reject(
        &self,
        request: &HttpRequest,
        rejection: Rejection,
    ) -> std::result::Result<HttpResponse, Error> {
        info!(
            reason = %rejection,
            method = %request.method,
            path = %request.path,
            "CSRF validation failed"
        );
        self.policy.on_rejected(request, rejection).await
    }

    /// The value `expose` stored on this request, if any
    pub fn exposed_token<'a>(&self, request: &'a HttpRequest) -> Option<&'a str> {
        request
            .locals
            .get(&self.config.exposed_variable_name)
            .map(String::as_str)
    }

    pub fn issuer(self: &Arc<Self>) -> IssueMiddleware {
        IssueMiddleware::new(Arc::clone(self))
    }

    pub fn exposer(self: &Arc<Self>) -> ExposeMiddleware {
        ExposeMiddleware::new(Arc::clone(self))
    }

    pub fn validator(self: &Arc<Self>) -> ValidateMiddleware {
        ValidateMiddleware::new(Arc::clone(self))
    }
}

impl std::fmt::Debug for CsrfProtection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CsrfProtection")
            .field("config", &self.config)
            .field("storage", &self.storage.kind())
            .finish()
    }
}

/// Token exposed under the default variable name (`csrfToken`), for
/// handlers rendering a form.
///
/// Only works with the default `exposed_variable_name`; instances with a
/// custom name must use [`CsrfProtection::exposed_token`].
pub fn csrf_token(request: &HttpRequest) -> Option<&str> {
    request
        .locals
        .get(DEFAULT_EXPOSED_VARIABLE)
        .map(String::as_str)
}
