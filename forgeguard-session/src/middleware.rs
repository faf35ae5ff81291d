//! Session middleware and the per-request session handle.

use crate::config::SessionConfig;
use crate::error::SessionResult;
use crate::traits::{Session, SessionStore, generate_session_id};
use async_trait::async_trait;
use cookie::Cookie;
use forgeguard_core::{Error, HttpRequest, HttpResponse, Middleware, Next};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, trace};

struct HandleState {
    session: Session,
    modified: bool,
}

/// The session attached to a request.
///
/// Reads and writes go to the loaded copy; [`SessionMiddleware`] persists
/// it once the downstream pipeline has finished, and only if it changed.
#[derive(Clone)]
pub struct SessionHandle {
    state: Arc<Mutex<HandleState>>,
}

impl SessionHandle {
    pub fn new(session: Session) -> Self {
        Self {
            state: Arc::new(Mutex::new(HandleState {
                session,
                modified: false,
            })),
        }
    }

    pub fn id(&self) -> String {
        self.state.lock().session.id.clone()
    }

    pub fn get<T: for<'de> Deserialize<'de>>(&self, key: &str) -> Option<T> {
        self.state.lock().session.get(key)
    }

    pub fn set<T: Serialize>(&self, key: &str, value: T) -> SessionResult<()> {
        let mut state = self.state.lock();
        state.session.set(key, value)?;
        state.modified = true;
        Ok(())
    }

    /// Delete a key; returns true if it was present
    pub fn remove(&self, key: &str) -> bool {
        let mut state = self.state.lock();
        let removed = state.session.remove(key).is_some();
        state.modified |= removed;
        removed
    }

    pub fn is_modified(&self) -> bool {
        self.state.lock().modified
    }

    fn snapshot(&self) -> Session {
        self.state.lock().session.clone()
    }
}

impl std::fmt::Debug for SessionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("SessionHandle")
            .field("id", &state.session.id)
            .field("modified", &state.modified)
            .finish()
    }
}

/// Loads the session named by the session cookie and attaches a
/// [`SessionHandle`] to the request.
///
/// New sessions are only persisted (and their cookie only sent) once
/// something has been written to them. Every
/// [`cleanup_every`](SessionConfig::cleanup_every) requests the store is
/// swept for expired sessions.
pub struct SessionMiddleware<S: SessionStore> {
    store: Arc<S>,
    config: Arc<SessionConfig>,
    requests: AtomicU64,
}

impl<S: SessionStore> SessionMiddleware<S> {
    pub fn new(store: Arc<S>, config: SessionConfig) -> SessionResult<Self> {
        config.validate()?;
        Ok(Self {
            store,
            config: Arc::new(config),
            requests: AtomicU64::new(0),
        })
    }

    async fn sweep_if_due(&self) -> SessionResult<()> {
        let every = self.config.cleanup_every;
        if every == 0 {
            return Ok(());
        }

        let seen = self.requests.fetch_add(1, Ordering::Relaxed) + 1;
        if seen % every == 0 {
            let removed = self.store.cleanup_expired().await?;
            trace!(removed, "Session sweep finished");
        }
        Ok(())
    }

    fn session_id_from(&self, req: &HttpRequest) -> Option<String> {
        let header = req.header("cookie")?;
        Cookie::split_parse_encoded(header)
            .filter_map(Result::ok)
            .find(|c| c.name() == self.config.cookie_name)
            .map(|c| c.value().to_string())
    }
}

#[async_trait]
impl<S: SessionStore + 'static> Middleware for SessionMiddleware<S> {
    async fn handle(&self, mut req: HttpRequest, next: Next) -> Result<HttpResponse, Error> {
        self.sweep_if_due().await?;

        let existing = match self.session_id_from(&req) {
            Some(id) => self.store.get(&id).await?,
            None => None,
        };

        let is_new = existing.is_none();
        let mut session = existing.unwrap_or_else(|| {
            trace!("Starting new session");
            Session::new(generate_session_id(), self.config.default_ttl)
        });
        session.touch();

        let handle = SessionHandle::new(session);
        req.extensions.insert(handle.clone());

        let mut response = next(req).await?;

        if handle.is_modified() {
            let session = handle.snapshot();
            self.store.save(&session).await?;
            debug!(session_id = %session.id, is_new, "Session saved");

            if is_new {
                let cookie = self.config.cookie.build(&self.config.cookie_name, &session.id);
                response.cookies.push(cookie.encoded().to_string());
            }
        }

        Ok(response)
    }
}
