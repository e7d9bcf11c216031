//! Session state: the stored credential and who may change it
//!
//! [`Session`] is the single writer of the credential. `login` and `logout`
//! are the only mutations; every other component takes snapshot reads via
//! [`Session::credential`]. Changes are published on a `watch` channel so
//! views can react without polling storage themselves.
//!
//! Out-of-band changes (another process rewriting the credential file) are
//! picked up by [`spawn_session_watcher`], which re-reads the store on a
//! fixed period.

pub mod gate;
pub mod identity;
pub mod store;

pub use gate::{Navigator, Route, SessionGate};
pub use identity::{decode_identity, try_decode_identity, Identity, IdentityError};
pub use store::{CredentialStore, FileCredentialStore, MemoryCredentialStore};

use crate::error::{ClientError, ClientResult};
use crate::task::PeriodicTask;
use reqwest::header::HeaderValue;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{info, warn};

/// Opaque bearer token proving authentication
///
/// Presence alone means "authenticated"; the client never validates it.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `Authorization` header value: the raw token, no scheme prefix
    pub fn authorization_value(&self) -> ClientResult<HeaderValue> {
        let mut value = HeaderValue::from_str(&self.0).map_err(|_| {
            ClientError::Credential("credential contains characters not valid in a header".to_string())
        })?;
        value.set_sensitive(true);
        Ok(value)
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Credential(<redacted>)")
    }
}

/// Shared handle to the process-wide session
#[derive(Clone)]
pub struct Session {
    inner: Arc<SessionInner>,
}

struct SessionInner {
    store: Arc<dyn CredentialStore>,
    tx: watch::Sender<Option<Credential>>,
}

impl Session {
    /// Open a session over `store`, seeding it with whatever is stored now
    pub fn open(store: Arc<dyn CredentialStore>) -> Self {
        let initial = store.load().unwrap_or_else(|e| {
            warn!(error = %e, "Could not read stored credential; starting unauthenticated");
            None
        });
        let (tx, _) = watch::channel(initial);
        Self {
            inner: Arc::new(SessionInner { store, tx }),
        }
    }

    /// Snapshot of the current credential
    pub fn credential(&self) -> Option<Credential> {
        self.inner.tx.borrow().clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.inner.tx.borrow().is_some()
    }

    /// Best-effort identity of the current credential
    pub fn identity(&self) -> Option<Identity> {
        self.credential().map(|c| decode_identity(&c))
    }

    /// Subscribe to credential changes
    pub fn subscribe(&self) -> watch::Receiver<Option<Credential>> {
        self.inner.tx.subscribe()
    }

    /// Persist a freshly issued credential and publish it
    pub fn login(&self, credential: Credential) -> ClientResult<()> {
        self.inner.store.save(&credential)?;
        self.inner.tx.send_replace(Some(credential));
        info!("Session credential stored");
        Ok(())
    }

    /// Destroy the stored credential and publish the logout
    pub fn logout(&self) -> ClientResult<()> {
        self.inner.store.clear()?;
        self.inner.tx.send_replace(None);
        info!("Session credential cleared");
        Ok(())
    }

    /// Re-read the store; publishes and returns true only if it changed
    pub fn refresh(&self) -> bool {
        let stored = match self.inner.store.load() {
            Ok(stored) => stored,
            Err(e) => {
                warn!(error = %e, "Could not re-read stored credential");
                return false;
            }
        };
        self.inner.tx.send_if_modified(|current| {
            if *current != stored {
                *current = stored;
                true
            } else {
                false
            }
        })
    }
}

/// Periodically re-read the credential store to detect out-of-band changes
pub fn spawn_session_watcher(session: Session, period: Duration) -> PeriodicTask {
    PeriodicTask::spawn("session-watch", period, move || {
        let session = session.clone();
        async move {
            if session.refresh() {
                info!(
                    authenticated = session.is_authenticated(),
                    "Session changed outside this client"
                );
            }
        }
    })
}
