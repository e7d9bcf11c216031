//! Gate in front of views that require a credential

use super::{Credential, Session};
use crate::error::ClientResult;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::info;

/// Entry points the client can send the user to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Login,
    Home,
}

impl Route {
    pub fn path(&self) -> &'static str {
        match self {
            Route::Login => "/login",
            Route::Home => "/",
        }
    }
}

/// Navigation side effect (redirect to another entry point)
pub trait Navigator: Send + Sync {
    fn navigate(&self, route: Route);
}

/// Renders protected views only while a credential is present
///
/// An unauthenticated check redirects to [`Route::Login`] once; further
/// unauthenticated checks stay silent until the gate has seen an
/// authenticated state again. This keeps a view that re-renders on every
/// flag change from looping on redirects.
pub struct SessionGate {
    session: Session,
    navigator: Arc<dyn Navigator>,
    changes: watch::Receiver<Option<Credential>>,
    last_flag: bool,
    redirect_armed: AtomicBool,
}

impl SessionGate {
    pub fn new(session: Session, navigator: Arc<dyn Navigator>) -> Self {
        let changes = session.subscribe();
        let last_flag = changes.borrow().is_some();
        Self {
            session,
            navigator,
            changes,
            last_flag,
            redirect_armed: AtomicBool::new(true),
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.session.is_authenticated()
    }

    /// Render `view` if authenticated; otherwise redirect (once) and render nothing
    pub fn protect<T>(&self, view: impl FnOnce() -> T) -> Option<T> {
        if self.session.is_authenticated() {
            self.redirect_armed.store(true, Ordering::SeqCst);
            return Some(view());
        }

        if self.redirect_armed.swap(false, Ordering::SeqCst) {
            info!(route = Route::Login.path(), "Not authenticated; redirecting");
            self.navigator.navigate(Route::Login);
        }
        None
    }

    /// Wait until the authenticated flag flips; returns the new flag
    ///
    /// Callers re-run [`SessionGate::protect`] after this returns.
    pub async fn changed(&mut self) -> bool {
        loop {
            if self.changes.changed().await.is_err() {
                // Sender lives inside the session we hold; unreachable in practice
                return self.last_flag;
            }
            let flag = self.changes.borrow_and_update().is_some();
            if flag != self.last_flag {
                self.last_flag = flag;
                return flag;
            }
        }
    }

    /// Clear the credential and send the user to the login entry point
    pub fn logout(&self) -> ClientResult<()> {
        self.session.logout()?;
        self.redirect_armed.store(false, Ordering::SeqCst);
        self.navigator.navigate(Route::Login);
        Ok(())
    }
}
