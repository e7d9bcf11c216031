//! # LCA Client Library (lca-client)
//!
//! Client core for the Legal Compliance Analyzer backend.
//!
//! **Purpose:** Gate access on a stored credential, submit contracts for
//! analysis, interpret the loosely-shaped analysis response, poll for server
//! notifications with optimistic dismissal, and aggregate clause records into
//! chart buckets.
//!
//! **Architecture:** One [`session::Session`] is the single writer of the
//! credential; [`upload::UploadOrchestrator`] and
//! [`notifications::NotificationPoller`] read it by snapshot. Background timers
//! run on [`task::PeriodicTask`] handles owned by the caller.

pub mod aggregate;
pub mod backend;
pub mod error;
pub mod notifications;
pub mod render;
pub mod session;
pub mod task;
pub mod upload;

pub use error::{ClientError, ClientResult};

use backend::BackendClient;
use lca_common::config::ClientConfig;
use notifications::NotificationPoller;
use session::{
    decode_identity, spawn_session_watcher, CredentialStore, FileCredentialStore, Identity,
    Session,
};
use std::sync::Arc;
use task::PeriodicTask;
use tracing::info;
use upload::{ArtifactOpener, DownloadOpener, UploadOrchestrator};

/// Fully wired client: one session shared by every component
#[derive(Clone)]
pub struct App {
    pub config: Arc<ClientConfig>,
    pub session: Session,
    pub backend: BackendClient,
    pub upload: UploadOrchestrator,
    pub notifications: NotificationPoller,
}

impl App {
    /// Wire the client with the file-backed credential store from `config`
    pub fn new(config: ClientConfig) -> ClientResult<Self> {
        let store = Arc::new(FileCredentialStore::new(config.credential_path.clone()));
        Self::with_store(config, store)
    }

    /// Wire the client over an explicit credential store
    pub fn with_store(config: ClientConfig, store: Arc<dyn CredentialStore>) -> ClientResult<Self> {
        let backend = BackendClient::new(&config)?;
        let opener = Arc::new(DownloadOpener::new(
            backend.http().clone(),
            config.download_dir.clone(),
        ));
        Ok(Self::assemble(config, store, backend, opener))
    }

    /// Wire the client with a custom artifact opener
    pub fn with_opener(
        config: ClientConfig,
        store: Arc<dyn CredentialStore>,
        opener: Arc<dyn ArtifactOpener>,
    ) -> ClientResult<Self> {
        let backend = BackendClient::new(&config)?;
        Ok(Self::assemble(config, store, backend, opener))
    }

    fn assemble(
        config: ClientConfig,
        store: Arc<dyn CredentialStore>,
        backend: BackendClient,
        opener: Arc<dyn ArtifactOpener>,
    ) -> Self {
        let session = Session::open(store);
        let upload = UploadOrchestrator::new(backend.clone(), session.clone(), opener);
        let notifications = NotificationPoller::new(
            backend.clone(),
            session.clone(),
            config.notification_poll_interval,
        );

        info!(
            backend_url = %config.backend_url,
            authenticated = session.is_authenticated(),
            "Client initialized"
        );

        Self {
            config: Arc::new(config),
            session,
            backend,
            upload,
            notifications,
        }
    }

    /// Log in against the backend and store the issued credential
    pub async fn login(&self, email: &str, password: &str) -> ClientResult<Identity> {
        let credential = self.backend.login(email, password).await?;
        let identity = decode_identity(&credential);
        self.session.login(credential)?;
        Ok(identity)
    }

    /// Start the out-of-band session check at the configured period
    pub fn watch_session(&self) -> PeriodicTask {
        spawn_session_watcher(self.session.clone(), self.config.session_check_interval)
    }
}
