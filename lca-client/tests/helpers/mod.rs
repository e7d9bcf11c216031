//! Test helper modules for lca-client integration tests
//!
//! - FakeBackend: scriptable analysis backend on 127.0.0.1:0
//! - Client wiring against a fake backend with recording collaborators

#![allow(dead_code)]

pub mod fake_backend;

pub use fake_backend::{FakeBackend, Reply};

use lca_client::session::{Credential, CredentialStore, MemoryCredentialStore};
use lca_client::upload::ArtifactOpener;
use lca_client::{App, ClientError, ClientResult};
use lca_common::config::ClientConfig;
use reqwest::Url;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Token with a JWT-shaped payload carrying `email`
pub fn token_for(email: &str) -> String {
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;
    use base64::Engine as _;

    let payload = URL_SAFE_NO_PAD.encode(format!(r#"{{"email":"{}"}}"#, email));
    format!("eyJhbGciOiJIUzI1NiJ9.{}.c2lnbmF0dXJl", payload)
}

/// Client configuration pointing at `backend`
pub fn config_for(backend: &FakeBackend) -> ClientConfig {
    ClientConfig {
        backend_url: backend.base_url.clone(),
        notification_poll_interval: Duration::from_millis(50),
        session_check_interval: Duration::from_millis(20),
        download_dir: std::env::temp_dir(),
        ..ClientConfig::default()
    }
}

/// Opener that records what it was asked to open
#[derive(Default)]
pub struct RecordingOpener {
    pub opened: Mutex<Vec<(String, Option<String>)>>,
    pub fail: bool,
}

impl RecordingOpener {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    pub fn opened(&self) -> Vec<(String, Option<String>)> {
        self.opened.lock().unwrap().clone()
    }
}

impl ArtifactOpener for RecordingOpener {
    fn open(&self, url: &Url, suggested_name: Option<&str>) -> ClientResult<()> {
        self.opened
            .lock()
            .unwrap()
            .push((url.to_string(), suggested_name.map(str::to_string)));
        if self.fail {
            Err(ClientError::Network("popup blocked".to_string()))
        } else {
            Ok(())
        }
    }
}

/// App wired to `backend`, with an in-memory credential and a recording opener
pub fn app_with(
    backend: &FakeBackend,
    credential: Option<&str>,
    opener: Arc<RecordingOpener>,
) -> App {
    let store: Arc<dyn CredentialStore> = match credential {
        Some(token) => Arc::new(MemoryCredentialStore::with_credential(Credential::new(token))),
        None => Arc::new(MemoryCredentialStore::new()),
    };
    App::with_opener(config_for(backend), store, opener).unwrap()
}
