//! Session integration tests
//!
//! Login against the fake backend, the shared file credential slot, the
//! out-of-band session watcher and the gate's reaction to it.

mod helpers;

use helpers::{token_for, FakeBackend};
use lca_client::session::{
    spawn_session_watcher, Credential, CredentialStore, FileCredentialStore, Navigator, Route,
    Session, SessionGate,
};
use lca_client::{App, ClientError};
use lca_common::config::{ClientConfig, ConfigOverrides, ENV_BACKEND_URL, ENV_CONFIG_PATH};
use serial_test::serial;
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Default)]
struct RecordingNavigator {
    routes: Mutex<Vec<Route>>,
}

impl Navigator for RecordingNavigator {
    fn navigate(&self, route: Route) {
        self.routes.lock().unwrap().push(route);
    }
}

fn file_config(backend: &FakeBackend, dir: &tempfile::TempDir) -> ClientConfig {
    ClientConfig {
        credential_path: dir.path().join("credential"),
        ..helpers::config_for(backend)
    }
}

#[tokio::test]
async fn test_login_stores_credential_and_decodes_identity() {
    let backend = FakeBackend::start().await;
    let token = token_for("ana@example.com");
    backend.accept_login("ana@example.com", "s3cret", &token);

    let dir = tempfile::tempdir().unwrap();
    let app = App::new(file_config(&backend, &dir)).unwrap();
    assert!(!app.session.is_authenticated());

    let identity = app.login("ana@example.com", "s3cret").await.unwrap();
    assert_eq!(identity.email, "ana@example.com");
    assert!(app.session.is_authenticated());

    let stored = std::fs::read_to_string(dir.path().join("credential")).unwrap();
    assert_eq!(stored, token);
}

#[tokio::test]
async fn test_login_rejected_leaves_session_empty() {
    let backend = FakeBackend::start().await;
    backend.accept_login("ana@example.com", "s3cret", "tok");

    let dir = tempfile::tempdir().unwrap();
    let app = App::new(file_config(&backend, &dir)).unwrap();

    let err = app.login("ana@example.com", "wrong").await.unwrap_err();
    assert!(matches!(err, ClientError::Server { status: 401, .. }));
    assert_eq!(err.display_message(), "Invalid login: Invalid credentials");
    assert!(!app.session.is_authenticated());
    assert!(!dir.path().join("credential").exists());
}

#[tokio::test]
async fn test_opaque_token_yields_placeholder_identity() {
    let backend = FakeBackend::start().await;
    backend.accept_login("bo@example.com", "pw", "not-a-jwt");

    let dir = tempfile::tempdir().unwrap();
    let app = App::new(file_config(&backend, &dir)).unwrap();

    let identity = app.login("bo@example.com", "pw").await.unwrap();
    assert_eq!(identity.email, "Unknown");
    assert!(app.session.is_authenticated());
}

#[tokio::test]
async fn test_watcher_detects_login_from_another_client() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("credential");

    let here = Session::open(Arc::new(FileCredentialStore::new(&path)));
    let elsewhere = Session::open(Arc::new(FileCredentialStore::new(&path)));
    let watcher = spawn_session_watcher(here.clone(), Duration::from_millis(20));

    let mut changes = here.subscribe();
    elsewhere.login(Credential::new(token_for("x@y.z"))).unwrap();

    tokio::time::timeout(Duration::from_secs(2), changes.changed())
        .await
        .unwrap()
        .unwrap();
    assert!(here.is_authenticated());
    assert_eq!(here.identity().unwrap().email, "x@y.z");

    elsewhere.logout().unwrap();
    tokio::time::timeout(Duration::from_secs(2), changes.changed())
        .await
        .unwrap()
        .unwrap();
    assert!(!here.is_authenticated());

    watcher.stop().await;
}

#[tokio::test]
async fn test_gate_redirects_once_after_out_of_band_logout() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(FileCredentialStore::new(dir.path().join("credential")));
    store.save(&Credential::new("tok")).unwrap();

    let session = Session::open(store.clone());
    let navigator = Arc::new(RecordingNavigator::default());
    let mut gate = SessionGate::new(session.clone(), navigator.clone());
    let watcher = spawn_session_watcher(session, Duration::from_millis(20));

    assert!(gate.protect(|| "upload page").is_some());

    // Another process removes the credential file
    store.clear().unwrap();
    let flag = tokio::time::timeout(Duration::from_secs(2), gate.changed())
        .await
        .unwrap();
    assert!(!flag);

    // Re-rendering after the change redirects exactly once
    assert!(gate.protect(|| "upload page").is_none());
    assert!(gate.protect(|| "upload page").is_none());
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(gate.protect(|| "upload page").is_none());
    assert_eq!(*navigator.routes.lock().unwrap(), vec![Route::Login]);

    watcher.stop().await;
}

#[tokio::test]
async fn test_app_watch_session_uses_configured_period() {
    let backend = FakeBackend::start().await;
    let dir = tempfile::tempdir().unwrap();
    let app = App::new(file_config(&backend, &dir)).unwrap();

    let task = app.watch_session();
    assert_eq!(task.name(), "session-watch");
    assert!(task.is_running());

    std::fs::write(dir.path().join("credential"), "written-by-hand\n").unwrap();
    tokio::time::timeout(Duration::from_secs(2), async {
        while !app.session.is_authenticated() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .unwrap();
    assert_eq!(
        app.session.credential(),
        Some(Credential::new("written-by-hand"))
    );

    task.stop().await;
}

#[tokio::test]
#[serial]
async fn test_env_backend_url_reaches_login_endpoint() {
    let backend = FakeBackend::start().await;
    backend.accept_login("env@example.com", "pw", &token_for("env@example.com"));
    let dir = tempfile::tempdir().unwrap();

    std::env::set_var(ENV_BACKEND_URL, &backend.base_url);
    std::env::set_var(ENV_CONFIG_PATH, dir.path().join("absent.toml"));
    let resolved = ClientConfig::resolve(ConfigOverrides {
        credential_path: Some(dir.path().join("credential")),
        ..Default::default()
    });
    std::env::remove_var(ENV_BACKEND_URL);
    std::env::remove_var(ENV_CONFIG_PATH);

    let app = App::new(resolved.unwrap()).unwrap();
    let identity = app.login("env@example.com", "pw").await.unwrap();
    assert_eq!(identity.email, "env@example.com");
}
