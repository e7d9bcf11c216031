//! Upload lifecycle: file selection, single-shot submit, response interpretation
//!
//! States: `Idle -> Submitting -> {Succeeded, Failed} -> Idle`.
//!
//! The loosely-shaped upload response is decoded once, at the boundary, into an
//! [`UploadReport`]. Every field is interpreted on its own; a malformed field is
//! logged and dropped without affecting the others. The report is then applied
//! to the [`UploadView`] in a single write.

use crate::backend::BackendClient;
use crate::error::{ClientError, ClientResult};
use crate::session::Session;
use lca_common::api::UploadResponseBody;
use lca_common::models::is_truthy;
use lca_common::{Clause, MissingClause, Notification};
use reqwest::Url;
use serde_json::{Number, Value};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio::sync::RwLock;
use tracing::{error, info, warn};

/// Validation message when `submit` is called with no file selected
pub const NO_FILE_MESSAGE: &str = "Please select a PDF or DOCX file to upload.";

/// File name used when the server does not suggest one
pub const DEFAULT_ARTIFACT_NAME: &str = "amended_contract.txt";

const MIME_PDF: &str = "application/pdf";
const MIME_DOCX: &str = "application/vnd.openxmlformats-officedocument.wordprocessingml.document";
const MIME_OCTET_STREAM: &str = "application/octet-stream";

// ========================================
// PendingFile
// ========================================

/// A document selected for upload
#[derive(Clone)]
pub struct PendingFile {
    pub name: String,
    pub mime: String,
    bytes: Arc<[u8]>,
}

impl PendingFile {
    pub fn new(name: impl Into<String>, mime: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            mime: mime.into(),
            bytes: Arc::from(bytes.into()),
        }
    }

    /// Read a document from disk, guessing its MIME type from the extension
    pub async fn from_path(path: &Path) -> ClientResult<Self> {
        let bytes = tokio::fs::read(path).await.map_err(|e| {
            ClientError::Validation(format!("Cannot read {}: {}", path.display(), e))
        })?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "document".to_string());

        Ok(Self::new(name, guess_mime(path), bytes))
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl std::fmt::Debug for PendingFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingFile")
            .field("name", &self.name)
            .field("mime", &self.mime)
            .field("len", &self.bytes.len())
            .finish()
    }
}

fn guess_mime(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase());
    match extension.as_deref() {
        Some("pdf") => MIME_PDF,
        Some("docx") => MIME_DOCX,
        _ => MIME_OCTET_STREAM,
    }
}

// ========================================
// UploadReport
// ========================================

/// Typed interpretation of one upload response
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UploadReport {
    pub analysis: Option<Vec<Clause>>,
    pub total_clauses: Option<Number>,
    pub notifications: Option<Vec<Notification>>,
    pub missing_clauses: Option<Vec<MissingClause>>,
    /// Any of `amended_contract`, `amended_available`, `modified_contract_download` was truthy
    pub amended_available: bool,
    pub modified_contract_filename: Option<String>,
}

impl UploadReport {
    /// Decode a raw upload payload; never fails
    pub fn from_json(payload: Value) -> Self {
        // Derived struct decoding would also accept a sequence by position
        let map = match payload {
            Value::Object(map) => map,
            Value::Null => return Self::default(),
            other => {
                warn!(
                    kind = json_kind(&other),
                    "Upload response is not an object; ignoring all fields"
                );
                return Self::default();
            }
        };
        let body: UploadResponseBody = match serde_json::from_value(Value::Object(map)) {
            Ok(body) => body,
            Err(e) => {
                warn!(error = %e, "Upload response could not be decoded; ignoring all fields");
                return Self::default();
            }
        };

        let amended_available = [
            &body.amended_contract,
            &body.amended_available,
            &body.modified_contract_download,
        ]
        .into_iter()
        .flatten()
        .any(is_truthy);

        Self {
            analysis: array_field("analysis", body.analysis)
                .map(|items| items.into_iter().map(Clause::from).collect()),
            total_clauses: total_clauses_field(body.total_clauses),
            notifications: array_field("notifications", body.notifications)
                .map(|items| items.into_iter().map(Notification::from_value).collect()),
            missing_clauses: array_field("missing_clauses", body.missing_clauses)
                .map(|items| items.into_iter().map(MissingClause::from_value).collect()),
            amended_available,
            modified_contract_filename: body
                .modified_contract_filename
                .and_then(|v| match v {
                    Value::String(s) if !s.is_empty() => Some(s),
                    _ => None,
                }),
        }
    }
}

/// Array-shaped field, or `None` (with a warning when present but mis-shaped)
fn array_field(field: &'static str, value: Option<Value>) -> Option<Vec<Value>> {
    match value? {
        Value::Array(items) => Some(items),
        Value::Null => None,
        other => {
            warn!(field, kind = json_kind(&other), "Ignoring malformed upload field");
            None
        }
    }
}

/// The number exactly as sent, fractional or not
fn total_clauses_field(value: Option<Value>) -> Option<Number> {
    match value? {
        Value::Null => None,
        Value::Number(n) => Some(n),
        other => {
            warn!(
                field = "total_clauses",
                kind = json_kind(&other),
                "Ignoring malformed upload field"
            );
            None
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

// ========================================
// View state
// ========================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum UploadPhase {
    #[default]
    Idle,
    Submitting,
    Succeeded,
    Failed,
}

/// Everything a renderer needs to draw the upload screen
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UploadView {
    pub phase: UploadPhase,
    pub file_name: Option<String>,
    pub loading: bool,
    pub results: Vec<Clause>,
    pub total_clauses: Option<Number>,
    pub missing_clauses: Vec<MissingClause>,
    pub amended_message: Option<String>,
    pub notifications: Vec<Notification>,
    pub error: Option<String>,
}

impl UploadView {
    /// Drop everything derived from a previous submission
    fn clear_derived(&mut self) {
        self.missing_clauses.clear();
        self.amended_message = None;
        self.notifications.clear();
        self.error = None;
    }

    /// State at the start of a submission, before the request goes out
    fn reset_for_submit(&mut self) {
        self.clear_derived();
        self.results.clear();
        self.total_clauses = None;
        self.loading = true;
        self.phase = UploadPhase::Submitting;
    }

    fn apply(&mut self, report: UploadReport, amended_message: Option<String>) {
        if let Some(analysis) = report.analysis {
            self.results = analysis;
        }
        self.total_clauses = report.total_clauses;
        if let Some(notifications) = report.notifications {
            self.notifications = notifications;
        }
        if let Some(missing) = report.missing_clauses {
            self.missing_clauses = missing;
        }
        self.amended_message = amended_message;
    }
}

#[derive(Default)]
struct UploadState {
    view: UploadView,
    file: Option<PendingFile>,
}

// ========================================
// Artifact opening
// ========================================

/// Side effect that makes the amended artifact available to the user
pub trait ArtifactOpener: Send + Sync {
    fn open(&self, url: &Url, suggested_name: Option<&str>) -> ClientResult<()>;
}

/// Downloads the artifact into a directory in a detached task
pub struct DownloadOpener {
    http: reqwest::Client,
    dir: PathBuf,
}

impl DownloadOpener {
    pub fn new(http: reqwest::Client, dir: impl Into<PathBuf>) -> Self {
        Self {
            http,
            dir: dir.into(),
        }
    }
}

impl ArtifactOpener for DownloadOpener {
    fn open(&self, url: &Url, suggested_name: Option<&str>) -> ClientResult<()> {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| ClientError::Network(format!("no runtime to fetch artifact: {}", e)))?;

        let target = self.dir.join(artifact_file_name(suggested_name));
        let http = self.http.clone();
        let url = url.clone();

        runtime.spawn(async move {
            match download_to(&http, &url, &target).await {
                Ok(bytes) => info!(path = %target.display(), bytes, "Amended contract downloaded"),
                Err(e) => warn!(url = %url, error = %e, "Amended contract download failed"),
            }
        });
        Ok(())
    }
}

async fn download_to(http: &reqwest::Client, url: &Url, target: &Path) -> ClientResult<u64> {
    let mut response = http
        .get(url.clone())
        .send()
        .await
        .map_err(|e| ClientError::Network(e.to_string()))?
        .error_for_status()
        .map_err(|e| ClientError::Network(e.to_string()))?;

    if let Some(parent) = target.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(lca_common::Error::from)?;
    }
    let mut file = tokio::fs::File::create(target)
        .await
        .map_err(lca_common::Error::from)?;

    let mut written = 0u64;
    while let Some(chunk) = response
        .chunk()
        .await
        .map_err(|e| ClientError::Network(e.to_string()))?
    {
        file.write_all(&chunk).await.map_err(lca_common::Error::from)?;
        written += chunk.len() as u64;
    }
    file.flush().await.map_err(lca_common::Error::from)?;
    Ok(written)
}

/// Final path component of the suggested name, or the default
fn artifact_file_name(suggested: Option<&str>) -> String {
    suggested
        .and_then(|s| s.rsplit(['/', '\\']).next())
        .map(str::trim)
        .filter(|s| !s.is_empty() && *s != "." && *s != "..")
        .unwrap_or(DEFAULT_ARTIFACT_NAME)
        .to_string()
}

// ========================================
// UploadOrchestrator
// ========================================

/// Owns the upload view state and runs submissions
#[derive(Clone)]
pub struct UploadOrchestrator {
    backend: BackendClient,
    session: Session,
    opener: Arc<dyn ArtifactOpener>,
    state: Arc<RwLock<UploadState>>,
}

impl UploadOrchestrator {
    pub fn new(backend: BackendClient, session: Session, opener: Arc<dyn ArtifactOpener>) -> Self {
        Self {
            backend,
            session,
            opener,
            state: Arc::new(RwLock::new(UploadState::default())),
        }
    }

    /// Snapshot of the current view
    pub async fn view(&self) -> UploadView {
        self.state.read().await.view.clone()
    }

    /// Store the file candidate and clear every trace of the previous submission
    pub async fn select_file(&self, file: PendingFile) {
        let mut state = self.state.write().await;
        state.view.clear_derived();
        state.view.file_name = Some(file.name.clone());
        // A selection made mid-flight is used by the next submission
        if state.view.phase != UploadPhase::Submitting {
            state.view.phase = UploadPhase::Idle;
        }
        state.file = Some(file);
    }

    /// Submit the selected file once
    ///
    /// Exactly one of the outcomes is recorded in the view: the applied report,
    /// or a single error message. `loading` is false again on every return
    /// path. A second call while one is in flight returns
    /// [`ClientError::Busy`] and leaves the in-flight state untouched.
    pub async fn submit(&self) -> ClientResult<UploadView> {
        let file = {
            let mut state = self.state.write().await;
            if state.view.phase == UploadPhase::Submitting {
                warn!("Upload already in progress; ignoring submit");
                return Err(ClientError::Busy);
            }

            let Some(file) = state.file.clone() else {
                state.view.error = Some(NO_FILE_MESSAGE.to_string());
                state.view.loading = false;
                state.view.phase = UploadPhase::Failed;
                return Err(ClientError::Validation(NO_FILE_MESSAGE.to_string()));
            };

            state.view.reset_for_submit();
            file
        };

        info!(file = %file.name, bytes = file.len(), "Submitting document for analysis");
        let credential = self.session.credential();
        let outcome = self.backend.upload(&file, credential.as_ref()).await;

        match outcome {
            Ok(payload) => {
                let report = UploadReport::from_json(payload);
                let amended_message = report
                    .amended_available
                    .then(|| self.open_amended(report.modified_contract_filename.as_deref()));

                info!(
                    clauses = report.analysis.as_ref().map(Vec::len).unwrap_or(0),
                    total_clauses = ?report.total_clauses,
                    amended = report.amended_available,
                    "Analysis received"
                );

                let mut state = self.state.write().await;
                state.view.apply(report, amended_message);
                state.view.loading = false;
                state.view.phase = UploadPhase::Succeeded;
                Ok(state.view.clone())
            }
            Err(e) => {
                let message = e.display_message();
                error!(error = %message, "Upload failed");

                let mut state = self.state.write().await;
                state.view.error = Some(message);
                state.view.loading = false;
                state.view.phase = UploadPhase::Failed;
                Err(e)
            }
        }
    }

    /// Trigger the artifact side effect; returns the message to show
    fn open_amended(&self, filename: Option<&str>) -> String {
        let url = self.backend.amended_download_url();
        match self.opener.open(url, filename) {
            Ok(()) => match filename {
                Some(name) => format!("Modified file created on server: {}", name),
                None => format!("Modified contract ready for download: {}", url),
            },
            Err(e) => {
                warn!(url = %url, error = %e, "Could not open amended contract");
                format!("Modified contract ready for download (open failed): {}", url)
            }
        }
    }
}
