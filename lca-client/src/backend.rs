//! HTTP client for the analysis backend
//!
//! One `reqwest::Client` is shared by every operation. Only the upload is
//! time-bounded; the notification calls rely on the poll loop's cadence.

use crate::error::{ClientError, ClientResult};
use crate::session::Credential;
use crate::upload::PendingFile;
use lca_common::api::{
    self, decode_object, error_field, DismissRequest, DismissResponse, LoginRequest,
    LoginResponse,
};
use lca_common::config::ClientConfig;
use reqwest::header::AUTHORIZATION;
use reqwest::multipart::{Form, Part};
use reqwest::{RequestBuilder, Response, Url};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

const USER_AGENT: &str = concat!("lca/", env!("CARGO_PKG_VERSION"));

/// Absolute URLs of every backend endpoint the client uses
#[derive(Debug, Clone)]
pub struct Endpoints {
    login: Url,
    upload: Url,
    notifications_latest: Url,
    notifications_dismiss: Url,
    amended_download: Url,
}

impl Endpoints {
    /// Join the endpoint paths onto `base_url`
    ///
    /// A base with a path prefix (`http://host/api`) keeps that prefix.
    pub fn new(base_url: &str) -> ClientResult<Self> {
        let mut base = Url::parse(base_url).map_err(|e| {
            lca_common::Error::Config(format!("invalid backend_url '{}': {}", base_url, e))
        })?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        let join = |path: &str| {
            base.join(path).map_err(|e| {
                ClientError::from(lca_common::Error::Config(format!(
                    "cannot build endpoint '{}': {}",
                    path, e
                )))
            })
        };

        Ok(Self {
            login: join(api::LOGIN_PATH)?,
            upload: join(api::UPLOAD_PATH)?,
            notifications_latest: join(api::NOTIFICATIONS_LATEST_PATH)?,
            notifications_dismiss: join(api::NOTIFICATIONS_DISMISS_PATH)?,
            amended_download: join(api::AMENDED_DOWNLOAD_PATH)?,
        })
    }

    pub fn login(&self) -> &Url {
        &self.login
    }

    pub fn upload(&self) -> &Url {
        &self.upload
    }

    pub fn notifications_latest(&self) -> &Url {
        &self.notifications_latest
    }

    pub fn notifications_dismiss(&self) -> &Url {
        &self.notifications_dismiss
    }

    pub fn amended_download(&self) -> &Url {
        &self.amended_download
    }
}

/// Backend API client
#[derive(Clone)]
pub struct BackendClient {
    http: reqwest::Client,
    endpoints: Arc<Endpoints>,
    upload_timeout: Duration,
    notification_limit: Option<u32>,
}

impl BackendClient {
    pub fn new(config: &ClientConfig) -> ClientResult<Self> {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| ClientError::Network(e.to_string()))?;

        Ok(Self {
            http,
            endpoints: Arc::new(Endpoints::new(&config.backend_url)?),
            upload_timeout: config.upload_timeout,
            notification_limit: config.notification_limit,
        })
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }

    pub fn upload_timeout(&self) -> Duration {
        self.upload_timeout
    }

    /// Fixed location of the amended contract artifact
    pub fn amended_download_url(&self) -> &Url {
        &self.endpoints.amended_download
    }

    /// Exchange email/password for a credential
    pub async fn login(&self, email: &str, password: &str) -> ClientResult<Credential> {
        let body = LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        };

        let response = self
            .http
            .post(self.endpoints.login.clone())
            .json(&body)
            .send()
            .await
            .map_err(|e| ClientError::Network(e.to_string()))?;

        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| ClientError::Network(e.to_string()))?;
        let parsed: LoginResponse = serde_json::from_slice(&bytes)
            .ok()
            .and_then(decode_object)
            .unwrap_or_default();

        match parsed.token {
            Some(token) if status.is_success() && !token.is_empty() => {
                info!(email = %email, "Login succeeded");
                Ok(Credential::new(token))
            }
            _ if status.is_success() => Err(ClientError::MalformedResponse(
                "login response carried no token".to_string(),
            )),
            _ => {
                let reason = parsed
                    .error
                    .unwrap_or_else(|| server_error_message(status.as_u16(), &bytes));
                Err(ClientError::Server {
                    status: status.as_u16(),
                    message: format!("Invalid login: {}", reason),
                })
            }
        }
    }

    /// Submit a document for analysis; returns the raw JSON payload
    ///
    /// Single attempt, bounded by the configured upload timeout.
    pub async fn upload(
        &self,
        file: &PendingFile,
        credential: Option<&Credential>,
    ) -> ClientResult<Value> {
        let part = Part::bytes(file.bytes().to_vec())
            .file_name(file.name.clone())
            .mime_str(&file.mime)
            .map_err(|e| ClientError::Validation(format!("invalid file type: {}", e)))?;
        let form = Form::new().part(api::UPLOAD_FILE_FIELD, part);

        let request = self
            .http
            .post(self.endpoints.upload.clone())
            .multipart(form)
            .timeout(self.upload_timeout);
        let response = authorize(request, credential)?
            .send()
            .await
            .map_err(|e| ClientError::from_transport(e, self.upload_timeout))?;

        let response = check_status(response).await?;
        let bytes = response
            .bytes()
            .await
            .map_err(|e| ClientError::from_transport(e, self.upload_timeout))?;

        debug!(bytes = bytes.len(), "Upload response received");
        // A 2xx body that is not JSON carries no fields, not a failure
        match serde_json::from_slice(&bytes) {
            Ok(payload) => Ok(payload),
            Err(e) => {
                warn!(error = %e, "Upload response is not JSON; treating as empty");
                Ok(Value::Null)
            }
        }
    }

    /// Fetch the pending notification set; returns the raw JSON payload
    pub async fn latest_notifications(&self, credential: Option<&Credential>) -> ClientResult<Value> {
        let mut request = self.http.get(self.endpoints.notifications_latest.clone());
        if let Some(n) = self.notification_limit {
            request = request.query(&[("n", n)]);
        }

        let response = authorize(request, credential)?
            .send()
            .await
            .map_err(|e| ClientError::Network(e.to_string()))?;
        let response = check_status(response).await?;

        response
            .json::<Value>()
            .await
            .map_err(|e| ClientError::MalformedResponse(e.to_string()))
    }

    /// Ask the backend to drop a notification from its pending set
    pub async fn dismiss_notification(
        &self,
        timestamp: &Value,
        credential: Option<&Credential>,
    ) -> ClientResult<DismissResponse> {
        let body = DismissRequest {
            timestamp: timestamp.clone(),
        };
        let request = self
            .http
            .post(self.endpoints.notifications_dismiss.clone())
            .json(&body);

        let response = authorize(request, credential)?
            .send()
            .await
            .map_err(|e| ClientError::Network(e.to_string()))?;
        let response = check_status(response).await?;

        // Acknowledgement is informational; an odd body is not a failure
        let bytes = response
            .bytes()
            .await
            .map_err(|e| ClientError::Network(e.to_string()))?;
        Ok(serde_json::from_slice(&bytes)
            .ok()
            .and_then(decode_object)
            .unwrap_or_default())
    }
}

/// Attach the raw credential as the `Authorization` header, if present
fn authorize(request: RequestBuilder, credential: Option<&Credential>) -> ClientResult<RequestBuilder> {
    match credential {
        Some(credential) => Ok(request.header(AUTHORIZATION, credential.authorization_value()?)),
        None => Ok(request),
    }
}

/// Turn a non-success response into `ClientError::Server`
async fn check_status(response: Response) -> ClientResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.bytes().await.unwrap_or_default();
    Err(ClientError::Server {
        status: status.as_u16(),
        message: server_error_message(status.as_u16(), &body),
    })
}

/// Message for a failed response
///
/// Preference order: structured `error` field, JSON text of the body, raw
/// body text, then the bare status.
pub fn server_error_message(status: u16, body: &[u8]) -> String {
    if let Ok(json) = serde_json::from_slice::<Value>(body) {
        if let Some(message) = error_field(&json) {
            return message;
        }
        if !json.is_null() {
            return json.to_string();
        }
    }

    let text = String::from_utf8_lossy(body);
    let text = text.trim();
    if !text.is_empty() {
        return text.to_string();
    }

    format!("Request failed with status code {}", status)
}
