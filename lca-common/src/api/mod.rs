//! Wire-level definitions for the analysis backend
//!
//! Endpoint paths are relative so they can be joined onto any configured
//! `backend_url`. Authentication uses the raw credential as the value of the
//! `Authorization` header, with no scheme prefix.

pub mod types;

pub use types::{
    decode_object, error_field, DismissRequest, DismissResponse, LoginRequest, LoginResponse,
    NotificationsEnvelope, UploadResponseBody,
};

/// `POST {email, password}` → `{token}` or `{error}`
pub const LOGIN_PATH: &str = "login";

/// `POST` multipart document → analysis payload
pub const UPLOAD_PATH: &str = "upload";

/// Multipart field carrying the uploaded document
pub const UPLOAD_FILE_FIELD: &str = "file";

/// `GET` → `{notifications: [...]}`
pub const NOTIFICATIONS_LATEST_PATH: &str = "notifications/latest";

/// `POST {timestamp}` → best-effort acknowledgement
pub const NOTIFICATIONS_DISMISS_PATH: &str = "notifications/dismiss";

/// `GET` → amended contract artifact
pub const AMENDED_DOWNLOAD_PATH: &str = "download/amended";
