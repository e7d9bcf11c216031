//! Best-effort identity decoding from the credential payload
//!
//! The credential is treated as `header.payload.signature`; the payload is
//! base64 JSON carrying an `email` claim. Nothing is verified. Decoding never
//! fails the caller: [`decode_identity`] falls back to a placeholder.

use super::Credential;
use base64::engine::general_purpose::{STANDARD_NO_PAD, URL_SAFE_NO_PAD};
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

/// Placeholder email when the credential cannot be decoded
pub const UNKNOWN_EMAIL: &str = "Unknown";

/// Who the credential says the user is
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Identity {
    pub email: String,
}

impl Identity {
    pub fn unknown() -> Self {
        Self {
            email: UNKNOWN_EMAIL.to_string(),
        }
    }
}

/// Why a credential payload could not be decoded
#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("credential has no payload segment")]
    MissingPayload,

    #[error("payload is not valid base64")]
    Encoding,

    #[error("payload is not JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("payload has no email claim")]
    MissingEmail,
}

/// Decode the payload segment of `token`
///
/// Accepts base64url (JWT) as well as standard base64, padded or not.
pub fn try_decode_identity(token: &str) -> Result<Identity, IdentityError> {
    let segment = token
        .split('.')
        .nth(1)
        .filter(|s| !s.is_empty())
        .ok_or(IdentityError::MissingPayload)?;
    let unpadded = segment.trim_end_matches('=');

    let bytes = URL_SAFE_NO_PAD
        .decode(unpadded)
        .or_else(|_| STANDARD_NO_PAD.decode(unpadded))
        .map_err(|_| IdentityError::Encoding)?;

    let payload: Value = serde_json::from_slice(&bytes)?;
    let email = payload
        .get("email")
        .and_then(Value::as_str)
        .ok_or(IdentityError::MissingEmail)?;

    Ok(Identity {
        email: email.to_string(),
    })
}

/// Identity of `credential`, or `{email: "Unknown"}` on any decode failure
pub fn decode_identity(credential: &Credential) -> Identity {
    try_decode_identity(credential.as_str()).unwrap_or_else(|e| {
        debug!(error = %e, "Credential payload not decodable; using placeholder identity");
        Identity::unknown()
    })
}
