//! HTTP API types: the response envelope, the stable error-code table and
//! the versioned request/response payloads.

pub mod v1;

use serde::{Deserialize, Serialize};

/// Serde support for [`secrecy::SecretString`] fields.
///
/// Credential fields are wrapped in `SecretString` so they stay redacted in
/// `Debug` output and logs; the wire and the database still need the value,
/// so serialization explicitly exposes it.
pub mod secret {
    use secrecy::{ExposeSecret as _, SecretString};
    use serde::Serializer;

    /// Serializes the secret's contents verbatim.
    pub fn expose<S: Serializer>(value: &SecretString, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(value.expose_secret())
    }
}

/// Stable protocol error codes, shared by every role.
///
/// The numbering is part of the wire contract and must not be reassigned.
pub mod error_codes {
    /// Request body is not valid JSON.
    pub const INVALID_JSON: u16 = 101;
    /// A required parameter is missing or has the wrong type.
    pub const MISSING_PARAMETER: u16 = 102;
    /// Server-id generation collided five times in a row.
    pub const SERVER_ID_EXHAUSTED: u16 = 103;
    /// User-id generation collided five times in a row.
    pub const USER_ID_EXHAUSTED: u16 = 104;
    /// An outbound request timed out.
    pub const NETWORK_TIMEOUT: u16 = 105;
    /// Peer reported a server-side failure.
    pub const SERVER_ERROR: u16 = 106;
    /// Too many requests from this address.
    pub const RATE_LIMITED: u16 = 107;
    /// Caller is not allowed to perform the operation.
    pub const PERMISSION_DENIED: u16 = 108;
    /// Cascading share deletion did not complete on all nodes.
    pub const SHARE_CASCADE_FAILED: u16 = 109;
    /// No share stored under the requested file id.
    pub const SHARE_NOT_FOUND: u16 = 110;
    /// Signature verification failed.
    pub const SIGNATURE_INVALID: u16 = 112;
    /// A file with this deterministic id already exists.
    pub const DUPLICATE_FILE: u16 = 114;
    /// The username is already taken.
    pub const USERNAME_EXISTS: u16 = 115;
    /// No such user.
    pub const USER_NOT_FOUND: u16 = 116;
    /// The requested resource does not exist.
    pub const RESOURCE_NOT_FOUND: u16 = 117;
    /// Unclassified internal error.
    pub const INTERNAL_ERROR: u16 = 118;
    /// No such file.
    pub const FILE_NOT_FOUND: u16 = 119;
    /// A parameter failed validation.
    pub const INVALID_PARAMETER: u16 = 120;
    /// Node-side signcryption intake failed.
    pub const NODE_SIGNCRYPTION_ERROR: u16 = 126;
    /// Node-side download transform failed.
    pub const NODE_DOWNLOAD_ERROR: u16 = 127;
    /// Password hash does not match.
    pub const WRONG_PASSWORD: u16 = 128;
    /// Success.
    pub const SUCCESS: u16 = 200;

    /// Human-readable description of a code, for the envelope's
    /// `error_message` field.
    pub fn describe(code: u16) -> &'static str {
        match code {
            INVALID_JSON => "request body is not valid JSON",
            MISSING_PARAMETER => "missing required parameter",
            SERVER_ID_EXHAUSTED => "server id generation exhausted after 5 retries",
            USER_ID_EXHAUSTED => "user id generation exhausted after 5 retries",
            NETWORK_TIMEOUT => "network timeout",
            SERVER_ERROR => "server error",
            RATE_LIMITED => "rate limit exceeded",
            PERMISSION_DENIED => "permission denied",
            SHARE_CASCADE_FAILED => "share deletion did not complete on all nodes",
            SHARE_NOT_FOUND => "share not found",
            SIGNATURE_INVALID => "signature verification failed",
            DUPLICATE_FILE => "file already exists",
            USERNAME_EXISTS => "username already exists",
            USER_NOT_FOUND => "user not found",
            RESOURCE_NOT_FOUND => "resource not found",
            FILE_NOT_FOUND => "file not found",
            INVALID_PARAMETER => "invalid parameter",
            NODE_SIGNCRYPTION_ERROR => "node could not store the signcrypted share",
            NODE_DOWNLOAD_ERROR => "node could not serve the share",
            WRONG_PASSWORD => "wrong password",
            SUCCESS => "success",
            _ => "internal error",
        }
    }
}

/// `status` discriminator of the response envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseStatus {
    /// The request was processed; `data` carries the payload.
    Success,
    /// The request failed; `error_code`/`error_message` carry the cause.
    Error,
}

/// The standard response envelope every handler returns.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    /// Payload on success, `null` otherwise (or for routes without output).
    pub data: Option<T>,
    /// Success/error discriminator.
    pub status: ResponseStatus,
    /// One of [`error_codes`]; `200` on success.
    pub error_code: u16,
    /// Human-readable description, present on errors.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

/// An error envelope, decoded. Carried by client-side error types.
#[derive(Debug, Clone, thiserror::Error)]
#[error("peer returned error {code}: {message}")]
pub struct ApiFailure {
    /// The error code from the envelope.
    pub code: u16,
    /// The message from the envelope (or the table default).
    pub message: String,
}

impl<T> ApiResponse<T> {
    /// A success envelope carrying `data`.
    pub fn success(data: T) -> Self {
        ApiResponse {
            data: Some(data),
            status: ResponseStatus::Success,
            error_code: error_codes::SUCCESS,
            error_message: None,
        }
    }

    /// A success envelope without payload.
    pub fn empty() -> Self {
        ApiResponse {
            data: None,
            status: ResponseStatus::Success,
            error_code: error_codes::SUCCESS,
            error_message: None,
        }
    }

    /// An error envelope for `code`, message taken from the code table.
    pub fn failure(code: u16) -> Self {
        ApiResponse {
            data: None,
            status: ResponseStatus::Error,
            error_code: code,
            error_message: Some(error_codes::describe(code).to_owned()),
        }
    }

    /// An error envelope with an explicit message.
    pub fn failure_with(code: u16, message: impl Into<String>) -> Self {
        ApiResponse {
            data: None,
            status: ResponseStatus::Error,
            error_code: code,
            error_message: Some(message.into()),
        }
    }

    /// Splits the envelope into payload or [`ApiFailure`], for callers.
    pub fn into_result(self) -> Result<Option<T>, ApiFailure> {
        match self.status {
            ResponseStatus::Success => Ok(self.data),
            ResponseStatus::Error => Err(ApiFailure {
                code: self.error_code,
                message: self
                    .error_message
                    .unwrap_or_else(|| error_codes::describe(self.error_code).to_owned()),
            }),
        }
    }
}
