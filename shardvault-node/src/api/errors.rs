//! Handler errors and their mapping onto the response envelope.
//!
//! Propagation is fail-closed: every error becomes a normal HTTP 200 with an
//! error envelope; nothing leaks to the transport layer.

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::response::{IntoResponse, Response};
use shardvault_types::api::{ApiResponse, error_codes};

/// All errors a node handler may surface.
#[derive(Debug, thiserror::Error)]
pub(crate) enum Error {
    #[error("request body is not valid JSON")]
    InvalidJson,
    #[error("missing or malformed request field")]
    MissingParameter,
    #[error("signature verification failed")]
    SignatureInvalid,
    #[error("no share stored for file {0}")]
    ShareNotFound(String),
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
    #[error("share intake failed: {0}")]
    Signcryption(String),
    #[error("share transform failed: {0}")]
    Download(String),
}

impl Error {
    fn code(&self) -> u16 {
        match self {
            Error::InvalidJson => error_codes::INVALID_JSON,
            Error::MissingParameter => error_codes::MISSING_PARAMETER,
            Error::SignatureInvalid => error_codes::SIGNATURE_INVALID,
            Error::ShareNotFound(_) => error_codes::SHARE_NOT_FOUND,
            Error::InvalidParameter(_) => error_codes::INVALID_PARAMETER,
            Error::Signcryption(_) => error_codes::NODE_SIGNCRYPTION_ERROR,
            Error::Download(_) => error_codes::NODE_DOWNLOAD_ERROR,
        }
    }
}

impl From<JsonRejection> for Error {
    fn from(rejection: JsonRejection) -> Self {
        match rejection {
            JsonRejection::JsonDataError(_) => Error::MissingParameter,
            _ => Error::InvalidJson,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        tracing::debug!("request failed: {self}");
        let envelope = ApiResponse::<()>::failure_with(self.code(), self.to_string());
        Json(envelope).into_response()
    }
}
