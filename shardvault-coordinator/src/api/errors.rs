//! Handler errors and their mapping onto the response envelope.
//!
//! Fail-closed: every error leaves the handler as an HTTP 200 carrying the
//! standard envelope with one of the stable error codes.

use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::response::{IntoResponse, Response};
use shardvault_types::api::{ApiResponse, error_codes};

use crate::services::database::DbError;
use crate::services::files::FileStoreError;

/// All errors a coordinator handler may surface.
#[derive(Debug, thiserror::Error)]
pub(crate) enum Error {
    #[error("request body is not valid JSON")]
    InvalidJson,
    #[error("missing or malformed request field")]
    MissingParameter,
    #[error("rate limit exceeded")]
    RateLimited,
    #[error("permission denied")]
    PermissionDenied,
    #[error("user not found")]
    UserNotFound,
    #[error("username already exists")]
    UsernameExists,
    #[error("wrong password")]
    WrongPassword,
    #[error("file already exists")]
    DuplicateFile,
    #[error("file {0} not found")]
    FileNotFound(String),
    #[error("resource not found")]
    ResourceNotFound,
    #[error("server id generation exhausted")]
    ServerIdExhausted,
    #[error("user id generation exhausted")]
    UserIdExhausted,
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
    #[error("only {active} active nodes, {required} required")]
    InsufficientNodes {
        active: usize,
        required: usize,
    },
    #[error("share deletion did not complete on all nodes")]
    CascadeIncomplete,
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    fn code(&self) -> u16 {
        match self {
            Error::InvalidJson => error_codes::INVALID_JSON,
            Error::MissingParameter => error_codes::MISSING_PARAMETER,
            Error::RateLimited => error_codes::RATE_LIMITED,
            Error::PermissionDenied => error_codes::PERMISSION_DENIED,
            Error::UserNotFound => error_codes::USER_NOT_FOUND,
            Error::UsernameExists => error_codes::USERNAME_EXISTS,
            Error::WrongPassword => error_codes::WRONG_PASSWORD,
            Error::DuplicateFile => error_codes::DUPLICATE_FILE,
            Error::FileNotFound(_) => error_codes::FILE_NOT_FOUND,
            Error::ResourceNotFound => error_codes::RESOURCE_NOT_FOUND,
            Error::ServerIdExhausted => error_codes::SERVER_ID_EXHAUSTED,
            Error::UserIdExhausted => error_codes::USER_ID_EXHAUSTED,
            Error::InvalidParameter(_) => error_codes::INVALID_PARAMETER,
            Error::InsufficientNodes { .. } => error_codes::SERVER_ERROR,
            Error::CascadeIncomplete => error_codes::SHARE_CASCADE_FAILED,
            Error::Internal(_) => error_codes::INTERNAL_ERROR,
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

impl From<QueryRejection> for Error {
    fn from(_: QueryRejection) -> Self {
        Error::MissingParameter
    }
}

impl From<DbError> for Error {
    fn from(err: DbError) -> Self {
        Error::Internal(err.to_string())
    }
}

impl From<FileStoreError> for Error {
    fn from(err: FileStoreError) -> Self {
        match err {
            FileStoreError::Duplicate(_) => Error::DuplicateFile,
            other => Error::Internal(other.to_string()),
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
