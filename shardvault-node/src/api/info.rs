//! Info endpoint.
//!
//! - `/version` – returns cargo package name and version.

use axum::routing::get;
use axum::{Router, http::StatusCode, response::IntoResponse};

/// Builds the info router.
pub(crate) fn routes() -> Router {
    Router::new().route("/version", get(version))
}

/// Responds with the package name and version as a plain string.
async fn version() -> impl IntoResponse {
    (
        StatusCode::OK,
        concat!(env!("CARGO_PKG_NAME"), " v", env!("CARGO_PKG_VERSION")),
    )
}
