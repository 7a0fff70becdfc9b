//! Parameter distribution.

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use shardvault_types::api::ApiResponse;
use shardvault_types::params::SystemParameters;

use crate::CoordinatorContext;

/// Builds the system router.
pub(crate) fn routes(ctx: CoordinatorContext) -> Router {
    Router::new()
        .route("/system/parameters", get(get_parameters))
        .with_state(ctx)
}

/// `GET /system/parameters` — serves the full parameter document.
async fn get_parameters(State(ctx): State<CoordinatorContext>) -> Json<ApiResponse<SystemParameters>> {
    Json(ApiResponse::success((*ctx.params).clone()))
}
