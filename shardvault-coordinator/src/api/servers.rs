//! Node registration and address updates.

use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::routing::post;
use axum::{Json, Router};
use shardvault_types::api::ApiResponse;
use shardvault_types::api::v1::{
    ServerRegisterRequest, ServerRegisterResponse, ServerUpdateRequest,
};
use tracing::instrument;

use crate::CoordinatorContext;
use crate::api::errors::Error;
use crate::new_entity_id;
use crate::services::database::DbError;

/// Retries for deterministic id generation before giving up.
const MAX_ID_RETRIES: u32 = 5;

/// Builds the server router.
pub(crate) fn routes(ctx: CoordinatorContext) -> Router {
    Router::new()
        .route("/server/register", post(register))
        .route("/server/update_info", post(update_info))
        .with_state(ctx)
}

/// `POST /server/register` — admits a storage node into the registry.
#[instrument(level = "debug", skip_all)]
async fn register(
    State(ctx): State<CoordinatorContext>,
    payload: Result<Json<ServerRegisterRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<ServerRegisterResponse>>, Error> {
    let Json(request) = payload?;
    if request.public_key.is_infinity() || !ctx.group.curve.contains(&request.public_key) {
        return Err(Error::InvalidParameter(
            "node public key is not on the curve".into(),
        ));
    }

    for attempt in 1..=MAX_ID_RETRIES {
        let server_id = new_entity_id();
        match ctx.registry.insert(
            &server_id,
            request.address.clone(),
            request.public_key.clone(),
        ) {
            Ok(()) => {
                tracing::info!("registered node {server_id} at {}", request.address);
                return Ok(Json(ApiResponse::success(ServerRegisterResponse {
                    server_id,
                })));
            }
            Err(DbError::Duplicate(_)) => {
                tracing::warn!("node id collision, retry {attempt}/{MAX_ID_RETRIES}");
            }
            Err(other) => return Err(other.into()),
        }
    }
    Err(Error::ServerIdExhausted)
}

/// `POST /server/update_info` — a restarted node announces its address.
#[instrument(level = "debug", skip_all)]
async fn update_info(
    State(ctx): State<CoordinatorContext>,
    payload: Result<Json<ServerUpdateRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<()>>, Error> {
    let Json(request) = payload?;
    if !ctx
        .registry
        .update_address(&request.sid, request.address.clone())?
    {
        return Err(Error::ResourceNotFound);
    }
    tracing::info!("node {} now at {}", request.sid, request.address);
    Ok(Json(ApiResponse::empty()))
}
