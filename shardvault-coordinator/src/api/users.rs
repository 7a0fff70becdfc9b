//! Account routes: registration, login, public key upload, avatar.

use std::net::SocketAddr;
use std::time::Duration;

use axum::extract::{ConnectInfo, State};
use axum::extract::rejection::JsonRejection;
use axum::routing::post;
use axum::{Json, Router};
use secrecy::ExposeSecret as _;
use shardvault_core::keys;
use shardvault_types::api::ApiResponse;
use shardvault_types::api::v1::{
    AvatarUploadRequest, UserLoginRequest, UserLoginResponse, UserPublicKeyRequest,
    UserRegisterRequest, UserRegisterResponse,
};
use tracing::instrument;

use crate::CoordinatorContext;
use crate::api::errors::Error;
use crate::new_entity_id;
use crate::services::database::DbError;

/// Registration attempts allowed per address per window.
const REGISTER_LIMIT: u32 = 3;
/// Login attempts allowed per address per window.
const LOGIN_LIMIT: u32 = 5;
/// Rate-limit window.
const WINDOW: Duration = Duration::from_secs(60);
/// Retries for deterministic id generation before giving up.
const MAX_ID_RETRIES: u32 = 5;

/// Builds the user router.
pub(crate) fn routes(ctx: CoordinatorContext) -> Router {
    Router::new()
        .route("/user/register", post(register))
        .route("/user/login", post(login))
        .route("/user/public_key", post(public_key))
        .route("/user/avatar", post(avatar))
        .with_state(ctx)
}

/// `POST /user/register` — creates an account. Rate-limited per address.
#[instrument(level = "debug", skip_all)]
async fn register(
    State(ctx): State<CoordinatorContext>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    payload: Result<Json<UserRegisterRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<UserRegisterResponse>>, Error> {
    if !ctx
        .rate_limiter
        .check("user/register", peer.ip(), REGISTER_LIMIT, WINDOW)
    {
        return Err(Error::RateLimited);
    }
    let Json(request) = payload?;
    if request.username.is_empty() || request.password.expose_secret().is_empty() {
        return Err(Error::InvalidParameter(
            "username and password must not be empty".into(),
        ));
    }
    if ctx.users.find_by_username(&request.username)?.is_some() {
        return Err(Error::UsernameExists);
    }

    for attempt in 1..=MAX_ID_RETRIES {
        let user_id = new_entity_id();
        match ctx.users.insert(
            &user_id,
            request.username.clone(),
            request.password.clone(),
        ) {
            Ok(()) => {
                tracing::info!("registered user {} as {user_id}", request.username);
                return Ok(Json(ApiResponse::success(UserRegisterResponse { user_id })));
            }
            Err(DbError::Duplicate(_)) => {
                tracing::warn!("user id collision, retry {attempt}/{MAX_ID_RETRIES}");
            }
            Err(other) => return Err(other.into()),
        }
    }
    Err(Error::UserIdExhausted)
}

/// `POST /user/login` — password-hash check. Rate-limited per address.
#[instrument(level = "debug", skip_all)]
async fn login(
    State(ctx): State<CoordinatorContext>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    payload: Result<Json<UserLoginRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<UserLoginResponse>>, Error> {
    if !ctx
        .rate_limiter
        .check("user/login", peer.ip(), LOGIN_LIMIT, WINDOW)
    {
        return Err(Error::RateLimited);
    }
    let Json(request) = payload?;
    let user = ctx
        .users
        .find_by_username(&request.username)?
        .ok_or(Error::UserNotFound)?;
    if user.password.expose_secret() != request.password.expose_secret() {
        return Err(Error::WrongPassword);
    }
    ctx.users.touch_login(&user.id)?;

    Ok(Json(ApiResponse::success(UserLoginResponse {
        user_id: user.id,
        public_key: user.public_key,
        avatar: user.avatar,
    })))
}

/// `POST /user/public_key` — converts the uploaded PEM to a curve point and
/// stores it.
#[instrument(level = "debug", skip_all)]
async fn public_key(
    State(ctx): State<CoordinatorContext>,
    payload: Result<Json<UserPublicKeyRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<()>>, Error> {
    let Json(request) = payload?;
    let point = keys::pem_to_public_key(&request.public_key, &ctx.group.curve)
        .map_err(|e| Error::InvalidParameter(e.to_string()))?;
    if !ctx.users.set_public_key(&request.user_id, point)? {
        return Err(Error::UserNotFound);
    }
    tracing::info!("stored public key for user {}", request.username);
    Ok(Json(ApiResponse::empty()))
}

/// `POST /user/avatar` — stores a base64 avatar for an existing user.
#[instrument(level = "debug", skip_all)]
async fn avatar(
    State(ctx): State<CoordinatorContext>,
    payload: Result<Json<AvatarUploadRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<()>>, Error> {
    let Json(request) = payload?;
    if ctx.users.get(&request.user_id)?.is_none() {
        return Err(Error::UserNotFound);
    }
    ctx.users.set_avatar(&request.user_id, request.avatar)?;
    Ok(Json(ApiResponse::empty()))
}
