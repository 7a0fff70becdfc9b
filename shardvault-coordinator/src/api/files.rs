//! File routes: upload with share fan-out, download aggregation, detail,
//! listing and owner-gated deletion.

use axum::extract::{Query, State};
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use shardvault_types::api::ApiResponse;
use shardvault_types::api::v1::{
    DownloadShareRequest, DownloadShareResponse, DownloadUser, EncShareEntry, FileDeleteRequest,
    FileDetailQuery, FileDetailResponse, FileDownloadRequest, FileDownloadResponse,
    FileListQuery, FileListResponse, FileSummary, FileUploadRequest, FileUploadResponse,
    ShareDeleteRequest,
};
use shardvault_types::records::{FileRecord, FileStatus};
use tracing::instrument;

use crate::CoordinatorContext;
use crate::api::errors::Error;
use crate::metrics::{
    METRICS_ID_COORDINATOR_FANOUT_FAILURES, METRICS_ID_COORDINATOR_FILES_UPLOADED,
    METRICS_ID_COORDINATOR_SHARES_COLLECTED,
};
use crate::services::dealer::DealerError;
use shardvault_core::dealing::DealError;

/// Builds the file router.
pub(crate) fn routes(ctx: CoordinatorContext) -> Router {
    Router::new()
        .route("/file/upload", post(upload))
        .route("/file/download", post(download))
        .route("/file/detail", get(detail))
        .route("/file/list", get(list))
        .route("/file/delete", post(delete))
        .with_state(ctx)
}

/// `POST /file/upload` — deals the file key into signcrypted shares, persists
/// the record (commitments included) and fans the shares out to the nodes.
///
/// The record is durable before fan-out finishes; per-node fan-out failures
/// are logged and reflected in metrics but do not fail the upload.
#[instrument(level = "debug", skip_all, fields(file = tracing::field::Empty))]
async fn upload(
    State(ctx): State<CoordinatorContext>,
    payload: Result<Json<FileUploadRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<FileUploadResponse>>, Error> {
    let Json(request) = payload?;
    let file_uuid = shardvault_core::sha256_hex(
        format!(
            "{}||{}||{}",
            request.file_path, request.file_hash, request.upload_user
        )
        .as_bytes(),
    );
    tracing::Span::current().record("file", &file_uuid);

    if ctx.files.get(&file_uuid)?.is_some() {
        return Err(Error::DuplicateFile);
    }

    let nodes = ctx.registry.active()?;
    let (commits, payloads) = {
        let mut rng = rand::thread_rng();
        ctx.dealer
            .deal(&mut rng, &file_uuid, &request.file_key, &nodes)
            .map_err(|err| match err {
                DealerError::Deal(DealError::ThresholdTooSmall { needed, capacity }) => {
                    Error::InvalidParameter(format!(
                        "key needs {needed} blocks but threshold leaves room for {capacity}"
                    ))
                }
                DealerError::Deal(DealError::BadKey(msg)) => Error::InvalidParameter(msg),
                other => Error::Internal(other.to_string()),
            })?
    };

    let record = FileRecord {
        id: file_uuid.clone(),
        file_name: request.file_name,
        file_path: request.file_path,
        file_size: request.file_size,
        file_hash: request.file_hash,
        file_iv: request.file_iv,
        file_ciphertext: None,
        grid_ref: None,
        upload_user: request.upload_user,
        upload_time: Utc::now().timestamp_millis(),
        status: FileStatus::Active,
        commits,
        download_count: 0,
    };
    ctx.files.insert_new(record, request.file_ciphertext)?;

    // Clients seeing the file id must assume distribution may still be in
    // progress; only fan-out outcomes are awaited here.
    let replies = ctx.broadcaster.post_each("sign_cryption", &payloads).await;
    for reply in &replies {
        if let Err(failure) = &reply.result {
            ::metrics::counter!(METRICS_ID_COORDINATOR_FANOUT_FAILURES).increment(1);
            tracing::warn!(
                "share fan-out to {} failed: {} ({})",
                reply.address,
                failure.message,
                failure.code
            );
        }
    }
    let delivered = replies.iter().filter(|r| r.result.is_ok()).count();
    tracing::info!("uploaded file, {delivered}/{} shares delivered", payloads.len());
    ::metrics::counter!(METRICS_ID_COORDINATOR_FILES_UPLOADED).increment(1);

    Ok(Json(ApiResponse::success(FileUploadResponse { file_uuid })))
}

/// `POST /file/download` — picks `t` random active nodes, broadcasts the
/// re-encryption request with the downloader's public key and relays the
/// collected shares. No share is decrypted here.
#[instrument(level = "debug", skip_all, fields(file = tracing::field::Empty))]
async fn download(
    State(ctx): State<CoordinatorContext>,
    payload: Result<Json<FileDownloadRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<FileDownloadResponse>>, Error> {
    let Json(request) = payload?;
    tracing::Span::current().record("file", &request.file_uuid);

    if ctx.files.get(&request.file_uuid)?.is_none() {
        return Err(Error::FileNotFound(request.file_uuid));
    }
    let user = ctx
        .users
        .find_by_username(&request.download_user)?
        .ok_or(Error::UserNotFound)?;
    let Some(public_key) = user.public_key else {
        return Err(Error::UserNotFound);
    };

    let required = ctx.params.t as usize;
    let chosen = {
        let mut rng = rand::thread_rng();
        ctx.registry.sample_active(&mut rng, required)?
    };
    let Some(chosen) = chosen else {
        let active = ctx.registry.active()?.len();
        return Err(Error::InsufficientNodes { active, required });
    };

    let node_request = DownloadShareRequest {
        file_uuid: request.file_uuid,
        download_user: DownloadUser {
            user_id: user.id,
            public_key,
        },
    };
    let addresses: Vec<String> = chosen.iter().map(|node| node.address.clone()).collect();
    let replies = ctx
        .broadcaster
        .post_all("download_request", &addresses, &node_request)
        .await;

    let mut entries = Vec::with_capacity(replies.len());
    for reply in replies {
        match reply.result {
            Ok(Some(value)) => match serde_json::from_value::<DownloadShareResponse>(value) {
                Ok(response) => entries.push(EncShareEntry {
                    server_id: response.server_id,
                    enc_share: response.enc_share,
                }),
                Err(err) => tracing::warn!("malformed share from {}: {err}", reply.address),
            },
            Ok(None) => tracing::warn!("empty share response from {}", reply.address),
            Err(failure) => tracing::warn!(
                "share collection from {} failed: {} ({})",
                reply.address,
                failure.message,
                failure.code
            ),
        }
    }
    ::metrics::counter!(METRICS_ID_COORDINATOR_SHARES_COLLECTED).increment(entries.len() as u64);

    Ok(Json(ApiResponse::success(FileDownloadResponse {
        enc_shares_list: entries,
    })))
}

/// `GET /file/detail` — metadata, commitments and the body ciphertext.
/// Bumps the download counter.
#[instrument(level = "debug", skip_all)]
async fn detail(
    State(ctx): State<CoordinatorContext>,
    query: Result<Query<FileDetailQuery>, QueryRejection>,
) -> Result<Json<ApiResponse<FileDetailResponse>>, Error> {
    let Query(query) = query?;
    let record = ctx
        .files
        .get(&query.file_uuid)?
        .ok_or_else(|| Error::FileNotFound(query.file_uuid.clone()))?;
    let file_ciphertext = ctx.files.load_ciphertext(&record)?;

    let response = FileDetailResponse {
        file_uuid: record.id.clone(),
        file_name: record.file_name,
        file_size: record.file_size,
        file_hash: record.file_hash,
        file_iv: record.file_iv,
        file_ciphertext,
        download_count: record.download_count,
        commits: record.commits,
    };
    ctx.files.bump_download_count(&record.id)?;
    Ok(Json(ApiResponse::success(response)))
}

/// `GET /file/list` — summaries of all files, optionally for one uploader.
#[instrument(level = "debug", skip_all)]
async fn list(
    State(ctx): State<CoordinatorContext>,
    query: Result<Query<FileListQuery>, QueryRejection>,
) -> Result<Json<ApiResponse<FileListResponse>>, Error> {
    let Query(query) = query?;
    let files_info = ctx
        .files
        .all()?
        .into_iter()
        .filter(|record| {
            query
                .username
                .as_ref()
                .is_none_or(|username| &record.upload_user == username)
        })
        .map(|record| FileSummary {
            file_uuid: record.id,
            file_name: record.file_name,
            file_size: record.file_size,
            file_hash: record.file_hash,
            upload_user: record.upload_user,
            upload_time: record.upload_time,
            status: match record.status {
                FileStatus::Active => "active".into(),
                FileStatus::Deleted => "deleted".into(),
                FileStatus::Expired => "expired".into(),
            },
            download_count: record.download_count,
        })
        .collect();
    Ok(Json(ApiResponse::success(FileListResponse { files_info })))
}

/// `POST /file/delete` — owner check, record removal, then share-deletion
/// cascade to every active node.
#[instrument(level = "debug", skip_all, fields(file = tracing::field::Empty))]
async fn delete(
    State(ctx): State<CoordinatorContext>,
    payload: Result<Json<FileDeleteRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<()>>, Error> {
    let Json(request) = payload?;
    tracing::Span::current().record("file", &request.file_uuid);

    let record = ctx
        .files
        .get(&request.file_uuid)?
        .ok_or_else(|| Error::FileNotFound(request.file_uuid.clone()))?;
    if record.upload_user != request.username {
        return Err(Error::PermissionDenied);
    }

    ctx.files.delete(&request.file_uuid)?;

    let addresses: Vec<String> = ctx
        .registry
        .active()?
        .into_iter()
        .map(|node| node.address)
        .collect();
    let replies = ctx
        .broadcaster
        .post_all(
            "delete_request",
            &addresses,
            &ShareDeleteRequest {
                file_uuid: request.file_uuid.clone(),
            },
        )
        .await;

    let deleted = replies.iter().filter(|reply| reply.result.is_ok()).count();
    if deleted != addresses.len() {
        tracing::warn!(
            "share cascade incomplete for {}: {deleted}/{} nodes",
            request.file_uuid,
            addresses.len()
        );
        return Err(Error::CascadeIncomplete);
    }
    tracing::info!("deleted file and cascaded to {deleted} nodes");
    Ok(Json(ApiResponse::empty()))
}
