//! Share intake, download re-encryption and deletion.

use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::routing::post;
use axum::{Json, Router};
use chrono::Utc;
use shardvault_types::api::ApiResponse;
use shardvault_types::api::v1::{
    DownloadShareRequest, DownloadShareResponse, ShareDeleteRequest, SignCryptionRequest,
};
use shardvault_types::records::EncryptedShareRecord;
use tracing::instrument;

use crate::NodeContext;
use crate::api::errors::Error;
use crate::metrics::{
    METRICS_ID_NODE_SHARES_SERVED, METRICS_ID_NODE_SHARES_STORED,
    METRICS_ID_NODE_SIGNATURE_FAILURES,
};
use crate::services::share_store::ShareStoreError;

/// Builds the share router with the node context as state.
pub(crate) fn routes(ctx: NodeContext) -> Router {
    Router::new()
        .route("/sign_cryption", post(sign_cryption))
        .route("/download_request", post(download_request))
        .route("/delete_request", post(delete_request))
        .with_state(ctx)
}

/// `POST /sign_cryption` — verifies the coordinator signature over the
/// inbound ciphertext and stores the still-encrypted share, at most once
/// per file.
#[instrument(level = "debug", skip_all, fields(file = tracing::field::Empty))]
async fn sign_cryption(
    State(ctx): State<NodeContext>,
    payload: Result<Json<SignCryptionRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<()>>, Error> {
    let Json(request) = payload?;
    tracing::Span::current().record("file", &request.file_uuid);

    if !ctx.sm2.verify(
        &request.signature,
        request.ciphertext.as_bytes(),
        &ctx.coordinator_za,
        &ctx.coordinator_public_key,
    ) {
        ::metrics::counter!(METRICS_ID_NODE_SIGNATURE_FAILURES).increment(1);
        return Err(Error::SignatureInvalid);
    }

    let now = Utc::now().timestamp_millis();
    let record = EncryptedShareRecord {
        file_uuid: request.file_uuid,
        enc_share: request.ciphertext,
        server_id: request.server_id,
        created_at: now,
        expires_at: now + ctx.share_ttl_ms,
    };
    ctx.store.insert_new(&record).map_err(|err| match err {
        ShareStoreError::Duplicate(file) => {
            Error::Signcryption(format!("share for file {file} already stored"))
        }
        other => Error::Signcryption(other.to_string()),
    })?;

    ::metrics::counter!(METRICS_ID_NODE_SHARES_STORED).increment(1);
    tracing::info!("stored share");
    Ok(Json(ApiResponse::empty()))
}

/// `POST /download_request` — the double-encryption with blinding removal:
/// add a fresh layer under the downloader's key, strip the node's own `c1`
/// layer, return a ciphertext only the downloader can open.
#[instrument(level = "debug", skip_all, fields(file = tracing::field::Empty))]
async fn download_request(
    State(ctx): State<NodeContext>,
    payload: Result<Json<DownloadShareRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<DownloadShareResponse>>, Error> {
    let Json(request) = payload?;
    tracing::Span::current().record("file", &request.file_uuid);

    let record = ctx
        .store
        .get(&request.file_uuid)
        .map_err(|e| Error::Download(e.to_string()))?
        .ok_or_else(|| Error::ShareNotFound(request.file_uuid.clone()))?;

    let downloader_key = &request.download_user.public_key;
    if !ctx.group.curve.contains(downloader_key) {
        return Err(Error::InvalidParameter(
            "downloader public key is not on the curve".into(),
        ));
    }

    // The two transforms commute; the plaintext share never materializes.
    let mut rng = rand::thread_rng();
    let layered = ctx
        .ecies
        .add_layer(&mut rng, &record.enc_share, downloader_key)
        .map_err(|e| Error::Download(e.to_string()))?;
    let enc_share = ctx
        .ecies
        .remove_layer(&layered, "c1", &ctx.private_key)
        .map_err(|e| Error::Download(e.to_string()))?;

    ::metrics::counter!(METRICS_ID_NODE_SHARES_SERVED).increment(1);
    Ok(Json(ApiResponse::success(DownloadShareResponse {
        server_id: ctx.node_id.clone(),
        enc_share,
    })))
}

/// `POST /delete_request` — removes the share for a deleted file.
#[instrument(level = "debug", skip_all)]
async fn delete_request(
    State(ctx): State<NodeContext>,
    payload: Result<Json<ShareDeleteRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<()>>, Error> {
    let Json(request) = payload?;
    let removed = ctx
        .store
        .remove(&request.file_uuid)
        .map_err(|e| Error::Signcryption(e.to_string()))?;
    if !removed {
        return Err(Error::ShareNotFound(request.file_uuid));
    }
    tracing::info!(file = %request.file_uuid, "deleted share");
    Ok(Json(ApiResponse::empty()))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum_test::TestServer;
    use num_bigint::BigUint;
    use rand::SeedableRng as _;
    use rand_chacha::ChaCha12Rng;
    use shardvault_core::curve::{Curve, Group, Point};
    use shardvault_core::ecies::Ecies;
    use shardvault_core::sm2::Sm2;
    use shardvault_core::{codec, sm2::Signature};
    use shardvault_types::api::error_codes;
    use shardvault_types::api::v1::DownloadUser;

    use super::*;
    use crate::NodeContext;
    use crate::services::share_store::ShareStore;

    fn p192() -> Group {
        let p = BigUint::parse_bytes(b"fffffffffffffffffffffffffffffffeffffffffffffffff", 16)
            .unwrap();
        let a = &p - 3u32;
        let b = BigUint::parse_bytes(b"64210519e59c80e70fa7e9ab72243049feb8deecc146b9b1", 16)
            .unwrap();
        let gx = BigUint::parse_bytes(b"188da80eb03090f67cbf20eb43a18800f4ff0afd82ff1012", 16)
            .unwrap();
        let gy = BigUint::parse_bytes(b"07192b95ffc8da78631011ed6b24cdd573f977a11e794811", 16)
            .unwrap();
        let order = BigUint::parse_bytes(b"ffffffffffffffffffffffff99def836146bc9b1b4d22831", 16)
            .unwrap();
        Group::new(Curve::new(p, a, b), Point::affine(gx, gy), order)
    }

    struct Harness {
        server: TestServer,
        sm2: Sm2,
        signer_za: Vec<u8>,
        signer_sk: BigUint,
        node_sk: BigUint,
        node_pk: Point,
        group: Group,
        _dir: tempfile::TempDir,
    }

    fn harness() -> Harness {
        let group = p192();
        let mut rng = ChaCha12Rng::seed_from_u64(71);
        let sm2 = Sm2::new(group.clone(), "CC".repeat(16));
        let (signer_sk, signer_pk) = group.generate_keypair(&mut rng);
        let signer_za = sm2.compute_za(&signer_pk);
        let (node_sk, node_pk) = group.generate_keypair(&mut rng);

        let dir = tempfile::tempdir().unwrap();
        let db = sled::open(dir.path()).unwrap();
        let store = ShareStore::open(&db, "NODE01").unwrap();

        let ctx = NodeContext {
            ecies: Ecies::new(group.clone()),
            group: group.clone(),
            sm2: sm2.clone(),
            coordinator_public_key: signer_pk,
            coordinator_za: Arc::new(signer_za.clone()),
            node_id: "NODE01".into(),
            private_key: Arc::new(node_sk.clone()),
            store,
            share_ttl_ms: 30 * 24 * 60 * 60 * 1000,
        };
        Harness {
            server: TestServer::new(routes(ctx)).unwrap(),
            sm2,
            signer_za,
            signer_sk,
            node_sk,
            node_pk,
            group,
            _dir: dir,
        }
    }

    fn signed_intake(harness: &Harness, file_uuid: &str, share: &BigUint) -> SignCryptionRequest {
        let mut rng = ChaCha12Rng::seed_from_u64(72);
        let ecies = Ecies::new(harness.group.clone());
        let ciphertext = ecies
            .encrypt(
                &mut rng,
                codec::int_to_hex(share).as_bytes(),
                &harness.node_pk,
            )
            .unwrap();
        let signature = harness.sm2.sign(
            &mut rng,
            ciphertext.as_bytes(),
            &harness.signer_za,
            &harness.signer_sk,
        );
        SignCryptionRequest {
            server_id: "NODE01".into(),
            file_uuid: file_uuid.into(),
            ciphertext,
            signature,
        }
    }

    #[tokio::test]
    async fn replayed_intake_is_rejected_and_share_unchanged() {
        let harness = harness();
        let request = signed_intake(&harness, "FILE01", &BigUint::from(4242u32));

        let first: ApiResponse<serde_json::Value> =
            harness.server.post("/sign_cryption").json(&request).await.json();
        assert_eq!(first.error_code, error_codes::SUCCESS);

        let replay: ApiResponse<serde_json::Value> =
            harness.server.post("/sign_cryption").json(&request).await.json();
        assert_eq!(replay.error_code, error_codes::NODE_SIGNCRYPTION_ERROR);

        // The originally stored ciphertext still decrypts to the share.
        let downloader = {
            let mut rng = ChaCha12Rng::seed_from_u64(73);
            harness.group.generate_keypair(&mut rng)
        };
        let served: ApiResponse<DownloadShareResponse> = harness
            .server
            .post("/download_request")
            .json(&DownloadShareRequest {
                file_uuid: "FILE01".into(),
                download_user: DownloadUser {
                    user_id: "U1".into(),
                    public_key: downloader.1.clone(),
                },
            })
            .await
            .json();
        assert_eq!(served.error_code, error_codes::SUCCESS);
        let enc_share = served.data.unwrap().enc_share;
        let ecies = Ecies::new(harness.group.clone());
        let plaintext = ecies.decrypt(&enc_share, &downloader.0).unwrap();
        let share = codec::hex_to_int(std::str::from_utf8(&plaintext).unwrap()).unwrap();
        assert_eq!(share, BigUint::from(4242u32));
    }

    #[tokio::test]
    async fn bad_signature_is_rejected() {
        let harness = harness();
        let mut request = signed_intake(&harness, "FILE02", &BigUint::from(7u32));
        request.signature = Signature {
            r: request.signature.r.clone(),
            s: &request.signature.s + 1u32,
        };
        let response: ApiResponse<serde_json::Value> =
            harness.server.post("/sign_cryption").json(&request).await.json();
        assert_eq!(response.error_code, error_codes::SIGNATURE_INVALID);
    }

    #[tokio::test]
    async fn missing_share_reports_not_found() {
        let harness = harness();
        let mut rng = ChaCha12Rng::seed_from_u64(74);
        let (_, pk) = harness.group.generate_keypair(&mut rng);
        let response: ApiResponse<serde_json::Value> = harness
            .server
            .post("/download_request")
            .json(&DownloadShareRequest {
                file_uuid: "NOPE".into(),
                download_user: DownloadUser {
                    user_id: "U1".into(),
                    public_key: pk,
                },
            })
            .await
            .json();
        assert_eq!(response.error_code, error_codes::SHARE_NOT_FOUND);

        let response: ApiResponse<serde_json::Value> = harness
            .server
            .post("/delete_request")
            .json(&ShareDeleteRequest {
                file_uuid: "NOPE".into(),
            })
            .await
            .json();
        assert_eq!(response.error_code, error_codes::SHARE_NOT_FOUND);
    }

    #[tokio::test]
    async fn malformed_body_maps_to_envelope_errors() {
        let harness = harness();
        let response = harness
            .server
            .post("/sign_cryption")
            .text("not json")
            .content_type("application/json")
            .await;
        let envelope: ApiResponse<serde_json::Value> = response.json();
        assert_eq!(envelope.error_code, error_codes::INVALID_JSON);
    }

    #[tokio::test]
    async fn node_private_key_alone_cannot_open_the_served_share() {
        // The served ciphertext carries only the downloader layer; the node
        // key must not decrypt it.
        let harness = harness();
        let request = signed_intake(&harness, "FILE03", &BigUint::from(99999u32));
        let _: ApiResponse<serde_json::Value> =
            harness.server.post("/sign_cryption").json(&request).await.json();

        let downloader = {
            let mut rng = ChaCha12Rng::seed_from_u64(75);
            harness.group.generate_keypair(&mut rng)
        };
        let served: ApiResponse<DownloadShareResponse> = harness
            .server
            .post("/download_request")
            .json(&DownloadShareRequest {
                file_uuid: "FILE03".into(),
                download_user: DownloadUser {
                    user_id: "U1".into(),
                    public_key: downloader.1.clone(),
                },
            })
            .await
            .json();
        let enc_share = served.data.unwrap().enc_share;

        let ecies = Ecies::new(harness.group.clone());
        let with_node_key = ecies.decrypt(&enc_share, &harness.node_sk);
        let expected = codec::int_to_hex(&BigUint::from(99999u32));
        assert!(
            with_node_key.is_err() || with_node_key.unwrap() != expected.as_bytes(),
            "node key must not recover the share"
        );
    }
}
