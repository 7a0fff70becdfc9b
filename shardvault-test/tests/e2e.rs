//! End-to-end scenarios against a full in-process deployment: coordinator,
//! five storage nodes, uploader and downloader clients.

use eyre::Context as _;
use shardvault_client::{ClientError, ShardVaultClient, reconstruct_key};
use shardvault_core::{filecipher, sha256_hex};
use shardvault_test::TestCluster;
use shardvault_types::api::v1::{
    DownloadShareRequest, DownloadShareResponse, DownloadUser, EncShareEntry, FileUploadRequest,
    FileUploadResponse,
};
use shardvault_types::api::{ApiResponse, error_codes};

const UPLOAD_KEY: &str = "0123456789abcdef0123456789abcdef";
const UPLOAD_IV: &str = "000102030405060708090a0b0c0d0e0f";
const BODY: &[u8] = b"hello world";

/// Uploads `BODY` under the fixed key as `alice`, bypassing the client's
/// random key generation so the recovered key can be compared exactly.
async fn upload_fixed_key(coordinator_url: &str) -> eyre::Result<String> {
    let http = reqwest::Client::new();
    let request = FileUploadRequest {
        file_name: "hello.txt".into(),
        file_path: "/demo".into(),
        file_size: BODY.len() as u64,
        file_ciphertext: filecipher::encrypt(UPLOAD_KEY, UPLOAD_IV, BODY)
            .context("while encrypting the body")?,
        file_iv: UPLOAD_IV.into(),
        file_hash: sha256_hex(BODY),
        file_key: UPLOAD_KEY.into(),
        upload_user: "alice".into(),
    };
    let envelope: ApiResponse<FileUploadResponse> = http
        .post(format!("{coordinator_url}/file/upload"))
        .json(&request)
        .send()
        .await?
        .json()
        .await?;
    let response = envelope
        .into_result()
        .map_err(eyre::Report::from)?
        .ok_or_else(|| eyre::eyre!("upload returned no payload"))?;
    Ok(response.file_uuid)
}

/// Asks one node directly for its re-encrypted share.
async fn share_from_node(
    node_url: &str,
    file_uuid: &str,
    downloader: &DownloadUser,
) -> eyre::Result<EncShareEntry> {
    let http = reqwest::Client::new();
    let envelope: ApiResponse<DownloadShareResponse> = http
        .post(format!("{node_url}/download_request"))
        .json(&DownloadShareRequest {
            file_uuid: file_uuid.into(),
            download_user: downloader.clone(),
        })
        .send()
        .await?
        .json()
        .await?;
    let response = envelope
        .into_result()
        .map_err(eyre::Report::from)?
        .ok_or_else(|| eyre::eyre!("node returned no payload"))?;
    Ok(EncShareEntry {
        server_id: response.server_id,
        enc_share: response.enc_share,
    })
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn upload_download_and_delete_round_trip() -> eyre::Result<()> {
    let cluster = TestCluster::start(5, 3).await?;

    let mut alice = ShardVaultClient::connect(&cluster.coordinator_url).await?;
    alice.register("alice", "correct horse battery staple").await?;

    let mut bob = ShardVaultClient::connect(&cluster.coordinator_url).await?;
    bob.register("bob", "hunter2hunter2").await?;
    bob.ensure_keypair().await?;
    let (bob_sk, bob_pk) = bob.keypair().cloned().expect("keypair was generated");

    // S1: upload "hello world" under the fixed key; every node gets a
    // share and the record carries exactly t = 3 commitments.
    let file_uuid = upload_fixed_key(&cluster.coordinator_url).await?;
    let detail = alice.file_detail(&file_uuid).await?;
    assert_eq!(detail.file_hash, sha256_hex(BODY));
    assert_eq!(detail.commits.len(), 3);
    assert_eq!(detail.commits.keys().copied().collect::<Vec<_>>(), [0, 1, 2]);

    let downloader = DownloadUser {
        user_id: "ignored-by-nodes".into(),
        public_key: bob_pk.clone(),
    };
    let mut node_shares = Vec::new();
    for node_url in &cluster.node_urls {
        node_shares.push(share_from_node(node_url, &file_uuid, &downloader).await?);
    }
    assert_eq!(node_shares.len(), 5, "all five nodes hold a share");

    // Duplicate upload of the same (path, hash, uploader) is rejected.
    let duplicate = upload_fixed_key(&cluster.coordinator_url).await;
    let failure = duplicate.expect_err("duplicate upload must fail");
    assert!(failure.to_string().contains("114"), "got: {failure}");

    // S2: the downloader recovers the exact key and body through the
    // regular client flow.
    let recovered = reconstruct_key(bob.params(), &detail.commits, &node_shares[..3], &bob_sk)?;
    assert_eq!(recovered, UPLOAD_KEY);

    let downloaded = bob.download(&file_uuid).await?;
    assert_eq!(downloaded.data, BODY);
    assert_eq!(downloaded.file_name, "hello.txt");

    // S3: a corrupted share fails the commitment check; the remaining
    // three still reconstruct.
    let mut tampered = node_shares[..4].to_vec();
    tampered[0].enc_share = tampered[1].enc_share.clone();
    let recovered = reconstruct_key(bob.params(), &detail.commits, &tampered, &bob_sk)?;
    assert_eq!(recovered, UPLOAD_KEY);

    // But three corrupted-or-missing shares are fatal.
    let mut hopeless = node_shares[..3].to_vec();
    for entry in hopeless.iter_mut().skip(1) {
        entry.enc_share = hopeless_blob();
    }
    match reconstruct_key(bob.params(), &detail.commits, &hopeless, &bob_sk) {
        Err(ClientError::ReconstructionFailed { verified: 1, required: 3 }) => {}
        other => panic!("expected reconstruction failure, got {other:?}"),
    }

    // S6: deletion is owner-gated and cascades to the nodes.
    let denial = bob.delete(&file_uuid).await.expect_err("bob is not the owner");
    assert_api_code(&denial, error_codes::PERMISSION_DENIED);

    alice.delete(&file_uuid).await?;
    let missing = bob.download(&file_uuid).await.expect_err("file is gone");
    assert_api_code(&missing, error_codes::FILE_NOT_FOUND);

    let node_miss = share_from_node(&cluster.node_urls[0], &file_uuid, &downloader)
        .await
        .expect_err("share is gone");
    assert!(node_miss.to_string().contains("110"), "got: {node_miss}");

    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn reconstruction_fails_below_threshold() -> eyre::Result<()> {
    let mut cluster = TestCluster::start(5, 3).await?;

    let mut alice = ShardVaultClient::connect(&cluster.coordinator_url).await?;
    alice.register("alice", "correct horse battery staple").await?;
    let file_uuid = alice.upload("notes.txt", "/home/alice", b"quarterly numbers").await?;

    let mut bob = ShardVaultClient::connect(&cluster.coordinator_url).await?;
    bob.register("bob", "hunter2hunter2").await?;
    bob.ensure_keypair().await?;

    // S4: with three of five nodes dead, any t-of-n selection yields at
    // most two usable shares.
    for index in 0..3 {
        cluster.kill_node(index);
    }
    match bob.download(&file_uuid).await {
        Err(ClientError::ReconstructionFailed { verified, required: 3 }) => {
            assert!(verified < 3);
        }
        other => panic!("expected reconstruction failure, got {other:?}"),
    }
    Ok(())
}

/// A syntactically valid but cryptographically useless share blob.
fn hopeless_blob() -> String {
    use base64::Engine as _;
    base64::engine::general_purpose::STANDARD.encode(r#"{"c1":null,"cts":[]}"#)
}

fn assert_api_code(err: &ClientError, code: u16) {
    match err {
        ClientError::Api(failure) => assert_eq!(failure.code, code, "message: {}", failure.message),
        other => panic!("expected api failure {code}, got {other:?}"),
    }
}
